//! Calculator model registry.
//!
//! Eight models share the Z80 core but differ in ROM/RAM capacity, the
//! bank-switching scheme, and whether the screen is driven by a separate
//! LCD controller (TI-82 and later) or scanned straight out of RAM (TI-85,
//! TI-86). Each model is identified by a one-hot tag in bits 8..15 of the
//! mode word; the same tag is folded into port addresses by the port
//! decoder and written at the head of every snapshot.

use serde::{Deserialize, Serialize};

/// Mask selecting the model tag out of a mode word.
pub const MODEL_MASK: u32 = 0xFF00;

/// Supported calculator models, in registry order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Model {
    Ti85,
    Ti86,
    Ti82,
    Ti83,
    Ti83Plus,
    Ti83PlusSe,
    Ti84Plus,
    Ti84PlusSe,
}

/// Bank-switching algorithm used by a model.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MapperFamily {
    /// Fixed layout with one switchable ROM page at 4000h (TI-85, TI-82).
    Fixed,
    /// Two independently swappable ROM/RAM pages at 4000h and 8000h (TI-86).
    DualSwap,
    /// Three-register composite mapper (TI-83).
    Composite,
    /// Flat page registers; `ram_bit` selects RAM over ROM, `top_page` adds
    /// the C000h RAM page register (TI-83+ SE, TI-84+, TI-84+ SE).
    Flat { ram_bit: u8, top_page: bool },
}

/// Static per-model configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ModelConfig {
    pub model: Model,
    /// Faceplate image shown behind the screen.
    pub backdrop: &'static str,
    pub rom_file: &'static str,
    pub rom_size: usize,
    pub ram_file: &'static str,
    pub ram_size: usize,
}

/// Registry of every supported model.
#[rustfmt::skip]
pub const CONFIGS: [ModelConfig; 8] = [
    ModelConfig { model: Model::Ti85,       backdrop: "TI85.png",   rom_file: "TI85.ROM",   rom_size: 0x20000,  ram_file: "TI85.RAM",   ram_size: 0x8000 },
    ModelConfig { model: Model::Ti86,       backdrop: "TI86.png",   rom_file: "TI86.ROM",   rom_size: 0x40000,  ram_file: "TI86.RAM",   ram_size: 0x20000 },
    ModelConfig { model: Model::Ti82,       backdrop: "TI82.png",   rom_file: "TI82.ROM",   rom_size: 0x20000,  ram_file: "TI82.RAM",   ram_size: 0x8000 },
    ModelConfig { model: Model::Ti83,       backdrop: "TI83.png",   rom_file: "TI83.ROM",   rom_size: 0x40000,  ram_file: "TI83.RAM",   ram_size: 0x8000 },
    ModelConfig { model: Model::Ti83Plus,   backdrop: "TI83P.png",  rom_file: "TI83P.ROM",  rom_size: 0x80000,  ram_file: "TI83P.RAM",  ram_size: 0x8000 },
    ModelConfig { model: Model::Ti83PlusSe, backdrop: "TI83SE.png", rom_file: "TI83SE.ROM", rom_size: 0x200000, ram_file: "TI83SE.RAM", ram_size: 0x20000 },
    ModelConfig { model: Model::Ti84Plus,   backdrop: "TI84P.png",  rom_file: "TI84P.ROM",  rom_size: 0x100000, ram_file: "TI84P.RAM",  ram_size: 0x20000 },
    ModelConfig { model: Model::Ti84PlusSe, backdrop: "TI84SE.png", rom_file: "TI84SE.ROM", rom_size: 0x200000, ram_file: "TI84SE.RAM", ram_size: 0x20000 },
];

impl Model {
    pub const ALL: [Model; 8] = [
        Model::Ti85,
        Model::Ti86,
        Model::Ti82,
        Model::Ti83,
        Model::Ti83Plus,
        Model::Ti83PlusSe,
        Model::Ti84Plus,
        Model::Ti84PlusSe,
    ];

    /// One-hot model tag as stored in the mode word.
    pub const fn tag(self) -> u32 {
        match self {
            Model::Ti85 => 0x0000,
            Model::Ti86 => 0x0100,
            Model::Ti82 => 0x0200,
            Model::Ti83 => 0x0400,
            Model::Ti83Plus => 0x0800,
            Model::Ti83PlusSe => 0x1000,
            Model::Ti84Plus => 0x2000,
            Model::Ti84PlusSe => 0x4000,
        }
    }

    /// Look a model up by mode word. Bits outside [`MODEL_MASK`] are ignored.
    pub fn from_tag(mode: u32) -> Option<Model> {
        let tag = mode & MODEL_MASK;
        Model::ALL.into_iter().find(|m| m.tag() == tag)
    }

    pub fn config(self) -> &'static ModelConfig {
        // CONFIGS is in the same order as ALL
        &CONFIGS[self as usize]
    }

    pub fn rom_size(self) -> usize {
        self.config().rom_size
    }

    pub fn ram_size(self) -> usize {
        self.config().ram_size
    }

    /// TI-85 and TI-86: no LCD controller, screen scanned from RAM.
    pub fn is_ti85_family(self) -> bool {
        matches!(self, Model::Ti85 | Model::Ti86)
    }

    /// TI-82 and later: separate LCD controller on ports 10h/11h.
    pub fn is_ti83_family(self) -> bool {
        !self.is_ti85_family()
    }

    /// Flash-based models (TI-83+ and later).
    pub fn is_flash(self) -> bool {
        matches!(
            self,
            Model::Ti83Plus | Model::Ti83PlusSe | Model::Ti84Plus | Model::Ti84PlusSe
        )
    }

    pub fn mapper_family(self) -> MapperFamily {
        match self {
            Model::Ti85 | Model::Ti82 => MapperFamily::Fixed,
            Model::Ti86 => MapperFamily::DualSwap,
            Model::Ti83 => MapperFamily::Composite,
            Model::Ti83Plus => MapperFamily::Flat { ram_bit: 0x40, top_page: false },
            Model::Ti83PlusSe | Model::Ti84Plus | Model::Ti84PlusSe => {
                MapperFamily::Flat { ram_bit: 0x80, top_page: true }
            }
        }
    }

    /// Visible screen width in pixels.
    pub fn screen_width(self) -> usize {
        if self.is_ti85_family() { 128 } else { 96 }
    }

    pub fn name(self) -> &'static str {
        match self {
            Model::Ti85 => "TI-85",
            Model::Ti86 => "TI-86",
            Model::Ti82 => "TI-82",
            Model::Ti83 => "TI-83",
            Model::Ti83Plus => "TI-83+",
            Model::Ti83PlusSe => "TI-83+ SE",
            Model::Ti84Plus => "TI-84+",
            Model::Ti84PlusSe => "TI-84+ SE",
        }
    }
}

impl std::fmt::Display for Model {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// Largest ROM image of any model; sizes the shared ROM arena.
pub fn largest_rom() -> usize {
    CONFIGS.iter().map(|c| c.rom_size).max().unwrap_or(0)
}

/// Largest RAM of any model; sizes the shared RAM arena.
pub fn largest_ram() -> usize {
    CONFIGS.iter().map(|c| c.ram_size).max().unwrap_or(0)
}
