//! Banked memory subsystem.
//!
//! The Z80 sees 64 KB split into four 16 KB windows. Each window is a view
//! into one of two arenas owned by [`Memory`]:
//!
//! | Arena | Size                          | Z80 writes |
//! |-------|-------------------------------|------------|
//! | ROM   | largest ROM of any model (2 MB) | ignored  |
//! | RAM   | largest RAM of any model (128 KB) | stored |
//!
//! Both arenas are allocated once at the largest size so switching model
//! never reallocates. The active model's sizes bound every window: window
//! offsets are masked with `size - 1`, which reproduces the wraparound of
//! the unconnected address lines on real hardware.
//!
//! The mapper functions below are pure: given the banking registers they
//! return the four windows. One function per mapper family.

use crate::model::{largest_ram, largest_rom, MapperFamily};

/// Size of one Z80 address window.
pub const PAGE_SIZE: usize = 0x4000;
/// Byte returned from addresses with nothing behind them.
pub const NO_DEVICE: u8 = 0xFF;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Region {
    Rom,
    Ram,
}

/// Non-owning view of 16 KB of one arena.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Window {
    pub region: Region,
    /// Byte offset of the window start inside its arena.
    pub offset: usize,
}

impl Window {
    pub const fn rom(offset: usize) -> Self {
        Window { region: Region::Rom, offset }
    }

    pub const fn ram(offset: usize) -> Self {
        Window { region: Region::Ram, offset }
    }
}

/// The four windows covering 0000h, 4000h, 8000h and C000h.
pub type Pages = [Window; 4];

/// Banking-relevant register values, as held in the port file.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BankRegs {
    /// Port 0 on the TI-83 (link port with the extra ROM bank bit 4).
    pub link: u8,
    pub rom_page: u8,
    pub rom_page2: u8,
    pub rom_page3: u8,
    pub power: u8,
}

/// Compute the windows for a mapper family from the current registers.
pub fn map(family: MapperFamily, regs: &BankRegs, rom_size: usize, ram_size: usize) -> Pages {
    match family {
        MapperFamily::Fixed => fixed(regs.rom_page),
        MapperFamily::DualSwap => dual_swap(regs.rom_page, regs.rom_page2),
        MapperFamily::Composite => composite(regs.link, regs.rom_page, regs.power),
        MapperFamily::Flat { ram_bit, top_page } => flat(
            ram_bit,
            regs.power,
            regs.rom_page,
            regs.rom_page2,
            top_page.then_some(regs.rom_page3),
            rom_size,
            ram_size,
        ),
    }
}

/// TI-85/TI-82: one 16 KB ROM page at 4000h, RAM fixed at 8000h-FFFFh.
pub fn fixed(port5: u8) -> Pages {
    [
        Window::rom(0),
        Window::rom(usize::from(port5 & 0x07) << 14),
        Window::ram(0),
        Window::ram(PAGE_SIZE),
    ]
}

fn swap_page(port: u8) -> Window {
    if port & 0x40 != 0 {
        Window::ram(usize::from(port & 0x07) << 14)
    } else {
        Window::rom(usize::from(port & 0x0F) << 14)
    }
}

/// TI-86: ROM or RAM at both 4000h and 8000h.
pub fn dual_swap(port5: u8, port6: u8) -> Pages {
    [Window::rom(0), swap_page(port5), swap_page(port6), Window::ram(0)]
}

/// TI-83: layout derived from the link port (extra ROM bank bit), the ROM
/// page register and the memory-map select bit of the power port.
pub fn composite(port0: u8, port2: u8, port4: u8) -> Pages {
    let bank = usize::from(port0 & 0x10) << 13;
    let swap = if port2 & 0x40 != 0 {
        Window::ram(usize::from(port2 & 0x01) << 14)
    } else {
        Window::rom(bank + (usize::from(port2 & 0x07) << 14))
    };
    let half = usize::from(port2 & 0x08) << 11;
    let upper = if port2 & 0x80 != 0 {
        Window::ram(half)
    } else {
        Window::rom(half + bank)
    };

    if port4 & 0x01 == 0 {
        let third = if port2 & 0x80 != 0 {
            Window::ram(half)
        } else if port0 & 0x10 != 0 {
            Window::rom(0x20000)
        } else {
            Window::rom(half)
        };
        [Window::rom(0), swap, third, Window::ram(0)]
    } else if port2 & 0x40 != 0 {
        [Window::rom(0), Window::ram(0), Window::ram(PAGE_SIZE), upper]
    } else {
        [Window::rom(0), Window::rom(bank), swap, upper]
    }
}

/// Page register decode for the flash models.
pub fn flat_page(value: u8, ram_bit: u8, rom_size: usize, ram_size: usize) -> Window {
    let offset = usize::from(value) << 14;
    if value & ram_bit != 0 {
        Window::ram(offset & ram_size.wrapping_sub(1))
    } else {
        Window::rom(offset & rom_size.wrapping_sub(1))
    }
}

/// TI-83+ and later. `port5` is the extra C000h RAM page register present on
/// the TI-83+ SE and TI-84+ models; `None` pins C000h to RAM page 0.
pub fn flat(
    ram_bit: u8,
    port4: u8,
    port6: u8,
    port7: u8,
    port5: Option<u8>,
    rom_size: usize,
    ram_size: usize,
) -> Pages {
    let page = |v| flat_page(v, ram_bit, rom_size, ram_size);
    if port4 & 0x01 != 0 {
        [Window::rom(0), Window::ram(0), page(port6), page(port7)]
    } else {
        let top = match port5 {
            Some(p) => Window::ram((usize::from(p) << 14) & ram_size.wrapping_sub(1)),
            None => Window::ram(0),
        };
        [Window::rom(0), page(port6), page(port7), top]
    }
}

/// ROM and RAM arenas plus the four active windows.
pub struct Memory {
    pub rom: Vec<u8>,
    pub ram: Vec<u8>,
    /// ROM size of the active model
    rom_size: usize,
    /// RAM size of the active model
    ram_size: usize,
    pages: Pages,
}

impl Memory {
    pub fn new() -> Self {
        Memory {
            rom: vec![NO_DEVICE; largest_rom()],
            ram: vec![NO_DEVICE; largest_ram()],
            rom_size: 0,
            ram_size: 0,
            pages: [Window::rom(0), Window::rom(0), Window::ram(0), Window::ram(0)],
        }
    }

    pub fn rom_size(&self) -> usize {
        self.rom_size
    }

    pub fn ram_size(&self) -> usize {
        self.ram_size
    }

    /// Adopt a model's sizes. Windows are re-clamped to the new extent.
    pub fn set_sizes(&mut self, rom_size: usize, ram_size: usize) {
        self.rom_size = rom_size.min(self.rom.len());
        self.ram_size = ram_size.min(self.ram.len());
        let pages = self.pages;
        self.set_pages(pages);
    }

    pub fn pages(&self) -> &Pages {
        &self.pages
    }

    /// Install new windows, masking each offset to its arena's active size.
    pub fn set_pages(&mut self, pages: Pages) {
        for (slot, w) in self.pages.iter_mut().zip(pages) {
            let size = match w.region {
                Region::Rom => self.rom_size,
                Region::Ram => self.ram_size,
            };
            *slot = Window {
                region: w.region,
                offset: w.offset & size.wrapping_sub(1) & !(PAGE_SIZE - 1),
            };
        }
    }

    /// Recompute the windows for `family` from the banking registers.
    pub fn remap(&mut self, family: MapperFamily, regs: &BankRegs) {
        let pages = map(family, regs, self.rom_size, self.ram_size);
        self.set_pages(pages);
    }

    // --- Z80 address space ---

    #[inline(always)]
    fn locate(&self, addr: u16) -> (Region, usize) {
        let w = self.pages[usize::from(addr >> 14)];
        (w.region, w.offset + (usize::from(addr) & (PAGE_SIZE - 1)))
    }

    /// Read a byte through the windows.
    #[inline(always)]
    pub fn read(&self, addr: u16) -> u8 {
        match self.locate(addr) {
            (Region::Rom, i) => self.rom.get(i).copied().unwrap_or(NO_DEVICE),
            (Region::Ram, i) => self.ram.get(i).copied().unwrap_or(NO_DEVICE),
        }
    }

    /// Write a byte through the windows. Writes into ROM windows are dropped.
    #[inline(always)]
    pub fn write(&mut self, addr: u16, value: u8) {
        if let (Region::Ram, i) = self.locate(addr) {
            if let Some(b) = self.ram.get_mut(i) {
                *b = value;
            }
        }
    }

    /// Read `offset` bytes past the start of window `n`, continuing linearly
    /// through the arena (wrapping at the active size). Used for the TI-85
    /// screen buffer, which may straddle the window end.
    pub fn peek_linear(&self, n: usize, offset: usize) -> u8 {
        let w = self.pages[n & 3];
        let (arena, size) = match w.region {
            Region::Rom => (&self.rom, self.rom_size),
            Region::Ram => (&self.ram, self.ram_size),
        };
        let i = (w.offset + offset) & size.wrapping_sub(1);
        arena.get(i).copied().unwrap_or(NO_DEVICE)
    }

    /// Active part of RAM.
    pub fn ram(&self) -> &[u8] {
        &self.ram[..self.ram_size]
    }

    pub fn ram_mut(&mut self) -> &mut [u8] {
        let n = self.ram_size;
        &mut self.ram[..n]
    }
}

impl Default for Memory {
    fn default() -> Self {
        Self::new()
    }
}
