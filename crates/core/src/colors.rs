//! Contrast-to-colour conversion.
//!
//! The LCD panels are unlit; contrast changes how dark set pixels look and
//! how much the cleared background shows through. Both formulas below are
//! empirical and produce a two-entry palette: index 0 for cleared pixels,
//! index 1 for set pixels.

/// 24-bit RGB colour.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Rgb {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl Rgb {
    pub const fn new(r: u8, g: u8, b: u8) -> Self {
        Rgb { r, g, b }
    }

    /// Opaque ARGB8888.
    pub fn to_argb(self) -> u32 {
        0xFF00_0000 | (u32::from(self.r) << 16) | (u32::from(self.g) << 8) | u32::from(self.b)
    }
}

/// Palette entries: `[cleared, set]`.
pub type Palette = [Rgb; 2];

/// Index of the cleared-pixel colour.
pub const PIXEL_OFF: usize = 0;
/// Index of the set-pixel colour.
pub const PIXEL_ON: usize = 1;

/// TI-85/TI-86: contrast port value, low 5 bits significant.
pub fn ti85_colors(contrast: u8) -> Palette {
    let v = 0x7C - ((contrast & 0x1F) << 2);
    let on = Rgb::new(v, v, v + 0x20);
    let v = 0xFF - v;
    let off = Rgb::new(v - 0x10, v, v - 0x10);
    [off, on]
}

/// TI-82 and later: LCD controller contrast, low 6 bits significant.
///
/// Each channel has its own clamp range so a weak contrast setting drifts
/// towards the greenish tint of a low battery.
pub fn ti83_colors(contrast: u8) -> Palette {
    let v = i32::from(contrast & 0x3F);
    let on = 255 - ((v - 20) * 10).min(254);
    let off = 511 - ((v - 12) * 10).max(254);
    [channels(off), channels(on)]
}

fn channels(level: i32) -> Rgb {
    Rgb::new(
        level.clamp(1, 191) as u8,
        level.clamp(1, 199) as u8,
        level.clamp(33, 191) as u8,
    )
}
