//! TI-82/83/84 LCD controller emulation.
//!
//! The controller is driven through two ports: a command port (cursor
//! addressing, word size, auto-increment direction, contrast) and a data
//! port that reads or writes video memory at the cursor. Video memory is
//! 64 rows of 16 bytes, of which the panel shows the first 96 pixels.
//!
//! In 8-bit mode the column cursor addresses whole bytes (0..=14). In 6-bit
//! mode it addresses 6-pixel groups (0..=19) that straddle byte boundaries.
//! After every command the next data read returns a dummy zero, as on the
//! real part.

use crate::colors::{ti83_colors, Palette};
use crate::savestate::LcdState;

/// Bytes per video memory row.
pub const ROW_BYTES: usize = 16;
/// Video memory rows.
pub const ROWS: usize = 64;
/// Video memory size.
pub const VRAM_SIZE: usize = ROW_BYTES * ROWS;

/// Status bit: controller busy (never reported).
pub const STATUS_BUSY: u8 = 0x80;
/// Status bit: 8-bit word mode.
pub const STATUS_8BIT: u8 = 0x40;
/// Status bit: display on.
pub const STATUS_ON: u8 = 0x20;
/// Status bits: auto-increment direction.
pub const STATUS_DIR: u8 = 0x03;

/// Contrast after reset.
pub const DEFAULT_CONTRAST: u8 = 0x1F;

/// Cursor movement after a data access.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    RowDown,
    RowUp,
    ColDown,
    ColUp,
}

impl Direction {
    fn from_status(status: u8) -> Self {
        match status & STATUS_DIR {
            0 => Direction::RowDown,
            1 => Direction::RowUp,
            2 => Direction::ColDown,
            _ => Direction::ColUp,
        }
    }
}

pub struct Ti83Lcd {
    buffer: [u8; VRAM_SIZE],
    /// Word size, display on, direction
    pub status: u8,
    row: u8,
    col: u8,
    /// Next data read returns 0
    delay: bool,
    scroll: u8,
    contrast: u8,
}

impl Ti83Lcd {
    pub fn new() -> Self {
        Ti83Lcd {
            buffer: [0; VRAM_SIZE],
            status: 0,
            row: 0,
            col: 0,
            delay: false,
            scroll: 0,
            contrast: DEFAULT_CONTRAST,
        }
    }

    pub fn reset(&mut self) {
        *self = Self::new();
    }

    pub fn buffer(&self) -> &[u8; VRAM_SIZE] {
        &self.buffer
    }

    pub fn row(&self) -> u8 {
        self.row
    }

    pub fn col(&self) -> u8 {
        self.col
    }

    pub fn scroll(&self) -> u8 {
        self.scroll
    }

    pub fn contrast(&self) -> u8 {
        self.contrast
    }

    pub fn is_on(&self) -> bool {
        self.status & STATUS_ON != 0
    }

    pub fn is_8bit(&self) -> bool {
        self.status & STATUS_8BIT != 0
    }

    pub fn direction(&self) -> Direction {
        Direction::from_status(self.status)
    }

    /// Highest column in the current word size.
    fn last_col(&self) -> u8 {
        if self.is_8bit() { 14 } else { 19 }
    }

    /// Command port write. Returns a new palette when the contrast changed.
    pub fn command(&mut self, v: u8) -> Option<Palette> {
        self.delay = true;

        match v {
            0xC0..=0xFF => {
                self.contrast = v & 0x3F;
                return Some(ti83_colors(self.contrast));
            }
            0x80..=0xBF => self.row = v & 0x3F,
            0x40..=0x7F => self.scroll = v & 0x3F,
            0x20..=0x3F => self.col = v & 0x0F,
            0x00 => self.status &= !STATUS_8BIT,
            0x01 => self.status |= STATUS_8BIT,
            0x02 => self.status &= !STATUS_ON,
            0x03 => self.status |= STATUS_ON,
            0x04..=0x07 => self.status = (self.status & !STATUS_DIR) | (v - 4),
            _ => {}
        }
        None
    }

    /// Data port read.
    pub fn read(&mut self) -> u8 {
        if self.delay {
            self.delay = false;
            return 0x00;
        }

        let w = self.last_col();
        let v = if self.col > w {
            0x00
        } else if self.is_8bit() {
            self.buffer[self.offset(usize::from(self.col))]
        } else {
            let (p, j) = self.six_bit_pos();
            let p0 = u32::from(self.buffer[p]);
            let p1 = u32::from(self.buffer[p + 1]);
            (((p0 << j) | (p1 >> (8 - j))) >> 2) as u8
        };

        // Column increment on read steps past the last column and restarts
        // at 0 from anywhere else.
        let up = if self.col == w { self.col + 1 } else { 0 };
        self.advance(w, up);
        v
    }

    /// Data port write.
    pub fn write(&mut self, v: u8) {
        let w = self.last_col();
        if self.col <= w {
            if self.is_8bit() {
                let p = self.offset(usize::from(self.col));
                self.buffer[p] = v;
            } else {
                let (p, j) = self.six_bit_pos();
                let bits = u32::from(v) << 2;
                let p0 = u32::from(self.buffer[p]);
                self.buffer[p] = ((p0 & !(0xFC >> j)) | (bits >> j)) as u8;
                if j != 0 {
                    let j = 8 - j;
                    let p1 = u32::from(self.buffer[p + 1]);
                    self.buffer[p + 1] = ((p1 & !(0xFC << j)) | (bits << j)) as u8;
                }
            }
        }

        let up = if self.col == w { 0 } else { self.col + 1 };
        self.advance(w, up);
    }

    /// Move the cursor; `up` is the column taken in the increment direction.
    fn advance(&mut self, w: u8, up: u8) {
        match self.direction() {
            Direction::RowDown => self.row = if self.row > 0 { self.row - 1 } else { 63 },
            Direction::RowUp => self.row = if self.row < 63 { self.row + 1 } else { 0 },
            Direction::ColDown => self.col = (if self.col > 0 { self.col - 1 } else { w }) & 31,
            Direction::ColUp => self.col = up & 31,
        }
    }

    fn offset(&self, byte: usize) -> usize {
        usize::from(self.row & 0x3F) * ROW_BYTES + byte
    }

    /// Byte offset and bit shift of the 6-bit group under the cursor.
    fn six_bit_pos(&self) -> (usize, u32) {
        let bit = usize::from(self.col) * 6;
        (self.offset(bit >> 3), (bit & 7) as u32)
    }

    pub fn save_state(&self) -> LcdState {
        LcdState {
            buffer: self.buffer,
            status: self.status,
            row: self.row,
            col: self.col,
            delay: self.delay,
            scroll: self.scroll,
            contrast: self.contrast,
        }
    }

    pub fn load_state(&mut self, s: &LcdState) {
        self.buffer = s.buffer;
        self.status = s.status;
        self.row = s.row & 0x3F;
        self.col = s.col & 31;
        self.delay = s.delay;
        self.scroll = s.scroll & 0x3F;
        self.contrast = s.contrast & 0x3F;
    }
}

impl Default for Ti83Lcd {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Controller in the given word size, cursor at (row, col), delay consumed.
    fn lcd_at(eight_bit: bool, dir: u8, row: u8, col: u8) -> Ti83Lcd {
        let mut lcd = Ti83Lcd::new();
        lcd.command(if eight_bit { 0x01 } else { 0x00 });
        lcd.command(0x04 + dir);
        lcd.command(0x80 | row);
        lcd.command(0x20 | col);
        lcd.read();
        lcd
    }

    #[test]
    fn test_reset_state() {
        let mut lcd = Ti83Lcd::new();
        lcd.command(0x03);
        lcd.command(0x85);
        lcd.write(0xAA);
        lcd.reset();
        assert_eq!(lcd.status, 0);
        assert_eq!((lcd.row(), lcd.col(), lcd.scroll()), (0, 0, 0));
        assert_eq!(lcd.contrast(), DEFAULT_CONTRAST);
        assert!(lcd.buffer().iter().all(|&b| b == 0));
    }

    #[test]
    fn test_command_decoding() {
        let mut lcd = Ti83Lcd::new();
        assert_eq!(lcd.command(0xF5), Some(ti83_colors(0x35)));
        assert_eq!(lcd.contrast(), 0x35);
        lcd.command(0xBF);
        assert_eq!(lcd.row(), 0x3F);
        lcd.command(0x45);
        assert_eq!(lcd.scroll(), 0x05);
        lcd.command(0x3F);
        assert_eq!(lcd.col(), 0x0F);
        lcd.command(0x01);
        assert!(lcd.is_8bit());
        lcd.command(0x03);
        assert!(lcd.is_on());
        lcd.command(0x06);
        assert_eq!(lcd.direction(), Direction::ColDown);
        lcd.command(0x02);
        lcd.command(0x00);
        assert!(!lcd.is_on());
        assert!(!lcd.is_8bit());
        assert_eq!(lcd.direction(), Direction::ColDown);
        // Unassigned low commands only arm the delay
        assert_eq!(lcd.command(0x1A), None);
        assert_eq!(lcd.status & STATUS_DIR, 2);
    }

    #[test]
    fn test_read_after_command_is_delayed() {
        let mut lcd = Ti83Lcd::new();
        lcd.command(0x01);
        lcd.command(0x05); // row increment
        lcd.command(0x80);
        lcd.command(0x20);
        lcd.write(0x5A);
        lcd.command(0x80);
        assert_eq!(lcd.read(), 0x00);
        assert_eq!(lcd.row(), 0);
        assert_eq!(lcd.read(), 0x5A);
        assert_eq!(lcd.row(), 1);
    }

    #[test]
    fn test_8bit_round_trip() {
        for col in 0..=14u8 {
            let mut lcd = lcd_at(true, 1, 10, col);
            lcd.write(0xC3 ^ col);
            lcd.command(0x80 | 10);
            lcd.read();
            assert_eq!(lcd.read(), 0xC3 ^ col);
        }
    }

    #[test]
    fn test_8bit_out_of_range_column() {
        let mut lcd = lcd_at(true, 1, 0, 15);
        lcd.write(0x77);
        assert!(lcd.buffer().iter().all(|&b| b == 0));
        lcd.command(0x80);
        lcd.command(0x2F);
        lcd.read();
        assert_eq!(lcd.read(), 0x00);
    }

    #[test]
    fn test_6bit_out_of_range_column() {
        let mut lcd = lcd_at(false, 1, 4, 0);
        lcd.buffer[4 * ROW_BYTES + 15] = 0xA5;
        for col in [20u8, 25, 31] {
            lcd.col = col;
            lcd.write(0x3F);
            assert_eq!(lcd.row(), 5);
            lcd.command(0x84);
            lcd.col = col;
            lcd.read();
            assert_eq!(lcd.read(), 0x00, "col {col}");
            lcd.command(0x84);
        }
        let row = &lcd.buffer()[4 * ROW_BYTES..5 * ROW_BYTES];
        assert!(row[..15].iter().all(|&b| b == 0));
        assert_eq!(row[15], 0xA5);
    }

    #[test]
    fn test_6bit_packing() {
        // Group 1 occupies bits 6..11 of the row: low two bits of byte 0
        // and the high four of byte 1.
        let mut lcd = lcd_at(false, 1, 2, 1);
        lcd.buffer[2 * ROW_BYTES] = 0xFF;
        lcd.buffer[2 * ROW_BYTES + 1] = 0xFF;
        lcd.write(0x00);
        assert_eq!(lcd.buffer[2 * ROW_BYTES], 0xFC);
        assert_eq!(lcd.buffer[2 * ROW_BYTES + 1], 0x0F);

        lcd.command(0x82);
        lcd.command(0x21);
        lcd.read();
        lcd.write(0x2D);
        assert_eq!(lcd.buffer[2 * ROW_BYTES], 0xFE);
        assert_eq!(lcd.buffer[2 * ROW_BYTES + 1], 0xDF);

        lcd.command(0x82);
        lcd.command(0x21);
        lcd.read();
        // Bits above the group come from its left neighbour
        assert_eq!(lcd.read(), 0xED);
        assert_eq!(lcd.buffer[2 * ROW_BYTES] >> 2, 0x3F);
    }

    #[test]
    fn test_6bit_round_trip_all_columns() {
        for col in 0..=19u8 {
            let mut lcd = lcd_at(false, 1, 63, 0);
            lcd.col = col;
            lcd.write(0x15 + col);
            lcd.command(0x80 | 63);
            lcd.col = col;
            lcd.read();
            assert_eq!(lcd.read(), 0x15 + col, "col {col}");
        }
    }

    #[test]
    fn test_column_wrap_asymmetry() {
        // Write: increment wraps the last column back to 0
        let mut lcd = lcd_at(true, 3, 0, 14);
        lcd.write(0);
        assert_eq!(lcd.col(), 0);
        lcd.write(0);
        assert_eq!(lcd.col(), 1);

        // Decrement wraps 0 to the last column, for reads and writes
        let mut lcd = lcd_at(false, 2, 0, 0);
        lcd.write(0);
        assert_eq!(lcd.col(), 19);
        lcd.col = 0;
        lcd.read();
        assert_eq!(lcd.col(), 19);

        // Read: increment steps past the edge, anything else restarts at 0
        let mut lcd = lcd_at(true, 3, 0, 14);
        lcd.read();
        assert_eq!(lcd.col(), 15);
        lcd.col = 5;
        lcd.read();
        assert_eq!(lcd.col(), 0);
    }

    #[test]
    fn test_row_wrap() {
        let mut lcd = lcd_at(true, 0, 0, 0);
        lcd.write(0);
        assert_eq!(lcd.row(), 63);
        let mut lcd = lcd_at(true, 1, 63, 0);
        lcd.read();
        assert_eq!(lcd.row(), 0);
    }

    #[test]
    fn test_state_round_trip() {
        let mut lcd = lcd_at(false, 2, 7, 3);
        lcd.command(0xE0);
        lcd.write(0x3F);
        let saved = lcd.save_state();

        let mut other = Ti83Lcd::new();
        other.load_state(&saved);
        assert_eq!(other.buffer()[..], lcd.buffer()[..]);
        assert_eq!(other.save_state(), saved);

        // Cursor fields are masked to their register widths
        let wide = LcdState { row: 0xFF, col: 0xFF, scroll: 0xFF, contrast: 0xFF, ..saved };
        other.load_state(&wide);
        assert_eq!((other.row(), other.col(), other.scroll(), other.contrast()), (63, 31, 63, 63));
    }
}
