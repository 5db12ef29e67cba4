//! Keyboard matrix.
//!
//! Eight active-low row bytes: a cleared bit means the key at that
//! row/column is held. The CPU selects rows 0..6 through the keypad port
//! (cleared select bit = row driven) and reads back the AND of the driven
//! rows. Row 7 holds the ON key, which is wired to the status port instead.

/// Row and column mask of the ON key.
pub const ON_KEY: (usize, u8) = (7, 0x08);

/// Rows visible through the keypad port.
const SCANNED_ROWS: usize = 7;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct KeyMatrix {
    rows: [u8; 8],
}

impl KeyMatrix {
    pub fn new() -> Self {
        KeyMatrix { rows: [0xFF; 8] }
    }

    /// Release every key.
    pub fn reset(&mut self) {
        self.rows = [0xFF; 8];
    }

    pub fn press(&mut self, row: usize, mask: u8) {
        if let Some(r) = self.rows.get_mut(row) {
            *r &= !mask;
        }
    }

    pub fn release(&mut self, row: usize, mask: u8) {
        if let Some(r) = self.rows.get_mut(row) {
            *r |= mask;
        }
    }

    pub fn set(&mut self, row: usize, mask: u8, pressed: bool) {
        if pressed {
            self.press(row, mask);
        } else {
            self.release(row, mask);
        }
    }

    pub fn row(&self, row: usize) -> u8 {
        self.rows.get(row).copied().unwrap_or(0xFF)
    }

    /// Port read for a given row-select byte.
    pub fn scan(&self, select: u8) -> u8 {
        self.rows[..SCANNED_ROWS]
            .iter()
            .enumerate()
            .filter(|(i, _)| select & (1 << i) == 0)
            .fold(0xFF, |acc, (_, r)| acc & r)
    }

    pub fn on_pressed(&self) -> bool {
        self.rows[ON_KEY.0] & ON_KEY.1 == 0
    }
}

impl Default for KeyMatrix {
    fn default() -> Self {
        Self::new()
    }
}
