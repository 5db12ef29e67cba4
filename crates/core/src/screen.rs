//! Frame extraction.
//!
//! Turns the current video memory into an ARGB8888 pixel buffer for the
//! host. The TI-85 and TI-86 have no video RAM of their own: the screen is
//! 1 KB of system RAM, located by the LCDBUF port relative to the C000h
//! window. Everything else reads the LCD controller's buffer, of which
//! only the first 96 columns are visible.

use crate::colors::{Rgb, PIXEL_OFF, PIXEL_ON};
use crate::host::Host;
use crate::lcd::{ROWS, ROW_BYTES};
use crate::ports::LCDBUF;
use crate::Calculator;

/// Screen height in pixels, all models.
pub const SCREEN_HEIGHT: usize = ROWS;
/// Colour of an unpowered panel.
pub const SLEEP_COLOR: Rgb = Rgb::new(0xB5, 0xCB, 0xBD);

impl<H: Host> Calculator<H> {
    /// Visible `(width, height)` for the active model.
    pub fn screen_size(&self) -> (usize, usize) {
        let width = self.model().map_or(0, |m| m.screen_width());
        (width, SCREEN_HEIGHT)
    }

    /// Fill `out` row-major with ARGB pixels and return the number of
    /// pixels written. Stops early if `out` is smaller than the screen.
    pub fn render_argb(&self, out: &mut [u32]) -> usize {
        let Some(model) = self.model() else {
            return 0;
        };
        let (width, height) = self.screen_size();
        let n = out.len().min(width * height);

        if self.is_sleeping() {
            out[..n].fill(SLEEP_COLOR.to_argb());
            return n;
        }

        let colors = [self.palette()[PIXEL_OFF].to_argb(), self.palette()[PIXEL_ON].to_argb()];
        let base = usize::from(self.ports[LCDBUF] & 0x3F) << 8;
        for (i, px) in out[..n].iter_mut().enumerate() {
            let (x, y) = (i % width, i / width);
            let offset = y * ROW_BYTES + x / 8;
            let byte = if model.is_ti85_family() {
                self.mem.peek_linear(3, base + offset)
            } else {
                self.lcd.buffer()[offset]
            };
            let set = byte & (0x80 >> (x & 7)) != 0;
            *px = colors[usize::from(set)];
        }
        n
    }

    /// Render a whole frame into a new buffer.
    pub fn frame(&self) -> Vec<u32> {
        let (width, height) = self.screen_size();
        let mut pixels = vec![0u32; width * height];
        self.render_argb(&mut pixels);
        pixels
    }
}
