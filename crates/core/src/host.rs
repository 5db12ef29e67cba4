//! Platform callbacks.
//!
//! The calculator core never draws, polls input devices or shows images
//! itself. A frontend implements [`Host`] and receives these requests
//! synchronously from inside the emulation loop.

use crate::colors::Rgb;
use crate::keypad::KeyMatrix;

pub trait Host {
    /// Refresh `keys` from the input devices and report whether the ON key
    /// is held. Called once per timer tick.
    fn poll_keys(&mut self, keys: &mut KeyMatrix) -> bool;

    /// A new frame is ready; the host may pull it with
    /// [`Calculator::render_argb`](crate::Calculator::render_argb).
    fn refresh_screen(&mut self);

    /// Palette entry `index` (0 cleared, 1 set) changed.
    fn set_color(&mut self, index: usize, rgb: Rgb);

    /// Show the faceplate image for a newly selected model.
    fn show_backdrop(&mut self, _name: &str) {}
}

/// Host that ignores every request. The ON key reads from the matrix.
#[derive(Debug, Default, Clone, Copy)]
pub struct Headless;

impl Host for Headless {
    fn poll_keys(&mut self, keys: &mut KeyMatrix) -> bool {
        keys.on_pressed()
    }

    fn refresh_screen(&mut self) {}

    fn set_color(&mut self, _index: usize, _rgb: Rgb) {}
}
