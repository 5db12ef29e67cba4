//! I/O port decoding and dispatch.
//!
//! Every model exposes its hardware on the same 8-bit port space, and the
//! same port number often means different things on different models (port
//! 02h is the contrast on a TI-85, the ROM page on a TI-83 and a hardware
//! status byte on a TI-83+). Decoding is therefore keyed on
//! `(model, port)` and yields a [`ReadPort`] or [`WritePort`] descriptor,
//! which [`Calculator`] then executes against its register file.
//!
//! The register file is a flat `[u8; 32]`; the `*` slot constants below
//! name its live entries.

use crate::host::Host;
use crate::memory::NO_DEVICE;
use crate::model::Model;
use crate::Calculator;

/// Size of the port register file.
pub const PORT_COUNT: usize = 32;

/// TI-85/86 video buffer base in RAM (`x?AAAAAA`).
pub const LCDBUF: usize = 0;
/// Keypad row select (`xKKKKKKK`).
pub const KEYPAD: usize = 1;
/// TI-85/86 contrast.
pub const CONTRAST: usize = 2;
/// Interrupt and power control (`xxx?LTSK`).
pub const CONTROL: usize = 3;
/// TI-85 LCD control.
pub const LCDCTRL: usize = 4;
pub const ROMPAGE: usize = 5;
/// Power register; bit 0 is the memory-map select on the TI-83 and later.
pub const POWER: usize = 6;
pub const LINK: usize = 7;
pub const ROMPAGE2: usize = 8;
/// Interrupt status (`0000KTLO`), rebuilt every timer tick.
pub const STATUS: usize = 15;
/// C000h RAM page (TI-83+ SE, TI-84+), flash protect on the TI-83+.
pub const ROMPAGE3: usize = 16;

/// CONTROL: timer interrupt enable.
pub const CTRL_TIMER_IRQ: u8 = 0x04;
/// CONTROL: video interrupt enable.
pub const CTRL_VIDEO_IRQ: u8 = 0x02;
/// CONTROL: ON key interrupt enable.
pub const CTRL_ON_IRQ: u8 = 0x01;
/// CONTROL: LCD powered.
pub const CTRL_LCD_ON: u8 = 0x08;

/// STATUS: ON key released.
pub const STATUS_ON_UP: u8 = 0x08;
/// STATUS: pending interrupt bits.
pub const STATUS_IRQ_MASK: u8 = 0x07;

/// What a port read returns.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReadPort {
    /// AND of the keypad rows selected by KEYPAD.
    Keypad,
    Status,
    /// Register file entry, verbatim.
    Slot(usize),
    LcdStatus,
    LcdData,
    /// Fixed identification byte.
    Value(u8),
    /// TI-83+ hardware status: battery good, model bits, flash protect.
    FlashStatus,
}

/// What a port write does.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WritePort {
    Keypad,
    /// Set CONTROL and acknowledge status bits it disables.
    Control,
    /// Store only.
    Slot(usize),
    /// Store, then recompute the bank windows.
    Bank(usize),
    /// TI-85/86 contrast, recomputes the palette.
    Contrast,
    /// Link lines on the TI-85/86/82.
    Link,
    /// TI-83 link lines plus the extra ROM bank bit.
    LinkBank,
    /// Flash models: link assist bits.
    LinkAssist,
    LcdCommand,
    LcdData,
}

/// Decode a port read for `model`. `None` means nothing answers.
pub fn decode_read(model: Model, port: u8) -> Option<ReadPort> {
    use Model::*;
    use ReadPort::*;

    let r = match (model, port) {
        (_, 0x01) => Keypad,
        (_, 0x03) => Status,

        (Ti85, 0x00 | 0x02 | 0x04 | 0x05 | 0x06) => Slot(usize::from(port)),
        (Ti86, 0x00 | 0x02 | 0x05) => Slot(usize::from(port)),
        (Ti86, 0x04) => Slot(POWER),
        (Ti86, 0x06) => Slot(ROMPAGE2),
        (Ti85 | Ti86, 0x07) => Slot(LINK),

        (Ti82 | Ti83, 0x00) => Slot(LINK),
        (Ti82 | Ti83, 0x02) => Slot(ROMPAGE),
        (Ti83, 0x04) => Slot(LCDCTRL),
        (Ti83, 0x14) => Value(0x01),

        (Ti83Plus | Ti83PlusSe | Ti84Plus | Ti84PlusSe, p) => match (model, p) {
            (_, 0x00) => Slot(LINK),
            (_, 0x04) => Status,
            (_, 0x06) => Slot(ROMPAGE),
            (_, 0x07) => Slot(ROMPAGE2),
            (Ti83Plus, 0x02) => FlashStatus,
            (Ti83PlusSe, 0x02) => Value(0x81),
            (_, 0x02) => Value(0xA1),
            (Ti83PlusSe | Ti84PlusSe, 0x21) => Value(0x01),
            (Ti84Plus, 0x21) => Value(0x00),
            (Ti83PlusSe | Ti84Plus | Ti84PlusSe, 0x05) => Slot(ROMPAGE3),
            (_, 0x10) => LcdStatus,
            (_, 0x11) => LcdData,
            _ => return None,
        },

        (Ti82 | Ti83, 0x10) => LcdStatus,
        (Ti82 | Ti83, 0x11) => LcdData,
        _ => return None,
    };
    Some(r)
}

/// Decode a port write for `model`. `None` means the write is dropped.
pub fn decode_write(model: Model, port: u8) -> Option<WritePort> {
    use Model::*;
    use WritePort::*;

    let w = match (model, port) {
        (_, 0x01) => Keypad,
        (_, 0x03) => Control,

        (Ti85 | Ti86, 0x00) => Slot(LCDBUF),
        (Ti85 | Ti86, 0x02) => Contrast,
        (Ti85 | Ti86, 0x07) => Link,
        (Ti85, 0x04) => Slot(LCDCTRL),
        (Ti85, 0x05) => Bank(ROMPAGE),
        (Ti85, 0x06) => Slot(POWER),
        (Ti86, 0x04) => Slot(POWER),
        (Ti86, 0x05) => Bank(ROMPAGE),
        (Ti86, 0x06) => Bank(ROMPAGE2),

        (Ti82, 0x00) => Link,
        (Ti82, 0x02) => Bank(ROMPAGE),

        (Ti83, 0x00) => LinkBank,
        (Ti83, 0x02) => Bank(ROMPAGE),
        (Ti83, 0x04) => Bank(POWER),

        (Ti83Plus | Ti83PlusSe | Ti84Plus | Ti84PlusSe, 0x00) => LinkAssist,
        (Ti83Plus | Ti83PlusSe | Ti84Plus | Ti84PlusSe, 0x04) => Bank(POWER),
        (Ti83Plus | Ti83PlusSe | Ti84Plus | Ti84PlusSe, 0x06) => Bank(ROMPAGE),
        (Ti83Plus | Ti83PlusSe | Ti84Plus | Ti84PlusSe, 0x07) => Bank(ROMPAGE2),
        (Ti83Plus, 0x05) => Slot(ROMPAGE3),
        (Ti83PlusSe | Ti84Plus | Ti84PlusSe, 0x05) => Bank(ROMPAGE3),

        (m, 0x10) if m.is_ti83_family() => LcdCommand,
        (m, 0x11) if m.is_ti83_family() => LcdData,
        _ => return None,
    };
    Some(w)
}

impl<H: Host> Calculator<H> {
    /// Port read as seen by the Z80. Only the low 8 address bits decode.
    pub fn read_port(&mut self, port: u16) -> u8 {
        let port = port as u8;
        let Some(model) = self.model() else {
            return NO_DEVICE;
        };

        match decode_read(model, port) {
            Some(ReadPort::Keypad) => self.keys.scan(self.ports[KEYPAD]),
            Some(ReadPort::Status) => self.ports[STATUS],
            Some(ReadPort::Slot(slot)) => self.ports[slot],
            Some(ReadPort::LcdStatus) => self.lcd.status,
            Some(ReadPort::LcdData) => self.lcd.read(),
            Some(ReadPort::Value(v)) => v,
            Some(ReadPort::FlashStatus) => 0x0B | ((self.ports[ROMPAGE3] & 0x07) << 3),
            None => {
                if self.settings().log_ports() {
                    log::warn!("{model}: read from unmapped port {port:02X}h");
                }
                NO_DEVICE
            }
        }
    }

    /// Port write as seen by the Z80.
    pub fn write_port(&mut self, port: u16, v: u8) {
        let port = port as u8;
        let Some(model) = self.model() else {
            return;
        };

        match decode_write(model, port) {
            Some(WritePort::Keypad) => self.ports[KEYPAD] = v,
            Some(WritePort::Control) => {
                self.ports[CONTROL] = v;
                self.ports[STATUS] &= v | !STATUS_IRQ_MASK;
            }
            Some(WritePort::Slot(slot)) => self.ports[slot] = v,
            Some(WritePort::Bank(slot)) => {
                self.ports[slot] = v;
                self.remap();
            }
            Some(WritePort::Contrast) => {
                self.ports[CONTRAST] = v & 0x1F;
                self.set_palette(crate::colors::ti85_colors(v));
            }
            Some(WritePort::Link) => {
                self.ports[LINK] = (self.ports[LINK] & 0xF3) | (v & 0x0C);
            }
            Some(WritePort::LinkBank) => {
                // Bit 4 survives into LINK and selects the upper ROM bank
                self.ports[LINK] = ((v ^ 0x03) | 0x0C) & 0x1F;
                self.remap();
            }
            Some(WritePort::LinkAssist) => {
                self.ports[LINK] = ((v & 0x03) << 4) | (v & 0x04) | 0x03;
            }
            Some(WritePort::LcdCommand) => {
                if let Some(palette) = self.lcd.command(v) {
                    self.set_palette(palette);
                }
            }
            Some(WritePort::LcdData) => self.lcd.write(v),
            None => {
                if self.settings().log_ports() {
                    log::warn!("{model}: write {v:02X}h to unmapped port {port:02X}h");
                }
            }
        }
    }
}
