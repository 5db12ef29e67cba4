//! # ti8x-core
//!
//! Hardware emulation core for the Z80-based TI graphing calculators: TI-85,
//! TI-86, TI-82, TI-83, TI-83+, TI-83+ Silver Edition, TI-84+ and TI-84+
//! Silver Edition.
//!
//! All eight models run a 6 MHz Z80 against 16 KB bank windows into ROM and
//! RAM, an 8-bit port space and a monochrome LCD. They differ in memory
//! sizes, in how the windows are switched, in the meaning of most port
//! numbers, and in whether the screen is scanned out of RAM (TI-85/86) or
//! kept by a separate LCD controller (everything else).
//!
//! The Z80 instruction engine and the platform frontend are not part of this
//! crate; they plug in through [`CpuEngine`] and [`Host`].
//!
//! ## Architecture
//!
//! - [`Calculator`]: Hardware context (memory, ports, LCD, keypad, timer tick)
//! - [`Emulator`]: Session wrapper pairing a [`CpuEngine`] with a [`Calculator`]
//! - [`model`]: Per-model sizes, file names and family predicates
//! - [`memory`]: ROM/RAM arenas, bank windows and the four mappers
//! - [`ports`]: `(model, port)` decoding and register dispatch
//! - [`lcd`]: TI-82/83/84 LCD controller
//! - [`colors`]: Contrast to palette conversion
//! - [`screen`]: ARGB frame extraction
//! - [`savestate`]: Snapshot files
//!
//! ## Timing
//!
//! The engine calls [`Bus::tick`] every [`TIMER_CLK`] cycles (200 Hz). Each
//! tick rebuilds the interrupt status port and, scaled by
//! [`Settings::update_period`], asks the host to refresh the screen on
//! every fourth tick.

pub mod colors;
pub mod config;
pub mod cpu;
pub mod emulator;
pub mod error;
pub mod host;
pub mod keypad;
pub mod lcd;
pub mod memory;
pub mod model;
pub mod ports;
pub mod savestate;
pub mod screen;

use std::io::Read;
use std::path::{Path, PathBuf};

pub use colors::{Palette, Rgb};
pub use config::{Compression, Settings};
pub use cpu::{Bus, CpuEngine, Interrupt, Z80Registers};
pub use emulator::Emulator;
pub use error::{Error, Result};
pub use host::{Headless, Host};
pub use keypad::KeyMatrix;
pub use lcd::Ti83Lcd;
pub use memory::Memory;
pub use model::Model;

use memory::{BankRegs, NO_DEVICE};
use ports::*;
use savestate::Snapshot;

/// Z80 clock: 6 MHz
pub const CPU_CLOCK: u32 = 6_000_000;
/// Screen refresh period in CPU cycles (50 Hz)
pub const VIDEO_CLK: u32 = CPU_CLOCK / 50;
/// Timer interrupt period in CPU cycles (200 Hz)
pub const TIMER_CLK: u32 = CPU_CLOCK / 200;

/// Update credit needed for one screen refresh (four ticks at 100%).
pub const REFRESH_THRESHOLD: u32 = 400;
/// Timer ticks during which the ON key counts as held after a reset.
pub const STARTUP_ON_TICKS: u8 = 128;

/// TI-83+ ROM area emulating the certificate/program EEPROM.
const TI83P_EEPROM: std::ops::Range<usize> = 0x78000..0x7C000;

/// Calculator hardware.
///
/// Owns both memory arenas, the port register file, the LCD controller and
/// the key matrix. The CPU engine drives it through [`Bus`]; the host is
/// reached through `H`.
pub struct Calculator<H: Host> {
    pub host: H,
    pub mem: Memory,
    /// Port register file, see the slot constants in [`ports`]
    pub ports: [u8; PORT_COUNT],
    pub lcd: Ti83Lcd,
    pub keys: KeyMatrix,
    /// Active model, `None` until the first successful reset
    model: Option<Model>,
    /// Ticks left in the post-reset ON key grace period
    startup_on: u8,
    /// Leave the run loop at the next tick
    exit_now: bool,
    /// Screen update credit, see [`REFRESH_THRESHOLD`]
    ucount: u32,
    palette: Palette,
    settings: Settings,
}

impl<H: Host> Calculator<H> {
    /// Allocate the arenas. No model is active until [`reset`](Self::reset).
    pub fn new(settings: Settings, host: H) -> Self {
        if settings.info() {
            log::info!(
                "allocating {}kB+{}kB for RAM+ROM",
                model::largest_ram() >> 10,
                model::largest_rom() >> 10
            );
        }
        Calculator {
            host,
            mem: Memory::new(),
            ports: [0; PORT_COUNT],
            lcd: Ti83Lcd::new(),
            keys: KeyMatrix::new(),
            model: None,
            startup_on: 0,
            exit_now: false,
            ucount: 0,
            palette: [Rgb::default(); 2],
            settings,
        }
    }

    pub fn model(&self) -> Option<Model> {
        self.model
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    pub fn palette(&self) -> &Palette {
        &self.palette
    }

    pub fn startup_on(&self) -> u8 {
        self.startup_on
    }

    pub fn exit_requested(&self) -> bool {
        self.exit_now
    }

    /// Ask the run loop to stop at the next tick.
    pub fn request_exit(&mut self) {
        self.exit_now = true;
    }

    pub(crate) fn clear_exit(&mut self) {
        self.exit_now = false;
    }

    /// Power-down state: only the ON key interrupt enabled.
    pub fn is_sleeping(&self) -> bool {
        self.ports[CONTROL] & 0x0F == CTRL_ON_IRQ
    }

    /// ROM image for `model`. A directory in the settings is searched for
    /// the model's standard file name.
    pub fn rom_path(&self, model: Model) -> PathBuf {
        let p = &self.settings.rom_path;
        if p.is_dir() {
            p.join(model.config().rom_file)
        } else {
            p.clone()
        }
    }

    // --- Reset ---

    /// Reset the hardware to `model`, loading its ROM image if the model
    /// changes. If the image cannot be loaded the previous model is reset
    /// instead and [`Error::ModelRefused`] is returned.
    pub fn reset(&mut self, model: Model) -> Result<()> {
        if self.model == Some(model) {
            self.reset_registers(model);
            return Ok(());
        }
        self.load_rom(model)
    }

    /// Reset to `model`, reloading its ROM image even if it is already the
    /// active model.
    pub fn power_on(&mut self, model: Model) -> Result<()> {
        self.load_rom(model)
    }

    fn load_rom(&mut self, model: Model) -> Result<()> {
        let path = self.rom_path(model);
        let image = read_rom(&path, model);
        if self.settings.info() {
            log::info!(
                "loading {}...{}",
                path.display(),
                if image.is_ok() { "OK" } else { "FAILED" }
            );
        }
        self.switch_model(model, image)
    }

    /// Reset to `model` with a ROM image supplied by the caller.
    pub fn reset_with_rom(&mut self, model: Model, image: &[u8]) -> Result<()> {
        let image = check_rom(Path::new("<memory>"), model, image.to_vec());
        self.switch_model(model, image)
    }

    fn switch_model(&mut self, model: Model, image: Result<Vec<u8>>) -> Result<()> {
        let image = match image {
            Ok(image) => image,
            Err(e) => {
                let current = self.model;
                if let Some(prev) = current {
                    log::warn!("staying on {prev}: {e}");
                    self.reset_registers(prev);
                }
                return Err(Error::ModelRefused { requested: model, current, source: Box::new(e) });
            }
        };

        let cfg = model.config();
        self.host.show_backdrop(cfg.backdrop);
        self.mem.set_sizes(cfg.rom_size, cfg.ram_size);
        self.mem.rom[..cfg.rom_size].copy_from_slice(&image);
        self.mem.ram_mut().fill(NO_DEVICE);
        if model == Model::Ti83Plus {
            self.mem.rom[TI83P_EEPROM.start] = 0x00;
            self.mem.rom[TI83P_EEPROM.start + 1..TI83P_EEPROM.end].fill(0xFF);
        }
        self.model = Some(model);
        self.reset_registers(model);
        Ok(())
    }

    /// Power-on register values and memory layout.
    fn reset_registers(&mut self, model: Model) {
        self.keys.reset();
        self.ports = [0; PORT_COUNT];
        self.startup_on = STARTUP_ON_TICKS;
        self.ports[LCDBUF] = 0x3C;
        self.ports[LCDCTRL] = 0x16;
        self.ports[LINK] = 0xC3;
        self.ports[STATUS] = STATUS_ON_UP;

        if model == Model::Ti83 {
            self.ports[LINK] = 0x0C;
            self.ports[ROMPAGE] = 0x99;
        } else if model.is_flash() {
            self.ports[LINK] = 0x03;
            self.ports[POWER] = 0x76;
            self.ports[ROMPAGE] = 0x01;
            self.ports[ROMPAGE2] = 0x41;
        }

        self.remap();
        if model.is_ti83_family() {
            self.lcd.reset();
        }
        self.refresh_palette();
    }

    // --- Banking and colours ---

    pub fn bank_regs(&self) -> BankRegs {
        BankRegs {
            link: self.ports[LINK],
            rom_page: self.ports[ROMPAGE],
            rom_page2: self.ports[ROMPAGE2],
            rom_page3: self.ports[ROMPAGE3],
            power: self.ports[POWER],
        }
    }

    /// Recompute all four windows from the register file.
    pub(crate) fn remap(&mut self) {
        if let Some(model) = self.model {
            let regs = self.bank_regs();
            self.mem.remap(model.mapper_family(), &regs);
        }
    }

    pub(crate) fn set_palette(&mut self, palette: Palette) {
        self.palette = palette;
        for (i, rgb) in palette.into_iter().enumerate() {
            self.host.set_color(i, rgb);
        }
    }

    /// Rederive the palette from whichever contrast register the model uses.
    pub fn refresh_palette(&mut self) {
        match self.model {
            Some(m) if m.is_ti83_family() => {
                self.set_palette(colors::ti83_colors(self.lcd.contrast()))
            }
            Some(_) => self.set_palette(colors::ti85_colors(self.ports[CONTRAST])),
            None => {}
        }
    }

    // --- Timer tick ---

    /// Periodic hardware update, once per [`TIMER_CLK`] cycles.
    pub fn tick(&mut self, halted: bool) -> Interrupt {
        // HALT while powered down means the calculator was switched off
        if self.startup_on == 0 && self.is_sleeping() && halted {
            self.exit_now = true;
        }

        let on = self.host.poll_keys(&mut self.keys) || self.startup_on > 0;
        self.startup_on = self.startup_on.saturating_sub(1);

        let ctrl = self.ports[CONTROL];
        let mut status = if on { 0 } else { STATUS_ON_UP };
        status |= ctrl & (CTRL_TIMER_IRQ | CTRL_VIDEO_IRQ);
        if on && ctrl & CTRL_ON_IRQ != 0 {
            status |= CTRL_ON_IRQ;
        }
        self.ports[STATUS] = status;

        if self.ucount >= REFRESH_THRESHOLD {
            self.ucount -= REFRESH_THRESHOLD;
            self.host.refresh_screen();
        }
        self.ucount += self.settings.update_period();

        if self.exit_now {
            Interrupt::Quit
        } else if status & STATUS_IRQ_MASK != 0 {
            Interrupt::Irq
        } else {
            Interrupt::None
        }
    }

    // --- Snapshots ---

    /// Capture the hardware state together with the engine's registers.
    pub fn snapshot(&self, registers: Z80Registers) -> Result<Snapshot> {
        let model = self.model.ok_or(Error::NotStarted)?;
        Ok(Snapshot {
            mode: model.tag() as i32,
            registers,
            ports: self.ports,
            lcd: self.lcd.save_state(),
            ram: self.mem.ram().to_vec(),
        })
    }

    /// Apply a snapshot body taken on the active model.
    pub fn restore(&mut self, s: &Snapshot) -> Result<()> {
        if s.ram.len() != self.mem.ram_size() {
            return Err(Error::Truncated("RAM"));
        }
        self.lcd.load_state(&s.lcd);
        self.mem.ram_mut().copy_from_slice(&s.ram);
        self.ports = s.ports;

        self.remap();
        self.refresh_palette();
        if !self.is_sleeping() {
            self.startup_on = 0;
        }
        Ok(())
    }
}

/// Read the first `rom_size` bytes of a ROM image file.
fn read_rom(path: &Path, model: Model) -> Result<Vec<u8>> {
    let file = std::fs::File::open(path)?;
    let mut data = Vec::with_capacity(model.rom_size());
    file.take(model.rom_size() as u64).read_to_end(&mut data)?;
    check_rom(path, model, data)
}

fn check_rom(path: &Path, model: Model, mut data: Vec<u8>) -> Result<Vec<u8>> {
    let expected = model.rom_size();
    if data.len() < expected {
        let actual = data.len();
        return Err(Error::RomSize { path: path.to_path_buf(), model, expected, actual });
    }
    data.truncate(expected);
    Ok(data)
}

impl<H: Host> Bus for Calculator<H> {
    #[inline(always)]
    fn read(&mut self, addr: u16) -> u8 {
        self.mem.read(addr)
    }

    #[inline(always)]
    fn write(&mut self, addr: u16, value: u8) {
        self.mem.write(addr, value)
    }

    fn input(&mut self, port: u16) -> u8 {
        self.read_port(port)
    }

    fn output(&mut self, port: u16, value: u8) {
        self.write_port(port, value)
    }

    fn tick(&mut self, halted: bool) -> Interrupt {
        Calculator::tick(self, halted)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Default)]
    struct Probe {
        on: bool,
        refreshes: u32,
        colors: Vec<(usize, Rgb)>,
        backdrops: Vec<String>,
    }

    impl Host for Probe {
        fn poll_keys(&mut self, _keys: &mut KeyMatrix) -> bool {
            self.on
        }

        fn refresh_screen(&mut self) {
            self.refreshes += 1;
        }

        fn set_color(&mut self, index: usize, rgb: Rgb) {
            self.colors.push((index, rgb));
        }

        fn show_backdrop(&mut self, name: &str) {
            self.backdrops.push(name.to_string());
        }
    }

    fn rom_image(model: Model) -> Vec<u8> {
        (0..model.rom_size()).map(|i| (i >> 14) as u8).collect()
    }

    fn calc(model: Model) -> Calculator<Probe> {
        let mut c = Calculator::new(Settings::default(), Probe::default());
        c.reset_with_rom(model, &rom_image(model)).unwrap();
        c
    }

    #[test]
    fn test_reset_initial_registers() {
        let c = calc(Model::Ti84Plus);
        assert_eq!(c.model(), Some(Model::Ti84Plus));
        assert_eq!(c.host.backdrops, vec!["TI84P.png"]);
        assert_eq!(c.ports[LINK], 0x03);
        assert_eq!(c.ports[POWER], 0x76);
        assert_eq!(c.ports[ROMPAGE], 0x01);
        assert_eq!(c.ports[ROMPAGE2], 0x41);
        assert_eq!(c.ports[STATUS], 0x08);
        assert_eq!(c.ports[LCDBUF], 0x3C);
        assert_eq!(c.startup_on(), STARTUP_ON_TICKS);
        assert!(c.mem.ram().iter().all(|&b| b == NO_DEVICE));
        assert_eq!(c.mem.read(0x4000), 1);
    }

    #[test]
    fn test_reset_layouts_match_power_on() {
        let c = calc(Model::Ti83);
        assert_eq!(c.ports[ROMPAGE], 0x99);
        assert_eq!(*c.mem.pages(), memory::composite(0x0C, 0x99, 0x00));
        assert_eq!(c.mem.pages()[1], memory::Window::rom(0x4000));
        assert_eq!(c.mem.pages()[2], memory::Window::ram(0x4000));

        let c = calc(Model::Ti86);
        assert_eq!(*c.mem.pages(), memory::dual_swap(0, 0));
    }

    #[test]
    fn test_ti83plus_eeprom_area_cleared() {
        let c = calc(Model::Ti83Plus);
        assert_eq!(c.mem.rom[0x78000], 0x00);
        assert_eq!(c.mem.rom[0x78001], 0xFF);
        assert_eq!(c.mem.rom[0x7BFFF], 0xFF);
        assert_eq!(c.mem.rom[0x7C000], (0x7C000 >> 14) as u8);
    }

    #[test]
    fn test_short_rom_keeps_previous_model() {
        let mut c = calc(Model::Ti82);
        c.ports[CONTROL] = 0x0B;
        let short = vec![0u8; Model::Ti83.rom_size() / 2];
        let err = c.reset_with_rom(Model::Ti83, &short).unwrap_err();
        match err {
            Error::ModelRefused { requested, current, source } => {
                assert_eq!(requested, Model::Ti83);
                assert_eq!(current, Some(Model::Ti82));
                assert!(matches!(*source, Error::RomSize { actual: 0x20000, .. }));
            }
            other => panic!("unexpected error {other}"),
        }
        assert_eq!(c.model(), Some(Model::Ti82));
        assert_eq!(c.mem.rom_size(), Model::Ti82.rom_size());
        assert_eq!(c.ports[CONTROL], 0);
    }

    #[test]
    fn test_first_reset_failure_leaves_no_model() {
        let mut c = Calculator::new(Settings::default(), Probe::default());
        assert!(c.reset_with_rom(Model::Ti85, &[0; 16]).is_err());
        assert_eq!(c.model(), None);
        assert!(c.host.backdrops.is_empty());
    }

    #[test]
    fn test_tick_status_and_irq() {
        let mut c = calc(Model::Ti83);
        c.startup_on = 0;
        c.ports[CONTROL] = 0x00;
        assert_eq!(c.tick(false), Interrupt::None);
        assert_eq!(c.ports[STATUS], STATUS_ON_UP);

        c.ports[CONTROL] = CTRL_TIMER_IRQ;
        assert_eq!(c.tick(false), Interrupt::Irq);
        assert_eq!(c.ports[STATUS], STATUS_ON_UP | CTRL_TIMER_IRQ);

        c.ports[CONTROL] = CTRL_ON_IRQ | CTRL_LCD_ON;
        c.host.on = true;
        assert_eq!(c.tick(false), Interrupt::Irq);
        assert_eq!(c.ports[STATUS], CTRL_ON_IRQ);

        c.host.on = false;
        assert_eq!(c.tick(false), Interrupt::None);
    }

    #[test]
    fn test_tick_power_off_waits_for_startup() {
        let mut c = calc(Model::Ti85);
        c.ports[CONTROL] = 0x01;
        for _ in 0..STARTUP_ON_TICKS {
            assert_ne!(c.tick(true), Interrupt::Quit);
        }
        assert_eq!(c.startup_on(), 0);
        // Not halted yet
        assert_eq!(c.tick(false), Interrupt::None);
        assert_eq!(c.tick(true), Interrupt::Quit);
        assert!(c.exit_requested());
    }

    #[test]
    fn test_tick_refresh_rate() {
        let mut c = calc(Model::Ti82);
        for _ in 0..40 {
            c.tick(false);
        }
        // Credit reaches 400 after four ticks; refresh fires on the next
        assert_eq!(c.host.refreshes, 9);

        let settings = Settings { update_period: 50, ..Settings::default() };
        let mut c = Calculator::new(settings, Probe::default());
        c.reset_with_rom(Model::Ti82, &rom_image(Model::Ti82)).unwrap();
        for _ in 0..40 {
            c.tick(false);
        }
        assert_eq!(c.host.refreshes, 4);
    }

    #[test]
    fn test_control_write_acknowledges_status() {
        let mut c = calc(Model::Ti84PlusSe);
        c.ports[STATUS] = 0x0F;
        c.write_port(0x03, 0x05);
        assert_eq!(c.ports[CONTROL], 0x05);
        assert_eq!(c.ports[STATUS], 0x0D);
        assert_eq!(c.read_port(0x03), 0x0D);
        assert_eq!(c.read_port(0x04), 0x0D);
    }

    #[test]
    fn test_keypad_port() {
        let mut c = calc(Model::Ti86);
        c.keys.press(2, 0x10);
        c.write_port(0x01, 0xFB);
        assert_eq!(c.read_port(0x01), 0xEF);
        c.write_port(0x01, 0xFF);
        assert_eq!(c.read_port(0x01), 0xFF);
    }

    #[test]
    fn test_bank_write_remaps() {
        let mut c = calc(Model::Ti85);
        c.write_port(0x05, 0x03);
        assert_eq!(c.mem.read(0x4000), 3);
        // High address bits do not take part in decoding
        c.write_port(0xAB05, 0x06);
        assert_eq!(c.mem.read(0x4123), 6);

        let mut c = calc(Model::Ti86);
        c.write_port(0x06, 0x41);
        c.mem.write(0x8000, 0x5A);
        assert_eq!(c.mem.ram[0x4000], 0x5A);
        assert_eq!(c.read_port(0x06), 0x41);
    }

    #[test]
    fn test_ti83_link_bank_bit() {
        let mut c = calc(Model::Ti83);
        c.write_port(0x04, 0x00);
        c.write_port(0x02, 0x02);
        c.write_port(0x00, 0x10);
        assert_eq!(c.ports[LINK], 0x1F);
        // 4000h = ROM bank 1 page 2
        assert_eq!(c.mem.read(0x4000), 0x0A);
        assert_eq!(c.read_port(0x00), 0x1F);
    }

    #[test]
    fn test_link_ports() {
        let mut c = calc(Model::Ti85);
        c.write_port(0x07, 0xFF);
        assert_eq!(c.read_port(0x07), 0xCF);

        let mut c = calc(Model::Ti83Plus);
        c.write_port(0x00, 0x07);
        assert_eq!(c.read_port(0x00), 0x37);
    }

    #[test]
    fn test_flash_status_reports_protect_bits() {
        let mut c = calc(Model::Ti83Plus);
        let before = *c.mem.pages();
        c.write_port(0x05, 0x05);
        assert_eq!(*c.mem.pages(), before);
        assert_eq!(c.read_port(0x02), 0x0B | (0x05 << 3));
    }

    #[test]
    fn test_unmapped_port_reads_no_device() {
        let mut c = calc(Model::Ti82);
        assert_eq!(c.read_port(0x55), NO_DEVICE);
        let before = c.ports;
        c.write_port(0x55, 0x12);
        assert_eq!(c.ports, before);
    }

    #[test]
    fn test_contrast_ports_set_palette() {
        let mut c = calc(Model::Ti85);
        c.host.colors.clear();
        c.write_port(0x02, 0x3F);
        assert_eq!(c.ports[CONTRAST], 0x1F);
        assert_eq!(*c.palette(), colors::ti85_colors(0x1F));
        assert_eq!(c.host.colors.len(), 2);

        let mut c = calc(Model::Ti83);
        c.write_port(0x10, 0xFF);
        assert_eq!(c.lcd.contrast(), 0x3F);
        assert_eq!(*c.palette(), colors::ti83_colors(0x3F));
    }

    #[test]
    fn test_rom_write_is_ignored() {
        let mut c = calc(Model::Ti83Plus);
        let before = c.read(0x4010);
        c.write(0x4010, before ^ 0xFF);
        assert_eq!(c.read(0x4010), before);
        c.write(0xC010, 0x42);
        assert_eq!(c.read(0xC010), 0x42);
    }

    #[test]
    fn test_snapshot_restore() {
        let mut c = calc(Model::Ti86);
        c.write_port(0x05, 0x42);
        c.write_port(0x02, 0x11);
        c.mem.write(0x4000, 0x99);
        c.ports[CONTROL] = 0x0B;
        let snap = c.snapshot(Z80Registers::power_on()).unwrap();
        assert_eq!(snap.mode, 0x0100);

        let mut d = calc(Model::Ti86);
        d.restore(&snap).unwrap();
        assert_eq!(d.ports, c.ports);
        assert_eq!(d.mem.ram(), c.mem.ram());
        assert_eq!(*d.mem.pages(), *c.mem.pages());
        assert_eq!(*d.palette(), colors::ti85_colors(0x11));
        assert_eq!(d.startup_on(), 0);
    }

    #[test]
    fn test_restore_while_sleeping_keeps_on_grace() {
        let mut c = calc(Model::Ti83);
        c.ports[CONTROL] = 0x01;
        let snap = c.snapshot(Z80Registers::default()).unwrap();
        let mut d = calc(Model::Ti83);
        d.restore(&snap).unwrap();
        assert_eq!(d.startup_on(), STARTUP_ON_TICKS);
    }
}
