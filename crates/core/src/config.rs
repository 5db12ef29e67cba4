//! Session settings supplied by the host.
//!
//! The crate never reads configuration files itself; hosts build a
//! [`Settings`] value (or deserialize one with serde) and hand it to
//! [`crate::Emulator::new`].

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::model::Model;

/// Verbose bit: progress messages (allocation, ROM and state loading).
pub const VERBOSE_INFO: u8 = 0x01;
/// Verbose bit: accesses to ports with nothing behind them.
pub const VERBOSE_PORTS: u8 = 0x02;
/// Verbose bit: ask the CPU engine to trap undefined opcodes.
pub const VERBOSE_TRAP: u8 = 0x10;

/// Storage format of snapshot files.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum Compression {
    /// Raw field sequence.
    Plain,
    /// zlib stream. Reading also accepts plain files.
    #[default]
    Zlib,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// Model selected at start.
    pub model: Model,
    /// Bitmask of `VERBOSE_*` flags.
    pub verbose: u8,
    /// Percentage of timer ticks that lead to a screen refresh.
    pub update_period: u8,
    /// System ROM image for the selected model.
    pub rom_path: PathBuf,
    /// Snapshot loaded at start and saved at shutdown.
    pub state_path: Option<PathBuf>,
    pub compression: Compression,
}

impl Default for Settings {
    fn default() -> Self {
        Settings {
            model: Model::Ti83Plus,
            verbose: VERBOSE_INFO | VERBOSE_PORTS,
            update_period: 100,
            rom_path: PathBuf::from(Model::Ti83Plus.config().rom_file),
            state_path: None,
            compression: Compression::Zlib,
        }
    }
}

impl Settings {
    /// Settings for `model`, with the ROM image and snapshot named after
    /// the registry's file names inside `dir`.
    pub fn for_model(model: Model, dir: impl Into<PathBuf>) -> Self {
        let dir = dir.into();
        let cfg = model.config();
        Settings {
            model,
            rom_path: dir.join(cfg.rom_file),
            state_path: Some(dir.join(cfg.ram_file)),
            ..Settings::default()
        }
    }

    /// Screen update percentage, clamped to 1..=100.
    pub fn update_period(&self) -> u32 {
        u32::from(self.update_period.clamp(1, 100))
    }

    pub fn info(&self) -> bool {
        self.verbose & VERBOSE_INFO != 0
    }

    pub fn log_ports(&self) -> bool {
        self.verbose & VERBOSE_PORTS != 0
    }

    /// Whether the CPU engine should stop on undefined opcodes.
    pub fn trap_bad_ops(&self) -> bool {
        self.verbose & VERBOSE_TRAP != 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_update_period_clamped() {
        let mut s = Settings::default();
        assert_eq!(s.update_period(), 100);
        s.update_period = 0;
        assert_eq!(s.update_period(), 1);
        s.update_period = 250;
        assert_eq!(s.update_period(), 100);
        s.update_period = 37;
        assert_eq!(s.update_period(), 37);
    }

    #[test]
    fn test_for_model_paths() {
        let s = Settings::for_model(Model::Ti86, "/calc");
        assert_eq!(s.model, Model::Ti86);
        assert_eq!(s.rom_path, PathBuf::from("/calc/TI86.ROM"));
        assert_eq!(s.state_path, Some(PathBuf::from("/calc/TI86.RAM")));
    }

    #[test]
    fn test_verbose_bits() {
        let s = Settings { verbose: VERBOSE_TRAP, ..Settings::default() };
        assert!(s.trap_bad_ops());
        assert!(!s.info());
        assert!(!s.log_ports());
    }
}
