//! Emulation session.
//!
//! [`Emulator`] pairs an external Z80 engine with the calculator hardware
//! and implements the session lifecycle: start (ROM load, optional state
//! restore, run loop), model switches, snapshot save/load and shutdown.

use std::path::Path;

use crate::cpu::CpuEngine;
use crate::error::{Error, Result};
use crate::host::Host;
use crate::model::Model;
use crate::savestate;
use crate::{Calculator, Settings};

pub struct Emulator<C: CpuEngine, H: Host> {
    cpu: C,
    calc: Calculator<H>,
}

impl<C: CpuEngine, H: Host> Emulator<C, H> {
    pub fn new(settings: Settings, cpu: C, host: H) -> Self {
        Emulator { cpu, calc: Calculator::new(settings, host) }
    }

    pub fn calculator(&self) -> &Calculator<H> {
        &self.calc
    }

    pub fn calculator_mut(&mut self) -> &mut Calculator<H> {
        &mut self.calc
    }

    pub fn cpu(&self) -> &C {
        &self.cpu
    }

    pub fn cpu_mut(&mut self) -> &mut C {
        &mut self.cpu
    }

    /// Power on the configured model and run until the engine stops.
    /// Returns the program counter at exit.
    pub fn start(&mut self) -> Result<u16> {
        let settings = self.calc.settings().clone();
        self.calc.clear_exit();
        self.cpu.set_trap_bad_ops(settings.trap_bad_ops());

        // Always read the ROM image, even for the model already active
        let powered = self.calc.power_on(settings.model);
        if self.calc.model().is_some() {
            self.cpu.reset();
        }
        powered?;
        if let Some(path) = settings.state_path.as_deref().filter(|p| p.exists()) {
            if let Err(e) = self.load_state(path) {
                log::warn!("{}: state not restored: {e}", path.display());
            }
        }

        if settings.info() {
            log::info!("starting {} emulation", settings.model);
        }
        let pc = self.cpu.run(&mut self.calc);
        if settings.info() {
            log::info!("exited at PC = {pc:04X}h");
        }
        Ok(pc)
    }

    /// Reset to `model`, then the CPU. On [`Error::ModelRefused`] the CPU
    /// is still reset if a previous model stays active.
    pub fn reset(&mut self, model: Model) -> Result<()> {
        let result = self.calc.reset(model);
        if self.calc.model().is_some() {
            self.cpu.reset();
        }
        result
    }

    /// Stop the run loop at the next timer tick.
    pub fn request_exit(&mut self) {
        self.calc.request_exit();
    }

    /// Write a snapshot of the running machine to `path`.
    pub fn save_state(&self, path: &Path) -> Result<()> {
        let settings = self.calc.settings();
        let snapshot = self.calc.snapshot(self.cpu.registers())?;
        let result = savestate::save_to_file(&snapshot, path, settings.compression);
        if settings.info() {
            log::info!(
                "saving {}...{}",
                path.display(),
                if result.is_ok() { "OK" } else { "FAILED" }
            );
        }
        result
    }

    /// Restore a snapshot, switching model if it was taken on another one.
    /// A snapshot that ends early or does not decode leaves the previously
    /// active model freshly reset, with CPU and hardware untouched by it.
    pub fn load_state(&mut self, path: &Path) -> Result<()> {
        let result = self.restore_from(path);
        if self.calc.settings().info() {
            log::info!(
                "loading {}...{}",
                path.display(),
                if result.is_ok() { "OK" } else { "FAILED" }
            );
        }
        result
    }

    fn restore_from(&mut self, path: &Path) -> Result<()> {
        let prior = self.calc.model().ok_or(Error::NotStarted)?;
        let mut reader = savestate::open(path, self.calc.settings().compression)?;
        let mode = reader.read_mode()?;
        let model = Model::from_tag(mode as u32).ok_or(Error::UnknownModel(mode as u32))?;

        if model != prior {
            self.reset(model)?;
        }

        // Nothing is applied unless the whole body reads back and fits
        let applied = reader.read_body(mode, model.ram_size()).and_then(|snapshot| {
            self.calc.restore(&snapshot)?;
            Ok(snapshot.registers)
        });
        match applied {
            Ok(registers) => {
                self.cpu.set_registers(&registers);
                Ok(())
            }
            Err(e) => {
                if let Err(back) = self.reset(prior) {
                    log::error!("could not return to {prior}: {back}");
                }
                Err(e)
            }
        }
    }

    /// End the session, saving state if a state file is configured.
    pub fn shutdown(self) -> Result<Calculator<H>> {
        if let Some(path) = self.calc.settings().state_path.clone() {
            if self.calc.model().is_some() {
                self.save_state(&path)?;
            }
        }
        Ok(self.calc)
    }
}
