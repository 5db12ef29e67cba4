//! Z80 engine interface.
//!
//! Instruction execution lives outside this crate. An engine implements
//! [`CpuEngine`] and drives the calculator through the [`Bus`] it is handed:
//! memory and port accesses go straight to the bus, and every
//! [`TIMER_CLK`](crate::TIMER_CLK) cycles the engine calls [`Bus::tick`] and
//! acts on the returned [`Interrupt`].
//!
//! The register file is owned by the engine but exchanged as a plain
//! [`Z80Registers`] record so snapshots can carry it.

use serde::{Deserialize, Serialize};

/// Stack pointer after power-on.
pub const RESET_SP: u16 = 0xF000;

/// Z80 register file as stored in snapshots.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Z80Registers {
    pub af: u16,
    pub bc: u16,
    pub de: u16,
    pub hl: u16,
    pub ix: u16,
    pub iy: u16,
    pub pc: u16,
    pub sp: u16,
    /// Shadow set (AF', BC', DE', HL')
    pub af_alt: u16,
    pub bc_alt: u16,
    pub de_alt: u16,
    pub hl_alt: u16,
    pub i: u8,
    pub r: u8,
    pub iff1: bool,
    pub iff2: bool,
    /// Interrupt mode 0..=2
    pub im: u8,
    /// Stopped in HALT until the next interrupt
    pub halted: bool,
    /// Cycles left until the next timer tick
    pub icount: i32,
}

impl Z80Registers {
    /// Register state after /RESET.
    pub fn power_on() -> Self {
        Z80Registers {
            sp: RESET_SP,
            icount: crate::TIMER_CLK as i32,
            ..Z80Registers::default()
        }
    }
}

/// Result of a timer tick, consumed by the engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Interrupt {
    /// Nothing pending.
    None,
    /// Raise a maskable interrupt.
    Irq,
    /// Leave the run loop.
    Quit,
}

/// Hardware seen by the Z80.
pub trait Bus {
    /// Memory read through the current bank windows.
    fn read(&mut self, addr: u16) -> u8;
    /// Memory write; dropped when the window maps ROM.
    fn write(&mut self, addr: u16, value: u8);
    /// `IN` from an I/O port. Only the low 8 bits are decoded.
    fn input(&mut self, port: u16) -> u8;
    /// `OUT` to an I/O port.
    fn output(&mut self, port: u16, value: u8);
    /// Periodic hardware update. `halted` tells whether the CPU sits in HALT.
    fn tick(&mut self, halted: bool) -> Interrupt;
}

/// External Z80 instruction engine.
pub trait CpuEngine {
    /// Reset registers to their power-on values.
    fn reset(&mut self);

    /// Execute until [`Bus::tick`] returns [`Interrupt::Quit`]. Returns the
    /// program counter at exit.
    fn run<B: Bus>(&mut self, bus: &mut B) -> u16;

    fn registers(&self) -> Z80Registers;

    fn set_registers(&mut self, regs: &Z80Registers);

    /// Stop on undefined opcodes instead of skipping them.
    fn set_trap_bad_ops(&mut self, _trap: bool) {}
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_power_on_registers() {
        let r = Z80Registers::power_on();
        assert_eq!(r.pc, 0);
        assert_eq!(r.sp, RESET_SP);
        assert!(!r.iff1 && !r.iff2 && !r.halted);
        assert_eq!(r.im, 0);
        assert_eq!(r.icount, crate::TIMER_CLK as i32);
    }

    #[test]
    fn test_registers_encode_fixed_size() {
        let a = Z80Registers { pc: 0x1234, hl_alt: 0xBEEF, iff1: true, ..Z80Registers::power_on() };
        let bytes = bincode::serialize(&a).unwrap();
        let b = Z80Registers::default();
        assert_eq!(bytes.len(), bincode::serialize(&b).unwrap().len());
        assert_eq!(bincode::deserialize::<Z80Registers>(&bytes).unwrap(), a);
    }
}
