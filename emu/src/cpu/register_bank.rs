//! # Banked Registers for Exception Modes
//!
//! When the CPU switches modes, specific registers are swapped out for
//! mode-private copies. R13/R14 are banked in every exception mode (each
//! handler gets its own stack pointer and return address), FIQ additionally
//! banks R8-R12, and each exception mode owns one SPSR that saves the CPSR on
//! entry. User and System share the unbanked set.
//!
//! The storage here is passive; all routing happens through the CPU's
//! `read_register`/`write_register` accessors keyed on the current CPSR mode,
//! so the T bit, the mode field, and the selected bank can never disagree.

use serde::{Deserialize, Serialize};

use crate::cpu::cpu_modes::Mode;
use crate::cpu::psr::Psr;

/// Storage for banked registers across all CPU modes.
#[derive(Default, Serialize, Deserialize)]
pub struct RegisterBank {
    /// R8-R14 for FIQ mode.
    pub fiq: [u32; 7],
    /// R13-R14 for IRQ mode.
    pub irq: [u32; 2],
    /// R13-R14 for Supervisor mode.
    pub svc: [u32; 2],
    /// R13-R14 for Abort mode.
    pub abt: [u32; 2],
    /// R13-R14 for Undefined mode.
    pub und: [u32; 2],

    pub spsr_fiq: Psr,
    pub spsr_irq: Psr,
    pub spsr_svc: Psr,
    pub spsr_abt: Psr,
    pub spsr_und: Psr,
}

impl RegisterBank {
    /// The saved status register of an exception mode. User and System have
    /// no SPSR; by convention reads in those modes yield the caller's CPSR,
    /// which is handled one level up.
    #[must_use]
    pub fn spsr(&self, mode: Mode) -> Option<Psr> {
        match mode {
            Mode::Fiq => Some(self.spsr_fiq),
            Mode::Irq => Some(self.spsr_irq),
            Mode::Supervisor => Some(self.spsr_svc),
            Mode::Abort => Some(self.spsr_abt),
            Mode::Undefined => Some(self.spsr_und),
            Mode::User | Mode::System => None,
        }
    }

    pub fn set_spsr(&mut self, mode: Mode, value: Psr) {
        match mode {
            Mode::Fiq => self.spsr_fiq = value,
            Mode::Irq => self.spsr_irq = value,
            Mode::Supervisor => self.spsr_svc = value,
            Mode::Abort => self.spsr_abt = value,
            Mode::Undefined => self.spsr_und = value,
            Mode::User | Mode::System => {}
        }
    }
}
