//! # ARM7TDMI Register File
//!
//! The 16 registers visible at any time. R13 is the stack pointer and R14 the
//! link register by convention; R15 is the program counter. Due to the
//! two-slot pipeline, reading R15 returns a value ahead of the executing
//! instruction: +8 in ARM state, +4 in THUMB state. The mode-private copies
//! of R13/R14 (and R8-R12 for FIQ) live in
//! [`RegisterBank`](super::register_bank::RegisterBank); routing between the
//! two happens in the CPU's register accessors.

use serde::{Deserialize, Serialize};

/// Stack Pointer register index.
pub const REG_SP: usize = 0xD;

/// Link Register index (return address for subroutines).
pub const REG_LR: usize = 0xE;

/// Program Counter register index.
pub const REG_PC: usize = 0xF;

#[derive(Default, Serialize, Deserialize)]
pub struct Registers([u32; 16]);

impl Registers {
    #[must_use]
    pub const fn program_counter(&self) -> u32 {
        self.0[REG_PC]
    }

    pub const fn set_program_counter(&mut self, new_value: u32) {
        self.0[REG_PC] = new_value;
    }

    pub fn set_register_at(&mut self, reg: usize, new_value: u32) {
        assert!(reg <= 15, "Invalid register index: {reg} (0x{reg:X})");
        self.0[reg] = new_value;
    }

    #[must_use]
    pub const fn register_at(&self, reg: usize) -> u32 {
        self.0[reg]
    }
}
