//! # Program Status Registers (CPSR and SPSR)
//!
//! ```text
//! 31 30 29 28 27      8 7 6 5 4   0
//! ┌──┬──┬──┬──┬────────┬─┬─┬─┬─────┐
//! │N │Z │C │V │Reserved│I│F│T│Mode │
//! └──┴──┴──┴──┴────────┴─┴─┴─┴─────┘
//! ```
//!
//! The four condition flags in the top nibble feed [`Psr::can_execute`], the
//! low byte holds the interrupt masks, the ARM/THUMB state bit and the
//! operating-mode field that selects the active register bank. One such
//! register is current (CPSR); each exception mode keeps a saved copy (SPSR)
//! taken on entry so the handler can restore the interrupted context.

use serde::{Deserialize, Serialize};

use crate::bitwise::Bits;
use crate::cpu::{condition::Condition, cpu_modes::Mode};

/// A program status register, current or saved.
///
/// The raw word is kept as-is and every field gets a typed accessor, so MSR
/// and MRS can move whole byte-fields around while the rest of the core
/// never touches bit positions directly.
#[derive(Default, Clone, Copy, Serialize, Deserialize)]
pub struct Psr(u32);

impl Psr {
    /// Evaluates an opcode's condition field against the current flags.
    ///
    /// Only the eight even encodings carry a distinct predicate; every odd
    /// encoding is the complement of the even one right below it (NE = not
    /// EQ, LS = not HI, NV = not AL, and so on), so the low bit of the
    /// encoding just flips the result.
    pub(crate) fn can_execute(self, cond: Condition) -> bool {
        use Condition::{AL, CC, CS, EQ, GE, GT, HI, LE, LS, LT, MI, NE, NV, PL, VC, VS};
        let result = match cond {
            EQ | NE => self.zero_flag(),
            CS | CC => self.carry_flag(),
            MI | PL => self.sign_flag(),
            VS | VC => self.overflow_flag(),
            HI | LS => self.carry_flag() && !self.zero_flag(),
            GE | LT => self.sign_flag() == self.overflow_flag(),
            GT | LE => !self.zero_flag() && self.sign_flag() == self.overflow_flag(),
            AL | NV => true,
        };
        if cond as u8 & 1 != 0 {
            !result
        } else {
            result
        }
    }

    /// N, bit 31: the last flag-setting result came out negative.
    #[must_use]
    pub fn sign_flag(self) -> bool {
        self.0.get_bit(31)
    }

    /// Z, bit 30: the last flag-setting result came out zero.
    #[must_use]
    pub fn zero_flag(self) -> bool {
        self.0.get_bit(30)
    }

    /// C, bit 29: carry out of an addition or shifter, no-borrow out of a
    /// subtraction.
    #[must_use]
    pub fn carry_flag(self) -> bool {
        self.0.get_bit(29)
    }

    /// V, bit 28: the last arithmetic result overflowed when read as signed.
    #[must_use]
    pub fn overflow_flag(self) -> bool {
        self.0.get_bit(28)
    }

    /// I, bit 7: IRQ delivery is masked while set.
    #[must_use]
    pub fn irq_disable(self) -> bool {
        self.0.get_bit(7)
    }

    /// F, bit 6: FIQ delivery is masked while set.
    #[must_use]
    pub fn fiq_disable(self) -> bool {
        self.0.get_bit(6)
    }

    /// T, bit 5: clear in ARM state, set in THUMB state.
    #[must_use]
    pub fn state_bit(self) -> bool {
        self.0.get_bit(5)
    }

    /// The operating mode held in bits 4-0.
    ///
    /// Some BIOS routines park values with no valid mode (such as 0) in an
    /// SPSR; rather than faulting on the later restore, an unrecognised
    /// pattern is absorbed as Supervisor.
    #[must_use]
    pub fn mode(self) -> Mode {
        let mode_bits = self.0 & 0b11111;
        Mode::try_from(mode_bits).unwrap_or_else(|_| {
            tracing::debug!(
                "invalid mode bits 0b{:05b} in PSR=0x{:08X}, defaulting to Supervisor",
                mode_bits,
                self.0
            );
            Mode::Supervisor
        })
    }

    pub fn set_sign_flag(&mut self, value: bool) {
        self.0.set_bit(31, value);
    }

    pub fn set_zero_flag(&mut self, value: bool) {
        self.0.set_bit(30, value);
    }

    pub fn set_carry_flag(&mut self, value: bool) {
        self.0.set_bit(29, value);
    }

    pub fn set_overflow_flag(&mut self, value: bool) {
        self.0.set_bit(28, value);
    }

    pub fn set_irq_disable(&mut self, value: bool) {
        self.0.set_bit(7, value);
    }

    pub fn set_fiq_disable(&mut self, value: bool) {
        self.0.set_bit(6, value);
    }

    /// Flips the instruction-set state. Only BX and exception entry/return
    /// are supposed to do this; the pipeline is refilled right after.
    pub fn set_state_bit(&mut self, value: bool) {
        self.0.set_bit(5, value);
    }

    /// Replaces the mode field, leaving every other bit alone.
    pub const fn set_mode(&mut self, m: Mode) {
        self.0 &= !0b11111;
        self.0 |= m as u32;
    }
}

impl From<Mode> for Psr {
    fn from(m: Mode) -> Self {
        let mut s = Self(0);
        s.set_mode(m);
        s
    }
}

impl From<u32> for Psr {
    fn from(value: u32) -> Self {
        Self(value)
    }
}

impl From<Psr> for u32 {
    fn from(p: Psr) -> Self {
        p.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn check_flags() {
        let mut cpsr = Psr::default();
        cpsr.set_sign_flag(true);
        assert!(cpsr.sign_flag());
        cpsr.set_zero_flag(true);
        assert!(cpsr.zero_flag());
        cpsr.set_carry_flag(true);
        assert!(cpsr.carry_flag());
        cpsr.set_overflow_flag(true);
        assert!(cpsr.overflow_flag());
        assert_eq!(u32::from(cpsr) >> 28, 0b1111);
    }

    #[test]
    fn check_control_bits() {
        let mut cpsr = Psr::default();
        cpsr.set_irq_disable(true);
        assert!(cpsr.irq_disable());
        cpsr.set_fiq_disable(true);
        assert!(cpsr.fiq_disable());
        cpsr.set_state_bit(true);
        assert!(cpsr.state_bit());
    }

    #[test]
    fn check_mode_field() {
        let mut cpsr = Psr::default();
        cpsr.set_mode(Mode::Irq);
        assert_eq!(cpsr.mode(), Mode::Irq);
        assert_eq!(u32::from(cpsr) & 0b11111, 0b10010);

        cpsr.set_mode(Mode::System);
        assert_eq!(cpsr.mode(), Mode::System);
    }

    #[test]
    fn invalid_mode_defaults_to_supervisor() {
        let cpsr = Psr::from(0u32);
        assert_eq!(cpsr.mode(), Mode::Supervisor);
    }

    #[test]
    fn condition_predicates() {
        let mut psr = Psr::default();
        assert!(psr.can_execute(Condition::AL));
        assert!(!psr.can_execute(Condition::NV));
        assert!(psr.can_execute(Condition::NE));

        psr.set_zero_flag(true);
        assert!(psr.can_execute(Condition::EQ));
        assert!(psr.can_execute(Condition::LS));
        assert!(!psr.can_execute(Condition::GT));

        psr.set_zero_flag(false);
        psr.set_sign_flag(true);
        psr.set_overflow_flag(true);
        assert!(psr.can_execute(Condition::GE));
        assert!(psr.can_execute(Condition::GT));
        psr.set_overflow_flag(false);
        assert!(psr.can_execute(Condition::LT));
    }

    #[test]
    fn odd_encodings_complement_their_even_pair() {
        for flags in 0..16u32 {
            let psr = Psr::from(flags << 28);
            for even in (0..16u8).step_by(2) {
                assert_eq!(
                    psr.can_execute(Condition::from(even)),
                    !psr.can_execute(Condition::from(even + 1)),
                );
            }
        }
    }
}
