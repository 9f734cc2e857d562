use serde::{Deserialize, Serialize};

/// The CPU operating mode, stored in bits 0-4 of the CPSR/SPSR.
///
/// Each mode determines which banked registers are active and whether the
/// code has privileged access. Five of the modes are entered automatically
/// on exceptions; User and System share one register set.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Mode {
    /// Normal program execution (unprivileged).
    User = 0b10000,

    /// Fast interrupt handling, banks R8-R14.
    Fiq = 0b10001,

    /// General interrupt handling.
    Irq = 0b10010,

    /// Protected mode entered on reset and software interrupt.
    Supervisor = 0b10011,

    /// Entered on prefetch/data aborts.
    Abort = 0b10111,

    /// Entered on undefined instructions.
    Undefined = 0b11011,

    /// Privileged mode sharing the User register set.
    System = 0b11111,
}

impl TryFrom<u32> for Mode {
    type Error = &'static str;

    fn try_from(value: u32) -> Result<Self, Self::Error> {
        match value & 0b11111 {
            0b10000 => Ok(Self::User),
            0b10001 => Ok(Self::Fiq),
            0b10010 => Ok(Self::Irq),
            0b10011 => Ok(Self::Supervisor),
            0b10111 => Ok(Self::Abort),
            0b11011 => Ok(Self::Undefined),
            0b11111 => Ok(Self::System),
            _ => Err("invalid mode bits"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn mode_round_trip() {
        for mode in [
            Mode::User,
            Mode::Fiq,
            Mode::Irq,
            Mode::Supervisor,
            Mode::Abort,
            Mode::Undefined,
            Mode::System,
        ] {
            assert_eq!(Mode::try_from(mode as u32), Ok(mode));
        }
    }

    #[test]
    fn invalid_mode_bits() {
        assert!(Mode::try_from(0b00000).is_err());
        assert!(Mode::try_from(0b11010).is_err());
    }
}
