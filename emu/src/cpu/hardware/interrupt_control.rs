use serde::{Deserialize, Serialize};

use crate::bitwise::Bits;

/// Interrupt source bit positions in IE/IF.
pub const IRQ_VBLANK: u8 = 0;
pub const IRQ_HBLANK: u8 = 1;
pub const IRQ_VCOUNT: u8 = 2;
/// Timers occupy bits 3-6, one per timer index.
pub const IRQ_TIMER_BASE: u8 = 3;
/// DMA channels occupy bits 8-11, one per channel index.
pub const IRQ_DMA_BASE: u8 = 8;
pub const IRQ_KEYPAD: u8 = 12;

/// The IME/IE/IF block. Peripherals OR bits into IF; the CPU samples the
/// conjunction before each instruction.
#[derive(Default, Serialize, Deserialize)]
pub struct InterruptControl {
    pub interrupt_master_enable: u16,
    pub interrupt_enable: u16,
    pub interrupt_request: u16,
}

impl InterruptControl {
    pub fn request(&mut self, bit: u8) {
        self.interrupt_request.set_bit_on(bit);
    }

    /// True when an enabled interrupt is pending and IME allows delivery.
    #[must_use]
    pub fn pending(&self) -> bool {
        self.interrupt_master_enable & 1 != 0
            && self.interrupt_enable & self.interrupt_request != 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pending_requires_all_three_levels() {
        let mut irq = InterruptControl::default();
        assert!(!irq.pending());

        irq.request(IRQ_VBLANK);
        assert!(!irq.pending());

        irq.interrupt_enable = 1;
        assert!(!irq.pending());

        irq.interrupt_master_enable = 1;
        assert!(irq.pending());

        irq.interrupt_enable = 0b10; // a different source
        assert!(!irq.pending());
    }
}
