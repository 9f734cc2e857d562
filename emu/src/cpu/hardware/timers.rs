use serde::{Deserialize, Serialize};

use crate::bitwise::Bits;

/// One 16-bit timer. `counter` is the live TMxCNT_L value the CPU reads back;
/// `reload` is the latch written through TMxCNT_L.
#[derive(Default, Serialize, Deserialize)]
pub struct Timer {
    pub counter: u16,
    pub reload: u16,
    /// TMxCNT_H: enable (bit 7), IRQ on overflow (bit 6), cascade (bit 2),
    /// prescaler selection (bits 0-1).
    pub control: u16,
    cycles: u32,
}

impl Timer {
    /// Applies a TMxCNT_H write. A 0-to-1 transition of the enable bit copies
    /// the reload latch into the counter and resets the prescaler phase.
    pub fn set_control(&mut self, value: u16) {
        let was_enabled = self.control.get_bit(7);
        self.control = value;
        if !was_enabled && value.get_bit(7) {
            self.cycles = 0;
            self.counter = self.reload;
        }
    }

    const fn prescaler(&self) -> u32 {
        match self.control & 0b11 {
            0b00 => 1,
            0b01 => 64,
            0b10 => 256,
            _ => 1024,
        }
    }
}

#[derive(Default)]
pub struct TimersStepOutput {
    pub request_irq: [bool; 4],
    /// Overflow notifications for the sound FIFOs (timers 0 and 1).
    pub overflowed: [bool; 4],
}

#[derive(Default, Serialize, Deserialize)]
pub struct Timers {
    pub timers: [Timer; 4],
}

impl Timers {
    /// Advances every enabled, non-cascaded timer by one master cycle.
    pub fn step(&mut self) -> TimersStepOutput {
        let mut output = TimersStepOutput::default();
        for index in 0..4 {
            let timer = &mut self.timers[index];
            if !timer.control.get_bit(7) || timer.control.get_bit(2) {
                continue;
            }
            timer.cycles += 1;
            if timer.cycles >= timer.prescaler() {
                timer.cycles = 0;
                self.tick(index, &mut output);
            }
        }
        output
    }

    /// Increments timer `index`; an overflow reloads the counter, records the
    /// IRQ/FIFO notifications and ticks the forward-linked timer when its
    /// cascade bit is set.
    fn tick(&mut self, index: usize, output: &mut TimersStepOutput) {
        let mut index = index;
        loop {
            let timer = &mut self.timers[index];
            if timer.counter != 0xFFFF {
                timer.counter += 1;
                return;
            }

            if timer.control.get_bit(6) {
                output.request_irq[index] = true;
            }
            output.overflowed[index] = true;
            timer.counter = timer.reload;

            let next = index + 1;
            if next < 4 && self.timers[next].control.get_bit(2) {
                index = next;
            } else {
                return;
            }
        }
    }
}
