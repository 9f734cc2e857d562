use serde::{Deserialize, Serialize};

use crate::bitwise::Bits;

/// Channel lifecycle. A channel leaves `Active` only after completing its
/// latched word count: to `Wait` when repeating, `Idle` otherwise.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Status {
    #[default]
    Idle,
    Wait,
    Triggered,
    Active,
}

/// Transfer start condition, latched from control bits 12-13. The `special`
/// encoding maps to the sound FIFOs on channels 1-2; on channel 3 it would be
/// video capture, which has no source here, so the channel never triggers.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum StartCondition {
    #[default]
    None,
    Immediate,
    VBlank,
    HBlank,
    SoundFifo,
}

#[derive(Default, Serialize, Deserialize)]
pub struct Channel {
    index: usize,

    /// DMAxSAD
    pub source_address: u32,
    /// DMAxDAD
    pub destination_address: u32,
    /// DMAxCNT_L
    pub word_count: u16,
    /// DMAxCNT_H
    pub control: u16,

    // Transfer state latched on the enable edge
    pub(crate) src_addr: u32,
    pub(crate) dst_addr: u32,
    pub(crate) word_size: u32,
    pub(crate) count: u32,
    pub(crate) src_adjust: u16,
    pub(crate) dst_adjust: u16,
    pub(crate) repeat: bool,
    pub(crate) trigger_irq: bool,

    pub start_condition: StartCondition,
    pub status: Status,
    pub(crate) cycles: u32,
}

impl Channel {
    #[must_use]
    pub fn new(index: usize) -> Self {
        Self {
            index,
            ..Self::default()
        }
    }

    /// Applies a DMAxCNT_H write. A 0-to-1 transition of the enable bit
    /// latches the whole transfer description and arms the channel; a 1-to-0
    /// transition disarms it.
    pub fn set_control(&mut self, value: u16) {
        let was_enabled = self.control.get_bit(15);
        self.control = value;
        if !was_enabled && value.get_bit(15) {
            self.latch();
            self.cycles = 0;
            self.status = Status::Wait;
        } else if was_enabled && !value.get_bit(15) {
            self.cycles = 0;
            self.status = Status::Idle;
        }
    }

    pub fn trigger(&mut self) {
        self.status = Status::Triggered;
    }

    fn latch(&mut self) {
        match (self.control >> 12) & 0b11 {
            0b00 => self.start_condition = StartCondition::Immediate,
            0b01 => self.start_condition = StartCondition::VBlank,
            0b10 => self.start_condition = StartCondition::HBlank,
            _ => {
                if (1..=2).contains(&self.index) {
                    self.start_condition = StartCondition::SoundFifo;
                }
            }
        }

        // Sound FIFO mode forces 32-bit units regardless of the control bit.
        self.word_size = if self.start_condition == StartCondition::SoundFifo
            || self.control.get_bit(10)
        {
            4
        } else {
            2
        };

        self.latch_source_address();
        self.latch_destination_address();
        self.latch_word_count();

        self.src_adjust = self.control.get_bits(7..=8);
        self.dst_adjust = if self.start_condition == StartCondition::SoundFifo {
            0b10 // fixed
        } else {
            self.control.get_bits(5..=6)
        };
        self.repeat = self.control.get_bit(9);
        self.trigger_irq = self.control.get_bit(14);
    }

    fn latch_source_address(&mut self) {
        // channel 0 cannot read the cartridge space
        let mask = if self.index == 0 { 0x07FF_FFFF } else { 0x0FFF_FFFF };
        let align = if self.word_size == 2 { !0b1 } else { !0b11 };
        self.src_addr = self.source_address & mask & align;
    }

    pub(crate) fn latch_destination_address(&mut self) {
        // only channel 3 can write the cartridge space
        let mask = if self.index < 3 { 0x07FF_FFFF } else { 0x0FFF_FFFF };
        let align = if self.word_size == 2 { !0b1 } else { !0b11 };
        self.dst_addr = self.destination_address & mask & align;
    }

    pub(crate) fn latch_word_count(&mut self) {
        if self.start_condition == StartCondition::SoundFifo {
            self.count = 4;
            return;
        }
        self.count = match self.word_count {
            0 if self.index < 3 => 0x4000,
            0 => 0x1_0000,
            n => u32::from(n),
        };
    }
}

#[derive(Serialize, Deserialize)]
pub struct Dma {
    pub channels: [Channel; 4],
}

impl Default for Dma {
    fn default() -> Self {
        Self {
            channels: std::array::from_fn(Channel::new),
        }
    }
}

impl Dma {
    /// The lowest-indexed channel currently performing a transfer, if any.
    #[must_use]
    pub fn active_channel(&self) -> Option<usize> {
        self.channels
            .iter()
            .position(|channel| channel.status == Status::Active)
    }

    /// Grants the bus to one triggered channel, lower index first.
    pub fn activate_one(&mut self) {
        if let Some(channel) = self
            .channels
            .iter_mut()
            .find(|channel| channel.status == Status::Triggered)
        {
            channel.status = Status::Active;
        }
    }
}
