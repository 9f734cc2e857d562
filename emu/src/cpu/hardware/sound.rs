use std::collections::VecDeque;

use serde::{Deserialize, Serialize};

use crate::bitwise::Bits;

const SYSTEM_CLOCK: i32 = 16 * 1024 * 1024;

/// Square-wave duty patterns (12.5%, 25%, 50%, 75%).
const WAVE_DUTY: [[bool; 8]; 4] = [
    [false, true, false, false, false, false, false, false],
    [false, true, true, false, false, false, false, false],
    [false, true, true, true, true, false, false, false],
    [true, false, false, true, true, true, true, true],
];

const fn duty_period(frequency: i32) -> i32 {
    16 * (2048 - frequency)
}

/// Tone channel 1: square wave with sweep, envelope and length.
#[derive(Default, Serialize, Deserialize)]
pub struct ToneSweepChannel {
    /// SOUND1CNT_L
    pub sweep: u16,
    /// SOUND1CNT_H
    pub duty_length_envelope: u16,
    /// SOUND1CNT_X
    pub frequency_control: u16,

    duty_counter: i32,
    sweep_counter: i32,
    envelope_counter: i32,
    length_counter: i32,

    sweep_period: i32,
    envelope_period: i32,
    length_period: i32,

    duty_step: usize,
    frequency: i32,
    volume: i32,

    enabled: bool,
}

impl ToneSweepChannel {
    pub fn start(&mut self) {
        self.duty_step = 0;
        self.frequency = i32::from(self.frequency_control & 0x7FF);
        self.volume = i32::from(self.duty_length_envelope.get_bits(12..=15));

        self.sweep_period = SYSTEM_CLOCK / 128 * i32::from(self.sweep.get_bits(4..=6));
        self.envelope_period =
            SYSTEM_CLOCK / 64 * i32::from(self.duty_length_envelope.get_bits(8..=10));
        self.length_period =
            SYSTEM_CLOCK / 256 * (64 - i32::from(self.duty_length_envelope & 0x3F));

        self.duty_counter = duty_period(self.frequency);
        self.sweep_counter = self.sweep_period;
        self.envelope_counter = self.envelope_period;
        self.length_counter = self.length_period;

        self.enabled = true;
    }

    pub fn step(&mut self) {
        self.duty_counter -= 1;
        if self.duty_counter <= 0 {
            self.duty_counter = duty_period(self.frequency);
            self.duty_step = (self.duty_step + 1) & 7;
        }
        if self.sweep_period > 0 {
            self.sweep_counter -= 1;
            if self.sweep_counter <= 0 {
                self.sweep_counter = self.sweep_period;
                let delta = self.frequency >> (self.sweep & 0x7);
                if self.sweep.get_bit(3) {
                    self.frequency -= delta;
                } else {
                    self.frequency += delta;
                }
                // sweeping out of range silences the channel
                if !(0..=2047).contains(&self.frequency) {
                    self.enabled = false;
                    return;
                }
                self.frequency_control =
                    (self.frequency_control & 0xF800) | self.frequency as u16;
            }
        }
        if self.envelope_period > 0 {
            self.envelope_counter -= 1;
            if self.envelope_counter <= 0 {
                self.envelope_counter = self.envelope_period;
                if self.duty_length_envelope.get_bit(11) {
                    self.volume = (self.volume + 1).min(15);
                } else {
                    self.volume = (self.volume - 1).max(0);
                }
            }
        }
        if self.frequency_control.get_bit(14) {
            self.length_counter -= 1;
            if self.length_counter <= 0 {
                self.enabled = false;
            }
        }
    }

    #[must_use]
    pub fn output(&self) -> i32 {
        let pattern = usize::from(self.duty_length_envelope.get_bits(6..=7));
        if self.enabled && WAVE_DUTY[pattern][self.duty_step] {
            self.volume
        } else {
            0
        }
    }
}

/// Tone channel 2: square wave with envelope and length, no sweep.
#[derive(Default, Serialize, Deserialize)]
pub struct ToneChannel {
    /// SOUND2CNT_L
    pub duty_length_envelope: u16,
    /// SOUND2CNT_H
    pub frequency_control: u16,

    duty_counter: i32,
    envelope_counter: i32,
    length_counter: i32,

    envelope_period: i32,
    length_period: i32,

    duty_step: usize,
    frequency: i32,
    volume: i32,

    enabled: bool,
}

impl ToneChannel {
    pub fn start(&mut self) {
        self.duty_step = 0;
        self.frequency = i32::from(self.frequency_control & 0x7FF);
        self.volume = i32::from(self.duty_length_envelope.get_bits(12..=15));

        self.envelope_period =
            SYSTEM_CLOCK / 64 * i32::from(self.duty_length_envelope.get_bits(8..=10));
        self.length_period =
            SYSTEM_CLOCK / 256 * (64 - i32::from(self.duty_length_envelope & 0x3F));

        self.duty_counter = duty_period(self.frequency);
        self.envelope_counter = self.envelope_period;
        self.length_counter = self.length_period;

        self.enabled = true;
    }

    pub fn step(&mut self) {
        self.duty_counter -= 1;
        if self.duty_counter <= 0 {
            self.duty_counter = duty_period(self.frequency);
            self.duty_step = (self.duty_step + 1) & 7;
        }
        if self.envelope_period > 0 {
            self.envelope_counter -= 1;
            if self.envelope_counter <= 0 {
                self.envelope_counter = self.envelope_period;
                if self.duty_length_envelope.get_bit(11) {
                    self.volume = (self.volume + 1).min(15);
                } else {
                    self.volume = (self.volume - 1).max(0);
                }
            }
        }
        if self.frequency_control.get_bit(14) {
            self.length_counter -= 1;
            if self.length_counter <= 0 {
                self.enabled = false;
            }
        }
    }

    #[must_use]
    pub fn output(&self) -> i32 {
        let pattern = usize::from(self.duty_length_envelope.get_bits(6..=7));
        if self.enabled && WAVE_DUTY[pattern][self.duty_step] {
            self.volume
        } else {
            0
        }
    }
}

/// Tone channel 3: programmable wave table. The 64-nibble table is split into
/// two 32-nibble banks; the control bit selects the playing bank and CPU
/// accesses land in the other one.
#[derive(Default, Serialize, Deserialize)]
pub struct WaveChannel {
    /// SOUND3CNT_L
    pub stop_wave_ram_select: u16,
    /// SOUND3CNT_H
    pub length_volume: u16,
    /// SOUND3CNT_X
    pub frequency_control: u16,

    wave_ram: [[u8; 16]; 2],

    step_counter: i32,
    length_counter: i32,

    step_period: i32,
    length_period: i32,

    wave_index: usize,

    enabled: bool,
}

impl WaveChannel {
    pub fn start(&mut self) {
        self.wave_index = 0;

        self.step_period = 2 * (2048 - i32::from(self.frequency_control & 0x7FF));
        self.length_period = SYSTEM_CLOCK / 256 * (256 - i32::from(self.length_volume & 0xFF));

        self.step_counter = self.step_period;
        self.length_counter = self.length_period;

        self.enabled = true;
    }

    pub fn step(&mut self) {
        self.step_counter -= 1;
        if self.step_counter <= 0 {
            self.step_counter = self.step_period;
            self.wave_index = (self.wave_index + 1) & 0x1F;
        }
        if self.frequency_control.get_bit(14) {
            self.length_counter -= 1;
            if self.length_counter <= 0 {
                self.enabled = false;
            }
        }
    }

    fn playing_bank(&self) -> usize {
        usize::from(self.stop_wave_ram_select.get_bit(6))
    }

    /// Wave RAM reads/writes through the I/O window go to the bank that is
    /// not being played.
    #[must_use]
    pub fn read_ram(&self, offset: usize) -> u8 {
        self.wave_ram[1 - self.playing_bank()][offset & 0xF]
    }

    pub fn write_ram(&mut self, offset: usize, value: u8) {
        self.wave_ram[1 - self.playing_bank()][offset & 0xF] = value;
    }

    #[must_use]
    pub fn output(&self) -> i32 {
        if !self.enabled || !self.stop_wave_ram_select.get_bit(7) {
            return 0;
        }
        let byte = self.wave_ram[self.playing_bank()][self.wave_index / 2];
        let mut volume = if self.wave_index & 1 == 0 {
            i32::from(byte >> 4)
        } else {
            i32::from(byte & 0xF)
        };
        if self.length_volume.get_bit(15) {
            volume = volume * 3 / 4;
        } else {
            match self.length_volume.get_bits(13..=14) {
                0 => volume = 0,
                1 => {}
                2 => volume /= 2,
                _ => volume /= 4,
            }
        }
        volume
    }
}

/// Tone channel 4: LFSR noise with envelope and length.
#[derive(Default, Serialize, Deserialize)]
pub struct NoiseChannel {
    /// SOUND4CNT_L
    pub length_envelope: u16,
    /// SOUND4CNT_H
    pub frequency_control: u16,

    step_counter: i32,
    envelope_counter: i32,
    length_counter: i32,

    step_period: i32,
    envelope_period: i32,
    length_period: i32,

    volume: i32,
    state: u32,

    enabled: bool,
}

impl NoiseChannel {
    pub fn start(&mut self) {
        self.volume = i32::from(self.length_envelope.get_bits(12..=15));
        self.state = if self.frequency_control.get_bit(3) {
            0x40 // 7-bit LFSR
        } else {
            0x4000 // 15-bit LFSR
        };

        let r = i32::from(self.frequency_control & 0x7);
        let s = i32::from(self.frequency_control.get_bits(4..=6));

        self.step_period = 32;
        if r == 0 {
            self.step_period /= 2;
        } else {
            self.step_period *= r;
        }
        self.step_period <<= s + 1;

        self.envelope_period =
            SYSTEM_CLOCK / 64 * i32::from(self.length_envelope.get_bits(8..=10));
        self.length_period = SYSTEM_CLOCK / 256 * (64 - i32::from(self.length_envelope & 0x3F));

        self.step_counter = self.step_period;
        self.envelope_counter = self.envelope_period;
        self.length_counter = self.length_period;

        self.enabled = true;
    }

    pub fn step(&mut self) {
        self.step_counter -= 1;
        if self.step_counter <= 0 {
            self.step_counter = self.step_period;
            let carry = self.state & 1 != 0;
            self.state >>= 1;
            if carry {
                if self.frequency_control.get_bit(3) {
                    self.state ^= 0x60;
                } else {
                    self.state ^= 0x6000;
                }
            }
        }
        if self.envelope_period > 0 {
            self.envelope_counter -= 1;
            if self.envelope_counter <= 0 {
                self.envelope_counter = self.envelope_period;
                if self.length_envelope.get_bit(11) {
                    self.volume = (self.volume + 1).min(15);
                } else {
                    self.volume = (self.volume - 1).max(0);
                }
            }
        }
        if self.frequency_control.get_bit(14) {
            self.length_counter -= 1;
            if self.length_counter <= 0 {
                self.enabled = false;
            }
        }
    }

    #[must_use]
    pub fn output(&self) -> i32 {
        if self.enabled && self.state & 1 != 0 {
            self.volume
        } else {
            0
        }
    }
}

/// The sound engine: four tone channels, two direct-sound FIFOs and a
/// 32.768 kHz mixer publishing into a bounded lossy ring buffer.
#[derive(Default)]
pub struct Sound {
    pub channel1: ToneSweepChannel,
    pub channel2: ToneChannel,
    pub channel3: WaveChannel,
    pub channel4: NoiseChannel,

    /// SOUNDCNT_L
    pub control_stereo_volume_enable: u16,
    /// SOUNDCNT_H
    pub control_mixing_dma_control: u16,
    /// SOUNDCNT_X
    pub control_sound_on_off: u16,

    fifo: [VecDeque<u8>; 2],
    dma_sound: [i8; 2],
    cycles: u64,

    sample_tx: Option<rtrb::Producer<f32>>,
}

impl Sound {
    /// Creates the bounded sample ring and returns the consumer end for the
    /// host. Samples published while no consumer is attached are dropped.
    pub fn connect(&mut self, capacity: usize) -> rtrb::Consumer<f32> {
        let (producer, consumer) = rtrb::RingBuffer::new(capacity);
        self.sample_tx = Some(producer);
        consumer
    }

    pub fn fifo_push(&mut self, index: usize, value: u8) {
        self.fifo[index].push_back(value);
    }

    #[must_use]
    pub fn fifo_len(&self, index: usize) -> usize {
        self.fifo[index].len()
    }

    /// Pops one 8-bit signed sample into the direct-sound slot. Returns true
    /// when the queue has drained low enough that the feeding DMA should be
    /// retriggered.
    pub fn fifo_pop(&mut self, index: usize) -> bool {
        if let Some(value) = self.fifo[index].pop_front() {
            self.dma_sound[index] = value as i8;
        }
        self.fifo[index].len() <= 16
    }

    /// Clears a FIFO (SOUNDCNT_H reset bits); the feeding DMA is retriggered
    /// immediately.
    pub fn fifo_reset(&mut self, index: usize) {
        self.fifo[index].clear();
    }

    /// A timer overflow ticks the FIFOs whose timer-select matches. Returns,
    /// per FIFO, whether its DMA start condition should be asserted.
    pub fn timer_overflow(&mut self, timer_index: usize) -> [bool; 2] {
        let mut request_dma = [false; 2];
        if usize::from(self.control_mixing_dma_control.get_bit(10)) == timer_index {
            request_dma[0] = self.fifo_pop(0);
        }
        if usize::from(self.control_mixing_dma_control.get_bit(14)) == timer_index {
            request_dma[1] = self.fifo_pop(1);
        }
        request_dma
    }

    /// Advances every tone channel one master cycle; every 512 cycles
    /// (32.768 kHz) the mixed sample is published.
    pub fn step(&mut self) {
        self.cycles += 1;
        self.channel1.step();
        self.channel2.step();
        self.channel3.step();
        self.channel4.step();
        if self.cycles & 0x1FF == 0 {
            self.send_sample();
        }
    }

    fn send_sample(&mut self) {
        let tone1 = self.channel1.output() as f32 / 15.0;
        let tone2 = self.channel2.output() as f32 / 15.0;
        let tone3 = self.channel3.output() as f32 / 15.0;
        let tone4 = self.channel4.output() as f32 / 15.0;
        let direct_a = f32::from(self.dma_sound[0]) / 128.0;
        let direct_b = f32::from(self.dma_sound[1]) / 128.0;
        let sample = (tone1 + tone2 + tone3 + tone4 + direct_a + direct_b).clamp(-1.0, 1.0);
        if let Some(tx) = &mut self.sample_tx {
            // a full ring drops the sample
            let _ = tx.push(sample);
        }
    }
}
