//! Top-level GBA system: the deterministic master-cycle loop.
//!
//! One master cycle executes exactly one step across CPU-or-DMA, the picture
//! processor, every timer and the sound engine, in that order. When a DMA
//! channel is `Active` it steals the cycle from the CPU; after a CPU step,
//! immediate channels are promoted and one triggered channel is granted the
//! bus. The host drives the machine one frame (280,896 cycles) at a time.

use crate::cartridge::Cartridge;
use crate::cpu::arm7tdmi::Arm7tdmi;
use crate::cpu::hardware::dma::StartCondition;
use crate::cpu::hardware::interrupt_control::IRQ_KEYPAD;

pub const CYCLES_PER_FRAME: usize = 280_896;

#[derive(Default)]
pub struct Gba {
    pub cpu: Arm7tdmi,

    running: bool,
}

impl Gba {
    /// Copies a raw BIOS image into the boot region.
    pub fn load_bios(&mut self, data: &[u8]) {
        self.cpu.bus.load_bios(data);
    }

    /// Loads a raw cartridge image; the backup variant is selected by
    /// scanning the image for its ASCII tag.
    pub fn load_rom(&mut self, data: &[u8]) {
        self.cpu.bus.cartridge = Cartridge::new(data);
    }

    /// Fills the pipeline from the reset state; call once before the first
    /// [`Gba::update`].
    pub fn start(&mut self) {
        self.cpu.refill_pipeline();
        self.running = true;
    }

    /// Sets the keypad state from the currently pressed logical keys, then
    /// runs one frame. Does nothing until [`Gba::start`] has been called.
    pub fn update(&mut self, keys: &[&str]) {
        if !self.running {
            return;
        }
        if self.cpu.bus.keypad.set_keys(keys) {
            self.cpu.bus.interrupt_control.request(IRQ_KEYPAD);
        }
        for _ in 0..CYCLES_PER_FRAME {
            self.step();
        }
    }

    /// One master cycle.
    pub fn step(&mut self) {
        match self.cpu.bus.dma.active_channel() {
            Some(channel) => self.cpu.bus.step_dma(channel),
            None => {
                self.cpu.step();
                self.cpu.bus.trigger_dma(StartCondition::Immediate);
                self.cpu.bus.dma.activate_one();
            }
        }
        self.cpu.bus.step_ppu();
        self.cpu.bus.step_timers();
        self.cpu.bus.sound.step();
    }

    /// The 240x160 RGBA8888 frame buffer rendered by the last frame.
    #[must_use]
    pub fn frame_buffer(&self) -> &[u8] {
        self.cpu.bus.lcd.frame_buffer()
    }

    /// Creates the bounded audio sample ring (32,768 Hz mono, `f32` in
    /// [-1, 1]) and hands the consumer end to the host. Publishing is
    /// non-blocking; samples are dropped while the ring is full.
    pub fn connect_audio(&mut self, capacity: usize) -> rtrb::Consumer<f32> {
        self.cpu.bus.sound.connect(capacity)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bitwise::Bits;
    use pretty_assertions::assert_eq;

    /// Builds a machine executing an endless loop at the reset vector.
    fn gba_with_idle_rom() -> Gba {
        let mut gba = Gba::default();
        // b 0x08000000 (branch to self)
        let mut rom = vec![0u8; 0x100];
        rom[0..4].copy_from_slice(&0xEAFF_FFFEu32.to_le_bytes());
        gba.load_rom(&rom);
        gba.start();
        gba
    }

    #[test]
    fn reset_vector_and_pipeline() {
        let gba = gba_with_idle_rom();
        assert_eq!(gba.cpu.registers.program_counter(), 0x0800_0008);
        assert_eq!(gba.cpu.pipeline()[1], 0xEAFF_FFFE);
    }

    #[test]
    fn one_frame_returns_with_the_beam_at_line_zero() {
        let mut gba = gba_with_idle_rom();
        gba.update(&[]);
        // after exactly one frame the beam is back at line 0
        assert_eq!(gba.cpu.bus.lcd.vcount, 0);
    }

    #[test]
    fn dma_immediate_copy() {
        let mut gba = gba_with_idle_rom();
        for i in 0..16 {
            gba.cpu.bus.write_byte(0x0200_0000 + i, i as u8);
        }

        // program DMA0: 4 words, immediate, increment/increment
        gba.cpu.bus.write_word(0x0400_00B0, 0x0200_0000);
        gba.cpu.bus.write_word(0x0400_00B4, 0x0200_0100);
        gba.cpu.bus.write_half_word(0x0400_00B8, 4);
        gba.cpu
            .bus
            .write_half_word(0x0400_00BA, 1 << 15 | 1 << 10);

        gba.update(&[]);

        for i in 0..16 {
            assert_eq!(
                gba.cpu.bus.read_byte(0x0200_0100 + i),
                gba.cpu.bus.read_byte(0x0200_0000 + i)
            );
        }
        // no IRQ was requested
        assert!(!gba.cpu.bus.interrupt_control.interrupt_request.get_bit(8));
        // the enable bit cleared on completion
        assert!(!gba.cpu.bus.dma.channels[0].control.get_bit(15));
    }

    #[test]
    fn dma_completion_irq() {
        let mut gba = gba_with_idle_rom();
        gba.cpu.bus.write_word(0x0400_00B0, 0x0200_0000);
        gba.cpu.bus.write_word(0x0400_00B4, 0x0200_0100);
        gba.cpu.bus.write_half_word(0x0400_00B8, 1);
        gba.cpu
            .bus
            .write_half_word(0x0400_00BA, 1 << 15 | 1 << 14);

        gba.update(&[]);
        assert!(gba.cpu.bus.interrupt_control.interrupt_request.get_bit(8));
    }

    #[test]
    fn timer_cascade_overflows_after_three_cycles() {
        let mut gba = gba_with_idle_rom();
        gba.cpu.bus.write_half_word(0x0400_0100, 0xFFFF); // TM0 reload
        gba.cpu.bus.write_half_word(0x0400_0104, 0xFFFE); // TM1 reload
        gba.cpu
            .bus
            .write_half_word(0x0400_0106, 1 << 7 | 1 << 6 | 1 << 2); // TM1: cascade, irq
        gba.cpu.bus.write_half_word(0x0400_0102, 1 << 7); // TM0: enable

        for _ in 0..3 {
            gba.step();
        }
        assert!(gba.cpu.bus.interrupt_control.interrupt_request.get_bit(4));
    }

    #[test]
    fn keypad_interrupt_on_match() {
        let mut gba = gba_with_idle_rom();
        gba.cpu.bus.write_half_word(0x0400_0132, 0x4001); // KEYCNT: match A

        gba.update(&[]);
        assert!(!gba.cpu.bus.interrupt_control.interrupt_request.get_bit(12));

        // "X" maps to the A button
        gba.update(&["X"]);
        assert!(gba.cpu.bus.interrupt_control.interrupt_request.get_bit(12));
    }

    #[test]
    fn mode4_backdrop_scanline() {
        let mut gba = gba_with_idle_rom();
        gba.cpu.bus.write_half_word(0x0400_0000, 4); // DISPCNT mode 4
        gba.cpu.bus.write_half_word(0x0500_0000, 0x001F); // palette 0 red

        gba.update(&[]);

        let frame = gba.frame_buffer();
        for x in 0..240 {
            assert_eq!(frame[x * 4..x * 4 + 4], [0xFF, 0, 0, 0xFF]);
        }
    }

    #[test]
    fn vblank_irq_interrupts_the_cpu() {
        let mut gba = gba_with_idle_rom();
        gba.cpu.bus.write_half_word(0x0400_0004, 1 << 3); // DISPSTAT vblank irq
        gba.cpu.bus.write_half_word(0x0400_0200, 1); // IE vblank
        gba.cpu.bus.write_word(0x0400_0208, 1); // IME
        gba.cpu.cpsr.set_irq_disable(false);

        gba.update(&[]);

        // the CPU entered the IRQ exception vector
        assert!(gba.cpu.bus.interrupt_control.interrupt_request.get_bit(0));
        assert_eq!(
            gba.cpu.cpsr.mode(),
            crate::cpu::cpu_modes::Mode::Irq
        );
    }

    #[test]
    fn sound_fifo_dma_refills_on_timer_overflow() {
        let mut gba = gba_with_idle_rom();
        // source samples in EWRAM
        for i in 0..64 {
            gba.cpu.bus.write_byte(0x0200_0000 + i, i as u8);
        }
        // SOUNDCNT_H: FIFO A fed by timer 0
        gba.cpu.bus.write_half_word(0x0400_0082, 0);
        // DMA1: source EWRAM, destination FIFO_A, sound mode, repeat
        gba.cpu.bus.write_word(0x0400_00BC, 0x0200_0000);
        gba.cpu.bus.write_word(0x0400_00C0, 0x0400_00A0);
        gba.cpu
            .bus
            .write_half_word(0x0400_00C6, 1 << 15 | 0b11 << 12 | 1 << 9);
        // timer 0 overflows every cycle
        gba.cpu.bus.write_half_word(0x0400_0100, 0xFFFF);
        gba.cpu.bus.write_half_word(0x0400_0102, 1 << 7);

        // each overflow pops the (empty, below watermark) FIFO and triggers
        // the DMA, which copies 16 bytes once granted
        for _ in 0..64 {
            gba.step();
        }
        assert!(gba.cpu.bus.sound.fifo_len(0) > 0);
    }
}
