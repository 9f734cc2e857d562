//! Cartridge ROM and the byte-addressable backup device.
//!
//! The backup variant is picked by scanning the ROM image for an ASCII tag:
//! `SRAM` selects plain static RAM, `FLASH1M` the 128 KiB flash part with its
//! command state machine. Without any tag the cartridge defaults to SRAM.

use serde::{Deserialize, Serialize};

const ROM_SIZE: usize = 32 * 1024 * 1024;

fn contains_tag(data: &[u8], tag: &[u8]) -> bool {
    data.windows(tag.len()).any(|window| window == tag)
}

/// Progress through the flash command prefix (0x5555<-0xAA, 0x2AAA<-0x55).
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum FlashState {
    #[default]
    Ready,
    Command1,
    Command2,
}

/// 128 KiB flash. The ID-mode entry/exit sequences are recognised; every
/// other sequence is accepted and written through.
#[derive(Serialize, Deserialize)]
pub struct Flash {
    memory: Vec<u8>,
    state: FlashState,
    id_mode: bool,
}

impl Default for Flash {
    fn default() -> Self {
        Self {
            memory: vec![0xFF; 0x20000],
            state: FlashState::Ready,
            id_mode: false,
        }
    }
}

impl Flash {
    const MANUFACTURER_ID: u8 = 0x62;
    const DEVICE_ID: u8 = 0x13;

    fn read8(&self, offset: u32) -> u8 {
        if self.id_mode {
            match offset {
                0 => return Self::MANUFACTURER_ID,
                1 => return Self::DEVICE_ID,
                _ => {}
            }
        }
        self.memory[(offset & 0xFFFF) as usize]
    }

    fn write8(&mut self, offset: u32, value: u8) {
        match (self.state, offset, value) {
            (FlashState::Ready, 0x5555, 0xAA) => self.state = FlashState::Command1,
            (FlashState::Command1, 0x2AAA, 0x55) => self.state = FlashState::Command2,
            (FlashState::Command2, 0x5555, 0x90) => {
                self.id_mode = true;
                self.state = FlashState::Ready;
            }
            (FlashState::Command2, 0x5555, 0xF0) => {
                self.id_mode = false;
                self.state = FlashState::Ready;
            }
            _ => {
                self.state = FlashState::Ready;
                self.memory[(offset & 0xFFFF) as usize] = value;
            }
        }
    }
}

/// 32 KiB of battery-backed static RAM.
#[derive(Serialize, Deserialize)]
pub struct Sram {
    memory: Vec<u8>,
}

impl Default for Sram {
    fn default() -> Self {
        Self {
            memory: vec![0; 0x8000],
        }
    }
}

#[derive(Serialize, Deserialize)]
pub enum Backup {
    Sram(Sram),
    Flash(Flash),
}

impl Default for Backup {
    fn default() -> Self {
        Self::Sram(Sram::default())
    }
}

impl Backup {
    fn detect(rom: &[u8]) -> Self {
        if contains_tag(rom, b"SRAM") {
            Self::Sram(Sram::default())
        } else if contains_tag(rom, b"FLASH1M") {
            Self::Flash(Flash::default())
        } else {
            Self::Sram(Sram::default())
        }
    }

    #[must_use]
    pub fn read8(&self, offset: u32) -> u8 {
        match self {
            Self::Sram(sram) => sram.memory[(offset & 0x7FFF) as usize],
            Self::Flash(flash) => flash.read8(offset),
        }
    }

    pub fn write8(&mut self, offset: u32, value: u8) {
        match self {
            Self::Sram(sram) => sram.memory[(offset & 0x7FFF) as usize] = value,
            Self::Flash(flash) => flash.write8(offset, value),
        }
    }
}

#[derive(Serialize, Deserialize)]
pub struct Cartridge {
    rom: Vec<u8>,
    pub backup: Backup,
}

impl Default for Cartridge {
    fn default() -> Self {
        Self {
            rom: vec![0; ROM_SIZE],
            backup: Backup::default(),
        }
    }
}

impl Cartridge {
    /// Loads a raw ROM image (clamped to 32 MiB) and selects the backup
    /// variant from the image contents.
    #[must_use]
    pub fn new(data: &[u8]) -> Self {
        if data.len() > ROM_SIZE {
            tracing::warn!("ROM image larger than 32 MiB, truncating");
        }
        let mut rom = vec![0; ROM_SIZE];
        let len = data.len().min(ROM_SIZE);
        rom[..len].copy_from_slice(&data[..len]);
        let backup = Backup::detect(data);
        logger::log(match backup {
            Backup::Sram(_) => "cartridge backup: SRAM",
            Backup::Flash(_) => "cartridge backup: FLASH 128K",
        });
        Self { rom, backup }
    }

    #[must_use]
    pub fn read_rom(&self, offset: u32) -> u8 {
        self.rom[(offset & 0x1FF_FFFF) as usize]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn backup_variant_detection() {
        assert!(matches!(
            Cartridge::new(b"xxSRAM_Vxx").backup,
            Backup::Sram(_)
        ));
        assert!(matches!(
            Cartridge::new(b"xxFLASH1M_Vxx").backup,
            Backup::Flash(_)
        ));
        assert!(matches!(Cartridge::new(b"plain").backup, Backup::Sram(_)));
        // SRAM wins when both tags appear
        assert!(matches!(
            Cartridge::new(b"SRAM FLASH1M").backup,
            Backup::Sram(_)
        ));
    }

    #[test]
    fn oversized_rom_is_clamped() {
        let data = vec![0xAB; ROM_SIZE + 16];
        let cartridge = Cartridge::new(&data);
        assert_eq!(cartridge.read_rom(0x1FF_FFFF), 0xAB);
    }

    #[test]
    fn sram_is_masked_to_32k() {
        let mut backup = Backup::default();
        backup.write8(0x8001, 0x42);
        assert_eq!(backup.read8(0x0001), 0x42);
    }

    #[test]
    fn flash_id_mode_sequence() {
        let mut flash = Flash::default();
        flash.write8(0x5555, 0xAA);
        flash.write8(0x2AAA, 0x55);
        flash.write8(0x5555, 0x90);
        assert_eq!(flash.read8(0), 0x62);
        assert_eq!(flash.read8(1), 0x13);
        // other offsets still read memory
        assert_eq!(flash.read8(2), 0xFF);

        flash.write8(0x5555, 0xAA);
        flash.write8(0x2AAA, 0x55);
        flash.write8(0x5555, 0xF0);
        assert_eq!(flash.read8(0), 0xFF);
    }

    #[test]
    fn flash_plain_writes_fall_through() {
        let mut flash = Flash::default();
        flash.write8(0x1234, 0x77);
        assert_eq!(flash.read8(0x1234), 0x77);

        // an aborted command sequence writes through as well
        flash.write8(0x5555, 0xAA);
        flash.write8(0x2AAA, 0x99);
        assert_eq!(flash.read8(0x2AAA), 0x99);
    }
}
