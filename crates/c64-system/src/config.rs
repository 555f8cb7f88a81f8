//! Construction-time configuration.

use thiserror::Error;

/// Resource name of the 1541 firmware image.
pub const FLOPPY_ROM_NAME: &str = "/roms/floppy.c64";

/// Size of the 1541 firmware image.
pub const FLOPPY_ROM_SIZE: usize = 0x4000;

/// Configuration errors raised at construction time.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("{name}: bad ROM image size {found} (expected {expected})")]
    RomSize {
        name: &'static str,
        expected: usize,
        found: usize,
    },
}

/// Configuration for a 1541 drive instance.
pub struct DriveConfig {
    /// 16 KiB firmware image (the `/roms/floppy.c64` resource).
    pub rom: Vec<u8>,
    /// Emulate the disk controller at VIA level instead of running the
    /// native job dispatcher when trap 0x100 fires.
    pub emulate_disk_controller: bool,
}

impl DriveConfig {
    /// Validate a firmware image and build the default configuration.
    pub fn new(rom: Vec<u8>) -> Result<Self, ConfigError> {
        if rom.len() != FLOPPY_ROM_SIZE {
            return Err(ConfigError::RomSize {
                name: FLOPPY_ROM_NAME,
                expected: FLOPPY_ROM_SIZE,
                found: rom.len(),
            });
        }
        Ok(Self {
            rom,
            emulate_disk_controller: false,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rom_size_is_validated() {
        assert!(DriveConfig::new(vec![0; FLOPPY_ROM_SIZE]).is_ok());
        assert!(DriveConfig::new(vec![0; 0x2000]).is_err());
    }
}
