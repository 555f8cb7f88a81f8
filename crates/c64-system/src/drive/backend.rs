//! Disk I/O backend contract.
//!
//! The job dispatcher translates firmware job-queue entries into block
//! operations on this trait. Blocks are always 256 bytes; track/sector
//! geometry follows the 35-track 1541 layout.

use thiserror::Error;

/// Bytes per disk block.
pub const BYTES_PER_SECTOR: usize = 256;

/// Sectors per track, indexed by track number (index 0 unused).
pub const SECTORS_PER_TRACK: [u8; 36] = [
    0, // track 0 doesn't exist
    21, 21, 21, 21, 21, 21, 21, 21, 21, 21, 21, 21, 21, 21, 21, 21, 21, // 1-17
    19, 19, 19, 19, 19, 19, 19, // 18-24
    18, 18, 18, 18, 18, 18, // 25-30
    17, 17, 17, 17, 17, // 31-35
];

/// Disk I/O failures.
///
/// The first three variants map onto job status bytes and keep the
/// emulation running; [`Unsupported`](DiskError::Unsupported) aborts it.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum DiskError {
    #[error("block {track}/{sector} not found")]
    BlockNotFound { track: u8, sector: u8 },
    #[error("disk is write-protected")]
    WriteProtected,
    #[error("no disk in drive")]
    NoDisk,
    #[error("{0}")]
    Unsupported(&'static str),
}

/// Block-level access to the drive medium.
///
/// `goto_block` positions the head; the following `read_block` or
/// `write_block` transfers the 256 bytes at that position. Operations
/// are synchronous; emulated cycles freeze while a backend blocks.
pub trait DiskBackend {
    /// Position on the given track and sector.
    fn goto_block(&mut self, track: u8, sector: u8) -> Result<(), DiskError>;

    /// Read the current block.
    fn read_block(&mut self) -> Result<[u8; BYTES_PER_SECTOR], DiskError>;

    /// Write the current block.
    fn write_block(&mut self, data: &[u8; BYTES_PER_SECTOR]) -> Result<(), DiskError>;
}

/// Memory-backed disk with the standard 683-block geometry.
///
/// Used by tests and by hosts that load media images themselves; image
/// parsing belongs to external collaborators.
pub struct RamDisk {
    blocks: Vec<[u8; BYTES_PER_SECTOR]>,
    position: Option<usize>,
    write_protected: bool,
}

impl RamDisk {
    /// A formatted, empty disk.
    #[must_use]
    pub fn new() -> Self {
        let total: usize = SECTORS_PER_TRACK.iter().map(|&s| usize::from(s)).sum();
        Self {
            blocks: vec![[0; BYTES_PER_SECTOR]; total],
            position: None,
            write_protected: false,
        }
    }

    pub fn set_write_protected(&mut self, protected: bool) {
        self.write_protected = protected;
    }

    /// Linear block index for a track/sector pair.
    fn block_index(track: u8, sector: u8) -> Option<usize> {
        if !(1..=35).contains(&track) || sector >= SECTORS_PER_TRACK[usize::from(track)] {
            return None;
        }
        let before: usize = SECTORS_PER_TRACK[..usize::from(track)]
            .iter()
            .map(|&s| usize::from(s))
            .sum();
        Some(before + usize::from(sector))
    }

    /// Direct block access for staging test data.
    pub fn block_mut(&mut self, track: u8, sector: u8) -> Option<&mut [u8; BYTES_PER_SECTOR]> {
        Self::block_index(track, sector).map(|i| &mut self.blocks[i])
    }
}

impl Default for RamDisk {
    fn default() -> Self {
        Self::new()
    }
}

impl DiskBackend for RamDisk {
    fn goto_block(&mut self, track: u8, sector: u8) -> Result<(), DiskError> {
        match Self::block_index(track, sector) {
            Some(index) => {
                self.position = Some(index);
                Ok(())
            }
            None => Err(DiskError::BlockNotFound { track, sector }),
        }
    }

    fn read_block(&mut self) -> Result<[u8; BYTES_PER_SECTOR], DiskError> {
        let index = self.position.ok_or(DiskError::NoDisk)?;
        Ok(self.blocks[index])
    }

    fn write_block(&mut self, data: &[u8; BYTES_PER_SECTOR]) -> Result<(), DiskError> {
        if self.write_protected {
            return Err(DiskError::WriteProtected);
        }
        let index = self.position.ok_or(DiskError::NoDisk)?;
        self.blocks[index] = *data;
        Ok(())
    }
}
