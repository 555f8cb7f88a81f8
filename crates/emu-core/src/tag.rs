//! Stable chip identity tags.

use crate::SnapshotError;

/// Identifies a chip instance in interrupt source lists and snapshots.
///
/// Snapshots store the one-byte discriminant, so the values are part of
/// the on-disk format and must never be renumbered.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum ChipTag {
    /// The drive's serial bus controller VIA (VIA0 at $1800).
    BusController = 0,
    /// The drive's disk controller VIA (VIA1 at $1C00).
    DiskController = 1,
    /// The C64's video chip.
    Vic = 2,
}

impl ChipTag {
    /// Decode a tag byte from a snapshot.
    pub fn from_byte(byte: u8) -> Result<Self, SnapshotError> {
        match byte {
            0 => Ok(Self::BusController),
            1 => Ok(Self::DiskController),
            2 => Ok(Self::Vic),
            other => Err(SnapshotError::UnknownChipTag(other)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tag_bytes_are_stable() {
        assert_eq!(ChipTag::BusController as u8, 0);
        assert_eq!(ChipTag::DiskController as u8, 1);
    }

    #[test]
    fn unknown_tag_rejected() {
        assert!(matches!(
            ChipTag::from_byte(7),
            Err(SnapshotError::UnknownChipTag(7))
        ));
    }
}
