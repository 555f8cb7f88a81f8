//! Core traits and types for the C64/1541 emulation workspace.
//!
//! Everything here is chip-agnostic: the scheduling contract between the
//! master tick loop and the I/O chips, the memory bus seen by CPU cores,
//! the chip identity tags used by interrupt bookkeeping, and the
//! byte-ordered snapshot plumbing shared by all components.

mod bus;
mod io_chip;
mod snapshot;
mod tag;

pub use bus::Bus;
pub use io_chip::{IoChip, NEVER};
pub use snapshot::{
    Snapshot, SnapshotError, SnapshotReader, SnapshotWriter, SNAPSHOT_HEADER_LEN,
};
pub use tag::ChipTag;
