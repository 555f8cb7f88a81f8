//! Commodore 64 core emulation with an attached 1541 floppy drive.
//!
//! Three tightly coupled subsystems form the core:
//!
//! - the VIC-II sprite pipeline: eight per-sprite state machines with
//!   DMA read state, expansion state, and a pixel serializer, driven
//!   once per scanline by the [`Vic`] host
//! - the 1541 drive CPU: the extensible 6502 core from `mos-6502` with
//!   synthetic trap opcodes patched over firmware ROM locations
//! - the disk controller job dispatcher: the firmware's five-slot job
//!   queue in drive RAM, translated into calls on a [`DiskBackend`]
//!
//! They share one data path: CPU reads hit the VIA register files, VIA
//! output drives the disk mechanics, and the sprite engines index into
//! the shared emulated memory. Everything serialises through a single
//! cooperative tick loop; chips are brought up to date through the
//! `IoChip` cycle-deadline protocol from `emu-core`.

pub mod c64;
pub mod config;
pub mod drive;
pub mod memory;
pub mod sprite;
pub mod vic;

pub use c64::C64;
pub use config::{ConfigError, DriveConfig, FLOPPY_ROM_NAME, FLOPPY_ROM_SIZE};
pub use drive::backend::{DiskBackend, DiskError, RamDisk, BYTES_PER_SECTOR, SECTORS_PER_TRACK};
pub use drive::cpu::DriveCpu;
pub use drive::via_bus::BusControllerVia;
pub use drive::via_disk::DiskControllerVia;
pub use drive::C1541;
pub use memory::{new_shared_ram, SharedRam};
pub use sprite::Sprite;
pub use vic::Vic;
