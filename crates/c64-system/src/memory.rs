//! Shared system memory.
//!
//! The CPU writes memory and the VIC reads it for character and sprite
//! DMA fetches. Both views alias one flat array; the single-threaded
//! tick loop arbitrates visibility (chips are updated before their
//! registers are read), so interior mutability is all that is needed.

use std::cell::RefCell;
use std::rc::Rc;

/// Flat 8-bit memory shared between the CPU (mutable) and the VIC's
/// sprite/character DMA (read-only at update time).
pub type SharedRam = Rc<RefCell<Vec<u8>>>;

/// System RAM size for the C64 host.
pub const RAM_SIZE: usize = 0x10000;

/// Allocate zeroed shared RAM.
#[must_use]
pub fn new_shared_ram() -> SharedRam {
    Rc::new(RefCell::new(vec![0; RAM_SIZE]))
}
