//! The chip scheduling protocol.

/// Deadline value meaning "no update required".
pub const NEVER: u64 = u64::MAX;

/// Contract between the master tick loop and an I/O chip (VIC, VIA).
///
/// The scheduler must call [`update`](IoChip::update) with the current CPU
/// cycle count at or before the deadline reported by
/// [`next_update`](IoChip::next_update). A chip may report an earlier
/// deadline at any time to be re-expedited, or [`NEVER`] to idle.
///
/// # Ordering
///
/// [`read_register`](IoChip::read_register) reflects chip state as of the
/// most recent `update`. A caller that has advanced cycles since then must
/// `update` before reading.
pub trait IoChip {
    /// Read a chip register.
    fn read_register(&mut self, register: u16) -> u8;

    /// Write a chip register.
    fn write_register(&mut self, register: u16, data: u8);

    /// CPU cycle count at which the next `update` is required.
    fn next_update(&self) -> u64;

    /// Bring the chip up to date with the given CPU cycle count.
    fn update(&mut self, cycles: u64);

    /// Reset the chip to its power-on state.
    fn reset(&mut self);
}
