//! VIA0 ($1800): the drive's serial bus controller.
//!
//! Port B carries the serial bus lines (bit 0 DATA IN, bit 1 DATA OUT,
//! bit 2 CLK IN, bit 3 CLK OUT, bit 4 ATN ACK, bit 7 ATN IN, active
//! low), with the ATN line also wired to CA1 for edge interrupts.

use emu_core::{IoChip, Snapshot, SnapshotError, SnapshotReader, SnapshotWriter};
use mos_via_6522::Via6522;

/// The serial bus controller VIA.
pub struct BusControllerVia {
    via: Via6522,
    /// Last driven ATN level (true = released/high).
    atn: bool,
}

impl BusControllerVia {
    #[must_use]
    pub fn new() -> Self {
        Self {
            via: Via6522::new(),
            atn: true,
        }
    }

    /// Drive the ATN input line. The level shows up inverted on port B
    /// bit 7 and clocks CA1 for the attention interrupt.
    pub fn set_atn(&mut self, level: bool) {
        self.atn = level;
        self.via.external_b = (self.via.external_b & !0x80) | if level { 0x80 } else { 0 };
        self.via.set_ca1(level);
    }

    /// Serial DATA line as driven by the drive (port B bit 1 or the
    /// ATN acknowledge path, bit 4).
    #[must_use]
    pub fn data_out(&self) -> bool {
        let pb = self.via.port_b_output();
        pb & 0x02 != 0 || pb & 0x10 != 0
    }

    /// Serial CLK line as driven by the drive (port B bit 3).
    #[must_use]
    pub fn clk_out(&self) -> bool {
        self.via.port_b_output() & 0x08 != 0
    }

    /// True when an enabled interrupt condition is raised.
    #[must_use]
    pub fn irq_active(&self) -> bool {
        self.via.irq_active()
    }
}

impl Default for BusControllerVia {
    fn default() -> Self {
        Self::new()
    }
}

impl IoChip for BusControllerVia {
    fn read_register(&mut self, register: u16) -> u8 {
        self.via.read_register(register)
    }

    fn write_register(&mut self, register: u16, data: u8) {
        self.via.write_register(register, data);
    }

    fn next_update(&self) -> u64 {
        self.via.next_update()
    }

    fn update(&mut self, cycles: u64) {
        self.via.update(cycles);
    }

    fn reset(&mut self) {
        self.via.reset();
        self.atn = true;
    }
}

impl Snapshot for BusControllerVia {
    fn save(&self, w: &mut SnapshotWriter) {
        self.via.save(w);
        w.write_bool(self.atn);
    }

    fn restore(&mut self, r: &mut SnapshotReader<'_>) -> Result<(), SnapshotError> {
        self.via.restore(r)?;
        self.atn = r.read_bool()?;
        Ok(())
    }
}
