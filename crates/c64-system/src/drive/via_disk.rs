//! VIA1 ($1C00): the drive's disk controller.
//!
//! On top of the plain register file this VIA carries the mechanics
//! the firmware polls through its ports:
//!
//!   Port A: data byte clocked off the disk surface
//!   Port B: bit 0-1 stepper motor phase, bit 2 motor on, bit 3 LED,
//!           bit 4 write-protect sense, bit 7 SYNC detect (active low)
//!
//! While the motor runs, a BYTE READY pulse is generated every
//! `cycles_per_byte` cycles for the current speed zone. The drive CPU
//! ORs that signal into its overflow flag before every instruction;
//! reading port A acknowledges the byte. The write-path helpers
//! `proceed_to_next_sync` and `write_sync` back the firmware traps
//! that short-circuit sector writes.

use emu_core::{IoChip, Snapshot, SnapshotError, SnapshotReader, SnapshotWriter, NEVER};
use log::debug;
use mos_via_6522::Via6522;

/// Sync marks are runs of this many $FF bytes on the surface.
const SYNC_MARK_BYTES: u64 = 5;

/// Cycles to clock one byte off the surface for a track's speed zone.
#[must_use]
pub fn cycles_per_byte(track: u8) -> u64 {
    match track {
        1..=17 => 26,
        18..=24 => 28,
        25..=30 => 30,
        _ => 32,
    }
}

/// The disk controller VIA.
pub struct DiskControllerVia {
    via: Via6522,
    /// Spindle motor running (port B bit 2).
    motor_on: bool,
    /// Drive LED lit (port B bit 3).
    led_on: bool,
    /// Head position in half-tracks; track = half_track / 2 + 1.
    half_track: u8,
    /// Previous stepper phase (port B bits 0-1).
    prev_stepper_phase: u8,
    /// A byte is waiting on port A.
    byte_ready: bool,
    /// Cycle deadline for the next byte off the surface.
    next_byte: u64,
    /// Cycle count this chip has consumed.
    updated_to: u64,
}

impl DiskControllerVia {
    #[must_use]
    pub fn new() -> Self {
        Self {
            via: Via6522::new(),
            motor_on: false,
            led_on: false,
            half_track: 34, // track 18, the directory track
            prev_stepper_phase: 0,
            byte_ready: false,
            next_byte: NEVER,
            updated_to: 0,
        }
    }

    /// Current head track (1-35).
    #[must_use]
    pub fn track(&self) -> u8 {
        self.half_track / 2 + 1
    }

    /// Spindle motor state.
    #[must_use]
    pub fn motor_on(&self) -> bool {
        self.motor_on
    }

    /// Drive LED state.
    #[must_use]
    pub fn led_on(&self) -> bool {
        self.led_on
    }

    /// BYTE READY line; wired to the drive CPU's overflow flag.
    #[must_use]
    pub fn is_byte_ready(&self) -> bool {
        self.byte_ready
    }

    /// Write-protect sense on port B bit 4 (set = writable).
    pub fn set_write_protected(&mut self, protected: bool) {
        self.via.external_b = (self.via.external_b & !0x10) | if protected { 0 } else { 0x10 };
    }

    /// True when an enabled interrupt condition is raised.
    #[must_use]
    pub fn irq_active(&self) -> bool {
        self.via.irq_active()
    }

    /// Skip the head forward past the next sync mark.
    ///
    /// SYNC goes active (port B bit 7 low) and the byte clock restarts
    /// at the first data byte behind the mark.
    pub fn proceed_to_next_sync(&mut self) {
        self.byte_ready = false;
        self.via.external_b &= !0x80;
        let cpb = cycles_per_byte(self.track());
        self.next_byte = self.updated_to + cpb * SYNC_MARK_BYTES;
        debug!("head advanced to next sync on track {}", self.track());
    }

    /// Write a sync mark at the current head position.
    pub fn write_sync(&mut self) {
        self.byte_ready = false;
        self.via.external_b &= !0x80;
        let cpb = cycles_per_byte(self.track());
        self.next_byte = self.updated_to + cpb * SYNC_MARK_BYTES;
        debug!("sync mark written on track {}", self.track());
    }

    /// Decode motor, LED and stepper from port B output.
    fn update_mechanics(&mut self) {
        let pb = self.via.port_b_output();
        let motor = pb & 0x04 != 0;
        if motor && !self.motor_on {
            self.next_byte = self.updated_to + cycles_per_byte(self.track());
        } else if !motor {
            self.next_byte = NEVER;
            self.byte_ready = false;
        }
        self.motor_on = motor;
        self.led_on = pb & 0x08 != 0;

        let phase = pb & 0x03;
        if phase != self.prev_stepper_phase {
            self.step_head(phase);
            self.prev_stepper_phase = phase;
        }
    }

    /// Move the head one half-track per stepper phase transition.
    /// Incrementing phases step inward (higher tracks).
    fn step_head(&mut self, new_phase: u8) {
        let delta = (i16::from(new_phase) - i16::from(self.prev_stepper_phase) + 4) % 4;
        match delta {
            1 => {
                if self.half_track < 69 {
                    self.half_track += 1;
                }
            }
            3 => {
                if self.half_track > 0 {
                    self.half_track -= 1;
                }
            }
            _ => {}
        }
    }
}

impl Default for DiskControllerVia {
    fn default() -> Self {
        Self::new()
    }
}

impl IoChip for DiskControllerVia {
    fn read_register(&mut self, register: u16) -> u8 {
        // Port A access acknowledges the pending byte.
        if matches!(register & 0x0F, 0x01 | 0x0F) {
            self.byte_ready = false;
        }
        self.via.read_register(register)
    }

    fn write_register(&mut self, register: u16, data: u8) {
        if matches!(register & 0x0F, 0x01 | 0x0F) {
            self.byte_ready = false;
        }
        self.via.write_register(register, data);
        // Port B data or direction writes can change the mechanics.
        if matches!(register & 0x0F, 0x00 | 0x02) {
            self.update_mechanics();
        }
    }

    fn next_update(&self) -> u64 {
        self.via.next_update().min(self.next_byte)
    }

    fn update(&mut self, cycles: u64) {
        self.via.update(cycles);
        if cycles <= self.updated_to {
            return;
        }
        if self.motor_on {
            let cpb = cycles_per_byte(self.track());
            while self.next_byte <= cycles {
                self.byte_ready = true;
                // A data byte under the head means no sync mark.
                self.via.external_b |= 0x80;
                // Byte-ready also pulses CB1 (falling edge by default).
                self.via.set_cb1(true);
                self.via.set_cb1(false);
                self.next_byte += cpb;
            }
        }
        self.updated_to = cycles;
    }

    fn reset(&mut self) {
        let updated_to = self.updated_to;
        *self = Self::new();
        self.updated_to = updated_to;
    }
}

impl Snapshot for DiskControllerVia {
    fn save(&self, w: &mut SnapshotWriter) {
        self.via.save(w);
        w.write_bool(self.motor_on);
        w.write_bool(self.led_on);
        w.write_u32(u32::from(self.half_track));
        w.write_u32(u32::from(self.prev_stepper_phase));
        w.write_bool(self.byte_ready);
        w.write_u64(self.next_byte);
        w.write_u64(self.updated_to);
    }

    fn restore(&mut self, r: &mut SnapshotReader<'_>) -> Result<(), SnapshotError> {
        self.via.restore(r)?;
        self.motor_on = r.read_bool()?;
        self.led_on = r.read_bool()?;
        self.half_track = r.read_u32()? as u8;
        self.prev_stepper_phase = r.read_u32()? as u8;
        self.byte_ready = r.read_bool()?;
        self.next_byte = r.read_u64()?;
        self.updated_to = r.read_u64()?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn motor_on(via: &mut DiskControllerVia) {
        via.write_register(0x02, 0x0F); // DDRB: stepper, motor, LED outputs
        via.write_register(0x00, 0x04); // motor on
    }

    #[test]
    fn starts_on_directory_track() {
        let via = DiskControllerVia::new();
        assert_eq!(via.track(), 18);
        assert!(!via.motor_on());
    }

    #[test]
    fn motor_and_led_decode_from_port_b() {
        let mut via = DiskControllerVia::new();
        via.write_register(0x02, 0x0C);
        via.write_register(0x00, 0x04);
        assert!(via.motor_on());
        assert!(!via.led_on());

        via.write_register(0x00, 0x08);
        assert!(!via.motor_on());
        assert!(via.led_on());
    }

    #[test]
    fn byte_ready_pulses_while_motor_runs() {
        let mut via = DiskControllerVia::new();
        motor_on(&mut via);

        let cpb = cycles_per_byte(18);
        assert_eq!(via.next_update(), cpb);

        via.update(cpb - 1);
        assert!(!via.is_byte_ready());
        via.update(cpb);
        assert!(via.is_byte_ready());

        // Reading port A acknowledges the byte.
        let _ = via.read_register(0x01);
        assert!(!via.is_byte_ready());

        via.update(cpb * 2);
        assert!(via.is_byte_ready());
    }

    #[test]
    fn no_byte_ready_when_motor_is_off() {
        let mut via = DiskControllerVia::new();
        via.update(10_000);
        assert!(!via.is_byte_ready());
        assert_eq!(via.next_update(), NEVER);
    }

    #[test]
    fn stepper_moves_head_by_half_tracks() {
        let mut via = DiskControllerVia::new();
        via.write_register(0x02, 0x0F);

        // Track 18 = half-track 34. Two inward steps = one track.
        via.write_register(0x00, 0x04 | 0x01); // phase 0 -> 1
        via.write_register(0x00, 0x04 | 0x02); // phase 1 -> 2
        assert_eq!(via.track(), 19);

        // Four outward steps = two tracks back.
        via.write_register(0x00, 0x04 | 0x01);
        via.write_register(0x00, 0x04);
        via.write_register(0x00, 0x04 | 0x03);
        via.write_register(0x00, 0x04 | 0x02);
        assert_eq!(via.track(), 17);
    }

    #[test]
    fn sync_helpers_reset_byte_clock() {
        let mut via = DiskControllerVia::new();
        motor_on(&mut via);
        let cpb = cycles_per_byte(18);
        via.update(cpb);
        assert!(via.is_byte_ready());

        via.proceed_to_next_sync();
        assert!(!via.is_byte_ready());
        // SYNC active: port B bit 7 low.
        assert_eq!(via.read_register(0x00) & 0x80, 0);
        assert_eq!(via.next_update(), cpb + cpb * SYNC_MARK_BYTES);

        // The next byte clears the sync condition.
        via.update(cpb + cpb * SYNC_MARK_BYTES);
        assert!(via.is_byte_ready());
        assert_ne!(via.read_register(0x00) & 0x80, 0);
    }

    #[test]
    fn write_protect_sense_on_port_b() {
        let mut via = DiskControllerVia::new();
        via.set_write_protected(false);
        assert_ne!(via.read_register(0x00) & 0x10, 0);
        via.set_write_protected(true);
        assert_eq!(via.read_register(0x00) & 0x10, 0);
    }

    #[test]
    fn snapshot_roundtrip() {
        let mut via = DiskControllerVia::new();
        motor_on(&mut via);
        via.update(100);

        let mut w = SnapshotWriter::new();
        via.save(&mut w);
        let bytes = w.into_bytes();

        let mut restored = DiskControllerVia::new();
        let mut r = SnapshotReader::new(&bytes).unwrap();
        restored.restore(&mut r).unwrap();
        assert!(r.is_exhausted());
        assert_eq!(restored.motor_on(), via.motor_on());
        assert_eq!(restored.track(), via.track());

        let mut w2 = SnapshotWriter::new();
        restored.save(&mut w2);
        assert_eq!(bytes, w2.into_bytes());
    }
}
