//! MOS 6522 Versatile Interface Adapter (VIA).
//!
//! The 6522 provides two 8-bit I/O ports, two 16-bit timers, a serial
//! shift register, and an interrupt controller. The 1541 floppy drive
//! carries two of them: one as the serial bus controller at $1800 and
//! one as the disk controller at $1C00.
//!
//! # Registers ($0-$F)
//!
//! | Reg | Name | Description                              |
//! |-----|------|------------------------------------------|
//! | $0  | ORB  | Port B data (handshake on access)        |
//! | $1  | ORA  | Port A data (handshake on access)        |
//! | $2  | DDRB | Port B data direction (1 = output)       |
//! | $3  | DDRA | Port A data direction (1 = output)       |
//! | $4  | T1CL | Timer 1 counter low (read clears T1 IRQ) |
//! | $5  | T1CH | Timer 1 counter high (write starts T1)   |
//! | $6  | T1LL | Timer 1 latch low                        |
//! | $7  | T1LH | Timer 1 latch high                       |
//! | $8  | T2CL | Timer 2 counter low (read clears T2 IRQ) |
//! | $9  | T2CH | Timer 2 counter high (write starts T2)   |
//! | $A  | SR   | Shift register                           |
//! | $B  | ACR  | Auxiliary control register               |
//! | $C  | PCR  | Peripheral control register              |
//! | $D  | IFR  | Interrupt flag register                  |
//! | $E  | IER  | Interrupt enable register                |
//! | $F  | ORA  | Port A data (no handshake)               |
//!
//! # Scheduling
//!
//! Timers advance inside [`update`](Via6522::update) by the cycle delta
//! since the previous update, so the chip never has to be ticked cycle
//! by cycle. [`next_update`](Via6522::next_update) reports the earliest
//! timer underflow deadline, or [`NEVER`](emu_core::NEVER) when both
//! timers are idle.

use emu_core::{IoChip, Snapshot, SnapshotError, SnapshotReader, SnapshotWriter, NEVER};

/// IFR/IER bit: CA2 active edge.
pub const IFR_CA2: u8 = 0x01;
/// IFR/IER bit: CA1 active edge.
pub const IFR_CA1: u8 = 0x02;
/// IFR/IER bit: shift register complete.
pub const IFR_SR: u8 = 0x04;
/// IFR/IER bit: CB2 active edge.
pub const IFR_CB2: u8 = 0x08;
/// IFR/IER bit: CB1 active edge.
pub const IFR_CB1: u8 = 0x10;
/// IFR/IER bit: timer 2 underflow.
pub const IFR_T2: u8 = 0x20;
/// IFR/IER bit: timer 1 underflow.
pub const IFR_T1: u8 = 0x40;

/// MOS 6522 register file.
pub struct Via6522 {
    /// Port A output register.
    port_a: u8,
    /// Port B output register.
    port_b: u8,
    /// Port A data direction register (1 = output).
    ddr_a: u8,
    /// Port B data direction register (1 = output).
    ddr_b: u8,
    /// External input lines for port A.
    pub external_a: u8,
    /// External input lines for port B.
    pub external_b: u8,

    /// Timer 1 counter (counts down).
    timer1_counter: u16,
    /// Timer 1 latch, reloaded into the counter on free-run underflow.
    timer1_latch: u16,
    /// Timer 1 is counting. One-shot mode clears this on underflow.
    timer1_running: bool,

    /// Timer 2 counter (counts down, always one-shot).
    timer2_counter: u16,
    /// Timer 2 latch low byte (only the low byte is latched).
    timer2_latch_lo: u8,
    /// Timer 2 is counting.
    timer2_running: bool,

    /// Shift register (storage only; shifting is not modelled).
    shift_register: u8,

    /// Auxiliary control register.
    /// Bit 6: T1 free-run. Bit 5: T2 counts PB6 pulses instead of cycles.
    acr: u8,
    /// Peripheral control register.
    /// Bit 0: CA1 active edge (1 = rising). Bit 4: CB1 active edge.
    pcr: u8,
    /// Interrupt flag register (bit 7 computed on read).
    ifr: u8,
    /// Interrupt enable register.
    ier: u8,

    /// Previous CA1 input level, for edge detection.
    ca1_prev: bool,
    /// Previous CB1 input level, for edge detection.
    cb1_prev: bool,

    /// Cycle stamp of the most recent `update`.
    last_update: u64,
}

impl Via6522 {
    #[must_use]
    pub fn new() -> Self {
        Self {
            port_a: 0,
            port_b: 0,
            ddr_a: 0,
            ddr_b: 0,
            external_a: 0xFF,
            external_b: 0xFF,
            timer1_counter: 0xFFFF,
            timer1_latch: 0xFFFF,
            timer1_running: false,
            timer2_counter: 0xFFFF,
            timer2_latch_lo: 0xFF,
            timer2_running: false,
            shift_register: 0,
            acr: 0,
            pcr: 0,
            ifr: 0,
            ier: 0,
            ca1_prev: false,
            cb1_prev: false,
            last_update: 0,
        }
    }

    /// True when any enabled interrupt flag is raised.
    #[must_use]
    pub fn irq_active(&self) -> bool {
        (self.ifr & self.ier & 0x7F) != 0
    }

    /// Raise interrupt flags directly (used by owners wiring external
    /// conditions such as the disk controller's byte-ready line).
    pub fn raise_flags(&mut self, flags: u8) {
        self.ifr |= flags & 0x7F;
    }

    /// Set the CA1 input line; the configured edge raises IFR CA1.
    pub fn set_ca1(&mut self, level: bool) {
        let rising_active = self.pcr & 0x01 != 0;
        let triggered = if rising_active {
            !self.ca1_prev && level
        } else {
            self.ca1_prev && !level
        };
        if triggered {
            self.ifr |= IFR_CA1;
        }
        self.ca1_prev = level;
    }

    /// Set the CB1 input line; the configured edge raises IFR CB1.
    pub fn set_cb1(&mut self, level: bool) {
        let rising_active = self.pcr & 0x10 != 0;
        let triggered = if rising_active {
            !self.cb1_prev && level
        } else {
            self.cb1_prev && !level
        };
        if triggered {
            self.ifr |= IFR_CB1;
        }
        self.cb1_prev = level;
    }

    /// Port A as driven by the chip (output bits only).
    #[must_use]
    pub fn port_a_output(&self) -> u8 {
        self.port_a & self.ddr_a
    }

    /// Port B as driven by the chip (output bits only).
    #[must_use]
    pub fn port_b_output(&self) -> u8 {
        self.port_b & self.ddr_b
    }

    /// Interrupt flag register (without the computed bit 7).
    #[must_use]
    pub fn ifr(&self) -> u8 {
        self.ifr
    }

    /// Interrupt enable register.
    #[must_use]
    pub fn ier(&self) -> u8 {
        self.ier
    }

    /// Auxiliary control register.
    #[must_use]
    pub fn acr(&self) -> u8 {
        self.acr
    }

    /// Peripheral control register.
    #[must_use]
    pub fn pcr(&self) -> u8 {
        self.pcr
    }

    /// Timer 1 counter value as of the last update.
    #[must_use]
    pub fn timer1_counter(&self) -> u16 {
        self.timer1_counter
    }

    /// Timer 2 counter value as of the last update.
    #[must_use]
    pub fn timer2_counter(&self) -> u16 {
        self.timer2_counter
    }

    fn read_port_a(&self) -> u8 {
        (self.port_a & self.ddr_a) | (self.external_a & !self.ddr_a)
    }

    fn read_port_b(&self) -> u8 {
        (self.port_b & self.ddr_b) | (self.external_b & !self.ddr_b)
    }

    fn advance_timer1(&mut self, delta: u64) {
        if !self.timer1_running {
            return;
        }
        let count = u64::from(self.timer1_counter);
        if delta <= count {
            self.timer1_counter = (count - delta) as u16;
            return;
        }

        // Underflow happened within this delta.
        self.ifr |= IFR_T1;
        let past = delta - count - 1;
        if self.acr & 0x40 != 0 {
            // Free-run: reload from the latch; period is latch + 1.
            let period = u64::from(self.timer1_latch) + 1;
            self.timer1_counter = (u64::from(self.timer1_latch) - past % period) as u16;
        } else {
            self.timer1_running = false;
            self.timer1_counter = 0xFFFF;
        }
    }

    fn advance_timer2(&mut self, delta: u64) {
        if !self.timer2_running || self.acr & 0x20 != 0 {
            // Pulse-counting mode is not driven by the cycle clock.
            return;
        }
        let count = u64::from(self.timer2_counter);
        if delta <= count {
            self.timer2_counter = (count - delta) as u16;
        } else {
            self.ifr |= IFR_T2;
            self.timer2_running = false;
            self.timer2_counter = 0xFFFF;
        }
    }
}

impl Default for Via6522 {
    fn default() -> Self {
        Self::new()
    }
}

impl IoChip for Via6522 {
    fn read_register(&mut self, register: u16) -> u8 {
        match register & 0x0F {
            0x00 => {
                // ORB handshake clears the CB edge flags.
                self.ifr &= !(IFR_CB1 | IFR_CB2);
                self.read_port_b()
            }
            0x01 => {
                // ORA handshake clears the CA edge flags.
                self.ifr &= !(IFR_CA1 | IFR_CA2);
                self.read_port_a()
            }
            0x02 => self.ddr_b,
            0x03 => self.ddr_a,
            0x04 => {
                // T1C-L read clears the T1 flag.
                self.ifr &= !IFR_T1;
                self.timer1_counter as u8
            }
            0x05 => (self.timer1_counter >> 8) as u8,
            0x06 => self.timer1_latch as u8,
            0x07 => (self.timer1_latch >> 8) as u8,
            0x08 => {
                // T2C-L read clears the T2 flag.
                self.ifr &= !IFR_T2;
                self.timer2_counter as u8
            }
            0x09 => (self.timer2_counter >> 8) as u8,
            0x0A => self.shift_register,
            0x0B => self.acr,
            0x0C => self.pcr,
            0x0D => {
                // Bit 7 mirrors "any enabled interrupt active".
                let master = if self.irq_active() { 0x80 } else { 0 };
                (self.ifr & 0x7F) | master
            }
            0x0E => self.ier | 0x80,
            _ => {
                // ORA without handshake: CA flags survive.
                self.read_port_a()
            }
        }
    }

    fn write_register(&mut self, register: u16, data: u8) {
        match register & 0x0F {
            0x00 => {
                self.ifr &= !(IFR_CB1 | IFR_CB2);
                self.port_b = data;
            }
            0x01 => {
                self.ifr &= !(IFR_CA1 | IFR_CA2);
                self.port_a = data;
            }
            0x02 => self.ddr_b = data,
            0x03 => self.ddr_a = data,
            0x04 | 0x06 => {
                self.timer1_latch = (self.timer1_latch & 0xFF00) | u16::from(data);
            }
            0x05 => {
                // T1C-H write loads the counter from the latch, starts
                // the timer, and clears the T1 flag.
                self.timer1_latch = (self.timer1_latch & 0x00FF) | (u16::from(data) << 8);
                self.timer1_counter = self.timer1_latch;
                self.timer1_running = true;
                self.ifr &= !IFR_T1;
            }
            0x07 => {
                self.timer1_latch = (self.timer1_latch & 0x00FF) | (u16::from(data) << 8);
                self.ifr &= !IFR_T1;
            }
            0x08 => self.timer2_latch_lo = data,
            0x09 => {
                self.timer2_counter = u16::from(self.timer2_latch_lo) | (u16::from(data) << 8);
                self.timer2_running = true;
                self.ifr &= !IFR_T2;
            }
            0x0A => {
                self.shift_register = data;
                self.ifr &= !IFR_SR;
            }
            0x0B => self.acr = data,
            0x0C => self.pcr = data,
            0x0D => {
                // Writing ones clears the corresponding flags.
                self.ifr &= !data;
            }
            0x0E => {
                // Bit 7 selects set (1) or clear (0) of the enable bits.
                if data & 0x80 != 0 {
                    self.ier |= data & 0x7F;
                } else {
                    self.ier &= !(data & 0x7F);
                }
            }
            _ => self.port_a = data,
        }
    }

    fn next_update(&self) -> u64 {
        let mut deadline = NEVER;
        if self.timer1_running {
            deadline = deadline.min(self.last_update + u64::from(self.timer1_counter) + 1);
        }
        if self.timer2_running && self.acr & 0x20 == 0 {
            deadline = deadline.min(self.last_update + u64::from(self.timer2_counter) + 1);
        }
        deadline
    }

    fn update(&mut self, cycles: u64) {
        let delta = cycles.saturating_sub(self.last_update);
        if delta == 0 {
            return;
        }
        self.advance_timer1(delta);
        self.advance_timer2(delta);
        self.last_update = cycles;
    }

    fn reset(&mut self) {
        let last_update = self.last_update;
        *self = Self::new();
        // The scheduling clock keeps running across a reset.
        self.last_update = last_update;
    }
}

impl Snapshot for Via6522 {
    fn save(&self, w: &mut SnapshotWriter) {
        w.write_u32(u32::from(self.port_a));
        w.write_u32(u32::from(self.port_b));
        w.write_u32(u32::from(self.ddr_a));
        w.write_u32(u32::from(self.ddr_b));
        w.write_u32(u32::from(self.external_a));
        w.write_u32(u32::from(self.external_b));
        w.write_u16(self.timer1_counter);
        w.write_u16(self.timer1_latch);
        w.write_bool(self.timer1_running);
        w.write_u16(self.timer2_counter);
        w.write_u32(u32::from(self.timer2_latch_lo));
        w.write_bool(self.timer2_running);
        w.write_u32(u32::from(self.shift_register));
        w.write_u32(u32::from(self.acr));
        w.write_u32(u32::from(self.pcr));
        w.write_u32(u32::from(self.ifr));
        w.write_u32(u32::from(self.ier));
        w.write_bool(self.ca1_prev);
        w.write_bool(self.cb1_prev);
        w.write_u64(self.last_update);
    }

    fn restore(&mut self, r: &mut SnapshotReader<'_>) -> Result<(), SnapshotError> {
        self.port_a = r.read_u32()? as u8;
        self.port_b = r.read_u32()? as u8;
        self.ddr_a = r.read_u32()? as u8;
        self.ddr_b = r.read_u32()? as u8;
        self.external_a = r.read_u32()? as u8;
        self.external_b = r.read_u32()? as u8;
        self.timer1_counter = r.read_u16()?;
        self.timer1_latch = r.read_u16()?;
        self.timer1_running = r.read_bool()?;
        self.timer2_counter = r.read_u16()?;
        self.timer2_latch_lo = r.read_u32()? as u8;
        self.timer2_running = r.read_bool()?;
        self.shift_register = r.read_u32()? as u8;
        self.acr = r.read_u32()? as u8;
        self.pcr = r.read_u32()? as u8;
        self.ifr = r.read_u32()? as u8;
        self.ier = r.read_u32()? as u8;
        self.ca1_prev = r.read_bool()?;
        self.cb1_prev = r.read_bool()?;
        self.last_update = r.read_u64()?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn timer1_underflow_at_deadline() {
        let mut via = Via6522::new();
        via.write_register(0x04, 3); // latch low
        via.write_register(0x05, 0); // start, counter = 3

        assert_eq!(via.next_update(), 4);

        via.update(3);
        assert_eq!(via.timer1_counter(), 0);
        assert_eq!(via.ifr() & IFR_T1, 0);

        via.update(4);
        assert_ne!(via.ifr() & IFR_T1, 0);
        assert!(!via.timer1_running);
    }

    #[test]
    fn timer1_large_delta_in_one_update() {
        let mut via = Via6522::new();
        via.write_register(0x04, 10);
        via.write_register(0x05, 0);

        // One update far past the deadline still registers the underflow.
        via.update(1000);
        assert_ne!(via.ifr() & IFR_T1, 0);
    }

    #[test]
    fn timer1_free_run_reload_position() {
        let mut via = Via6522::new();
        via.write_register(0x0B, 0x40); // ACR: free-run
        via.write_register(0x04, 9); // period = 10
        via.write_register(0x05, 0);

        // 10 cycles = exactly one underflow; counter reloads to 9.
        via.update(10);
        assert_ne!(via.ifr() & IFR_T1, 0);
        assert_eq!(via.timer1_counter(), 9);
        assert!(via.timer1_running);

        // 25 more cycles: two more underflows, 5 cycles into the period.
        via.update(35);
        assert_eq!(via.timer1_counter(), 4);
    }

    #[test]
    fn timer1_write_high_starts_and_clears_flag() {
        let mut via = Via6522::new();
        via.raise_flags(IFR_T1);
        via.write_register(0x04, 0x10);
        via.write_register(0x05, 0x00);
        assert!(via.timer1_running);
        assert_eq!(via.ifr() & IFR_T1, 0);
        assert_eq!(via.timer1_counter(), 0x10);
    }

    #[test]
    fn timer1_latch_write_does_not_start() {
        let mut via = Via6522::new();
        via.write_register(0x06, 0x10);
        via.write_register(0x07, 0x00);
        assert!(!via.timer1_running);
        assert_eq!(via.next_update(), NEVER);
    }

    #[test]
    fn timer2_one_shot() {
        let mut via = Via6522::new();
        via.write_register(0x08, 5);
        via.write_register(0x09, 0);
        assert_eq!(via.next_update(), 6);

        via.update(6);
        assert_ne!(via.ifr() & IFR_T2, 0);
        assert!(!via.timer2_running);
        assert_eq!(via.next_update(), NEVER);
    }

    #[test]
    fn timer_reads_clear_flags() {
        let mut via = Via6522::new();
        via.raise_flags(IFR_T1 | IFR_T2);
        let _ = via.read_register(0x04);
        assert_eq!(via.ifr() & IFR_T1, 0);
        let _ = via.read_register(0x08);
        assert_eq!(via.ifr() & IFR_T2, 0);
    }

    #[test]
    fn ifr_master_bit_follows_enables() {
        let mut via = Via6522::new();
        via.raise_flags(IFR_T1);
        assert_eq!(via.read_register(0x0D) & 0x80, 0); // not enabled
        via.write_register(0x0E, 0x80 | IFR_T1);
        assert_ne!(via.read_register(0x0D) & 0x80, 0);
        assert!(via.irq_active());
    }

    #[test]
    fn ifr_write_clears_flags() {
        let mut via = Via6522::new();
        via.raise_flags(IFR_T1 | IFR_CA1);
        via.write_register(0x0D, IFR_T1);
        assert_eq!(via.ifr(), IFR_CA1);
    }

    #[test]
    fn ier_set_clear_protocol() {
        let mut via = Via6522::new();
        via.write_register(0x0E, 0x80 | IFR_T1 | IFR_CB1);
        assert_eq!(via.ier(), IFR_T1 | IFR_CB1);
        via.write_register(0x0E, IFR_T1);
        assert_eq!(via.ier(), IFR_CB1);
        assert_eq!(via.read_register(0x0E), 0x80 | IFR_CB1);
    }

    #[test]
    fn port_mixing_through_ddr() {
        let mut via = Via6522::new();
        via.write_register(0x03, 0x0F); // DDRA: low nybble output
        via.write_register(0x01, 0xAB);
        via.external_a = 0xC0;
        assert_eq!(via.read_register(0x0F), 0xCB);
    }

    #[test]
    fn ora_handshake_clears_ca_flags_no_handshake_does_not() {
        let mut via = Via6522::new();
        via.raise_flags(IFR_CA1 | IFR_CA2);
        let _ = via.read_register(0x0F);
        assert_eq!(via.ifr() & (IFR_CA1 | IFR_CA2), IFR_CA1 | IFR_CA2);
        let _ = via.read_register(0x01);
        assert_eq!(via.ifr() & (IFR_CA1 | IFR_CA2), 0);
    }

    #[test]
    fn ca1_edge_configured_by_pcr() {
        let mut via = Via6522::new();
        via.write_register(0x0C, 0x01); // CA1 rising edge
        via.set_ca1(true);
        assert_ne!(via.ifr() & IFR_CA1, 0);

        let mut via = Via6522::new(); // falling edge default
        via.set_ca1(true);
        assert_eq!(via.ifr() & IFR_CA1, 0);
        via.set_ca1(false);
        assert_ne!(via.ifr() & IFR_CA1, 0);
    }

    #[test]
    fn reset_keeps_scheduling_clock() {
        let mut via = Via6522::new();
        via.write_register(0x04, 3);
        via.write_register(0x05, 0);
        via.update(100);
        via.reset();
        assert_eq!(via.next_update(), NEVER);
        // A timer started after reset schedules relative to cycle 100.
        via.write_register(0x08, 5);
        via.write_register(0x09, 0);
        assert_eq!(via.next_update(), 106);
    }

    #[test]
    fn snapshot_roundtrip() {
        let mut via = Via6522::new();
        via.write_register(0x03, 0xF0);
        via.write_register(0x01, 0x55);
        via.write_register(0x0B, 0x40);
        via.write_register(0x04, 0x20);
        via.write_register(0x05, 0x01);
        via.write_register(0x0E, 0x80 | IFR_T1);
        via.update(17);

        let mut w = SnapshotWriter::new();
        via.save(&mut w);
        let bytes = w.into_bytes();

        let mut restored = Via6522::new();
        let mut r = SnapshotReader::new(&bytes).unwrap();
        restored.restore(&mut r).unwrap();
        assert!(r.is_exhausted());

        let mut w2 = SnapshotWriter::new();
        restored.save(&mut w2);
        assert_eq!(bytes, w2.into_bytes());
    }
}
