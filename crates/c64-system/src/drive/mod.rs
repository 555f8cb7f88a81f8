//! The 1541 floppy drive.
//!
//! The drive owns its CPU (which owns the memory fabric), the two
//! VIAs, and the disk backend. The master loop advances the CPU one
//! instruction at a time; before each instruction the disk controller's
//! BYTE READY line is folded into the overflow flag (the hardware wires
//! it to the SO pin), and after each instruction the VIAs are brought
//! past their update deadlines and their IRQ lines are propagated into
//! the CPU's interrupt source lists.
//!
//! Firmware traps either short-circuit slow paths (ROM self-test, sync
//! waits) or hand control to the native job dispatcher, which services
//! the firmware's five-slot job queue in low RAM against the backend.

pub mod backend;
pub mod cpu;
pub mod via_bus;
pub mod via_disk;

use emu_core::{Bus, ChipTag, IoChip, Snapshot, SnapshotError, SnapshotReader, SnapshotWriter};
use log::{debug, info, warn};
use mos_6502::flags::V;
use mos_6502::EXTENSION_BASE;

use crate::config::DriveConfig;
use crate::drive::backend::{DiskBackend, DiskError, BYTES_PER_SECTOR, SECTORS_PER_TRACK};
use crate::drive::cpu::{DriveBus, DriveCpu};
use crate::drive::via_bus::BusControllerVia;
use crate::drive::via_disk::DiskControllerVia;

/// Job codes, written with bit 7 set to mark the slot pending.
const JOB_READ_SECTOR: u8 = 0x80;
const JOB_WRITE_SECTOR: u8 = 0x90;
const JOB_VERIFY_SECTOR: u8 = 0xA0;
const JOB_SEARCH_SECTOR: u8 = 0xB0;
const JOB_BUMP: u8 = 0xC0;
const JOB_EXECUTE: u8 = 0xD0;
const JOB_EXECUTE_WITH_STARTUP: u8 = 0xE0;

/// Job status: completed successfully.
const STATUS_OK: u8 = 0x01;
/// Job status: block not found.
const STATUS_BLOCK_NOT_FOUND: u8 = 0x04;
/// Job status: disk is write-protected.
const STATUS_WRITE_PROTECT: u8 = 0x08;
/// Job status: no disk in drive.
const STATUS_NO_DISK: u8 = 0x0F;

/// First job buffer in drive RAM.
const BUFFER0: u16 = 0x0300;
/// Track/sector parameter table for slot 0.
const TRACK_SECTOR0: u16 = 0x0006;

/// The 1541 drive.
pub struct C1541<H: DiskBackend> {
    cpu: DriveCpu,
    via_bus: BusControllerVia,
    via_disk: DiskControllerVia,
    backend: H,
    /// Cleared by the idle wait-loop trap; the master loop skips a
    /// stopped drive until it is started again.
    running: bool,
    /// Raised when a job slot carries a command; host UIs poll it for
    /// activity display.
    active: bool,
    /// Run the firmware's disk controller against the VIAs instead of
    /// dispatching jobs natively.
    emulate_disk_controller: bool,
}

impl<H: DiskBackend> C1541<H> {
    /// Build a drive from a validated configuration and a disk backend.
    #[must_use]
    pub fn new(config: DriveConfig, backend: H) -> Self {
        Self {
            cpu: DriveCpu::new(&config.rom),
            via_bus: BusControllerVia::new(),
            via_disk: DiskControllerVia::new(),
            backend,
            running: true,
            active: false,
            emulate_disk_controller: config.emulate_disk_controller,
        }
    }

    /// The drive CPU.
    #[must_use]
    pub fn cpu(&self) -> &DriveCpu {
        &self.cpu
    }

    /// The drive CPU, mutably (tests and host plumbing).
    pub fn cpu_mut(&mut self) -> &mut DriveCpu {
        &mut self.cpu
    }

    /// The serial bus controller VIA.
    #[must_use]
    pub fn via_bus(&self) -> &BusControllerVia {
        &self.via_bus
    }

    /// The serial bus controller VIA, mutably.
    pub fn via_bus_mut(&mut self) -> &mut BusControllerVia {
        &mut self.via_bus
    }

    /// The disk controller VIA.
    #[must_use]
    pub fn via_disk(&self) -> &DiskControllerVia {
        &self.via_disk
    }

    /// The disk controller VIA, mutably.
    pub fn via_disk_mut(&mut self) -> &mut DiskControllerVia {
        &mut self.via_disk
    }

    /// The disk backend.
    #[must_use]
    pub fn backend(&self) -> &H {
        &self.backend
    }

    /// The disk backend, mutably.
    pub fn backend_mut(&mut self) -> &mut H {
        &mut self.backend
    }

    /// Whether the master loop should keep ticking this drive.
    #[must_use]
    pub fn is_running(&self) -> bool {
        self.running
    }

    /// Stop ticking (entered from the firmware idle loop).
    pub fn stop(&mut self) {
        if self.running {
            debug!("drive stopped in idle loop");
        }
        self.running = false;
    }

    /// Resume ticking (serial bus attention, disk change).
    pub fn start(&mut self) {
        self.running = true;
    }

    /// Check and clear the activity marker.
    pub fn take_active(&mut self) -> bool {
        let active = self.active;
        self.active = false;
        active
    }

    /// Reset the drive: CPU and RAM, both VIAs, lifecycle state.
    pub fn reset(&mut self) {
        self.cpu.reset();
        self.via_bus.reset();
        self.via_disk.reset();
        self.running = true;
        self.active = false;
    }

    /// Run up to `instructions` instructions (fewer if the drive stops).
    pub fn run(&mut self, instructions: usize) {
        for _ in 0..instructions {
            if !self.running {
                break;
            }
            self.step();
        }
    }

    /// Execute one instruction and bring the chips up to date.
    pub fn step(&mut self) {
        if !self.running {
            return;
        }

        // BYTE READY is wired to the SO pin: fold it into the overflow
        // flag before the instruction so BVC/BVS can sample it.
        if self.via_disk.is_byte_ready() {
            self.cpu.core.regs.p.set(V);
        }

        let pending = {
            let cycles = self.cpu.core.cycles();
            let (core, memory) = self.cpu.parts();
            let mut bus = DriveBus {
                memory,
                via_bus: &mut self.via_bus,
                via_disk: &mut self.via_disk,
                cycles,
            };
            if core.service_interrupts(&mut bus) {
                None
            } else {
                let opcode = core.fetch(&mut bus);
                if opcode < EXTENSION_BASE {
                    core.execute(&mut bus, opcode);
                    None
                } else {
                    Some(opcode)
                }
            }
        };

        if let Some(opcode) = pending {
            self.execute_extended(opcode);
        }

        self.sync_chips();
    }

    /// Bring both VIAs past their deadlines and propagate IRQ lines.
    fn sync_chips(&mut self) {
        let cycles = self.cpu.core.cycles();
        if cycles >= self.via_bus.next_update() {
            self.via_bus.update(cycles);
        }
        if cycles >= self.via_disk.next_update() {
            self.via_disk.update(cycles);
        }

        if self.via_bus.irq_active() {
            self.cpu.core.set_irq(ChipTag::BusController);
        } else {
            self.cpu.core.clear_irq(ChipTag::BusController);
        }
        if self.via_disk.irq_active() {
            self.cpu.core.set_irq(ChipTag::DiskController);
        } else {
            self.cpu.core.clear_irq(ChipTag::DiskController);
        }
    }

    /// Run a standard opcode in place of the trap that replaced it.
    fn execute_original(&mut self, opcode: u16) {
        let cycles = self.cpu.core.cycles();
        let (core, memory) = self.cpu.parts();
        let mut bus = DriveBus {
            memory,
            via_bus: &mut self.via_bus,
            via_disk: &mut self.via_disk,
            cycles,
        };
        core.execute(&mut bus, opcode);
    }

    /// Dispatch a synthetic trap opcode.
    fn execute_extended(&mut self, opcode: u16) {
        match opcode {
            // Disk controller IRQ routine at $F2B0.
            0x100 => {
                if self.emulate_disk_controller {
                    // Run the original TSX and let the firmware do it.
                    self.execute_original(0xBA);
                } else {
                    self.run_job_queue();
                }
            }

            // Skip the ROM self-test at $EAC9 (the ROM is patched, its
            // checksum no longer matches).
            0x101 => self.cpu.core.regs.pc = 0xEAEA,

            // Idle wait-loop at $EBFF: run the original CLI, then stop
            // ticking the drive.
            0x102 => {
                self.execute_original(0x58);
                self.stop();
            }

            // File open at $D7B4: run the original LDA zp, then
            // announce the filename staged in RAM.
            0x103 => {
                self.execute_original(0xA5);
                self.log_open_filename();
            }

            // Sector write at $F58C: the sync search is a timing loop;
            // jump straight past it.
            0x104 => {
                self.via_disk.proceed_to_next_sync();
                self.cpu.core.regs.pc = 0xF594;
            }

            // Sector write at $F5A3: emit the data block sync.
            0x105 => {
                self.via_disk.write_sync();
                self.cpu.core.regs.pc = 0xF5B1;
            }

            // Format path at $FCB1/$FCDC: emit a sync, then skip the
            // operand byte and the eleven bytes of the patched-over
            // sequence.
            0x106 => {
                self.via_disk.write_sync();
                self.cpu.core.regs.pc = self.cpu.core.regs.pc.wrapping_add(12);
            }

            other => panic!("unhandled extension opcode {other:#05x}"),
        }
    }

    /// Read the null-terminated filename the firmware staged at $0200
    /// and announce it.
    fn log_open_filename(&mut self) {
        let mut filename = String::new();
        for address in 0x0200..0x0210 {
            let byte = self.cpu.read_ram(address);
            if byte == 0 {
                break;
            }
            filename.push(char::from(byte));
        }
        info!("opening file '{filename}'");
    }

    /// The native disk controller IRQ routine.
    ///
    /// Interprets the five job slots at $00-$04: command high nybble,
    /// track/sector pairs from $06, data buffers at $0300 + $100 per
    /// slot. Status is written back into the command byte. Finishes by
    /// returning control to the firmware's main IRQ handler.
    fn run_job_queue(&mut self) {
        // Reading $1C04 clears the pending disk controller interrupt.
        {
            let cycles = self.cpu.core.cycles();
            let (_, memory) = self.cpu.parts();
            let mut bus = DriveBus {
                memory,
                via_bus: &mut self.via_bus,
                via_disk: &mut self.via_disk,
                cycles,
            };
            let _ = bus.read(0x1C04);
        }

        for slot in 0..5u16 {
            let cmd = self.cpu.read_ram(slot) & 0xF0;
            let track = self.cpu.read_ram(TRACK_SECTOR0 + slot * 2);
            let sector = self.cpu.read_ram(TRACK_SECTOR0 + slot * 2 + 1);
            let buffer = BUFFER0 + 0x100 * slot;

            if cmd > 0 {
                self.active = true;
                debug!("job slot {slot}: cmd {cmd:#04x} track {track} sector {sector}");
            }

            // Current-slot register used by the firmware's own handlers.
            self.cpu.write_ram(0x3F, slot as u8);

            match cmd {
                JOB_READ_SECTOR => {
                    let status = self.job_read(track, sector, buffer);
                    self.cpu.write_ram(slot, status);
                }
                JOB_WRITE_SECTOR => {
                    let status = self.job_write(track, sector, buffer);
                    self.cpu.write_ram(slot, status);
                }
                JOB_VERIFY_SECTOR | JOB_BUMP => {
                    // Nothing to do against a block backend.
                    self.cpu.write_ram(slot, STATUS_OK);
                }
                JOB_SEARCH_SECTOR => {
                    // Pretend the head moved to the requested block.
                    self.cpu.write_ram(0x22, track);
                    let per_track = SECTORS_PER_TRACK
                        .get(usize::from(track))
                        .copied()
                        .unwrap_or(0);
                    self.cpu.write_ram(0x43, per_track);
                    self.cpu.write_ram(0x4D, sector);
                    self.cpu.write_ram(slot, STATUS_OK);
                }
                JOB_EXECUTE | JOB_EXECUTE_WITH_STARTUP => {
                    panic!("buffer-program jobs ({cmd:#04x}) are not implemented");
                }
                0 => {}
                other => {
                    warn!("job slot {slot}: unknown command {other:#04x}");
                }
            }
        }

        // Return into the firmware's main IRQ handler.
        self.cpu.core.regs.pc = 0xFAC6;
    }

    /// READ job: fetch the block and copy it into the slot buffer.
    fn job_read(&mut self, track: u8, sector: u8, buffer: u16) -> u8 {
        let result = self
            .backend
            .goto_block(track, sector)
            .and_then(|()| self.backend.read_block());
        match result {
            Ok(block) => {
                for (i, &byte) in block.iter().enumerate() {
                    self.cpu.write_ram(buffer + i as u16, byte);
                }
                self.cpu.write_ram(0x4C, sector);
                STATUS_OK
            }
            Err(error) => Self::job_status(&error),
        }
    }

    /// WRITE job: copy the slot buffer out and store the block.
    fn job_write(&mut self, track: u8, sector: u8, buffer: u16) -> u8 {
        let mut block = [0u8; BYTES_PER_SECTOR];
        for (i, byte) in block.iter_mut().enumerate() {
            *byte = self.cpu.read_ram(buffer + i as u16);
        }
        let result = self
            .backend
            .goto_block(track, sector)
            .and_then(|()| self.backend.write_block(&block));
        match result {
            Ok(()) => {
                self.cpu.write_ram(0x4C, sector);
                STATUS_OK
            }
            Err(error) => Self::job_status(&error),
        }
    }

    /// Map a backend failure onto the firmware status byte.
    fn job_status(error: &DiskError) -> u8 {
        match error {
            DiskError::BlockNotFound { .. } => STATUS_BLOCK_NOT_FOUND,
            DiskError::WriteProtected => STATUS_WRITE_PROTECT,
            DiskError::NoDisk => STATUS_NO_DISK,
            DiskError::Unsupported(message) => panic!("disk backend failure: {message}"),
        }
    }
}

impl<H: DiskBackend> Snapshot for C1541<H> {
    fn save(&self, w: &mut SnapshotWriter) {
        self.cpu.save(w);
        self.via_bus.save(w);
        self.via_disk.save(w);
        w.write_bool(self.running);
        w.write_bool(self.active);
        w.write_bool(self.emulate_disk_controller);
    }

    fn restore(&mut self, r: &mut SnapshotReader<'_>) -> Result<(), SnapshotError> {
        self.cpu.restore(r)?;
        self.via_bus.restore(r)?;
        self.via_disk.restore(r)?;
        self.running = r.read_bool()?;
        self.active = r.read_bool()?;
        self.emulate_disk_controller = r.read_bool()?;
        Ok(())
    }
}
