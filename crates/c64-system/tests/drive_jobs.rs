//! Drive-level integration: firmware traps and the job queue protocol.

use c64_system::{
    C1541, DiskBackend, DiskError, DriveConfig, RamDisk, BYTES_PER_SECTOR, FLOPPY_ROM_SIZE,
};
use emu_core::IoChip;
use mos_6502::flags::{I, V};

/// A NOP-sled firmware image with the reset vector at $C000.
fn test_rom() -> Vec<u8> {
    let mut rom = vec![0xEA; FLOPPY_ROM_SIZE];
    rom[0x3FFC] = 0x00;
    rom[0x3FFD] = 0xC0;
    rom
}

fn make_drive() -> C1541<RamDisk> {
    let config = DriveConfig::new(test_rom()).expect("valid test ROM");
    C1541::new(config, RamDisk::new())
}

fn make_drive_with_rom(rom: Vec<u8>) -> C1541<RamDisk> {
    let config = DriveConfig::new(rom).expect("valid test ROM");
    C1541::new(config, RamDisk::new())
}

#[test]
fn boot_reaches_rom_test_trap() {
    // Boot path jumps into the ROM self-test; the trap must skip it.
    let mut rom = test_rom();
    rom[0x0000] = 0x4C; // JMP $EAC9 at $C000
    rom[0x0001] = 0xC9;
    rom[0x0002] = 0xEA;
    let mut drive = make_drive_with_rom(rom);

    drive.step(); // JMP
    assert_eq!(drive.cpu().core.regs.pc, 0xEAC9);
    drive.step(); // trap 0x101
    assert_eq!(drive.cpu().core.regs.pc, 0xEAEA);
}

#[test]
fn read_job_fills_buffer_zero() {
    let mut drive = make_drive();

    // Stage a recognisable block at track 18, sector 1.
    let mut block = [0u8; BYTES_PER_SECTOR];
    for (i, byte) in block.iter_mut().enumerate() {
        *byte = (i as u8).wrapping_mul(3);
    }
    *drive.backend_mut().block_mut(18, 1).unwrap() = block;

    // Job slot 0: READ, track 18, sector 1.
    drive.cpu_mut().write_ram(0x00, 0x80);
    drive.cpu_mut().write_ram(0x06, 18);
    drive.cpu_mut().write_ram(0x07, 1);

    // Enter the disk controller IRQ routine.
    drive.cpu_mut().core.regs.pc = 0xF2B0;
    drive.step();

    for i in 0..BYTES_PER_SECTOR {
        assert_eq!(
            drive.cpu().read_ram(0x0300 + i as u16),
            block[i],
            "buffer byte {i}"
        );
    }
    assert_eq!(drive.cpu().read_ram(0x4C), 1); // last sector
    assert_eq!(drive.cpu().read_ram(0x00), 0x01); // STATUS_OK
    assert_eq!(drive.cpu().core.regs.pc, 0xFAC6);
    assert!(drive.take_active());
}

#[test]
fn write_job_stores_buffer() {
    let mut drive = make_drive();

    // Fill slot 1's buffer ($0400) and queue a WRITE for track 1/0.
    for i in 0..BYTES_PER_SECTOR {
        drive
            .cpu_mut()
            .write_ram(0x0400 + i as u16, (i as u8) ^ 0x5A);
    }
    drive.cpu_mut().write_ram(0x01, 0x90);
    drive.cpu_mut().write_ram(0x08, 1);
    drive.cpu_mut().write_ram(0x09, 0);

    drive.cpu_mut().core.regs.pc = 0xF2B0;
    drive.step();

    assert_eq!(drive.cpu().read_ram(0x01), 0x01);
    drive.backend_mut().goto_block(1, 0).unwrap();
    let stored = drive.backend_mut().read_block().unwrap();
    for (i, &byte) in stored.iter().enumerate() {
        assert_eq!(byte, (i as u8) ^ 0x5A, "stored byte {i}");
    }
}

#[test]
fn search_job_reports_geometry() {
    let mut drive = make_drive();
    drive.cpu_mut().write_ram(0x02, 0xB0); // slot 2: SEARCH
    drive.cpu_mut().write_ram(0x0A, 20);
    drive.cpu_mut().write_ram(0x0B, 7);

    drive.cpu_mut().core.regs.pc = 0xF2B0;
    drive.step();

    assert_eq!(drive.cpu().read_ram(0x22), 20); // track
    assert_eq!(drive.cpu().read_ram(0x43), 19); // sectors on track 20
    assert_eq!(drive.cpu().read_ram(0x4D), 7); // sector
    assert_eq!(drive.cpu().read_ram(0x02), 0x01);
}

#[test]
fn verify_and_bump_report_ok() {
    let mut drive = make_drive();
    drive.cpu_mut().write_ram(0x03, 0xA0); // VERIFY
    drive.cpu_mut().write_ram(0x04, 0xC0); // BUMP

    drive.cpu_mut().core.regs.pc = 0xF2B0;
    drive.step();

    assert_eq!(drive.cpu().read_ram(0x03), 0x01);
    assert_eq!(drive.cpu().read_ram(0x04), 0x01);
    // Current-slot register holds the last slot processed.
    assert_eq!(drive.cpu().read_ram(0x3F), 4);
}

#[test]
fn missing_block_maps_to_status_04() {
    let mut drive = make_drive();
    drive.cpu_mut().write_ram(0x00, 0x80);
    drive.cpu_mut().write_ram(0x06, 40); // no such track
    drive.cpu_mut().write_ram(0x07, 0);

    drive.cpu_mut().core.regs.pc = 0xF2B0;
    drive.step();
    assert_eq!(drive.cpu().read_ram(0x00), 0x04);
}

#[test]
fn write_protect_maps_to_status_08() {
    let mut drive = make_drive();
    drive.backend_mut().set_write_protected(true);
    drive.cpu_mut().write_ram(0x00, 0x90);
    drive.cpu_mut().write_ram(0x06, 1);
    drive.cpu_mut().write_ram(0x07, 0);

    drive.cpu_mut().core.regs.pc = 0xF2B0;
    drive.step();
    assert_eq!(drive.cpu().read_ram(0x00), 0x08);
}

/// Backend with no medium: every operation reports `NoDisk`.
struct EmptyDrive;

impl DiskBackend for EmptyDrive {
    fn goto_block(&mut self, _track: u8, _sector: u8) -> Result<(), DiskError> {
        Err(DiskError::NoDisk)
    }

    fn read_block(&mut self) -> Result<[u8; BYTES_PER_SECTOR], DiskError> {
        Err(DiskError::NoDisk)
    }

    fn write_block(&mut self, _data: &[u8; BYTES_PER_SECTOR]) -> Result<(), DiskError> {
        Err(DiskError::NoDisk)
    }
}

#[test]
fn no_disk_maps_to_status_0f() {
    let config = DriveConfig::new(test_rom()).expect("valid test ROM");
    let mut drive = C1541::new(config, EmptyDrive);
    drive.cpu_mut().write_ram(0x00, 0x80);
    drive.cpu_mut().write_ram(0x06, 18);
    drive.cpu_mut().write_ram(0x07, 0);

    drive.cpu_mut().core.regs.pc = 0xF2B0;
    drive.step();
    assert_eq!(drive.cpu().read_ram(0x00), 0x0F);
}

#[test]
#[should_panic(expected = "buffer-program jobs")]
fn execute_job_is_fatal() {
    let mut drive = make_drive();
    drive.cpu_mut().write_ram(0x00, 0xD0);
    drive.cpu_mut().core.regs.pc = 0xF2B0;
    drive.step();
}

#[test]
fn firmware_emulation_mode_runs_original_tsx() {
    let mut config = DriveConfig::new(test_rom()).expect("valid test ROM");
    config.emulate_disk_controller = true;
    let mut drive = C1541::new(config, RamDisk::new());

    drive.cpu_mut().core.regs.sp = 0x77;
    drive.cpu_mut().core.regs.pc = 0xF2B0;
    drive.step();

    // TSX executed: X = SP, PC just past the trap byte, no job ran.
    assert_eq!(drive.cpu().core.regs.x, 0x77);
    assert_eq!(drive.cpu().core.regs.pc, 0xF2B1);
    assert!(!drive.take_active());
}

#[test]
fn idle_loop_trap_stops_the_drive() {
    let mut drive = make_drive();
    drive.cpu_mut().core.regs.p.set(I);
    drive.cpu_mut().core.regs.pc = 0xEBFF;
    drive.step();

    // The original CLI ran before the stop.
    assert!(!drive.cpu().core.regs.p.is_set(I));
    assert!(!drive.is_running());

    // A stopped drive does not tick.
    let pc = drive.cpu().core.regs.pc;
    drive.step();
    assert_eq!(drive.cpu().core.regs.pc, pc);

    drive.start();
    drive.step();
    assert_ne!(drive.cpu().core.regs.pc, pc);
}

#[test]
fn file_open_trap_runs_original_load() {
    let mut drive = make_drive();
    // Stage a filename for the announcement path.
    for (i, byte) in b"PROGRAM".iter().enumerate() {
        drive.cpu_mut().write_ram(0x0200 + i as u16, *byte);
    }
    drive.cpu_mut().write_ram(0x00EA, 0x42); // zero-page cell named by the operand

    drive.cpu_mut().core.regs.pc = 0xD7B4;
    drive.step();

    // LDA $EA executed (the NOP sled supplies $EA as the operand).
    assert_eq!(drive.cpu().core.regs.a, 0x42);
    assert_eq!(drive.cpu().core.regs.pc, 0xD7B6);
}

#[test]
fn write_path_traps_relocate_pc() {
    let mut drive = make_drive();

    drive.cpu_mut().core.regs.pc = 0xF58C;
    drive.step();
    assert_eq!(drive.cpu().core.regs.pc, 0xF594);

    drive.cpu_mut().core.regs.pc = 0xF5A3;
    drive.step();
    assert_eq!(drive.cpu().core.regs.pc, 0xF5B1);

    drive.cpu_mut().core.regs.pc = 0xFCB1;
    drive.step();
    assert_eq!(drive.cpu().core.regs.pc, 0xFCBE);

    drive.cpu_mut().core.regs.pc = 0xFCDC;
    drive.step();
    assert_eq!(drive.cpu().core.regs.pc, 0xFCE9);
}

#[test]
fn format_trap_resumes_13_bytes_past_the_trap() {
    // The format-path trap is declared with an immediate operand, so
    // the handler's "skip eleven bytes" lands the CPU at trap + 1
    // (opcode) + 1 (operand) + 11. Both patch sites follow the same
    // convention, and the sync mark is emitted on the way.
    for trap in [0xFCB1u16, 0xFCDC] {
        let mut drive = make_drive();
        drive.cpu_mut().core.regs.pc = trap;
        drive.step();

        assert_eq!(
            drive.cpu().core.regs.pc,
            trap + 13,
            "trap at {trap:#06x}"
        );
        // write_sync ran: SYNC is active (port B bit 7 low).
        assert_eq!(drive.via_disk_mut().read_register(0x00) & 0x80, 0);
    }
}

#[test]
fn byte_ready_folds_into_overflow_flag() {
    let mut drive = make_drive();
    assert!(!drive.cpu().core.regs.p.is_set(V));

    // Spin the motor up through the disk controller VIA.
    drive.via_disk_mut().write_register(0x02, 0x0F); // DDRB
    drive.via_disk_mut().write_register(0x00, 0x04); // motor on

    // Run until a byte has been clocked off the surface; the fold
    // happens before the following instruction.
    let mut saw_overflow = false;
    for _ in 0..64 {
        drive.step();
        if drive.cpu().core.regs.p.is_set(V) {
            saw_overflow = true;
            break;
        }
    }
    assert!(saw_overflow, "BYTE READY never reached the overflow flag");
}

#[test]
fn job_queue_clears_disk_controller_irq() {
    let mut drive = make_drive();

    // Arm timer 1 on the disk controller VIA and let it underflow.
    drive.via_disk_mut().write_register(0x0E, 0x80 | 0x40); // enable T1
    drive.via_disk_mut().write_register(0x04, 0x02);
    drive.via_disk_mut().write_register(0x05, 0x00);
    drive.run(4); // NOP sled; enough cycles for the underflow
    assert!(drive.via_disk().irq_active());

    drive.cpu_mut().core.regs.pc = 0xF2B0;
    drive.step();
    assert!(!drive.via_disk().irq_active());
}
