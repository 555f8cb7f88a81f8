//! Snapshot round-trip across the full drive.

use c64_system::{C1541, DriveConfig, RamDisk, FLOPPY_ROM_SIZE};
use emu_core::{IoChip, Snapshot, SnapshotError, SnapshotReader, SnapshotWriter};

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

#[test]
fn drive_snapshot_roundtrip() {
    let mut drive = make_drive();

    // Put the drive into a non-trivial state: some execution, RAM
    // contents, running mechanics, an armed VIA timer.
    drive.cpu_mut().write_ram(0x0200, 0x41);
    drive.via_disk_mut().write_register(0x02, 0x0F);
    drive.via_disk_mut().write_register(0x00, 0x04); // motor on
    drive.via_bus_mut().write_register(0x04, 0x40);
    drive.via_bus_mut().write_register(0x05, 0x01);
    drive.run(50);

    let mut w = SnapshotWriter::new();
    drive.save(&mut w);
    let bytes = w.into_bytes();

    let mut restored = make_drive();
    let mut r = SnapshotReader::new(&bytes).expect("header");
    restored.restore(&mut r).expect("restore");
    assert!(r.is_exhausted());

    // Field-by-field equality shows up as byte-identical re-encoding.
    let mut w2 = SnapshotWriter::new();
    restored.save(&mut w2);
    assert_eq!(bytes, w2.into_bytes());

    // And the restored drive resumes from the same point.
    assert_eq!(
        restored.cpu().core.regs.pc,
        drive.cpu().core.regs.pc
    );
    assert_eq!(restored.cpu().core.cycles(), drive.cpu().core.cycles());
    assert_eq!(restored.via_disk().motor_on(), drive.via_disk().motor_on());

    drive.run(10);
    restored.run(10);
    assert_eq!(
        restored.cpu().core.regs.pc,
        drive.cpu().core.regs.pc
    );
}

#[test]
fn truncated_snapshot_is_rejected() {
    let drive = make_drive();
    let mut w = SnapshotWriter::new();
    drive.save(&mut w);
    let bytes = w.into_bytes();

    let mut restored = make_drive();
    let mut r = SnapshotReader::new(&bytes[..bytes.len() / 2]).expect("header");
    assert!(matches!(
        restored.restore(&mut r),
        Err(SnapshotError::UnexpectedEof(_))
    ));
}

#[test]
fn corrupt_header_is_rejected() {
    let drive = make_drive();
    let mut w = SnapshotWriter::new();
    drive.save(&mut w);
    let mut bytes = w.into_bytes();

    bytes[0] = b'X';
    assert!(matches!(
        SnapshotReader::new(&bytes),
        Err(SnapshotError::BadMagic)
    ));
}
