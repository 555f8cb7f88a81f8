//! The 1541 drive CPU: memory fabric, address decoding, ROM patching.
//!
//! The drive's 6502 sees 2 KiB of RAM (mirrored through the low 4K),
//! the two VIAs in the $1800/$1C00 windows, and 16 KiB of firmware ROM
//! at $C000-$FFFF. The backing array holds RAM and ROM contiguously;
//! ROM cells live at `ROM_OFFSET + (address - $C000)`.
//!
//! At construction the firmware is patched with synthetic extension
//! opcodes at the addresses the emulation wants to intercept: the disk
//! controller IRQ routine, the ROM self-test, the idle wait-loop, the
//! file-open announcement, and the sector write paths.

use emu_core::{Bus, IoChip, Snapshot, SnapshotError, SnapshotReader, SnapshotWriter};
use mos_6502::{AddrMode, Cpu6502, Instruction, Registers};

use crate::drive::via_bus::BusControllerVia;
use crate::drive::via_disk::DiskControllerVia;

/// Drive RAM size.
pub const RAM_SIZE: usize = 0x0800;
/// ROM cells start here in the backing array, right after RAM.
pub const ROM_OFFSET: usize = RAM_SIZE;
/// Firmware ROM size.
pub const ROM_SIZE: usize = 0x4000;
/// First ROM address in the drive's logical address space.
pub const ROM_BASE: u16 = 0xC000;

/// The firmware trap set: (trap address, extension opcode).
const TRAPS: [(u16, u16); 8] = [
    (0xF2B0, 0x100), // disk controller IRQ routine
    (0xEAC9, 0x101), // ROM self-test
    (0xEBFF, 0x102), // idle wait-loop entry
    (0xD7B4, 0x103), // file-open announcement
    (0xF58C, 0x104), // sector write: wait for sync
    (0xF5A3, 0x105), // sector write: emit sync
    (0xFCB1, 0x106), // format/write path: emit sync
    (0xFCDC, 0x106),
];

/// The drive CPU: the extensible 6502 core plus the backing memory
/// fabric it owns.
pub struct DriveCpu {
    pub core: Cpu6502,
    /// RAM and ROM, contiguous.
    memory: Vec<u8>,
}

impl DriveCpu {
    /// Build the drive CPU around a 16 KiB firmware image, patch the
    /// trap opcodes, and start at the firmware reset vector.
    #[must_use]
    pub fn new(rom: &[u8]) -> Self {
        assert_eq!(rom.len(), ROM_SIZE, "1541 firmware must be 16 KiB");
        let mut memory = vec![0u8; RAM_SIZE + ROM_SIZE];
        memory[ROM_OFFSET..].copy_from_slice(rom);

        let mut core = Cpu6502::new();
        for (mnemonic, opcode, mode) in [
            ("XI0", 0x100, AddrMode::Implied),
            ("XI1", 0x101, AddrMode::Implied),
            ("XI2", 0x102, AddrMode::Implied),
            ("XI3", 0x103, AddrMode::Immediate),
            ("XI4", 0x104, AddrMode::Immediate),
            ("XI5", 0x105, AddrMode::Immediate),
            ("XI6", 0x106, AddrMode::Immediate),
        ] {
            core.add_instruction(Instruction::new(mnemonic, opcode, mode, 0));
        }
        for (address, opcode) in TRAPS {
            core.install_trap(address, opcode);
        }

        let mut cpu = Self { core, memory };
        cpu.core.regs.pc = cpu.reset_vector();
        cpu
    }

    /// Firmware reset vector at $FFFC/$FFFD.
    fn reset_vector(&self) -> u16 {
        let lo = self.memory[ROM_OFFSET + 0x3FFC];
        let hi = self.memory[ROM_OFFSET + 0x3FFD];
        u16::from(lo) | (u16::from(hi) << 8)
    }

    /// Reset: clear RAM, registers to power-on state, PC to the reset
    /// vector. ROM and the trap table are untouched.
    pub fn reset(&mut self) {
        self.memory[..RAM_SIZE].fill(0);
        let cycles = self.core.cycles();
        self.core.regs = Registers::new();
        self.core.set_cycles(cycles);
        self.core.set_irq_sources(Vec::new());
        self.core.set_nmi_sources(Vec::new());
        self.core.regs.pc = self.reset_vector();
    }

    /// The PC projected into the backing array: addresses at or above
    /// the ROM base index the ROM cells directly.
    #[must_use]
    pub fn projected_pc(&self) -> usize {
        let pc = self.core.regs.pc;
        if pc >= ROM_BASE {
            ROM_OFFSET + usize::from(pc - ROM_BASE)
        } else {
            usize::from(pc)
        }
    }

    /// Read drive RAM (2 KiB, mirrored).
    #[must_use]
    pub fn read_ram(&self, address: u16) -> u8 {
        self.memory[usize::from(address & 0x07FF)]
    }

    /// Write drive RAM (2 KiB, mirrored).
    pub fn write_ram(&mut self, address: u16, value: u8) {
        self.memory[usize::from(address & 0x07FF)] = value;
    }

    /// Read a ROM cell by logical address.
    #[must_use]
    pub fn read_rom(&self, address: u16) -> u8 {
        self.memory[ROM_OFFSET + usize::from(address - ROM_BASE)]
    }

    /// Split into the CPU core and its memory, for building a bus view.
    pub(crate) fn parts(&mut self) -> (&mut Cpu6502, &mut [u8]) {
        (&mut self.core, &mut self.memory)
    }
}

impl Snapshot for DriveCpu {
    fn save(&self, w: &mut SnapshotWriter) {
        self.core.save(w);
        w.write_byte_array(&self.memory);
        let irqs = self.core.irq_sources();
        w.write_u32(irqs.len() as u32);
        for &tag in irqs {
            w.write_tag(tag);
        }
        let nmis = self.core.nmi_sources();
        w.write_u32(nmis.len() as u32);
        for &tag in nmis {
            w.write_tag(tag);
        }
    }

    fn restore(&mut self, r: &mut SnapshotReader<'_>) -> Result<(), SnapshotError> {
        self.core.restore(r)?;
        r.read_byte_array(&mut self.memory)?;

        let irq_count = r.read_u32()? as usize;
        let mut irqs = Vec::with_capacity(irq_count);
        for _ in 0..irq_count {
            irqs.push(r.read_tag()?);
        }
        self.core.set_irq_sources(irqs);

        let nmi_count = r.read_u32()? as usize;
        let mut nmis = Vec::with_capacity(nmi_count);
        for _ in 0..nmi_count {
            nmis.push(r.read_tag()?);
        }
        self.core.set_nmi_sources(nmis);
        Ok(())
    }
}

/// The drive CPU's bus view: RAM mirror, VIA windows, ROM.
///
/// VIA accesses bring the chip up to date with the current cycle count
/// first, so register reads reflect chip state at the access point.
pub(crate) struct DriveBus<'a> {
    pub memory: &'a mut [u8],
    pub via_bus: &'a mut BusControllerVia,
    pub via_disk: &'a mut DiskControllerVia,
    pub cycles: u64,
}

impl Bus for DriveBus<'_> {
    fn read(&mut self, address: u16) -> u8 {
        match address & 0xF000 {
            0x0000 => self.memory[usize::from(address & 0x07FF)],
            0x1000 => match address & 0xFF00 {
                0x1800 => {
                    self.via_bus.update(self.cycles);
                    self.via_bus.read_register(address & 0x0F)
                }
                0x1C00 => {
                    self.via_disk.update(self.cycles);
                    self.via_disk.read_register(address & 0x0F)
                }
                _ => 0,
            },
            0xC000 | 0xD000 | 0xE000 | 0xF000 => {
                self.memory[ROM_OFFSET + usize::from(address - ROM_BASE)]
            }
            _ => 0,
        }
    }

    fn write(&mut self, address: u16, value: u8) {
        match address & 0xF000 {
            0x0000 => self.memory[usize::from(address & 0x07FF)] = value,
            0x1000 => match address & 0xFF00 {
                0x1800 => {
                    self.via_bus.update(self.cycles);
                    self.via_bus.write_register(address & 0x0F, value);
                }
                0x1C00 => {
                    self.via_disk.update(self.cycles);
                    self.via_disk.write_register(address & 0x0F, value);
                }
                _ => {}
            },
            // ROM and unmapped windows drop writes.
            _ => {}
        }
    }
}
