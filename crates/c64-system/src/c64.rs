//! The C64 host machine.
//!
//! Owns the shared system RAM, the CPU, and the VIC. The master loop
//! advances the CPU one instruction at a time and brings the VIC past
//! its update deadline after every instruction; CPU accesses to the
//! VIC register window update the chip first, so register reads always
//! reflect chip state at the access point.

use std::rc::Rc;

use emu_core::{Bus, ChipTag, IoChip, Snapshot, SnapshotError, SnapshotReader, SnapshotWriter};
use mos_6502::Cpu6502;

use crate::memory::{new_shared_ram, SharedRam};
use crate::vic::Vic;

/// VIC register window in the CPU address space.
const VIC_BASE: u16 = 0xD000;
const VIC_END: u16 = 0xD3FF;

/// The C64 machine.
pub struct C64 {
    cpu: Cpu6502,
    ram: SharedRam,
    vic: Vic,
}

impl C64 {
    #[must_use]
    pub fn new() -> Self {
        let ram = new_shared_ram();
        let vic = Vic::new(Rc::clone(&ram));
        Self {
            cpu: Cpu6502::new(),
            ram,
            vic,
        }
    }

    /// The shared system RAM.
    #[must_use]
    pub fn ram(&self) -> &SharedRam {
        &self.ram
    }

    /// The CPU.
    #[must_use]
    pub fn cpu(&self) -> &Cpu6502 {
        &self.cpu
    }

    /// The CPU, mutably.
    pub fn cpu_mut(&mut self) -> &mut Cpu6502 {
        &mut self.cpu
    }

    /// The VIC.
    #[must_use]
    pub fn vic(&self) -> &Vic {
        &self.vic
    }

    /// The VIC, mutably.
    pub fn vic_mut(&mut self) -> &mut Vic {
        &mut self.vic
    }

    /// Copy a program into RAM.
    pub fn load(&mut self, address: u16, bytes: &[u8]) {
        let start = usize::from(address);
        self.ram.borrow_mut()[start..start + bytes.len()].copy_from_slice(bytes);
    }

    /// Execute one instruction and bring the VIC up to date.
    pub fn step(&mut self) {
        {
            let mut bus = C64Bus {
                ram: &self.ram,
                vic: &mut self.vic,
                cycles: self.cpu.cycles(),
            };
            self.cpu.step(&mut bus);
        }

        let cycles = self.cpu.cycles();
        if cycles >= self.vic.next_update() {
            self.vic.update(cycles);
        }

        if self.vic.irq_active() {
            self.cpu.set_irq(ChipTag::Vic);
        } else {
            self.cpu.clear_irq(ChipTag::Vic);
        }
    }

    /// Run until the VIC completes the current frame.
    pub fn run_frame(&mut self) {
        loop {
            self.step();
            if self.vic.take_frame_complete() {
                break;
            }
        }
    }
}

impl Default for C64 {
    fn default() -> Self {
        Self::new()
    }
}

impl Snapshot for C64 {
    fn save(&self, w: &mut SnapshotWriter) {
        self.cpu.save(w);
        w.write_byte_array(&self.ram.borrow());
        self.vic.save(w);
    }

    fn restore(&mut self, r: &mut SnapshotReader<'_>) -> Result<(), SnapshotError> {
        self.cpu.restore(r)?;
        r.read_byte_array(&mut self.ram.borrow_mut())?;
        self.vic.restore(r)?;
        Ok(())
    }
}

/// The C64 CPU's bus view: flat RAM with the VIC register window.
struct C64Bus<'a> {
    ram: &'a SharedRam,
    vic: &'a mut Vic,
    cycles: u64,
}

impl Bus for C64Bus<'_> {
    fn read(&mut self, address: u16) -> u8 {
        match address {
            VIC_BASE..=VIC_END => {
                self.vic.update(self.cycles);
                self.vic.read_register(address & 0x3F)
            }
            _ => self.ram.borrow()[usize::from(address)],
        }
    }

    fn write(&mut self, address: u16, value: u8) {
        match address {
            VIC_BASE..=VIC_END => {
                self.vic.update(self.cycles);
                self.vic.write_register(address & 0x3F, value);
            }
            _ => self.ram.borrow_mut()[usize::from(address)] = value,
        }
    }
}
