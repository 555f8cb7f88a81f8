//! Instruction-level 6502 execution engine.
//!
//! Each `step` runs one whole instruction and charges its cycle cost to
//! the CPU's cycle counter; the master tick loop uses that counter to
//! schedule I/O chip updates. Interrupts are recognised at instruction
//! boundaries only.
//!
//! Machines that patch traps into ROM drive the pipeline manually:
//! `service_interrupts`, then `fetch` (which consults the trap table),
//! then either `execute` for standard opcodes or their own extended
//! dispatch for opcodes at or above [`EXTENSION_BASE`].

use std::collections::HashMap;

use emu_core::{Bus, ChipTag, Snapshot, SnapshotError, SnapshotReader, SnapshotWriter};

use crate::flags::{C, D, I, N, V, Z};
use crate::instruction::{Instruction, EXTENSION_BASE, OPCODES};
use crate::{AddrMode, Registers};

/// NMI vector address.
const NMI_VECTOR: u16 = 0xFFFA;
/// Reset vector address.
const RESET_VECTOR: u16 = 0xFFFC;
/// IRQ/BRK vector address.
const IRQ_VECTOR: u16 = 0xFFFE;

/// The extensible 6502 core.
pub struct Cpu6502 {
    /// Register file.
    pub regs: Registers,
    /// Executed cycle count; the scheduling clock for I/O chip updates.
    cycles: u64,
    /// Chips currently asserting the IRQ line.
    irqs: Vec<ChipTag>,
    /// Chips currently asserting the NMI line.
    nmis: Vec<ChipTag>,
    /// Set on the empty-to-asserted NMI transition, cleared when serviced.
    nmi_pending: bool,
    /// Extension entries for opcodes 0x100-0x1FF.
    extensions: HashMap<u16, Instruction>,
    /// Trap table: address -> extension opcode, consulted by `fetch`.
    traps: HashMap<u16, u16>,
}

impl Cpu6502 {
    #[must_use]
    pub fn new() -> Self {
        Self {
            regs: Registers::new(),
            cycles: 0,
            irqs: Vec::new(),
            nmis: Vec::new(),
            nmi_pending: false,
            extensions: HashMap::new(),
            traps: HashMap::new(),
        }
    }

    /// Executed cycle count.
    #[must_use]
    pub fn cycles(&self) -> u64 {
        self.cycles
    }

    /// Overwrite the cycle counter (snapshot restore).
    pub fn set_cycles(&mut self, cycles: u64) {
        self.cycles = cycles;
    }

    /// Reset: registers to power-on state, PC from the reset vector.
    ///
    /// The cycle counter is left running so chip scheduling deadlines
    /// stay monotonic across a reset.
    pub fn reset(&mut self, bus: &mut impl Bus) {
        self.regs = Registers::new();
        self.regs.pc = self.read_word(bus, RESET_VECTOR);
        self.irqs.clear();
        self.nmis.clear();
        self.nmi_pending = false;
    }

    // --- Interrupt source bookkeeping ---

    /// Assert the IRQ line on behalf of a chip.
    pub fn set_irq(&mut self, source: ChipTag) {
        if !self.irqs.contains(&source) {
            self.irqs.push(source);
        }
    }

    /// Release the IRQ line on behalf of a chip.
    pub fn clear_irq(&mut self, source: ChipTag) {
        self.irqs.retain(|&tag| tag != source);
    }

    /// Assert the NMI line on behalf of a chip (edge-triggered).
    pub fn set_nmi(&mut self, source: ChipTag) {
        if self.nmis.is_empty() {
            self.nmi_pending = true;
        }
        if !self.nmis.contains(&source) {
            self.nmis.push(source);
        }
    }

    /// Release the NMI line on behalf of a chip.
    pub fn clear_nmi(&mut self, source: ChipTag) {
        self.nmis.retain(|&tag| tag != source);
    }

    /// Chips currently asserting IRQ.
    #[must_use]
    pub fn irq_sources(&self) -> &[ChipTag] {
        &self.irqs
    }

    /// Chips currently asserting NMI.
    #[must_use]
    pub fn nmi_sources(&self) -> &[ChipTag] {
        &self.nmis
    }

    /// Replace the IRQ source list (snapshot restore).
    pub fn set_irq_sources(&mut self, sources: Vec<ChipTag>) {
        self.irqs = sources;
    }

    /// Replace the NMI source list (snapshot restore).
    pub fn set_nmi_sources(&mut self, sources: Vec<ChipTag>) {
        self.nmis = sources;
        self.nmi_pending = false;
    }

    // --- Extension mechanism ---

    /// Register an extension instruction (opcode 0x100-0x1FF).
    ///
    /// # Panics
    ///
    /// Panics if the opcode is below [`EXTENSION_BASE`]; the base table
    /// is immutable.
    pub fn add_instruction(&mut self, instruction: Instruction) {
        assert!(
            instruction.opcode >= EXTENSION_BASE,
            "opcode {:#05x} is not in the extension range",
            instruction.opcode
        );
        self.extensions.insert(instruction.opcode, instruction);
    }

    /// Look up an instruction table entry, extension range included.
    #[must_use]
    pub fn instruction(&self, opcode: u16) -> Option<&Instruction> {
        if opcode < EXTENSION_BASE {
            Some(&OPCODES[opcode as usize])
        } else {
            self.extensions.get(&opcode)
        }
    }

    /// Plant a trap: fetches at `address` yield `opcode` instead of the
    /// memory byte. The opcode must be a registered extension entry.
    pub fn install_trap(&mut self, address: u16, opcode: u16) {
        assert!(
            self.extensions.contains_key(&opcode),
            "trap opcode {opcode:#05x} has no registered instruction"
        );
        self.traps.insert(address, opcode);
    }

    /// The trap planted at `address`, if any.
    #[must_use]
    pub fn trap_at(&self, address: u16) -> Option<u16> {
        self.traps.get(&address).copied()
    }

    // --- Pipeline ---

    /// Service a pending NMI or IRQ. Returns true if one was taken, in
    /// which case no instruction should be fetched this step.
    pub fn service_interrupts(&mut self, bus: &mut impl Bus) -> bool {
        if self.nmi_pending {
            self.nmi_pending = false;
            self.take_interrupt(bus, NMI_VECTOR);
            return true;
        }
        if !self.irqs.is_empty() && !self.regs.p.is_set(I) {
            self.take_interrupt(bus, IRQ_VECTOR);
            return true;
        }
        false
    }

    fn take_interrupt(&mut self, bus: &mut impl Bus, vector: u16) {
        self.push(bus, (self.regs.pc >> 8) as u8);
        self.push(bus, self.regs.pc as u8);
        self.push(bus, self.regs.p.pushed_by_interrupt());
        self.regs.p.set(I);
        self.regs.pc = self.read_word(bus, vector);
        self.cycles += 7;
    }

    /// Fetch the next opcode, consulting the trap table first, and
    /// advance the PC past the opcode byte. Operand bytes are consumed
    /// during execution.
    pub fn fetch(&mut self, bus: &mut impl Bus) -> u16 {
        let pc = self.regs.pc;
        let opcode = match self.traps.get(&pc) {
            Some(&trap) => trap,
            None => u16::from(bus.read(pc)),
        };
        self.regs.pc = pc.wrapping_add(1);
        opcode
    }

    /// Run one instruction (interrupt poll, fetch, execute).
    ///
    /// Only valid for machines without extension traps; trap-owning
    /// machines drive the pipeline stages themselves.
    pub fn step(&mut self, bus: &mut impl Bus) {
        if self.service_interrupts(bus) {
            return;
        }
        let opcode = self.fetch(bus);
        self.execute(bus, opcode);
    }

    /// Execute one standard instruction whose opcode byte has already
    /// been fetched.
    ///
    /// # Panics
    ///
    /// Panics on an extension opcode; those belong to the embedding
    /// machine's dispatcher.
    pub fn execute(&mut self, bus: &mut impl Bus, opcode: u16) {
        assert!(
            opcode < EXTENSION_BASE,
            "extension opcode {opcode:#05x} reached the standard dispatcher"
        );
        let instr = OPCODES[opcode as usize];
        self.cycles += u64::from(instr.cycles);

        match opcode {
            // Loads
            0xA9 | 0xA5 | 0xB5 | 0xAD | 0xBD | 0xB9 | 0xA1 | 0xB1 => {
                let value = self.load(bus, instr.mode);
                self.regs.a = self.regs.p.nz(value);
            }
            0xA2 | 0xA6 | 0xB6 | 0xAE | 0xBE => {
                let value = self.load(bus, instr.mode);
                self.regs.x = self.regs.p.nz(value);
            }
            0xA0 | 0xA4 | 0xB4 | 0xAC | 0xBC => {
                let value = self.load(bus, instr.mode);
                self.regs.y = self.regs.p.nz(value);
            }

            // Stores
            0x85 | 0x95 | 0x8D | 0x9D | 0x99 | 0x81 | 0x91 => {
                let addr = self.operand_address(bus, instr.mode, false);
                bus.write(addr, self.regs.a);
            }
            0x86 | 0x96 | 0x8E => {
                let addr = self.operand_address(bus, instr.mode, false);
                bus.write(addr, self.regs.x);
            }
            0x84 | 0x94 | 0x8C => {
                let addr = self.operand_address(bus, instr.mode, false);
                bus.write(addr, self.regs.y);
            }

            // Register transfers
            0xAA => self.regs.x = self.regs.p.nz(self.regs.a),
            0xA8 => self.regs.y = self.regs.p.nz(self.regs.a),
            0x8A => self.regs.a = self.regs.p.nz(self.regs.x),
            0x98 => self.regs.a = self.regs.p.nz(self.regs.y),
            0xBA => self.regs.x = self.regs.p.nz(self.regs.sp),
            0x9A => self.regs.sp = self.regs.x, // TXS does not touch flags

            // Stack
            0x48 => self.push(bus, self.regs.a),
            0x08 => self.push(bus, self.regs.p.pushed_by_brk()),
            0x68 => {
                let value = self.pop(bus);
                self.regs.a = self.regs.p.nz(value);
            }
            0x28 => {
                let value = self.pop(bus);
                self.regs.p.pop(value);
            }

            // Logic
            0x29 | 0x25 | 0x35 | 0x2D | 0x3D | 0x39 | 0x21 | 0x31 => {
                let value = self.load(bus, instr.mode);
                self.regs.a = self.regs.p.nz(self.regs.a & value);
            }
            0x09 | 0x05 | 0x15 | 0x0D | 0x1D | 0x19 | 0x01 | 0x11 => {
                let value = self.load(bus, instr.mode);
                self.regs.a = self.regs.p.nz(self.regs.a | value);
            }
            0x49 | 0x45 | 0x55 | 0x4D | 0x5D | 0x59 | 0x41 | 0x51 => {
                let value = self.load(bus, instr.mode);
                self.regs.a = self.regs.p.nz(self.regs.a ^ value);
            }
            0x24 | 0x2C => {
                let value = self.load(bus, instr.mode);
                self.regs.p.assign(Z, self.regs.a & value == 0);
                self.regs.p.assign(N, value & 0x80 != 0);
                self.regs.p.assign(V, value & 0x40 != 0);
            }

            // Arithmetic
            0x69 | 0x65 | 0x75 | 0x6D | 0x7D | 0x79 | 0x61 | 0x71 => {
                let value = self.load(bus, instr.mode);
                self.adc(value);
            }
            0xE9 | 0xE5 | 0xF5 | 0xED | 0xFD | 0xF9 | 0xE1 | 0xF1 => {
                let value = self.load(bus, instr.mode);
                self.sbc(value);
            }
            0xC9 | 0xC5 | 0xD5 | 0xCD | 0xDD | 0xD9 | 0xC1 | 0xD1 => {
                let value = self.load(bus, instr.mode);
                self.compare(self.regs.a, value);
            }
            0xE0 | 0xE4 | 0xEC => {
                let value = self.load(bus, instr.mode);
                self.compare(self.regs.x, value);
            }
            0xC0 | 0xC4 | 0xCC => {
                let value = self.load(bus, instr.mode);
                self.compare(self.regs.y, value);
            }

            // Increments and decrements
            0xE6 | 0xF6 | 0xEE | 0xFE => {
                let addr = self.operand_address(bus, instr.mode, false);
                let value = bus.read(addr).wrapping_add(1);
                bus.write(addr, self.regs.p.nz(value));
            }
            0xC6 | 0xD6 | 0xCE | 0xDE => {
                let addr = self.operand_address(bus, instr.mode, false);
                let value = bus.read(addr).wrapping_sub(1);
                bus.write(addr, self.regs.p.nz(value));
            }
            0xE8 => self.regs.x = self.regs.p.nz(self.regs.x.wrapping_add(1)),
            0xC8 => self.regs.y = self.regs.p.nz(self.regs.y.wrapping_add(1)),
            0xCA => self.regs.x = self.regs.p.nz(self.regs.x.wrapping_sub(1)),
            0x88 => self.regs.y = self.regs.p.nz(self.regs.y.wrapping_sub(1)),

            // Shifts and rotates
            0x0A => self.regs.a = self.shift(self.regs.a, Shift::Asl),
            0x06 | 0x16 | 0x0E | 0x1E => self.shift_memory(bus, instr.mode, Shift::Asl),
            0x4A => self.regs.a = self.shift(self.regs.a, Shift::Lsr),
            0x46 | 0x56 | 0x4E | 0x5E => self.shift_memory(bus, instr.mode, Shift::Lsr),
            0x2A => self.regs.a = self.shift(self.regs.a, Shift::Rol),
            0x26 | 0x36 | 0x2E | 0x3E => self.shift_memory(bus, instr.mode, Shift::Rol),
            0x6A => self.regs.a = self.shift(self.regs.a, Shift::Ror),
            0x66 | 0x76 | 0x6E | 0x7E => self.shift_memory(bus, instr.mode, Shift::Ror),

            // Jumps and subroutines
            0x4C => self.regs.pc = self.fetch_word(bus),
            0x6C => self.regs.pc = self.operand_address(bus, AddrMode::Indirect, false),
            0x20 => {
                let target = self.fetch_word(bus);
                let ret = self.regs.pc.wrapping_sub(1);
                self.push(bus, (ret >> 8) as u8);
                self.push(bus, ret as u8);
                self.regs.pc = target;
            }
            0x60 => {
                let lo = u16::from(self.pop(bus));
                let hi = u16::from(self.pop(bus));
                self.regs.pc = ((hi << 8) | lo).wrapping_add(1);
            }
            0x40 => {
                let status = self.pop(bus);
                self.regs.p.pop(status);
                let lo = u16::from(self.pop(bus));
                let hi = u16::from(self.pop(bus));
                self.regs.pc = (hi << 8) | lo;
            }

            // Branches
            0x90 => self.branch(bus, !self.regs.p.is_set(C)),
            0xB0 => self.branch(bus, self.regs.p.is_set(C)),
            0xD0 => self.branch(bus, !self.regs.p.is_set(Z)),
            0xF0 => self.branch(bus, self.regs.p.is_set(Z)),
            0x10 => self.branch(bus, !self.regs.p.is_set(N)),
            0x30 => self.branch(bus, self.regs.p.is_set(N)),
            0x50 => self.branch(bus, !self.regs.p.is_set(V)),
            0x70 => self.branch(bus, self.regs.p.is_set(V)),

            // Flag operations
            0x18 => self.regs.p.clear(C),
            0x38 => self.regs.p.set(C),
            0x58 => self.regs.p.clear(I),
            0x78 => self.regs.p.set(I),
            0xB8 => self.regs.p.clear(V),
            0xD8 => self.regs.p.clear(D),
            0xF8 => self.regs.p.set(D),

            // BRK
            0x00 => {
                let ret = self.regs.pc.wrapping_add(1);
                self.push(bus, (ret >> 8) as u8);
                self.push(bus, ret as u8);
                self.push(bus, self.regs.p.pushed_by_brk());
                self.regs.p.set(I);
                self.regs.pc = self.read_word(bus, IRQ_VECTOR);
            }

            // NOP, documented and undocumented; skip any operand bytes.
            _ => {
                self.regs.pc = self.regs.pc.wrapping_add(instr.mode.operand_bytes());
            }
        }
    }

    // --- Operand resolution ---

    fn fetch_byte(&mut self, bus: &mut impl Bus) -> u8 {
        let value = bus.read(self.regs.pc);
        self.regs.pc = self.regs.pc.wrapping_add(1);
        value
    }

    fn fetch_word(&mut self, bus: &mut impl Bus) -> u16 {
        let lo = u16::from(self.fetch_byte(bus));
        let hi = u16::from(self.fetch_byte(bus));
        (hi << 8) | lo
    }

    fn read_word(&mut self, bus: &mut impl Bus, address: u16) -> u16 {
        let lo = u16::from(bus.read(address));
        let hi = u16::from(bus.read(address.wrapping_add(1)));
        (hi << 8) | lo
    }

    /// Resolve the effective address for a memory-operand mode.
    ///
    /// `penalty` adds one cycle on page crossings (read instructions
    /// with indexed modes).
    fn operand_address(&mut self, bus: &mut impl Bus, mode: AddrMode, penalty: bool) -> u16 {
        match mode {
            AddrMode::ZeroPage => u16::from(self.fetch_byte(bus)),
            AddrMode::ZeroPageX => u16::from(self.fetch_byte(bus).wrapping_add(self.regs.x)),
            AddrMode::ZeroPageY => u16::from(self.fetch_byte(bus).wrapping_add(self.regs.y)),
            AddrMode::Absolute => self.fetch_word(bus),
            AddrMode::AbsoluteX => {
                let base = self.fetch_word(bus);
                let addr = base.wrapping_add(u16::from(self.regs.x));
                if penalty && addr & 0xFF00 != base & 0xFF00 {
                    self.cycles += 1;
                }
                addr
            }
            AddrMode::AbsoluteY => {
                let base = self.fetch_word(bus);
                let addr = base.wrapping_add(u16::from(self.regs.y));
                if penalty && addr & 0xFF00 != base & 0xFF00 {
                    self.cycles += 1;
                }
                addr
            }
            AddrMode::Indirect => {
                // 6502 quirk: the pointer high byte does not carry across
                // a page boundary.
                let ptr = self.fetch_word(bus);
                let lo = u16::from(bus.read(ptr));
                let hi_addr = (ptr & 0xFF00) | (ptr.wrapping_add(1) & 0x00FF);
                let hi = u16::from(bus.read(hi_addr));
                (hi << 8) | lo
            }
            AddrMode::IndirectX => {
                let zp = self.fetch_byte(bus).wrapping_add(self.regs.x);
                let lo = u16::from(bus.read(u16::from(zp)));
                let hi = u16::from(bus.read(u16::from(zp.wrapping_add(1))));
                (hi << 8) | lo
            }
            AddrMode::IndirectY => {
                let zp = self.fetch_byte(bus);
                let lo = u16::from(bus.read(u16::from(zp)));
                let hi = u16::from(bus.read(u16::from(zp.wrapping_add(1))));
                let base = (hi << 8) | lo;
                let addr = base.wrapping_add(u16::from(self.regs.y));
                if penalty && addr & 0xFF00 != base & 0xFF00 {
                    self.cycles += 1;
                }
                addr
            }
            AddrMode::Implied | AddrMode::Accumulator | AddrMode::Immediate | AddrMode::Relative => {
                unreachable!("mode {mode:?} has no effective address")
            }
        }
    }

    fn load(&mut self, bus: &mut impl Bus, mode: AddrMode) -> u8 {
        match mode {
            AddrMode::Immediate => self.fetch_byte(bus),
            AddrMode::Accumulator => self.regs.a,
            _ => {
                let addr = self.operand_address(bus, mode, true);
                bus.read(addr)
            }
        }
    }

    // --- Stack ---

    fn push(&mut self, bus: &mut impl Bus, value: u8) {
        bus.write(self.regs.stack_addr(), value);
        self.regs.sp = self.regs.sp.wrapping_sub(1);
    }

    fn pop(&mut self, bus: &mut impl Bus) -> u8 {
        self.regs.sp = self.regs.sp.wrapping_add(1);
        bus.read(self.regs.stack_addr())
    }

    // --- Arithmetic helpers ---

    fn adc(&mut self, value: u8) {
        if self.regs.p.is_set(D) {
            self.adc_decimal(value);
        } else {
            self.adc_binary(value);
        }
    }

    fn adc_binary(&mut self, value: u8) {
        let a = self.regs.a;
        let carry = u16::from(self.regs.p.is_set(C));
        let sum = u16::from(a) + u16::from(value) + carry;
        let result = sum as u8;
        self.regs.p.assign(C, sum > 0xFF);
        self.regs.p.assign(V, (a ^ result) & (value ^ result) & 0x80 != 0);
        self.regs.a = self.regs.p.nz(result);
    }

    fn adc_decimal(&mut self, value: u8) {
        let a = self.regs.a;
        let carry = u8::from(self.regs.p.is_set(C));
        let mut lo = (a & 0x0F) + (value & 0x0F) + carry;
        let mut hi = (a >> 4) + (value >> 4);
        if lo > 9 {
            lo += 6;
            hi += 1;
        }
        // NMOS: Z from the binary sum, N and V from the intermediate
        // high nybble.
        let bin = u16::from(a) + u16::from(value) + u16::from(carry);
        self.regs.p.assign(Z, bin & 0xFF == 0);
        self.regs.p.assign(N, hi & 0x08 != 0);
        self.regs
            .p
            .assign(V, (a ^ value) & 0x80 == 0 && (a ^ (hi << 4)) & 0x80 != 0);
        if hi > 9 {
            hi += 6;
        }
        self.regs.p.assign(C, hi > 15);
        self.regs.a = ((hi & 0x0F) << 4) | (lo & 0x0F);
    }

    fn sbc(&mut self, value: u8) {
        if self.regs.p.is_set(D) {
            self.sbc_decimal(value);
        } else {
            self.adc_binary(!value);
        }
    }

    fn sbc_decimal(&mut self, value: u8) {
        let a = self.regs.a;
        let borrow = i16::from(!self.regs.p.is_set(C));
        let bin = i16::from(a) - i16::from(value) - borrow;
        let mut lo = i16::from(a & 0x0F) - i16::from(value & 0x0F) - borrow;
        let mut hi = i16::from(a >> 4) - i16::from(value >> 4);
        if lo < 0 {
            lo -= 6;
            hi -= 1;
        }
        if hi < 0 {
            hi -= 6;
        }
        // Flags from the binary result (NMOS).
        self.regs.p.assign(C, bin >= 0);
        self.regs.p.assign(
            V,
            (i16::from(a) ^ i16::from(value)) & (i16::from(a) ^ bin) & 0x80 != 0,
        );
        self.regs.p.nz(bin as u8);
        self.regs.a = (((hi as u8) & 0x0F) << 4) | ((lo as u8) & 0x0F);
    }

    fn compare(&mut self, register: u8, value: u8) {
        self.regs.p.assign(C, register >= value);
        self.regs.p.nz(register.wrapping_sub(value));
    }

    fn shift(&mut self, value: u8, kind: Shift) -> u8 {
        let carry_in = u8::from(self.regs.p.is_set(C));
        let (result, carry_out) = match kind {
            Shift::Asl => (value << 1, value & 0x80 != 0),
            Shift::Lsr => (value >> 1, value & 0x01 != 0),
            Shift::Rol => ((value << 1) | carry_in, value & 0x80 != 0),
            Shift::Ror => ((value >> 1) | (carry_in << 7), value & 0x01 != 0),
        };
        self.regs.p.assign(C, carry_out);
        self.regs.p.nz(result)
    }

    fn shift_memory(&mut self, bus: &mut impl Bus, mode: AddrMode, kind: Shift) {
        let addr = self.operand_address(bus, mode, false);
        let value = bus.read(addr);
        let result = self.shift(value, kind);
        bus.write(addr, result);
    }

    fn branch(&mut self, bus: &mut impl Bus, condition: bool) {
        let offset = self.fetch_byte(bus) as i8;
        if condition {
            let target = self.regs.pc.wrapping_add_signed(i16::from(offset));
            self.cycles += 1;
            if target & 0xFF00 != self.regs.pc & 0xFF00 {
                self.cycles += 1;
            }
            self.regs.pc = target;
        }
    }
}

impl Default for Cpu6502 {
    fn default() -> Self {
        Self::new()
    }
}

#[derive(Clone, Copy)]
enum Shift {
    Asl,
    Lsr,
    Rol,
    Ror,
}

impl Snapshot for Cpu6502 {
    fn save(&self, w: &mut SnapshotWriter) {
        w.write_u16(self.regs.pc);
        w.write_u32(u32::from(self.regs.a));
        w.write_u32(u32::from(self.regs.x));
        w.write_u32(u32::from(self.regs.y));
        w.write_u32(u32::from(self.regs.sp));
        w.write_u32(u32::from(self.regs.p.0));
        w.write_u64(self.cycles);
    }

    fn restore(&mut self, r: &mut SnapshotReader<'_>) -> Result<(), SnapshotError> {
        self.regs.pc = r.read_u16()?;
        self.regs.a = r.read_u32()? as u8;
        self.regs.x = r.read_u32()? as u8;
        self.regs.y = r.read_u32()? as u8;
        self.regs.sp = r.read_u32()? as u8;
        self.regs.p.0 = r.read_u32()? as u8;
        self.cycles = r.read_u64()?;
        Ok(())
    }
}
