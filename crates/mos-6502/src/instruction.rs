//! The 6502 instruction table.
//!
//! Indexed by opcode. The base table covers 0x00-0xFF; the range starting
//! at [`EXTENSION_BASE`] is reserved for synthetic extension opcodes
//! registered at runtime by the embedding machine. Each entry carries the
//! mnemonic, the opcode value, the addressing mode, and the base cycle
//! count; page-cross and branch penalties are added during execution.

/// First synthetic opcode value. Extension opcodes occupy
/// `EXTENSION_BASE..EXTENSION_BASE + 0x100` and can never be read from
/// the 8-bit memory fabric; they enter the pipeline through the trap
/// table consulted at fetch time.
pub const EXTENSION_BASE: u16 = 0x100;

/// 6502 addressing modes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AddrMode {
    Implied,
    Accumulator,
    Immediate,
    ZeroPage,
    ZeroPageX,
    ZeroPageY,
    Absolute,
    AbsoluteX,
    AbsoluteY,
    Indirect,
    IndirectX,
    IndirectY,
    Relative,
}

impl AddrMode {
    /// Operand bytes following the opcode.
    #[must_use]
    pub const fn operand_bytes(self) -> u16 {
        match self {
            AddrMode::Implied | AddrMode::Accumulator => 0,
            AddrMode::Immediate
            | AddrMode::ZeroPage
            | AddrMode::ZeroPageX
            | AddrMode::ZeroPageY
            | AddrMode::IndirectX
            | AddrMode::IndirectY
            | AddrMode::Relative => 1,
            AddrMode::Absolute | AddrMode::AbsoluteX | AddrMode::AbsoluteY | AddrMode::Indirect => {
                2
            }
        }
    }
}

/// One instruction table entry.
#[derive(Debug, Clone, Copy)]
pub struct Instruction {
    /// Three-letter mnemonic (or a synthetic name for extension opcodes).
    pub mnemonic: &'static str,
    /// Opcode value; 0x100-0x1FF for extension entries.
    pub opcode: u16,
    /// Addressing mode, which also determines the instruction width.
    pub mode: AddrMode,
    /// Base cycle count.
    pub cycles: u8,
}

impl Instruction {
    #[must_use]
    pub const fn new(mnemonic: &'static str, opcode: u16, mode: AddrMode, cycles: u8) -> Self {
        Self {
            mnemonic,
            opcode,
            mode,
            cycles,
        }
    }

    /// Total instruction width in bytes, opcode included.
    #[must_use]
    pub const fn size(&self) -> u16 {
        1 + self.mode.operand_bytes()
    }
}

/// The standard opcode table.
#[must_use]
pub fn opcode_table() -> &'static [Instruction; 256] {
    &OPCODES
}

pub(crate) static OPCODES: [Instruction; 256] = build_table();

const fn build_table() -> [Instruction; 256] {
    use AddrMode::{
        Absolute, AbsoluteX, AbsoluteY, Accumulator, Immediate, Implied, Indirect, IndirectX,
        IndirectY, Relative, ZeroPage, ZeroPageX, ZeroPageY,
    };

    // Start from undocumented-NOP entries so every slot dispatches safely,
    // then overwrite the documented set.
    let mut t = [Instruction::new("NOP", 0, Implied, 2); 256];
    let mut i = 0;
    while i < 256 {
        t[i].opcode = i as u16;
        i += 1;
    }

    // Undocumented NOPs with operands keep their real widths so the PC
    // stays aligned when firmware strays into them.
    let zp_nops: [usize; 3] = [0x04, 0x44, 0x64];
    let mut n = 0;
    while n < zp_nops.len() {
        t[zp_nops[n]] = Instruction::new("NOP", zp_nops[n] as u16, ZeroPage, 3);
        n += 1;
    }
    let zpx_nops: [usize; 6] = [0x14, 0x34, 0x54, 0x74, 0xD4, 0xF4];
    n = 0;
    while n < zpx_nops.len() {
        t[zpx_nops[n]] = Instruction::new("NOP", zpx_nops[n] as u16, ZeroPageX, 4);
        n += 1;
    }
    let imm_nops: [usize; 5] = [0x80, 0x82, 0x89, 0xC2, 0xE2];
    n = 0;
    while n < imm_nops.len() {
        t[imm_nops[n]] = Instruction::new("NOP", imm_nops[n] as u16, Immediate, 2);
        n += 1;
    }
    let absx_nops: [usize; 6] = [0x1C, 0x3C, 0x5C, 0x7C, 0xDC, 0xFC];
    n = 0;
    while n < absx_nops.len() {
        t[absx_nops[n]] = Instruction::new("NOP", absx_nops[n] as u16, AbsoluteX, 4);
        n += 1;
    }
    t[0x0C] = Instruction::new("NOP", 0x0C, Absolute, 4);

    // Documented set.
    t[0x69] = Instruction::new("ADC", 0x69, Immediate, 2);
    t[0x65] = Instruction::new("ADC", 0x65, ZeroPage, 3);
    t[0x75] = Instruction::new("ADC", 0x75, ZeroPageX, 4);
    t[0x6D] = Instruction::new("ADC", 0x6D, Absolute, 4);
    t[0x7D] = Instruction::new("ADC", 0x7D, AbsoluteX, 4);
    t[0x79] = Instruction::new("ADC", 0x79, AbsoluteY, 4);
    t[0x61] = Instruction::new("ADC", 0x61, IndirectX, 6);
    t[0x71] = Instruction::new("ADC", 0x71, IndirectY, 5);

    t[0x29] = Instruction::new("AND", 0x29, Immediate, 2);
    t[0x25] = Instruction::new("AND", 0x25, ZeroPage, 3);
    t[0x35] = Instruction::new("AND", 0x35, ZeroPageX, 4);
    t[0x2D] = Instruction::new("AND", 0x2D, Absolute, 4);
    t[0x3D] = Instruction::new("AND", 0x3D, AbsoluteX, 4);
    t[0x39] = Instruction::new("AND", 0x39, AbsoluteY, 4);
    t[0x21] = Instruction::new("AND", 0x21, IndirectX, 6);
    t[0x31] = Instruction::new("AND", 0x31, IndirectY, 5);

    t[0x0A] = Instruction::new("ASL", 0x0A, Accumulator, 2);
    t[0x06] = Instruction::new("ASL", 0x06, ZeroPage, 5);
    t[0x16] = Instruction::new("ASL", 0x16, ZeroPageX, 6);
    t[0x0E] = Instruction::new("ASL", 0x0E, Absolute, 6);
    t[0x1E] = Instruction::new("ASL", 0x1E, AbsoluteX, 7);

    t[0x90] = Instruction::new("BCC", 0x90, Relative, 2);
    t[0xB0] = Instruction::new("BCS", 0xB0, Relative, 2);
    t[0xF0] = Instruction::new("BEQ", 0xF0, Relative, 2);
    t[0x30] = Instruction::new("BMI", 0x30, Relative, 2);
    t[0xD0] = Instruction::new("BNE", 0xD0, Relative, 2);
    t[0x10] = Instruction::new("BPL", 0x10, Relative, 2);
    t[0x50] = Instruction::new("BVC", 0x50, Relative, 2);
    t[0x70] = Instruction::new("BVS", 0x70, Relative, 2);

    t[0x24] = Instruction::new("BIT", 0x24, ZeroPage, 3);
    t[0x2C] = Instruction::new("BIT", 0x2C, Absolute, 4);

    t[0x00] = Instruction::new("BRK", 0x00, Implied, 7);

    t[0x18] = Instruction::new("CLC", 0x18, Implied, 2);
    t[0xD8] = Instruction::new("CLD", 0xD8, Implied, 2);
    t[0x58] = Instruction::new("CLI", 0x58, Implied, 2);
    t[0xB8] = Instruction::new("CLV", 0xB8, Implied, 2);

    t[0xC9] = Instruction::new("CMP", 0xC9, Immediate, 2);
    t[0xC5] = Instruction::new("CMP", 0xC5, ZeroPage, 3);
    t[0xD5] = Instruction::new("CMP", 0xD5, ZeroPageX, 4);
    t[0xCD] = Instruction::new("CMP", 0xCD, Absolute, 4);
    t[0xDD] = Instruction::new("CMP", 0xDD, AbsoluteX, 4);
    t[0xD9] = Instruction::new("CMP", 0xD9, AbsoluteY, 4);
    t[0xC1] = Instruction::new("CMP", 0xC1, IndirectX, 6);
    t[0xD1] = Instruction::new("CMP", 0xD1, IndirectY, 5);

    t[0xE0] = Instruction::new("CPX", 0xE0, Immediate, 2);
    t[0xE4] = Instruction::new("CPX", 0xE4, ZeroPage, 3);
    t[0xEC] = Instruction::new("CPX", 0xEC, Absolute, 4);

    t[0xC0] = Instruction::new("CPY", 0xC0, Immediate, 2);
    t[0xC4] = Instruction::new("CPY", 0xC4, ZeroPage, 3);
    t[0xCC] = Instruction::new("CPY", 0xCC, Absolute, 4);

    t[0xC6] = Instruction::new("DEC", 0xC6, ZeroPage, 5);
    t[0xD6] = Instruction::new("DEC", 0xD6, ZeroPageX, 6);
    t[0xCE] = Instruction::new("DEC", 0xCE, Absolute, 6);
    t[0xDE] = Instruction::new("DEC", 0xDE, AbsoluteX, 7);

    t[0xCA] = Instruction::new("DEX", 0xCA, Implied, 2);
    t[0x88] = Instruction::new("DEY", 0x88, Implied, 2);

    t[0x49] = Instruction::new("EOR", 0x49, Immediate, 2);
    t[0x45] = Instruction::new("EOR", 0x45, ZeroPage, 3);
    t[0x55] = Instruction::new("EOR", 0x55, ZeroPageX, 4);
    t[0x4D] = Instruction::new("EOR", 0x4D, Absolute, 4);
    t[0x5D] = Instruction::new("EOR", 0x5D, AbsoluteX, 4);
    t[0x59] = Instruction::new("EOR", 0x59, AbsoluteY, 4);
    t[0x41] = Instruction::new("EOR", 0x41, IndirectX, 6);
    t[0x51] = Instruction::new("EOR", 0x51, IndirectY, 5);

    t[0xE6] = Instruction::new("INC", 0xE6, ZeroPage, 5);
    t[0xF6] = Instruction::new("INC", 0xF6, ZeroPageX, 6);
    t[0xEE] = Instruction::new("INC", 0xEE, Absolute, 6);
    t[0xFE] = Instruction::new("INC", 0xFE, AbsoluteX, 7);

    t[0xE8] = Instruction::new("INX", 0xE8, Implied, 2);
    t[0xC8] = Instruction::new("INY", 0xC8, Implied, 2);

    t[0x4C] = Instruction::new("JMP", 0x4C, Absolute, 3);
    t[0x6C] = Instruction::new("JMP", 0x6C, Indirect, 5);
    t[0x20] = Instruction::new("JSR", 0x20, Absolute, 6);

    t[0xA9] = Instruction::new("LDA", 0xA9, Immediate, 2);
    t[0xA5] = Instruction::new("LDA", 0xA5, ZeroPage, 3);
    t[0xB5] = Instruction::new("LDA", 0xB5, ZeroPageX, 4);
    t[0xAD] = Instruction::new("LDA", 0xAD, Absolute, 4);
    t[0xBD] = Instruction::new("LDA", 0xBD, AbsoluteX, 4);
    t[0xB9] = Instruction::new("LDA", 0xB9, AbsoluteY, 4);
    t[0xA1] = Instruction::new("LDA", 0xA1, IndirectX, 6);
    t[0xB1] = Instruction::new("LDA", 0xB1, IndirectY, 5);

    t[0xA2] = Instruction::new("LDX", 0xA2, Immediate, 2);
    t[0xA6] = Instruction::new("LDX", 0xA6, ZeroPage, 3);
    t[0xB6] = Instruction::new("LDX", 0xB6, ZeroPageY, 4);
    t[0xAE] = Instruction::new("LDX", 0xAE, Absolute, 4);
    t[0xBE] = Instruction::new("LDX", 0xBE, AbsoluteY, 4);

    t[0xA0] = Instruction::new("LDY", 0xA0, Immediate, 2);
    t[0xA4] = Instruction::new("LDY", 0xA4, ZeroPage, 3);
    t[0xB4] = Instruction::new("LDY", 0xB4, ZeroPageX, 4);
    t[0xAC] = Instruction::new("LDY", 0xAC, Absolute, 4);
    t[0xBC] = Instruction::new("LDY", 0xBC, AbsoluteX, 4);

    t[0x4A] = Instruction::new("LSR", 0x4A, Accumulator, 2);
    t[0x46] = Instruction::new("LSR", 0x46, ZeroPage, 5);
    t[0x56] = Instruction::new("LSR", 0x56, ZeroPageX, 6);
    t[0x4E] = Instruction::new("LSR", 0x4E, Absolute, 6);
    t[0x5E] = Instruction::new("LSR", 0x5E, AbsoluteX, 7);

    t[0xEA] = Instruction::new("NOP", 0xEA, Implied, 2);

    t[0x09] = Instruction::new("ORA", 0x09, Immediate, 2);
    t[0x05] = Instruction::new("ORA", 0x05, ZeroPage, 3);
    t[0x15] = Instruction::new("ORA", 0x15, ZeroPageX, 4);
    t[0x0D] = Instruction::new("ORA", 0x0D, Absolute, 4);
    t[0x1D] = Instruction::new("ORA", 0x1D, AbsoluteX, 4);
    t[0x19] = Instruction::new("ORA", 0x19, AbsoluteY, 4);
    t[0x01] = Instruction::new("ORA", 0x01, IndirectX, 6);
    t[0x11] = Instruction::new("ORA", 0x11, IndirectY, 5);

    t[0x48] = Instruction::new("PHA", 0x48, Implied, 3);
    t[0x08] = Instruction::new("PHP", 0x08, Implied, 3);
    t[0x68] = Instruction::new("PLA", 0x68, Implied, 4);
    t[0x28] = Instruction::new("PLP", 0x28, Implied, 4);

    t[0x2A] = Instruction::new("ROL", 0x2A, Accumulator, 2);
    t[0x26] = Instruction::new("ROL", 0x26, ZeroPage, 5);
    t[0x36] = Instruction::new("ROL", 0x36, ZeroPageX, 6);
    t[0x2E] = Instruction::new("ROL", 0x2E, Absolute, 6);
    t[0x3E] = Instruction::new("ROL", 0x3E, AbsoluteX, 7);

    t[0x6A] = Instruction::new("ROR", 0x6A, Accumulator, 2);
    t[0x66] = Instruction::new("ROR", 0x66, ZeroPage, 5);
    t[0x76] = Instruction::new("ROR", 0x76, ZeroPageX, 6);
    t[0x6E] = Instruction::new("ROR", 0x6E, Absolute, 6);
    t[0x7E] = Instruction::new("ROR", 0x7E, AbsoluteX, 7);

    t[0x40] = Instruction::new("RTI", 0x40, Implied, 6);
    t[0x60] = Instruction::new("RTS", 0x60, Implied, 6);

    t[0xE9] = Instruction::new("SBC", 0xE9, Immediate, 2);
    t[0xE5] = Instruction::new("SBC", 0xE5, ZeroPage, 3);
    t[0xF5] = Instruction::new("SBC", 0xF5, ZeroPageX, 4);
    t[0xED] = Instruction::new("SBC", 0xED, Absolute, 4);
    t[0xFD] = Instruction::new("SBC", 0xFD, AbsoluteX, 4);
    t[0xF9] = Instruction::new("SBC", 0xF9, AbsoluteY, 4);
    t[0xE1] = Instruction::new("SBC", 0xE1, IndirectX, 6);
    t[0xF1] = Instruction::new("SBC", 0xF1, IndirectY, 5);

    t[0x38] = Instruction::new("SEC", 0x38, Implied, 2);
    t[0xF8] = Instruction::new("SED", 0xF8, Implied, 2);
    t[0x78] = Instruction::new("SEI", 0x78, Implied, 2);

    t[0x85] = Instruction::new("STA", 0x85, ZeroPage, 3);
    t[0x95] = Instruction::new("STA", 0x95, ZeroPageX, 4);
    t[0x8D] = Instruction::new("STA", 0x8D, Absolute, 4);
    t[0x9D] = Instruction::new("STA", 0x9D, AbsoluteX, 5);
    t[0x99] = Instruction::new("STA", 0x99, AbsoluteY, 5);
    t[0x81] = Instruction::new("STA", 0x81, IndirectX, 6);
    t[0x91] = Instruction::new("STA", 0x91, IndirectY, 6);

    t[0x86] = Instruction::new("STX", 0x86, ZeroPage, 3);
    t[0x96] = Instruction::new("STX", 0x96, ZeroPageY, 4);
    t[0x8E] = Instruction::new("STX", 0x8E, Absolute, 4);

    t[0x84] = Instruction::new("STY", 0x84, ZeroPage, 3);
    t[0x94] = Instruction::new("STY", 0x94, ZeroPageX, 4);
    t[0x8C] = Instruction::new("STY", 0x8C, Absolute, 4);

    t[0xAA] = Instruction::new("TAX", 0xAA, Implied, 2);
    t[0xA8] = Instruction::new("TAY", 0xA8, Implied, 2);
    t[0xBA] = Instruction::new("TSX", 0xBA, Implied, 2);
    t[0x8A] = Instruction::new("TXA", 0x8A, Implied, 2);
    t[0x9A] = Instruction::new("TXS", 0x9A, Implied, 2);
    t[0x98] = Instruction::new("TYA", 0x98, Implied, 2);

    t
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn table_indexes_match_opcodes() {
        for (i, entry) in opcode_table().iter().enumerate() {
            assert_eq!(entry.opcode as usize, i);
        }
    }

    #[test]
    fn widths_follow_addressing_mode() {
        let table = opcode_table();
        assert_eq!(table[0xEA].size(), 1); // NOP
        assert_eq!(table[0xA9].size(), 2); // LDA #
        assert_eq!(table[0xAD].size(), 3); // LDA abs
        assert_eq!(table[0x6C].size(), 3); // JMP (ind)
    }

    #[test]
    fn undocumented_slots_are_nops_with_real_widths() {
        let table = opcode_table();
        assert_eq!(table[0x80].mnemonic, "NOP");
        assert_eq!(table[0x80].size(), 2);
        assert_eq!(table[0x0C].size(), 3);
        assert_eq!(table[0x02].size(), 1);
    }
}
