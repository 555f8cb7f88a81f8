//! Extensible MOS 6502 CPU core.
//!
//! The core executes one whole instruction per `step` and dispatches
//! through a 512-entry instruction table: opcodes 0x00-0xFF are the
//! standard 6502 set, while the range 0x100-0x1FF is reserved for
//! synthetic extension opcodes. Extension opcodes cannot occur in the
//! 8-bit memory fabric, so they are planted through a side trap table
//! keyed by address: when the fetch stage finds a trap at the current
//! program counter it yields the extension opcode instead of the memory
//! byte, and the embedding machine runs its own handler.
//!
//! The 1541 drive uses this to intercept firmware routines at known ROM
//! locations and short-circuit them with native implementations.

mod cpu;
pub mod flags;
mod instruction;
mod registers;

pub use cpu::Cpu6502;
pub use flags::Status;
pub use instruction::{opcode_table, AddrMode, Instruction, EXTENSION_BASE};
pub use registers::Registers;
