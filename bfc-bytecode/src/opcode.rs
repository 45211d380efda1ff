//! Bytecode Instruction Set
//!
//! Twelve opcodes cover the eight source operators plus the fused and
//! strength-reduced forms the optimizer introduces. Every instruction
//! carries one signed payload whose meaning is opcode-dependent: a
//! repetition count, a relative jump distance, or a tape offset.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Bytecode operation kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Opcode {
    /// Do nothing. Emitted by the compiler as a run separator, stripped
    /// by the first optimization pass.
    Nop,
    /// Add the payload to the current cell.
    Add,
    /// Write current cell + payload, then step the pointer by +1.
    AddPi,
    /// Write current cell + payload, then step the pointer by -1.
    AddPd,
    /// Move the tape pointer by the payload.
    PtrAdd,
    /// Read one input byte, payload times; the last byte read wins.
    In,
    /// Write the current cell's low byte, payload times.
    Out,
    /// Jump by the payload if the current cell is zero.
    Jz,
    /// Jump by the payload if the current cell is nonzero.
    Jnz,
    /// Set the current cell to the payload.
    Set,
    /// Add the multiply accumulator to the cell at pointer + payload.
    /// A payload of 0 doubles the accumulator instead.
    AddM,
    /// Subtract the multiply accumulator from the cell at pointer + payload.
    SubM,
}

impl Opcode {
    pub fn mnemonic(&self) -> &'static str {
        match self {
            Opcode::Nop => "NOP",
            Opcode::Add => "ADD",
            Opcode::AddPi => "ADDPI",
            Opcode::AddPd => "ADDPD",
            Opcode::PtrAdd => "PTR",
            Opcode::In => "IN",
            Opcode::Out => "OUT",
            Opcode::Jz => "JZ",
            Opcode::Jnz => "JNZ",
            Opcode::Set => "SET",
            Opcode::AddM => "ADDM",
            Opcode::SubM => "SUBM",
        }
    }

    /// True for the bracket-pair jumps that delimit loop regions.
    pub fn is_jump(&self) -> bool {
        matches!(self, Opcode::Jz | Opcode::Jnz)
    }
}

impl fmt::Display for Opcode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.mnemonic())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mnemonics() {
        assert_eq!(format!("{}", Opcode::Nop), "NOP");
        assert_eq!(format!("{}", Opcode::PtrAdd), "PTR");
        assert_eq!(format!("{}", Opcode::AddPi), "ADDPI");
        assert_eq!(format!("{}", Opcode::SubM), "SUBM");
    }

    #[test]
    fn test_is_jump() {
        assert!(Opcode::Jz.is_jump());
        assert!(Opcode::Jnz.is_jump());
        assert!(!Opcode::Add.is_jump());
        assert!(!Opcode::Set.is_jump());
    }
}
