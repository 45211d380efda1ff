//! Brainfuck Bytecode Compiler - Instruction Set and Program Container
//!
//! This crate defines the bytecode that the compiler emits, the optimizer
//! rewrites, and the VM executes: a flat sequence of (opcode, payload)
//! pairs with an optional parallel table of source positions.

pub mod listing;
pub mod opcode;
pub mod program;

pub use opcode::Opcode;
pub use program::{DebugInfo, Instruction, Program};
