//! Brainfuck Bytecode Compiler - Frontend
//!
//! Compiles source text directly into bytecode in a single linear pass.
//! There is no separate token or AST stage: the eight operator characters
//! map straight onto instructions, with runs of identical operators fused
//! into one instruction as they are scanned.

mod compiler;

pub use compiler::Compiler;
