//! Brainfuck Bytecode Compiler - Common Types and Utilities
//!
//! This crate contains the shared error type and source position tracking
//! used across all components of the compiler and the VM.

pub mod error;
pub mod span;

pub use error::BfcError;
pub use span::SourceSpan;
