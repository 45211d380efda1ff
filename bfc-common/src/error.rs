//! Error handling for the compiler pipeline
//!
//! One error enum covers all phases. Compilation can fail on user input
//! (unbalanced brackets); everything else is an internal invariant
//! violation or an I/O failure and is fatal, never retried.

use crate::span::SourceSpan;
use thiserror::Error;

/// Errors raised by the compiler, the optimizer, or the VM.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum BfcError {
    /// Unbalanced brackets in the source program. The span points at the
    /// stray `]`, or at the innermost `[` left open at end of input.
    #[error("syntax error at {span}: {message}")]
    Syntax { span: SourceSpan, message: String },

    /// The optimizer's span partition saw bracket nesting inconsistent
    /// with the program invariant. Unreachable for compiler-produced
    /// bytecode.
    #[error("invalid bytecode: {message}")]
    InvalidBytecode { message: String },

    /// A loop region too short to contain a bracket pair.
    #[error("invalid loop: {message}")]
    InvalidLoop { message: String },

    /// The VM executed a jump whose target falls below the program's
    /// first instruction. Indicates malformed bytecode, not a user
    /// error; `pc` is the address of the offending jump.
    #[error("illegal instruction at pc {pc}")]
    IllegalInstruction { pc: usize },

    #[error("i/o error: {message}")]
    Io { message: String },
}

impl BfcError {
    pub fn syntax(message: impl Into<String>, span: SourceSpan) -> Self {
        BfcError::Syntax {
            span,
            message: message.into(),
        }
    }

    pub fn invalid_bytecode(message: impl Into<String>) -> Self {
        BfcError::InvalidBytecode {
            message: message.into(),
        }
    }

    pub fn invalid_loop(message: impl Into<String>) -> Self {
        BfcError::InvalidLoop {
            message: message.into(),
        }
    }
}

// Stored as a message string so the enum stays Clone + PartialEq.
impl From<std::io::Error> for BfcError {
    fn from(err: std::io::Error) -> Self {
        BfcError::Io {
            message: err.to_string(),
        }
    }
}
