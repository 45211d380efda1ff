//! Compiled program container
//!
//! A `Program` is an ordered, index-addressable instruction sequence.
//! Indices are stable program-counter values: the compiler backpatches
//! bracket jumps through them and the VM executes by them. An optional
//! debug table holds a source span per instruction, parallel to the
//! instruction vector, plus a copy of the source text; it can be dropped
//! at any time without changing semantics.

use crate::opcode::Opcode;
use bfc_common::SourceSpan;
use serde::{Deserialize, Serialize};

/// One bytecode instruction: an opcode and its signed payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Instruction {
    pub opcode: Opcode,
    pub value: i32,
}

impl Instruction {
    pub fn new(opcode: Opcode, value: i32) -> Self {
        Self { opcode, value }
    }

    pub fn nop() -> Self {
        Self::new(Opcode::Nop, 0)
    }
}

/// Source positions parallel to the instruction vector.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DebugInfo {
    /// Copy of the source text the program was compiled from.
    pub source: String,
    /// One span per instruction, same indices as the instructions.
    pub spans: Vec<SourceSpan>,
}

/// A compiled bytecode program.
///
/// Invariant: every `Jz` at index i has a matching `Jnz` at some j > i
/// with `value[i] == j - i` and `value[j] == i - j`; bracket pairs are
/// properly nested and never overlap.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Program {
    instructions: Vec<Instruction>,
    debug: Option<DebugInfo>,
}

impl Program {
    /// Empty program without debug information.
    pub fn new() -> Self {
        Self {
            instructions: Vec::new(),
            debug: None,
        }
    }

    /// Empty program that records a span per appended instruction.
    pub fn with_debug(source: &str) -> Self {
        Self {
            instructions: Vec::new(),
            debug: Some(DebugInfo {
                source: source.to_string(),
                spans: Vec::new(),
            }),
        }
    }

    /// Empty program carrying this program's debug mode and source text.
    /// Optimizer passes build their output through this.
    pub fn successor(&self) -> Self {
        Self {
            instructions: Vec::new(),
            debug: self.debug.as_ref().map(|info| DebugInfo {
                source: info.source.clone(),
                spans: Vec::new(),
            }),
        }
    }

    pub fn len(&self) -> usize {
        self.instructions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.instructions.is_empty()
    }

    pub fn read(&self, index: usize) -> Instruction {
        self.instructions[index]
    }

    pub fn span(&self, index: usize) -> Option<SourceSpan> {
        self.debug.as_ref().map(|info| info.spans[index])
    }

    pub fn instructions(&self) -> &[Instruction] {
        &self.instructions
    }

    pub fn debug_info(&self) -> Option<&DebugInfo> {
        self.debug.as_ref()
    }

    pub fn has_debug_info(&self) -> bool {
        self.debug.is_some()
    }

    /// Append an instruction; the span is recorded only in debug mode.
    pub fn append(&mut self, instruction: Instruction, span: SourceSpan) {
        self.instructions.push(instruction);
        if let Some(info) = self.debug.as_mut() {
            info.spans.push(span);
        }
    }

    /// Replace the instruction and its span at `index`.
    pub fn replace(&mut self, index: usize, instruction: Instruction, span: SourceSpan) {
        self.instructions[index] = instruction;
        if let Some(info) = self.debug.as_mut() {
            info.spans[index] = span;
        }
    }

    /// Replace only the instruction at `index`, keeping its span.
    /// Used for jump backpatching, where the bracket's position stands.
    pub fn patch(&mut self, index: usize, instruction: Instruction) {
        self.instructions[index] = instruction;
    }

    /// Drop the debug table. Pure memory saving, never semantic.
    pub fn strip_debug_info(&mut self) {
        self.debug = None;
    }
}

impl Default for Program {
    fn default() -> Self {
        Self::new()
    }
}
