//! Source to bytecode compilation
//!
//! The scan keeps exactly one pending instruction: the run of identical
//! operators seen so far. An operator of the same kind extends the run;
//! anything else flushes the pending instruction and starts a new one.
//! Brackets backpatch through an explicit stack whose depth equals the
//! loop nesting depth, so the whole pass is O(source length).

use bfc_bytecode::{Instruction, Opcode, Program};
use bfc_common::{BfcError, SourceSpan};
use log::debug;

/// The bytecode compiler.
pub struct Compiler {
    debug_info: bool,
}

impl Compiler {
    pub fn new() -> Self {
        Self { debug_info: true }
    }

    /// Enable or disable the per-instruction source span table.
    pub fn debug_info(mut self, enabled: bool) -> Self {
        self.debug_info = enabled;
        self
    }

    /// Compile source text into a bytecode program.
    ///
    /// Fails with [`BfcError::Syntax`] on a stray `]` (at the position it
    /// is seen) or on a `[` still open at end of input (at the position
    /// of the innermost unmatched `[`).
    pub fn compile(&self, source: &str) -> Result<Program, BfcError> {
        let mut program = if self.debug_info {
            Program::with_debug(source)
        } else {
            Program::new()
        };

        // (index the Jz will occupy, span of the '[') per open bracket
        let mut open_brackets: Vec<(usize, SourceSpan)> = Vec::new();
        let mut pending = Instruction::nop();
        let mut pending_span = SourceSpan::synthetic();
        let mut line = 0usize;
        let mut column = 0usize;

        for (pos, byte) in source.bytes().enumerate() {
            match byte {
                b'+' | b'-' => {
                    let delta = if byte == b'+' { 1 } else { -1 };
                    if pending.opcode == Opcode::Add {
                        pending.value += delta;
                        pending_span.extend_to(pos + 1);
                    } else {
                        program.append(pending, pending_span);
                        pending = Instruction::new(Opcode::Add, delta);
                        pending_span = SourceSpan::at(pos, line, column);
                    }
                }

                b'>' | b'<' => {
                    let delta = if byte == b'>' { 1 } else { -1 };
                    if pending.opcode == Opcode::PtrAdd {
                        pending.value += delta;
                        pending_span.extend_to(pos + 1);
                    } else {
                        program.append(pending, pending_span);
                        pending = Instruction::new(Opcode::PtrAdd, delta);
                        pending_span = SourceSpan::at(pos, line, column);
                    }
                }

                b'.' => {
                    if pending.opcode == Opcode::Out {
                        pending.value += 1;
                        pending_span.extend_to(pos + 1);
                    } else {
                        program.append(pending, pending_span);
                        pending = Instruction::new(Opcode::Out, 1);
                        pending_span = SourceSpan::at(pos, line, column);
                    }
                }

                b',' => {
                    if pending.opcode == Opcode::In {
                        pending.value += 1;
                        pending_span.extend_to(pos + 1);
                    } else {
                        program.append(pending, pending_span);
                        pending = Instruction::new(Opcode::In, 1);
                        pending_span = SourceSpan::at(pos, line, column);
                    }
                }

                b'[' => {
                    if pending.opcode != Opcode::Nop {
                        program.append(pending, pending_span);
                    }
                    pending = Instruction::new(Opcode::Jz, 0); // backpatched at ']'
                    pending_span = SourceSpan::at(pos, line, column);
                    open_brackets.push((program.len(), pending_span));
                }

                b']' => {
                    if pending.opcode != Opcode::Nop {
                        program.append(pending, pending_span);
                    }
                    let span = SourceSpan::at(pos, line, column);
                    let (match_index, _) = open_brackets.pop().ok_or_else(|| {
                        BfcError::syntax("unexpected ']' with no matching '['", span)
                    })?;
                    let current_index = program.len();
                    let distance = (current_index - match_index) as i32;
                    let mut matching = program.read(match_index);
                    matching.value = distance;
                    program.patch(match_index, matching);
                    pending = Instruction::new(Opcode::Jnz, -distance);
                    pending_span = span;
                }

                b'\n' => {
                    line += 1;
                    column = 0;
                    continue;
                }

                // everything else is a comment
                _ => {}
            }
            column += 1;
        }

        if pending.opcode != Opcode::Nop {
            program.append(pending, pending_span);
        }

        if let Some(&(_, span)) = open_brackets.last() {
            return Err(BfcError::syntax(
                format!(
                    "reached end of input with {} unmatched '['",
                    open_brackets.len()
                ),
                span,
            ));
        }

        debug!(
            "compiled {} instructions from {} source bytes",
            program.len(),
            source.len()
        );
        Ok(program)
    }
}

impl Default for Compiler {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn compile(source: &str) -> Program {
        Compiler::new().compile(source).unwrap()
    }

    fn opcodes(program: &Program) -> Vec<(Opcode, i32)> {
        program
            .instructions()
            .iter()
            .map(|i| (i.opcode, i.value))
            .collect()
    }

    /// Walk the program with a bracket stack and check that every Jz/Jnz
    /// pair has symmetric relative payloads.
    fn assert_brackets_matched(program: &Program) {
        let mut stack = Vec::new();
        for (i, instruction) in program.instructions().iter().enumerate() {
            match instruction.opcode {
                Opcode::Jz => stack.push(i),
                Opcode::Jnz => {
                    let open = stack.pop().expect("Jnz without Jz");
                    assert_eq!(program.read(open).value, (i - open) as i32);
                    assert_eq!(instruction.value, open as i32 - i as i32);
                }
                _ => {}
            }
        }
        assert!(stack.is_empty(), "Jz without Jnz");
    }

    #[test]
    fn test_runs_fuse() {
        // the run separator Nop before the first real instruction is
        // intentional; the optimizer strips it
        let program = compile("+++");
        assert_eq!(
            opcodes(&program),
            vec![(Opcode::Nop, 0), (Opcode::Add, 3)]
        );
    }

    #[test]
    fn test_mixed_signs_fuse_to_net_value() {
        let program = compile("++-");
        assert_eq!(
            opcodes(&program),
            vec![(Opcode::Nop, 0), (Opcode::Add, 1)]
        );
    }

    #[test]
    fn test_runs_fuse_across_comments() {
        let program = compile("+ comment with no operators +");
        assert_eq!(
            opcodes(&program),
            vec![(Opcode::Nop, 0), (Opcode::Add, 2)]
        );
        assert_eq!(program.span(1).unwrap().begin, 0);
        assert_eq!(program.span(1).unwrap().end, 29);
    }

    #[test]
    fn test_kind_switch_flushes_run() {
        let program = compile("++>>.,");
        assert_eq!(
            opcodes(&program),
            vec![
                (Opcode::Nop, 0),
                (Opcode::Add, 2),
                (Opcode::PtrAdd, 2),
                (Opcode::Out, 1),
                (Opcode::In, 1),
            ]
        );
    }

    #[test]
    fn test_simple_loop_backpatch() {
        let program = compile("[-]");
        assert_eq!(
            opcodes(&program),
            vec![(Opcode::Jz, 2), (Opcode::Add, -1), (Opcode::Jnz, -2)]
        );
        assert_brackets_matched(&program);
    }

    #[test]
    fn test_nested_loops_backpatch() {
        let program = compile("++[->[-]<]");
        assert_brackets_matched(&program);
        // outer pair spans the inner one
        assert_eq!(program.read(2).opcode, Opcode::Jz);
        assert_eq!(program.read(2).value, 7);
        assert_eq!(program.read(9).value, -7);
    }

    #[test]
    fn test_empty_loop_compiles() {
        let program = compile("[]");
        assert_eq!(opcodes(&program), vec![(Opcode::Jz, 1), (Opcode::Jnz, -1)]);
        assert_brackets_matched(&program);
    }

    #[test]
    fn test_stray_closing_bracket() {
        let err = Compiler::new().compile("]").unwrap_err();
        match err {
            BfcError::Syntax { span, .. } => {
                assert_eq!(span.begin, 0);
                assert_eq!(span.line, 0);
                assert_eq!(span.column, 0);
            }
            other => panic!("expected syntax error, got {other:?}"),
        }
    }

    #[test]
    fn test_stray_closing_bracket_position() {
        let err = Compiler::new().compile("+\n+]").unwrap_err();
        match err {
            BfcError::Syntax { span, .. } => {
                assert_eq!(span.line, 1);
                assert_eq!(span.column, 1);
            }
            other => panic!("expected syntax error, got {other:?}"),
        }
    }

    #[test]
    fn test_unclosed_brackets() {
        let err = Compiler::new().compile("[[").unwrap_err();
        match err {
            BfcError::Syntax { span, message } => {
                // innermost unmatched '['
                assert_eq!(span.begin, 1);
                assert!(message.contains("2 unmatched"), "{message}");
            }
            other => panic!("expected syntax error, got {other:?}"),
        }
    }

    #[test]
    fn test_debug_spans_cover_runs() {
        let program = compile("++\n>>");
        // Nop, Add(2), PtrAdd(2)
        assert_eq!(program.span(1), Some(SourceSpan::new(0, 2, 0, 0)));
        assert_eq!(program.span(2), Some(SourceSpan::new(3, 5, 1, 0)));
    }

    #[test]
    fn test_without_debug_info() {
        let program = Compiler::new().debug_info(false).compile("+[-]").unwrap();
        assert!(!program.has_debug_info());
        assert_brackets_matched(&program);
    }

    #[test]
    fn test_input_output_runs_count_repetitions() {
        let program = compile("...,,");
        assert_eq!(
            opcodes(&program),
            vec![(Opcode::Nop, 0), (Opcode::Out, 3), (Opcode::In, 2)]
        );
    }
}
