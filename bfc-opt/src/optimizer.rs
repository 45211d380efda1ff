//! Recursive fixpoint optimizer
//!
//! Each pass builds a brand-new output program; the input is never
//! mutated. Spans of rewritten instructions follow the source operators
//! that produced them, so listings of optimized programs still point at
//! the right source.

use crate::patterns::{LinearArithmetic, LoopPattern, SetToZero};
use bfc_bytecode::{Instruction, Opcode, Program};
use bfc_common::{BfcError, SourceSpan};
use log::{debug, trace, warn};
use std::ops::AddAssign;

/// Net effect of rewriting one contiguous span: how many instructions
/// were gained or lost, and how far the rewritten code moves the tape
/// pointer. Used to rebase the jump offsets of an enclosing loop.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
struct OptInfo {
    instruction_delta: i32,
    pointer_delta: i32,
}

impl AddAssign for OptInfo {
    fn add_assign(&mut self, other: Self) {
        self.instruction_delta += other.instruction_delta;
        self.pointer_delta += other.pointer_delta;
    }
}

/// The bytecode optimizer: a registration-ordered set of loop patterns
/// around a generic recursive span rewriter.
pub struct Optimizer {
    patterns: Vec<Box<dyn LoopPattern>>,
}

impl Optimizer {
    /// Optimizer with the standard pattern pipeline.
    pub fn new() -> Self {
        let mut optimizer = Self::empty();
        optimizer.register(Box::new(SetToZero));
        optimizer.register(Box::new(LinearArithmetic));
        optimizer
    }

    /// Optimizer with no loop patterns; only the generic passes run.
    pub fn empty() -> Self {
        Self {
            patterns: Vec::new(),
        }
    }

    /// Add a loop pattern. Patterns are tried in registration order and
    /// the first match wins.
    pub fn register(&mut self, pattern: Box<dyn LoopPattern>) {
        self.patterns.push(pattern);
    }

    /// Optimize a program to a fixpoint: whole-program passes repeat
    /// until one produces zero net instruction-count change, and that
    /// pass's output is returned.
    pub fn optimize(&self, input: &Program) -> Result<Program, BfcError> {
        let (mut program, mut delta) = self.run_pass(input, 0)?;
        let mut pass = 1;
        while delta != 0 {
            let (next, next_delta) = self.run_pass(&program, pass)?;
            program = next;
            delta = next_delta;
            pass += 1;
        }
        Ok(program)
    }

    fn run_pass(&self, input: &Program, pass: usize) -> Result<(Program, i32), BfcError> {
        let mut output = input.successor();
        let info = self.optimize_span(input, &mut output, 0, input.len())?;
        debug!(
            "optimization pass {pass}: {} -> {} instructions (i-delta {}, p-delta {})",
            input.len(),
            output.len(),
            info.instruction_delta,
            info.pointer_delta
        );
        Ok((output, info.instruction_delta))
    }

    /// Partition `input[begin..end)` into alternating flat segments and
    /// depth-0 loop regions, optimizing each in original order.
    fn optimize_span(
        &self,
        input: &Program,
        output: &mut Program,
        begin: usize,
        end: usize,
    ) -> Result<OptInfo, BfcError> {
        let mut info = OptInfo::default();
        let mut segment_start = begin;
        let mut depth = 0usize;

        for i in begin..end {
            match input.read(i).opcode {
                Opcode::Jz => {
                    if depth == 0 {
                        if segment_start < i {
                            info += self.optimize_flat(input, output, segment_start, i);
                        }
                        segment_start = i;
                    }
                    depth += 1;
                }
                Opcode::Jnz => {
                    if depth == 0 {
                        return Err(BfcError::invalid_bytecode(format!(
                            "JNZ at pc {i} without a matching JZ"
                        )));
                    }
                    depth -= 1;
                    if depth == 0 {
                        info += self.optimize_loop(input, output, segment_start, i + 1)?;
                        segment_start = i + 1;
                    }
                }
                _ => {}
            }
        }
        if depth != 0 {
            return Err(BfcError::invalid_bytecode(format!(
                "unterminated JZ region entered before pc {end}"
            )));
        }
        info += self.optimize_flat(input, output, segment_start, end);
        Ok(info)
    }

    /// Peephole pass over a bracket-free segment: strips Nop and
    /// zero-payload PTR, and fuses ADD followed by PTR +-1 into
    /// ADDPI/ADDPD by rewriting the already-emitted ADD in place.
    fn optimize_flat(
        &self,
        input: &Program,
        output: &mut Program,
        begin: usize,
        end: usize,
    ) -> OptInfo {
        trace!("flat segment ({begin}, {end})");
        let mut info = OptInfo::default();
        let starting_len = output.len();
        let mut previous = Instruction::nop();
        let mut previous_span = SourceSpan::synthetic();

        for i in begin..end {
            let instruction = input.read(i);
            let span = input.span(i).unwrap_or_else(SourceSpan::synthetic);
            match instruction.opcode {
                Opcode::Nop => continue,
                Opcode::AddPi => {
                    info.pointer_delta += 1;
                    output.append(instruction, span);
                }
                Opcode::AddPd => {
                    info.pointer_delta -= 1;
                    output.append(instruction, span);
                }
                Opcode::PtrAdd => {
                    if instruction.value == 0 {
                        continue;
                    }
                    info.pointer_delta += instruction.value;
                    if previous.opcode == Opcode::Add && instruction.value.abs() == 1 {
                        let fused = Instruction::new(
                            if instruction.value == 1 {
                                Opcode::AddPi
                            } else {
                                Opcode::AddPd
                            },
                            previous.value,
                        );
                        let fused_span = previous_span.merge(&span);
                        output.replace(output.len() - 1, fused, fused_span);
                        previous = fused;
                        previous_span = fused_span;
                        continue;
                    }
                    output.append(instruction, span);
                }
                _ => output.append(instruction, span),
            }
            previous = instruction;
            previous_span = span;
        }

        info.instruction_delta = (output.len() - starting_len) as i32 - (end - begin) as i32;
        info
    }

    /// Optimize one loop region `input[begin..end)` spanning a bracket
    /// pair. Patterns are matched against the un-optimized body; if none
    /// fires, the body is optimized recursively and the brackets are
    /// re-emitted with their jump offsets rebased by the body's
    /// instruction-count delta.
    fn optimize_loop(
        &self,
        input: &Program,
        output: &mut Program,
        begin: usize,
        end: usize,
    ) -> Result<OptInfo, BfcError> {
        trace!("loop region ({begin}, {end})");
        if end < begin + 2 {
            return Err(BfcError::invalid_loop(format!(
                "region ({begin}, {end}) is shorter than a bracket pair"
            )));
        }
        let starting_len = output.len();

        for pattern in &self.patterns {
            if pattern.try_transform(input, output, begin, end) {
                trace!("loop ({begin}, {end}) rewritten by {}", pattern.name());
                let mut info = OptInfo {
                    instruction_delta: (output.len() - starting_len) as i32
                        - (end - begin) as i32,
                    pointer_delta: 0,
                };
                // the pattern's emission is taken verbatim; recover its
                // pointer displacement by re-scanning it
                for i in starting_len..output.len() {
                    let emitted = output.read(i);
                    match emitted.opcode {
                        Opcode::PtrAdd => info.pointer_delta += emitted.value,
                        Opcode::AddPi => info.pointer_delta += 1,
                        Opcode::AddPd => info.pointer_delta -= 1,
                        _ => {}
                    }
                }
                return Ok(info);
            }
        }

        let inner_begin = begin + 1;
        let inner_end = end - 1;
        let mut loop_begin = input.read(begin);
        let mut loop_end = input.read(end - 1);
        let begin_span = input.span(begin).unwrap_or_else(SourceSpan::synthetic);
        let end_span = input.span(end - 1).unwrap_or_else(SourceSpan::synthetic);

        let loop_begin_index = output.len();
        output.append(loop_begin, begin_span);

        let info = if inner_begin < inner_end {
            self.optimize_span(input, output, inner_begin, inner_end)?
        } else {
            // `[]`: legal, denotes an infinite loop once entered
            warn!("empty loop body at pc {begin}");
            OptInfo::default()
        };

        loop_begin.value += info.instruction_delta;
        loop_end.value -= info.instruction_delta;
        output.patch(loop_begin_index, loop_begin);
        output.append(loop_end, end_span);
        Ok(info)
    }
}

impl Default for Optimizer {
    fn default() -> Self {
        Self::new()
    }
}
