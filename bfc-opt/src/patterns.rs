//! Loop rewrite patterns
//!
//! A pattern inspects one bracket-delimited loop region and, if it
//! recognizes the shape, emits a straight-line replacement. A pattern
//! that declines must leave the output untouched.

use bfc_bytecode::{Instruction, Opcode, Program};
use bfc_common::SourceSpan;
use std::collections::BTreeMap;

/// A rewrite rule for one whole loop.
///
/// `input[begin..end)` is a region whose first instruction is `JZ` and
/// whose last is the matching `JNZ`. On a match the pattern appends its
/// replacement to `output` and returns true; on a decline it returns
/// false without touching `output`.
pub trait LoopPattern {
    /// Name used in trace logging.
    fn name(&self) -> &'static str;

    fn try_transform(
        &self,
        input: &Program,
        output: &mut Program,
        begin: usize,
        end: usize,
    ) -> bool;
}

fn bracket_span(input: &Program, begin: usize, end: usize) -> SourceSpan {
    let open = input.span(begin).unwrap_or_else(SourceSpan::synthetic);
    let close = input.span(end - 1).unwrap_or_else(SourceSpan::synthetic);
    open.merge(&close)
}

/// Rewrites the clear loops `[-]` and `[+]` into a single `SET 0`.
///
/// Both directions terminate for every starting value because cell
/// arithmetic wraps.
pub struct SetToZero;

impl LoopPattern for SetToZero {
    fn name(&self) -> &'static str {
        "set-to-zero"
    }

    fn try_transform(
        &self,
        input: &Program,
        output: &mut Program,
        begin: usize,
        end: usize,
    ) -> bool {
        if end - begin != 3 {
            return false;
        }
        let body = input.read(begin + 1);
        if input.read(begin).opcode != Opcode::Jz
            || input.read(end - 1).opcode != Opcode::Jnz
            || body.opcode != Opcode::Add
            || body.value.abs() != 1
        {
            return false;
        }
        output.append(
            Instruction::new(Opcode::Set, 0),
            bracket_span(input, begin, end),
        );
        true
    }
}

/// Rewrites counted transfer loops like `[->++<]` into multiplication
/// by repeated doubling.
///
/// The body is simulated symbolically for one iteration. The loop is
/// eligible when the body is pure cell arithmetic, the pointer returns
/// to the control cell on exit, and the control cell steps by exactly
/// -1 per iteration. The replacement treats the cached control value as
/// an accumulator: `ADDM 0` doubles it in place, and `ADDM k` / `SUBM k`
/// at each set bit of a cell's per-iteration delta add the accumulator
/// into that cell, so cell at offset k gains `control * delta` overall.
/// A final `SET 0` clears the control cell, matching the loop's exit
/// state.
pub struct LinearArithmetic;

impl LinearArithmetic {
    /// One symbolic iteration of the body. Returns the per-cell deltas
    /// keyed by pointer offset from the control cell, or None if the
    /// body contains anything but cell arithmetic and pointer moves.
    fn simulate(input: &Program, begin: usize, end: usize) -> Option<BTreeMap<i32, i64>> {
        let mut deltas: BTreeMap<i32, i64> = BTreeMap::new();
        let mut offset = 0i32;
        for i in begin..end {
            let instruction = input.read(i);
            match instruction.opcode {
                Opcode::Nop => {}
                Opcode::Add => *deltas.entry(offset).or_default() += i64::from(instruction.value),
                Opcode::PtrAdd => offset += instruction.value,
                Opcode::AddPi => {
                    *deltas.entry(offset).or_default() += i64::from(instruction.value);
                    offset += 1;
                }
                Opcode::AddPd => {
                    *deltas.entry(offset).or_default() += i64::from(instruction.value);
                    offset -= 1;
                }
                _ => return None,
            }
        }
        if offset != 0 {
            return None;
        }
        Some(deltas)
    }
}

impl LoopPattern for LinearArithmetic {
    fn name(&self) -> &'static str {
        "linear-arithmetic"
    }

    fn try_transform(
        &self,
        input: &Program,
        output: &mut Program,
        begin: usize,
        end: usize,
    ) -> bool {
        if end - begin < 2
            || input.read(begin).opcode != Opcode::Jz
            || input.read(end - 1).opcode != Opcode::Jnz
        {
            return false;
        }
        let Some(mut deltas) = Self::simulate(input, begin + 1, end - 1) else {
            return false;
        };
        if deltas.remove(&0) != Some(-1) {
            return false;
        }
        deltas.retain(|_, delta| *delta != 0);

        // decline when double-and-add would emit more instructions than
        // the loop it replaces; the generic rewrite keeps the count equal
        let max_magnitude = deltas.values().map(|d| d.unsigned_abs()).max().unwrap_or(0);
        let doubles = if max_magnitude == 0 {
            0
        } else {
            63 - max_magnitude.leading_zeros()
        };
        let adds: u32 = deltas.values().map(|d| d.unsigned_abs().count_ones()).sum();
        if (1 + doubles + adds) as usize > end - begin {
            return false;
        }

        let span = bracket_span(input, begin, end);
        if max_magnitude != 0 {
            let max_bit = doubles;
            for bit in 0..=max_bit {
                if bit > 0 {
                    output.append(Instruction::new(Opcode::AddM, 0), span);
                }
                for (&target, &delta) in &deltas {
                    if (delta.unsigned_abs() >> bit) & 1 == 1 {
                        let opcode = if delta > 0 { Opcode::AddM } else { Opcode::SubM };
                        output.append(Instruction::new(opcode, target), span);
                    }
                }
            }
        }
        output.append(Instruction::new(Opcode::Set, 0), span);
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bfc_frontend::Compiler;
    use pretty_assertions::assert_eq;

    fn compiled(source: &str) -> Program {
        Compiler::new().debug_info(false).compile(source).unwrap()
    }

    fn emitted(pattern: &dyn LoopPattern, source: &str) -> Option<Vec<(Opcode, i32)>> {
        let program = compiled(source);
        // skip the leading separator Nop when present
        let begin = usize::from(program.read(0).opcode == Opcode::Nop);
        let mut output = program.successor();
        pattern
            .try_transform(&program, &mut output, begin, program.len())
            .then(|| {
                output
                    .instructions()
                    .iter()
                    .map(|i| (i.opcode, i.value))
                    .collect()
            })
    }

    #[test]
    fn test_set_to_zero_matches_both_directions() {
        assert_eq!(emitted(&SetToZero, "[-]"), Some(vec![(Opcode::Set, 0)]));
        assert_eq!(emitted(&SetToZero, "[+]"), Some(vec![(Opcode::Set, 0)]));
    }

    #[test]
    fn test_set_to_zero_declines_longer_bodies() {
        assert_eq!(emitted(&SetToZero, "[--]"), None);
        assert_eq!(emitted(&SetToZero, "[>]"), None);
    }

    #[test]
    fn test_linear_declines_io_in_body() {
        assert_eq!(emitted(&LinearArithmetic, "[-.]"), None);
        assert_eq!(emitted(&LinearArithmetic, "[-,]"), None);
    }

    #[test]
    fn test_linear_declines_inner_loop() {
        assert_eq!(emitted(&LinearArithmetic, "[-[-]]"), None);
    }

    #[test]
    fn test_linear_declines_pointer_drift() {
        assert_eq!(emitted(&LinearArithmetic, "[->+]"), None);
    }

    #[test]
    fn test_linear_declines_bad_control_step() {
        assert_eq!(emitted(&LinearArithmetic, "[-->+<]"), None);
        assert_eq!(emitted(&LinearArithmetic, "[+>+<]"), None);
    }

    #[test]
    fn test_linear_declines_when_rewrite_would_grow() {
        // delta 32 needs five doubles plus an add plus the clear: seven
        // instructions against the six-instruction loop
        let wide = format!("[->{}<]", "+".repeat(32));
        assert_eq!(emitted(&LinearArithmetic, &wide), None);
        // delta 16 lands exactly on the loop's instruction count
        let boundary = format!("[->{}<]", "+".repeat(16));
        assert_eq!(
            emitted(&LinearArithmetic, &boundary),
            Some(vec![
                (Opcode::AddM, 0),
                (Opcode::AddM, 0),
                (Opcode::AddM, 0),
                (Opcode::AddM, 0),
                (Opcode::AddM, 1),
                (Opcode::Set, 0),
            ])
        );
    }

    #[test]
    fn test_linear_handles_clear_loop_as_degenerate_case() {
        assert_eq!(
            emitted(&LinearArithmetic, "[-]"),
            Some(vec![(Opcode::Set, 0)])
        );
    }

    #[test]
    fn test_linear_multi_bit_delta() {
        // delta 5 = 0b101: add at bit 0, double, double, add at bit 2
        assert_eq!(
            emitted(&LinearArithmetic, "[->+++++<]"),
            Some(vec![
                (Opcode::AddM, 1),
                (Opcode::AddM, 0),
                (Opcode::AddM, 0),
                (Opcode::AddM, 1),
                (Opcode::Set, 0),
            ])
        );
    }

    #[test]
    fn test_linear_multiple_targets() {
        // cell1 += 1, cell2 += 2 per iteration
        assert_eq!(
            emitted(&LinearArithmetic, "[->+>++<<]"),
            Some(vec![
                (Opcode::AddM, 1),
                (Opcode::AddM, 0),
                (Opcode::AddM, 2),
                (Opcode::Set, 0),
            ])
        );
    }

    #[test]
    fn test_linear_cancelled_delta_dropped() {
        // cell1 += 1 then -= 1: net zero, nothing emitted for it
        assert_eq!(
            emitted(&LinearArithmetic, "[>+<>-<-]"),
            Some(vec![(Opcode::Set, 0)])
        );
    }
}
