//! Textual bytecode listing
//!
//! Renders a program as a human-readable trace: one mnemonic and signed
//! payload per line, `L_<pc>` labels on the bracket jumps, and the
//! originating source lines interleaved when debug info is present.
//! This is a debugging aid; the exact text format is not a contract.

use crate::program::Program;

/// Render the listing for a program.
pub fn render(program: &Program) -> String {
    let mut out = String::new();
    let source_lines: Vec<&str> = program
        .debug_info()
        .map(|info| info.source.lines().collect())
        .unwrap_or_default();
    let mut next_source_line = 0usize;

    for (pc, instruction) in program.instructions().iter().enumerate() {
        // interleave the source lines that produced this instruction
        if let Some(span) = program.span(pc) {
            while next_source_line <= span.line && next_source_line < source_lines.len() {
                out.push_str(";;;;;;; ");
                out.push_str(source_lines[next_source_line]);
                out.push('\n');
                next_source_line += 1;
            }
        }

        out.push_str(&format!(
            "\t{:<5} {:+}",
            instruction.opcode.mnemonic(),
            instruction.value
        ));
        if instruction.opcode.is_jump() {
            // jump target, then a label so backward jumps can refer here
            let target = pc as i64 + instruction.value as i64;
            out.push_str(&format!("\t; L_{}\nL_{}:", target, pc));
        }
        out.push('\n');
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::opcode::Opcode;
    use crate::program::Instruction;
    use bfc_common::SourceSpan;

    fn sample_loop() -> Program {
        // compiled shape of "[-]" with hand-built spans
        let mut program = Program::with_debug("[-]");
        program.append(Instruction::new(Opcode::Jz, 2), SourceSpan::at(0, 0, 0));
        program.append(Instruction::new(Opcode::Add, -1), SourceSpan::at(1, 0, 1));
        program.append(Instruction::new(Opcode::Jnz, -2), SourceSpan::at(2, 0, 2));
        program
    }

    #[test]
    fn test_labels_on_jumps() {
        let text = render(&sample_loop());
        assert!(text.contains("L_0:"));
        assert!(text.contains("L_2:"));
        assert!(text.contains("; L_2"), "forward jump target: {text}");
        assert!(text.contains("; L_0"), "backward jump target: {text}");
    }

    #[test]
    fn test_source_interleaved_once() {
        let text = render(&sample_loop());
        assert_eq!(text.matches(";;;;;;; [-]").count(), 1);
    }

    #[test]
    fn test_signed_payloads() {
        let text = render(&sample_loop());
        assert!(text.contains("ADD   -1"));
        assert!(text.contains("JZ    +2"));
    }

    #[test]
    fn test_render_without_debug_info() {
        let mut program = Program::new();
        program.append(Instruction::new(Opcode::Set, 0), SourceSpan::synthetic());
        let text = render(&program);
        assert_eq!(text, "\tSET   +0\n");
    }
}
