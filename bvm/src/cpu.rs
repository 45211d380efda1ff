//! Bytecode execution engine
//!
//! The cell under the tape pointer is cached in a register and only
//! written back when the pointer moves (or the program ends), so hot
//! loops that hammer one cell never touch the tape. A zero flag mirrors
//! the cached value so jumps do not re-read it.

use crate::memory::Memory;
use bfc_bytecode::{Opcode, Program};
use bfc_common::BfcError;
use log::trace;
use std::io::{ErrorKind, Read, Write};

/// The virtual machine's execution state.
///
/// A fresh CPU starts at pc 0 and pointer 0 with the zero flag set,
/// matching the all-zero tape.
pub struct Cpu {
    program_counter: usize,
    pointer: i32,
    current_value: i32,
    dirty: bool,
    zero: bool,
}

impl Cpu {
    pub fn new() -> Self {
        Self {
            program_counter: 0,
            pointer: 0,
            current_value: 0,
            dirty: false,
            zero: true,
        }
    }

    /// Tape pointer after the last executed instruction.
    pub fn pointer(&self) -> i32 {
        self.pointer
    }

    /// Cached value of the cell under the tape pointer.
    pub fn current_value(&self) -> i32 {
        self.current_value
    }

    /// Execute `program` until the program counter runs off its end.
    ///
    /// On return the cached cell has been written back, so `memory`
    /// holds the machine's complete terminal state, and `output` has
    /// been flushed.
    pub fn run<R: Read, W: Write>(
        &mut self,
        program: &Program,
        memory: &mut Memory,
        input: &mut R,
        output: &mut W,
    ) -> Result<(), BfcError> {
        while self.program_counter < program.len() {
            let instruction = program.read(self.program_counter);
            trace!(
                "pc {:5} ptr {:5} {} {:+}",
                self.program_counter,
                self.pointer,
                instruction.opcode,
                instruction.value
            );
            match instruction.opcode {
                Opcode::Nop => {}
                Opcode::Add => {
                    self.set_current(self.current_value.wrapping_add(instruction.value));
                }
                Opcode::AddPi => {
                    memory.write(
                        self.pointer,
                        self.current_value.wrapping_add(instruction.value),
                    );
                    self.pointer = self.pointer.wrapping_add(1);
                    self.reload(memory);
                }
                Opcode::AddPd => {
                    memory.write(
                        self.pointer,
                        self.current_value.wrapping_add(instruction.value),
                    );
                    self.pointer = self.pointer.wrapping_sub(1);
                    self.reload(memory);
                }
                Opcode::PtrAdd => {
                    self.flush(memory);
                    self.pointer = self.pointer.wrapping_add(instruction.value);
                    self.reload(memory);
                }
                Opcode::In => {
                    // fused reads: the last byte wins
                    let mut byte = self.current_value;
                    for _ in 0..instruction.value {
                        byte = read_byte(input)?;
                    }
                    self.set_current(byte);
                }
                Opcode::Out => {
                    let byte = [self.current_value as u8];
                    for _ in 0..instruction.value {
                        output.write_all(&byte)?;
                    }
                }
                Opcode::Jz => {
                    if self.zero {
                        self.jump(instruction.value)?;
                        continue;
                    }
                }
                Opcode::Jnz => {
                    if !self.zero {
                        self.jump(instruction.value)?;
                        continue;
                    }
                }
                Opcode::Set => self.set_current(instruction.value),
                Opcode::AddM => {
                    if instruction.value == 0 {
                        self.set_current(self.current_value.wrapping_add(self.current_value));
                    } else {
                        let target = self.pointer.wrapping_add(instruction.value);
                        memory.write(target, memory.read(target).wrapping_add(self.current_value));
                    }
                }
                Opcode::SubM => {
                    if instruction.value == 0 {
                        self.set_current(0);
                    } else {
                        let target = self.pointer.wrapping_add(instruction.value);
                        memory.write(target, memory.read(target).wrapping_sub(self.current_value));
                    }
                }
            }
            self.program_counter += 1;
        }
        self.flush(memory);
        output.flush()?;
        Ok(())
    }

    /// Jumps land on the partner bracket, which re-tests the unchanged
    /// zero flag and falls through.
    fn jump(&mut self, offset: i32) -> Result<(), BfcError> {
        self.program_counter = self
            .program_counter
            .checked_add_signed(offset as isize)
            .ok_or(BfcError::IllegalInstruction {
                pc: self.program_counter,
            })?;
        Ok(())
    }

    fn set_current(&mut self, value: i32) {
        self.current_value = value;
        self.dirty = true;
        self.zero = value == 0;
    }

    fn flush(&mut self, memory: &mut Memory) {
        if self.dirty {
            memory.write(self.pointer, self.current_value);
            self.dirty = false;
        }
    }

    fn reload(&mut self, memory: &Memory) {
        self.current_value = memory.read(self.pointer);
        self.dirty = false;
        self.zero = self.current_value == 0;
    }
}

impl Default for Cpu {
    fn default() -> Self {
        Self::new()
    }
}

/// Blocking single-byte read; end of input reads as -1.
fn read_byte<R: Read>(input: &mut R) -> Result<i32, BfcError> {
    let mut buffer = [0u8; 1];
    loop {
        match input.read(&mut buffer) {
            Ok(0) => return Ok(-1),
            Ok(_) => return Ok(i32::from(buffer[0])),
            Err(error) if error.kind() == ErrorKind::Interrupted => {}
            Err(error) => return Err(error.into()),
        }
    }
}
