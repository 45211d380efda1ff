//! Bytecode virtual machine
//!
//! Executes compiled programs over a fixed 65536-cell tape of i32
//! cells. The tape pointer wraps around at both ends. I/O is generic
//! over `std::io::Read` and `std::io::Write`, so callers can wire up
//! stdin/stdout or in-memory buffers.

mod cpu;
mod memory;

pub use cpu::Cpu;
pub use memory::Memory;
