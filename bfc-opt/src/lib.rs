//! Brainfuck Bytecode Compiler - Optimizer
//!
//! Rewrites a compiled program into a semantically equivalent one with
//! fewer instructions. A pass recursively partitions the program into
//! flat segments and bracketed loop regions: flat segments go through a
//! peephole pass, loops through a pipeline of pattern rewrites with a
//! generic recursive fallback. Whole passes repeat until one changes
//! nothing.

mod optimizer;
mod patterns;

pub use optimizer::Optimizer;
pub use patterns::{LinearArithmetic, LoopPattern, SetToZero};
