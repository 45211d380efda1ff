//! Tape storage
//!
//! A fixed power-of-two cell count lets pointer wraparound be a mask
//! instead of a bounds check, so out-of-range pointers (including
//! negative ones) fold back onto the tape.

/// Number of cells on the tape.
pub const TAPE_CELLS: usize = 65536;

const POINTER_MASK: i32 = TAPE_CELLS as i32 - 1;

/// The machine's tape: `TAPE_CELLS` i32 cells, all zero at startup.
pub struct Memory {
    cells: Vec<i32>,
}

impl Memory {
    pub fn new() -> Self {
        Self {
            cells: vec![0; TAPE_CELLS],
        }
    }

    /// Read the cell at `pointer`, wrapping onto the tape.
    pub fn read(&self, pointer: i32) -> i32 {
        self.cells[(pointer & POINTER_MASK) as usize]
    }

    /// Write the cell at `pointer`, wrapping onto the tape.
    pub fn write(&mut self, pointer: i32, value: i32) {
        self.cells[(pointer & POINTER_MASK) as usize] = value;
    }
}

impl Default for Memory {
    fn default() -> Self {
        Self::new()
    }
}
