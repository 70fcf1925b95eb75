pub mod analyzer;
pub mod assembler;

pub use analyzer::*;
pub use assembler::*;
