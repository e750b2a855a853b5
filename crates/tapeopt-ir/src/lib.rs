//! Intermediate Representation (IR) for tape programs.
//!
//! Source text is translated into a flat instruction sequence, rewritten by
//! an ordered list of optimization passes, and finally either lowered into
//! a structured target program or handed to the runtime for execution.

pub mod codegen;
pub mod instruction;
pub mod passes;
pub mod program;
pub mod random;
pub mod translator;
pub mod validation;

pub use codegen::CodeGenerator;
pub use instruction::Instruction;
pub use passes::{optimize, Pass, Pipeline};
pub use program::Program;
pub use random::{SourceGenConfig, SourceGenerator};
pub use translator::translate;
pub use validation::{loop_pairs, validate_program};
