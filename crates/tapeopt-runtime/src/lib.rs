//! Runtime for executing tape programs directly.
//!
//! This crate provides the execution side of the toolchain:
//! - The direct interpreter over a fixed-size wrapping tape
//! - Input sources (buffered and host-answered)
//! - The handoff that lets an async host answer interactive input

pub mod host;
pub mod input;
pub mod interpreter;

pub use host::{spawn_interactive, InteractiveRun};
pub use input::{BufferedInput, ChannelInput, InputRequest, InputSource};
pub use interpreter::{Execution, Interpreter, Tape};

use tapeopt_core::{Error, InterpreterConfig, Result};
use tapeopt_ir::{translate, Program};

/// Entry point for running programs with a fixed configuration
#[derive(Debug, Clone, Default)]
pub struct Runtime {
    config: InterpreterConfig,
}

impl Runtime {
    pub fn new(config: InterpreterConfig) -> Result<Self> {
        if config.tape_size == 0 {
            return Err(Error::Config("tape_size must be at least 1".to_string()));
        }
        if config.max_steps == Some(0) {
            return Err(Error::Config("max_steps must be positive".to_string()));
        }
        Ok(Self { config })
    }

    pub fn config(&self) -> &InterpreterConfig {
        &self.config
    }

    pub fn interpreter(&self) -> Interpreter {
        Interpreter::new(self.config.clone())
    }

    /// Execute IR on a fresh tape
    pub fn execute(&self, program: &Program, input: &mut dyn InputSource) -> Result<Execution> {
        self.interpreter().run(program, input)
    }

    /// Translate and execute raw source text without optimizing it
    pub fn execute_source(&self, source: &str, input: &mut dyn InputSource) -> Result<Execution> {
        let program = translate(source)?;
        self.execute(&program, input)
    }
}
