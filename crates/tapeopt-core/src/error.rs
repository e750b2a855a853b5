//! Error types for translation, optimization and execution.

use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Error, Debug)]
pub enum Error {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(String),

    #[error("Malformed source: {0}")]
    MalformedSource(#[from] MalformedSource),

    #[error("Pointer out of bounds: {pointer} is outside a tape of {tape_size} cells")]
    OutOfBounds { pointer: i64, tape_size: usize },

    #[error("Unterminated loop opened at instruction {position}")]
    UnterminatedLoop { position: usize },

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Input unavailable: {0}")]
    InputUnavailable(String),

    #[error("Step budget of {limit} instructions exceeded")]
    StepBudgetExceeded { limit: u64 },

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Invalid state: {0}")]
    InvalidState(String),
}

/// Structural problems found in source text or in an IR sequence.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum MalformedSource {
    #[error("unbalanced brackets ({opens} opening, {closes} closing)")]
    UnbalancedBrackets { opens: usize, closes: usize },

    #[error("closing bracket at position {offset} has no open loop")]
    UnmatchedClose { offset: usize },
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Error::Serialization(err.to_string())
    }
}

impl From<bincode::Error> for Error {
    fn from(err: bincode::Error) -> Self {
        Error::Serialization(err.to_string())
    }
}
