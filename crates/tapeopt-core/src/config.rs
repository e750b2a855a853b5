//! Configuration types for the translator, optimizer and backends.

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::Path;
use std::str::FromStr;

/// Number of cells on the tape, for both the interpreter and generated programs.
pub const DEFAULT_TAPE_SIZE: usize = 65_536;

/// Ceiling on executed instructions before the interpreter gives up.
pub const DEFAULT_MAX_STEPS: u64 = 100_000_000;

/// A named rewrite pass of the optimization pipeline
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum PassKind {
    /// Coalesce and annihilate adjacent instructions
    Cancel,
    /// `[-]` / `[+]` to a single clear
    ClearLoop,
    /// `[<]` / `[>]` to a scan
    ScanLoop,
    /// Fold "move out, operate, move back" into an offsetted operation
    OffsetCombine,
    /// Multiply/copy loops to straight-line arithmetic
    Contract,
}

impl PassKind {
    pub const ALL: [PassKind; 5] = [
        PassKind::Cancel,
        PassKind::ClearLoop,
        PassKind::ScanLoop,
        PassKind::OffsetCombine,
        PassKind::Contract,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            PassKind::Cancel => "cancel",
            PassKind::ClearLoop => "clear-loop",
            PassKind::ScanLoop => "scan-loop",
            PassKind::OffsetCombine => "offset-combine",
            PassKind::Contract => "contract",
        }
    }
}

impl fmt::Display for PassKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for PassKind {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        PassKind::ALL
            .into_iter()
            .find(|kind| kind.name() == s)
            .ok_or_else(|| Error::Config(format!("Unknown pass '{}'", s)))
    }
}

/// Which passes run, and in what order
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    pub passes: Vec<PassKind>,
}

impl PipelineConfig {
    /// A pipeline that leaves the IR untouched
    pub fn none() -> Self {
        Self { passes: Vec::new() }
    }

    pub fn with_passes(passes: Vec<PassKind>) -> Self {
        Self { passes }
    }

    pub fn is_enabled(&self, kind: PassKind) -> bool {
        self.passes.contains(&kind)
    }
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            passes: PassKind::ALL.to_vec(),
        }
    }
}

/// Language of the generated program
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Target {
    #[default]
    Python,
    C,
}

impl FromStr for Target {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "python" | "py" => Ok(Target::Python),
            "c" => Ok(Target::C),
            other => Err(Error::Config(format!("Unknown target '{}'", other))),
        }
    }
}

/// Code generation parameters
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CodegenConfig {
    /// Output language
    pub target: Target,
    /// Size of the memory array declared in the preamble
    pub tape_size: usize,
    /// One level of block indentation
    pub indent: String,
}

impl Default for CodegenConfig {
    fn default() -> Self {
        Self {
            target: Target::Python,
            tape_size: DEFAULT_TAPE_SIZE,
            indent: "    ".to_string(),
        }
    }
}

/// Direct interpreter limits
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct InterpreterConfig {
    /// Number of cells on the tape
    pub tape_size: usize,
    /// Maximum executed instructions; `None` disables the guard
    pub max_steps: Option<u64>,
    /// How long an interactive input request may stay unanswered
    pub input_timeout_ms: Option<u64>,
}

impl Default for InterpreterConfig {
    fn default() -> Self {
        Self {
            tape_size: DEFAULT_TAPE_SIZE,
            max_steps: Some(DEFAULT_MAX_STEPS),
            input_timeout_ms: None,
        }
    }
}

/// Top-level configuration for the command line driver
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ToolConfig {
    pub pipeline: PipelineConfig,
    pub codegen: CodegenConfig,
    pub interpreter: InterpreterConfig,
}

impl ToolConfig {
    /// Load a JSON configuration file; missing fields take their defaults.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path)?;
        let config: ToolConfig = serde_json::from_str(&text)?;
        tracing::debug!(path = %path.display(), "Loaded configuration");
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.codegen.tape_size == 0 || self.interpreter.tape_size == 0 {
            return Err(Error::Config("tape_size must be at least 1".to_string()));
        }
        if self.interpreter.max_steps == Some(0) {
            return Err(Error::Config(
                "max_steps of 0 would reject every program; use null to disable".to_string(),
            ));
        }
        Ok(())
    }
}
