//! Core types shared by the tapeopt translator, optimizer and runtime.

pub mod config;
pub mod error;

pub use config::*;
pub use error::{Error, MalformedSource, Result};
