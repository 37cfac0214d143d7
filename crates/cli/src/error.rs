//! Structured CLI errors with meaningful exit codes.
//!
//! Exit code scheme:
//! - 0:  success
//! - 2:  clap arg parse error (automatic, before our code runs)
//! - 10: solver error (invalid configuration, bad proportions)
//! - 11: I/O error (reading a palette, target, or config file)
//! - 12: input error (bad color, unknown palette, mistyped config key)
//! - 13: serialization error

use pigment_mix_core::MixError;
use std::fmt;

/// Errors produced by CLI operations, each mapped to a distinct exit code.
#[derive(Debug)]
pub enum CliError {
    Solver(MixError),
    Io(String),
    Input(String),
    Serialization(String),
}

impl CliError {
    /// Returns the process exit code for this error.
    pub fn exit_code(&self) -> i32 {
        match self {
            CliError::Solver(_) => 10,
            CliError::Io(_) => 11,
            CliError::Input(_) => 12,
            CliError::Serialization(_) => 13,
        }
    }
}

impl fmt::Display for CliError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CliError::Solver(e) => write!(f, "{e}"),
            CliError::Io(msg) | CliError::Input(msg) | CliError::Serialization(msg) => {
                write!(f, "{msg}")
            }
        }
    }
}

impl From<MixError> for CliError {
    fn from(e: MixError) -> Self {
        match e {
            MixError::InvalidColor(_)
            | MixError::InvalidPalette(_)
            | MixError::ParamTypeMismatch { .. } => CliError::Input(e.to_string()),
            other => CliError::Solver(other),
        }
    }
}

impl From<serde_json::Error> for CliError {
    fn from(e: serde_json::Error) -> Self {
        CliError::Serialization(e.to_string())
    }
}
