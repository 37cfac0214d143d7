//! Error types for the pigment-mix core.

use thiserror::Error;

/// Errors produced while building palettes, mixtures, and optimizer runs.
///
/// The search itself never fails: every variant here is raised at
/// construction time, before any generation is evaluated.
#[derive(Debug, Error)]
pub enum MixError {
    /// A run configuration value was outside its valid range.
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    /// A palette could not be constructed (empty, or a pigment failed to parse).
    #[error("invalid palette: {0}")]
    InvalidPalette(String),

    /// A color string could not be parsed.
    #[error("invalid color: {0}")]
    InvalidColor(String),

    /// A proportion vector did not have one entry per palette pigment.
    #[error("proportion mismatch: expected {expected} proportions, got {got}")]
    ProportionMismatch { expected: usize, got: usize },

    /// A proportion was NaN or infinite.
    #[error("invalid proportion {value} at pigment index {index}")]
    InvalidProportion { index: usize, value: f64 },

    /// A pigment index was outside the palette.
    #[error("pigment index {index} out of range for palette of {len}")]
    IndexOutOfRange { index: usize, len: usize },

    /// A configuration key existed but had the wrong JSON type.
    #[error("parameter type mismatch for '{name}': expected {expected}, got {got}")]
    ParamTypeMismatch {
        name: String,
        expected: String,
        got: String,
    },
}
