//! Helpers for reading typed settings out of a flat `serde_json::Value` object.
//!
//! Each helper takes a JSON value, a key name, and a default. A missing key
//! (or a non-object `params`) yields the default; a key that is present with
//! the wrong JSON type is an error, so a typo in a config file never silently
//! runs with defaults.

use crate::error::MixError;
use serde_json::Value;

fn type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(n) if n.is_u64() || n.is_i64() => "integer",
        Value::Number(_) => "float",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

fn mismatch(name: &str, expected: &str, got: &Value) -> MixError {
    MixError::ParamTypeMismatch {
        name: name.to_string(),
        expected: expected.to_string(),
        got: type_name(got).to_string(),
    }
}

/// Extracts an `f64` from `params[name]`. Integers are accepted and widened.
pub fn param_f64(params: &Value, name: &str, default: f64) -> Result<f64, MixError> {
    match params.get(name) {
        None => Ok(default),
        Some(v) => v.as_f64().ok_or_else(|| mismatch(name, "number", v)),
    }
}

/// Extracts a `usize` from `params[name]`. Only non-negative integers are accepted.
pub fn param_usize(params: &Value, name: &str, default: usize) -> Result<usize, MixError> {
    match params.get(name) {
        None => Ok(default),
        Some(v) => v
            .as_u64()
            .and_then(|n| usize::try_from(n).ok())
            .ok_or_else(|| mismatch(name, "unsigned integer", v)),
    }
}

/// Extracts a `u64` from `params[name]`.
pub fn param_u64(params: &Value, name: &str, default: u64) -> Result<u64, MixError> {
    match params.get(name) {
        None => Ok(default),
        Some(v) => v
            .as_u64()
            .ok_or_else(|| mismatch(name, "unsigned integer", v)),
    }
}
