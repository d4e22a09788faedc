//! Typed access to request configuration
//!
//! Clients send configuration as a free-form JSON object. Only a handful of
//! keys mean anything to the engine; everything else is ignored so newer
//! clients can talk to older servers.

use crate::error::{EvaluationError, EvaluationResult};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::time::Duration;

/// Solver level selector
pub const LEVEL_KEY: &str = "level";
/// Debug vs release log filter
pub const VERBOSITY_KEY: &str = "verbosity";
/// Short visualization run vs long production run
pub const VTK_OUTPUT_KEY: &str = "vtk_output";
/// Solver timeout in seconds
pub const TIMEOUT_KEY: &str = "timeout";

/// Request configuration with named, defaulted accessors
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Configuration(Map<String, Value>);

impl Configuration {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style insert, mostly for tests and clients
    pub fn with(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.0.insert(key.into(), value.into());
        self
    }

    /// Build from an arbitrary JSON value; only objects (or null) are accepted
    pub fn from_value(value: Value) -> EvaluationResult<Self> {
        match value {
            Value::Object(map) => Ok(Self(map)),
            Value::Null => Ok(Self::default()),
            other => Err(EvaluationError::InvalidConfiguration(format!(
                "configuration must be a JSON object, got {}",
                json_type(&other)
            ))),
        }
    }

    pub fn as_map(&self) -> &Map<String, Value> {
        &self.0
    }

    /// Look up an integer option; integral floats such as `1.0` are accepted
    pub fn get_int(&self, key: &str, default: i64) -> EvaluationResult<i64> {
        match self.present(key) {
            None => Ok(default),
            Some(value) => value
                .as_i64()
                .or_else(|| {
                    value
                        .as_f64()
                        .filter(|f| f.fract() == 0.0 && f.abs() < i64::MAX as f64)
                        .map(|f| f as i64)
                })
                .ok_or_else(|| mistyped(key, "an integer", value)),
        }
    }

    pub fn get_bool(&self, key: &str, default: bool) -> EvaluationResult<bool> {
        match self.present(key) {
            None => Ok(default),
            Some(value) => value
                .as_bool()
                .ok_or_else(|| mistyped(key, "a boolean", value)),
        }
    }

    pub fn get_f64(&self, key: &str, default: f64) -> EvaluationResult<f64> {
        match self.present(key) {
            None => Ok(default),
            Some(value) => value
                .as_f64()
                .ok_or_else(|| mistyped(key, "a number", value)),
        }
    }

    /// `level`, default 0
    pub fn level(&self) -> EvaluationResult<i64> {
        self.get_int(LEVEL_KEY, 0)
    }

    /// `verbosity`, default false
    pub fn verbosity(&self) -> EvaluationResult<bool> {
        self.get_bool(VERBOSITY_KEY, false)
    }

    /// `vtk_output`, default false
    pub fn vtk_output(&self) -> EvaluationResult<bool> {
        self.get_bool(VTK_OUTPUT_KEY, false)
    }

    /// `timeout` in seconds; absent means no caller-supplied bound
    pub fn timeout(&self) -> EvaluationResult<Option<Duration>> {
        if self.present(TIMEOUT_KEY).is_none() {
            return Ok(None);
        }
        let seconds = self.get_f64(TIMEOUT_KEY, 0.0)?;
        if !seconds.is_finite() || seconds <= 0.0 {
            return Err(EvaluationError::InvalidConfiguration(format!(
                "'{TIMEOUT_KEY}' must be a positive number of seconds, got {seconds}"
            )));
        }
        Ok(Some(Duration::from_secs_f64(seconds)))
    }

    // JSON null counts as absent
    fn present(&self, key: &str) -> Option<&Value> {
        self.0.get(key).filter(|value| !value.is_null())
    }
}

impl From<Map<String, Value>> for Configuration {
    fn from(map: Map<String, Value>) -> Self {
        Self(map)
    }
}

fn mistyped(key: &str, expected: &str, value: &Value) -> EvaluationError {
    EvaluationError::InvalidConfiguration(format!(
        "'{key}' must be {expected}, got {}",
        json_type(value)
    ))
}

fn json_type(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
