//! UM-Bridge wire bodies
//!
//! JSON shapes of the UM-Bridge HTTP protocol (version 1.0) as far as a
//! forward-only model needs them.

use crate::configuration::Configuration;
use serde::{Deserialize, Serialize};

/// Protocol version advertised on `/Info`
pub const PROTOCOL_VERSION: f64 = 1.0;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InfoResponse {
    pub protocol_version: f64,
    pub models: Vec<String>,
}

/// Body of `/InputSizes` and `/OutputSizes`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SizesRequest {
    pub name: String,
    #[serde(default)]
    pub config: Configuration,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InputSizesResponse {
    pub input_sizes: Vec<usize>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OutputSizesResponse {
    pub output_sizes: Vec<usize>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelInfoRequest {
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelInfoResponse {
    pub support: SupportFlags,
}

/// Operations the model implements
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct SupportFlags {
    pub evaluate: bool,
    pub gradient: bool,
    pub apply_jacobian: bool,
    pub apply_hessian: bool,
}

impl SupportFlags {
    /// Forward evaluation only
    pub fn evaluate_only() -> Self {
        Self {
            evaluate: true,
            gradient: false,
            apply_jacobian: false,
            apply_hessian: false,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EvaluateRequest {
    pub name: String,
    pub input: Vec<Vec<f64>>,
    #[serde(default)]
    pub config: Configuration,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EvaluateResponse {
    pub output: Vec<Vec<f64>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub solver_exit_status: Option<i32>,
}

/// Error envelope: `{"error": {"type": ..., "message": ...}}`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ErrorBody {
    pub error: ErrorDetail,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ErrorDetail {
    #[serde(rename = "type")]
    pub kind: String,
    pub message: String,
}

impl ErrorBody {
    pub fn new(kind: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            error: ErrorDetail {
                kind: kind.into(),
                message: message.into(),
            },
        }
    }
}
