//! Evaluation failure taxonomy
//!
//! Every variant is recoverable at the request boundary: the transport turns
//! it into a structured error response and keeps serving.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors raised while evaluating a single request
#[derive(Debug, Error)]
pub enum EvaluationError {
    /// Supplied vectors do not match the model's input sizes
    #[error("shape mismatch: expected input sizes {expected:?}, got {actual:?}")]
    ShapeMismatch {
        expected: Vec<usize>,
        actual: Vec<usize>,
    },

    /// Request configuration names an unknown variant or carries a mistyped option
    #[error("invalid configuration: {0}")]
    InvalidConfiguration(String),

    /// Staging input or applying a pre-step failed
    #[error("I/O error while {context}: {source}")]
    Io {
        context: String,
        #[source]
        source: std::io::Error,
    },

    /// Solver executable missing or not runnable
    #[error("failed to launch solver '{program}': {reason}")]
    SolverLaunch { program: String, reason: String },

    /// Output file missing, short, or unparsable
    #[error("malformed solver output: {0}")]
    MalformedOutput(String),

    /// Solver exceeded the allotted run time and was terminated
    #[error("solver timed out after {seconds:.3}s")]
    Timeout { seconds: f64 },

    /// Solver exited unsuccessfully while exit codes are enforced
    #[error("solver exited unsuccessfully (exit code {exit_code:?})")]
    SolverFailed { exit_code: Option<i32> },
}

impl EvaluationError {
    pub fn io(context: impl Into<String>, source: std::io::Error) -> Self {
        EvaluationError::Io {
            context: context.into(),
            source,
        }
    }

    /// Coarse classification, used for counters and transport mapping
    pub fn kind(&self) -> FailureKind {
        match self {
            EvaluationError::ShapeMismatch { .. } => FailureKind::ShapeMismatch,
            EvaluationError::InvalidConfiguration(_) => FailureKind::InvalidConfiguration,
            EvaluationError::Io { .. } => FailureKind::Io,
            EvaluationError::SolverLaunch { .. } => FailureKind::SolverLaunch,
            EvaluationError::MalformedOutput(_) => FailureKind::MalformedOutput,
            EvaluationError::Timeout { .. } => FailureKind::Timeout,
            EvaluationError::SolverFailed { .. } => FailureKind::SolverFailed,
        }
    }

    /// Whether the caller, rather than the solver or host, is at fault
    pub fn is_client_error(&self) -> bool {
        self.kind().is_client_error()
    }
}

/// Fieldless mirror of [`EvaluationError`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureKind {
    ShapeMismatch,
    InvalidConfiguration,
    Io,
    SolverLaunch,
    MalformedOutput,
    Timeout,
    SolverFailed,
}

impl FailureKind {
    pub fn is_client_error(self) -> bool {
        matches!(
            self,
            FailureKind::ShapeMismatch | FailureKind::InvalidConfiguration
        )
    }
}

/// Result type alias for evaluation operations
pub type EvaluationResult<T> = Result<T, EvaluationError>;
