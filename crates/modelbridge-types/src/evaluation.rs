//! Evaluation request and result types

use crate::configuration::Configuration;
use crate::variant::SolverVariant;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// One evaluation: input vectors plus request configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EvaluationRequest {
    pub inputs: Vec<Vec<f64>>,
    #[serde(default)]
    pub config: Configuration,
}

impl EvaluationRequest {
    pub fn new(inputs: Vec<Vec<f64>>, config: Configuration) -> Self {
        Self { inputs, config }
    }

    /// Request with a single input vector, the common case
    pub fn single(input: Vec<f64>, config: Configuration) -> Self {
        Self::new(vec![input], config)
    }
}

/// How a solver subprocess terminated
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SolverOutcome {
    /// Exit code; `None` when the process was ended by a signal
    pub exit_code: Option<i32>,
    pub elapsed: Duration,
}

impl SolverOutcome {
    pub fn success(&self) -> bool {
        self.exit_code == Some(0)
    }
}

/// Result of a completed evaluation
#[derive(Debug, Clone, PartialEq)]
pub struct EvaluationOutcome {
    /// Output vectors, sized by the model's output sizes
    pub outputs: Vec<Vec<f64>>,

    /// Variant that produced the outputs
    pub variant: SolverVariant,

    /// Raw solver exit code, kept so callers can spot output from a failed run
    pub exit_code: Option<i32>,

    /// Wall time of the whole evaluation
    pub elapsed: Duration,
}
