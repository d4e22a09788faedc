//! Solver variants
//!
//! The service runs one of a closed set of solver builds, one per
//! discretization level. Each level is bound to a working directory and
//! command line by the engine's variant registry.

use crate::error::EvaluationError;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Closed set of solver variants
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "i64", into = "i64")]
pub enum SolverVariant {
    Level0,
    Level1,
    Level2,
}

impl SolverVariant {
    /// Every variant, in level order
    pub const ALL: [SolverVariant; 3] = [
        SolverVariant::Level0,
        SolverVariant::Level1,
        SolverVariant::Level2,
    ];

    pub fn level(self) -> u8 {
        match self {
            SolverVariant::Level0 => 0,
            SolverVariant::Level1 => 1,
            SolverVariant::Level2 => 2,
        }
    }
}

impl TryFrom<i64> for SolverVariant {
    type Error = EvaluationError;

    fn try_from(level: i64) -> Result<Self, Self::Error> {
        match level {
            0 => Ok(SolverVariant::Level0),
            1 => Ok(SolverVariant::Level1),
            2 => Ok(SolverVariant::Level2),
            other => Err(EvaluationError::InvalidConfiguration(format!(
                "unknown level {other}, expected one of 0, 1, 2"
            ))),
        }
    }
}

impl From<SolverVariant> for i64 {
    fn from(variant: SolverVariant) -> Self {
        i64::from(variant.level())
    }
}

impl fmt::Display for SolverVariant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "level {}", self.level())
    }
}
