//! Pre-steps: file mutations applied before a solver launch
//!
//! Every step is idempotent. Applying the same selection twice leaves the
//! files exactly as applying it once, so repeated evaluations with unchanged
//! flags do not drift.

use modelbridge_types::{EvaluationError, EvaluationResult};
use std::fmt;
use std::io;
use std::path::PathBuf;
use tracing::{debug, warn};

/// A single file mutation
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PreStep {
    /// Overwrite `to` with the contents of `from`
    CopyFile { from: PathBuf, to: PathBuf },

    /// Replace every occurrence of `find` in `path` with `replace`
    Substitute {
        path: PathBuf,
        find: String,
        replace: String,
    },
}

/// What to do when a pre-step fails
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PreStepPolicy {
    /// Log and carry on with the launch
    #[default]
    Lenient,

    /// Abort the evaluation with an I/O error
    Strict,
}

/// Result of applying one pre-step
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PreStepStatus {
    /// Files changed
    Applied,
    /// Files already in the requested state
    Unchanged,
    /// Step failed; carries the reason
    Failed(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PreStepReport {
    pub step: PreStep,
    pub status: PreStepStatus,
}

impl PreStep {
    /// Apply the step, reporting whether anything changed
    pub async fn apply(&self) -> io::Result<PreStepStatus> {
        match self {
            PreStep::CopyFile { from, to } => {
                let source = tokio::fs::read(from).await?;
                match tokio::fs::read(to).await {
                    Ok(current) if current == source => return Ok(PreStepStatus::Unchanged),
                    Ok(_) => {}
                    Err(e) if e.kind() == io::ErrorKind::NotFound => {}
                    Err(e) => return Err(e),
                }
                tokio::fs::write(to, source).await?;
                Ok(PreStepStatus::Applied)
            }
            PreStep::Substitute {
                path,
                find,
                replace,
            } => {
                let text = tokio::fs::read_to_string(path).await?;
                if find.is_empty() || !text.contains(find.as_str()) {
                    return Ok(PreStepStatus::Unchanged);
                }
                tokio::fs::write(path, text.replace(find.as_str(), replace)).await?;
                Ok(PreStepStatus::Applied)
            }
        }
    }
}

impl fmt::Display for PreStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PreStep::CopyFile { from, to } => {
                write!(f, "copy {} -> {}", from.display(), to.display())
            }
            PreStep::Substitute {
                path,
                find,
                replace,
            } => write!(f, "substitute '{}' -> '{}' in {}", find, replace, path.display()),
        }
    }
}

/// Apply `steps` in order.
///
/// Under [`PreStepPolicy::Lenient`] a failing step is logged and the rest
/// still run; under [`PreStepPolicy::Strict`] the first failure aborts.
pub async fn apply_pre_steps(
    steps: &[PreStep],
    policy: PreStepPolicy,
) -> EvaluationResult<Vec<PreStepReport>> {
    let mut reports = Vec::with_capacity(steps.len());

    for step in steps {
        let status = match step.apply().await {
            Ok(status) => {
                debug!(step = %step, ?status, "Pre-step done");
                status
            }
            Err(e) => {
                if policy == PreStepPolicy::Strict {
                    return Err(EvaluationError::io(format!("applying pre-step ({step})"), e));
                }
                warn!(step = %step, error = %e, "Pre-step failed, continuing");
                PreStepStatus::Failed(e.to_string())
            }
        };
        reports.push(PreStepReport {
            step: step.clone(),
            status,
        });
    }

    Ok(reports)
}
