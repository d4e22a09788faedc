//! Solver supervision: launch a variant and wait for it

use crate::registry::VariantSpec;
use async_trait::async_trait;
use modelbridge_types::{EvaluationError, EvaluationResult, SolverOutcome};
use serde::{Deserialize, Serialize};
use std::process::Stdio;
use std::time::{Duration, Instant};
use tokio::process::{Child, Command};
use tracing::{info, warn};

/// How a non-zero solver exit code is treated
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExitStatusPolicy {
    /// Log a warning and still collect the output
    #[default]
    Advisory,

    /// Fail the evaluation with `SolverFailed`
    Enforce,
}

/// Runs one solver variant to completion
#[async_trait]
pub trait SolverRunner: Send + Sync {
    /// Launch `spec`, block until it exits or `timeout` elapses
    async fn run(&self, spec: &VariantSpec, timeout: Option<Duration>)
        -> EvaluationResult<SolverOutcome>;
}

/// Production runner spawning the solver as a child process.
///
/// Solver stdout/stderr are inherited so they end up in the service log
/// stream; stdin is closed.
#[derive(Debug, Clone, Default)]
pub struct ProcessSupervisor;

impl ProcessSupervisor {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl SolverRunner for ProcessSupervisor {
    async fn run(
        &self,
        spec: &VariantSpec,
        timeout: Option<Duration>,
    ) -> EvaluationResult<SolverOutcome> {
        let program = spec.resolved_program();
        let mut command = Command::new(&program);
        command
            .args(&spec.args)
            .current_dir(&spec.working_dir)
            .stdin(Stdio::null())
            .kill_on_drop(true);

        // Own process group, so a timeout also reaches helpers the solver forks
        #[cfg(unix)]
        command.process_group(0);

        info!(
            level = spec.level.level(),
            working_dir = %spec.working_dir.display(),
            command = %spec.command_line(),
            "Launching solver"
        );

        let started = Instant::now();
        let mut child = command.spawn().map_err(|e| EvaluationError::SolverLaunch {
            program: program.display().to_string(),
            reason: e.to_string(),
        })?;

        let waited = match timeout {
            Some(limit) => match tokio::time::timeout(limit, child.wait()).await {
                Ok(waited) => waited,
                Err(_) => {
                    warn!(
                        level = spec.level.level(),
                        timeout_secs = limit.as_secs_f64(),
                        "Solver timed out, terminating"
                    );
                    terminate_group(&child);
                    if let Err(e) = child.kill().await {
                        warn!(error = %e, "Failed to terminate timed out solver");
                    }
                    return Err(EvaluationError::Timeout {
                        seconds: limit.as_secs_f64(),
                    });
                }
            },
            None => child.wait().await,
        };

        let status = waited.map_err(|e| EvaluationError::io("waiting for solver", e))?;
        Ok(SolverOutcome {
            exit_code: status.code(),
            elapsed: started.elapsed(),
        })
    }
}

/// SIGKILL the solver's process group; the leader is reaped by the caller
#[cfg(unix)]
fn terminate_group(child: &Child) {
    use nix::sys::signal::{killpg, Signal};
    use nix::unistd::Pid;

    let Some(pid) = child.id() else {
        return;
    };
    match i32::try_from(pid) {
        Ok(pid) => {
            if let Err(e) = killpg(Pid::from_raw(pid), Signal::SIGKILL) {
                warn!(pid, error = %e, "Failed to signal solver process group");
            }
        }
        Err(_) => warn!(pid, "Solver pid out of range, signalling leader only"),
    }
}

#[cfg(not(unix))]
fn terminate_group(_child: &Child) {}
