//! Evaluation engine
//!
//! Drives one evaluation through
//! `Validating -> Preparing -> Staging -> Running -> Collecting -> Done`,
//! failing out of any phase. The exchange files and solver working
//! directories are shared, so the whole pipeline runs under one lock.

use crate::exchange::ExchangeChannel;
use crate::prestep::{apply_pre_steps, PreStepPolicy};
use crate::registry::VariantRegistry;
use crate::selector::VariantSelector;
use crate::supervisor::{ExitStatusPolicy, SolverRunner};
use modelbridge_types::{
    EvaluationError, EvaluationOutcome, EvaluationRequest, EvaluationResult, ShapeDescriptor,
};
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::Mutex;
use tracing::{debug, info, instrument, warn, Instrument};
use uuid::Uuid;

/// Engine behaviour knobs, fixed at startup
#[derive(Debug, Clone, Default)]
pub struct EngineConfig {
    pub pre_step_policy: PreStepPolicy,
    pub exit_status_policy: ExitStatusPolicy,

    /// Solver timeout when the request does not carry one
    pub default_timeout: Option<Duration>,

    /// Artificial pause before each solver launch
    pub test_delay: Option<Duration>,

    /// Remove the previous output before launching the solver
    pub discard_stale_output: bool,
}

/// Pipeline phases, for logs
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EvaluationPhase {
    Validating,
    Preparing,
    Staging,
    Running,
    Collecting,
    Done,
}

impl fmt::Display for EvaluationPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            EvaluationPhase::Validating => "validating",
            EvaluationPhase::Preparing => "preparing",
            EvaluationPhase::Staging => "staging",
            EvaluationPhase::Running => "running",
            EvaluationPhase::Collecting => "collecting",
            EvaluationPhase::Done => "done",
        };
        f.write_str(name)
    }
}

/// Evaluates requests against an external solver, one at a time
pub struct EvaluationEngine {
    core: Arc<EngineCore>,
}

/// State shared with spawned evaluation tasks
struct EngineCore {
    shape: ShapeDescriptor,
    selector: VariantSelector,
    exchange: Arc<dyn ExchangeChannel>,
    runner: Arc<dyn SolverRunner>,
    config: EngineConfig,
    flight: Mutex<()>,
    completed: AtomicU64,
    failed: AtomicU64,
}

impl EvaluationEngine {
    pub fn new(
        shape: ShapeDescriptor,
        registry: Arc<VariantRegistry>,
        exchange: Arc<dyn ExchangeChannel>,
        runner: Arc<dyn SolverRunner>,
        config: EngineConfig,
    ) -> Self {
        Self {
            core: Arc::new(EngineCore {
                shape,
                selector: VariantSelector::new(registry),
                exchange,
                runner,
                config,
                flight: Mutex::new(()),
                completed: AtomicU64::new(0),
                failed: AtomicU64::new(0),
            }),
        }
    }

    pub fn shape(&self) -> &ShapeDescriptor {
        &self.core.shape
    }

    pub fn input_sizes(&self) -> &[usize] {
        self.core.shape.input_sizes()
    }

    pub fn output_sizes(&self) -> &[usize] {
        self.core.shape.output_sizes()
    }

    pub fn config(&self) -> &EngineConfig {
        &self.core.config
    }

    /// Whether an evaluation currently holds the engine
    pub fn is_busy(&self) -> bool {
        self.core.flight.try_lock().is_err()
    }

    pub fn evaluations_completed(&self) -> u64 {
        self.core.completed.load(Ordering::Relaxed)
    }

    pub fn evaluations_failed(&self) -> u64 {
        self.core.failed.load(Ordering::Relaxed)
    }

    /// Evaluate one request.
    ///
    /// Concurrent callers queue on the engine lock; each sees only the output
    /// produced for its own input. The pipeline runs on its own task, so
    /// dropping the returned future (a client disconnect) does not stop it:
    /// the solver runs to completion or to its timeout and the counters
    /// record the result.
    pub async fn evaluate(&self, request: EvaluationRequest) -> EvaluationResult<EvaluationOutcome> {
        let core = self.core.clone();
        let task = tokio::spawn(async move {
            let _guard = core.flight.lock().await;
            let result = core.evaluate_exclusive(request).await;

            match &result {
                Ok(_) => core.completed.fetch_add(1, Ordering::Relaxed),
                Err(_) => core.failed.fetch_add(1, Ordering::Relaxed),
            };
            result
        }
        .in_current_span());

        task.await.map_err(|e| {
            EvaluationError::io("joining evaluation task", std::io::Error::other(e))
        })?
    }
}

impl EngineCore {
    #[instrument(skip_all, fields(evaluation_id = %Uuid::new_v4()))]
    async fn evaluate_exclusive(
        &self,
        request: EvaluationRequest,
    ) -> EvaluationResult<EvaluationOutcome> {
        let started = Instant::now();
        let EvaluationRequest { inputs, config } = request;

        debug!(phase = %EvaluationPhase::Validating, "Evaluation started");
        self.shape
            .validate_inputs(&inputs)
            .map_err(|e| failed(EvaluationPhase::Validating, e))?;
        let resolution = self
            .selector
            .resolve(&config)
            .map_err(|e| failed(EvaluationPhase::Validating, e))?;
        let timeout = config
            .timeout()
            .map_err(|e| failed(EvaluationPhase::Validating, e))?
            .or(self.config.default_timeout);

        debug!(
            phase = %EvaluationPhase::Preparing,
            variant = %resolution.variant,
            steps = resolution.pre_steps.len(),
            "Applying pre-steps"
        );
        apply_pre_steps(&resolution.pre_steps, self.config.pre_step_policy)
            .await
            .map_err(|e| failed(EvaluationPhase::Preparing, e))?;

        debug!(phase = %EvaluationPhase::Staging, channel = %self.exchange.describe(), "Staging input");
        if self.config.discard_stale_output {
            self.exchange
                .discard_output()
                .await
                .map_err(|e| failed(EvaluationPhase::Staging, e))?;
        }
        let flat: Vec<f64> = inputs.into_iter().flatten().collect();
        self.exchange
            .write_input(&flat)
            .await
            .map_err(|e| failed(EvaluationPhase::Staging, e))?;

        if let Some(delay) = self.config.test_delay {
            debug!(delay_ms = delay.as_millis() as u64, "Applying test delay");
            tokio::time::sleep(delay).await;
        }

        debug!(phase = %EvaluationPhase::Running, variant = %resolution.variant, "Running solver");
        let outcome = self
            .runner
            .run(&resolution.spec, timeout)
            .await
            .map_err(|e| failed(EvaluationPhase::Running, e))?;

        if !outcome.success() {
            match self.config.exit_status_policy {
                ExitStatusPolicy::Advisory => warn!(
                    exit_code = ?outcome.exit_code,
                    variant = %resolution.variant,
                    "Solver exited unsuccessfully, reading outputs anyway"
                ),
                ExitStatusPolicy::Enforce => {
                    return Err(failed(
                        EvaluationPhase::Running,
                        EvaluationError::SolverFailed {
                            exit_code: outcome.exit_code,
                        },
                    ));
                }
            }
        }

        debug!(phase = %EvaluationPhase::Collecting, "Reading outputs");
        let flat = self
            .exchange
            .read_output(self.shape.total_output_len())
            .await
            .map_err(|e| failed(EvaluationPhase::Collecting, e))?;
        let outputs = self.shape.split_outputs(flat);

        let elapsed = started.elapsed();
        info!(
            phase = %EvaluationPhase::Done,
            variant = %resolution.variant,
            exit_code = ?outcome.exit_code,
            solver_ms = outcome.elapsed.as_millis() as u64,
            elapsed_ms = elapsed.as_millis() as u64,
            "Evaluation finished"
        );

        Ok(EvaluationOutcome {
            outputs,
            variant: resolution.variant,
            exit_code: outcome.exit_code,
            elapsed,
        })
    }
}

fn failed(phase: EvaluationPhase, error: EvaluationError) -> EvaluationError {
    warn!(%phase, kind = ?error.kind(), error = %error, "Evaluation failed");
    error
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::exchange::MemoryExchange;
    use crate::test_support::{SolverFixture, StubSolver};
    use modelbridge_types::{Configuration, SolverVariant};

    fn engine_with(
        fixture: &SolverFixture,
        exchange: Arc<MemoryExchange>,
        solver: Arc<StubSolver>,
        config: EngineConfig,
        shape: ShapeDescriptor,
    ) -> EvaluationEngine {
        EvaluationEngine::new(
            shape,
            Arc::new(fixture.registry()),
            exchange,
            solver,
            config,
        )
    }

    fn echo_engine(fixture: &SolverFixture) -> (EvaluationEngine, Arc<MemoryExchange>, Arc<StubSolver>) {
        let exchange = Arc::new(MemoryExchange::new());
        let solver = Arc::new(StubSolver::echo(exchange.clone()));
        let engine = engine_with(
            fixture,
            exchange.clone(),
            solver.clone(),
            EngineConfig::default(),
            ShapeDescriptor::new(vec![2], vec![2]).unwrap(),
        );
        (engine, exchange, solver)
    }

    #[tokio::test]
    async fn test_echo_evaluation() {
        let fixture = SolverFixture::new();
        let (engine, _, solver) = echo_engine(&fixture);

        let outcome = engine
            .evaluate(EvaluationRequest::single(
                vec![0.1, 1.0 / 3.0],
                Configuration::new().with("level", 1),
            ))
            .await
            .unwrap();

        assert_eq!(outcome.outputs, vec![vec![0.1, 1.0 / 3.0]]);
        assert_eq!(outcome.variant, SolverVariant::Level1);
        assert_eq!(outcome.exit_code, Some(0));
        assert_eq!(solver.launched(), vec![SolverVariant::Level1]);
        assert_eq!(engine.evaluations_completed(), 1);
        assert!(!engine.is_busy());
    }

    #[tokio::test]
    async fn test_invalid_level_touches_nothing() {
        let fixture = SolverFixture::new();
        let (engine, exchange, solver) = echo_engine(&fixture);
        let before = fixture.snapshot();

        let err = engine
            .evaluate(EvaluationRequest::single(
                vec![1.0, 2.0],
                Configuration::new().with("level", 3).with("vtk_output", true),
            ))
            .await
            .unwrap_err();

        assert!(matches!(err, EvaluationError::InvalidConfiguration(_)));
        assert!(solver.launched().is_empty());
        assert!(exchange.input_text().is_none());
        assert_eq!(fixture.snapshot(), before);
        assert_eq!(engine.evaluations_failed(), 1);
    }

    #[tokio::test]
    async fn test_shape_mismatch_rejected_before_launch() {
        let fixture = SolverFixture::new();
        let (engine, exchange, solver) = echo_engine(&fixture);

        let err = engine
            .evaluate(EvaluationRequest::single(vec![1.0], Configuration::new()))
            .await
            .unwrap_err();

        assert!(matches!(err, EvaluationError::ShapeMismatch { .. }));
        assert!(solver.launched().is_empty());
        assert!(exchange.input_text().is_none());
    }

    #[tokio::test]
    async fn test_short_output_is_malformed() {
        let fixture = SolverFixture::new();
        let exchange = Arc::new(MemoryExchange::new());
        let solver = Arc::new(StubSolver::fixed_output(exchange.clone(), "1.0 2.0"));
        let engine = engine_with(
            &fixture,
            exchange,
            solver,
            EngineConfig::default(),
            ShapeDescriptor::new(vec![2], vec![4]).unwrap(),
        );

        let err = engine
            .evaluate(EvaluationRequest::single(vec![0.0, 0.0], Configuration::new()))
            .await
            .unwrap_err();
        assert!(matches!(err, EvaluationError::MalformedOutput(_)));
    }

    #[tokio::test]
    async fn test_pre_steps_applied_and_idempotent() {
        let fixture = SolverFixture::new();
        let (engine, _, _) = echo_engine(&fixture);
        let request = || {
            EvaluationRequest::single(
                vec![1.0, 2.0],
                Configuration::new()
                    .with("vtk_output", true)
                    .with("verbosity", true),
            )
        };

        engine.evaluate(request()).await.unwrap();
        let once = fixture.snapshot();
        engine.evaluate(request()).await.unwrap();
        assert_eq!(fixture.snapshot(), once);

        for level in SolverVariant::ALL {
            assert!(fixture.config_text(level).contains(r#""time": 1.0,"#));
            assert_eq!(fixture.active_filter(level), "debug\n");
        }

        engine
            .evaluate(EvaluationRequest::single(vec![1.0, 2.0], Configuration::new()))
            .await
            .unwrap();
        for level in SolverVariant::ALL {
            assert!(fixture.config_text(level).contains(r#""time": 10000.0,"#));
            assert_eq!(fixture.active_filter(level), "release\n");
        }
    }

    #[tokio::test]
    async fn test_nonzero_exit_is_advisory_by_default() {
        let fixture = SolverFixture::new();
        let exchange = Arc::new(MemoryExchange::new());
        let solver = Arc::new(StubSolver::echo(exchange.clone()).with_exit_code(Some(3)));
        let engine = engine_with(
            &fixture,
            exchange,
            solver,
            EngineConfig::default(),
            ShapeDescriptor::new(vec![2], vec![2]).unwrap(),
        );

        let outcome = engine
            .evaluate(EvaluationRequest::single(vec![5.0, 6.0], Configuration::new()))
            .await
            .unwrap();
        assert_eq!(outcome.exit_code, Some(3));
        assert_eq!(outcome.outputs, vec![vec![5.0, 6.0]]);
    }

    #[tokio::test]
    async fn test_nonzero_exit_enforced() {
        let fixture = SolverFixture::new();
        let exchange = Arc::new(MemoryExchange::new());
        let solver = Arc::new(StubSolver::echo(exchange.clone()).with_exit_code(None));
        let engine = engine_with(
            &fixture,
            exchange,
            solver,
            EngineConfig {
                exit_status_policy: ExitStatusPolicy::Enforce,
                ..EngineConfig::default()
            },
            ShapeDescriptor::new(vec![2], vec![2]).unwrap(),
        );

        let err = engine
            .evaluate(EvaluationRequest::single(vec![5.0, 6.0], Configuration::new()))
            .await
            .unwrap_err();
        assert!(matches!(err, EvaluationError::SolverFailed { exit_code: None }));
    }

    #[tokio::test]
    async fn test_stale_output_discarded() {
        let fixture = SolverFixture::new();
        let exchange = Arc::new(MemoryExchange::new());
        exchange.stage_output(&[9.0, 9.0]);
        let solver = Arc::new(StubSolver::silent());
        let engine = engine_with(
            &fixture,
            exchange.clone(),
            solver,
            EngineConfig {
                discard_stale_output: true,
                ..EngineConfig::default()
            },
            ShapeDescriptor::new(vec![2], vec![2]).unwrap(),
        );

        let err = engine
            .evaluate(EvaluationRequest::single(vec![1.0, 2.0], Configuration::new()))
            .await
            .unwrap_err();
        assert!(matches!(err, EvaluationError::MalformedOutput(_)));
    }

    #[tokio::test]
    async fn test_request_timeout_overrides_default() {
        let fixture = SolverFixture::new();
        let exchange = Arc::new(MemoryExchange::new());
        let solver = Arc::new(StubSolver::echo(exchange.clone()));
        let engine = engine_with(
            &fixture,
            exchange,
            solver.clone(),
            EngineConfig {
                default_timeout: Some(Duration::from_secs(60)),
                ..EngineConfig::default()
            },
            ShapeDescriptor::new(vec![2], vec![2]).unwrap(),
        );

        engine
            .evaluate(EvaluationRequest::single(vec![1.0, 2.0], Configuration::new()))
            .await
            .unwrap();
        engine
            .evaluate(EvaluationRequest::single(
                vec![1.0, 2.0],
                Configuration::new().with("timeout", 1.5),
            ))
            .await
            .unwrap();

        assert_eq!(
            solver.timeouts(),
            vec![Some(Duration::from_secs(60)), Some(Duration::from_millis(1500))]
        );
    }

    #[tokio::test]
    async fn test_concurrent_evaluations_do_not_interleave() {
        let fixture = SolverFixture::new();
        let exchange = Arc::new(MemoryExchange::new());
        let solver = Arc::new(
            StubSolver::echo(exchange.clone()).with_delay(Duration::from_millis(50)),
        );
        let engine = Arc::new(engine_with(
            &fixture,
            exchange,
            solver,
            EngineConfig::default(),
            ShapeDescriptor::new(vec![1], vec![1]).unwrap(),
        ));

        let a = {
            let engine = engine.clone();
            tokio::spawn(async move {
                engine
                    .evaluate(EvaluationRequest::single(vec![1.0], Configuration::new()))
                    .await
            })
        };
        let b = {
            let engine = engine.clone();
            tokio::spawn(async move {
                engine
                    .evaluate(EvaluationRequest::single(vec![2.0], Configuration::new()))
                    .await
            })
        };

        let (a, b) = (a.await.unwrap().unwrap(), b.await.unwrap().unwrap());
        assert_eq!(a.outputs, vec![vec![1.0]]);
        assert_eq!(b.outputs, vec![vec![2.0]]);
        assert_eq!(engine.evaluations_completed(), 2);
    }

    #[tokio::test]
    async fn test_dropped_caller_does_not_cancel_evaluation() {
        let fixture = SolverFixture::new();
        let exchange = Arc::new(MemoryExchange::new());
        let solver = Arc::new(
            StubSolver::echo(exchange.clone()).with_delay(Duration::from_millis(200)),
        );
        let engine = engine_with(
            &fixture,
            exchange.clone(),
            solver.clone(),
            EngineConfig::default(),
            ShapeDescriptor::new(vec![2], vec![2]).unwrap(),
        );

        let abandoned = tokio::time::timeout(
            Duration::from_millis(50),
            engine.evaluate(EvaluationRequest::single(vec![4.0, 5.0], Configuration::new())),
        )
        .await;
        assert!(abandoned.is_err());
        assert!(engine.is_busy());

        tokio::time::sleep(Duration::from_millis(400)).await;
        assert!(!engine.is_busy());
        assert_eq!(solver.launched(), vec![SolverVariant::Level0]);
        assert_eq!(exchange.staged_input(), Some(vec![4.0, 5.0]));
        assert_eq!(engine.evaluations_completed(), 1);
        assert_eq!(engine.evaluations_failed(), 0);

        // The next caller runs normally once the abandoned run finished
        let outcome = engine
            .evaluate(EvaluationRequest::single(vec![6.0, 7.0], Configuration::new()))
            .await
            .unwrap();
        assert_eq!(outcome.outputs, vec![vec![6.0, 7.0]]);
        assert_eq!(engine.evaluations_completed(), 2);
    }

    #[tokio::test]
    async fn test_multiple_vectors_are_concatenated_and_split() {
        let fixture = SolverFixture::new();
        let exchange = Arc::new(MemoryExchange::new());
        let solver = Arc::new(StubSolver::echo(exchange.clone()));
        let engine = engine_with(
            &fixture,
            exchange.clone(),
            solver,
            EngineConfig::default(),
            ShapeDescriptor::new(vec![1, 2], vec![2, 1]).unwrap(),
        );

        let outcome = engine
            .evaluate(EvaluationRequest::new(
                vec![vec![1.0], vec![2.0, 3.0]],
                Configuration::new(),
            ))
            .await
            .unwrap();
        assert_eq!(exchange.staged_input(), Some(vec![1.0, 2.0, 3.0]));
        assert_eq!(outcome.outputs, vec![vec![1.0, 2.0], vec![3.0]]);
    }
}
