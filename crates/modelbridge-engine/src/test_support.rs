//! Shared fixtures for engine unit tests

use crate::exchange::MemoryExchange;
use crate::registry::{VariantRegistry, VariantSpec};
use async_trait::async_trait;
use modelbridge_types::{EvaluationResult, SolverOutcome, SolverVariant};
use parking_lot::Mutex;
use std::collections::BTreeMap;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tempfile::TempDir;

/// ExaHyPE-style solver tree in a temporary directory
pub struct SolverFixture {
    dir: TempDir,
}

impl SolverFixture {
    pub fn new() -> Self {
        let dir = tempfile::tempdir().unwrap();
        let fixture = Self { dir };
        let registry = fixture.registry();

        for spec in registry.iter() {
            std::fs::create_dir_all(&spec.working_dir).unwrap();
            let filters = &registry.log_filter;
            std::fs::write(spec.working_dir.join(&filters.debug), "debug\n").unwrap();
            std::fs::write(spec.working_dir.join(&filters.release), "release\n").unwrap();
            std::fs::write(spec.working_dir.join(&filters.active), "initial\n").unwrap();
            std::fs::write(
                &spec.config_file,
                "{\n  \"end\": {\n    \"time\": 10000.0,\n    \"repeat\": 0.5\n  }\n}\n",
            )
            .unwrap();
        }
        fixture
    }

    pub fn registry(&self) -> VariantRegistry {
        VariantRegistry::exahype(self.dir.path())
    }

    fn spec(&self, level: SolverVariant) -> VariantSpec {
        self.registry().get(level).cloned().unwrap()
    }

    pub fn config_text(&self, level: SolverVariant) -> String {
        std::fs::read_to_string(self.spec(level).config_file).unwrap()
    }

    pub fn active_filter(&self, level: SolverVariant) -> String {
        let registry = self.registry();
        let spec = self.spec(level);
        std::fs::read_to_string(spec.working_dir.join(&registry.log_filter.active)).unwrap()
    }

    /// Contents of every file the pre-steps may touch
    pub fn snapshot(&self) -> BTreeMap<PathBuf, String> {
        let registry = self.registry();
        let mut files = BTreeMap::new();
        for spec in registry.iter() {
            for path in [
                spec.config_file.clone(),
                spec.working_dir.join(&registry.log_filter.active),
            ] {
                let text = std::fs::read_to_string(&path).unwrap();
                files.insert(path, text);
            }
        }
        files
    }
}

enum StubMode {
    Echo(Arc<MemoryExchange>),
    Fixed(Arc<MemoryExchange>, String),
    Silent,
}

/// Solver stand-in working on a [`MemoryExchange`]
pub struct StubSolver {
    mode: StubMode,
    delay: Option<Duration>,
    exit_code: Option<i32>,
    launched: Mutex<Vec<SolverVariant>>,
    timeouts: Mutex<Vec<Option<Duration>>>,
}

impl StubSolver {
    fn with_mode(mode: StubMode) -> Self {
        Self {
            mode,
            delay: None,
            exit_code: Some(0),
            launched: Mutex::new(Vec::new()),
            timeouts: Mutex::new(Vec::new()),
        }
    }

    /// Copies the staged input to the output
    pub fn echo(exchange: Arc<MemoryExchange>) -> Self {
        Self::with_mode(StubMode::Echo(exchange))
    }

    /// Always publishes `text`
    pub fn fixed_output(exchange: Arc<MemoryExchange>, text: &str) -> Self {
        Self::with_mode(StubMode::Fixed(exchange, text.to_string()))
    }

    /// Publishes nothing
    pub fn silent() -> Self {
        Self::with_mode(StubMode::Silent)
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    pub fn with_exit_code(mut self, exit_code: Option<i32>) -> Self {
        self.exit_code = exit_code;
        self
    }

    pub fn launched(&self) -> Vec<SolverVariant> {
        self.launched.lock().clone()
    }

    pub fn timeouts(&self) -> Vec<Option<Duration>> {
        self.timeouts.lock().clone()
    }
}

#[async_trait]
impl crate::supervisor::SolverRunner for StubSolver {
    async fn run(
        &self,
        spec: &VariantSpec,
        timeout: Option<Duration>,
    ) -> EvaluationResult<SolverOutcome> {
        self.launched.lock().push(spec.level);
        self.timeouts.lock().push(timeout);

        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }

        match &self.mode {
            StubMode::Echo(exchange) => exchange.echo(),
            StubMode::Fixed(exchange, text) => exchange.stage_output_text(text.clone()),
            StubMode::Silent => {}
        }

        Ok(SolverOutcome {
            exit_code: self.exit_code,
            elapsed: self.delay.unwrap_or_default(),
        })
    }
}
