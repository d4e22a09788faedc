//! Exchange channel between the engine and the solver
//!
//! The solver reads its parameters from `inputs.txt` and leaves its results in
//! `outputs.txt`, both inside a shared directory fixed at startup. Values are
//! written one per line in scientific notation with 17 significant digits, so
//! every finite `f64` survives the trip exactly.

use async_trait::async_trait;
use modelbridge_types::{EvaluationError, EvaluationResult};
use parking_lot::RwLock;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

/// Input file name inside the shared directory
pub const INPUTS_FILE: &str = "inputs.txt";

/// Output file name inside the shared directory
pub const OUTPUTS_FILE: &str = "outputs.txt";

/// Rendezvous point with the solver.
///
/// A channel holds no per-request state; the engine's single-flight lock
/// guarantees at most one evaluation uses it at a time.
#[async_trait]
pub trait ExchangeChannel: Send + Sync {
    /// Replace the staged input with `values`; complete before returning
    async fn write_input(&self, values: &[f64]) -> EvaluationResult<()>;

    /// Parse exactly `expected_len` values from the solver's output
    async fn read_output(&self, expected_len: usize) -> EvaluationResult<Vec<f64>>;

    /// Drop any output left over from a previous run
    async fn discard_output(&self) -> EvaluationResult<()>;

    /// Human-readable location, for logs
    fn describe(&self) -> String;
}

/// Production channel backed by files in the shared directory
#[derive(Debug, Clone)]
pub struct FileExchange {
    dir: PathBuf,
}

impl FileExchange {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn input_path(&self) -> PathBuf {
        self.dir.join(INPUTS_FILE)
    }

    pub fn output_path(&self) -> PathBuf {
        self.dir.join(OUTPUTS_FILE)
    }
}

#[async_trait]
impl ExchangeChannel for FileExchange {
    async fn write_input(&self, values: &[f64]) -> EvaluationResult<()> {
        let path = self.input_path();
        // tokio::fs::write truncates and returns once the file is closed
        tokio::fs::write(&path, format_values(values))
            .await
            .map_err(|e| EvaluationError::io(format!("writing {}", path.display()), e))
    }

    async fn read_output(&self, expected_len: usize) -> EvaluationResult<Vec<f64>> {
        let path = self.output_path();
        let text = tokio::fs::read_to_string(&path).await.map_err(|e| {
            if e.kind() == ErrorKind::NotFound {
                EvaluationError::MalformedOutput(format!("{} does not exist", path.display()))
            } else {
                EvaluationError::MalformedOutput(format!(
                    "cannot read {}: {}",
                    path.display(),
                    e
                ))
            }
        })?;
        parse_values(&text, expected_len)
    }

    async fn discard_output(&self) -> EvaluationResult<()> {
        let path = self.output_path();
        match tokio::fs::remove_file(&path).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(e) => Err(EvaluationError::io(
                format!("removing stale {}", path.display()),
                e,
            )),
        }
    }

    fn describe(&self) -> String {
        self.dir.display().to_string()
    }
}

/// In-memory channel for tests and stub solvers.
///
/// Keeps the serialized text rather than the numbers so the same format and
/// parse path as the file channel is exercised.
#[derive(Debug, Default)]
pub struct MemoryExchange {
    input: RwLock<Option<String>>,
    output: RwLock<Option<String>>,
}

impl MemoryExchange {
    pub fn new() -> Self {
        Self::default()
    }

    /// Text last written by the engine, if any
    pub fn input_text(&self) -> Option<String> {
        self.input.read().clone()
    }

    /// Values last written by the engine, if any
    pub fn staged_input(&self) -> Option<Vec<f64>> {
        let text = self.input.read().clone()?;
        let count = text.split_whitespace().count();
        parse_values(&text, count).ok()
    }

    /// Publish solver output as raw text
    pub fn stage_output_text(&self, text: impl Into<String>) {
        *self.output.write() = Some(text.into());
    }

    /// Publish solver output values
    pub fn stage_output(&self, values: &[f64]) {
        self.stage_output_text(format_values(values));
    }

    /// Copy the staged input to the output, like an identity solver
    pub fn echo(&self) {
        let input = self.input.read().clone();
        *self.output.write() = input;
    }
}

#[async_trait]
impl ExchangeChannel for MemoryExchange {
    async fn write_input(&self, values: &[f64]) -> EvaluationResult<()> {
        *self.input.write() = Some(format_values(values));
        Ok(())
    }

    async fn read_output(&self, expected_len: usize) -> EvaluationResult<Vec<f64>> {
        let text = self.output.read().clone().ok_or_else(|| {
            EvaluationError::MalformedOutput("no output has been staged".to_string())
        })?;
        parse_values(&text, expected_len)
    }

    async fn discard_output(&self) -> EvaluationResult<()> {
        *self.output.write() = None;
        Ok(())
    }

    fn describe(&self) -> String {
        "memory".to_string()
    }
}

/// Serialize values one per line with `f64::DIGITS + 2` significant digits
pub fn format_values(values: &[f64]) -> String {
    let mut out = String::with_capacity(values.len() * 24);
    for value in values {
        out.push_str(&format!("{:.16e}\n", value));
    }
    out
}

/// Parse the first `expected_len` whitespace-separated numbers from `text`.
///
/// Trailing tokens beyond `expected_len` are ignored.
pub fn parse_values(text: &str, expected_len: usize) -> EvaluationResult<Vec<f64>> {
    let mut values = Vec::with_capacity(expected_len);
    for (index, token) in text.split_whitespace().take(expected_len).enumerate() {
        let value = token.parse::<f64>().map_err(|_| {
            EvaluationError::MalformedOutput(format!(
                "token {index} ('{token}') is not a number"
            ))
        })?;
        values.push(value);
    }

    if values.len() < expected_len {
        return Err(EvaluationError::MalformedOutput(format!(
            "expected {expected_len} values, found {}",
            values.len()
        )));
    }
    Ok(values)
}
