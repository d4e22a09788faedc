//! ModelBridge Engine - Drives an external solver for one evaluation at a time
//!
//! The engine owns the evaluation pipeline:
//!
//! ```text
//! validate -> resolve variant -> apply pre-steps -> stage input
//!          -> run solver -> collect output
//! ```
//!
//! ## Components
//!
//! - [`ExchangeChannel`]: file rendezvous with the solver (`inputs.txt` / `outputs.txt`)
//! - [`VariantRegistry`]: data describing how each solver level is launched
//! - [`VariantSelector`]: maps request configuration onto a variant and pre-steps
//! - [`PreStep`]: idempotent file mutations applied before launch
//! - [`SolverRunner`]: runs the selected variant as a subprocess
//! - [`EvaluationEngine`]: orchestrates the above under a single-flight lock

#![deny(unsafe_code)]

pub mod engine;
pub mod exchange;
pub mod prestep;
pub mod registry;
pub mod selector;
pub mod supervisor;

#[cfg(test)]
pub(crate) mod test_support;

pub use engine::{EngineConfig, EvaluationEngine, EvaluationPhase};
pub use exchange::{ExchangeChannel, FileExchange, MemoryExchange, INPUTS_FILE, OUTPUTS_FILE};
pub use prestep::{apply_pre_steps, PreStep, PreStepPolicy, PreStepReport, PreStepStatus};
pub use registry::{LogFilterFiles, RegistryError, TimeHorizon, VariantRegistry, VariantSpec};
pub use selector::{Resolution, VariantSelector};
pub use supervisor::{ExitStatusPolicy, ProcessSupervisor, SolverRunner};
