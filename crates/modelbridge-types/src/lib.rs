//! ModelBridge Types - Core types for serving external solvers as models
//!
//! ModelBridge exposes a numerical simulation as a network-reachable model:
//! a client sends an input vector plus a configuration, the service drives an
//! external solver and returns the solver's output vector.
//!
//! ## Key Concepts
//!
//! - **ShapeDescriptor**: Fixed input/output vector sizes of the served model
//! - **Configuration**: Typed view over the free-form request options
//! - **SolverVariant**: One of the closed set of solver levels
//! - **EvaluationError**: Failure taxonomy reported back to callers
//! - **protocol**: UM-Bridge wire bodies

#![deny(unsafe_code)]

pub mod configuration;
pub mod error;
pub mod evaluation;
pub mod protocol;
pub mod shape;
pub mod variant;

pub use configuration::{Configuration, LEVEL_KEY, TIMEOUT_KEY, VERBOSITY_KEY, VTK_OUTPUT_KEY};
pub use error::{EvaluationError, EvaluationResult, FailureKind};
pub use evaluation::{EvaluationOutcome, EvaluationRequest, SolverOutcome};
pub use shape::{ShapeDescriptor, ShapeError};
pub use variant::SolverVariant;
