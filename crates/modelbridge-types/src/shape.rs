//! Model shape: the fixed sizes of the input and output vectors

use crate::error::{EvaluationError, EvaluationResult};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Reasons a shape cannot be constructed
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ShapeError {
    #[error("{0} sizes must name at least one vector")]
    Empty(&'static str),

    #[error("{side} size at position {index} must be positive")]
    ZeroSize { side: &'static str, index: usize },
}

/// Declared dimensionality of the model's inputs and outputs.
///
/// Fixed at construction; the transport uses it to reject malformed requests
/// before they reach the engine and to size the output buffers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "RawShape", into = "RawShape")]
pub struct ShapeDescriptor {
    input_sizes: Vec<usize>,
    output_sizes: Vec<usize>,
}

#[derive(Serialize, Deserialize)]
struct RawShape {
    input_sizes: Vec<usize>,
    output_sizes: Vec<usize>,
}

impl TryFrom<RawShape> for ShapeDescriptor {
    type Error = ShapeError;

    fn try_from(raw: RawShape) -> Result<Self, Self::Error> {
        Self::new(raw.input_sizes, raw.output_sizes)
    }
}

impl From<ShapeDescriptor> for RawShape {
    fn from(shape: ShapeDescriptor) -> Self {
        Self {
            input_sizes: shape.input_sizes,
            output_sizes: shape.output_sizes,
        }
    }
}

impl ShapeDescriptor {
    /// Create a shape, rejecting empty size lists and zero-length vectors
    pub fn new(input_sizes: Vec<usize>, output_sizes: Vec<usize>) -> Result<Self, ShapeError> {
        check_sizes("input", &input_sizes)?;
        check_sizes("output", &output_sizes)?;
        Ok(Self {
            input_sizes,
            output_sizes,
        })
    }

    pub fn input_sizes(&self) -> &[usize] {
        &self.input_sizes
    }

    pub fn output_sizes(&self) -> &[usize] {
        &self.output_sizes
    }

    /// Number of scalars across all input vectors
    pub fn total_input_len(&self) -> usize {
        self.input_sizes.iter().sum()
    }

    /// Number of scalars across all output vectors
    pub fn total_output_len(&self) -> usize {
        self.output_sizes.iter().sum()
    }

    /// Check that the supplied vectors match the declared input sizes
    pub fn validate_inputs(&self, inputs: &[Vec<f64>]) -> EvaluationResult<()> {
        let matches = inputs.len() == self.input_sizes.len()
            && inputs
                .iter()
                .zip(&self.input_sizes)
                .all(|(vector, &size)| vector.len() == size);

        if matches {
            Ok(())
        } else {
            Err(EvaluationError::ShapeMismatch {
                expected: self.input_sizes.clone(),
                actual: inputs.iter().map(Vec::len).collect(),
            })
        }
    }

    /// Split a flat output sequence into vectors following the output sizes.
    ///
    /// The caller guarantees `flat.len() == self.total_output_len()`.
    pub fn split_outputs(&self, flat: Vec<f64>) -> Vec<Vec<f64>> {
        let mut rest = flat.into_iter();
        self.output_sizes
            .iter()
            .map(|&size| rest.by_ref().take(size).collect())
            .collect()
    }
}

fn check_sizes(side: &'static str, sizes: &[usize]) -> Result<(), ShapeError> {
    if sizes.is_empty() {
        return Err(ShapeError::Empty(side));
    }
    match sizes.iter().position(|&size| size == 0) {
        Some(index) => Err(ShapeError::ZeroSize { side, index }),
        None => Ok(()),
    }
}
