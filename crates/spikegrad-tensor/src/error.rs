// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

//! Error types for tensor operations

use thiserror::Error;

/// Errors raised by tensor arithmetic, shape manipulation and backward passes
#[derive(Debug, Clone, PartialEq, Error)]
pub enum TensorError {
    #[error("Shape mismatch: cannot broadcast {lhs:?} with {rhs:?}")]
    ShapeMismatch { lhs: Vec<usize>, rhs: Vec<usize> },

    #[error("Invalid reshape: {from:?} ({numel} elements) into {to:?}")]
    InvalidReshape {
        from: Vec<usize>,
        to: Vec<usize>,
        numel: usize,
    },

    #[error("Index {index} out of bounds for axis of length {len}")]
    IndexOutOfBounds { index: usize, len: usize },

    #[error("Cannot stack an empty list of tensors")]
    EmptyStack,

    #[error("Gradient shape {actual:?} does not match tensor shape {expected:?}")]
    GradientShapeMismatch {
        expected: Vec<usize>,
        actual: Vec<usize>,
    },

    #[error("Tensor of shape {0:?} is not a single element")]
    NotScalar(Vec<usize>),
}

pub type Result<T> = core::result::Result<T, TensorError>;
