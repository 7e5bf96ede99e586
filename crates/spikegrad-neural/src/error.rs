// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

//! Error types for neuron construction and simulation

use spikegrad_tensor::TensorError;
use thiserror::Error;

/// Errors raised by surrogate functions, neurons and their state registry
#[derive(Debug, Clone, PartialEq, Error)]
pub enum NeuralError {
    /// Rejected constructor argument
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// A recurrent state name was registered twice
    #[error("Memory '{0}' is already registered")]
    MemoryAlreadyRegistered(String),

    /// Access to a recurrent state name that was never registered
    #[error("Memory '{0}' is not registered")]
    MemoryNotRegistered(String),

    /// A sequence run was given zero time steps
    #[error("Input sequence has no time steps")]
    EmptySequence,

    /// A sequence tensor without a leading time axis
    #[error("Input of shape {0:?} has no leading time axis")]
    MissingTimeAxis(Vec<usize>),

    /// Propagated unchanged from the tensor engine (e.g. shape mismatch)
    #[error(transparent)]
    Tensor(#[from] TensorError),
}

pub type Result<T> = core::result::Result<T, NeuralError>;
