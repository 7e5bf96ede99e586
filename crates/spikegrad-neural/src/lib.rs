// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

//! # spikegrad-neural
//!
//! Stateful spiking neurons for gradient-based SNN training.
//!
//! - [`surrogate`]: surrogate-gradient spike functions (arctangent)
//! - [`neuron`]: neuron base, recurrent-state registry, IF and LIF models
//! - [`execution`]: sequential and block time-step execution
//!
//! ## Example
//!
//! ```rust
//! use spikegrad_neural::{IFNode, NeuronConfig, SpikingNeuron};
//! use spikegrad_tensor::Tensor;
//!
//! let mut node = IFNode::new(NeuronConfig::default()).unwrap();
//! let x_seq = Tensor::full(&[3, 1], 0.6);
//! let spikes = node.forward(&x_seq).unwrap();
//! assert_eq!(spikes.to_vec(), vec![0.0, 1.0, 0.0]);
//! node.reset();
//! ```

/// Crate version from Cargo.toml
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

pub mod error;
pub mod execution;
pub mod neuron;
pub mod surrogate;

pub use error::{NeuralError, Result};
pub use execution::{execute, run_block, run_sequential, ExecutionMode};
pub use neuron::{
    hard_reset, soft_reset, IFNode, LIFNode, LIFParameters, MemoryValue, NeuronBase,
    NeuronConfig, SpikingNeuron, StateRegistry, MEMBRANE_POTENTIAL,
};
pub use surrogate::{atan_backward, heaviside, ATan, AtanSpike, SurrogateFunction};
