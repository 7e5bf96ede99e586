// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

//! # spikegrad - Surrogate-Gradient Spiking Neurons
//!
//! spikegrad simulates stateful spiking neurons whose non-differentiable
//! spike is trained with a smooth surrogate gradient. The forward pass emits
//! exact binary spikes; the backward pass substitutes the derivative of a
//! smooth primitive.
//!
//! ## Quick Start
//!
//! ```toml
//! [dependencies]
//! spikegrad = "0.1"
//! ```
//!
//! ```rust
//! use spikegrad::prelude::*;
//!
//! let mut node = LIFNode::new(NeuronConfig::default(), LIFParameters::default())?;
//!
//! // [T, batch] input with gradient tracking
//! let x_seq = Tensor::full(&[8, 4], 0.9).requires_grad_(true);
//! let spikes = node.forward(&x_seq)?;
//! spikes.sum().backward()?;
//! assert!(x_seq.grad().is_some());
//!
//! // Independent sequences need a fresh state
//! node.reset();
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────┐
//! │  Foundation: spikegrad-tensor                           │
//! │  (Tensor, reverse-mode autodiff, CustomFunction)        │
//! └─────────────────────────────────────────────────────────┘
//!                         ↓
//! ┌─────────────────────────────────────────────────────────┐
//! │  Neural: spikegrad-neural                               │
//! │  (ATan surrogate, NeuronBase, IF/LIF, execution modes)  │
//! └─────────────────────────────────────────────────────────┘
//!                         ↓
//! ┌─────────────────────────────────────────────────────────┐
//! │  Infrastructure: spikegrad-config, -observability       │
//! │  (TOML settings + overrides, tracing setup)             │
//! └─────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Feature Flags
//!
//! - **`file-logging`**: per-run JSON log files for the `simulate` tool
//!
//! ## License
//!
//! Apache-2.0

pub use spikegrad_config as config;
pub use spikegrad_neural as neural;
pub use spikegrad_observability as observability;
pub use spikegrad_tensor as tensor;

/// Prelude - commonly used types and traits
pub mod prelude {
    pub use crate::config::{load_config_or_default, SpikegradConfig};
    pub use crate::neural::{
        ATan, ExecutionMode, IFNode, LIFNode, LIFParameters, MemoryValue, NeuralError,
        NeuronBase, NeuronConfig, SpikingNeuron, SurrogateFunction,
    };
    pub use crate::tensor::{CustomFunction, Tensor, TensorError};
}
