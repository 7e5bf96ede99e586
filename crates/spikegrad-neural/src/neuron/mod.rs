// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

//! # Spiking Neuron Architecture
//!
//! [`NeuronBase`] carries the shared state (threshold, reset rule,
//! surrogate, recurrent-state registry) and [`SpikingNeuron`] supplies the
//! per-step cycle on top of it.
//!
//! ## Adding a New Neuron Model
//!
//! 1. Create `src/neuron/your_model.rs` holding a `NeuronBase`
//! 2. Implement `SpikingNeuron` (only `neuronal_charge` is model specific)
//! 3. Register extra recurrent state through `base_mut().memories_mut()`
//! 4. Add tests
//! 5. Export in `mod.rs`

pub mod base;
pub mod if_node;
pub mod lif;
pub mod memory;
pub mod traits;

pub use base::{hard_reset, soft_reset, NeuronBase, NeuronConfig, MEMBRANE_POTENTIAL};
pub use if_node::IFNode;
pub use lif::{LIFNode, LIFParameters};
pub use memory::{MemoryValue, StateRegistry};
pub use traits::SpikingNeuron;
