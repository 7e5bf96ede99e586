// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

//! # Spiking Neuron Trait
//!
//! A model supplies its charge law; everything else (fire, reset, the
//! per-step driver, sequence execution and state lifecycle) comes from
//! default methods over [`NeuronBase`].

use spikegrad_tensor::Tensor;
use tracing::debug;

use super::base::NeuronBase;
use crate::error::Result;
use crate::execution;

/// Trait for stateful spiking neurons trained with surrogate gradients
///
/// State persists across calls. Call [`reset`](SpikingNeuron::reset)
/// between independent sequences.
pub trait SpikingNeuron {
    fn base(&self) -> &NeuronBase;

    fn base_mut(&mut self) -> &mut NeuronBase;

    /// Get model name (for debugging/logging)
    fn model_name(&self) -> &'static str;

    /// One-line summary of the node and its settings
    fn describe(&self) -> String {
        self.base().to_string()
    }

    /// Integrate input `x` into the membrane potential
    ///
    /// Runs after `v` has been materialized to the shape of `x`.
    fn neuronal_charge(&mut self, x: &Tensor) -> Result<()>;

    fn neuronal_fire(&self) -> Result<Tensor> {
        self.base().fire()
    }

    fn neuronal_reset(&mut self, spike: &Tensor) -> Result<()> {
        self.base_mut().reset_membrane(spike)
    }

    /// Advance one time step and return the spike tensor
    fn single_step(&mut self, x: &Tensor) -> Result<Tensor> {
        self.base_mut().materialize_v(x)?;
        self.neuronal_charge(x)?;
        let spike = self.neuronal_fire()?;
        self.neuronal_reset(&spike)?;
        Ok(spike)
    }

    /// Step through `inputs` in order, one spike tensor per step
    fn run_sequence(&mut self, inputs: &[Tensor]) -> Result<Vec<Tensor>> {
        execution::run_sequential(self, inputs)
    }

    /// Run a `[T, ...]` tensor and return the stacked `[T, ...]` spikes
    fn multi_step(&mut self, x_seq: &Tensor) -> Result<Tensor> {
        execution::run_block(self, x_seq)
    }

    /// `multi_step` when time-batched, otherwise `single_step`
    fn forward(&mut self, x: &Tensor) -> Result<Tensor> {
        if self.base().time_batched() {
            self.multi_step(x)
        } else {
            self.single_step(x)
        }
    }

    /// Return every recurrent state to its reset value
    fn reset(&mut self) {
        debug!(model = self.model_name(), "resetting neuron state");
        self.base_mut().memories_mut().reset();
    }

    /// Truncate backpropagation through time at the current states
    fn detach(&mut self) {
        debug!(model = self.model_name(), "detaching neuron state");
        self.base_mut().memories_mut().detach();
    }

    /// Apply `transform` to every tensor state (e.g. dtype or device moves)
    fn relocate(&mut self, transform: &mut dyn FnMut(&Tensor) -> Tensor) {
        self.base_mut().memories_mut().relocate(transform);
    }

    /// Replica with its own recurrent-state registry
    fn replicate(&self) -> Self
    where
        Self: Sized + Clone,
    {
        self.clone()
    }
}
