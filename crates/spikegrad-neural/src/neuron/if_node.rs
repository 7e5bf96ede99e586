// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

//! # IF (Integrate-and-Fire) Neuron
//!
//! ```text
//! Charge:  V(t) = V(t-1) + X(t)
//! ```
//!
//! No leak; the potential only falls through reset.

use std::fmt;

use spikegrad_config::SpikegradConfig;
use spikegrad_tensor::Tensor;
use tracing::debug;

use super::base::{NeuronBase, NeuronConfig};
use super::traits::SpikingNeuron;
use crate::error::Result;
use crate::surrogate::{ATan, SurrogateFunction};

#[derive(Debug, Clone)]
pub struct IFNode {
    base: NeuronBase,
}

impl IFNode {
    pub fn new(config: NeuronConfig) -> Result<Self> {
        Self::with_surrogate(config, Box::new(ATan::default()))
    }

    pub fn with_surrogate(
        config: NeuronConfig,
        surrogate: Box<dyn SurrogateFunction>,
    ) -> Result<Self> {
        let base = NeuronBase::with_surrogate(config, surrogate)?;
        debug!(model = "IF", "created neuron");
        Ok(Self { base })
    }

    /// Build from the `[neuron]` and `[surrogate]` sections
    pub fn from_config(config: &SpikegradConfig) -> Result<Self> {
        Self::with_surrogate(
            NeuronConfig::from_settings(&config.neuron)?,
            Box::new(ATan::from_settings(&config.surrogate)?),
        )
    }
}

impl SpikingNeuron for IFNode {
    fn base(&self) -> &NeuronBase {
        &self.base
    }

    fn base_mut(&mut self) -> &mut NeuronBase {
        &mut self.base
    }

    fn model_name(&self) -> &'static str {
        "Integrate-and-Fire (IF)"
    }

    fn describe(&self) -> String {
        self.to_string()
    }

    fn neuronal_charge(&mut self, x: &Tensor) -> Result<()> {
        let v = self.base.v_tensor()?.add(x)?;
        self.base.set_v(v)
    }
}

impl fmt::Display for IFNode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "IFNode({})", self.base)
    }
}
