// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

//! # LIF (Leaky Integrate-and-Fire) Neuron
//!
//! ## Model Dynamics
//!
//! ```text
//! decay_input = true:
//!     V(t) = V(t-1) + (X(t) - (V(t-1) - V_reset)) / tau
//!
//! decay_input = false:
//!     V(t) = V(t-1) - (V(t-1) - V_reset) / tau + X(t)
//!
//!     Where:
//!     - tau = membrane time constant (> 0)
//!     - V_reset = reset value, or 0 for soft reset
//! ```

use std::fmt;

use spikegrad_config::{LifSettings, SpikegradConfig};
use spikegrad_tensor::Tensor;
use tracing::debug;

use super::base::{NeuronBase, NeuronConfig};
use super::traits::SpikingNeuron;
use crate::error::{NeuralError, Result};
use crate::surrogate::{ATan, SurrogateFunction};

/// LIF model-specific parameters
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LIFParameters {
    /// Membrane time constant
    pub tau: f32,

    /// Scale the input by `1/tau` together with the leak
    pub decay_input: bool,
}

impl LIFParameters {
    pub fn new(tau: f32, decay_input: bool) -> Self {
        Self { tau, decay_input }
    }

    pub fn validate(&self) -> Result<()> {
        if !self.tau.is_finite() || self.tau <= 0.0 {
            return Err(NeuralError::InvalidConfig(format!(
                "tau must be finite and positive, got {}",
                self.tau
            )));
        }
        Ok(())
    }

    pub fn from_settings(settings: &LifSettings) -> Result<Self> {
        let params = Self::new(settings.tau, settings.decay_input);
        params.validate()?;
        Ok(params)
    }
}

impl Default for LIFParameters {
    fn default() -> Self {
        Self {
            tau: 2.0,
            decay_input: true,
        }
    }
}

#[derive(Debug, Clone)]
pub struct LIFNode {
    base: NeuronBase,
    params: LIFParameters,
}

impl LIFNode {
    pub fn new(config: NeuronConfig, params: LIFParameters) -> Result<Self> {
        Self::with_surrogate(config, params, Box::new(ATan::default()))
    }

    pub fn with_surrogate(
        config: NeuronConfig,
        params: LIFParameters,
        surrogate: Box<dyn SurrogateFunction>,
    ) -> Result<Self> {
        params.validate()?;
        let base = NeuronBase::with_surrogate(config, surrogate)?;
        debug!(
            model = "LIF",
            tau = params.tau,
            decay_input = params.decay_input,
            "created neuron"
        );
        Ok(Self { base, params })
    }

    /// Build from the `[neuron]`, `[surrogate]` and `[lif]` sections
    pub fn from_config(config: &SpikegradConfig) -> Result<Self> {
        Self::with_surrogate(
            NeuronConfig::from_settings(&config.neuron)?,
            LIFParameters::from_settings(&config.lif)?,
            Box::new(ATan::from_settings(&config.surrogate)?),
        )
    }

    pub fn params(&self) -> &LIFParameters {
        &self.params
    }
}

impl SpikingNeuron for LIFNode {
    fn base(&self) -> &NeuronBase {
        &self.base
    }

    fn base_mut(&mut self) -> &mut NeuronBase {
        &mut self.base
    }

    fn model_name(&self) -> &'static str {
        "Leaky Integrate-and-Fire (LIF)"
    }

    fn describe(&self) -> String {
        self.to_string()
    }

    fn neuronal_charge(&mut self, x: &Tensor) -> Result<()> {
        let v = self.base.v_tensor()?;
        let rest = self.base.v_reset().unwrap_or(0.0);
        let leak = if rest == 0.0 {
            v.clone()
        } else {
            v.add_scalar(-rest)
        };
        let inv_tau = 1.0 / self.params.tau;

        let v = if self.params.decay_input {
            v.add(&x.sub(&leak)?.mul_scalar(inv_tau))?
        } else {
            v.sub(&leak.mul_scalar(inv_tau))?.add(x)?
        };
        self.base.set_v(v)
    }
}

impl fmt::Display for LIFNode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "LIFNode({}, tau={}, decay_input={})",
            self.base, self.params.tau, self.params.decay_input
        )
    }
}
