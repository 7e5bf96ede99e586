// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

//! # Neuron Base
//!
//! State and behavior shared by every spiking neuron model: threshold, reset
//! rule, surrogate function and the recurrent-state registry holding the
//! membrane potential `v`.
//!
//! ## Step Dynamics
//!
//! ```text
//! materialize:  v scalar → full(shape of x, v)      (first step only)
//! charge:       v = model law(v, x)                 (per model)
//! fire:         s = surrogate(v - v_threshold)
//! reset:        s' = detach_reset ? detach(s) : s
//!     hard:     v = (1 - s')·v + s'·v_reset
//!     soft:     v = v - s'·v_threshold
//! ```

use std::fmt;

use spikegrad_config::NeuronSettings;
use spikegrad_tensor::Tensor;
use tracing::debug;

use super::memory::{MemoryValue, StateRegistry};
use crate::error::{NeuralError, Result};
use crate::surrogate::{ATan, SurrogateFunction};

/// Registry name of the membrane potential
pub const MEMBRANE_POTENTIAL: &str = "v";

/// Construction parameters shared by all neuron models
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct NeuronConfig {
    /// Firing threshold
    pub v_threshold: f32,

    /// `Some(value)` for hard reset to `value`, `None` for soft reset
    pub v_reset: Option<f32>,

    /// Stop gradients from flowing through the spike into the reset
    pub detach_reset: bool,

    /// `forward` expects a leading time axis when set
    pub time_batched: bool,
}

impl Default for NeuronConfig {
    fn default() -> Self {
        Self {
            v_threshold: 1.0,
            v_reset: Some(0.0),
            detach_reset: false,
            time_batched: true,
        }
    }
}

impl NeuronConfig {
    /// Check that threshold and reset value are finite
    pub fn validate(&self) -> Result<()> {
        if !self.v_threshold.is_finite() {
            return Err(NeuralError::InvalidConfig(format!(
                "v_threshold must be finite, got {}",
                self.v_threshold
            )));
        }
        if let Some(v_reset) = self.v_reset {
            if !v_reset.is_finite() {
                return Err(NeuralError::InvalidConfig(format!(
                    "v_reset must be finite, got {}",
                    v_reset
                )));
            }
        }
        Ok(())
    }

    pub fn from_settings(settings: &NeuronSettings) -> Result<Self> {
        let config = Self {
            v_threshold: settings.v_threshold,
            v_reset: settings.reset_value(),
            detach_reset: settings.detach_reset,
            time_batched: settings.time_batched,
        };
        config.validate()?;
        Ok(config)
    }

    /// Membrane potential before the first step and after every `reset`
    pub fn initial_potential(&self) -> f32 {
        self.v_reset.unwrap_or(0.0)
    }

    pub fn is_hard_reset(&self) -> bool {
        self.v_reset.is_some()
    }
}

/// `v = (1 - spike)·v + spike·v_reset`
pub fn hard_reset(v: &Tensor, spike: &Tensor, v_reset: f32) -> Result<Tensor> {
    let kept = spike.rsub_scalar(1.0).mul(v)?;
    Ok(kept.add(&spike.mul_scalar(v_reset))?)
}

/// `v = v - spike·v_threshold`
pub fn soft_reset(v: &Tensor, spike: &Tensor, v_threshold: f32) -> Result<Tensor> {
    Ok(v.sub(&spike.mul_scalar(v_threshold))?)
}

/// Common neuron state: configuration, surrogate and recurrent states
#[derive(Debug, Clone)]
pub struct NeuronBase {
    config: NeuronConfig,
    surrogate: Box<dyn SurrogateFunction>,
    memories: StateRegistry,
}

impl NeuronBase {
    /// Base with a fresh default arctangent surrogate
    pub fn new(config: NeuronConfig) -> Result<Self> {
        Self::with_surrogate(config, Box::new(ATan::default()))
    }

    pub fn with_surrogate(
        config: NeuronConfig,
        surrogate: Box<dyn SurrogateFunction>,
    ) -> Result<Self> {
        config.validate()?;
        let mut memories = StateRegistry::new();
        memories.register_memory(MEMBRANE_POTENTIAL, config.initial_potential())?;
        debug!(
            v_threshold = config.v_threshold,
            v_reset = ?config.v_reset,
            surrogate = surrogate.name(),
            "created neuron base"
        );
        Ok(Self {
            config,
            surrogate,
            memories,
        })
    }

    pub fn config(&self) -> &NeuronConfig {
        &self.config
    }

    pub fn v_threshold(&self) -> f32 {
        self.config.v_threshold
    }

    pub fn v_reset(&self) -> Option<f32> {
        self.config.v_reset
    }

    pub fn detach_reset(&self) -> bool {
        self.config.detach_reset
    }

    pub fn time_batched(&self) -> bool {
        self.config.time_batched
    }

    pub fn set_time_batched(&mut self, time_batched: bool) {
        self.config.time_batched = time_batched;
    }

    pub fn surrogate(&self) -> &dyn SurrogateFunction {
        self.surrogate.as_ref()
    }

    pub fn surrogate_mut(&mut self) -> &mut dyn SurrogateFunction {
        self.surrogate.as_mut()
    }

    pub fn memories(&self) -> &StateRegistry {
        &self.memories
    }

    pub fn memories_mut(&mut self) -> &mut StateRegistry {
        &mut self.memories
    }

    /// Current membrane potential (scalar until the first step)
    pub fn v(&self) -> Result<&MemoryValue> {
        self.memories.get_memory(MEMBRANE_POTENTIAL)
    }

    /// Membrane potential as a tensor; a scalar placeholder becomes 0-d
    pub fn v_tensor(&self) -> Result<Tensor> {
        Ok(match self.v()? {
            MemoryValue::Tensor(tensor) => tensor.clone(),
            MemoryValue::Scalar(value) => Tensor::scalar(*value),
        })
    }

    pub fn set_v(&mut self, v: Tensor) -> Result<()> {
        self.memories.set_memory(MEMBRANE_POTENTIAL, v)
    }

    /// Expand a scalar `v` to the shape of `x`; tensor states are left alone
    pub fn materialize_v(&mut self, x: &Tensor) -> Result<()> {
        if let Some(value) = self.v()?.as_scalar() {
            self.set_v(Tensor::full(x.shape(), value))?;
        }
        Ok(())
    }

    /// `surrogate(v - v_threshold)`; does not touch state
    pub fn fire(&self) -> Result<Tensor> {
        let v = self.v_tensor()?;
        Ok(self.surrogate.call(&v.add_scalar(-self.config.v_threshold)))
    }

    /// Apply the configured reset rule to `v` using `spike`
    pub fn reset_membrane(&mut self, spike: &Tensor) -> Result<()> {
        let spike = if self.config.detach_reset {
            spike.detach()
        } else {
            spike.clone()
        };
        let v = self.v_tensor()?;
        let v = match self.config.v_reset {
            Some(v_reset) => hard_reset(&v, &spike, v_reset)?,
            None => soft_reset(&v, &spike, self.config.v_threshold)?,
        };
        self.set_v(v)
    }
}

impl fmt::Display for NeuronBase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "v_threshold={}, v_reset=", self.config.v_threshold)?;
        match self.config.v_reset {
            Some(v_reset) => write!(f, "{}", v_reset)?,
            None => write!(f, "None")?,
        }
        write!(
            f,
            ", detach_reset={}, time_batched={}, surrogate={}(alpha={}, spiking={})",
            self.config.detach_reset,
            self.config.time_batched,
            self.surrogate.name(),
            self.surrogate.alpha(),
            self.surrogate.spiking()
        )
    }
}
