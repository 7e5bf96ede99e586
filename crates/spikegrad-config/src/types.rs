// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

//! Configuration type definitions
//!
//! This module defines all configuration structs that map to sections in
//! `spikegrad.toml`.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Root configuration structure
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct SpikegradConfig {
    pub neuron: NeuronSettings,
    pub surrogate: SurrogateSettings,
    pub lif: LifSettings,
    pub simulation: SimulationSettings,
    pub logging: LoggingSettings,
}

/// How the membrane potential is reset after a spike
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ResetMode {
    /// Snap to `v_reset`
    Hard,
    /// Subtract the threshold
    Soft,
}

/// Base neuron settings
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct NeuronSettings {
    pub v_threshold: f32,
    pub reset_mode: ResetMode,
    /// Only used when `reset_mode = "hard"`
    pub v_reset: f32,
    pub detach_reset: bool,
    pub time_batched: bool,
}

impl NeuronSettings {
    /// `Some(v_reset)` for hard reset, `None` for soft reset
    pub fn reset_value(&self) -> Option<f32> {
        match self.reset_mode {
            ResetMode::Hard => Some(self.v_reset),
            ResetMode::Soft => None,
        }
    }
}

impl Default for NeuronSettings {
    fn default() -> Self {
        Self {
            v_threshold: 1.0,
            reset_mode: ResetMode::Hard,
            v_reset: 0.0,
            detach_reset: false,
            time_batched: true,
        }
    }
}

/// Surrogate gradient settings (arctangent surrogate)
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct SurrogateSettings {
    pub alpha: f32,
    pub spiking: bool,
}

impl Default for SurrogateSettings {
    fn default() -> Self {
        Self {
            alpha: 2.0,
            spiking: true,
        }
    }
}

/// Leaky integrate-and-fire parameters
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct LifSettings {
    pub tau: f32,
    pub decay_input: bool,
}

impl Default for LifSettings {
    fn default() -> Self {
        Self {
            tau: 2.0,
            decay_input: true,
        }
    }
}

/// Which neuron model the simulation tool builds
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum NeuronModelKind {
    If,
    Lif,
}

/// Settings for the `simulate` tool
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct SimulationSettings {
    pub model: NeuronModelKind,
    pub time_steps: usize,
    /// Per-step input shape (without the time axis)
    pub input_shape: Vec<usize>,
    /// Constant input current applied at every step
    pub input_current: f32,
}

impl Default for SimulationSettings {
    fn default() -> Self {
        Self {
            model: NeuronModelKind::Lif,
            time_steps: 4,
            input_shape: vec![1],
            input_current: 0.6,
        }
    }
}

/// Logging configuration
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct LoggingSettings {
    pub level: String,
    pub file_logging: bool,
    pub log_dir: PathBuf,
    pub retention_runs: usize,
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            file_logging: false,
            log_dir: PathBuf::from("./logs"),
            retention_runs: 10,
        }
    }
}
