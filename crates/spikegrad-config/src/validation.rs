// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

//! Configuration validation
//!
//! This module checks that configuration values are finite, within valid
//! ranges, and consistent with each other.

use crate::{ConfigError, ConfigResult, SpikegradConfig};

const LOG_LEVELS: &[&str] = &["trace", "debug", "info", "warn", "error"];

/// Validation errors that can occur during config validation
#[derive(Debug, Clone, PartialEq)]
pub enum ConfigValidationError {
    NotFinite { field: String, value: f32 },
    NotPositive { field: String, value: f32 },
    InvalidValue { field: String, reason: String },
}

impl std::fmt::Display for ConfigValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::NotFinite { field, value } => {
                write!(f, "{} = {} must be a finite number", field, value)
            }
            Self::NotPositive { field, value } => {
                write!(f, "{} = {} must be greater than zero", field, value)
            }
            Self::InvalidValue { field, reason } => {
                write!(f, "Invalid configuration value for {}: {}", field, reason)
            }
        }
    }
}

/// Validate the complete configuration
///
/// Checks for:
/// - Finite neuron threshold and reset value
/// - Positive surrogate steepness and LIF time constant
/// - Non-empty simulation shape and step count
/// - Known log level
///
/// # Errors
///
/// Returns `ConfigError::ValidationError` listing every problem found
pub fn validate_config(config: &SpikegradConfig) -> ConfigResult<()> {
    let errors = collect_errors(config);
    if errors.is_empty() {
        return Ok(());
    }

    let error_messages = errors
        .iter()
        .map(|e| format!("  - {}", e))
        .collect::<Vec<_>>()
        .join("\n");

    Err(ConfigError::ValidationError(format!(
        "Configuration validation failed:\n{}",
        error_messages
    )))
}

/// Every validation problem in `config`, in section order
pub fn collect_errors(config: &SpikegradConfig) -> Vec<ConfigValidationError> {
    let mut errors = Vec::new();
    validate_neuron(config, &mut errors);
    validate_positive_parameters(config, &mut errors);
    validate_simulation(config, &mut errors);
    validate_logging(config, &mut errors);
    errors
}

fn check_finite(field: &str, value: f32, errors: &mut Vec<ConfigValidationError>) {
    if !value.is_finite() {
        errors.push(ConfigValidationError::NotFinite {
            field: field.to_string(),
            value,
        });
    }
}

fn check_positive(field: &str, value: f32, errors: &mut Vec<ConfigValidationError>) {
    if !value.is_finite() {
        check_finite(field, value, errors);
    } else if value <= 0.0 {
        errors.push(ConfigValidationError::NotPositive {
            field: field.to_string(),
            value,
        });
    }
}

fn validate_neuron(config: &SpikegradConfig, errors: &mut Vec<ConfigValidationError>) {
    check_finite("neuron.v_threshold", config.neuron.v_threshold, errors);
    if let Some(v_reset) = config.neuron.reset_value() {
        check_finite("neuron.v_reset", v_reset, errors);
    }
}

fn validate_positive_parameters(config: &SpikegradConfig, errors: &mut Vec<ConfigValidationError>) {
    check_positive("surrogate.alpha", config.surrogate.alpha, errors);
    check_positive("lif.tau", config.lif.tau, errors);
}

fn validate_simulation(config: &SpikegradConfig, errors: &mut Vec<ConfigValidationError>) {
    let simulation = &config.simulation;
    if simulation.time_steps == 0 {
        errors.push(ConfigValidationError::InvalidValue {
            field: "simulation.time_steps".to_string(),
            reason: "must be at least 1".to_string(),
        });
    }
    if simulation.input_shape.is_empty() || simulation.input_shape.contains(&0) {
        errors.push(ConfigValidationError::InvalidValue {
            field: "simulation.input_shape".to_string(),
            reason: format!("{:?} must be non-empty with no zero dimension", simulation.input_shape),
        });
    }
    check_finite("simulation.input_current", simulation.input_current, errors);
}

fn validate_logging(config: &SpikegradConfig, errors: &mut Vec<ConfigValidationError>) {
    if !LOG_LEVELS.contains(&config.logging.level.as_str()) {
        errors.push(ConfigValidationError::InvalidValue {
            field: "logging.level".to_string(),
            reason: format!("'{}' is not one of {:?}", config.logging.level, LOG_LEVELS),
        });
    }
}
