// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

//! # spikegrad Configuration System
//!
//! Type-safe configuration loader for spiking neuron simulations with
//! support for:
//! - TOML file parsing
//! - Environment variable overrides
//! - CLI argument overrides
//! - Validation of every merged value
//!
//! ## Usage
//!
//! ```rust,no_run
//! use spikegrad_config::{load_config_or_default, SpikegradConfig};
//!
//! let config: SpikegradConfig = load_config_or_default(None).expect("Failed to load config");
//! println!("Threshold: {}", config.neuron.v_threshold);
//! println!("Surrogate alpha: {}", config.surrogate.alpha);
//! ```

/// Crate version from Cargo.toml
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

pub mod loader;
pub mod types;
pub mod validation;

pub use loader::{
    apply_cli_overrides, apply_environment_overrides, find_config_file, load_config,
    load_config_or_default, CONFIG_FILE_NAME,
};
pub use types::*;
pub use validation::{collect_errors, validate_config, ConfigValidationError};

/// Re-export for convenience
pub use serde;

/// Configuration error types
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Config file not found. Searched: {0}")]
    FileNotFound(String),

    #[error("Failed to read config file: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Invalid TOML syntax: {0}")]
    ParseError(String),

    #[error("Validation failed: {0}")]
    ValidationError(String),

    #[error("Invalid configuration value: {0}")]
    InvalidValue(String),
}

impl From<toml::de::Error> for ConfigError {
    fn from(err: toml::de::Error) -> Self {
        ConfigError::ParseError(err.to_string())
    }
}

/// Result type for configuration operations
pub type ConfigResult<T> = Result<T, ConfigError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_round_trips_through_toml() {
        let config = SpikegradConfig::default();
        let text = toml::to_string(&config).unwrap();
        let parsed: SpikegradConfig = toml::from_str(&text).unwrap();
        assert_eq!(parsed, config);
    }
}
