// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

//! Configuration file loading with override support
//!
//! This module implements the 3-tier configuration loading system:
//! 1. TOML file (base defaults)
//! 2. Environment variables (runtime overrides)
//! 3. CLI arguments (explicit user overrides)
//!
//! The merged result is validated before it is returned.

use crate::types::ResetMode;
use crate::{validate_config, ConfigError, ConfigResult, NeuronModelKind, SpikegradConfig};
use std::collections::HashMap;
use std::env;
use std::fs;
use std::path::{Path, PathBuf};

/// Default configuration file name
pub const CONFIG_FILE_NAME: &str = "spikegrad.toml";

/// Find the spikegrad configuration file
///
/// Search order:
/// 1. `SPIKEGRAD_CONFIG_PATH` environment variable
/// 2. Current working directory: `./spikegrad.toml`
/// 3. Up to 5 parent directories
///
/// # Errors
///
/// Returns `ConfigError::FileNotFound` if no config file is found in any location
pub fn find_config_file() -> ConfigResult<PathBuf> {
    if let Ok(env_path) = env::var("SPIKEGRAD_CONFIG_PATH") {
        let path = PathBuf::from(env_path);
        if path.exists() {
            return Ok(path);
        }
        return Err(ConfigError::FileNotFound(format!(
            "Config file specified by SPIKEGRAD_CONFIG_PATH not found: {}",
            path.display()
        )));
    }

    let mut search_paths = Vec::new();
    if let Ok(cwd) = env::current_dir() {
        search_paths.push(cwd.join(CONFIG_FILE_NAME));
        let mut current = cwd;
        for _ in 0..5 {
            match current.parent() {
                Some(parent) => {
                    search_paths.push(parent.join(CONFIG_FILE_NAME));
                    current = parent.to_path_buf();
                }
                None => break,
            }
        }
    }

    if let Some(path) = search_paths.iter().find(|p| p.exists()) {
        return Ok(path.clone());
    }

    let search_list = search_paths
        .iter()
        .map(|p| format!("  - {}", p.display()))
        .collect::<Vec<_>>()
        .join("\n");

    Err(ConfigError::FileNotFound(format!(
        "'{}' not found in any of these locations:\n{}\n\nSet SPIKEGRAD_CONFIG_PATH to specify a custom location.",
        CONFIG_FILE_NAME, search_list
    )))
}

/// Load configuration from a TOML file
///
/// # Arguments
///
/// * `config_path` - Optional path to config file. If `None`, will search for config file.
/// * `cli_args` - Optional CLI argument overrides
///
/// # Errors
///
/// Returns error if the file is not found, contains invalid TOML, or the
/// merged configuration fails validation
pub fn load_config(
    config_path: Option<&Path>,
    cli_args: Option<&HashMap<String, String>>,
) -> ConfigResult<SpikegradConfig> {
    let config_file = match config_path {
        Some(path) => path.to_path_buf(),
        None => find_config_file()?,
    };

    let content = fs::read_to_string(&config_file)?;
    let config: SpikegradConfig = toml::from_str(&content)?;
    finish(config, cli_args)
}

/// Like [`load_config`], but falls back to built-in defaults when no file exists
pub fn load_config_or_default(
    cli_args: Option<&HashMap<String, String>>,
) -> ConfigResult<SpikegradConfig> {
    match find_config_file() {
        Ok(path) => load_config(Some(path.as_path()), cli_args),
        Err(ConfigError::FileNotFound(_)) => finish(SpikegradConfig::default(), cli_args),
        Err(e) => Err(e),
    }
}

fn finish(
    mut config: SpikegradConfig,
    cli_args: Option<&HashMap<String, String>>,
) -> ConfigResult<SpikegradConfig> {
    apply_environment_overrides(&mut config)?;
    if let Some(cli) = cli_args {
        apply_cli_overrides(&mut config, cli)?;
    }
    validate_config(&config)?;
    Ok(config)
}

/// Apply environment variable overrides to configuration
///
/// Supported environment variables:
/// - `SPIKEGRAD_V_THRESHOLD` -> `neuron.v_threshold`
/// - `SPIKEGRAD_V_RESET` -> `neuron.v_reset` (`none`/`soft` selects soft reset)
/// - `SPIKEGRAD_DETACH_RESET` -> `neuron.detach_reset`
/// - `SPIKEGRAD_TIME_BATCHED` -> `neuron.time_batched`
/// - `SPIKEGRAD_SURROGATE_ALPHA` -> `surrogate.alpha`
/// - `SPIKEGRAD_SURROGATE_SPIKING` -> `surrogate.spiking`
/// - `SPIKEGRAD_LIF_TAU` -> `lif.tau`
/// - `SPIKEGRAD_MODEL` -> `simulation.model`
/// - `SPIKEGRAD_TIME_STEPS` -> `simulation.time_steps`
/// - `SPIKEGRAD_LOG_LEVEL` -> `logging.level`
pub fn apply_environment_overrides(config: &mut SpikegradConfig) -> ConfigResult<()> {
    let overrides: HashMap<String, String> = ENV_KEYS
        .iter()
        .filter_map(|(env_key, key)| env::var(env_key).ok().map(|v| (key.to_string(), v)))
        .collect();
    apply_overrides(config, &overrides)
}

/// Apply CLI argument overrides to configuration
///
/// # Arguments
///
/// * `config` - Configuration to modify
/// * `cli_args` - HashMap of CLI arguments (e.g., `{"v_threshold": "0.5", "time_steps": "8"}`)
pub fn apply_cli_overrides(
    config: &mut SpikegradConfig,
    cli_args: &HashMap<String, String>,
) -> ConfigResult<()> {
    apply_overrides(config, cli_args)
}

const ENV_KEYS: &[(&str, &str)] = &[
    ("SPIKEGRAD_V_THRESHOLD", "v_threshold"),
    ("SPIKEGRAD_V_RESET", "v_reset"),
    ("SPIKEGRAD_DETACH_RESET", "detach_reset"),
    ("SPIKEGRAD_TIME_BATCHED", "time_batched"),
    ("SPIKEGRAD_SURROGATE_ALPHA", "surrogate_alpha"),
    ("SPIKEGRAD_SURROGATE_SPIKING", "surrogate_spiking"),
    ("SPIKEGRAD_LIF_TAU", "lif_tau"),
    ("SPIKEGRAD_MODEL", "model"),
    ("SPIKEGRAD_TIME_STEPS", "time_steps"),
    ("SPIKEGRAD_LOG_LEVEL", "log_level"),
];

fn apply_overrides(
    config: &mut SpikegradConfig,
    overrides: &HashMap<String, String>,
) -> ConfigResult<()> {
    for (key, value) in overrides {
        match key.as_str() {
            "v_threshold" => config.neuron.v_threshold = parse_value(key, value)?,
            "v_reset" => match value.trim().to_lowercase().as_str() {
                "none" | "soft" => config.neuron.reset_mode = ResetMode::Soft,
                _ => {
                    config.neuron.reset_mode = ResetMode::Hard;
                    config.neuron.v_reset = parse_value(key, value)?;
                }
            },
            "detach_reset" => config.neuron.detach_reset = parse_bool(key, value)?,
            "time_batched" => config.neuron.time_batched = parse_bool(key, value)?,
            "surrogate_alpha" => config.surrogate.alpha = parse_value(key, value)?,
            "surrogate_spiking" => config.surrogate.spiking = parse_bool(key, value)?,
            "lif_tau" => config.lif.tau = parse_value(key, value)?,
            "decay_input" => config.lif.decay_input = parse_bool(key, value)?,
            "model" => {
                config.simulation.model = match value.trim().to_lowercase().as_str() {
                    "if" => NeuronModelKind::If,
                    "lif" => NeuronModelKind::Lif,
                    other => {
                        return Err(ConfigError::InvalidValue(format!(
                            "model: unknown neuron model '{}'",
                            other
                        )))
                    }
                }
            }
            "time_steps" => config.simulation.time_steps = parse_value(key, value)?,
            "input_current" => config.simulation.input_current = parse_value(key, value)?,
            "log_level" => config.logging.level = value.trim().to_lowercase(),
            // Unknown keys belong to other consumers of the same argument map
            _ => {}
        }
    }
    Ok(())
}

fn parse_value<T: std::str::FromStr>(key: &str, value: &str) -> ConfigResult<T> {
    value
        .trim()
        .parse::<T>()
        .map_err(|_| ConfigError::InvalidValue(format!("{}: cannot parse '{}'", key, value)))
}

fn parse_bool(key: &str, value: &str) -> ConfigResult<bool> {
    match value.trim().to_lowercase().as_str() {
        "true" | "1" | "yes" => Ok(true),
        "false" | "0" | "no" => Ok(false),
        _ => Err(ConfigError::InvalidValue(format!(
            "{}: expected a boolean, got '{}'",
            key, value
        ))),
    }
}
