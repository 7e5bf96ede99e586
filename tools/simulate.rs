// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

//! Constant-current neuron simulation.
//!
//! Builds the neuron described by `spikegrad.toml` (plus environment and
//! `--set` overrides), drives it with a constant input current for
//! `simulation.time_steps` steps, backpropagates the total spike count and
//! prints spikes, final membrane potential and input gradients as JSON.

use std::collections::HashMap;
use std::env;
use std::path::PathBuf;
use std::process;

use anyhow::{bail, Context, Result};
use serde::Serialize;
use spikegrad::config::{load_config, load_config_or_default, NeuronModelKind, SpikegradConfig};
use spikegrad::neural::{execute, ExecutionMode, IFNode, LIFNode, SpikingNeuron};
use spikegrad::observability::{debug_flags_help, parse_debug_flags, LoggingGuard};
use spikegrad::tensor::Tensor;
use tracing::info;

struct Args {
    config: Option<PathBuf>,
    overrides: HashMap<String, String>,
    mode: ExecutionMode,
}

fn usage_and_exit() -> ! {
    eprintln!(
        "Usage: simulate [--config <path>] [--set <key>=<value>]... [--mode block|sequential]\n\n\
         Override keys: v_threshold, v_reset, detach_reset, time_batched, surrogate_alpha,\n\
         surrogate_spiking, lif_tau, decay_input, model, time_steps, input_current, log_level\n\n\
         {}",
        debug_flags_help()
    );
    process::exit(2);
}

fn parse_args() -> Args {
    let mut parsed = Args {
        config: None,
        overrides: HashMap::new(),
        mode: ExecutionMode::Block,
    };

    let mut args = env::args().skip(1);
    while let Some(arg) = args.next() {
        match arg.as_str() {
            "--config" => {
                let v = args.next().unwrap_or_else(|| usage_and_exit());
                parsed.config = Some(PathBuf::from(v));
            }
            "--set" => {
                let v = args.next().unwrap_or_else(|| usage_and_exit());
                let Some((key, value)) = v.split_once('=') else {
                    eprintln!("Override must look like key=value, got: {v}");
                    usage_and_exit();
                };
                parsed.overrides.insert(key.to_string(), value.to_string());
            }
            "--mode" => {
                parsed.mode = match args.next().as_deref() {
                    Some("block") => ExecutionMode::Block,
                    Some("sequential") => ExecutionMode::Sequential,
                    _ => usage_and_exit(),
                };
            }
            "-h" | "--help" => usage_and_exit(),
            // Consumed by parse_debug_flags
            other if other.starts_with("--debug-") => {}
            other => {
                eprintln!("Unknown argument: {other}");
                usage_and_exit();
            }
        }
    }

    parsed
}

#[derive(Debug, Serialize)]
struct Report {
    model: &'static str,
    neuron: String,
    mode: &'static str,
    input_shape: Vec<usize>,
    input_current: f32,
    /// Spikes per time step, flattened per step
    spikes: Vec<Vec<f32>>,
    spike_count: f32,
    firing_rate: f32,
    final_potential: Vec<f32>,
    /// d(spike_count)/d(input) per time step
    input_grad: Vec<Vec<f32>>,
}

fn init_logging(config: &SpikegradConfig) -> Result<LoggingGuard> {
    let flags = parse_debug_flags();
    let level = config.logging.level.as_str();

    #[cfg(feature = "file-logging")]
    {
        if config.logging.file_logging {
            return spikegrad::observability::init_file_logging(
                &flags,
                level,
                Some(config.logging.log_dir.clone()),
                Some(config.logging.retention_runs),
            );
        }
    }

    spikegrad::observability::init_logging(&flags, level)
}

fn build_neuron(config: &SpikegradConfig) -> Result<Box<dyn SpikingNeuron>> {
    Ok(match config.simulation.model {
        NeuronModelKind::If => Box::new(IFNode::from_config(config)?),
        NeuronModelKind::Lif => Box::new(LIFNode::from_config(config)?),
    })
}

fn rows(values: &Tensor) -> Result<Vec<Vec<f32>>> {
    Ok(values.unbind()?.iter().map(Tensor::to_vec).collect())
}

fn simulate(config: &SpikegradConfig, mode: ExecutionMode) -> Result<Report> {
    let simulation = &config.simulation;
    if simulation.time_steps == 0 {
        bail!("simulation.time_steps must be at least 1");
    }

    let mut neuron = build_neuron(config).context("Failed to build neuron")?;
    info!(
        model = neuron.model_name(),
        time_steps = simulation.time_steps,
        ?mode,
        "starting simulation"
    );

    let mut shape = vec![simulation.time_steps];
    shape.extend_from_slice(&simulation.input_shape);
    let x_seq = Tensor::full(&shape, simulation.input_current).requires_grad_(true);

    let spikes = execute(neuron.as_mut(), &x_seq, mode)?;
    let total = spikes.sum();
    total.backward()?;

    let spike_count = total.item()?;
    let firing_rate = spike_count / spikes.numel() as f32;
    let input_grad = match x_seq.grad() {
        Some(grad) => rows(&Tensor::from_array(grad))?,
        None => Vec::new(),
    };
    info!(spike_count, firing_rate, "simulation finished");

    Ok(Report {
        model: neuron.model_name(),
        neuron: neuron.describe(),
        mode: match mode {
            ExecutionMode::Block => "block",
            ExecutionMode::Sequential => "sequential",
        },
        input_shape: simulation.input_shape.clone(),
        input_current: simulation.input_current,
        spikes: rows(&spikes)?,
        spike_count,
        firing_rate,
        final_potential: neuron.base().v_tensor()?.to_vec(),
        input_grad,
    })
}

fn main() -> Result<()> {
    let args = parse_args();

    let config = match &args.config {
        Some(path) => load_config(Some(path.as_path()), Some(&args.overrides))
            .with_context(|| format!("Failed to load {}", path.display()))?,
        None => load_config_or_default(Some(&args.overrides)).context("Failed to load config")?,
    };
    let _guard = init_logging(&config)?;

    let report = simulate(&config, args.mode)?;
    println!("{}", serde_json::to_string_pretty(&report)?);
    Ok(())
}
