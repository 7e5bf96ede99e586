// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

//! # Time-Step Execution
//!
//! Two ways to drive a neuron over `T` time steps:
//!
//! ```text
//! Sequential:  [x_0, x_1, ..., x_{T-1}]  →  [s_0, s_1, ..., s_{T-1}]
//! Block:       x_seq [T, ...]            →  s_seq [T, ...]
//!              (unbind along time, step each slice, stack)
//! ```
//!
//! Block mode steps the slices in order, so step `t` always sees the state
//! left by step `t-1` and both modes produce identical spikes and gradients.

use spikegrad_tensor::Tensor;
use tracing::trace;

use crate::error::{NeuralError, Result};
use crate::neuron::SpikingNeuron;

/// How a `[T, ...]` input is driven through a neuron
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ExecutionMode {
    /// One `single_step` call per time step on a slice list
    Sequential,
    /// A single tensor with a leading time axis
    #[default]
    Block,
}

/// Step `inputs` in order through `neuron`
///
/// # Errors
/// `NeuralError::EmptySequence` for zero time steps; any step error is
/// returned as is and leaves the state of the steps before it in place.
pub fn run_sequential<N>(neuron: &mut N, inputs: &[Tensor]) -> Result<Vec<Tensor>>
where
    N: SpikingNeuron + ?Sized,
{
    if inputs.is_empty() {
        return Err(NeuralError::EmptySequence);
    }
    let mut spikes = Vec::with_capacity(inputs.len());
    for (t, x) in inputs.iter().enumerate() {
        let spike = neuron.single_step(x)?;
        trace!(model = neuron.model_name(), t, shape = ?spike.shape(), "time step");
        spikes.push(spike);
    }
    Ok(spikes)
}

/// Run a `[T, ...]` tensor through `neuron` and stack the spikes to `[T, ...]`
pub fn run_block<N>(neuron: &mut N, x_seq: &Tensor) -> Result<Tensor>
where
    N: SpikingNeuron + ?Sized,
{
    if x_seq.ndim() == 0 {
        return Err(NeuralError::MissingTimeAxis(x_seq.shape().to_vec()));
    }
    let steps = x_seq.unbind()?;
    let spikes = run_sequential(neuron, &steps)?;
    Ok(Tensor::stack(&spikes)?)
}

/// Run `x_seq` in the chosen mode; both return `[T, ...]` spikes
pub fn execute<N>(neuron: &mut N, x_seq: &Tensor, mode: ExecutionMode) -> Result<Tensor>
where
    N: SpikingNeuron + ?Sized,
{
    match mode {
        ExecutionMode::Block => run_block(neuron, x_seq),
        ExecutionMode::Sequential => {
            if x_seq.ndim() == 0 {
                return Err(NeuralError::MissingTimeAxis(x_seq.shape().to_vec()));
            }
            let steps = x_seq.unbind()?;
            let spikes = neuron.run_sequence(&steps)?;
            Ok(Tensor::stack(&spikes)?)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::neuron::{IFNode, NeuronConfig};

    #[test]
    fn test_empty_sequence() {
        let mut node = IFNode::new(NeuronConfig::default()).unwrap();
        assert_eq!(
            run_sequential(&mut node, &[]).unwrap_err(),
            NeuralError::EmptySequence
        );
        let empty = Tensor::zeros(&[0, 3]);
        assert_eq!(
            run_block(&mut node, &empty).unwrap_err(),
            NeuralError::EmptySequence
        );
    }

    #[test]
    fn test_missing_time_axis() {
        let mut node = IFNode::new(NeuronConfig::default()).unwrap();
        assert!(matches!(
            run_block(&mut node, &Tensor::scalar(1.0)),
            Err(NeuralError::MissingTimeAxis(_))
        ));
    }

    #[test]
    fn test_block_output_shape() {
        let mut node = IFNode::new(NeuronConfig::default()).unwrap();
        let x_seq = Tensor::full(&[5, 2, 3], 0.3);
        let spikes = run_block(&mut node, &x_seq).unwrap();
        assert_eq!(spikes.shape(), &[5, 2, 3]);
        assert_eq!(node.base().v_tensor().unwrap().shape(), &[2, 3]);
    }

    #[test]
    fn test_modes_agree() {
        let x_seq = Tensor::from_vec(&[4, 2], vec![0.6, 1.2, 0.6, 0.1, 0.6, 0.0, 0.6, 2.0])
            .unwrap();
        let mut block = IFNode::new(NeuronConfig::default()).unwrap();
        let mut sequential = block.clone();

        let a = execute(&mut block, &x_seq, ExecutionMode::Block).unwrap();
        let b = execute(&mut sequential, &x_seq, ExecutionMode::Sequential).unwrap();
        assert_eq!(a, b);
        assert_eq!(
            a.to_vec(),
            vec![0.0, 1.0, 1.0, 0.0, 0.0, 0.0, 1.0, 1.0]
        );
    }
}
