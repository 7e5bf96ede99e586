// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

//! Neuron Lifecycle Test Suite
//!
//! Validates the state lifecycle of spiking neurons across time steps.
//!
//! # Test Coverage Matrix
//!
//! ## Reset
//! - Reset restores registration values exactly
//! - Reset is idempotent
//! - Hard reset (v_reset) and soft reset (threshold subtraction)
//!
//! ## Materialization
//! - Scalar placeholder expands to the first input shape
//! - Shape is chosen again after every reset
//!
//! ## Gradient Flow
//! - detach_reset removes the spike from the reset gradient
//! - detach truncates backpropagation through time
//!
//! ## Registry
//! - Models add recurrent state through the registry
//! - relocate and replicate act on every state

use spikegrad_neural::{
    IFNode, LIFNode, LIFParameters, MemoryValue, NeuralError, NeuronBase, NeuronConfig,
    SpikingNeuron, StateRegistry,
};
use spikegrad_tensor::Tensor;

// ============================================================================
// Helper Functions
// ============================================================================

fn step_config() -> NeuronConfig {
    NeuronConfig {
        time_batched: false,
        ..Default::default()
    }
}

fn v_values(neuron: &impl SpikingNeuron) -> Vec<f32> {
    neuron.base().v_tensor().unwrap().to_vec()
}

/// IF neuron with an extra low-pass input trace: `trace = trace/2 + x`,
/// `v = v + trace`
#[derive(Debug, Clone)]
struct TraceNode {
    base: NeuronBase,
}

impl TraceNode {
    fn new(config: NeuronConfig) -> Self {
        let mut base = NeuronBase::new(config).unwrap();
        base.memories_mut().register_memory("trace", 0.0_f32).unwrap();
        Self { base }
    }

    fn trace(&self) -> Tensor {
        match self.base.memories().get_memory("trace").unwrap() {
            MemoryValue::Tensor(t) => t.clone(),
            MemoryValue::Scalar(s) => Tensor::scalar(*s),
        }
    }
}

impl SpikingNeuron for TraceNode {
    fn base(&self) -> &NeuronBase {
        &self.base
    }

    fn base_mut(&mut self) -> &mut NeuronBase {
        &mut self.base
    }

    fn model_name(&self) -> &'static str {
        "TraceNode"
    }

    fn neuronal_charge(&mut self, x: &Tensor) -> spikegrad_neural::Result<()> {
        let trace = self.trace().mul_scalar(0.5).add(x)?;
        self.base
            .memories_mut()
            .set_memory("trace", trace.clone())?;
        let v = self.base.v_tensor()?.add(&trace)?;
        self.base.set_v(v)
    }
}

// ============================================================================
// Reset
// ============================================================================

#[test]
fn test_reset_restores_origin() {
    let mut node = IFNode::new(NeuronConfig {
        v_reset: Some(-0.1),
        ..step_config()
    })
    .unwrap();
    for _ in 0..5 {
        node.single_step(&Tensor::full(&[3], 0.7)).unwrap();
    }
    node.reset();
    assert_eq!(node.base().v().unwrap(), &MemoryValue::Scalar(-0.1));
}

#[test]
fn test_reset_is_idempotent() {
    let mut node = TraceNode::new(step_config());
    node.single_step(&Tensor::full(&[2], 0.4)).unwrap();

    node.reset();
    let once: Vec<(String, MemoryValue)> = node
        .base()
        .memories()
        .named_memories()
        .map(|(name, value)| (name.to_string(), value.clone()))
        .collect();
    node.reset();
    let twice: Vec<(String, MemoryValue)> = node
        .base()
        .memories()
        .named_memories()
        .map(|(name, value)| (name.to_string(), value.clone()))
        .collect();

    assert_eq!(once, twice);
    assert_eq!(
        once,
        vec![
            ("v".to_string(), MemoryValue::Scalar(0.0)),
            ("trace".to_string(), MemoryValue::Scalar(0.0)),
        ]
    );
}

#[test]
fn test_reset_after_set_reset_value() {
    let mut node = IFNode::new(step_config()).unwrap();
    node.base_mut()
        .memories_mut()
        .set_reset_value("v", Tensor::full(&[2], 0.5))
        .unwrap();
    node.single_step(&Tensor::full(&[2], 2.0)).unwrap();
    node.reset();
    assert_eq!(v_values(&node), vec![0.5, 0.5]);
}

#[test]
fn test_soft_reset_keeps_overshoot() {
    let mut node = IFNode::new(NeuronConfig {
        v_reset: None,
        ..step_config()
    })
    .unwrap();
    let spike = node.single_step(&Tensor::scalar(1.5)).unwrap();
    assert_eq!(spike.item().unwrap(), 1.0);
    assert_eq!(v_values(&node), vec![0.5]);
}

#[test]
fn test_hard_reset_discards_overshoot() {
    let mut node = IFNode::new(step_config()).unwrap();
    let spike = node.single_step(&Tensor::scalar(1.5)).unwrap();
    assert_eq!(spike.item().unwrap(), 1.0);
    assert_eq!(v_values(&node), vec![0.0]);
}

// ============================================================================
// Materialization
// ============================================================================

#[test]
fn test_materializes_to_input_shape() {
    let mut node = LIFNode::new(step_config(), LIFParameters::default()).unwrap();
    assert!(matches!(node.base().v().unwrap(), MemoryValue::Scalar(_)));

    node.single_step(&Tensor::zeros(&[4, 3])).unwrap();
    assert_eq!(node.base().v_tensor().unwrap().shape(), &[4, 3]);

    node.reset();
    node.single_step(&Tensor::zeros(&[2, 5, 7])).unwrap();
    assert_eq!(node.base().v_tensor().unwrap().shape(), &[2, 5, 7]);
}

#[test]
fn test_end_to_end_constant_current() {
    let mut node = IFNode::new(NeuronConfig::default()).unwrap();
    let x_seq = Tensor::from_vec(&[3], vec![0.6, 0.6, 0.6]).unwrap();
    let spikes = node.forward(&x_seq).unwrap();
    assert_eq!(spikes.to_vec(), vec![0.0, 1.0, 0.0]);
}

// ============================================================================
// Gradient Flow
// ============================================================================

fn reset_gradient(detach_reset: bool) -> f32 {
    let mut node = IFNode::new(NeuronConfig {
        detach_reset,
        ..step_config()
    })
    .unwrap();
    let x = Tensor::scalar(1.5).requires_grad_(true);
    node.single_step(&x).unwrap();
    node.base().v_tensor().unwrap().backward().unwrap();
    x.grad().unwrap().iter().copied().next().unwrap()
}

#[test]
fn test_detach_reset_changes_gradient() {
    // v' = (1 - s)·v with s = 1: only the spike path carries gradient
    let attached = reset_gradient(false);
    let detached = reset_gradient(true);

    let slope = 2.0 / (2.0 * (1.0 + (std::f32::consts::FRAC_PI_2 * 2.0 * 0.5).powi(2)));
    assert!((attached - (-1.5 * slope)).abs() < 1e-5);
    assert_eq!(detached, 0.0);
}

#[test]
fn test_detach_truncates_history() {
    let mut node = IFNode::new(step_config()).unwrap();
    let x1 = Tensor::scalar(0.3).requires_grad_(true);
    let x2 = Tensor::scalar(0.3).requires_grad_(true);

    node.single_step(&x1).unwrap();
    node.detach();
    node.single_step(&x2).unwrap();
    node.base().v_tensor().unwrap().backward().unwrap();

    assert!(x1.grad().is_none());
    assert!(x2.grad().is_some());
}

#[test]
fn test_history_flows_without_detach() {
    let mut node = IFNode::new(step_config()).unwrap();
    let x1 = Tensor::scalar(0.3).requires_grad_(true);
    let x2 = Tensor::scalar(0.3).requires_grad_(true);

    node.single_step(&x1).unwrap();
    node.single_step(&x2).unwrap();
    node.base().v_tensor().unwrap().backward().unwrap();

    assert!(x1.grad().is_some());
}

// ============================================================================
// Registry
// ============================================================================

#[test]
fn test_model_state_lives_in_registry() {
    let mut node = TraceNode::new(step_config());
    node.single_step(&Tensor::scalar(0.5)).unwrap();
    node.single_step(&Tensor::scalar(0.5)).unwrap();

    // trace: 0.5, then 0.25 + 0.5; v: 0.5, then 0.5 + 0.75 -> fires, reset to 0
    assert_eq!(node.trace().item().unwrap(), 0.75);
    assert_eq!(v_values(&node), vec![0.0]);

    let names: Vec<&str> = node
        .base()
        .memories()
        .named_memories()
        .map(|(name, _)| name)
        .collect();
    assert_eq!(names, vec!["v", "trace"]);
}

#[test]
fn test_duplicate_memory_is_rejected() {
    let mut node = IFNode::new(step_config()).unwrap();
    let err = node
        .base_mut()
        .memories_mut()
        .register_memory("v", 1.0_f32)
        .unwrap_err();
    assert_eq!(err, NeuralError::MemoryAlreadyRegistered("v".to_string()));
}

#[test]
fn test_removed_memory_fails_step() {
    let mut node = IFNode::new(step_config()).unwrap();
    node.base_mut().memories_mut().remove_memory("v").unwrap();
    assert!(matches!(
        node.single_step(&Tensor::scalar(1.0)),
        Err(NeuralError::MemoryNotRegistered(_))
    ));
}

#[test]
fn test_relocate_reaches_every_tensor_state() {
    let mut node = TraceNode::new(step_config());
    node.single_step(&Tensor::full(&[2], 0.25)).unwrap();

    let mut relocated = Vec::new();
    node.relocate(&mut |t: &Tensor| {
        relocated.push(t.shape().to_vec());
        t.mul_scalar(2.0)
    });

    assert_eq!(relocated, vec![vec![2], vec![2]]);
    assert_eq!(v_values(&node), vec![0.5, 0.5]);
    assert_eq!(node.trace().to_vec(), vec![0.5, 0.5]);
}

#[test]
fn test_relocate_before_first_step_is_noop() {
    let mut node = IFNode::new(step_config()).unwrap();
    let mut calls = 0;
    node.relocate(&mut |t: &Tensor| {
        calls += 1;
        t.clone()
    });
    assert_eq!(calls, 0);
    assert_eq!(node.base().v().unwrap(), &MemoryValue::Scalar(0.0));
}

#[test]
fn test_replica_has_independent_state() {
    let original = LIFNode::new(step_config(), LIFParameters::default()).unwrap();
    let mut replica = original.replicate();
    replica.single_step(&Tensor::full(&[3], 0.5)).unwrap();

    assert!(matches!(original.base().v().unwrap(), MemoryValue::Scalar(_)));
    assert_eq!(replica.base().v_tensor().unwrap().shape(), &[3]);
}

#[test]
fn test_registry_standalone() {
    let mut registry = StateRegistry::new();
    registry.register_memory("v", 0.0_f32).unwrap();
    registry.set_memory("v", Tensor::ones(&[2])).unwrap();
    assert_eq!(registry.memories().filter(|m| m.is_tensor()).count(), 1);
}
