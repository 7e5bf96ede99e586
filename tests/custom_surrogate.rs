// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

//! A surrogate shape defined outside the crate
//!
//! Sigmoid surrogate: `g(x) = σ(αx)`, `g'(x) = α·σ(αx)·(1 - σ(αx))`.

use spikegrad::neural::heaviside;
use spikegrad::prelude::*;
use spikegrad::tensor::ndarray::ArrayD;
use spikegrad::tensor::{apply_custom, SavedContext};

fn sigmoid(x: f32) -> f32 {
    1.0 / (1.0 + (-x).exp())
}

fn sigmoid_backward(grad_output: &ArrayD<f32>, x: &ArrayD<f32>, alpha: f32) -> ArrayD<f32> {
    let slope = x.mapv(|v| {
        let s = sigmoid(alpha * v);
        alpha * s * (1.0 - s)
    });
    grad_output * &slope
}

struct SigmoidPrimitive;

impl CustomFunction for SigmoidPrimitive {
    type Params = f32;
    const NAME: &'static str = "SigmoidBackward";

    fn forward(x: &ArrayD<f32>, alpha: &f32) -> ArrayD<f32> {
        x.mapv(|v| sigmoid(alpha * v))
    }

    fn backward(ctx: &SavedContext<f32>, grad_output: &ArrayD<f32>) -> ArrayD<f32> {
        sigmoid_backward(grad_output, &ctx.saved_input, ctx.params)
    }
}

struct SigmoidSpike;

impl CustomFunction for SigmoidSpike {
    type Params = f32;
    const NAME: &'static str = "SigmoidSpikeBackward";

    fn forward(x: &ArrayD<f32>, _alpha: &f32) -> ArrayD<f32> {
        heaviside(x)
    }

    fn backward(ctx: &SavedContext<f32>, grad_output: &ArrayD<f32>) -> ArrayD<f32> {
        sigmoid_backward(grad_output, &ctx.saved_input, ctx.params)
    }
}

#[derive(Debug, Clone, Copy)]
struct Sigmoid {
    alpha: f32,
    spiking: bool,
}

impl SurrogateFunction for Sigmoid {
    fn name(&self) -> &'static str {
        "Sigmoid"
    }

    fn alpha(&self) -> f32 {
        self.alpha
    }

    fn spiking(&self) -> bool {
        self.spiking
    }

    fn set_spiking(&mut self, spiking: bool) {
        self.spiking = spiking;
    }

    fn primitive(&self, x: &Tensor) -> Tensor {
        apply_custom::<SigmoidPrimitive>(x, self.alpha)
    }

    fn derivative(&self, grad_output: &ArrayD<f32>, x: &ArrayD<f32>) -> ArrayD<f32> {
        sigmoid_backward(grad_output, x, self.alpha)
    }

    fn spiking_function(&self, x: &Tensor) -> Tensor {
        apply_custom::<SigmoidSpike>(x, self.alpha)
    }

    fn box_clone(&self) -> Box<dyn SurrogateFunction> {
        Box::new(*self)
    }
}

#[test]
fn test_neuron_uses_plugged_surrogate() {
    let surrogate = Sigmoid {
        alpha: 4.0,
        spiking: true,
    };
    let mut node = IFNode::with_surrogate(
        NeuronConfig {
            time_batched: false,
            ..Default::default()
        },
        Box::new(surrogate),
    )
    .unwrap();
    assert!(node.to_string().contains("surrogate=Sigmoid(alpha=4, spiking=true)"));

    let x = Tensor::scalar(1.0).requires_grad_(true);
    let spike = node.single_step(&x).unwrap();
    assert_eq!(spike.item().unwrap(), 1.0);
    assert_eq!(spike.grad_fn_name(), Some("SigmoidSpikeBackward"));

    spike.backward().unwrap();
    // σ'(0) = α/4
    assert_eq!(x.grad().unwrap().iter().copied().next(), Some(1.0));
}

#[test]
fn test_non_spiking_mode_is_smooth() {
    let mut node = IFNode::with_surrogate(
        NeuronConfig {
            time_batched: false,
            ..Default::default()
        },
        Box::new(Sigmoid {
            alpha: 4.0,
            spiking: true,
        }),
    )
    .unwrap();
    node.base_mut().surrogate_mut().set_spiking(false);

    let out = node.single_step(&Tensor::scalar(1.0)).unwrap();
    assert!((out.item().unwrap() - 0.5).abs() < 1e-6);
}
