// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

//! # Custom Gradient Functions
//!
//! Registers a forward/backward pair with the backward engine. The forward
//! rule computes the output values; the backward rule receives the saved
//! forward input plus the non-differentiable parameters and returns the
//! gradient with respect to the input.
//!
//! ```text
//! apply_custom::<F>(x, params)
//!     forward:  y = F::forward(x, params)
//!     backward: dx = F::backward(SavedContext { x, params }, dy)
//!               (params never receive a gradient)
//! ```
//!
//! The context is saved only when `x` tracks gradients, so inference-time
//! calls keep no backward state alive.

use std::marker::PhantomData;
use std::rc::Rc;

use ndarray::ArrayD;

use crate::tensor::{GradFn, Tensor};

/// State captured at forward time for the backward rule
#[derive(Debug, Clone)]
pub struct SavedContext<P> {
    /// Forward input exactly as the forward rule saw it
    pub saved_input: ArrayD<f32>,
    /// Hyperparameters of the call
    pub params: P,
}

/// A forward/backward pair usable inside the autodiff graph
pub trait CustomFunction: 'static {
    /// Non-differentiable auxiliary parameters
    type Params: Clone + 'static;

    /// Name reported by [`Tensor::grad_fn_name`] on outputs
    const NAME: &'static str;

    fn forward(x: &ArrayD<f32>, params: &Self::Params) -> ArrayD<f32>;

    fn backward(ctx: &SavedContext<Self::Params>, grad_output: &ArrayD<f32>) -> ArrayD<f32>;
}

struct CustomBackward<F: CustomFunction> {
    input: Tensor,
    ctx: SavedContext<F::Params>,
    _function: PhantomData<F>,
}

impl<F: CustomFunction> GradFn for CustomBackward<F> {
    fn name(&self) -> &'static str {
        F::NAME
    }

    fn inputs(&self) -> Vec<Tensor> {
        vec![self.input.clone()]
    }

    fn backward(&self, grad_output: &ArrayD<f32>) -> Vec<Option<ArrayD<f32>>> {
        vec![Some(F::backward(&self.ctx, grad_output))]
    }
}

/// Run `F` on `x`, recording its backward rule if `x` tracks gradients
pub fn apply_custom<F: CustomFunction>(x: &Tensor, params: F::Params) -> Tensor {
    let output = F::forward(x.data(), &params);
    if !x.requires_grad() {
        return Tensor::from_array(output);
    }
    let ctx = SavedContext {
        saved_input: x.data().clone(),
        params,
    };
    Tensor::from_op(
        output,
        Rc::new(CustomBackward::<F> {
            input: x.clone(),
            ctx,
            _function: PhantomData,
        }),
    )
}
