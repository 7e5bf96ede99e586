// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

//! # Surrogate Gradient Functions
//!
//! A surrogate function decouples the forward spike from the backward
//! gradient. In spiking mode the forward pass is the exact Heaviside step and
//! the backward pass uses the closed-form derivative of a smooth primitive.
//! In non-spiking mode the smooth primitive itself is the forward pass and
//! ordinary autodiff differentiates it.
//!
//! ```text
//!                    spiking = true               spiking = false
//! forward:    heaviside(x) ∈ {0, 1}           primitive(x, alpha)
//! backward:   derivative(dy, x, alpha)        d primitive / dx (autodiff)
//! ```
//!
//! ## Adding a New Surrogate Shape
//!
//! 1. Create `src/surrogate/your_shape.rs`
//! 2. Implement `SurrogateFunction` (and a `CustomFunction` for the spike op)
//! 3. Add tests comparing `derivative` against a numerical derivative of
//!    `primitive`
//! 4. Export in `mod.rs`

pub mod atan;

use std::fmt::Debug;

use spikegrad_tensor::ndarray::ArrayD;
use spikegrad_tensor::Tensor;

pub use atan::{atan_backward, AtanSpike, ATan};

/// Exact step function: `1` where `x >= 0`, else `0`
pub fn heaviside(x: &ArrayD<f32>) -> ArrayD<f32> {
    x.mapv(|value| if value >= 0.0 { 1.0 } else { 0.0 })
}

/// Trait for surrogate-gradient spike functions
///
/// Neurons hold a `Box<dyn SurrogateFunction>`, so every implementation must
/// be cloneable through [`box_clone`](SurrogateFunction::box_clone).
pub trait SurrogateFunction: Debug {
    /// Short name used in logs and `Display` output
    fn name(&self) -> &'static str;

    /// Shape parameter controlling the steepness of the primitive
    fn alpha(&self) -> f32;

    fn spiking(&self) -> bool;

    /// Switch between the exact spike (training) and the smooth primitive
    fn set_spiking(&mut self, spiking: bool);

    /// Smooth primitive built from differentiable tensor ops
    fn primitive(&self, x: &Tensor) -> Tensor;

    /// Closed-form backward rule evaluated at the pre-activation `x`
    fn derivative(&self, grad_output: &ArrayD<f32>, x: &ArrayD<f32>) -> ArrayD<f32>;

    /// Heaviside forward with the surrogate derivative as its backward rule
    fn spiking_function(&self, x: &Tensor) -> Tensor;

    /// Apply the surrogate in its current mode
    fn call(&self, x: &Tensor) -> Tensor {
        if self.spiking() {
            self.spiking_function(x)
        } else {
            self.primitive(x)
        }
    }

    fn box_clone(&self) -> Box<dyn SurrogateFunction>;
}

impl Clone for Box<dyn SurrogateFunction> {
    fn clone(&self) -> Self {
        self.box_clone()
    }
}
