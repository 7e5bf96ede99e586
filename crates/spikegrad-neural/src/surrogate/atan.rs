// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

//! # Arctangent Surrogate
//!
//! ```text
//! Primitive:
//!     g(x) = atan(π/2 · α · x) / π + 1/2
//!
//! Derivative:
//!     g'(x) = α / (2 · (1 + (π/2 · α · x)²))
//!
//! Spike op:
//!     forward:  s = heaviside(x)
//!     backward: dx = dy · g'(x)        (α receives no gradient)
//! ```
//!
//! `g'(0) = α/2`, so larger `α` gives a taller, narrower gradient window
//! around the threshold.

use std::f32::consts::{FRAC_PI_2, PI};

use spikegrad_config::SurrogateSettings;
use spikegrad_tensor::ndarray::ArrayD;
use spikegrad_tensor::{apply_custom, CustomFunction, SavedContext, Tensor};

use super::{heaviside, SurrogateFunction};
use crate::error::{NeuralError, Result};

/// Arctangent surrogate gradient
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ATan {
    alpha: f32,
    spiking: bool,
}

impl ATan {
    /// Create an arctangent surrogate
    ///
    /// # Errors
    /// `NeuralError::InvalidConfig` unless `alpha` is finite and positive
    pub fn new(alpha: f32, spiking: bool) -> Result<Self> {
        if !alpha.is_finite() || alpha <= 0.0 {
            return Err(NeuralError::InvalidConfig(format!(
                "surrogate alpha must be finite and positive, got {}",
                alpha
            )));
        }
        Ok(Self { alpha, spiking })
    }

    pub fn from_settings(settings: &SurrogateSettings) -> Result<Self> {
        Self::new(settings.alpha, settings.spiking)
    }
}

impl Default for ATan {
    fn default() -> Self {
        Self {
            alpha: 2.0,
            spiking: true,
        }
    }
}

/// `grad_output · α / (2 · (1 + (π/2 · α · x)²))`
pub fn atan_backward(grad_output: &ArrayD<f32>, x: &ArrayD<f32>, alpha: f32) -> ArrayD<f32> {
    let slope = x.mapv(|value| {
        let scaled = FRAC_PI_2 * alpha * value;
        alpha / (2.0 * (1.0 + scaled * scaled))
    });
    grad_output * &slope
}

/// Heaviside forward, [`atan_backward`] backward
pub struct AtanSpike;

impl CustomFunction for AtanSpike {
    type Params = f32;
    const NAME: &'static str = "ATanSpikeBackward";

    fn forward(x: &ArrayD<f32>, _alpha: &f32) -> ArrayD<f32> {
        heaviside(x)
    }

    fn backward(ctx: &SavedContext<f32>, grad_output: &ArrayD<f32>) -> ArrayD<f32> {
        atan_backward(grad_output, &ctx.saved_input, ctx.params)
    }
}

impl SurrogateFunction for ATan {
    fn name(&self) -> &'static str {
        "ATan"
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
        x.mul_scalar(FRAC_PI_2 * self.alpha)
            .atan()
            .mul_scalar(1.0 / PI)
            .add_scalar(0.5)
    }

    fn derivative(&self, grad_output: &ArrayD<f32>, x: &ArrayD<f32>) -> ArrayD<f32> {
        atan_backward(grad_output, x, self.alpha)
    }

    fn spiking_function(&self, x: &Tensor) -> Tensor {
        apply_custom::<AtanSpike>(x, self.alpha)
    }

    fn box_clone(&self) -> Box<dyn SurrogateFunction> {
        Box::new(*self)
    }
}
