// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

//! # spikegrad Tensor Engine
//!
//! Small dynamic reverse-mode autodiff over `ndarray`, sized for what spiking
//! neurons need:
//! - **Tensor**: reference-counted values with gradient tracking
//! - **Ops**: broadcasting elementwise arithmetic, `atan`, `sum`, reshape,
//!   select/stack along the leading (time) axis
//! - **Function**: forward/backward pairs registered with the backward engine
//!   (the hook used for surrogate gradients)

/// Crate version from Cargo.toml
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

pub mod error;
pub mod function;
pub mod ops;
pub mod tensor;

pub use error::{Result, TensorError};
pub use function::{apply_custom, CustomFunction, SavedContext};
pub use ops::broadcast_shape;
pub use tensor::Tensor;

/// Re-export so downstream crates share one ndarray version
pub use ndarray;
