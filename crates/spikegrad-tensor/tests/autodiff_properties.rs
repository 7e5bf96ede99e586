// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

//! Property tests for the backward engine

use proptest::prelude::*;
use spikegrad_tensor::Tensor;

proptest! {
    #[test]
    fn square_gradient_is_twice_input(values in prop::collection::vec(-100.0f32..100.0, 1..32)) {
        let n = values.len();
        let x = Tensor::from_vec(&[n], values.clone()).unwrap().requires_grad_(true);
        x.mul(&x).unwrap().sum().backward().unwrap();

        let grad = x.grad().unwrap();
        for (g, v) in grad.iter().zip(values.iter()) {
            prop_assert!((g - 2.0 * v).abs() <= 1e-3 * (1.0 + v.abs()));
        }
    }

    #[test]
    fn stacked_slices_reassemble(rows in 1usize..6, cols in 1usize..6) {
        let values: Vec<f32> = (0..rows * cols).map(|v| v as f32).collect();
        let x = Tensor::from_vec(&[rows, cols], values).unwrap();
        let rebuilt = Tensor::stack(&x.unbind().unwrap()).unwrap();
        prop_assert_eq!(rebuilt, x);
    }
}
