// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

//! Differentiable tensor operations
//!
//! Elementwise arithmetic follows NumPy broadcasting. Gradients flowing into a
//! broadcast operand are summed back down to that operand's shape.

use std::rc::Rc;

use ndarray::{ArrayD, Axis, IxDyn};

use crate::error::{Result, TensorError};
use crate::tensor::{GradFn, Tensor};

/// Broadcast result shape of two operands, or `None` if incompatible
pub fn broadcast_shape(lhs: &[usize], rhs: &[usize]) -> Option<Vec<usize>> {
    let ndim = lhs.len().max(rhs.len());
    let mut shape = vec![0; ndim];
    for i in 0..ndim {
        let l = if i < ndim - lhs.len() { 1 } else { lhs[i - (ndim - lhs.len())] };
        let r = if i < ndim - rhs.len() { 1 } else { rhs[i - (ndim - rhs.len())] };
        shape[i] = match (l, r) {
            (a, b) if a == b => a,
            (1, b) => b,
            (a, 1) => a,
            _ => return None,
        };
    }
    Some(shape)
}

/// Sum a broadcast gradient back down to `shape`
pub(crate) fn reduce_to_shape(grad: ArrayD<f32>, shape: &[usize]) -> ArrayD<f32> {
    let mut grad = grad;
    while grad.ndim() > shape.len() {
        grad = grad.sum_axis(Axis(0));
    }
    for (axis, &dim) in shape.iter().enumerate() {
        if dim == 1 && grad.shape()[axis] != 1 {
            grad = grad.sum_axis(Axis(axis)).insert_axis(Axis(axis));
        }
    }
    grad
}

fn check_broadcast(lhs: &Tensor, rhs: &Tensor) -> Result<()> {
    match broadcast_shape(lhs.shape(), rhs.shape()) {
        Some(_) => Ok(()),
        None => Err(TensorError::ShapeMismatch {
            lhs: lhs.shape().to_vec(),
            rhs: rhs.shape().to_vec(),
        }),
    }
}

fn track(data: ArrayD<f32>, tracked: bool, grad_fn: impl FnOnce() -> Rc<dyn GradFn>) -> Tensor {
    if tracked {
        Tensor::from_op(data, grad_fn())
    } else {
        Tensor::from_array(data)
    }
}

impl Tensor {
    /// Elementwise `self + other`
    pub fn add(&self, other: &Tensor) -> Result<Tensor> {
        check_broadcast(self, other)?;
        let data = self.data() + other.data();
        Ok(track(data, self.requires_grad() || other.requires_grad(), || {
            Rc::new(AddBackward {
                lhs: self.clone(),
                rhs: other.clone(),
            })
        }))
    }

    /// Elementwise `self - other`
    pub fn sub(&self, other: &Tensor) -> Result<Tensor> {
        check_broadcast(self, other)?;
        let data = self.data() - other.data();
        Ok(track(data, self.requires_grad() || other.requires_grad(), || {
            Rc::new(SubBackward {
                lhs: self.clone(),
                rhs: other.clone(),
            })
        }))
    }

    /// Elementwise `self * other`
    pub fn mul(&self, other: &Tensor) -> Result<Tensor> {
        check_broadcast(self, other)?;
        let data = self.data() * other.data();
        Ok(track(data, self.requires_grad() || other.requires_grad(), || {
            Rc::new(MulBackward {
                lhs: self.clone(),
                rhs: other.clone(),
            })
        }))
    }

    /// `self + value`
    pub fn add_scalar(&self, value: f32) -> Tensor {
        let data = self.data() + value;
        track(data, self.requires_grad(), || {
            Rc::new(AddScalarBackward {
                input: self.clone(),
            })
        })
    }

    /// `self * factor`
    pub fn mul_scalar(&self, factor: f32) -> Tensor {
        let data = self.data() * factor;
        track(data, self.requires_grad(), || {
            Rc::new(MulScalarBackward {
                input: self.clone(),
                factor,
            })
        })
    }

    /// `value - self`
    pub fn rsub_scalar(&self, value: f32) -> Tensor {
        let data = self.data().mapv(|x| value - x);
        track(data, self.requires_grad(), || {
            Rc::new(MulScalarBackward {
                input: self.clone(),
                factor: -1.0,
            })
        })
    }

    pub fn neg(&self) -> Tensor {
        self.mul_scalar(-1.0)
    }

    /// Elementwise arctangent
    pub fn atan(&self) -> Tensor {
        let data = self.data().mapv(f32::atan);
        track(data, self.requires_grad(), || {
            Rc::new(AtanBackward {
                input: self.clone(),
            })
        })
    }

    /// Sum of all elements as a zero-dimensional tensor
    pub fn sum(&self) -> Tensor {
        let data = ArrayD::from_elem(IxDyn(&[]), self.data().sum());
        track(data, self.requires_grad(), || {
            Rc::new(SumBackward {
                input: self.clone(),
            })
        })
    }

    /// Same values in a new shape (row-major order)
    pub fn reshape(&self, shape: &[usize]) -> Result<Tensor> {
        let numel = self.numel();
        if shape.iter().product::<usize>() != numel {
            return Err(TensorError::InvalidReshape {
                from: self.shape().to_vec(),
                to: shape.to_vec(),
                numel,
            });
        }
        let data = ArrayD::from_shape_vec(IxDyn(shape), self.to_vec()).map_err(|_| {
            TensorError::InvalidReshape {
                from: self.shape().to_vec(),
                to: shape.to_vec(),
                numel,
            }
        })?;
        Ok(track(data, self.requires_grad(), || {
            Rc::new(ReshapeBackward {
                input: self.clone(),
            })
        }))
    }

    /// Merge the two leading axes: `[A, B, ...]` -> `[A*B, ...]`
    pub fn flatten_leading(&self) -> Result<Tensor> {
        let shape = self.shape();
        if shape.len() < 2 {
            return Err(TensorError::InvalidReshape {
                from: shape.to_vec(),
                to: shape.to_vec(),
                numel: self.numel(),
            });
        }
        let mut merged = vec![shape[0] * shape[1]];
        merged.extend_from_slice(&shape[2..]);
        self.reshape(&merged)
    }

    /// Split the leading axis: `[A*B, ...]` -> `[A, B, ...]` with `A = leading`
    pub fn unflatten_leading(&self, leading: usize) -> Result<Tensor> {
        let shape = self.shape();
        let first = shape.first().copied().unwrap_or(0);
        if leading == 0 || first % leading != 0 {
            return Err(TensorError::InvalidReshape {
                from: shape.to_vec(),
                to: vec![leading],
                numel: self.numel(),
            });
        }
        let mut split = vec![leading, first / leading];
        split.extend_from_slice(&shape[1..]);
        self.reshape(&split)
    }

    /// Slice `index` of the leading axis
    pub fn select(&self, index: usize) -> Result<Tensor> {
        let len = self.shape().first().copied().unwrap_or(0);
        if self.ndim() == 0 || index >= len {
            return Err(TensorError::IndexOutOfBounds { index, len });
        }
        let data = self.data().index_axis(Axis(0), index).to_owned();
        Ok(track(data, self.requires_grad(), || {
            Rc::new(SelectBackward {
                input: self.clone(),
                index,
            })
        }))
    }

    /// Split along the leading axis into its slices, in order
    pub fn unbind(&self) -> Result<Vec<Tensor>> {
        if self.ndim() == 0 {
            return Err(TensorError::IndexOutOfBounds { index: 0, len: 0 });
        }
        (0..self.shape()[0]).map(|t| self.select(t)).collect()
    }

    /// Stack equally shaped tensors along a new leading axis
    pub fn stack(tensors: &[Tensor]) -> Result<Tensor> {
        let first = tensors.first().ok_or(TensorError::EmptyStack)?;
        if let Some(other) = tensors.iter().find(|t| t.shape() != first.shape()) {
            return Err(TensorError::ShapeMismatch {
                lhs: first.shape().to_vec(),
                rhs: other.shape().to_vec(),
            });
        }
        let views: Vec<_> = tensors.iter().map(|t| t.data().view()).collect();
        let data = ndarray::stack(Axis(0), &views).map_err(|_| TensorError::ShapeMismatch {
            lhs: first.shape().to_vec(),
            rhs: first.shape().to_vec(),
        })?;
        let tracked = tensors.iter().any(Tensor::requires_grad);
        Ok(track(data, tracked, || {
            Rc::new(StackBackward {
                inputs: tensors.to_vec(),
            })
        }))
    }
}

struct AddBackward {
    lhs: Tensor,
    rhs: Tensor,
}

impl GradFn for AddBackward {
    fn name(&self) -> &'static str {
        "AddBackward"
    }

    fn inputs(&self) -> Vec<Tensor> {
        vec![self.lhs.clone(), self.rhs.clone()]
    }

    fn backward(&self, grad_output: &ArrayD<f32>) -> Vec<Option<ArrayD<f32>>> {
        vec![
            Some(reduce_to_shape(grad_output.clone(), self.lhs.shape())),
            Some(reduce_to_shape(grad_output.clone(), self.rhs.shape())),
        ]
    }
}

struct SubBackward {
    lhs: Tensor,
    rhs: Tensor,
}

impl GradFn for SubBackward {
    fn name(&self) -> &'static str {
        "SubBackward"
    }

    fn inputs(&self) -> Vec<Tensor> {
        vec![self.lhs.clone(), self.rhs.clone()]
    }

    fn backward(&self, grad_output: &ArrayD<f32>) -> Vec<Option<ArrayD<f32>>> {
        vec![
            Some(reduce_to_shape(grad_output.clone(), self.lhs.shape())),
            Some(reduce_to_shape(-grad_output, self.rhs.shape())),
        ]
    }
}

struct MulBackward {
    lhs: Tensor,
    rhs: Tensor,
}

impl GradFn for MulBackward {
    fn name(&self) -> &'static str {
        "MulBackward"
    }

    fn inputs(&self) -> Vec<Tensor> {
        vec![self.lhs.clone(), self.rhs.clone()]
    }

    fn backward(&self, grad_output: &ArrayD<f32>) -> Vec<Option<ArrayD<f32>>> {
        let grad_lhs = self.lhs.requires_grad().then(|| {
            reduce_to_shape(grad_output * self.rhs.data(), self.lhs.shape())
        });
        let grad_rhs = self.rhs.requires_grad().then(|| {
            reduce_to_shape(grad_output * self.lhs.data(), self.rhs.shape())
        });
        vec![grad_lhs, grad_rhs]
    }
}

struct AddScalarBackward {
    input: Tensor,
}

impl GradFn for AddScalarBackward {
    fn name(&self) -> &'static str {
        "AddScalarBackward"
    }

    fn inputs(&self) -> Vec<Tensor> {
        vec![self.input.clone()]
    }

    fn backward(&self, grad_output: &ArrayD<f32>) -> Vec<Option<ArrayD<f32>>> {
        vec![Some(grad_output.clone())]
    }
}

struct MulScalarBackward {
    input: Tensor,
    factor: f32,
}

impl GradFn for MulScalarBackward {
    fn name(&self) -> &'static str {
        "MulScalarBackward"
    }

    fn inputs(&self) -> Vec<Tensor> {
        vec![self.input.clone()]
    }

    fn backward(&self, grad_output: &ArrayD<f32>) -> Vec<Option<ArrayD<f32>>> {
        vec![Some(grad_output * self.factor)]
    }
}

struct AtanBackward {
    input: Tensor,
}

impl GradFn for AtanBackward {
    fn name(&self) -> &'static str {
        "AtanBackward"
    }

    fn inputs(&self) -> Vec<Tensor> {
        vec![self.input.clone()]
    }

    fn backward(&self, grad_output: &ArrayD<f32>) -> Vec<Option<ArrayD<f32>>> {
        // d/dx atan(x) = 1 / (1 + x^2)
        let local = self.input.data().mapv(|x| 1.0 / (1.0 + x * x));
        vec![Some(grad_output * &local)]
    }
}

struct SumBackward {
    input: Tensor,
}

impl GradFn for SumBackward {
    fn name(&self) -> &'static str {
        "SumBackward"
    }

    fn inputs(&self) -> Vec<Tensor> {
        vec![self.input.clone()]
    }

    fn backward(&self, grad_output: &ArrayD<f32>) -> Vec<Option<ArrayD<f32>>> {
        let g = grad_output.iter().next().copied().unwrap_or(0.0);
        vec![Some(ArrayD::from_elem(self.input.data().raw_dim(), g))]
    }
}

struct ReshapeBackward {
    input: Tensor,
}

impl GradFn for ReshapeBackward {
    fn name(&self) -> &'static str {
        "ReshapeBackward"
    }

    fn inputs(&self) -> Vec<Tensor> {
        vec![self.input.clone()]
    }

    fn backward(&self, grad_output: &ArrayD<f32>) -> Vec<Option<ArrayD<f32>>> {
        let values: Vec<f32> = grad_output.iter().copied().collect();
        let grad = ArrayD::from_shape_vec(self.input.data().raw_dim(), values).ok();
        vec![grad]
    }
}

struct SelectBackward {
    input: Tensor,
    index: usize,
}

impl GradFn for SelectBackward {
    fn name(&self) -> &'static str {
        "SelectBackward"
    }

    fn inputs(&self) -> Vec<Tensor> {
        vec![self.input.clone()]
    }

    fn backward(&self, grad_output: &ArrayD<f32>) -> Vec<Option<ArrayD<f32>>> {
        let mut grad: ArrayD<f32> = ArrayD::zeros(self.input.data().raw_dim());
        grad.index_axis_mut(Axis(0), self.index).assign(grad_output);
        vec![Some(grad)]
    }

    fn leading_slice(&self) -> Option<usize> {
        Some(self.index)
    }
}

struct StackBackward {
    inputs: Vec<Tensor>,
}

impl GradFn for StackBackward {
    fn name(&self) -> &'static str {
        "StackBackward"
    }

    fn inputs(&self) -> Vec<Tensor> {
        self.inputs.clone()
    }

    fn backward(&self, grad_output: &ArrayD<f32>) -> Vec<Option<ArrayD<f32>>> {
        (0..self.inputs.len())
            .map(|i| Some(grad_output.index_axis(Axis(0), i).to_owned()))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn assert_all_close(values: &ArrayD<f32>, expected: f32) {
        for v in values.iter() {
            assert!((v - expected).abs() < 1e-5, "{} != {}", v, expected);
        }
    }

    #[test]
    fn test_broadcast_shape_rules() {
        assert_eq!(broadcast_shape(&[4, 3], &[4, 3]), Some(vec![4, 3]));
        assert_eq!(broadcast_shape(&[4, 3], &[]), Some(vec![4, 3]));
        assert_eq!(broadcast_shape(&[4, 1], &[3]), Some(vec![4, 3]));
        assert_eq!(broadcast_shape(&[4, 3], &[2, 3]), None);
    }

    #[test]
    fn test_incompatible_shapes_error() {
        let a = Tensor::zeros(&[4, 3]);
        let b = Tensor::zeros(&[2, 3]);
        let err = a.add(&b).unwrap_err();
        assert_eq!(
            err,
            TensorError::ShapeMismatch {
                lhs: vec![4, 3],
                rhs: vec![2, 3]
            }
        );
        assert!(a.mul(&b).is_err());
        assert!(a.sub(&b).is_err());
    }

    #[test]
    fn test_broadcast_gradient_reduces_to_operand() {
        let a = Tensor::full(&[2, 3], 2.0).requires_grad_(true);
        let b = Tensor::scalar(5.0).requires_grad_(true);
        let y = a.mul(&b).unwrap();
        assert_eq!(y.shape(), &[2, 3]);
        y.backward().unwrap();

        assert_all_close(&a.grad().unwrap(), 5.0);
        let grad_b = b.grad().unwrap();
        assert_eq!(grad_b.ndim(), 0);
        assert_all_close(&grad_b, 12.0);
    }

    #[test]
    fn test_sub_and_rsub_gradients() {
        let a = Tensor::full(&[3], 1.0).requires_grad_(true);
        let b = Tensor::full(&[3], 4.0).requires_grad_(true);
        a.sub(&b).unwrap().backward().unwrap();
        assert_all_close(&a.grad().unwrap(), 1.0);
        assert_all_close(&b.grad().unwrap(), -1.0);

        let c = Tensor::full(&[3], 0.25).requires_grad_(true);
        let y = c.rsub_scalar(1.0);
        assert_all_close(y.data(), 0.75);
        y.backward().unwrap();
        assert_all_close(&c.grad().unwrap(), -1.0);
    }

    #[test]
    fn test_atan_gradient() {
        let x = Tensor::full(&[1], 2.0).requires_grad_(true);
        x.atan().backward().unwrap();
        assert_all_close(&x.grad().unwrap(), 1.0 / 5.0);
    }

    #[test]
    fn test_select_stack_roundtrip_gradient() {
        let x = Tensor::from_vec(&[3, 2], vec![1.0, 2.0, 3.0, 4.0, 5.0, 6.0])
            .unwrap()
            .requires_grad_(true);
        let slices = x.unbind().unwrap();
        assert_eq!(slices.len(), 3);
        assert_eq!(slices[1].to_vec(), vec![3.0, 4.0]);

        let scaled: Vec<Tensor> = slices
            .iter()
            .enumerate()
            .map(|(t, s)| s.mul_scalar(t as f32))
            .collect();
        let y = Tensor::stack(&scaled).unwrap();
        assert_eq!(y.shape(), &[3, 2]);
        y.sum().backward().unwrap();

        let grad: Vec<f32> = x.grad().unwrap().iter().copied().collect();
        assert_eq!(grad, vec![0.0, 0.0, 1.0, 1.0, 2.0, 2.0]);
    }

    #[test]
    fn test_slice_gradients_share_one_buffer() {
        let x = Tensor::full(&[3, 2], 1.0).requires_grad_(true);
        let doubled = x.mul_scalar(2.0);
        let first = doubled.select(0).unwrap();
        assert_eq!(first.grad_fn().and_then(|f| f.leading_slice()), Some(0));

        // Row 0 reaches `doubled` through the slice and through the broadcast sum
        first.add(&doubled).unwrap().sum().backward().unwrap();
        let grad: Vec<f32> = x.grad().unwrap().iter().copied().collect();
        assert_eq!(grad, vec![8.0, 8.0, 2.0, 2.0, 2.0, 2.0]);
    }

    #[test]
    fn test_select_out_of_bounds() {
        let x = Tensor::zeros(&[2, 2]);
        assert_eq!(
            x.select(2).unwrap_err(),
            TensorError::IndexOutOfBounds { index: 2, len: 2 }
        );
        assert!(Tensor::scalar(1.0).unbind().is_err());
    }

    #[test]
    fn test_stack_rejects_empty_and_ragged() {
        assert_eq!(Tensor::stack(&[]).unwrap_err(), TensorError::EmptyStack);
        let ragged = [Tensor::zeros(&[2]), Tensor::zeros(&[3])];
        assert!(Tensor::stack(&ragged).is_err());
    }

    #[test]
    fn test_flatten_unflatten_leading() {
        let x = Tensor::from_vec(&[2, 3, 1], (0..6).map(|v| v as f32).collect())
            .unwrap()
            .requires_grad_(true);
        let flat = x.flatten_leading().unwrap();
        assert_eq!(flat.shape(), &[6, 1]);
        let back = flat.unflatten_leading(2).unwrap();
        assert_eq!(back.shape(), &[2, 3, 1]);
        assert_eq!(back.to_vec(), x.to_vec());

        back.mul_scalar(2.0).backward().unwrap();
        assert_all_close(&x.grad().unwrap(), 2.0);

        assert!(flat.unflatten_leading(4).is_err());
        assert!(Tensor::zeros(&[3]).flatten_leading().is_err());
    }

    #[test]
    fn test_reshape_rejects_element_count_change() {
        let x = Tensor::zeros(&[2, 3]);
        assert!(x.reshape(&[4]).is_err());
        assert_eq!(x.reshape(&[3, 2]).unwrap().shape(), &[3, 2]);
    }
}
