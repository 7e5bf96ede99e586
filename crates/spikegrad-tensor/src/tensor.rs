// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

//! # Tensor Handle and Backward Engine
//!
//! A [`Tensor`] is a cheap, reference-counted handle to an immutable
//! `ArrayD<f32>` plus the autodiff bookkeeping for it:
//!
//! ```text
//! Tensor ──► TensorCell
//!              ├── data           (never mutated after creation)
//!              ├── requires_grad
//!              ├── grad           (accumulated on leaves only)
//!              └── grad_fn ──► GradFn (inputs + local backward rule)
//! ```
//!
//! Operations never write into an existing tensor; they return a new handle
//! whose `grad_fn` points back at the operands. `backward()` walks that graph
//! in reverse topological order and accumulates gradients into leaves.
//!
//! Handles are `Rc`-based and therefore `!Send`: one graph belongs to one
//! thread.

use std::cell::{Cell, RefCell};
use std::fmt;
use std::rc::Rc;

use ahash::{AHashMap, AHashSet};
use ndarray::{ArrayD, Axis, IxDyn};
use tracing::trace;

use crate::error::{Result, TensorError};

/// Local backward rule of a recorded operation
pub(crate) trait GradFn {
    /// Operation name, surfaced through [`Tensor::grad_fn_name`]
    fn name(&self) -> &'static str;

    /// Operands the rule propagates into, in the order `backward` answers
    fn inputs(&self) -> Vec<Tensor>;

    /// Gradient for each input given the gradient of the output.
    /// `None` means "no gradient flows into this input".
    fn backward(&self, grad_output: &ArrayD<f32>) -> Vec<Option<ArrayD<f32>>>;

    /// Leading-axis index when the output is one slice of its single input.
    ///
    /// The engine then adds the gradient straight into that slice of the
    /// input's pending buffer instead of materializing a full-size gradient.
    fn leading_slice(&self) -> Option<usize> {
        None
    }
}

struct TensorCell {
    data: ArrayD<f32>,
    requires_grad: Cell<bool>,
    grad: RefCell<Option<ArrayD<f32>>>,
    grad_fn: RefCell<Option<Rc<dyn GradFn>>>,
}

/// Reference-counted tensor with optional gradient tracking
#[derive(Clone)]
pub struct Tensor {
    cell: Rc<TensorCell>,
}

impl Tensor {
    /// Wrap an array as a leaf tensor that does not track gradients
    pub fn from_array(data: ArrayD<f32>) -> Self {
        Self {
            cell: Rc::new(TensorCell {
                data,
                requires_grad: Cell::new(false),
                grad: RefCell::new(None),
                grad_fn: RefCell::new(None),
            }),
        }
    }

    /// Result of a recorded operation
    pub(crate) fn from_op(data: ArrayD<f32>, grad_fn: Rc<dyn GradFn>) -> Self {
        Self {
            cell: Rc::new(TensorCell {
                data,
                requires_grad: Cell::new(true),
                grad: RefCell::new(None),
                grad_fn: RefCell::new(Some(grad_fn)),
            }),
        }
    }

    /// Build a tensor from a shape and row-major values
    pub fn from_vec(shape: &[usize], values: Vec<f32>) -> Result<Self> {
        let numel = values.len();
        ArrayD::from_shape_vec(IxDyn(shape), values)
            .map(Self::from_array)
            .map_err(|_| TensorError::InvalidReshape {
                from: vec![numel],
                to: shape.to_vec(),
                numel,
            })
    }

    /// Zero-dimensional tensor holding one value
    pub fn scalar(value: f32) -> Self {
        Self::from_array(ArrayD::from_elem(IxDyn(&[]), value))
    }

    /// Tensor of `shape` filled with `value`
    pub fn full(shape: &[usize], value: f32) -> Self {
        Self::from_array(ArrayD::from_elem(IxDyn(shape), value))
    }

    pub fn zeros(shape: &[usize]) -> Self {
        Self::full(shape, 0.0)
    }

    pub fn ones(shape: &[usize]) -> Self {
        Self::full(shape, 1.0)
    }

    /// Underlying values
    pub fn data(&self) -> &ArrayD<f32> {
        &self.cell.data
    }

    pub fn shape(&self) -> &[usize] {
        self.cell.data.shape()
    }

    pub fn ndim(&self) -> usize {
        self.cell.data.ndim()
    }

    pub fn numel(&self) -> usize {
        self.cell.data.len()
    }

    /// Values in logical (row-major) order
    pub fn to_vec(&self) -> Vec<f32> {
        self.cell.data.iter().copied().collect()
    }

    /// The single value of a one-element tensor
    pub fn item(&self) -> Result<f32> {
        if self.numel() != 1 {
            return Err(TensorError::NotScalar(self.shape().to_vec()));
        }
        self.cell
            .data
            .iter()
            .next()
            .copied()
            .ok_or_else(|| TensorError::NotScalar(self.shape().to_vec()))
    }

    pub fn requires_grad(&self) -> bool {
        self.cell.requires_grad.get()
    }

    /// Enable or disable gradient tracking on this handle (builder style)
    pub fn requires_grad_(self, requires_grad: bool) -> Self {
        self.cell.requires_grad.set(requires_grad);
        self
    }

    /// A tensor is a leaf when no operation produced it
    pub fn is_leaf(&self) -> bool {
        self.cell.grad_fn.borrow().is_none()
    }

    /// Name of the operation that produced this tensor, if it is tracked
    pub fn grad_fn_name(&self) -> Option<&'static str> {
        self.cell.grad_fn.borrow().as_ref().map(|f| f.name())
    }

    pub(crate) fn grad_fn(&self) -> Option<Rc<dyn GradFn>> {
        self.cell.grad_fn.borrow().clone()
    }

    /// Accumulated gradient (leaves only)
    pub fn grad(&self) -> Option<ArrayD<f32>> {
        self.cell.grad.borrow().clone()
    }

    pub fn zero_grad(&self) {
        *self.cell.grad.borrow_mut() = None;
    }

    /// New graph-free tensor with the same values
    pub fn detach(&self) -> Tensor {
        Tensor::from_array(self.cell.data.clone())
    }

    /// Sever this tensor from its graph in place; values are untouched.
    ///
    /// Anything already computed from this tensor stops propagating
    /// gradient through it.
    pub fn detach_(&self) {
        *self.cell.grad_fn.borrow_mut() = None;
        self.cell.requires_grad.set(false);
    }

    /// Independent copy: same values and `requires_grad` flag, no history
    pub fn deep_copy(&self) -> Tensor {
        Tensor::from_array(self.cell.data.clone()).requires_grad_(self.requires_grad())
    }

    /// True when both handles refer to the same tensor
    pub fn ptr_eq(&self, other: &Tensor) -> bool {
        Rc::ptr_eq(&self.cell, &other.cell)
    }

    fn id(&self) -> usize {
        Rc::as_ptr(&self.cell) as *const () as usize
    }

    /// Backpropagate from this tensor seeded with ones.
    ///
    /// For a non-scalar tensor this equals backpropagating from `self.sum()`.
    pub fn backward(&self) -> Result<()> {
        let seed = ArrayD::from_elem(self.cell.data.raw_dim(), 1.0);
        self.backward_with(seed)
    }

    /// Backpropagate an explicit upstream gradient
    pub fn backward_with(&self, grad_output: ArrayD<f32>) -> Result<()> {
        if grad_output.shape() != self.shape() {
            return Err(TensorError::GradientShapeMismatch {
                expected: self.shape().to_vec(),
                actual: grad_output.shape().to_vec(),
            });
        }
        if !self.requires_grad() {
            return Ok(());
        }

        let order = self.topological_order();
        trace!(nodes = order.len(), "running backward pass");

        let mut pending: AHashMap<usize, ArrayD<f32>> = AHashMap::new();
        pending.insert(self.id(), grad_output);

        for tensor in order.iter().rev() {
            let Some(grad) = pending.remove(&tensor.id()) else {
                continue;
            };
            match tensor.grad_fn() {
                Some(grad_fn) => {
                    if let Some(index) = grad_fn.leading_slice() {
                        for input in grad_fn.inputs().iter().filter(|t| t.requires_grad()) {
                            let acc = pending
                                .entry(input.id())
                                .or_insert_with(|| ArrayD::zeros(input.data().raw_dim()));
                            let mut slot = acc.index_axis_mut(Axis(0), index);
                            slot += &grad;
                        }
                        continue;
                    }
                    let inputs = grad_fn.inputs();
                    let input_grads = grad_fn.backward(&grad);
                    for (input, input_grad) in inputs.iter().zip(input_grads) {
                        let Some(input_grad) = input_grad else {
                            continue;
                        };
                        if !input.requires_grad() {
                            continue;
                        }
                        match pending.get_mut(&input.id()) {
                            Some(acc) => *acc += &input_grad,
                            None => {
                                pending.insert(input.id(), input_grad);
                            }
                        }
                    }
                }
                None => tensor.accumulate_grad(grad),
            }
        }
        Ok(())
    }

    fn accumulate_grad(&self, grad: ArrayD<f32>) {
        if !self.requires_grad() {
            return;
        }
        let mut slot = self.cell.grad.borrow_mut();
        match slot.as_mut() {
            Some(existing) => *existing += &grad,
            None => *slot = Some(grad),
        }
    }

    /// Post-order over tracked tensors reachable from `self` (inputs first)
    fn topological_order(&self) -> Vec<Tensor> {
        let mut order = Vec::new();
        let mut visited = AHashSet::new();
        let mut stack = vec![(self.clone(), false)];

        while let Some((tensor, expanded)) = stack.pop() {
            if expanded {
                order.push(tensor);
                continue;
            }
            if !visited.insert(tensor.id()) {
                continue;
            }
            stack.push((tensor.clone(), true));
            if let Some(grad_fn) = tensor.grad_fn() {
                for input in grad_fn.inputs() {
                    if input.requires_grad() && !visited.contains(&input.id()) {
                        stack.push((input, false));
                    }
                }
            }
        }
        order
    }
}

impl PartialEq for Tensor {
    /// Value equality (shape and elements); gradient state is ignored
    fn eq(&self, other: &Self) -> bool {
        self.cell.data == other.cell.data
    }
}

impl fmt::Debug for Tensor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Tensor")
            .field("shape", &self.shape())
            .field("data", &self.cell.data.as_slice_memory_order())
            .field("requires_grad", &self.requires_grad())
            .field("grad_fn", &self.grad_fn_name())
            .finish()
    }
}

impl From<ArrayD<f32>> for Tensor {
    fn from(data: ArrayD<f32>) -> Self {
        Tensor::from_array(data)
    }
}
