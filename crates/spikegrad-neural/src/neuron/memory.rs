// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

//! # Recurrent State Registry
//!
//! Every piece of state that a neuron carries from one time step to the next
//! lives here, under a name. Each entry remembers the value it was registered
//! with so that [`StateRegistry::reset`] can start a fresh sequence.
//!
//! ```text
//! name │ current value            │ reset value
//! ─────┼──────────────────────────┼────────────────
//! "v"  │ Tensor [4, 3] (tracked)  │ Scalar(0.0)
//! ```
//!
//! Entries keep registration order, so iteration is deterministic.

use spikegrad_tensor::Tensor;
use tracing::trace;

use crate::error::{NeuralError, Result};

/// A recurrent state value: a scalar placeholder or a tensor
#[derive(Debug, Clone, PartialEq)]
pub enum MemoryValue {
    Scalar(f32),
    Tensor(Tensor),
}

impl MemoryValue {
    /// Copy that shares no storage or graph history with `self`
    pub fn deep_copy(&self) -> MemoryValue {
        match self {
            MemoryValue::Scalar(value) => MemoryValue::Scalar(*value),
            MemoryValue::Tensor(tensor) => MemoryValue::Tensor(tensor.deep_copy()),
        }
    }

    pub fn as_tensor(&self) -> Option<&Tensor> {
        match self {
            MemoryValue::Tensor(tensor) => Some(tensor),
            MemoryValue::Scalar(_) => None,
        }
    }

    pub fn as_scalar(&self) -> Option<f32> {
        match self {
            MemoryValue::Scalar(value) => Some(*value),
            MemoryValue::Tensor(_) => None,
        }
    }

    pub fn is_tensor(&self) -> bool {
        matches!(self, MemoryValue::Tensor(_))
    }
}

impl From<f32> for MemoryValue {
    fn from(value: f32) -> Self {
        MemoryValue::Scalar(value)
    }
}

impl From<Tensor> for MemoryValue {
    fn from(tensor: Tensor) -> Self {
        MemoryValue::Tensor(tensor)
    }
}

#[derive(Debug, Clone)]
struct MemorySlot {
    name: String,
    current: MemoryValue,
    reset_value: MemoryValue,
}

/// Ordered map of recurrent state names to current and reset values
///
/// Cloning yields an independent registry: assignments on the clone never
/// reach the original. Tensor handles are shared until reassigned.
#[derive(Debug, Clone, Default)]
pub struct StateRegistry {
    slots: Vec<MemorySlot>,
}

impl StateRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    fn slot(&self, name: &str) -> Result<&MemorySlot> {
        self.slots
            .iter()
            .find(|slot| slot.name == name)
            .ok_or_else(|| NeuralError::MemoryNotRegistered(name.to_string()))
    }

    fn slot_mut(&mut self, name: &str) -> Result<&mut MemorySlot> {
        self.slots
            .iter_mut()
            .find(|slot| slot.name == name)
            .ok_or_else(|| NeuralError::MemoryNotRegistered(name.to_string()))
    }

    /// Register a new recurrent state; `value` also becomes its reset value
    ///
    /// # Errors
    /// `NeuralError::MemoryAlreadyRegistered` if `name` is taken
    pub fn register_memory(&mut self, name: &str, value: impl Into<MemoryValue>) -> Result<()> {
        if self.contains(name) {
            return Err(NeuralError::MemoryAlreadyRegistered(name.to_string()));
        }
        let current = value.into();
        let reset_value = current.deep_copy();
        self.slots.push(MemorySlot {
            name: name.to_string(),
            current,
            reset_value,
        });
        trace!(memory = name, "registered recurrent state");
        Ok(())
    }

    pub fn get_memory(&self, name: &str) -> Result<&MemoryValue> {
        self.slot(name).map(|slot| &slot.current)
    }

    /// Overwrite the current value of a registered state
    pub fn set_memory(&mut self, name: &str, value: impl Into<MemoryValue>) -> Result<()> {
        self.slot_mut(name)?.current = value.into();
        Ok(())
    }

    /// Replace the value `reset` restores (stored as a deep copy)
    pub fn set_reset_value(&mut self, name: &str, value: impl Into<MemoryValue>) -> Result<()> {
        self.slot_mut(name)?.reset_value = value.into().deep_copy();
        Ok(())
    }

    /// Drop a state together with its reset value, returning the current value
    pub fn remove_memory(&mut self, name: &str) -> Result<MemoryValue> {
        let index = self
            .slots
            .iter()
            .position(|slot| slot.name == name)
            .ok_or_else(|| NeuralError::MemoryNotRegistered(name.to_string()))?;
        Ok(self.slots.remove(index).current)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.slots.iter().any(|slot| slot.name == name)
    }

    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    /// Restore every state to a fresh deep copy of its reset value
    pub fn reset(&mut self) {
        for slot in &mut self.slots {
            slot.current = slot.reset_value.deep_copy();
        }
    }

    /// Cut every tensor state out of its autodiff graph, in place
    pub fn detach(&mut self) {
        for slot in &self.slots {
            if let MemoryValue::Tensor(tensor) = &slot.current {
                tensor.detach_();
            }
        }
    }

    /// Replace every tensor state with `transform(state)`; scalars are skipped
    pub fn relocate(&mut self, transform: &mut dyn FnMut(&Tensor) -> Tensor) {
        for slot in &mut self.slots {
            if let MemoryValue::Tensor(tensor) = &slot.current {
                slot.current = MemoryValue::Tensor(transform(tensor));
            }
        }
    }

    /// `(name, current value)` pairs in registration order
    pub fn named_memories(&self) -> impl Iterator<Item = (&str, &MemoryValue)> + '_ {
        self.slots
            .iter()
            .map(|slot| (slot.name.as_str(), &slot.current))
    }

    pub fn memories(&self) -> impl Iterator<Item = &MemoryValue> + '_ {
        self.slots.iter().map(|slot| &slot.current)
    }
}
