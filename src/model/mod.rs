//! The hardware-behavior model: constructor callables and their bound
//! arguments.
//!
//! A [`Model`] is a constructor whose elaboration declares wires and
//! concurrent processes and instantiates nested models; it is the unit the
//! hierarchical converter turns into a reusable component definition.

use std::fmt;
use std::sync::Arc;

use crate::deps::arcstr::ArcStr;
use crate::elab::ElabCtx;
use crate::error::Result;

pub mod process;
pub mod wire;

pub use process::{Process, Sensitivity};
pub use wire::{Wire, WireArray};

/// A constructor callable.
///
/// `name` doubles as callee identity for diagnostics and as the default
/// component name; clustering itself compares trait-object pointers, so two
/// distinct models may safely share a name (at the cost of a naming-conflict
/// warning at emission).
pub trait Model: Send + Sync {
    /// The callee name.
    fn name(&self) -> ArcStr;

    /// Declared formal parameter names, in port order.
    fn params(&self) -> Vec<ArcStr>;

    /// Elaborates this model: declare wires and processes on `ctx`,
    /// instantiate sub-models. Runs exactly once per capture pass.
    fn elaborate(&self, ctx: &mut ElabCtx, args: &Bindings) -> Result<()>;
}

/// A bound-argument value.
///
/// Equality is structural: wires and arrays compare by declared shape, never
/// by current value; scalars compare by value and variant.
#[derive(Debug, Clone)]
pub enum Value {
    Wire(Wire),
    Array(WireArray),
    Int(i64),
    Bool(bool),
    Str(ArcStr),
}

impl Value {
    pub fn struct_eq(&self, other: &Value) -> bool {
        match (self, other) {
            (Value::Wire(a), Value::Wire(b)) => a.shape_eq(b),
            (Value::Array(a), Value::Array(b)) => a.shape_eq(b),
            (Value::Int(a), Value::Int(b)) => a == b,
            (Value::Bool(a), Value::Bool(b)) => a == b,
            (Value::Str(a), Value::Str(b)) => a == b,
            _ => false,
        }
    }

    pub fn as_wire(&self) -> Option<&Wire> {
        match self {
            Value::Wire(w) => Some(w),
            _ => None,
        }
    }

    pub fn as_array(&self) -> Option<&WireArray> {
        match self {
            Value::Array(a) => Some(a),
            _ => None,
        }
    }
}

impl From<Wire> for Value {
    fn from(value: Wire) -> Self {
        Self::Wire(value)
    }
}

impl From<&Wire> for Value {
    fn from(value: &Wire) -> Self {
        Self::Wire(value.clone())
    }
}

impl From<WireArray> for Value {
    fn from(value: WireArray) -> Self {
        Self::Array(value)
    }
}

impl From<&WireArray> for Value {
    fn from(value: &WireArray) -> Self {
        Self::Array(value.clone())
    }
}

impl From<i64> for Value {
    fn from(value: i64) -> Self {
        Self::Int(value)
    }
}

impl From<bool> for Value {
    fn from(value: bool) -> Self {
        Self::Bool(value)
    }
}

impl From<&str> for Value {
    fn from(value: &str) -> Self {
        Self::Str(value.into())
    }
}

/// An insertion-ordered map of bound arguments.
#[derive(Clone, Default)]
pub struct Bindings(Vec<(ArcStr, Value)>);

impl Bindings {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(&mut self, name: impl Into<ArcStr>, value: impl Into<Value>) {
        let name = name.into();
        if let Some(slot) = self.0.iter_mut().find(|(n, _)| *n == name) {
            slot.1 = value.into();
        } else {
            self.0.push((name, value.into()));
        }
    }

    /// A consuming method to bind one argument.
    pub fn with(mut self, name: impl Into<ArcStr>, value: impl Into<Value>) -> Self {
        self.set(name, value);
        self
    }

    pub fn get(&self, name: &str) -> Option<&Value> {
        self.0.iter().find(|(n, _)| n == name).map(|(_, v)| v)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.get(name).is_some()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&ArcStr, &Value)> {
        self.0.iter().map(|(n, v)| (n, v))
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl fmt::Debug for Bindings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_map().entries(self.iter()).finish()
    }
}

/// A convenience alias for shared model handles.
pub type ModelRef = Arc<dyn Model>;
