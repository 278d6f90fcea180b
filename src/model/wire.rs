//! Wires and wire arrays: the named reactive values connecting processes.

use std::fmt;
use std::sync::{Arc, RwLock};

use crate::deps::arcstr::ArcStr;

/// A single named wire with a declared bit width.
///
/// Wires are cheaply cloneable references: a wire bound into a nested
/// constructor call is the *same* wire the parent declared. Identity is
/// pointer identity ([`Wire::same_wire`]); structural comparison is by
/// declared width only ([`Wire::shape_eq`]), never by value.
#[derive(Clone)]
pub struct Wire(Arc<WireData>);

struct WireData {
    name: RwLock<ArcStr>,
    width: usize,
    init: u64,
}

impl Wire {
    pub fn new(name: impl Into<ArcStr>, width: usize) -> Self {
        Self::with_init(name, width, 0)
    }

    pub fn with_init(name: impl Into<ArcStr>, width: usize, init: u64) -> Self {
        assert!(width > 0, "wire width must be nonzero");
        Self(Arc::new(WireData {
            name: RwLock::new(name.into()),
            width,
            init,
        }))
    }

    /// A fresh zero-valued wire of identical width.
    pub fn zero_like(&self, name: impl Into<ArcStr>) -> Self {
        Self::with_init(name, self.width(), 0)
    }

    pub fn name(&self) -> ArcStr {
        self.0.name.read().unwrap().clone()
    }

    pub(crate) fn set_name(&self, name: impl Into<ArcStr>) {
        *self.0.name.write().unwrap() = name.into();
    }

    #[inline]
    pub fn width(&self) -> usize {
        self.0.width
    }

    #[inline]
    pub fn init(&self) -> u64 {
        self.0.init
    }

    /// Stable identity for use as a map key.
    #[inline]
    pub fn id(&self) -> usize {
        Arc::as_ptr(&self.0) as usize
    }

    /// Whether `self` and `other` are the same underlying wire.
    #[inline]
    pub fn same_wire(&self, other: &Wire) -> bool {
        Arc::ptr_eq(&self.0, &other.0)
    }

    /// Structural equality: declared width only.
    #[inline]
    pub fn shape_eq(&self, other: &Wire) -> bool {
        self.width() == other.width()
    }
}

impl fmt::Debug for Wire {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Wire")
            .field("name", &self.name())
            .field("width", &self.width())
            .finish()
    }
}

/// An indexed collection of wires declared as one aggregate.
///
/// Elements are real wires named `name(i)` so statement text can reference
/// them with VHDL indexing syntax.
#[derive(Clone)]
pub struct WireArray(Arc<WireArrayData>);

struct WireArrayData {
    name: RwLock<ArcStr>,
    wires: Vec<Wire>,
}

impl WireArray {
    pub fn new(name: impl Into<ArcStr>, width: usize, len: usize) -> Self {
        let name = name.into();
        assert!(len > 0, "wire array must be nonempty");
        let wires = (0..len)
            .map(|i| Wire::new(arcstr::format!("{name}({i})"), width))
            .collect();
        Self(Arc::new(WireArrayData {
            name: RwLock::new(name),
            wires,
        }))
    }

    /// A fresh zero-valued array of identical shape.
    pub fn zero_like(&self, name: impl Into<ArcStr>) -> Self {
        Self::new(name, self.elem_width(), self.len())
    }

    pub fn name(&self) -> ArcStr {
        self.0.name.read().unwrap().clone()
    }

    pub(crate) fn set_name(&self, name: impl Into<ArcStr>) {
        let name = name.into();
        for (i, wire) in self.0.wires.iter().enumerate() {
            wire.set_name(arcstr::format!("{name}({i})"));
        }
        *self.0.name.write().unwrap() = name;
    }

    pub fn get(&self, idx: usize) -> Wire {
        self.0.wires[idx].clone()
    }

    #[inline]
    pub fn wires(&self) -> &[Wire] {
        &self.0.wires
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.0.wires.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.0.wires.is_empty()
    }

    pub fn elem_width(&self) -> usize {
        self.0.wires[0].width()
    }

    #[inline]
    pub fn id(&self) -> usize {
        Arc::as_ptr(&self.0) as usize
    }

    #[inline]
    pub fn same_array(&self, other: &WireArray) -> bool {
        Arc::ptr_eq(&self.0, &other.0)
    }

    /// Structural equality: element count and element width.
    pub fn shape_eq(&self, other: &WireArray) -> bool {
        self.len() == other.len() && self.elem_width() == other.elem_width()
    }
}

impl fmt::Debug for WireArray {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WireArray")
            .field("name", &self.name())
            .field("len", &self.len())
            .field("elem_width", &self.elem_width())
            .finish()
    }
}
