//! The codegen session: bookkeeping shared by every generation pass of one
//! conversion request.
//!
//! The baseline generator is not reentrant with respect to this state: it
//! mutates the unique-name counter and the constant table as a side effect of
//! emission. The driver brackets every nested generation with
//! [`Session::snapshot`]/[`Session::restore`]. The enumerated-type registry is
//! deliberately exempt: a type introduced by a nested generation stays visible
//! to siblings and to the parent, so `restore` never rolls it back.

use indexmap::{IndexMap, IndexSet};

use crate::deps::arcstr::ArcStr;

#[derive(Debug, Clone, Default)]
pub struct Session {
    name_counter: usize,
    constants: IndexMap<ArcStr, i64>,
    enum_types: IndexMap<ArcStr, Vec<ArcStr>>,
}

/// The restorable part of a [`Session`]: the counter and the constant table.
#[derive(Debug, Clone)]
pub struct SessionSnapshot {
    name_counter: usize,
    constants: IndexMap<ArcStr, i64>,
}

impl Session {
    #[inline]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the next unique-name suffix.
    pub fn unique_suffix(&mut self) -> usize {
        self.name_counter += 1;
        self.name_counter
    }

    #[inline]
    pub fn name_counter(&self) -> usize {
        self.name_counter
    }

    pub fn declare_constant(&mut self, name: impl Into<ArcStr>, value: i64) {
        self.constants.insert(name.into(), value);
    }

    #[inline]
    pub fn constants(&self) -> &IndexMap<ArcStr, i64> {
        &self.constants
    }

    /// Registers an enumerated type. Returns `false` if a type with this name
    /// was already visible (the caller should not re-declare it).
    pub fn declare_enum(&mut self, name: impl Into<ArcStr>, variants: Vec<ArcStr>) -> bool {
        let name = name.into();
        if self.enum_types.contains_key(&name) {
            return false;
        }
        self.enum_types.insert(name, variants);
        true
    }

    #[inline]
    pub fn enum_types(&self) -> &IndexMap<ArcStr, Vec<ArcStr>> {
        &self.enum_types
    }

    pub fn enum_names(&self) -> IndexSet<ArcStr> {
        self.enum_types.keys().cloned().collect()
    }

    pub fn snapshot(&self) -> SessionSnapshot {
        SessionSnapshot {
            name_counter: self.name_counter,
            constants: self.constants.clone(),
        }
    }

    /// Restores the counter and constant table. The enumerated-type registry
    /// is left untouched: types merge additively across nested generations.
    pub fn restore(&mut self, snapshot: SessionSnapshot) {
        self.name_counter = snapshot.name_counter;
        self.constants = snapshot.constants;
    }
}
