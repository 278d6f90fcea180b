//! Hierarchy capture: one elaboration pass over a model, producing the call
//! tree the hierarchical converter consumes.
//!
//! Model constructors opt in explicitly: every nested call goes through
//! [`ElabCtx::instance`], which builds a self-describing [`InstanceRecord`]
//! for each call that returns a process collection. Calls on the exclusion
//! list elaborate inline without producing a record or deepening the tree.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use indexmap::IndexMap;

use crate::deps::arcstr::ArcStr;
use crate::error::{with_err_context, ErrorContext, Result};
use crate::model::{Bindings, ModelRef, Process, Value, Wire, WireArray};
use crate::session::Session;
use crate::vhdl::fix_reserved;

/// Captured metadata about one nested model invocation.
///
/// Records are immutable after capture and shared by reference; the driver
/// reads them but never mutates them.
pub struct InstanceRecord {
    pub(crate) level: usize,
    pub(crate) name: ArcStr,
    pub(crate) model: ModelRef,
    pub(crate) subs: Vec<(ArcStr, Option<Arc<InstanceRecord>>)>,
    pub(crate) sigs: IndexMap<ArcStr, Wire>,
    pub(crate) mems: IndexMap<ArcStr, WireArray>,
    pub(crate) args: IndexMap<ArcStr, Value>,
    pub(crate) procs: Vec<Process>,
    pub(crate) raws: Vec<ArcStr>,
    pub(crate) consts: IndexMap<ArcStr, i64>,
    pub(crate) enums: IndexMap<ArcStr, Vec<ArcStr>>,
}

impl InstanceRecord {
    #[inline]
    pub fn level(&self) -> usize {
        self.level
    }

    /// The record's identity within the hierarchy: the binding name,
    /// ordinal-suffixed for repeated bindings.
    #[inline]
    pub fn name(&self) -> &ArcStr {
        &self.name
    }

    #[inline]
    pub fn model(&self) -> &ModelRef {
        &self.model
    }

    #[inline]
    pub fn subs(&self) -> &[(ArcStr, Option<Arc<InstanceRecord>>)] {
        &self.subs
    }

    #[inline]
    pub fn sigs(&self) -> &IndexMap<ArcStr, Wire> {
        &self.sigs
    }

    #[inline]
    pub fn mems(&self) -> &IndexMap<ArcStr, WireArray> {
        &self.mems
    }

    #[inline]
    pub fn args(&self) -> &IndexMap<ArcStr, Value> {
        &self.args
    }

    #[inline]
    pub fn procs(&self) -> &[Process] {
        &self.procs
    }

    #[inline]
    pub fn raws(&self) -> &[ArcStr] {
        &self.raws
    }

    /// Pre-order walk of this record and everything below it.
    pub fn subtree(self: &Arc<Self>) -> Vec<Arc<InstanceRecord>> {
        let mut out = Vec::new();
        collect_preorder(self, &mut out);
        out
    }

    /// Whether this record or any descendant carries a raw code block.
    pub fn has_raw_in_subtree(self: &Arc<Self>) -> bool {
        self.subtree().iter().any(|rec| !rec.raws.is_empty())
    }

    /// The bound value for a declared formal, searched across the wire,
    /// array, and scalar tables.
    pub(crate) fn bound_value(&self, param: &str) -> Option<Value> {
        if let Some(wire) = self.sigs.get(param) {
            return Some(Value::Wire(wire.clone()));
        }
        if let Some(arr) = self.mems.get(param) {
            return Some(Value::Array(arr.clone()));
        }
        self.args.get(param).cloned()
    }
}

fn collect_preorder(rec: &Arc<InstanceRecord>, out: &mut Vec<Arc<InstanceRecord>>) {
    out.push(Arc::clone(rec));
    for (_, sub) in rec.subs.iter() {
        if let Some(sub) = sub {
            collect_preorder(sub, out);
        }
    }
}

/// The result of one capture pass: the root record plus a pre-order listing.
pub struct Hierarchy {
    pub(crate) root: Arc<InstanceRecord>,
    pub(crate) records: Vec<Arc<InstanceRecord>>,
}

impl Hierarchy {
    #[inline]
    pub fn root(&self) -> &Arc<InstanceRecord> {
        &self.root
    }

    /// All records in pre-order, root first.
    #[inline]
    pub fn records(&self) -> &[Arc<InstanceRecord>] {
        &self.records
    }
}

/// The mutable state of one record under construction.
struct Frame {
    level: usize,
    name: ArcStr,
    model: ModelRef,
    subs: Vec<(ArcStr, Option<Arc<InstanceRecord>>)>,
    sigs: IndexMap<ArcStr, Wire>,
    mems: IndexMap<ArcStr, WireArray>,
    args: IndexMap<ArcStr, Value>,
    procs: Vec<Process>,
    raws: Vec<ArcStr>,
    consts: IndexMap<ArcStr, i64>,
    enums: IndexMap<ArcStr, Vec<ArcStr>>,
    sub_counts: HashMap<ArcStr, usize>,
}

impl Frame {
    fn new(level: usize, name: ArcStr, model: ModelRef) -> Self {
        Self {
            level,
            name,
            model,
            subs: Vec::new(),
            sigs: IndexMap::new(),
            mems: IndexMap::new(),
            args: IndexMap::new(),
            procs: Vec::new(),
            raws: Vec::new(),
            consts: IndexMap::new(),
            enums: IndexMap::new(),
            sub_counts: HashMap::new(),
        }
    }

    /// A call returning no process collection produces no record.
    fn is_empty_collection(&self) -> bool {
        self.procs.is_empty() && self.raws.is_empty() && self.subs.iter().all(|(_, s)| s.is_none())
    }

    fn unique_sub_name(&mut self, binding: &str) -> ArcStr {
        let count = self.sub_counts.entry(binding.into()).or_insert(0);
        let name = if *count == 0 {
            ArcStr::from(binding)
        } else {
            arcstr::format!("{binding}_{count}")
        };
        *count += 1;
        name
    }

    fn into_record(self) -> InstanceRecord {
        InstanceRecord {
            level: self.level,
            name: self.name,
            model: self.model,
            subs: self.subs,
            sigs: self.sigs,
            mems: self.mems,
            args: self.args,
            procs: self.procs,
            raws: self.raws,
            consts: self.consts,
            enums: self.enums,
        }
    }
}

/// Runs a single elaboration pass and captures the call hierarchy.
///
/// Session mutation during capture is transient (name suffixes only); the
/// driver's snapshot/restore brackets any re-elaboration.
pub struct Elaborator<'s> {
    session: &'s mut Session,
    skip: HashSet<ArcStr>,
    used_names: HashSet<ArcStr>,
}

impl<'s> Elaborator<'s> {
    pub fn new(session: &'s mut Session) -> Self {
        Self {
            session,
            skip: HashSet::new(),
            used_names: HashSet::new(),
        }
    }

    /// Marks model names as framework-internal: calls to them elaborate
    /// inline, without a record and without deepening the hierarchy.
    pub fn skip_names<I, S>(mut self, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<ArcStr>,
    {
        self.skip.extend(names.into_iter().map(Into::into));
        self
    }

    pub fn capture(mut self, model: &ModelRef, args: &Bindings) -> Result<Hierarchy> {
        let mut frame = Frame::new(1, model.name(), Arc::clone(model));
        self.bind_args(&mut frame, model, args, true);
        {
            let mut ctx = ElabCtx {
                elab: &mut self,
                frame: &mut frame,
            };
            with_err_context(model.elaborate(&mut ctx, args), || ErrorContext::Elaborate {
                model: model.name(),
            })?;
        }
        let root = Arc::new(frame.into_record());
        let records = root.subtree();
        Ok(Hierarchy { root, records })
    }

    /// Records bound arguments into a frame. At the root, wire and array
    /// arguments are renamed to their (reserved-fixed) formal names: this is
    /// the conversion interface, and statement text rendered later during
    /// elaboration must agree with the declared port names.
    fn bind_args(&mut self, frame: &mut Frame, model: &ModelRef, args: &Bindings, root: bool) {
        let params = model.params();
        for (name, value) in args.iter() {
            match value {
                Value::Wire(wire) => {
                    if root {
                        let fixed = fix_reserved(name);
                        if fixed != *name {
                            log::debug!("renaming bound argument `{name}` to `{fixed}`");
                        }
                        wire.set_name(fixed.clone());
                        self.used_names.insert(fixed);
                    }
                    frame.sigs.insert(name.clone(), wire.clone());
                }
                Value::Array(arr) => {
                    if root {
                        let fixed = fix_reserved(name);
                        arr.set_name(fixed.clone());
                        self.used_names.insert(fixed);
                    }
                    frame.mems.insert(name.clone(), arr.clone());
                }
                other => {
                    if params.iter().any(|p| p == name) {
                        frame.args.insert(name.clone(), other.clone());
                    } else {
                        log::debug!(
                            "ignoring undeclared scalar binding `{name}` for `{}`",
                            model.name()
                        );
                    }
                }
            }
        }
    }

    fn unique_wire_name(&mut self, name: &str) -> ArcStr {
        if !self.used_names.contains(name) {
            let name = ArcStr::from(name);
            self.used_names.insert(name.clone());
            return name;
        }
        loop {
            let suffix = self.session.unique_suffix();
            let candidate = arcstr::format!("{name}_{suffix}");
            if !self.used_names.contains(&candidate) {
                self.used_names.insert(candidate.clone());
                return candidate;
            }
        }
    }
}

/// The builder handed to [`crate::model::Model::elaborate`].
pub struct ElabCtx<'e, 's> {
    elab: &'e mut Elaborator<'s>,
    frame: &'e mut Frame,
}

impl<'e, 's> ElabCtx<'e, 's> {
    /// Declares a local wire. The name is uniquified against every name
    /// already used in this capture pass.
    pub fn wire(&mut self, name: &str, width: usize) -> Wire {
        self.wire_with_init(name, width, 0)
    }

    pub fn wire_with_init(&mut self, name: &str, width: usize, init: u64) -> Wire {
        let name = self.elab.unique_wire_name(name);
        let wire = Wire::with_init(name.clone(), width, init);
        self.frame.sigs.insert(name, wire.clone());
        wire
    }

    /// Declares a local array of `len` wires of `width` bits each.
    pub fn wire_array(&mut self, name: &str, width: usize, len: usize) -> WireArray {
        let name = self.elab.unique_wire_name(name);
        let arr = WireArray::new(name.clone(), width, len);
        self.frame.mems.insert(name, arr.clone());
        arr
    }

    /// Adds a concurrent process to this call's collection.
    pub fn add_process(&mut self, process: Process) {
        self.frame.procs.push(process);
    }

    /// Adds a raw target-language block. Raw code is emitted verbatim by the
    /// flat generator; in hierarchical mode its owning instance falls back to
    /// inline emission.
    pub fn raw_code(&mut self, code: impl Into<ArcStr>) {
        self.frame.raws.push(code.into());
    }

    /// Declares a named integer constant.
    pub fn constant(&mut self, name: impl Into<ArcStr>, value: i64) {
        self.frame.consts.insert(name.into(), value);
    }

    /// Declares an enumerated type.
    pub fn enum_type<I, S>(&mut self, name: impl Into<ArcStr>, variants: I)
    where
        I: IntoIterator<Item = S>,
        S: Into<ArcStr>,
    {
        self.frame
            .enums
            .insert(name.into(), variants.into_iter().map(Into::into).collect());
    }

    /// Elaborates a nested model under `binding`.
    ///
    /// Excluded (framework-internal) models elaborate into the current
    /// record: no depth increment, no record. A call whose elaboration
    /// produces no process collection is recorded as `(binding, None)`.
    pub fn instance(&mut self, binding: &str, model: &ModelRef, args: Bindings) -> Result<()> {
        if self.elab.skip.contains(&model.name()) {
            return with_err_context(model.elaborate(self, &args), || ErrorContext::Elaborate {
                model: model.name(),
            });
        }

        let name = self.frame.unique_sub_name(binding);
        let mut frame = Frame::new(self.frame.level + 1, name, Arc::clone(model));
        self.elab.bind_args(&mut frame, model, &args, false);
        {
            let mut ctx = ElabCtx {
                elab: &mut *self.elab,
                frame: &mut frame,
            };
            with_err_context(model.elaborate(&mut ctx, &args), || ErrorContext::Elaborate {
                model: model.name(),
            })?;
        }

        if frame.is_empty_collection() {
            log::debug!(
                "call to `{}` under binding `{binding}` produced no processes; no record",
                model.name()
            );
            self.frame.subs.push((binding.into(), None));
        } else {
            let rec = Arc::new(frame.into_record());
            self.frame.subs.push((binding.into(), Some(rec)));
        }
        Ok(())
    }
}
