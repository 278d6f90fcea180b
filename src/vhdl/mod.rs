//! The baseline flat VHDL generator.
//!
//! Renders one module from a fully elaborated signal/process list. The
//! declaration and body stages are routed through the [`EmitHooks`] seam so
//! the hierarchical driver can prepend component declarations, filter
//! discarded signals, and append structural instantiations without the flat
//! generator knowing about hierarchy.

use std::collections::HashSet;

use serde::{Deserialize, Serialize};

use crate::deps::arcstr::ArcStr;
use crate::elab::{Elaborator, Hierarchy};
use crate::error::Result;
use crate::model::{Bindings, ModelRef, Process, Wire, WireArray};
use crate::session::Session;

pub(crate) mod format;

pub use format::{fix_leading, fix_reserved, is_reserved};

/// An enumeration of port directions.
#[derive(Clone, Copy, Eq, PartialEq, Hash, Debug, Serialize, Deserialize)]
pub enum Direction {
    In,
    Out,
}

impl Direction {
    fn as_str(&self) -> &'static str {
        match self {
            Self::In => "in",
            Self::Out => "out",
        }
    }
}

#[derive(Debug, Clone)]
pub(crate) enum PortShape {
    Wire { width: usize },
    Array { width: usize, len: usize },
}

/// One entry of a module's port list.
#[derive(Debug, Clone)]
pub struct PortDecl {
    pub(crate) name: ArcStr,
    pub(crate) dir: Direction,
    pub(crate) shape: PortShape,
}

impl PortDecl {
    #[inline]
    pub fn name(&self) -> &ArcStr {
        &self.name
    }

    #[inline]
    pub fn direction(&self) -> Direction {
        self.dir
    }
}

/// The emitted module's interface: name plus ordered port list.
#[derive(Debug, Clone)]
pub struct ModuleIntf {
    pub(crate) name: ArcStr,
    pub(crate) ports: Vec<PortDecl>,
}

impl ModuleIntf {
    #[inline]
    pub fn name(&self) -> &ArcStr {
        &self.name
    }

    #[inline]
    pub fn ports(&self) -> &[PortDecl] {
        &self.ports
    }

    pub fn port_names(&self) -> Vec<ArcStr> {
        self.ports.iter().map(|p| p.name.clone()).collect()
    }
}

/// The fully elaborated flat view of one captured hierarchy: everything the
/// emission stages need, with process and raw-code items tagged by their
/// owning record so the hierarchical hooks can prune them.
pub struct FlatDesign {
    pub(crate) intf: ModuleIntf,
    pub(crate) sigs: Vec<Wire>,
    pub(crate) mems: Vec<WireArray>,
    pub(crate) procs: Vec<(ArcStr, Process)>,
    pub(crate) raws: Vec<(ArcStr, ArcStr)>,
    pub(crate) consts: Vec<(ArcStr, i64)>,
    pub(crate) enums: Vec<(ArcStr, Vec<ArcStr>)>,
}

impl FlatDesign {
    pub(crate) fn build(hier: &Hierarchy, name: ArcStr) -> Self {
        let root = hier.root();
        let params = root.model().params();

        // Wires driven anywhere in the tree drive port directions.
        let mut driven: HashSet<usize> = HashSet::new();
        for rec in hier.records() {
            for proc in rec.procs() {
                for wire in proc.drives() {
                    driven.insert(wire.id());
                }
            }
        }

        // Array elements are declared through their aggregate, never as
        // standalone signals, even when a nested call binds one directly.
        let mut elem_ids: HashSet<usize> = HashSet::new();
        for rec in hier.records() {
            for arr in rec.mems().values() {
                for wire in arr.wires() {
                    elem_ids.insert(wire.id());
                }
            }
        }

        let mut ports = Vec::new();
        let mut port_sig_ids = HashSet::new();
        let mut port_mem_ids = HashSet::new();
        for param in params.iter() {
            if let Some(wire) = root.sigs().get(param.as_str()) {
                port_sig_ids.insert(wire.id());
                ports.push(PortDecl {
                    name: wire.name(),
                    dir: if driven.contains(&wire.id()) {
                        Direction::Out
                    } else {
                        Direction::In
                    },
                    shape: PortShape::Wire {
                        width: wire.width(),
                    },
                });
            } else if let Some(arr) = root.mems().get(param.as_str()) {
                port_mem_ids.insert(arr.id());
                let out = arr.wires().iter().any(|w| driven.contains(&w.id()));
                ports.push(PortDecl {
                    name: arr.name(),
                    dir: if out { Direction::Out } else { Direction::In },
                    shape: PortShape::Array {
                        width: arr.elem_width(),
                        len: arr.len(),
                    },
                });
            }
        }

        let mut sigs = Vec::new();
        let mut seen_sigs = HashSet::new();
        let mut mems = Vec::new();
        let mut seen_mems = HashSet::new();
        let mut procs = Vec::new();
        let mut raws = Vec::new();
        let mut consts: Vec<(ArcStr, i64)> = Vec::new();
        let mut enums: Vec<(ArcStr, Vec<ArcStr>)> = Vec::new();

        for rec in hier.records() {
            for wire in rec.sigs().values() {
                if seen_sigs.insert(wire.id())
                    && !port_sig_ids.contains(&wire.id())
                    && !elem_ids.contains(&wire.id())
                {
                    sigs.push(wire.clone());
                }
            }
            for arr in rec.mems().values() {
                if seen_mems.insert(arr.id()) && !port_mem_ids.contains(&arr.id()) {
                    mems.push(arr.clone());
                }
            }
            for proc in rec.procs() {
                procs.push((rec.name().clone(), proc.clone()));
            }
            for raw in rec.raws() {
                raws.push((rec.name().clone(), raw.clone()));
            }
            for (cname, value) in rec.consts.iter() {
                if !consts.iter().any(|(n, _)| n == cname) {
                    consts.push((cname.clone(), *value));
                }
            }
            for (ename, variants) in rec.enums.iter() {
                if !enums.iter().any(|(n, _)| n == ename) {
                    enums.push((ename.clone(), variants.clone()));
                }
            }
        }

        Self {
            intf: ModuleIntf { name, ports },
            sigs,
            mems,
            procs,
            raws,
            consts,
            enums,
        }
    }

    #[inline]
    pub fn intf(&self) -> &ModuleIntf {
        &self.intf
    }
}

/// The dependency-inversion seam between the flat generator and the
/// hierarchical driver: overrides for the declaration and body stages.
pub trait EmitHooks {
    fn write_decls(&self, out: &mut String, design: &FlatDesign, session: &mut Session)
        -> Result<()>;
    fn write_body(&self, out: &mut String, design: &FlatDesign) -> Result<()>;
}

/// The baseline behavior: plain flat emission.
pub struct DefaultHooks;

impl EmitHooks for DefaultHooks {
    fn write_decls(
        &self,
        out: &mut String,
        design: &FlatDesign,
        session: &mut Session,
    ) -> Result<()> {
        write_type_defs(out, design, session);
        write_constants(out, design, session);
        write_sig_decls(out, design, &HashSet::new(), &HashSet::new());
        Ok(())
    }

    fn write_body(&self, out: &mut String, design: &FlatDesign) -> Result<()> {
        write_processes(out, design, None);
        Ok(())
    }
}

/// Writes enumerated-type declarations, registering each in the session so a
/// type introduced once is not re-declared by sibling or parent generations.
pub(crate) fn write_type_defs(out: &mut String, design: &FlatDesign, session: &mut Session) {
    for (name, variants) in design.enums.iter() {
        if session.declare_enum(name.clone(), variants.clone()) {
            let list = variants
                .iter()
                .map(|v| v.as_str())
                .collect::<Vec<_>>()
                .join(", ");
            out.push_str(&format!("    type {name} is ({list});\n"));
        }
    }
}

pub(crate) fn write_constants(out: &mut String, design: &FlatDesign, session: &mut Session) {
    for (name, value) in design.consts.iter() {
        session.declare_constant(name.clone(), *value);
        out.push_str(&format!("    constant {name} : integer := {value};\n"));
    }
}

/// Writes signal and array declarations, eliding discard-set members.
pub(crate) fn write_sig_decls(
    out: &mut String,
    design: &FlatDesign,
    discard_sigs: &HashSet<ArcStr>,
    discard_mems: &HashSet<ArcStr>,
) {
    for arr in design.mems.iter() {
        let name = arr.name();
        if discard_mems.contains(&name) {
            continue;
        }
        out.push_str(&format!(
            "    type {name}_t is array (0 to {}) of {};\n    signal {name} : {name}_t;\n",
            arr.len() - 1,
            format::wire_type(arr.elem_width()),
        ));
    }
    for wire in design.sigs.iter() {
        let name = wire.name();
        if discard_sigs.contains(&name) {
            continue;
        }
        out.push_str(&format!(
            "    signal {name} : {};\n",
            format::wire_type(wire.width())
        ));
    }
}

/// Writes process bodies and raw blocks. With `keep` set, only items owned
/// by a listed record are emitted.
pub(crate) fn write_processes(out: &mut String, design: &FlatDesign, keep: Option<&HashSet<ArcStr>>) {
    let kept = |owner: &ArcStr| keep.map_or(true, |set| set.contains(owner));
    for (owner, proc) in design.procs.iter() {
        if kept(owner) {
            out.push('\n');
            proc.render(out);
        }
    }
    for (owner, raw) in design.raws.iter() {
        if kept(owner) {
            out.push('\n');
            out.push_str(raw);
            if !raw.ends_with('\n') {
                out.push('\n');
            }
        }
    }
}

/// The baseline flat VHDL generator and its presentation options.
#[derive(Clone)]
pub struct VhdlGen {
    /// Overrides the top-level module name.
    pub name: Option<ArcStr>,
    /// Output file extension.
    pub extension: ArcStr,
    /// Whether to emit the file header comment.
    pub header: bool,
    /// Architecture name for emitted modules.
    pub architecture: ArcStr,
    /// Extra `use` clauses appended after the standard ones.
    pub use_clauses: Option<ArcStr>,
}

impl Default for VhdlGen {
    fn default() -> Self {
        Self {
            name: None,
            extension: arcstr::literal!("vhd"),
            header: true,
            architecture: arcstr::literal!("rtl"),
            use_clauses: None,
        }
    }
}

impl VhdlGen {
    pub fn new() -> Self {
        Self::default()
    }

    pub(crate) fn top_name(&self, model: &ModelRef) -> ArcStr {
        self.name
            .clone()
            .unwrap_or_else(|| fix_leading(&model.name()))
    }

    pub(crate) fn filename(&self, name: &str) -> ArcStr {
        arcstr::format!("{name}.{}", self.extension)
    }

    /// Renders the complete flat module for `model`: a single elaboration
    /// pass followed by baseline emission.
    pub fn flatten(
        &self,
        session: &mut Session,
        model: &ModelRef,
        args: &Bindings,
    ) -> Result<String> {
        let hier = Elaborator::new(session).capture(model, args)?;
        let name = self.top_name(model);
        self.generate(session, &hier, name, &DefaultHooks)
    }

    /// Emits one module for an already captured hierarchy, with the
    /// declaration and body stages routed through `hooks`.
    pub(crate) fn generate(
        &self,
        session: &mut Session,
        hier: &Hierarchy,
        name: ArcStr,
        hooks: &dyn EmitHooks,
    ) -> Result<String> {
        let design = FlatDesign::build(hier, name);
        let name = design.intf.name.clone();
        let mut out = String::new();

        if self.header {
            out.push_str(&format!(
                "-- File: {}\n-- Generated by strata {}\n\n",
                self.filename(&name),
                env!("CARGO_PKG_VERSION"),
            ));
        }
        out.push_str("library ieee;\nuse ieee.std_logic_1164.all;\nuse ieee.numeric_std.all;\n");
        if let Some(extra) = self.use_clauses.as_ref() {
            out.push_str(extra);
            if !extra.ends_with('\n') {
                out.push('\n');
            }
        }
        out.push('\n');

        self.write_module_header(&mut out, &design);
        out.push('\n');

        out.push_str(&format!(
            "architecture {} of {} is\n",
            self.architecture, name
        ));
        hooks.write_decls(&mut out, &design, session)?;
        out.push_str("begin\n");
        hooks.write_body(&mut out, &design)?;
        out.push_str(&format!("end architecture {};\n", self.architecture));
        Ok(out)
    }

    fn write_module_header(&self, out: &mut String, design: &FlatDesign) {
        let name = &design.intf.name;
        out.push_str(&format!("entity {name} is\n"));
        if !design.intf.ports.is_empty() {
            out.push_str("    port (\n");
            let lines: Vec<String> = design
                .intf
                .ports
                .iter()
                .map(|p| {
                    let ty = match p.shape {
                        PortShape::Wire { width } => format::wire_type(width),
                        PortShape::Array { .. } => format!("{}_t", p.name),
                    };
                    format!("        {} : {} {}", p.name, p.dir.as_str(), ty)
                })
                .collect();
            out.push_str(&lines.join(";\n"));
            out.push_str("\n    );\n");
        }
        out.push_str(&format!("end entity {name};\n"));
    }
}
