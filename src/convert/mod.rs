//! The hierarchical filter/driver.
//!
//! Consumes one captured call tree per invocation: matches root bindings
//! against level-2 records, clusters structurally equal instances, recurses
//! into itself (or the flat baseline) per cluster behind a fresh output sink
//! and a session snapshot, then stitches the captured component declarations
//! and instantiations into the parent's emission.
//!
//! Every anomaly on the way is a recoverable warning; the driver always
//! completes and emits output, degrading toward the flat baseline.

use std::collections::HashSet;
use std::sync::Arc;

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::deps::arcstr::ArcStr;
use crate::elab::{Elaborator, Hierarchy, InstanceRecord};
use crate::error::{with_err_context, ErrorContext, ErrorSource, Result};
use crate::model::{Bindings, ModelRef, Value};
use crate::session::Session;
use crate::sink::{OutputSink, SinkStack};
use crate::vhdl::{is_reserved, VhdlGen};

pub mod context;
pub(crate) mod cluster;

pub use context::ConversionContext;

use cluster::{build_clusters, ComponentCluster};
use crate::vhdl::format::{extract_interface_block, to_component_decl};

/// Options for one conversion request.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ConvertOptions {
    /// Recursion depth: `None` recurses without bound, `Some(0)` falls back
    /// to the flat baseline, `Some(n)` recurses `n` call levels.
    pub max_depth: Option<u32>,
    /// Stage component output in the enclosing sink instead of emitting one
    /// file per component.
    pub merge_files: bool,
}

impl Default for ConvertOptions {
    fn default() -> Self {
        Self {
            max_depth: None,
            merge_files: false,
        }
    }
}

/// A recoverable conversion anomaly. All variants degrade output toward the
/// flat baseline; none abort the request.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConvertWarning {
    #[error("no root binding matches hierarchy record `{name}` (level {level})")]
    AmbiguousHierarchy { name: ArcStr, level: usize },

    #[error("raw code in `{owner}` is not supported in hierarchical mode; kept inline")]
    UnsupportedInlineCode { owner: ArcStr },

    #[error("component `{name}` already generated; later definition dropped")]
    NamingConflict { name: ArcStr },

    #[error("implicit self argument stripped before recursive call to `{callee}`")]
    ImplicitSelfArgument { callee: ArcStr },
}

/// The result of a conversion request: the emitted file map plus every
/// warning raised along the way.
#[derive(Debug)]
pub struct Conversion {
    pub files: IndexMap<ArcStr, String>,
    pub warnings: Vec<ConvertWarning>,
}

/// The hierarchy-preserving converter.
pub struct Converter {
    options: ConvertOptions,
    gen: VhdlGen,
}

impl Converter {
    pub fn new(options: ConvertOptions) -> Self {
        Self {
            options,
            gen: VhdlGen::new(),
        }
    }

    /// Uses a customized baseline generator (top-name override, extension,
    /// presentation options).
    pub fn with_generator(options: ConvertOptions, gen: VhdlGen) -> Self {
        Self { options, gen }
    }

    #[inline]
    pub fn options(&self) -> &ConvertOptions {
        &self.options
    }

    /// Converts `model`, returning the emitted files keyed by filename.
    ///
    /// The session is net-neutral at this level: the unique-name counter and
    /// constant table are restored on return, while enumerated types
    /// introduced during conversion stay registered.
    pub fn convert(
        &self,
        session: &mut Session,
        model: &ModelRef,
        args: &Bindings,
    ) -> Result<Conversion> {
        let snapshot = session.snapshot();
        let mut sinks = SinkStack::new();
        sinks.push(self.scoped_sink());
        let mut warnings = Vec::new();
        let result = self.convert_in(session, &mut sinks, &mut warnings, model, args);
        let sink = sinks.pop();
        session.restore(snapshot);
        with_err_context(result, || {
            ErrorContext::Task(arcstr::format!("converting `{}`", model.name()))
        })?;
        let files = match sink {
            Some(sink) => sink.into_buffers(),
            None => IndexMap::new(),
        };
        Ok(Conversion { files, warnings })
    }

    fn scoped_sink(&self) -> OutputSink {
        OutputSink::new([self.gen.extension.clone(), arcstr::literal!("vhdl")])
    }

    /// One driver invocation: capture, filter, emit into the current sink.
    fn convert_in(
        &self,
        session: &mut Session,
        sinks: &mut SinkStack,
        warnings: &mut Vec<ConvertWarning>,
        model: &ModelRef,
        args: &Bindings,
    ) -> Result<()> {
        let hier = Elaborator::new(session).capture(model, args)?;
        let top_name = self.gen.top_name(model);

        let mut ctx = ConversionContext::default();
        let mut merged_prefix = String::new();
        if self.options.max_depth != Some(0) {
            self.filter(
                session,
                sinks,
                warnings,
                &hier,
                &mut ctx,
                &mut merged_prefix,
            )?;
        }

        let text = self.gen.generate(session, &hier, top_name.clone(), &ctx)?;
        let full = if merged_prefix.is_empty() {
            text
        } else {
            format!("{merged_prefix}{text}")
        };
        sinks.write(self.gen.filename(&top_name), full);
        Ok(())
    }

    /// The hierarchical filter: CollectRootInstantiations through
    /// FinalizeContext.
    fn filter(
        &self,
        session: &mut Session,
        sinks: &mut SinkStack,
        warnings: &mut Vec<ConvertWarning>,
        hier: &Hierarchy,
        ctx: &mut ConversionContext,
        merged_prefix: &mut String,
    ) -> Result<()> {
        let root = hier.root();
        let params = root.model().params();

        // Reserved-name guard: renames were applied at capture-time binding;
        // surface them here where the interface is decided.
        for param in params.iter() {
            if is_reserved(param) {
                log::warn!(
                    "argument `{param}` of `{}` collides with a reserved identifier; renamed",
                    root.model().name()
                );
            }
        }

        let mut comp_inst = collect_root_instantiations(hier, warnings);
        let mut inline_recs: Vec<Arc<InstanceRecord>> = Vec::new();

        // Raw code at the root itself stays inline, with a warning.
        if !root.raws().is_empty() {
            push_warning(
                warnings,
                ConvertWarning::UnsupportedInlineCode {
                    owner: root.name().clone(),
                },
            );
        }

        // Raw-code fallback: affected instances are inlined like direct
        // implementations.
        let fallbacks: Vec<ArcStr> = comp_inst
            .iter()
            .filter(|(_, rec)| rec.has_raw_in_subtree())
            .map(|(name, _)| name.clone())
            .collect();
        for name in fallbacks {
            if let Some(rec) = comp_inst.shift_remove(&name) {
                push_warning(
                    warnings,
                    ConvertWarning::UnsupportedInlineCode { owner: name },
                );
                inline_recs.push(rec);
            }
        }

        // Body filtering: the parent keeps the root's own processes and
        // everything under an inlined instance.
        let mut keep: HashSet<ArcStr> = HashSet::new();
        keep.insert(root.name().clone());
        for rec in inline_recs.iter() {
            for sub in rec.subtree() {
                keep.insert(sub.name().clone());
            }
        }

        // Internal/discard inference.
        let mut port_names: HashSet<ArcStr> = HashSet::new();
        for param in params.iter() {
            if let Some(wire) = root.sigs().get(param.as_str()) {
                port_names.insert(wire.name());
            } else if let Some(arr) = root.mems().get(param.as_str()) {
                port_names.insert(arr.name());
                for wire in arr.wires() {
                    port_names.insert(wire.name());
                }
            }
        }
        let mut internals: HashSet<ArcStr> = HashSet::new();
        for wire in root.sigs().values() {
            if !port_names.contains(&wire.name()) {
                internals.insert(wire.name());
            }
        }
        for arr in root.mems().values() {
            if !port_names.contains(&arr.name()) {
                internals.insert(arr.name());
                for wire in arr.wires() {
                    internals.insert(wire.name());
                }
            }
        }
        for rec in hier.records()[1..].iter() {
            if keep.contains(rec.name()) {
                continue;
            }
            for wire in rec.sigs().values() {
                let name = wire.name();
                if !internals.contains(&name) && !port_names.contains(&name) {
                    ctx.discard_sigs.insert(name);
                }
            }
            for arr in rec.mems().values() {
                let name = arr.name();
                if internals.contains(&name) || port_names.contains(&name) {
                    continue;
                }
                for wire in arr.wires() {
                    let wname = wire.name();
                    if !internals.contains(&wname) && !port_names.contains(&wname) {
                        ctx.discard_sigs.insert(wname);
                    }
                }
                ctx.discard_mems.insert(name);
            }
        }
        debug_assert!(ctx.discard_sigs.is_disjoint(&port_names));

        // Cluster and recurse, one cluster at a time, in clustering order.
        let clusters = build_clusters(&comp_inst);
        let mut files: IndexMap<ArcStr, String> = IndexMap::new();
        for cluster in clusters.iter() {
            self.recurse_cluster(session, sinks, warnings, cluster, ctx, &mut files)?;
        }

        // File disposition. Nested invocations hand component buffers to the
        // sink enclosing this sub-generation (the one the parent pushed), so
        // they bubble upward; the outermost invocation either keeps them as
        // separate output files or, in merge mode, concatenates them ahead
        // of the top-level buffer, deepest first.
        if !files.is_empty() {
            if self.options.merge_files && sinks.depth() == 1 {
                for (_, text) in files {
                    merged_prefix.push_str(&text);
                    merged_prefix.push('\n');
                }
            } else if self.options.merge_files {
                if let Some(current) = sinks.current_mut() {
                    current.merge(files);
                }
            } else {
                for (name, text) in files {
                    sinks.write(name, text);
                }
            }
        }

        // FinalizeContext.
        ctx.keep_owners = Some(keep);
        ctx.resolved = comp_inst;
        Ok(())
    }

    /// Recursion for one cluster: reduced arguments, sub-generator choice,
    /// session bracketing, and declaration extraction.
    fn recurse_cluster(
        &self,
        session: &mut Session,
        sinks: &mut SinkStack,
        warnings: &mut Vec<ConvertWarning>,
        cluster: &ComponentCluster,
        ctx: &mut ConversionContext,
        files: &mut IndexMap<ArcStr, String>,
    ) -> Result<()> {
        let comp_name = cluster.comp_name.clone();

        // Reduced argument set, built from the representative member: fresh
        // zero-valued wires of identical shape, scalars copied verbatim.
        let mut reduced = Bindings::new();
        for (name, value) in cluster.params.iter() {
            if name == "self" {
                push_warning(
                    warnings,
                    ConvertWarning::ImplicitSelfArgument {
                        callee: cluster.model.name(),
                    },
                );
                continue;
            }
            match value {
                Value::Wire(wire) => reduced.set(name.clone(), wire.zero_like(name.clone())),
                Value::Array(arr) => reduced.set(name.clone(), arr.zero_like(name.clone())),
                other => reduced.set(name.clone(), other.clone()),
            }
        }

        // The baseline generator is not reentrant: bracket the nested call
        // with a snapshot of the counter and constant table. Enumerated
        // types merge additively (restore never touches them).
        let snapshot = session.snapshot();
        sinks.push(self.scoped_sink());
        let result: Result<()> = if self.options.max_depth == Some(1) {
            let mut gen = self.gen.clone();
            gen.name = Some(comp_name.clone());
            gen.flatten(session, &cluster.model, &reduced).map(|text| {
                sinks.write(gen.filename(&comp_name), text);
            })
        } else {
            let sub = Converter {
                options: ConvertOptions {
                    max_depth: self.options.max_depth.map(|d| d - 1),
                    merge_files: self.options.merge_files,
                },
                gen: VhdlGen {
                    name: Some(comp_name.clone()),
                    ..self.gen.clone()
                },
            };
            sub.convert_in(session, sinks, warnings, &cluster.model, &reduced)
        };
        let sub_sink = sinks.pop();
        session.restore(snapshot);
        with_err_context(result, || ErrorContext::GenComponent {
            name: comp_name.clone(),
        })?;
        let sub_sink = sub_sink.ok_or_else(|| {
            ErrorSource::Internal("output sink stack underflow".to_string())
        })?;

        // Stitch captured files and extract the component declaration.
        let comp_file_prefix = format!("{comp_name}.");
        for (fname, text) in sub_sink.into_buffers() {
            if files.contains_key(&fname) {
                push_warning(warnings, ConvertWarning::NamingConflict { name: fname });
                continue;
            }
            if fname.starts_with(&comp_file_prefix) {
                match extract_interface_block(&text) {
                    Some(block) => {
                        let decl = to_component_decl(block);
                        if ctx.comp_decls.contains_key(&comp_name) {
                            push_warning(
                                warnings,
                                ConvertWarning::NamingConflict {
                                    name: comp_name.clone(),
                                },
                            );
                        } else {
                            ctx.comp_decls
                                .insert(comp_name.clone(), (decl, cluster.member_names()));
                        }
                    }
                    None => {
                        log::warn!("no interface block found in `{fname}`; declaration skipped")
                    }
                }
            }
            files.insert(fname, text);
        }
        Ok(())
    }
}

fn push_warning(warnings: &mut Vec<ConvertWarning>, warning: ConvertWarning) {
    log::warn!("{warning}");
    warnings.push(warning);
}

/// Matches root bindings against level-2 records into the
/// component-instance map; level-≤2 records never matched raise an
/// ambiguous-hierarchy warning.
fn collect_root_instantiations(
    hier: &Hierarchy,
    warnings: &mut Vec<ConvertWarning>,
) -> IndexMap<ArcStr, Arc<InstanceRecord>> {
    let mut comp_inst: IndexMap<ArcStr, Arc<InstanceRecord>> = IndexMap::new();
    let mut matched: HashSet<ArcStr> = HashSet::new();

    for (binding, _) in hier.root().subs().iter() {
        for rec in hier.records()[1..].iter() {
            if rec.level() > 2 {
                continue;
            }
            if rec.name().starts_with(binding.as_str()) {
                comp_inst.insert(rec.name().clone(), rec.clone());
                matched.insert(rec.name().clone());
            }
        }
        // Bindings with no matching record are direct implementations: their
        // logic stays inlined in the parent and needs no bookkeeping here.
    }

    for rec in hier.records()[1..].iter() {
        if rec.level() <= 2 && !matched.contains(rec.name()) {
            push_warning(
                warnings,
                ConvertWarning::AmbiguousHierarchy {
                    name: rec.name().clone(),
                    level: rec.level(),
                },
            );
        }
    }

    comp_inst
}
