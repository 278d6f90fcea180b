//! Per-invocation conversion state and the emission override that consumes
//! it.

use std::collections::HashSet;
use std::sync::Arc;

use indexmap::IndexMap;

use crate::deps::arcstr::ArcStr;
use crate::elab::InstanceRecord;
use crate::error::Result;
use crate::session::Session;
use crate::vhdl::{
    fix_reserved, write_constants, write_processes, write_sig_decls, write_type_defs, EmitHooks,
    FlatDesign,
};

/// State accumulated by one driver invocation and handed to the emission
/// stages: discard sets, the resolved-instance map, and recorded component
/// declarations. A default context reproduces the baseline flat output.
#[derive(Default)]
pub struct ConversionContext {
    pub(crate) discard_sigs: HashSet<ArcStr>,
    pub(crate) discard_mems: HashSet<ArcStr>,
    pub(crate) resolved: IndexMap<ArcStr, Arc<InstanceRecord>>,
    pub(crate) comp_decls: IndexMap<ArcStr, (String, Vec<ArcStr>)>,
    /// Owners whose process bodies stay in the parent; `None` keeps all.
    pub(crate) keep_owners: Option<HashSet<ArcStr>>,
}

impl ConversionContext {
    /// One structural instantiation per resolved member instance, binding
    /// each declared formal to the actual wire bound at the original call
    /// site.
    fn write_instances(&self, out: &mut String) {
        for (comp_name, (_decl, inst_names)) in self.comp_decls.iter() {
            for inst_name in inst_names.iter() {
                let rec = match self.resolved.get(inst_name) {
                    Some(rec) => rec,
                    None => continue,
                };
                out.push('\n');
                out.push_str(&format!("    {inst_name} : {comp_name}\n        port map (\n"));
                let mut pmap = Vec::new();
                for formal in rec.model().params() {
                    let actual = if let Some(wire) = rec.sigs().get(formal.as_str()) {
                        wire.name()
                    } else if let Some(arr) = rec.mems().get(formal.as_str()) {
                        arr.name()
                    } else {
                        continue;
                    };
                    pmap.push(format!(
                        "            {} => {}",
                        fix_reserved(&formal),
                        actual
                    ));
                }
                out.push_str(&pmap.join(",\n"));
                out.push_str("\n        );\n");
            }
        }
    }
}

impl EmitHooks for ConversionContext {
    fn write_decls(
        &self,
        out: &mut String,
        design: &FlatDesign,
        session: &mut Session,
    ) -> Result<()> {
        for (_, (decl, _)) in self.comp_decls.iter() {
            out.push_str(decl);
            out.push_str("\n\n");
        }
        write_type_defs(out, design, session);
        write_constants(out, design, session);
        write_sig_decls(out, design, &self.discard_sigs, &self.discard_mems);
        Ok(())
    }

    fn write_body(&self, out: &mut String, design: &FlatDesign) -> Result<()> {
        write_processes(out, design, self.keep_owners.as_ref());
        self.write_instances(out);
        Ok(())
    }
}
