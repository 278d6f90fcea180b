//! Clustering of captured instances into shared component definitions.

use std::sync::Arc;

use indexmap::IndexMap;

use crate::deps::arcstr::ArcStr;
use crate::elab::InstanceRecord;
use crate::model::{ModelRef, Value};
use crate::vhdl::fix_leading;

/// A group of instance records sharing a callee and structurally-equal bound
/// arguments, destined to share one emitted component definition.
pub(crate) struct ComponentCluster {
    pub(crate) model: ModelRef,
    pub(crate) comp_name: ArcStr,
    pub(crate) params: IndexMap<ArcStr, Value>,
    pub(crate) members: Vec<(ArcStr, Arc<InstanceRecord>)>,
}

impl ComponentCluster {
    pub(crate) fn member_names(&self) -> Vec<ArcStr> {
        self.members.iter().map(|(n, _)| n.clone()).collect()
    }

    /// The representative record the reduced argument set is built from.
    pub(crate) fn representative(&self) -> &Arc<InstanceRecord> {
        &self.members[0].1
    }
}

/// The bound-argument set used for cluster comparison: every declared formal
/// with a binding, wires and arrays included (they compare by shape).
fn bound_params(rec: &Arc<InstanceRecord>) -> IndexMap<ArcStr, Value> {
    let mut params = IndexMap::new();
    for name in rec.model().params() {
        if let Some(value) = rec.bound_value(&name) {
            params.insert(name, value);
        }
    }
    params
}

/// Structural comparison of two bound-argument sets: same keys, and every
/// value structurally equal. Wire and array values compare by declared shape
/// only, so a width mismatch forks a cluster even when values agree.
fn param_compare(a: &IndexMap<ArcStr, Value>, b: &IndexMap<ArcStr, Value>) -> bool {
    if a.len() != b.len() {
        return false;
    }
    a.iter().all(|(name, value)| {
        b.get(name)
            .map(|other| value.struct_eq(other))
            .unwrap_or(false)
    })
}

/// Partitions `comp_inst` into clusters: first by callee identity, then by
/// pairwise structural equality of bound arguments. Clusters beyond the
/// first for a callee get ordinal-suffixed component names.
pub(crate) fn build_clusters(
    comp_inst: &IndexMap<ArcStr, Arc<InstanceRecord>>,
) -> Vec<ComponentCluster> {
    // Group by callee identity, preserving first-seen order.
    let mut groups: Vec<(ModelRef, Vec<(ArcStr, Arc<InstanceRecord>)>)> = Vec::new();
    for (name, rec) in comp_inst.iter() {
        let model = rec.model();
        match groups
            .iter_mut()
            .find(|(m, _)| Arc::ptr_eq(m, model))
        {
            Some((_, members)) => members.push((name.clone(), rec.clone())),
            None => groups.push((model.clone(), vec![(name.clone(), rec.clone())])),
        }
    }

    let mut clusters = Vec::new();
    for (model, members) in groups {
        let mut group_clusters: Vec<(IndexMap<ArcStr, Value>, Vec<(ArcStr, Arc<InstanceRecord>)>)> =
            Vec::new();
        for (name, rec) in members {
            let params = bound_params(&rec);
            match group_clusters
                .iter_mut()
                .find(|(p, _)| param_compare(p, &params))
            {
                Some((_, list)) => list.push((name, rec)),
                None => group_clusters.push((params, vec![(name, rec)])),
            }
        }

        let base = fix_leading(&model.name());
        let multiple = group_clusters.len() > 1;
        for (idx, (params, members)) in group_clusters.into_iter().enumerate() {
            let comp_name = if multiple {
                arcstr::format!("{base}_{idx}")
            } else {
                base.clone()
            };
            clusters.push(ComponentCluster {
                model: model.clone(),
                comp_name,
                params,
                members,
            });
        }
    }
    clusters
}
