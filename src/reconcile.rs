//! Result reconciliation: engine output → minimal write-back change set.
//!
//! Decodes the two engine callback streams through the run's [`HandleSpace`],
//! then diffs the candidate inferred set against the previously committed one.
//! Relationships present in both are untouched; new-only relationships become
//! additions, old-only ones become retractions. The store's commit machinery
//! therefore only ever touches what actually changed.

use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};

use crate::alloc::HandleSpace;
use crate::concept::{ConceptId, Handle, Relationship, RelationshipKey};
use crate::engine::ClassificationEngine;
use crate::error::{BridgeResult, ReconcileError};
use crate::report::EquivalenceReport;

/// Additions and retractions staged for the store's commit machinery.
///
/// Retractions carry the store row id of the relationship they retract;
/// additions have none (the store assigns ids on commit).
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChangeSet {
    pub additions: Vec<Relationship>,
    pub retractions: Vec<Relationship>,
}

impl ChangeSet {
    /// Whether the run changed nothing.
    pub fn is_empty(&self) -> bool {
        self.additions.is_empty() && self.retractions.is_empty()
    }
}

/// Decodes engine output and produces the run's report and change set.
///
/// Borrows the run's handle space; like every intermediate structure it never
/// outlives the run that built it.
pub struct Reconciler<'a> {
    space: &'a HandleSpace,
}

impl<'a> Reconciler<'a> {
    pub fn new(space: &'a HandleSpace) -> Self {
        Self { space }
    }

    /// Drain both engine channels and diff against the prior inferred set.
    pub fn reconcile(
        &self,
        engine: &mut dyn ClassificationEngine,
        prior: &[Relationship],
    ) -> BridgeResult<(EquivalenceReport, ChangeSet)> {
        let report = self.collect_equivalences(engine)?;
        let candidate = self.collect_candidates(engine)?;
        let changes = diff(&candidate, prior);

        tracing::info!(
            groups = report.groups.len(),
            candidates = candidate.len(),
            additions = changes.additions.len(),
            retractions = changes.retractions.len(),
            "reconciled engine output"
        );

        Ok((report, changes))
    }

    /// First callback pass: equivalence groups, decoded and ordered.
    fn collect_equivalences(
        &self,
        engine: &mut dyn ClassificationEngine,
    ) -> BridgeResult<EquivalenceReport> {
        let mut groups: Vec<Vec<ConceptId>> = Vec::new();
        engine.for_each_equivalence_group(&mut |handles| {
            if handles.len() < 2 {
                return Err(ReconcileError::DegenerateGroup {
                    size: handles.len(),
                }
                .into());
            }
            let mut members = Vec::with_capacity(handles.len());
            for &h in handles {
                members.push(self.decode(h)?);
            }
            members.sort_unstable();
            groups.push(members);
            Ok(())
        })?;

        // Callback order is implementation-defined; sort so the persisted
        // report diffs cleanly between runs.
        groups.sort_unstable();
        Ok(EquivalenceReport { groups })
    }

    /// Second callback pass: candidate inferred relationships in external terms.
    fn collect_candidates(
        &self,
        engine: &mut dyn ClassificationEngine,
    ) -> BridgeResult<BTreeSet<RelationshipKey>> {
        let mut candidate: BTreeSet<RelationshipKey> = BTreeSet::new();
        engine.for_each_inferred_relationship(&mut |axiom| {
            candidate.insert(RelationshipKey {
                source: self.decode(axiom.source)?,
                typ: self.decode(axiom.typ)?,
                destination: self.decode(axiom.destination)?,
                group: axiom.group,
            });
            Ok(())
        })?;
        Ok(candidate)
    }

    fn decode(&self, handle: Handle) -> Result<ConceptId, ReconcileError> {
        if handle.is_sentinel() {
            return Err(ReconcileError::SentinelInResult { handle: handle.0 });
        }
        self.space
            .concept_of(handle)
            .ok_or(ReconcileError::UnknownHandle { handle: handle.0 })
    }
}

/// Minimal diff between the candidate set and the prior committed set.
///
/// additions = candidate − prior, retractions = prior − candidate, both in
/// deterministic key order. On a first run (empty prior) every candidate is an
/// addition and there are no retractions. A stale key the store committed more
/// than once (same triple and group, distinct row ids) yields one retraction
/// per committed row.
pub fn diff(candidate: &BTreeSet<RelationshipKey>, prior: &[Relationship]) -> ChangeSet {
    let mut prior_by_key: BTreeMap<RelationshipKey, Vec<Option<u64>>> = BTreeMap::new();
    for r in prior {
        prior_by_key.entry(r.key()).or_default().push(r.rel_id);
    }

    let additions: Vec<Relationship> = candidate
        .iter()
        .filter(|key| !prior_by_key.contains_key(key))
        .map(|key| key.with_rel_id(None))
        .collect();

    let mut retractions: Vec<Relationship> = Vec::new();
    for (key, rel_ids) in &prior_by_key {
        if candidate.contains(key) {
            continue;
        }
        let mut rel_ids = rel_ids.clone();
        rel_ids.sort_unstable();
        retractions.extend(rel_ids.into_iter().map(|rel_id| key.with_rel_id(rel_id)));
    }

    ChangeSet {
        additions,
        retractions,
    }
}
