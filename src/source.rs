//! Store-facing interfaces: concept iteration and the write-back sink.
//!
//! The terminology store is an external collaborator. The bridge consumes it
//! through [`ConceptSource`] (read side) and hands its output to a
//! [`ChangeSink`] (write side) that the caller owns. [`MemorySource`] is the
//! in-crate implementation backed by plain vectors, used by the tests and the
//! CLI snapshot loader.

use serde::{Deserialize, Serialize};

use crate::concept::{ConceptId, Relationship};
use crate::error::BridgeResult;
use crate::reconcile::ChangeSet;

/// A version/branch scope selecting which concepts participate in a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[repr(transparent)]
pub struct PathId(pub u64);

impl std::fmt::Display for PathId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "path:{}", self.0)
    }
}

/// A stated relationship on a concept, already resolved to external IDs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatedRelationship {
    /// Store row identifier.
    pub rel_id: u64,
    /// Relationship type (itself a concept).
    pub typ: ConceptId,
    /// Destination concept.
    pub destination: ConceptId,
    /// Role group; 0 means ungrouped.
    #[serde(default)]
    pub group: u32,
}

/// One concept as yielded by the store's path iterator.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConceptSnapshot {
    /// Persistent external identifier.
    pub id: ConceptId,
    /// Whether the definition is necessary-and-sufficient.
    #[serde(default)]
    pub defined: bool,
    /// Active outgoing relationships.
    #[serde(default)]
    pub relationships: Vec<StatedRelationship>,
}

/// Read side of the terminology store.
///
/// Iteration must be a stable, deterministic single pass: handle assignment
/// depends on visitation order, so implementations must not use any parallel
/// iteration mode here.
pub trait ConceptSource {
    /// Iterate the concepts on a path, one snapshot at a time.
    ///
    /// Each item is individually fallible so a mid-stream store failure
    /// surfaces exactly where it happened.
    fn concepts_on_path(
        &self,
        path: PathId,
    ) -> BridgeResult<Box<dyn Iterator<Item = BridgeResult<ConceptSnapshot>> + '_>>;

    /// The previously committed inferred relationships for the same scope.
    ///
    /// Empty on the first run for a path.
    fn inferred_on_path(&self, path: PathId) -> BridgeResult<Vec<Relationship>>;
}

/// Write-back sink for the reconciler's output.
///
/// The bridge never calls this itself; the caller invokes it only after a run
/// fully succeeds, so partial application of a run's results is impossible.
pub trait ChangeSink {
    /// Commit the additions and retractions of one completed run.
    fn commit(&mut self, changes: &ChangeSet) -> BridgeResult<()>;
}

/// In-memory [`ConceptSource`] backed by vectors.
///
/// Deserializable from the CLI's JSON snapshot format; also the workhorse of
/// the test suite.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MemorySource {
    /// Concepts in stable visitation order.
    pub concepts: Vec<ConceptSnapshot>,
    /// Previously committed inferred relationships.
    #[serde(default)]
    pub inferred: Vec<Relationship>,
}

impl MemorySource {
    /// Build a source over the given concepts with no prior inferred set.
    pub fn new(concepts: Vec<ConceptSnapshot>) -> Self {
        Self {
            concepts,
            inferred: Vec::new(),
        }
    }

    /// Attach a previously committed inferred set.
    pub fn with_inferred(mut self, inferred: Vec<Relationship>) -> Self {
        self.inferred = inferred;
        self
    }

    /// Parse a JSON snapshot file produced by an export of the store.
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }
}

impl ConceptSource for MemorySource {
    fn concepts_on_path(
        &self,
        _path: PathId,
    ) -> BridgeResult<Box<dyn Iterator<Item = BridgeResult<ConceptSnapshot>> + '_>> {
        Ok(Box::new(self.concepts.iter().cloned().map(Ok)))
    }

    fn inferred_on_path(&self, _path: PathId) -> BridgeResult<Vec<Relationship>> {
        Ok(self.inferred.clone())
    }
}

/// [`ChangeSink`] that records committed change sets, for testing callers.
#[derive(Debug, Default)]
pub struct RecordingSink {
    /// Change sets in commit order.
    pub committed: Vec<ChangeSet>,
}

impl ChangeSink for RecordingSink {
    fn commit(&mut self, changes: &ChangeSet) -> BridgeResult<()> {
        self.committed.push(changes.clone());
        Ok(())
    }
}
