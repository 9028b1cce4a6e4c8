//! Core identifier types for the classification bridge.
//!
//! The bridge spans two ID spaces: [`ConceptId`] is the persistent external
//! identifier a concept carries in the terminology store, while [`Handle`] is
//! the dense, reasoner-private integer assigned fresh for every run. Two
//! handles are reserved for the universal TOP and BOTTOM concepts and a third
//! value pads array slots past the populated prefix, so the engine's internal
//! binary search never walks into uninitialized data.

use std::num::NonZeroU64;

use serde::{Deserialize, Serialize};

/// Persistent external identifier of a concept in the terminology store.
///
/// Uses `NonZeroU64` so that `Option<ConceptId>` is the same size as
/// `ConceptId` (the niche optimization lets the compiler use 0 as the `None`
/// discriminant). `u64::MAX` is reserved as the padding sentinel and is never
/// a valid identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[repr(transparent)]
pub struct ConceptId(NonZeroU64);

impl ConceptId {
    /// The raw value reserved for padding slots in the encoded concept array.
    pub const PAD_VALUE: u64 = u64::MAX;

    /// Create a `ConceptId` from a raw `u64`.
    ///
    /// Returns `None` if `raw` is zero or the reserved padding value.
    pub fn new(raw: u64) -> Option<Self> {
        if raw == Self::PAD_VALUE {
            return None;
        }
        NonZeroU64::new(raw).map(ConceptId)
    }

    /// Get the underlying `u64` value.
    pub fn get(self) -> u64 {
        self.0.get()
    }
}

impl std::fmt::Display for ConceptId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "cid:{}", self.0)
    }
}

/// Dense, reasoner-private concept handle valid for a single run.
///
/// Real handles start at [`Handle::FIRST`] and increase strictly with sorted
/// external identifiers. [`Handle::TOP`] and [`Handle::BOTTOM`] are the
/// reserved universal sentinels; [`Handle::PAD`] fills unpopulated array
/// slots.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[repr(transparent)]
pub struct Handle(pub u32);

impl Handle {
    /// Universal top concept (everything is subsumed by TOP).
    pub const TOP: Handle = Handle(0);
    /// Universal bottom concept (BOTTOM is subsumed by everything).
    pub const BOTTOM: Handle = Handle(1);
    /// First handle available for a real concept.
    pub const FIRST: Handle = Handle(2);
    /// Padding sentinel for array slots past the populated prefix.
    pub const PAD: Handle = Handle(u32::MAX);

    /// Whether this handle is one of the reserved sentinels (TOP, BOTTOM, PAD).
    pub fn is_sentinel(self) -> bool {
        self == Self::TOP || self == Self::BOTTOM || self == Self::PAD
    }
}

impl std::fmt::Display for Handle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match *self {
            Handle::TOP => write!(f, "h:TOP"),
            Handle::BOTTOM => write!(f, "h:BOTTOM"),
            Handle::PAD => write!(f, "h:PAD"),
            Handle(v) => write!(f, "h:{v}"),
        }
    }
}

/// A concept as submitted to the classification engine.
///
/// The engine-facing concept array holds these sorted ascending by handle,
/// with padding entries beyond the populated prefix.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EncodedConcept {
    /// Dense run-private handle.
    pub handle: Handle,
    /// Raw external identifier ([`ConceptId::PAD_VALUE`] in padding slots).
    pub external: u64,
    /// Whether the concept's definition is necessary-and-sufficient.
    pub defined: bool,
}

impl EncodedConcept {
    /// A padding entry: maximum-value handle and external id, never defined.
    pub fn padding() -> Self {
        Self {
            handle: Handle::PAD,
            external: ConceptId::PAD_VALUE,
            defined: false,
        }
    }

    /// Whether this slot is padding rather than a real concept.
    pub fn is_padding(&self) -> bool {
        self.handle == Handle::PAD
    }
}

/// A relationship in external (store) terms.
///
/// `rel_id` is the store's row identifier: present on relationships read back
/// from the store, absent on freshly inferred candidates that the store has
/// not assigned an identifier yet.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Relationship {
    /// Store row identifier, if committed.
    pub rel_id: Option<u64>,
    /// Source concept.
    pub source: ConceptId,
    /// Relationship type (itself a concept).
    pub typ: ConceptId,
    /// Destination concept.
    pub destination: ConceptId,
    /// Role group; 0 means ungrouped.
    pub group: u32,
}

impl Relationship {
    /// The identity tuple used for diffing, ignoring the store row id.
    pub fn key(&self) -> RelationshipKey {
        RelationshipKey {
            source: self.source,
            typ: self.typ,
            destination: self.destination,
            group: self.group,
        }
    }
}

/// Identity of a relationship for set comparison: row ids excluded.
///
/// `Ord` makes diffing deterministic via `BTreeSet`/`BTreeMap`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct RelationshipKey {
    pub source: ConceptId,
    pub typ: ConceptId,
    pub destination: ConceptId,
    pub group: u32,
}

impl RelationshipKey {
    /// Rehydrate a full relationship carrying the given row id.
    pub fn with_rel_id(self, rel_id: Option<u64>) -> Relationship {
        Relationship {
            rel_id,
            source: self.source,
            typ: self.typ,
            destination: self.destination,
            group: self.group,
        }
    }
}

impl std::fmt::Display for RelationshipKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{} -{}-> {} (group {})",
            self.source, self.typ, self.destination, self.group
        )
    }
}

/// A relationship in handle space, ordered for deterministic submission.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct EncodedRelationship {
    pub source: Handle,
    pub typ: Handle,
    pub destination: Handle,
    pub group: u32,
    /// Store row id of the stated relationship this was encoded from.
    pub rel_id: u64,
}

/// A normalized relationship reported by the engine, in handle space.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InferredAxiom {
    pub source: Handle,
    pub typ: Handle,
    pub destination: Handle,
    pub group: u32,
}
