//! Dense handle allocation: external identifiers → run-private handles.
//!
//! [`HandleSpace`] owns the bidirectional mapping for one run. Handles are
//! assigned densely starting at [`Handle::FIRST`], strictly increasing with
//! sorted external identifiers, so the engine's internal binary search over
//! the concept array stays valid. Allocation fails fast on duplicates and on
//! identifiers that collide with the reserved sentinel value.

use std::collections::HashMap;

use crate::concept::{ConceptId, Handle};
use crate::error::AllocError;

/// Number of handles reserved below [`Handle::FIRST`] (TOP and BOTTOM).
pub const RESERVED_HANDLES: usize = 2;

/// The injective external-ID ↔ handle mapping for a single run.
///
/// Owned exclusively by the run that built it; the reconciler borrows it to
/// decode engine output back to external identifiers.
#[derive(Debug)]
pub struct HandleSpace {
    /// External IDs sorted ascending; index = handle − FIRST.
    ids: Vec<ConceptId>,
    /// Reverse map for encoding.
    by_id: HashMap<ConceptId, Handle>,
}

impl HandleSpace {
    /// Allocate handles for the given external identifiers.
    ///
    /// Sorts the identifiers ascending and assigns `FIRST + index`, making
    /// the mapping injective and order-preserving by construction.
    pub fn allocate(mut ids: Vec<ConceptId>) -> Result<Self, AllocError> {
        // Real handles live in FIRST..PAD.
        let max_real = (Handle::PAD.0 - Handle::FIRST.0) as usize;
        if ids.len() > max_real {
            return Err(AllocError::Exhausted { count: ids.len() });
        }

        ids.sort_unstable();

        let mut by_id = HashMap::with_capacity(ids.len());
        let mut prev: Option<ConceptId> = None;
        for (i, &id) in ids.iter().enumerate() {
            if id.get() == ConceptId::PAD_VALUE {
                return Err(AllocError::SentinelCollision { id: id.get() });
            }
            if prev == Some(id) {
                return Err(AllocError::Duplicate { id: id.get() });
            }
            prev = Some(id);
            by_id.insert(id, Handle(Handle::FIRST.0 + i as u32));
        }

        Ok(Self { ids, by_id })
    }

    /// Handle assigned to an external identifier, if it is in scope.
    pub fn handle_of(&self, id: ConceptId) -> Option<Handle> {
        self.by_id.get(&id).copied()
    }

    /// External identifier behind a handle.
    ///
    /// Returns `None` for sentinels and for handles outside the populated
    /// range.
    pub fn concept_of(&self, handle: Handle) -> Option<ConceptId> {
        if handle < Handle::FIRST {
            return None;
        }
        self.ids.get((handle.0 - Handle::FIRST.0) as usize).copied()
    }

    /// Number of allocated concepts.
    pub fn len(&self) -> usize {
        self.ids.len()
    }

    /// Whether no concepts were allocated.
    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }

    /// External identifiers in handle order (ascending).
    pub fn ids(&self) -> &[ConceptId] {
        &self.ids
    }

    /// Slots the engine-facing concept array must have: the populated count
    /// plus a growth margin for engine-internal synthesis plus the reserved
    /// sentinel slots.
    pub fn array_capacity(&self, margin_percent: u32) -> usize {
        let margin = self.ids.len() * margin_percent as usize / 100;
        self.ids.len() + margin + RESERVED_HANDLES
    }
}
