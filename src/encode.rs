//! Ontology encoding: collected snapshots → the engine's numeric contract.
//!
//! Produces the sorted and padded concept array, the role array discovered by
//! walking the role-root concept's descendants, the relationship triple list,
//! and the defined-concept set. Pure transform: no side effects beyond the
//! returned structures. The role-count guard fires here, before any data
//! reaches the engine.

use std::collections::{HashMap, HashSet, VecDeque};

use crate::alloc::HandleSpace;
use crate::concept::{ConceptId, EncodedConcept, EncodedRelationship, Handle};
use crate::error::{BridgeResult, ConfigError, EncodeError};
use crate::source::ConceptSnapshot;

/// Parameters the encoder needs from the run configuration.
#[derive(Debug, Clone, Copy)]
pub struct EncodeParams {
    /// The IS-A relationship type concept.
    pub isa: ConceptId,
    /// Concept whose descendants define the legal role set.
    pub role_root: ConceptId,
    /// Hard upper bound on the role array size.
    pub max_roles: usize,
    /// Growth fraction for engine-internal concept synthesis.
    pub margin_percent: u32,
}

/// The fully encoded ontology, ready for submission to the engine.
///
/// Owned exclusively by the run; passed by ownership into the engine phase
/// and dropped when that phase ends.
#[derive(Debug)]
pub struct EncodedOntology {
    /// Concept array: `populated` real entries sorted ascending by handle,
    /// every slot beyond padded with the maximum-value sentinel.
    pub concepts: Vec<EncodedConcept>,
    /// Number of real entries at the front of `concepts`.
    pub populated: usize,
    /// Role array with IS-A forced at index 0.
    pub roles: Vec<Handle>,
    /// Relationship triples in deterministic submission order.
    pub relationships: Vec<EncodedRelationship>,
    /// Handles of defined concepts, sorted ascending.
    pub defined: Vec<Handle>,
}

impl EncodedOntology {
    /// The IS-A role handle (always present, always first).
    pub fn isa_handle(&self) -> Handle {
        self.roles[0]
    }
}

/// Encode collected snapshots into the engine contract.
///
/// Returns the handle space (needed later to decode engine output) together
/// with the encoded ontology.
pub fn encode(
    snapshots: &[ConceptSnapshot],
    params: &EncodeParams,
) -> BridgeResult<(HandleSpace, EncodedOntology)> {
    let space = HandleSpace::allocate(snapshots.iter().map(|c| c.id).collect())?;

    let isa_handle = space
        .handle_of(params.isa)
        .ok_or(ConfigError::ConceptNotInScope {
            which: "IS-A",
            id: params.isa.get(),
        })?;
    let role_root_handle =
        space
            .handle_of(params.role_root)
            .ok_or(ConfigError::ConceptNotInScope {
                which: "role root",
                id: params.role_root.get(),
            })?;

    let roles = discover_roles(snapshots, &space, params.isa, isa_handle, role_root_handle);
    if roles.len() > params.max_roles {
        return Err(ConfigError::RoleLimit {
            count: roles.len(),
            max: params.max_roles,
        }
        .into());
    }

    let role_set: HashSet<Handle> = roles.iter().copied().collect();

    // Relationship triples, resolved to handles.
    let mut relationships = Vec::new();
    for concept in snapshots {
        // The snapshot's own id was allocated above, so this cannot miss.
        let Some(source) = space.handle_of(concept.id) else {
            continue;
        };
        for rel in &concept.relationships {
            let typ = space
                .handle_of(rel.typ)
                .ok_or_else(|| out_of_scope(concept.id, rel, rel.typ))?;
            let destination = space
                .handle_of(rel.destination)
                .ok_or_else(|| out_of_scope(concept.id, rel, rel.destination))?;
            if !role_set.contains(&typ) {
                tracing::warn!(
                    rel_id = rel.rel_id,
                    typ = %rel.typ,
                    "relationship type outside the role-root descent"
                );
            }
            relationships.push(EncodedRelationship {
                source,
                typ,
                destination,
                group: rel.group,
                rel_id: rel.rel_id,
            });
        }
    }
    relationships.sort_unstable();

    // Defined-concept marker set.
    let mut defined: Vec<Handle> = snapshots
        .iter()
        .filter(|c| c.defined)
        .filter_map(|c| space.handle_of(c.id))
        .collect();
    defined.sort_unstable();

    // Concept array: sorted populated prefix, then padding to full capacity.
    let defined_ids: HashSet<ConceptId> = snapshots
        .iter()
        .filter(|c| c.defined)
        .map(|c| c.id)
        .collect();
    let capacity = space.array_capacity(params.margin_percent);
    let mut concepts = Vec::with_capacity(capacity);
    for (i, &id) in space.ids().iter().enumerate() {
        concepts.push(EncodedConcept {
            handle: Handle(Handle::FIRST.0 + i as u32),
            external: id.get(),
            defined: defined_ids.contains(&id),
        });
    }
    let populated = concepts.len();
    concepts.resize(capacity, EncodedConcept::padding());

    tracing::debug!(
        concepts = populated,
        capacity,
        roles = roles.len(),
        relationships = relationships.len(),
        defined = defined.len(),
        "ontology encoded"
    );

    Ok((
        space,
        EncodedOntology {
            concepts,
            populated,
            roles,
            relationships,
            defined,
        },
    ))
}

/// Walk the role root's descendants along stated IS-A edges.
///
/// BFS over a child index built once from the snapshots, bounding the role
/// array by the role hierarchy rather than by relationship volume. IS-A is
/// forced at index 0; descendants follow in handle order.
fn discover_roles(
    snapshots: &[ConceptSnapshot],
    space: &HandleSpace,
    isa: ConceptId,
    isa_handle: Handle,
    role_root_handle: Handle,
) -> Vec<Handle> {
    // parent handle → child handles, IS-A edges only.
    let mut children: HashMap<Handle, Vec<Handle>> = HashMap::new();
    for concept in snapshots {
        let Some(child) = space.handle_of(concept.id) else {
            continue;
        };
        for rel in &concept.relationships {
            if rel.typ != isa {
                continue;
            }
            if let Some(parent) = space.handle_of(rel.destination) {
                children.entry(parent).or_default().push(child);
            }
        }
    }

    let mut visited: HashSet<Handle> = HashSet::new();
    let mut queue: VecDeque<Handle> = VecDeque::new();
    visited.insert(role_root_handle);
    queue.push_back(role_root_handle);

    let mut descendants: Vec<Handle> = Vec::new();
    while let Some(node) = queue.pop_front() {
        if let Some(kids) = children.get(&node) {
            for &kid in kids {
                if visited.insert(kid) {
                    descendants.push(kid);
                    queue.push_back(kid);
                }
            }
        }
    }
    descendants.sort_unstable();

    let mut roles = Vec::with_capacity(descendants.len() + 1);
    roles.push(isa_handle);
    roles.extend(descendants.into_iter().filter(|&h| h != isa_handle));
    roles
}

fn out_of_scope(
    source: ConceptId,
    rel: &crate::source::StatedRelationship,
    missing: ConceptId,
) -> EncodeError {
    EncodeError::OutOfScope {
        rel_id: rel.rel_id,
        source_id: source.get(),
        typ: rel.typ.get(),
        destination: rel.destination.get(),
        missing: missing.get(),
    }
}
