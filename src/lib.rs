//! # ontobridge
//!
//! Bridge between a versioned terminology graph store and a black-box
//! description-logic classification engine.
//!
//! ## Architecture
//!
//! - **ID spaces** (`concept`, `alloc`): persistent external identifiers vs.
//!   a run-private dense handle space with reserved TOP/BOTTOM sentinels
//! - **Encoding** (`encode`): sorted + padded concept array, role array from
//!   the role-root descent, relationship triples, defined set
//! - **Engine contract** (`engine`): configure → load axioms → one blocking
//!   classify call → two callback channels
//! - **Reconciliation** (`reconcile`, `report`): decode engine output, diff
//!   against the committed inferred set, minimal add/retract change set
//! - **Orchestration** (`run`): per-run worker thread, cooperative
//!   cancellation, monotonic progress
//!
//! ## Library usage
//!
//! ```
//! use std::sync::atomic::AtomicBool;
//!
//! use ontobridge::concept::ConceptId;
//! use ontobridge::engine::StubEngine;
//! use ontobridge::run::{self, NullProgress, RunConfig, RunOutcome};
//! use ontobridge::source::{ConceptSnapshot, MemorySource, PathId, StatedRelationship};
//!
//! let cid = |v| ConceptId::new(v).unwrap();
//! let isa_to = |rel_id, destination| StatedRelationship {
//!     rel_id,
//!     typ: cid(116),
//!     destination: cid(destination),
//!     group: 0,
//! };
//! let concept = |id, rels: Vec<StatedRelationship>| ConceptSnapshot {
//!     id: cid(id),
//!     defined: false,
//!     relationships: rels,
//! };
//!
//! let source = MemorySource::new(vec![
//!     concept(1, vec![]),
//!     concept(116, vec![isa_to(1, 1)]),
//!     concept(400, vec![isa_to(2, 1)]),
//!     concept(10, vec![isa_to(3, 1)]),
//! ]);
//! let config = RunConfig::from_toml_str("root = 1\nisa = 116\nrole_root = 400\n").unwrap();
//!
//! let mut engine = StubEngine::empty();
//! let cancel = AtomicBool::new(false);
//! let outcome = run::execute(&source, &mut engine, &config, PathId(1), &NullProgress, &cancel)
//!     .unwrap();
//! assert!(matches!(outcome, RunOutcome::Completed { .. }));
//! ```

pub mod alloc;
pub mod concept;
pub mod encode;
pub mod engine;
pub mod error;
pub mod reconcile;
pub mod report;
pub mod run;
pub mod source;
