//! End-to-end tests for the classification bridge.
//!
//! These drive the full pipeline — collect, encode, classify (stubbed),
//! reconcile — through `run::execute` with an in-memory source, pinning the
//! behaviors the write-back machinery depends on.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use ontobridge::concept::{ConceptId, InferredAxiom, Relationship, RelationshipKey};
use ontobridge::encode;
use ontobridge::engine::{FailingEngine, StubEngine};
use ontobridge::error::{BridgeError, BridgeResult, ConfigError, StoreError};
use ontobridge::run::{self, NullProgress, RunConfig, RunOutcome, VecProgress};
use ontobridge::source::{ConceptSnapshot, ConceptSource, MemorySource, PathId, StatedRelationship};

const ROOT: u64 = 1;
const ISA: u64 = 116;
const ROLE_ROOT: u64 = 400;

fn cid(v: u64) -> ConceptId {
    ConceptId::new(v).unwrap()
}

fn isa_to(rel_id: u64, destination: u64) -> StatedRelationship {
    StatedRelationship {
        rel_id,
        typ: cid(ISA),
        destination: cid(destination),
        group: 0,
    }
}

fn concept(id: u64, defined: bool, rels: Vec<StatedRelationship>) -> ConceptSnapshot {
    ConceptSnapshot {
        id: cid(id),
        defined,
        relationships: rels,
    }
}

fn key(s: u64, t: u64, d: u64) -> RelationshipKey {
    RelationshipKey {
        source: cid(s),
        typ: cid(t),
        destination: cid(d),
        group: 0,
    }
}

fn config() -> RunConfig {
    RunConfig::from_toml_str(&format!(
        "root = {ROOT}\nisa = {ISA}\nrole_root = {ROLE_ROOT}\n"
    ))
    .unwrap()
}

/// root, the IS-A type, the role root, and concepts A=10, B=20, C=30.
/// A and B are primitive children of root; C is defined under both.
fn scenario_concepts() -> Vec<ConceptSnapshot> {
    vec![
        concept(ROOT, false, vec![]),
        concept(ISA, false, vec![isa_to(1, ROOT)]),
        concept(ROLE_ROOT, false, vec![isa_to(2, ROOT)]),
        concept(10, false, vec![isa_to(3, ROOT)]),
        concept(20, false, vec![isa_to(4, ROOT)]),
        concept(30, true, vec![isa_to(5, 10), isa_to(6, 20)]),
    ]
}

fn handles_for(source: &MemorySource, config: &RunConfig) -> impl Fn(u64) -> InferredAxiom {
    let (space, _) = encode::encode(&source.concepts, &config.encode_params()).unwrap();
    let isa = space.handle_of(cid(ISA)).unwrap();
    move |dest: u64| InferredAxiom {
        source: space.handle_of(cid(30)).unwrap(),
        typ: isa,
        destination: space.handle_of(cid(dest)).unwrap(),
        group: 0,
    }
}

#[test]
fn scenario_a_minimal_change_set() {
    // Previously committed: C-isa->A and C-isa->B. The engine now reports
    // only C-isa->A: the run must retract C-isa->B and add nothing.
    let source = MemorySource::new(scenario_concepts()).with_inferred(vec![
        key(30, ISA, 10).with_rel_id(Some(900)),
        key(30, ISA, 20).with_rel_id(Some(901)),
    ]);
    let config = config();
    let axiom = handles_for(&source, &config);
    let mut engine = StubEngine::empty().with_inferred(vec![axiom(10)]);

    let cancel = AtomicBool::new(false);
    let outcome = run::execute(
        &source,
        &mut engine,
        &config,
        PathId(1),
        &NullProgress,
        &cancel,
    )
    .unwrap();

    let RunOutcome::Completed { changes, report, .. } = outcome else {
        panic!("run should complete");
    };
    assert!(report.is_empty());
    assert!(changes.additions.is_empty());
    assert_eq!(changes.retractions.len(), 1);
    assert_eq!(changes.retractions[0].key(), key(30, ISA, 20));
    assert_eq!(changes.retractions[0].rel_id, Some(901));
}

#[test]
fn scenario_b_equivalence_only() {
    // The engine proves {A, B} equivalent and reports no normalized
    // relationships: exactly one group, no relationship changes.
    let source = MemorySource::new(scenario_concepts());
    let config = config();
    let (space, _) = encode::encode(&source.concepts, &config.encode_params()).unwrap();
    let mut engine = StubEngine::empty().with_equivalences(vec![vec![
        space.handle_of(cid(20)).unwrap(),
        space.handle_of(cid(10)).unwrap(),
    ]]);

    let cancel = AtomicBool::new(false);
    let outcome = run::execute(
        &source,
        &mut engine,
        &config,
        PathId(1),
        &NullProgress,
        &cancel,
    )
    .unwrap();

    let RunOutcome::Completed { changes, report, .. } = outcome else {
        panic!("run should complete");
    };
    assert_eq!(report.groups, vec![vec![cid(10), cid(20)]]);
    assert_eq!(report.render(), "10\t20\n");
    assert!(changes.is_empty());
}

#[test]
fn first_run_stages_every_candidate_as_addition() {
    let source = MemorySource::new(scenario_concepts());
    let config = config();
    let axiom = handles_for(&source, &config);
    let mut engine = StubEngine::empty().with_inferred(vec![axiom(10), axiom(20)]);

    let cancel = AtomicBool::new(false);
    let outcome = run::execute(
        &source,
        &mut engine,
        &config,
        PathId(1),
        &NullProgress,
        &cancel,
    )
    .unwrap();

    let RunOutcome::Completed { changes, .. } = outcome else {
        panic!("run should complete");
    };
    assert!(changes.retractions.is_empty());
    let added: Vec<RelationshipKey> = changes.additions.iter().map(Relationship::key).collect();
    assert_eq!(added, vec![key(30, ISA, 10), key(30, ISA, 20)]);
    assert!(changes.additions.iter().all(|r| r.rel_id.is_none()));
}

/// Source that requests cancellation once half its concepts were yielded.
struct CancelsHalfway {
    inner: MemorySource,
    cancel: Arc<AtomicBool>,
}

impl ConceptSource for CancelsHalfway {
    fn concepts_on_path(
        &self,
        path: PathId,
    ) -> BridgeResult<Box<dyn Iterator<Item = BridgeResult<ConceptSnapshot>> + '_>> {
        let halfway = self.inner.concepts.len() / 2;
        let cancel = Arc::clone(&self.cancel);
        let iter = self
            .inner
            .concepts_on_path(path)?
            .enumerate()
            .map(move |(i, item)| {
                if i + 1 == halfway {
                    cancel.store(true, Ordering::Relaxed);
                }
                item
            });
        Ok(Box::new(iter))
    }

    fn inferred_on_path(&self, path: PathId) -> BridgeResult<Vec<Relationship>> {
        self.inner.inferred_on_path(path)
    }
}

#[test]
fn cancel_mid_collection_never_reaches_engine() {
    let cancel = Arc::new(AtomicBool::new(false));
    let source = CancelsHalfway {
        inner: MemorySource::new(scenario_concepts()),
        cancel: Arc::clone(&cancel),
    };
    let mut engine = StubEngine::empty();
    let progress = VecProgress::new();

    let outcome = run::execute(
        &source,
        &mut engine,
        &config(),
        PathId(1),
        &progress,
        &cancel,
    )
    .unwrap();

    assert!(matches!(outcome, RunOutcome::Cancelled));
    assert!(!engine.was_invoked());
    let last = progress.events().last().cloned().unwrap();
    assert!(last.1.contains("cancelled"));
    assert!(last.0 < 100);
}

/// Source whose iterator fails partway through collection.
struct FailsAfter {
    inner: MemorySource,
    after: usize,
}

impl ConceptSource for FailsAfter {
    fn concepts_on_path(
        &self,
        path: PathId,
    ) -> BridgeResult<Box<dyn Iterator<Item = BridgeResult<ConceptSnapshot>> + '_>> {
        let iter = self.inner.concepts_on_path(path)?.take(self.after).chain(
            std::iter::once(Err(StoreError::Read {
                message: "connection reset by store".into(),
            }
            .into())),
        );
        Ok(Box::new(iter))
    }

    fn inferred_on_path(&self, path: PathId) -> BridgeResult<Vec<Relationship>> {
        self.inner.inferred_on_path(path)
    }
}

#[test]
fn store_read_failure_aborts_before_engine() {
    let source = FailsAfter {
        inner: MemorySource::new(scenario_concepts()),
        after: 3,
    };
    let mut engine = StubEngine::empty();

    let cancel = AtomicBool::new(false);
    let err = run::execute(
        &source,
        &mut engine,
        &config(),
        PathId(1),
        &NullProgress,
        &cancel,
    )
    .unwrap_err();

    assert!(matches!(
        err,
        BridgeError::Store(StoreError::Read { .. })
    ));
    assert!(!engine.was_invoked());
}

#[test]
fn role_guard_fires_before_engine_end_to_end() {
    let mut concepts = scenario_concepts();
    for i in 0..101u64 {
        concepts.push(concept(500 + i, false, vec![isa_to(100 + i, ROLE_ROOT)]));
    }
    let source = MemorySource::new(concepts);
    let mut engine = StubEngine::empty();

    let cancel = AtomicBool::new(false);
    let err = run::execute(
        &source,
        &mut engine,
        &config(),
        PathId(1),
        &NullProgress,
        &cancel,
    )
    .unwrap_err();

    assert!(matches!(
        err,
        BridgeError::Config(ConfigError::RoleLimit { .. })
    ));
    assert!(!engine.was_invoked());
}

#[test]
fn engine_failure_produces_no_change_set() {
    let source = MemorySource::new(scenario_concepts());
    let mut engine = FailingEngine;

    let cancel = AtomicBool::new(false);
    let err = run::execute(
        &source,
        &mut engine,
        &config(),
        PathId(1),
        &NullProgress,
        &cancel,
    )
    .unwrap_err();

    assert!(matches!(err, BridgeError::Engine(_)));
}

#[test]
fn encoding_is_stable_across_shuffled_visitation_order() {
    // Two sources with the same concepts in different visitation order must
    // produce byte-identical engine input.
    let forward = scenario_concepts();
    let mut reversed = forward.clone();
    reversed.reverse();
    let params = config().encode_params();

    let (_, a) = encode::encode(&forward, &params).unwrap();
    let (_, b) = encode::encode(&reversed, &params).unwrap();
    assert_eq!(a.concepts, b.concepts);
    assert_eq!(a.roles, b.roles);
    assert_eq!(a.relationships, b.relationships);
    assert_eq!(a.defined, b.defined);
}

#[test]
fn report_file_is_diffable_between_runs() {
    let dir = tempfile::TempDir::new().unwrap();
    let source = MemorySource::new(scenario_concepts());
    let config = config();
    let (space, _) = encode::encode(&source.concepts, &config.encode_params()).unwrap();
    let group = vec![
        space.handle_of(cid(10)).unwrap(),
        space.handle_of(cid(20)).unwrap(),
    ];

    let mut paths = Vec::new();
    for run_idx in 0..2 {
        let mut engine = StubEngine::empty().with_equivalences(vec![group.clone()]);
        let cancel = AtomicBool::new(false);
        let outcome = run::execute(
            &source,
            &mut engine,
            &config,
            PathId(1),
            &NullProgress,
            &cancel,
        )
        .unwrap();
        let RunOutcome::Completed { report, .. } = outcome else {
            panic!("run should complete");
        };
        let path = dir.path().join(format!("run{run_idx}.tsv"));
        report.write_to_path(&path).unwrap();
        paths.push(path);
    }

    let first = std::fs::read_to_string(&paths[0]).unwrap();
    let second = std::fs::read_to_string(&paths[1]).unwrap();
    assert_eq!(first, second);
}

#[test]
fn stub_engine_sees_sorted_padded_arrays() {
    let source = MemorySource::new(scenario_concepts());
    let mut engine = StubEngine::empty();

    let cancel = AtomicBool::new(false);
    run::execute(
        &source,
        &mut engine,
        &config(),
        PathId(1),
        &NullProgress,
        &cancel,
    )
    .unwrap();

    let loaded = engine.loaded.as_ref().unwrap();
    assert_eq!(loaded.populated, 6);
    for pair in loaded.concepts[..loaded.populated].windows(2) {
        assert!(pair[0].external < pair[1].external);
    }
    assert!(loaded.concepts[loaded.populated..]
        .iter()
        .all(|c| c.is_padding()));
    // IS-A leads the role array.
    let (root, isa, _) = engine.configured.unwrap();
    assert_eq!(loaded.roles[0], isa);
    assert!(!root.is_sentinel());
}
