//! Benchmarks for ontology encoding.

use criterion::{black_box, criterion_group, criterion_main, Criterion};

use ontobridge::concept::ConceptId;
use ontobridge::encode::{encode, EncodeParams};
use ontobridge::source::{ConceptSnapshot, StatedRelationship};

const ROOT: u64 = 1;
const ISA: u64 = 116;
const ROLE_ROOT: u64 = 400;

fn cid(v: u64) -> ConceptId {
    ConceptId::new(v).unwrap()
}

/// A shallow synthetic taxonomy: `n` concepts under the root, every tenth
/// one defined, plus a handful of roles under the role root.
fn synthetic_ontology(n: u64) -> Vec<ConceptSnapshot> {
    let isa_to = |rel_id: u64, destination: u64| StatedRelationship {
        rel_id,
        typ: cid(ISA),
        destination: cid(destination),
        group: 0,
    };

    let mut concepts = vec![
        ConceptSnapshot {
            id: cid(ROOT),
            defined: false,
            relationships: vec![],
        },
        ConceptSnapshot {
            id: cid(ISA),
            defined: false,
            relationships: vec![isa_to(1, ROOT)],
        },
        ConceptSnapshot {
            id: cid(ROLE_ROOT),
            defined: false,
            relationships: vec![isa_to(2, ROOT)],
        },
    ];
    for i in 0..10 {
        concepts.push(ConceptSnapshot {
            id: cid(401 + i),
            defined: false,
            relationships: vec![isa_to(10 + i, ROLE_ROOT)],
        });
    }
    for i in 0..n {
        let parent = if i == 0 { ROOT } else { 1000 + (i - 1) / 4 };
        concepts.push(ConceptSnapshot {
            id: cid(1000 + i),
            defined: i % 10 == 0,
            relationships: vec![isa_to(100 + i, parent)],
        });
    }
    concepts
}

fn params() -> EncodeParams {
    EncodeParams {
        isa: cid(ISA),
        role_root: cid(ROLE_ROOT),
        max_roles: 100,
        margin_percent: 25,
    }
}

fn bench_encode_10k(c: &mut Criterion) {
    let concepts = synthetic_ontology(10_000);
    c.bench_function("encode_10k_concepts", |bench| {
        bench.iter(|| black_box(encode(&concepts, &params()).unwrap()))
    });
}

fn bench_encode_100k(c: &mut Criterion) {
    let concepts = synthetic_ontology(100_000);
    c.bench_function("encode_100k_concepts", |bench| {
        bench.iter(|| black_box(encode(&concepts, &params()).unwrap()))
    });
}

criterion_group!(benches, bench_encode_10k, bench_encode_100k);
criterion_main!(benches);
