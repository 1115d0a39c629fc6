use std::sync::Arc;

use criterion::{criterion_group, criterion_main, BatchSize, Criterion, Throughput};

use cellmap::{
    CanonicalRecord, HashingEmbedder, ReferenceIndex, SemanticRanker, SimilarityMethod,
};

const QUERIES: [&str; 8] = [
    "hela cells",
    "mcf 7",
    "hek 293t",
    "a549 lung",
    "jurkat e6",
    "k562 leukemia",
    "line 0421 clone b",
    "unrelated text",
];

fn make_index(size: usize) -> ReferenceIndex {
    // Synthetic reference table with three synonyms per record.
    let records = (0..size)
        .map(|i| {
            let name = format!("LINE-{i:04}");
            CanonicalRecord::new(name.clone(), name, format!("CVCL_{i:04}")).with_synonym_cell(
                &format!("line {i:04}; LINE{i:04}; line {i:04} clone {}", i % 7),
            )
        })
        .collect();
    ReferenceIndex::build(records)
}

fn new_ranker() -> SemanticRanker {
    SemanticRanker::new(
        SimilarityMethod::Cosine,
        Arc::new(HashingEmbedder::default()),
    )
}

fn bench_rank_cold_cache(c: &mut Criterion) {
    let index = make_index(512);
    let sets = index.all_synonym_sets();

    let mut group = c.benchmark_group("ranking");
    group.throughput(Throughput::Elements(QUERIES.len() as u64));
    group.bench_function("cold_cache", |b| {
        // Fresh caches per iteration so every term is embedded again.
        b.iter_batched(
            new_ranker,
            |ranker| {
                for query in QUERIES {
                    let ranked = ranker.rank(query, sets, 0.9, 5).unwrap();
                    criterion::black_box(ranked);
                }
            },
            BatchSize::SmallInput,
        );
    });
    group.finish();
}

fn bench_rank_warm_cache(c: &mut Criterion) {
    let index = make_index(512);
    let sets = index.all_synonym_sets();
    let ranker = new_ranker();
    for query in QUERIES {
        ranker.rank(query, sets, 0.9, 5).unwrap();
    }

    let mut group = c.benchmark_group("ranking");
    group.throughput(Throughput::Elements(QUERIES.len() as u64));
    group.bench_function("warm_cache", |b| {
        b.iter(|| {
            for query in QUERIES {
                let ranked = ranker.rank(query, sets, 0.9, 5).unwrap();
                criterion::black_box(ranked);
            }
        });
    });
    group.finish();
}

criterion_group!(ranking, bench_rank_cold_cache, bench_rank_warm_cache);
criterion_main!(ranking);
