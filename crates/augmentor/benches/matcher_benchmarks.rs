//! Row matching and merge performance benchmarks.
//!
//! Measures exact and fuzzy pair finding as the supplied table grows.

use augmentor::{
    AugmentMerger, ColumnKeyIndex, JoinMode, JoinSpec, MatcherConfig, MergeOptions, RowMatcher, Table,
};
use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};

/// Supplied table with an entity-id column and a city-name column.
fn generate_supplied(rows: usize) -> Table {
    let rows_data = (0..rows)
        .map(|row| {
            vec![
                format!("Q{}", row % 500),
                format!("City {} {}", row % 250, ["North", "South", "East"][row % 3]),
                format!("{:.2}", row as f64 * 1.5),
            ]
        })
        .collect();
    Table::from_rows(
        vec!["entity".to_string(), "city".to_string(), "value".to_string()],
        rows_data,
    )
    .unwrap()
}

/// Companion table keyed by the same ids and slightly different spellings.
fn generate_companion(rows: usize) -> Table {
    let rows_data = (0..rows)
        .map(|row| {
            vec![
                format!("Q{}", row),
                format!("city {} {}", row % 250, ["north", "south", "east"][row % 3]),
                format!("{}", row * 1000),
            ]
        })
        .collect();
    Table::from_rows(
        vec!["entity_id".to_string(), "address".to_string(), "population".to_string()],
        rows_data,
    )
    .unwrap()
}

/// Benchmark exact matching on entity ids.
fn bench_exact_match(c: &mut Criterion) {
    let mut group = c.benchmark_group("exact_match");
    let companion = generate_companion(500);
    let matcher = RowMatcher::with_config(MatcherConfig::default().with_mode(JoinMode::Exact));
    let spec = JoinSpec::single(0, 0);

    for rows in [100, 1_000, 10_000].iter() {
        let supplied = generate_supplied(*rows);

        group.throughput(Throughput::Elements(*rows as u64));
        group.bench_with_input(BenchmarkId::new("rows", rows), &supplied, |b, supplied| {
            b.iter(|| black_box(matcher.find_pairs(supplied, &companion, &spec).unwrap()))
        });
    }

    group.finish();
}

/// Benchmark fuzzy matching on free-text place names.
fn bench_fuzzy_match(c: &mut Criterion) {
    let mut group = c.benchmark_group("fuzzy_match");
    let companion = generate_companion(750);
    let matcher = RowMatcher::with_config(MatcherConfig::default().with_mode(JoinMode::Fuzzy));
    let spec = JoinSpec::single(1, 1);

    for rows in [100, 1_000].iter() {
        let supplied = generate_supplied(*rows);

        group.throughput(Throughput::Elements(*rows as u64));
        group.bench_with_input(BenchmarkId::new("rows", rows), &supplied, |b, supplied| {
            b.iter(|| black_box(matcher.find_pairs(supplied, &companion, &spec).unwrap()))
        });
    }

    group.finish();
}

/// Benchmark key index construction and column overlap scoring.
fn bench_key_index(c: &mut Criterion) {
    let mut group = c.benchmark_group("key_index");
    let companion = generate_companion(500);
    let right = ColumnKeyIndex::build(&companion);

    for rows in [1_000, 10_000].iter() {
        let supplied = generate_supplied(*rows);

        group.throughput(Throughput::Elements(*rows as u64));
        group.bench_with_input(BenchmarkId::new("rows", rows), &supplied, |b, supplied| {
            b.iter(|| {
                let left = ColumnKeyIndex::build(supplied);
                black_box(ColumnKeyIndex::best_pair(&left, &right, &[0, 1], &[0, 1]))
            })
        });
    }

    group.finish();
}

/// Benchmark merging after exact matching.
fn bench_merge(c: &mut Criterion) {
    let mut group = c.benchmark_group("merge");
    let companion = generate_companion(500);
    let matcher = RowMatcher::with_config(MatcherConfig::default().with_mode(JoinMode::Exact));
    let options = MergeOptions::new().with_right_key_columns(vec![0]);

    for rows in [1_000, 10_000].iter() {
        let supplied = generate_supplied(*rows);
        let pairs = matcher
            .find_pairs(&supplied, &companion, &JoinSpec::single(0, 0))
            .unwrap()
            .pairs;

        group.throughput(Throughput::Elements(*rows as u64));
        group.bench_with_input(BenchmarkId::new("rows", rows), &supplied, |b, supplied| {
            b.iter(|| black_box(AugmentMerger::new().merge(supplied, &companion, &pairs, &options).unwrap()))
        });
    }

    group.finish();
}

criterion_group!(
    benches,
    bench_exact_match,
    bench_fuzzy_match,
    bench_key_index,
    bench_merge,
);
criterion_main!(benches);
