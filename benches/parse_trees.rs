//! Benchmarks for parsing behavior tree documents.
//!
//! Run with: cargo bench
//! Results are saved to target/criterion/

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};

/// Build a flat tree with `leaves` children under one root, mixing every
/// leaf form plus the occasional nested selector and comment.
fn wide_tree(leaves: usize) -> String {
    let mut source = String::from("->\n");
    for i in 0..leaves {
        match i % 4 {
            0 => source.push_str(&format!("|  [action {i}]\n")),
            1 => source.push_str(&format!("|  (condition {i})\n")),
            2 => source.push_str(&format!("|  !(condition {i})\n")),
            _ => {
                source.push_str("|  ?\n");
                source.push_str(&format!("|  |  [fallback {i}] ;; last resort\n"));
            }
        }
    }
    source
}

/// Build a sequence chain `depth` levels deep ending in a single leaf.
fn deep_tree(depth: usize) -> String {
    let mut source = String::from("->\n");
    for level in 1..depth {
        source.push_str(&format!("{}->\n", "|  ".repeat(level)));
    }
    source.push_str(&format!("{}[bottom]\n", "|  ".repeat(depth)));
    source
}

/// Benchmark parsing across document sizes.
fn bench_parse_by_size(c: &mut Criterion) {
    let sizes = [("small", 16), ("medium", 128), ("large", 1024)];

    let mut group = c.benchmark_group("parse_by_size");
    for (label, leaves) in sizes {
        let source = wide_tree(leaves);
        group.throughput(Throughput::Bytes(source.len() as u64));
        group.bench_with_input(BenchmarkId::new("parse", label), &source, |b, source| {
            b.iter(|| black_box(btree_lang::parse(source)));
        });
    }
    group.finish();
}

/// Benchmark wide versus deep documents of comparable node count.
fn bench_tree_shapes(c: &mut Criterion) {
    let wide = wide_tree(256);
    let deep = deep_tree(64);

    let mut group = c.benchmark_group("parse_shapes");
    group.throughput(Throughput::Bytes(wide.len() as u64));
    group.bench_function("wide", |b| b.iter(|| black_box(btree_lang::parse(&wide))));
    group.throughput(Throughput::Bytes(deep.len() as u64));
    group.bench_function("deep", |b| b.iter(|| black_box(btree_lang::parse(&deep))));
    group.finish();
}

/// Benchmark the full read path: parse alone, parse plus canonical text,
/// and parse plus the preview JSON form.
fn bench_roundtrip(c: &mut Criterion) {
    let source = wide_tree(128);

    let mut group = c.benchmark_group("roundtrip");
    group.throughput(Throughput::Bytes(source.len() as u64));

    group.bench_function("parse", |b| b.iter(|| black_box(btree_lang::parse(&source))));

    group.bench_function("parse_and_serialize", |b| {
        b.iter(|| {
            let tree = btree_lang::parse(&source);
            black_box(btree_lang::serialize(&tree))
        });
    });

    group.bench_function("parse_and_wire_json", |b| {
        b.iter(|| {
            let tree = btree_lang::parse(&source);
            black_box(serde_json::to_string(&tree.to_wire()))
        });
    });

    group.finish();
}

criterion_group!(
    benches,
    bench_parse_by_size,
    bench_tree_shapes,
    bench_roundtrip
);
criterion_main!(benches);
