// Copyright 2025 Vivian Voss. Licensed under the Apache License, Version 2.0.
// SPDX-License-Identifier: Apache-2.0

//! Core fingerprint and index benchmarks.
//!
//! Measures performance of:
//! - the bit algebra (weight, tanimoto, canonical compare)
//! - insertion into an in-memory index
//! - subset and similarity scans
//!
//! ## Performance Targets
//! - weight/tanimoto over 256 bytes: < 100ns
//! - insert (1024-bit fingerprints): < 50µs amortised
//! - subset scan over 10k rows: well under a full-scan millisecond budget

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use fingerbase::bfp::ops;
use fingerbase::rdtree::RdTree;

/// Deterministic pseudo-random fingerprint of `len` bytes.
fn generate_bfp(len: usize, seed: u64) -> Vec<u8> {
    let mut state = seed.wrapping_mul(0x9e37_79b9_7f4a_7c15) | 1;
    (0..len)
        .map(|_| {
            state ^= state << 13;
            state ^= state >> 7;
            state ^= state << 17;
            // keep roughly a quarter of the bits set
            ((state & state >> 1) & 0xff) as u8
        })
        .collect()
}

fn bench_bit_algebra(c: &mut Criterion) {
    let mut group = c.benchmark_group("bit_algebra");

    for size in [16usize, 64, 128, 256].iter() {
        let a = generate_bfp(*size, 1);
        let b = generate_bfp(*size, 2);

        group.throughput(Throughput::Bytes(*size as u64));
        group.bench_with_input(BenchmarkId::new("weight", size), size, |bench, _| {
            bench.iter(|| black_box(ops::weight(black_box(&a))));
        });
        group.bench_with_input(BenchmarkId::new("tanimoto", size), size, |bench, _| {
            bench.iter(|| black_box(ops::tanimoto(black_box(&a), black_box(&b))));
        });
        group.bench_with_input(BenchmarkId::new("cmp", size), size, |bench, _| {
            bench.iter(|| black_box(ops::cmp(black_box(&a), black_box(&b))));
        });
    }

    group.finish();
}

fn bench_insert(c: &mut Criterion) {
    let mut group = c.benchmark_group("insert");
    group.sample_size(20);

    group.bench_function("insert_1000_rows", |bench| {
        bench.iter(|| {
            let mut index = RdTree::create_in_memory("id, s bits(1024)").unwrap();
            for i in 0..1000u64 {
                index.insert(None, &generate_bfp(128, i)).unwrap();
            }
            black_box(index.row_count())
        });
    });

    group.finish();
}

fn bench_search(c: &mut Criterion) {
    let mut group = c.benchmark_group("search");

    let mut index = RdTree::create_in_memory("id, s bits(1024)").unwrap();
    for i in 0..10_000u64 {
        index.insert(None, &generate_bfp(128, i)).unwrap();
    }
    let probe = generate_bfp(128, 77);

    group.bench_function("subset_10k_rows", |bench| {
        bench.iter(|| black_box(index.search_subset(&probe).unwrap()));
    });
    group.bench_function("tanimoto_10k_rows", |bench| {
        bench.iter(|| black_box(index.search_tanimoto(&probe, 0.6).unwrap()));
    });
    group.bench_function("full_scan_10k_rows", |bench| {
        bench.iter(|| black_box(index.full_scan().unwrap()));
    });

    group.finish();
}

criterion_group!(benches, bench_bit_algebra, bench_insert, bench_search);
criterion_main!(benches);
