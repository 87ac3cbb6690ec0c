//! Performance benchmarks for radix_index
//!
//! Run with: cargo bench

use criterion::{
    black_box, criterion_group, criterion_main, BenchmarkId, Criterion,
    Throughput,
};
use rand::prelude::*;

use radix_index::{RadixTree, SeekOp};

/// Generate `count` random keys of up to 24 bytes over a small alphabet,
/// so that prefixes are shared the way they are in real key spaces.
fn random_keys(count: usize, seed: u64) -> Vec<Vec<u8>> {
    let mut rng = StdRng::seed_from_u64(seed);
    (0..count)
        .map(|_| {
            let len = rng.gen_range(4..24);
            (0..len).map(|_| rng.gen_range(b'a'..=b'h')).collect()
        })
        .collect()
}

fn populated(keys: &[Vec<u8>]) -> RadixTree<u64> {
    let mut tree = RadixTree::new();
    for (i, key) in keys.iter().enumerate() {
        tree.insert(key, Some(i as u64)).unwrap();
    }
    tree
}

fn bench_insert(c: &mut Criterion) {
    let mut group = c.benchmark_group("insert");
    for size in [1_000, 10_000, 100_000] {
        let keys = random_keys(size, 1);
        group.throughput(Throughput::Elements(size as u64));
        group.bench_with_input(
            BenchmarkId::from_parameter(size),
            &keys,
            |b, keys| {
                b.iter(|| {
                    let mut tree = RadixTree::new();
                    for (i, key) in keys.iter().enumerate() {
                        tree.insert(black_box(key), Some(i as u64)).unwrap();
                    }
                    tree
                })
            },
        );
    }
    group.finish();
}

fn bench_get(c: &mut Criterion) {
    let mut group = c.benchmark_group("get");
    for size in [1_000, 10_000, 100_000] {
        let keys = random_keys(size, 2);
        let tree = populated(&keys);
        group.throughput(Throughput::Elements(size as u64));
        group.bench_with_input(
            BenchmarkId::new("hit", size),
            &keys,
            |b, keys| {
                b.iter(|| {
                    for key in keys {
                        black_box(tree.get(black_box(key)));
                    }
                })
            },
        );

        let misses = random_keys(size, 3);
        group.bench_with_input(
            BenchmarkId::new("mixed", size),
            &misses,
            |b, misses| {
                b.iter(|| {
                    for key in misses {
                        black_box(tree.get(black_box(key)));
                    }
                })
            },
        );
    }
    group.finish();
}

fn bench_remove(c: &mut Criterion) {
    let mut group = c.benchmark_group("remove");
    for size in [1_000, 10_000] {
        let keys = random_keys(size, 4);
        group.throughput(Throughput::Elements(size as u64));
        group.bench_with_input(
            BenchmarkId::from_parameter(size),
            &keys,
            |b, keys| {
                b.iter_batched(
                    || populated(keys),
                    |mut tree| {
                        for key in keys {
                            black_box(tree.remove(black_box(key)));
                        }
                        tree
                    },
                    criterion::BatchSize::SmallInput,
                )
            },
        );
    }
    group.finish();
}

fn bench_scan(c: &mut Criterion) {
    let mut group = c.benchmark_group("scan");
    for size in [1_000, 10_000, 100_000] {
        let keys = random_keys(size, 5);
        let tree = populated(&keys);
        group.throughput(Throughput::Elements(tree.len()));
        group.bench_with_input(
            BenchmarkId::new("forward", size),
            &tree,
            |b, tree| {
                b.iter(|| {
                    let mut it = tree.iter();
                    it.seek(SeekOp::First, b"").unwrap();
                    let mut n = 0u64;
                    while it.next().unwrap() {
                        black_box(it.key());
                        n += 1;
                    }
                    n
                })
            },
        );
    }
    group.finish();
}

fn bench_seek(c: &mut Criterion) {
    let mut group = c.benchmark_group("seek");
    let keys = random_keys(10_000, 6);
    let tree = populated(&keys);
    let probes = random_keys(1_000, 7);
    group.throughput(Throughput::Elements(probes.len() as u64));
    for (name, op) in [("ge", SeekOp::Ge), ("lt", SeekOp::Lt)] {
        group.bench_with_input(
            BenchmarkId::from_parameter(name),
            &probes,
            |b, probes| {
                b.iter(|| {
                    let mut it = tree.iter();
                    for probe in probes {
                        black_box(it.seek(op, black_box(probe)).unwrap());
                    }
                })
            },
        );
    }
    group.finish();
}

criterion_group!(
    benches,
    bench_insert,
    bench_get,
    bench_remove,
    bench_scan,
    bench_seek
);
criterion_main!(benches);
