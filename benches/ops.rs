//! Micro-operation benchmarks for the trie and the TTL scheduler.
//!
//! Run with: `cargo bench --bench ops`
//!
//! Measures per-operation latency for trie put/get/delete over path-shaped
//! keys and for scheduler put/delete over integer keys.

use std::hint::black_box;
use std::time::{Duration, Instant};

use criterion::{criterion_group, criterion_main, Criterion, Throughput};
use dskit::trie::Trie;
use dskit::ttl::Ttl;

const OPS: u64 = 10_000;

fn path_keys(count: u64) -> Vec<String> {
    (0..count)
        .map(|i| format!("/srv/node{}/shard{}/object{}", i % 13, i % 89, i))
        .collect()
}

// ============================================================================
// Trie Operations (ns/op)
// ============================================================================

fn bench_trie_ops(c: &mut Criterion) {
    let mut group = c.benchmark_group("trie_ops_ns");
    group.throughput(Throughput::Elements(OPS));

    group.bench_function("put", |b| {
        let keys = path_keys(OPS);
        b.iter_custom(|iters| {
            let mut elapsed = Duration::ZERO;
            for _ in 0..iters {
                let mut trie = Trie::new();
                let start = Instant::now();
                for (i, key) in keys.iter().enumerate() {
                    black_box(trie.put(key, i));
                }
                elapsed += start.elapsed();
            }
            elapsed
        })
    });

    group.bench_function("get_hit", |b| {
        let keys = path_keys(OPS);
        let mut trie = Trie::new();
        for (i, key) in keys.iter().enumerate() {
            trie.put(key, i);
        }
        b.iter(|| {
            for key in &keys {
                black_box(trie.get(key));
            }
        })
    });

    group.bench_function("delete", |b| {
        let keys = path_keys(OPS);
        b.iter_custom(|iters| {
            let mut elapsed = Duration::ZERO;
            for _ in 0..iters {
                let mut trie = Trie::new();
                for (i, key) in keys.iter().enumerate() {
                    trie.put(key, i);
                }
                let start = Instant::now();
                for key in &keys {
                    black_box(trie.delete(key));
                }
                elapsed += start.elapsed();
            }
            elapsed
        })
    });

    group.bench_function("prefixes", |b| {
        let keys = path_keys(OPS);
        let mut trie = Trie::new();
        for (i, key) in keys.iter().enumerate() {
            trie.put(key, i);
        }
        b.iter(|| {
            for key in keys.iter().take(1_000) {
                black_box(trie.prefixes(key));
            }
        })
    });

    group.finish();
}

// ============================================================================
// TTL Scheduler Operations (ns/op)
// ============================================================================

fn bench_ttl_ops(c: &mut Criterion) {
    let mut group = c.benchmark_group("ttl_ops_ns");
    group.throughput(Throughput::Elements(OPS));

    group.bench_function("put_ascending", |b| {
        b.iter_custom(|iters| {
            let mut elapsed = Duration::ZERO;
            for _ in 0..iters {
                let ttl: Ttl<u64> = Ttl::new(None);
                let start = Instant::now();
                for i in 0..OPS {
                    ttl.put(i, Duration::from_secs(3_600 + i)).unwrap();
                }
                elapsed += start.elapsed();
                ttl.stop().unwrap();
            }
            elapsed
        })
    });

    group.bench_function("put_descending", |b| {
        b.iter_custom(|iters| {
            let mut elapsed = Duration::ZERO;
            for _ in 0..iters {
                let ttl: Ttl<u64> = Ttl::new(None);
                let start = Instant::now();
                for i in 0..OPS {
                    ttl.put(i, Duration::from_secs(36_000 - i)).unwrap();
                }
                elapsed += start.elapsed();
                ttl.stop().unwrap();
            }
            elapsed
        })
    });

    group.bench_function("put_then_delete", |b| {
        b.iter_custom(|iters| {
            let mut elapsed = Duration::ZERO;
            for _ in 0..iters {
                let ttl: Ttl<u64> = Ttl::new(None);
                for i in 0..OPS {
                    ttl.put(i, Duration::from_secs(3_600)).unwrap();
                }
                let start = Instant::now();
                for i in 0..OPS {
                    ttl.delete(&i).unwrap();
                }
                elapsed += start.elapsed();
                ttl.stop().unwrap();
            }
            elapsed
        })
    });

    group.finish();
}

criterion_group!(benches, bench_trie_ops, bench_ttl_ops);
criterion_main!(benches);
