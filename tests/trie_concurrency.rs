// ==============================================
// CONCURRENT TRIE TESTS (integration)
// ==============================================
//
// Multi-threaded put/get/delete against ConcurrentTrie. These require real
// threads and cannot live inline.

use std::sync::{Arc, Barrier};
use std::thread;

use dskit::trie::ConcurrentTrie;

// ==============================================
// Disjoint Writers
// ==============================================

#[test]
fn concurrent_puts_gets_and_deletes_over_disjoint_keys() {
    let trie: Arc<ConcurrentTrie<usize>> = Arc::new(ConcurrentTrie::new());
    let threads = 8;
    let keys_per_thread = 100;
    let barrier = Arc::new(Barrier::new(threads));

    let handles: Vec<_> = (0..threads)
        .map(|tid| {
            let trie = Arc::clone(&trie);
            let barrier = Arc::clone(&barrier);
            thread::spawn(move || {
                barrier.wait();
                for i in 0..keys_per_thread {
                    let key = format!("key_{tid}_{i}");
                    assert_eq!(trie.put(&key, tid * keys_per_thread + i), None);
                }
            })
        })
        .collect();
    for handle in handles {
        handle.join().unwrap();
    }
    assert_eq!(trie.len(), threads * keys_per_thread);

    let handles: Vec<_> = (0..threads)
        .map(|tid| {
            let trie = Arc::clone(&trie);
            thread::spawn(move || {
                for i in 0..keys_per_thread {
                    let key = format!("key_{tid}_{i}");
                    assert_eq!(trie.get(&key), Some(tid * keys_per_thread + i));
                }
            })
        })
        .collect();
    for handle in handles {
        handle.join().unwrap();
    }

    let handles: Vec<_> = (0..threads)
        .map(|tid| {
            let trie = Arc::clone(&trie);
            thread::spawn(move || {
                for i in 0..keys_per_thread {
                    let key = format!("key_{tid}_{i}");
                    assert_eq!(trie.delete(&key), Some(tid * keys_per_thread + i));
                }
            })
        })
        .collect();
    for handle in handles {
        handle.join().unwrap();
    }
    assert!(trie.is_empty());
}

// ==============================================
// Readers During Writes
// ==============================================

#[test]
fn readers_observe_consistent_values_during_writes() {
    let trie: Arc<ConcurrentTrie<u64>> = Arc::new(ConcurrentTrie::new());
    for i in 0..50u64 {
        trie.put(&format!("stable_{i}"), i);
    }

    let barrier = Arc::new(Barrier::new(3));

    let writer = {
        let trie = Arc::clone(&trie);
        let barrier = Arc::clone(&barrier);
        thread::spawn(move || {
            barrier.wait();
            for round in 0..200u64 {
                let key = format!("churn_{}", round % 10);
                trie.put(&key, round);
                trie.delete(&key);
            }
        })
    };

    let readers: Vec<_> = (0..2)
        .map(|_| {
            let trie = Arc::clone(&trie);
            let barrier = Arc::clone(&barrier);
            thread::spawn(move || {
                barrier.wait();
                for _ in 0..200 {
                    for i in 0..50u64 {
                        // Stable keys are never touched by the writer.
                        assert_eq!(trie.get(&format!("stable_{i}")), Some(i));
                    }
                    assert!(trie.prefixes("stable_1_none").contains(&"stable_1".to_owned()));
                }
            })
        })
        .collect();

    writer.join().unwrap();
    for reader in readers {
        reader.join().unwrap();
    }
    assert_eq!(trie.len(), 50);
}

// ==============================================
// Shared Prefix Contention
// ==============================================
//
// All threads write under one shared path prefix, forcing splits and merges
// on the same subtree.

#[test]
fn contended_subtree_survives_interleaved_mutation() {
    let trie: Arc<ConcurrentTrie<usize>> = Arc::new(ConcurrentTrie::new());
    let threads = 4;
    let barrier = Arc::new(Barrier::new(threads));

    let handles: Vec<_> = (0..threads)
        .map(|tid| {
            let trie = Arc::clone(&trie);
            let barrier = Arc::clone(&barrier);
            thread::spawn(move || {
                barrier.wait();
                for i in 0..100 {
                    let key = format!("/shared/{tid}/{i}");
                    trie.put(&key, i);
                    assert_eq!(trie.get(&key), Some(i));
                    if i % 3 == 0 {
                        assert_eq!(trie.delete(&key), Some(i));
                    }
                }
            })
        })
        .collect();
    for handle in handles {
        handle.join().unwrap();
    }

    for tid in 0..threads {
        for i in 0..100 {
            let key = format!("/shared/{tid}/{i}");
            let expect = if i % 3 == 0 { None } else { Some(i) };
            assert_eq!(trie.get(&key), expect, "key {key}");
        }
    }
}
