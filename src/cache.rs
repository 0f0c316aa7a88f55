//! Rotating byte cache with memory and entry budgets.
//!
//! Maintains byte blobs keyed by string up to a configured memory limit and
//! entry count. When either budget would be exceeded the oldest entries are
//! rotated out, FIFO. Reads share a lock; writes are exclusive.
//!
//! ## Operations
//! - `put(key, data)`: stores a blob, rotating oldest entries to make room
//! - `get(key)`: returns a copy of the blob or [`CacheError::Miss`]
//! - `delete(key)` / `exists(key)` / `usage()` / `len()`
//!
//! An entry larger than the whole memory budget occupies the cache alone.

use std::collections::VecDeque;

use parking_lot::RwLock;
use rustc_hash::FxHashMap;

use crate::error::CacheError;

struct CacheInner {
    used: usize,
    entries: FxHashMap<String, Vec<u8>>,
    order: VecDeque<String>,
}

/// Fixed-capacity rotating cache of byte blobs.
///
/// # Example
///
/// ```
/// use dskit::cache::RotatingCache;
/// use dskit::error::CacheError;
///
/// let cache = RotatingCache::new(1024, 16);
/// cache.put("a", vec![1, 2, 3]);
/// assert_eq!(cache.get("a"), Ok(vec![1, 2, 3]));
/// assert_eq!(cache.get("b"), Err(CacheError::Miss));
/// assert_eq!(cache.usage(), 3);
/// ```
pub struct RotatingCache {
    inner: RwLock<CacheInner>,
    mem_limit: usize,
    item_limit: usize,
}

impl RotatingCache {
    /// Creates a cache bounded by `mem_limit` bytes and `item_limit` entries.
    pub fn new(mem_limit: usize, item_limit: usize) -> Self {
        RotatingCache {
            inner: RwLock::new(CacheInner {
                used: 0,
                entries: FxHashMap::default(),
                order: VecDeque::with_capacity(item_limit),
            }),
            mem_limit,
            item_limit,
        }
    }

    /// Stores `data` under `key`, rotating oldest entries out until both
    /// budgets hold. Storing under an existing key displaces the old blob.
    pub fn put(&self, key: &str, data: Vec<u8>) {
        let mut inner = self.inner.write();
        if let Some(old) = inner.entries.remove(key) {
            inner.used -= old.len();
            inner.order.retain(|k| k != key);
        }
        while !inner.order.is_empty()
            && (inner.used + data.len() > self.mem_limit || inner.order.len() >= self.item_limit)
        {
            if let Some(oldest) = inner.order.pop_front() {
                if let Some(evicted) = inner.entries.remove(&oldest) {
                    inner.used -= evicted.len();
                }
            }
        }
        inner.used += data.len();
        inner.order.push_back(key.to_owned());
        inner.entries.insert(key.to_owned(), data);
    }

    /// Returns a copy of the blob under `key`, or [`CacheError::Miss`].
    pub fn get(&self, key: &str) -> Result<Vec<u8>, CacheError> {
        self.inner
            .read()
            .entries
            .get(key)
            .cloned()
            .ok_or(CacheError::Miss)
    }

    /// Deletes the entry under `key`, returning `true` if it existed.
    pub fn delete(&self, key: &str) -> bool {
        let mut inner = self.inner.write();
        match inner.entries.remove(key) {
            Some(removed) => {
                inner.used -= removed.len();
                inner.order.retain(|k| k != key);
                true
            }
            None => false,
        }
    }

    /// Returns `true` if an entry exists under `key`.
    pub fn exists(&self, key: &str) -> bool {
        self.inner.read().entries.contains_key(key)
    }

    /// Returns current memory usage in bytes.
    pub fn usage(&self) -> usize {
        self.inner.read().used
    }

    /// Returns the number of stored entries.
    pub fn len(&self) -> usize {
        self.inner.read().entries.len()
    }

    /// Returns `true` if the cache holds no entries.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
