//! Deadline-ordered key expiration with at-most-once callbacks.
//!
//! [`Ttl`] keeps a set of keys that exist only for the duration given at
//! registration. When a key expires the scheduler fires the callback supplied
//! at construction, with the key already removed from the pending set.
//! Precision is best-effort; the only guarantee is that a callback never
//! fires early.
//!
//! ## Architecture
//!
//! ```text
//!   callers                         worker thread
//!   ───────                        ──────────────
//!   put / delete ── mutex ──► deadline-sorted queue + key index
//!         │                        │
//!         └── condvar notify ──►   sleeps until the head deadline,
//!                                  re-arms on every mutation,
//!                                  drains past-due entries in order,
//!                                  runs callbacks with the lock released
//! ```
//!
//! The worker is the only thread that arms the deadline timer. Callbacks run
//! outside the scheduler's critical section, so a callback may call back into
//! the scheduler (for example to cancel sibling keys) without deadlocking.
//!
//! ## Example Usage
//!
//! ```
//! use std::time::Duration;
//! use dskit::ttl::Ttl;
//!
//! let ttl: Ttl<&str> = Ttl::new(None);
//! ttl.put("session", Duration::from_secs(3600)).unwrap();
//! assert!(ttl.exists(&"session"));
//! assert_eq!(ttl.len(), 1);
//! ttl.stop().unwrap();
//! ```

use std::hash::Hash;
use std::sync::mpsc;
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use parking_lot::{Condvar, Mutex};
use rustc_hash::FxHashMap;

use crate::error::TtlError;

/// Callback invoked by the worker once per expired registration.
pub type ExpireCallback<K> = Box<dyn Fn(K) + Send + Sync>;

// ---------------------------------------------------------------------------
// Internal state
// ---------------------------------------------------------------------------

struct TtlEntry<K> {
    deadline: Instant,
    key: K,
}

struct TtlState<K> {
    /// Pending entries sorted ascending by deadline; ties keep insertion
    /// order. The head is the armed entry.
    queue: Vec<TtlEntry<K>>,
    /// Key to deadline, for O(log n) displacement and removal.
    index: FxHashMap<K, Instant>,
    stopped: bool,
}

impl<K: Clone + Eq + Hash> TtlState<K> {
    fn new() -> Self {
        TtlState {
            queue: Vec::new(),
            index: FxHashMap::default(),
            stopped: false,
        }
    }

    fn insert_entry(&mut self, key: K, deadline: Instant) {
        let pos = self.queue.partition_point(|e| e.deadline <= deadline);
        self.index.insert(key.clone(), deadline);
        self.queue.insert(pos, TtlEntry { deadline, key });
    }

    fn remove_entry(&mut self, key: &K) -> bool {
        let Some(deadline) = self.index.remove(key) else {
            return false;
        };
        let mut i = self.queue.partition_point(|e| e.deadline < deadline);
        while i < self.queue.len() && self.queue[i].deadline == deadline {
            if &self.queue[i].key == key {
                self.queue.remove(i);
                return true;
            }
            i += 1;
        }
        debug_assert!(false, "ttl index desync: key in index but not in queue");
        false
    }
}

struct TtlCore<K> {
    state: Mutex<TtlState<K>>,
    signal: Condvar,
    waiters: Mutex<Vec<mpsc::Sender<Instant>>>,
    callback: Option<ExpireCallback<K>>,
}

impl<K: Clone + Eq + Hash + Send + 'static> TtlCore<K> {
    /// Worker loop. Sleeps on the head deadline, drains everything past due
    /// in deadline order and fires callbacks after releasing the lock.
    fn run(&self) {
        loop {
            let mut state = self.state.lock();
            if state.stopped {
                break;
            }
            if state.queue.is_empty() {
                // Idle. Anything enrolled while the queue was non-empty is
                // satisfied here, on the transition to empty.
                self.drain_waiters();
                self.signal.wait(&mut state);
                continue;
            }
            let deadline = state.queue[0].deadline;
            let now = Instant::now();
            if deadline > now {
                // Armed: sleep until the head deadline or the next mutation,
                // whichever comes first, then re-evaluate the head.
                let _ = self.signal.wait_until(&mut state, deadline);
                continue;
            }
            let mut due = Vec::new();
            while state.queue.first().map_or(false, |e| e.deadline <= now) {
                let entry = state.queue.remove(0);
                state.index.remove(&entry.key);
                due.push(entry.key);
            }
            drop(state);
            if let Some(callback) = self.callback.as_ref() {
                for key in due {
                    callback(key);
                }
            }
        }
    }

    /// Notifies and consumes all enrolled waiters. Called with the state
    /// lock held so enrollment cannot straddle the empty transition.
    fn drain_waiters(&self) {
        let mut waiters = self.waiters.lock();
        if waiters.is_empty() {
            return;
        }
        let now = Instant::now();
        for waiter in waiters.drain(..) {
            let _ = waiter.send(now);
        }
    }
}

// ---------------------------------------------------------------------------
// Ttl
// ---------------------------------------------------------------------------

/// Time-to-live set of keys with expiration callbacks.
///
/// Keys registered with [`put`](Ttl::put) exist for the given duration, after
/// which the worker removes them and fires the callback supplied to
/// [`new`](Ttl::new). All operations are safe to call from arbitrary threads.
/// The scheduler must be shut down with [`stop`](Ttl::stop) after use;
/// mutating operations on a stopped scheduler return
/// [`TtlError::NotRunning`].
///
/// # Example
///
/// ```
/// use std::sync::mpsc;
/// use std::time::Duration;
/// use dskit::ttl::Ttl;
///
/// let (tx, rx) = mpsc::channel();
/// let ttl = Ttl::new(Some(Box::new(move |key: u32| {
///     let _ = tx.send(key);
/// })));
///
/// ttl.put(7, Duration::from_millis(10)).unwrap();
/// assert_eq!(rx.recv_timeout(Duration::from_secs(5)), Ok(7));
/// assert!(!ttl.exists(&7));
/// ttl.stop().unwrap();
/// ```
pub struct Ttl<K: Clone + Eq + Hash + Send + 'static> {
    core: Arc<TtlCore<K>>,
    worker: Mutex<Option<thread::JoinHandle<()>>>,
}

impl<K: Clone + Eq + Hash + Send + 'static> Ttl<K> {
    /// Creates a scheduler running a background expiration worker which
    /// calls the optional `callback` each time a key expires.
    pub fn new(callback: Option<ExpireCallback<K>>) -> Self {
        let core = Arc::new(TtlCore {
            state: Mutex::new(TtlState::new()),
            signal: Condvar::new(),
            waiters: Mutex::new(Vec::new()),
            callback,
        });
        let worker_core = Arc::clone(&core);
        let handle = thread::spawn(move || worker_core.run());
        Ttl {
            core,
            worker: Mutex::new(Some(handle)),
        }
    }

    /// Registers `key` to expire after `duration`, or resets its deadline if
    /// already registered. The displaced registration never fires.
    ///
    /// A zero duration expires the key as soon as possible; the callback
    /// still runs on the worker, never from inside this call.
    ///
    /// Returns [`TtlError::NotRunning`] if the scheduler is stopped.
    pub fn put(&self, key: K, duration: Duration) -> Result<(), TtlError> {
        let deadline = Instant::now() + duration;
        {
            let mut state = self.core.state.lock();
            if state.stopped {
                return Err(TtlError::NotRunning);
            }
            state.remove_entry(&key);
            state.insert_entry(key, deadline);
        }
        self.core.signal.notify_one();
        Ok(())
    }

    /// Cancels the pending expiration of `key`.
    ///
    /// Returns [`TtlError::NotFound`] if no entry exists and
    /// [`TtlError::NotRunning`] if the scheduler is stopped. After a
    /// successful delete no callback fires for the cancelled registration.
    pub fn delete(&self, key: &K) -> Result<(), TtlError> {
        {
            let mut state = self.core.state.lock();
            if state.stopped {
                return Err(TtlError::NotRunning);
            }
            if !state.remove_entry(key) {
                return Err(TtlError::NotFound);
            }
        }
        self.core.signal.notify_one();
        Ok(())
    }

    /// Returns `true` if `key` is pending expiration.
    pub fn exists(&self, key: &K) -> bool {
        self.core.state.lock().index.contains_key(key)
    }

    /// Returns the number of pending entries, including the armed one.
    pub fn len(&self) -> usize {
        self.core.state.lock().queue.len()
    }

    /// Returns `true` if no entries are pending.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Returns a one-shot channel that receives the current time when the
    /// pending set becomes empty.
    ///
    /// If the scheduler is already empty the channel is satisfied
    /// immediately. Otherwise the waiter is enrolled and notified on the next
    /// transition to empty; it is consumed by that notification and does not
    /// re-arm if the queue refills. Multiple concurrent waiters all receive
    /// the notification.
    pub fn wait(&self) -> mpsc::Receiver<Instant> {
        let (tx, rx) = mpsc::channel();
        let state = self.core.state.lock();
        if state.queue.is_empty() {
            // The channel is buffered, so the send completes without a
            // receiver and the caller is never blocked.
            let _ = tx.send(Instant::now());
        } else {
            self.core.waiters.lock().push(tx);
        }
        rx
    }

    /// Stops the worker, clears all pending entries and rejects subsequent
    /// mutating operations.
    ///
    /// Callbacks already dispatched by the worker complete before this
    /// returns; enrolled waiters are disconnected without a notification.
    /// Returns [`TtlError::NotRunning`] if already stopped. Must not be
    /// called from within the expiration callback.
    pub fn stop(&self) -> Result<(), TtlError> {
        {
            let mut state = self.core.state.lock();
            if state.stopped {
                return Err(TtlError::NotRunning);
            }
            state.stopped = true;
            state.queue.clear();
            state.index.clear();
        }
        self.core.signal.notify_one();
        if let Some(handle) = self.worker.lock().take() {
            let _ = handle.join();
        }
        self.core.waiters.lock().clear();
        Ok(())
    }
}

impl<K: Clone + Eq + Hash + Send + 'static> Drop for Ttl<K> {
    fn drop(&mut self) {
        let _ = self.stop();
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
