//! Generic session manager with quotas and TTL-backed expiry.
//!
//! [`SessionManager`] issues opaque session identifiers, optionally binds
//! them to user identifiers, enforces a global session cap and a per-user
//! cap, and expires sessions after a caller-chosen duration using the
//! [`Ttl`](crate::ttl::Ttl) scheduler.
//!
//! ## Key Concepts
//!
//! - **Identifier factory**: the caller supplies the generator for session
//!   ids; the manager makes no claims about their randomness or secrecy.
//! - **Index quartet**: session→user, user→set-of-sessions, user→count and
//!   session→duration are all updated under one mutex so the counter
//!   invariants hold at every observable point.
//! - **Expiry path**: the scheduler's callback locks the same state and
//!   unwinds the indexes; it never re-enters the scheduler, since the fired
//!   entry is already gone, and it never surfaces errors.
//!
//! ## Example Usage
//!
//! ```
//! use std::sync::atomic::{AtomicU64, Ordering};
//! use std::time::Duration;
//! use dskit::session::SessionManager;
//!
//! let counter = AtomicU64::new(0);
//! let manager = SessionManager::new(100, 3, move || {
//!     counter.fetch_add(1, Ordering::Relaxed)
//! });
//!
//! let session = manager.create(Duration::from_secs(60)).unwrap();
//! manager.link(&session, 7, false).unwrap();
//! assert_eq!(manager.user_id(&session), Some(7));
//! assert_eq!(manager.user_session_count(&7), 1);
//! ```

use std::hash::Hash;
use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use rustc_hash::{FxHashMap, FxHashSet};

use crate::error::{SessionError, TtlError};
use crate::ttl::Ttl;

#[cfg(any(test, debug_assertions))]
use crate::error::InvariantError;

// ---------------------------------------------------------------------------
// State
// ---------------------------------------------------------------------------

struct SessionState<K> {
    session_to_user: FxHashMap<K, K>,
    user_to_sessions: FxHashMap<K, FxHashSet<K>>,
    user_counts: FxHashMap<K, usize>,
    session_durations: FxHashMap<K, Duration>,
    total: usize,
}

impl<K: Clone + Eq + Hash> SessionState<K> {
    fn new() -> Self {
        SessionState {
            session_to_user: FxHashMap::default(),
            user_to_sessions: FxHashMap::default(),
            user_counts: FxHashMap::default(),
            session_durations: FxHashMap::default(),
            total: 0,
        }
    }

    fn link_session(&mut self, session_id: &K, user_id: &K) {
        self.user_to_sessions
            .entry(user_id.clone())
            .or_default()
            .insert(session_id.clone());
        self.session_to_user
            .insert(session_id.clone(), user_id.clone());
        *self.user_counts.entry(user_id.clone()).or_insert(0) += 1;
    }

    /// Removes a session from every index. Safe to call for sessions that
    /// are already gone; the expiry callback and explicit removal can race.
    fn purge(&mut self, session_id: &K) {
        if self.session_durations.remove(session_id).is_none() {
            return;
        }
        self.total = self.total.saturating_sub(1);
        self.unlink(session_id);
    }

    fn unlink(&mut self, session_id: &K) {
        let Some(user_id) = self.session_to_user.remove(session_id) else {
            return;
        };
        let drop_user = match self.user_counts.get_mut(&user_id) {
            Some(count) => {
                debug_assert!(*count > 0, "user session count at zero on removal");
                *count = count.saturating_sub(1);
                *count == 0
            }
            None => {
                debug_assert!(false, "user missing from count index on removal");
                false
            }
        };
        if drop_user {
            self.user_counts.remove(&user_id);
        }
        if let Some(sessions) = self.user_to_sessions.get_mut(&user_id) {
            sessions.remove(session_id);
            if sessions.is_empty() {
                self.user_to_sessions.remove(&user_id);
            }
        } else {
            debug_assert!(false, "user missing from session index on removal");
        }
    }
}

// ---------------------------------------------------------------------------
// SessionManager
// ---------------------------------------------------------------------------

/// Concurrency-safe session manager associating sessions with users and
/// enforcing limits on total sessions and sessions per user.
///
/// Sessions expire automatically after the duration given at creation; the
/// expiry runs through the internal [`Ttl`](crate::ttl::Ttl) scheduler and
/// updates the bookkeeping silently. All methods are callable from arbitrary
/// threads.
///
/// # Example
///
/// ```
/// use std::sync::atomic::{AtomicU64, Ordering};
/// use std::time::Duration;
/// use dskit::error::SessionError;
/// use dskit::session::SessionManager;
///
/// let counter = AtomicU64::new(0);
/// let manager = SessionManager::new(2, 3, move || {
///     counter.fetch_add(1, Ordering::Relaxed)
/// });
///
/// manager.create(Duration::from_secs(60)).unwrap();
/// manager.create(Duration::from_secs(60)).unwrap();
/// assert_eq!(
///     manager.create(Duration::from_secs(60)),
///     Err(SessionError::MaxSessions),
/// );
/// assert_eq!(manager.session_count(), 2);
/// ```
pub struct SessionManager<K: Clone + Eq + Hash + Send + 'static> {
    state: Arc<Mutex<SessionState<K>>>,
    timeouts: Ttl<K>,
    new_key: Box<dyn Fn() -> K + Send + Sync>,
    max_sessions: usize,
    max_per_user: usize,
}

impl<K: Clone + Eq + Hash + Send + 'static> SessionManager<K> {
    /// Creates a manager enforcing `max_sessions` in total and
    /// `max_per_user` per user, generating session ids with `new_key`.
    pub fn new<F>(max_sessions: usize, max_per_user: usize, new_key: F) -> Self
    where
        F: Fn() -> K + Send + Sync + 'static,
    {
        let state = Arc::new(Mutex::new(SessionState::new()));
        let expired = Arc::clone(&state);
        let timeouts = Ttl::new(Some(Box::new(move |session_id: K| {
            // Timeout-initiated removal: the scheduler entry is already
            // gone, so only the indexes are unwound.
            expired.lock().purge(&session_id);
        })));
        SessionManager {
            state,
            timeouts,
            new_key: Box::new(new_key),
            max_sessions,
            max_per_user,
        }
    }

    /// Creates a new unlinked session valid for `duration`.
    ///
    /// Returns [`SessionError::MaxSessions`] without mutating state if the
    /// global cap would be exceeded.
    pub fn create(&self, duration: Duration) -> Result<K, SessionError> {
        let mut state = self.state.lock();
        if state.total >= self.max_sessions {
            return Err(SessionError::MaxSessions);
        }
        let session_id = (self.new_key)();
        state
            .session_durations
            .insert(session_id.clone(), duration);
        state.total += 1;
        let _ = self.timeouts.put(session_id.clone(), duration);
        Ok(session_id)
    }

    /// Atomically creates a session valid for `duration` and links it to
    /// `user_id`.
    ///
    /// Returns [`SessionError::MaxSessions`] or
    /// [`SessionError::MaxUserSessions`] without mutating state if either
    /// cap would be exceeded.
    pub fn create_linked(&self, user_id: K, duration: Duration) -> Result<K, SessionError> {
        let mut state = self.state.lock();
        if state.total >= self.max_sessions {
            return Err(SessionError::MaxSessions);
        }
        if state.user_counts.get(&user_id).copied().unwrap_or(0) >= self.max_per_user {
            return Err(SessionError::MaxUserSessions);
        }
        let session_id = (self.new_key)();
        state.link_session(&session_id, &user_id);
        state
            .session_durations
            .insert(session_id.clone(), duration);
        state.total += 1;
        let _ = self.timeouts.put(session_id.clone(), duration);
        Ok(session_id)
    }

    /// Binds an existing session to a user. A session already linked to
    /// another user is moved.
    ///
    /// Returns [`SessionError::NotFound`] if the session does not exist and
    /// [`SessionError::MaxUserSessions`] if the user is at their cap. With
    /// `extend` the expiration is reset to the session's original duration.
    pub fn link(&self, session_id: &K, user_id: K, extend: bool) -> Result<(), SessionError> {
        let mut state = self.state.lock();
        let Some(duration) = state.session_durations.get(session_id).copied() else {
            return Err(SessionError::NotFound);
        };
        if state.session_to_user.get(session_id) != Some(&user_id) {
            if state.user_counts.get(&user_id).copied().unwrap_or(0) >= self.max_per_user {
                return Err(SessionError::MaxUserSessions);
            }
            state.unlink(session_id);
            state.link_session(session_id, &user_id);
        }
        if extend {
            let _ = self.timeouts.put(session_id.clone(), duration);
        }
        Ok(())
    }

    /// Resets the expiration of a session to its original duration.
    ///
    /// Returns [`SessionError::NotFound`] if the session does not exist.
    pub fn extend(&self, session_id: &K) -> Result<(), SessionError> {
        let state = self.state.lock();
        let Some(duration) = state.session_durations.get(session_id).copied() else {
            return Err(SessionError::NotFound);
        };
        let _ = self.timeouts.put(session_id.clone(), duration);
        Ok(())
    }

    /// Returns the user a session is linked to, or `None` for unknown or
    /// unlinked sessions.
    pub fn user_id(&self, session_id: &K) -> Option<K> {
        self.state.lock().session_to_user.get(session_id).cloned()
    }

    /// Explicitly removes a session, cancelling its scheduler entry.
    ///
    /// Returns [`SessionError::NotFound`] if the session does not exist.
    pub fn remove_session(&self, session_id: &K) -> Result<(), SessionError> {
        let mut state = self.state.lock();
        if !state.session_durations.contains_key(session_id) {
            return Err(SessionError::NotFound);
        }
        state.purge(session_id);
        let _ = self.timeouts.delete(session_id);
        Ok(())
    }

    /// Removes every session owned by a user.
    ///
    /// Returns [`SessionError::NotFound`] if the user owns no sessions.
    pub fn remove_user(&self, user_id: &K) -> Result<(), SessionError> {
        let mut state = self.state.lock();
        let Some(sessions) = state.user_to_sessions.get(user_id) else {
            return Err(SessionError::NotFound);
        };
        let sessions: Vec<K> = sessions.iter().cloned().collect();
        for session_id in &sessions {
            state.purge(session_id);
            let _ = self.timeouts.delete(session_id);
        }
        Ok(())
    }

    /// Returns the total number of active sessions.
    pub fn session_count(&self) -> usize {
        self.state.lock().total
    }

    /// Returns the number of active sessions for one user.
    pub fn user_session_count(&self, user_id: &K) -> usize {
        self.state
            .lock()
            .user_counts
            .get(user_id)
            .copied()
            .unwrap_or(0)
    }

    /// Shuts down the internal scheduler. Sessions stop expiring afterwards;
    /// intended for teardown.
    pub fn shutdown(&self) -> Result<(), TtlError> {
        self.timeouts.stop()
    }

    /// Validates counter invariants; test/debug builds only.
    #[cfg(any(test, debug_assertions))]
    pub fn check_invariants(&self) -> Result<(), InvariantError> {
        let state = self.state.lock();
        if state.total != state.session_durations.len() {
            return Err(InvariantError::new(format!(
                "total {} does not match session count {}",
                state.total,
                state.session_durations.len()
            )));
        }
        if state.user_counts.len() != state.user_to_sessions.len() {
            return Err(InvariantError::new(
                "user count index and user session index disagree on users",
            ));
        }
        for (user_id, sessions) in &state.user_to_sessions {
            if sessions.is_empty() {
                return Err(InvariantError::new("empty session set retained for user"));
            }
            if state.user_counts.get(user_id) != Some(&sessions.len()) {
                return Err(InvariantError::new(
                    "user session count does not match session set size",
                ));
            }
            for session_id in sessions {
                if state.session_to_user.get(session_id) != Some(user_id) {
                    return Err(InvariantError::new(
                        "session set entry missing reverse link",
                    ));
                }
                if !state.session_durations.contains_key(session_id) {
                    return Err(InvariantError::new("linked session has no duration"));
                }
            }
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
