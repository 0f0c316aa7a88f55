//! Error types for the dskit library.
//!
//! ## Key Components
//!
//! - [`TtlError`]: Lifecycle and lookup failures of the TTL scheduler.
//! - [`SessionError`]: Lookup and quota failures of the session manager.
//! - [`CacheError`]: Lookup failures of the rotating byte cache.
//! - [`FsError`]: Lookup and collision failures of the in-memory file system.
//! - [`InvariantError`]: Returned when internal data-structure invariants are
//!   violated (debug-only `check_invariants` methods). Never produced by
//!   normal operation.
//!
//! All error kinds are distinct, comparable values so callers can match on
//! them directly.
//!
//! ## Example Usage
//!
//! ```
//! use dskit::error::TtlError;
//! use dskit::ttl::Ttl;
//!
//! let ttl: Ttl<u64> = Ttl::new(None);
//! assert_eq!(ttl.delete(&42), Err(TtlError::NotFound));
//! ttl.stop().unwrap();
//! assert_eq!(ttl.stop(), Err(TtlError::NotRunning));
//! ```

use std::fmt;

// ---------------------------------------------------------------------------
// TtlError
// ---------------------------------------------------------------------------

/// Error returned by TTL scheduler operations.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TtlError {
    /// The scheduler has been stopped; mutating operations are rejected.
    NotRunning,
    /// No pending entry exists for the given key.
    NotFound,
}

impl fmt::Display for TtlError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TtlError::NotRunning => f.write_str("ttl is not running"),
            TtlError::NotFound => f.write_str("not found"),
        }
    }
}

impl std::error::Error for TtlError {}

// ---------------------------------------------------------------------------
// SessionError
// ---------------------------------------------------------------------------

/// Error returned by session manager operations.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionError {
    /// The session or user was not found.
    NotFound,
    /// The global maximum number of sessions has been reached.
    MaxSessions,
    /// The maximum number of sessions for one user has been reached.
    MaxUserSessions,
}

impl fmt::Display for SessionError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SessionError::NotFound => f.write_str("not found"),
            SessionError::MaxSessions => f.write_str("maximum session count reached"),
            SessionError::MaxUserSessions => f.write_str("maximum user session count reached"),
        }
    }
}

impl std::error::Error for SessionError {}

// ---------------------------------------------------------------------------
// CacheError
// ---------------------------------------------------------------------------

/// Error returned by rotating-cache lookups.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CacheError {
    /// The requested entry is not in the cache.
    Miss,
}

impl fmt::Display for CacheError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CacheError::Miss => f.write_str("cache miss"),
        }
    }
}

impl std::error::Error for CacheError {}

// ---------------------------------------------------------------------------
// FsError
// ---------------------------------------------------------------------------

/// Error returned by in-memory file-system operations.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FsError {
    /// The named entry was not found.
    NotFound,
    /// An entry already exists under the given name.
    AlreadyExists,
}

impl fmt::Display for FsError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FsError::NotFound => f.write_str("not found"),
            FsError::AlreadyExists => f.write_str("file exists"),
        }
    }
}

impl std::error::Error for FsError {}

// ---------------------------------------------------------------------------
// InvariantError
// ---------------------------------------------------------------------------

/// Error returned when internal data-structure invariants are violated.
///
/// Produced by debug-only `check_invariants` methods (e.g.
/// [`Trie::check_invariants`](crate::trie::Trie::check_invariants)). Carries a
/// human-readable description of which invariant failed. Seeing one of these
/// means a bug in this library, not in calling code.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InvariantError(String);

impl InvariantError {
    /// Creates a new `InvariantError` with the given description.
    #[inline]
    pub fn new(msg: impl Into<String>) -> Self {
        Self(msg.into())
    }

    /// Returns the error description.
    #[inline]
    pub fn message(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for InvariantError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl std::error::Error for InvariantError {}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
