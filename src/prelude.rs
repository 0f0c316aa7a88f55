pub use crate::cache::RotatingCache;
pub use crate::error::{CacheError, FsError, InvariantError, SessionError, TtlError};
pub use crate::fs::{DirEntry, EntryKind, MemFs, Metadata};
pub use crate::session::SessionManager;
pub use crate::trie::{ConcurrentTrie, Trie};
pub use crate::ttl::{ExpireCallback, Ttl};
