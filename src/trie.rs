//! Compressed radix prefix trie keyed by text.
//!
//! Stores a mapping from non-empty string keys to values of a caller-chosen
//! type, with prefix and suffix queries and full pre-order enumeration. Keys
//! are compared as sequences of Unicode code points; a multi-byte code point
//! never straddles a node boundary.
//!
//! ## Architecture
//!
//! ```text
//!   Put("apple", 1), Put("app", 2), Put("appleseed", 3)
//!
//!   (root)
//!   └── "app" ──────────── value: 2
//!       └── "le" ────────── value: 1
//!           └── "seed" ──── value: 3
//!
//!   Each node owns a prefix (never empty below the root), an optional value
//!   and a branch list sorted by first code point. Branch lookup is a binary
//!   search over first code points; the rest of the prefix is compared
//!   sequentially.
//! ```
//!
//! ## Key Concepts
//!
//! - **Path compression**: no node holds a single child and no value; deletes
//!   merge such nodes into their child (prefix concatenation), so the tree
//!   never fragments.
//! - **Deterministic order**: branch lists are kept sorted strictly ascending
//!   by first code point, so enumeration and prefix queries are stable across
//!   runs.
//! - **Forgiving empty keys**: the empty string is never a valid key; all
//!   operations treat it as a silent miss rather than an error.
//!
//! ## Example Usage
//!
//! ```
//! use dskit::trie::Trie;
//!
//! let mut trie = Trie::new();
//! trie.put("/users", 1);
//! trie.put("/users/vedran", 2);
//!
//! assert_eq!(trie.get("/users/vedran"), Some(&2));
//! assert_eq!(trie.prefixes("/users/vedran/go"), vec!["/users", "/users/vedran"]);
//! ```
//!
//! ## Performance
//!
//! - `put` / `get` / `delete`: O(key length + log branching) per level
//! - `prefixes` / `suffixes`: linear in matched keys
//!
//! [`ConcurrentTrie`] wraps the core in a reader-writer lock; readers run
//! concurrently, writers are exclusive.

use std::fmt;
use std::io;

use parking_lot::RwLock;

#[cfg(any(test, debug_assertions))]
use crate::error::InvariantError;

// ---------------------------------------------------------------------------
// Node
// ---------------------------------------------------------------------------

/// One node of the tree. The root is a sentinel with an empty prefix and no
/// value; every other node carries a non-empty prefix.
#[derive(Debug)]
struct Node<V> {
    prefix: Vec<char>,
    value: Option<V>,
    branches: Vec<Node<V>>,
}

impl<V> Node<V> {
    fn sentinel() -> Self {
        Node {
            prefix: Vec::new(),
            value: None,
            branches: Vec::new(),
        }
    }

    fn leaf(prefix: Vec<char>, value: V) -> Self {
        Node {
            prefix,
            value: Some(value),
            branches: Vec::new(),
        }
    }

    /// Binary search over branch first code points.
    fn find_branch(&self, c: char) -> Result<usize, usize> {
        self.branches.binary_search_by(|n| n.prefix[0].cmp(&c))
    }
}

// ---------------------------------------------------------------------------
// Trie
// ---------------------------------------------------------------------------

/// Compressed prefix trie of generic values keyed by a string key.
///
/// Fast lookups, no allocation on `get`, and retrieval of stored keys that
/// are prefixes or extensions of a query key. Not thread-safe; see
/// [`ConcurrentTrie`] for the lock-wrapped variant.
///
/// # Example
///
/// ```
/// use dskit::trie::Trie;
///
/// let mut trie = Trie::new();
/// assert_eq!(trie.put("key", 1), None);
/// assert_eq!(trie.put("key", 2), Some(1));
/// assert_eq!(trie.get("key"), Some(&2));
/// assert_eq!(trie.delete("key"), Some(2));
/// assert!(trie.is_empty());
/// ```
#[derive(Debug)]
pub struct Trie<V> {
    root: Node<V>,
    len: usize,
}

impl<V> Default for Trie<V> {
    fn default() -> Self {
        Self::new()
    }
}

impl<V> Trie<V> {
    /// Creates an empty trie.
    pub fn new() -> Self {
        Trie {
            root: Node::sentinel(),
            len: 0,
        }
    }

    /// Returns the number of stored keys.
    pub fn len(&self) -> usize {
        self.len
    }

    /// Returns `true` if no keys are stored.
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Inserts `value` under `key`, returning the previous value if the key
    /// was already present.
    ///
    /// The key must not be empty; an empty key inserts nothing and returns
    /// `None`.
    ///
    /// # Example
    ///
    /// ```
    /// use dskit::trie::Trie;
    ///
    /// let mut trie = Trie::new();
    /// assert_eq!(trie.put("apple", 1), None);
    /// assert_eq!(trie.put("apple", 2), Some(1));
    /// assert_eq!(trie.put("", 3), None); // silently ignored
    /// assert_eq!(trie.len(), 1);
    /// ```
    pub fn put(&mut self, key: &str, value: V) -> Option<V> {
        if key.is_empty() {
            return None;
        }
        let key: Vec<char> = key.chars().collect();
        let old = Self::insert_at(&mut self.root, &key, value);
        if old.is_none() {
            self.len += 1;
        }
        old
    }

    fn insert_at(node: &mut Node<V>, key: &[char], value: V) -> Option<V> {
        let idx = match node.find_branch(key[0]) {
            Ok(idx) => idx,
            Err(idx) => {
                // Fast path: no branch starts with the key's first code point.
                node.branches.insert(idx, Node::leaf(key.to_vec(), value));
                return None;
            }
        };
        let child = &mut node.branches[idx];
        let common = child
            .prefix
            .iter()
            .zip(key.iter())
            .take_while(|(a, b)| a == b)
            .count();

        if common == key.len() {
            if common == child.prefix.len() {
                // Key ends exactly at this node: overwrite.
                return child.value.replace(value);
            }
            // Key ends mid-prefix: split. The node keeps the common part and
            // the inserted value; a fresh node takes the old tail, value and
            // branches.
            let tail = Node {
                prefix: child.prefix.split_off(common),
                value: child.value.take(),
                branches: std::mem::take(&mut child.branches),
            };
            child.value = Some(value);
            child.branches.push(tail);
            return None;
        }

        if common == child.prefix.len() {
            // Node prefix consumed before the key: descend.
            return Self::insert_at(child, &key[common..], value);
        }

        // Mismatch mid-prefix: split into a valueless junction with the old
        // tail and the new tail as its only children, ordered by first code
        // point.
        let old_tail = Node {
            prefix: child.prefix.split_off(common),
            value: child.value.take(),
            branches: std::mem::take(&mut child.branches),
        };
        let new_tail = Node::leaf(key[common..].to_vec(), value);
        if old_tail.prefix[0] < new_tail.prefix[0] {
            child.branches.push(old_tail);
            child.branches.push(new_tail);
        } else {
            child.branches.push(new_tail);
            child.branches.push(old_tail);
        }
        None
    }

    /// Returns a reference to the value at `key`, if present.
    ///
    /// An empty key returns `None`.
    pub fn get(&self, key: &str) -> Option<&V> {
        if key.is_empty() {
            return None;
        }
        let key: Vec<char> = key.chars().collect();
        let mut node = &self.root;
        let mut rest: &[char] = &key;
        loop {
            let child = match node.find_branch(rest[0]) {
                Ok(idx) => &node.branches[idx],
                Err(_) => return None,
            };
            if rest.len() < child.prefix.len() || rest[..child.prefix.len()] != child.prefix[..] {
                return None;
            }
            if rest.len() == child.prefix.len() {
                return child.value.as_ref();
            }
            rest = &rest[child.prefix.len()..];
            node = child;
        }
    }

    /// Returns `true` if `key` is stored.
    pub fn exists(&self, key: &str) -> bool {
        self.get(key).is_some()
    }

    /// Removes `key` and returns its value, if present.
    ///
    /// After removal the tree is renormalized: a holder node left with no
    /// value and no branches is detached from its parent, and any parent left
    /// with no value and exactly one branch absorbs that child (prefix
    /// concatenation, value and branches inherited). Renormalization walks
    /// from the leaf toward the root until no further merge applies.
    ///
    /// # Example
    ///
    /// ```
    /// use dskit::trie::Trie;
    ///
    /// let mut trie = Trie::new();
    /// trie.put("foo", 1);
    /// trie.put("foobar", 2);
    /// assert_eq!(trie.delete("foo"), Some(1));
    /// assert_eq!(trie.get("foobar"), Some(&2));
    /// assert_eq!(trie.get("foo"), None);
    /// ```
    pub fn delete(&mut self, key: &str) -> Option<V> {
        if key.is_empty() {
            return None;
        }
        let key: Vec<char> = key.chars().collect();
        let removed = Self::remove_at(&mut self.root, &key);
        if removed.is_some() {
            self.len -= 1;
        }
        removed
    }

    fn remove_at(node: &mut Node<V>, key: &[char]) -> Option<V> {
        let idx = match node.find_branch(key[0]) {
            Ok(idx) => idx,
            Err(_) => return None,
        };
        let removed = {
            let child = &mut node.branches[idx];
            if key.len() < child.prefix.len() || key[..child.prefix.len()] != child.prefix[..] {
                return None;
            }
            let consumed = child.prefix.len();
            let removed = if key.len() == consumed {
                child.value.take()
            } else {
                Self::remove_at(child, &key[consumed..])
            };
            if removed.is_some() && child.value.is_none() && child.branches.len() == 1 {
                // Merge the surviving only-child into its valueless parent.
                if let Some(only) = child.branches.pop() {
                    child.prefix.extend(only.prefix);
                    child.value = only.value;
                    child.branches = only.branches;
                }
            }
            removed
        };
        if removed.is_some()
            && node.branches[idx].value.is_none()
            && node.branches[idx].branches.is_empty()
        {
            node.branches.remove(idx);
        }
        removed
    }

    /// Returns every stored key that is a strict prefix of `key`, ordered
    /// from shortest to longest. The key itself is not included even when
    /// stored.
    ///
    /// # Example
    ///
    /// ```
    /// use dskit::trie::Trie;
    ///
    /// let mut trie = Trie::new();
    /// trie.put("/", 1);
    /// trie.put("/users", 2);
    /// trie.put("/users/vedran", 3);
    /// assert_eq!(
    ///     trie.prefixes("/users/vedran/go"),
    ///     vec!["/", "/users", "/users/vedran"],
    /// );
    /// ```
    pub fn prefixes(&self, key: &str) -> Vec<String> {
        let mut out = Vec::new();
        if key.is_empty() {
            return out;
        }
        let key: Vec<char> = key.chars().collect();
        let mut node = &self.root;
        let mut rest: &[char] = &key;
        let mut scanned = String::new();
        loop {
            let child = match node.find_branch(rest[0]) {
                Ok(idx) => &node.branches[idx],
                Err(_) => return out,
            };
            // A node whose prefix consumes the rest of the key holds either
            // the key itself or a longer key; neither is a strict prefix.
            if rest.len() <= child.prefix.len() {
                return out;
            }
            if rest[..child.prefix.len()] != child.prefix[..] {
                return out;
            }
            scanned.extend(child.prefix.iter());
            if child.value.is_some() {
                out.push(scanned.clone());
            }
            rest = &rest[child.prefix.len()..];
            node = child;
        }
    }

    /// Returns `true` if any stored key is a strict prefix of `key`.
    pub fn has_prefixes(&self, key: &str) -> bool {
        if key.is_empty() {
            return false;
        }
        let key: Vec<char> = key.chars().collect();
        let mut node = &self.root;
        let mut rest: &[char] = &key;
        loop {
            let child = match node.find_branch(rest[0]) {
                Ok(idx) => &node.branches[idx],
                Err(_) => return false,
            };
            if rest.len() <= child.prefix.len() || rest[..child.prefix.len()] != child.prefix[..] {
                return false;
            }
            if child.value.is_some() {
                return true;
            }
            rest = &rest[child.prefix.len()..];
            node = child;
        }
    }

    /// Returns every stored key that has `key` as a strict prefix, in
    /// lexicographic code-point order. The query key itself is excluded even
    /// when stored.
    ///
    /// # Example
    ///
    /// ```
    /// use dskit::trie::Trie;
    ///
    /// let mut trie = Trie::new();
    /// trie.put("foo", 1);
    /// trie.put("foobar", 2);
    /// trie.put("foobarbaz", 3);
    /// assert_eq!(trie.suffixes("foo"), vec!["foobar", "foobarbaz"]);
    /// ```
    pub fn suffixes(&self, key: &str) -> Vec<String> {
        let mut out = Vec::new();
        if key.is_empty() {
            return out;
        }
        let key: Vec<char> = key.chars().collect();
        let mut node = &self.root;
        let mut rest: &[char] = &key;
        let mut scanned = String::new();
        loop {
            let child = match node.find_branch(rest[0]) {
                Ok(idx) => &node.branches[idx],
                Err(_) => return out,
            };
            let common = child
                .prefix
                .iter()
                .zip(rest.iter())
                .take_while(|(a, b)| a == b)
                .count();
            if common == rest.len() {
                // Query exhausted at or inside this node: collect the
                // subtree. The node's own key counts only when the query
                // ended mid-prefix, otherwise it equals the query.
                scanned.extend(child.prefix.iter());
                if common < child.prefix.len() && child.value.is_some() {
                    out.push(scanned.clone());
                }
                let mut buf = scanned;
                for branch in &child.branches {
                    let mark = buf.len();
                    buf.extend(branch.prefix.iter());
                    Self::walk_node(branch, &mut buf, &mut |k, _| {
                        out.push(k.to_owned());
                        true
                    });
                    buf.truncate(mark);
                }
                return out;
            }
            if common < child.prefix.len() {
                return out;
            }
            scanned.extend(child.prefix.iter());
            rest = &rest[common..];
            node = child;
        }
    }

    /// Visits every stored `(key, value)` pair in depth-first pre-order: a
    /// node's value is yielded before its children, children in sorted
    /// branch order. Returning `false` from the callback aborts the walk.
    pub fn for_each<F>(&self, mut f: F)
    where
        F: FnMut(&str, &V) -> bool,
    {
        let mut buf = String::new();
        Self::walk_node(&self.root, &mut buf, &mut f);
    }

    /// Visits every stored key in pre-order. Returning `false` aborts.
    pub fn for_each_key<F>(&self, mut f: F)
    where
        F: FnMut(&str) -> bool,
    {
        self.for_each(|key, _| f(key));
    }

    /// Visits every stored value in pre-order. Returning `false` aborts.
    pub fn for_each_value<F>(&self, mut f: F)
    where
        F: FnMut(&V) -> bool,
    {
        self.for_each(|_, value| f(value));
    }

    fn walk_node<F>(node: &Node<V>, buf: &mut String, f: &mut F) -> bool
    where
        F: FnMut(&str, &V) -> bool,
    {
        if let Some(value) = &node.value {
            if !f(buf, value) {
                return false;
            }
        }
        for child in &node.branches {
            let mark = buf.len();
            buf.extend(child.prefix.iter());
            let proceed = Self::walk_node(child, buf, f);
            buf.truncate(mark);
            if !proceed {
                return false;
            }
        }
        true
    }

    /// Writes a multi-line dump of the tree structure to `w`.
    ///
    /// One node per line, two spaces of indentation per depth level, line
    /// body `<prefix>[,<value>]` with the comma and value omitted for
    /// valueless nodes. The first line is the root's empty prefix.
    ///
    /// # Example
    ///
    /// ```
    /// use dskit::trie::Trie;
    ///
    /// let mut trie = Trie::new();
    /// trie.put("foo", 1);
    /// trie.put("foobar", 2);
    ///
    /// let mut out = Vec::new();
    /// trie.print(&mut out).unwrap();
    /// assert_eq!(String::from_utf8(out).unwrap(), "\n  foo,1\n    bar,2\n");
    /// ```
    pub fn print<W: io::Write>(&self, w: &mut W) -> io::Result<()>
    where
        V: fmt::Display,
    {
        Self::print_node(&self.root, w, 0)
    }

    fn print_node<W: io::Write>(node: &Node<V>, w: &mut W, depth: usize) -> io::Result<()>
    where
        V: fmt::Display,
    {
        let prefix: String = node.prefix.iter().collect();
        match &node.value {
            Some(value) => writeln!(w, "{}{},{}", "  ".repeat(depth), prefix, value)?,
            None => writeln!(w, "{}{}", "  ".repeat(depth), prefix)?,
        }
        for child in &node.branches {
            Self::print_node(child, w, depth + 1)?;
        }
        Ok(())
    }

    /// Validates structural invariants; test/debug builds only.
    ///
    /// Checks that branch lists are sorted strictly ascending by first code
    /// point, that no prefix below the root is empty, that no node holds no
    /// value and exactly one branch, and that the stored-key count matches
    /// `len()`.
    #[cfg(any(test, debug_assertions))]
    pub fn check_invariants(&self) -> Result<(), InvariantError> {
        let mut counted = 0usize;
        Self::check_node(&self.root, true, &mut counted)?;
        if counted != self.len {
            return Err(InvariantError::new(format!(
                "stored-key count mismatch: counted {counted}, len {}",
                self.len
            )));
        }
        Ok(())
    }

    #[cfg(any(test, debug_assertions))]
    fn check_node(node: &Node<V>, is_root: bool, counted: &mut usize) -> Result<(), InvariantError> {
        if !is_root && node.prefix.is_empty() {
            return Err(InvariantError::new("empty prefix below root"));
        }
        if !is_root && node.value.is_none() && node.branches.len() == 1 {
            return Err(InvariantError::new(
                "uncompacted node: no value and exactly one branch",
            ));
        }
        if node.value.is_some() {
            *counted += 1;
        }
        for pair in node.branches.windows(2) {
            if pair[0].prefix[0] >= pair[1].prefix[0] {
                return Err(InvariantError::new(
                    "branch list not sorted strictly ascending by first code point",
                ));
            }
        }
        for child in &node.branches {
            Self::check_node(child, false, counted)?;
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// ConcurrentTrie
// ---------------------------------------------------------------------------

/// Thread-safe wrapper around [`Trie`] using a reader-writer lock.
///
/// Readers (`get`, `exists`, `prefixes`, `has_prefixes`, `suffixes`,
/// `for_each*`, `print`) run concurrently; writers (`put`, `delete`) are
/// exclusive. Enumeration callbacks run with the read lock held, so they
/// must not call writer methods on the same trie.
///
/// # Example
///
/// ```
/// use std::sync::Arc;
/// use std::thread;
/// use dskit::trie::ConcurrentTrie;
///
/// let trie = Arc::new(ConcurrentTrie::new());
/// let writer = trie.clone();
/// thread::spawn(move || {
///     writer.put("key", 1);
/// })
/// .join()
/// .unwrap();
/// assert_eq!(trie.get("key"), Some(1));
/// ```
#[derive(Debug)]
pub struct ConcurrentTrie<V> {
    inner: RwLock<Trie<V>>,
}

impl<V> Default for ConcurrentTrie<V> {
    fn default() -> Self {
        Self::new()
    }
}

impl<V> ConcurrentTrie<V> {
    /// Creates an empty concurrent trie.
    pub fn new() -> Self {
        ConcurrentTrie {
            inner: RwLock::new(Trie::new()),
        }
    }

    /// Inserts `value` under `key`, returning the previous value if any.
    /// Empty keys insert nothing.
    pub fn put(&self, key: &str, value: V) -> Option<V> {
        self.inner.write().put(key, value)
    }

    /// Removes `key` and returns its value, if present.
    pub fn delete(&self, key: &str) -> Option<V> {
        self.inner.write().delete(key)
    }

    /// Returns `true` if `key` is stored.
    pub fn exists(&self, key: &str) -> bool {
        self.inner.read().exists(key)
    }

    /// Returns every stored key that is a strict prefix of `key`, shortest
    /// to longest.
    pub fn prefixes(&self, key: &str) -> Vec<String> {
        self.inner.read().prefixes(key)
    }

    /// Returns `true` if any stored key is a strict prefix of `key`.
    pub fn has_prefixes(&self, key: &str) -> bool {
        self.inner.read().has_prefixes(key)
    }

    /// Returns every stored key that has `key` as a strict prefix.
    pub fn suffixes(&self, key: &str) -> Vec<String> {
        self.inner.read().suffixes(key)
    }

    /// Returns the number of stored keys.
    pub fn len(&self) -> usize {
        self.inner.read().len()
    }

    /// Returns `true` if no keys are stored.
    pub fn is_empty(&self) -> bool {
        self.inner.read().is_empty()
    }

    /// Visits every stored `(key, value)` pair in pre-order under the read
    /// lock. Returning `false` aborts the walk.
    pub fn for_each<F>(&self, f: F)
    where
        F: FnMut(&str, &V) -> bool,
    {
        self.inner.read().for_each(f);
    }

    /// Writes the tree dump to `w`; see [`Trie::print`].
    pub fn print<W: io::Write>(&self, w: &mut W) -> io::Result<()>
    where
        V: fmt::Display,
    {
        self.inner.read().print(w)
    }
}

impl<V: Clone> ConcurrentTrie<V> {
    /// Returns a clone of the value at `key`, if present.
    pub fn get(&self, key: &str) -> Option<V> {
        self.inner.read().get(key).cloned()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
