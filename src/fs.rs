//! In-memory file system backed by the radix trie.
//!
//! A thin façade mapping path strings to file and directory entries. The trie
//! provides path lookup and the suffix enumeration used for directory
//! listing. Paths are plain strings separated by `/`; no normalization
//! beyond trimming trailing separators is performed, and modes or
//! permissions are not enforced.

use std::time::SystemTime;

use parking_lot::RwLock;

use crate::error::FsError;
use crate::trie::Trie;

/// Kind of a file-system entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntryKind {
    /// Regular file with byte contents.
    File,
    /// Directory.
    Dir,
}

/// Metadata describing a stored entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Metadata {
    /// Full path of the entry.
    pub path: String,
    /// File or directory.
    pub kind: EntryKind,
    /// Content size in bytes; zero for directories.
    pub size: u64,
    /// Last modification time.
    pub modified: SystemTime,
}

/// One entry of a directory listing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DirEntry {
    /// Name of the entry within its directory (no separators).
    pub name: String,
    /// File or directory.
    pub kind: EntryKind,
}

#[derive(Debug, Clone)]
struct FileNode {
    kind: EntryKind,
    data: Vec<u8>,
    modified: SystemTime,
}

impl FileNode {
    fn file(data: Vec<u8>) -> Self {
        FileNode {
            kind: EntryKind::File,
            data,
            modified: SystemTime::now(),
        }
    }

    fn dir() -> Self {
        FileNode {
            kind: EntryKind::Dir,
            data: Vec::new(),
            modified: SystemTime::now(),
        }
    }
}

/// Simple in-memory file system.
///
/// # Example
///
/// ```
/// use dskit::fs::{EntryKind, MemFs};
///
/// let fs = MemFs::new();
/// fs.mkdir("docs").unwrap();
/// fs.write_file("docs/readme.txt", b"hello".to_vec()).unwrap();
///
/// assert_eq!(fs.read_file("docs/readme.txt").unwrap(), b"hello");
/// let entries = fs.read_dir("docs").unwrap();
/// assert_eq!(entries.len(), 1);
/// assert_eq!(entries[0].name, "readme.txt");
/// assert_eq!(entries[0].kind, EntryKind::File);
/// ```
pub struct MemFs {
    files: RwLock<Trie<FileNode>>,
}

impl Default for MemFs {
    fn default() -> Self {
        Self::new()
    }
}

impl MemFs {
    /// Creates an empty file system.
    pub fn new() -> Self {
        MemFs {
            files: RwLock::new(Trie::new()),
        }
    }

    /// Creates an empty file at `name`.
    ///
    /// Returns [`FsError::AlreadyExists`] if an entry already exists there.
    pub fn create(&self, name: &str) -> Result<(), FsError> {
        let name = normalize(name)?;
        let mut files = self.files.write();
        if files.exists(name) {
            return Err(FsError::AlreadyExists);
        }
        files.put(name, FileNode::file(Vec::new()));
        Ok(())
    }

    /// Creates a directory at `name`.
    ///
    /// Returns [`FsError::AlreadyExists`] if an entry already exists there.
    pub fn mkdir(&self, name: &str) -> Result<(), FsError> {
        let name = normalize(name)?;
        let mut files = self.files.write();
        if files.exists(name) {
            return Err(FsError::AlreadyExists);
        }
        files.put(name, FileNode::dir());
        Ok(())
    }

    /// Writes `data` to the file at `name`, creating it if absent and
    /// replacing its contents otherwise.
    ///
    /// Returns [`FsError::AlreadyExists`] if a directory occupies the name.
    pub fn write_file(&self, name: &str, data: Vec<u8>) -> Result<(), FsError> {
        let name = normalize(name)?;
        let mut files = self.files.write();
        if let Some(node) = files.get(name) {
            if node.kind == EntryKind::Dir {
                return Err(FsError::AlreadyExists);
            }
        }
        files.put(name, FileNode::file(data));
        Ok(())
    }

    /// Reads the contents of the file at `name`.
    ///
    /// Returns [`FsError::NotFound`] if the entry is absent or a directory.
    pub fn read_file(&self, name: &str) -> Result<Vec<u8>, FsError> {
        let name = normalize(name)?;
        let files = self.files.read();
        match files.get(name) {
            Some(node) if node.kind == EntryKind::File => Ok(node.data.clone()),
            _ => Err(FsError::NotFound),
        }
    }

    /// Lists the immediate children of the directory at `name`, in
    /// lexicographic order. An empty `name` lists the top level.
    ///
    /// Children are found through the trie's suffix enumeration rooted at
    /// the directory, so the cost is bounded by the subtree, not the whole
    /// file system.
    ///
    /// Returns [`FsError::NotFound`] if the directory is absent or the name
    /// refers to a file.
    pub fn read_dir(&self, name: &str) -> Result<Vec<DirEntry>, FsError> {
        let dir = name.trim_end_matches('/');
        let files = self.files.read();
        let mut entries = Vec::new();
        if dir.is_empty() {
            // Top level: there is no anchor key to enumerate under.
            files.for_each(|path, node| {
                if !path.contains('/') {
                    entries.push(DirEntry {
                        name: path.to_owned(),
                        kind: node.kind,
                    });
                }
                true
            });
            return Ok(entries);
        }
        match files.get(dir) {
            Some(node) if node.kind == EntryKind::Dir => {}
            _ => return Err(FsError::NotFound),
        }
        let prefix = format!("{dir}/");
        for path in files.suffixes(dir) {
            // Suffix keys sharing the name without the separator (e.g.
            // "home2" under "home") are not children.
            let Some(rest) = path.strip_prefix(prefix.as_str()) else {
                continue;
            };
            if rest.is_empty() || rest.contains('/') {
                continue;
            }
            if let Some(node) = files.get(&path) {
                entries.push(DirEntry {
                    name: rest.to_owned(),
                    kind: node.kind,
                });
            }
        }
        Ok(entries)
    }

    /// Returns metadata for the entry at `name`.
    ///
    /// Returns [`FsError::NotFound`] if the entry does not exist.
    pub fn stat(&self, name: &str) -> Result<Metadata, FsError> {
        let name = normalize(name)?;
        let files = self.files.read();
        let node = files.get(name).ok_or(FsError::NotFound)?;
        Ok(Metadata {
            path: name.to_owned(),
            kind: node.kind,
            size: node.data.len() as u64,
            modified: node.modified,
        })
    }

    /// Removes the entry at `name`. Removing a directory does not remove
    /// entries below it.
    ///
    /// Returns [`FsError::NotFound`] if the entry does not exist.
    pub fn remove(&self, name: &str) -> Result<(), FsError> {
        let name = normalize(name)?;
        match self.files.write().delete(name) {
            Some(_) => Ok(()),
            None => Err(FsError::NotFound),
        }
    }

    /// Returns `true` if an entry exists at `name`.
    pub fn exists(&self, name: &str) -> bool {
        normalize(name)
            .map(|name| self.files.read().exists(name))
            .unwrap_or(false)
    }
}

fn normalize(name: &str) -> Result<&str, FsError> {
    let name = name.trim_end_matches('/');
    if name.is_empty() {
        return Err(FsError::NotFound);
    }
    Ok(name)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn create_open_round_trip() {
        let fs = MemFs::new();
        fs.create("myfile.txt").unwrap();
        assert!(fs.exists("myfile.txt"));
        assert_eq!(fs.read_file("myfile.txt").unwrap(), Vec::<u8>::new());
        assert_eq!(fs.create("myfile.txt"), Err(FsError::AlreadyExists));
    }

    #[test]
    fn write_replaces_contents() {
        let fs = MemFs::new();
        fs.write_file("f", b"one".to_vec()).unwrap();
        fs.write_file("f", b"two".to_vec()).unwrap();
        assert_eq!(fs.read_file("f").unwrap(), b"two");
    }

    #[test]
    fn missing_entries_are_not_found() {
        let fs = MemFs::new();
        assert_eq!(fs.read_file("nope"), Err(FsError::NotFound));
        assert_eq!(fs.stat("nope").unwrap_err(), FsError::NotFound);
        assert_eq!(fs.remove("nope"), Err(FsError::NotFound));
        assert!(!fs.exists("nope"));
    }

    #[test]
    fn directories_collide_with_files() {
        let fs = MemFs::new();
        fs.mkdir("d").unwrap();
        assert_eq!(fs.mkdir("d"), Err(FsError::AlreadyExists));
        assert_eq!(fs.write_file("d", Vec::new()), Err(FsError::AlreadyExists));
        assert_eq!(fs.read_file("d"), Err(FsError::NotFound));
    }

    #[test]
    fn read_dir_lists_immediate_children_only() {
        let fs = MemFs::new();
        fs.mkdir("home").unwrap();
        fs.mkdir("home/user").unwrap();
        fs.write_file("home/user/notes.txt", b"n".to_vec()).unwrap();
        fs.write_file("home/todo.txt", b"t".to_vec()).unwrap();

        let entries = fs.read_dir("home").unwrap();
        let names: Vec<&str> = entries.iter().map(|e| e.name.as_str()).collect();
        assert_eq!(names, vec!["todo.txt", "user"]);
        let kinds: Vec<EntryKind> = entries.iter().map(|e| e.kind).collect();
        assert_eq!(kinds, vec![EntryKind::File, EntryKind::Dir]);

        assert_eq!(fs.read_dir("home/user").unwrap().len(), 1);
        assert_eq!(fs.read_dir("missing"), Err(FsError::NotFound));
    }

    #[test]
    fn read_dir_on_a_file_is_not_found() {
        let fs = MemFs::new();
        fs.write_file("f", Vec::new()).unwrap();
        assert_eq!(fs.read_dir("f"), Err(FsError::NotFound));
    }

    #[test]
    fn top_level_listing() {
        let fs = MemFs::new();
        fs.write_file("a.txt", Vec::new()).unwrap();
        fs.mkdir("b").unwrap();
        fs.write_file("b/c.txt", Vec::new()).unwrap();

        let entries = fs.read_dir("").unwrap();
        let names: Vec<&str> = entries.iter().map(|e| e.name.as_str()).collect();
        assert_eq!(names, vec!["a.txt", "b"]);
    }

    #[test]
    fn stat_reports_kind_and_size() {
        let fs = MemFs::new();
        fs.write_file("f", vec![0; 5]).unwrap();
        fs.mkdir("d").unwrap();

        let file = fs.stat("f").unwrap();
        assert_eq!(file.kind, EntryKind::File);
        assert_eq!(file.size, 5);
        assert_eq!(file.path, "f");

        let dir = fs.stat("d").unwrap();
        assert_eq!(dir.kind, EntryKind::Dir);
        assert_eq!(dir.size, 0);
    }

    #[test]
    fn remove_deletes_a_single_entry() {
        let fs = MemFs::new();
        fs.mkdir("d").unwrap();
        fs.write_file("d/f", Vec::new()).unwrap();
        fs.remove("d/f").unwrap();
        assert!(!fs.exists("d/f"));
        assert!(fs.exists("d"));
    }
}
