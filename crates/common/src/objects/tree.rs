use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::linked_data::{BlockEncoded, ObjectId};

/// Unix mode bits recorded for regular files
pub const FILE_MODE: u32 = 0o100644;
/// Unix mode bits recorded for directories
pub const DIR_MODE: u32 = 0o040000;

#[derive(Debug, thiserror::Error, Clone, PartialEq, Eq)]
pub enum TreeError {
    #[error("invalid entry name: {0:?}")]
    InvalidName(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntryKind {
    File,
    Dir,
}

/// A named child of a [`Tree`].
///
/// For files `id` points at a [`FileObject`](super::FileObject) and `size`
///  is the file length. For directories `id` points at another [`Tree`] and
///  `size` is the total size of everything below it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TreeEntry {
    pub kind: EntryKind,
    pub id: ObjectId,
    pub mode: u32,
    pub size: u64,
    pub mtime: i64,
}

impl TreeEntry {
    pub fn file(id: ObjectId, size: u64, mtime: i64) -> Self {
        Self {
            kind: EntryKind::File,
            id,
            mode: FILE_MODE,
            size,
            mtime,
        }
    }

    pub fn dir(id: ObjectId, size: u64, mtime: i64) -> Self {
        Self {
            kind: EntryKind::Dir,
            id,
            mode: DIR_MODE,
            size,
            mtime,
        }
    }

    pub fn is_dir(&self) -> bool {
        self.kind == EntryKind::Dir
    }

    pub fn is_file(&self) -> bool {
        self.kind == EntryKind::File
    }
}

/// An immutable directory snapshot: entry names mapped to children.
///
/// Names are unique by construction (map keys) and iterate in byte order,
///  which is the stable order listings are served in.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Tree {
    entries: BTreeMap<String, TreeEntry>,
}

impl BlockEncoded for Tree {}

impl Tree {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, name: &str) -> Option<&TreeEntry> {
        self.entries.get(name)
    }

    /// Insert or replace an entry, returning the previous one
    pub fn insert(&mut self, name: String, entry: TreeEntry) -> Result<Option<TreeEntry>, TreeError> {
        validate_name(&name)?;
        Ok(self.entries.insert(name, entry))
    }

    pub fn remove(&mut self, name: &str) -> Option<TreeEntry> {
        self.entries.remove(name)
    }

    pub fn entries(&self) -> &BTreeMap<String, TreeEntry> {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Sum of the sizes of every file reachable from this tree
    pub fn total_size(&self) -> u64 {
        self.entries.values().map(|e| e.size).sum()
    }
}

/// Entry names are single path segments
pub fn validate_name(name: &str) -> Result<(), TreeError> {
    if name.is_empty() || name == "." || name == ".." || name.contains('/') || name.contains('\0')
    {
        return Err(TreeError::InvalidName(name.to_string()));
    }
    Ok(())
}
