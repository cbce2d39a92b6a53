//! Path resolution over committed trees.
//!
//! Listings are served in name order over the combined set of entries;
//!  pagination slices that order first and only then splits the page into
//!  directories and files, so consecutive pages never overlap or skip.

mod edit;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::linked_data::{CommitId, ObjectId, TreeId};
use crate::objects::{Commit, EntryKind, Tree, TreeEntry, TreeError, DIR_MODE};
use crate::path::RepoPath;
use crate::store::{ObjectError, ObjectStore};

pub use edit::{insert_entry, remove_entry};

#[derive(Debug, thiserror::Error)]
pub enum ResolveError {
    #[error("commit {0} not found in repository")]
    CommitNotFound(CommitId),
    #[error("path not found: {0}")]
    PathNotFound(String),
    #[error("not a directory: {0}")]
    NotADirectory(String),
    /// A file would replace a directory, or the other way round
    #[error("{0} already exists as a different kind of entry")]
    KindMismatch(String),
    #[error("the root directory has no entry of its own")]
    RootEntry,
    #[error("tree error: {0}")]
    Tree(#[from] TreeError),
    #[error("object error: {0}")]
    Object(#[from] ObjectError),
}

/// One row of a directory listing
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DirEntry {
    pub name: String,
    pub kind: EntryKind,
    pub id: ObjectId,
    pub mode: u32,
    pub size: u64,
    pub mtime: i64,
}

impl DirEntry {
    fn from_entry(name: &str, entry: &TreeEntry) -> Self {
        Self {
            name: name.to_string(),
            kind: entry.kind,
            id: entry.id,
            mode: entry.mode,
            size: entry.size,
            mtime: entry.mtime,
        }
    }

    pub fn is_dir(&self) -> bool {
        self.kind == EntryKind::Dir
    }
}

/// A page of a directory
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DirListing {
    pub dirs: Vec<DirEntry>,
    pub files: Vec<DirEntry>,
    /// Entries remain past `offset + limit`
    pub has_more: bool,
    /// Number of entries in the directory, across all pages
    pub total: usize,
}

impl DirListing {
    pub fn len(&self) -> usize {
        self.dirs.len() + self.files.len()
    }

    pub fn is_empty(&self) -> bool {
        self.dirs.is_empty() && self.files.is_empty()
    }
}

/// Read-only view of repository contents as of a commit
#[derive(Debug, Clone)]
pub struct DirectoryResolver {
    objects: ObjectStore,
}

impl DirectoryResolver {
    pub fn new(objects: ObjectStore) -> Self {
        Self { objects }
    }

    pub fn objects(&self) -> &ObjectStore {
        &self.objects
    }

    /// List one page of the directory at `path` as of `commit`
    pub async fn list_dir(
        &self,
        repo: &Uuid,
        commit: &CommitId,
        path: &RepoPath,
        offset: usize,
        limit: usize,
    ) -> Result<DirListing, ResolveError> {
        let commit_obj = self.commit_in_repo(repo, commit).await?;
        let tree = self.tree_at(&commit_obj.root, path).await?;

        let total = tree.len();
        let mut listing = DirListing {
            has_more: offset.saturating_add(limit) < total,
            total,
            ..Default::default()
        };
        for (name, entry) in tree.entries().iter().skip(offset).take(limit) {
            let row = DirEntry::from_entry(name, entry);
            if row.is_dir() {
                listing.dirs.push(row);
            } else {
                listing.files.push(row);
            }
        }

        tracing::debug!(
            repo = %repo,
            commit = %commit.short(),
            path = %path,
            offset,
            limit,
            returned = listing.len(),
            "list dir"
        );
        Ok(listing)
    }

    /// Describe the file or directory at `path` as of `commit`
    pub async fn stat(
        &self,
        repo: &Uuid,
        commit: &CommitId,
        path: &RepoPath,
    ) -> Result<DirEntry, ResolveError> {
        let commit_obj = self.commit_in_repo(repo, commit).await?;
        let (name, parent) = match (path.name(), path.parent()) {
            (Some(name), Some(parent)) => (name, parent),
            _ => {
                return Ok(DirEntry {
                    name: String::new(),
                    kind: EntryKind::Dir,
                    id: commit_obj.root,
                    mode: DIR_MODE,
                    size: commit_obj.size,
                    mtime: commit_obj.timestamp,
                })
            }
        };
        let tree = self.tree_at(&commit_obj.root, &parent).await?;
        tree.get(name)
            .map(|entry| DirEntry::from_entry(name, entry))
            .ok_or_else(|| ResolveError::PathNotFound(path.as_file_string()))
    }

    async fn commit_in_repo(&self, repo: &Uuid, commit: &CommitId) -> Result<Commit, ResolveError> {
        let commit_obj = match self.objects.get_commit(commit).await {
            Ok(c) => c,
            Err(ObjectError::NotFound(_)) => return Err(ResolveError::CommitNotFound(*commit)),
            Err(e) => return Err(e.into()),
        };
        if commit_obj.repo_id != *repo {
            return Err(ResolveError::CommitNotFound(*commit));
        }
        Ok(commit_obj)
    }

    /// Walk from `root` down to the directory at `path`
    pub async fn tree_at(&self, root: &TreeId, path: &RepoPath) -> Result<Tree, ResolveError> {
        let mut current = self.objects.get_tree(root).await?;
        let mut consumed = RepoPath::root();
        for segment in path.segments() {
            consumed = consumed.join(segment).map_err(|_| {
                ResolveError::PathNotFound(path.as_dir_string())
            })?;
            let next = match current.get(segment) {
                Some(entry) if entry.is_dir() => entry.id,
                // a file where a directory is expected resolves to nothing
                _ => return Err(ResolveError::PathNotFound(consumed.as_dir_string())),
            };
            current = self.objects.get_tree(&next).await?;
        }
        Ok(current)
    }
}
