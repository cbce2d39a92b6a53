use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::linked_data::{BlockEncoded, CommitId, TreeId};

/// An immutable snapshot of a repository.
///
/// The commit's id is the digest of its encoding, which includes the
///  parent id. A parent therefore has to exist (and be hashed) before any
///  child can name it, so walking `parent` links can never loop.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Commit {
    /// Repository this snapshot belongs to
    pub repo_id: Uuid,
    /// Previous snapshot, `None` only for the repository's root commit
    pub parent: Option<CommitId>,
    /// Root directory tree
    pub root: TreeId,
    pub author: String,
    pub description: String,
    /// Unix seconds
    pub timestamp: i64,
    /// Total size of the root tree
    pub size: u64,
    /// Change in total size relative to the parent
    pub size_delta: i64,
}

impl BlockEncoded for Commit {}

impl Commit {
    pub fn is_root(&self) -> bool {
        self.parent.is_none()
    }
}
