//! Per-repository commit history.
//!
//! Commits are immutable objects in the [`ObjectStore`]; the only mutable
//!  state is the head pointer kept by a [`HeadProvider`]. A writer builds
//!  its commit on the head it observed and then swaps the head from that
//!  value to the new commit. If someone else got there first the swap fails
//!  with [`CommitError::ConcurrentHeadMismatch`] and nothing is overwritten.

mod head;

use std::future::Future;
use std::sync::Arc;

use uuid::Uuid;

use crate::backend::BackendError;
use crate::linked_data::{CommitId, ObjectId, TreeId};
use crate::objects::{Commit, Tree};
use crate::resolver::ResolveError;
use crate::store::{ObjectError, ObjectStore};

pub use head::{HeadError, HeadProvider, MemoryHeadProvider};

/// How many times [`CommitGraph::commit_change`] re-applies an edit after
///  losing a head race
pub const DEFAULT_HEAD_RETRY_LIMIT: usize = 3;

/// Description recorded on the first commit of every repository
pub const ROOT_COMMIT_DESCRIPTION: &str = "Created library";

#[derive(Debug, thiserror::Error)]
pub enum CommitError {
    #[error("object not found: {0}")]
    NotFound(ObjectId),
    #[error("parent commit not found: {0}")]
    ParentNotFound(CommitId),
    #[error("parent commit {parent} belongs to another repository than {repo}")]
    ForeignParent { repo: Uuid, parent: CommitId },
    #[error("repository {0} has no head")]
    RepoNotFound(Uuid),
    #[error("repository {0} already exists")]
    RepoExists(Uuid),
    #[error("head of {repo} moved: expected {expected:?}, found {actual:?}")]
    ConcurrentHeadMismatch {
        repo: Uuid,
        expected: Option<CommitId>,
        actual: Option<CommitId>,
    },
    #[error("resolve error: {0}")]
    Resolve(#[from] ResolveError),
    #[error("object error: {0}")]
    Object(#[from] ObjectError),
    #[error("backend error: {0}")]
    Backend(#[from] BackendError),
}

#[derive(Clone, Debug)]
pub struct CommitGraph {
    objects: ObjectStore,
    heads: Arc<dyn HeadProvider>,
    retry_limit: usize,
}

impl CommitGraph {
    pub fn new(objects: ObjectStore, heads: Arc<dyn HeadProvider>) -> Self {
        Self {
            objects,
            heads,
            retry_limit: DEFAULT_HEAD_RETRY_LIMIT,
        }
    }

    pub fn with_retry_limit(mut self, retry_limit: usize) -> Self {
        self.retry_limit = retry_limit;
        self
    }

    pub fn objects(&self) -> &ObjectStore {
        &self.objects
    }

    pub fn heads(&self) -> &Arc<dyn HeadProvider> {
        &self.heads
    }

    /// Write a commit of `root` on top of `parent` and advance the head.
    ///
    /// `parent` is the head the caller observed; `None` creates the root
    ///  commit of a repository that has no head yet.
    pub async fn create_commit(
        &self,
        repo: Uuid,
        parent: Option<CommitId>,
        root: TreeId,
        author: &str,
        description: &str,
    ) -> Result<CommitId, CommitError> {
        let parent_size = match parent {
            Some(parent_id) => {
                let parent_commit = match self.objects.get_commit(&parent_id).await {
                    Ok(c) => c,
                    Err(ObjectError::NotFound(_)) => {
                        return Err(CommitError::ParentNotFound(parent_id))
                    }
                    Err(e) => return Err(e.into()),
                };
                if parent_commit.repo_id != repo {
                    return Err(CommitError::ForeignParent {
                        repo,
                        parent: parent_id,
                    });
                }
                Some(parent_commit.size)
            }
            None => None,
        };

        // no forward references: the tree must already be stored
        let tree = self.get_tree_or_not_found(&root).await?;
        let size = tree.total_size();

        let commit = Commit {
            repo_id: repo,
            parent,
            root,
            author: author.to_string(),
            description: description.to_string(),
            timestamp: chrono::Utc::now().timestamp(),
            size,
            size_delta: size as i64 - parent_size.unwrap_or(0) as i64,
        };
        let id = self.objects.put_commit(&commit).await?;

        match self.heads.compare_and_swap(repo, parent, id).await {
            Ok(()) => {}
            Err(HeadError::Mismatch { expected, actual }) => {
                tracing::warn!(
                    repo = %repo,
                    commit = %id.short(),
                    "head moved before commit could be installed"
                );
                return Err(CommitError::ConcurrentHeadMismatch {
                    repo,
                    expected,
                    actual,
                });
            }
            Err(HeadError::Backend(e)) => return Err(e.into()),
        }

        tracing::info!(
            repo = %repo,
            commit = %id.short(),
            parent = ?parent.map(|p| p.short()),
            size,
            "created commit"
        );
        Ok(id)
    }

    pub async fn get_commit(&self, id: &CommitId) -> Result<Commit, CommitError> {
        match self.objects.get_commit(id).await {
            Ok(c) => Ok(c),
            Err(ObjectError::NotFound(_)) => Err(CommitError::NotFound(*id)),
            Err(e) => Err(e.into()),
        }
    }

    pub async fn head(&self, repo: Uuid) -> Result<CommitId, CommitError> {
        self.heads
            .head(repo)
            .await?
            .ok_or(CommitError::RepoNotFound(repo))
    }

    /// Commits from `from` back towards the root, newest first
    pub async fn history(
        &self,
        from: &CommitId,
        limit: usize,
    ) -> Result<Vec<(CommitId, Commit)>, CommitError> {
        let mut out = Vec::new();
        let mut next = Some(*from);
        while let Some(id) = next {
            if out.len() >= limit {
                break;
            }
            let commit = self.get_commit(&id).await?;
            next = commit.parent;
            out.push((id, commit));
        }
        Ok(out)
    }

    /// Give a new repository its empty root commit
    pub async fn init_repo(&self, repo: Uuid, author: &str) -> Result<CommitId, CommitError> {
        if self.heads.head(repo).await?.is_some() {
            return Err(CommitError::RepoExists(repo));
        }
        let empty = self.objects.put_tree(&Tree::new()).await?;
        match self
            .create_commit(repo, None, empty, author, ROOT_COMMIT_DESCRIPTION)
            .await
        {
            Err(CommitError::ConcurrentHeadMismatch { .. }) => Err(CommitError::RepoExists(repo)),
            other => other,
        }
    }

    /// Apply `edit` to the current root tree and commit the result.
    ///
    /// When the head moves underneath us the edit is re-applied to the new
    ///  head, up to the configured retry limit.
    pub async fn commit_change<F, Fut>(
        &self,
        repo: Uuid,
        author: &str,
        description: &str,
        mut edit: F,
    ) -> Result<CommitId, CommitError>
    where
        F: FnMut(TreeId) -> Fut,
        Fut: Future<Output = Result<TreeId, CommitError>>,
    {
        let mut attempt = 0;
        loop {
            let head = self.head(repo).await?;
            let current = self.get_commit(&head).await?;
            let root = edit(current.root).await?;

            match self
                .create_commit(repo, Some(head), root, author, description)
                .await
            {
                Err(CommitError::ConcurrentHeadMismatch { .. }) if attempt < self.retry_limit => {
                    attempt += 1;
                    tracing::debug!(repo = %repo, attempt, "retrying commit against new head");
                }
                other => return other,
            }
        }
    }

    async fn get_tree_or_not_found(&self, id: &TreeId) -> Result<Tree, CommitError> {
        match self.objects.get_tree(id).await {
            Ok(tree) => Ok(tree),
            Err(ObjectError::NotFound(_)) => Err(CommitError::NotFound(*id)),
            Err(e) => Err(e.into()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::objects::TreeEntry;
    use crate::path::RepoPath;
    use crate::resolver::insert_entry;

    fn graph() -> CommitGraph {
        CommitGraph::new(ObjectStore::memory(), Arc::new(MemoryHeadProvider::new()))
    }

    async fn tree_with(objects: &ObjectStore, name: &str, data: &[u8]) -> TreeId {
        let file = objects.put_file(data, 1024).await.unwrap();
        let mut tree = Tree::new();
        tree.insert(name.to_string(), TreeEntry::file(file, data.len() as u64, 0))
            .unwrap();
        objects.put_tree(&tree).await.unwrap()
    }

    #[tokio::test]
    async fn test_init_repo() {
        let graph = graph();
        let repo = Uuid::new_v4();
        let root = graph.init_repo(repo, "alice").await.unwrap();
        assert_eq!(graph.head(repo).await.unwrap(), root);

        let commit = graph.get_commit(&root).await.unwrap();
        assert!(commit.is_root());
        assert_eq!(commit.size, 0);
        assert_eq!(commit.description, ROOT_COMMIT_DESCRIPTION);

        assert!(matches!(
            graph.init_repo(repo, "alice").await,
            Err(CommitError::RepoExists(_))
        ));
    }

    #[tokio::test]
    async fn test_missing_parent_and_root() {
        let graph = graph();
        let repo = Uuid::new_v4();
        let base = graph.init_repo(repo, "alice").await.unwrap();
        let tree = tree_with(graph.objects(), "a.txt", b"abc").await;

        let ghost = ObjectId::of(b"ghost commit");
        assert!(matches!(
            graph.create_commit(repo, Some(ghost), tree, "alice", "x").await,
            Err(CommitError::ParentNotFound(p)) if p == ghost
        ));

        let ghost_tree = ObjectId::of(b"ghost tree");
        assert!(matches!(
            graph.create_commit(repo, Some(base), ghost_tree, "alice", "x").await,
            Err(CommitError::NotFound(t)) if t == ghost_tree
        ));

        let other = Uuid::new_v4();
        graph.init_repo(other, "bob").await.unwrap();
        assert!(matches!(
            graph.create_commit(other, Some(base), tree, "bob", "x").await,
            Err(CommitError::ForeignParent { .. })
        ));
    }

    #[tokio::test]
    async fn test_size_delta_and_history() {
        let graph = graph();
        let repo = Uuid::new_v4();
        let base = graph.init_repo(repo, "alice").await.unwrap();

        let tree = tree_with(graph.objects(), "a.txt", b"twelve bytes").await;
        let second = graph
            .create_commit(repo, Some(base), tree, "alice", "Added a.txt")
            .await
            .unwrap();
        let commit = graph.get_commit(&second).await.unwrap();
        assert_eq!(commit.size, 12);
        assert_eq!(commit.size_delta, 12);

        let history = graph.history(&second, 10).await.unwrap();
        let ids: Vec<_> = history.iter().map(|(id, _)| *id).collect();
        assert_eq!(ids, vec![second, base]);
        assert_eq!(graph.history(&second, 1).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_stale_parent_is_a_head_mismatch() {
        let graph = graph();
        let repo = Uuid::new_v4();
        let base = graph.init_repo(repo, "alice").await.unwrap();

        let a = tree_with(graph.objects(), "a.txt", b"a").await;
        let b = tree_with(graph.objects(), "b.txt", b"b").await;
        graph
            .create_commit(repo, Some(base), a, "alice", "a")
            .await
            .unwrap();
        let result = graph.create_commit(repo, Some(base), b, "bob", "b").await;
        assert!(matches!(
            result,
            Err(CommitError::ConcurrentHeadMismatch { expected: Some(e), .. }) if e == base
        ));
    }

    #[tokio::test]
    async fn test_commit_change_retries_against_new_head() {
        let graph = graph();
        let repo = Uuid::new_v4();
        graph.init_repo(repo, "alice").await.unwrap();
        let objects = graph.objects().clone();
        let file = objects.put_file(b"payload", 1024).await.unwrap();

        // the first attempt races a competing writer
        let mut raced = false;
        let id = graph
            .commit_change(repo, "alice", "Added b.txt", |root| {
                let objects = objects.clone();
                let graph = graph.clone();
                let race = !raced;
                raced = true;
                async move {
                    if race {
                        graph
                            .commit_change(repo, "bob", "Added a.txt", |root| {
                                let objects = objects.clone();
                                async move {
                                    Ok::<_, CommitError>(insert_entry(
                                        &objects,
                                        &root,
                                        &RepoPath::parse("/a.txt").unwrap(),
                                        TreeEntry::file(file, 7, 0),
                                    )
                                    .await?)
                                }
                            })
                            .await?;
                    }
                    Ok::<_, CommitError>(insert_entry(
                        &objects,
                        &root,
                        &RepoPath::parse("/b.txt").unwrap(),
                        TreeEntry::file(file, 7, 0),
                    )
                    .await?)
                }
            })
            .await
            .unwrap();

        let commit = graph.get_commit(&id).await.unwrap();
        let tree = objects.get_tree(&commit.root).await.unwrap();
        assert!(tree.get("a.txt").is_some());
        assert!(tree.get("b.txt").is_some());
        assert_eq!(graph.history(&id, 10).await.unwrap().len(), 3);
    }

    #[tokio::test]
    async fn test_commit_change_gives_up() {
        let graph = graph().with_retry_limit(0);
        let repo = Uuid::new_v4();
        graph.init_repo(repo, "alice").await.unwrap();
        let objects = graph.objects().clone();
        let file = objects.put_file(b"x", 1024).await.unwrap();

        let result = graph
            .commit_change(repo, "alice", "loses", |root| {
                let objects = objects.clone();
                let graph = graph.clone();
                async move {
                    let head = graph.head(repo).await?;
                    let other = insert_entry(
                        &objects,
                        &root,
                        &RepoPath::parse("/other").unwrap(),
                        TreeEntry::file(file, 1, 0),
                    )
                    .await?;
                    graph
                        .create_commit(repo, Some(head), other, "bob", "wins")
                        .await?;
                    Ok::<_, CommitError>(root)
                }
            })
            .await;
        assert!(matches!(
            result,
            Err(CommitError::ConcurrentHeadMismatch { .. })
        ));
    }
}
