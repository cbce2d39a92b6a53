use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::RwLock;
use uuid::Uuid;

use crate::backend::BackendError;
use crate::linked_data::CommitId;

#[derive(thiserror::Error, Debug)]
pub enum HeadError {
    /// The stored head is not the one the writer observed
    #[error("head moved: expected {expected:?}, found {actual:?}")]
    Mismatch {
        expected: Option<CommitId>,
        actual: Option<CommitId>,
    },
    #[error("head provider error: {0}")]
    Backend(#[from] BackendError),
}

/// Per-repository head pointers.
///
/// `compare_and_swap` is the only way a head ever moves. Two writers that
///  observed the same head cannot both succeed.
#[async_trait]
pub trait HeadProvider: Send + Sync + std::fmt::Debug + 'static {
    /// Current head, `None` if the repository has never been committed to
    async fn head(&self, repo: Uuid) -> Result<Option<CommitId>, BackendError>;

    /// Atomically move the head from `expected` to `new`.
    ///
    /// `expected = None` installs the first head of a repository and fails
    ///  if one already exists.
    async fn compare_and_swap(
        &self,
        repo: Uuid,
        expected: Option<CommitId>,
        new: CommitId,
    ) -> Result<(), HeadError>;

    /// Every repository that has a head
    async fn repos(&self) -> Result<Vec<Uuid>, BackendError>;
}

/// In-memory head pointers
#[derive(Debug, Clone, Default)]
pub struct MemoryHeadProvider {
    inner: Arc<RwLock<HashMap<Uuid, CommitId>>>,
}

impl MemoryHeadProvider {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl HeadProvider for MemoryHeadProvider {
    async fn head(&self, repo: Uuid) -> Result<Option<CommitId>, BackendError> {
        Ok(self.inner.read().get(&repo).copied())
    }

    async fn compare_and_swap(
        &self,
        repo: Uuid,
        expected: Option<CommitId>,
        new: CommitId,
    ) -> Result<(), HeadError> {
        // check and write under one guard
        let mut heads = self.inner.write();
        let actual = heads.get(&repo).copied();
        if actual != expected {
            return Err(HeadError::Mismatch { expected, actual });
        }
        heads.insert(repo, new);
        Ok(())
    }

    async fn repos(&self) -> Result<Vec<Uuid>, BackendError> {
        Ok(self.inner.read().keys().copied().collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::linked_data::ObjectId;

    #[tokio::test]
    async fn test_install_then_advance() {
        let heads = MemoryHeadProvider::new();
        let repo = Uuid::new_v4();
        let first = ObjectId::of(b"first");
        let second = ObjectId::of(b"second");

        assert_eq!(heads.head(repo).await.unwrap(), None);
        heads.compare_and_swap(repo, None, first).await.unwrap();
        assert!(matches!(
            heads.compare_and_swap(repo, None, second).await,
            Err(HeadError::Mismatch { actual: Some(a), .. }) if a == first
        ));

        heads
            .compare_and_swap(repo, Some(first), second)
            .await
            .unwrap();
        assert_eq!(heads.head(repo).await.unwrap(), Some(second));
        assert_eq!(heads.repos().await.unwrap(), vec![repo]);
    }

    #[tokio::test]
    async fn test_stale_expected_is_rejected() {
        let heads = MemoryHeadProvider::new();
        let repo = Uuid::new_v4();
        let base = ObjectId::of(b"base");
        heads.compare_and_swap(repo, None, base).await.unwrap();

        let a = heads.compare_and_swap(repo, Some(base), ObjectId::of(b"a"));
        let b = heads.compare_and_swap(repo, Some(base), ObjectId::of(b"b"));
        let (a, b) = tokio::join!(a, b);
        assert!(a.is_ok() ^ b.is_ok());
    }
}
