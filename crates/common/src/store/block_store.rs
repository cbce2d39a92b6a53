use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use bytes::Bytes;
use parking_lot::RwLock;

use crate::backend::BackendError;
use crate::linked_data::ObjectId;

/// Raw content-addressed byte storage.
///
/// Implementations must be idempotent: putting bytes that are already
///  present returns the same id and leaves the store unchanged, including
///  when two writers race on the same content.
#[async_trait]
pub trait BlockStore: Send + Sync + std::fmt::Debug + 'static {
    /// Store bytes, returning their content address
    async fn put(&self, data: Bytes) -> Result<ObjectId, BackendError>;

    /// Fetch bytes by content address
    async fn get(&self, id: &ObjectId) -> Result<Option<Bytes>, BackendError>;

    async fn has(&self, id: &ObjectId) -> Result<bool, BackendError>;
}

/// In-memory block store backed by a HashMap
#[derive(Debug, Clone, Default)]
pub struct MemoryBlockStore {
    inner: Arc<RwLock<HashMap<ObjectId, Bytes>>>,
}

impl MemoryBlockStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.inner.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.read().is_empty()
    }
}

#[async_trait]
impl BlockStore for MemoryBlockStore {
    async fn put(&self, data: Bytes) -> Result<ObjectId, BackendError> {
        let id = ObjectId::of(&data);
        self.inner.write().entry(id).or_insert(data);
        Ok(id)
    }

    async fn get(&self, id: &ObjectId) -> Result<Option<Bytes>, BackendError> {
        Ok(self.inner.read().get(id).cloned())
    }

    async fn has(&self, id: &ObjectId) -> Result<bool, BackendError> {
        Ok(self.inner.read().contains_key(id))
    }
}
