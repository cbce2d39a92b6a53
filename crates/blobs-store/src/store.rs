use std::path::Path;

use async_trait::async_trait;
use bytes::Bytes;
use common::backend::BackendError;
use common::linked_data::ObjectId;
use common::store::BlockStore;
use tracing::{debug, warn};

use crate::database::Database;
use crate::error::{BlobStoreError, Result};
use crate::storage::{ObjectStoreConfig, Storage};

/// Outcome of rebuilding the index from object storage
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct RecoveryStats {
    pub found: usize,
    pub added: usize,
    pub existing: usize,
    pub errors: usize,
}

/// Durable block store: bytes in object storage, index in SQLite.
///
/// Block bytes are written before the index row, so an indexed block is
///  always readable. A crash in between leaves an unindexed object that
///  [`BlobStore::recover`] picks up again.
#[derive(Debug, Clone)]
pub struct BlobStore {
    db: Database,
    storage: Storage,
}

impl BlobStore {
    /// Store with a file-based SQLite index
    pub async fn new(db_path: &Path, config: &ObjectStoreConfig) -> Result<Self> {
        let db = Database::new(db_path).await?;
        let storage = Storage::new(config).await?;
        Ok(Self { db, storage })
    }

    /// Store with an in-memory SQLite index
    pub async fn in_memory(config: &ObjectStoreConfig) -> Result<Self> {
        let db = Database::in_memory().await?;
        let storage = Storage::new(config).await?;
        Ok(Self { db, storage })
    }

    /// Index at `data_dir/blocks.db`, objects under `data_dir/objects/`
    pub async fn new_local(data_dir: &Path) -> Result<Self> {
        let config = ObjectStoreConfig::Local {
            path: data_dir.join("objects"),
        };
        Self::new(&data_dir.join("blocks.db"), &config).await
    }

    /// In-memory index and in-memory object storage
    pub async fn new_ephemeral() -> Result<Self> {
        Self::in_memory(&ObjectStoreConfig::Memory).await
    }

    pub async fn put_bytes(&self, data: Bytes) -> Result<ObjectId> {
        let id = ObjectId::of(&data);
        let key = id.to_hex();
        if self.db.has_block(&key).await? {
            return Ok(id);
        }

        let size = data.len();
        self.storage.put_block(&key, data).await?;
        if self.db.insert_block(&key, size as i64).await? {
            debug!(block = %id.short(), size, "stored block");
        }
        Ok(id)
    }

    pub async fn get_bytes(&self, id: &ObjectId) -> Result<Option<Bytes>> {
        let key = id.to_hex();
        if !self.db.has_block(&key).await? {
            return Ok(None);
        }
        self.storage.get_block(&key).await
    }

    /// Recorded size of a block
    pub async fn size(&self, id: &ObjectId) -> Result<Option<u64>> {
        Ok(self
            .db
            .block_size(&id.to_hex())
            .await?
            .map(|size| size as u64))
    }

    pub async fn count(&self) -> Result<u64> {
        Ok(self.db.count_blocks().await? as u64)
    }

    pub async fn total_size(&self) -> Result<u64> {
        Ok(self.db.total_size().await? as u64)
    }

    /// Re-index every object found in storage that the index is missing.
    ///
    /// Objects whose content does not hash to their key are counted as
    ///  errors and left unindexed.
    pub async fn recover(&self) -> Result<RecoveryStats> {
        let mut stats = RecoveryStats::default();
        let keys = self.storage.list_block_ids().await?;
        stats.found = keys.len();

        for key in keys {
            if self.db.has_block(&key).await? {
                stats.existing += 1;
                continue;
            }
            let expected = match ObjectId::from_hex(&key) {
                Ok(id) => id,
                Err(_) => {
                    warn!(key = %key, "object with invalid block id in storage");
                    stats.errors += 1;
                    continue;
                }
            };
            match self.storage.get_block(&key).await? {
                Some(data) if ObjectId::of(&data) == expected => {
                    self.db.insert_block(&key, data.len() as i64).await?;
                    debug!(block = %expected.short(), "recovered block");
                    stats.added += 1;
                }
                Some(_) => {
                    warn!(block = %expected.short(), "stored block does not match its id");
                    stats.errors += 1;
                }
                None => {
                    warn!(block = %expected.short(), "block listed but not found in storage");
                    stats.errors += 1;
                }
            }
        }
        Ok(stats)
    }

    #[cfg(test)]
    pub(crate) fn storage(&self) -> &Storage {
        &self.storage
    }
}

#[async_trait]
impl BlockStore for BlobStore {
    async fn put(&self, data: Bytes) -> std::result::Result<ObjectId, BackendError> {
        Ok(self.put_bytes(data).await?)
    }

    async fn get(&self, id: &ObjectId) -> std::result::Result<Option<Bytes>, BackendError> {
        Ok(self.get_bytes(id).await?)
    }

    async fn has(&self, id: &ObjectId) -> std::result::Result<bool, BackendError> {
        self.db
            .has_block(&id.to_hex())
            .await
            .map_err(|e: BlobStoreError| e.into())
    }
}
