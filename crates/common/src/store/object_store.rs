use std::sync::Arc;

use bytes::Bytes;

use crate::backend::BackendError;
use crate::linked_data::{BlockEncoded, BlockId, CodecError, CommitId, FileId, ObjectId, TreeId};
use crate::objects::{validate_name, Commit, FileObject, Tree, TreeError};

use super::block_store::{BlockStore, MemoryBlockStore};

#[derive(Debug, thiserror::Error)]
pub enum ObjectError {
    #[error("object not found: {0}")]
    NotFound(ObjectId),
    /// A tree or file references an object that is not in the store yet.
    ///  Children must be written before their parents.
    #[error("object {parent} references missing child {child}")]
    MissingChild { parent: String, child: ObjectId },
    #[error("tree error: {0}")]
    Tree(#[from] TreeError),
    #[error("codec error: {0}")]
    Codec(#[from] CodecError),
    #[error("backend error: {0}")]
    Backend(#[from] BackendError),
}

/// Typed access to the content-addressed store.
///
/// Raw blocks are stored verbatim; files, trees and commits are stored as
///  DAG-CBOR blocks in the same keyspace.
#[derive(Clone, Debug)]
pub struct ObjectStore {
    blocks: Arc<dyn BlockStore>,
}

impl ObjectStore {
    pub fn new(blocks: impl BlockStore) -> Self {
        Self {
            blocks: Arc::new(blocks),
        }
    }

    pub fn from_arc(blocks: Arc<dyn BlockStore>) -> Self {
        Self { blocks }
    }

    /// Object store over a fresh in-memory block store
    pub fn memory() -> Self {
        Self::new(MemoryBlockStore::new())
    }

    pub fn blocks(&self) -> &Arc<dyn BlockStore> {
        &self.blocks
    }

    pub async fn has(&self, id: &ObjectId) -> Result<bool, ObjectError> {
        Ok(self.blocks.has(id).await?)
    }

    pub async fn put_block(&self, data: impl Into<Bytes>) -> Result<BlockId, ObjectError> {
        let data = data.into();
        let size = data.len();
        let id = self.blocks.put(data).await?;
        tracing::trace!(block = %id.short(), size, "put block");
        Ok(id)
    }

    pub async fn get_block(&self, id: &BlockId) -> Result<Bytes, ObjectError> {
        self.blocks
            .get(id)
            .await?
            .ok_or(ObjectError::NotFound(*id))
    }

    /// Split `data` into `block_size` chunks, store each chunk and the
    ///  manifest tying them together
    pub async fn put_file(&self, data: &[u8], block_size: usize) -> Result<FileId, ObjectError> {
        let block_size = block_size.max(1);
        let mut blocks = Vec::with_capacity(data.len().div_ceil(block_size));
        for chunk in data.chunks(block_size) {
            blocks.push(self.put_block(Bytes::copy_from_slice(chunk)).await?);
        }
        let file = FileObject::new(data.len() as u64, blocks);
        let id = self.put_encoded(&file).await?;
        tracing::debug!(file = %id.short(), size = file.size, blocks = file.block_count(), "put file");
        Ok(id)
    }

    /// Store a manifest for blocks that were uploaded separately
    pub async fn put_file_object(&self, file: &FileObject) -> Result<FileId, ObjectError> {
        let parent = format!("file of {} bytes", file.size);
        for block in &file.blocks {
            self.ensure_child(&parent, block).await?;
        }
        self.put_encoded(file).await
    }

    pub async fn get_file(&self, id: &FileId) -> Result<FileObject, ObjectError> {
        self.get_encoded(id).await
    }

    /// Reassemble a file's contents from its blocks
    pub async fn read_file(&self, id: &FileId) -> Result<Vec<u8>, ObjectError> {
        let file = self.get_file(id).await?;
        let mut out = Vec::with_capacity(file.size as usize);
        for block in &file.blocks {
            out.extend_from_slice(&self.get_block(block).await?);
        }
        Ok(out)
    }

    /// Store a tree after checking every entry name and every child
    pub async fn put_tree(&self, tree: &Tree) -> Result<TreeId, ObjectError> {
        for (name, entry) in tree.entries() {
            validate_name(name)?;
            self.ensure_child(name, &entry.id).await?;
        }
        self.put_encoded(tree).await
    }

    pub async fn get_tree(&self, id: &TreeId) -> Result<Tree, ObjectError> {
        self.get_encoded(id).await
    }

    /// Only the commit graph writes commits; it checks parent and root first
    pub(crate) async fn put_commit(&self, commit: &Commit) -> Result<CommitId, ObjectError> {
        self.put_encoded(commit).await
    }

    pub async fn get_commit(&self, id: &CommitId) -> Result<Commit, ObjectError> {
        self.get_encoded(id).await
    }

    async fn ensure_child(&self, parent: &str, child: &ObjectId) -> Result<(), ObjectError> {
        if !self.blocks.has(child).await? {
            return Err(ObjectError::MissingChild {
                parent: parent.to_string(),
                child: *child,
            });
        }
        Ok(())
    }

    async fn put_encoded<T: BlockEncoded>(&self, value: &T) -> Result<ObjectId, ObjectError> {
        let encoded = value.encode()?;
        Ok(self.blocks.put(Bytes::from(encoded)).await?)
    }

    async fn get_encoded<T: BlockEncoded>(&self, id: &ObjectId) -> Result<T, ObjectError> {
        let bytes = self.get_block(id).await?;
        Ok(T::decode(&bytes)?)
    }
}
