use serde::{Deserialize, Serialize};

use crate::linked_data::{BlockEncoded, BlockId};

/// Default block size files are split into before storage (8 MiB)
pub const DEFAULT_BLOCK_SIZE: usize = 8 * 1024 * 1024;

/// The manifest of a stored file: its length and the ordered blocks
///  that concatenate to its contents.
///
/// Blocks are deduplicated by the store, so two files sharing a byte
///  range on a block boundary share the block.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct FileObject {
    pub size: u64,
    pub blocks: Vec<BlockId>,
}

impl BlockEncoded for FileObject {}

impl FileObject {
    pub fn new(size: u64, blocks: Vec<BlockId>) -> Self {
        Self { size, blocks }
    }

    pub fn block_count(&self) -> usize {
        self.blocks.len()
    }
}
