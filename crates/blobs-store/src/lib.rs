//! SQLite + Object Storage block backend
//!
//! Implements [`common::store::BlockStore`] over:
//! - **Object storage** (S3/MinIO/local filesystem/memory) holding the block bytes
//! - **SQLite** as an index of which blocks exist and how large they are
//!
//! Block bytes live under `blocks/<id>` in object storage, so the index can
//!  always be rebuilt from storage alone with [`BlobStore::recover`].
//!
//! ```rust,no_run
//! use blobs_store::BlobStore;
//! use common::store::ObjectStore;
//! use std::path::Path;
//!
//! # async fn example() -> Result<(), blobs_store::BlobStoreError> {
//! let blocks = BlobStore::new_local(Path::new("/tmp/seabed")).await?;
//! let objects = ObjectStore::new(blocks);
//! # Ok(())
//! # }
//! ```

mod database;
mod error;
mod storage;
mod store;

pub use error::{BlobStoreError, Result};
pub use storage::ObjectStoreConfig;
pub use store::{BlobStore, RecoveryStats};
