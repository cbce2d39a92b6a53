//! Content-addressed object storage.
//!
//! [`BlockStore`] is the raw byte layer: swap in the in-memory store for
//!  tests, or the SQLite + object storage backend from `blobs_store` for a
//!  real deployment. [`ObjectStore`] sits on top and speaks in blocks,
//!  files, trees and commits.

mod block_store;
mod object_store;

pub use block_store::{BlockStore, MemoryBlockStore};
pub use object_store::{ObjectError, ObjectStore};
