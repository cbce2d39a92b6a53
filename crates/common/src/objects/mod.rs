//! Immutable objects kept in the content-addressed store.
//!
//! ```text
//! Commit --root--> Tree --entry--> Tree ...
//!   |                |
//! parent           entry
//!   v                v
//! Commit         FileObject --blocks--> [Block, Block, ...]
//! ```

mod commit;
mod file;
mod tree;

pub use commit::Commit;
pub use file::{FileObject, DEFAULT_BLOCK_SIZE};
pub use tree::{validate_name, EntryKind, Tree, TreeEntry, TreeError, DIR_MODE, FILE_MODE};
