/**
 * Access control: permission levels, the catalog
 *  of repositories, grants, groups and path shares,
 *  and permission resolution over them.
 */
pub mod acl;
/**
 * Errors reported by storage providers.
 */
pub mod backend;
/**
 * Repository encryption.
 *  - Key derivation for v1 and v2 repositories
 *  - Wrapped repository keys and the key cache
 *  - Access mode resolution
 */
pub mod crypto;
/**
 * Commit history and the head pointer of each
 *  repository, advanced only by compare-and-swap.
 */
pub mod graph;
/**
 * Content addressing and DAG-CBOR block encoding.
 */
pub mod linked_data;
/**
 * Immutable objects: files, trees and commits.
 */
pub mod objects;
/**
 * Canonical repository paths.
 */
pub mod path;
/**
 * Repository records.
 */
pub mod repo;
/**
 * Directory listings and tree edits as of a commit.
 */
pub mod resolver;
/**
 * Content-addressed storage. Pluggable raw block
 *  backends behind a typed object store.
 */
pub mod store;
/**
 * Short-lived, single-purpose transfer tokens.
 */
pub mod token;

pub mod prelude {
    pub use crate::acl::{AccessControl, AccessError, Catalog, MemoryCatalog, Permission};
    pub use crate::backend::BackendError;
    pub use crate::crypto::{AccessMode, CryptoError, EncVersion, KeyCache, RepoEncryption};
    pub use crate::graph::{CommitError, CommitGraph, HeadProvider, MemoryHeadProvider};
    pub use crate::linked_data::{BlockId, CommitId, FileId, ObjectId, TreeId};
    pub use crate::objects::{Commit, FileObject, Tree, TreeEntry};
    pub use crate::path::{PathError, RepoPath};
    pub use crate::repo::{GroupId, Repository, UserId};
    pub use crate::resolver::{DirEntry, DirListing, DirectoryResolver, ResolveError};
    pub use crate::store::{BlockStore, MemoryBlockStore, ObjectError, ObjectStore};
    pub use crate::token::{Operation, TokenError, TokenIssuer, TokenRecord, TokenStore};
}
