use uuid::Uuid;

use common::acl::AccessError;
use common::backend::BackendError;
use common::crypto::CryptoError;
use common::graph::CommitError;
use common::linked_data::CommitId;
use common::path::PathError;
use common::resolver::ResolveError;
use common::store::ObjectError;
use common::token::TokenError;

/// Every way a request against the store can fail.
///
/// Callers map these to their own responses; `NeedsPassword` in particular
///  is not a denial and must not be reported as one.
#[derive(Debug, thiserror::Error)]
pub enum RepoError {
    /// Repository, commit, tree or block absent
    #[error("not found: {0}")]
    NotFound(String),
    #[error("path not found: {0}")]
    PathNotFound(String),
    #[error("permission denied")]
    PermissionDenied,
    #[error("repository password required")]
    NeedsPassword,
    #[error("head of repository {0} moved, retry against the new head")]
    ConcurrentHeadMismatch(Uuid),
    #[error("parent commit not found: {0}")]
    ParentNotFound(CommitId),
    #[error("transfer token expired")]
    TokenExpired,
    #[error("transfer token already consumed")]
    TokenConsumed,
    #[error("transfer token not found")]
    TokenNotFound,
    #[error("repository {0} is over quota")]
    QuotaExceeded(Uuid),
    #[error("invalid path: {0}")]
    InvalidPath(String),
    #[error("incorrect repository password")]
    BadPassword,
    #[error("server crypto option not set")]
    CryptoOptionNotSet,
    /// The operation does not apply to this repository, e.g. setting a
    ///  password on a plaintext repository
    #[error("unsupported: {0}")]
    Unsupported(String),
    #[error("backend error: {0}")]
    Backend(#[from] BackendError),
}

impl From<PathError> for RepoError {
    fn from(e: PathError) -> Self {
        RepoError::InvalidPath(e.to_string())
    }
}

impl From<ObjectError> for RepoError {
    fn from(e: ObjectError) -> Self {
        match e {
            ObjectError::NotFound(id) => RepoError::NotFound(format!("object {}", id)),
            ObjectError::MissingChild { child, .. } => {
                RepoError::NotFound(format!("object {}", child))
            }
            ObjectError::Tree(e) => RepoError::InvalidPath(e.to_string()),
            ObjectError::Codec(e) => RepoError::Backend(anyhow::Error::new(e).into()),
            ObjectError::Backend(e) => RepoError::Backend(e),
        }
    }
}

impl From<ResolveError> for RepoError {
    fn from(e: ResolveError) -> Self {
        match e {
            ResolveError::CommitNotFound(id) => RepoError::NotFound(format!("commit {}", id)),
            // a file where a directory is expected is just a missing path
            ResolveError::PathNotFound(path) | ResolveError::NotADirectory(path) => {
                RepoError::PathNotFound(path)
            }
            ResolveError::KindMismatch(path) => {
                RepoError::Unsupported(format!("{} already exists as a different kind", path))
            }
            ResolveError::RootEntry => {
                RepoError::InvalidPath("the root directory cannot be edited as an entry".into())
            }
            ResolveError::Tree(e) => RepoError::InvalidPath(e.to_string()),
            ResolveError::Object(e) => e.into(),
        }
    }
}

impl From<CommitError> for RepoError {
    fn from(e: CommitError) -> Self {
        match e {
            CommitError::NotFound(id) => RepoError::NotFound(format!("object {}", id)),
            CommitError::ParentNotFound(id) => RepoError::ParentNotFound(id),
            CommitError::ForeignParent { parent, .. } => RepoError::ParentNotFound(parent),
            CommitError::RepoNotFound(repo) => RepoError::NotFound(format!("repository {}", repo)),
            CommitError::RepoExists(repo) => {
                RepoError::Unsupported(format!("repository {} already exists", repo))
            }
            CommitError::ConcurrentHeadMismatch { repo, .. } => {
                RepoError::ConcurrentHeadMismatch(repo)
            }
            CommitError::Resolve(e) => e.into(),
            CommitError::Object(e) => e.into(),
            CommitError::Backend(e) => RepoError::Backend(e),
        }
    }
}

impl From<AccessError> for RepoError {
    fn from(e: AccessError) -> Self {
        match e {
            AccessError::RepoNotFound(repo) => RepoError::NotFound(format!("repository {}", repo)),
            AccessError::Backend(e) => RepoError::Backend(e),
        }
    }
}

impl From<CryptoError> for RepoError {
    fn from(e: CryptoError) -> Self {
        match e {
            CryptoError::BadPassword => RepoError::BadPassword,
            CryptoError::CryptoOptionNotSet => RepoError::CryptoOptionNotSet,
            CryptoError::NotEncrypted | CryptoError::ServerCryptoDisabled => {
                RepoError::Unsupported(e.to_string())
            }
            other => RepoError::Backend(anyhow::Error::new(other).into()),
        }
    }
}

impl From<TokenError> for RepoError {
    fn from(e: TokenError) -> Self {
        match e {
            TokenError::NotFound => RepoError::TokenNotFound,
            TokenError::Consumed => RepoError::TokenConsumed,
            TokenError::Expired => RepoError::TokenExpired,
            TokenError::Backend(e) => RepoError::Backend(e),
        }
    }
}
