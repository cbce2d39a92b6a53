//! Repository encryption
//!
//! A repository is either plaintext or encrypted under one of two schemes:
//!
//! - **v1**: legacy key derivation. The user's password must be verified
//!   server-side (and the key cached) before any content access.
//! - **v2**: Argon2id key derivation. With `server_crypto` enabled it
//!   behaves like v1. Without it the server never sees the key and every
//!   transfer goes through the block-level token namespace.
//!
//! The repository key itself is random; what is derived from the password
//!  is the key that wraps it (see [`RepoEncryption`]).

mod cache;
mod encryption;
mod secret;

pub use cache::{KeyCache, DEFAULT_PASSWORD_TTL_SECS};
pub use encryption::{derive_key, EncVersion, RepoEncryption, SALT_SIZE, V1_ROUNDS};
pub use secret::{Secret, SecretError, BLAKE3_HASH_SIZE, NONCE_SIZE, SECRET_SIZE};

use serde::{Deserialize, Serialize};

#[derive(Debug, thiserror::Error)]
pub enum CryptoError {
    #[error("incorrect repository password")]
    BadPassword,
    /// The user never chose whether keys may be cached server-side
    #[error("server crypto option not set")]
    CryptoOptionNotSet,
    #[error("repository is not encrypted")]
    NotEncrypted,
    #[error("server-side decryption is disabled for this repository")]
    ServerCryptoDisabled,
    #[error("unknown encryption version {0}")]
    UnknownVersion(u8),
    #[error("key derivation failed: {0}")]
    Kdf(String),
    #[error("secret error: {0}")]
    Secret(#[from] SecretError),
}

/// How a user may reach a repository's content
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AccessMode {
    /// Content can be served directly: plaintext, or the key is cached
    PlaintextAccess,
    /// A password has to be set before the flow can continue
    NeedsPassword,
    /// The client holds the key; only block-level transfer is possible
    BlockLevelOnly,
}

/// Decide the access mode of an encrypted or plaintext repository.
///
/// `server_crypto` is the user's option, `None` if never set. An encrypted
///  repository with no option is an error; callers that tolerate a missing
///  option pass `Some(false)` instead.
pub fn resolve_access_mode(
    encryption: Option<EncVersion>,
    server_crypto: Option<bool>,
    password_set: bool,
) -> Result<AccessMode, CryptoError> {
    let version = match encryption {
        None => return Ok(AccessMode::PlaintextAccess),
        Some(version) => version,
    };
    let server_crypto = server_crypto.ok_or(CryptoError::CryptoOptionNotSet)?;

    let needs_server_key = match version {
        EncVersion::V1 => true,
        EncVersion::V2 => server_crypto,
    };
    if !needs_server_key {
        return Ok(AccessMode::BlockLevelOnly);
    }
    if password_set {
        Ok(AccessMode::PlaintextAccess)
    } else {
        Ok(AccessMode::NeedsPassword)
    }
}
