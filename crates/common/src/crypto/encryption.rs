use argon2::Argon2;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use uuid::Uuid;

use super::secret::{Secret, SecretError, SECRET_SIZE};
use super::CryptoError;

/// Rounds of SHA-256 applied by the legacy (v1) derivation
pub const V1_ROUNDS: u32 = 1 << 14;
/// Bytes of random salt stored per repository
pub const SALT_SIZE: usize = 16;

/// Encryption scheme of a repository
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(into = "u8", try_from = "u8")]
pub enum EncVersion {
    /// Password checked server-side before every session, legacy derivation
    V1,
    /// Argon2id derivation; the server may or may not cache the key
    V2,
}

impl From<EncVersion> for u8 {
    fn from(value: EncVersion) -> Self {
        match value {
            EncVersion::V1 => 1,
            EncVersion::V2 => 2,
        }
    }
}

impl TryFrom<u8> for EncVersion {
    type Error = CryptoError;
    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            1 => Ok(EncVersion::V1),
            2 => Ok(EncVersion::V2),
            other => Err(CryptoError::UnknownVersion(other)),
        }
    }
}

/// What the server keeps about an encrypted repository.
///
/// `magic` lets a password be checked without touching any content;
///  `wrapped_key` is the repository key sealed under the derived key.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RepoEncryption {
    pub version: EncVersion,
    #[serde(with = "hex_bytes")]
    pub salt: Vec<u8>,
    pub magic: String,
    #[serde(with = "hex_bytes")]
    pub wrapped_key: Vec<u8>,
}

impl RepoEncryption {
    /// Set up encryption for a new repository, returning the metadata to
    ///  persist and the unwrapped repository key
    pub fn new(
        repo_id: &Uuid,
        version: EncVersion,
        password: &str,
    ) -> Result<(Self, Secret), CryptoError> {
        let mut salt = vec![0u8; SALT_SIZE];
        getrandom::getrandom(&mut salt)
            .map_err(|e| SecretError::Default(anyhow::anyhow!("failed to generate salt: {}", e)))?;

        let kek = derive_key(version, repo_id, password, &salt)?;
        let repo_key = Secret::generate()?;
        let metadata = Self {
            version,
            magic: magic(&kek, repo_id),
            wrapped_key: kek.wrap(&repo_key)?,
            salt,
        };
        Ok((metadata, repo_key))
    }

    /// Check `password` and recover the repository key
    pub fn unlock(&self, repo_id: &Uuid, password: &str) -> Result<Secret, CryptoError> {
        let kek = derive_key(self.version, repo_id, password, &self.salt)?;
        if magic(&kek, repo_id) != self.magic {
            return Err(CryptoError::BadPassword);
        }
        kek.unwrap_key(&self.wrapped_key).map_err(|e| match e {
            SecretError::Auth => CryptoError::BadPassword,
            other => other.into(),
        })
    }
}

/// Derive the key-encryption key for a repository password
pub fn derive_key(
    version: EncVersion,
    repo_id: &Uuid,
    password: &str,
    salt: &[u8],
) -> Result<Secret, CryptoError> {
    let mut out = [0u8; SECRET_SIZE];
    match version {
        EncVersion::V1 => {
            let mut hasher = Sha256::new();
            hasher.update(repo_id.as_bytes());
            hasher.update(password.as_bytes());
            hasher.update(salt);
            let mut digest = hasher.finalize();
            for _ in 1..V1_ROUNDS {
                digest = Sha256::digest(digest);
            }
            out.copy_from_slice(&digest);
        }
        EncVersion::V2 => {
            // the repository id is folded into the salt so equal passwords
            //  on different repositories never share a key
            let mut salted = Vec::with_capacity(salt.len() + 16);
            salted.extend_from_slice(salt);
            salted.extend_from_slice(repo_id.as_bytes());
            Argon2::default()
                .hash_password_into(password.as_bytes(), &salted, &mut out)
                .map_err(|e| CryptoError::Kdf(e.to_string()))?;
        }
    }
    Ok(Secret::from(out))
}

fn magic(kek: &Secret, repo_id: &Uuid) -> String {
    let mut hasher = Sha256::new();
    hasher.update(kek.bytes());
    hasher.update(repo_id.as_bytes());
    hex::encode(hasher.finalize())
}

mod hex_bytes {
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(bytes: &[u8], serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&hex::encode(bytes))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Vec<u8>, D::Error> {
        let s = String::deserialize(deserializer)?;
        hex::decode(s).map_err(serde::de::Error::custom)
    }
}
