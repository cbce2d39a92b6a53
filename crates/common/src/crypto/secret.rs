//! Symmetric keys for repository content
//!
//! Every encrypted repository has one random [`Secret`]. It never leaves the
//!  server in the clear: at rest it is wrapped under a key derived from the
//!  repository password, and it is only held unwrapped in the key cache
//!  while a user's password is set.

use std::ops::Deref;

use chacha20poly1305::Key;
use chacha20poly1305::{
    aead::{Aead, KeyInit},
    ChaCha20Poly1305, Nonce,
};
use serde::{Deserialize, Serialize};

/// Size of ChaCha20-Poly1305 nonce in bytes
pub const NONCE_SIZE: usize = 12;
/// Size of ChaCha20-Poly1305 key in bytes (256 bits)
pub const SECRET_SIZE: usize = 32;
/// Size of BLAKE3 hash in bytes (256 bits)
pub const BLAKE3_HASH_SIZE: usize = 32;

#[derive(Debug, thiserror::Error)]
pub enum SecretError {
    #[error("secret error: {0}")]
    Default(#[from] anyhow::Error),
    #[error("invalid secret size, expected {SECRET_SIZE}, got {0}")]
    Size(usize),
    /// Wrong key or tampered ciphertext
    #[error("authentication failed")]
    Auth,
}

/// A 256-bit ChaCha20-Poly1305 key.
///
/// Ciphertext layout: `nonce (12) || seal(blake3(plaintext) (32) || plaintext) || tag (16)`.
///  The embedded hash is re-checked on decrypt.
#[derive(PartialEq, Eq, Clone, Serialize, Deserialize)]
pub struct Secret([u8; SECRET_SIZE]);

impl std::fmt::Debug for Secret {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("Secret(..)")
    }
}

impl Deref for Secret {
    type Target = [u8; SECRET_SIZE];
    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl From<[u8; SECRET_SIZE]> for Secret {
    fn from(bytes: [u8; SECRET_SIZE]) -> Self {
        Secret(bytes)
    }
}

impl Secret {
    /// Fresh random key from the OS RNG
    pub fn generate() -> Result<Self, SecretError> {
        let mut buff = [0; SECRET_SIZE];
        getrandom::getrandom(&mut buff)
            .map_err(|e| anyhow::anyhow!("failed to generate random bytes: {}", e))?;
        Ok(Self(buff))
    }

    pub fn from_slice(data: &[u8]) -> Result<Self, SecretError> {
        let bytes: [u8; SECRET_SIZE] = data
            .try_into()
            .map_err(|_| SecretError::Size(data.len()))?;
        Ok(bytes.into())
    }

    pub fn bytes(&self) -> &[u8] {
        self.0.as_ref()
    }

    pub fn encrypt(&self, data: &[u8]) -> Result<Vec<u8>, SecretError> {
        let plaintext_hash = blake3::hash(data);
        let mut sealed = Vec::with_capacity(BLAKE3_HASH_SIZE + data.len());
        sealed.extend_from_slice(plaintext_hash.as_bytes());
        sealed.extend_from_slice(data);

        let mut nonce_bytes = [0u8; NONCE_SIZE];
        getrandom::getrandom(&mut nonce_bytes)
            .map_err(|e| anyhow::anyhow!("failed to generate nonce: {}", e))?;
        let nonce = Nonce::from_slice(&nonce_bytes);

        let ciphertext = self
            .cipher()
            .encrypt(nonce, sealed.as_ref())
            .map_err(|_| anyhow::anyhow!("encrypt error"))?;

        let mut out = Vec::with_capacity(NONCE_SIZE + ciphertext.len());
        out.extend_from_slice(nonce.as_ref());
        out.extend_from_slice(ciphertext.as_ref());
        Ok(out)
    }

    pub fn decrypt(&self, data: &[u8]) -> Result<Vec<u8>, SecretError> {
        if data.len() < NONCE_SIZE {
            return Err(SecretError::Auth);
        }
        let nonce = Nonce::from_slice(&data[..NONCE_SIZE]);
        let opened = self
            .cipher()
            .decrypt(nonce, &data[NONCE_SIZE..])
            .map_err(|_| SecretError::Auth)?;
        if opened.len() < BLAKE3_HASH_SIZE {
            return Err(SecretError::Auth);
        }

        let (stored_hash, plaintext) = opened.split_at(BLAKE3_HASH_SIZE);
        if stored_hash != blake3::hash(plaintext).as_bytes() {
            return Err(anyhow::anyhow!("hash verification failed - data corrupted").into());
        }
        Ok(plaintext.to_vec())
    }

    /// Seal another key under this one
    pub fn wrap(&self, key: &Secret) -> Result<Vec<u8>, SecretError> {
        self.encrypt(key.bytes())
    }

    pub fn unwrap_key(&self, wrapped: &[u8]) -> Result<Secret, SecretError> {
        Secret::from_slice(&self.decrypt(wrapped)?)
    }

    fn cipher(&self) -> ChaCha20Poly1305 {
        ChaCha20Poly1305::new(Key::from_slice(self.bytes()))
    }
}
