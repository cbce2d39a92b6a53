use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::backend::BackendError;
use crate::path::RepoPath;
use crate::repo::UserId;

use super::{Operation, TokenError};

/// A transfer token and the single grant it carries
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenRecord {
    pub token: String,
    pub repo_id: Uuid,
    pub user: UserId,
    pub operation: Operation,
    pub path: RepoPath,
    pub issued_at: DateTime<Utc>,
    pub ttl_secs: i64,
    pub consumed: bool,
}

impl TokenRecord {
    /// Saturates instead of overflowing for absurd ttls
    pub fn expires_at(&self) -> DateTime<Utc> {
        Duration::try_seconds(self.ttl_secs)
            .and_then(|ttl| self.issued_at.checked_add_signed(ttl))
            .unwrap_or(DateTime::<Utc>::MAX_UTC)
    }

    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        now >= self.expires_at()
    }
}

/// Storage for issued tokens.
///
/// `redeem` must be atomic: of any number of concurrent redemptions of
///  one token, at most one succeeds.
#[async_trait]
pub trait TokenStore: Send + Sync + std::fmt::Debug + 'static {
    async fn insert(&self, record: TokenRecord) -> Result<(), BackendError>;

    async fn get(&self, token: &str) -> Result<Option<TokenRecord>, BackendError>;

    /// Mark the token consumed and return its grant
    async fn redeem(&self, token: &str, now: DateTime<Utc>) -> Result<TokenRecord, TokenError>;

    /// Delete tokens that expired before `now`, returning how many
    async fn purge_expired(&self, now: DateTime<Utc>) -> Result<usize, BackendError>;
}

/// In-memory token store
#[derive(Debug, Clone, Default)]
pub struct MemoryTokenStore {
    inner: Arc<RwLock<HashMap<String, TokenRecord>>>,
}

impl MemoryTokenStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.inner.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.read().is_empty()
    }
}

#[async_trait]
impl TokenStore for MemoryTokenStore {
    async fn insert(&self, record: TokenRecord) -> Result<(), BackendError> {
        self.inner.write().insert(record.token.clone(), record);
        Ok(())
    }

    async fn get(&self, token: &str) -> Result<Option<TokenRecord>, BackendError> {
        Ok(self.inner.read().get(token).cloned())
    }

    async fn redeem(&self, token: &str, now: DateTime<Utc>) -> Result<TokenRecord, TokenError> {
        let mut inner = self.inner.write();
        let record = inner.get_mut(token).ok_or(TokenError::NotFound)?;
        if record.consumed {
            return Err(TokenError::Consumed);
        }
        if record.is_expired(now) {
            return Err(TokenError::Expired);
        }
        record.consumed = true;
        Ok(record.clone())
    }

    async fn purge_expired(&self, now: DateTime<Utc>) -> Result<usize, BackendError> {
        let mut inner = self.inner.write();
        let before = inner.len();
        inner.retain(|_, record| !record.is_expired(now));
        Ok(before - inner.len())
    }
}
