//! Short-lived transfer tokens
//!
//! A token binds one (repository, user, operation, path) grant to an opaque
//!  random string handed to the out-of-band file server. It is redeemed at
//!  most once and only before its ttl runs out. Expiry is checked when a
//!  token is redeemed; nothing sweeps in the background.

mod operation;
mod store;

use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use uuid::Uuid;

use crate::backend::BackendError;
use crate::path::RepoPath;

pub use operation::{Operation, ParseOperationError};
pub use store::{MemoryTokenStore, TokenRecord, TokenStore};

/// Default token lifetime, in seconds
pub const DEFAULT_TOKEN_TTL_SECS: i64 = 60 * 60;
/// Random bytes per token, before hex encoding
pub const TOKEN_SIZE: usize = 32;

#[derive(Debug, thiserror::Error)]
pub enum TokenError {
    #[error("token not found")]
    NotFound,
    #[error("token already consumed")]
    Consumed,
    #[error("token expired")]
    Expired,
    #[error("token store error: {0}")]
    Backend(#[from] BackendError),
}

#[derive(Debug, Clone)]
pub struct TokenIssuer {
    store: Arc<dyn TokenStore>,
    ttl: Duration,
}

impl TokenIssuer {
    pub fn new(store: Arc<dyn TokenStore>, ttl: Duration) -> Self {
        Self { store, ttl }
    }

    pub fn store(&self) -> &Arc<dyn TokenStore> {
        &self.store
    }

    /// Mint and record a new token.
    ///
    /// No permission checks happen here; callers gate issuance.
    pub async fn mint(
        &self,
        repo: Uuid,
        user: &str,
        operation: Operation,
        path: &RepoPath,
        now: DateTime<Utc>,
    ) -> Result<TokenRecord, TokenError> {
        let record = TokenRecord {
            token: generate_token()?,
            repo_id: repo,
            user: user.to_string(),
            operation,
            path: path.clone(),
            issued_at: now,
            ttl_secs: self.ttl.num_seconds(),
            consumed: false,
        };
        self.store.insert(record.clone()).await?;
        tracing::info!(repo = %repo, user, operation = %operation, path = %path, "issued transfer token");
        Ok(record)
    }

    pub async fn redeem(&self, token: &str, now: DateTime<Utc>) -> Result<TokenRecord, TokenError> {
        let result = self.store.redeem(token, now).await;
        if let Err(e) = &result {
            tracing::debug!(error = %e, "token redemption refused");
        }
        result
    }

    pub async fn purge_expired(&self, now: DateTime<Utc>) -> Result<usize, TokenError> {
        let purged = self.store.purge_expired(now).await?;
        if purged > 0 {
            tracing::info!(purged, "purged expired transfer tokens");
        }
        Ok(purged)
    }
}

fn generate_token() -> Result<String, BackendError> {
    let mut bytes = [0u8; TOKEN_SIZE];
    getrandom::getrandom(&mut bytes)
        .map_err(|e| anyhow::anyhow!("failed to generate token: {}", e))?;
    Ok(hex::encode(bytes))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_huge_ttl_never_overflows() {
        let now = Utc::now();
        let record = TokenRecord {
            token: "t".into(),
            repo_id: Uuid::new_v4(),
            user: "alice".into(),
            operation: Operation::Download,
            path: RepoPath::root(),
            issued_at: now,
            ttl_secs: i64::MAX,
            consumed: false,
        };
        assert_eq!(record.expires_at(), DateTime::<Utc>::MAX_UTC);
        assert!(!record.is_expired(now));
    }

    fn issuer() -> TokenIssuer {
        TokenIssuer::new(
            Arc::new(MemoryTokenStore::new()),
            Duration::seconds(DEFAULT_TOKEN_TTL_SECS),
        )
    }

    #[tokio::test]
    async fn test_mint_and_redeem_once() {
        let issuer = issuer();
        let now = Utc::now();
        let repo = Uuid::new_v4();
        let record = issuer
            .mint(repo, "alice", Operation::Upload, &RepoPath::root(), now)
            .await
            .unwrap();
        assert_eq!(record.token.len(), TOKEN_SIZE * 2);

        let grant = issuer.redeem(&record.token, now).await.unwrap();
        assert_eq!(grant.repo_id, repo);
        assert_eq!(grant.operation, Operation::Upload);
        assert!(matches!(
            issuer.redeem(&record.token, now).await,
            Err(TokenError::Consumed)
        ));
        assert!(matches!(
            issuer.redeem("bogus", now).await,
            Err(TokenError::NotFound)
        ));
    }

    #[tokio::test]
    async fn test_expired_token() {
        let issuer = issuer();
        let now = Utc::now();
        let record = issuer
            .mint(Uuid::new_v4(), "alice", Operation::Download, &RepoPath::root(), now)
            .await
            .unwrap();
        let later = now + Duration::seconds(DEFAULT_TOKEN_TTL_SECS);
        assert!(matches!(
            issuer.redeem(&record.token, later).await,
            Err(TokenError::Expired)
        ));
        assert_eq!(issuer.purge_expired(later).await.unwrap(), 1);
        assert!(matches!(
            issuer.redeem(&record.token, now).await,
            Err(TokenError::NotFound)
        ));
    }

    #[tokio::test]
    async fn test_concurrent_issue_yields_distinct_tokens() {
        let issuer = issuer();
        let repo = Uuid::new_v4();
        let mut handles = Vec::new();
        for _ in 0..32 {
            let issuer = issuer.clone();
            handles.push(tokio::spawn(async move {
                issuer
                    .mint(repo, "alice", Operation::Update, &RepoPath::root(), Utc::now())
                    .await
                    .unwrap()
                    .token
            }));
        }
        let mut tokens = std::collections::HashSet::new();
        for handle in handles {
            tokens.insert(handle.await.unwrap());
        }
        assert_eq!(tokens.len(), 32);
    }

    #[tokio::test]
    async fn test_concurrent_redeem_single_winner() {
        let issuer = issuer();
        let now = Utc::now();
        let record = issuer
            .mint(Uuid::new_v4(), "alice", Operation::Upload, &RepoPath::root(), now)
            .await
            .unwrap();
        let mut handles = Vec::new();
        for _ in 0..8 {
            let issuer = issuer.clone();
            let token = record.token.clone();
            handles.push(tokio::spawn(async move { issuer.redeem(&token, now).await.is_ok() }));
        }
        let mut wins = 0;
        for handle in handles {
            if handle.await.unwrap() {
                wins += 1;
            }
        }
        assert_eq!(wins, 1);
    }
}
