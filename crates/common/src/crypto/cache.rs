use std::collections::HashMap;
use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use parking_lot::RwLock;
use uuid::Uuid;

use super::Secret;

/// Default lifetime of a cached repository key, in seconds
pub const DEFAULT_PASSWORD_TTL_SECS: i64 = 60 * 60;

#[derive(Debug, Clone)]
struct CachedKey {
    key: Secret,
    expires_at: DateTime<Utc>,
}

/// Repository keys unlocked by a user's password, held for a limited time.
///
/// Entries are keyed by (repository, user); one user setting a password
///  does not unlock the repository for anyone else.
#[derive(Debug, Clone)]
pub struct KeyCache {
    inner: Arc<RwLock<HashMap<(Uuid, String), CachedKey>>>,
    ttl: Duration,
}

impl Default for KeyCache {
    fn default() -> Self {
        Self::new(Duration::seconds(DEFAULT_PASSWORD_TTL_SECS))
    }
}

impl KeyCache {
    pub fn new(ttl: Duration) -> Self {
        Self {
            inner: Arc::new(RwLock::new(HashMap::new())),
            ttl,
        }
    }

    pub fn insert(&self, repo: Uuid, user: &str, key: Secret, now: DateTime<Utc>) {
        let entry = CachedKey {
            key,
            expires_at: now
                .checked_add_signed(self.ttl)
                .unwrap_or(DateTime::<Utc>::MAX_UTC),
        };
        self.inner.write().insert((repo, user.to_string()), entry);
    }

    /// The cached key, unless it has expired
    pub fn get(&self, repo: Uuid, user: &str, now: DateTime<Utc>) -> Option<Secret> {
        self.inner
            .read()
            .get(&(repo, user.to_string()))
            .filter(|cached| cached.expires_at > now)
            .map(|cached| cached.key.clone())
    }

    pub fn is_set(&self, repo: Uuid, user: &str, now: DateTime<Utc>) -> bool {
        self.get(repo, user, now).is_some()
    }

    pub fn forget(&self, repo: Uuid, user: &str) {
        self.inner.write().remove(&(repo, user.to_string()));
    }

    /// Drop expired keys, returning how many were removed
    pub fn purge_expired(&self, now: DateTime<Utc>) -> usize {
        let mut inner = self.inner.write();
        let before = inner.len();
        inner.retain(|_, cached| cached.expires_at > now);
        before - inner.len()
    }
}
