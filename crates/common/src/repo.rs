use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::crypto::{EncVersion, RepoEncryption};

/// Users are identified by their login name
pub type UserId = String;
pub type GroupId = u64;

/// Catalog record of a repository.
///
/// The head commit is not part of the record; it lives with the head
///  provider and moves independently.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Repository {
    pub id: Uuid,
    pub name: String,
    pub owner: UserId,
    /// Present only for encrypted repositories
    pub encryption: Option<RepoEncryption>,
    /// Byte quota, `None` for unlimited
    pub quota: Option<u64>,
    pub created_at: DateTime<Utc>,
}

impl Repository {
    pub fn new(name: impl Into<String>, owner: impl Into<UserId>) -> Self {
        Self {
            id: Uuid::new_v4(),
            name: name.into(),
            owner: owner.into(),
            encryption: None,
            quota: None,
            created_at: Utc::now(),
        }
    }

    pub fn with_encryption(mut self, encryption: RepoEncryption) -> Self {
        self.encryption = Some(encryption);
        self
    }

    pub fn with_quota(mut self, quota: u64) -> Self {
        self.quota = Some(quota);
        self
    }

    pub fn is_encrypted(&self) -> bool {
        self.encryption.is_some()
    }

    pub fn enc_version(&self) -> Option<EncVersion> {
        self.encryption.as_ref().map(|e| e.version)
    }

    pub fn is_owner(&self, user: &str) -> bool {
        self.owner == user
    }

    /// Usage beyond the quota; usage exactly at the quota is still allowed
    pub fn is_over_quota(&self, usage: u64) -> bool {
        self.quota.is_some_and(|quota| usage > quota)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_quota() {
        let repo = Repository::new("photos", "alice");
        assert!(!repo.is_over_quota(u64::MAX));

        let repo = repo.with_quota(100);
        assert!(!repo.is_over_quota(100));
        assert!(repo.is_over_quota(101));
    }

    #[test]
    fn test_plaintext_has_no_version() {
        let repo = Repository::new("docs", "alice");
        assert!(!repo.is_encrypted());
        assert_eq!(repo.enc_version(), None);
        assert!(repo.is_owner("alice"));
    }
}
