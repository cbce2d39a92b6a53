use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::RwLock;
use uuid::Uuid;

use crate::backend::BackendError;
use crate::path::RepoPath;
use crate::repo::{GroupId, Repository, UserId};

use super::permission::{PathShare, Permission, ShareKind};

/// Read access to repository records, grants, group membership, shares
///  and per-user options.
///
/// Records are owned by the surrounding system; the core only ever writes
///  new repositories and user options through this trait.
#[async_trait]
pub trait Catalog: Send + Sync + std::fmt::Debug + 'static {
    async fn get_repo(&self, repo: Uuid) -> Result<Option<Repository>, BackendError>;

    async fn insert_repo(&self, repo: Repository) -> Result<(), BackendError>;

    /// Permission granted directly to `user`
    async fn user_grant(&self, repo: Uuid, user: &str) -> Result<Option<Permission>, BackendError>;

    /// Groups the repository is shared with, and at which level
    async fn group_grants(&self, repo: Uuid) -> Result<Vec<(GroupId, Permission)>, BackendError>;

    async fn user_groups(&self, user: &str) -> Result<Vec<GroupId>, BackendError>;

    /// Every path share of the repository
    async fn path_shares(&self, repo: Uuid) -> Result<Vec<PathShare>, BackendError>;

    /// The user's `server_crypto` option, `None` if never set
    async fn server_crypto(&self, user: &str) -> Result<Option<bool>, BackendError>;

    async fn set_server_crypto(&self, user: &str, enabled: bool) -> Result<(), BackendError>;
}

#[derive(Debug, Default)]
struct MemoryCatalogInner {
    repos: HashMap<Uuid, Repository>,
    user_grants: HashMap<(Uuid, UserId), Permission>,
    group_grants: HashMap<Uuid, HashMap<GroupId, Permission>>,
    members: HashMap<UserId, HashSet<GroupId>>,
    shares: HashMap<Uuid, Vec<PathShare>>,
    server_crypto: HashMap<UserId, bool>,
}

/// In-memory catalog
#[derive(Debug, Clone, Default)]
pub struct MemoryCatalog {
    inner: Arc<RwLock<MemoryCatalogInner>>,
}

impl MemoryCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn grant_user(&self, repo: Uuid, user: &str, permission: Permission) {
        self.inner
            .write()
            .user_grants
            .insert((repo, user.to_string()), permission);
    }

    pub fn grant_group(&self, repo: Uuid, group: GroupId, permission: Permission) {
        self.inner
            .write()
            .group_grants
            .entry(repo)
            .or_default()
            .insert(group, permission);
    }

    pub fn add_member(&self, group: GroupId, user: &str) {
        self.inner
            .write()
            .members
            .entry(user.to_string())
            .or_default()
            .insert(group);
    }

    pub fn add_share(&self, share: PathShare) {
        self.inner
            .write()
            .shares
            .entry(share.repo_id)
            .or_default()
            .push(share);
    }

    /// Remove a share by token, returning whether it existed
    pub fn revoke_share(&self, token: &str) -> bool {
        let mut inner = self.inner.write();
        let mut found = false;
        for shares in inner.shares.values_mut() {
            let before = shares.len();
            shares.retain(|s| s.token != token);
            found |= shares.len() != before;
        }
        found
    }

    /// Convenience for building share records in embedders and tests
    pub fn share(
        &self,
        repo: Uuid,
        owner: &str,
        path: RepoPath,
        permission: Permission,
        kind: ShareKind,
        token: &str,
    ) -> PathShare {
        let share = PathShare {
            token: token.to_string(),
            repo_id: repo,
            owner: owner.to_string(),
            path,
            permission,
            kind,
            expires_at: None,
        };
        self.add_share(share.clone());
        share
    }
}

#[async_trait]
impl Catalog for MemoryCatalog {
    async fn get_repo(&self, repo: Uuid) -> Result<Option<Repository>, BackendError> {
        Ok(self.inner.read().repos.get(&repo).cloned())
    }

    async fn insert_repo(&self, repo: Repository) -> Result<(), BackendError> {
        self.inner.write().repos.insert(repo.id, repo);
        Ok(())
    }

    async fn user_grant(&self, repo: Uuid, user: &str) -> Result<Option<Permission>, BackendError> {
        Ok(self
            .inner
            .read()
            .user_grants
            .get(&(repo, user.to_string()))
            .copied())
    }

    async fn group_grants(&self, repo: Uuid) -> Result<Vec<(GroupId, Permission)>, BackendError> {
        Ok(self
            .inner
            .read()
            .group_grants
            .get(&repo)
            .map(|grants| grants.iter().map(|(g, p)| (*g, *p)).collect())
            .unwrap_or_default())
    }

    async fn user_groups(&self, user: &str) -> Result<Vec<GroupId>, BackendError> {
        let mut groups: Vec<GroupId> = self
            .inner
            .read()
            .members
            .get(user)
            .map(|groups| groups.iter().copied().collect())
            .unwrap_or_default();
        groups.sort_unstable();
        Ok(groups)
    }

    async fn path_shares(&self, repo: Uuid) -> Result<Vec<PathShare>, BackendError> {
        Ok(self
            .inner
            .read()
            .shares
            .get(&repo)
            .cloned()
            .unwrap_or_default())
    }

    async fn server_crypto(&self, user: &str) -> Result<Option<bool>, BackendError> {
        Ok(self.inner.read().server_crypto.get(user).copied())
    }

    async fn set_server_crypto(&self, user: &str, enabled: bool) -> Result<(), BackendError> {
        self.inner
            .write()
            .server_crypto
            .insert(user.to_string(), enabled);
        Ok(())
    }
}
