//! Access control
//!
//! A user's permission on a repository is the highest of:
//!
//! 1. ownership, which is always `ReadWrite`
//! 2. a grant made directly to the user
//! 3. a grant to any group the user belongs to
//! 4. (path-scoped checks only) a private share of the requested path or
//!    one of its ancestors
//!
//! Anything below `ReadOnly` is a denial. Denial is the only answer a
//!  caller without access gets; it is never turned into "not found".

mod catalog;
mod permission;

use std::sync::Arc;

use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::backend::BackendError;
use crate::path::RepoPath;
use crate::repo::{GroupId, Repository};

pub use catalog::{Catalog, MemoryCatalog};
pub use permission::{ParsePermissionError, PathShare, Permission, ShareKind};

#[derive(Debug, thiserror::Error)]
pub enum AccessError {
    #[error("repository not found: {0}")]
    RepoNotFound(Uuid),
    #[error("catalog error: {0}")]
    Backend(#[from] BackendError),
}

#[derive(Debug, Clone)]
pub struct AccessControl {
    catalog: Arc<dyn Catalog>,
}

impl AccessControl {
    pub fn new(catalog: Arc<dyn Catalog>) -> Self {
        Self { catalog }
    }

    pub fn catalog(&self) -> &Arc<dyn Catalog> {
        &self.catalog
    }

    pub async fn repo(&self, repo: Uuid) -> Result<Repository, AccessError> {
        self.catalog
            .get_repo(repo)
            .await?
            .ok_or(AccessError::RepoNotFound(repo))
    }

    /// Repository-wide permission of `user`
    pub async fn check_permission(&self, repo: Uuid, user: &str) -> Result<Permission, AccessError> {
        let record = self.repo(repo).await?;
        if record.is_owner(user) {
            return Ok(Permission::ReadWrite);
        }

        let mut best = self
            .catalog
            .user_grant(repo, user)
            .await?
            .unwrap_or_default();
        if best == Permission::ReadWrite {
            return Ok(best);
        }

        let groups = self.catalog.user_groups(user).await?;
        for (group, permission) in self.catalog.group_grants(repo).await? {
            if groups.contains(&group) {
                best = best.max(permission);
            }
        }
        Ok(best)
    }

    /// Permission of `user` at `path`, including private path shares
    pub async fn check_path_permission(
        &self,
        repo: Uuid,
        user: &str,
        path: &RepoPath,
        now: DateTime<Utc>,
    ) -> Result<Permission, AccessError> {
        let mut best = self.check_permission(repo, user).await?;
        if best == Permission::ReadWrite {
            return Ok(best);
        }
        for share in self.catalog.path_shares(repo).await? {
            if share.covers(user, path, now) {
                best = best.max(share.permission);
            }
        }
        tracing::debug!(repo = %repo, user, path = %path, permission = %best, "resolved path permission");
        Ok(best)
    }

    /// Groups the repository is shared with that `user` is a member of
    pub async fn shared_groups(&self, repo: Uuid, user: &str) -> Result<Vec<GroupId>, AccessError> {
        let groups = self.catalog.user_groups(user).await?;
        let mut shared: Vec<GroupId> = self
            .catalog
            .group_grants(repo)
            .await?
            .into_iter()
            .map(|(group, _)| group)
            .filter(|group| groups.contains(group))
            .collect();
        shared.sort_unstable();
        Ok(shared)
    }

    /// Download link `owner` created for `path`. The root is never shared.
    pub async fn get_dir_share(
        &self,
        repo: Uuid,
        owner: &str,
        path: &RepoPath,
    ) -> Result<Option<PathShare>, AccessError> {
        self.find_link(repo, owner, path, |kind| matches!(kind, ShareKind::Download))
            .await
    }

    /// Upload link `owner` created for `path`. The root is never shared.
    pub async fn get_upload_link(
        &self,
        repo: Uuid,
        owner: &str,
        path: &RepoPath,
    ) -> Result<Option<PathShare>, AccessError> {
        self.find_link(repo, owner, path, |kind| matches!(kind, ShareKind::Upload))
            .await
    }

    async fn find_link(
        &self,
        repo: Uuid,
        owner: &str,
        path: &RepoPath,
        kind: impl Fn(&ShareKind) -> bool,
    ) -> Result<Option<PathShare>, AccessError> {
        if path.is_root() {
            return Ok(None);
        }
        Ok(self
            .catalog
            .path_shares(repo)
            .await?
            .into_iter()
            .find(|share| share.owner == owner && share.path == *path && kind(&share.kind)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn setup() -> (AccessControl, MemoryCatalog, Uuid) {
        let catalog = MemoryCatalog::new();
        let repo = Repository::new("team", "alice");
        let id = repo.id;
        catalog.insert_repo(repo).await.unwrap();
        (AccessControl::new(Arc::new(catalog.clone())), catalog, id)
    }

    #[tokio::test]
    async fn test_owner_always_read_write() {
        let (acl, catalog, repo) = setup().await;
        // an explicit lower grant does not demote the owner
        catalog.grant_user(repo, "alice", Permission::ReadOnly);
        assert_eq!(
            acl.check_permission(repo, "alice").await.unwrap(),
            Permission::ReadWrite
        );
    }

    #[tokio::test]
    async fn test_highest_grant_wins() {
        let (acl, catalog, repo) = setup().await;
        assert_eq!(acl.check_permission(repo, "bob").await.unwrap(), Permission::None);

        catalog.grant_user(repo, "bob", Permission::ReadOnly);
        catalog.add_member(7, "bob");
        catalog.grant_group(repo, 7, Permission::ReadWrite);
        assert_eq!(
            acl.check_permission(repo, "bob").await.unwrap(),
            Permission::ReadWrite
        );

        catalog.add_member(8, "carol");
        catalog.grant_group(repo, 8, Permission::ReadOnly);
        assert_eq!(
            acl.check_permission(repo, "carol").await.unwrap(),
            Permission::ReadOnly
        );
        assert_eq!(acl.shared_groups(repo, "carol").await.unwrap(), vec![8]);
    }

    #[tokio::test]
    async fn test_unknown_repo() {
        let (acl, _, _) = setup().await;
        assert!(matches!(
            acl.check_permission(Uuid::new_v4(), "alice").await,
            Err(AccessError::RepoNotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_private_share_covers_subtree() {
        let (acl, catalog, repo) = setup().await;
        let now = Utc::now();
        catalog.share(
            repo,
            "alice",
            RepoPath::parse("/shared/").unwrap(),
            Permission::ReadWrite,
            ShareKind::Private { to: "dave".into() },
            "tok",
        );

        let inside = RepoPath::parse("/shared/deep/").unwrap();
        let outside = RepoPath::parse("/private/").unwrap();
        assert_eq!(
            acl.check_path_permission(repo, "dave", &inside, now).await.unwrap(),
            Permission::ReadWrite
        );
        assert_eq!(
            acl.check_path_permission(repo, "dave", &outside, now).await.unwrap(),
            Permission::None
        );
        // path shares never widen the repository-wide answer
        assert_eq!(acl.check_permission(repo, "dave").await.unwrap(), Permission::None);
    }

    #[tokio::test]
    async fn test_root_is_never_shared() {
        let (acl, catalog, repo) = setup().await;
        catalog.share(
            repo,
            "alice",
            RepoPath::root(),
            Permission::ReadOnly,
            ShareKind::Download,
            "root-link",
        );
        catalog.share(
            repo,
            "alice",
            RepoPath::parse("/pub/").unwrap(),
            Permission::ReadOnly,
            ShareKind::Download,
            "pub-link",
        );

        assert!(acl
            .get_dir_share(repo, "alice", &RepoPath::root())
            .await
            .unwrap()
            .is_none());
        let share = acl
            .get_dir_share(repo, "alice", &RepoPath::parse("/pub").unwrap())
            .await
            .unwrap()
            .unwrap();
        assert_eq!(share.token, "pub-link");
        assert!(acl
            .get_upload_link(repo, "alice", &RepoPath::parse("/pub").unwrap())
            .await
            .unwrap()
            .is_none());

        assert!(catalog.revoke_share("pub-link"));
        assert!(acl
            .get_dir_share(repo, "alice", &RepoPath::parse("/pub").unwrap())
            .await
            .unwrap()
            .is_none());
    }
}
