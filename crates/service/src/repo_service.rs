use std::future::Future;
use std::sync::Arc;

use chrono::Utc;
use tracing::{debug, info, warn};
use uuid::Uuid;

use common::acl::{AccessControl, Catalog, PathShare, Permission};
use common::crypto::{
    resolve_access_mode, AccessMode, CryptoError, EncVersion, KeyCache, RepoEncryption,
};
use common::graph::{CommitError, CommitGraph, HeadProvider};
use common::linked_data::{CommitId, TreeId};
use common::objects::{Commit, Tree, TreeEntry};
use common::path::RepoPath;
use common::repo::{GroupId, Repository};
use common::resolver::{
    insert_entry, remove_entry, DirEntry, DirListing, DirectoryResolver, ResolveError,
};
use common::store::ObjectStore;
use common::token::{Operation, TokenIssuer, TokenRecord, TokenStore};

use crate::config::Config;
use crate::error::RepoError;

/// Repository record together with where its history currently stands
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RepoMetadata {
    pub repo: Repository,
    pub head: CommitId,
    /// Total size as of `head`
    pub size: u64,
}

/// The repository store as its callers see it.
///
/// Every operation takes the repository, user and path it acts on
///  explicitly; nothing is read from ambient request state.
#[derive(Clone, Debug)]
pub struct RepoService {
    config: Arc<Config>,
    objects: ObjectStore,
    graph: CommitGraph,
    resolver: DirectoryResolver,
    access: AccessControl,
    tokens: TokenIssuer,
    keys: KeyCache,
}

impl RepoService {
    pub fn new(
        config: Config,
        objects: ObjectStore,
        heads: Arc<dyn HeadProvider>,
        catalog: Arc<dyn Catalog>,
        tokens: Arc<dyn TokenStore>,
    ) -> Self {
        let graph =
            CommitGraph::new(objects.clone(), heads).with_retry_limit(config.head_retry_limit);
        Self {
            resolver: DirectoryResolver::new(objects.clone()),
            access: AccessControl::new(catalog),
            tokens: TokenIssuer::new(tokens, config.token_ttl()),
            keys: KeyCache::new(config.password_ttl()),
            config: Arc::new(config),
            objects,
            graph,
        }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn graph(&self) -> &CommitGraph {
        &self.graph
    }

    pub fn access(&self) -> &AccessControl {
        &self.access
    }

    /// Register a repository and give it its root commit.
    ///
    /// With `encryption`, the password only seeds the wrapped key; it is
    ///  not cached, the owner sets it like anyone else.
    pub async fn create_repo(
        &self,
        name: &str,
        owner: &str,
        encryption: Option<(EncVersion, &str)>,
    ) -> Result<Repository, RepoError> {
        let mut repo = Repository::new(name, owner);
        if let Some((version, password)) = encryption {
            let (metadata, _) = RepoEncryption::new(&repo.id, version, password)?;
            repo = repo.with_encryption(metadata);
        }

        self.access.catalog().insert_repo(repo.clone()).await?;
        self.graph.init_repo(repo.id, owner).await?;
        info!(
            repo = %repo.id,
            owner,
            encrypted = repo.is_encrypted(),
            "created repository"
        );
        Ok(repo)
    }

    /// Replace the repository's byte quota, `None` for unlimited
    pub async fn set_quota(&self, repo: Uuid, quota: Option<u64>) -> Result<(), RepoError> {
        let mut record = self.access.repo(repo).await?;
        record.quota = quota;
        self.access.catalog().insert_repo(record).await?;
        Ok(())
    }

    pub async fn get_repo(&self, repo: Uuid) -> Result<RepoMetadata, RepoError> {
        let record = self.access.repo(repo).await?;
        let head = self.graph.head(repo).await?;
        let size = self.graph.get_commit(&head).await?.size;
        Ok(RepoMetadata {
            repo: record,
            head,
            size,
        })
    }

    pub async fn get_commit(&self, id: &CommitId) -> Result<Commit, RepoError> {
        Ok(self.graph.get_commit(id).await?)
    }

    pub async fn head(&self, repo: Uuid) -> Result<CommitId, RepoError> {
        Ok(self.graph.head(repo).await?)
    }

    /// Up to `limit` commits from the head back, newest first
    pub async fn history(
        &self,
        repo: Uuid,
        limit: usize,
    ) -> Result<Vec<(CommitId, Commit)>, RepoError> {
        let head = self.graph.head(repo).await?;
        Ok(self.graph.history(&head, limit).await?)
    }

    pub async fn list_dir(
        &self,
        repo: Uuid,
        commit: &CommitId,
        path: &RepoPath,
        offset: usize,
        limit: usize,
    ) -> Result<DirListing, RepoError> {
        Ok(self
            .resolver
            .list_dir(&repo, commit, path, offset, limit)
            .await?)
    }

    pub async fn stat(
        &self,
        repo: Uuid,
        commit: &CommitId,
        path: &RepoPath,
    ) -> Result<DirEntry, RepoError> {
        Ok(self.resolver.stat(&repo, commit, path).await?)
    }

    pub async fn check_permission(&self, repo: Uuid, user: &str) -> Result<Permission, RepoError> {
        Ok(self.access.check_permission(repo, user).await?)
    }

    /// Permission at `path`, counting private shares of it or its ancestors
    pub async fn check_path_permission(
        &self,
        repo: Uuid,
        user: &str,
        path: &RepoPath,
    ) -> Result<Permission, RepoError> {
        Ok(self
            .access
            .check_path_permission(repo, user, path, Utc::now())
            .await?)
    }

    pub async fn shared_groups(&self, repo: Uuid, user: &str) -> Result<Vec<GroupId>, RepoError> {
        Ok(self.access.shared_groups(repo, user).await?)
    }

    pub async fn get_dir_share(
        &self,
        repo: Uuid,
        owner: &str,
        path: &RepoPath,
    ) -> Result<Option<PathShare>, RepoError> {
        Ok(self.access.get_dir_share(repo, owner, path).await?)
    }

    pub async fn get_upload_link(
        &self,
        repo: Uuid,
        owner: &str,
        path: &RepoPath,
    ) -> Result<Option<PathShare>, RepoError> {
        Ok(self.access.get_upload_link(repo, owner, path).await?)
    }

    pub fn is_password_set(&self, repo: Uuid, user: &str) -> bool {
        self.keys.is_set(repo, user, Utc::now())
    }

    pub async fn resolve_access_mode(&self, repo: Uuid, user: &str) -> Result<AccessMode, RepoError> {
        let record = self.access.repo(repo).await?;
        self.access_mode(&record, user, false).await
    }

    /// Check `password` and cache the repository key for `user`
    pub async fn set_password(&self, repo: Uuid, user: &str, password: &str) -> Result<(), RepoError> {
        let record = self.access.repo(repo).await?;
        if !self.access.check_permission(repo, user).await?.can_read() {
            return Err(RepoError::PermissionDenied);
        }
        let encryption = record
            .encryption
            .as_ref()
            .ok_or(CryptoError::NotEncrypted)?;
        if self.access_mode(&record, user, false).await? == AccessMode::BlockLevelOnly {
            return Err(CryptoError::ServerCryptoDisabled.into());
        }

        let key = match encryption.unlock(&repo, password) {
            Ok(key) => key,
            Err(e) => {
                warn!(repo = %repo, user, "rejected repository password");
                return Err(e.into());
            }
        };
        self.keys.insert(repo, user, key, Utc::now());
        info!(repo = %repo, user, "repository password set");
        Ok(())
    }

    /// Mint a token for one transfer against `path`.
    ///
    /// Writes need `ReadWrite` and a repository within quota; downloads need
    ///  `ReadOnly`. When the server never sees the repository key, writes
    ///  are routed to their block-level counterparts.
    pub async fn issue_transfer_token(
        &self,
        repo: Uuid,
        user: &str,
        operation: Operation,
        path: &RepoPath,
    ) -> Result<TokenRecord, RepoError> {
        let record = self.access.repo(repo).await?;
        let now = Utc::now();

        let permission = self
            .access
            .check_path_permission(repo, user, path, now)
            .await?;
        let allowed = if operation.is_write() {
            permission.can_write()
        } else {
            permission.can_read()
        };
        if !allowed {
            debug!(repo = %repo, user, operation = %operation, permission = %permission, "transfer token denied");
            return Err(RepoError::PermissionDenied);
        }

        let operation = match self.access_mode(&record, user, false).await? {
            AccessMode::NeedsPassword => return Err(RepoError::NeedsPassword),
            AccessMode::BlockLevelOnly => operation.to_block_level(),
            AccessMode::PlaintextAccess => operation,
        };

        if operation.is_write() && record.is_over_quota(self.repo_size(repo).await?) {
            return Err(RepoError::QuotaExceeded(repo));
        }

        Ok(self.tokens.mint(repo, user, operation, path, now).await?)
    }

    /// Consume a token on behalf of the file server
    pub async fn redeem_token(&self, token: &str) -> Result<TokenRecord, RepoError> {
        Ok(self.tokens.redeem(token, Utc::now()).await?)
    }

    /// Drop expired tokens and cached keys, returning how many tokens went
    pub async fn purge_expired(&self) -> Result<usize, RepoError> {
        let now = Utc::now();
        self.keys.purge_expired(now);
        Ok(self.tokens.purge_expired(now).await?)
    }

    /// Size of the repository as of its head
    pub async fn repo_size(&self, repo: Uuid) -> Result<u64, RepoError> {
        let head = self.graph.head(repo).await?;
        Ok(self.graph.get_commit(&head).await?.size)
    }

    pub async fn is_over_quota(&self, repo: Uuid) -> Result<bool, RepoError> {
        let record = self.access.repo(repo).await?;
        Ok(record.is_over_quota(self.repo_size(repo).await?))
    }

    /// Store `data` at the file path `path` and commit it
    pub async fn put_file(
        &self,
        repo: Uuid,
        user: &str,
        path: &RepoPath,
        data: &[u8],
    ) -> Result<CommitId, RepoError> {
        let name = path
            .name()
            .ok_or_else(|| RepoError::InvalidPath("cannot write a file at /".into()))?
            .to_string();
        let record = self.ensure_writable(repo, user, path).await?;

        // an overwrite only grows usage by the size difference
        let head = self.graph.head(repo).await?;
        let replaced = match self.resolver.stat(&repo, &head, path).await {
            Ok(existing) if existing.is_dir() => {
                return Err(RepoError::Unsupported(format!(
                    "{} is a directory",
                    path.as_dir_string()
                )))
            }
            Ok(existing) => existing.size,
            Err(ResolveError::PathNotFound(_)) => 0,
            Err(e) => return Err(e.into()),
        };
        let incoming = data.len() as u64;
        self.ensure_room(&record, incoming.saturating_sub(replaced))
            .await?;

        let file = self.objects.put_file(data, self.config.block_size).await?;
        let entry = TreeEntry::file(file, data.len() as u64, Utc::now().timestamp());
        let description = format!("Added \"{}\"", name);
        self.edit(repo, user, &description, |objects, root| {
            let path = path.clone();
            let entry = entry.clone();
            async move { Ok::<_, CommitError>(insert_entry(&objects, &root, &path, entry).await?) }
        })
        .await
    }

    /// Create an empty directory at `path` and commit it
    pub async fn make_dir(&self, repo: Uuid, user: &str, path: &RepoPath) -> Result<CommitId, RepoError> {
        let name = path
            .name()
            .ok_or_else(|| RepoError::InvalidPath("the root directory always exists".into()))?
            .to_string();
        self.ensure_writable(repo, user, path).await?;
        let head = self.graph.head(repo).await?;
        match self.resolver.stat(&repo, &head, path).await {
            Ok(_) => {
                return Err(RepoError::Unsupported(format!(
                    "{} already exists",
                    path.as_dir_string()
                )))
            }
            Err(ResolveError::PathNotFound(_)) => {}
            Err(e) => return Err(e.into()),
        }

        let empty = self.objects.put_tree(&Tree::new()).await?;
        let entry = TreeEntry::dir(empty, 0, Utc::now().timestamp());
        let description = format!("Added directory \"{}\"", name);
        self.edit(repo, user, &description, |objects, root| {
            let path = path.clone();
            let entry = entry.clone();
            async move { Ok::<_, CommitError>(insert_entry(&objects, &root, &path, entry).await?) }
        })
        .await
    }

    /// Remove the file or directory at `path` and commit
    pub async fn remove(&self, repo: Uuid, user: &str, path: &RepoPath) -> Result<CommitId, RepoError> {
        let name = path
            .name()
            .ok_or_else(|| RepoError::InvalidPath("cannot remove /".into()))?
            .to_string();
        self.ensure_writable(repo, user, path).await?;

        let description = format!("Deleted \"{}\"", name);
        self.edit(repo, user, &description, |objects, root| {
            let path = path.clone();
            async move {
                let mtime = Utc::now().timestamp();
                Ok::<_, CommitError>(remove_entry(&objects, &root, &path, mtime).await?)
            }
        })
        .await
    }

    /// Content of the file at `path` as of `commit`
    pub async fn read_file(
        &self,
        repo: Uuid,
        user: &str,
        commit: &CommitId,
        path: &RepoPath,
    ) -> Result<Vec<u8>, RepoError> {
        let record = self.access.repo(repo).await?;
        if !self
            .access
            .check_path_permission(repo, user, path, Utc::now())
            .await?
            .can_read()
        {
            return Err(RepoError::PermissionDenied);
        }
        if self.access_mode(&record, user, false).await? == AccessMode::NeedsPassword {
            return Err(RepoError::NeedsPassword);
        }

        let entry = self.resolver.stat(&repo, commit, path).await?;
        if entry.is_dir() {
            return Err(RepoError::PathNotFound(path.as_file_string()));
        }
        Ok(self.objects.read_file(&entry.id).await?)
    }

    /// Access mode of `user`, optionally treating an unset crypto option
    ///  as `false`
    pub(crate) async fn access_mode(
        &self,
        record: &Repository,
        user: &str,
        unset_is_false: bool,
    ) -> Result<AccessMode, RepoError> {
        let server_crypto = if record.is_encrypted() {
            let option = self.access.catalog().server_crypto(user).await?;
            if unset_is_false {
                Some(option.unwrap_or(false))
            } else {
                option
            }
        } else {
            None
        };
        let password_set = self.keys.is_set(record.id, user, Utc::now());
        Ok(resolve_access_mode(
            record.enc_version(),
            server_crypto,
            password_set,
        )?)
    }

    /// Gate a server-side write at `path` on permission and access mode
    async fn ensure_writable(
        &self,
        repo: Uuid,
        user: &str,
        path: &RepoPath,
    ) -> Result<Repository, RepoError> {
        let record = self.access.repo(repo).await?;
        if !self
            .access
            .check_path_permission(repo, user, path, Utc::now())
            .await?
            .can_write()
        {
            return Err(RepoError::PermissionDenied);
        }
        match self.access_mode(&record, user, false).await? {
            AccessMode::PlaintextAccess => {}
            AccessMode::NeedsPassword => return Err(RepoError::NeedsPassword),
            AccessMode::BlockLevelOnly => {
                return Err(RepoError::Unsupported(
                    "content of this repository is written by its clients only".into(),
                ))
            }
        }
        Ok(record)
    }

    /// Refuse a write that would grow usage by `growth` bytes past the quota
    async fn ensure_room(&self, record: &Repository, growth: u64) -> Result<(), RepoError> {
        let usage = self.repo_size(record.id).await?;
        if record.is_over_quota(usage.saturating_add(growth)) {
            return Err(RepoError::QuotaExceeded(record.id));
        }
        Ok(())
    }

    async fn edit<F, Fut>(
        &self,
        repo: Uuid,
        user: &str,
        description: &str,
        mut edit: F,
    ) -> Result<CommitId, RepoError>
    where
        F: FnMut(ObjectStore, TreeId) -> Fut,
        Fut: Future<Output = Result<TreeId, CommitError>>,
    {
        let objects = self.objects.clone();
        Ok(self
            .graph
            .commit_change(repo, user, description, |root| edit(objects.clone(), root))
            .await?)
    }
}
