//! The repository page and its history variant.
//!
//! Steps to show a repository page:
//! 1. the user needs at least `ReadOnly` at the path, otherwise `Denied`
//! 2. an encrypted repository whose key the server needs but does not
//!    hold stops at `NeedsPassword`
//! 3. otherwise the page is assembled from the commit, the first listing
//!    page, shares and transfer links

use serde::Serialize;
use tracing::debug;
use uuid::Uuid;

use common::acl::{PathShare, Permission};
use common::crypto::AccessMode;
use common::linked_data::CommitId;
use common::objects::Commit;
use common::path::RepoPath;
use common::repo::{GroupId, Repository};
use common::resolver::DirListing;
use common::token::{Operation, TokenRecord};

use crate::error::RepoError;
use crate::repo_service::RepoService;
use crate::urls::{dir_share_link, transfer_url, upload_link, UrlFlavor};

/// What a request for a repository page comes back with
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RepoOutcome<P> {
    /// The user has no access to the repository
    Denied,
    /// The server needs the repository password first
    NeedsPassword,
    /// The user has to choose whether keys may be cached server-side
    NeedsCryptoOption,
    Page(P),
}

/// A minted token and the file server url it is redeemed at
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TransferLink {
    pub token: TokenRecord,
    pub url: String,
}

/// A path share and its public link
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ShareLink {
    pub share: PathShare,
    pub url: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RepoPage {
    pub repo: Repository,
    pub permission: Permission,
    pub is_owner: bool,
    pub path: RepoPath,
    pub commit_id: CommitId,
    pub commit: Commit,
    pub repo_size: u64,
    pub over_quota: bool,
    pub listing: DirListing,
    /// Offset of the next listing page, if there is one
    pub more_start: Option<usize>,
    pub shared_groups: Vec<GroupId>,
    /// Routed to `upload-blocks` when the client holds the key; `None`
    ///  without `ReadWrite` or over quota
    pub upload: Option<TransferLink>,
    pub update: Option<TransferLink>,
    pub dir_share: Option<ShareLink>,
    pub upload_link: Option<ShareLink>,
    pub server_crypto: bool,
    pub max_upload_file_size: Option<u64>,
    pub enable_sub_library: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct HistoryPage {
    pub repo: Repository,
    pub permission: Permission,
    pub path: RepoPath,
    pub commit_id: CommitId,
    pub commit: Commit,
    /// Every entry at `path`; history listings are not paginated
    pub listing: DirListing,
}

impl RepoService {
    /// Assemble the repository page at `path`, as of `commit` or the head
    pub async fn open_repo(
        &self,
        repo: Uuid,
        user: &str,
        path: &RepoPath,
        commit: Option<CommitId>,
    ) -> Result<RepoOutcome<RepoPage>, RepoError> {
        let record = self.access().repo(repo).await?;
        let permission = self.check_path_permission(repo, user, path).await?;
        if !permission.can_read() {
            debug!(repo = %repo, user, "repository page denied");
            return Ok(RepoOutcome::Denied);
        }

        let mut server_crypto = false;
        if record.is_encrypted() {
            match self.access().catalog().server_crypto(user).await? {
                Some(option) => server_crypto = option,
                None => return Ok(RepoOutcome::NeedsCryptoOption),
            }
            if self.access_mode(&record, user, false).await? == AccessMode::NeedsPassword {
                return Ok(RepoOutcome::NeedsPassword);
            }
        }

        let head = self.head(repo).await?;
        let commit_id = commit.unwrap_or(head);
        let commit = self.get_commit(&commit_id).await?;
        let page_size = self.config().dirent_page_size;
        let listing = self.list_dir(repo, &commit_id, path, 0, page_size).await?;
        let more_start = listing.has_more.then_some(page_size);

        let repo_size = self.repo_size(repo).await?;
        let over_quota = record.is_over_quota(repo_size);
        let shared_groups = self.shared_groups(repo, user).await?;

        let (upload, update) = if permission.can_write() {
            (
                self.page_link(repo, user, Operation::Upload, path).await?,
                self.page_link(repo, user, Operation::Update, path).await?,
            )
        } else {
            (None, None)
        };

        let site_root = &self.config().site_root;
        let dir_share = self
            .get_dir_share(repo, user, path)
            .await?
            .map(|share| ShareLink {
                url: dir_share_link(site_root, &share.token),
                share,
            });
        let upload_link = self
            .get_upload_link(repo, user, path)
            .await?
            .map(|share| ShareLink {
                url: upload_link(site_root, &share.token),
                share,
            });

        Ok(RepoOutcome::Page(RepoPage {
            is_owner: record.is_owner(user),
            repo: record,
            permission,
            path: path.clone(),
            commit_id,
            commit,
            repo_size,
            over_quota,
            listing,
            more_start,
            shared_groups,
            upload,
            update,
            dir_share,
            upload_link,
            server_crypto,
            max_upload_file_size: self.config().max_upload_file_size,
            enable_sub_library: self.config().enable_sub_library,
        }))
    }

    /// Browse `path` as of an older commit.
    ///
    /// An unset crypto option counts as disabled here, and a commit that
    ///  cannot be found falls back to the head.
    pub async fn open_history(
        &self,
        repo: Uuid,
        user: &str,
        path: &RepoPath,
        commit: Option<CommitId>,
    ) -> Result<RepoOutcome<HistoryPage>, RepoError> {
        let record = self.access().repo(repo).await?;
        let permission = self.check_path_permission(repo, user, path).await?;
        if !permission.can_read() {
            return Ok(RepoOutcome::Denied);
        }
        if self.access_mode(&record, user, true).await? == AccessMode::NeedsPassword {
            return Ok(RepoOutcome::NeedsPassword);
        }

        let requested = match commit {
            Some(id) => match self.get_commit(&id).await {
                Ok(found) if found.repo_id == repo => Some((id, found)),
                Ok(_) | Err(RepoError::NotFound(_)) => None,
                Err(e) => return Err(e),
            },
            None => None,
        };
        let (commit_id, commit) = match requested {
            Some(found) => found,
            None => {
                let head = self.head(repo).await?;
                debug!(repo = %repo, head = %head.short(), "history falls back to head");
                (head, self.get_commit(&head).await?)
            }
        };

        let listing = self
            .list_dir(repo, &commit_id, path, 0, usize::MAX)
            .await?;

        Ok(RepoOutcome::Page(HistoryPage {
            repo: record,
            permission,
            path: path.clone(),
            commit_id,
            commit,
            listing,
        }))
    }

    /// A page transfer link, or `None` when quota forbids the write
    async fn page_link(
        &self,
        repo: Uuid,
        user: &str,
        operation: Operation,
        path: &RepoPath,
    ) -> Result<Option<TransferLink>, RepoError> {
        match self.issue_transfer_token(repo, user, operation, path).await {
            Ok(token) => {
                let url = transfer_url(
                    &self.config().fileserver_root,
                    &token.token,
                    token.operation,
                    UrlFlavor::Ajax,
                );
                Ok(Some(TransferLink { token, url }))
            }
            Err(RepoError::QuotaExceeded(_)) => Ok(None),
            Err(e) => Err(e),
        }
    }
}

impl<P> RepoOutcome<P> {
    pub fn page(self) -> Option<P> {
        match self {
            RepoOutcome::Page(page) => Some(page),
            _ => None,
        }
    }
}
