use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::path::RepoPath;
use crate::repo::UserId;

/// Access level of a user on a repository, ordered `None < ReadOnly < ReadWrite`
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
pub enum Permission {
    #[default]
    #[serde(rename = "")]
    None,
    #[serde(rename = "r")]
    ReadOnly,
    #[serde(rename = "rw")]
    ReadWrite,
}

impl Permission {
    pub fn as_str(&self) -> &'static str {
        match self {
            Permission::None => "",
            Permission::ReadOnly => "r",
            Permission::ReadWrite => "rw",
        }
    }

    pub fn can_read(&self) -> bool {
        *self >= Permission::ReadOnly
    }

    pub fn can_write(&self) -> bool {
        *self == Permission::ReadWrite
    }
}

impl fmt::Display for Permission {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, thiserror::Error)]
#[error("unknown permission {0:?}")]
pub struct ParsePermissionError(String);

impl FromStr for Permission {
    type Err = ParsePermissionError;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "" | "none" => Ok(Permission::None),
            "r" => Ok(Permission::ReadOnly),
            "rw" => Ok(Permission::ReadWrite),
            other => Err(ParsePermissionError(other.to_string())),
        }
    }
}

/// Kind of a path-scoped share
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "type")]
pub enum ShareKind {
    /// Public download link for a directory
    Download,
    /// Public upload link into a directory
    Upload,
    /// Directory shared with one user
    Private { to: UserId },
}

/// A share of a directory inside a repository.
///
/// Shares are issued and revoked elsewhere; access control only reads them.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PathShare {
    pub token: String,
    pub repo_id: Uuid,
    pub owner: UserId,
    pub path: RepoPath,
    pub permission: Permission,
    pub kind: ShareKind,
    pub expires_at: Option<DateTime<Utc>>,
}

impl PathShare {
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        self.expires_at.is_some_and(|at| at <= now)
    }

    /// True if this share grants `user` access at `path`. A share recorded
    ///  at the root covers nothing.
    pub fn covers(&self, user: &str, path: &RepoPath, now: DateTime<Utc>) -> bool {
        matches!(&self.kind, ShareKind::Private { to } if to == user)
            && !self.path.is_root()
            && !self.is_expired(now)
            && self.path.is_ancestor_of(path)
    }
}
