use std::path::{Path, PathBuf};
use std::str::FromStr;

use blobs_store::ObjectStoreConfig;
use serde::{Deserialize, Serialize};
use url::Url;

pub const DEFAULT_BLOCK_SIZE: usize = 8 * 1024 * 1024;
pub const DEFAULT_DIRENT_PAGE_SIZE: usize = 100;
/// Longest accepted token or password lifetime, ten years
pub const MAX_TTL_SECS: i64 = 10 * 365 * 24 * 60 * 60;

/// Every recognized setting of a seabed deployment.
///
/// Loaded from `config.toml`; a missing key takes its default and an
///  unknown key is an error.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    /// size files are split into before storage, in bytes
    pub block_size: usize,
    /// entries in the first page of a directory listing
    pub dirent_page_size: usize,
    /// lifetime of transfer tokens
    pub token_ttl_secs: i64,
    /// how long a repository key stays cached after `set_password`
    pub password_ttl_secs: i64,
    /// retries of a commit whose head moved underneath it
    pub head_retry_limit: usize,
    /// largest single upload the file server accepts, unlimited if unset
    pub max_upload_file_size: Option<u64>,
    /// base url of the file server transfer tokens are redeemed at
    pub fileserver_root: Url,
    /// base url share links are built on
    pub site_root: Url,
    pub enable_sub_library: bool,

    // data store configuration
    /// a path to a sqlite database, if not set then an
    ///  in-memory database will be used
    pub sqlite_path: Option<PathBuf>,

    // misc
    pub log_level: String,

    /// where block bytes are kept
    pub blob_store: ObjectStoreConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            block_size: DEFAULT_BLOCK_SIZE,
            dirent_page_size: DEFAULT_DIRENT_PAGE_SIZE,
            token_ttl_secs: common::token::DEFAULT_TOKEN_TTL_SECS,
            password_ttl_secs: common::crypto::DEFAULT_PASSWORD_TTL_SECS,
            head_retry_limit: common::graph::DEFAULT_HEAD_RETRY_LIMIT,
            max_upload_file_size: None,
            fileserver_root: default_url("http://localhost:8082/"),
            site_root: default_url("http://localhost:8000/"),
            enable_sub_library: true,
            sqlite_path: None,
            log_level: "info".to_string(),
            blob_store: ObjectStoreConfig::Memory,
        }
    }
}

fn default_url(s: &str) -> Url {
    // literal urls above always parse
    Url::parse(s).unwrap_or_else(|_| unreachable!("invalid default url {}", s))
}

impl Config {
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path)?;
        let config: Config = toml::from_str(&contents)?;
        config.validate()?;
        Ok(config)
    }

    pub fn to_file(&self, path: &Path) -> Result<(), ConfigError> {
        let contents = toml::to_string_pretty(self)?;
        std::fs::write(path, contents)?;
        Ok(())
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.block_size == 0 {
            return Err(ConfigError::Invalid("block_size must be positive".into()));
        }
        if self.dirent_page_size == 0 {
            return Err(ConfigError::Invalid(
                "dirent_page_size must be positive".into(),
            ));
        }
        for (name, secs) in [
            ("token_ttl_secs", self.token_ttl_secs),
            ("password_ttl_secs", self.password_ttl_secs),
        ] {
            if !(1..=MAX_TTL_SECS).contains(&secs) {
                return Err(ConfigError::Invalid(format!(
                    "{} must be between 1 and {}, got {}",
                    name, MAX_TTL_SECS, secs
                )));
            }
        }
        for (name, url) in [
            ("fileserver_root", &self.fileserver_root),
            ("site_root", &self.site_root),
        ] {
            if !matches!(url.scheme(), "http" | "https") {
                return Err(ConfigError::Invalid(format!(
                    "{} must be an http(s) url, got {}",
                    name, url
                )));
            }
        }
        self.log_level()?;
        Ok(())
    }

    pub fn log_level(&self) -> Result<tracing::Level, ConfigError> {
        tracing::Level::from_str(&self.log_level)
            .map_err(|_| ConfigError::Invalid(format!("unknown log level {}", self.log_level)))
    }

    /// Clamped to [`MAX_TTL_SECS`] for configs that skipped `validate`
    pub fn token_ttl(&self) -> chrono::Duration {
        ttl(self.token_ttl_secs)
    }

    pub fn password_ttl(&self) -> chrono::Duration {
        ttl(self.password_ttl_secs)
    }
}

fn ttl(secs: i64) -> chrono::Duration {
    chrono::Duration::seconds(secs.clamp(0, MAX_TTL_SECS))
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("failed to serialize config: {0}")]
    Serialize(#[from] toml::ser::Error),
    #[error("invalid config: {0}")]
    Invalid(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_valid() {
        let config = Config::default();
        config.validate().unwrap();
        assert_eq!(config.block_size, 8 * 1024 * 1024);
        assert_eq!(config.dirent_page_size, 100);
        assert_eq!(config.head_retry_limit, 3);
        assert_eq!(config.log_level().unwrap(), tracing::Level::INFO);
    }

    #[test]
    fn test_partial_file_takes_defaults() {
        let config: Config = toml::from_str(
            r#"
            dirent_page_size = 25
            fileserver_root = "https://files.example.com/"

            [blob_store]
            type = "local"
            path = "/var/lib/seabed/blobs"
            "#,
        )
        .unwrap();
        assert_eq!(config.dirent_page_size, 25);
        assert_eq!(config.block_size, DEFAULT_BLOCK_SIZE);
        assert_eq!(config.fileserver_root.as_str(), "https://files.example.com/");
        assert_eq!(
            config.blob_store,
            ObjectStoreConfig::Local {
                path: PathBuf::from("/var/lib/seabed/blobs")
            }
        );
    }

    #[test]
    fn test_unknown_key_rejected() {
        let result: Result<Config, _> = toml::from_str("enable_thumbnails = true");
        assert!(result.is_err());
    }

    #[test]
    fn test_validate_rejects_zero_sizes_and_bad_roots() {
        let config = Config {
            block_size: 0,
            ..Default::default()
        };
        assert!(config.validate().is_err());

        let config = Config {
            token_ttl_secs: 0,
            ..Default::default()
        };
        assert!(config.validate().is_err());

        let config = Config {
            site_root: Url::parse("ftp://example.com/").unwrap(),
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validate_caps_ttls() {
        let config = Config {
            token_ttl_secs: i64::MAX,
            ..Default::default()
        };
        assert!(matches!(config.validate(), Err(ConfigError::Invalid(_))));
        assert_eq!(config.token_ttl(), chrono::Duration::seconds(MAX_TTL_SECS));

        let config = Config {
            password_ttl_secs: MAX_TTL_SECS + 1,
            ..Default::default()
        };
        assert!(config.validate().is_err());

        let config = Config {
            token_ttl_secs: MAX_TTL_SECS,
            password_ttl_secs: MAX_TTL_SECS,
            ..Default::default()
        };
        config.validate().unwrap();
    }

    #[test]
    fn test_file_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        let config = Config {
            sqlite_path: Some(dir.path().join("db.sqlite")),
            max_upload_file_size: Some(1024),
            ..Default::default()
        };
        config.to_file(&path).unwrap();
        assert_eq!(Config::from_file(&path).unwrap(), config);
    }
}
