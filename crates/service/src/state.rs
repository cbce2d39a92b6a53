use std::sync::Arc;

use url::Url;

use blobs_store::{BlobStore, BlobStoreError};
use common::acl::Catalog;
use common::store::ObjectStore;

use super::config::{Config, ConfigError};
use super::database::{Database, DatabaseSetupError};
use super::repo_service::RepoService;

/// Main service state - owns the stores and the service built over them
#[derive(Clone, Debug)]
pub struct State {
    database: Database,
    blobs: BlobStore,
    service: RepoService,
}

impl State {
    /// Open every store named by `config`.
    ///
    /// Repository records, grants and shares belong to the surrounding
    ///  system and come in through `catalog`.
    pub async fn from_config(
        config: &Config,
        catalog: Arc<dyn Catalog>,
    ) -> Result<Self, StateSetupError> {
        config.validate()?;

        // 1. Setup database
        let sqlite_database_url = match config.sqlite_path {
            Some(ref path) => {
                // the file is created on connect, its directory is not
                if let Some(parent) = path.parent() {
                    if !parent.as_os_str().is_empty() && !parent.exists() {
                        return Err(StateSetupError::DatabasePathDoesNotExist);
                    }
                }
                Url::parse(&format!("sqlite://{}", path.display()))
                    .map_err(|_| StateSetupError::InvalidDatabaseUrl)
            }
            // otherwise just set up an in-memory database
            None => Url::parse("sqlite::memory:").map_err(|_| StateSetupError::InvalidDatabaseUrl),
        }?;
        tracing::info!("Database URL: {}", sqlite_database_url);
        let database = Database::connect(&sqlite_database_url).await?;

        // 2. Setup blobs store, its index next to the main database
        let blobs = match config.sqlite_path {
            Some(ref path) => {
                let index = path.with_file_name("blocks.db");
                BlobStore::new(&index, &config.blob_store).await?
            }
            None => BlobStore::in_memory(&config.blob_store).await?,
        };
        tracing::debug!("State::from_config - blobs store loaded");

        // 3. Build the service over both
        let service = RepoService::new(
            config.clone(),
            ObjectStore::new(blobs.clone()),
            Arc::new(database.clone()),
            catalog,
            Arc::new(database.clone()),
        );

        Ok(Self {
            database,
            blobs,
            service,
        })
    }

    pub fn database(&self) -> &Database {
        &self.database
    }

    pub fn blobs(&self) -> &BlobStore {
        &self.blobs
    }

    pub fn service(&self) -> &RepoService {
        &self.service
    }
}

impl AsRef<RepoService> for State {
    fn as_ref(&self) -> &RepoService {
        &self.service
    }
}

impl AsRef<Database> for State {
    fn as_ref(&self) -> &Database {
        &self.database
    }
}

#[derive(Debug, thiserror::Error)]
pub enum StateSetupError {
    #[error("Database path does not exist")]
    DatabasePathDoesNotExist,
    #[error("Database setup error: {0}")]
    DatabaseSetupError(#[from] DatabaseSetupError),
    #[error("Invalid database URL")]
    InvalidDatabaseUrl,
    #[error("Blobs store error: {0}")]
    BlobsStoreError(#[from] BlobStoreError),
    #[error("Config error: {0}")]
    Config(#[from] ConfigError),
}
