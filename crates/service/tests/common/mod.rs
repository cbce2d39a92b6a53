//! Shared setup for service integration tests
#![allow(dead_code)]

use std::sync::Arc;

use ::common::acl::MemoryCatalog;
use ::common::graph::MemoryHeadProvider;
use ::common::path::RepoPath;
use ::common::repo::Repository;
use ::common::store::ObjectStore;
use ::common::token::MemoryTokenStore;
use service::{Config, Database, RepoService};

pub const OWNER: &str = "alice@example.com";
pub const OTHER: &str = "bob@example.com";
pub const STRANGER: &str = "mallory@example.com";

pub struct TestEnv {
    pub service: RepoService,
    pub catalog: MemoryCatalog,
}

pub fn test_config() -> Config {
    Config {
        block_size: 4,
        ..Default::default()
    }
}

/// Service over in-memory stores
pub async fn setup() -> TestEnv {
    setup_with(test_config()).await
}

pub async fn setup_with(config: Config) -> TestEnv {
    let catalog = MemoryCatalog::new();
    let service = RepoService::new(
        config,
        ObjectStore::memory(),
        Arc::new(MemoryHeadProvider::new()),
        Arc::new(catalog.clone()),
        Arc::new(MemoryTokenStore::new()),
    );
    TestEnv { service, catalog }
}

/// Service with heads and tokens in an in-memory SQLite database
pub async fn setup_sqlite() -> TestEnv {
    let catalog = MemoryCatalog::new();
    let db = Database::memory().await.unwrap();
    let service = RepoService::new(
        test_config(),
        ObjectStore::memory(),
        Arc::new(db.clone()),
        Arc::new(catalog.clone()),
        Arc::new(db),
    );
    TestEnv { service, catalog }
}

pub fn path(p: &str) -> RepoPath {
    RepoPath::parse(p).unwrap()
}

impl TestEnv {
    pub async fn plain_repo(&self) -> Repository {
        self.service.create_repo("notes", OWNER, None).await.unwrap()
    }

    pub async fn put(&self, repo: &Repository, p: &str, data: &[u8]) {
        self.service
            .put_file(repo.id, OWNER, &path(p), data)
            .await
            .unwrap();
    }
}
