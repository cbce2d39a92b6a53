//! Shared test utilities for repository integration tests
#![allow(dead_code)]

use std::sync::Arc;

use common::graph::{CommitError, CommitGraph, MemoryHeadProvider};
use common::linked_data::CommitId;
use common::objects::TreeEntry;
use common::path::RepoPath;
use common::resolver::{insert_entry, DirectoryResolver};
use common::store::ObjectStore;
use uuid::Uuid;

pub struct TestEnv {
    pub objects: ObjectStore,
    pub graph: CommitGraph,
    pub resolver: DirectoryResolver,
    pub repo: Uuid,
}

/// Set up an in-memory store with one freshly created repository
pub async fn setup_test_env() -> TestEnv {
    let objects = ObjectStore::memory();
    let graph = CommitGraph::new(objects.clone(), Arc::new(MemoryHeadProvider::new()));
    let repo = Uuid::new_v4();
    graph.init_repo(repo, "alice@example.com").await.unwrap();
    TestEnv {
        resolver: DirectoryResolver::new(objects.clone()),
        objects,
        graph,
        repo,
    }
}

impl TestEnv {
    /// Commit `data` at `path` on top of the current head
    pub async fn add_file(&self, path: &str, data: &[u8]) -> CommitId {
        let path = RepoPath::parse(path).unwrap();
        let file = self.objects.put_file(data, 4).await.unwrap();
        let entry = TreeEntry::file(file, data.len() as u64, 1_700_000_000);
        let objects = self.objects.clone();
        self.graph
            .commit_change(self.repo, "alice@example.com", "Added file", move |root| {
                let objects = objects.clone();
                let path = path.clone();
                let entry = entry.clone();
                async move {
                    Ok::<_, CommitError>(insert_entry(&objects, &root, &path, entry).await?)
                }
            })
            .await
            .unwrap()
    }

    pub async fn head(&self) -> CommitId {
        self.graph.head(self.repo).await.unwrap()
    }
}
