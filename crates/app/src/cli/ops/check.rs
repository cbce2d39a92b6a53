use std::sync::Arc;

use clap::Args;

use common::acl::MemoryCatalog;
use common::graph::HeadProvider;
use service::{RepoError, ServiceState, StateSetupError};

use crate::state::{AppState, StateError};

/// Re-index stray blocks, drop expired tokens and confirm every head resolves
#[derive(Args, Debug, Clone)]
pub struct Check;

#[derive(Debug, thiserror::Error)]
pub enum CheckError {
    #[error("state error: {0}")]
    State(#[from] StateError),
    #[error("failed to open store: {0}")]
    Setup(#[from] StateSetupError),
    #[error("blob store error: {0}")]
    Blobs(#[from] blobs_store::BlobStoreError),
    #[error("store error: {0}")]
    Repo(#[from] RepoError),
}

#[async_trait::async_trait]
impl crate::cli::op::Op for Check {
    type Error = CheckError;
    type Output = String;

    async fn execute(&self, ctx: &crate::cli::op::OpContext) -> Result<Self::Output, Self::Error> {
        let app = AppState::load(ctx.config_path.clone())?;
        let state = ServiceState::from_config(&app.config, Arc::new(MemoryCatalog::new())).await?;

        let recovered = state.blobs().recover().await?;
        let purged = state.service().purge_expired().await?;

        let repos = state
            .database()
            .repos()
            .await
            .map_err(RepoError::from)?;
        let mut broken = Vec::new();
        for repo in &repos {
            let head = state.service().head(*repo).await?;
            if let Err(e) = state.service().get_commit(&head).await {
                tracing::warn!(repo = %repo, head = %head, error = %e, "head does not resolve");
                broken.push(*repo);
            }
        }

        let mut output = format!(
            "Checked {}\n\
             - Blocks: {} ({} bytes)\n\
             - Recovered: {} added, {} already indexed, {} corrupt\n\
             - Expired tokens purged: {}\n\
             - Repositories: {}",
            app.seabed_dir.display(),
            state.blobs().count().await?,
            state.blobs().total_size().await?,
            recovered.added,
            recovered.existing,
            recovered.errors,
            purged,
            repos.len(),
        );
        for repo in broken {
            output.push_str(&format!("\n - broken head: {}", repo));
        }
        Ok(output)
    }
}
