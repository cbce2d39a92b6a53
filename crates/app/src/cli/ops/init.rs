use clap::Args;

use service::Config;

use crate::state::{AppState, StateError};

#[derive(Args, Debug, Clone)]
pub struct Init {
    /// Base url of the file server transfer tokens are redeemed at
    #[arg(long)]
    pub fileserver_root: Option<url::Url>,

    /// Base url share links are built on
    #[arg(long)]
    pub site_root: Option<url::Url>,

    /// Size files are split into before storage, in bytes
    #[arg(long)]
    pub block_size: Option<usize>,
}

#[derive(Debug, thiserror::Error)]
pub enum InitError {
    #[error("init failed: {0}")]
    StateFailed(#[from] StateError),
}

#[async_trait::async_trait]
impl crate::cli::op::Op for Init {
    type Error = InitError;
    type Output = String;

    async fn execute(&self, ctx: &crate::cli::op::OpContext) -> Result<Self::Output, Self::Error> {
        let mut config = Config::default();
        if let Some(root) = &self.fileserver_root {
            config.fileserver_root = root.clone();
        }
        if let Some(root) = &self.site_root {
            config.site_root = root.clone();
        }
        if let Some(block_size) = self.block_size {
            config.block_size = block_size;
        }

        let state = AppState::init(ctx.config_path.clone(), config)?;

        Ok(format!(
            "Initialized seabed directory at: {}\n\
             - Database: {}\n\
             - Blobs: {}\n\
             - Config: {}\n\
             - File server: {}\n\
             - Site: {}",
            state.seabed_dir.display(),
            state.db_path.display(),
            state.blobs_path.display(),
            state.config_path.display(),
            state.config.fileserver_root,
            state.config.site_root,
        ))
    }
}
