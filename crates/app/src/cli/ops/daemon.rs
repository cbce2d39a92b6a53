use std::sync::Arc;
use std::time::Duration;

use clap::Args;

use common::acl::MemoryCatalog;
use service::{ServiceState, StateSetupError};

use crate::process::{graceful_shutdown_blocker, init_logging};
use crate::state::{AppState, StateError};

/// Keep the store tidy: purge expired transfer tokens and cached
///  repository keys on an interval until signalled
#[derive(Args, Debug, Clone)]
pub struct Daemon {
    /// Seconds between purges
    #[arg(long, default_value_t = 60)]
    pub purge_interval: u64,

    /// Directory for log files (logs to stdout only if not set)
    #[arg(long)]
    pub log_dir: Option<std::path::PathBuf>,
}

#[derive(Debug, thiserror::Error)]
pub enum DaemonError {
    #[error("state error: {0}")]
    StateError(#[from] StateError),
    #[error("failed to open store: {0}")]
    Setup(#[from] StateSetupError),
    #[error("invalid config: {0}")]
    Config(#[from] service::ConfigError),
    #[error("failed to install signal handlers: {0}")]
    Signals(#[from] std::io::Error),
}

#[async_trait::async_trait]
impl crate::cli::op::Op for Daemon {
    type Error = DaemonError;
    type Output = String;

    async fn execute(&self, ctx: &crate::cli::op::OpContext) -> Result<Self::Output, Self::Error> {
        let app = AppState::load(ctx.config_path.clone())?;
        let _guards = init_logging(app.config.log_level()?, self.log_dir.as_deref());

        let state = ServiceState::from_config(&app.config, Arc::new(MemoryCatalog::new())).await?;
        let (graceful_waiter, _shutdown_tx, mut shutdown_rx) = graceful_shutdown_blocker()?;

        let mut interval = tokio::time::interval(Duration::from_secs(self.purge_interval.max(1)));
        tracing::info!(
            dir = %app.seabed_dir.display(),
            interval_secs = self.purge_interval,
            "running"
        );

        loop {
            tokio::select! {
                _ = interval.tick() => {
                    match state.service().purge_expired().await {
                        Ok(0) => {}
                        Ok(purged) => tracing::debug!(purged, "purged expired tokens"),
                        Err(e) => tracing::error!("purge failed: {}", e),
                    }
                }
                _ = shutdown_rx.changed() => break,
            }
        }

        let _ = graceful_waiter.await;
        tracing::info!("shut down");
        Ok("daemon ended".to_string())
    }
}
