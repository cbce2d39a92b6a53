use std::time::Duration;

use tokio::signal::unix::{signal, SignalKind};
use tokio::sync::watch;
use tokio::task::JoinHandle;

use crate::version::build_info;

/// Time in-flight work gets between SIGTERM and shutdown
const SIGTERM_GRACE: Duration = Duration::from_secs(10);

pub type ShutdownBlocker = (JoinHandle<()>, watch::Sender<()>, watch::Receiver<()>);

/// Watch for SIGINT and SIGTERM and publish a shutdown on the returned
///  channel. SIGINT stops at once; SIGTERM waits out [`SIGTERM_GRACE`].
///
/// The sender is returned too so callers can trigger shutdown themselves.
pub fn graceful_shutdown_blocker() -> std::io::Result<ShutdownBlocker> {
    let mut interrupt = signal(SignalKind::interrupt())?;
    let mut terminate = signal(SignalKind::terminate())?;

    let (tx, rx) = watch::channel(());
    let notify = tx.clone();

    let handle = tokio::spawn(async move {
        tokio::select! {
            _ = interrupt.recv() => tracing::debug!("SIGINT, shutting down"),
            _ = terminate.recv() => {
                tracing::debug!(grace = ?SIGTERM_GRACE, "SIGTERM, shutting down after grace period");
                tokio::time::sleep(SIGTERM_GRACE).await;
            }
        }
        // receivers may already be gone
        let _ = notify.send(());
    });

    Ok((handle, tx, rx))
}

/// Route panics through `tracing` so they land in the log file too
pub fn register_panic_logger() {
    std::panic::set_hook(Box::new(|info| match info.location() {
        Some(loc) => tracing::error!(
            message = %info,
            panic.file = loc.file(),
            panic.line = loc.line(),
            panic.column = loc.column(),
        ),
        None => tracing::error!(message = %info),
    }));
}

pub fn report_build_info() {
    let build = build_info();
    tracing::info!(
        version = build.version,
        repo_version = build.repo_version,
        profile = build.build_profile,
        features = build.build_features,
        "seabed starting up"
    );
}
