//! Request-level facade over the seabed repository store.
//!
//! This crate ties the core together for callers:
//! - Configuration (one statically typed `Config`, loaded from TOML)
//! - Database (SQLite head pointers and transfer tokens)
//! - `RepoService`, the operations the view layer calls into
//! - The repository page flow (`open_repo`, `open_history`)

pub mod config;
pub mod database;
pub mod error;
pub mod repo_service;
pub mod state;
pub mod urls;
pub mod view;

// Re-export key types for convenience
pub use config::{Config, ConfigError};
pub use database::{Database, DatabaseSetupError};
pub use error::RepoError;
pub use repo_service::{RepoMetadata, RepoService};
pub use state::{State as ServiceState, StateSetupError};
pub use view::{HistoryPage, RepoOutcome, RepoPage, ShareLink, TransferLink};
