use std::fs;
use std::path::{Path, PathBuf};

use blobs_store::ObjectStoreConfig;
use service::{Config, ConfigError};

pub const APP_NAME: &str = "seabed";
pub const CONFIG_FILE_NAME: &str = "config.toml";
pub const DB_FILE_NAME: &str = "db.sqlite";
pub const BLOBS_DIR_NAME: &str = "blobs";

/// An on-disk seabed data directory
#[derive(Debug, Clone)]
pub struct AppState {
    /// Path to the data directory (~/.seabed)
    pub seabed_dir: PathBuf,
    /// Path to the SQLite database holding heads and tokens
    pub db_path: PathBuf,
    /// Path to the blobs directory
    pub blobs_path: PathBuf,
    pub config_path: PathBuf,
    pub config: Config,
}

impl AppState {
    /// Get the data directory path (custom or default ~/.seabed)
    pub fn seabed_dir(custom_path: Option<PathBuf>) -> Result<PathBuf, StateError> {
        if let Some(path) = custom_path {
            return Ok(path);
        }
        let home = dirs::home_dir().ok_or(StateError::NoHomeDirectory)?;
        Ok(home.join(format!(".{}", APP_NAME)))
    }

    /// Create a new data directory, pointing `config` at its database and blobs
    pub fn init(custom_path: Option<PathBuf>, config: Config) -> Result<Self, StateError> {
        let seabed_dir = Self::seabed_dir(custom_path)?;
        if seabed_dir.exists() {
            return Err(StateError::AlreadyInitialized);
        }
        fs::create_dir_all(&seabed_dir)?;

        let blobs_path = seabed_dir.join(BLOBS_DIR_NAME);
        fs::create_dir_all(&blobs_path)?;

        let db_path = seabed_dir.join(DB_FILE_NAME);
        let config = Config {
            sqlite_path: Some(db_path.clone()),
            blob_store: ObjectStoreConfig::Local {
                path: blobs_path.clone(),
            },
            ..config
        };
        config.validate()?;

        let config_path = seabed_dir.join(CONFIG_FILE_NAME);
        config.to_file(&config_path)?;

        Ok(Self {
            seabed_dir,
            db_path,
            blobs_path,
            config_path,
            config,
        })
    }

    /// Load an existing data directory
    pub fn load(custom_path: Option<PathBuf>) -> Result<Self, StateError> {
        let seabed_dir = Self::seabed_dir(custom_path)?;
        if !seabed_dir.exists() {
            return Err(StateError::NotInitialized);
        }

        let config_path = seabed_dir.join(CONFIG_FILE_NAME);
        let blobs_path = seabed_dir.join(BLOBS_DIR_NAME);
        require(&config_path, CONFIG_FILE_NAME)?;
        require(&blobs_path, "blobs/")?;

        let config = Config::from_file(&config_path)?;
        let db_path = config
            .sqlite_path
            .clone()
            .unwrap_or_else(|| seabed_dir.join(DB_FILE_NAME));

        Ok(Self {
            seabed_dir,
            db_path,
            blobs_path,
            config_path,
            config,
        })
    }
}

fn require(path: &Path, name: &str) -> Result<(), StateError> {
    if path.exists() {
        Ok(())
    } else {
        Err(StateError::MissingFile(name.to_string()))
    }
}

#[derive(Debug, thiserror::Error)]
pub enum StateError {
    #[error("seabed directory not initialized. Run 'seabed init' first")]
    NotInitialized,

    #[error("seabed directory already initialized")]
    AlreadyInitialized,

    #[error("no home directory found")]
    NoHomeDirectory,

    #[error("missing required file: {0}")]
    MissingFile(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("config error: {0}")]
    Config(#[from] ConfigError),
}
