/// Failure reported by a storage provider (block store, head provider,
///  catalog, token store). The core never retries these; they surface to
///  the caller as-is.
#[derive(Debug, thiserror::Error)]
pub enum BackendError {
    #[error("backend error: {0}")]
    Default(#[from] anyhow::Error),
    #[error("backend i/o error: {0}")]
    Io(#[from] std::io::Error),
    #[error("backend returned malformed record: {0}")]
    Malformed(String),
}
