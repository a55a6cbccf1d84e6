use std::io;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum CliError {
    #[error(transparent)]
    Sync(#[from] booksync_core::SyncError),
    #[error(transparent)]
    Config(#[from] booksync_core::ConfigError),
    #[error(transparent)]
    Io(#[from] io::Error),
    #[error(transparent)]
    Serialization(#[from] serde_json::Error),
    #[error("Connectivity check failed: {0}")]
    Connectivity(String),
}
