use thiserror::Error;

/// Storage and node API errors
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("Collaborator unavailable: {0}")]
    Unavailable(String),
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
    #[error("Unknown wallet: {0}")]
    UnknownWallet(String),
}
