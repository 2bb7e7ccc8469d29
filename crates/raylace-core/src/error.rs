//! Core error types for the Raylace viewer.

/// A specialized Result type for Raylace operations.
pub type RaylaceResult<T> = Result<T, RaylaceError>;

/// Top-level error type encompassing all Raylace subsystems.
#[derive(Debug, thiserror::Error)]
pub enum RaylaceError {
    #[error("asset fetch failed: {message} ({key})")]
    AssetFetch { key: String, message: String },

    #[error("asset not found: {0}")]
    AssetNotFound(String),

    #[error("invalid scene manifest {key}: {message}")]
    InvalidManifest { key: String, message: String },

    #[error("config error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    #[error("worker pool error: {0}")]
    WorkerPool(String),

    #[error("render error: {0}")]
    Render(String),
}

impl RaylaceError {
    /// Create an asset fetch error.
    pub fn asset_fetch(key: impl Into<String>, message: impl Into<String>) -> Self {
        RaylaceError::AssetFetch {
            key: key.into(),
            message: message.into(),
        }
    }

    /// Create a manifest error for the scene stored under `key`.
    pub fn invalid_manifest(key: impl Into<String>, message: impl Into<String>) -> Self {
        RaylaceError::InvalidManifest {
            key: key.into(),
            message: message.into(),
        }
    }
}
