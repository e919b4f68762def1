//! Error types for the ping upload pipeline.
//!
//! Nothing in this enum ever escapes [`QueueProcessor::process`]; errors are
//! converted into per-file outcomes there and only surface through logs.
//!
//! [`QueueProcessor::process`]: crate::processor::QueueProcessor::process

use std::path::PathBuf;

use thiserror::Error;

use crate::codec::CorruptPingFile;

/// Errors that can occur while moving pings from disk to the collection endpoint.
#[derive(Debug, Error)]
pub enum UploadError {
    /// A filesystem operation on a ping file or the pending directory failed.
    #[error("I/O error on {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The request never produced an HTTP status (connection refused, timeout, ...).
    #[error("Transport error: {message}")]
    Transport { message: String },

    /// The server rejected the request with a status code.
    #[error("Server responded with status {status}")]
    Status { status: u16 },

    /// A ping file could not be decoded.
    #[error(transparent)]
    Corrupt(#[from] CorruptPingFile),

    /// Invalid uploader configuration.
    #[error("Configuration error: {message}")]
    Configuration { message: String },
}

impl UploadError {
    /// Wraps an I/O error together with the path it happened on.
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    /// Returns true if the ping should be kept and tried again on a later pass.
    pub fn is_retryable(&self) -> bool {
        match self {
            UploadError::Transport { .. } => true,
            UploadError::Status { status } => !(400..500).contains(status),
            UploadError::Io { .. } => true,
            UploadError::Corrupt(_) | UploadError::Configuration { .. } => false,
        }
    }
}

/// Result type for upload operations.
pub type UploadResult<T> = std::result::Result<T, UploadError>;
