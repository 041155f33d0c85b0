//! Error types for FrameCast

use std::net::SocketAddr;
use thiserror::Error;

/// Result type alias for FrameCast operations
pub type Result<T> = std::result::Result<T, Error>;

/// FrameCast error type
#[derive(Error, Debug)]
pub enum Error {
    // Server lifecycle errors
    #[error("Failed to bind {addr}: {source}")]
    Bind {
        addr: SocketAddr,
        #[source]
        source: std::io::Error,
    },

    // Frame errors
    #[error("Invalid frame: {0}")]
    InvalidFrame(String),

    #[error("Encoding failed: {0}")]
    Encoding(String),

    // Source errors
    #[error("Frame source error: {0}")]
    Source(String),

    // General errors
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl Error {
    /// Check if this error only affects the current frame or tick
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            Error::Encoding(_) | Error::InvalidFrame(_) | Error::Source(_)
        )
    }

    /// Check if the listening address could not be acquired
    pub fn is_bind_failure(&self) -> bool {
        matches!(self, Error::Bind { .. })
    }
}

impl From<image::ImageError> for Error {
    fn from(err: image::ImageError) -> Self {
        Error::Encoding(err.to_string())
    }
}
