//! Error types shared by every DitchPouch crate.

use thiserror::Error;

/// DitchPouch error type.
#[derive(Error, Debug)]
pub enum DitchPouchError {
    /// Configuration could not be read, parsed or validated
    #[error("config error: {0}")]
    Config(String),

    /// Progress record could not be loaded or saved
    #[error("store error: {0}")]
    Store(String),

    /// Outbound delivery failed
    #[error("channel error: {0}")]
    Channel(String),

    /// Webhook handshake or signature check failed
    #[error("verification failed: {0}")]
    Verification(String),

    /// Invalid boundary schedule
    #[error("scheduler error: {0}")]
    Scheduler(String),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("serialization error: {0}")]
    Json(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, DitchPouchError>;
