// src/error.rs

//! Error types for binary resolution
//!
//! Remote "not found" and "no remote available" conditions are not errors;
//! they are reported through [`crate::remote::FetchOutcome`]. Everything in
//! this enum aborts the resolution pass.

use thiserror::Error;

/// Result type used throughout the crate
pub type Result<T> = std::result::Result<T, Error>;

/// Fatal errors raised while resolving binaries
#[derive(Error, Debug)]
pub enum Error {
    /// Filesystem operation failed with context
    #[error("I/O error: {0}")]
    IoError(String),

    /// Raw I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Persisted metadata or manifest could not be parsed
    #[error("parse error: {0}")]
    ParseError(String),

    /// JSON serialization/deserialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Malformed recipe or package reference
    #[error("invalid reference '{0}'")]
    InvalidReference(String),

    /// Invalid build mode or resolver configuration
    #[error("configuration error: {0}")]
    ConfigError(String),

    /// Remote transport failed in a way that is neither "not found" nor
    /// "remote unavailable"
    #[error("download error: {0}")]
    DownloadError(String),

    /// Could not acquire the per-package store lock
    #[error("lock error: {0}")]
    LockError(String),

    /// Resolver ordering bug, e.g. evaluating an already decided node
    #[error("internal invariant violated: {0}")]
    InvariantViolation(String),
}
