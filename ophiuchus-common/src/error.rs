//! Common error types for Ophiuchus

use thiserror::Error;

/// Common result type for Ophiuchus operations
pub type Result<T> = std::result::Result<T, Error>;

/// Common error types across the Ophiuchus crates
#[derive(Error, Debug)]
pub enum Error {
    /// Database operation error (wraps sqlx::Error)
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// I/O operation error (wraps std::io::Error)
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Configuration loading or validation error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Requested resource not found
    #[error("Not found: {0}")]
    NotFound(String),

    /// Missing or invalid identity credential
    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    /// Valid identity, but not the owner of the resource
    #[error("Forbidden: {0}")]
    Forbidden(String),

    /// Invalid user input or request parameter
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Operation conflicts with current resource state
    #[error("Conflict: {0}")]
    Conflict(String),

    /// Content generator failure
    #[error("Generation error: {0}")]
    Generation(String),

    /// Track oracle failure
    #[error("Oracle error: {0}")]
    Oracle(String),

    /// Internal server error
    #[error("Internal error: {0}")]
    Internal(String),
}
