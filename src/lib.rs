//! Leetdeck: an incremental mirror of a LeetCode solve history
//!
//! This crate pulls accepted problems, their official solutions and the
//! source of accepted submissions into a local SQLite store, pacing every
//! remote call, and renders that store into a markdown study deck.

pub mod auth;
pub mod browser;
pub mod config;
pub mod output;
pub mod storage;
pub mod sync;

use thiserror::Error;

/// Main error type for Leetdeck operations
#[derive(Debug, Error)]
pub enum SyncError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Authentication error: {0}")]
    Auth(#[from] auth::AuthError),

    #[error("Query {operation} failed: {source}")]
    QueryFailed {
        operation: String,
        source: sync::QueryError,
    },

    #[error("Browser error: {0}")]
    Browser(#[from] browser::BrowserError),

    #[error("Storage error: {0}")]
    Storage(#[from] storage::StorageError),
}

impl SyncError {
    /// Wraps a query error with the name of the operation that produced it
    pub fn query(operation: &str, source: sync::QueryError) -> Self {
        Self::QueryFailed {
            operation: operation.to_string(),
            source,
        }
    }
}

/// Configuration-specific errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse TOML: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Invalid URL in config: {0}")]
    InvalidUrl(String),
}

/// Result type alias for Leetdeck operations
pub type Result<T> = std::result::Result<T, SyncError>;

/// Result type alias for configuration operations
pub type ConfigResult<T> = std::result::Result<T, ConfigError>;

// Re-export commonly used types
pub use config::Config;
pub use storage::{Level, SqliteStorage, Storage};
pub use sync::{SyncReport, Synchronizer};
