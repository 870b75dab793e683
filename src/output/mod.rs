//! Read-only consumers of the store
//!
//! - Statistics for `--stats`
//! - The markdown study deck for `--export-deck`

pub mod deck;
pub mod stats;

pub use deck::{format_deck, generate_deck, load_deck, DeckEntry};
pub use stats::{load_statistics, print_statistics, StoreStatistics};

use crate::storage::StorageError;
use thiserror::Error;

/// Errors that can occur while producing output
#[derive(Debug, Error)]
pub enum OutputError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),
}

/// Result type for output operations
pub type OutputResult<T> = Result<T, OutputError>;
