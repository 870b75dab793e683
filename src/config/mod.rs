//! Configuration module for Leetdeck
//!
//! This module handles loading, parsing, and validating TOML configuration files.
//!
//! # Example
//!
//! ```no_run
//! use leetdeck::config::load_config;
//! use std::path::Path;
//!
//! let config = load_config(Path::new("leetdeck.toml")).unwrap();
//! println!("Syncing from: {}", config.remote.base_url);
//! ```

mod parser;
mod types;
mod validation;

// Re-export types
pub use types::{BrowserConfig, Config, OutputConfig, RemoteConfig, SyncConfig};

// Re-export parser functions
pub use parser::{compute_config_hash, load_config, load_config_with_hash};
