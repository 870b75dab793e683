//! Storage module for the mirrored entity graph
//!
//! This module handles all database operations for the mirror, including:
//! - SQLite database initialization and schema management
//! - Replace-on-write persistence of problems, tags, links and solutions
//! - Insert-if-absent persistence of submissions
//! - Sync run tracking

mod schema;
mod sqlite;
mod traits;

pub use sqlite::SqliteStorage;
pub use traits::{Storage, StorageError, StorageResult};

use serde::Deserialize;
use std::fmt;

/// Difficulty of a problem as reported by the remote service
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Deserialize)]
pub enum Level {
    Easy,
    Medium,
    Hard,
}

impl Level {
    pub fn to_db_string(&self) -> &'static str {
        match self {
            Self::Easy => "Easy",
            Self::Medium => "Medium",
            Self::Hard => "Hard",
        }
    }

    pub fn from_db_string(s: &str) -> Option<Self> {
        match s {
            "Easy" => Some(Self::Easy),
            "Medium" => Some(Self::Medium),
            "Hard" => Some(Self::Hard),
            _ => None,
        }
    }

    pub fn all() -> [Self; 3] {
        [Self::Easy, Self::Medium, Self::Hard]
    }
}

impl fmt::Display for Level {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.to_db_string())
    }
}

/// A problem in the database
#[derive(Debug, Clone, PartialEq)]
pub struct ProblemRecord {
    pub id: i64,
    pub display_id: String,
    pub title: String,
    pub slug: String,
    pub level: Level,
    pub description: Option<String>,
    pub accepted: bool,
}

/// A topic tag
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TagRecord {
    pub slug: String,
    pub name: String,
}

/// The official solution of a problem
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SolutionRecord {
    pub problem_id: i64,
    pub url: String,
    pub content: Option<String>,
}

/// The source of one accepted submission
///
/// `slug` points back at the problem but is not an ownership edge.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubmissionRecord {
    pub id: i64,
    pub slug: String,
    pub language: String,
    /// Unix timestamp (seconds) of the submission
    pub created: i64,
    pub source: Vec<u8>,
}

/// Represents a sync run
#[derive(Debug, Clone)]
pub struct RunRecord {
    pub id: i64,
    pub started_at: String,
    pub finished_at: Option<String>,
    pub config_hash: String,
    pub status: RunStatus,
    pub new_problems: u64,
}

/// Status of a sync run
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunStatus {
    Running,
    Completed,
    Failed,
}

impl RunStatus {
    pub fn to_db_string(&self) -> &'static str {
        match self {
            Self::Running => "running",
            Self::Completed => "completed",
            Self::Failed => "failed",
        }
    }

    pub fn from_db_string(s: &str) -> Option<Self> {
        match s {
            "running" => Some(Self::Running),
            "completed" => Some(Self::Completed),
            "failed" => Some(Self::Failed),
            _ => None,
        }
    }
}
