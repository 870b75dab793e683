//! Storage traits and error types
//!
//! This module defines the trait interface for storage backends and
//! associated error types.

use crate::storage::{
    Level, ProblemRecord, RunRecord, SolutionRecord, SubmissionRecord, TagRecord,
};
use std::collections::{HashMap, HashSet};
use thiserror::Error;

/// Errors that can occur during storage operations
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("Problem not found: {0}")]
    ProblemNotFound(i64),

    #[error("Run not found: {0}")]
    RunNotFound(i64),

    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),
}

/// Result type for storage operations
pub type StorageResult<T> = Result<T, StorageError>;

/// Trait for storage backend implementations
///
/// Every write is a single statement keyed by the entity's primary key, so
/// each one is atomic per row. Problems, tags, links and solutions use
/// replace semantics; submissions are insert-if-absent.
pub trait Storage {
    // ===== Run Management =====

    /// Creates a new sync run and returns its ID
    fn create_run(&mut self, config_hash: &str) -> StorageResult<i64>;

    /// Gets a run by ID
    fn get_run(&self, run_id: i64) -> StorageResult<RunRecord>;

    /// Gets the most recent run
    fn get_latest_run(&self) -> StorageResult<Option<RunRecord>>;

    /// Marks a run as completed, recording how many problems it ingested
    fn complete_run(&mut self, run_id: i64, new_problems: u64) -> StorageResult<()>;

    /// Marks a run as failed
    fn fail_run(&mut self, run_id: i64, new_problems: u64) -> StorageResult<()>;

    // ===== Problems, Tags, Solutions (replace semantics) =====

    /// Inserts a problem or overwrites every field of the existing row
    fn upsert_problem(&mut self, problem: &ProblemRecord) -> StorageResult<()>;

    /// Inserts a tag or overwrites its name
    fn upsert_tag(&mut self, tag: &TagRecord) -> StorageResult<()>;

    /// Links a problem to a tag; linking twice is a no-op
    fn link_problem_tag(&mut self, problem_id: i64, tag_slug: &str) -> StorageResult<()>;

    /// Inserts a solution or overwrites the existing one for the problem
    fn upsert_solution(&mut self, solution: &SolutionRecord) -> StorageResult<()>;

    // ===== Submissions (insert-if-absent) =====

    /// Inserts a submission unless its id is already stored
    ///
    /// Returns `true` if a row was written.
    fn insert_submission_if_absent(&mut self, submission: &SubmissionRecord)
        -> StorageResult<bool>;

    // ===== Lookups =====

    fn problem_exists(&self, problem_id: i64) -> StorageResult<bool>;

    fn tag_exists(&self, slug: &str) -> StorageResult<bool>;

    fn submission_exists(&self, submission_id: i64) -> StorageResult<bool>;

    /// Gets the ids of every stored problem
    fn list_problem_ids(&self) -> StorageResult<HashSet<i64>>;

    /// Gets the ids of every stored submission
    fn list_submission_ids(&self) -> StorageResult<HashSet<i64>>;

    // ===== Readers =====

    fn get_problem(&self, problem_id: i64) -> StorageResult<ProblemRecord>;

    /// Gets all problems ordered by their display id
    fn list_problems(&self) -> StorageResult<Vec<ProblemRecord>>;

    /// Gets the tags linked to a problem, ordered by slug
    fn tags_for_problem(&self, problem_id: i64) -> StorageResult<Vec<TagRecord>>;

    fn get_solution(&self, problem_id: i64) -> StorageResult<Option<SolutionRecord>>;

    /// Gets the submissions of a problem, oldest first
    fn submissions_for_slug(&self, slug: &str) -> StorageResult<Vec<SubmissionRecord>>;

    // ===== Statistics =====

    fn count_problems(&self) -> StorageResult<u64>;

    fn count_problems_by_level(&self) -> StorageResult<HashMap<Level, u64>>;

    fn count_tags(&self) -> StorageResult<u64>;

    fn count_solutions(&self) -> StorageResult<u64>;

    fn count_submissions(&self) -> StorageResult<u64>;
}
