//! SQLite storage implementation
//!
//! This module provides a SQLite-based implementation of the Storage trait.

use crate::storage::schema::initialize_schema;
use crate::storage::traits::{Storage, StorageError, StorageResult};
use crate::storage::{
    Level, ProblemRecord, RunRecord, RunStatus, SolutionRecord, SubmissionRecord, TagRecord,
};
use chrono::Utc;
use rusqlite::types::Type;
use rusqlite::{params, Connection, OptionalExtension, Row};
use std::collections::{HashMap, HashSet};
use std::path::Path;

const PROBLEM_COLUMNS: &str = "id, display_id, title, slug, level, description, accepted";

/// SQLite storage backend
pub struct SqliteStorage {
    conn: Connection,
}

impl SqliteStorage {
    /// Opens (creating if needed) the database at `path` and applies the schema
    pub fn new(path: &Path) -> StorageResult<Self> {
        let conn = Connection::open(path)?;

        conn.execute_batch(
            "
            PRAGMA journal_mode = WAL;
            PRAGMA synchronous = NORMAL;
            PRAGMA foreign_keys = ON;
            PRAGMA temp_store = MEMORY;
        ",
        )?;

        initialize_schema(&conn)?;

        Ok(Self { conn })
    }

    /// Creates an in-memory database
    pub fn new_in_memory() -> StorageResult<Self> {
        let conn = Connection::open_in_memory()?;
        conn.execute_batch("PRAGMA foreign_keys = ON;")?;
        initialize_schema(&conn)?;
        Ok(Self { conn })
    }

    fn finish_run(&mut self, run_id: i64, status: RunStatus, new_problems: u64) -> StorageResult<()> {
        let now = Utc::now().to_rfc3339();
        let updated = self.conn.execute(
            "UPDATE runs SET status = ?1, finished_at = ?2, new_problems = ?3 WHERE id = ?4",
            params![status.to_db_string(), now, new_problems as i64, run_id],
        )?;
        if updated == 0 {
            return Err(StorageError::RunNotFound(run_id));
        }
        Ok(())
    }

    fn exists(&self, sql: &str, key: impl rusqlite::ToSql) -> StorageResult<bool> {
        let found: Option<i64> = self
            .conn
            .query_row(sql, params![key], |row| row.get(0))
            .optional()?;
        Ok(found.is_some())
    }

    fn count(&self, sql: &str) -> StorageResult<u64> {
        let count: i64 = self.conn.query_row(sql, [], |row| row.get(0))?;
        Ok(count as u64)
    }
}

fn run_from_row(row: &Row<'_>) -> rusqlite::Result<RunRecord> {
    Ok(RunRecord {
        id: row.get(0)?,
        started_at: row.get(1)?,
        finished_at: row.get(2)?,
        config_hash: row.get(3)?,
        status: RunStatus::from_db_string(&row.get::<_, String>(4)?).unwrap_or(RunStatus::Failed),
        new_problems: row.get::<_, i64>(5)? as u64,
    })
}

fn problem_from_row(row: &Row<'_>) -> rusqlite::Result<ProblemRecord> {
    let level: String = row.get(4)?;
    let level = Level::from_db_string(&level).ok_or_else(|| {
        rusqlite::Error::FromSqlConversionFailure(
            4,
            Type::Text,
            format!("unknown difficulty '{}'", level).into(),
        )
    })?;

    Ok(ProblemRecord {
        id: row.get(0)?,
        display_id: row.get(1)?,
        title: row.get(2)?,
        slug: row.get(3)?,
        level,
        description: row.get(5)?,
        accepted: row.get::<_, i64>(6)? != 0,
    })
}

impl Storage for SqliteStorage {
    // ===== Run Management =====

    fn create_run(&mut self, config_hash: &str) -> StorageResult<i64> {
        let now = Utc::now().to_rfc3339();
        self.conn.execute(
            "INSERT INTO runs (started_at, config_hash, status) VALUES (?1, ?2, ?3)",
            params![now, config_hash, RunStatus::Running.to_db_string()],
        )?;
        Ok(self.conn.last_insert_rowid())
    }

    fn get_run(&self, run_id: i64) -> StorageResult<RunRecord> {
        self.conn
            .query_row(
                "SELECT id, started_at, finished_at, config_hash, status, new_problems
                 FROM runs WHERE id = ?1",
                params![run_id],
                run_from_row,
            )
            .optional()?
            .ok_or(StorageError::RunNotFound(run_id))
    }

    fn get_latest_run(&self) -> StorageResult<Option<RunRecord>> {
        let run = self
            .conn
            .query_row(
                "SELECT id, started_at, finished_at, config_hash, status, new_problems
                 FROM runs ORDER BY id DESC LIMIT 1",
                [],
                run_from_row,
            )
            .optional()?;
        Ok(run)
    }

    fn complete_run(&mut self, run_id: i64, new_problems: u64) -> StorageResult<()> {
        self.finish_run(run_id, RunStatus::Completed, new_problems)
    }

    fn fail_run(&mut self, run_id: i64, new_problems: u64) -> StorageResult<()> {
        self.finish_run(run_id, RunStatus::Failed, new_problems)
    }

    // ===== Problems, Tags, Solutions =====

    fn upsert_problem(&mut self, problem: &ProblemRecord) -> StorageResult<()> {
        // ON CONFLICT DO UPDATE rewrites the row in place; OR REPLACE would
        // delete it first and trip the foreign keys of its links
        self.conn.execute(
            "INSERT INTO problems (id, display_id, title, slug, level, description, accepted)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
             ON CONFLICT(id) DO UPDATE SET
                display_id = excluded.display_id,
                title = excluded.title,
                slug = excluded.slug,
                level = excluded.level,
                description = excluded.description,
                accepted = excluded.accepted",
            params![
                problem.id,
                problem.display_id,
                problem.title,
                problem.slug,
                problem.level.to_db_string(),
                problem.description,
                problem.accepted as i64,
            ],
        )?;
        Ok(())
    }

    fn upsert_tag(&mut self, tag: &TagRecord) -> StorageResult<()> {
        self.conn.execute(
            "INSERT INTO tags (slug, name) VALUES (?1, ?2)
             ON CONFLICT(slug) DO UPDATE SET name = excluded.name",
            params![tag.slug, tag.name],
        )?;
        Ok(())
    }

    fn link_problem_tag(&mut self, problem_id: i64, tag_slug: &str) -> StorageResult<()> {
        self.conn.execute(
            "INSERT INTO problem_tags (problem_id, tag_slug) VALUES (?1, ?2)
             ON CONFLICT(problem_id, tag_slug) DO NOTHING",
            params![problem_id, tag_slug],
        )?;
        Ok(())
    }

    fn upsert_solution(&mut self, solution: &SolutionRecord) -> StorageResult<()> {
        self.conn.execute(
            "INSERT INTO solutions (problem_id, url, content) VALUES (?1, ?2, ?3)
             ON CONFLICT(problem_id) DO UPDATE SET
                url = excluded.url,
                content = excluded.content",
            params![solution.problem_id, solution.url, solution.content],
        )?;
        Ok(())
    }

    // ===== Submissions =====

    fn insert_submission_if_absent(
        &mut self,
        submission: &SubmissionRecord,
    ) -> StorageResult<bool> {
        let inserted = self.conn.execute(
            "INSERT OR IGNORE INTO submissions (id, slug, language, created, source)
             VALUES (?1, ?2, ?3, ?4, ?5)",
            params![
                submission.id,
                submission.slug,
                submission.language,
                submission.created,
                submission.source,
            ],
        )?;
        Ok(inserted == 1)
    }

    // ===== Lookups =====

    fn problem_exists(&self, problem_id: i64) -> StorageResult<bool> {
        self.exists("SELECT 1 FROM problems WHERE id = ?1", problem_id)
    }

    fn tag_exists(&self, slug: &str) -> StorageResult<bool> {
        self.exists("SELECT 1 FROM tags WHERE slug = ?1", slug)
    }

    fn submission_exists(&self, submission_id: i64) -> StorageResult<bool> {
        self.exists("SELECT 1 FROM submissions WHERE id = ?1", submission_id)
    }

    fn list_problem_ids(&self) -> StorageResult<HashSet<i64>> {
        let mut stmt = self.conn.prepare("SELECT id FROM problems")?;
        let ids = stmt
            .query_map([], |row| row.get(0))?
            .collect::<Result<HashSet<i64>, _>>()?;
        Ok(ids)
    }

    fn list_submission_ids(&self) -> StorageResult<HashSet<i64>> {
        let mut stmt = self.conn.prepare("SELECT id FROM submissions")?;
        let ids = stmt
            .query_map([], |row| row.get(0))?
            .collect::<Result<HashSet<i64>, _>>()?;
        Ok(ids)
    }

    // ===== Readers =====

    fn get_problem(&self, problem_id: i64) -> StorageResult<ProblemRecord> {
        self.conn
            .query_row(
                &format!("SELECT {} FROM problems WHERE id = ?1", PROBLEM_COLUMNS),
                params![problem_id],
                problem_from_row,
            )
            .optional()?
            .ok_or(StorageError::ProblemNotFound(problem_id))
    }

    fn list_problems(&self) -> StorageResult<Vec<ProblemRecord>> {
        let mut stmt = self.conn.prepare(&format!(
            "SELECT {} FROM problems ORDER BY CAST(display_id AS INTEGER), display_id",
            PROBLEM_COLUMNS
        ))?;

        let problems = stmt
            .query_map([], problem_from_row)?
            .collect::<Result<Vec<_>, _>>()?;

        Ok(problems)
    }

    fn tags_for_problem(&self, problem_id: i64) -> StorageResult<Vec<TagRecord>> {
        let mut stmt = self.conn.prepare(
            "SELECT t.slug, t.name FROM problem_tags pt
             JOIN tags t ON t.slug = pt.tag_slug
             WHERE pt.problem_id = ?1
             ORDER BY t.slug",
        )?;

        let tags = stmt
            .query_map(params![problem_id], |row| {
                Ok(TagRecord {
                    slug: row.get(0)?,
                    name: row.get(1)?,
                })
            })?
            .collect::<Result<Vec<_>, _>>()?;

        Ok(tags)
    }

    fn get_solution(&self, problem_id: i64) -> StorageResult<Option<SolutionRecord>> {
        let solution = self
            .conn
            .query_row(
                "SELECT problem_id, url, content FROM solutions WHERE problem_id = ?1",
                params![problem_id],
                |row| {
                    Ok(SolutionRecord {
                        problem_id: row.get(0)?,
                        url: row.get(1)?,
                        content: row.get(2)?,
                    })
                },
            )
            .optional()?;
        Ok(solution)
    }

    fn submissions_for_slug(&self, slug: &str) -> StorageResult<Vec<SubmissionRecord>> {
        let mut stmt = self.conn.prepare(
            "SELECT id, slug, language, created, source FROM submissions
             WHERE slug = ?1 ORDER BY created, id",
        )?;

        let submissions = stmt
            .query_map(params![slug], |row| {
                Ok(SubmissionRecord {
                    id: row.get(0)?,
                    slug: row.get(1)?,
                    language: row.get(2)?,
                    created: row.get(3)?,
                    source: row.get(4)?,
                })
            })?
            .collect::<Result<Vec<_>, _>>()?;

        Ok(submissions)
    }

    // ===== Statistics =====

    fn count_problems(&self) -> StorageResult<u64> {
        self.count("SELECT COUNT(*) FROM problems")
    }

    fn count_problems_by_level(&self) -> StorageResult<HashMap<Level, u64>> {
        let mut stmt = self
            .conn
            .prepare("SELECT level, COUNT(*) FROM problems GROUP BY level")?;

        let rows = stmt.query_map([], |row| {
            Ok((row.get::<_, String>(0)?, row.get::<_, i64>(1)?))
        })?;

        let mut counts = HashMap::new();
        for row in rows {
            let (level, count) = row?;
            if let Some(level) = Level::from_db_string(&level) {
                counts.insert(level, count as u64);
            }
        }

        Ok(counts)
    }

    fn count_tags(&self) -> StorageResult<u64> {
        self.count("SELECT COUNT(*) FROM tags")
    }

    fn count_solutions(&self) -> StorageResult<u64> {
        self.count("SELECT COUNT(*) FROM solutions")
    }

    fn count_submissions(&self) -> StorageResult<u64> {
        self.count("SELECT COUNT(*) FROM submissions")
    }
}
