//! Database schema definitions
//!
//! This module contains all SQL schema definitions for the Leetdeck database.

/// SQL schema for the database
pub const SCHEMA_SQL: &str = r#"
-- Track sync runs
CREATE TABLE IF NOT EXISTS runs (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    started_at TEXT NOT NULL,
    finished_at TEXT,
    config_hash TEXT NOT NULL,
    status TEXT NOT NULL,
    new_problems INTEGER NOT NULL DEFAULT 0
);

-- Problems, keyed by the remote question id
CREATE TABLE IF NOT EXISTS problems (
    id INTEGER PRIMARY KEY,
    display_id TEXT NOT NULL,
    title TEXT NOT NULL,
    slug TEXT NOT NULL UNIQUE,
    level TEXT NOT NULL,
    description TEXT,
    accepted INTEGER NOT NULL DEFAULT 0
);

-- Topic tags
CREATE TABLE IF NOT EXISTS tags (
    slug TEXT PRIMARY KEY,
    name TEXT NOT NULL
);

-- Problem <-> tag links
CREATE TABLE IF NOT EXISTS problem_tags (
    problem_id INTEGER NOT NULL REFERENCES problems(id),
    tag_slug TEXT NOT NULL REFERENCES tags(slug),
    PRIMARY KEY (problem_id, tag_slug)
);

CREATE INDEX IF NOT EXISTS idx_problem_tags_tag ON problem_tags(tag_slug);

-- Official solutions, at most one per problem
CREATE TABLE IF NOT EXISTS solutions (
    problem_id INTEGER PRIMARY KEY REFERENCES problems(id),
    url TEXT NOT NULL,
    content TEXT
);

-- Accepted submissions; slug is a lookup key, not a foreign key
CREATE TABLE IF NOT EXISTS submissions (
    id INTEGER PRIMARY KEY,
    slug TEXT NOT NULL,
    language TEXT NOT NULL,
    created INTEGER NOT NULL,
    source BLOB NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_submissions_slug ON submissions(slug);
"#;

/// Initializes the database schema
pub fn initialize_schema(conn: &rusqlite::Connection) -> Result<(), rusqlite::Error> {
    conn.execute_batch(SCHEMA_SQL)?;
    Ok(())
}
