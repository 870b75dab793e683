//! Store statistics
//!
//! Counts of what the mirror holds, plus the last run from the ledger.

use crate::storage::{Level, RunRecord, Storage, StorageResult};
use std::collections::HashMap;

/// Snapshot of the store contents
#[derive(Debug, Clone)]
pub struct StoreStatistics {
    pub total_problems: u64,

    /// Problem count per difficulty; every level is present
    pub problems_by_level: HashMap<Level, u64>,

    pub tags: u64,

    pub solutions: u64,

    pub submissions: u64,

    pub latest_run: Option<RunRecord>,
}

/// Loads statistics from storage
pub fn load_statistics(storage: &dyn Storage) -> StorageResult<StoreStatistics> {
    let mut problems_by_level = storage.count_problems_by_level()?;
    for level in Level::all() {
        problems_by_level.entry(level).or_insert(0);
    }

    Ok(StoreStatistics {
        total_problems: storage.count_problems()?,
        problems_by_level,
        tags: storage.count_tags()?,
        solutions: storage.count_solutions()?,
        submissions: storage.count_submissions()?,
        latest_run: storage.get_latest_run()?,
    })
}

/// Prints statistics to stdout in a formatted manner
pub fn print_statistics(stats: &StoreStatistics) {
    println!("=== Store Statistics ===\n");

    println!("Problems: {}", stats.total_problems);
    for level in Level::all() {
        let count = stats.problems_by_level.get(&level).copied().unwrap_or(0);
        let percentage = if stats.total_problems > 0 {
            (count as f64 / stats.total_problems as f64) * 100.0
        } else {
            0.0
        };
        println!("  {}: {} ({:.1}%)", level, count, percentage);
    }
    println!();

    println!("Tags: {}", stats.tags);
    println!("Solutions: {}", stats.solutions);
    println!("Submissions: {}", stats.submissions);
    println!();

    match &stats.latest_run {
        Some(run) => {
            println!("Last sync run #{}:", run.id);
            println!("  Status: {}", run.status.to_db_string());
            println!("  Started: {}", run.started_at);
            if let Some(finished) = &run.finished_at {
                println!("  Finished: {}", finished);
            }
            println!("  New problems: {}", run.new_problems);
        }
        None => println!("No sync runs recorded"),
    }
}
