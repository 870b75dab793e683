//! Markdown study deck
//!
//! One section per stored problem, in display order: statement, tags,
//! official solution and every stored submission. The store is only read.

use crate::output::OutputResult;
use crate::storage::{ProblemRecord, SolutionRecord, Storage, StorageResult, SubmissionRecord, TagRecord};
use chrono::DateTime;
use std::fs::File;
use std::io::Write;
use std::path::Path;

/// Everything the deck shows for one problem
#[derive(Debug, Clone)]
pub struct DeckEntry {
    pub problem: ProblemRecord,
    pub tags: Vec<TagRecord>,
    pub solution: Option<SolutionRecord>,
    pub submissions: Vec<SubmissionRecord>,
}

/// Reads every problem and what hangs off it
pub fn load_deck(storage: &dyn Storage) -> StorageResult<Vec<DeckEntry>> {
    storage
        .list_problems()?
        .into_iter()
        .map(|problem| {
            Ok(DeckEntry {
                tags: storage.tags_for_problem(problem.id)?,
                solution: storage.get_solution(problem.id)?,
                submissions: storage.submissions_for_slug(&problem.slug)?,
                problem,
            })
        })
        .collect()
}

/// Writes the deck to `output_path`, returning the number of problems in it
pub fn generate_deck(storage: &dyn Storage, output_path: &Path) -> OutputResult<usize> {
    let entries = load_deck(storage)?;
    let markdown = format_deck(&entries);

    let mut file = File::create(output_path)?;
    file.write_all(markdown.as_bytes())?;

    Ok(entries.len())
}

/// Formats deck entries as markdown
pub fn format_deck(entries: &[DeckEntry]) -> String {
    let mut md = String::new();

    md.push_str("# LeetCode Study Deck\n\n");
    md.push_str(&format!("{} problems\n\n", entries.len()));

    for entry in entries {
        let problem = &entry.problem;
        md.push_str(&format!("## {}. {}\n\n", problem.display_id, problem.title));
        md.push_str(&format!("- **Difficulty**: {}\n", problem.level));
        md.push_str(&format!("- **Slug**: `{}`\n", problem.slug));
        if !entry.tags.is_empty() {
            let tags: Vec<&str> = entry.tags.iter().map(|t| t.name.as_str()).collect();
            md.push_str(&format!("- **Tags**: {}\n", tags.join(", ")));
        }
        md.push('\n');

        md.push_str("### Description\n\n");
        match &problem.description {
            Some(description) => {
                md.push_str(description.trim());
                md.push_str("\n\n");
            }
            None => md.push_str("_No description stored._\n\n"),
        }

        if let Some(solution) = &entry.solution {
            md.push_str("### Solution\n\n");
            md.push_str(&format!("<{}>\n\n", solution.url));
            if let Some(content) = &solution.content {
                md.push_str(content.trim());
                md.push_str("\n\n");
            }
        }

        if !entry.submissions.is_empty() {
            md.push_str("### Submissions\n\n");
            for submission in &entry.submissions {
                md.push_str(&format_submission(submission));
            }
        }
    }

    md
}

fn format_submission(submission: &SubmissionRecord) -> String {
    let source = String::from_utf8_lossy(&submission.source);
    let fence = fence_for(&source);
    let date = DateTime::from_timestamp(submission.created, 0)
        .map(|d| d.format("%Y-%m-%d %H:%M UTC").to_string())
        .unwrap_or_else(|| submission.created.to_string());

    format!(
        "#### {} ({})\n\n{}{}\n{}\n{}\n\n",
        submission.language,
        date,
        fence,
        submission.language,
        source.trim_end(),
        fence
    )
}

/// A backtick fence longer than any backtick run inside `source`
fn fence_for(source: &str) -> String {
    let mut longest = 0;
    let mut run = 0;
    for c in source.chars() {
        if c == '`' {
            run += 1;
            longest = longest.max(run);
        } else {
            run = 0;
        }
    }
    "`".repeat((longest + 1).max(3))
}
