//! Incremental synchronization
//!
//! One run enumerates the solved problems, fetches detail and solution for
//! the ones not stored yet, and then checks every solved problem for new
//! accepted submissions. Work is strictly sequential and every remote call
//! or page render is followed by a paced pause.
//!
//! All writes are idempotent, so an interrupted run is resumed simply by
//! running again.

use crate::browser::Browser;
use crate::config::Config;
use crate::storage::{ProblemRecord, SolutionRecord, Storage, SubmissionRecord, TagRecord};
use crate::sync::client::{QueryClient, QueryError};
use crate::sync::extractor::{extract_source, SourceExtraction};
use crate::sync::pacing::Pacer;
use crate::sync::queries::{AcceptedProblem, SubmissionSummary};
use crate::{Result, SyncError};
use std::collections::HashSet;
use std::future::Future;
use std::time::Duration;

/// What one run did
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SyncReport {
    pub run_id: i64,
    /// Solved problems listed by the remote
    pub accepted_problems: usize,
    /// Problems stored for the first time
    pub new_problems: u64,
    pub solutions_stored: u64,
    pub submissions_stored: u64,
    /// Submissions skipped because they were already stored
    pub submissions_known: u64,
    /// Submissions skipped because they were not accepted or could not be extracted
    pub submissions_skipped: u64,
    /// Problems whose submission list could not be fetched
    pub submission_list_failures: u64,
    /// Problems whose new submissions could not be written locally
    pub submission_store_failures: u64,
}

/// Splits the solved set into problems not yet stored, in remote order
pub fn partition_new(
    accepted: &[AcceptedProblem],
    local: &HashSet<i64>,
) -> (Vec<AcceptedProblem>, Vec<AcceptedProblem>) {
    accepted.iter().cloned().partition(|p| !local.contains(&p.id))
}

/// Drives one synchronization over borrowed storage and browser handles
pub struct Synchronizer<'a, S: Storage + ?Sized, B: Browser + ?Sized> {
    storage: &'a mut S,
    browser: &'a mut B,
    client: QueryClient,
    pacer: Pacer,
    max_attempts: u32,
    ready_selector: String,
    extraction_timeout: Duration,
}

impl<'a, S: Storage + ?Sized, B: Browser + ?Sized> Synchronizer<'a, S, B> {
    pub fn new(storage: &'a mut S, browser: &'a mut B, client: QueryClient, config: &Config) -> Self {
        Self {
            storage,
            browser,
            client,
            pacer: Pacer::from_config(&config.sync),
            max_attempts: config.sync.max_attempts.max(1),
            ready_selector: config.browser.ready_selector.clone(),
            extraction_timeout: Duration::from_secs(config.browser.extraction_timeout_secs),
        }
    }

    /// Runs one synchronization, recording it in the run ledger
    ///
    /// # Errors
    ///
    /// Failures of the problem list, a problem detail or a solution query
    /// (after retries), and storage failures outside the submission step,
    /// end the run; it is then marked failed. Work persisted before the
    /// failure is kept.
    pub async fn run(&mut self, config_hash: &str) -> Result<SyncReport> {
        let run_id = self.storage.create_run(config_hash)?;
        let mut report = SyncReport {
            run_id,
            ..SyncReport::default()
        };

        match self.sync_all(&mut report).await {
            Ok(()) => {
                self.storage.complete_run(run_id, report.new_problems)?;
                tracing::info!("Updated {} problems", report.new_problems);
                Ok(report)
            }
            Err(e) => {
                tracing::error!("Sync run {} failed: {}", run_id, e);
                if let Err(ledger_err) = self.storage.fail_run(run_id, report.new_problems) {
                    tracing::warn!("Could not mark run {} as failed: {}", run_id, ledger_err);
                }
                Err(e)
            }
        }
    }

    async fn sync_all(&mut self, report: &mut SyncReport) -> Result<()> {
        let client = &self.client;
        let list = with_retry(&self.pacer, self.max_attempts, "problemList", move || {
            client.fetch_problem_list()
        })
        .await?;

        let accepted = list.accepted();
        report.accepted_problems = accepted.len();

        let local = self.storage.list_problem_ids()?;
        let (new, known) = partition_new(&accepted, &local);
        tracing::info!(
            "{} accepted problems: {} new, {} already stored",
            accepted.len(),
            new.len(),
            known.len()
        );
        let new_ids: HashSet<i64> = new.iter().map(|p| p.id).collect();

        for problem in &accepted {
            if new_ids.contains(&problem.id) {
                self.sync_problem(&problem.slug).await?;
                report.new_problems += 1;
                if self.sync_solution(&problem.slug).await? {
                    report.solutions_stored += 1;
                }
            }

            self.sync_submissions(&problem.slug, report).await?;
        }

        Ok(())
    }

    /// Fetches a problem and writes it with its tags
    async fn sync_problem(&mut self, slug: &str) -> Result<()> {
        tracing::info!("Fetching problem: {}", slug);
        let client = &self.client;
        let detail = with_retry(&self.pacer, self.max_attempts, "getQuestionDetail", move || {
            client.fetch_problem_detail(slug)
        })
        .await?;

        self.storage.upsert_problem(&ProblemRecord {
            id: detail.id,
            display_id: detail.display_id,
            title: detail.title,
            slug: slug.to_string(),
            level: detail.difficulty,
            description: detail.content,
            accepted: true,
        })?;

        for tag in &detail.topic_tags {
            if !self.storage.tag_exists(&tag.slug)? {
                self.storage.upsert_tag(&TagRecord {
                    slug: tag.slug.clone(),
                    name: tag.name.clone(),
                })?;
            }
            self.storage.link_problem_tag(detail.id, &tag.slug)?;
        }

        Ok(())
    }

    /// Fetches the official solution; returns whether one was stored
    async fn sync_solution(&mut self, slug: &str) -> Result<bool> {
        tracing::info!("Fetching solution for problem: {}", slug);
        let client = &self.client;
        let note = with_retry(&self.pacer, self.max_attempts, "QuestionNote", move || {
            client.fetch_solution(slug)
        })
        .await?;

        let Some(solution) = note.free_solution() else {
            tracing::debug!("No free solution for {}", slug);
            return Ok(false);
        };

        self.storage.upsert_solution(&SolutionRecord {
            problem_id: note.question_id,
            url: format!("{}/articles/{}/", self.client.base_url(), slug),
            content: solution.content.clone(),
        })?;
        Ok(true)
    }

    /// Stores every new accepted submission of a problem
    ///
    /// A failed list fetch, extraction or write is logged and the problem is
    /// left for the next run.
    async fn sync_submissions(&mut self, slug: &str, report: &mut SyncReport) -> Result<()> {
        tracing::info!("Fetching submissions for problem: {}", slug);
        let outcome = self.client.fetch_submissions(slug).await;
        self.pacer.pace().await;

        let list = match outcome {
            Ok(list) => list,
            Err(e) => {
                tracing::warn!("Error fetching submissions for {}: {}", slug, e);
                report.submission_list_failures += 1;
                return Ok(());
            }
        };

        if list.submissions.is_empty() {
            tracing::info!("No submissions found for {}", slug);
            return Ok(());
        }
        if list.has_next {
            tracing::debug!(
                "{} has older submissions beyond the first {}, not fetched",
                slug,
                list.submissions.len()
            );
        }

        if let Err(e) = self.store_new_submissions(slug, &list.submissions, report).await {
            tracing::warn!("Error storing submissions for {}: {}", slug, e);
            report.submission_store_failures += 1;
        }

        Ok(())
    }

    async fn store_new_submissions(
        &mut self,
        slug: &str,
        submissions: &[SubmissionSummary],
        report: &mut SyncReport,
    ) -> Result<()> {
        for submission in submissions {
            if self.storage.submission_exists(submission.id)? {
                tracing::debug!("Submission {} already stored", submission.id);
                report.submissions_known += 1;
                continue;
            }

            if !submission.is_accepted() {
                tracing::debug!(
                    "Skipping submission {} ({}{})",
                    submission.id,
                    submission.status_display,
                    if submission.is_pending { ", pending" } else { "" }
                );
                report.submissions_skipped += 1;
                continue;
            }

            if self.store_submission(slug, submission).await? {
                report.submissions_stored += 1;
            } else {
                report.submissions_skipped += 1;
            }
        }

        Ok(())
    }

    /// Renders one submission page and stores its source if it can be read
    async fn store_submission(&mut self, slug: &str, submission: &SubmissionSummary) -> Result<bool> {
        let url = self.client.absolute_url(&submission.url);
        tracing::debug!(
            "Rendering submission {} ({}, {}) at {}",
            submission.id,
            submission.lang,
            submission.runtime.as_deref().unwrap_or("no runtime"),
            url
        );

        let outcome = extract_source(
            &mut *self.browser,
            &url,
            &self.ready_selector,
            self.extraction_timeout,
        )
        .await;
        self.pacer.pace().await;

        let source = match outcome {
            Ok(SourceExtraction::Found(source)) => source,
            Ok(SourceExtraction::NotFound) => {
                tracing::warn!(
                    "Could not find submission code pattern in page for submission {}",
                    submission.id
                );
                return Ok(false);
            }
            Ok(SourceExtraction::TimedOut) => {
                tracing::warn!(
                    "Submission {} page was not ready within {:?}",
                    submission.id,
                    self.extraction_timeout
                );
                return Ok(false);
            }
            Err(e) => {
                tracing::warn!("Error processing submission {}: {}", submission.id, e);
                return Ok(false);
            }
        };

        let inserted = self.storage.insert_submission_if_absent(&SubmissionRecord {
            id: submission.id,
            slug: slug.to_string(),
            language: submission.lang.clone(),
            created: submission.timestamp,
            source,
        })?;
        if inserted {
            tracing::info!("Stored submission {} for {}", submission.id, slug);
        }
        Ok(inserted)
    }
}

/// Runs a query, retrying transient failures up to `max_attempts` times
///
/// Every attempt is followed by a paced pause, whatever its outcome.
async fn with_retry<T, F, Fut>(
    pacer: &Pacer,
    max_attempts: u32,
    operation: &str,
    mut call: F,
) -> Result<T>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = std::result::Result<T, QueryError>>,
{
    let mut attempt = 1;
    loop {
        let outcome = call().await;
        pacer.pace().await;

        match outcome {
            Ok(value) => return Ok(value),
            Err(e) if e.is_transient() && attempt < max_attempts => {
                tracing::warn!(
                    "{} failed (attempt {}/{}): {}, retrying",
                    operation,
                    attempt,
                    max_attempts,
                    e
                );
                attempt += 1;
            }
            Err(e) => return Err(SyncError::query(operation, e)),
        }
    }
}
