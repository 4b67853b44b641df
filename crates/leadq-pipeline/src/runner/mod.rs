//! Batch job runner shared by discovery and enrichment.
//!
//! Both jobs follow the same shape: validate config, open a job run, push
//! records through a bounded worker pool with per-record failure isolation,
//! then close the run. Only job-level problems become a [`JobError`].

mod discover;
mod enrich;

use std::future::Future;

use futures::stream::{self, StreamExt};
use leadq_core::{Clock, JobKind, LeadRepository, LogLevel, RepositoryError};
use serde_json::json;
use tokio::time::Instant;

use crate::audit;
use crate::{JobConfig, JobError, JobReport};

pub use discover::run_discovery;
pub use enrich::run_enrichment;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum RecordOutcome {
    Processed,
    Failed,
    Unavailable,
    /// Already handled elsewhere; nothing written.
    Skipped,
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub(crate) struct Tally {
    processed: usize,
    failed: usize,
    unavailable: usize,
    skipped: usize,
    budget_exhausted: bool,
}

impl Tally {
    fn record(&mut self, outcome: RecordOutcome) {
        match outcome {
            RecordOutcome::Processed => self.processed += 1,
            RecordOutcome::Failed => self.failed += 1,
            RecordOutcome::Unavailable => self.unavailable += 1,
            RecordOutcome::Skipped => self.skipped += 1,
        }
    }

    fn merge(self, other: Tally) -> Tally {
        Tally {
            processed: self.processed + other.processed,
            failed: self.failed + other.failed,
            unavailable: self.unavailable + other.unavailable,
            skipped: self.skipped + other.skipped,
            budget_exhausted: self.budget_exhausted || other.budget_exhausted,
        }
    }

    fn apply_to(self, report: &mut JobReport) {
        report.processed += self.processed;
        report.failed += self.failed;
        report.unavailable += self.unavailable;
        report.skipped += self.skipped;
        report.budget_exhausted |= self.budget_exhausted;
    }
}

/// A per-record failure: the job log message, the lead if it exists, and
/// the storage error.
pub(crate) struct RecordFailure {
    pub(crate) message: &'static str,
    pub(crate) lead_id: Option<i64>,
    pub(crate) error: RepositoryError,
}

impl RecordFailure {
    pub(crate) fn new(message: &'static str, lead_id: Option<i64>, error: RepositoryError) -> Self {
        Self {
            message,
            lead_id,
            error,
        }
    }
}

/// Run `process` over every record with at most `max_workers` groups in
/// flight. Records in one group run sequentially on the same worker. No new
/// record starts once `deadline` has passed; those are counted as skipped.
pub(crate) async fn process_groups<T, F, Fut>(
    groups: Vec<Vec<T>>,
    max_workers: usize,
    deadline: Instant,
    process: F,
) -> Tally
where
    F: Fn(T) -> Fut,
    Fut: Future<Output = RecordOutcome>,
{
    let process = &process;
    stream::iter(groups)
        .map(|group| async move {
            let mut tally = Tally::default();
            let total = group.len();
            for (started, record) in group.into_iter().enumerate() {
                if Instant::now() >= deadline {
                    tally.skipped += total - started;
                    tally.budget_exhausted = true;
                    break;
                }
                tally.record(process(record).await);
            }
            tally
        })
        .buffer_unordered(max_workers.max(1))
        .fold(Tally::default(), |acc, tally| async move { acc.merge(tally) })
        .await
}

/// Job-run bookkeeping around a batch body.
async fn execute<F, Fut>(
    repo: &dyn LeadRepository,
    clock: &dyn Clock,
    job: JobKind,
    config: &JobConfig,
    trigger: &str,
    body: F,
) -> Result<JobReport, JobError>
where
    F: FnOnce(i64, Instant) -> Fut,
    Fut: Future<Output = Result<JobReport, JobError>>,
{
    if let Err(e) = config.validate() {
        report_job_failure(repo, clock, job, None, &e).await;
        return Err(e);
    }

    let deadline = Instant::now() + config.job_budget;
    let run_id = match repo.start_job_run(job, trigger).await {
        Ok(id) => id,
        Err(e) => {
            let e = JobError::from(e);
            report_job_failure(repo, clock, job, None, &e).await;
            return Err(e);
        }
    };
    tracing::info!(job = %job, run_id, trigger, "job started");

    match body(run_id, deadline).await {
        Ok(mut report) => {
            report.finished_at = clock.now();
            if let Err(e) = repo.complete_job_run(run_id, report.processed).await {
                let e = JobError::from(e);
                report_job_failure(repo, clock, job, Some(run_id), &e).await;
                audit::fail_run_best_effort(repo, job, run_id, &e.to_string()).await;
                return Err(e);
            }
            tracing::info!(
                job = %job,
                run_id,
                selected = report.selected,
                processed = report.processed,
                failed = report.failed,
                unavailable = report.unavailable,
                skipped = report.skipped,
                "job complete"
            );
            Ok(report)
        }
        Err(e) => {
            report_job_failure(repo, clock, job, Some(run_id), &e).await;
            audit::fail_run_best_effort(repo, job, run_id, &e.to_string()).await;
            Err(e)
        }
    }
}

async fn report_job_failure(
    repo: &dyn LeadRepository,
    clock: &dyn Clock,
    job: JobKind,
    run_id: Option<i64>,
    error: &JobError,
) {
    tracing::error!(job = %job, run_id, error = %error, "job failed");
    audit::job_log(
        repo,
        clock,
        job,
        LogLevel::Error,
        "job_failed",
        json!({ "run_id": run_id, "error": error.to_string() }),
    )
    .await;
}
