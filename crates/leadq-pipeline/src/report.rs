use chrono::{DateTime, Utc};
use leadq_core::{JobKind, RepositoryError};
use serde::Serialize;
use thiserror::Error;

/// Outcome of a job that ran to completion. `processed` counts records that
/// were fully persisted with their activity event.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct JobReport {
    pub job: &'static str,
    pub run_id: i64,
    /// Records handed to the worker pool.
    pub selected: usize,
    pub processed: usize,
    /// Persistence failures and rejected records, such as a pending lead
    /// without a website.
    pub failed: usize,
    /// Enrichment fetches that produced no result.
    pub unavailable: usize,
    /// Records never dispatched because the job budget ran out, or already
    /// handled by an overlapping run.
    pub skipped: usize,
    pub budget_exhausted: bool,
    /// Discovery sources that failed; their records are absent from `selected`.
    pub sources_failed: Vec<String>,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
}

impl JobReport {
    pub(crate) fn new(job: JobKind, run_id: i64, started_at: DateTime<Utc>) -> Self {
        Self {
            job: job.as_str(),
            run_id,
            selected: 0,
            processed: 0,
            failed: 0,
            unavailable: 0,
            skipped: 0,
            budget_exhausted: false,
            sources_failed: Vec::new(),
            started_at,
            finished_at: started_at,
        }
    }
}

/// Job-level failure. Per-record failures never surface here.
#[derive(Debug, Error)]
pub enum JobError {
    #[error("invalid job configuration: {0}")]
    Config(String),

    #[error("every configured discovery source failed: {}", .0.join("; "))]
    SourcesUnavailable(Vec<String>),

    #[error("storage error: {0}")]
    Storage(#[from] RepositoryError),
}
