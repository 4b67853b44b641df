//! Persistence contract used by the batch pipeline and review operations.
//!
//! Implemented against Postgres in `leadq-db` and in memory in
//! `leadq-pipeline`. Every write method is a single atomic operation on one
//! lead, so an interrupted batch never leaves a half-merged record.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde_json::Value;
use thiserror::Error;

use crate::{ActivityEvent, Candidate, LeadStatus, NewActivityEvent, QualifiedLead, WebsiteSnapshot};

#[derive(Debug, Error)]
pub enum RepositoryError {
    #[error("lead not found: {0}")]
    NotFound(String),

    #[error("storage backend error: {0}")]
    Backend(#[source] Box<dyn std::error::Error + Send + Sync>),
}

impl RepositoryError {
    pub fn backend(error: impl std::error::Error + Send + Sync + 'static) -> Self {
        Self::Backend(Box::new(error))
    }
}

/// Keyed upsert of a discovered candidate.
///
/// A new handle is inserted with [`lifecycle::initial_status`] of the score.
/// On conflict the discovered fields are merged as in
/// [`Candidate::merged_over`] and the stored status is never lowered: the
/// only automatic change is `new -> queued`, stamped with `seen_at`. When
/// the website URL changes, the previous enrichment is discarded so the new
/// site gets fetched.
///
/// `scored_enrichment_at` is the `enriched_at` of the website snapshot that
/// went into `quality_score`. If the stored lead was enriched since, its
/// score and status are kept.
///
/// [`lifecycle::initial_status`]: crate::lifecycle::initial_status
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LeadUpsert {
    pub candidate: Candidate,
    pub quality_score: u8,
    pub scored_enrichment_at: Option<DateTime<Utc>>,
    pub seen_at: DateTime<Utc>,
}

/// Result of a successful enrichment, merged into the stored lead.
///
/// Only applied while the lead is still unenriched and still points at
/// `website_url`. Status follows [`lifecycle::on_enrichment`] against the
/// stored status, stamped with the snapshot's `enriched_at`.
///
/// [`lifecycle::on_enrichment`]: crate::lifecycle::on_enrichment
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EnrichmentUpdate {
    pub website_url: String,
    pub website: WebsiteSnapshot,
    pub niche_guess: Option<String>,
    pub quality_score: u8,
}

/// A lead as stored after an automatic write, with the status step that
/// write applied, if any.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SavedLead {
    pub lead: QualifiedLead,
    pub transition: Option<(LeadStatus, LeadStatus)>,
}

/// Manual edit of review fields. `None` leaves a field untouched;
/// `Some(None)` clears a nullable field.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LeadPatch {
    pub status: Option<LeadStatus>,
    pub last_status_change_at: Option<DateTime<Utc>>,
    pub reason_dead: Option<Option<String>>,
    pub niche_guess: Option<Option<String>>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum JobKind {
    Discovery,
    Enrichment,
}

impl JobKind {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            JobKind::Discovery => "discover-leads",
            JobKind::Enrichment => "enrich-websites",
        }
    }
}

impl std::fmt::Display for JobKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogLevel {
    Info,
    Warn,
    Error,
}

impl LogLevel {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            LogLevel::Info => "info",
            LogLevel::Warn => "warn",
            LogLevel::Error => "error",
        }
    }
}

/// Durable job log line, kept for manual remediation.
#[derive(Debug, Clone, PartialEq)]
pub struct JobLogEntry {
    pub job: JobKind,
    pub level: LogLevel,
    pub message: String,
    pub payload: Value,
    pub created_at: DateTime<Utc>,
}

#[async_trait]
pub trait LeadRepository: Send + Sync {
    async fn find_by_handle(&self, handle: &str)
        -> Result<Option<QualifiedLead>, RepositoryError>;

    /// Insert or merge by handle and return the merged record.
    async fn upsert_lead(&self, lead: &LeadUpsert) -> Result<SavedLead, RepositoryError>;

    /// Leads with a website URL and no enrichment yet, least recently
    /// attempted first.
    async fn pending_enrichment(&self, limit: usize)
        -> Result<Vec<QualifiedLead>, RepositoryError>;

    /// `None` when the lead is gone, already enriched, or has moved to
    /// another website since it was selected.
    async fn save_enrichment(
        &self,
        lead_id: i64,
        update: &EnrichmentUpdate,
    ) -> Result<Option<SavedLead>, RepositoryError>;

    /// Bump the attempt counter after a fetch that produced no result.
    async fn record_enrichment_failure(
        &self,
        lead_id: i64,
        at: DateTime<Utc>,
    ) -> Result<(), RepositoryError>;

    async fn apply_patch(
        &self,
        lead_id: i64,
        patch: &LeadPatch,
    ) -> Result<QualifiedLead, RepositoryError>;

    /// Append-only; events are never updated or deleted.
    async fn append_activity(
        &self,
        event: &NewActivityEvent,
    ) -> Result<ActivityEvent, RepositoryError>;

    /// Activity for one lead, newest first.
    async fn list_activity(&self, lead_id: i64) -> Result<Vec<ActivityEvent>, RepositoryError>;

    async fn record_job_log(&self, entry: &JobLogEntry) -> Result<(), RepositoryError>;

    /// Create a job run in `running` state and return its id.
    async fn start_job_run(&self, job: JobKind, trigger: &str) -> Result<i64, RepositoryError>;

    async fn complete_job_run(&self, run_id: i64, processed: usize)
        -> Result<(), RepositoryError>;

    async fn fail_job_run(&self, run_id: i64, message: &str) -> Result<(), RepositoryError>;
}
