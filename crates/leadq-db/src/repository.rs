//! Postgres-backed [`LeadRepository`].

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use leadq_core::{
    ActivityEvent, EnrichmentUpdate, JobKind, JobLogEntry, LeadPatch, LeadRepository, LeadUpsert,
    NewActivityEvent, QualifiedLead, RepositoryError, SavedLead,
};
use sqlx::PgPool;

use crate::{activity, job_runs, leads, DbError};

impl From<DbError> for RepositoryError {
    fn from(error: DbError) -> Self {
        match error {
            DbError::NotFound => RepositoryError::NotFound("record not found".to_string()),
            other => RepositoryError::backend(other),
        }
    }
}

#[derive(Debug, Clone)]
pub struct PgLeadRepository {
    pool: PgPool,
}

impl PgLeadRepository {
    #[must_use]
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    #[must_use]
    pub fn pool(&self) -> &PgPool {
        &self.pool
    }
}

fn lead_not_found(id: i64) -> impl FnOnce(DbError) -> RepositoryError {
    move |error| match error {
        DbError::NotFound => RepositoryError::NotFound(format!("lead {id}")),
        other => other.into(),
    }
}

#[async_trait]
impl LeadRepository for PgLeadRepository {
    async fn find_by_handle(
        &self,
        handle: &str,
    ) -> Result<Option<QualifiedLead>, RepositoryError> {
        Ok(leads::get_lead_by_handle(&self.pool, handle).await?)
    }

    async fn upsert_lead(&self, lead: &LeadUpsert) -> Result<SavedLead, RepositoryError> {
        Ok(leads::upsert_lead(&self.pool, lead).await?)
    }

    async fn pending_enrichment(
        &self,
        limit: usize,
    ) -> Result<Vec<QualifiedLead>, RepositoryError> {
        let limit = i64::try_from(limit).unwrap_or(i64::MAX);
        Ok(leads::list_pending_enrichment(&self.pool, limit).await?)
    }

    async fn save_enrichment(
        &self,
        lead_id: i64,
        update: &EnrichmentUpdate,
    ) -> Result<Option<SavedLead>, RepositoryError> {
        Ok(leads::save_enrichment(&self.pool, lead_id, update).await?)
    }

    async fn record_enrichment_failure(
        &self,
        lead_id: i64,
        at: DateTime<Utc>,
    ) -> Result<(), RepositoryError> {
        leads::record_enrichment_failure(&self.pool, lead_id, at)
            .await
            .map_err(lead_not_found(lead_id))
    }

    async fn apply_patch(
        &self,
        lead_id: i64,
        patch: &LeadPatch,
    ) -> Result<QualifiedLead, RepositoryError> {
        leads::apply_lead_patch(&self.pool, lead_id, patch)
            .await
            .map_err(lead_not_found(lead_id))
    }

    async fn append_activity(
        &self,
        event: &NewActivityEvent,
    ) -> Result<ActivityEvent, RepositoryError> {
        Ok(activity::insert_activity(&self.pool, event).await?)
    }

    async fn list_activity(&self, lead_id: i64) -> Result<Vec<ActivityEvent>, RepositoryError> {
        Ok(activity::list_activity_for_lead(&self.pool, lead_id).await?)
    }

    async fn record_job_log(&self, entry: &JobLogEntry) -> Result<(), RepositoryError> {
        Ok(job_runs::insert_job_log(&self.pool, entry).await?)
    }

    async fn start_job_run(&self, job: JobKind, trigger: &str) -> Result<i64, RepositoryError> {
        let run = job_runs::create_job_run(&self.pool, job.as_str(), trigger).await?;
        job_runs::start_job_run(&self.pool, run.id).await?;
        Ok(run.id)
    }

    async fn complete_job_run(
        &self,
        run_id: i64,
        processed: usize,
    ) -> Result<(), RepositoryError> {
        let processed = i32::try_from(processed).unwrap_or(i32::MAX);
        Ok(job_runs::complete_job_run(&self.pool, run_id, processed).await?)
    }

    async fn fail_job_run(&self, run_id: i64, message: &str) -> Result<(), RepositoryError> {
        Ok(job_runs::fail_job_run(&self.pool, run_id, message).await?)
    }
}
