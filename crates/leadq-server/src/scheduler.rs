//! Background job scheduler.
//!
//! Initialises a [`JobScheduler`] at server startup and registers the
//! recurring discovery and enrichment runs.

use std::{future::Future, pin::Pin};

use leadq_pipeline::{JobError, JobReport};
use tokio_cron_scheduler::{Job, JobScheduler, JobSchedulerError};

use crate::api::AppState;

const TRIGGER: &str = "scheduler";

type JobFuture = Pin<Box<dyn Future<Output = Result<JobReport, JobError>> + Send>>;

/// Builds and starts the background job scheduler.
///
/// Returns the running [`JobScheduler`] handle, which must be kept alive
/// for the lifetime of the process. Dropping it shuts down all jobs.
///
/// # Errors
///
/// Returns [`JobSchedulerError`] if the scheduler cannot be initialised,
/// a cron expression is invalid, or the scheduler fails to start.
pub async fn build_scheduler(
    state: AppState,
    discover_cron: &str,
    enrich_cron: &str,
) -> Result<JobScheduler, JobSchedulerError> {
    let scheduler = JobScheduler::new().await?;

    register_job(
        &scheduler,
        discover_cron,
        "discovery",
        state.clone(),
        run_discovery,
    )
    .await?;
    register_job(&scheduler, enrich_cron, "enrichment", state, run_enrichment).await?;

    scheduler.start().await?;
    Ok(scheduler)
}

fn run_discovery(state: AppState) -> JobFuture {
    Box::pin(async move { state.discover(TRIGGER).await })
}

fn run_enrichment(state: AppState) -> JobFuture {
    Box::pin(async move { state.enrich(TRIGGER).await })
}

async fn register_job(
    scheduler: &JobScheduler,
    cron: &str,
    name: &'static str,
    state: AppState,
    run: fn(AppState) -> JobFuture,
) -> Result<(), JobSchedulerError> {
    let job = Job::new_async(cron, move |_uuid, _lock| {
        let state = state.clone();
        Box::pin(async move {
            tracing::info!(job = name, "scheduler: starting run");
            match run(state).await {
                Ok(report) => tracing::info!(
                    job = name,
                    run_id = report.run_id,
                    processed = report.processed,
                    failed = report.failed,
                    skipped = report.skipped,
                    "scheduler: run complete"
                ),
                // Already recorded as job_failed by the runner.
                Err(e) => tracing::warn!(job = name, error = %e, "scheduler: run failed"),
            }
        })
    })?;

    scheduler.add(job).await?;
    tracing::info!(job = name, cron, "scheduler: registered");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::test_support::{lazy_pool, state};

    #[tokio::test]
    async fn invalid_cron_expression_fails_startup() {
        let result = build_scheduler(state(lazy_pool()), "every six hours", "0 30 * * * *").await;
        assert!(result.is_err());
    }

    #[tokio::test]
    async fn default_schedules_register() {
        let mut scheduler = build_scheduler(state(lazy_pool()), "0 0 */6 * * *", "0 30 * * * *")
            .await
            .expect("scheduler");
        scheduler.shutdown().await.expect("shutdown");
    }
}
