//! Durable failure trail. Every write here is best-effort: a job log that
//! cannot be stored is reported through tracing and otherwise ignored.

use leadq_core::{Clock, JobKind, JobLogEntry, LeadRepository, LogLevel};
use serde_json::Value;

pub(crate) async fn job_log(
    repo: &dyn LeadRepository,
    clock: &dyn Clock,
    job: JobKind,
    level: LogLevel,
    message: &str,
    payload: Value,
) {
    let entry = JobLogEntry {
        job,
        level,
        message: message.to_string(),
        payload,
        created_at: clock.now(),
    };
    if let Err(e) = repo.record_job_log(&entry).await {
        tracing::error!(job = %job, message, error = %e, "failed to write job log");
    }
}

/// Attempt to mark a job run as failed, logging any secondary error.
pub(crate) async fn fail_run_best_effort(
    repo: &dyn LeadRepository,
    job: JobKind,
    run_id: i64,
    message: &str,
) {
    if let Err(mark_err) = repo.fail_job_run(run_id, message).await {
        tracing::error!(
            run_id,
            error = %mark_err,
            "failed to mark {job} run as failed"
        );
    }
}
