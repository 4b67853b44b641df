//! Database operations for `job_runs` and `job_logs`.

use chrono::{DateTime, Utc};
use leadq_core::JobLogEntry;
use serde_json::Value;
use sqlx::PgPool;
use uuid::Uuid;

use crate::DbError;

// ---------------------------------------------------------------------------
// Row types
// ---------------------------------------------------------------------------

/// A row from the `job_runs` table.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct JobRunRow {
    pub id: i64,
    pub public_id: Uuid,
    pub job_name: String,
    pub trigger_source: String,
    pub status: String,
    pub started_at: Option<DateTime<Utc>>,
    pub completed_at: Option<DateTime<Utc>>,
    pub records_processed: i32,
    pub error_message: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// A row from the `job_logs` table.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct JobLogRow {
    pub id: i64,
    pub job_name: String,
    pub level: String,
    pub message: String,
    pub payload: Value,
    pub created_at: DateTime<Utc>,
}

// ---------------------------------------------------------------------------
// job_runs operations
// ---------------------------------------------------------------------------

/// Creates a new job run in `queued` status.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the insert fails.
pub async fn create_job_run(
    pool: &PgPool,
    job_name: &str,
    trigger_source: &str,
) -> Result<JobRunRow, DbError> {
    let public_id = Uuid::new_v4();

    let row = sqlx::query_as::<_, JobRunRow>(
        "INSERT INTO job_runs (public_id, job_name, trigger_source, status) \
         VALUES ($1, $2, $3, 'queued') \
         RETURNING id, public_id, job_name, trigger_source, status, \
                   started_at, completed_at, records_processed, error_message, created_at",
    )
    .bind(public_id)
    .bind(job_name)
    .bind(trigger_source)
    .fetch_one(pool)
    .await?;

    Ok(row)
}

/// Marks a run as `running` and sets `started_at = NOW()`.
///
/// # Errors
///
/// Returns [`DbError::InvalidJobRunTransition`] if the run is not `queued`,
/// or [`DbError::Sqlx`] if the update fails.
pub async fn start_job_run(pool: &PgPool, id: i64) -> Result<(), DbError> {
    let result = sqlx::query(
        "UPDATE job_runs \
         SET status = 'running', started_at = NOW() \
         WHERE id = $1 AND status = 'queued'",
    )
    .bind(id)
    .execute(pool)
    .await?;

    if result.rows_affected() == 0 {
        return Err(DbError::InvalidJobRunTransition {
            id,
            expected_status: "queued",
        });
    }

    Ok(())
}

/// Marks a run as `succeeded` with its processed-record count.
///
/// # Errors
///
/// Returns [`DbError::InvalidJobRunTransition`] if the run is not `running`,
/// or [`DbError::Sqlx`] if the update fails.
pub async fn complete_job_run(
    pool: &PgPool,
    id: i64,
    records_processed: i32,
) -> Result<(), DbError> {
    let result = sqlx::query(
        "UPDATE job_runs \
         SET status = 'succeeded', completed_at = NOW(), records_processed = $1 \
         WHERE id = $2 AND status = 'running'",
    )
    .bind(records_processed)
    .bind(id)
    .execute(pool)
    .await?;

    if result.rows_affected() == 0 {
        return Err(DbError::InvalidJobRunTransition {
            id,
            expected_status: "running",
        });
    }

    Ok(())
}

/// Marks a run as `failed` with an error message.
///
/// # Errors
///
/// Returns [`DbError::InvalidJobRunTransition`] if the run already finished,
/// or [`DbError::Sqlx`] if the update fails.
pub async fn fail_job_run(pool: &PgPool, id: i64, error_message: &str) -> Result<(), DbError> {
    let result = sqlx::query(
        "UPDATE job_runs \
         SET status = 'failed', completed_at = NOW(), error_message = $1 \
         WHERE id = $2 AND status IN ('queued', 'running')",
    )
    .bind(error_message)
    .bind(id)
    .execute(pool)
    .await?;

    if result.rows_affected() == 0 {
        return Err(DbError::InvalidJobRunTransition {
            id,
            expected_status: "queued or running",
        });
    }

    Ok(())
}

/// # Errors
///
/// Returns [`DbError::NotFound`] if no run has `id`, [`DbError::Sqlx`] on
/// query failure.
pub async fn get_job_run(pool: &PgPool, id: i64) -> Result<JobRunRow, DbError> {
    sqlx::query_as::<_, JobRunRow>(
        "SELECT id, public_id, job_name, trigger_source, status, \
                started_at, completed_at, records_processed, error_message, created_at \
         FROM job_runs WHERE id = $1",
    )
    .bind(id)
    .fetch_optional(pool)
    .await?
    .ok_or(DbError::NotFound)
}

/// Most recent runs first.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] on query failure.
pub async fn list_job_runs(pool: &PgPool, limit: i64) -> Result<Vec<JobRunRow>, DbError> {
    let rows = sqlx::query_as::<_, JobRunRow>(
        "SELECT id, public_id, job_name, trigger_source, status, \
                started_at, completed_at, records_processed, error_message, created_at \
         FROM job_runs \
         ORDER BY created_at DESC, id DESC \
         LIMIT $1",
    )
    .bind(limit)
    .fetch_all(pool)
    .await?;

    Ok(rows)
}

// ---------------------------------------------------------------------------
// job_logs operations
// ---------------------------------------------------------------------------

/// # Errors
///
/// Returns [`DbError::Sqlx`] if the insert fails.
pub async fn insert_job_log(pool: &PgPool, entry: &JobLogEntry) -> Result<(), DbError> {
    sqlx::query(
        "INSERT INTO job_logs (job_name, level, message, payload, created_at) \
         VALUES ($1, $2, $3, $4, $5)",
    )
    .bind(entry.job.as_str())
    .bind(entry.level.as_str())
    .bind(&entry.message)
    .bind(&entry.payload)
    .bind(entry.created_at)
    .execute(pool)
    .await?;

    Ok(())
}

/// Most recent log lines first, optionally for one job.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] on query failure.
pub async fn list_job_logs(
    pool: &PgPool,
    job_name: Option<&str>,
    limit: i64,
) -> Result<Vec<JobLogRow>, DbError> {
    let rows = sqlx::query_as::<_, JobLogRow>(
        "SELECT id, job_name, level, message, payload, created_at \
         FROM job_logs \
         WHERE ($1::text IS NULL OR job_name = $1) \
         ORDER BY created_at DESC, id DESC \
         LIMIT $2",
    )
    .bind(job_name)
    .bind(limit)
    .fetch_all(pool)
    .await?;

    Ok(rows)
}
