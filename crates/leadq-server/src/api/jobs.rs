use axum::{
    extract::{Query, State},
    Extension, Json,
};
use chrono::{DateTime, Utc};
use leadq_pipeline::{JobError, JobReport};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::middleware::RequestId;

use super::{map_db_error, normalize_limit, ApiError, ApiResponse, AppState, ResponseMeta};

const TRIGGER: &str = "api";

#[derive(Debug, Deserialize)]
pub(super) struct JobRunsQuery {
    pub limit: Option<i64>,
}

#[derive(Debug, Deserialize)]
pub(super) struct JobLogsQuery {
    pub job: Option<String>,
    pub limit: Option<i64>,
}

#[derive(Debug, Serialize)]
pub(super) struct JobRunItem {
    job_run_id: Uuid,
    job_name: String,
    trigger_source: String,
    status: String,
    started_at: Option<DateTime<Utc>>,
    completed_at: Option<DateTime<Utc>>,
    records_processed: i32,
    error_message: Option<String>,
    created_at: DateTime<Utc>,
}

#[derive(Debug, Serialize)]
pub(super) struct JobLogItem {
    job_name: String,
    level: String,
    message: String,
    payload: serde_json::Value,
    created_at: DateTime<Utc>,
}

pub(super) async fn trigger_discovery(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
) -> Result<Json<ApiResponse<JobReport>>, ApiError> {
    let result = state.discover(TRIGGER).await;
    respond(req_id, result)
}

pub(super) async fn trigger_enrichment(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
) -> Result<Json<ApiResponse<JobReport>>, ApiError> {
    let result = state.enrich(TRIGGER).await;
    respond(req_id, result)
}

fn respond(
    req_id: RequestId,
    result: Result<JobReport, JobError>,
) -> Result<Json<ApiResponse<JobReport>>, ApiError> {
    match result {
        Ok(report) => Ok(Json(ApiResponse {
            data: report,
            meta: ResponseMeta::new(req_id.0),
        })),
        Err(e) => Err(map_job_error(req_id.0, &e)),
    }
}

fn map_job_error(request_id: String, error: &JobError) -> ApiError {
    match error {
        JobError::Config(_) => ApiError::new(request_id, "internal_error", error.to_string()),
        JobError::SourcesUnavailable(_) => {
            ApiError::new(request_id, "job_failed", error.to_string())
        }
        JobError::Storage(_) => {
            tracing::error!(error = %error, "job aborted on storage error");
            ApiError::new(request_id, "internal_error", "job aborted on storage error")
        }
    }
}

pub(super) async fn list_job_runs(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    Query(query): Query<JobRunsQuery>,
) -> Result<Json<ApiResponse<Vec<JobRunItem>>>, ApiError> {
    let rows = leadq_db::list_job_runs(&state.pool, normalize_limit(query.limit))
        .await
        .map_err(|e| map_db_error(req_id.0.clone(), &e))?;

    let data = rows
        .into_iter()
        .map(|row| JobRunItem {
            job_run_id: row.public_id,
            job_name: row.job_name,
            trigger_source: row.trigger_source,
            status: row.status,
            started_at: row.started_at,
            completed_at: row.completed_at,
            records_processed: row.records_processed,
            error_message: row.error_message,
            created_at: row.created_at,
        })
        .collect();

    Ok(Json(ApiResponse {
        data,
        meta: ResponseMeta::new(req_id.0),
    }))
}

pub(super) async fn list_job_logs(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    Query(query): Query<JobLogsQuery>,
) -> Result<Json<ApiResponse<Vec<JobLogItem>>>, ApiError> {
    let rows = leadq_db::list_job_logs(
        &state.pool,
        query.job.as_deref(),
        normalize_limit(query.limit),
    )
    .await
    .map_err(|e| map_db_error(req_id.0.clone(), &e))?;

    let data = rows
        .into_iter()
        .map(|row| JobLogItem {
            job_name: row.job_name,
            level: row.level,
            message: row.message,
            payload: row.payload,
            created_at: row.created_at,
        })
        .collect();

    Ok(Json(ApiResponse {
        data,
        meta: ResponseMeta::new(req_id.0),
    }))
}
