use axum::{extract::State, Extension, Json};
use chrono::Utc;
use leadq_db::LeadMetrics;

use crate::middleware::RequestId;

use super::{map_db_error, ApiError, ApiResponse, AppState, ResponseMeta};

/// GET /api/v1/metrics
pub(super) async fn get_metrics(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
) -> Result<Json<ApiResponse<LeadMetrics>>, ApiError> {
    let metrics = leadq_db::lead_metrics(&state.pool, Utc::now())
        .await
        .map_err(|e| map_db_error(req_id.0.clone(), &e))?;

    Ok(Json(ApiResponse {
        data: metrics,
        meta: ResponseMeta::new(req_id.0),
    }))
}
