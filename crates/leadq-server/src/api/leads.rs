//! Lead review endpoints: list, detail, manual update and outreach DM.

use axum::{
    extract::{Path, Query, State},
    Extension, Json,
};
use leadq_core::{build_outreach_dm, Actor, LeadStatus, QualifiedLead, SystemClock};
use leadq_db::{LeadFilter, PgLeadRepository};
use leadq_pipeline::{LeadDetail, LeadUpdate, ReviewError};
use serde::{Deserialize, Serialize};

use crate::middleware::RequestId;

use super::{map_db_error, ApiError, ApiResponse, AppState, ResponseMeta};

const MAX_PAGE_SIZE: u32 = 200;
const API_ACTOR: &str = "api";

#[derive(Debug, Default, Deserialize)]
pub(super) struct LeadsQuery {
    /// Comma-separated statuses.
    pub status: Option<String>,
    pub min_score: Option<u8>,
    pub max_score: Option<u8>,
    pub niche: Option<String>,
    pub search: Option<String>,
    pub page: Option<u32>,
    pub page_size: Option<u32>,
}

#[derive(Debug, Serialize)]
pub(super) struct LeadListData {
    leads: Vec<QualifiedLead>,
    total: i64,
    page: u32,
    page_size: u32,
}

#[derive(Debug, Serialize)]
pub(super) struct OutreachDm {
    handle: String,
    message: String,
}

fn build_filter(req_id: &str, query: LeadsQuery) -> Result<LeadFilter, ApiError> {
    let statuses = match query.status.as_deref() {
        None => Vec::new(),
        Some(raw) => raw
            .split(',')
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(|s| {
                s.parse::<LeadStatus>()
                    .map_err(|e| ApiError::new(req_id, "validation_error", e.to_string()))
            })
            .collect::<Result<Vec<_>, _>>()?,
    };

    if let (Some(min), Some(max)) = (query.min_score, query.max_score) {
        if min > max {
            return Err(ApiError::new(
                req_id,
                "validation_error",
                format!("min_score {min} is greater than max_score {max}"),
            ));
        }
    }

    let defaults = LeadFilter::default();
    Ok(LeadFilter {
        statuses,
        min_score: query.min_score,
        max_score: query.max_score,
        niche: query.niche.filter(|s| !s.trim().is_empty()),
        search: query.search.filter(|s| !s.trim().is_empty()),
        page: query.page.unwrap_or(defaults.page).max(1),
        page_size: query
            .page_size
            .unwrap_or(defaults.page_size)
            .clamp(1, MAX_PAGE_SIZE),
    })
}

fn map_review_error(req_id: String, error: ReviewError) -> ApiError {
    match error {
        ReviewError::NotFound(handle) => {
            ApiError::new(req_id, "not_found", format!("lead '{handle}' not found"))
        }
        ReviewError::EmptyUpdate => ApiError::new(req_id, "validation_error", error.to_string()),
        ReviewError::Storage(e) => {
            tracing::error!(error = %e, "lead review storage failure");
            ApiError::new(req_id, "internal_error", "database query failed")
        }
    }
}

/// GET /api/v1/leads
pub(super) async fn list_leads(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    Query(query): Query<LeadsQuery>,
) -> Result<Json<ApiResponse<LeadListData>>, ApiError> {
    let filter = build_filter(&req_id.0, query)?;
    let page = leadq_db::list_leads(&state.pool, &filter)
        .await
        .map_err(|e| map_db_error(req_id.0.clone(), &e))?;

    Ok(Json(ApiResponse {
        data: LeadListData {
            leads: page.leads,
            total: page.total,
            page: page.page,
            page_size: page.page_size,
        },
        meta: ResponseMeta::new(req_id.0),
    }))
}

/// GET /api/v1/leads/{handle}
pub(super) async fn get_lead(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    Path(handle): Path<String>,
) -> Result<Json<ApiResponse<LeadDetail>>, ApiError> {
    let repo = PgLeadRepository::new(state.pool.clone());
    let detail = leadq_pipeline::lead_detail(&repo, &handle)
        .await
        .map_err(|e| map_review_error(req_id.0.clone(), e))?;

    Ok(Json(ApiResponse {
        data: detail,
        meta: ResponseMeta::new(req_id.0),
    }))
}

/// PATCH /api/v1/leads/{handle}
pub(super) async fn update_lead(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    Path(handle): Path<String>,
    Json(body): Json<LeadUpdate>,
) -> Result<Json<ApiResponse<QualifiedLead>>, ApiError> {
    let repo = PgLeadRepository::new(state.pool.clone());
    let actor = Actor::Operator(API_ACTOR.to_string());
    let lead = leadq_pipeline::update_lead(&repo, &SystemClock, &handle, &body, &actor)
        .await
        .map_err(|e| map_review_error(req_id.0.clone(), e))?;

    Ok(Json(ApiResponse {
        data: lead,
        meta: ResponseMeta::new(req_id.0),
    }))
}

/// GET /api/v1/leads/{handle}/dm
pub(super) async fn get_outreach_dm(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    Path(handle): Path<String>,
) -> Result<Json<ApiResponse<OutreachDm>>, ApiError> {
    let normalized = leadq_core::normalize_handle(&handle);
    let lead = leadq_db::get_lead_by_handle(&state.pool, &normalized)
        .await
        .map_err(|e| map_db_error(req_id.0.clone(), &e))?
        .ok_or_else(|| {
            ApiError::new(
                req_id.0.clone(),
                "not_found",
                format!("lead '{normalized}' not found"),
            )
        })?;

    let message = build_outreach_dm(lead.handle(), lead.niche_guess.as_deref());
    Ok(Json(ApiResponse {
        data: OutreachDm {
            handle: lead.candidate.handle,
            message,
        },
        meta: ResponseMeta::new(req_id.0),
    }))
}
