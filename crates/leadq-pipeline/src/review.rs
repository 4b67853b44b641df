//! Manual review operations: what an operator does from the API or CLI.

use leadq_core::{
    lifecycle, ActivityEvent, Actor, Clock, LeadPatch, LeadRepository, LeadStatus,
    NewActivityEvent, QualifiedLead, RepositoryError,
};
use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ReviewError {
    #[error("lead not found: {0}")]
    NotFound(String),

    #[error("update must change at least one field")]
    EmptyUpdate,

    #[error("storage error: {0}")]
    Storage(#[from] RepositoryError),
}

/// Operator edit of a lead. Absent fields are left alone; `Some(None)`
/// clears a nullable field.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct LeadUpdate {
    #[serde(default)]
    pub status: Option<LeadStatus>,
    #[serde(default, with = "double_option")]
    pub reason_dead: Option<Option<String>>,
    #[serde(default, with = "double_option")]
    pub niche_guess: Option<Option<String>>,
}

impl LeadUpdate {
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.status.is_none() && self.reason_dead.is_none() && self.niche_guess.is_none()
    }
}

/// A lead with its activity feed, newest event first.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LeadDetail {
    pub lead: QualifiedLead,
    pub activity: Vec<ActivityEvent>,
}

/// Load a lead and its activity feed.
///
/// # Errors
///
/// Returns [`ReviewError::NotFound`] for an unknown handle, or
/// [`ReviewError::Storage`] if the repository fails.
pub async fn lead_detail(
    repo: &dyn LeadRepository,
    handle: &str,
) -> Result<LeadDetail, ReviewError> {
    let lead = find_lead(repo, handle).await?;
    let activity = repo.list_activity(lead.id).await?;
    Ok(LeadDetail { lead, activity })
}

/// Apply an operator edit and record it as a `status_changed` event
/// carrying the actor and every field written.
///
/// Any requested status is accepted verbatim, including backward moves and
/// reopening closed or dead leads.
///
/// # Errors
///
/// Returns [`ReviewError::EmptyUpdate`] when nothing would change,
/// [`ReviewError::NotFound`] for an unknown handle, or
/// [`ReviewError::Storage`] if the repository fails.
pub async fn update_lead(
    repo: &dyn LeadRepository,
    clock: &dyn Clock,
    handle: &str,
    update: &LeadUpdate,
    actor: &Actor,
) -> Result<QualifiedLead, ReviewError> {
    if update.is_empty() {
        return Err(ReviewError::EmptyUpdate);
    }

    let lead = find_lead(repo, handle).await?;
    let now = clock.now();
    let decision = update
        .status
        .map(|requested| lifecycle::manual(lead.status, requested));

    if update.status == Some(LeadStatus::Dead)
        && update.reason_dead.as_ref().map_or(lead.reason_dead.is_none(), Option::is_none)
    {
        tracing::warn!(handle = %lead.handle(), "lead marked dead without a reason");
    }

    let patch = LeadPatch {
        status: decision.map(|d| d.status()),
        last_status_change_at: decision.map(|_| now),
        reason_dead: update.reason_dead.clone(),
        niche_guess: update.niche_guess.clone(),
    };
    let updated = repo.apply_patch(lead.id, &patch).await?;

    repo.append_activity(&NewActivityEvent::status_changed(
        lead.id,
        actor,
        lead.status,
        changed_fields(&patch),
        now,
    ))
    .await?;

    tracing::info!(
        handle = %updated.handle(),
        actor = %actor,
        from = %lead.status,
        to = %updated.status,
        "lead updated"
    );
    Ok(updated)
}

async fn find_lead(repo: &dyn LeadRepository, handle: &str) -> Result<QualifiedLead, ReviewError> {
    let handle = leadq_core::normalize_handle(handle);
    repo.find_by_handle(&handle)
        .await?
        .ok_or(ReviewError::NotFound(handle))
}

fn changed_fields(patch: &LeadPatch) -> Map<String, Value> {
    let mut fields = Map::new();
    if let Some(status) = patch.status {
        fields.insert("status".to_string(), json!(status.as_str()));
    }
    if let Some(at) = patch.last_status_change_at {
        fields.insert("last_status_change_at".to_string(), json!(at));
    }
    if let Some(reason) = &patch.reason_dead {
        fields.insert("reason_dead".to_string(), json!(reason));
    }
    if let Some(niche) = &patch.niche_guess {
        fields.insert("niche_guess".to_string(), json!(niche));
    }
    fields
}

/// Distinguishes an absent field from an explicit `null` in JSON bodies.
mod double_option {
    use serde::{Deserialize, Deserializer};

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Option<Option<String>>, D::Error>
    where
        D: Deserializer<'de>,
    {
        Option::<String>::deserialize(deserializer).map(Some)
    }
}
