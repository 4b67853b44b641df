use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};

use crate::{CoreError, LeadStatus, WebsiteSnapshot};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActivityKind {
    Discovered,
    Enriched,
    StatusChanged,
}

impl ActivityKind {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            ActivityKind::Discovered => "discovered",
            ActivityKind::Enriched => "enriched",
            ActivityKind::StatusChanged => "status_changed",
        }
    }
}

impl std::fmt::Display for ActivityKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ActivityKind {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "discovered" => Ok(ActivityKind::Discovered),
            "enriched" => Ok(ActivityKind::Enriched),
            "status_changed" => Ok(ActivityKind::StatusChanged),
            other => Err(CoreError::InvalidActivityKind(other.to_string())),
        }
    }
}

/// Who caused a status change.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Actor {
    /// The batch pipeline applying an automatic rule.
    System,
    /// A named operator (API key owner, CLI user).
    Operator(String),
}

impl std::fmt::Display for Actor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Actor::System => f.write_str("system"),
            Actor::Operator(name) => f.write_str(name),
        }
    }
}

/// A persisted, immutable audit record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActivityEvent {
    pub id: i64,
    pub lead_id: i64,
    pub kind: ActivityKind,
    pub payload: Value,
    pub created_at: DateTime<Utc>,
}

/// An activity event that has not been written yet.
#[derive(Debug, Clone, PartialEq)]
pub struct NewActivityEvent {
    pub lead_id: i64,
    pub kind: ActivityKind,
    pub payload: Value,
    pub created_at: DateTime<Utc>,
}

impl NewActivityEvent {
    #[must_use]
    pub fn discovered(
        lead_id: i64,
        source_tag: Option<&str>,
        initial_score: u8,
        at: DateTime<Utc>,
    ) -> Self {
        Self {
            lead_id,
            kind: ActivityKind::Discovered,
            payload: json!({
                "source_tag": source_tag,
                "initial_score": initial_score,
            }),
            created_at: at,
        }
    }

    #[must_use]
    pub fn enriched(
        lead_id: i64,
        url: &str,
        snapshot: &WebsiteSnapshot,
        quality_score: u8,
    ) -> Self {
        Self {
            lead_id,
            kind: ActivityKind::Enriched,
            payload: json!({
                "url": url,
                "page_title": snapshot.page_title,
                "meta_description": snapshot.meta_description,
                "main_heading": snapshot.main_heading,
                "offer_keywords_detected": snapshot.signals.offer_keywords_detected,
                "niche_keywords_detected": snapshot.signals.niche_keywords_detected,
                "booking_or_checkout_detected": snapshot.signals.booking_or_checkout_detected,
                "website_looks_non_commercial": snapshot.signals.website_looks_non_commercial,
                "inferred_niche": snapshot.signals.inferred_niche,
                "quality_score": quality_score,
            }),
            created_at: snapshot.enriched_at,
        }
    }

    /// `fields` holds the new values written alongside the status change
    /// (`status`, `last_status_change_at`, and any other patched field).
    #[must_use]
    pub fn status_changed(
        lead_id: i64,
        actor: &Actor,
        from: LeadStatus,
        fields: Map<String, Value>,
        at: DateTime<Utc>,
    ) -> Self {
        Self {
            lead_id,
            kind: ActivityKind::StatusChanged,
            payload: json!({
                "actor": actor.to_string(),
                "from": from.as_str(),
                "fields": fields,
            }),
            created_at: at,
        }
    }
}

/// `fields` map for a plain status transition to `to` at `at`.
#[must_use]
pub fn transition_fields(to: LeadStatus, at: DateTime<Utc>) -> Map<String, Value> {
    let mut fields = Map::new();
    fields.insert("status".to_string(), json!(to.as_str()));
    fields.insert("last_status_change_at".to_string(), json!(at));
    fields
}
