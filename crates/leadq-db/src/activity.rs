//! Database operations for the append-only `lead_activity` table.
//!
//! Insert and read only. A trigger on the table rejects UPDATE and DELETE.

use chrono::{DateTime, Utc};
use leadq_core::{ActivityEvent, ActivityKind, NewActivityEvent};
use serde_json::Value;
use sqlx::PgPool;

use crate::DbError;

/// A row from the `lead_activity` table.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct ActivityRow {
    pub id: i64,
    pub lead_id: i64,
    pub kind: String,
    pub payload: Value,
    pub created_at: DateTime<Utc>,
}

impl ActivityRow {
    /// # Errors
    ///
    /// Returns [`DbError::InvalidRow`] if `kind` is not a known activity kind.
    pub fn into_event(self) -> Result<ActivityEvent, DbError> {
        let kind = self
            .kind
            .parse::<ActivityKind>()
            .map_err(|e| DbError::InvalidRow {
                table: "lead_activity",
                reason: e.to_string(),
            })?;

        Ok(ActivityEvent {
            id: self.id,
            lead_id: self.lead_id,
            kind,
            payload: self.payload,
            created_at: self.created_at,
        })
    }
}

/// Append one activity event.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the insert fails (including a missing lead).
pub async fn insert_activity(
    pool: &PgPool,
    event: &NewActivityEvent,
) -> Result<ActivityEvent, DbError> {
    let row = sqlx::query_as::<_, ActivityRow>(
        "INSERT INTO lead_activity (lead_id, kind, payload, created_at) \
         VALUES ($1, $2, $3, $4) \
         RETURNING id, lead_id, kind, payload, created_at",
    )
    .bind(event.lead_id)
    .bind(event.kind.as_str())
    .bind(&event.payload)
    .bind(event.created_at)
    .fetch_one(pool)
    .await?;

    row.into_event()
}

/// All activity for a lead, newest first.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] on query failure.
pub async fn list_activity_for_lead(
    pool: &PgPool,
    lead_id: i64,
) -> Result<Vec<ActivityEvent>, DbError> {
    let rows = sqlx::query_as::<_, ActivityRow>(
        "SELECT id, lead_id, kind, payload, created_at \
         FROM lead_activity \
         WHERE lead_id = $1 \
         ORDER BY created_at DESC, id DESC",
    )
    .bind(lead_id)
    .fetch_all(pool)
    .await?;

    rows.into_iter().map(ActivityRow::into_event).collect()
}
