//! Pipeline health counters for the review dashboard.

use chrono::{DateTime, Duration, Utc};
use serde::Serialize;
use sqlx::PgPool;

use crate::DbError;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, sqlx::FromRow)]
pub struct StatusCount {
    pub status: String,
    pub count: i64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LeadMetrics {
    pub total: i64,
    pub by_status: Vec<StatusCount>,
    pub discovered_last_7_days: i64,
    pub contacted_last_7_days: i64,
    pub interested_last_7_days: i64,
    pub closed_last_30_days: i64,
}

#[derive(sqlx::FromRow)]
struct WindowCounts {
    total: i64,
    discovered_last_7_days: i64,
    contacted_last_7_days: i64,
    interested_last_7_days: i64,
    closed_last_30_days: i64,
}

/// Lead counts as of `now`. The status windows use `last_status_change_at`,
/// so a lead counts toward the status it currently holds.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] on query failure.
pub async fn lead_metrics(pool: &PgPool, now: DateTime<Utc>) -> Result<LeadMetrics, DbError> {
    let week_ago = now - Duration::days(7);
    let month_ago = now - Duration::days(30);

    let counts = sqlx::query_as::<_, WindowCounts>(
        "SELECT \
             COUNT(*) AS total, \
             COUNT(*) FILTER (WHERE created_at >= $1) AS discovered_last_7_days, \
             COUNT(*) FILTER (WHERE status = 'contacted' \
                              AND last_status_change_at >= $1) AS contacted_last_7_days, \
             COUNT(*) FILTER (WHERE status = 'interested' \
                              AND last_status_change_at >= $1) AS interested_last_7_days, \
             COUNT(*) FILTER (WHERE status = 'closed' \
                              AND last_status_change_at >= $2) AS closed_last_30_days \
         FROM leads",
    )
    .bind(week_ago)
    .bind(month_ago)
    .fetch_one(pool)
    .await?;

    let by_status = sqlx::query_as::<_, StatusCount>(
        "SELECT status, COUNT(*) AS count FROM leads GROUP BY status ORDER BY status",
    )
    .fetch_all(pool)
    .await?;

    Ok(LeadMetrics {
        total: counts.total,
        by_status,
        discovered_last_7_days: counts.discovered_last_7_days,
        contacted_last_7_days: counts.contacted_last_7_days,
        interested_last_7_days: counts.interested_last_7_days,
        closed_last_30_days: counts.closed_last_30_days,
    })
}
