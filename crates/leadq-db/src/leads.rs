//! Database operations for the `leads` table.

use chrono::{DateTime, Utc};
use leadq_core::{
    lifecycle, Candidate, EnrichmentUpdate, LeadPatch, LeadStatus, LeadUpsert, QualifiedLead,
    SavedLead, WebsiteSignals, WebsiteSnapshot,
};
use sqlx::PgPool;

use crate::DbError;

macro_rules! lead_columns {
    () => {
        "id, handle, display_name, bio, website_url, follower_count, following_count, \
         is_business, last_activity_at, source_tag, quality_score, status, niche_guess, \
         reason_dead, last_status_change_at, offer_keywords_detected, \
         niche_keywords_detected, booking_or_checkout_detected, \
         website_looks_non_commercial, inferred_niche, page_title, meta_description, \
         main_heading, enriched_at, enrichment_attempts, last_enrichment_attempt_at, \
         created_at, updated_at"
    };
}

// Shared by list_leads and its count query.
macro_rules! lead_filter_clause {
    () => {
        "WHERE (cardinality($1::text[]) = 0 OR status = ANY($1::text[])) \
           AND ($2::smallint IS NULL OR quality_score >= $2) \
           AND ($3::smallint IS NULL OR quality_score <= $3) \
           AND ($4::text IS NULL OR niche_guess ILIKE '%' || $4 || '%') \
           AND ($5::text IS NULL OR handle ILIKE '%' || $5 || '%' \
                OR display_name ILIKE '%' || $5 || '%')"
    };
}

// Upsert conflict branch: the sighting brings a different website.
macro_rules! website_changed {
    () => {
        "(EXCLUDED.website_url IS NOT NULL \
          AND EXCLUDED.website_url IS DISTINCT FROM leads.website_url)"
    };
}

// Upsert conflict branch: the incoming score saw the stored enrichment.
macro_rules! score_is_current {
    () => {
        concat!(
            "(leads.enriched_at IS NOT DISTINCT FROM $13::timestamptz OR ",
            website_changed!(),
            ")"
        )
    };
}

/// A row from the `leads` table.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct LeadRow {
    pub id: i64,
    pub handle: String,
    pub display_name: Option<String>,
    pub bio: Option<String>,
    pub website_url: Option<String>,
    pub follower_count: Option<i64>,
    pub following_count: Option<i64>,
    pub is_business: Option<bool>,
    pub last_activity_at: Option<DateTime<Utc>>,
    pub source_tag: Option<String>,
    /// `SMALLINT` constrained to 0..=10.
    pub quality_score: i16,
    pub status: String,
    pub niche_guess: Option<String>,
    pub reason_dead: Option<String>,
    pub last_status_change_at: Option<DateTime<Utc>>,
    pub offer_keywords_detected: bool,
    pub niche_keywords_detected: bool,
    pub booking_or_checkout_detected: bool,
    pub website_looks_non_commercial: bool,
    pub inferred_niche: Option<String>,
    pub page_title: Option<String>,
    pub meta_description: Option<String>,
    pub main_heading: Option<String>,
    pub enriched_at: Option<DateTime<Utc>>,
    pub enrichment_attempts: i32,
    pub last_enrichment_attempt_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl LeadRow {
    /// Convert into the domain type. The website columns only count when
    /// `enriched_at` is set.
    ///
    /// # Errors
    ///
    /// Returns [`DbError::InvalidRow`] if the status or score is out of range.
    pub fn into_lead(self) -> Result<QualifiedLead, DbError> {
        let status = self
            .status
            .parse::<LeadStatus>()
            .map_err(|e| invalid_row(e.to_string()))?;
        let quality_score = u8::try_from(self.quality_score)
            .map_err(|_| invalid_row(format!("quality_score {}", self.quality_score)))?;

        let website = self.enriched_at.map(|enriched_at| WebsiteSnapshot {
            signals: WebsiteSignals {
                offer_keywords_detected: self.offer_keywords_detected,
                niche_keywords_detected: self.niche_keywords_detected,
                booking_or_checkout_detected: self.booking_or_checkout_detected,
                website_looks_non_commercial: self.website_looks_non_commercial,
                inferred_niche: self.inferred_niche,
            },
            page_title: self.page_title,
            meta_description: self.meta_description,
            main_heading: self.main_heading,
            enriched_at,
        });

        Ok(QualifiedLead {
            id: self.id,
            candidate: Candidate {
                handle: self.handle,
                display_name: self.display_name,
                bio: self.bio,
                website_url: self.website_url,
                follower_count: self.follower_count,
                following_count: self.following_count,
                is_business: self.is_business,
                last_activity_at: self.last_activity_at,
                source_tag: self.source_tag,
            },
            quality_score,
            status,
            niche_guess: self.niche_guess,
            reason_dead: self.reason_dead,
            last_status_change_at: self.last_status_change_at,
            website,
            enrichment_attempts: self.enrichment_attempts,
            last_enrichment_attempt_at: self.last_enrichment_attempt_at,
            created_at: self.created_at,
            updated_at: self.updated_at,
        })
    }
}

/// Pair a written row with the status it held before the write.
fn saved_lead(previous_status: Option<String>, row: LeadRow) -> Result<SavedLead, DbError> {
    let previous = previous_status
        .map(|status| status.parse::<LeadStatus>())
        .transpose()
        .map_err(|e| invalid_row(e.to_string()))?;
    let lead = row.into_lead()?;
    let transition = previous
        .filter(|from| *from != lead.status)
        .map(|from| (from, lead.status));
    Ok(SavedLead { lead, transition })
}

fn invalid_row(reason: String) -> DbError {
    DbError::InvalidRow {
        table: "leads",
        reason,
    }
}

/// Filters for [`list_leads`]. Empty `statuses` means every status.
#[derive(Debug, Clone)]
pub struct LeadFilter {
    pub statuses: Vec<LeadStatus>,
    pub min_score: Option<u8>,
    pub max_score: Option<u8>,
    pub niche: Option<String>,
    pub search: Option<String>,
    /// 1-based.
    pub page: u32,
    pub page_size: u32,
}

impl Default for LeadFilter {
    fn default() -> Self {
        Self {
            statuses: Vec::new(),
            min_score: None,
            max_score: None,
            niche: None,
            search: None,
            page: 1,
            page_size: 50,
        }
    }
}

impl LeadFilter {
    fn offset(&self) -> i64 {
        i64::from(self.page.max(1) - 1) * i64::from(self.page_size)
    }
}

#[derive(Debug, Clone)]
pub struct LeadPage {
    pub leads: Vec<QualifiedLead>,
    pub total: i64,
    pub page: u32,
    pub page_size: u32,
}

/// Insert a discovered lead or merge it into the existing row for its handle.
///
/// Discovered fields missing from the new sighting keep their stored value.
/// A changed website URL clears the previous enrichment.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] on query failure, or [`DbError::InvalidRow`] if
/// the returned row cannot be converted.
pub async fn upsert_lead(pool: &PgPool, lead: &LeadUpsert) -> Result<SavedLead, DbError> {
    let c = &lead.candidate;
    let mut tx = pool.begin().await?;
    let previous: Option<String> =
        sqlx::query_scalar("SELECT status FROM leads WHERE handle = $1 FOR UPDATE")
            .bind(&c.handle)
            .fetch_optional(&mut *tx)
            .await?;

    let row = sqlx::query_as::<_, LeadRow>(concat!(
        "INSERT INTO leads (handle, display_name, bio, website_url, follower_count, \
                            following_count, is_business, last_activity_at, source_tag, \
                            quality_score, status, created_at, updated_at) \
         VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $12) \
         ON CONFLICT (handle) DO UPDATE SET \
             display_name = COALESCE(EXCLUDED.display_name, leads.display_name), \
             bio = COALESCE(EXCLUDED.bio, leads.bio), \
             website_url = COALESCE(EXCLUDED.website_url, leads.website_url), \
             follower_count = COALESCE(EXCLUDED.follower_count, leads.follower_count), \
             following_count = COALESCE(EXCLUDED.following_count, leads.following_count), \
             is_business = COALESCE(EXCLUDED.is_business, leads.is_business), \
             last_activity_at = COALESCE(EXCLUDED.last_activity_at, leads.last_activity_at), \
             source_tag = COALESCE(EXCLUDED.source_tag, leads.source_tag), \
             quality_score = CASE WHEN ",
        score_is_current!(),
        " THEN EXCLUDED.quality_score ELSE leads.quality_score END, \
             status = CASE WHEN ",
        score_is_current!(),
        " AND leads.status = 'new' AND EXCLUDED.status = 'queued' \
                 THEN 'queued' ELSE leads.status END, \
             last_status_change_at = CASE WHEN ",
        score_is_current!(),
        " AND leads.status = 'new' AND EXCLUDED.status = 'queued' \
                 THEN EXCLUDED.updated_at ELSE leads.last_status_change_at END, \
             enriched_at = CASE WHEN ",
        website_changed!(),
        " THEN NULL ELSE leads.enriched_at END, \
             enrichment_attempts = CASE WHEN ",
        website_changed!(),
        " THEN 0 ELSE leads.enrichment_attempts END, \
             last_enrichment_attempt_at = CASE WHEN ",
        website_changed!(),
        " THEN NULL ELSE leads.last_enrichment_attempt_at END, \
             updated_at = EXCLUDED.updated_at \
         RETURNING ",
        lead_columns!()
    ))
    .bind(&c.handle)
    .bind(&c.display_name)
    .bind(&c.bio)
    .bind(&c.website_url)
    .bind(c.follower_count)
    .bind(c.following_count)
    .bind(c.is_business)
    .bind(c.last_activity_at)
    .bind(&c.source_tag)
    .bind(i16::from(lead.quality_score))
    .bind(lifecycle::initial_status(lead.quality_score).as_str())
    .bind(lead.seen_at)
    .bind(lead.scored_enrichment_at)
    .fetch_one(&mut *tx)
    .await?;
    tx.commit().await?;

    saved_lead(previous, row)
}

/// # Errors
///
/// Returns [`DbError::Sqlx`] on query failure, or [`DbError::InvalidRow`] if
/// the row cannot be converted.
pub async fn get_lead_by_handle(
    pool: &PgPool,
    handle: &str,
) -> Result<Option<QualifiedLead>, DbError> {
    let row = sqlx::query_as::<_, LeadRow>(concat!(
        "SELECT ",
        lead_columns!(),
        " FROM leads WHERE handle = $1"
    ))
    .bind(handle)
    .fetch_optional(pool)
    .await?;

    row.map(LeadRow::into_lead).transpose()
}

/// # Errors
///
/// Returns [`DbError::Sqlx`] on query failure, or [`DbError::InvalidRow`] if
/// the row cannot be converted.
pub async fn get_lead_by_id(pool: &PgPool, id: i64) -> Result<Option<QualifiedLead>, DbError> {
    let row = sqlx::query_as::<_, LeadRow>(concat!(
        "SELECT ",
        lead_columns!(),
        " FROM leads WHERE id = $1"
    ))
    .bind(id)
    .fetch_optional(pool)
    .await?;

    row.map(LeadRow::into_lead).transpose()
}

/// Leads that have a website but no enrichment yet, least recently attempted
/// first so a permanently broken site cannot starve the rest.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] on query failure, or [`DbError::InvalidRow`] if
/// a row cannot be converted.
pub async fn list_pending_enrichment(
    pool: &PgPool,
    limit: i64,
) -> Result<Vec<QualifiedLead>, DbError> {
    let rows = sqlx::query_as::<_, LeadRow>(concat!(
        "SELECT ",
        lead_columns!(),
        " FROM leads \
         WHERE website_url IS NOT NULL AND enriched_at IS NULL \
         ORDER BY last_enrichment_attempt_at ASC NULLS FIRST, id ASC \
         LIMIT $1"
    ))
    .bind(limit)
    .fetch_all(pool)
    .await?;

    rows.into_iter().map(LeadRow::into_lead).collect()
}

/// Store a successful enrichment with the recomputed score, applying the
/// automatic `new -> queued` step against the stored status.
///
/// Returns `None` without writing when the lead no longer exists, is already
/// enriched, or no longer has the fetched website.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] on query failure, or [`DbError::InvalidRow`] if
/// the returned row cannot be converted.
pub async fn save_enrichment(
    pool: &PgPool,
    id: i64,
    update: &EnrichmentUpdate,
) -> Result<Option<SavedLead>, DbError> {
    let site = &update.website;
    let mut tx = pool.begin().await?;
    let previous: Option<String> =
        sqlx::query_scalar("SELECT status FROM leads WHERE id = $1 FOR UPDATE")
            .bind(id)
            .fetch_optional(&mut *tx)
            .await?;

    let row = sqlx::query_as::<_, LeadRow>(concat!(
        "UPDATE leads SET \
             offer_keywords_detected = $2, \
             niche_keywords_detected = $3, \
             booking_or_checkout_detected = $4, \
             website_looks_non_commercial = $5, \
             inferred_niche = $6, \
             page_title = $7, \
             meta_description = $8, \
             main_heading = $9, \
             enriched_at = $10, \
             enrichment_attempts = enrichment_attempts + 1, \
             last_enrichment_attempt_at = $10, \
             niche_guess = COALESCE($11, niche_guess), \
             quality_score = $12, \
             status = CASE WHEN status = 'new' AND $13::boolean THEN 'queued' ELSE status END, \
             last_status_change_at = CASE WHEN status = 'new' AND $13::boolean \
                 THEN $10 ELSE last_status_change_at END, \
             updated_at = $10 \
         WHERE id = $1 AND enriched_at IS NULL AND website_url = $14 \
         RETURNING ",
        lead_columns!()
    ))
    .bind(id)
    .bind(site.signals.offer_keywords_detected)
    .bind(site.signals.niche_keywords_detected)
    .bind(site.signals.booking_or_checkout_detected)
    .bind(site.signals.website_looks_non_commercial)
    .bind(&site.signals.inferred_niche)
    .bind(&site.page_title)
    .bind(&site.meta_description)
    .bind(&site.main_heading)
    .bind(site.enriched_at)
    .bind(&update.niche_guess)
    .bind(i16::from(update.quality_score))
    .bind(lifecycle::auto_queues(update.quality_score))
    .bind(&update.website_url)
    .fetch_optional(&mut *tx)
    .await?;
    tx.commit().await?;

    row.map(|row| saved_lead(previous, row)).transpose()
}

/// Count a failed fetch so the lead moves to the back of the pending queue.
///
/// # Errors
///
/// Returns [`DbError::NotFound`] if no lead has `id`, [`DbError::Sqlx`] on
/// query failure.
pub async fn record_enrichment_failure(
    pool: &PgPool,
    id: i64,
    at: DateTime<Utc>,
) -> Result<(), DbError> {
    let result = sqlx::query(
        "UPDATE leads \
         SET enrichment_attempts = enrichment_attempts + 1, \
             last_enrichment_attempt_at = $2 \
         WHERE id = $1",
    )
    .bind(id)
    .bind(at)
    .execute(pool)
    .await?;

    if result.rows_affected() == 0 {
        return Err(DbError::NotFound);
    }
    Ok(())
}

/// Apply a manual edit. Fields left as `None` in the patch are untouched.
///
/// # Errors
///
/// Returns [`DbError::NotFound`] if no lead has `id`, [`DbError::Sqlx`] on
/// query failure.
pub async fn apply_lead_patch(
    pool: &PgPool,
    id: i64,
    patch: &LeadPatch,
) -> Result<QualifiedLead, DbError> {
    let row = sqlx::query_as::<_, LeadRow>(concat!(
        "UPDATE leads SET \
             status = COALESCE($2, status), \
             last_status_change_at = COALESCE($3, last_status_change_at), \
             reason_dead = CASE WHEN $4::boolean THEN $5::text ELSE reason_dead END, \
             niche_guess = CASE WHEN $6::boolean THEN $7::text ELSE niche_guess END, \
             updated_at = NOW() \
         WHERE id = $1 \
         RETURNING ",
        lead_columns!()
    ))
    .bind(id)
    .bind(patch.status.map(LeadStatus::as_str))
    .bind(patch.last_status_change_at)
    .bind(patch.reason_dead.is_some())
    .bind(patch.reason_dead.clone().flatten())
    .bind(patch.niche_guess.is_some())
    .bind(patch.niche_guess.clone().flatten())
    .fetch_optional(pool)
    .await?
    .ok_or(DbError::NotFound)?;

    row.into_lead()
}

/// Filtered page of leads, best score first.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] on query failure, or [`DbError::InvalidRow`] if
/// a row cannot be converted.
pub async fn list_leads(pool: &PgPool, filter: &LeadFilter) -> Result<LeadPage, DbError> {
    let statuses: Vec<&str> = filter.statuses.iter().map(|s| s.as_str()).collect();
    let min_score = filter.min_score.map(i16::from);
    let max_score = filter.max_score.map(i16::from);

    let total = sqlx::query_scalar::<_, i64>(concat!(
        "SELECT COUNT(*) FROM leads ",
        lead_filter_clause!()
    ))
    .bind(&statuses)
    .bind(min_score)
    .bind(max_score)
    .bind(&filter.niche)
    .bind(&filter.search)
    .fetch_one(pool)
    .await?;

    let rows = sqlx::query_as::<_, LeadRow>(concat!(
        "SELECT ",
        lead_columns!(),
        " FROM leads ",
        lead_filter_clause!(),
        " ORDER BY quality_score DESC, id ASC LIMIT $6 OFFSET $7"
    ))
    .bind(&statuses)
    .bind(min_score)
    .bind(max_score)
    .bind(&filter.niche)
    .bind(&filter.search)
    .bind(i64::from(filter.page_size))
    .bind(filter.offset())
    .fetch_all(pool)
    .await?;

    let leads = rows
        .into_iter()
        .map(LeadRow::into_lead)
        .collect::<Result<Vec<_>, _>>()?;

    Ok(LeadPage {
        leads,
        total,
        page: filter.page.max(1),
        page_size: filter.page_size,
    })
}
