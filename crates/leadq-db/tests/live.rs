//! Live integration tests for leadq-db using `#[sqlx::test]`.
//!
//! Each test gets a fresh, fully-migrated Postgres database spun up by the
//! sqlx test harness. `"../../migrations"` is relative to `crates/leadq-db/`.

use chrono::{DateTime, Duration, TimeZone, Utc};
use leadq_core::{
    Candidate, EnrichmentUpdate, JobKind, JobLogEntry, LeadPatch, LeadRepository, LeadStatus,
    LeadUpsert, LogLevel, NewActivityEvent, WebsiteSignals, WebsiteSnapshot,
};
use leadq_db::{
    apply_lead_patch, complete_job_run, create_job_run, fail_job_run, get_job_run,
    get_lead_by_handle, insert_activity, insert_job_log, lead_metrics, list_activity_for_lead,
    list_job_logs, list_leads, list_pending_enrichment, record_enrichment_failure,
    save_enrichment, start_job_run, upsert_lead, DbError, LeadFilter, PgLeadRepository,
};
use serde_json::json;

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn at(day: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2026, 10, day, 12, 0, 0).unwrap()
}

fn candidate(handle: &str, website: Option<&str>) -> Candidate {
    let mut c = Candidate::new(handle);
    c.display_name = Some(format!("{handle} display"));
    c.website_url = website.map(ToOwned::to_owned);
    c.follower_count = Some(5_000);
    c.source_tag = Some("hashtag:businesscoach".to_string());
    c
}

fn upsert(c: Candidate, score: u8, seen_at: DateTime<Utc>) -> LeadUpsert {
    LeadUpsert {
        candidate: c,
        quality_score: score,
        scored_enrichment_at: None,
        seen_at,
    }
}

fn enrichment(url: &str, score: u8, enriched_at: DateTime<Utc>) -> EnrichmentUpdate {
    EnrichmentUpdate {
        website_url: url.to_string(),
        website: snapshot(enriched_at),
        niche_guess: Some("coach".to_string()),
        quality_score: score,
    }
}

fn snapshot(enriched_at: DateTime<Utc>) -> WebsiteSnapshot {
    WebsiteSnapshot {
        signals: WebsiteSignals {
            offer_keywords_detected: true,
            niche_keywords_detected: true,
            booking_or_checkout_detected: true,
            website_looks_non_commercial: false,
            inferred_niche: Some("coach".to_string()),
        },
        page_title: Some("Anna Coaching".to_string()),
        meta_description: None,
        main_heading: Some("Grow your practice".to_string()),
        enriched_at,
    }
}

// ---------------------------------------------------------------------------
// Section 1: Lead upsert
// ---------------------------------------------------------------------------

#[sqlx::test(migrations = "../../migrations")]
async fn upsert_is_keyed_by_handle(pool: sqlx::PgPool) {
    let first = upsert_lead(&pool, &upsert(candidate("anna", None), 3, at(1)))
        .await
        .expect("first upsert failed");
    let second = upsert_lead(&pool, &upsert(candidate("anna", None), 4, at(2)))
        .await
        .expect("second upsert failed");

    assert_eq!(first.lead.id, second.lead.id);
    assert_eq!(second.lead.quality_score, 4);
    assert_eq!(second.lead.created_at, at(1));
    assert_eq!(second.lead.updated_at, at(2));
    assert!(second.transition.is_none());

    let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM leads")
        .fetch_one(&pool)
        .await
        .unwrap();
    assert_eq!(count, 1);
}

#[sqlx::test(migrations = "../../migrations")]
async fn upsert_assigns_initial_status_without_a_change_stamp(pool: sqlx::PgPool) {
    let low = upsert_lead(&pool, &upsert(candidate("low", None), 6, at(1)))
        .await
        .unwrap();
    let high = upsert_lead(&pool, &upsert(candidate("high", None), 7, at(1)))
        .await
        .unwrap();

    assert_eq!(low.lead.status, LeadStatus::New);
    assert_eq!(high.lead.status, LeadStatus::Queued);
    assert!(high.transition.is_none());
    assert!(high.lead.last_status_change_at.is_none());
}

#[sqlx::test(migrations = "../../migrations")]
async fn upsert_keeps_stored_fields_missing_from_new_sighting(pool: sqlx::PgPool) {
    let mut rich = candidate("anna", Some("https://anna.example"));
    rich.bio = Some("business coach".to_string());
    upsert_lead(&pool, &upsert(rich, 5, at(1))).await.unwrap();

    let sparse = Candidate::new("anna");
    let merged = upsert_lead(&pool, &upsert(sparse, 5, at(2)))
        .await
        .unwrap()
        .lead;

    assert_eq!(merged.candidate.bio.as_deref(), Some("business coach"));
    assert_eq!(
        merged.candidate.website_url.as_deref(),
        Some("https://anna.example")
    );
}

#[sqlx::test(migrations = "../../migrations")]
async fn upsert_queues_a_new_lead_and_never_lowers_status(pool: sqlx::PgPool) {
    let lead = upsert_lead(&pool, &upsert(candidate("anna", None), 3, at(1)))
        .await
        .unwrap()
        .lead;

    let advanced = upsert_lead(&pool, &upsert(candidate("anna", None), 8, at(2)))
        .await
        .unwrap();
    assert_eq!(
        advanced.transition,
        Some((LeadStatus::New, LeadStatus::Queued))
    );
    assert_eq!(advanced.lead.last_status_change_at, Some(at(2)));

    apply_lead_patch(
        &pool,
        lead.id,
        &LeadPatch {
            status: Some(LeadStatus::Contacted),
            last_status_change_at: Some(at(3)),
            ..LeadPatch::default()
        },
    )
    .await
    .unwrap();

    let rediscovered = upsert_lead(&pool, &upsert(candidate("anna", None), 2, at(4)))
        .await
        .unwrap();
    assert!(rediscovered.transition.is_none());
    assert_eq!(rediscovered.lead.status, LeadStatus::Contacted);
    assert_eq!(rediscovered.lead.last_status_change_at, Some(at(3)));
    assert_eq!(rediscovered.lead.quality_score, 2);
}

#[sqlx::test(migrations = "../../migrations")]
async fn upsert_scored_before_enrichment_keeps_the_enriched_score(pool: sqlx::PgPool) {
    let url = "https://anna.example";
    let lead = upsert_lead(&pool, &upsert(candidate("anna", Some(url)), 3, at(1)))
        .await
        .unwrap()
        .lead;
    save_enrichment(&pool, lead.id, &enrichment(url, 9, at(2)))
        .await
        .unwrap()
        .expect("lead is pending");

    let stale = upsert_lead(&pool, &upsert(candidate("anna", Some(url)), 3, at(3)))
        .await
        .unwrap();
    assert_eq!(stale.lead.quality_score, 9);
    assert_eq!(stale.lead.status, LeadStatus::Queued);
    assert!(stale.transition.is_none());

    let current = upsert_lead(
        &pool,
        &LeadUpsert {
            scored_enrichment_at: Some(at(2)),
            ..upsert(candidate("anna", Some(url)), 8, at(4))
        },
    )
    .await
    .unwrap();
    assert_eq!(current.lead.quality_score, 8);
}

#[sqlx::test(migrations = "../../migrations")]
async fn upsert_with_new_website_clears_enrichment(pool: sqlx::PgPool) {
    let lead = upsert_lead(
        &pool,
        &upsert(candidate("anna", Some("https://old.example")), 5, at(1)),
    )
    .await
    .unwrap()
    .lead;
    save_enrichment(&pool, lead.id, &enrichment("https://old.example", 9, at(2)))
        .await
        .unwrap();

    let same_site = upsert_lead(
        &pool,
        &LeadUpsert {
            scored_enrichment_at: Some(at(2)),
            ..upsert(candidate("anna", Some("https://old.example")), 9, at(3))
        },
    )
    .await
    .unwrap()
    .lead;
    assert!(same_site.is_enriched());

    let moved = upsert_lead(
        &pool,
        &upsert(candidate("anna", Some("https://new.example")), 5, at(4)),
    )
    .await
    .unwrap()
    .lead;
    assert!(!moved.is_enriched());
    assert_eq!(moved.enrichment_attempts, 0);
    assert_eq!(moved.status, LeadStatus::Queued);
    assert_eq!(moved.quality_score, 5);
    assert_eq!(moved.last_status_change_at, Some(at(2)));
}

// ---------------------------------------------------------------------------
// Section 2: Enrichment queue
// ---------------------------------------------------------------------------

#[sqlx::test(migrations = "../../migrations")]
async fn pending_enrichment_skips_leads_without_website_and_orders_by_attempt(
    pool: sqlx::PgPool,
) {
    upsert_lead(&pool, &upsert(candidate("nosite", None), 3, at(1)))
        .await
        .unwrap();
    let tried = upsert_lead(
        &pool,
        &upsert(candidate("tried", Some("https://t.example")), 3, at(1)),
    )
    .await
    .unwrap()
    .lead;
    let fresh = upsert_lead(
        &pool,
        &upsert(candidate("fresh", Some("https://f.example")), 3, at(1)),
    )
    .await
    .unwrap()
    .lead;

    record_enrichment_failure(&pool, tried.id, at(2)).await.unwrap();

    let pending = list_pending_enrichment(&pool, 10).await.unwrap();
    let handles: Vec<_> = pending.iter().map(|l| l.handle().to_string()).collect();
    assert_eq!(handles, vec!["fresh", "tried"]);
    assert_eq!(pending[1].enrichment_attempts, 1);

    let limited = list_pending_enrichment(&pool, 1).await.unwrap();
    assert_eq!(limited.len(), 1);
    assert_eq!(limited[0].id, fresh.id);
}

#[sqlx::test(migrations = "../../migrations")]
async fn save_enrichment_queues_a_new_lead_once(pool: sqlx::PgPool) {
    let url = "https://anna.example";
    let lead = upsert_lead(&pool, &upsert(candidate("anna", Some(url)), 3, at(1)))
        .await
        .unwrap()
        .lead;

    let saved = save_enrichment(&pool, lead.id, &enrichment(url, 9, at(2)))
        .await
        .unwrap()
        .expect("lead is pending");
    assert_eq!(saved.transition, Some((LeadStatus::New, LeadStatus::Queued)));
    assert_eq!(saved.lead.last_status_change_at, Some(at(2)));
    assert_eq!(saved.lead.niche_guess.as_deref(), Some("coach"));
    assert_eq!(saved.lead.enrichment_attempts, 1);

    let again = save_enrichment(&pool, lead.id, &enrichment(url, 4, at(3)))
        .await
        .unwrap();
    assert!(again.is_none());
    let stored = get_lead_by_handle(&pool, "anna").await.unwrap().unwrap();
    assert_eq!(stored.quality_score, 9);
    assert_eq!(stored.enrichment_attempts, 1);
}

#[sqlx::test(migrations = "../../migrations")]
async fn save_enrichment_keeps_a_status_changed_after_selection(pool: sqlx::PgPool) {
    let url = "https://anna.example";
    let lead = upsert_lead(&pool, &upsert(candidate("anna", Some(url)), 3, at(1)))
        .await
        .unwrap()
        .lead;
    apply_lead_patch(
        &pool,
        lead.id,
        &LeadPatch {
            status: Some(LeadStatus::Contacted),
            last_status_change_at: Some(at(2)),
            ..LeadPatch::default()
        },
    )
    .await
    .unwrap();

    let saved = save_enrichment(&pool, lead.id, &enrichment(url, 9, at(3)))
        .await
        .unwrap()
        .expect("lead is pending");

    assert!(saved.transition.is_none());
    assert_eq!(saved.lead.status, LeadStatus::Contacted);
    assert_eq!(saved.lead.last_status_change_at, Some(at(2)));
    assert_eq!(saved.lead.quality_score, 9);
}

#[sqlx::test(migrations = "../../migrations")]
async fn save_enrichment_skips_unknown_or_moved_leads(pool: sqlx::PgPool) {
    let unknown = save_enrichment(&pool, 999_999, &enrichment("https://x.example", 5, at(2)))
        .await
        .unwrap();
    assert!(unknown.is_none());

    let lead = upsert_lead(
        &pool,
        &upsert(candidate("anna", Some("https://new.example")), 3, at(1)),
    )
    .await
    .unwrap()
    .lead;
    let moved = save_enrichment(&pool, lead.id, &enrichment("https://old.example", 9, at(2)))
        .await
        .unwrap();
    assert!(moved.is_none());
    assert_eq!(list_pending_enrichment(&pool, 10).await.unwrap().len(), 1);
}

// ---------------------------------------------------------------------------
// Section 3: Manual edits and listing
// ---------------------------------------------------------------------------

#[sqlx::test(migrations = "../../migrations")]
async fn patch_touches_only_given_fields(pool: sqlx::PgPool) {
    let lead = upsert_lead(&pool, &upsert(candidate("anna", None), 5, at(1)))
        .await
        .unwrap()
        .lead;
    apply_lead_patch(
        &pool,
        lead.id,
        &LeadPatch {
            niche_guess: Some(Some("fitness".to_string())),
            ..LeadPatch::default()
        },
    )
    .await
    .unwrap();

    let patched = apply_lead_patch(
        &pool,
        lead.id,
        &LeadPatch {
            status: Some(LeadStatus::Dead),
            last_status_change_at: Some(at(3)),
            reason_dead: Some(Some("not a fit".to_string())),
            niche_guess: None,
        },
    )
    .await
    .unwrap();

    assert_eq!(patched.status, LeadStatus::Dead);
    assert_eq!(patched.last_status_change_at, Some(at(3)));
    assert_eq!(patched.reason_dead.as_deref(), Some("not a fit"));
    assert_eq!(patched.niche_guess.as_deref(), Some("fitness"));

    let cleared = apply_lead_patch(
        &pool,
        lead.id,
        &LeadPatch {
            reason_dead: Some(None),
            ..LeadPatch::default()
        },
    )
    .await
    .unwrap();
    assert!(cleared.reason_dead.is_none());
    assert_eq!(cleared.status, LeadStatus::Dead);
}

#[sqlx::test(migrations = "../../migrations")]
async fn list_leads_filters_and_orders_by_score(pool: sqlx::PgPool) {
    for (handle, score) in [("low", 2), ("mid", 6), ("top", 9), ("coachbob", 8)] {
        upsert_lead(&pool, &upsert(candidate(handle, None), score, at(1)))
            .await
            .unwrap();
    }

    let page = list_leads(
        &pool,
        &LeadFilter {
            statuses: vec![LeadStatus::Queued],
            ..LeadFilter::default()
        },
    )
    .await
    .unwrap();
    assert_eq!(page.total, 2);
    let handles: Vec<_> = page.leads.iter().map(|l| l.handle().to_string()).collect();
    assert_eq!(handles, vec!["top", "coachbob"]);

    let page = list_leads(
        &pool,
        &LeadFilter {
            min_score: Some(3),
            max_score: Some(8),
            ..LeadFilter::default()
        },
    )
    .await
    .unwrap();
    assert_eq!(page.total, 2);

    let page = list_leads(
        &pool,
        &LeadFilter {
            search: Some("COACH".to_string()),
            ..LeadFilter::default()
        },
    )
    .await
    .unwrap();
    assert_eq!(page.total, 1);
    assert_eq!(page.leads[0].handle(), "coachbob");

    let page = list_leads(
        &pool,
        &LeadFilter {
            page: 2,
            page_size: 3,
            ..LeadFilter::default()
        },
    )
    .await
    .unwrap();
    assert_eq!(page.total, 4);
    assert_eq!(page.leads.len(), 1);
    assert_eq!(page.leads[0].handle(), "low");
}

// ---------------------------------------------------------------------------
// Section 4: Activity
// ---------------------------------------------------------------------------

#[sqlx::test(migrations = "../../migrations")]
async fn activity_is_listed_newest_first(pool: sqlx::PgPool) {
    let lead = upsert_lead(&pool, &upsert(candidate("anna", None), 5, at(1)))
        .await
        .unwrap()
        .lead;

    insert_activity(
        &pool,
        &NewActivityEvent::discovered(lead.id, Some("hashtag:coach"), 5, at(1)),
    )
    .await
    .unwrap();
    insert_activity(
        &pool,
        &NewActivityEvent::discovered(lead.id, Some("seed:bob"), 6, at(2)),
    )
    .await
    .unwrap();

    let events = list_activity_for_lead(&pool, lead.id).await.unwrap();
    assert_eq!(events.len(), 2);
    assert_eq!(events[0].payload["source_tag"], "seed:bob");
    assert_eq!(events[1].created_at, at(1));
}

#[sqlx::test(migrations = "../../migrations")]
async fn activity_rows_cannot_be_updated_or_deleted(pool: sqlx::PgPool) {
    let lead = upsert_lead(&pool, &upsert(candidate("anna", None), 5, at(1)))
        .await
        .unwrap()
        .lead;
    let event = insert_activity(
        &pool,
        &NewActivityEvent::discovered(lead.id, None, 5, at(1)),
    )
    .await
    .unwrap();

    let update = sqlx::query("UPDATE lead_activity SET payload = '{}' WHERE id = $1")
        .bind(event.id)
        .execute(&pool)
        .await;
    assert!(update.is_err(), "update should be rejected");

    let delete = sqlx::query("DELETE FROM lead_activity WHERE id = $1")
        .bind(event.id)
        .execute(&pool)
        .await;
    assert!(delete.is_err(), "delete should be rejected");
}

// ---------------------------------------------------------------------------
// Section 5: Job runs and logs
// ---------------------------------------------------------------------------

#[sqlx::test(migrations = "../../migrations")]
async fn job_run_lifecycle_queued_to_succeeded(pool: sqlx::PgPool) {
    let run = create_job_run(&pool, "discover-leads", "cli")
        .await
        .expect("create_job_run failed");
    assert_eq!(run.status, "queued");

    start_job_run(&pool, run.id).await.expect("start failed");
    complete_job_run(&pool, run.id, 12).await.expect("complete failed");

    let fetched = get_job_run(&pool, run.id).await.expect("get failed");
    assert_eq!(fetched.status, "succeeded");
    assert!(fetched.started_at.is_some());
    assert!(fetched.completed_at.is_some());
    assert_eq!(fetched.records_processed, 12);
}

#[sqlx::test(migrations = "../../migrations")]
async fn job_run_cannot_complete_directly_from_queued(pool: sqlx::PgPool) {
    let run = create_job_run(&pool, "enrich-websites", "scheduler")
        .await
        .unwrap();

    let err = complete_job_run(&pool, run.id, 1)
        .await
        .expect_err("completing a queued run should fail");
    assert!(matches!(
        err,
        DbError::InvalidJobRunTransition {
            expected_status: "running",
            ..
        }
    ));

    fail_job_run(&pool, run.id, "aborted").await.unwrap();
    let fetched = get_job_run(&pool, run.id).await.unwrap();
    assert_eq!(fetched.status, "failed");
    assert_eq!(fetched.error_message.as_deref(), Some("aborted"));
}

#[sqlx::test(migrations = "../../migrations")]
async fn job_logs_filter_by_job(pool: sqlx::PgPool) {
    for (job, message) in [
        (JobKind::Discovery, "upsert_failed"),
        (JobKind::Enrichment, "fetch_failed"),
    ] {
        insert_job_log(
            &pool,
            &JobLogEntry {
                job,
                level: LogLevel::Error,
                message: message.to_string(),
                payload: json!({ "handle": "anna" }),
                created_at: at(1),
            },
        )
        .await
        .unwrap();
    }

    let logs = list_job_logs(&pool, Some("enrich-websites"), 10)
        .await
        .unwrap();
    assert_eq!(logs.len(), 1);
    assert_eq!(logs[0].message, "fetch_failed");
    assert_eq!(logs[0].payload["handle"], "anna");

    let all = list_job_logs(&pool, None, 10).await.unwrap();
    assert_eq!(all.len(), 2);
}

// ---------------------------------------------------------------------------
// Section 6: Metrics and repository adapter
// ---------------------------------------------------------------------------

#[sqlx::test(migrations = "../../migrations")]
async fn metrics_count_windows_from_now(pool: sqlx::PgPool) {
    let now = at(20);
    let old = upsert_lead(
        &pool,
        &upsert(candidate("old", None), 5, now - Duration::days(10)),
    )
    .await
    .unwrap()
    .lead;
    let recent = upsert_lead(
        &pool,
        &upsert(candidate("recent", None), 5, now - Duration::days(1)),
    )
    .await
    .unwrap()
    .lead;

    apply_lead_patch(
        &pool,
        old.id,
        &LeadPatch {
            status: Some(LeadStatus::Contacted),
            last_status_change_at: Some(now - Duration::days(2)),
            ..LeadPatch::default()
        },
    )
    .await
    .unwrap();
    apply_lead_patch(
        &pool,
        recent.id,
        &LeadPatch {
            status: Some(LeadStatus::Closed),
            last_status_change_at: Some(now - Duration::days(20)),
            ..LeadPatch::default()
        },
    )
    .await
    .unwrap();

    let metrics = lead_metrics(&pool, now).await.unwrap();
    assert_eq!(metrics.total, 2);
    assert_eq!(metrics.discovered_last_7_days, 1);
    assert_eq!(metrics.contacted_last_7_days, 1);
    assert_eq!(metrics.interested_last_7_days, 0);
    assert_eq!(metrics.closed_last_30_days, 1);
    assert_eq!(metrics.by_status.len(), 2);
}

#[sqlx::test(migrations = "../../migrations")]
async fn repository_runs_job_through_lifecycle(pool: sqlx::PgPool) {
    let repo = PgLeadRepository::new(pool.clone());

    let run_id = repo
        .start_job_run(JobKind::Discovery, "cli")
        .await
        .expect("start_job_run failed");
    repo.complete_job_run(run_id, 3)
        .await
        .expect("complete_job_run failed");

    let run = get_job_run(&pool, run_id).await.unwrap();
    assert_eq!(run.status, "succeeded");
    assert_eq!(run.job_name, "discover-leads");

    let lead = repo
        .upsert_lead(&upsert(candidate("anna", None), 5, at(1)))
        .await
        .unwrap()
        .lead;
    let found = get_lead_by_handle(&pool, lead.handle()).await.unwrap();
    assert!(found.is_some());
    assert!(repo.find_by_handle("nobody").await.unwrap().is_none());
}
