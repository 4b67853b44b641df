mod common;

use chrono::Duration;
use common::{active_candidate, clock, config, now, FakeConnector};
use leadq_core::{ActivityKind, Actor, FixedClock, LeadStatus};
use leadq_pipeline::{
    lead_detail, run_discovery, update_lead, InMemoryLeadRepository, LeadUpdate, ReviewError,
};

async fn seeded() -> InMemoryLeadRepository {
    let repo = InMemoryLeadRepository::new();
    let connector = FakeConnector::new(vec![active_candidate("anna")], vec![]);
    run_discovery(&repo, &connector, &clock(), &config(&["coach"], &[]), "test")
        .await
        .unwrap();
    repo
}

fn operator() -> Actor {
    Actor::Operator("ops@example.com".to_string())
}

#[tokio::test]
async fn manual_status_change_is_stamped_and_audited() {
    let repo = seeded().await;
    let later = FixedClock(now() + Duration::hours(2));

    let lead = update_lead(
        &repo,
        &later,
        "@Anna",
        &LeadUpdate {
            status: Some(LeadStatus::Contacted),
            niche_guess: Some(Some("coach".to_string())),
            ..LeadUpdate::default()
        },
        &operator(),
    )
    .await
    .unwrap();

    assert_eq!(lead.status, LeadStatus::Contacted);
    assert_eq!(lead.niche_guess.as_deref(), Some("coach"));
    assert_eq!(lead.last_status_change_at, Some(later.0));

    let event = repo.activity().pop().unwrap();
    assert_eq!(event.kind, ActivityKind::StatusChanged);
    assert_eq!(event.payload["actor"], "ops@example.com");
    assert_eq!(event.payload["from"], "new");
    assert_eq!(event.payload["fields"]["status"], "contacted");
    assert_eq!(event.payload["fields"]["niche_guess"], "coach");
}

#[tokio::test]
async fn dead_without_reason_is_accepted() {
    let repo = seeded().await;

    let lead = update_lead(
        &repo,
        &clock(),
        "anna",
        &LeadUpdate {
            status: Some(LeadStatus::Dead),
            ..LeadUpdate::default()
        },
        &operator(),
    )
    .await
    .unwrap();

    assert_eq!(lead.status, LeadStatus::Dead);
    assert!(lead.reason_dead.is_none());
}

#[tokio::test]
async fn terminal_leads_can_be_reopened_manually() {
    let repo = seeded().await;
    let dead = LeadUpdate {
        status: Some(LeadStatus::Dead),
        reason_dead: Some(Some("no reply".to_string())),
        ..LeadUpdate::default()
    };
    update_lead(&repo, &clock(), "anna", &dead, &operator())
        .await
        .unwrap();

    let reopened = update_lead(
        &repo,
        &clock(),
        "anna",
        &LeadUpdate {
            status: Some(LeadStatus::Queued),
            reason_dead: Some(None),
            ..LeadUpdate::default()
        },
        &operator(),
    )
    .await
    .unwrap();

    assert_eq!(reopened.status, LeadStatus::Queued);
    assert!(reopened.reason_dead.is_none());
}

#[tokio::test]
async fn unknown_handle_and_empty_update_are_rejected() {
    let repo = seeded().await;
    let update = LeadUpdate {
        status: Some(LeadStatus::Queued),
        ..LeadUpdate::default()
    };

    let missing = update_lead(&repo, &clock(), "nobody", &update, &operator()).await;
    assert!(matches!(missing, Err(ReviewError::NotFound(ref h)) if h == "nobody"));

    let empty = update_lead(&repo, &clock(), "anna", &LeadUpdate::default(), &operator()).await;
    assert!(matches!(empty, Err(ReviewError::EmptyUpdate)));
}

#[tokio::test]
async fn detail_lists_activity_newest_first() {
    let repo = seeded().await;
    let later = FixedClock(now() + Duration::days(1));
    update_lead(
        &repo,
        &later,
        "anna",
        &LeadUpdate {
            status: Some(LeadStatus::Queued),
            ..LeadUpdate::default()
        },
        &operator(),
    )
    .await
    .unwrap();

    let detail = lead_detail(&repo, "anna").await.unwrap();

    assert_eq!(detail.lead.handle(), "anna");
    let kinds: Vec<_> = detail.activity.iter().map(|e| e.kind).collect();
    assert_eq!(
        kinds,
        vec![ActivityKind::StatusChanged, ActivityKind::Discovered]
    );
}
