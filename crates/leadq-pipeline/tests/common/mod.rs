#![allow(dead_code)]

use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Duration as ChronoDuration, TimeZone, Utc};
use leadq_core::{
    ActivityEvent, Actor, Candidate, DiscoveryTargets, EnrichmentUpdate, FixedClock, JobKind,
    JobLogEntry, LeadPatch, LeadRepository, LeadStatus, LeadUpsert, NewActivityEvent,
    QualifiedLead, RepositoryError, SavedLead, WebsiteSignals,
};
use leadq_enrich::{Enricher, FetchFailure, FetchOutcome, WebsiteEnrichment};
use leadq_pipeline::{
    update_lead, DiscoveryConnector, DiscoveryError, InMemoryLeadRepository, JobConfig,
    LeadUpdate,
};

pub fn now() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2026, 10, 18, 12, 0, 0).unwrap()
}

pub fn clock() -> FixedClock {
    FixedClock(now())
}

/// Active account with a website, 5000 followers, posted 10 days ago.
/// Scores 3 at discovery.
pub fn active_candidate(handle: &str) -> Candidate {
    Candidate {
        website_url: Some(format!("https://{handle}.example")),
        follower_count: Some(5_000),
        last_activity_at: Some(now() - ChronoDuration::days(10)),
        ..Candidate::new(handle)
    }
}

pub fn config(hashtags: &[&str], seeds: &[&str]) -> JobConfig {
    JobConfig {
        targets: DiscoveryTargets {
            hashtags: hashtags.iter().map(ToString::to_string).collect(),
            seed_accounts: seeds.iter().map(ToString::to_string).collect(),
        },
        ..JobConfig::default()
    }
}

/// Full commercial signals: offer, niche and a booking link.
pub fn coaching_site() -> WebsiteSignals {
    WebsiteSignals {
        offer_keywords_detected: true,
        niche_keywords_detected: true,
        booking_or_checkout_detected: true,
        website_looks_non_commercial: false,
        inferred_niche: Some("coach".to_string()),
    }
}

/// Connector with canned per-source results. `None` makes that source fail.
pub struct FakeConnector {
    pub hashtags: Option<Vec<Candidate>>,
    pub seeds: Option<Vec<Candidate>>,
    pub hashtag_delay: Duration,
}

impl FakeConnector {
    pub fn new(hashtags: Vec<Candidate>, seeds: Vec<Candidate>) -> Self {
        Self {
            hashtags: Some(hashtags),
            seeds: Some(seeds),
            hashtag_delay: Duration::ZERO,
        }
    }

    pub fn failing() -> Self {
        Self {
            hashtags: None,
            seeds: None,
            hashtag_delay: Duration::ZERO,
        }
    }
}

fn canned(
    source_name: &str,
    records: Option<&Vec<Candidate>>,
) -> Result<Vec<Candidate>, DiscoveryError> {
    records.cloned().ok_or_else(|| DiscoveryError::Unavailable {
        source_name: source_name.to_string(),
        reason: "connection refused".to_string(),
    })
}

#[async_trait]
impl DiscoveryConnector for FakeConnector {
    async fn discover_from_hashtags(
        &self,
        _hashtags: &[String],
        _limit: usize,
    ) -> Result<Vec<Candidate>, DiscoveryError> {
        if !self.hashtag_delay.is_zero() {
            tokio::time::sleep(self.hashtag_delay).await;
        }
        canned("hashtags", self.hashtags.as_ref())
    }

    async fn discover_from_seed_accounts(
        &self,
        _usernames: &[String],
        _limit: usize,
    ) -> Result<Vec<Candidate>, DiscoveryError> {
        canned("seed_accounts", self.seeds.as_ref())
    }
}

/// Enricher returning the same signals for every URL after `delay`.
pub struct StaticEnricher {
    pub signals: WebsiteSignals,
    pub delay: Duration,
}

impl StaticEnricher {
    pub fn new(signals: WebsiteSignals) -> Self {
        Self {
            signals,
            delay: Duration::ZERO,
        }
    }
}

#[async_trait]
impl Enricher for StaticEnricher {
    async fn enrich(&self, url: &str) -> FetchOutcome {
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
        FetchOutcome::Enriched(site(url, &self.signals))
    }
}

fn site(url: &str, signals: &WebsiteSignals) -> WebsiteEnrichment {
    WebsiteEnrichment {
        final_url: url.to_string(),
        page_title: Some("Home".to_string()),
        meta_description: None,
        main_heading: Some("Coaching for founders".to_string()),
        signals: signals.clone(),
    }
}

/// Enricher whose website never answers.
pub struct DownEnricher;

#[async_trait]
impl Enricher for DownEnricher {
    async fn enrich(&self, _url: &str) -> FetchOutcome {
        FetchOutcome::Unavailable(FetchFailure::Status { status: 503 })
    }
}

/// Enricher during whose fetch an operator marks the lead as contacted.
pub struct ContactedDuringFetch<'a> {
    pub repo: &'a InMemoryLeadRepository,
    pub handle: String,
    pub signals: WebsiteSignals,
}

#[async_trait]
impl Enricher for ContactedDuringFetch<'_> {
    async fn enrich(&self, url: &str) -> FetchOutcome {
        update_lead(
            self.repo,
            &clock(),
            &self.handle,
            &LeadUpdate {
                status: Some(LeadStatus::Contacted),
                ..LeadUpdate::default()
            },
            &Actor::Operator("ops".to_string()),
        )
        .await
        .expect("operator update");
        FetchOutcome::Enriched(site(url, &self.signals))
    }
}

/// Wraps the in-memory repository and injects storage failures.
pub struct FlakyRepository {
    pub inner: InMemoryLeadRepository,
    /// Every upsert for this handle fails.
    pub failing_handle: String,
    /// Recording a failed fetch attempt fails.
    pub failing_attempts: bool,
    /// Pending leads come back without their website URL.
    pub pending_without_website: bool,
}

impl FlakyRepository {
    pub fn failing_on(handle: &str) -> Self {
        Self {
            failing_handle: handle.to_string(),
            ..Self::healthy()
        }
    }

    pub fn healthy() -> Self {
        Self {
            inner: InMemoryLeadRepository::new(),
            failing_handle: String::new(),
            failing_attempts: false,
            pending_without_website: false,
        }
    }
}

#[derive(Debug, thiserror::Error)]
#[error("connection reset by peer")]
pub struct ConnectionReset;

#[async_trait]
impl LeadRepository for FlakyRepository {
    async fn find_by_handle(
        &self,
        handle: &str,
    ) -> Result<Option<QualifiedLead>, RepositoryError> {
        self.inner.find_by_handle(handle).await
    }

    async fn upsert_lead(&self, lead: &LeadUpsert) -> Result<SavedLead, RepositoryError> {
        if lead.candidate.handle == self.failing_handle {
            return Err(RepositoryError::backend(ConnectionReset));
        }
        self.inner.upsert_lead(lead).await
    }

    async fn pending_enrichment(
        &self,
        limit: usize,
    ) -> Result<Vec<QualifiedLead>, RepositoryError> {
        let mut pending = self.inner.pending_enrichment(limit).await?;
        if self.pending_without_website {
            for lead in &mut pending {
                lead.candidate.website_url = None;
            }
        }
        Ok(pending)
    }

    async fn save_enrichment(
        &self,
        lead_id: i64,
        update: &EnrichmentUpdate,
    ) -> Result<Option<SavedLead>, RepositoryError> {
        self.inner.save_enrichment(lead_id, update).await
    }

    async fn record_enrichment_failure(
        &self,
        lead_id: i64,
        at: DateTime<Utc>,
    ) -> Result<(), RepositoryError> {
        if self.failing_attempts {
            return Err(RepositoryError::backend(ConnectionReset));
        }
        self.inner.record_enrichment_failure(lead_id, at).await
    }

    async fn apply_patch(
        &self,
        lead_id: i64,
        patch: &LeadPatch,
    ) -> Result<QualifiedLead, RepositoryError> {
        self.inner.apply_patch(lead_id, patch).await
    }

    async fn append_activity(
        &self,
        event: &NewActivityEvent,
    ) -> Result<ActivityEvent, RepositoryError> {
        self.inner.append_activity(event).await
    }

    async fn list_activity(&self, lead_id: i64) -> Result<Vec<ActivityEvent>, RepositoryError> {
        self.inner.list_activity(lead_id).await
    }

    async fn record_job_log(&self, entry: &JobLogEntry) -> Result<(), RepositoryError> {
        self.inner.record_job_log(entry).await
    }

    async fn start_job_run(&self, job: JobKind, trigger: &str) -> Result<i64, RepositoryError> {
        self.inner.start_job_run(job, trigger).await
    }

    async fn complete_job_run(
        &self,
        run_id: i64,
        processed: usize,
    ) -> Result<(), RepositoryError> {
        self.inner.complete_job_run(run_id, processed).await
    }

    async fn fail_job_run(&self, run_id: i64, message: &str) -> Result<(), RepositoryError> {
        self.inner.fail_job_run(run_id, message).await
    }
}
