use std::collections::HashMap;
use std::future::Future;
use std::time::Duration;

use leadq_core::{
    compute_quality_score, transition_fields, Actor, Candidate, Clock, JobKind, LeadRepository,
    LeadUpsert, LogLevel, NewActivityEvent, SavedLead, SignalSet,
};
use serde_json::json;
use tokio::time::Instant;

use super::{execute, process_groups, RecordFailure, RecordOutcome};
use crate::audit;
use crate::discovery::{DiscoveryConnector, DiscoveryError};
use crate::{JobConfig, JobError, JobReport};

const JOB: JobKind = JobKind::Discovery;

/// Query both discovery sources, then score, upsert and audit every
/// candidate. Re-running with the same input leaves one lead per handle.
///
/// # Errors
///
/// Returns [`JobError`] for invalid config, when every configured source
/// failed, or when job-run bookkeeping cannot be written. Per-record
/// failures are logged and counted in the report instead.
pub async fn run_discovery(
    repo: &dyn LeadRepository,
    connector: &dyn DiscoveryConnector,
    clock: &dyn Clock,
    config: &JobConfig,
    trigger: &str,
) -> Result<JobReport, JobError> {
    execute(repo, clock, JOB, config, trigger, |run_id, deadline| {
        discover_batch(repo, connector, clock, config, run_id, deadline)
    })
    .await
}

async fn discover_batch(
    repo: &dyn LeadRepository,
    connector: &dyn DiscoveryConnector,
    clock: &dyn Clock,
    config: &JobConfig,
    run_id: i64,
    deadline: Instant,
) -> Result<JobReport, JobError> {
    let mut report = JobReport::new(JOB, run_id, clock.now());

    let candidates = fetch_sources(repo, connector, clock, config, &mut report).await?;
    report.selected = candidates.len();

    let (groups, rejected) = group_by_handle(candidates);
    for (raw_handle, error) in rejected {
        tracing::warn!(handle = %raw_handle, error = %error, "rejected discovered candidate");
        audit::job_log(
            repo,
            clock,
            JOB,
            LogLevel::Warn,
            "invalid_candidate",
            json!({ "handle": raw_handle, "error": error }),
        )
        .await;
        report.failed += 1;
    }

    process_groups(groups, config.max_workers, deadline, |candidate| {
        discover_one(repo, clock, candidate)
    })
    .await
    .apply_to(&mut report);

    Ok(report)
}

/// Query both sources concurrently and merge hashtag records before seed
/// records. A failing source contributes nothing; the job fails only when
/// every configured source failed.
async fn fetch_sources(
    repo: &dyn LeadRepository,
    connector: &dyn DiscoveryConnector,
    clock: &dyn Clock,
    config: &JobConfig,
    report: &mut JobReport,
) -> Result<Vec<Candidate>, JobError> {
    let targets = &config.targets;
    let (from_hashtags, from_seeds) = tokio::join!(
        bounded(
            "hashtags",
            config.source_timeout,
            connector.discover_from_hashtags(&targets.hashtags, config.limit_per_source),
        ),
        bounded(
            "seed_accounts",
            config.source_timeout,
            connector.discover_from_seed_accounts(&targets.seed_accounts, config.limit_per_source),
        ),
    );

    let mut candidates = Vec::new();
    let mut configured = 0_usize;
    let mut configured_failures = 0_usize;

    for (source, target_count, result) in [
        ("hashtags", targets.hashtags.len(), from_hashtags),
        ("seed_accounts", targets.seed_accounts.len(), from_seeds),
    ] {
        if target_count > 0 {
            configured += 1;
        }
        match result {
            Ok(found) => {
                tracing::info!(source, targets = target_count, found = found.len(), "discovery source returned");
                candidates.extend(found);
            }
            Err(e) => {
                tracing::warn!(source, error = %e, "discovery source failed");
                audit::job_log(
                    repo,
                    clock,
                    JOB,
                    LogLevel::Error,
                    "source_failed",
                    json!({ "source": source, "error": e.to_string() }),
                )
                .await;
                if target_count > 0 {
                    configured_failures += 1;
                }
                report.sources_failed.push(format!("{source}: {e}"));
            }
        }
    }

    if configured > 0 && configured_failures == configured {
        return Err(JobError::SourcesUnavailable(report.sources_failed.clone()));
    }

    Ok(candidates)
}

async fn bounded<F>(
    source_name: &'static str,
    limit: Duration,
    fetch: F,
) -> Result<Vec<Candidate>, DiscoveryError>
where
    F: Future<Output = Result<Vec<Candidate>, DiscoveryError>>,
{
    tokio::time::timeout(limit, fetch)
        .await
        .unwrap_or(Err(DiscoveryError::Timeout {
            source_name,
            timeout_secs: limit.as_secs(),
        }))
}

/// Normalize handles and group records that share one, keeping first-seen
/// order. Candidates whose handle normalizes to nothing are returned apart.
fn group_by_handle(candidates: Vec<Candidate>) -> (Vec<Vec<Candidate>>, Vec<(String, String)>) {
    let mut groups: Vec<Vec<Candidate>> = Vec::new();
    let mut index: HashMap<String, usize> = HashMap::new();
    let mut rejected = Vec::new();

    for raw in candidates {
        let raw_handle = raw.handle.clone();
        match raw.normalized() {
            Ok(candidate) => match index.get(&candidate.handle) {
                Some(&slot) => groups[slot].push(candidate),
                None => {
                    index.insert(candidate.handle.clone(), groups.len());
                    groups.push(vec![candidate]);
                }
            },
            Err(e) => rejected.push((raw_handle, e.to_string())),
        }
    }

    (groups, rejected)
}

async fn discover_one(
    repo: &dyn LeadRepository,
    clock: &dyn Clock,
    candidate: Candidate,
) -> RecordOutcome {
    let handle = candidate.handle.clone();
    match persist_candidate(repo, clock, candidate).await {
        Ok(()) => RecordOutcome::Processed,
        Err(failure) => {
            tracing::error!(
                handle = %handle,
                lead_id = failure.lead_id,
                error = %failure.error,
                "{}",
                failure.message
            );
            audit::job_log(
                repo,
                clock,
                JOB,
                LogLevel::Error,
                failure.message,
                json!({
                    "handle": handle,
                    "lead_id": failure.lead_id,
                    "error": failure.error.to_string(),
                }),
            )
            .await;
            RecordOutcome::Failed
        }
    }
}

async fn persist_candidate(
    repo: &dyn LeadRepository,
    clock: &dyn Clock,
    candidate: Candidate,
) -> Result<(), RecordFailure> {
    let upsert_failed = |e| RecordFailure::new("upsert_failed", None, e);

    let existing = repo
        .find_by_handle(&candidate.handle)
        .await
        .map_err(upsert_failed)?;
    let now = clock.now();

    // Stored website signals still apply while the website is unchanged.
    let (candidate, website) = match &existing {
        Some(lead) => {
            let merged = candidate.merged_over(&lead.candidate);
            let website = if merged.website_url == lead.candidate.website_url {
                lead.website.clone()
            } else {
                None
            };
            (merged, website)
        }
        None => (candidate, None),
    };

    let mut signals = SignalSet::from_discovery(&candidate);
    if let Some(site) = &website {
        signals = signals.with_website(&site.signals);
    }
    let score = compute_quality_score(&signals, now);

    let SavedLead { lead, transition } = repo
        .upsert_lead(&LeadUpsert {
            candidate,
            quality_score: score,
            scored_enrichment_at: website.map(|site| site.enriched_at),
            seen_at: now,
        })
        .await
        .map_err(upsert_failed)?;

    let lead_id = lead.id;
    let activity_failed = |e| RecordFailure::new("activity_failed", Some(lead_id), e);

    repo.append_activity(&NewActivityEvent::discovered(
        lead_id,
        lead.candidate.source_tag.as_deref(),
        lead.quality_score,
        now,
    ))
    .await
    .map_err(activity_failed)?;

    if let Some((from, to)) = transition {
        repo.append_activity(&NewActivityEvent::status_changed(
            lead_id,
            &Actor::System,
            from,
            transition_fields(to, now),
            now,
        ))
        .await
        .map_err(activity_failed)?;
        tracing::info!(handle = %lead.handle(), %from, %to, score, "lead advanced on discovery");
    }

    tracing::debug!(
        handle = %lead.handle(),
        score = lead.quality_score,
        status = %lead.status,
        "lead discovered"
    );
    Ok(())
}
