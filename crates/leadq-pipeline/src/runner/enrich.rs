use leadq_core::{
    compute_quality_score, transition_fields, Actor, Clock, EnrichmentUpdate, JobKind,
    LeadRepository, LogLevel, NewActivityEvent, QualifiedLead, SavedLead, SignalSet,
};
use leadq_enrich::{Enricher, FetchOutcome, WebsiteEnrichment};
use serde_json::json;
use tokio::time::Instant;

use super::{execute, process_groups, RecordFailure, RecordOutcome};
use crate::audit;
use crate::{JobConfig, JobError, JobReport};

const JOB: JobKind = JobKind::Enrichment;

/// Fetch and classify the websites of up to `batch_size` unenriched leads,
/// rescore them and apply the automatic `new -> queued` step.
///
/// A lead enriched by an overlapping run, or moved to another website while
/// its fetch was in flight, is counted as skipped and gets no events.
///
/// # Errors
///
/// Returns [`JobError`] for invalid config or when the batch cannot be
/// selected or the job run cannot be written. An unreachable website is
/// logged and counted as unavailable; the rest of the batch continues.
pub async fn run_enrichment(
    repo: &dyn LeadRepository,
    enricher: &dyn Enricher,
    clock: &dyn Clock,
    config: &JobConfig,
    trigger: &str,
) -> Result<JobReport, JobError> {
    execute(repo, clock, JOB, config, trigger, |run_id, deadline| {
        enrich_batch(repo, enricher, clock, config, run_id, deadline)
    })
    .await
}

async fn enrich_batch(
    repo: &dyn LeadRepository,
    enricher: &dyn Enricher,
    clock: &dyn Clock,
    config: &JobConfig,
    run_id: i64,
    deadline: Instant,
) -> Result<JobReport, JobError> {
    let mut report = JobReport::new(JOB, run_id, clock.now());

    let pending = repo.pending_enrichment(config.batch_size).await?;
    report.selected = pending.len();
    if pending.is_empty() {
        tracing::info!(run_id, "no leads pending enrichment");
        return Ok(report);
    }

    let groups = pending.into_iter().map(|lead| vec![lead]).collect();
    process_groups(groups, config.max_workers, deadline, |lead| {
        enrich_one(repo, enricher, clock, lead)
    })
    .await
    .apply_to(&mut report);

    Ok(report)
}

async fn enrich_one(
    repo: &dyn LeadRepository,
    enricher: &dyn Enricher,
    clock: &dyn Clock,
    lead: QualifiedLead,
) -> RecordOutcome {
    let Some(url) = lead.candidate.website_url.clone() else {
        tracing::warn!(lead_id = lead.id, handle = %lead.handle(), "lead has no website");
        audit::job_log(
            repo,
            clock,
            JOB,
            LogLevel::Warn,
            "missing_website",
            json!({ "lead_id": lead.id, "handle": lead.handle() }),
        )
        .await;
        return RecordOutcome::Failed;
    };

    match enricher.enrich(&url).await {
        FetchOutcome::Unavailable(failure) => {
            tracing::warn!(
                lead_id = lead.id,
                handle = %lead.handle(),
                url = %url,
                error = %failure,
                "website unavailable"
            );
            audit::job_log(
                repo,
                clock,
                JOB,
                LogLevel::Error,
                "fetch_failed",
                json!({
                    "lead_id": lead.id,
                    "handle": lead.handle(),
                    "url": url,
                    "kind": failure.kind(),
                    "reason": failure.to_string(),
                }),
            )
            .await;
            if let Err(e) = repo.record_enrichment_failure(lead.id, clock.now()).await {
                tracing::error!(lead_id = lead.id, error = %e, "failed to record enrichment attempt");
                audit::job_log(
                    repo,
                    clock,
                    JOB,
                    LogLevel::Error,
                    "attempt_failed",
                    json!({
                        "lead_id": lead.id,
                        "handle": lead.handle(),
                        "error": e.to_string(),
                    }),
                )
                .await;
            }
            RecordOutcome::Unavailable
        }
        FetchOutcome::Enriched(enrichment) => {
            match persist_enrichment(repo, clock, &lead, &url, enrichment).await {
                Ok(outcome) => outcome,
                Err(failure) => {
                    tracing::error!(
                        lead_id = lead.id,
                        handle = %lead.handle(),
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
                            "lead_id": lead.id,
                            "handle": lead.handle(),
                            "error": failure.error.to_string(),
                        }),
                    )
                    .await;
                    RecordOutcome::Failed
                }
            }
        }
    }
}

async fn persist_enrichment(
    repo: &dyn LeadRepository,
    clock: &dyn Clock,
    lead: &QualifiedLead,
    url: &str,
    enrichment: WebsiteEnrichment,
) -> Result<RecordOutcome, RecordFailure> {
    let now = clock.now();
    let final_url = enrichment.final_url.clone();
    let snapshot = enrichment.into_snapshot(now);

    let score = compute_quality_score(
        &SignalSet::from_discovery(&lead.candidate).with_website(&snapshot.signals),
        now,
    );
    let niche_guess = snapshot
        .signals
        .inferred_niche
        .clone()
        .or_else(|| lead.niche_guess.clone());

    let update = EnrichmentUpdate {
        website_url: url.to_string(),
        website: snapshot,
        niche_guess,
        quality_score: score,
    };
    let saved = repo
        .save_enrichment(lead.id, &update)
        .await
        .map_err(|e| RecordFailure::new("update_failed", Some(lead.id), e))?;
    let Some(SavedLead { lead: saved, transition }) = saved else {
        tracing::info!(
            lead_id = lead.id,
            handle = %lead.handle(),
            url,
            "lead no longer pending enrichment, result dropped"
        );
        return Ok(RecordOutcome::Skipped);
    };

    let activity_failed = |e| RecordFailure::new("activity_failed", Some(lead.id), e);
    repo.append_activity(&NewActivityEvent::enriched(
        lead.id,
        url,
        &update.website,
        score,
    ))
    .await
    .map_err(activity_failed)?;

    if let Some((from, to)) = transition {
        repo.append_activity(&NewActivityEvent::status_changed(
            lead.id,
            &Actor::System,
            from,
            transition_fields(to, now),
            now,
        ))
        .await
        .map_err(activity_failed)?;
        tracing::info!(handle = %saved.handle(), %from, %to, score, "lead advanced on enrichment");
    }

    tracing::debug!(
        handle = %saved.handle(),
        url = %final_url,
        score,
        niche = ?saved.niche_guess,
        "lead enriched"
    );
    Ok(RecordOutcome::Processed)
}
