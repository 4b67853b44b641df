//! In-process [`LeadRepository`] with the same merge rules as the Postgres
//! implementation. Used for dry runs and by the runner tests.

use std::sync::{Mutex, MutexGuard, PoisonError};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use leadq_core::{
    lifecycle, ActivityEvent, EnrichmentUpdate, JobKind, JobLogEntry, LeadPatch, LeadRepository,
    LeadUpsert, NewActivityEvent, QualifiedLead, RepositoryError, SavedLead,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunState {
    Running,
    Succeeded,
    Failed,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MemoryJobRun {
    pub id: i64,
    pub job: JobKind,
    pub trigger: String,
    pub state: RunState,
    pub processed: usize,
    pub error_message: Option<String>,
}

#[derive(Debug, Default)]
struct State {
    leads: Vec<QualifiedLead>,
    activity: Vec<ActivityEvent>,
    job_logs: Vec<JobLogEntry>,
    job_runs: Vec<MemoryJobRun>,
}

#[derive(Debug, Default)]
pub struct InMemoryLeadRepository {
    state: Mutex<State>,
}

impl InMemoryLeadRepository {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// All leads in insertion order.
    #[must_use]
    pub fn leads(&self) -> Vec<QualifiedLead> {
        self.lock().leads.clone()
    }

    #[must_use]
    pub fn lead(&self, handle: &str) -> Option<QualifiedLead> {
        self.lock()
            .leads
            .iter()
            .find(|lead| lead.handle() == handle)
            .cloned()
    }

    /// All activity events in insertion order.
    #[must_use]
    pub fn activity(&self) -> Vec<ActivityEvent> {
        self.lock().activity.clone()
    }

    #[must_use]
    pub fn job_logs(&self) -> Vec<JobLogEntry> {
        self.lock().job_logs.clone()
    }

    #[must_use]
    pub fn job_runs(&self) -> Vec<MemoryJobRun> {
        self.lock().job_runs.clone()
    }
}

fn lead_mut(state: &mut State, lead_id: i64) -> Result<&mut QualifiedLead, RepositoryError> {
    state
        .leads
        .iter_mut()
        .find(|lead| lead.id == lead_id)
        .ok_or_else(|| RepositoryError::NotFound(format!("lead {lead_id}")))
}

fn run_mut(state: &mut State, run_id: i64) -> Result<&mut MemoryJobRun, RepositoryError> {
    state
        .job_runs
        .iter_mut()
        .find(|run| run.id == run_id)
        .ok_or_else(|| RepositoryError::NotFound(format!("job run {run_id}")))
}

fn next_id(len: usize) -> i64 {
    i64::try_from(len).unwrap_or(i64::MAX - 1) + 1
}

#[async_trait]
impl LeadRepository for InMemoryLeadRepository {
    async fn find_by_handle(
        &self,
        handle: &str,
    ) -> Result<Option<QualifiedLead>, RepositoryError> {
        Ok(self.lead(handle))
    }

    async fn upsert_lead(&self, upsert: &LeadUpsert) -> Result<SavedLead, RepositoryError> {
        let mut state = self.lock();
        let fresh = upsert.candidate.clone();

        if let Some(lead) = state
            .leads
            .iter_mut()
            .find(|lead| lead.candidate.handle == fresh.handle)
        {
            let website_changed =
                fresh.website_url.is_some() && fresh.website_url != lead.candidate.website_url;
            let score_is_current = website_changed
                || lead.website.as_ref().map(|site| site.enriched_at)
                    == upsert.scored_enrichment_at;

            lead.candidate = fresh.merged_over(&lead.candidate);
            let mut transition = None;
            if score_is_current {
                lead.quality_score = upsert.quality_score;
                let decision = lifecycle::on_discovery(Some(lead.status), upsert.quality_score);
                if let Some((from, to)) = decision.transition() {
                    lead.status = to;
                    lead.last_status_change_at = Some(upsert.seen_at);
                    transition = Some((from, to));
                }
            }
            if website_changed {
                lead.website = None;
                lead.enrichment_attempts = 0;
                lead.last_enrichment_attempt_at = None;
            }
            lead.updated_at = upsert.seen_at;
            return Ok(SavedLead {
                lead: lead.clone(),
                transition,
            });
        }

        let lead = QualifiedLead {
            id: next_id(state.leads.len()),
            candidate: fresh,
            quality_score: upsert.quality_score,
            status: lifecycle::initial_status(upsert.quality_score),
            niche_guess: None,
            reason_dead: None,
            last_status_change_at: None,
            website: None,
            enrichment_attempts: 0,
            last_enrichment_attempt_at: None,
            created_at: upsert.seen_at,
            updated_at: upsert.seen_at,
        };
        state.leads.push(lead.clone());
        Ok(SavedLead {
            lead,
            transition: None,
        })
    }

    async fn pending_enrichment(
        &self,
        limit: usize,
    ) -> Result<Vec<QualifiedLead>, RepositoryError> {
        let mut pending: Vec<QualifiedLead> = self
            .lock()
            .leads
            .iter()
            .filter(|lead| lead.candidate.website_url.is_some() && lead.website.is_none())
            .cloned()
            .collect();
        // Never-attempted first, then oldest attempt.
        pending.sort_by_key(|lead| {
            (
                lead.last_enrichment_attempt_at.is_some(),
                lead.last_enrichment_attempt_at,
                lead.id,
            )
        });
        pending.truncate(limit);
        Ok(pending)
    }

    async fn save_enrichment(
        &self,
        lead_id: i64,
        update: &EnrichmentUpdate,
    ) -> Result<Option<SavedLead>, RepositoryError> {
        let mut state = self.lock();
        let Some(lead) = state.leads.iter_mut().find(|lead| lead.id == lead_id) else {
            return Ok(None);
        };
        if lead.website.is_some()
            || lead.candidate.website_url.as_deref() != Some(update.website_url.as_str())
        {
            return Ok(None);
        }

        let at = update.website.enriched_at;
        lead.website = Some(update.website.clone());
        lead.enrichment_attempts += 1;
        lead.last_enrichment_attempt_at = Some(at);
        if update.niche_guess.is_some() {
            lead.niche_guess.clone_from(&update.niche_guess);
        }
        lead.quality_score = update.quality_score;
        let decision = lifecycle::on_enrichment(lead.status, update.quality_score);
        if decision.transition().is_some() {
            lead.status = decision.status();
            lead.last_status_change_at = Some(at);
        }
        lead.updated_at = at;
        Ok(Some(SavedLead {
            lead: lead.clone(),
            transition: decision.transition(),
        }))
    }

    async fn record_enrichment_failure(
        &self,
        lead_id: i64,
        at: DateTime<Utc>,
    ) -> Result<(), RepositoryError> {
        let mut state = self.lock();
        let lead = lead_mut(&mut state, lead_id)?;
        lead.enrichment_attempts += 1;
        lead.last_enrichment_attempt_at = Some(at);
        Ok(())
    }

    async fn apply_patch(
        &self,
        lead_id: i64,
        patch: &LeadPatch,
    ) -> Result<QualifiedLead, RepositoryError> {
        let mut state = self.lock();
        let lead = lead_mut(&mut state, lead_id)?;
        if let Some(status) = patch.status {
            lead.status = status;
        }
        if let Some(at) = patch.last_status_change_at {
            lead.last_status_change_at = Some(at);
            lead.updated_at = at;
        }
        if let Some(reason) = &patch.reason_dead {
            lead.reason_dead.clone_from(reason);
        }
        if let Some(niche) = &patch.niche_guess {
            lead.niche_guess.clone_from(niche);
        }
        Ok(lead.clone())
    }

    async fn append_activity(
        &self,
        event: &NewActivityEvent,
    ) -> Result<ActivityEvent, RepositoryError> {
        let mut state = self.lock();
        lead_mut(&mut state, event.lead_id)?;
        let stored = ActivityEvent {
            id: next_id(state.activity.len()),
            lead_id: event.lead_id,
            kind: event.kind,
            payload: event.payload.clone(),
            created_at: event.created_at,
        };
        state.activity.push(stored.clone());
        Ok(stored)
    }

    async fn list_activity(&self, lead_id: i64) -> Result<Vec<ActivityEvent>, RepositoryError> {
        let mut events: Vec<ActivityEvent> = self
            .lock()
            .activity
            .iter()
            .filter(|event| event.lead_id == lead_id)
            .cloned()
            .collect();
        events.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(b.id.cmp(&a.id)));
        Ok(events)
    }

    async fn record_job_log(&self, entry: &JobLogEntry) -> Result<(), RepositoryError> {
        self.lock().job_logs.push(entry.clone());
        Ok(())
    }

    async fn start_job_run(&self, job: JobKind, trigger: &str) -> Result<i64, RepositoryError> {
        let mut state = self.lock();
        let id = next_id(state.job_runs.len());
        state.job_runs.push(MemoryJobRun {
            id,
            job,
            trigger: trigger.to_string(),
            state: RunState::Running,
            processed: 0,
            error_message: None,
        });
        Ok(id)
    }

    async fn complete_job_run(
        &self,
        run_id: i64,
        processed: usize,
    ) -> Result<(), RepositoryError> {
        let mut state = self.lock();
        let run = run_mut(&mut state, run_id)?;
        run.state = RunState::Succeeded;
        run.processed = processed;
        Ok(())
    }

    async fn fail_job_run(&self, run_id: i64, message: &str) -> Result<(), RepositoryError> {
        let mut state = self.lock();
        let run = run_mut(&mut state, run_id)?;
        run.state = RunState::Failed;
        run.error_message = Some(message.to_string());
        Ok(())
    }
}
