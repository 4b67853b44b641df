//! Lead status rules.
//!
//! ```text
//! new -> queued -> contacted -> loom_sent -> interested -> closed
//!   \________\__________\____________\____________\-----> dead
//! ```
//!
//! Automatic rules only ever move a lead from `new` to `queued`. Manual
//! changes are accepted verbatim, including backward moves and reopening
//! terminal leads. Every [`StatusDecision::Transition`] must be persisted
//! with `last_status_change_at = now` and a `status_changed` activity event.
//!
//! Storage applies the automatic step against the status it holds at write
//! time, so a manual change made while a batch is running always wins.

use crate::LeadStatus;

/// Score at or above which a `new` lead is queued for outreach.
pub const AUTO_QUEUE_SCORE: u8 = 7;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatusDecision {
    /// First status of a freshly created lead. Not a transition.
    Assign(LeadStatus),
    /// Existing status stays as it is.
    Keep(LeadStatus),
    Transition { from: LeadStatus, to: LeadStatus },
}

impl StatusDecision {
    #[must_use]
    pub fn status(self) -> LeadStatus {
        match self {
            StatusDecision::Assign(status) | StatusDecision::Keep(status) => status,
            StatusDecision::Transition { to, .. } => to,
        }
    }

    #[must_use]
    pub fn transition(self) -> Option<(LeadStatus, LeadStatus)> {
        match self {
            StatusDecision::Transition { from, to } => Some((from, to)),
            _ => None,
        }
    }
}

#[must_use]
pub fn auto_queues(score: u8) -> bool {
    score >= AUTO_QUEUE_SCORE
}

#[must_use]
pub fn initial_status(score: u8) -> LeadStatus {
    if auto_queues(score) {
        LeadStatus::Queued
    } else {
        LeadStatus::New
    }
}

/// Status for a discovered candidate. A handle seen for the first time gets
/// its initial status; a re-discovered lead only takes the `new -> queued`
/// step and is otherwise left alone.
#[must_use]
pub fn on_discovery(existing: Option<LeadStatus>, score: u8) -> StatusDecision {
    match existing {
        None => StatusDecision::Assign(initial_status(score)),
        Some(current) => auto_advance(current, score),
    }
}

/// Status after a successful enrichment. Enrichment never regresses or
/// reassigns a status past `new`.
#[must_use]
pub fn on_enrichment(current: LeadStatus, score: u8) -> StatusDecision {
    auto_advance(current, score)
}

/// Explicit status change requested by a person or an external process.
#[must_use]
pub fn manual(current: LeadStatus, requested: LeadStatus) -> StatusDecision {
    StatusDecision::Transition {
        from: current,
        to: requested,
    }
}

fn auto_advance(current: LeadStatus, score: u8) -> StatusDecision {
    if current == LeadStatus::New && auto_queues(score) {
        StatusDecision::Transition {
            from: LeadStatus::New,
            to: LeadStatus::Queued,
        }
    } else {
        StatusDecision::Keep(current)
    }
}
