use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::{Candidate, CoreError, SignalSet, WebsiteSignals};

/// Review lifecycle of a lead. See [`crate::lifecycle`] for the rules.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LeadStatus {
    New,
    Queued,
    Contacted,
    LoomSent,
    Interested,
    Closed,
    Dead,
}

impl LeadStatus {
    pub const ALL: [LeadStatus; 7] = [
        LeadStatus::New,
        LeadStatus::Queued,
        LeadStatus::Contacted,
        LeadStatus::LoomSent,
        LeadStatus::Interested,
        LeadStatus::Closed,
        LeadStatus::Dead,
    ];

    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            LeadStatus::New => "new",
            LeadStatus::Queued => "queued",
            LeadStatus::Contacted => "contacted",
            LeadStatus::LoomSent => "loom_sent",
            LeadStatus::Interested => "interested",
            LeadStatus::Closed => "closed",
            LeadStatus::Dead => "dead",
        }
    }

    /// `closed` and `dead` end the automatic lifecycle.
    #[must_use]
    pub fn is_terminal(self) -> bool {
        matches!(self, LeadStatus::Closed | LeadStatus::Dead)
    }
}

impl std::fmt::Display for LeadStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for LeadStatus {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        LeadStatus::ALL
            .into_iter()
            .find(|status| status.as_str() == s)
            .ok_or_else(|| CoreError::InvalidStatus(s.to_string()))
    }
}

/// Result of the last successful website enrichment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WebsiteSnapshot {
    pub signals: WebsiteSignals,
    pub page_title: Option<String>,
    pub meta_description: Option<String>,
    pub main_heading: Option<String>,
    pub enriched_at: DateTime<Utc>,
}

/// A candidate under qualification: the discovered fields plus score,
/// lifecycle status and enrichment state.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QualifiedLead {
    pub id: i64,
    #[serde(flatten)]
    pub candidate: Candidate,
    pub quality_score: u8,
    pub status: LeadStatus,
    pub niche_guess: Option<String>,
    pub reason_dead: Option<String>,
    pub last_status_change_at: Option<DateTime<Utc>>,
    pub website: Option<WebsiteSnapshot>,
    pub enrichment_attempts: i32,
    pub last_enrichment_attempt_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl QualifiedLead {
    #[must_use]
    pub fn handle(&self) -> &str {
        &self.candidate.handle
    }

    #[must_use]
    pub fn is_enriched(&self) -> bool {
        self.website.is_some()
    }

    /// Full signal set from everything currently known about the lead.
    #[must_use]
    pub fn signal_set(&self) -> SignalSet {
        let base = SignalSet::from_discovery(&self.candidate);
        match &self.website {
            Some(snapshot) => base.with_website(&snapshot.signals),
            None => base,
        }
    }
}
