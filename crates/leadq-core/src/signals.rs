use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::Candidate;

/// Inputs to [`crate::compute_quality_score`].
///
/// Always fully populated: anything not yet known is `false` or `None`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct SignalSet {
    pub has_website: bool,
    pub offer_keywords_detected: bool,
    pub niche_keywords_detected: bool,
    pub last_activity_at: Option<DateTime<Utc>>,
    pub follower_count: Option<i64>,
    pub booking_or_checkout_detected: bool,
    pub website_looks_non_commercial: bool,
}

/// Signals derived from a fetched website by [`crate::classify_page`].
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct WebsiteSignals {
    pub offer_keywords_detected: bool,
    pub niche_keywords_detected: bool,
    pub booking_or_checkout_detected: bool,
    pub website_looks_non_commercial: bool,
    pub inferred_niche: Option<String>,
}

impl SignalSet {
    /// Signal set available at discovery time. Website-derived signals stay
    /// at their unknown values until enrichment runs.
    #[must_use]
    pub fn from_discovery(candidate: &Candidate) -> Self {
        Self {
            has_website: candidate.has_website(),
            last_activity_at: candidate.last_activity_at,
            follower_count: candidate.follower_count,
            ..Self::default()
        }
    }

    /// Overlay website-derived signals onto discovery signals. A successful
    /// fetch implies the lead has a website.
    #[must_use]
    pub fn with_website(self, website: &WebsiteSignals) -> Self {
        Self {
            has_website: true,
            offer_keywords_detected: website.offer_keywords_detected,
            niche_keywords_detected: website.niche_keywords_detected,
            booking_or_checkout_detected: website.booking_or_checkout_detected,
            website_looks_non_commercial: website.website_looks_non_commercial,
            ..self
        }
    }
}
