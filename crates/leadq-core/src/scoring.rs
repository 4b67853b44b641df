//! Lead quality scorer.

use chrono::{DateTime, Duration, Utc};

use crate::SignalSet;

pub const MIN_SCORE: u8 = 0;
pub const MAX_SCORE: u8 = 10;

/// Inclusive follower band that earns the audience bonus.
pub const MIN_FOLLOWERS: i64 = 1_000;
pub const MAX_FOLLOWERS: i64 = 100_000;

const RECENT_ACTIVITY_DAYS: i64 = 30;
const STALE_ACTIVITY_DAYS: i64 = 60;

/// Score a signal set on the `0..=10` scale.
///
/// The rule table is additive and the sum is clamped. Recency is measured
/// against `now`, so the result is a snapshot that must be recomputed when
/// time passes or any signal changes. Missing optional inputs contribute
/// nothing.
#[must_use]
pub fn compute_quality_score(signals: &SignalSet, now: DateTime<Utc>) -> u8 {
    let mut score: i32 = 0;

    if signals.has_website && signals.offer_keywords_detected {
        score += 3;
    }

    if signals.niche_keywords_detected {
        score += 2;
    }

    if let Some(last_activity) = signals.last_activity_at {
        let age = now - last_activity;
        if age <= Duration::days(RECENT_ACTIVITY_DAYS) {
            score += 2;
        } else if age <= Duration::days(STALE_ACTIVITY_DAYS) {
            score += 1;
        }
    }

    if signals
        .follower_count
        .is_some_and(|count| (MIN_FOLLOWERS..=MAX_FOLLOWERS).contains(&count))
    {
        score += 1;
    }

    if signals.booking_or_checkout_detected {
        score += 1;
    }

    if signals.website_looks_non_commercial {
        score -= 2;
    }

    let clamped = score.clamp(i32::from(MIN_SCORE), i32::from(MAX_SCORE));
    u8::try_from(clamped).unwrap_or(MAX_SCORE)
}
