//! Keyword classifier for fetched lead websites.

use crate::WebsiteSignals;

/// Phrases that indicate the site sells a service or program.
pub const OFFER_KEYWORDS: &[&str] = &[
    "program",
    "coaching",
    "1:1",
    "1-1",
    "consulting",
    "membership",
    "course",
    "mastermind",
    "intensive",
    "done for you",
];

/// Niche / role phrases. Declaration order is the tie-break for
/// [`WebsiteSignals::inferred_niche`]: the first listed term found wins.
pub const NICHE_KEYWORDS: &[&str] = &[
    "coach",
    "consultant",
    "mentor",
    "founder",
    "agency",
    "clinic",
    "lawyer",
    "law firm",
    "dentist",
    "real estate",
    "realtor",
    "saas",
    "software",
    "startup",
];

pub const BOOKING_DOMAINS: &[&str] = &["calendly.com", "tidycal.com", "savvycal.com"];

pub const CHECKOUT_HINTS: &[&str] = &["checkout", "pricing", "plans", "subscribe", "enroll"];

/// Derive website signals from a page.
///
/// `markup` is the raw page source and `text` the visible body text; both
/// must already be lower-cased. Matching is plain substring containment.
#[must_use]
pub fn classify_page(markup: &str, text: &str) -> WebsiteSignals {
    let offer_keywords_detected = contains_any(text, OFFER_KEYWORDS);
    let inferred_niche = NICHE_KEYWORDS
        .iter()
        .find(|term| text.contains(*term))
        .map(|term| (*term).to_string());
    let niche_keywords_detected = inferred_niche.is_some();

    let booking_or_checkout_detected =
        contains_any(markup, BOOKING_DOMAINS) || contains_any(text, CHECKOUT_HINTS);

    // Only a page that mentions its blog and shows no commercial intent.
    let website_looks_non_commercial =
        !offer_keywords_detected && !booking_or_checkout_detected && text.contains("blog");

    WebsiteSignals {
        offer_keywords_detected,
        niche_keywords_detected,
        booking_or_checkout_detected,
        website_looks_non_commercial,
        inferred_niche,
    }
}

fn contains_any(haystack: &str, needles: &[&str]) -> bool {
    needles.iter().any(|needle| haystack.contains(needle))
}
