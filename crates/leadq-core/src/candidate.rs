use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::CoreError;

/// A discovered account, as produced by a discovery connector.
///
/// Field aliases accept the snake-case export format used by account
/// scrapers (`username`, `full_name`, `followers_count`, `last_post_at`).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Candidate {
    #[serde(alias = "username")]
    pub handle: String,
    #[serde(default, alias = "full_name")]
    pub display_name: Option<String>,
    #[serde(default)]
    pub bio: Option<String>,
    #[serde(default)]
    pub website_url: Option<String>,
    #[serde(default, alias = "followers_count")]
    pub follower_count: Option<i64>,
    #[serde(default)]
    pub following_count: Option<i64>,
    #[serde(default)]
    pub is_business: Option<bool>,
    #[serde(default, alias = "last_post_at")]
    pub last_activity_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub source_tag: Option<String>,
}

impl Candidate {
    /// Minimal candidate with only a handle set. Handy for connectors that
    /// fill the rest field by field.
    #[must_use]
    pub fn new(handle: impl Into<String>) -> Self {
        Self {
            handle: handle.into(),
            display_name: None,
            bio: None,
            website_url: None,
            follower_count: None,
            following_count: None,
            is_business: None,
            last_activity_at: None,
            source_tag: None,
        }
    }

    /// Returns the candidate with its handle normalized and blank optional
    /// strings collapsed to `None`.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::EmptyHandle`] when nothing is left of the handle
    /// after normalization.
    pub fn normalized(mut self) -> Result<Self, CoreError> {
        self.handle = normalize_handle(&self.handle);
        if self.handle.is_empty() {
            return Err(CoreError::EmptyHandle);
        }
        self.display_name = non_blank(self.display_name);
        self.bio = non_blank(self.bio);
        self.website_url = non_blank(self.website_url);
        self.source_tag = non_blank(self.source_tag);
        Ok(self)
    }

    /// Merge a fresh sighting over a stored record: fields present in `self`
    /// win, fields missing from `self` keep the stored value.
    #[must_use]
    pub fn merged_over(self, stored: &Candidate) -> Candidate {
        Candidate {
            handle: self.handle,
            display_name: self.display_name.or_else(|| stored.display_name.clone()),
            bio: self.bio.or_else(|| stored.bio.clone()),
            website_url: self.website_url.or_else(|| stored.website_url.clone()),
            follower_count: self.follower_count.or(stored.follower_count),
            following_count: self.following_count.or(stored.following_count),
            is_business: self.is_business.or(stored.is_business),
            last_activity_at: self.last_activity_at.or(stored.last_activity_at),
            source_tag: self.source_tag.or_else(|| stored.source_tag.clone()),
        }
    }

    #[must_use]
    pub fn has_website(&self) -> bool {
        self.website_url
            .as_deref()
            .is_some_and(|url| !url.trim().is_empty())
    }
}

/// Canonical form of an account handle: trimmed, without a leading `@`,
/// lower-cased. Two handles that normalize equal are the same lead.
#[must_use]
pub fn normalize_handle(raw: &str) -> String {
    raw.trim().trim_start_matches('@').trim().to_lowercase()
}

fn non_blank(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalize_handle_strips_at_and_lowercases() {
        assert_eq!(normalize_handle("  @CoachAnna "), "coachanna");
        assert_eq!(normalize_handle("plain"), "plain");
    }

    #[test]
    fn normalized_rejects_blank_handle() {
        let result = Candidate::new(" @ ").normalized();
        assert!(matches!(result, Err(CoreError::EmptyHandle)));
    }

    #[test]
    fn normalized_collapses_blank_website() {
        let mut candidate = Candidate::new("anna");
        candidate.website_url = Some("   ".to_string());
        let candidate = candidate.normalized().unwrap();
        assert!(candidate.website_url.is_none());
        assert!(!candidate.has_website());
    }

    #[test]
    fn merged_over_keeps_stored_values_for_missing_fields() {
        let mut stored = Candidate::new("anna");
        stored.bio = Some("coach".to_string());
        stored.follower_count = Some(5_000);
        stored.website_url = Some("https://old.example".to_string());

        let mut fresh = Candidate::new("anna");
        fresh.follower_count = Some(6_000);
        fresh.website_url = Some("https://new.example".to_string());

        let merged = fresh.merged_over(&stored);
        assert_eq!(merged.bio.as_deref(), Some("coach"));
        assert_eq!(merged.follower_count, Some(6_000));
        assert_eq!(merged.website_url.as_deref(), Some("https://new.example"));
    }

    #[test]
    fn deserializes_scraper_export_field_names() {
        let raw = serde_json::json!({
            "username": "anna.coach",
            "full_name": "Anna",
            "website_url": "https://anna.example",
            "followers_count": 4200,
            "last_post_at": "2026-10-01T12:00:00Z",
            "source_tag": "hashtag:businesscoach"
        });
        let candidate: Candidate = serde_json::from_value(raw).unwrap();
        assert_eq!(candidate.handle, "anna.coach");
        assert_eq!(candidate.display_name.as_deref(), Some("Anna"));
        assert_eq!(candidate.follower_count, Some(4200));
        assert!(candidate.last_activity_at.is_some());
        assert!(candidate.bio.is_none());
    }
}
