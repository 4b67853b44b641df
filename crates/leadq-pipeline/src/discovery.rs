//! Discovery connectors: producers of raw candidate accounts.
//!
//! The pipeline talks to one [`DiscoveryConnector`] with two named sources,
//! hashtag search and seed-account expansion. Scraping a social network is
//! out of scope; the connectors here either return nothing or replay a JSON
//! export captured by an external scraper.

use std::collections::HashMap;
use std::path::Path;

use async_trait::async_trait;
use leadq_core::{AppConfig, Candidate};
use serde::Deserialize;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum DiscoveryError {
    #[error("failed to read discovery snapshot {path}: {source}")]
    SnapshotIo {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse discovery snapshot {path}: {source}")]
    SnapshotParse {
        path: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("{source_name} source timed out after {timeout_secs}s")]
    Timeout {
        source_name: &'static str,
        timeout_secs: u64,
    },

    #[error("{source_name} source unavailable: {reason}")]
    Unavailable { source_name: String, reason: String },
}

#[async_trait]
pub trait DiscoveryConnector: Send + Sync {
    /// Accounts found under each hashtag, at most `limit_per_hashtag` per tag.
    /// An empty `hashtags` slice yields an empty list.
    async fn discover_from_hashtags(
        &self,
        hashtags: &[String],
        limit_per_hashtag: usize,
    ) -> Result<Vec<Candidate>, DiscoveryError>;

    /// Accounts related to each seed account, at most `limit_per_seed` per
    /// seed. An empty `usernames` slice yields an empty list.
    async fn discover_from_seed_accounts(
        &self,
        usernames: &[String],
        limit_per_seed: usize,
    ) -> Result<Vec<Candidate>, DiscoveryError>;
}

/// Connector used when no discovery backend is configured.
#[derive(Debug, Clone, Copy, Default)]
pub struct UnconfiguredConnector;

#[async_trait]
impl DiscoveryConnector for UnconfiguredConnector {
    async fn discover_from_hashtags(
        &self,
        hashtags: &[String],
        _limit_per_hashtag: usize,
    ) -> Result<Vec<Candidate>, DiscoveryError> {
        if !hashtags.is_empty() {
            tracing::debug!(count = hashtags.len(), "no discovery backend; hashtags ignored");
        }
        Ok(Vec::new())
    }

    async fn discover_from_seed_accounts(
        &self,
        usernames: &[String],
        _limit_per_seed: usize,
    ) -> Result<Vec<Candidate>, DiscoveryError> {
        if !usernames.is_empty() {
            tracing::debug!(count = usernames.len(), "no discovery backend; seeds ignored");
        }
        Ok(Vec::new())
    }
}

/// JSON export of scraped accounts, keyed by the hashtag or seed account
/// they were found under:
///
/// ```json
/// {
///   "hashtags": { "businesscoach": [{ "username": "anna.coach", "followers_count": 4200 }] },
///   "seed_accounts": { "mentor.mo": [{ "username": "sam.builds" }] }
/// }
/// ```
#[derive(Debug, Clone, Default, Deserialize)]
pub struct DiscoverySnapshot {
    #[serde(default)]
    pub hashtags: HashMap<String, Vec<Candidate>>,
    #[serde(default)]
    pub seed_accounts: HashMap<String, Vec<Candidate>>,
}

/// Replays a [`DiscoverySnapshot`]. Records without a source tag get
/// `hashtag:<tag>` or `seed:<username>`.
#[derive(Debug, Clone, Default)]
pub struct SnapshotConnector {
    hashtags: HashMap<String, Vec<Candidate>>,
    seed_accounts: HashMap<String, Vec<Candidate>>,
}

impl SnapshotConnector {
    #[must_use]
    pub fn new(snapshot: DiscoverySnapshot) -> Self {
        Self {
            hashtags: normalize_keys(snapshot.hashtags, '#'),
            seed_accounts: normalize_keys(snapshot.seed_accounts, '@'),
        }
    }

    /// # Errors
    ///
    /// Returns [`DiscoveryError::SnapshotIo`] or
    /// [`DiscoveryError::SnapshotParse`] if the file cannot be loaded.
    pub fn from_path(path: &Path) -> Result<Self, DiscoveryError> {
        let display = path.display().to_string();
        let raw = std::fs::read_to_string(path).map_err(|source| DiscoveryError::SnapshotIo {
            path: display.clone(),
            source,
        })?;
        let snapshot: DiscoverySnapshot =
            serde_json::from_str(&raw).map_err(|source| DiscoveryError::SnapshotParse {
                path: display,
                source,
            })?;
        Ok(Self::new(snapshot))
    }

    fn lookup(
        table: &HashMap<String, Vec<Candidate>>,
        keys: &[String],
        limit: usize,
        tag_prefix: &str,
    ) -> Vec<Candidate> {
        keys.iter()
            .flat_map(|key| {
                table
                    .get(key.as_str())
                    .into_iter()
                    .flatten()
                    .take(limit)
                    .map(move |candidate| {
                        let mut candidate = candidate.clone();
                        if candidate.source_tag.is_none() {
                            candidate.source_tag = Some(format!("{tag_prefix}:{key}"));
                        }
                        candidate
                    })
            })
            .collect()
    }
}

#[async_trait]
impl DiscoveryConnector for SnapshotConnector {
    async fn discover_from_hashtags(
        &self,
        hashtags: &[String],
        limit_per_hashtag: usize,
    ) -> Result<Vec<Candidate>, DiscoveryError> {
        Ok(Self::lookup(
            &self.hashtags,
            hashtags,
            limit_per_hashtag,
            "hashtag",
        ))
    }

    async fn discover_from_seed_accounts(
        &self,
        usernames: &[String],
        limit_per_seed: usize,
    ) -> Result<Vec<Candidate>, DiscoveryError> {
        Ok(Self::lookup(
            &self.seed_accounts,
            usernames,
            limit_per_seed,
            "seed",
        ))
    }
}

/// Connector selected by configuration: the snapshot replay when a snapshot
/// path is set, otherwise the empty connector.
///
/// # Errors
///
/// Returns [`DiscoveryError`] if the configured snapshot cannot be loaded.
pub fn connector_from_config(
    config: &AppConfig,
) -> Result<Box<dyn DiscoveryConnector>, DiscoveryError> {
    match &config.discovery_snapshot_path {
        Some(path) => {
            tracing::info!(path = %path.display(), "discovering from snapshot");
            Ok(Box::new(SnapshotConnector::from_path(path)?))
        }
        None => {
            tracing::warn!("LEADQ_DISCOVERY_SNAPSHOT_PATH not set; discovery returns no candidates");
            Ok(Box::new(UnconfiguredConnector))
        }
    }
}

fn normalize_keys(
    table: HashMap<String, Vec<Candidate>>,
    sigil: char,
) -> HashMap<String, Vec<Candidate>> {
    let mut normalized: HashMap<String, Vec<Candidate>> = HashMap::with_capacity(table.len());
    for (key, candidates) in table {
        let key = key.trim().trim_start_matches(sigil).to_lowercase();
        normalized.entry(key).or_default().extend(candidates);
    }
    normalized
}

#[cfg(test)]
mod tests {
    use super::*;

    fn snapshot() -> SnapshotConnector {
        let raw = serde_json::json!({
            "hashtags": {
                "#BusinessCoach": [
                    { "username": "anna.coach" },
                    { "username": "bo.consults", "source_tag": "hashtag:custom" },
                    { "username": "third" }
                ],
                "saasfounder": [{ "username": "sam.builds" }]
            },
            "seed_accounts": {
                "@mentor.mo": [{ "username": "kai" }]
            }
        });
        SnapshotConnector::new(serde_json::from_value(raw).unwrap())
    }

    #[tokio::test]
    async fn hashtags_are_limited_per_tag_and_kept_in_request_order() {
        let connector = snapshot();
        let found = connector
            .discover_from_hashtags(&["saasfounder".to_string(), "businesscoach".to_string()], 2)
            .await
            .unwrap();

        let handles: Vec<_> = found.iter().map(|c| c.handle.as_str()).collect();
        assert_eq!(handles, vec!["sam.builds", "anna.coach", "bo.consults"]);
        assert_eq!(found[0].source_tag.as_deref(), Some("hashtag:saasfounder"));
        assert_eq!(found[2].source_tag.as_deref(), Some("hashtag:custom"));
    }

    #[tokio::test]
    async fn seeds_get_seed_source_tag() {
        let found = snapshot()
            .discover_from_seed_accounts(&["mentor.mo".to_string()], 20)
            .await
            .unwrap();
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].source_tag.as_deref(), Some("seed:mentor.mo"));
    }

    #[tokio::test]
    async fn empty_inputs_and_unknown_keys_yield_nothing() {
        let connector = snapshot();
        assert!(connector
            .discover_from_hashtags(&[], 20)
            .await
            .unwrap()
            .is_empty());
        assert!(connector
            .discover_from_seed_accounts(&["nobody".to_string()], 20)
            .await
            .unwrap()
            .is_empty());
    }

    #[tokio::test]
    async fn unconfigured_connector_is_empty_not_an_error() {
        let connector = UnconfiguredConnector;
        let tags = connector
            .discover_from_hashtags(&["coach".to_string()], 20)
            .await
            .unwrap();
        assert!(tags.is_empty());
    }

    #[test]
    fn missing_snapshot_file_is_io_error() {
        let result = SnapshotConnector::from_path(Path::new("/no/such/snapshot.json"));
        assert!(matches!(result, Err(DiscoveryError::SnapshotIo { .. })));
    }
}
