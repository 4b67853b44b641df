use std::collections::HashSet;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::{AppConfig, ConfigError};

/// Optional YAML file listing discovery targets.
///
/// ```yaml
/// hashtags:
///   - businesscoach
///   - "#saasfounder"
/// seed_accounts:
///   - "@anna.coach"
/// ```
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct TargetsFile {
    #[serde(default)]
    pub hashtags: Vec<String>,
    #[serde(default)]
    pub seed_accounts: Vec<String>,
}

/// Normalized hashtags and seed accounts a discovery run queries.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DiscoveryTargets {
    pub hashtags: Vec<String>,
    pub seed_accounts: Vec<String>,
}

impl DiscoveryTargets {
    /// Merge env-provided lists with the targets file (if configured).
    /// Env entries come first; duplicates across the two are dropped.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if the targets file cannot be loaded.
    pub fn resolve(config: &AppConfig) -> Result<Self, ConfigError> {
        let file = match &config.targets_path {
            Some(path) => load_targets(path)?,
            None => TargetsFile::default(),
        };

        Ok(Self {
            hashtags: dedupe(
                config
                    .target_hashtags
                    .iter()
                    .chain(&file.hashtags)
                    .map(|t| normalize_target(t, '#')),
            ),
            seed_accounts: dedupe(
                config
                    .seed_usernames
                    .iter()
                    .chain(&file.seed_accounts)
                    .map(|t| normalize_target(t, '@')),
            ),
        })
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.hashtags.is_empty() && self.seed_accounts.is_empty()
    }
}

/// Load and validate a targets file.
///
/// # Errors
///
/// Returns `ConfigError` if the file cannot be read, parsed, or fails validation.
pub fn load_targets(path: &Path) -> Result<TargetsFile, ConfigError> {
    let content = std::fs::read_to_string(path).map_err(|e| ConfigError::TargetsFileIo {
        path: path.display().to_string(),
        source: e,
    })?;

    let targets: TargetsFile = serde_yaml::from_str(&content)?;
    validate_targets(&targets)?;
    Ok(targets)
}

fn validate_targets(targets: &TargetsFile) -> Result<(), ConfigError> {
    check_list("hashtag", &targets.hashtags, '#')?;
    check_list("seed account", &targets.seed_accounts, '@')
}

fn check_list(label: &str, entries: &[String], sigil: char) -> Result<(), ConfigError> {
    let mut seen = HashSet::new();
    for entry in entries {
        let normalized = normalize_target(entry, sigil);
        if normalized.is_empty() {
            return Err(ConfigError::Validation(format!(
                "{label} entries must be non-empty"
            )));
        }
        if !seen.insert(normalized.clone()) {
            return Err(ConfigError::Validation(format!(
                "duplicate {label}: '{normalized}'"
            )));
        }
    }
    Ok(())
}

fn normalize_target(raw: &str, sigil: char) -> String {
    raw.trim().trim_start_matches(sigil).trim().to_lowercase()
}

fn dedupe(items: impl Iterator<Item = String>) -> Vec<String> {
    let mut seen = HashSet::new();
    items
        .filter(|item| !item.is_empty() && seen.insert(item.clone()))
        .collect()
}
