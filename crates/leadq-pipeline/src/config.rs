use std::time::Duration;

use leadq_core::{AppConfig, ConfigError, DiscoveryTargets};

use crate::JobError;

/// Explicit settings for one job invocation. Built once at the edge from
/// [`AppConfig`] and passed into the runners.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JobConfig {
    pub targets: DiscoveryTargets,
    pub limit_per_source: usize,
    pub batch_size: usize,
    pub max_workers: usize,
    pub source_timeout: Duration,
    pub job_budget: Duration,
}

impl Default for JobConfig {
    fn default() -> Self {
        Self {
            targets: DiscoveryTargets::default(),
            limit_per_source: 20,
            batch_size: 20,
            max_workers: 4,
            source_timeout: Duration::from_secs(60),
            job_budget: Duration::from_secs(600),
        }
    }
}

impl JobConfig {
    /// # Errors
    ///
    /// Returns [`ConfigError`] if the discovery targets file cannot be loaded.
    pub fn from_app_config(config: &AppConfig) -> Result<Self, ConfigError> {
        Ok(Self {
            targets: DiscoveryTargets::resolve(config)?,
            limit_per_source: config.discovery_limit_per_source,
            batch_size: config.enrich_batch_size,
            max_workers: config.max_workers,
            source_timeout: Duration::from_secs(config.source_timeout_secs),
            job_budget: Duration::from_secs(config.job_budget_secs),
        })
    }

    /// # Errors
    ///
    /// Returns [`JobError::Config`] naming the first zero-valued setting.
    pub fn validate(&self) -> Result<(), JobError> {
        let checks = [
            ("limit_per_source", self.limit_per_source == 0),
            ("batch_size", self.batch_size == 0),
            ("max_workers", self.max_workers == 0),
            ("source_timeout", self.source_timeout.is_zero()),
            ("job_budget", self.job_budget.is_zero()),
        ];
        match checks.iter().find(|(_, is_zero)| *is_zero) {
            Some((name, _)) => Err(JobError::Config(format!(
                "{name} must be greater than zero"
            ))),
            None => Ok(()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_is_valid() {
        assert!(JobConfig::default().validate().is_ok());
    }

    #[test]
    fn zero_batch_size_is_rejected() {
        let config = JobConfig {
            batch_size: 0,
            ..JobConfig::default()
        };
        assert!(matches!(
            config.validate(),
            Err(JobError::Config(ref msg)) if msg.contains("batch_size")
        ));
    }

    #[test]
    fn zero_budget_is_rejected() {
        let config = JobConfig {
            job_budget: Duration::ZERO,
            ..JobConfig::default()
        };
        assert!(config.validate().is_err());
    }
}
