use std::net::SocketAddr;
use std::path::PathBuf;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Environment {
    Development,
    Test,
    Production,
}

impl std::fmt::Display for Environment {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Environment::Development => write!(f, "development"),
            Environment::Test => write!(f, "test"),
            Environment::Production => write!(f, "production"),
        }
    }
}

#[derive(Clone)]
pub struct AppConfig {
    pub database_url: String,
    pub env: Environment,
    pub bind_addr: SocketAddr,
    pub log_level: String,
    pub db_max_connections: u32,
    pub db_min_connections: u32,
    pub db_acquire_timeout_secs: u64,
    pub target_hashtags: Vec<String>,
    pub seed_usernames: Vec<String>,
    pub targets_path: Option<PathBuf>,
    pub discovery_snapshot_path: Option<PathBuf>,
    pub discovery_limit_per_source: usize,
    pub enrich_batch_size: usize,
    pub max_workers: usize,
    pub fetch_timeout_secs: u64,
    pub source_timeout_secs: u64,
    pub job_budget_secs: u64,
    pub user_agent: String,
    pub discover_cron: String,
    pub enrich_cron: String,
}

impl std::fmt::Debug for AppConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppConfig")
            .field("env", &self.env)
            .field("bind_addr", &self.bind_addr)
            .field("log_level", &self.log_level)
            .field("database_url", &"[redacted]")
            .field("db_max_connections", &self.db_max_connections)
            .field("db_min_connections", &self.db_min_connections)
            .field("db_acquire_timeout_secs", &self.db_acquire_timeout_secs)
            .field("target_hashtags", &self.target_hashtags)
            .field("seed_usernames", &self.seed_usernames)
            .field("targets_path", &self.targets_path)
            .field("discovery_snapshot_path", &self.discovery_snapshot_path)
            .field(
                "discovery_limit_per_source",
                &self.discovery_limit_per_source,
            )
            .field("enrich_batch_size", &self.enrich_batch_size)
            .field("max_workers", &self.max_workers)
            .field("fetch_timeout_secs", &self.fetch_timeout_secs)
            .field("source_timeout_secs", &self.source_timeout_secs)
            .field("job_budget_secs", &self.job_budget_secs)
            .field("user_agent", &self.user_agent)
            .field("discover_cron", &self.discover_cron)
            .field("enrich_cron", &self.enrich_cron)
            .finish()
    }
}
