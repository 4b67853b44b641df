use thiserror::Error;

#[derive(Debug, Error)]
pub enum EnrichError {
    #[error("HTTP client error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("fetch timeout must be greater than zero")]
    ZeroTimeout,
}

/// Why a website produced no enrichment. Never fatal to a batch.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FetchFailure {
    #[error("invalid website URL \"{url}\": {reason}")]
    InvalidUrl { url: String, reason: String },

    #[error("timed out after {timeout_secs}s")]
    Timeout { timeout_secs: u64 },

    #[error("unexpected HTTP status {status}")]
    Status { status: u16 },

    #[error("network error: {0}")]
    Network(String),

    #[error("unreadable response body: {0}")]
    Body(String),
}

impl FetchFailure {
    /// Short stable label for logs and job log payloads.
    #[must_use]
    pub fn kind(&self) -> &'static str {
        match self {
            FetchFailure::InvalidUrl { .. } => "invalid_url",
            FetchFailure::Timeout { .. } => "timeout",
            FetchFailure::Status { .. } => "http_status",
            FetchFailure::Network(_) => "network",
            FetchFailure::Body(_) => "body",
        }
    }
}
