//! Bounded-timeout website fetch feeding the page classifier.

use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use leadq_core::{classify_page, WebsiteSignals, WebsiteSnapshot};
use reqwest::{Client, Url};

use crate::error::{EnrichError, FetchFailure};
use crate::extract::parse_page;

const MAX_CONNECT_TIMEOUT_SECS: u64 = 10;
const MAX_REDIRECTS: usize = 5;

/// Everything derived from one successful fetch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WebsiteEnrichment {
    /// URL after scheme defaulting and redirects.
    pub final_url: String,
    pub page_title: Option<String>,
    pub meta_description: Option<String>,
    pub main_heading: Option<String>,
    pub signals: WebsiteSignals,
}

impl WebsiteEnrichment {
    #[must_use]
    pub fn into_snapshot(self, enriched_at: DateTime<Utc>) -> WebsiteSnapshot {
        WebsiteSnapshot {
            signals: self.signals,
            page_title: self.page_title,
            meta_description: self.meta_description,
            main_heading: self.main_heading,
            enriched_at,
        }
    }
}

/// Result of an enrichment attempt. Absence is a value, not an error.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FetchOutcome {
    Enriched(WebsiteEnrichment),
    Unavailable(FetchFailure),
}

#[async_trait]
pub trait Enricher: Send + Sync {
    async fn enrich(&self, url: &str) -> FetchOutcome;
}

/// HTTP fetcher with a per-request timeout covering connect, headers and body.
#[derive(Debug, Clone)]
pub struct WebsiteFetcher {
    client: Client,
    timeout_secs: u64,
}

impl WebsiteFetcher {
    /// # Errors
    ///
    /// Returns [`EnrichError::ZeroTimeout`] for a zero timeout, or
    /// [`EnrichError::Http`] if the `reqwest::Client` cannot be built.
    pub fn new(timeout_secs: u64, user_agent: &str) -> Result<Self, EnrichError> {
        if timeout_secs == 0 {
            return Err(EnrichError::ZeroTimeout);
        }
        let client = Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .connect_timeout(Duration::from_secs(
                timeout_secs.min(MAX_CONNECT_TIMEOUT_SECS),
            ))
            .user_agent(user_agent)
            .redirect(reqwest::redirect::Policy::limited(MAX_REDIRECTS))
            .build()?;
        Ok(Self {
            client,
            timeout_secs,
        })
    }

    async fn fetch(&self, raw_url: &str) -> Result<WebsiteEnrichment, FetchFailure> {
        let url = normalize_url(raw_url)?;

        let response = self
            .client
            .get(url)
            .header(reqwest::header::ACCEPT, "text/html,application/xhtml+xml")
            .send()
            .await
            .map_err(|e| self.classify_error(&e))?;

        let status = response.status();
        if !status.is_success() {
            return Err(FetchFailure::Status {
                status: status.as_u16(),
            });
        }

        let final_url = response.url().to_string();
        let body = response.text().await.map_err(|e| {
            if e.is_timeout() {
                self.timeout()
            } else {
                FetchFailure::Body(e.to_string())
            }
        })?;

        let page = parse_page(&body);
        let signals = classify_page(&page.markup, &page.text);

        Ok(WebsiteEnrichment {
            final_url,
            page_title: page.page_title,
            meta_description: page.meta_description,
            main_heading: page.main_heading,
            signals,
        })
    }

    fn classify_error(&self, error: &reqwest::Error) -> FetchFailure {
        if error.is_timeout() {
            self.timeout()
        } else {
            FetchFailure::Network(error.to_string())
        }
    }

    fn timeout(&self) -> FetchFailure {
        FetchFailure::Timeout {
            timeout_secs: self.timeout_secs,
        }
    }
}

#[async_trait]
impl Enricher for WebsiteFetcher {
    async fn enrich(&self, url: &str) -> FetchOutcome {
        match self.fetch(url).await {
            Ok(enrichment) => FetchOutcome::Enriched(enrichment),
            Err(failure) => {
                tracing::debug!(url, error = %failure, "website unavailable");
                FetchOutcome::Unavailable(failure)
            }
        }
    }
}

/// Profile links are often typed without a scheme; default to `https://`.
fn normalize_url(raw: &str) -> Result<Url, FetchFailure> {
    let trimmed = raw.trim();
    let candidate = if trimmed.contains("://") {
        trimmed.to_string()
    } else {
        format!("https://{trimmed}")
    };

    let url = Url::parse(&candidate).map_err(|e| FetchFailure::InvalidUrl {
        url: raw.to_string(),
        reason: e.to_string(),
    })?;

    match url.scheme() {
        "http" | "https" if url.host_str().is_some() => Ok(url),
        scheme => Err(FetchFailure::InvalidUrl {
            url: raw.to_string(),
            reason: format!("unsupported scheme or missing host ({scheme})"),
        }),
    }
}
