//! Website enrichment: fetch a lead's site and classify what it sells.

pub mod error;
pub mod extract;
pub mod fetcher;

pub use error::{EnrichError, FetchFailure};
pub use extract::{parse_page, PageContent};
pub use fetcher::{Enricher, FetchOutcome, WebsiteEnrichment, WebsiteFetcher};
