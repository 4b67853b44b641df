//! Discovery and enrichment batch jobs plus the manual review operations.
//!
//! Runners take every collaborator as an argument: a [`LeadRepository`], a
//! [`DiscoveryConnector`] or [`Enricher`], a [`Clock`] and an explicit
//! [`JobConfig`]. Nothing here reads the environment.
//!
//! [`LeadRepository`]: leadq_core::LeadRepository
//! [`Clock`]: leadq_core::Clock
//! [`Enricher`]: leadq_enrich::Enricher

mod audit;
pub mod config;
pub mod discovery;
pub mod memory;
pub mod report;
pub mod review;
pub mod runner;

pub use config::JobConfig;
pub use discovery::{
    connector_from_config, DiscoveryConnector, DiscoveryError, DiscoverySnapshot,
    SnapshotConnector, UnconfiguredConnector,
};
pub use memory::InMemoryLeadRepository;
pub use report::{JobError, JobReport};
pub use review::{lead_detail, update_lead, LeadDetail, LeadUpdate, ReviewError};
pub use runner::{run_discovery, run_enrichment};
