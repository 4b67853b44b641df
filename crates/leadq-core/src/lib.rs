//! Domain model and pure qualification logic for the lead pipeline.
//!
//! Everything in this crate is computed, not orchestrated: the classifier,
//! scorer and lifecycle rules take plain values and return plain values.
//! I/O lives in `leadq-db`, `leadq-enrich` and `leadq-pipeline`.

pub mod activity;
pub mod app_config;
pub mod candidate;
pub mod classifier;
pub mod clock;
pub mod config;
pub mod error;
pub mod lead;
pub mod lifecycle;
pub mod outreach;
pub mod repository;
pub mod scoring;
pub mod signals;
pub mod targets;

pub use activity::{transition_fields, ActivityEvent, ActivityKind, Actor, NewActivityEvent};
pub use app_config::{AppConfig, Environment};
pub use candidate::{normalize_handle, Candidate};
pub use classifier::classify_page;
pub use clock::{Clock, FixedClock, SystemClock};
pub use config::{load_app_config, load_app_config_from_env};
pub use error::{ConfigError, CoreError};
pub use lead::{LeadStatus, QualifiedLead, WebsiteSnapshot};
pub use lifecycle::StatusDecision;
pub use outreach::build_outreach_dm;
pub use repository::{
    EnrichmentUpdate, JobKind, JobLogEntry, LeadPatch, LeadRepository, LeadUpsert, LogLevel,
    RepositoryError, SavedLead,
};
pub use scoring::compute_quality_score;
pub use signals::{SignalSet, WebsiteSignals};
pub use targets::{load_targets, DiscoveryTargets, TargetsFile};
