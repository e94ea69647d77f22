//! Activity Fusion - reconciliation and enrichment of fitness activities
//!
//! Fusion turns raw Garmin, Strava and Bosch eBike responses into one activity
//! timeline through a deterministic pipeline: provider adaptation → unit
//! normalization → deduplicating merge → eBike enrichment → historical
//! comparison → summary encoding.
//!
//! ## Modules
//!
//! - **Adapters**: map each provider's schema to the canonical [`ActivityRecord`]
//! - **Cache**: time-boxed file cache for Strava activity lists
//! - **Merge / Enrich / Compare**: the reconciliation stages
//! - **Report / Intensity**: ride report, weekly intensity minutes, HR-zone shares

pub mod adapters;
pub mod cache;
pub mod compare;
pub mod config;
pub mod encoder;
pub mod enrich;
pub mod error;
pub mod intensity;
pub mod merge;
pub mod normalizer;
pub mod pipeline;
pub mod report;
pub mod types;

pub use cache::{ActivityCache, CacheEntry, CacheStatus};
pub use compare::{compare, ComparisonResult, Metric, MetricStat};
pub use config::{ConfigError, FusionConfig};
pub use encoder::{SummaryDocument, SummaryEncoder};
pub use enrich::{enrich, Enricher, MatchPolicy};
pub use error::FusionError;
pub use merge::{merge, DedupPolicy, Merger};
pub use pipeline::{ActivitySource, FusionProcessor, JsonFileSource, ReconciledTimeline};
pub use report::{ride_report, RideReport};
pub use types::{ActivityId, ActivityRecord, AuxActivity, HrZone, Source};

/// Fusion version embedded in all summary documents
pub const FUSION_VERSION: &str = env!("CARGO_PKG_VERSION");

/// Producer name for summary documents
pub const PRODUCER_NAME: &str = "activity-fusion";
