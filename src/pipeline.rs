//! Pipeline orchestration
//!
//! This module provides the public API for Activity Fusion. It drives raw
//! provider responses through adapters, the Strava cache, the deduplicating
//! merger, the eBike enricher and the historical comparator.
//!
//! Provider failures never abort a run: a provider that cannot be read
//! contributes no records and the remaining stages continue with whatever
//! data is left.

use crate::adapters::{BoschAdapter, GarminAdapter, ProviderAdapter, StravaAdapter};
use crate::cache::ActivityCache;
use crate::compare::{compare, ComparisonResult};
use crate::config::FusionConfig;
use crate::enrich::{Enricher, MatchPolicy};
use crate::error::FusionError;
use crate::merge::{DedupPolicy, Merger};
use crate::types::{ActivityRecord, AuxActivity};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::PathBuf;

/// Cache key for Strava activity lists
pub const STRAVA_CACHE_KEY: &str = "strava";

/// A raw provider response, fetched on demand
pub trait ActivitySource {
    /// Provider name used in logs and errors
    fn name(&self) -> &str;

    /// Fetch the raw JSON response
    fn fetch(&self) -> Result<String, FusionError>;
}

/// Provider response stored as a JSON file
#[derive(Debug, Clone)]
pub struct JsonFileSource {
    name: String,
    path: PathBuf,
}

impl JsonFileSource {
    pub fn new(name: impl Into<String>, path: impl Into<PathBuf>) -> Self {
        Self {
            name: name.into(),
            path: path.into(),
        }
    }
}

impl ActivitySource for JsonFileSource {
    fn name(&self) -> &str {
        &self.name
    }

    fn fetch(&self) -> Result<String, FusionError> {
        fs::read_to_string(&self.path)
            .map_err(|e| FusionError::unavailable(&self.name, format!("{}: {e}", self.path.display())))
    }
}

/// Provider response already held in memory
#[derive(Debug, Clone)]
pub struct InlineSource {
    name: String,
    body: String,
}

impl InlineSource {
    pub fn new(name: impl Into<String>, body: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            body: body.into(),
        }
    }
}

impl ActivitySource for InlineSource {
    fn name(&self) -> &str {
        &self.name
    }

    fn fetch(&self) -> Result<String, FusionError> {
        Ok(self.body.clone())
    }
}

/// Number of records each provider contributed before merging
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProviderCounts {
    pub garmin: usize,
    pub strava: usize,
    pub bosch: usize,
}

/// Merged, enriched timeline plus the comparison of its latest activity
#[derive(Debug, Clone, PartialEq)]
pub struct ReconciledTimeline {
    /// Most recent first
    pub activities: Vec<ActivityRecord>,
    pub enriched_count: usize,
    pub providers: ProviderCounts,
    pub comparison: Option<ComparisonResult>,
}

impl ReconciledTimeline {
    pub fn latest(&self) -> Option<&ActivityRecord> {
        self.activities.first()
    }

    pub fn is_empty(&self) -> bool {
        self.activities.is_empty()
    }
}

/// Stateful processor holding the merge/enrich policies and the cache
pub struct FusionProcessor {
    merger: Merger,
    enricher: Enricher,
    cache: Option<ActivityCache>,
}

impl Default for FusionProcessor {
    fn default() -> Self {
        Self::new()
    }
}

impl FusionProcessor {
    /// Processor with default policies and no cache
    pub fn new() -> Self {
        Self {
            merger: Merger::default(),
            enricher: Enricher::default(),
            cache: None,
        }
    }

    /// Processor configured from `config`, caching Strava under `config.cache_dir`
    pub fn from_config(config: &FusionConfig) -> Self {
        Self {
            merger: Merger::new(DedupPolicy::with_tolerance(config.dedup_tolerance_km)),
            enricher: Enricher::new(MatchPolicy::with_min_score(config.enrich_min_score)),
            cache: Some(ActivityCache::new(config.cache_dir.clone(), config.cache_ttl)),
        }
    }

    pub fn with_cache(mut self, cache: Option<ActivityCache>) -> Self {
        self.cache = cache;
        self
    }

    pub fn cache(&self) -> Option<&ActivityCache> {
        self.cache.as_ref()
    }

    /// Garmin activities; an unreadable source yields none
    pub fn load_garmin(&self, source: &dyn ActivitySource) -> Vec<ActivityRecord> {
        load_records(&GarminAdapter, source)
    }

    /// Strava activities, read through the cache when one is configured.
    ///
    /// On a cache hit the source is not consulted. Fresh results are sorted
    /// most recent first and cached only when non-empty.
    pub fn load_strava(&self, source: &dyn ActivitySource) -> Vec<ActivityRecord> {
        if let Some(entry) = self.cache.as_ref().and_then(|c| c.read(STRAVA_CACHE_KEY)) {
            return entry.activities;
        }

        let mut records = load_records(&StravaAdapter, source);
        records.sort_by(|a, b| b.start_time_local.cmp(&a.start_time_local));
        if let Some(cache) = &self.cache {
            if !records.is_empty() {
                cache.write(STRAVA_CACHE_KEY, &records);
            }
        }
        records
    }

    /// Bosch sessions carrying power or cadence
    pub fn load_bosch(&self, source: &dyn ActivitySource) -> Vec<AuxActivity> {
        match source.fetch().and_then(|raw| BoschAdapter.parse(&raw)) {
            Ok(activities) => {
                tracing::info!(provider = source.name(), count = activities.len(), "Loaded eBike sessions");
                activities
            }
            Err(e) => {
                tracing::warn!(provider = source.name(), error = %e, "Provider unavailable, continuing without it");
                Vec::new()
            }
        }
    }

    /// Fetch every provider and reconcile the results
    pub fn run(
        &self,
        garmin: &dyn ActivitySource,
        strava: &dyn ActivitySource,
        bosch: &dyn ActivitySource,
    ) -> ReconciledTimeline {
        let garmin_records = self.load_garmin(garmin);
        let strava_records = self.load_strava(strava);
        let bosch_records = self.load_bosch(bosch);
        self.reconcile(garmin_records, strava_records, &bosch_records)
    }

    /// Merge, enrich and compare already-normalized provider data.
    ///
    /// Pipeline stages:
    /// 1. Merger - Garmin is primary, Strava secondary
    /// 2. Enricher - fills power/cadence from eBike sessions
    /// 3. Comparator - latest activity against the rest of the timeline
    pub fn reconcile(
        &self,
        garmin: Vec<ActivityRecord>,
        strava: Vec<ActivityRecord>,
        bosch: &[AuxActivity],
    ) -> ReconciledTimeline {
        let providers = ProviderCounts {
            garmin: garmin.len(),
            strava: strava.len(),
            bosch: bosch.len(),
        };

        let mut activities = self.merger.merge(garmin, strava);
        let enriched_count = self.enricher.enrich(&mut activities, bosch);
        let comparison = activities
            .first()
            .map(|latest| compare(latest, &activities));

        tracing::info!(
            activities = activities.len(),
            enriched = enriched_count,
            "Reconciled activity timeline"
        );

        ReconciledTimeline {
            activities,
            enriched_count,
            providers,
            comparison,
        }
    }
}

fn load_records<A: ProviderAdapter>(adapter: &A, source: &dyn ActivitySource) -> Vec<ActivityRecord> {
    match source.fetch().and_then(|raw| adapter.parse(&raw)) {
        Ok(records) => {
            tracing::info!(provider = source.name(), count = records.len(), "Loaded activities");
            records
        }
        Err(e) => {
            tracing::warn!(provider = source.name(), error = %e, "Provider unavailable, continuing without it");
            Vec::new()
        }
    }
}
