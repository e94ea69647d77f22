//! Provider response cache
//!
//! Time-boxed, file-backed persistence of one provider's normalized activity
//! list. An entry is valid for a fixed window after `fetched_at`; stale or
//! unreadable entries read as a miss and are overwritten by the next
//! successful fetch.

use crate::error::FusionError;
use crate::types::ActivityRecord;
use chrono::{DateTime, Duration, Local, NaiveDateTime, TimeZone, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// Default validity window of a cache entry
pub const DEFAULT_CACHE_TTL_HOURS: i64 = 12;

/// One cached provider response
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CacheEntry {
    #[serde(deserialize_with = "deserialize_fetched_at")]
    pub fetched_at: DateTime<Utc>,
    pub activities: Vec<ActivityRecord>,
}

impl CacheEntry {
    pub fn new(activities: Vec<ActivityRecord>, fetched_at: DateTime<Utc>) -> Self {
        Self {
            fetched_at,
            activities,
        }
    }

    pub fn age_at(&self, now: DateTime<Utc>) -> Duration {
        now - self.fetched_at
    }
}

/// Result of inspecting a cache file without consuming it
#[derive(Debug, Clone, PartialEq)]
pub enum CacheStatus {
    Fresh { age: Duration, activities: usize },
    Stale { age: Duration },
    Missing,
    Corrupt(String),
}

impl CacheStatus {
    pub fn label(&self) -> &'static str {
        match self {
            CacheStatus::Fresh { .. } => "fresh",
            CacheStatus::Stale { .. } => "stale",
            CacheStatus::Missing => "missing",
            CacheStatus::Corrupt(_) => "corrupt",
        }
    }
}

/// File-backed activity cache, one JSON file per key
#[derive(Debug, Clone)]
pub struct ActivityCache {
    dir: PathBuf,
    ttl: Duration,
}

impl ActivityCache {
    pub fn new(dir: impl Into<PathBuf>, ttl: Duration) -> Self {
        Self {
            dir: dir.into(),
            ttl,
        }
    }

    /// Cache with the default 12 hour validity window
    pub fn with_default_ttl(dir: impl Into<PathBuf>) -> Self {
        Self::new(dir, Duration::hours(DEFAULT_CACHE_TTL_HOURS))
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    pub fn path_for(&self, key: &str) -> PathBuf {
        self.dir.join(format!(".{key}_activities_cache.json"))
    }

    /// Read a valid entry, or `None` on miss, corruption or expiry
    pub fn read(&self, key: &str) -> Option<CacheEntry> {
        self.read_at(key, Utc::now())
    }

    pub fn read_at(&self, key: &str, now: DateTime<Utc>) -> Option<CacheEntry> {
        match self.load(key) {
            Ok(Some(entry)) => {
                let age = entry.age_at(now);
                if age >= self.ttl {
                    tracing::debug!(key, age_hours = age.num_hours(), "Cache entry expired");
                    return None;
                }
                tracing::info!(
                    key,
                    activities = entry.activities.len(),
                    age_hours = age.num_hours(),
                    "Using cached activities"
                );
                Some(entry)
            }
            Ok(None) => None,
            Err(e) => {
                tracing::warn!(key, error = %e, "Ignoring unreadable cache entry");
                None
            }
        }
    }

    /// Classify the current cache file for `key`
    pub fn inspect_at(&self, key: &str, now: DateTime<Utc>) -> CacheStatus {
        match self.load(key) {
            Ok(Some(entry)) => {
                let age = entry.age_at(now);
                if age >= self.ttl {
                    CacheStatus::Stale { age }
                } else {
                    CacheStatus::Fresh {
                        age,
                        activities: entry.activities.len(),
                    }
                }
            }
            Ok(None) => CacheStatus::Missing,
            Err(e) => CacheStatus::Corrupt(e.to_string()),
        }
    }

    /// Replace the entry for `key`. Failures are logged and otherwise ignored.
    pub fn write(&self, key: &str, activities: &[ActivityRecord]) {
        self.write_at(key, activities, Utc::now());
    }

    pub fn write_at(&self, key: &str, activities: &[ActivityRecord], fetched_at: DateTime<Utc>) {
        let entry = CacheEntry::new(activities.to_vec(), fetched_at);
        match self.store(key, &entry) {
            Ok(()) => {
                tracing::info!(key, activities = activities.len(), "Activities cached");
            }
            Err(e) => {
                tracing::warn!(key, error = %e, "Failed to persist cache entry, continuing");
            }
        }
    }

    fn load(&self, key: &str) -> Result<Option<CacheEntry>, FusionError> {
        let path = self.path_for(key);
        if !path.exists() {
            return Ok(None);
        }
        let raw = fs::read_to_string(&path)
            .map_err(|e| FusionError::CacheCorrupt(format!("{}: {e}", path.display())))?;
        let entry = serde_json::from_str(&raw)
            .map_err(|e| FusionError::CacheCorrupt(format!("{}: {e}", path.display())))?;
        Ok(Some(entry))
    }

    fn store(&self, key: &str, entry: &CacheEntry) -> Result<(), FusionError> {
        fs::create_dir_all(&self.dir)?;
        let path = self.path_for(key);
        let tmp = path.with_extension("json.tmp");
        fs::write(&tmp, serde_json::to_string_pretty(entry)?)?;
        fs::rename(&tmp, &path)?;
        Ok(())
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }
}

/// Accept RFC 3339 timestamps and naive ISO timestamps (read as local time)
fn deserialize_fetched_at<'de, D>(deserializer: D) -> Result<DateTime<Utc>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = String::deserialize(deserializer)?;
    parse_fetched_at(&raw).map_err(serde::de::Error::custom)
}

fn parse_fetched_at(raw: &str) -> Result<DateTime<Utc>, FusionError> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Ok(dt.with_timezone(&Utc));
    }
    let naive = NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S%.f")
        .map_err(|e| FusionError::DateParse(format!("{raw}: {e}")))?;
    Local
        .from_local_datetime(&naive)
        .earliest()
        .map(|dt| dt.with_timezone(&Utc))
        .ok_or_else(|| FusionError::DateParse(format!("{raw}: not a valid local time")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{ActivityId, HrZone, Source};
    use pretty_assertions::assert_eq;
    use tempfile::TempDir;

    fn sample_record() -> ActivityRecord {
        ActivityRecord {
            activity_id: ActivityId::Numeric(987654321),
            source: Source::Strava,
            name: "Morning Ride".to_string(),
            activity_type: "Ride".to_string(),
            sport_type: "MountainBikeRide".to_string(),
            date: "2024-05-01".to_string(),
            start_time_local: "2024-05-01T08:00:00Z".to_string(),
            duration_s: 4210,
            moving_duration_s: 4210,
            elapsed_duration_s: 4800,
            distance_km: 27.38,
            avg_speed_kmh: 23.4,
            max_speed_kmh: 51.7,
            elevation_gain_m: 540,
            elevation_loss_m: 540,
            avg_hr: Some(144.6),
            hr_zones: vec![HrZone { zone: 3, seconds: 1200 }],
            calories: 890,
            avg_power: Some(171.3),
            suffer_score: Some(64.0),
            start_latitude: Some(45.1885),
            start_longitude: Some(5.7245),
            ..Default::default()
        }
    }

    #[test]
    fn test_cache_entry_round_trip_preserves_records() {
        let entry = CacheEntry::new(vec![sample_record()], Utc::now());
        let json = serde_json::to_string(&entry).unwrap();
        let loaded: CacheEntry = serde_json::from_str(&json).unwrap();

        assert_eq!(loaded, entry);
    }

    #[test]
    fn test_write_then_read_hit() {
        let dir = TempDir::new().unwrap();
        let cache = ActivityCache::with_default_ttl(dir.path());
        let now = Utc::now();

        cache.write_at("strava", &[sample_record()], now);
        let entry = cache.read_at("strava", now + Duration::hours(1)).unwrap();

        assert_eq!(entry.activities, vec![sample_record()]);
    }

    #[test]
    fn test_validity_boundary() {
        let dir = TempDir::new().unwrap();
        let cache = ActivityCache::with_default_ttl(dir.path());
        let now = Utc::now();

        cache.write_at("strava", &[sample_record()], now - Duration::hours(12) - Duration::seconds(1));
        assert!(cache.read_at("strava", now).is_none());
        assert!(matches!(cache.inspect_at("strava", now), CacheStatus::Stale { .. }));

        cache.write_at("strava", &[sample_record()], now - Duration::hours(11) - Duration::minutes(59));
        assert!(cache.read_at("strava", now).is_some());
        assert!(matches!(
            cache.inspect_at("strava", now),
            CacheStatus::Fresh { activities: 1, .. }
        ));
    }

    #[test]
    fn test_missing_and_corrupt_entries_are_misses() {
        let dir = TempDir::new().unwrap();
        let cache = ActivityCache::with_default_ttl(dir.path());

        assert!(cache.read("strava").is_none());
        assert_eq!(cache.inspect_at("strava", Utc::now()), CacheStatus::Missing);

        fs::write(cache.path_for("strava"), "{ not json").unwrap();
        assert!(cache.read("strava").is_none());
        assert!(matches!(cache.inspect_at("strava", Utc::now()), CacheStatus::Corrupt(_)));
    }

    #[test]
    fn test_write_replaces_previous_entry() {
        let dir = TempDir::new().unwrap();
        let cache = ActivityCache::with_default_ttl(dir.path());

        cache.write("strava", &[sample_record(), sample_record()]);
        cache.write("strava", &[sample_record()]);

        assert_eq!(cache.read("strava").unwrap().activities.len(), 1);
    }

    #[test]
    fn test_write_failure_is_not_fatal() {
        let dir = TempDir::new().unwrap();
        let blocker = dir.path().join("not-a-dir");
        fs::write(&blocker, "file").unwrap();

        let cache = ActivityCache::with_default_ttl(&blocker);
        cache.write("strava", &[sample_record()]);

        assert!(cache.read("strava").is_none());
    }

    #[test]
    fn test_naive_fetched_at_is_accepted() {
        let json = r#"{"fetched_at": "2024-05-01T08:30:00.123456", "activities": []}"#;
        let entry: CacheEntry = serde_json::from_str(json).unwrap();
        let expected = Local
            .from_local_datetime(
                &NaiveDateTime::parse_from_str("2024-05-01T08:30:00.123456", "%Y-%m-%dT%H:%M:%S%.f")
                    .unwrap(),
            )
            .earliest()
            .unwrap()
            .with_timezone(&Utc);

        assert_eq!(entry.fetched_at, expected);
    }
}
