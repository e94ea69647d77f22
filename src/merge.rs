//! Deduplicating merge
//!
//! Combines a primary and a secondary activity list into one timeline. Every
//! primary record is kept; a secondary record is dropped when a primary record
//! on the same calendar date has a distance within the dedup tolerance. Two
//! genuine same-day rides of similar length therefore collapse into one.

use crate::types::ActivityRecord;
use std::collections::HashMap;

/// Default distance tolerance for treating two same-day records as one event
pub const DEFAULT_DEDUP_TOLERANCE_KM: f64 = 2.0;

/// Similarity rule used to decide whether two records are the same session
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DedupPolicy {
    /// Records closer than this (strictly) are duplicates
    pub tolerance_km: f64,
}

impl Default for DedupPolicy {
    fn default() -> Self {
        Self {
            tolerance_km: DEFAULT_DEDUP_TOLERANCE_KM,
        }
    }
}

impl DedupPolicy {
    pub fn with_tolerance(tolerance_km: f64) -> Self {
        Self { tolerance_km }
    }

    pub fn is_duplicate(&self, primary: &ActivityRecord, secondary: &ActivityRecord) -> bool {
        primary.date == secondary.date
            && (primary.distance_km - secondary.distance_km).abs() < self.tolerance_km
    }
}

/// Merger for combining two providers' timelines
pub struct Merger {
    policy: DedupPolicy,
}

impl Default for Merger {
    fn default() -> Self {
        Self::new(DedupPolicy::default())
    }
}

impl Merger {
    pub fn new(policy: DedupPolicy) -> Self {
        Self { policy }
    }

    /// Merge `secondary` into `primary`, most recent first.
    ///
    /// Ordering is descending by (`date`, `startTimeLocal`); ties keep the
    /// original order, primary records before secondary ones.
    pub fn merge(
        &self,
        primary: Vec<ActivityRecord>,
        secondary: Vec<ActivityRecord>,
    ) -> Vec<ActivityRecord> {
        let mut by_date: HashMap<&str, Vec<&ActivityRecord>> = HashMap::new();
        for record in &primary {
            by_date.entry(record.date.as_str()).or_default().push(record);
        }

        let mut kept = Vec::new();
        let mut dropped = 0usize;
        for candidate in secondary {
            let is_dup = by_date
                .get(candidate.date.as_str())
                .is_some_and(|same_day| {
                    same_day
                        .iter()
                        .any(|p| self.policy.is_duplicate(p, &candidate))
                });
            if is_dup {
                tracing::debug!(
                    source = %candidate.source,
                    activity_id = %candidate.activity_id,
                    date = %candidate.date,
                    distance_km = candidate.distance_km,
                    "Dropping duplicate activity"
                );
                dropped += 1;
            } else {
                kept.push(candidate);
            }
        }

        let mut merged = primary;
        let primary_count = merged.len();
        merged.extend(kept);
        // sort_by is stable, so equal keys keep primary-then-secondary order
        merged.sort_by(|a, b| b.chronological_key().cmp(&a.chronological_key()));

        tracing::info!(
            primary = primary_count,
            secondary_kept = merged.len() - primary_count,
            duplicates = dropped,
            "Merged activity timelines"
        );
        merged
    }
}

/// Merge with the default 2 km tolerance
pub fn merge(primary: Vec<ActivityRecord>, secondary: Vec<ActivityRecord>) -> Vec<ActivityRecord> {
    Merger::default().merge(primary, secondary)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{ActivityId, Source};
    use pretty_assertions::assert_eq;

    fn record(source: Source, id: &str, date: &str, time: &str, distance_km: f64) -> ActivityRecord {
        ActivityRecord {
            activity_id: ActivityId::from(id),
            source,
            date: date.to_string(),
            start_time_local: time.to_string(),
            distance_km,
            ..Default::default()
        }
    }

    fn ids(records: &[ActivityRecord]) -> Vec<String> {
        records.iter().map(|r| r.activity_id.to_string()).collect()
    }

    #[test]
    fn test_same_day_similar_distance_is_duplicate() {
        let primary = vec![record(Source::Garmin, "g1", "2024-05-01", "09:00", 20.0)];
        let secondary = vec![record(Source::Strava, "s1", "2024-05-01", "2024-05-01T09:01:00Z", 21.0)];

        let merged = merge(primary, secondary);
        assert_eq!(ids(&merged), vec!["g1"]);
    }

    #[test]
    fn test_same_day_different_distance_is_kept() {
        let primary = vec![record(Source::Garmin, "g1", "2024-05-01", "09:00", 20.0)];
        let secondary = vec![record(Source::Strava, "s1", "2024-05-01", "2024-05-01T17:00:00Z", 25.0)];

        let merged = merge(primary, secondary);
        assert_eq!(merged.len(), 2);
        assert!(merged.iter().any(|r| r.activity_id == ActivityId::from("s1")));
    }

    #[test]
    fn test_tolerance_is_strict() {
        let primary = vec![record(Source::Garmin, "g1", "2024-05-01", "09:00", 20.0)];
        let secondary = vec![record(Source::Strava, "s1", "2024-05-01", "09:00", 22.0)];

        assert_eq!(merge(primary, secondary).len(), 2);
    }

    #[test]
    fn test_different_day_is_never_duplicate() {
        let primary = vec![record(Source::Garmin, "g1", "2024-05-01", "09:00", 20.0)];
        let secondary = vec![record(Source::Strava, "s1", "2024-04-30", "2024-04-30T09:00:00Z", 20.0)];

        assert_eq!(ids(&merge(primary, secondary)), vec!["g1", "s1"]);
    }

    #[test]
    fn test_empty_secondary_is_identity() {
        let primary = vec![
            record(Source::Garmin, "g2", "2024-05-02", "18:00", 12.0),
            record(Source::Garmin, "g1", "2024-05-01", "09:00", 20.0),
        ];

        assert_eq!(merge(primary.clone(), Vec::new()), primary);
    }

    #[test]
    fn test_primary_records_are_never_dropped() {
        let primary = vec![
            record(Source::Garmin, "g1", "2024-05-01", "09:00", 20.0),
            record(Source::Garmin, "g2", "2024-05-01", "09:00", 20.5),
        ];
        let secondary = vec![
            record(Source::Strava, "s1", "2024-05-01", "09:00", 20.2),
            record(Source::Strava, "s2", "2024-05-03", "07:00", 5.0),
        ];

        let merged = merge(primary.clone(), secondary);
        for p in &primary {
            assert!(merged.iter().any(|m| m.is_same_activity(p)));
        }
    }

    #[test]
    fn test_ordering_most_recent_first_with_stable_ties() {
        let primary = vec![
            record(Source::Garmin, "g-old", "2024-04-20", "10:00", 30.0),
            record(Source::Garmin, "g-tie", "2024-05-01", "09:00", 10.0),
        ];
        let secondary = vec![
            record(Source::Strava, "s-tie", "2024-05-01", "09:00", 40.0),
            record(Source::Strava, "s-new", "2024-05-04", "2024-05-04T07:00:00Z", 15.0),
        ];

        let merged = merge(primary, secondary);
        assert_eq!(ids(&merged), vec!["s-new", "g-tie", "s-tie", "g-old"]);
    }

    #[test]
    fn test_custom_tolerance() {
        let merger = Merger::new(DedupPolicy::with_tolerance(0.5));
        let primary = vec![record(Source::Garmin, "g1", "2024-05-01", "09:00", 20.0)];
        let secondary = vec![record(Source::Strava, "s1", "2024-05-01", "09:00", 21.0)];

        assert_eq!(merger.merge(primary, secondary).len(), 2);
    }
}
