//! Historical comparison
//!
//! Places one activity against a corpus of prior activities: per-metric
//! average, minimum and maximum of the corpus plus the activity's percentile
//! rank within it.

use crate::normalizer::{present, round_to};
use crate::types::ActivityRecord;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Metrics the comparator reports on
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Metric {
    Distance,
    Duration,
    Speed,
    HeartRate,
    Elevation,
    Calories,
    Grit,
    Flow,
}

impl Metric {
    pub const ALL: [Metric; 8] = [
        Metric::Distance,
        Metric::Duration,
        Metric::Speed,
        Metric::HeartRate,
        Metric::Elevation,
        Metric::Calories,
        Metric::Grit,
        Metric::Flow,
    ];

    /// Raw value of this metric on `record`, if the record has one
    pub fn value_of(&self, record: &ActivityRecord) -> Option<f64> {
        match self {
            Metric::Distance => Some(record.distance_km),
            Metric::Duration => Some(f64::from(record.duration_s)),
            Metric::Speed => Some(record.avg_speed_kmh),
            Metric::HeartRate => record.avg_hr,
            Metric::Elevation => Some(f64::from(record.elevation_gain_m)),
            Metric::Calories => Some(f64::from(record.calories)),
            Metric::Grit => record.grit,
            Metric::Flow => record.avg_flow,
        }
    }
}

/// Aggregate of one metric over the comparison sample
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetricStat {
    pub avg: f64,
    pub min: f64,
    pub max: f64,
    #[serde(rename = "thisRide")]
    pub this_ride: f64,
    /// Percentile in [0, 100], `None` when nothing is comparable
    pub rank: Option<u32>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ComparisonResult {
    pub total_rides: usize,
    pub compared_with: usize,
    pub stats: BTreeMap<Metric, MetricStat>,
}

impl ComparisonResult {
    pub fn stat(&self, metric: Metric) -> Option<&MetricStat> {
        self.stats.get(&metric)
    }
}

/// Compare `target` against `corpus`.
///
/// The target is excluded from the sample by identity (source + id), so the
/// corpus may contain it. Only strictly positive values enter a sample.
pub fn compare(target: &ActivityRecord, corpus: &[ActivityRecord]) -> ComparisonResult {
    let others: Vec<&ActivityRecord> = corpus
        .iter()
        .filter(|r| !r.is_same_activity(target))
        .collect();

    let mut result = ComparisonResult {
        total_rides: corpus.len(),
        compared_with: others.len(),
        stats: BTreeMap::new(),
    };
    if others.is_empty() {
        tracing::debug!(activity_id = %target.activity_id, "No prior activities to compare with");
        return result;
    }

    for metric in Metric::ALL {
        let sample: Vec<f64> = others
            .iter()
            .filter_map(|r| positive(metric.value_of(r)))
            .collect();
        let own = positive(metric.value_of(target));
        if sample.is_empty() {
            tracing::debug!(?metric, "No comparable samples");
        }
        result.stats.insert(metric, metric_stat(&sample, own));
    }

    result
}

fn positive(value: Option<f64>) -> Option<f64> {
    present(value).filter(|v| *v > 0.0)
}

fn metric_stat(sample: &[f64], own: Option<f64>) -> MetricStat {
    let (avg, min, max) = if sample.is_empty() {
        (0.0, 0.0, 0.0)
    } else {
        let sum: f64 = sample.iter().sum();
        let min = sample.iter().copied().fold(f64::INFINITY, f64::min);
        let max = sample.iter().copied().fold(f64::NEG_INFINITY, f64::max);
        (sum / sample.len() as f64, min, max)
    };

    MetricStat {
        avg: round_to(avg, 1),
        min: round_to(min, 1),
        max: round_to(max, 1),
        this_ride: own.map_or(0.0, |v| round_to(v, 1)),
        rank: own.and_then(|v| percentile_rank(sample, v)),
    }
}

/// Share of `sample` strictly below `value`, as a rounded percentage
pub fn percentile_rank(sample: &[f64], value: f64) -> Option<u32> {
    if sample.is_empty() || value <= 0.0 {
        return None;
    }
    let below = sample.iter().filter(|v| **v < value).count();
    Some(((below * 100) as f64 / sample.len() as f64).round() as u32)
}
