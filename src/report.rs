//! Ride report
//!
//! Picks the most recent cycling activity of a timeline and compares it with
//! every other ride in that timeline.

use crate::compare::{compare, ComparisonResult};
use crate::intensity::{hr_zone_summary, HrZoneSummary};
use crate::types::ActivityRecord;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Substrings marking an activity as a ride, matched on type, sport and name
pub const RIDE_KEYWORDS: [&str; 10] = [
    "mountain_biking",
    "mountain biking",
    "mtb",
    "vtt",
    "gravel",
    "cycling",
    "road_biking",
    "vélo",
    "velo",
    "bike",
];

pub fn is_cycling_activity(record: &ActivityRecord) -> bool {
    let text = format!(
        "{} {} {}",
        record.activity_type, record.sport_type, record.name
    )
    .to_lowercase();
    RIDE_KEYWORDS.iter().any(|k| text.contains(k))
}

/// Compact view of one ride for the report's history list
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RideSummary {
    pub date: String,
    pub name: String,
    pub distance_km: f64,
    pub avg_speed_kmh: f64,
    pub elevation_gain_m: i32,
    pub avg_hr: Option<f64>,
    pub calories: u32,
    pub grit: Option<f64>,
    pub avg_flow: Option<f64>,
    pub training_load: Option<f64>,
}

impl From<&ActivityRecord> for RideSummary {
    fn from(record: &ActivityRecord) -> Self {
        Self {
            date: record.date.clone(),
            name: record.name.clone(),
            distance_km: record.distance_km,
            avg_speed_kmh: record.avg_speed_kmh,
            elevation_gain_m: record.elevation_gain_m,
            avg_hr: record.avg_hr,
            calories: record.calories,
            grit: record.grit,
            avg_flow: record.avg_flow,
            training_load: record.training_load,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RideReport {
    pub ok: bool,
    #[serde(rename = "generated_at", skip_serializing_if = "Option::is_none")]
    pub generated_at: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub activity: Option<ActivityRecord>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub hr_zone_summary: Option<HrZoneSummary>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub historical_comparison: Option<ComparisonResult>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub all_rides: Option<Vec<RideSummary>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl RideReport {
    pub fn failed(error: impl Into<String>) -> Self {
        Self {
            ok: false,
            generated_at: None,
            activity: None,
            hr_zone_summary: None,
            historical_comparison: None,
            all_rides: None,
            error: Some(error.into()),
        }
    }
}

/// Build the report for the latest ride of `timeline` (most recent first).
///
/// `history` caps the number of rides listed in `allRides`.
pub fn ride_report(timeline: &[ActivityRecord], history: usize, now: DateTime<Utc>) -> RideReport {
    let rides: Vec<ActivityRecord> = timeline
        .iter()
        .filter(|a| is_cycling_activity(a))
        .cloned()
        .collect();

    let Some(latest) = rides.first() else {
        tracing::warn!(activities = timeline.len(), "No cycling activity in timeline");
        return RideReport::failed("no cycling activity found in history");
    };

    tracing::info!(
        activity_id = %latest.activity_id,
        date = %latest.date,
        rides = rides.len(),
        "Building ride report"
    );

    RideReport {
        ok: true,
        generated_at: Some(now),
        activity: Some(latest.clone()),
        hr_zone_summary: Some(hr_zone_summary(latest)),
        historical_comparison: Some(compare(latest, &rides)),
        all_rides: Some(rides.iter().take(history).map(RideSummary::from).collect()),
        error: None,
    }
}
