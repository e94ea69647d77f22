//! Core types for the Activity Fusion pipeline
//!
//! This module defines the records that flow through each stage of the
//! pipeline: canonical activity records produced by the provider adapters,
//! auxiliary telemetry used for enrichment, and heart-rate zone entries.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Number of heart-rate zones in a populated `hrZones` array
pub const HR_ZONE_COUNT: usize = 7;

/// Provider a record originated from
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Source {
    #[default]
    Garmin,
    Strava,
    BoschFlow,
    BoschConnect,
}

impl Source {
    pub fn as_str(&self) -> &'static str {
        match self {
            Source::Garmin => "garmin",
            Source::Strava => "strava",
            Source::BoschFlow => "bosch_flow",
            Source::BoschConnect => "bosch_connect",
        }
    }
}

impl fmt::Display for Source {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Provider-scoped activity identifier.
///
/// Garmin and Strava hand out numeric ids, Bosch uses opaque strings. The
/// value is only unique within one source and carries no meaning across
/// providers.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ActivityId {
    Numeric(u64),
    Text(String),
}

impl Default for ActivityId {
    fn default() -> Self {
        ActivityId::Text(String::new())
    }
}

impl fmt::Display for ActivityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ActivityId::Numeric(id) => write!(f, "{id}"),
            ActivityId::Text(id) => f.write_str(id),
        }
    }
}

impl From<u64> for ActivityId {
    fn from(id: u64) -> Self {
        ActivityId::Numeric(id)
    }
}

impl From<&str> for ActivityId {
    fn from(id: &str) -> Self {
        ActivityId::Text(id.to_string())
    }
}

/// Time spent in one heart-rate zone
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct HrZone {
    /// Zone index, 0 (lowest intensity) to 6
    pub zone: u8,
    pub seconds: u32,
}

/// Canonical representation of one exercise session.
///
/// Field names serialize exactly as the downstream summary document expects.
/// Numeric fields that are always present use zero for "unknown"; metrics a
/// provider may not expose at all are `Option`s.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ActivityRecord {
    #[serde(rename = "activityId")]
    pub activity_id: ActivityId,
    pub source: Source,
    pub name: String,
    #[serde(rename = "activityType")]
    pub activity_type: String,
    #[serde(rename = "sportType")]
    pub sport_type: String,
    /// Calendar date in the source's local time (YYYY-MM-DD)
    pub date: String,
    /// "HH:MM" for Garmin, full local ISO timestamp for Strava
    #[serde(rename = "startTimeLocal")]
    pub start_time_local: String,
    pub location: Option<String>,

    pub duration_s: u32,
    pub moving_duration_s: u32,
    pub elapsed_duration_s: u32,
    pub distance_km: f64,
    pub avg_speed_kmh: f64,
    pub max_speed_kmh: f64,

    pub elevation_gain_m: i32,
    pub elevation_loss_m: i32,
    pub min_elevation_m: i32,
    pub max_elevation_m: i32,

    pub avg_hr: Option<f64>,
    pub max_hr: Option<f64>,
    pub min_hr: Option<f64>,
    #[serde(rename = "hrZones")]
    pub hr_zones: Vec<HrZone>,

    pub calories: u32,
    pub calories_consumed: Option<u32>,

    pub aerobic_te: Option<f64>,
    pub anaerobic_te: Option<f64>,
    pub training_load: Option<f64>,
    pub te_label: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub suffer_score: Option<f64>,

    pub min_temp_c: Option<f64>,
    pub max_temp_c: Option<f64>,
    pub avg_respiration: Option<f64>,
    pub min_respiration: Option<f64>,
    pub max_respiration: Option<f64>,
    pub water_estimated_ml: Option<u32>,
    pub water_consumed_ml: Option<u32>,

    pub avg_cadence: Option<f64>,
    pub max_cadence: Option<f64>,
    pub avg_power: Option<f64>,
    pub max_power: Option<f64>,
    pub norm_power: Option<f64>,

    // Trail metrics, Garmin only
    pub grit: Option<f64>,
    pub avg_flow: Option<f64>,
    pub jump_count: Option<u32>,

    pub moderate_minutes: u32,
    pub vigorous_minutes: u32,

    #[serde(rename = "startLatitude")]
    pub start_latitude: Option<f64>,
    #[serde(rename = "startLongitude")]
    pub start_longitude: Option<f64>,
}

impl ActivityRecord {
    /// Identity within one run: ids are only unique per source
    pub fn identity(&self) -> (Source, &ActivityId) {
        (self.source, &self.activity_id)
    }

    pub fn is_same_activity(&self, other: &ActivityRecord) -> bool {
        self.identity() == other.identity()
    }

    /// Key the timeline is ordered by (most recent first)
    pub fn chronological_key(&self) -> (&str, &str) {
        (self.date.as_str(), self.start_time_local.as_str())
    }
}

/// Auxiliary eBike telemetry used to fill power/cadence gaps.
///
/// Produced by the Bosch adapter; never part of the merged timeline itself.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AuxActivity {
    pub date: String,
    pub start_time: String,
    pub duration_s: f64,
    pub distance_km: f64,
    pub avg_power: Option<f64>,
    pub max_power: Option<f64>,
    pub avg_cadence: Option<f64>,
    pub max_cadence: Option<f64>,
    pub avg_speed_kmh: Option<f64>,
    pub max_speed_kmh: Option<f64>,
    pub calories: Option<f64>,
    pub source: Source,
}

impl AuxActivity {
    /// Only sessions carrying power or cadence are useful for enrichment
    pub fn has_drivetrain_data(&self) -> bool {
        self.avg_power.is_some() || self.avg_cadence.is_some()
    }
}
