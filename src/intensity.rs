//! Weekly intensity minutes and heart-rate zone summaries

use crate::error::FusionError;
use crate::normalizer::round_to;
use crate::types::{ActivityRecord, HR_ZONE_COUNT};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Weekly intensity-minutes goal used when a daily summary omits it
pub const DEFAULT_INTENSITY_GOAL: u32 = 150;

/// Days summed into the weekly total
pub const DEFAULT_WEEKLY_WINDOW: usize = 7;

/// Intensity minutes of one calendar day
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DailyIntensity {
    pub date: String,
    pub moderate: u32,
    pub vigorous: u32,
    pub goal: u32,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DayBreakdown {
    pub date: String,
    pub moderate: u32,
    pub vigorous: u32,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WeeklyIntensity {
    pub moderate: u32,
    pub vigorous: u32,
    /// Vigorous minutes count double
    pub total: u32,
    pub goal: u32,
    pub days: Vec<DayBreakdown>,
}

/// Sum the last `window` days; `days` is ordered oldest first
pub fn weekly_intensity_window(days: &[DailyIntensity], window: usize) -> WeeklyIntensity {
    let recent = &days[days.len().saturating_sub(window)..];
    // counters come from untrusted exports, so saturate
    let moderate = recent.iter().fold(0u32, |acc, d| acc.saturating_add(d.moderate));
    let vigorous = recent.iter().fold(0u32, |acc, d| acc.saturating_add(d.vigorous));

    WeeklyIntensity {
        moderate,
        vigorous,
        total: moderate.saturating_add(vigorous.saturating_mul(2)),
        goal: recent.last().map_or(DEFAULT_INTENSITY_GOAL, |d| d.goal),
        days: recent
            .iter()
            .map(|d| DayBreakdown {
                date: d.date.clone(),
                moderate: d.moderate,
                vigorous: d.vigorous,
            })
            .collect(),
    }
}

pub fn weekly_intensity(days: &[DailyIntensity]) -> WeeklyIntensity {
    weekly_intensity_window(days, DEFAULT_WEEKLY_WINDOW)
}

/// Parse Garmin daily summaries into intensity days, oldest first.
///
/// Accepts a bare array or `{"dailies": [...]}`. Entries without a
/// `calendarDate` are skipped.
pub fn parse_garmin_dailies(raw_json: &str) -> Result<Vec<DailyIntensity>, FusionError> {
    let payload: Value = serde_json::from_str(raw_json)?;
    let entries = payload
        .as_array()
        .or_else(|| payload.get("dailies").and_then(Value::as_array))
        .ok_or_else(|| FusionError::unavailable("garmin", "dailies payload is not a list"))?;

    let mut days = Vec::new();
    for raw in entries {
        match serde_json::from_value::<GarminDaily>(raw.clone()) {
            Ok(daily) => days.push(DailyIntensity {
                date: daily.calendar_date,
                moderate: daily.moderate_intensity_minutes.unwrap_or(0),
                vigorous: daily.vigorous_intensity_minutes.unwrap_or(0),
                goal: daily
                    .intensity_minutes_goal
                    .filter(|g| *g > 0)
                    .unwrap_or(DEFAULT_INTENSITY_GOAL),
            }),
            Err(e) => {
                tracing::warn!(provider = "garmin", error = %e, "Skipping malformed daily summary");
            }
        }
    }
    days.sort_by(|a, b| a.date.cmp(&b.date));
    Ok(days)
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GarminDaily {
    calendar_date: String,
    moderate_intensity_minutes: Option<u32>,
    vigorous_intensity_minutes: Option<u32>,
    intensity_minutes_goal: Option<u32>,
}

/// Share of one zone in an activity's total zone time
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ZoneShare {
    pub zone: u8,
    pub seconds: u32,
    pub percent: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HrZoneSummary {
    pub total_seconds: u32,
    pub zones: Vec<ZoneShare>,
}

/// Total zone time and per-zone percentage (1 decimal)
pub fn hr_zone_summary(record: &ActivityRecord) -> HrZoneSummary {
    let total_seconds = record
        .hr_zones
        .iter()
        .fold(0u32, |acc, z| acc.saturating_add(z.seconds));
    let zones = record
        .hr_zones
        .iter()
        .take(HR_ZONE_COUNT)
        .map(|z| ZoneShare {
            zone: z.zone,
            seconds: z.seconds,
            percent: if total_seconds == 0 {
                0.0
            } else {
                round_to(f64::from(z.seconds) * 100.0 / f64::from(total_seconds), 1)
            },
        })
        .collect();

    HrZoneSummary {
        total_seconds,
        zones,
    }
}
