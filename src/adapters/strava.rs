//! Strava provider adapter
//!
//! Parses Strava `athlete/activities` payloads and maps them to canonical
//! activity records. Strava summaries carry no heart-rate zones, trail metrics
//! or training effect, so those stay empty.

use crate::error::FusionError;
use crate::normalizer::{
    date_prefix, meters_to_km, mps_to_kmh, present_rounded, whole_count, whole_meters,
    whole_seconds,
};
use crate::types::{ActivityId, ActivityRecord, Source};
use serde::Deserialize;
use serde_json::Value;

use super::{decode_record, ProviderAdapter};

/// Fallback category when Strava omits `type`
const DEFAULT_STRAVA_TYPE: &str = "Ride";

/// Strava payload adapter
pub struct StravaAdapter;

impl ProviderAdapter for StravaAdapter {
    fn source(&self) -> Source {
        Source::Strava
    }

    fn normalize(&self, raw: &Value) -> Result<ActivityRecord, FusionError> {
        let act: StravaActivity = decode_record(Source::Strava, raw)?;
        convert_activity(act)
    }
}

fn convert_activity(act: StravaActivity) -> Result<ActivityRecord, FusionError> {
    let activity_id = act.id.clone().unwrap_or(ActivityId::Numeric(0));

    let distance_km = meters_to_km(act.distance.unwrap_or(0.0));
    if distance_km <= 0.0 {
        return Err(FusionError::SkippedZeroDistance {
            activity_id: activity_id.to_string(),
        });
    }

    let activity_type = act
        .activity_type
        .clone()
        .unwrap_or_else(|| DEFAULT_STRAVA_TYPE.to_string());
    let sport_type = act
        .sport_type
        .clone()
        .unwrap_or_else(|| activity_type.clone());

    let start_local = act.start_date_local.unwrap_or_default();
    let moving_s = whole_seconds(act.moving_time.unwrap_or(0.0));
    let elevation_gain = whole_meters(act.total_elevation_gain.unwrap_or(0.0));
    let (start_latitude, start_longitude) = match act.start_latlng.as_deref() {
        Some([lat, lng, ..]) => (*lat, *lng),
        Some([lat]) => (*lat, None),
        _ => (None, None),
    };

    Ok(ActivityRecord {
        activity_id,
        source: Source::Strava,
        name: act.name.unwrap_or_default(),
        activity_type,
        sport_type,
        date: date_prefix(&start_local),
        start_time_local: start_local,
        location: None,
        duration_s: moving_s,
        moving_duration_s: moving_s,
        elapsed_duration_s: whole_seconds(act.elapsed_time.unwrap_or(0.0)),
        distance_km,
        avg_speed_kmh: mps_to_kmh(act.average_speed.unwrap_or(0.0)),
        max_speed_kmh: mps_to_kmh(act.max_speed.unwrap_or(0.0)),
        elevation_gain_m: elevation_gain,
        // Strava only reports gain
        elevation_loss_m: elevation_gain,
        min_elevation_m: whole_meters(act.elev_low.unwrap_or(0.0)),
        max_elevation_m: whole_meters(act.elev_high.unwrap_or(0.0)),
        avg_hr: act.average_heartrate,
        max_hr: act.max_heartrate,
        min_hr: None,
        hr_zones: Vec::new(),
        calories: whole_count(act.calories.unwrap_or(0.0)),
        calories_consumed: None,
        aerobic_te: None,
        anaerobic_te: None,
        training_load: None,
        te_label: None,
        suffer_score: act.suffer_score,
        min_temp_c: None,
        max_temp_c: None,
        avg_respiration: None,
        min_respiration: None,
        max_respiration: None,
        water_estimated_ml: None,
        water_consumed_ml: None,
        avg_cadence: present_rounded(act.average_cadence, 1),
        max_cadence: None,
        avg_power: present_rounded(act.average_watts, 1),
        max_power: present_rounded(act.max_watts, 1),
        norm_power: present_rounded(act.weighted_average_watts, 1),
        grit: None,
        avg_flow: None,
        jump_count: None,
        moderate_minutes: 0,
        vigorous_minutes: 0,
        start_latitude,
        start_longitude,
    })
}

// Strava API response structures

#[derive(Debug, Deserialize)]
struct StravaActivity {
    id: Option<ActivityId>,
    name: Option<String>,
    #[serde(rename = "type")]
    activity_type: Option<String>,
    sport_type: Option<String>,
    start_date_local: Option<String>,
    distance: Option<f64>,
    moving_time: Option<f64>,
    elapsed_time: Option<f64>,
    average_speed: Option<f64>,
    max_speed: Option<f64>,
    total_elevation_gain: Option<f64>,
    elev_low: Option<f64>,
    elev_high: Option<f64>,
    average_heartrate: Option<f64>,
    max_heartrate: Option<f64>,
    calories: Option<f64>,
    suffer_score: Option<f64>,
    average_cadence: Option<f64>,
    average_watts: Option<f64>,
    max_watts: Option<f64>,
    weighted_average_watts: Option<f64>,
    start_latlng: Option<Vec<Option<f64>>>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn sample_activity() -> Value {
        json!({
            "id": 11223344556u64,
            "name": "Evening Gravel",
            "type": "Ride",
            "sport_type": "GravelRide",
            "start_date_local": "2024-05-01T18:04:11Z",
            "distance": 41230.5,
            "moving_time": 6120,
            "elapsed_time": 6800,
            "average_speed": 6.737,
            "max_speed": 14.1,
            "total_elevation_gain": 388.4,
            "elev_low": 52.0,
            "elev_high": 181.6,
            "average_heartrate": 138.4,
            "max_heartrate": 171.0,
            "calories": 980.0,
            "suffer_score": 87.0,
            "average_cadence": 78.26,
            "average_watts": 182.44,
            "start_latlng": [48.85, 2.35]
        })
    }

    #[test]
    fn test_normalize_strava_activity() {
        let record = StravaAdapter.normalize(&sample_activity()).unwrap();

        assert_eq!(record.source, Source::Strava);
        assert_eq!(record.activity_id, ActivityId::Numeric(11223344556));
        assert_eq!(record.activity_type, "Ride");
        assert_eq!(record.sport_type, "GravelRide");
        assert_eq!(record.date, "2024-05-01");
        assert_eq!(record.start_time_local, "2024-05-01T18:04:11Z");
        assert_eq!(record.distance_km, 41.23);
        assert_eq!(record.duration_s, 6120);
        assert_eq!(record.moving_duration_s, 6120);
        assert_eq!(record.elapsed_duration_s, 6800);
        assert_eq!(record.avg_speed_kmh, 24.3);
        assert_eq!(record.elevation_gain_m, 388);
        assert_eq!(record.elevation_loss_m, 388);
        assert_eq!(record.max_elevation_m, 182);
        assert_eq!(record.avg_cadence, Some(78.3));
        assert_eq!(record.avg_power, Some(182.4));
        assert_eq!(record.max_power, None);
        assert_eq!(record.suffer_score, Some(87.0));
        assert!(record.hr_zones.is_empty());
        assert_eq!(record.start_latitude, Some(48.85));
        assert_eq!(record.start_longitude, Some(2.35));
    }

    #[test]
    fn test_sport_type_falls_back_to_type() {
        let raw = json!({
            "id": 5,
            "type": "Run",
            "start_date_local": "2024-04-30T06:30:00Z",
            "distance": 8000.0,
            "start_latlng": []
        });
        let record = StravaAdapter.normalize(&raw).unwrap();

        assert_eq!(record.sport_type, "Run");
        assert_eq!(record.start_latitude, None);
        assert_eq!(record.start_longitude, None);
    }

    #[test]
    fn test_missing_type_defaults_to_ride() {
        let raw = json!({ "id": 6, "distance": 1500.0, "start_date_local": "2024-04-29T10:00:00Z" });
        let record = StravaAdapter.normalize(&raw).unwrap();

        assert_eq!(record.activity_type, "Ride");
        assert_eq!(record.sport_type, "Ride");
    }

    #[test]
    fn test_zero_distance_virtual_ride_is_skipped() {
        let raw = json!({ "id": 7, "type": "VirtualRide", "distance": 0.0 });
        assert!(matches!(
            StravaAdapter.normalize(&raw),
            Err(FusionError::SkippedZeroDistance { .. })
        ));
    }
}
