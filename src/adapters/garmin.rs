//! Garmin provider adapter
//!
//! Parses Garmin Connect activity-list payloads and maps them to canonical
//! activity records.

use crate::error::FusionError;
use crate::normalizer::{
    meters_to_km, mps_to_kmh, present, present_rounded, resolve_hr_zones, split_local_timestamp,
    whole_count, whole_meters, whole_seconds,
};
use crate::types::{ActivityId, ActivityRecord, Source, HR_ZONE_COUNT};
use serde::Deserialize;
use serde_json::Value;

use super::{decode_record, ProviderAdapter};

/// Garmin payload adapter
pub struct GarminAdapter;

impl ProviderAdapter for GarminAdapter {
    fn source(&self) -> Source {
        Source::Garmin
    }

    fn normalize(&self, raw: &Value) -> Result<ActivityRecord, FusionError> {
        let act: GarminActivity = decode_record(Source::Garmin, raw)?;
        convert_activity(act)
    }
}

fn convert_activity(act: GarminActivity) -> Result<ActivityRecord, FusionError> {
    let activity_id = act.activity_id.clone().unwrap_or_default();

    let distance_km = meters_to_km(act.distance.unwrap_or(0.0));
    if distance_km <= 0.0 {
        return Err(FusionError::SkippedZeroDistance {
            activity_id: activity_id.to_string(),
        });
    }

    let (date, start_time) = split_local_timestamp(act.start_time_local.as_deref().unwrap_or(""));

    let structured_zones: Option<Vec<f64>> = act
        .time_in_hr_zones
        .as_ref()
        .map(|zones| zones.iter().map(ZoneSample::seconds).collect());
    let hr_zones = resolve_hr_zones(structured_zones.as_deref(), &act.zone_counters_ms());

    let activity_type = match &act.activity_type {
        Some(TypeKeyField::Keyed { type_key }) => type_key.clone().unwrap_or_default(),
        Some(TypeKeyField::Plain(key)) => key.clone(),
        None => String::new(),
    };
    let sport_type = match &act.sport_type_dto {
        Some(TypeKeyField::Keyed { type_key }) => {
            type_key.clone().unwrap_or_default().to_uppercase()
        }
        _ => act.sport_type.clone().unwrap_or_default(),
    };

    Ok(ActivityRecord {
        activity_id,
        source: Source::Garmin,
        name: act.activity_name.unwrap_or_default(),
        activity_type,
        sport_type,
        date,
        start_time_local: start_time,
        location: act.location_name,
        duration_s: whole_seconds(act.duration.unwrap_or(0.0)),
        moving_duration_s: whole_seconds(act.moving_duration.unwrap_or(0.0)),
        elapsed_duration_s: whole_seconds(act.elapsed_duration.unwrap_or(0.0)),
        distance_km,
        avg_speed_kmh: mps_to_kmh(act.average_speed.unwrap_or(0.0)),
        max_speed_kmh: mps_to_kmh(act.max_speed.unwrap_or(0.0)),
        elevation_gain_m: whole_meters(act.elevation_gain.unwrap_or(0.0)),
        elevation_loss_m: whole_meters(act.elevation_loss.unwrap_or(0.0)),
        min_elevation_m: whole_meters(act.min_elevation.unwrap_or(0.0)),
        max_elevation_m: whole_meters(act.max_elevation.unwrap_or(0.0)),
        avg_hr: act.average_hr,
        max_hr: act.max_hr,
        min_hr: act.min_hr,
        hr_zones,
        calories: whole_count(act.calories.unwrap_or(0.0)),
        calories_consumed: present(act.calories_consumed).map(whole_count),
        aerobic_te: act.aerobic_training_effect,
        anaerobic_te: act.anaerobic_training_effect,
        training_load: present_rounded(act.activity_training_load, 1),
        te_label: act.training_effect_label,
        suffer_score: None,
        min_temp_c: act.min_temperature,
        max_temp_c: act.max_temperature,
        avg_respiration: present_rounded(act.avg_respiration_rate, 1),
        min_respiration: present_rounded(act.min_respiration_rate, 1),
        max_respiration: present_rounded(act.max_respiration_rate, 1),
        water_estimated_ml: present(act.water_estimated).map(whole_count),
        water_consumed_ml: present(act.water_consumed).map(whole_count),
        avg_cadence: present_rounded(act.average_biking_cadence_in_rev_per_minute, 1),
        max_cadence: present_rounded(act.max_biking_cadence_in_rev_per_minute, 1),
        avg_power: present_rounded(act.avg_power, 1),
        max_power: present_rounded(act.max_power, 1),
        norm_power: present_rounded(act.norm_power, 1),
        grit: present_rounded(act.grit, 1),
        avg_flow: present_rounded(act.avg_flow, 1),
        jump_count: act.jump_count.map(whole_count),
        moderate_minutes: whole_count(act.moderate_intensity_minutes.unwrap_or(0.0)),
        vigorous_minutes: whole_count(act.vigorous_intensity_minutes.unwrap_or(0.0)),
        start_latitude: act.start_latitude,
        start_longitude: act.start_longitude,
    })
}

// Garmin API response structures

/// `activityType` / `sportTypeDTO` arrive either as `{typeKey}` or as a bare string
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
enum TypeKeyField {
    Keyed {
        #[serde(rename = "typeKey")]
        type_key: Option<String>,
    },
    Plain(String),
}

/// One entry of `timeInHRZones`: plain seconds or `{seconds}`
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
enum ZoneSample {
    Seconds(f64),
    Entry { seconds: Option<f64> },
}

impl ZoneSample {
    fn seconds(&self) -> f64 {
        match self {
            ZoneSample::Seconds(secs) => *secs,
            ZoneSample::Entry { seconds } => seconds.unwrap_or(0.0),
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GarminActivity {
    activity_id: Option<ActivityId>,
    activity_name: Option<String>,
    activity_type: Option<TypeKeyField>,
    #[serde(rename = "sportTypeDTO")]
    sport_type_dto: Option<TypeKeyField>,
    sport_type: Option<String>,
    start_time_local: Option<String>,
    location_name: Option<String>,

    duration: Option<f64>,
    moving_duration: Option<f64>,
    elapsed_duration: Option<f64>,
    distance: Option<f64>,
    average_speed: Option<f64>,
    max_speed: Option<f64>,
    elevation_gain: Option<f64>,
    elevation_loss: Option<f64>,
    min_elevation: Option<f64>,
    max_elevation: Option<f64>,

    #[serde(rename = "averageHR")]
    average_hr: Option<f64>,
    #[serde(rename = "maxHR")]
    max_hr: Option<f64>,
    #[serde(rename = "minHR")]
    min_hr: Option<f64>,
    #[serde(rename = "timeInHRZones")]
    time_in_hr_zones: Option<Vec<ZoneSample>>,
    #[serde(rename = "hrTimeInZone_0")]
    hr_time_in_zone_0: Option<f64>,
    #[serde(rename = "hrTimeInZone_1")]
    hr_time_in_zone_1: Option<f64>,
    #[serde(rename = "hrTimeInZone_2")]
    hr_time_in_zone_2: Option<f64>,
    #[serde(rename = "hrTimeInZone_3")]
    hr_time_in_zone_3: Option<f64>,
    #[serde(rename = "hrTimeInZone_4")]
    hr_time_in_zone_4: Option<f64>,
    #[serde(rename = "hrTimeInZone_5")]
    hr_time_in_zone_5: Option<f64>,
    #[serde(rename = "hrTimeInZone_6")]
    hr_time_in_zone_6: Option<f64>,

    calories: Option<f64>,
    calories_consumed: Option<f64>,
    aerobic_training_effect: Option<f64>,
    anaerobic_training_effect: Option<f64>,
    activity_training_load: Option<f64>,
    training_effect_label: Option<String>,
    min_temperature: Option<f64>,
    max_temperature: Option<f64>,
    avg_respiration_rate: Option<f64>,
    min_respiration_rate: Option<f64>,
    max_respiration_rate: Option<f64>,
    water_estimated: Option<f64>,
    water_consumed: Option<f64>,

    average_biking_cadence_in_rev_per_minute: Option<f64>,
    max_biking_cadence_in_rev_per_minute: Option<f64>,
    avg_power: Option<f64>,
    max_power: Option<f64>,
    norm_power: Option<f64>,

    grit: Option<f64>,
    avg_flow: Option<f64>,
    jump_count: Option<f64>,

    moderate_intensity_minutes: Option<f64>,
    vigorous_intensity_minutes: Option<f64>,
    start_latitude: Option<f64>,
    start_longitude: Option<f64>,
}

impl GarminActivity {
    fn zone_counters_ms(&self) -> [Option<f64>; HR_ZONE_COUNT] {
        [
            self.hr_time_in_zone_0,
            self.hr_time_in_zone_1,
            self.hr_time_in_zone_2,
            self.hr_time_in_zone_3,
            self.hr_time_in_zone_4,
            self.hr_time_in_zone_5,
            self.hr_time_in_zone_6,
        ]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::normalize_all;
    use serde_json::json;

    fn sample_activity() -> Value {
        json!({
            "activityId": 15432198765u64,
            "activityName": "Forêt de Fontainebleau",
            "activityType": { "typeKey": "mountain_biking" },
            "sportTypeDTO": { "typeKey": "cycling" },
            "startTimeLocal": "2024-05-01 09:12:44",
            "locationName": "Fontainebleau",
            "duration": 5423.7,
            "movingDuration": 5101.2,
            "elapsedDuration": 5900.0,
            "distance": 32456.0,
            "averageSpeed": 5.98,
            "maxSpeed": 12.4,
            "elevationGain": 412.6,
            "elevationLoss": 408.1,
            "averageHR": 142.0,
            "maxHR": 178.0,
            "timeInHRZones": [120, { "seconds": 600.4 }, 1800, 1500, 900, 300, 0],
            "calories": 1180.4,
            "activityTrainingLoad": 156.78,
            "avgPower": 0,
            "grit": 12.34,
            "avgFlow": 3.21,
            "jumpCount": 4,
            "moderateIntensityMinutes": 22,
            "vigorousIntensityMinutes": 61,
            "startLatitude": 48.404,
            "startLongitude": 2.701
        })
    }

    #[test]
    fn test_normalize_garmin_activity() {
        let record = GarminAdapter.normalize(&sample_activity()).unwrap();

        assert_eq!(record.activity_id, ActivityId::Numeric(15432198765));
        assert_eq!(record.source, Source::Garmin);
        assert_eq!(record.activity_type, "mountain_biking");
        assert_eq!(record.sport_type, "CYCLING");
        assert_eq!(record.date, "2024-05-01");
        assert_eq!(record.start_time_local, "09:12");
        assert_eq!(record.duration_s, 5424);
        assert_eq!(record.distance_km, 32.46);
        assert_eq!(record.avg_speed_kmh, 21.5);
        assert_eq!(record.max_speed_kmh, 44.6);
        assert_eq!(record.elevation_gain_m, 413);
        assert_eq!(record.calories, 1180);
        assert_eq!(record.training_load, Some(156.8));
        assert_eq!(record.grit, Some(12.3));
        assert_eq!(record.jump_count, Some(4));
        assert_eq!(record.moderate_minutes, 22);
        assert_eq!(record.hr_zones.len(), HR_ZONE_COUNT);
        assert_eq!(record.hr_zones[1].seconds, 600);
    }

    #[test]
    fn test_missing_metrics_stay_null() {
        let record = GarminAdapter.normalize(&sample_activity()).unwrap();

        // avgPower of 0 means "no power meter", not zero watts
        assert_eq!(record.avg_power, None);
        assert_eq!(record.avg_cadence, None);
        assert_eq!(record.min_hr, None);
        assert_eq!(record.calories_consumed, None);
    }

    #[test]
    fn test_zone_counters_fallback() {
        let raw = json!({
            "activityId": 1,
            "activityType": "road_biking",
            "startTimeLocal": "2024-05-02 18:00:00",
            "distance": 10000.0,
            "hrTimeInZone_2": 125_000.0,
            "hrTimeInZone_4": 60_400.0
        });
        let record = GarminAdapter.normalize(&raw).unwrap();

        assert_eq!(record.activity_type, "road_biking");
        assert_eq!(record.hr_zones.len(), HR_ZONE_COUNT);
        assert_eq!(record.hr_zones[2].seconds, 125);
        assert_eq!(record.hr_zones[4].seconds, 60);
        assert_eq!(record.hr_zones[0].seconds, 0);
    }

    #[test]
    fn test_zero_distance_is_skipped() {
        let raw = json!({
            "activityId": 99,
            "activityType": { "typeKey": "indoor_cycling" },
            "startTimeLocal": "2024-05-03 07:00:00",
            "distance": 0.0,
            "duration": 3600.0
        });

        let err = GarminAdapter.normalize(&raw).unwrap_err();
        assert!(matches!(err, FusionError::SkippedZeroDistance { ref activity_id } if activity_id == "99"));
    }

    #[test]
    fn test_parse_skips_bad_records() {
        let payload = json!([
            sample_activity(),
            { "activityId": 2, "distance": "not a number" },
            { "activityId": 3, "distance": -50.0 }
        ]);

        let records = GarminAdapter.parse(&payload.to_string()).unwrap();
        assert_eq!(records.len(), 1);

        let raws = payload.as_array().unwrap();
        let normalized = normalize_all(&GarminAdapter, raws);
        assert!(normalized.len() <= raws.len());
        assert!(normalized.iter().all(|r| r.distance_km > 0.0));
    }

    #[test]
    fn test_parse_rejects_non_list_payload() {
        let err = GarminAdapter.parse(r#"{"error": "unauthorized"}"#).unwrap_err();
        assert!(matches!(err, FusionError::ProviderUnavailable { .. }));
    }
}
