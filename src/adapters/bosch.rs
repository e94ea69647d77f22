//! Bosch eBike adapter
//!
//! Parses Bosch eBike Flow activities and eBike Connect trip headers into
//! auxiliary power/cadence telemetry. Bosch sessions never enter the merged
//! timeline directly; they only enrich matching Garmin/Strava rides.
//!
//! Key names differ between API generations, so every metric is resolved
//! through an explicit fallback chain (first present, non-zero value wins).

use crate::error::FusionError;
use crate::normalizer::{
    date_prefix, epoch_millis_to_local, first_present, meters_to_km, mps_to_kmh,
};
use crate::types::{AuxActivity, Source};
use serde::Deserialize;
use serde_json::Value;

use super::{decode_record, NumberOrText};

/// Bosch payload adapter (Flow and Connect schemas)
pub struct BoschAdapter;

impl BoschAdapter {
    /// Parse a raw Bosch response into auxiliary records.
    ///
    /// Accepts a bare array or an object wrapping it under `data` or `trips`.
    /// Sessions without power or cadence, and malformed entries, are skipped.
    pub fn parse(&self, raw_json: &str) -> Result<Vec<AuxActivity>, FusionError> {
        let payload: Value = serde_json::from_str(raw_json)?;
        let entries = unwrap_envelope(&payload)
            .ok_or_else(|| FusionError::unavailable("bosch", "response is not an activity list"))?;

        let mut activities = Vec::new();
        for raw in entries {
            match self.normalize(raw) {
                Ok(Some(activity)) => activities.push(activity),
                Ok(None) => {
                    tracing::debug!("Skipping Bosch session without power or cadence");
                }
                Err(e) => {
                    tracing::warn!(provider = "bosch", error = %e, "Skipping malformed activity");
                }
            }
        }
        Ok(activities)
    }

    /// Map one raw Bosch session; `Ok(None)` when it carries no drivetrain data
    pub fn normalize(&self, raw: &Value) -> Result<Option<AuxActivity>, FusionError> {
        let activity = if raw.get("attributes").is_some() {
            let flow: FlowActivity = decode_record(Source::BoschFlow, raw)?;
            convert_flow(flow)
        } else {
            let trip: ConnectTrip = decode_record(Source::BoschConnect, raw)?;
            convert_connect(trip)
        };
        Ok(activity.has_drivetrain_data().then_some(activity))
    }
}

fn unwrap_envelope(payload: &Value) -> Option<&Vec<Value>> {
    payload
        .as_array()
        .or_else(|| payload.get("trips").and_then(Value::as_array))
        .or_else(|| payload.get("data").and_then(Value::as_array))
}

fn convert_flow(flow: FlowActivity) -> AuxActivity {
    let attrs = flow.attributes;
    let detail = flow.detail.unwrap_or_default();
    let start_time = attrs.start_time.clone().unwrap_or_default();

    AuxActivity {
        date: date_prefix(&start_time),
        start_time,
        duration_s: attrs.duration.unwrap_or(0.0),
        distance_km: meters_to_km(attrs.distance.unwrap_or(0.0)),
        avg_power: detail_then_summary(&detail, &attrs, |a| [a.average_power, a.avg_power, a.average_rider_power]),
        max_power: detail_then_summary(&detail, &attrs, |a| [a.max_power, a.maximum_power, a.max_rider_power]),
        avg_cadence: detail_then_summary(&detail, &attrs, |a| [a.average_cadence, a.avg_cadence, None]),
        max_cadence: detail_then_summary(&detail, &attrs, |a| [a.max_cadence, a.maximum_cadence, None]),
        avg_speed_kmh: detail_then_summary(&detail, &attrs, |a| [a.average_speed, None, None]).map(mps_to_kmh),
        max_speed_kmh: detail_then_summary(&detail, &attrs, |a| [a.max_speed, None, None]).map(mps_to_kmh),
        calories: detail_then_summary(&detail, &attrs, |a| [a.calories, a.total_calories, None]),
        source: Source::BoschFlow,
    }
}

/// Detail endpoint values win over the list summary
fn detail_then_summary(
    detail: &FlowAttributes,
    summary: &FlowAttributes,
    field: impl Fn(&FlowAttributes) -> [Option<f64>; 3],
) -> Option<f64> {
    let mut chain = field(detail).to_vec();
    chain.extend(field(summary));
    first_present(&chain)
}

fn convert_connect(trip: ConnectTrip) -> AuxActivity {
    let start = match (&trip.start_time, &trip.start_time_camel) {
        (Some(NumberOrText::Text(s)), _) if !s.is_empty() => Some(NumberOrText::Text(s.clone())),
        (Some(NumberOrText::Number(n)), _) if *n != 0.0 => Some(NumberOrText::Number(*n)),
        (_, other) => other.clone(),
    };

    let (date, start_time) = match start {
        Some(NumberOrText::Number(millis)) => match epoch_millis_to_local(millis as i64) {
            Some(dt) => (
                dt.format("%Y-%m-%d").to_string(),
                dt.format("%Y-%m-%dT%H:%M:%S").to_string(),
            ),
            None => (String::new(), millis.to_string()),
        },
        Some(NumberOrText::Text(s)) => (date_prefix(&s), s),
        None => (String::new(), String::new()),
    };

    AuxActivity {
        date,
        start_time,
        duration_s: first_present(&[trip.duration, trip.total_duration]).unwrap_or(0.0),
        distance_km: meters_to_km(first_present(&[trip.distance, trip.total_distance]).unwrap_or(0.0)),
        avg_power: first_present(&[trip.average_power, trip.average_power_camel, trip.avg_power]),
        max_power: first_present(&[trip.max_power, trip.max_power_camel]),
        avg_cadence: first_present(&[
            trip.average_cadence,
            trip.average_cadence_camel,
            trip.avg_cadence,
        ]),
        max_cadence: first_present(&[trip.max_cadence, trip.max_cadence_camel]),
        // Connect already reports km/h
        avg_speed_kmh: first_present(&[trip.average_speed, trip.average_speed_camel]),
        max_speed_kmh: first_present(&[trip.max_speed, trip.max_speed_camel]),
        calories: first_present(&[trip.calories, trip.total_calories]),
        source: Source::BoschConnect,
    }
}

// Bosch API response structures

#[derive(Debug, Deserialize)]
struct FlowActivity {
    attributes: FlowAttributes,
    detail: Option<FlowAttributes>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct FlowAttributes {
    start_time: Option<String>,
    duration: Option<f64>,
    distance: Option<f64>,
    average_power: Option<f64>,
    avg_power: Option<f64>,
    average_rider_power: Option<f64>,
    max_power: Option<f64>,
    maximum_power: Option<f64>,
    max_rider_power: Option<f64>,
    average_cadence: Option<f64>,
    avg_cadence: Option<f64>,
    max_cadence: Option<f64>,
    maximum_cadence: Option<f64>,
    average_speed: Option<f64>,
    max_speed: Option<f64>,
    calories: Option<f64>,
    total_calories: Option<f64>,
}

#[derive(Debug, Deserialize)]
struct ConnectTrip {
    start_time: Option<NumberOrText>,
    #[serde(rename = "startTime")]
    start_time_camel: Option<NumberOrText>,
    duration: Option<f64>,
    total_duration: Option<f64>,
    distance: Option<f64>,
    total_distance: Option<f64>,
    average_power: Option<f64>,
    #[serde(rename = "averagePower")]
    average_power_camel: Option<f64>,
    avg_power: Option<f64>,
    max_power: Option<f64>,
    #[serde(rename = "maxPower")]
    max_power_camel: Option<f64>,
    average_cadence: Option<f64>,
    #[serde(rename = "averageCadence")]
    average_cadence_camel: Option<f64>,
    avg_cadence: Option<f64>,
    max_cadence: Option<f64>,
    #[serde(rename = "maxCadence")]
    max_cadence_camel: Option<f64>,
    average_speed: Option<f64>,
    #[serde(rename = "averageSpeed")]
    average_speed_camel: Option<f64>,
    max_speed: Option<f64>,
    #[serde(rename = "maxSpeed")]
    max_speed_camel: Option<f64>,
    calories: Option<f64>,
    #[serde(rename = "totalCalories")]
    total_calories: Option<f64>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_parse_flow_envelope() {
        let payload = json!({
            "data": [
                {
                    "id": "a1b2",
                    "attributes": {
                        "startTime": "2024-05-01T09:10:00Z",
                        "duration": 5400,
                        "distance": 32100.0
                    },
                    "detail": {
                        "averageRiderPower": 168.7,
                        "maximumPower": 540.0,
                        "avgCadence": 74.0,
                        "averageSpeed": 5.95,
                        "totalCalories": 1010
                    }
                },
                {
                    "id": "c3d4",
                    "attributes": { "startTime": "2024-04-28T10:00:00Z", "duration": 1200, "distance": 4000.0 }
                }
            ]
        });

        let activities = BoschAdapter.parse(&payload.to_string()).unwrap();
        assert_eq!(activities.len(), 1);

        let flow = &activities[0];
        assert_eq!(flow.source, Source::BoschFlow);
        assert_eq!(flow.date, "2024-05-01");
        assert_eq!(flow.duration_s, 5400.0);
        assert_eq!(flow.distance_km, 32.1);
        assert_eq!(flow.avg_power, Some(168.7));
        assert_eq!(flow.max_power, Some(540.0));
        assert_eq!(flow.avg_cadence, Some(74.0));
        assert_eq!(flow.avg_speed_kmh, Some(21.4));
        assert_eq!(flow.calories, Some(1010.0));
    }

    #[test]
    fn test_flow_alias_chain_prefers_first_non_zero() {
        let raw = json!({
            "id": "x",
            "attributes": { "startTime": "2024-05-02T08:00:00Z", "duration": 3600, "distance": 20000.0 },
            "detail": { "averagePower": 0, "avgPower": 150.0, "averageRiderPower": 210.0 }
        });

        let activity = BoschAdapter.normalize(&raw).unwrap().unwrap();
        assert_eq!(activity.avg_power, Some(150.0));
    }

    #[test]
    fn test_flow_metrics_fall_back_to_attributes() {
        let summary_only = json!({
            "id": "z",
            "attributes": {
                "startTime": "2024-05-04T08:00:00Z",
                "duration": 3600,
                "distance": 25000.0,
                "averagePower": 155.0,
                "averageCadence": 70.0
            }
        });

        let activity = BoschAdapter.normalize(&summary_only).unwrap().unwrap();
        assert_eq!(activity.avg_power, Some(155.0));
        assert_eq!(activity.avg_cadence, Some(70.0));

        let partial_detail = json!({
            "id": "y",
            "attributes": {
                "startTime": "2024-05-04T08:00:00Z",
                "duration": 3600,
                "distance": 25000.0,
                "averagePower": 155.0,
                "averageCadence": 70.0
            },
            "detail": { "avgCadence": 82.0 }
        });

        let activity = BoschAdapter.normalize(&partial_detail).unwrap().unwrap();
        assert_eq!(activity.avg_power, Some(155.0));
        assert_eq!(activity.avg_cadence, Some(82.0));
    }

    #[test]
    fn test_parse_connect_trips() {
        let payload = json!({
            "trips": [
                {
                    "start_time": "2024-05-03T17:30:00",
                    "total_duration": 2700,
                    "total_distance": 15500.0,
                    "averagePower": 140.0,
                    "average_cadence": 68.0,
                    "average_speed": 20.7,
                    "calories": 480
                }
            ]
        });

        let activities = BoschAdapter.parse(&payload.to_string()).unwrap();
        assert_eq!(activities.len(), 1);

        let trip = &activities[0];
        assert_eq!(trip.source, Source::BoschConnect);
        assert_eq!(trip.date, "2024-05-03");
        assert_eq!(trip.start_time, "2024-05-03T17:30:00");
        assert_eq!(trip.duration_s, 2700.0);
        assert_eq!(trip.distance_km, 15.5);
        assert_eq!(trip.avg_power, Some(140.0));
        assert_eq!(trip.avg_cadence, Some(68.0));
        assert_eq!(trip.avg_speed_kmh, Some(20.7));
    }

    #[test]
    fn test_connect_epoch_start_time() {
        let millis: i64 = 1_714_550_400_000;
        let raw = json!({ "startTime": millis, "duration": 1800, "distance": 9000.0, "avg_cadence": 70.0 });

        let trip = BoschAdapter.normalize(&raw).unwrap().unwrap();
        let expected = epoch_millis_to_local(millis).unwrap();
        assert_eq!(trip.date, expected.format("%Y-%m-%d").to_string());
        assert!(trip.start_time.starts_with(&trip.date));
    }

    #[test]
    fn test_bare_array_and_non_list_payloads() {
        let ok = BoschAdapter.parse("[]").unwrap();
        assert!(ok.is_empty());

        let err = BoschAdapter.parse(r#"{"message": "token expired"}"#).unwrap_err();
        assert!(matches!(err, FusionError::ProviderUnavailable { .. }));
    }
}
