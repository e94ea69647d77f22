//! Unit normalization
//!
//! This module converts provider-native units into the canonical schema.
//! - Distances in meters become kilometers (2 decimals)
//! - Speeds in m/s become km/h (1 decimal)
//! - Millisecond counters become seconds
//! - Heart-rate zone encodings become a fixed 7-entry zone array

use crate::types::{HrZone, HR_ZONE_COUNT};
use chrono::{Local, NaiveDateTime, TimeZone};

/// Round to a fixed number of decimal places (half away from zero)
pub fn round_to(value: f64, decimals: i32) -> f64 {
    let factor = 10f64.powi(decimals);
    (value * factor).round() / factor
}

/// Meters to kilometers, rounded to 2 decimals
pub fn meters_to_km(meters: f64) -> f64 {
    round_to(meters / 1000.0, 2)
}

/// Meters per second to kilometers per hour, rounded to 1 decimal
pub fn mps_to_kmh(speed: f64) -> f64 {
    round_to(speed * 3.6, 1)
}

pub fn millis_to_seconds(millis: f64) -> f64 {
    millis / 1000.0
}

/// Whole seconds, never negative
pub fn whole_seconds(seconds: f64) -> u32 {
    if seconds.is_finite() && seconds > 0.0 {
        seconds.round().min(u32::MAX as f64) as u32
    } else {
        0
    }
}

/// Whole, non-negative count (calories, millilitres, minutes)
pub fn whole_count(value: f64) -> u32 {
    whole_seconds(value)
}

/// Whole meters; elevations may be negative
pub fn whole_meters(meters: f64) -> i32 {
    if meters.is_finite() {
        meters.round().clamp(i32::MIN as f64, i32::MAX as f64) as i32
    } else {
        0
    }
}

/// Treat zero and missing alike: providers report "no sensor" as 0
pub fn present(value: Option<f64>) -> Option<f64> {
    value.filter(|v| *v != 0.0 && v.is_finite())
}

/// First value in a fallback chain that is present and non-zero
pub fn first_present(candidates: &[Option<f64>]) -> Option<f64> {
    candidates.iter().copied().find_map(present)
}

/// Present value rounded to `decimals`
pub fn present_rounded(value: Option<f64>, decimals: i32) -> Option<f64> {
    present(value).map(|v| round_to(v, decimals))
}

/// Seven zero-second zones, used when a provider has no zone data
pub fn empty_hr_zones() -> Vec<HrZone> {
    (0..HR_ZONE_COUNT)
        .map(|zone| HrZone {
            zone: zone as u8,
            seconds: 0,
        })
        .collect()
}

/// Build zones from a structured per-zone list of seconds.
///
/// The list is padded or truncated to seven entries. Returns `None` for an
/// empty list so the caller can fall back to the millisecond counters.
pub fn hr_zones_from_seconds(seconds: &[f64]) -> Option<Vec<HrZone>> {
    if seconds.is_empty() {
        return None;
    }
    let mut zones = empty_hr_zones();
    for (zone, secs) in zones.iter_mut().zip(seconds.iter()) {
        zone.seconds = whole_seconds(*secs);
    }
    Some(zones)
}

/// Build zones from per-zone millisecond counters indexed 0..6.
///
/// Returns `None` when no counter is positive.
pub fn hr_zones_from_millis(counters: &[Option<f64>; HR_ZONE_COUNT]) -> Option<Vec<HrZone>> {
    if !counters.iter().any(|ms| ms.is_some_and(|v| v > 0.0)) {
        return None;
    }
    let mut zones = empty_hr_zones();
    for (zone, ms) in zones.iter_mut().zip(counters.iter()) {
        zone.seconds = whole_seconds(millis_to_seconds(ms.unwrap_or(0.0)));
    }
    Some(zones)
}

/// Resolve zones: structured list first, then millisecond counters, then zeros
pub fn resolve_hr_zones(
    structured: Option<&[f64]>,
    counters: &[Option<f64>; HR_ZONE_COUNT],
) -> Vec<HrZone> {
    structured
        .and_then(hr_zones_from_seconds)
        .or_else(|| hr_zones_from_millis(counters))
        .unwrap_or_else(empty_hr_zones)
}

/// Split a local timestamp ("YYYY-MM-DD HH:MM:SS" or ISO "T" form) into
/// its calendar date and "HH:MM". Short inputs yield empty parts.
pub fn split_local_timestamp(timestamp: &str) -> (String, String) {
    let date = timestamp.get(0..10).unwrap_or_default().to_string();
    let time = timestamp.get(11..16).unwrap_or_default().to_string();
    (date, time)
}

/// Calendar date prefix of an ISO timestamp, empty when too short
pub fn date_prefix(timestamp: &str) -> String {
    timestamp.get(0..10).unwrap_or_default().to_string()
}

/// Epoch milliseconds rendered in the machine's local time zone
pub fn epoch_millis_to_local(millis: i64) -> Option<NaiveDateTime> {
    Local
        .timestamp_millis_opt(millis)
        .single()
        .map(|dt| dt.naive_local())
}
