//! Provider payload adapters
//!
//! This module provides adapters that parse raw provider JSON payloads and map
//! them to canonical, provider-agnostic activity records.

mod bosch;
mod garmin;
mod strava;

pub use bosch::BoschAdapter;
pub use garmin::GarminAdapter;
pub use strava::StravaAdapter;

use crate::error::FusionError;
use crate::types::{ActivityRecord, Source};
use serde_json::Value;

/// Trait for provider payload adapters
pub trait ProviderAdapter {
    /// Provider whose schema this adapter understands
    fn source(&self) -> Source;

    /// Map one raw provider record to a canonical record.
    ///
    /// Fails with `SkippedZeroDistance` for non-positive distances and with
    /// `MalformedRecord` when the record does not match the provider schema.
    fn normalize(&self, raw: &Value) -> Result<ActivityRecord, FusionError>;

    /// Parse a raw provider response (a JSON array of records).
    ///
    /// Individual records that fail to normalize are skipped; only a response
    /// that is not an array at all is an error.
    fn parse(&self, raw_json: &str) -> Result<Vec<ActivityRecord>, FusionError> {
        let payload: Value = serde_json::from_str(raw_json)?;
        let records = payload.as_array().ok_or_else(|| {
            FusionError::unavailable(self.source().as_str(), "response is not an activity list")
        })?;
        Ok(normalize_all(self, records))
    }
}

/// Normalize every raw record, dropping the ones the adapter rejects
pub fn normalize_all<A: ProviderAdapter + ?Sized>(
    adapter: &A,
    raws: &[Value],
) -> Vec<ActivityRecord> {
    let mut records = Vec::with_capacity(raws.len());
    for raw in raws {
        match adapter.normalize(raw) {
            Ok(record) => records.push(record),
            Err(FusionError::SkippedZeroDistance { activity_id }) => {
                tracing::debug!(
                    provider = %adapter.source(),
                    activity_id = %activity_id,
                    "Skipping activity without distance"
                );
            }
            Err(e) => {
                tracing::warn!(provider = %adapter.source(), error = %e, "Skipping malformed activity");
            }
        }
    }
    records
}

/// Deserialize one raw record into a provider struct, mapping schema errors
/// to `MalformedRecord`
pub(crate) fn decode_record<T: serde::de::DeserializeOwned>(
    source: Source,
    raw: &Value,
) -> Result<T, FusionError> {
    T::deserialize(raw).map_err(|e| FusionError::MalformedRecord(format!("{source}: {e}")))
}

/// Numeric-or-string field as providers emit it (ids, epoch/ISO start times)
#[derive(Debug, Clone, serde::Deserialize)]
#[serde(untagged)]
pub(crate) enum NumberOrText {
    Number(f64),
    Text(String),
}
