//! Summary encoding
//!
//! This module renders a reconciled timeline into the JSON summary document
//! consumed by the front-end. Field names follow the canonical record schema.

use crate::compare::ComparisonResult;
use crate::error::FusionError;
use crate::intensity::WeeklyIntensity;
use crate::pipeline::{ProviderCounts, ReconciledTimeline};
use crate::types::ActivityRecord;
use crate::{FUSION_VERSION, PRODUCER_NAME};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Metadata identifying the run that produced a document
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Producer {
    pub name: String,
    pub version: String,
    pub instance_id: String,
}

/// Summary document written at the end of a run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SummaryDocument {
    pub producer: Producer,
    #[serde(rename = "generated_at")]
    pub generated_at: DateTime<Utc>,
    pub latest_activity: Option<ActivityRecord>,
    /// `None` when the timeline is empty
    pub activity_history: Option<Vec<ActivityRecord>>,
    #[serde(default)]
    pub enriched_count: usize,
    #[serde(default)]
    pub providers: ProviderCounts,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub weekly_intensity: Option<WeeklyIntensity>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub historical_comparison: Option<ComparisonResult>,
}

impl SummaryDocument {
    /// Activity timeline of the document, most recent first
    pub fn activities(&self) -> Vec<ActivityRecord> {
        match (&self.activity_history, &self.latest_activity) {
            (Some(history), _) if !history.is_empty() => history.clone(),
            (_, Some(latest)) => vec![latest.clone()],
            _ => Vec::new(),
        }
    }

    pub fn from_json(json: &str) -> Result<Self, FusionError> {
        Ok(serde_json::from_str(json)?)
    }
}

/// Encoder for producing summary documents
pub struct SummaryEncoder {
    instance_id: String,
}

impl Default for SummaryEncoder {
    fn default() -> Self {
        Self::new()
    }
}

impl SummaryEncoder {
    /// Create a new encoder with a unique instance ID
    pub fn new() -> Self {
        Self {
            instance_id: Uuid::new_v4().to_string(),
        }
    }

    /// Create an encoder with a specific instance ID
    pub fn with_instance_id(instance_id: String) -> Self {
        Self { instance_id }
    }

    pub fn encode(
        &self,
        timeline: &ReconciledTimeline,
        weekly_intensity: Option<WeeklyIntensity>,
    ) -> SummaryDocument {
        SummaryDocument {
            producer: Producer {
                name: PRODUCER_NAME.to_string(),
                version: FUSION_VERSION.to_string(),
                instance_id: self.instance_id.clone(),
            },
            generated_at: Utc::now(),
            latest_activity: timeline.latest().cloned(),
            activity_history: (!timeline.is_empty()).then(|| timeline.activities.clone()),
            enriched_count: timeline.enriched_count,
            providers: timeline.providers,
            weekly_intensity,
            historical_comparison: timeline.comparison.clone(),
        }
    }

    /// Encode to a JSON string
    pub fn encode_to_json(
        &self,
        timeline: &ReconciledTimeline,
        weekly_intensity: Option<WeeklyIntensity>,
        pretty: bool,
    ) -> Result<String, FusionError> {
        let document = self.encode(timeline, weekly_intensity);
        let json = if pretty {
            serde_json::to_string_pretty(&document)?
        } else {
            serde_json::to_string(&document)?
        };
        Ok(json)
    }
}
