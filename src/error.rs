//! Error types for Activity Fusion

use thiserror::Error;

/// Errors that can occur while reconciling provider activities
#[derive(Debug, Error)]
pub enum FusionError {
    #[error("Provider {provider} unavailable: {reason}")]
    ProviderUnavailable { provider: String, reason: String },

    #[error("Malformed record: {0}")]
    MalformedRecord(String),

    #[error("Skipped activity {activity_id}: non-positive distance")]
    SkippedZeroDistance { activity_id: String },

    #[error("Cache corrupt: {0}")]
    CacheCorrupt(String),

    #[error("No comparable data: {0}")]
    NoComparableData(String),

    #[error("Invalid JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Date parse error: {0}")]
    DateParse(String),

    #[error("Configuration error: {0}")]
    Config(String),
}

impl FusionError {
    /// Shorthand for a provider-level failure
    pub fn unavailable(provider: impl Into<String>, reason: impl ToString) -> Self {
        FusionError::ProviderUnavailable {
            provider: provider.into(),
            reason: reason.to_string(),
        }
    }

    /// Whether the pipeline recovers from this error by dropping data instead of aborting
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            FusionError::ProviderUnavailable { .. }
                | FusionError::MalformedRecord(_)
                | FusionError::SkippedZeroDistance { .. }
                | FusionError::CacheCorrupt(_)
                | FusionError::NoComparableData(_)
        )
    }
}
