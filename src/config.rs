//! Runtime configuration loaded from environment variables.
//!
//! Every tunable of the pipeline has a default; environment variables (or a
//! `.env` file) override them, and CLI flags override the environment.

use crate::cache::DEFAULT_CACHE_TTL_HOURS;
use crate::enrich::DEFAULT_MIN_MATCH_SCORE;
use crate::intensity::DEFAULT_WEEKLY_WINDOW;
use crate::merge::DEFAULT_DEDUP_TOLERANCE_KM;
use chrono::Duration;
use std::env;
use std::path::PathBuf;
use std::str::FromStr;

/// Number of rides listed in a ride report by default
pub const DEFAULT_RIDE_HISTORY: usize = 20;

pub const ENV_CACHE_DIR: &str = "FUSION_CACHE_DIR";
pub const ENV_CACHE_TTL_HOURS: &str = "FUSION_CACHE_TTL_HOURS";
pub const ENV_DEDUP_TOLERANCE_KM: &str = "FUSION_DEDUP_TOLERANCE_KM";
pub const ENV_ENRICH_MIN_SCORE: &str = "FUSION_ENRICH_MIN_SCORE";
pub const ENV_RIDE_HISTORY: &str = "FUSION_RIDE_HISTORY";

#[derive(Debug, Clone, PartialEq)]
pub struct FusionConfig {
    /// Directory holding provider cache files
    pub cache_dir: PathBuf,
    /// Cache freshness window, read from hours
    pub cache_ttl: Duration,
    pub dedup_tolerance_km: f64,
    pub enrich_min_score: f64,
    pub ride_history: usize,
    pub weekly_window: usize,
}

impl Default for FusionConfig {
    fn default() -> Self {
        Self {
            cache_dir: PathBuf::from("."),
            cache_ttl: Duration::hours(DEFAULT_CACHE_TTL_HOURS),
            dedup_tolerance_km: DEFAULT_DEDUP_TOLERANCE_KM,
            enrich_min_score: DEFAULT_MIN_MATCH_SCORE,
            ride_history: DEFAULT_RIDE_HISTORY,
            weekly_window: DEFAULT_WEEKLY_WINDOW,
        }
    }
}

impl FusionConfig {
    /// Load configuration from the process environment.
    ///
    /// A `.env` file in the working directory is loaded first when present.
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Build a configuration from any key/value lookup
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();
        let config = Self {
            cache_dir: lookup(ENV_CACHE_DIR)
                .filter(|v| !v.trim().is_empty())
                .map(PathBuf::from)
                .unwrap_or(defaults.cache_dir),
            cache_ttl: match parse_var(&lookup, ENV_CACHE_TTL_HOURS)? {
                Some(hours) => ttl_from_hours(hours)?,
                None => defaults.cache_ttl,
            },
            dedup_tolerance_km: parse_var(&lookup, ENV_DEDUP_TOLERANCE_KM)?
                .unwrap_or(defaults.dedup_tolerance_km),
            enrich_min_score: parse_var(&lookup, ENV_ENRICH_MIN_SCORE)?
                .unwrap_or(defaults.enrich_min_score),
            ride_history: parse_var(&lookup, ENV_RIDE_HISTORY)?.unwrap_or(defaults.ride_history),
            weekly_window: defaults.weekly_window,
        };
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.cache_ttl <= Duration::zero() {
            return Err(ConfigError::Invalid {
                key: ENV_CACHE_TTL_HOURS,
                value: self.cache_ttl.num_hours().to_string(),
            });
        }
        if !self.dedup_tolerance_km.is_finite() || self.dedup_tolerance_km < 0.0 {
            return Err(ConfigError::Invalid {
                key: ENV_DEDUP_TOLERANCE_KM,
                value: self.dedup_tolerance_km.to_string(),
            });
        }
        if !(0.0..=1.0).contains(&self.enrich_min_score) {
            return Err(ConfigError::Invalid {
                key: ENV_ENRICH_MIN_SCORE,
                value: self.enrich_min_score.to_string(),
            });
        }
        Ok(())
    }
}

/// Hours beyond chrono's range are rejected rather than panicking
fn ttl_from_hours(hours: i64) -> Result<Duration, ConfigError> {
    Duration::try_hours(hours).ok_or_else(|| ConfigError::Invalid {
        key: ENV_CACHE_TTL_HOURS,
        value: hours.to_string(),
    })
}

fn parse_var<T, F>(lookup: &F, key: &'static str) -> Result<Option<T>, ConfigError>
where
    T: FromStr,
    F: Fn(&str) -> Option<String>,
{
    match lookup(key) {
        None => Ok(None),
        Some(raw) if raw.trim().is_empty() => Ok(None),
        Some(raw) => raw
            .trim()
            .parse()
            .map(Some)
            .map_err(|_| ConfigError::Invalid { key, value: raw }),
    }
}

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Invalid value for {key}: {value:?}")]
    Invalid { key: &'static str, value: String },
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use std::collections::HashMap;

    fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_defaults_when_unset() {
        let config = FusionConfig::from_lookup(lookup_from(&[])).unwrap();
        assert_eq!(config, FusionConfig::default());
        assert_eq!(config.cache_ttl, Duration::hours(12));
        assert_eq!(config.dedup_tolerance_km, 2.0);
        assert_eq!(config.enrich_min_score, 0.6);
    }

    #[test]
    fn test_overrides_from_lookup() {
        let config = FusionConfig::from_lookup(lookup_from(&[
            (ENV_CACHE_DIR, "/tmp/fusion"),
            (ENV_CACHE_TTL_HOURS, "6"),
            (ENV_DEDUP_TOLERANCE_KM, " 1.5 "),
            (ENV_ENRICH_MIN_SCORE, "0.75"),
            (ENV_RIDE_HISTORY, "5"),
        ]))
        .unwrap();

        assert_eq!(config.cache_dir, PathBuf::from("/tmp/fusion"));
        assert_eq!(config.cache_ttl, Duration::hours(6));
        assert_eq!(config.dedup_tolerance_km, 1.5);
        assert_eq!(config.enrich_min_score, 0.75);
        assert_eq!(config.ride_history, 5);
    }

    #[test]
    fn test_unparsable_value_is_rejected() {
        let err = FusionConfig::from_lookup(lookup_from(&[(ENV_DEDUP_TOLERANCE_KM, "two")]))
            .unwrap_err();
        assert!(matches!(
            err,
            ConfigError::Invalid { key: ENV_DEDUP_TOLERANCE_KM, .. }
        ));
    }

    #[test]
    fn test_out_of_range_values_are_rejected() {
        assert!(FusionConfig::from_lookup(lookup_from(&[(ENV_CACHE_TTL_HOURS, "0")])).is_err());
        assert!(FusionConfig::from_lookup(lookup_from(&[(ENV_ENRICH_MIN_SCORE, "1.5")])).is_err());
    }

    #[test]
    fn test_huge_cache_ttl_is_rejected() {
        let err = FusionConfig::from_lookup(lookup_from(&[(ENV_CACHE_TTL_HOURS, "9000000000000")]))
            .unwrap_err();
        assert!(matches!(
            err,
            ConfigError::Invalid { key: ENV_CACHE_TTL_HOURS, .. }
        ));
        assert_eq!(
            err.to_string(),
            "Invalid value for FUSION_CACHE_TTL_HOURS: \"9000000000000\""
        );
    }
}
