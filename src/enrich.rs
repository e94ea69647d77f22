//! Cross-provider enrichment
//!
//! Fills power and cadence gaps in the merged timeline from auxiliary eBike
//! telemetry. Matching is greedy per auxiliary record: each one picks its best
//! same-day cycling candidate that still lacks power, and a target is claimed
//! by the first session that fills at least one of its fields.

use crate::normalizer::round_to;
use crate::types::{ActivityRecord, AuxActivity};

/// Minimum score a candidate must strictly exceed to be accepted
pub const DEFAULT_MIN_MATCH_SCORE: f64 = 0.6;

/// Substrings marking an activity as cycling for enrichment purposes
pub const CYCLING_KEYWORDS: [&str; 6] = ["biking", "cycling", "ride", "mountain", "vtt", "ebike"];

/// Matching rule for auxiliary telemetry
#[derive(Debug, Clone, PartialEq)]
pub struct MatchPolicy {
    pub min_score: f64,
    pub keywords: Vec<String>,
}

impl Default for MatchPolicy {
    fn default() -> Self {
        Self {
            min_score: DEFAULT_MIN_MATCH_SCORE,
            keywords: CYCLING_KEYWORDS.iter().map(|k| k.to_string()).collect(),
        }
    }
}

impl MatchPolicy {
    pub fn with_min_score(min_score: f64) -> Self {
        Self {
            min_score,
            ..Self::default()
        }
    }

    /// Case-insensitive keyword match over `activityType` and name
    pub fn is_cycling(&self, record: &ActivityRecord) -> bool {
        let haystack = format!("{} {}", record.activity_type, record.name).to_lowercase();
        self.keywords.iter().any(|k| haystack.contains(k.as_str()))
    }

    fn is_candidate(&self, target: &ActivityRecord, aux: &AuxActivity) -> bool {
        target.date == aux.date && target.avg_power.is_none() && self.is_cycling(target)
    }
}

/// `min(a, b) / max(a, b)`, or 0 when either side carries no data
pub fn similarity_ratio(a: f64, b: f64) -> f64 {
    if a <= 0.0 || b <= 0.0 {
        return 0.0;
    }
    a.min(b) / a.max(b)
}

/// Mean of duration and distance similarity
pub fn match_score(target: &ActivityRecord, aux: &AuxActivity) -> f64 {
    let duration = similarity_ratio(f64::from(target.duration_s), aux.duration_s);
    let distance = similarity_ratio(target.distance_km, aux.distance_km);
    (duration + distance) / 2.0
}

/// Fill-if-absent merge of auxiliary drivetrain data into `target`.
///
/// Returns `true` when at least one field was filled.
pub fn fill_from(target: &mut ActivityRecord, aux: &AuxActivity) -> bool {
    let mut filled = false;
    for (slot, value) in [
        (&mut target.avg_power, aux.avg_power),
        (&mut target.max_power, aux.max_power),
        (&mut target.avg_cadence, aux.avg_cadence),
        (&mut target.max_cadence, aux.max_cadence),
    ] {
        if slot.is_none() {
            if let Some(v) = value {
                *slot = Some(round_to(v, 1));
                filled = true;
            }
        }
    }
    filled
}

/// Enricher applying auxiliary telemetry to a timeline
pub struct Enricher {
    policy: MatchPolicy,
}

impl Default for Enricher {
    fn default() -> Self {
        Self::new(MatchPolicy::default())
    }
}

impl Enricher {
    pub fn new(policy: MatchPolicy) -> Self {
        Self { policy }
    }

    pub fn policy(&self) -> &MatchPolicy {
        &self.policy
    }

    /// Enrich `targets` in place; returns the number of records filled
    pub fn enrich(&self, targets: &mut [ActivityRecord], auxiliary: &[AuxActivity]) -> usize {
        let mut claimed = vec![false; targets.len()];
        let mut enriched = 0usize;

        for aux in auxiliary {
            let mut best: Option<(usize, f64)> = None;
            for (idx, target) in targets.iter().enumerate() {
                if claimed[idx] || !self.policy.is_candidate(target, aux) {
                    continue;
                }
                let score = match_score(target, aux);
                let best_score = best.map_or(self.policy.min_score, |(_, s)| s);
                if score > self.policy.min_score && score > best_score {
                    best = Some((idx, score));
                }
            }

            let Some((idx, score)) = best else {
                tracing::debug!(date = %aux.date, source = %aux.source, "No ride matched auxiliary session");
                continue;
            };

            let target = &mut targets[idx];
            if fill_from(target, aux) {
                claimed[idx] = true;
                enriched += 1;
                tracing::info!(
                    activity_id = %target.activity_id,
                    source = %aux.source,
                    score = round_to(score, 2),
                    "Enriched activity with eBike telemetry"
                );
            } else {
                // nothing filled, so the target stays open for later sessions
                tracing::debug!(
                    activity_id = %target.activity_id,
                    source = %aux.source,
                    "Matched session carried no missing fields"
                );
            }
        }

        enriched
    }
}

/// Enrich with the default policy
pub fn enrich(targets: &mut [ActivityRecord], auxiliary: &[AuxActivity]) -> usize {
    Enricher::default().enrich(targets, auxiliary)
}
