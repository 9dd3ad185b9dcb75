//! Model State - Live Adaptable Scoring Configuration
//!
//! Versioned configuration: feature weights, thresholds, domain biases,
//! pattern accuracy. Mutations always go through clamps; weights are
//! renormalized to sum 1 only at batch commit (critical-path nudges may
//! leave the sum transiently off - readers must tolerate that).

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::constants::{
    ANALYSIS_SKIP_CAP, BIAS_MAX, BIAS_MIN, CONFIDENCE_CAP, JOB_POSTING_CAP, JOB_POSTING_FLOOR,
    LANDING_PAGE_FLOOR, WEIGHT_MAX, WEIGHT_MIN,
};
use crate::logic::features::{is_known_feature, FEATURE_KEYS};
use crate::logic::persistence::{ClassificationRules, RuleType};

// ============================================================================
// THRESHOLDS
// ============================================================================

/// Pipeline thresholds, all in [0, 1]. Batch learning moves them inside
/// tighter floors/caps (see constants.rs).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Thresholds {
    /// Page looks like a job posting above this (external analyzer input)
    pub job_posting: f64,
    /// Page looks like a landing page above this
    pub landing_page: f64,
    /// Verdicts below this confidence are routed to manual review
    pub confidence: f64,
    /// Pages scoring above this skip deep structural analysis
    pub analysis_skip: f64,
}

impl Default for Thresholds {
    fn default() -> Self {
        Self {
            job_posting: 0.6,
            landing_page: 0.4,
            confidence: 0.7,
            analysis_skip: 0.85,
        }
    }
}

impl Thresholds {
    /// Clamp every threshold into its documented bound
    pub fn clamp_all(&mut self) {
        self.job_posting = self.job_posting.clamp(JOB_POSTING_FLOOR, JOB_POSTING_CAP);
        self.landing_page = self.landing_page.clamp(LANDING_PAGE_FLOOR, 1.0);
        self.confidence = self.confidence.clamp(0.0, CONFIDENCE_CAP);
        self.analysis_skip = self.analysis_skip.clamp(0.0, ANALYSIS_SKIP_CAP);
    }
}

// ============================================================================
// DOMAIN BIAS
// ============================================================================

/// Per-host adjustment reflecting historical accuracy on that host
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DomainBias {
    /// Added to the lexical score for this domain, in [-0.2, 0.2]
    pub bias: f64,
    pub accuracy: f64,
    pub false_positive_rate: f64,
    pub sample_count: u64,
    pub last_updated: DateTime<Utc>,
}

impl Default for DomainBias {
    fn default() -> Self {
        Self {
            bias: 0.0,
            accuracy: 1.0,
            false_positive_rate: 0.0,
            sample_count: 0,
            last_updated: Utc::now(),
        }
    }
}

// ============================================================================
// MODEL STATE
// ============================================================================

/// The live, adaptable scoring configuration.
/// Sole mutator: the learning side. Scoring reads `Arc` snapshots.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelState {
    /// Weight per documented feature key, each in [0.05, 0.5]
    pub feature_weights: HashMap<String, f64>,
    pub thresholds: Thresholds,
    /// Keyed by lower-cased host
    pub domain_biases: HashMap<String, DomainBias>,
    /// Mined pattern id → accuracy in [0, 1]
    pub pattern_accuracy: HashMap<String, f64>,
    pub last_update: DateTime<Utc>,
}

impl Default for ModelState {
    fn default() -> Self {
        let uniform = 1.0 / FEATURE_KEYS.len() as f64;
        let feature_weights = FEATURE_KEYS
            .iter()
            .map(|k| (k.to_string(), uniform))
            .collect();

        Self {
            feature_weights,
            thresholds: Thresholds::default(),
            domain_biases: HashMap::new(),
            pattern_accuracy: HashMap::new(),
            last_update: Utc::now(),
        }
    }
}

impl ModelState {
    /// Sum of all feature weights (1.0 after a batch commit, possibly not
    /// in between - critical nudges don't renormalize)
    pub fn weights_sum(&self) -> f64 {
        self.feature_weights.values().sum()
    }

    /// Learned bias for a domain, 0.0 when unknown
    pub fn bias_for(&self, domain: &str) -> f64 {
        self.domain_biases
            .get(domain)
            .map(|b| b.bias)
            .unwrap_or(0.0)
    }

    /// Nudge a single feature weight, clamped. Unknown keys are ignored.
    /// Returns true when the weight actually moved.
    pub fn nudge_weight(&mut self, feature: &str, delta: f64) -> bool {
        if !is_known_feature(feature) {
            log::debug!("Ignoring unknown feature key: {}", feature);
            return false;
        }
        let weight = self
            .feature_weights
            .entry(feature.to_string())
            .or_insert(WEIGHT_MIN);
        let before = *weight;
        *weight = (*weight + delta).clamp(WEIGHT_MIN, WEIGHT_MAX);
        (*weight - before).abs() > f64::EPSILON
    }

    /// Nudge a domain bias, clamped, and bump its sample count
    pub fn nudge_domain_bias(&mut self, domain: &str, delta: f64) {
        let entry = self.domain_biases.entry(domain.to_string()).or_default();
        entry.bias = (entry.bias + delta).clamp(BIAS_MIN, BIAS_MAX);
        entry.sample_count += 1;
        entry.last_updated = Utc::now();
    }

    /// Renormalize all feature weights to sum 1 while keeping every weight
    /// inside [0.05, 0.5]. The ONLY renormalization point (batch commit).
    ///
    /// Equal-share redistribution with clamping: each pass spreads the
    /// remaining deficit/surplus over the weights that can still move, so
    /// at least one weight saturates per pass and the loop terminates.
    pub fn renormalize_weights(&mut self) {
        let n = self.feature_weights.len();
        if n == 0 {
            return;
        }

        for weight in self.feature_weights.values_mut() {
            *weight = weight.clamp(WEIGHT_MIN, WEIGHT_MAX);
        }

        for _ in 0..=n {
            let sum = self.weights_sum();
            let diff = 1.0 - sum;
            if diff.abs() < 1e-9 {
                return;
            }

            let movable: Vec<String> = self
                .feature_weights
                .iter()
                .filter(|(_, w)| {
                    if diff > 0.0 {
                        **w < WEIGHT_MAX - f64::EPSILON
                    } else {
                        **w > WEIGHT_MIN + f64::EPSILON
                    }
                })
                .map(|(k, _)| k.clone())
                .collect();

            if movable.is_empty() {
                log::warn!("Weight renormalization saturated at sum {:.4}", sum);
                return;
            }

            let share = diff / movable.len() as f64;
            for key in movable {
                if let Some(weight) = self.feature_weights.get_mut(&key) {
                    *weight = (*weight + share).clamp(WEIGHT_MIN, WEIGHT_MAX);
                }
            }
        }
    }

    // ========================================================================
    // RULE PAYLOADS (store wire format)
    // ========================================================================

    pub fn weights_payload(&self) -> serde_json::Value {
        serde_json::json!({ "feature_weights": self.feature_weights })
    }

    pub fn thresholds_payload(&self) -> serde_json::Value {
        serde_json::to_value(self.thresholds).unwrap_or_default()
    }

    pub fn domain_rules_payload(&self) -> serde_json::Value {
        serde_json::json!({ "domain_biases": self.domain_biases })
    }

    /// Apply rule sets loaded from the store over the current values.
    /// Malformed payloads and unknown feature keys are skipped, never fatal -
    /// a broken store must leave in-memory defaults intact.
    pub fn apply_rules(&mut self, rule_sets: &[ClassificationRules]) {
        for set in rule_sets {
            match set.rule_type {
                RuleType::Weights => self.apply_weight_rules(&set.rules),
                RuleType::Thresholds => self.apply_threshold_rules(&set.rules),
                RuleType::DomainRules => self.apply_domain_rules(&set.rules),
            }
        }
    }

    fn apply_weight_rules(&mut self, payload: &serde_json::Value) {
        let Some(map) = payload.get("feature_weights").and_then(|v| v.as_object()) else {
            log::warn!("Malformed weights payload, keeping current weights");
            return;
        };
        for (key, value) in map {
            if !is_known_feature(key) {
                log::debug!("Rejecting unknown feature key from store: {}", key);
                continue;
            }
            if let Some(weight) = value.as_f64() {
                self.feature_weights
                    .insert(key.clone(), weight.clamp(WEIGHT_MIN, WEIGHT_MAX));
            }
        }
    }

    fn apply_threshold_rules(&mut self, payload: &serde_json::Value) {
        match serde_json::from_value::<Thresholds>(payload.clone()) {
            Ok(mut thresholds) => {
                thresholds.clamp_all();
                self.thresholds = thresholds;
            }
            Err(e) => log::warn!("Malformed thresholds payload: {}", e),
        }
    }

    fn apply_domain_rules(&mut self, payload: &serde_json::Value) {
        let Some(value) = payload.get("domain_biases") else {
            log::warn!("Malformed domain rules payload, keeping current biases");
            return;
        };
        match serde_json::from_value::<HashMap<String, DomainBias>>(value.clone()) {
            Ok(mut biases) => {
                for bias in biases.values_mut() {
                    bias.bias = bias.bias.clamp(BIAS_MIN, BIAS_MAX);
                }
                self.domain_biases = biases;
            }
            Err(e) => log::warn!("Malformed domain bias entries: {}", e),
        }
    }
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_weights_sum_to_one() {
        let state = ModelState::default();
        assert!((state.weights_sum() - 1.0).abs() < 1e-9);
        for weight in state.feature_weights.values() {
            assert!((WEIGHT_MIN..=WEIGHT_MAX).contains(weight));
        }
    }

    #[test]
    fn test_nudge_weight_clamps() {
        let mut state = ModelState::default();
        for _ in 0..100 {
            state.nudge_weight("caps_ratio", 0.02);
        }
        assert!((state.feature_weights["caps_ratio"] - WEIGHT_MAX).abs() < 1e-9);

        for _ in 0..100 {
            state.nudge_weight("caps_ratio", -0.02);
        }
        assert!((state.feature_weights["caps_ratio"] - WEIGHT_MIN).abs() < 1e-9);
    }

    #[test]
    fn test_nudge_unknown_feature_ignored() {
        let mut state = ModelState::default();
        assert!(!state.nudge_weight("not_a_feature", 0.02));
        assert!(!state.feature_weights.contains_key("not_a_feature"));
    }

    #[test]
    fn test_renormalize_from_skewed_weights() {
        let mut state = ModelState::default();
        // Skew hard: one weight at max, the rest at min
        for (i, key) in crate::logic::features::FEATURE_KEYS.iter().enumerate() {
            let value = if i == 0 { WEIGHT_MAX } else { WEIGHT_MIN };
            state.feature_weights.insert(key.to_string(), value);
        }

        state.renormalize_weights();

        assert!((state.weights_sum() - 1.0).abs() < 1e-6);
        for weight in state.feature_weights.values() {
            assert!(
                (WEIGHT_MIN - 1e-9..=WEIGHT_MAX + 1e-9).contains(weight),
                "weight out of bounds: {}",
                weight
            );
        }
    }

    #[test]
    fn test_renormalize_survives_many_adaptation_steps() {
        let mut state = ModelState::default();
        for step in 0..200 {
            let key = crate::logic::features::FEATURE_KEYS[step % 8];
            let delta = if step % 3 == 0 { 0.02 } else { -0.02 };
            state.nudge_weight(key, delta);

            if step % 50 == 49 {
                state.renormalize_weights();
                assert!((state.weights_sum() - 1.0).abs() < 1e-6);
            }
        }
    }

    #[test]
    fn test_domain_bias_clamps() {
        let mut state = ModelState::default();
        for _ in 0..100 {
            state.nudge_domain_bias("scam.example", -0.01);
        }
        let bias = &state.domain_biases["scam.example"];
        assert!((bias.bias - BIAS_MIN).abs() < 1e-9);
        assert_eq!(bias.sample_count, 100);
    }

    #[test]
    fn test_apply_rules_rejects_unknown_keys() {
        let mut state = ModelState::default();
        let rules = vec![ClassificationRules {
            rule_type: RuleType::Weights,
            rules: serde_json::json!({
                "feature_weights": { "caps_ratio": 0.3, "evil_key": 0.9 }
            }),
        }];

        state.apply_rules(&rules);

        assert!((state.feature_weights["caps_ratio"] - 0.3).abs() < 1e-9);
        assert!(!state.feature_weights.contains_key("evil_key"));
    }

    #[test]
    fn test_apply_malformed_payload_keeps_defaults() {
        let mut state = ModelState::default();
        let before = state.thresholds;
        let rules = vec![ClassificationRules {
            rule_type: RuleType::Thresholds,
            rules: serde_json::json!("not an object"),
        }];

        state.apply_rules(&rules);
        assert_eq!(state.thresholds, before);
    }
}
