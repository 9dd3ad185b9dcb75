//! Batch Learning - Mining & Bulk Recalibration
//!
//! Triggered at buffer capacity. Mines the buffered feedback, builds a
//! candidate ModelState (weights, domain biases, thresholds, url patterns)
//! and hands it back for validation/commit. Long-running store I/O happens
//! in the facade, off the classification hot path.

use std::collections::{BTreeSet, HashMap};

use chrono::Utc;

use crate::constants::{
    ANALYSIS_SKIP_CAP, BATCH_CONFIDENCE_SPLIT, BIAS_MAX, BIAS_MIN, CONFIDENCE_CAP,
    ERROR_SHARE_TRIGGER, JOB_POSTING_CAP, JOB_POSTING_FLOOR, LANDING_PAGE_FLOOR,
    MINED_PATTERN_CONFIDENCE, MIN_DOMAIN_SAMPLES, MIN_FEATURE_SAMPLES,
};
use crate::logic::model::state::ModelState;

use super::types::{FalsePositivePattern, Feedback, UrlPattern};

// ============================================================================
// MINED STATISTICS
// ============================================================================

#[derive(Debug, Clone, Default)]
pub struct DomainTally {
    pub correct: usize,
    pub incorrect: usize,
    pub false_positives: usize,
    pub false_negatives: usize,
}

impl DomainTally {
    pub fn total(&self) -> usize {
        self.correct + self.incorrect
    }
}

#[derive(Debug, Clone, Default)]
pub struct FeatureSplit {
    pub correct_values: Vec<f64>,
    pub incorrect_values: Vec<f64>,
}

/// Everything the update passes need, mined in one walk over the buffer
#[derive(Debug, Clone, Default)]
pub struct MinedStats {
    pub domains: HashMap<String, DomainTally>,
    pub features: HashMap<String, FeatureSplit>,
    /// (url, is_false_positive) per incorrect verdict
    pub error_urls: Vec<(String, bool)>,
    pub high_confidence_errors: usize,
    pub low_confidence_errors: usize,
    pub false_positives: usize,
    pub false_negatives: usize,
}

impl MinedStats {
    pub fn total_errors(&self) -> usize {
        self.false_positives + self.false_negatives
    }
}

/// Result of one batch pass
#[derive(Debug, Clone, Default)]
pub struct BatchOutcome {
    pub feedback_count: usize,
    pub committed: bool,
    pub rolled_back: bool,
    pub patterns_mined: usize,
}

// ============================================================================
// MINING
// ============================================================================

pub fn mine(entries: &[Feedback]) -> MinedStats {
    let mut stats = MinedStats::default();

    for fb in entries {
        if let Some(domain) = fb.domain() {
            let tally = stats.domains.entry(domain).or_default();
            if fb.was_correct {
                tally.correct += 1;
            } else {
                tally.incorrect += 1;
                if fb.is_false_positive() {
                    tally.false_positives += 1;
                } else {
                    tally.false_negatives += 1;
                }
            }
        }

        for (name, value) in &fb.features {
            let split = stats.features.entry(name.clone()).or_default();
            if fb.was_correct {
                split.correct_values.push(*value);
            } else {
                split.incorrect_values.push(*value);
            }
        }

        if !fb.was_correct {
            let is_fp = fb.is_false_positive();
            stats.error_urls.push((fb.url.clone(), is_fp));
            if is_fp {
                stats.false_positives += 1;
            } else {
                stats.false_negatives += 1;
            }
            if fb.system_confidence >= BATCH_CONFIDENCE_SPLIT {
                stats.high_confidence_errors += 1;
            } else {
                stats.low_confidence_errors += 1;
            }
        }
    }

    stats
}

// ============================================================================
// CANDIDATE CONSTRUCTION
// ============================================================================

/// Build the candidate state from a snapshot. Pure computation - no I/O.
/// The caller validates and commits (or discards) the result.
pub fn build_candidate(
    snapshot: &ModelState,
    stats: &MinedStats,
    learning_rate: f64,
) -> (ModelState, Vec<FalsePositivePattern>) {
    let mut state = snapshot.clone();

    update_weights(&mut state, stats, learning_rate);
    update_domain_biases(&mut state, stats);
    update_thresholds(&mut state, stats);
    let patterns = mine_url_patterns(&mut state, stats);

    (state, patterns)
}

/// Features with enough samples on both sides move by their discriminative
/// power; the whole map is then renormalized to sum 1 - the only
/// renormalization point in the system.
fn update_weights(state: &mut ModelState, stats: &MinedStats, learning_rate: f64) {
    for (name, split) in &stats.features {
        if split.correct_values.len() < MIN_FEATURE_SAMPLES
            || split.incorrect_values.len() < MIN_FEATURE_SAMPLES
        {
            continue;
        }

        let mean_correct = mean(&split.correct_values);
        let mean_incorrect = mean(&split.incorrect_values);
        let discriminative_power = (mean_correct - mean_incorrect).abs();
        let sign = if mean_correct > mean_incorrect { 1.0 } else { -1.0 };

        if state.nudge_weight(name, sign * learning_rate * discriminative_power) {
            log::debug!(
                "Batch weight update: {} moved by {:+.4} (power {:.3})",
                name,
                sign * learning_rate * discriminative_power,
                discriminative_power
            );
        }
    }

    state.renormalize_weights();
}

fn update_domain_biases(state: &mut ModelState, stats: &MinedStats) {
    for (domain, tally) in &stats.domains {
        if tally.total() < MIN_DOMAIN_SAMPLES {
            continue;
        }

        let accuracy = tally.correct as f64 / tally.total() as f64;
        let mut bias = if accuracy < 0.7 {
            -0.1 * (0.7 - accuracy)
        } else if accuracy > 0.9 {
            0.05 * (accuracy - 0.9)
        } else {
            0.0
        };

        let fp_rate = tally.false_positives as f64 / tally.total() as f64;
        if fp_rate > 0.2 {
            bias -= 0.05 * fp_rate;
        }

        let entry = state.domain_biases.entry(domain.clone()).or_default();
        entry.bias = bias.clamp(BIAS_MIN, BIAS_MAX);
        entry.accuracy = accuracy;
        entry.false_positive_rate = fp_rate;
        entry.sample_count += tally.total() as u64;
        entry.last_updated = Utc::now();
    }
}

fn update_thresholds(state: &mut ModelState, stats: &MinedStats) {
    let total_errors = stats.total_errors();
    if total_errors > 0 {
        let fp_share = stats.false_positives as f64 / total_errors as f64;
        let fn_share = stats.false_negatives as f64 / total_errors as f64;
        let t = &mut state.thresholds;

        if fp_share > ERROR_SHARE_TRIGGER {
            // Too many false alarms: demand more evidence
            t.job_posting = (t.job_posting + 0.02).min(JOB_POSTING_CAP);
            t.analysis_skip = (t.analysis_skip + 0.01).min(ANALYSIS_SKIP_CAP);
        } else if fn_share > ERROR_SHARE_TRIGGER {
            // Missing fraud: lower the bar
            t.job_posting = (t.job_posting - 0.02).max(JOB_POSTING_FLOOR);
            t.landing_page = (t.landing_page - 0.01).max(LANDING_PAGE_FLOOR);
        }
    }

    if stats.high_confidence_errors > stats.low_confidence_errors {
        let t = &mut state.thresholds;
        t.confidence = (t.confidence + 0.02).min(CONFIDENCE_CAP);
    }
}

/// Group false-positive urls by domain; domains with >= 2 urls yield the
/// path segments and query keys common to all of them.
fn mine_url_patterns(state: &mut ModelState, stats: &MinedStats) -> Vec<FalsePositivePattern> {
    let mut by_domain: HashMap<String, Vec<&str>> = HashMap::new();
    for (url, is_fp) in &stats.error_urls {
        if !is_fp {
            continue;
        }
        if let Some(domain) = crate::logic::oracle::extract_domain(url) {
            by_domain.entry(domain).or_default().push(url);
        }
    }

    let mut patterns = Vec::new();
    for (domain, urls) in by_domain {
        if urls.len() < 2 {
            continue;
        }

        let mut common_segments: Option<BTreeSet<String>> = None;
        let mut common_keys: Option<BTreeSet<String>> = None;
        for url in &urls {
            let segments: BTreeSet<String> = path_segments(url).into_iter().collect();
            let keys: BTreeSet<String> = query_keys(url).into_iter().collect();
            common_segments = Some(match common_segments {
                Some(acc) => acc.intersection(&segments).cloned().collect(),
                None => segments,
            });
            common_keys = Some(match common_keys {
                Some(acc) => acc.intersection(&keys).cloned().collect(),
                None => keys,
            });
        }

        let mut url_patterns: Vec<UrlPattern> = Vec::new();
        for segment in common_segments.unwrap_or_default() {
            url_patterns.push(UrlPattern {
                pattern: segment,
                confidence: MINED_PATTERN_CONFIDENCE,
            });
        }
        for key in common_keys.unwrap_or_default() {
            url_patterns.push(UrlPattern {
                pattern: format!("?{}", key),
                confidence: MINED_PATTERN_CONFIDENCE,
            });
        }

        if url_patterns.is_empty() {
            continue;
        }

        let pattern = FalsePositivePattern::new(
            domain,
            url_patterns,
            "batch_url_mining",
            MINED_PATTERN_CONFIDENCE,
        );
        state
            .pattern_accuracy
            .insert(pattern.id.clone(), MINED_PATTERN_CONFIDENCE);
        patterns.push(pattern);
    }

    patterns
}

// ============================================================================
// URL HELPERS
// ============================================================================

/// Non-empty path segments of a url
pub fn path_segments(url: &str) -> Vec<String> {
    let rest = match url.find("://") {
        Some(idx) => &url[idx + 3..],
        None => url,
    };
    let Some(path_start) = rest.find('/') else {
        return vec![];
    };
    let path = &rest[path_start + 1..];
    let path = path.split(['?', '#']).next().unwrap_or(path);

    path.split('/')
        .filter(|s| !s.is_empty())
        .map(|s| s.to_lowercase())
        .collect()
}

/// Query parameter keys of a url
pub fn query_keys(url: &str) -> Vec<String> {
    let Some(query_start) = url.find('?') else {
        return vec![];
    };
    let query = &url[query_start + 1..];
    let query = query.split('#').next().unwrap_or(query);

    query
        .split('&')
        .filter_map(|pair| pair.split('=').next())
        .filter(|k| !k.is_empty())
        .map(|k| k.to_lowercase())
        .collect()
}

fn mean(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    values.iter().sum::<f64>() / values.len() as f64
}

// ============================================================================
// TESTS
// ============================================================================
