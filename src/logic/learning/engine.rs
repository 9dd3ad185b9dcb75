//! Learning Engine - Feedback Ingestion & Critical Adaptation
//!
//! Critical-path half of the learning loop: ingest feedback, keep the EMA
//! metrics current, detect critical feedback and compute the synchronous
//! model nudge. The batch half lives in `batch.rs`.
//!
//! Per-event clamps bound worst-case drift from a single (possibly
//! adversarial) report.

use chrono::Utc;

use crate::constants::{
    BIAS_NUDGE, DOMAIN_ERROR_BURST, HIGH_CONFIDENCE, THRESHOLD_NUDGE,
};
use crate::logic::model::metrics::{MetricsTracker, PerformanceMetrics};
use crate::logic::model::state::ModelState;

use super::batch::path_segments;
use super::buffer::{BufferStatus, FeedbackBuffer};
use super::types::{
    FalsePositivePattern, Feedback, FeedbackSource, PageClass, RollbackConsideration, UrlPattern,
};

/// Rollback-consideration records kept for diagnostics
const MAX_ROLLBACK_RECORDS: usize = 32;

// ============================================================================
// LEARNING ENGINE
// ============================================================================

/// What one ingest did - the facade turns this into a receipt
#[derive(Debug, Clone, Copy)]
pub struct IngestOutcome {
    pub critical: bool,
    pub buffer_full: bool,
    pub accuracy: f64,
}

pub struct LearningEngine {
    buffer: FeedbackBuffer,
    metrics: MetricsTracker,
    rollbacks: Vec<RollbackConsideration>,
    learning_rate: f64,
}

impl LearningEngine {
    pub fn new() -> Self {
        Self {
            buffer: FeedbackBuffer::new(crate::constants::get_buffer_capacity()),
            metrics: MetricsTracker::new(),
            rollbacks: Vec::new(),
            learning_rate: crate::constants::get_learning_rate(),
        }
    }

    pub fn learning_rate(&self) -> f64 {
        self.learning_rate
    }

    /// Buffer the feedback and update metrics. Criticality is evaluated
    /// after the push so the current feedback counts toward domain bursts.
    pub fn ingest(&mut self, feedback: &Feedback) -> IngestOutcome {
        let buffer_full = self.buffer.push(feedback.clone());
        self.metrics.record(
            feedback.system_classification.is_positive(),
            feedback.was_correct,
        );

        IngestOutcome {
            critical: self.is_critical(feedback),
            buffer_full,
            accuracy: self.metrics.metrics().accuracy,
        }
    }

    /// Critical feedback adapts the model synchronously, before the
    /// processing call returns. Any of:
    /// - high-confidence error
    /// - user manually reported the page as fraudulent
    /// - error burst: >= DOMAIN_ERROR_BURST incorrect feedbacks from the
    ///   same domain within 24h
    pub fn is_critical(&self, feedback: &Feedback) -> bool {
        if !feedback.was_correct && feedback.system_confidence > HIGH_CONFIDENCE {
            return true;
        }
        if feedback.user_classification == PageClass::Fraudulent
            && feedback.source == FeedbackSource::ManualReport
        {
            return true;
        }
        if let Some(domain) = feedback.domain() {
            if self.buffer.recent_incorrect_for_domain(&domain, Utc::now())
                >= DOMAIN_ERROR_BURST
            {
                return true;
            }
        }
        false
    }

    /// Compute the synchronous critical adaptation against a snapshot.
    /// Clamps only - weights are NOT renormalized here, the sum may drift
    /// off 1.0 until the next batch commit.
    pub fn apply_critical(
        &self,
        snapshot: &ModelState,
        feedback: &Feedback,
    ) -> (ModelState, Option<FalsePositivePattern>) {
        let mut state = snapshot.clone();
        let sign = if feedback.was_correct { 1.0 } else { -1.0 };

        for name in feedback.features.keys() {
            state.nudge_weight(name, sign * self.learning_rate);
        }

        if let Some(domain) = feedback.domain() {
            let delta = if feedback.is_false_positive() {
                -BIAS_NUDGE
            } else if feedback.is_false_negative() {
                BIAS_NUDGE
            } else {
                0.0
            };
            state.nudge_domain_bias(&domain, delta);
        }

        if !feedback.was_correct && feedback.system_confidence > HIGH_CONFIDENCE {
            if feedback.is_false_positive() {
                state.thresholds.job_posting += THRESHOLD_NUDGE;
            } else {
                state.thresholds.job_posting -= THRESHOLD_NUDGE;
            }
            state.thresholds.clamp_all();
        }

        let pattern = feedback.is_page_type_false_positive().then(|| {
            let domain = feedback.domain().unwrap_or_else(|| "unknown".to_string());
            let url_patterns = path_segments(&feedback.url)
                .into_iter()
                .map(|segment| UrlPattern {
                    pattern: segment,
                    confidence: 0.5,
                })
                .collect();
            FalsePositivePattern::new(domain, url_patterns, "critical_feedback", 0.5)
        });

        state.last_update = Utc::now();
        (state, pattern)
    }

    pub fn record_rollback(&mut self, record: RollbackConsideration) {
        log::warn!(
            "Batch rollback consideration: accuracy {:.3} -> {:.3}, keeping previous model",
            record.baseline_accuracy,
            record.observed_accuracy
        );
        self.rollbacks.push(record);
        if self.rollbacks.len() > MAX_ROLLBACK_RECORDS {
            self.rollbacks.remove(0);
        }
    }

    // ========================================================================
    // ACCESSORS
    // ========================================================================

    pub fn buffer(&self) -> &FeedbackBuffer {
        &self.buffer
    }

    pub fn buffer_mut(&mut self) -> &mut FeedbackBuffer {
        &mut self.buffer
    }

    pub fn buffer_status(&self) -> BufferStatus {
        self.buffer.status()
    }

    pub fn metrics(&self) -> PerformanceMetrics {
        self.metrics.snapshot()
    }

    pub fn rollbacks(&self) -> &[RollbackConsideration] {
        &self.rollbacks
    }
}

impl Default for LearningEngine {
    fn default() -> Self {
        Self::new()
    }
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn feedback(correct: bool, confidence: f64) -> Feedback {
        Feedback {
            classification_id: uuid::Uuid::new_v4().to_string(),
            url: "https://jobs.example.com/listing/42".to_string(),
            system_classification: PageClass::Fraudulent,
            user_classification: if correct {
                PageClass::Fraudulent
            } else {
                PageClass::Legitimate
            },
            was_correct: correct,
            system_confidence: confidence,
            features: HashMap::from([
                ("caps_ratio".to_string(), 0.6),
                ("urgency_score".to_string(), 0.8),
            ]),
            source: FeedbackSource::Correction,
            timestamp: Utc::now(),
        }
    }

    #[test]
    fn test_high_confidence_error_is_critical() {
        let engine = LearningEngine::new();
        assert!(engine.is_critical(&feedback(false, 0.9)));
        assert!(!engine.is_critical(&feedback(false, 0.5)));
        assert!(!engine.is_critical(&feedback(true, 0.9)));
    }

    #[test]
    fn test_manual_fraud_report_is_critical() {
        let engine = LearningEngine::new();
        let mut fb = feedback(true, 0.5);
        fb.user_classification = PageClass::Fraudulent;
        fb.source = FeedbackSource::ManualReport;
        assert!(engine.is_critical(&fb));
    }

    #[test]
    fn test_domain_burst_is_critical() {
        let mut engine = LearningEngine::new();

        let fb = feedback(false, 0.5); // not critical on its own
        assert!(!engine.ingest(&fb).critical);
        assert!(!engine.ingest(&feedback(false, 0.5)).critical);
        // Third incorrect feedback from jobs.example.com within 24h
        assert!(engine.ingest(&feedback(false, 0.5)).critical);
    }

    #[test]
    fn test_critical_adaptation_moves_weights_and_bias() {
        let engine = LearningEngine::new();
        let snapshot = ModelState::default();
        let fb = feedback(false, 0.9); // false positive, high confidence

        let (state, pattern) = engine.apply_critical(&snapshot, &fb);

        // Incorrect feedback pushes present feature weights down
        assert!(state.feature_weights["caps_ratio"] < snapshot.feature_weights["caps_ratio"]);
        assert!(state.feature_weights["urgency_score"] < snapshot.feature_weights["urgency_score"]);
        // Absent features untouched
        assert!(
            (state.feature_weights["link_density"] - snapshot.feature_weights["link_density"])
                .abs()
                < 1e-9
        );

        // False positive: domain bias down, job-posting threshold up
        assert!(state.domain_biases["jobs.example.com"].bias < 0.0);
        assert!(state.thresholds.job_posting > snapshot.thresholds.job_posting);

        // fraudulent->legitimate is not the page-type error
        assert!(pattern.is_none());
    }

    #[test]
    fn test_page_type_error_yields_pattern() {
        let engine = LearningEngine::new();
        let snapshot = ModelState::default();

        let mut fb = feedback(false, 0.9);
        fb.system_classification = PageClass::JobPosting;
        fb.user_classification = PageClass::LandingPage;

        let (state, pattern) = engine.apply_critical(&snapshot, &fb);
        let pattern = pattern.expect("page-type false positive must yield a pattern");

        assert_eq!(pattern.domain, "jobs.example.com");
        assert_eq!(pattern.source, "critical_feedback");
        assert!(!pattern.url_patterns.is_empty());
        // job_posting is a positive label, so this error is a false
        // positive - the threshold goes up
        assert!(state.thresholds.job_posting > snapshot.thresholds.job_posting);
    }

    #[test]
    fn test_weight_delta_visible_before_return() {
        // An incorrect high-confidence feedback must produce an observable
        // delta synchronously
        let mut engine = LearningEngine::new();
        let snapshot = ModelState::default();
        let fb = feedback(false, 0.9);

        let outcome = engine.ingest(&fb);
        assert!(outcome.critical);

        let (state, _) = engine.apply_critical(&snapshot, &fb);
        assert_ne!(
            state.feature_weights["caps_ratio"],
            snapshot.feature_weights["caps_ratio"]
        );
        assert!(outcome.accuracy < 1.0);
    }
}
