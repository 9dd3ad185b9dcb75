//! Performance Metrics - EMA Accuracy Tracking
//!
//! Every feedback updates accuracy and error rates via exponential moving
//! average (alpha = 0.1); precision/recall come from running tallies.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::constants::EMA_ALPHA;

// ============================================================================
// METRICS
// ============================================================================

/// Rolling performance snapshot (EMA state)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PerformanceMetrics {
    pub accuracy: f64,
    pub precision: f64,
    pub recall: f64,
    pub false_positive_rate: f64,
    pub false_negative_rate: f64,
    pub total_samples: u64,
    pub last_calculated: DateTime<Utc>,
}

impl Default for PerformanceMetrics {
    fn default() -> Self {
        Self {
            accuracy: 1.0,
            precision: 1.0,
            recall: 1.0,
            false_positive_rate: 0.0,
            false_negative_rate: 0.0,
            total_samples: 0,
            last_calculated: Utc::now(),
        }
    }
}

// ============================================================================
// TRACKER
// ============================================================================

/// Owns the EMA state plus the tp/fp/tn/fn tallies behind precision/recall
#[derive(Debug, Clone, Default)]
pub struct MetricsTracker {
    metrics: PerformanceMetrics,
    true_positives: u64,
    false_positives: u64,
    true_negatives: u64,
    false_negatives: u64,
}

impl MetricsTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record one feedback. `system_positive` = the system's label was in
    /// the fraud direction (fraudulent / job_posting).
    pub fn record(&mut self, system_positive: bool, was_correct: bool) {
        let alpha = EMA_ALPHA;
        let m = &mut self.metrics;

        let observed = if was_correct { 1.0 } else { 0.0 };
        m.accuracy = (1.0 - alpha) * m.accuracy + alpha * observed;

        if was_correct {
            // Both error rates decay toward zero
            m.false_positive_rate *= 1.0 - alpha;
            m.false_negative_rate *= 1.0 - alpha;
            if system_positive {
                self.true_positives += 1;
            } else {
                self.true_negatives += 1;
            }
        } else if system_positive {
            // Flagged fraud, user says legitimate
            m.false_positive_rate = (1.0 - alpha) * m.false_positive_rate + alpha;
            m.false_negative_rate *= 1.0 - alpha;
            self.false_positives += 1;
        } else {
            // Missed fraud
            m.false_negative_rate = (1.0 - alpha) * m.false_negative_rate + alpha;
            m.false_positive_rate *= 1.0 - alpha;
            self.false_negatives += 1;
        }

        m.total_samples += 1;

        let flagged = self.true_positives + self.false_positives;
        if flagged > 0 {
            m.precision = self.true_positives as f64 / flagged as f64;
        }
        let actual_fraud = self.true_positives + self.false_negatives;
        if actual_fraud > 0 {
            m.recall = self.true_positives as f64 / actual_fraud as f64;
        }

        m.last_calculated = Utc::now();
    }

    pub fn metrics(&self) -> &PerformanceMetrics {
        &self.metrics
    }

    pub fn snapshot(&self) -> PerformanceMetrics {
        self.metrics.clone()
    }
}

// ============================================================================
// TESTS
// ============================================================================
