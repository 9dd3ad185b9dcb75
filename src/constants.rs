//! Central Configuration Constants
//!
//! Single source of truth for learning/scoring tunables.
//! To change the learning rate or buffer capacity, only edit this file.

/// Learning rate for weight nudges (critical path and batch)
pub const LEARNING_RATE: f64 = 0.02;

/// Per-event domain bias nudge
pub const BIAS_NUDGE: f64 = 0.01;

/// Per-event threshold nudge on high-confidence errors
pub const THRESHOLD_NUDGE: f64 = 0.01;

/// EMA smoothing factor for performance metrics
pub const EMA_ALPHA: f64 = 0.1;

/// Feedback buffer capacity - reaching it triggers batch learning
pub const BUFFER_CAPACITY: usize = 50;

/// Processed feedback older than this is evicted after a batch
pub const FEEDBACK_TTL_HOURS: i64 = 24;

/// Feedback above this confidence counts as high-confidence
pub const HIGH_CONFIDENCE: f64 = 0.8;

/// Confidence split used when mining batch error statistics
pub const BATCH_CONFIDENCE_SPLIT: f64 = 0.7;

/// Incorrect feedbacks from one domain within 24h to count as critical
pub const DOMAIN_ERROR_BURST: usize = 3;

// ============================================
// Clamps - every adaptive value stays inside these at all times
// ============================================

/// Feature weight bounds
pub const WEIGHT_MIN: f64 = 0.05;
pub const WEIGHT_MAX: f64 = 0.5;

/// Domain bias bounds
pub const BIAS_MIN: f64 = -0.2;
pub const BIAS_MAX: f64 = 0.2;

/// Job-posting threshold bounds
pub const JOB_POSTING_FLOOR: f64 = 0.4;
pub const JOB_POSTING_CAP: f64 = 0.8;

/// Landing-page threshold floor
pub const LANDING_PAGE_FLOOR: f64 = 0.2;

/// Confidence threshold cap
pub const CONFIDENCE_CAP: f64 = 0.85;

/// Analysis-skip threshold cap
pub const ANALYSIS_SKIP_CAP: f64 = 0.9;

// ============================================
// Batch learning
// ============================================

/// Minimum correct AND incorrect samples before a feature weight moves
pub const MIN_FEATURE_SAMPLES: usize = 5;

/// Minimum samples before a domain bias is recomputed
pub const MIN_DOMAIN_SAMPLES: usize = 5;

/// Error share (fp or fn) that triggers a threshold shift
pub const ERROR_SHARE_TRIGGER: f64 = 0.6;

/// Batch candidate is discarded when validation accuracy drops more than this
pub const REGRESSION_TOLERANCE: f64 = 0.05;

/// Confidence assigned to freshly mined url patterns
pub const MINED_PATTERN_CONFIDENCE: f64 = 0.7;

/// Rolling window used for the validation performance summary (ms)
pub const VALIDATION_WINDOW_MS: i64 = 24 * 60 * 60 * 1000;

/// App version
pub const APP_VERSION: &str = env!("CARGO_PKG_VERSION");

// ============================================
// Helper functions to read from env with fallback
// ============================================

/// Get buffer capacity from environment or use default
pub fn get_buffer_capacity() -> usize {
    std::env::var("FRAUDGUARD_BUFFER_CAPACITY")
        .ok()
        .and_then(|s| s.parse().ok())
        .unwrap_or(BUFFER_CAPACITY)
}

/// Get learning rate from environment or use default
pub fn get_learning_rate() -> f64 {
    std::env::var("FRAUDGUARD_LEARNING_RATE")
        .ok()
        .and_then(|s| s.parse().ok())
        .unwrap_or(LEARNING_RATE)
}

/// Check if batch learning is enabled
pub fn is_batch_learning_enabled() -> bool {
    std::env::var("FRAUDGUARD_BATCH_LEARNING")
        .map(|s| s.to_lowercase() != "false" && s != "0")
        .unwrap_or(true)
}
