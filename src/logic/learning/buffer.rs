//! Feedback Buffer
//!
//! FIFO buffer chứa recent/unprocessed feedback. Capacity 50 - a full
//! buffer of unprocessed entries triggers batch learning. Entries processed
//! and older than 24h are evicted after a batch; length stays <= capacity
//! at rest.

use std::collections::{HashSet, VecDeque};

use chrono::{DateTime, Duration, Utc};

use crate::constants::FEEDBACK_TTL_HOURS;

use super::types::Feedback;

// ============================================================================
// BUFFER
// ============================================================================

#[derive(Debug, Clone)]
pub struct BufferedFeedback {
    pub feedback: Feedback,
    pub processed: bool,
}

#[derive(Debug)]
pub struct FeedbackBuffer {
    entries: VecDeque<BufferedFeedback>,
    capacity: usize,
}

impl FeedbackBuffer {
    pub fn new(capacity: usize) -> Self {
        Self {
            entries: VecDeque::with_capacity(capacity),
            capacity,
        }
    }

    /// Append one feedback. Returns true when unprocessed entries have
    /// reached capacity (the batch trigger). Processed entries retained
    /// for the eviction window never count toward the trigger, so one
    /// batch consumes exactly one full buffer.
    pub fn push(&mut self, feedback: Feedback) -> bool {
        self.entries.push_back(BufferedFeedback {
            feedback,
            processed: false,
        });
        // Capacity is a hard cap at rest: drop oldest on overflow
        while self.entries.len() > self.capacity {
            self.entries.pop_front();
        }
        self.entries.iter().filter(|e| !e.processed).count() >= self.capacity
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Clone out everything not yet consumed by a batch pass
    pub fn unprocessed(&self) -> Vec<Feedback> {
        self.entries
            .iter()
            .filter(|e| !e.processed)
            .map(|e| e.feedback.clone())
            .collect()
    }

    /// Mark entries consumed by a finished batch pass
    pub fn mark_processed(&mut self, ids: &HashSet<String>) {
        for entry in &mut self.entries {
            if ids.contains(&entry.feedback.classification_id) {
                entry.processed = true;
            }
        }
    }

    /// Evict processed entries older than the TTL
    pub fn evict_stale(&mut self, now: DateTime<Utc>) {
        let cutoff = now - Duration::hours(FEEDBACK_TTL_HOURS);
        self.entries
            .retain(|e| !(e.processed && e.feedback.timestamp < cutoff));
    }

    /// Incorrect feedbacks for a domain within the last 24h
    pub fn recent_incorrect_for_domain(&self, domain: &str, now: DateTime<Utc>) -> usize {
        let cutoff = now - Duration::hours(FEEDBACK_TTL_HOURS);
        self.entries
            .iter()
            .filter(|e| {
                !e.feedback.was_correct
                    && e.feedback.timestamp >= cutoff
                    && e.feedback.domain().as_deref() == Some(domain)
            })
            .count()
    }

    pub fn status(&self) -> BufferStatus {
        let unprocessed = self.entries.iter().filter(|e| !e.processed).count();
        BufferStatus {
            current_size: self.entries.len(),
            capacity: self.capacity,
            unprocessed,
            fill_percent: if self.capacity > 0 {
                (self.entries.len() as f64 / self.capacity as f64 * 100.0).min(100.0)
            } else {
                0.0
            },
        }
    }
}

/// Buffer status information
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct BufferStatus {
    pub current_size: usize,
    pub capacity: usize,
    pub unprocessed: usize,
    pub fill_percent: f64,
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::logic::learning::types::{FeedbackSource, PageClass};
    use std::collections::HashMap;

    fn feedback(id: &str, url: &str, correct: bool, age_hours: i64) -> Feedback {
        Feedback {
            classification_id: id.to_string(),
            url: url.to_string(),
            system_classification: PageClass::Fraudulent,
            user_classification: if correct {
                PageClass::Fraudulent
            } else {
                PageClass::Legitimate
            },
            was_correct: correct,
            system_confidence: 0.9,
            features: HashMap::new(),
            source: FeedbackSource::Correction,
            timestamp: Utc::now() - Duration::hours(age_hours),
        }
    }

    #[test]
    fn test_push_reports_capacity() {
        let mut buffer = FeedbackBuffer::new(3);
        assert!(!buffer.push(feedback("a", "https://x.example/1", true, 0)));
        assert!(!buffer.push(feedback("b", "https://x.example/2", true, 0)));
        assert!(buffer.push(feedback("c", "https://x.example/3", true, 0)));
    }

    #[test]
    fn test_processed_entries_do_not_retrigger() {
        let mut buffer = FeedbackBuffer::new(3);
        buffer.push(feedback("a", "https://x.example/1", true, 0));
        buffer.push(feedback("b", "https://x.example/2", true, 0));
        assert!(buffer.push(feedback("c", "https://x.example/3", true, 0)));

        let done: HashSet<String> = ["a", "b", "c"].iter().map(|s| s.to_string()).collect();
        buffer.mark_processed(&done);

        // Still at capacity, but only the new entry is unprocessed - the
        // trigger must not fire again until a fresh batch accumulates
        assert!(!buffer.push(feedback("d", "https://x.example/4", true, 0)));
        assert_eq!(buffer.len(), 3);
        assert_eq!(buffer.unprocessed().len(), 1);
    }

    #[test]
    fn test_overflow_drops_oldest() {
        let mut buffer = FeedbackBuffer::new(2);
        buffer.push(feedback("a", "https://x.example/1", true, 0));
        buffer.push(feedback("b", "https://x.example/2", true, 0));
        buffer.push(feedback("c", "https://x.example/3", true, 0));

        assert_eq!(buffer.len(), 2);
        let ids: Vec<String> = buffer
            .unprocessed()
            .iter()
            .map(|f| f.classification_id.clone())
            .collect();
        assert_eq!(ids, vec!["b", "c"]);
    }

    #[test]
    fn test_eviction_only_hits_processed_and_stale() {
        let mut buffer = FeedbackBuffer::new(10);
        buffer.push(feedback("old_processed", "https://x.example/1", true, 30));
        buffer.push(feedback("old_unprocessed", "https://x.example/2", true, 30));
        buffer.push(feedback("fresh_processed", "https://x.example/3", true, 1));

        let mut done = HashSet::new();
        done.insert("old_processed".to_string());
        done.insert("fresh_processed".to_string());
        buffer.mark_processed(&done);

        buffer.evict_stale(Utc::now());

        let remaining: Vec<String> = buffer
            .unprocessed()
            .iter()
            .map(|f| f.classification_id.clone())
            .collect();
        assert_eq!(buffer.len(), 2);
        assert_eq!(remaining, vec!["old_unprocessed"]);
    }

    #[test]
    fn test_domain_error_burst_counting() {
        let mut buffer = FeedbackBuffer::new(10);
        buffer.push(feedback("a", "https://sketchy.example/1", false, 1));
        buffer.push(feedback("b", "https://sketchy.example/2", false, 2));
        buffer.push(feedback("c", "https://sketchy.example/3", false, 48)); // too old
        buffer.push(feedback("d", "https://other.example/1", false, 1));
        buffer.push(feedback("e", "https://sketchy.example/4", true, 1)); // correct

        assert_eq!(
            buffer.recent_incorrect_for_domain("sketchy.example", Utc::now()),
            2
        );
    }
}
