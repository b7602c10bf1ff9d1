//! Backoff schedule and consecutive-404 bookkeeping for the fan-out engine (§4.G).

use std::collections::HashMap;
use std::time::Duration;

use tokio::sync::Mutex;

/// §4.G: "capped at 6 attempts, then drop".
pub const MAX_ATTEMPTS: u32 = 6;

const BASE_SECS: u64 = 60;
const MAX_BACKOFF_SECS: u64 = 3600;

/// `min(60 * 2^attempt, 3600)` seconds (§4.G, Testable Property 7).
#[must_use]
pub fn backoff_for(attempt: u32) -> Duration {
    let scaled = BASE_SECS.saturating_mul(1_u64 << attempt.min(16));
    Duration::from_secs(scaled.min(MAX_BACKOFF_SECS))
}

/// Tracks consecutive 404 responses per destination domain, in memory only
/// (§9 Open Question: a process restart simply forgets the count — the
/// durable consequence, `inbox.failed`, is unaffected since it is only set
/// once the third consecutive 404 lands).
#[derive(Default)]
pub struct NotFoundTracker {
    counts: Mutex<HashMap<String, u32>>,
}

impl NotFoundTracker {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Records a 404 for `domain`, returning the new consecutive count.
    pub async fn record(&self, domain: &str) -> u32 {
        let mut counts = self.counts.lock().await;
        let count = counts.entry(domain.to_string()).or_insert(0);
        *count += 1;
        *count
    }

    /// Resets the count, called on any non-404 outcome for the domain.
    pub async fn clear(&self, domain: &str) {
        self.counts.lock().await.remove(domain);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn backoff_doubles_each_attempt_until_the_cap() {
        assert_eq!(backoff_for(0), Duration::from_secs(60));
        assert_eq!(backoff_for(1), Duration::from_secs(120));
        assert_eq!(backoff_for(2), Duration::from_secs(240));
        assert_eq!(backoff_for(5), Duration::from_secs(1920));
    }

    #[test]
    fn backoff_is_capped_at_one_hour() {
        assert_eq!(backoff_for(6), Duration::from_secs(3600));
        assert_eq!(backoff_for(20), Duration::from_secs(3600));
    }

    #[test]
    fn backoff_is_monotonically_non_decreasing() {
        let mut previous = Duration::ZERO;
        for attempt in 0..MAX_ATTEMPTS {
            let current = backoff_for(attempt);
            assert!(current >= previous);
            previous = current;
        }
    }

    #[tokio::test]
    async fn not_found_tracker_counts_consecutively_and_clears() {
        let tracker = NotFoundTracker::new();
        assert_eq!(tracker.record("a.example").await, 1);
        assert_eq!(tracker.record("a.example").await, 2);
        assert_eq!(tracker.record("a.example").await, 3);
        tracker.clear("a.example").await;
        assert_eq!(tracker.record("a.example").await, 1);
    }
}
