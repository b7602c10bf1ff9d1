//! In-memory dedup ring for inbound activity IRIs (§4.F step 3, §5).
//!
//! A fixed-size LRU of the last 8k seen activity IDs. Re-delivery of an
//! already-seen activity is acknowledged with no side effect (Testable
//! Property 5); this is intentionally process-local and non-durable — a
//! restart simply forgets what it has seen.

use std::num::NonZeroUsize;
use std::sync::Mutex;

use lru::LruCache;

/// Window size from §4.F: "LRU of last 8k activity IRIs".
pub const DEDUP_WINDOW: usize = 8_000;

/// Thread-safe LRU set of recently seen activity IRIs.
pub struct DedupRing {
    seen: Mutex<LruCache<String, ()>>,
}

impl DedupRing {
    #[must_use]
    pub fn new() -> Self {
        Self {
            #[allow(clippy::missing_panics_doc, clippy::unwrap_used)]
            seen: Mutex::new(LruCache::new(NonZeroUsize::new(DEDUP_WINDOW).unwrap())),
        }
    }

    /// Records `id` as seen, returning `true` if it had already been seen
    /// (the caller should then drop the activity with no side effect).
    #[allow(clippy::missing_panics_doc)]
    pub fn seen_before(&self, id: &str) -> bool {
        let mut seen = self.seen.lock().unwrap_or_else(std::sync::PoisonError::into_inner);
        if seen.contains(id) {
            seen.promote(id);
            true
        } else {
            seen.put(id.to_string(), ());
            false
        }
    }
}

impl Default for DedupRing {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn first_sighting_is_not_a_duplicate() {
        let ring = DedupRing::new();
        assert!(!ring.seen_before("https://a.example/s/1"));
    }

    #[test]
    fn second_sighting_is_a_duplicate() {
        let ring = DedupRing::new();
        assert!(!ring.seen_before("https://a.example/s/1"));
        assert!(ring.seen_before("https://a.example/s/1"));
    }

    #[test]
    fn distinct_ids_do_not_collide() {
        let ring = DedupRing::new();
        assert!(!ring.seen_before("https://a.example/s/1"));
        assert!(!ring.seen_before("https://a.example/s/2"));
    }
}
