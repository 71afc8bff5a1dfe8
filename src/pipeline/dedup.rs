use crate::record::Record;
use std::collections::HashSet;

/// Tracks identity keys seen by one pipeline
///
/// Keys are compared exactly (case and inner whitespace matter) and are never
/// removed, so the set only grows for the lifetime of the pipeline. Not
/// synchronized; the owning [`Pipeline`](super::Pipeline) serializes access.
#[derive(Debug, Default)]
pub struct Deduplicator {
    seen: HashSet<String>,
    dropped: u64,
}

impl Deduplicator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Admits a record unless its identity key was already seen
    ///
    /// # Returns
    ///
    /// * `true` - First occurrence; the key is now recorded
    /// * `false` - Duplicate; the record should be discarded
    pub fn admit<R: Record>(&mut self, record: &R) -> bool {
        let key = record.identity();
        if self.seen.contains(key) {
            self.dropped += 1;
            tracing::warn!("Duplicate item found: {}. Item dropped.", key);
            return false;
        }
        self.seen.insert(key.to_string());
        true
    }

    /// Number of distinct keys admitted so far
    pub fn seen_count(&self) -> usize {
        self.seen.len()
    }

    /// Number of records rejected as duplicates
    pub fn dropped(&self) -> u64 {
        self.dropped
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::record::SearchRecord;

    fn record(name: &str) -> SearchRecord {
        SearchRecord::new(name, 0.0, "https://g2.com/x", "desc")
    }

    #[test]
    fn test_first_occurrence_admitted() {
        let mut dedup = Deduplicator::new();
        assert!(dedup.admit(&record("Acme")));
        assert!(dedup.admit(&record("Beta")));
        assert_eq!(dedup.seen_count(), 2);
        assert_eq!(dedup.dropped(), 0);
    }

    #[test]
    fn test_duplicate_dropped_and_counted() {
        let mut dedup = Deduplicator::new();
        assert!(dedup.admit(&record("Acme")));
        assert!(!dedup.admit(&record("Acme")));
        assert!(!dedup.admit(&record("Acme")));
        assert_eq!(dedup.seen_count(), 1);
        assert_eq!(dedup.dropped(), 2);
    }

    #[test]
    fn test_keys_are_case_sensitive() {
        let mut dedup = Deduplicator::new();
        assert!(dedup.admit(&record("Acme")));
        assert!(dedup.admit(&record("ACME")));
    }

    #[test]
    fn test_trimmed_keys_collide() {
        let mut dedup = Deduplicator::new();
        assert!(dedup.admit(&record("Acme")));
        assert!(!dedup.admit(&record("  Acme ")));
    }
}
