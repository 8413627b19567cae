//! Millisecond-derived note identifiers.

use std::sync::atomic::{AtomicU64, Ordering};

use chrono::Utc;

/// Hands out ids from the wall clock in milliseconds, bumping past the last
/// issued value so two notes created in the same millisecond still differ.
#[derive(Debug, Default)]
pub struct NoteIdGenerator {
    last: AtomicU64,
}

impl NoteIdGenerator {
    pub const fn new() -> Self {
        Self {
            last: AtomicU64::new(0),
        }
    }

    /// Next id, strictly greater than every id this generator issued before.
    pub fn next_id(&self) -> String {
        let now = Utc::now().timestamp_millis().max(0) as u64;
        let mut prev = self.last.load(Ordering::Relaxed);
        loop {
            let candidate = now.max(prev + 1);
            match self.last.compare_exchange_weak(
                prev,
                candidate,
                Ordering::AcqRel,
                Ordering::Relaxed,
            ) {
                Ok(_) => return candidate.to_string(),
                Err(actual) => prev = actual,
            }
        }
    }

    /// Record an id issued elsewhere so later ids sort after it.
    pub fn observe(&self, id: u64) {
        self.last.fetch_max(id, Ordering::AcqRel);
    }
}

static GLOBAL: NoteIdGenerator = NoteIdGenerator::new();

/// Process-wide id source.
pub fn next_note_id() -> String {
    GLOBAL.next_id()
}

/// Seed the process-wide source with an existing note id. Ids that are not
/// integers are ignored.
pub fn observe_note_id(id: &str) {
    if let Ok(value) = id.parse::<u64>() {
        GLOBAL.observe(value);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn test_ids_strictly_increase() {
        let ids = NoteIdGenerator::new();
        let issued: Vec<u64> = (0..1000)
            .map(|_| ids.next_id().parse().unwrap())
            .collect();
        assert!(issued.windows(2).all(|w| w[0] < w[1]));
    }

    #[test]
    fn test_ids_are_millisecond_scale() {
        let id: i64 = NoteIdGenerator::new().next_id().parse().unwrap();
        let now = Utc::now().timestamp_millis();
        assert!(id <= now + 1000);
        assert!(id > now - 60_000);
    }

    #[test]
    fn test_observed_id_is_skipped_past() {
        let ids = NoteIdGenerator::new();
        let future = Utc::now().timestamp_millis() as u64 + 3_600_000;
        ids.observe(future);
        ids.observe(5);
        let next: u64 = ids.next_id().parse().unwrap();
        assert_eq!(next, future + 1);
    }

    #[test]
    fn test_ids_unique_across_threads() {
        let ids = std::sync::Arc::new(NoteIdGenerator::new());
        let handles: Vec<_> = (0..4)
            .map(|_| {
                let ids = ids.clone();
                std::thread::spawn(move || (0..250).map(|_| ids.next_id()).collect::<Vec<_>>())
            })
            .collect();
        let all: HashSet<String> = handles
            .into_iter()
            .flat_map(|h| h.join().unwrap())
            .collect();
        assert_eq!(all.len(), 1000);
    }
}
