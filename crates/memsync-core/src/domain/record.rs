//! The persisted queue record: pending entries, recent history, counters.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::QueueEntry;

/// Cumulative counters. Only ever increase.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct QueueStats {
    #[serde(default)]
    pub total_queued: u64,
    #[serde(default)]
    pub total_synced: u64,
    /// Entries moved to the dead-letter store.
    #[serde(default)]
    pub total_failed: u64,
    /// Older writers stored a naive local ISO string here.
    #[serde(default, deserialize_with = "super::timestamp::optional")]
    pub last_sync: Option<DateTime<Utc>>,
}

/// On-disk queue state.
///
/// Design:
/// - `queue` is the only list the worker drains.
/// - `last_100` is an observability cache and is never re-synced.
/// - `failed` belongs to the previous generation (no dead-letter file); it is
///   carried through untouched.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct QueueRecord {
    #[serde(default)]
    pub queue: Vec<QueueEntry>,
    #[serde(default)]
    pub last_100: Vec<QueueEntry>,
    #[serde(default)]
    pub failed: Vec<serde_json::Value>,
    #[serde(default)]
    pub stats: QueueStats,
}

impl QueueRecord {
    /// Append a new entry to the pending queue and the bounded history.
    pub fn push(&mut self, entry: QueueEntry, history_capacity: usize) {
        self.last_100.push(entry.clone());
        if self.last_100.len() > history_capacity {
            let excess = self.last_100.len() - history_capacity;
            self.last_100.drain(..excess);
        }
        self.queue.push(entry);
        self.stats.total_queued += 1;
    }

    pub fn pending_count(&self) -> usize {
        self.queue.len()
    }

    pub fn oldest_pending(&self) -> Option<&QueueEntry> {
        self.queue.iter().min_by_key(|entry| entry.enqueued_at)
    }

    /// Fold fields written by older producers into the current shape.
    pub(crate) fn normalize(&mut self) {
        for entry in self.queue.iter_mut().chain(self.last_100.iter_mut()) {
            entry.absorb_legacy_retries();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::EntryId;

    fn entry(n: i64) -> QueueEntry {
        QueueEntry::new(EntryId::new(format!("e{n}")), "demo", "hello", n)
    }

    #[test]
    fn history_is_capped_and_keeps_newest() {
        let mut record = QueueRecord::default();
        for n in 0..105 {
            record.push(entry(n), 100);
        }

        assert_eq!(record.last_100.len(), 100);
        assert_eq!(record.last_100.first().unwrap().enqueued_at, 5);
        assert_eq!(record.last_100.last().unwrap().enqueued_at, 104);
        assert_eq!(record.queue.len(), 105);
        assert_eq!(record.stats.total_queued, 105);
    }

    #[test]
    fn oldest_pending_uses_enqueue_time() {
        let mut record = QueueRecord::default();
        record.push(entry(30), 100);
        record.push(entry(10), 100);
        record.push(entry(20), 100);
        assert_eq!(record.oldest_pending().unwrap().enqueued_at, 10);
    }

    #[test]
    fn missing_sections_default_to_empty() {
        let record: QueueRecord = serde_json::from_str(r#"{"queue": []}"#).unwrap();
        assert_eq!(record, QueueRecord::default());
    }
}
