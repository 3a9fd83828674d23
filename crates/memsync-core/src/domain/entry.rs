//! Queue entries and their dead-letter form.

use serde::{Deserialize, Deserializer, Serialize};

use super::EntryId;

/// A memory entry waiting to be uploaded.
///
/// Lifecycle: pending -> synced (removed) | dead-lettered.
/// An id lives in exactly one of the pending queue or the dead-letter store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueueEntry {
    pub id: EntryId,

    /// Destination namespace on the backend (sent as `user_id`).
    pub project_id: String,

    pub content: String,

    /// Seconds since epoch.
    #[serde(alias = "timestamp", deserialize_with = "epoch_secs")]
    pub enqueued_at: i64,

    /// Failed upload attempts while pending. In the dead-letter store this is
    /// the backoff exponent instead.
    #[serde(default)]
    pub retry_count: u32,

    /// Retry counter under its old name, folded into `retry_count` on load.
    #[serde(rename = "retries", default, skip_serializing)]
    pub(crate) legacy_retries: Option<u32>,
}

impl QueueEntry {
    pub fn new(
        id: EntryId,
        project_id: impl Into<String>,
        content: impl Into<String>,
        enqueued_at: i64,
    ) -> Self {
        Self {
            id,
            project_id: project_id.into(),
            content: content.into(),
            enqueued_at,
            retry_count: 0,
            legacy_retries: None,
        }
    }

    /// Count one failed attempt and return the new total.
    pub fn record_failure(&mut self) -> u32 {
        self.retry_count += 1;
        self.retry_count
    }

    /// Seconds this entry has been waiting (never negative).
    pub fn age_secs(&self, now: i64) -> i64 {
        (now - self.enqueued_at).max(0)
    }

    /// Adopt the old `retries` counter for entries still in the pending queue.
    pub(crate) fn absorb_legacy_retries(&mut self) {
        if let Some(retries) = self.legacy_retries.take() {
            self.retry_count = self.retry_count.max(retries);
        }
    }
}

/// An entry that exhausted the normal retry budget.
///
/// `entry.retry_count` restarts at 0 here and drives the exponential backoff.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeadLetterEntry {
    #[serde(flatten)]
    pub entry: QueueEntry,

    #[serde(default, deserialize_with = "epoch_secs")]
    pub last_attempt: i64,

    #[serde(default, deserialize_with = "epoch_secs")]
    pub moved_to_dlq_at: i64,
}

impl DeadLetterEntry {
    /// Convert a pending entry that hit the retry threshold.
    pub fn from_exhausted(mut entry: QueueEntry, now: i64) -> Self {
        entry.retry_count = 0;
        entry.legacy_retries = None;
        Self {
            entry,
            last_attempt: now,
            moved_to_dlq_at: now,
        }
    }

    pub fn id(&self) -> &EntryId {
        &self.entry.id
    }

    /// Backoff exponent.
    pub fn backoff_exponent(&self) -> u32 {
        self.entry.retry_count
    }

    /// Record a failed DLQ retry at `now`.
    pub fn record_failure(&mut self, now: i64) {
        self.entry.retry_count += 1;
        self.last_attempt = now;
    }
}

/// Accept both integer and fractional epoch seconds (older writers used floats).
fn epoch_secs<'de, D>(deserializer: D) -> Result<i64, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Secs {
        Int(i64),
        Float(f64),
    }

    Ok(match Secs::deserialize(deserializer)? {
        Secs::Int(secs) => secs,
        Secs::Float(secs) => secs as i64,
    })
}
