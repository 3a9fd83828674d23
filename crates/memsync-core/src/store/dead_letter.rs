//! Dead-letter store: entries that exhausted their normal retries.
//!
//! Single writer by convention: only the worker mutates this file, and it is
//! not covered by the queue lock. Concurrent writers from other processes are
//! not supported.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::atomic::{read_json_or_default, write_json_atomic};
use crate::domain::{DeadLetterEntry, QueueEntry, RetryPolicy};
use crate::error::Result;
use crate::ports::{Clock, Uploader};

#[derive(Debug, Default, Serialize, Deserialize)]
struct DeadLetterFile {
    #[serde(default)]
    items: Vec<DeadLetterEntry>,
    #[serde(default, deserialize_with = "crate::domain::timestamp::optional")]
    last_update: Option<DateTime<Utc>>,
}

/// Outcome of one `drain` pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DrainReport {
    /// Entries uploaded successfully and removed.
    pub recovered: usize,
    /// Entries attempted that failed again.
    pub failed: usize,
    /// Entries skipped because their backoff has not elapsed.
    pub deferred: usize,
}

impl DrainReport {
    pub fn attempted(&self) -> usize {
        self.recovered + self.failed
    }
}

pub struct DeadLetterStore {
    path: PathBuf,
    policy: RetryPolicy,
    clock: Arc<dyn Clock>,
}

impl DeadLetterStore {
    pub fn new(path: impl Into<PathBuf>, policy: RetryPolicy, clock: Arc<dyn Clock>) -> Self {
        Self {
            path: path.into(),
            policy,
            clock,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn policy(&self) -> &RetryPolicy {
        &self.policy
    }

    /// Absent or corrupt file yields an empty list.
    pub fn load(&self) -> Vec<DeadLetterEntry> {
        read_json_or_default::<DeadLetterFile>(&self.path).items
    }

    pub fn len(&self) -> usize {
        self.load().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn save(&self, items: &[DeadLetterEntry]) -> Result<()> {
        #[derive(Serialize)]
        struct Out<'a> {
            items: &'a [DeadLetterEntry],
            last_update: DateTime<Utc>,
        }

        write_json_atomic(
            &self.path,
            &Out {
                items,
                last_update: self.clock.now(),
            },
        )
    }

    /// Move an exhausted pending entry in, resetting its backoff.
    ///
    /// The caller holds the queue lock and has already removed the entry from
    /// the pending queue.
    pub fn move_in(&self, entry: QueueEntry) -> Result<DeadLetterEntry> {
        let retries = entry.retry_count;
        let dead = DeadLetterEntry::from_exhausted(entry, self.clock.epoch_secs());

        let mut items = self.load();
        items.push(dead.clone());
        self.save(&items)?;

        tracing::warn!(
            entry_id = %dead.id(),
            project_id = %dead.entry.project_id,
            retries,
            "moved to dead-letter store"
        );
        Ok(dead)
    }

    /// Epoch second at which `item` becomes eligible for its next retry.
    pub fn next_retry_at(&self, item: &DeadLetterEntry) -> i64 {
        let delay = self.policy.next_delay(item.backoff_exponent()).as_secs() as i64;
        item.last_attempt.saturating_add(delay)
    }

    /// Retry every entry whose backoff has elapsed.
    ///
    /// Recovered entries are removed; failures bump their backoff exponent.
    /// The file is written once at the end, and only if something changed.
    pub async fn drain(&self, uploader: &dyn Uploader) -> Result<DrainReport> {
        let items = self.load();
        if items.is_empty() {
            return Ok(DrainReport::default());
        }

        tracing::info!(items = items.len(), "processing dead-letter store");

        let mut report = DrainReport::default();
        let mut kept = Vec::with_capacity(items.len());

        for mut item in items {
            let now = self.clock.epoch_secs();
            let exponent = item.backoff_exponent();

            if !self.policy.is_due(exponent, item.last_attempt, now) {
                tracing::debug!(
                    entry_id = %item.id(),
                    project_id = %item.entry.project_id,
                    retry_in_secs = self.policy.remaining_secs(exponent, item.last_attempt, now),
                    "dead letter waiting for backoff"
                );
                report.deferred += 1;
                kept.push(item);
                continue;
            }

            if uploader.upload(&item.entry).await {
                tracing::info!(
                    entry_id = %item.id(),
                    project_id = %item.entry.project_id,
                    retries = exponent,
                    "dead letter recovered"
                );
                report.recovered += 1;
            } else {
                item.record_failure(self.clock.epoch_secs());
                tracing::info!(
                    entry_id = %item.id(),
                    project_id = %item.entry.project_id,
                    retry_count = item.backoff_exponent(),
                    next_in_secs = self.policy.next_delay(item.backoff_exponent()).as_secs(),
                    "dead letter retry failed"
                );
                report.failed += 1;
                kept.push(item);
            }
        }

        if report.attempted() > 0 {
            self.save(&kept)?;
        }
        Ok(report)
    }
}
