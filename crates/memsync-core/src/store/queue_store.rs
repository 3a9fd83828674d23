//! Durable queue store.
//!
//! Design:
//! - `load` / `save` are the only ways to touch the file.
//! - Every read-modify-write cycle happens while holding the advisory lock.
//! - `enqueue` and `status` take the lock themselves with the producer
//!   timeout; the worker takes it once per cycle via [`QueueStore::lock`].

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use super::atomic::{read_json_or_default, write_json_atomic};
use super::dead_letter::DeadLetterStore;
use super::lock::{FileLock, LockGuard};
use crate::domain::{HealthThresholds, QueueEntry, QueueHealth, QueueRecord, QueueStatus};
use crate::error::Result;
use crate::ports::{Clock, IdGenerator};

pub const DEFAULT_HISTORY_CAPACITY: usize = 100;
pub const DEFAULT_PRODUCER_LOCK_TIMEOUT: Duration = Duration::from_secs(5);

pub struct QueueStore {
    path: PathBuf,
    lock: FileLock,
    lock_timeout: Duration,
    history_capacity: usize,
    clock: Arc<dyn Clock>,
    ids: Arc<dyn IdGenerator>,
}

impl QueueStore {
    pub fn new(
        path: impl Into<PathBuf>,
        lock: FileLock,
        clock: Arc<dyn Clock>,
        ids: Arc<dyn IdGenerator>,
    ) -> Self {
        Self {
            path: path.into(),
            lock,
            lock_timeout: DEFAULT_PRODUCER_LOCK_TIMEOUT,
            history_capacity: DEFAULT_HISTORY_CAPACITY,
            clock,
            ids,
        }
    }

    /// Timeout used by `enqueue` and `status`.
    pub fn with_lock_timeout(mut self, lock_timeout: Duration) -> Self {
        self.lock_timeout = lock_timeout;
        self
    }

    pub fn with_history_capacity(mut self, history_capacity: usize) -> Self {
        self.history_capacity = history_capacity;
        self
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Read the persisted record; absent or corrupt file yields a fresh one.
    pub fn load(&self) -> QueueRecord {
        let mut record: QueueRecord = read_json_or_default(&self.path);
        record.normalize();
        record
    }

    /// Atomically replace the persisted record.
    pub fn save(&self, record: &QueueRecord) -> Result<()> {
        write_json_atomic(&self.path, record)
    }

    /// Take the queue lock with an explicit timeout.
    pub async fn lock(&self, timeout: Duration) -> Result<LockGuard> {
        self.lock.acquire(timeout).await
    }

    /// Append a new entry. The only producer-facing write.
    pub async fn enqueue(
        &self,
        project_id: impl Into<String>,
        content: impl Into<String>,
    ) -> Result<QueueEntry> {
        let _guard = self.lock(self.lock_timeout).await?;

        let mut record = self.load();
        let entry = QueueEntry::new(
            self.ids.generate_entry_id(),
            project_id,
            content,
            self.clock.epoch_secs(),
        );
        record.push(entry.clone(), self.history_capacity);
        self.save(&record)?;

        tracing::info!(
            entry_id = %entry.id,
            project_id = %entry.project_id,
            pending = record.pending_count(),
            "memory queued"
        );
        Ok(entry)
    }

    /// Summarize queue state. Read-only, but takes the lock because it shares
    /// the file with writers.
    pub async fn status(
        &self,
        dead_letters: &DeadLetterStore,
        thresholds: HealthThresholds,
    ) -> Result<QueueStatus> {
        let _guard = self.lock(self.lock_timeout).await?;

        let record = self.load();
        let now = self.clock.epoch_secs();
        let pending_count = record.pending_count();
        let dead_letter_count = dead_letters.len();

        Ok(QueueStatus {
            pending_count,
            dead_letter_count,
            oldest_pending_age_secs: record.oldest_pending().map(|entry| entry.age_secs(now)),
            health: QueueHealth::classify(pending_count, dead_letter_count, thresholds),
            last_sync: record.stats.last_sync,
            total_queued: record.stats.total_queued,
            total_synced: record.stats.total_synced,
            total_failed: record.stats.total_failed,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::RetryPolicy;
    use crate::ports::{ManualClock, UlidGenerator};
    use chrono::{Duration as ChronoDuration, TimeZone, Utc};

    struct Fixture {
        dir: tempfile::TempDir,
        clock: ManualClock,
        queue: QueueStore,
        dlq: DeadLetterStore,
    }

    fn fixture() -> Fixture {
        let dir = tempfile::tempdir().unwrap();
        let clock = ManualClock::new(Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap());
        let shared: Arc<dyn Clock> = Arc::new(clock.clone());
        let queue = QueueStore::new(
            dir.path().join("queue.json"),
            FileLock::new(dir.path().join("queue.lock")).with_poll_interval(Duration::from_millis(10)),
            shared.clone(),
            Arc::new(UlidGenerator::new(shared.clone())),
        )
        .with_lock_timeout(Duration::from_millis(200));
        let dlq = DeadLetterStore::new(dir.path().join("dlq.json"), RetryPolicy::default(), shared);
        Fixture {
            dir,
            clock,
            queue,
            dlq,
        }
    }

    #[tokio::test]
    async fn enqueue_then_status_is_healthy() {
        let f = fixture();

        let entry = f.queue.enqueue("demo", "hello").await.unwrap();
        assert_eq!(entry.retry_count, 0);
        assert_eq!(entry.enqueued_at, f.clock.epoch_secs());

        let status = f.queue.status(&f.dlq, HealthThresholds::default()).await.unwrap();
        assert_eq!(status.pending_count, 1);
        assert_eq!(status.dead_letter_count, 0);
        assert_eq!(status.health, QueueHealth::Healthy);
        assert_eq!(status.total_queued, 1);
    }

    #[tokio::test]
    async fn status_reports_oldest_age() {
        let f = fixture();
        f.queue.enqueue("demo", "first").await.unwrap();
        f.clock.advance(ChronoDuration::seconds(300));
        f.queue.enqueue("demo", "second").await.unwrap();
        f.clock.advance(ChronoDuration::seconds(60));

        let status = f.queue.status(&f.dlq, HealthThresholds::default()).await.unwrap();
        assert_eq!(status.oldest_pending_age_secs, Some(360));
    }

    #[tokio::test]
    async fn status_turns_critical_with_many_dead_letters() {
        let f = fixture();
        for n in 0..6 {
            let entry = QueueEntry::new(
                crate::domain::EntryId::new(format!("d{n}")),
                "demo",
                "x",
                0,
            );
            f.dlq.move_in(entry).unwrap();
        }

        let status = f.queue.status(&f.dlq, HealthThresholds::default()).await.unwrap();
        assert_eq!(status.dead_letter_count, 6);
        assert_eq!(status.health, QueueHealth::Critical);
    }

    #[tokio::test]
    async fn save_load_round_trips() {
        let f = fixture();
        f.queue.enqueue("demo", "hello").await.unwrap();
        f.queue.enqueue("other", "world").await.unwrap();

        let mut record = f.queue.load();
        record.queue[0].record_failure();
        record.stats.total_synced = 4;
        record.stats.last_sync = Some(f.clock.now());
        f.queue.save(&record).unwrap();

        let reloaded = f.queue.load();
        assert_eq!(reloaded, record);
        f.queue.save(&reloaded).unwrap();
        assert_eq!(f.queue.load(), record);
    }

    #[tokio::test]
    async fn enqueue_times_out_under_contention_without_writing() {
        let f = fixture();
        f.queue.enqueue("demo", "before").await.unwrap();
        let before = std::fs::read(f.queue.path()).unwrap();

        let holder = FileLock::new(f.dir.path().join("queue.lock"));
        let guard = holder.acquire(Duration::from_secs(1)).await.unwrap();

        let err = f.queue.enqueue("demo", "blocked").await.unwrap_err();
        assert!(err.is_lock_timeout());
        assert_eq!(std::fs::read(f.queue.path()).unwrap(), before);

        drop(guard);
        f.queue.enqueue("demo", "after").await.unwrap();
        assert_eq!(f.queue.load().pending_count(), 2);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn concurrent_producers_never_lose_entries() {
        let f = fixture();
        let shared: Arc<dyn Clock> = Arc::new(f.clock.clone());
        let queue = Arc::new(
            QueueStore::new(
                f.queue.path(),
                FileLock::new(f.dir.path().join("queue.lock"))
                    .with_poll_interval(Duration::from_millis(5)),
                shared.clone(),
                Arc::new(UlidGenerator::new(shared)),
            )
            .with_lock_timeout(Duration::from_secs(10)),
        );

        let tasks: Vec<_> = (0..16)
            .map(|n| {
                let queue = queue.clone();
                tokio::spawn(async move { queue.enqueue("demo", format!("m{n}")).await })
            })
            .collect();
        for task in tasks {
            task.await.unwrap().unwrap();
        }

        let record = queue.load();
        assert_eq!(record.pending_count(), 16);
        assert_eq!(record.stats.total_queued, 16);
        let mut ids: Vec<_> = record.queue.iter().map(|e| e.id.clone()).collect();
        ids.sort_by(|a, b| a.as_str().cmp(b.as_str()));
        ids.dedup();
        assert_eq!(ids.len(), 16);
    }

    #[tokio::test]
    async fn corrupt_queue_file_starts_fresh() {
        let f = fixture();
        std::fs::write(f.queue.path(), b"{\"queue\": [").unwrap();

        assert_eq!(f.queue.load(), QueueRecord::default());
        f.queue.enqueue("demo", "hello").await.unwrap();
        assert_eq!(f.queue.load().stats.total_queued, 1);
    }

    #[tokio::test]
    async fn legacy_queue_file_is_upgraded_on_load() {
        let f = fixture();
        std::fs::write(
            f.queue.path(),
            r#"{
                "queue": [{"id": "a1b2c3d4-0000", "project_id": "demo", "content": "hi",
                           "timestamp": 1700000000, "retries": 2}],
                "last_100": [],
                "failed": [{"id": "old"}],
                "stats": {"total_queued": 1, "total_synced": 0, "total_failed": 0, "last_sync": null}
            }"#,
        )
        .unwrap();

        let record = f.queue.load();
        assert_eq!(record.queue[0].retry_count, 2);
        assert_eq!(record.failed.len(), 1);
    }

    #[tokio::test]
    async fn legacy_naive_last_sync_keeps_pending_entries() {
        let f = fixture();
        std::fs::write(
            f.queue.path(),
            r#"{
                "queue": [{"id": "0b7d6c1e-8f0a-4c7e-9a51-6f3f2b1c0d9e", "project_id": "demo",
                           "content": "from before", "timestamp": 1700000000.5, "retries": 1}],
                "last_100": [],
                "failed": [],
                "stats": {"total_queued": 7, "total_synced": 6, "total_failed": 0,
                          "last_sync": "2025-01-15T10:30:00.123456"}
            }"#,
        )
        .unwrap();

        let record = f.queue.load();
        assert_eq!(record.pending_count(), 1);
        assert_eq!(record.stats.total_queued, 7);
        assert_eq!(
            record.stats.last_sync,
            crate::domain::timestamp::parse_timestamp("2025-01-15T10:30:00.123456")
        );
        assert!(record.stats.last_sync.is_some());

        f.queue.enqueue("demo", "new").await.unwrap();

        let record = f.queue.load();
        assert_eq!(record.pending_count(), 2);
        assert_eq!(record.queue[0].content, "from before");
        assert_eq!(record.stats.total_queued, 8);
        assert_eq!(record.stats.total_synced, 6);
    }
}
