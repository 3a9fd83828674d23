//! SyncWorker - バックグラウンド同期ループ
//!
//! # フロー（1 サイクル）
//! 1. HealthProbe::is_healthy() でバックエンドを確認
//! 2. healthy: DeadLetterStore::drain()（バックオフ経過分のみ）
//! 3. healthy: キューロックを取得し pending を順に upload
//!    - 成功 → 削除、total_synced += 1
//!    - 失敗 → retry_count += 1、閾値到達で DLQ へ移動
//! 4. メトリクスを書き出す（unhealthy でも必ず）
//! 5. interval だけ sleep（shutdown で即座に抜ける）
//!
//! サイクル内のエラーはログに出してスキップし、ループは止めない。

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::watch;

use crate::domain::{BackendStatus, MetricsSnapshot, QueueRecord};
use crate::error::{MemsyncError, Result};
use crate::ports::{Clock, HealthProbe, Uploader};
use crate::store::{DeadLetterStore, DrainReport, LockGuard, MetricsStore, QueueStore};

pub const DEFAULT_CYCLE_INTERVAL: Duration = Duration::from_secs(30);
pub const DEFAULT_WORKER_LOCK_TIMEOUT: Duration = Duration::from_secs(30);

/// What one cycle did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CycleReport {
    pub backend: BackendStatus,
    pub dead_letters: DrainReport,
    /// Pending entries uploaded this cycle.
    pub synced: usize,
    /// Pending entries that failed and stay queued.
    pub retried: usize,
    /// Pending entries moved to the dead-letter store.
    pub dead_lettered: usize,
    /// Pending count after the cycle.
    pub pending: usize,
    /// Dead-letter count after the cycle.
    pub dlq_size: usize,
    /// Lifetime `stats.total_synced` after the cycle.
    pub total_synced: u64,
}

impl CycleReport {
    fn new(backend: BackendStatus) -> Self {
        Self {
            backend,
            dead_letters: DrainReport::default(),
            synced: 0,
            retried: 0,
            dead_lettered: 0,
            pending: 0,
            dlq_size: 0,
            total_synced: 0,
        }
    }

    /// Upload calls made this cycle (dead letters + pending).
    pub fn upload_attempts(&self) -> usize {
        self.dead_letters.attempted() + self.synced + self.retried + self.dead_lettered
    }
}

pub struct SyncWorker {
    queue: Arc<QueueStore>,
    dead_letters: Arc<DeadLetterStore>,
    metrics: MetricsStore,
    uploader: Arc<dyn Uploader>,
    probe: Arc<dyn HealthProbe>,
    clock: Arc<dyn Clock>,
    interval: Duration,
    lock_timeout: Duration,
    /// Dead-letter recoveries not yet added to `stats.total_synced` because
    /// the queue lock could not be taken in the cycle they happened.
    unrecorded_recoveries: u64,
    /// Set by `run`; lets the queue lock wait end early on shutdown.
    shutdown: Option<watch::Receiver<bool>>,
}

impl SyncWorker {
    pub fn new(
        queue: Arc<QueueStore>,
        dead_letters: Arc<DeadLetterStore>,
        metrics: MetricsStore,
        uploader: Arc<dyn Uploader>,
        probe: Arc<dyn HealthProbe>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            queue,
            dead_letters,
            metrics,
            uploader,
            probe,
            clock,
            interval: DEFAULT_CYCLE_INTERVAL,
            lock_timeout: DEFAULT_WORKER_LOCK_TIMEOUT,
            unrecorded_recoveries: 0,
            shutdown: None,
        }
    }

    pub fn with_interval(mut self, interval: Duration) -> Self {
        self.interval = interval;
        self
    }

    pub fn with_lock_timeout(mut self, lock_timeout: Duration) -> Self {
        self.lock_timeout = lock_timeout;
        self
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    /// Run cycles until `shutdown` flips to true (or its sender is dropped).
    ///
    /// Shutdown is observed between cycles and while waiting for the queue
    /// lock. An upload in flight is never cancelled, and the lock guard is
    /// always dropped before sleeping.
    pub async fn run(mut self, mut shutdown: watch::Receiver<bool>) {
        self.shutdown = Some(shutdown.clone());
        let policy = self.dead_letters.policy();
        tracing::info!(
            interval_secs = self.interval.as_secs(),
            dlq_threshold = policy.dead_letter_threshold,
            max_backoff_secs = policy.max_delay.as_secs(),
            queue = %self.queue.path().display(),
            "sync worker starting"
        );

        loop {
            if *shutdown.borrow() {
                break;
            }

            match self.run_cycle().await {
                Ok(report) => tracing::info!(
                    backend = %report.backend,
                    synced = report.synced,
                    dead_lettered = report.dead_lettered,
                    recovered = report.dead_letters.recovered,
                    pending = report.pending,
                    dlq = report.dlq_size,
                    total_synced = report.total_synced,
                    "cycle complete"
                ),
                Err(MemsyncError::Interrupted) => {
                    tracing::info!("shutdown requested while waiting for the queue lock")
                }
                Err(err) if err.is_lock_timeout() => {
                    tracing::warn!(error = %err, "queue busy, skipping this cycle")
                }
                Err(err) => tracing::error!(error = %err, "cycle failed, will retry next tick"),
            }

            tokio::select! {
                changed = shutdown.changed() => {
                    if changed.is_err() {
                        break;
                    }
                }
                _ = tokio::time::sleep(self.interval) => {}
            }
        }

        tracing::info!("sync worker stopped");
    }

    /// One PROBING -> (DRAIN_DLQ -> DRAIN_QUEUE)? -> PUBLISH_METRICS pass.
    pub async fn run_cycle(&mut self) -> Result<CycleReport> {
        let healthy = self.probe.is_healthy().await;
        let mut report = CycleReport::new(BackendStatus::from(healthy));

        let record = if healthy {
            report.dead_letters = self.dead_letters.drain(self.uploader.as_ref()).await?;
            self.unrecorded_recoveries += report.dead_letters.recovered as u64;
            self.drain_queue(&mut report).await?
        } else {
            tracing::warn!("backend unhealthy, skipping uploads this cycle");
            self.queue.load()
        };

        report.pending = record.pending_count();
        report.dlq_size = self.dead_letters.len();
        report.total_synced = record.stats.total_synced;
        self.publish_metrics(&report, &record)?;
        Ok(report)
    }

    async fn drain_queue(&mut self, report: &mut CycleReport) -> Result<QueueRecord> {
        let _guard = self.acquire_queue_lock().await?;

        let mut record = self.queue.load();
        let carried = self.unrecorded_recoveries;
        if carried > 0 {
            record.stats.total_synced += carried;
            record.stats.last_sync = Some(self.clock.now());
        }

        let policy = self.dead_letters.policy().clone();
        let pending = std::mem::take(&mut record.queue);
        if !pending.is_empty() {
            tracing::info!(pending = pending.len(), "processing queue");
        }

        let mut kept = Vec::with_capacity(pending.len());
        for mut entry in pending {
            if self.uploader.upload(&entry).await {
                record.stats.total_synced += 1;
                record.stats.last_sync = Some(self.clock.now());
                report.synced += 1;
                tracing::info!(entry_id = %entry.id, project_id = %entry.project_id, "synced");
                continue;
            }

            let retries = entry.record_failure();
            if !policy.is_exhausted(retries) {
                tracing::info!(
                    entry_id = %entry.id,
                    project_id = %entry.project_id,
                    retry_count = retries,
                    threshold = policy.dead_letter_threshold,
                    "upload failed, will retry next cycle"
                );
                report.retried += 1;
                kept.push(entry);
                continue;
            }

            match self.dead_letters.move_in(entry.clone()) {
                Ok(_) => {
                    record.stats.total_failed += 1;
                    report.dead_lettered += 1;
                }
                Err(err) => {
                    // stays pending; the next failure retries the move
                    tracing::error!(entry_id = %entry.id, error = %err, "failed to move entry to dead-letter store");
                    report.retried += 1;
                    kept.push(entry);
                }
            }
        }

        record.queue = kept;
        self.queue.save(&record)?;
        self.unrecorded_recoveries -= carried;
        Ok(record)
    }

    /// Lock wait that also ends when shutdown is requested during `run`.
    /// Uploads are never raced against shutdown, only this wait.
    async fn acquire_queue_lock(&self) -> Result<LockGuard> {
        let Some(mut shutdown) = self.shutdown.clone() else {
            return self.queue.lock(self.lock_timeout).await;
        };

        tokio::select! {
            guard = self.queue.lock(self.lock_timeout) => guard,
            _ = stop_requested(&mut shutdown) => Err(MemsyncError::Interrupted),
        }
    }

    fn publish_metrics(&self, report: &CycleReport, record: &QueueRecord) -> Result<()> {
        self.metrics.publish(&MetricsSnapshot {
            last_update: self.clock.now(),
            vps_status: report.backend,
            queue_size: report.pending,
            dlq_size: report.dlq_size,
            total_synced: report.total_synced,
            total_queued: record.stats.total_queued,
        })
    }
}

/// Resolves once the flag is true or the sender is gone.
async fn stop_requested(shutdown: &mut watch::Receiver<bool>) {
    loop {
        if *shutdown.borrow_and_update() {
            return;
        }
        if shutdown.changed().await.is_err() {
            return;
        }
    }
}
