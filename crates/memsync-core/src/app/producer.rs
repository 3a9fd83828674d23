//! Producer - 対話的な「メモリ保存」呼び出しの表面
//!
//! enqueue はロック取得とファイル保存のみ（ネットワークは待たない）。
//! 保存後にキューの状態を確認し、バックエンド障害の兆候があれば
//! 確認メッセージと一緒に警告を返す。

use std::fmt;
use std::sync::Arc;

use crate::domain::{EntryId, HealthThresholds, QueueEntry, QueueHealth, QueueStatus};
use crate::error::Result;
use crate::store::{DeadLetterStore, QueueStore};

pub struct Producer {
    queue: Arc<QueueStore>,
    dead_letters: Arc<DeadLetterStore>,
    thresholds: HealthThresholds,
}

/// Result of [`Producer::save`]: the queued entry plus the queue health seen
/// right after queuing it (absent if the status check itself failed).
#[derive(Debug, Clone)]
pub struct SaveReceipt {
    pub entry: QueueEntry,
    pub status: Option<QueueStatus>,
}

impl SaveReceipt {
    pub fn health(&self) -> QueueHealth {
        self.status
            .as_ref()
            .map_or(QueueHealth::Healthy, |status| status.health)
    }
}

impl fmt::Display for SaveReceipt {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        const RULE: &str = "--------------------------------------------";

        let confirmation = format!(
            "Memory queued for project '{}' (will sync to the backend in the background).",
            self.entry.project_id
        );

        let Some(status) = &self.status else {
            return f.write_str(&confirmation);
        };

        match status.health {
            QueueHealth::Healthy => f.write_str(&confirmation),
            QueueHealth::Warning => {
                writeln!(f, "WARNING: memory backend looks unreachable")?;
                writeln!(f, "{RULE}")?;
                writeln!(f, "Local queue: {} entries waiting", status.pending_count)?;
                writeln!(
                    f,
                    "Oldest entry has been waiting {} hours",
                    status.oldest_pending_hours()
                )?;
                writeln!(f, "Entries are kept locally and will sync once it is back.")?;
                writeln!(f, "{RULE}")?;
                writeln!(f)?;
                f.write_str(&confirmation)
            }
            QueueHealth::Critical => {
                writeln!(f, "CRITICAL: memory backend is probably down")?;
                writeln!(f, "{RULE}")?;
                writeln!(
                    f,
                    "Dead letters: {} entries exhausted their retries",
                    status.dead_letter_count
                )?;
                writeln!(f, "They are retried with backoff (up to hourly); investigate the backend.")?;
                writeln!(f, "{RULE}")?;
                writeln!(f)?;
                f.write_str(&confirmation)
            }
        }
    }
}

impl Producer {
    pub fn new(
        queue: Arc<QueueStore>,
        dead_letters: Arc<DeadLetterStore>,
        thresholds: HealthThresholds,
    ) -> Self {
        Self {
            queue,
            dead_letters,
            thresholds,
        }
    }

    /// Queue an entry and return its id.
    pub async fn enqueue(
        &self,
        project_id: impl Into<String>,
        content: impl Into<String>,
    ) -> Result<EntryId> {
        Ok(self.queue.enqueue(project_id, content).await?.id)
    }

    pub async fn status(&self) -> Result<QueueStatus> {
        self.queue.status(&self.dead_letters, self.thresholds).await
    }

    /// Queue an entry, then attach the current queue health.
    ///
    /// A failed status check after a successful enqueue does not fail the save.
    pub async fn save(
        &self,
        project_id: impl Into<String>,
        content: impl Into<String>,
    ) -> Result<SaveReceipt> {
        let entry = self.queue.enqueue(project_id, content).await?;

        let status = match self.status().await {
            Ok(status) => Some(status),
            Err(err) => {
                tracing::warn!(entry_id = %entry.id, error = %err, "queued, but status check failed");
                None
            }
        };

        Ok(SaveReceipt { entry, status })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::RetryPolicy;
    use crate::ports::{Clock, FixedClock, UlidGenerator};
    use crate::store::FileLock;
    use chrono::{TimeZone, Utc};
    use std::time::Duration;

    fn producer(dir: &std::path::Path) -> Producer {
        let clock: Arc<dyn Clock> = Arc::new(FixedClock::new(
            Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap(),
        ));
        let queue = QueueStore::new(
            dir.join("queue.json"),
            FileLock::new(dir.join("queue.lock")).with_poll_interval(Duration::from_millis(10)),
            clock.clone(),
            Arc::new(UlidGenerator::new(clock.clone())),
        )
        .with_lock_timeout(Duration::from_millis(200));
        let dlq = DeadLetterStore::new(dir.join("dlq.json"), RetryPolicy::default(), clock);
        Producer::new(Arc::new(queue), Arc::new(dlq), HealthThresholds::default())
    }

    #[tokio::test]
    async fn save_reports_plain_confirmation_when_healthy() {
        let dir = tempfile::tempdir().unwrap();
        let producer = producer(dir.path());

        let receipt = producer.save("demo", "hello").await.unwrap();

        assert_eq!(receipt.health(), QueueHealth::Healthy);
        let status = receipt.status.as_ref().unwrap();
        assert_eq!(status.pending_count, 1);
        assert_eq!(status.dead_letter_count, 0);
        assert_eq!(
            receipt.to_string(),
            "Memory queued for project 'demo' (will sync to the backend in the background)."
        );
    }

    #[tokio::test]
    async fn save_warns_when_backlog_builds_up() {
        let dir = tempfile::tempdir().unwrap();
        let producer = producer(dir.path());
        for n in 0..19 {
            producer.enqueue("demo", format!("m{n}")).await.unwrap();
        }

        let receipt = producer.save("demo", "m19").await.unwrap();

        assert_eq!(receipt.health(), QueueHealth::Warning);
        let text = receipt.to_string();
        assert!(text.starts_with("WARNING"));
        assert!(text.contains("Local queue: 20 entries waiting"));
        assert!(text.ends_with("(will sync to the backend in the background)."));
    }

    #[tokio::test]
    async fn enqueue_returns_the_stored_id() {
        let dir = tempfile::tempdir().unwrap();
        let producer = producer(dir.path());

        let id = producer.enqueue("demo", "hello").await.unwrap();

        let record: crate::domain::QueueRecord =
            serde_json::from_slice(&std::fs::read(dir.path().join("queue.json")).unwrap()).unwrap();
        assert_eq!(record.queue[0].id, id);
        assert_eq!(record.last_100[0].id, id);
    }

    #[test]
    fn critical_receipt_mentions_dead_letters() {
        let receipt = SaveReceipt {
            entry: QueueEntry::new(EntryId::new("e1"), "demo", "hello", 0),
            status: Some(QueueStatus {
                pending_count: 2,
                dead_letter_count: 7,
                oldest_pending_age_secs: Some(10),
                health: QueueHealth::Critical,
                last_sync: None,
                total_queued: 9,
                total_synced: 0,
                total_failed: 7,
            }),
        };
        let text = receipt.to_string();
        assert!(text.starts_with("CRITICAL"));
        assert!(text.contains("Dead letters: 7"));
    }
}
