//! Metrics snapshot file, rewritten by the worker every cycle.

use std::path::{Path, PathBuf};

use super::atomic::{read_json_or_default, write_json_atomic};
use crate::domain::MetricsSnapshot;
use crate::error::Result;

pub struct MetricsStore {
    path: PathBuf,
}

impl MetricsStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn publish(&self, snapshot: &MetricsSnapshot) -> Result<()> {
        write_json_atomic(&self.path, snapshot)
    }

    /// Last published snapshot, if any readable one exists.
    pub fn load(&self) -> Option<MetricsSnapshot> {
        read_json_or_default(&self.path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::BackendStatus;
    use chrono::{TimeZone, Utc};

    #[test]
    fn publish_then_load() {
        let dir = tempfile::tempdir().unwrap();
        let store = MetricsStore::new(dir.path().join("metrics.json"));
        assert!(store.load().is_none());

        let snapshot = MetricsSnapshot {
            last_update: Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap(),
            vps_status: BackendStatus::Down,
            queue_size: 3,
            dlq_size: 1,
            total_synced: 10,
            total_queued: 14,
        };
        store.publish(&snapshot).unwrap();

        assert_eq!(store.load(), Some(snapshot));
        let raw: serde_json::Value =
            serde_json::from_slice(&std::fs::read(store.path()).unwrap()).unwrap();
        assert_eq!(raw["vps_status"], "down");
    }

    #[test]
    fn legacy_snapshot_with_naive_time_loads() {
        let dir = tempfile::tempdir().unwrap();
        let store = MetricsStore::new(dir.path().join("metrics.json"));
        std::fs::write(
            store.path(),
            r#"{"last_update": "2025-01-15T10:30:00.123456", "vps_status": "healthy",
                "queue_size": 2, "dlq_size": 0, "total_synced": 40, "total_queued": 42}"#,
        )
        .unwrap();

        let snapshot = store.load().unwrap();
        assert_eq!(snapshot.vps_status, BackendStatus::Healthy);
        assert_eq!(snapshot.total_queued, 42);
    }
}
