//! Metrics snapshot published by the worker after every cycle.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::BackendStatus;

/// Point-in-time view of the sync pipeline.
///
/// Written in full by the worker each cycle; everyone else only reads it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetricsSnapshot {
    #[serde(deserialize_with = "super::timestamp::required")]
    pub last_update: DateTime<Utc>,
    pub vps_status: BackendStatus,
    pub queue_size: usize,
    pub dlq_size: usize,
    pub total_synced: u64,
    pub total_queued: u64,
}
