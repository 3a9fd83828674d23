//! Health classifications.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Queue health as seen by the producer.
///
/// Derived from local state only (no network):
/// - Critical: too many dead letters
/// - Warning: pending backlog is growing
/// - Healthy: otherwise
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum QueueHealth {
    Healthy,
    Warning,
    Critical,
}

/// Thresholds for [`QueueHealth::classify`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HealthThresholds {
    /// Warning when pending count is at least this.
    pub warning_pending: usize,
    /// Critical when the dead-letter count is strictly above this.
    pub critical_dead_letters: usize,
}

impl Default for HealthThresholds {
    fn default() -> Self {
        Self {
            warning_pending: 20,
            critical_dead_letters: 5,
        }
    }
}

impl QueueHealth {
    /// Dead letters take precedence over backlog.
    pub fn classify(pending: usize, dead_letters: usize, thresholds: HealthThresholds) -> Self {
        if dead_letters > thresholds.critical_dead_letters {
            QueueHealth::Critical
        } else if pending >= thresholds.warning_pending {
            QueueHealth::Warning
        } else {
            QueueHealth::Healthy
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            QueueHealth::Healthy => "healthy",
            QueueHealth::Warning => "warning",
            QueueHealth::Critical => "critical",
        }
    }
}

impl fmt::Display for QueueHealth {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Backend liveness as published in the metrics snapshot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BackendStatus {
    Healthy,
    Down,
}

impl From<bool> for BackendStatus {
    fn from(healthy: bool) -> Self {
        if healthy {
            BackendStatus::Healthy
        } else {
            BackendStatus::Down
        }
    }
}

impl fmt::Display for BackendStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            BackendStatus::Healthy => "healthy",
            BackendStatus::Down => "down",
        })
    }
}
