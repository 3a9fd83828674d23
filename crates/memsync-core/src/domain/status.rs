//! Queue status summary returned to the producer side.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::QueueHealth;

/// Snapshot of local queue state plus the derived health classification.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QueueStatus {
    pub pending_count: usize,
    pub dead_letter_count: usize,
    /// `now - enqueued_at` of the oldest pending entry.
    pub oldest_pending_age_secs: Option<i64>,
    pub health: QueueHealth,
    pub last_sync: Option<DateTime<Utc>>,
    pub total_queued: u64,
    pub total_synced: u64,
    pub total_failed: u64,
}

impl QueueStatus {
    /// Whole hours the oldest pending entry has been waiting.
    pub fn oldest_pending_hours(&self) -> i64 {
        self.oldest_pending_age_secs.unwrap_or(0) / 3600
    }
}

/// "2h 15min" style age.
pub fn format_age(secs: i64) -> String {
    let hours = secs / 3600;
    let minutes = (secs % 3600) / 60;
    format!("{hours}h {minutes}min")
}

impl fmt::Display for QueueStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let marker = match self.health {
            QueueHealth::Healthy => "OK",
            QueueHealth::Warning => "WARN",
            QueueHealth::Critical => "CRIT",
        };
        writeln!(f, "Memory queue status")?;
        writeln!(f)?;
        writeln!(f, "[{marker}] Health: {}", self.health.as_str().to_uppercase())?;
        writeln!(f)?;
        writeln!(f, "Queue:")?;
        writeln!(f, "  - Pending: {}", self.pending_count)?;
        writeln!(f, "  - Dead letters: {}", self.dead_letter_count)?;
        match self.oldest_pending_age_secs {
            Some(age) if age > 0 => writeln!(f, "  - Oldest entry: {} ago", format_age(age))?,
            _ => writeln!(f, "  - No entries waiting")?,
        }
        writeln!(f)?;
        writeln!(f, "Stats:")?;
        writeln!(f, "  - Total queued: {}", self.total_queued)?;
        writeln!(f, "  - Total synced: {}", self.total_synced)?;
        writeln!(f, "  - Moved to dead letters: {}", self.total_failed)?;
        match self.last_sync {
            Some(at) => write!(f, "  - Last sync: {}", at.to_rfc3339()),
            None => write!(f, "  - No sync yet"),
        }
    }
}
