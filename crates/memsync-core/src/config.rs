//! Configuration.
//!
//! Every field has a default matching the deployed layout (state files under
//! `~/.claude`). A JSON file can override any subset, and a few `MEMSYNC_*`
//! environment variables override the file.
//!
//! ```
//! use memsync_core::Config;
//!
//! let config = Config::default();
//! assert_eq!(config.dlq_threshold, 5);
//! assert_eq!(config.cycle_interval_secs, 30);
//! ```

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::Deserialize;

use crate::domain::{HealthThresholds, RetryPolicy};
use crate::error::{MemsyncError, Result};

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Directory holding the queue, dead-letter, metrics and lock files.
    pub data_dir: PathBuf,
    pub queue_file: String,
    pub dlq_file: String,
    pub metrics_file: String,
    pub lock_file: String,

    /// Base URL of the memory backend.
    pub api_url: String,

    pub producer_lock_timeout_secs: u64,
    pub worker_lock_timeout_secs: u64,
    pub cycle_interval_secs: u64,
    pub upload_timeout_secs: u64,
    pub health_timeout_secs: u64,

    pub dlq_threshold: u32,
    pub dlq_base_delay_secs: u64,
    pub dlq_max_delay_secs: u64,

    pub history_capacity: usize,
    pub warning_pending: usize,
    pub critical_dead_letters: usize,

    /// Emit logs as JSON lines instead of human-readable text.
    pub json_logs: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            data_dir: default_data_dir(),
            queue_file: "mem0_queue.json".into(),
            dlq_file: "mem0_queue_dlq.json".into(),
            metrics_file: "mem0_metrics.json".into(),
            lock_file: "mem0_queue.lock".into(),
            api_url: "http://127.0.0.1:8081".into(),
            producer_lock_timeout_secs: 5,
            worker_lock_timeout_secs: 30,
            cycle_interval_secs: 30,
            upload_timeout_secs: 30,
            health_timeout_secs: 5,
            dlq_threshold: 5,
            dlq_base_delay_secs: 30,
            dlq_max_delay_secs: 3600,
            history_capacity: 100,
            warning_pending: 20,
            critical_dead_letters: 5,
            json_logs: false,
        }
    }
}

fn default_data_dir() -> PathBuf {
    std::env::var_os("HOME")
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from("."))
        .join(".claude")
}

impl Config {
    /// Defaults, then the JSON file (if any), then environment overrides.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let mut config = match path {
            Some(path) => Self::from_file(path)?,
            None => Self::default(),
        };
        config.apply_env(|key| std::env::var(key).ok())?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_file(path: &Path) -> Result<Self> {
        let bytes = std::fs::read(path)
            .map_err(|err| MemsyncError::io(format!("failed to read {}", path.display()), err))?;
        serde_json::from_slice(&bytes)
            .map_err(|err| MemsyncError::Config(format!("{}: {err}", path.display())))
    }

    /// Apply `MEMSYNC_*` overrides from `lookup` (the process environment in
    /// production, a map in tests).
    pub fn apply_env(&mut self, lookup: impl Fn(&str) -> Option<String>) -> Result<()> {
        if let Some(dir) = lookup("MEMSYNC_DATA_DIR") {
            self.data_dir = PathBuf::from(dir);
        }
        if let Some(url) = lookup("MEMSYNC_API_URL") {
            self.api_url = url;
        }
        if let Some(secs) = lookup("MEMSYNC_CYCLE_INTERVAL_SECS") {
            self.cycle_interval_secs = secs.parse().map_err(|_| {
                MemsyncError::Config(format!("MEMSYNC_CYCLE_INTERVAL_SECS is not a number: {secs:?}"))
            })?;
        }
        if let Some(flag) = lookup("MEMSYNC_JSON_LOGS") {
            self.json_logs = matches!(flag.as_str(), "1" | "true" | "yes");
        }
        Ok(())
    }

    pub fn validate(&self) -> Result<()> {
        if self.api_url.trim().is_empty() {
            return Err(MemsyncError::Config("api_url must not be empty".into()));
        }
        if self.cycle_interval_secs == 0 {
            return Err(MemsyncError::Config("cycle_interval_secs must be positive".into()));
        }
        if self.dlq_threshold == 0 {
            return Err(MemsyncError::Config("dlq_threshold must be at least 1".into()));
        }
        if self.history_capacity == 0 {
            return Err(MemsyncError::Config("history_capacity must be at least 1".into()));
        }
        if self.dlq_max_delay_secs < self.dlq_base_delay_secs {
            return Err(MemsyncError::Config(
                "dlq_max_delay_secs must not be below dlq_base_delay_secs".into(),
            ));
        }
        Ok(())
    }

    pub fn queue_path(&self) -> PathBuf {
        self.data_dir.join(&self.queue_file)
    }

    pub fn dlq_path(&self) -> PathBuf {
        self.data_dir.join(&self.dlq_file)
    }

    pub fn metrics_path(&self) -> PathBuf {
        self.data_dir.join(&self.metrics_file)
    }

    pub fn lock_path(&self) -> PathBuf {
        self.data_dir.join(&self.lock_file)
    }

    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy {
            dead_letter_threshold: self.dlq_threshold,
            base_delay: Duration::from_secs(self.dlq_base_delay_secs),
            max_delay: Duration::from_secs(self.dlq_max_delay_secs),
            ..RetryPolicy::default()
        }
    }

    pub fn health_thresholds(&self) -> HealthThresholds {
        HealthThresholds {
            warning_pending: self.warning_pending,
            critical_dead_letters: self.critical_dead_letters,
        }
    }

    pub fn cycle_interval(&self) -> Duration {
        Duration::from_secs(self.cycle_interval_secs)
    }

    pub fn producer_lock_timeout(&self) -> Duration {
        Duration::from_secs(self.producer_lock_timeout_secs)
    }

    pub fn worker_lock_timeout(&self) -> Duration {
        Duration::from_secs(self.worker_lock_timeout_secs)
    }

    pub fn upload_timeout(&self) -> Duration {
        Duration::from_secs(self.upload_timeout_secs)
    }

    pub fn health_timeout(&self) -> Duration {
        Duration::from_secs(self.health_timeout_secs)
    }
}
