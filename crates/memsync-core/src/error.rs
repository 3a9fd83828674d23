use std::path::PathBuf;
use std::time::Duration;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum MemsyncError {
    #[error("could not acquire lock {} within {:?} (queue busy)", path.display(), waited)]
    LockTimeout { path: PathBuf, waited: Duration },

    #[error("{context}: {source}")]
    Io {
        context: String,
        #[source]
        source: std::io::Error,
    },

    #[error("serialization failed: {0}")]
    Serialize(#[from] serde_json::Error),

    #[error("invalid configuration: {0}")]
    Config(String),

    #[error("shutdown requested while waiting for the queue lock")]
    Interrupted,
}

impl MemsyncError {
    /// Wrap an I/O error with the operation and path it came from.
    pub fn io(context: impl Into<String>, source: std::io::Error) -> Self {
        Self::Io {
            context: context.into(),
            source,
        }
    }

    /// Lock contention is the only failure the callers treat as "try again later".
    pub fn is_lock_timeout(&self) -> bool {
        matches!(self, MemsyncError::LockTimeout { .. })
    }
}

pub type Result<T, E = MemsyncError> = std::result::Result<T, E>;
