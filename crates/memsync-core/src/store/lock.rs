//! Cross-process advisory lock on a well-known file.
//!
//! Producer and worker are separate OS processes, so an in-process mutex is
//! not enough. The lock is an exclusive `flock` on the lock file, polled until
//! it is granted or the timeout runs out. The returned guard releases the
//! lock when dropped, on every exit path.

use std::fs::{self, File, OpenOptions};
use std::path::{Path, PathBuf};
use std::time::Duration;

use fs2::FileExt;
use tokio::time::Instant;

use crate::error::{MemsyncError, Result};

const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(100);

/// Handle to a lock file. Cheap; holds no OS resources until `acquire`.
#[derive(Debug, Clone)]
pub struct FileLock {
    path: PathBuf,
    poll_interval: Duration,
}

/// Proof that the lock is held.
#[derive(Debug)]
pub struct LockGuard {
    file: File,
    path: PathBuf,
}

impl FileLock {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            poll_interval: DEFAULT_POLL_INTERVAL,
        }
    }

    pub fn with_poll_interval(mut self, poll_interval: Duration) -> Self {
        self.poll_interval = poll_interval;
        self
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Acquire the lock, polling until `timeout` elapses.
    ///
    /// On timeout nothing has been touched except the (empty) lock file
    /// itself; the caller must abort its operation.
    pub async fn acquire(&self, timeout: Duration) -> Result<LockGuard> {
        let file = self.open()?;
        let start = Instant::now();

        loop {
            match FileExt::try_lock_exclusive(&file) {
                Ok(()) => {
                    tracing::trace!(path = %self.path.display(), "lock acquired");
                    return Ok(LockGuard {
                        file,
                        path: self.path.clone(),
                    });
                }
                Err(err) if is_contended(&err) => {}
                Err(err) => {
                    return Err(MemsyncError::io(
                        format!("failed to lock {}", self.path.display()),
                        err,
                    ));
                }
            }

            let elapsed = start.elapsed();
            if elapsed >= timeout {
                tracing::warn!(
                    path = %self.path.display(),
                    waited_ms = elapsed.as_millis() as u64,
                    "lock acquisition timed out"
                );
                return Err(MemsyncError::LockTimeout {
                    path: self.path.clone(),
                    waited: elapsed,
                });
            }
            tokio::time::sleep(self.poll_interval.min(timeout - elapsed)).await;
        }
    }

    fn open(&self) -> Result<File> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).map_err(|err| {
                MemsyncError::io(format!("failed to create {}", parent.display()), err)
            })?;
        }
        OpenOptions::new()
            .create(true)
            .write(true)
            .truncate(false)
            .open(&self.path)
            .map_err(|err| MemsyncError::io(format!("failed to open {}", self.path.display()), err))
    }
}

impl LockGuard {
    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Drop for LockGuard {
    fn drop(&mut self) {
        // closing the descriptor releases the flock as well
        if let Err(err) = FileExt::unlock(&self.file) {
            tracing::warn!(path = %self.path.display(), error = %err, "failed to release lock");
        }
    }
}

fn is_contended(err: &std::io::Error) -> bool {
    err.kind() == fs2::lock_contended_error().kind()
        || err.raw_os_error() == fs2::lock_contended_error().raw_os_error()
}
