//! File-backed stores.
//!
//! - `QueueStore`: pending queue + history + counters, guarded by `FileLock`
//! - `DeadLetterStore`: exhausted entries with their own backoff (worker-only writer)
//! - `MetricsStore`: snapshot rewritten every worker cycle
//!
//! All three write through `atomic::write_json_atomic` and read tolerantly.

pub mod atomic;
mod dead_letter;
mod lock;
mod metrics;
mod queue_store;

pub use dead_letter::{DeadLetterStore, DrainReport};
pub use lock::{FileLock, LockGuard};
pub use metrics::MetricsStore;
pub use queue_store::{DEFAULT_HISTORY_CAPACITY, DEFAULT_PRODUCER_LOCK_TIMEOUT, QueueStore};
