//! Domain model (ids, entries, persisted record, retry policy, health, status).

pub mod entry;
pub mod health;
pub mod ids;
pub mod metrics;
pub mod record;
pub mod retry;
pub mod status;
pub mod timestamp;

pub use entry::{DeadLetterEntry, QueueEntry};
pub use health::{BackendStatus, HealthThresholds, QueueHealth};
pub use ids::EntryId;
pub use metrics::MetricsSnapshot;
pub use record::{QueueRecord, QueueStats};
pub use retry::RetryPolicy;
pub use status::QueueStatus;
