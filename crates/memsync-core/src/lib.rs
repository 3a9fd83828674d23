//! memsync-core
//!
//! Durable local queue in front of a remote memory backend.
//!
//! Saving a memory never waits on the network: the producer appends to a
//! JSON queue file under an exclusive file lock, and a background worker
//! drains it to the backend. Entries that keep failing move to a
//! dead-letter file and are retried with exponential backoff.
//!
//! # モジュール構成
//! - **domain**: エントリ、キュー記録、健全性、リトライ方針
//! - **ports**: Clock, IdGenerator, Uploader, HealthProbe
//! - **store**: ファイルロック、アトミック書き込み、キュー/DLQ/メトリクスの永続化
//! - **app**: AppBuilder, Producer, SyncWorker
//! - **impls**: HTTP バックエンド（reqwest）

pub mod app;
pub mod config;
pub mod domain;
pub mod error;
pub mod impls;
pub mod observability;
pub mod ports;
pub mod store;

pub use app::{App, AppBuilder, CycleReport, Producer, SaveReceipt, SyncWorker};
pub use config::Config;
pub use domain::{DeadLetterEntry, EntryId, QueueEntry, QueueHealth, QueueStatus};
pub use error::{MemsyncError, Result};
