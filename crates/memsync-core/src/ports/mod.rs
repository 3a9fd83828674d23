//! Ports - 抽象化レイヤー
//!
//! キューとワーカーが外部（時刻、ID、リモートバックエンド）に依存する箇所を
//! trait として切り出す。テストでは差し替え可能。
//!
//! # 構成
//! - ファイルストア（queue / DLQ / metrics）は `store` モジュールの具象型
//! - リモートバックエンドは Uploader / HealthProbe（本番実装は `impls::HttpBackend`）

pub mod clock;
pub mod health_probe;
pub mod id_generator;
pub mod uploader;

// 主要な trait を再エクスポート
pub use self::clock::{Clock, FixedClock, ManualClock, SystemClock};
pub use self::health_probe::HealthProbe;
pub use self::id_generator::{IdGenerator, UlidGenerator};
pub use self::uploader::Uploader;
