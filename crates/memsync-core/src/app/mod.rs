//! App - アプリケーション層
//!
//! store と ports を組み合わせて、2 つの実行主体を提供します。
//!
//! # 主要コンポーネント
//! - **AppBuilder**: Config からのワイヤリング
//! - **Producer**: 対話的な保存（enqueue + 状態確認）
//! - **SyncWorker**: バックグラウンド同期ループ（health → DLQ → pending → metrics）

pub mod builder;
pub mod producer;
pub mod worker_loop;

// 主要な型を再エクスポート
pub use self::builder::{App, AppBuilder};
pub use self::producer::{Producer, SaveReceipt};
pub use self::worker_loop::{CycleReport, SyncWorker};
