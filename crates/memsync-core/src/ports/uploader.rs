//! Uploader port - リモートのメモリバックエンドへの書き込み
//!
//! 失敗の種類（ネットワーク、タイムアウト、レスポンス不正、明示的な拒否）は
//! すべて `false` に畳み込む。呼び出し側にエラー分岐は不要。

use async_trait::async_trait;

use crate::domain::QueueEntry;

/// Uploader は 1 エントリを 1 回だけ送信する
///
/// # 契約
/// - `true` はバックエンドが明示的に成功を返した場合のみ
/// - panic もエラーも境界の外に出さない
#[async_trait]
pub trait Uploader: Send + Sync {
    async fn upload(&self, entry: &QueueEntry) -> bool;
}
