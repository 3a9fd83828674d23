//! HealthProbe port - バックエンドの生存確認
//!
//! ワーカーは各サイクルの先頭でこれを呼び、`false` ならアップロードを一切行わない。

use async_trait::async_trait;

/// HealthProbe は軽量な生存確認を行う（タイムアウト付き）
#[async_trait]
pub trait HealthProbe: Send + Sync {
    async fn is_healthy(&self) -> bool;
}
