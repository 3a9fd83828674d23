//! AppBuilder - ストアとポートのワイヤリング
//!
//! # 方針
//! - Config からファイルパス・タイムアウト・閾値を決める
//! - Clock / Uploader / HealthProbe は差し替え可能（テストでは fake を注入）
//! - build() 時に Config を検証し、不正なら起動しない（Fail-fast）

use std::sync::Arc;

use crate::config::Config;
use crate::error::Result;
use crate::impls::HttpBackend;
use crate::ports::{Clock, HealthProbe, SystemClock, UlidGenerator, Uploader};
use crate::store::{DeadLetterStore, FileLock, MetricsStore, QueueStore};

use super::producer::Producer;
use super::worker_loop::SyncWorker;

/// AppBuilder は Config から App を構築
///
/// # 使用例
/// ```no_run
/// # async fn demo() -> memsync_core::Result<()> {
/// use memsync_core::{AppBuilder, Config};
///
/// let app = AppBuilder::new(Config::load(None)?).build()?;
/// let receipt = app.producer().save("demo", "hello").await?;
/// println!("{receipt}");
/// # Ok(())
/// # }
/// ```
pub struct AppBuilder {
    config: Config,
    clock: Option<Arc<dyn Clock>>,
    uploader: Option<Arc<dyn Uploader>>,
    probe: Option<Arc<dyn HealthProbe>>,
}

impl AppBuilder {
    pub fn new(config: Config) -> Self {
        Self {
            config,
            clock: None,
            uploader: None,
            probe: None,
        }
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = Some(clock);
        self
    }

    /// Replace the HTTP uploader (e.g. with a fake in tests).
    pub fn with_uploader(mut self, uploader: Arc<dyn Uploader>) -> Self {
        self.uploader = Some(uploader);
        self
    }

    pub fn with_probe(mut self, probe: Arc<dyn HealthProbe>) -> Self {
        self.probe = Some(probe);
        self
    }

    /// Validate the config and wire the stores.
    ///
    /// The HTTP backend is only constructed when the uploader or the probe
    /// was not supplied.
    pub fn build(self) -> Result<App> {
        let config = self.config;
        config.validate()?;

        let (uploader, probe) = match (self.uploader, self.probe) {
            (Some(uploader), Some(probe)) => (uploader, probe),
            (uploader, probe) => {
                let http = Arc::new(
                    HttpBackend::new(&config.api_url)?
                        .with_timeouts(config.upload_timeout(), config.health_timeout()),
                );
                (
                    uploader.unwrap_or_else(|| http.clone() as Arc<dyn Uploader>),
                    probe.unwrap_or(http as Arc<dyn HealthProbe>),
                )
            }
        };

        let clock = self
            .clock
            .unwrap_or_else(|| Arc::new(SystemClock) as Arc<dyn Clock>);

        let queue = QueueStore::new(
            config.queue_path(),
            FileLock::new(config.lock_path()),
            clock.clone(),
            Arc::new(UlidGenerator::new(clock.clone())),
        )
        .with_lock_timeout(config.producer_lock_timeout())
        .with_history_capacity(config.history_capacity);

        let dead_letters =
            DeadLetterStore::new(config.dlq_path(), config.retry_policy(), clock.clone());

        tracing::debug!(data_dir = %config.data_dir.display(), api_url = %config.api_url, "app built");

        Ok(App {
            queue: Arc::new(queue),
            dead_letters: Arc::new(dead_letters),
            uploader,
            probe,
            clock,
            config,
        })
    }
}

/// App は構築済みのストアとポートを保持する
///
/// Producer と SyncWorker は同じストアを共有する（ファイルロックで排他）。
pub struct App {
    config: Config,
    queue: Arc<QueueStore>,
    dead_letters: Arc<DeadLetterStore>,
    uploader: Arc<dyn Uploader>,
    probe: Arc<dyn HealthProbe>,
    clock: Arc<dyn Clock>,
}

impl App {
    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn queue(&self) -> &Arc<QueueStore> {
        &self.queue
    }

    pub fn dead_letters(&self) -> &Arc<DeadLetterStore> {
        &self.dead_letters
    }

    pub fn metrics(&self) -> MetricsStore {
        MetricsStore::new(self.config.metrics_path())
    }

    pub fn producer(&self) -> Producer {
        Producer::new(
            self.queue.clone(),
            self.dead_letters.clone(),
            self.config.health_thresholds(),
        )
    }

    pub fn worker(&self) -> SyncWorker {
        SyncWorker::new(
            self.queue.clone(),
            self.dead_letters.clone(),
            self.metrics(),
            self.uploader.clone(),
            self.probe.clone(),
            self.clock.clone(),
        )
        .with_interval(self.config.cycle_interval())
        .with_lock_timeout(self.config.worker_lock_timeout())
    }
}
