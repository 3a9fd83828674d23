//! HttpBackend - リモートのメモリ API（reqwest 実装）
//!
//! - `POST {base}/memory` `{"user_id": project_id, "content": content}`
//!   → レスポンス JSON の `success == true` のみ成功
//! - `GET {base}/health` → HTTP 200 のみ healthy
//!
//! どちらも失敗は bool に畳み込み、エラーは呼び出し側に返さない。

use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::domain::QueueEntry;
use crate::error::{MemsyncError, Result};
use crate::ports::{HealthProbe, Uploader};

pub const DEFAULT_UPLOAD_TIMEOUT: Duration = Duration::from_secs(30);
pub const DEFAULT_HEALTH_TIMEOUT: Duration = Duration::from_secs(5);

#[derive(Serialize)]
struct UploadRequest<'a> {
    user_id: &'a str,
    content: &'a str,
}

#[derive(Deserialize)]
struct UploadResponse {
    #[serde(default)]
    success: bool,
}

/// HTTP client for the memory backend.
#[derive(Debug, Clone)]
pub struct HttpBackend {
    client: reqwest::Client,
    base_url: String,
    upload_timeout: Duration,
    health_timeout: Duration,
}

impl HttpBackend {
    pub fn new(base_url: impl Into<String>) -> Result<Self> {
        let client = reqwest::Client::builder()
            .build()
            .map_err(|err| MemsyncError::Config(format!("failed to build HTTP client: {err}")))?;
        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            upload_timeout: DEFAULT_UPLOAD_TIMEOUT,
            health_timeout: DEFAULT_HEALTH_TIMEOUT,
        })
    }

    pub fn with_timeouts(mut self, upload: Duration, health: Duration) -> Self {
        self.upload_timeout = upload;
        self.health_timeout = health;
        self
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    async fn try_upload(&self, entry: &QueueEntry) -> reqwest::Result<bool> {
        let response = self
            .client
            .post(format!("{}/memory", self.base_url))
            .timeout(self.upload_timeout)
            .json(&UploadRequest {
                user_id: &entry.project_id,
                content: &entry.content,
            })
            .send()
            .await?;
        let body: UploadResponse = response.json().await?;
        Ok(body.success)
    }
}

#[async_trait]
impl Uploader for HttpBackend {
    async fn upload(&self, entry: &QueueEntry) -> bool {
        match self.try_upload(entry).await {
            Ok(true) => true,
            Ok(false) => {
                tracing::warn!(entry_id = %entry.id, "backend rejected upload");
                false
            }
            Err(err) => {
                tracing::warn!(entry_id = %entry.id, error = %err, "upload failed");
                false
            }
        }
    }
}

#[async_trait]
impl HealthProbe for HttpBackend {
    async fn is_healthy(&self) -> bool {
        let result = self
            .client
            .get(format!("{}/health", self.base_url))
            .timeout(self.health_timeout)
            .send()
            .await;
        match result {
            Ok(response) => response.status() == reqwest::StatusCode::OK,
            Err(err) => {
                tracing::warn!(error = %err, "health check failed");
                false
            }
        }
    }
}
