//! HTTP client for the PRD service

use crate::protocol::PrdRequest;
use crate::protocol::PrdResponse;
use async_trait::async_trait;
use std::time::Duration;

#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    #[error("request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("server returned {status}: {detail}")]
    Status { status: u16, detail: String },
    #[error("could not decode response: {0}")]
    Decode(#[from] serde_json::Error),
}

/// Anything that can turn a [`PrdRequest`] into a [`PrdResponse`]
#[async_trait]
pub trait PrdBackend: Send + Sync {
    async fn process(&self, request: &PrdRequest) -> Result<PrdResponse, ClientError>;
}

/// Backend reached over HTTP at `<base_url>/api/process-prd`
#[derive(Debug, Clone)]
pub struct HttpBackend {
    http: reqwest::Client,
    base_url: String,
}

impl HttpBackend {
    pub fn new(base_url: &str) -> Result<Self, ClientError> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(300))
            .build()?;
        Ok(Self {
            http,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }
}

#[async_trait]
impl PrdBackend for HttpBackend {
    async fn process(&self, request: &PrdRequest) -> Result<PrdResponse, ClientError> {
        let response = self
            .http
            .post(format!("{}/api/process-prd", self.base_url))
            .json(request)
            .send()
            .await?;

        let status = response.status();
        let body = response.text().await?;
        if !status.is_success() {
            // error bodies look like {"detail": "..."}
            let detail = serde_json::from_str::<serde_json::Value>(&body)
                .ok()
                .and_then(|v| v.get("detail").and_then(|d| d.as_str()).map(str::to_string))
                .unwrap_or(body);
            return Err(ClientError::Status {
                status: status.as_u16(),
                detail,
            });
        }
        Ok(serde_json::from_str(&body)?)
    }
}
