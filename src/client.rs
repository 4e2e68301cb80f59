use std::time::Duration;

use anyhow::{Context, Result};
use reqwest::header::{HeaderMap, HeaderValue};
use reqwest::{Response, StatusCode};
use serde::de::DeserializeOwned;
use tracing::debug;

use crate::config::ClientConfig;
use crate::error::ApiError;
use crate::types::{AnalyzeRequest, AnalyzeResponse, ApiErrorBody, InternalRecord, LookupRecord};

/// Header carrying the pre-shared API key (sent as `X-API-Key`; names are case-insensitive).
pub const API_KEY_HEADER: &str = "x-api-key";

/// Thin typed wrapper over the three endpoints of the intelligence API.
///
/// Cloning is cheap; the underlying connection pool is shared.
#[derive(Clone, Debug)]
pub struct ApiClient {
    http: reqwest::Client,
    base_url: String,
}

impl ApiClient {
    pub fn new(config: &ClientConfig) -> Result<Self> {
        let mut headers = HeaderMap::new();
        let key = HeaderValue::from_str(&config.api_key)
            .context("API key is not a valid HTTP header value")?;
        headers.insert(API_KEY_HEADER, key);

        let mut builder = reqwest::Client::builder()
            .default_headers(headers)
            .user_agent(concat!("ipintel-client/", env!("CARGO_PKG_VERSION")));
        if let Some(ms) = config.request_timeout_ms {
            builder = builder.timeout(Duration::from_millis(ms));
        }
        let http = builder.build().context("failed to build HTTP client")?;

        Ok(Self {
            http,
            base_url: config.api_base_url.trim_end_matches('/').to_string(),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// `GET /query/{ip}`.
    pub async fn query(&self, ip: &str) -> Result<LookupRecord, ApiError> {
        let url = format!("{}/query/{}", self.base_url, ip);
        debug!(%url, "query");
        let resp = self.http.get(&url).send().await?;
        decode(resp).await
    }

    /// `POST /analyze` with the full identifier list.
    pub async fn analyze(&self, ips: &[String]) -> Result<AnalyzeResponse, ApiError> {
        let url = format!("{}/analyze", self.base_url);
        debug!(%url, count = ips.len(), "analyze");
        let resp = self.http.post(&url).json(&AnalyzeRequest { ips }).send().await?;
        decode(resp).await
    }

    /// `POST /analyze/internal` with the full identifier list.
    pub async fn analyze_internal(&self, ips: &[String]) -> Result<Vec<InternalRecord>, ApiError> {
        let url = format!("{}/analyze/internal", self.base_url);
        debug!(%url, count = ips.len(), "analyze internal");
        let resp = self.http.post(&url).json(&AnalyzeRequest { ips }).send().await?;
        decode(resp).await
    }
}

/// Turn a response into `T` on 2xx, or into `ApiError::Remote` using the `{error}` body.
async fn decode<T: DeserializeOwned>(resp: Response) -> Result<T, ApiError> {
    let status = resp.status();
    let body = resp.bytes().await?;
    if status.is_success() {
        return serde_json::from_slice(&body).map_err(|e| ApiError::Decode(e.to_string()));
    }
    Err(ApiError::Remote {
        status: status.as_u16(),
        message: remote_message(status, &body),
    })
}

fn remote_message(status: StatusCode, body: &[u8]) -> String {
    match serde_json::from_slice::<ApiErrorBody>(body) {
        Ok(b) => b.error,
        Err(_) => status
            .canonical_reason()
            .map(str::to_string)
            .unwrap_or_else(|| format!("HTTP {}", status.as_u16())),
    }
}
