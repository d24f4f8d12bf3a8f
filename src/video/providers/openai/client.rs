//! Shared HTTP plumbing for the OpenAI dialects: configuration, auth, error bodies.

use crate::error::{ProviderFailure, Result, SoraChainError};
use crate::video::extract::{ContentBody, ContentDownloader, HttpResponse, MediaFetcher};
use crate::video::poll::{JobHandle, StatusLocation, StatusSource};
use async_trait::async_trait;
use serde_json::Value;
use std::fmt;
use std::time::Duration;

/// Default API root.
pub const DEFAULT_BASE_URL: &str = "https://api.openai.com/v1";

/// Timeouts and intervals used by the dialects.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OpenAiConfig {
    /// API root, without a trailing slash.
    pub base_url: String,
    /// Pause between status checks.
    pub poll_interval: Duration,
    /// Timeout for job-creation calls.
    pub create_timeout: Duration,
    /// Timeout for the responses call.
    pub responses_timeout: Duration,
    /// Timeout for a single status check.
    pub status_timeout: Duration,
    /// Timeout for media downloads.
    pub media_timeout: Duration,
}

impl Default for OpenAiConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            poll_interval: Duration::from_secs(2),
            create_timeout: Duration::from_secs(120),
            responses_timeout: Duration::from_secs(90),
            status_timeout: Duration::from_secs(30),
            media_timeout: Duration::from_secs(180),
        }
    }
}

/// Authenticated client shared by all three dialects.
#[derive(Clone)]
pub struct OpenAiClient {
    http: reqwest::Client,
    api_key: String,
    config: OpenAiConfig,
}

impl fmt::Debug for OpenAiClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OpenAiClient")
            .field("api_key", &"[REDACTED]")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl OpenAiClient {
    /// Creates a client for the given credential.
    pub fn new(api_key: impl Into<String>, config: OpenAiConfig) -> Result<Self> {
        let api_key = api_key.into();
        if api_key.trim().is_empty() {
            return Err(SoraChainError::Auth("API key is empty".into()));
        }
        let http = reqwest::Client::builder()
            .user_agent(concat!("sorachain/", env!("CARGO_PKG_VERSION")))
            .build()?;
        Ok(Self {
            http,
            api_key,
            config,
        })
    }

    /// The active configuration.
    pub fn config(&self) -> &OpenAiConfig {
        &self.config
    }

    pub(crate) fn url(&self, path: &str) -> String {
        format!("{}/{}", self.config.base_url.trim_end_matches('/'), path)
    }

    pub(crate) fn post(&self, path: &str, timeout: Duration) -> reqwest::RequestBuilder {
        self.http
            .post(self.url(path))
            .bearer_auth(&self.api_key)
            .timeout(timeout)
    }

    fn get_authed(&self, url: &str, timeout: Duration) -> reqwest::RequestBuilder {
        self.http.get(url).bearer_auth(&self.api_key).timeout(timeout)
    }

    /// True when `url` has the same scheme, host and port as the API root.
    pub(crate) fn is_api_origin(&self, url: &str) -> bool {
        let (Ok(base), Ok(target)) = (
            reqwest::Url::parse(&self.config.base_url),
            reqwest::Url::parse(url),
        ) else {
            return false;
        };
        base.scheme() == target.scheme()
            && base.host_str() == target.host_str()
            && base.port_or_known_default() == target.port_or_known_default()
    }

    /// Sends a request and parses a JSON body; non-2xx becomes a failure.
    pub(crate) async fn send_json(
        &self,
        request: reqwest::RequestBuilder,
    ) -> std::result::Result<Value, ProviderFailure> {
        let response = request.send().await?;
        let status = response.status();
        let text = response.text().await?;
        if !status.is_success() {
            return Err(ProviderFailure::http(status.as_u16(), error_message(&text)));
        }
        serde_json::from_str(&text).map_err(|e| {
            ProviderFailure::new(format!("response was not JSON ({e}): {text}"))
        })
    }

    async fn buffer(
        request: reqwest::RequestBuilder,
    ) -> std::result::Result<HttpResponse, ProviderFailure> {
        let response = request.send().await?;
        let status = response.status().as_u16();
        let body = response.bytes().await?.to_vec();
        Ok(HttpResponse { status, body })
    }
}

/// Pulls `error.message` out of an OpenAI error body, falling back to the raw text.
pub(crate) fn error_message(text: &str) -> String {
    let parsed: Option<Value> = serde_json::from_str(text).ok();
    let error = parsed.as_ref().and_then(|v| v.get("error"));
    let message = error
        .and_then(|e| e.get("message"))
        .and_then(Value::as_str)
        .or_else(|| error.and_then(Value::as_str));
    let code = error.and_then(|e| e.get("code")).and_then(Value::as_str);

    match (message, code) {
        (Some(message), Some(code)) => format!("{message} ({code})"),
        (Some(message), None) => message.to_string(),
        _ => text.to_string(),
    }
}

#[async_trait]
impl MediaFetcher for OpenAiClient {
    async fn get(
        &self,
        url: &str,
        timeout: Duration,
    ) -> std::result::Result<HttpResponse, ProviderFailure> {
        // Media URLs are pre-signed; the API key stays off third-party hosts.
        Self::buffer(self.http.get(url).timeout(timeout)).await
    }
}

#[async_trait]
impl StatusSource for OpenAiClient {
    async fn fetch_status(
        &self,
        handle: &JobHandle,
    ) -> std::result::Result<HttpResponse, ProviderFailure> {
        let timeout = self.config.status_timeout;
        let request = match &handle.location {
            StatusLocation::Job => {
                self.get_authed(&self.url(&format!("videos/{}", handle.job_id)), timeout)
            }
            StatusLocation::Url(url) if self.is_api_origin(url) => self.get_authed(url, timeout),
            StatusLocation::Url(url) => {
                tracing::debug!(status_url = %url, "status URL is off the API host, sending without credentials");
                self.http.get(url).timeout(timeout)
            }
        };
        Self::buffer(request).await
    }
}

#[async_trait]
impl ContentDownloader for OpenAiClient {
    async fn download_content(
        &self,
        id: &str,
    ) -> std::result::Result<ContentBody, ProviderFailure> {
        let url = self.url(&format!("videos/{id}/content"));
        let response = self
            .get_authed(&url, self.config.media_timeout)
            .send()
            .await?;
        Ok(ContentBody::Response(response))
    }
}
