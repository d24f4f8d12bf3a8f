//! OpenAI (Sora) video generation across three API dialects.

mod client;
mod managed;
mod multipart;
mod responses;

pub use client::{OpenAiClient, OpenAiConfig, DEFAULT_BASE_URL};
pub use managed::ManagedStrategy;
pub use multipart::MultipartStrategy;
pub use responses::ResponsesStrategy;

use crate::error::{Result, SoraChainError};
use crate::video::chain::StrategyChain;
use crate::video::poll::MIN_POLL_INTERVAL;
use crate::video::types::{GeneratedVideo, VideoGenerationRequest};
use std::fmt;
use std::sync::Arc;
use std::time::Duration;

/// Builder for the OpenAI strategy chain.
#[derive(Clone, Default)]
pub struct OpenAiVideoBuilder {
    api_key: Option<String>,
    base_url: Option<String>,
    config: OpenAiConfig,
}

impl fmt::Debug for OpenAiVideoBuilder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OpenAiVideoBuilder")
            .field("api_key", &self.api_key.as_ref().map(|_| "[REDACTED]"))
            .field("base_url", &self.base_url)
            .field("config", &self.config)
            .finish()
    }
}

impl OpenAiVideoBuilder {
    /// Creates a new builder with default settings.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the API key. Falls back to `OPENAI_API_KEY` env var.
    pub fn api_key(mut self, key: impl Into<String>) -> Self {
        self.api_key = Some(key.into());
        self
    }

    /// Sets the API root. Falls back to `OPENAI_BASE_URL`, then the public endpoint.
    pub fn base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = Some(url.into());
        self
    }

    /// Sets the polling interval for asynchronous jobs, at least [`MIN_POLL_INTERVAL`].
    pub fn poll_interval(mut self, interval: Duration) -> Self {
        self.config.poll_interval = interval.max(MIN_POLL_INTERVAL);
        self
    }

    /// Sets the timeout for job-creation calls.
    pub fn create_timeout(mut self, timeout: Duration) -> Self {
        self.config.create_timeout = timeout;
        self
    }

    /// Sets the timeout for the responses call.
    pub fn responses_timeout(mut self, timeout: Duration) -> Self {
        self.config.responses_timeout = timeout;
        self
    }

    /// Sets the timeout for a single status check.
    pub fn status_timeout(mut self, timeout: Duration) -> Self {
        self.config.status_timeout = timeout;
        self
    }

    /// Sets the timeout for media downloads.
    pub fn media_timeout(mut self, timeout: Duration) -> Self {
        self.config.media_timeout = timeout;
        self
    }

    /// Builds the shared client, resolving the API key.
    pub fn build_client(self) -> Result<OpenAiClient> {
        let api_key = self
            .api_key
            .or_else(|| std::env::var("OPENAI_API_KEY").ok())
            .map(|k| k.trim().to_string())
            .filter(|k| !k.is_empty())
            .ok_or_else(|| {
                SoraChainError::Auth("OPENAI_API_KEY not set and no API key provided".into())
            })?;

        let mut config = self.config;
        if let Some(url) = self
            .base_url
            .or_else(|| std::env::var("OPENAI_BASE_URL").ok())
            .filter(|u| !u.trim().is_empty())
        {
            config.base_url = url;
        }

        OpenAiClient::new(api_key, config)
    }

    /// Builds the chain: managed, then responses, then legacy multipart.
    pub fn build(self) -> Result<StrategyChain> {
        let client = Arc::new(self.build_client()?);
        Ok(StrategyChain::new(vec![
            Box::new(ManagedStrategy::new(client.clone())),
            Box::new(ResponsesStrategy::new(client.clone())),
            Box::new(MultipartStrategy::new(client)),
        ]))
    }
}

/// Generates a video with the default chain for `credential`, within `timeout`.
pub async fn generate(
    request: &VideoGenerationRequest,
    credential: &str,
    timeout: Duration,
) -> Result<GeneratedVideo> {
    OpenAiVideoBuilder::new()
        .api_key(credential)
        .build()?
        .generate(request, timeout)
        .await
}
