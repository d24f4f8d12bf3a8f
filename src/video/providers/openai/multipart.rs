//! Legacy dialect: multipart job submission answered by a URL or a status endpoint.

use super::client::OpenAiClient;
use crate::error::ProviderFailure;
use crate::video::extract::{fetch_media, unrecognized_shape, ResponseExtractor};
use crate::video::poll::{JobHandle, PollOutcome, Poller};
use crate::video::strategy::{AttemptContext, GenerationStrategy, StrategyError};
use crate::video::types::StrategyKind;
use async_trait::async_trait;
use serde_json::Value;
use std::sync::Arc;

/// `POST /videos` as multipart/form-data.
pub struct MultipartStrategy {
    client: Arc<OpenAiClient>,
}

impl MultipartStrategy {
    /// Creates the strategy over a shared client.
    pub fn new(client: Arc<OpenAiClient>) -> Self {
        Self { client }
    }

    fn form(ctx: &AttemptContext<'_>) -> Result<reqwest::multipart::Form, ProviderFailure> {
        let mut form = reqwest::multipart::Form::new()
            .text("model", ctx.model.to_string())
            .text("prompt", ctx.prompt.to_string())
            .text("size", ctx.params.size.as_str())
            .text("seconds", ctx.params.duration.as_str());

        if let Some(image) = ctx.image {
            let part = reqwest::multipart::Part::bytes(image.data.clone())
                .file_name(image.file_name())
                .mime_str(&image.mime_type)
                .map_err(|e| ProviderFailure::new(format!("invalid image MIME type: {e}")))?;
            form = form.part("input_reference", part);
        }
        Ok(form)
    }
}

/// What the submission reply points at, checked in this order.
#[derive(Debug, PartialEq, Eq)]
enum Submission<'a> {
    Ready(&'a str),
    Queued { job_id: &'a str, status_url: &'a str },
    Unknown,
}

impl<'a> Submission<'a> {
    fn from_reply(data: &'a Value) -> Self {
        let field = |key| str_field(data, key);

        if let Some(url) = field("video_url") {
            return Self::Ready(url);
        }
        if let Some(status_url) = field("status_url").or_else(|| field("poll_url")) {
            return Self::Queued {
                job_id: field("id").unwrap_or("unknown"),
                status_url,
            };
        }
        match field("url") {
            Some(url) => Self::Ready(url),
            None => Self::Unknown,
        }
    }
}

fn str_field<'a>(data: &'a Value, key: &str) -> Option<&'a str> {
    data.get(key).and_then(Value::as_str).filter(|s| !s.is_empty())
}

#[async_trait]
impl GenerationStrategy for MultipartStrategy {
    fn kind(&self) -> StrategyKind {
        StrategyKind::LegacyMultipart
    }

    async fn attempt(&self, ctx: &AttemptContext<'_>) -> Result<Vec<u8>, StrategyError> {
        let config = self.client.config();
        let request = self
            .client
            .post("videos", ctx.clamp(config.create_timeout))
            .multipart(Self::form(ctx).map_err(StrategyError::Rejected)?);
        let data = self
            .client
            .send_json(request)
            .await
            .map_err(StrategyError::Rejected)?;

        match Submission::from_reply(&data) {
            Submission::Ready(url) => {
                let timeout = ctx.clamp(config.media_timeout);
                Ok(fetch_media(self.client.as_ref(), url, timeout).await?)
            }
            Submission::Queued { job_id, status_url } => {
                tracing::debug!(job_id = %job_id, status_url = %status_url, "multipart job queued");
                let handle = JobHandle::by_url(job_id, status_url);
                let outcome = Poller::new(ctx.remaining(), config.poll_interval)
                    .poll(self.client.as_ref(), &handle, ctx.cancel)
                    .await;
                match outcome {
                    PollOutcome::Completed(media) => {
                        let extractor = ResponseExtractor::new(
                            self.client.as_ref(),
                            ctx.clamp(config.media_timeout),
                        );
                        Ok(extractor.resolve(media).await?)
                    }
                    PollOutcome::Failed(failure) => Err(failure.into()),
                    PollOutcome::TimedOut => Err(StrategyError::TimedOut),
                    PollOutcome::Cancelled => Err(StrategyError::Cancelled),
                }
            }
            Submission::Unknown => Err(unrecognized_shape(&data).into()),
        }
    }
}
