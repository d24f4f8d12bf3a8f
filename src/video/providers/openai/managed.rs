//! Managed dialect: create a video job, poll it by id, download its content.

use super::client::OpenAiClient;
use crate::error::ProviderFailure;
use crate::video::extract::{unrecognized_shape, MediaSource, ResponseExtractor};
use crate::video::normalize::NormalizedParameters;
use crate::video::poll::{JobHandle, JobState, PollOutcome, Poller};
use crate::video::strategy::{AttemptContext, GenerationStrategy, StrategyError};
use crate::video::types::StrategyKind;
use async_trait::async_trait;
use serde::Serialize;
use serde_json::Value;
use std::sync::Arc;

/// `POST /videos`, then `GET /videos/{id}` until done, then `GET /videos/{id}/content`.
pub struct ManagedStrategy {
    client: Arc<OpenAiClient>,
}

impl ManagedStrategy {
    /// Creates the strategy over a shared client.
    pub fn new(client: Arc<OpenAiClient>) -> Self {
        Self { client }
    }

    async fn create(&self, ctx: &AttemptContext<'_>) -> Result<Value, ProviderFailure> {
        let timeout = ctx.clamp(self.client.config().create_timeout);
        let request = self.client.post("videos", timeout);

        // input_reference is only accepted as a file upload.
        let request = match ctx.image {
            Some(image) => {
                let part = reqwest::multipart::Part::bytes(image.data.clone())
                    .file_name(image.file_name())
                    .mime_str(&image.mime_type)
                    .map_err(|e| ProviderFailure::new(format!("invalid image MIME type: {e}")))?;
                let form = reqwest::multipart::Form::new()
                    .text("model", ctx.model.to_string())
                    .text("prompt", ctx.prompt.to_string())
                    .text("seconds", ctx.params.duration.as_str())
                    .text("size", ctx.params.size.as_str())
                    .part("input_reference", part);
                request.multipart(form)
            }
            None => request.json(&CreateVideoRequest::new(ctx.model, ctx.prompt, &ctx.params)),
        };

        self.client.send_json(request).await
    }
}

#[async_trait]
impl GenerationStrategy for ManagedStrategy {
    fn kind(&self) -> StrategyKind {
        StrategyKind::Managed
    }

    async fn attempt(&self, ctx: &AttemptContext<'_>) -> Result<Vec<u8>, StrategyError> {
        let created = self.create(ctx).await.map_err(StrategyError::Rejected)?;
        let id = created
            .get("id")
            .and_then(Value::as_str)
            .ok_or_else(|| unrecognized_shape(&created))?;
        tracing::debug!(video_id = %id, status = ?created.get("status"), "submitted managed video job");

        let media = if JobState::from_payload(&created) == JobState::Succeeded {
            MediaSource::Download { id: id.to_string() }
        } else {
            let poller = Poller::new(ctx.remaining(), self.client.config().poll_interval)
                .download_by_id(true);
            match poller
                .poll(self.client.as_ref(), &JobHandle::by_id(id), ctx.cancel)
                .await
            {
                PollOutcome::Completed(media) => media,
                PollOutcome::Failed(failure) => return Err(failure.into()),
                PollOutcome::TimedOut => return Err(StrategyError::TimedOut),
                PollOutcome::Cancelled => return Err(StrategyError::Cancelled),
            }
        };

        let extractor = ResponseExtractor::new(
            self.client.as_ref(),
            ctx.clamp(self.client.config().media_timeout),
        )
        .with_downloader(self.client.as_ref());
        Ok(extractor.resolve(media).await?)
    }
}

#[derive(Debug, Serialize)]
struct CreateVideoRequest<'a> {
    model: &'a str,
    prompt: &'a str,
    /// "4", "8" or "12".
    seconds: &'static str,
    size: &'static str,
}

impl<'a> CreateVideoRequest<'a> {
    fn new(model: &'a str, prompt: &'a str, params: &NormalizedParameters) -> Self {
        Self {
            model,
            prompt,
            seconds: params.duration.as_str(),
            size: params.size.as_str(),
        }
    }
}
