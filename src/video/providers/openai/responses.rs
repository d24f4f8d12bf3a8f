//! Responses dialect: one conversational call asking for an `output_video` part.

use super::client::OpenAiClient;
use crate::video::extract::{unrecognized_shape, ResponseExtractor};
use crate::video::strategy::{AttemptContext, GenerationStrategy, StrategyError};
use crate::video::types::StrategyKind;
use async_trait::async_trait;
use serde::Serialize;
use serde_json::Value;
use std::sync::Arc;

/// `POST /responses` with the media expected inline in the output.
pub struct ResponsesStrategy {
    client: Arc<OpenAiClient>,
}

impl ResponsesStrategy {
    /// Creates the strategy over a shared client.
    pub fn new(client: Arc<OpenAiClient>) -> Self {
        Self { client }
    }
}

#[async_trait]
impl GenerationStrategy for ResponsesStrategy {
    fn kind(&self) -> StrategyKind {
        StrategyKind::Responses
    }

    async fn attempt(&self, ctx: &AttemptContext<'_>) -> Result<Vec<u8>, StrategyError> {
        let body = ResponsesRequest::from_context(ctx);
        let timeout = ctx.clamp(self.client.config().responses_timeout);
        let data = self
            .client
            .send_json(self.client.post("responses", timeout).json(&body))
            .await
            .map_err(StrategyError::Rejected)?;

        let video = find_video_part(&data).ok_or_else(|| unrecognized_shape(&data))?;
        tracing::debug!("responses API returned an output_video part");

        let extractor = ResponseExtractor::new(
            self.client.as_ref(),
            ctx.clamp(self.client.config().media_timeout),
        );
        Ok(extractor.extract(video).await?)
    }
}

/// Finds the first `output_video` content part across all output items.
fn find_video_part(data: &Value) -> Option<&Value> {
    data.get("output")?
        .as_array()?
        .iter()
        .filter_map(|item| item.get("content").and_then(Value::as_array))
        .flatten()
        .find(|part| part.get("type").and_then(Value::as_str) == Some("output_video"))
        .map(|part| part.get("video").unwrap_or(part))
}

#[derive(Debug, Serialize)]
struct ResponsesRequest<'a> {
    model: &'a str,
    input: [InputMessage<'a>; 1],
}

#[derive(Debug, Serialize)]
struct InputMessage<'a> {
    role: &'static str,
    content: Vec<ContentPart<'a>>,
}

#[derive(Debug, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum ContentPart<'a> {
    InputText { text: &'a str },
    InputImage { image_url: String },
    OutputVideo { video: VideoSpec },
}

#[derive(Debug, Serialize)]
struct VideoSpec {
    width: u32,
    height: u32,
    duration: u32,
    format: &'static str,
}

impl<'a> ResponsesRequest<'a> {
    fn from_context(ctx: &AttemptContext<'a>) -> Self {
        let (width, height) = ctx.params.size.dimensions();
        let mut content = vec![ContentPart::InputText { text: ctx.prompt }];
        if let Some(image) = ctx.image {
            content.push(ContentPart::InputImage {
                image_url: image.to_data_url(),
            });
        }
        content.push(ContentPart::OutputVideo {
            video: VideoSpec {
                width,
                height,
                duration: ctx.params.duration.seconds(),
                format: "mp4",
            },
        });

        Self {
            model: ctx.model,
            input: [InputMessage {
                role: "user",
                content,
            }],
        }
    }
}
