//! Core types for video generation.

use crate::error::{Result, SoraChainError};
use base64::Engine;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Model used when a request does not name one.
pub const DEFAULT_MODEL: &str = "sora-2";

/// The provider API dialects, in the order the chain tries them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StrategyKind {
    /// Client-style create, poll, then download content by id.
    Managed,
    /// Conversational responses endpoint with an inline video part.
    Responses,
    /// Multipart job submission with a URL or status endpoint in the reply.
    LegacyMultipart,
}

impl std::fmt::Display for StrategyKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Managed => write!(f, "managed"),
            Self::Responses => write!(f, "responses"),
            Self::LegacyMultipart => write!(f, "legacy_multipart"),
        }
    }
}

/// An image used to seed generation.
#[derive(Clone, PartialEq, Eq)]
pub struct ReferenceImage {
    /// Raw image bytes.
    pub data: Vec<u8>,
    /// MIME type (e.g., "image/jpeg").
    pub mime_type: String,
}

impl std::fmt::Debug for ReferenceImage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ReferenceImage")
            .field("bytes", &self.data.len())
            .field("mime_type", &self.mime_type)
            .finish()
    }
}

impl ReferenceImage {
    /// Creates a reference image from raw bytes.
    pub fn new(data: Vec<u8>, mime_type: impl Into<String>) -> Self {
        Self {
            data,
            mime_type: mime_type.into(),
        }
    }

    /// Decodes a `data:<mime>;base64,<payload>` URL, as sent by browser uploads.
    pub fn from_data_url(url: &str) -> Result<Self> {
        let (header, payload) = url
            .split_once(',')
            .ok_or_else(|| SoraChainError::Decode("data URL has no payload".into()))?;
        let mime_type = header
            .strip_prefix("data:")
            .and_then(|h| h.strip_suffix(";base64"))
            .filter(|m| !m.is_empty())
            .unwrap_or("image/jpeg");
        let data = base64::engine::general_purpose::STANDARD
            .decode(payload.trim())
            .map_err(|e| SoraChainError::Decode(e.to_string()))?;
        Ok(Self::new(data, mime_type))
    }

    /// Reads an image file, inferring the MIME type from its extension.
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let data = std::fs::read(path)?;
        let mime_type = match path
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| e.to_ascii_lowercase())
            .as_deref()
        {
            Some("png") => "image/png",
            Some("webp") => "image/webp",
            _ => "image/jpeg",
        };
        Ok(Self::new(data, mime_type))
    }

    /// File name to use when uploading the image as a form part.
    pub(crate) fn file_name(&self) -> &'static str {
        match self.mime_type.as_str() {
            "image/png" => "reference.png",
            "image/webp" => "reference.webp",
            _ => "reference.jpg",
        }
    }

    /// Returns the image as a data URL.
    pub fn to_data_url(&self) -> String {
        format!(
            "data:{};base64,{}",
            self.mime_type,
            base64::engine::general_purpose::STANDARD.encode(&self.data)
        )
    }
}

/// A request to generate a video.
#[derive(Debug, Clone)]
pub struct VideoGenerationRequest {
    /// The text prompt describing the desired video.
    pub prompt: String,
    /// Desired video duration in seconds; snapped to 4, 8 or 12.
    pub duration_secs: Option<u32>,
    /// Desired resolution as `WxH`; only its orientation is honored.
    pub resolution: Option<String>,
    /// Model identifier.
    pub model: String,
    /// Optional image to seed generation.
    pub reference_image: Option<ReferenceImage>,
}

impl VideoGenerationRequest {
    /// Creates a new request with the given prompt.
    pub fn new(prompt: impl Into<String>) -> Self {
        Self {
            prompt: prompt.into(),
            duration_secs: None,
            resolution: None,
            model: DEFAULT_MODEL.to_string(),
            reference_image: None,
        }
    }

    /// Sets the desired video duration in seconds.
    pub fn with_duration(mut self, secs: u32) -> Self {
        self.duration_secs = Some(secs);
        self
    }

    /// Sets the resolution (e.g., "1920x1080").
    pub fn with_resolution(mut self, resolution: impl Into<String>) -> Self {
        self.resolution = Some(resolution.into());
        self
    }

    /// Sets the model identifier.
    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    /// Sets a reference image for image-to-video generation.
    pub fn with_reference_image(mut self, image: ReferenceImage) -> Self {
        self.reference_image = Some(image);
        self
    }

    pub(crate) fn validate(&self) -> Result<()> {
        if self.prompt.trim().is_empty() {
            return Err(SoraChainError::InvalidRequest("prompt is required".into()));
        }
        if self.model.trim().is_empty() {
            return Err(SoraChainError::InvalidRequest("model must not be empty".into()));
        }
        Ok(())
    }
}

/// Metadata about the video generation process.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct VideoMetadata {
    /// Model used for generation.
    pub model: Option<String>,
    /// Generation duration in milliseconds.
    pub duration_ms: Option<u64>,
    /// Video duration in seconds, after bucketing.
    pub video_duration_secs: Option<u32>,
    /// Video size sent to the provider.
    pub resolution: Option<String>,
    /// Strategy that produced the video.
    pub strategy: Option<StrategyKind>,
    /// False when a reference image was dropped after the provider refused it.
    #[serde(default)]
    pub reference_image_used: bool,
}

/// A generated video with its data and metadata.
#[derive(Debug, Clone)]
pub struct GeneratedVideo {
    /// Raw video bytes.
    pub data: Vec<u8>,
    /// MIME type (e.g., "video/mp4").
    pub mime_type: String,
    /// Generation metadata.
    pub metadata: VideoMetadata,
}

impl GeneratedVideo {
    /// Creates a new generated video.
    pub fn new(data: Vec<u8>, mime_type: impl Into<String>, metadata: VideoMetadata) -> Self {
        Self {
            data,
            mime_type: mime_type.into(),
            metadata,
        }
    }

    /// Returns the size of the video data in bytes.
    pub fn size(&self) -> usize {
        self.data.len()
    }

    /// Consumes the video, returning the raw bytes.
    pub fn into_bytes(self) -> Vec<u8> {
        self.data
    }

    /// Saves the video to the specified path.
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(path, &self.data)?;
        Ok(())
    }

    /// Encodes the video data as base64.
    pub fn to_base64(&self) -> String {
        base64::engine::general_purpose::STANDARD.encode(&self.data)
    }

    /// Returns the video as a data URL.
    pub fn to_data_url(&self) -> String {
        format!("data:{};base64,{}", self.mime_type, self.to_base64())
    }
}
