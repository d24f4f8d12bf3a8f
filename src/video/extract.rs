//! Pulling video bytes out of the differently shaped results each dialect returns.

use crate::error::ProviderFailure;
use async_trait::async_trait;
use base64::Engine;
use futures::stream::BoxStream;
use futures::StreamExt;
use serde_json::Value;
use std::time::Duration;

const URL_KEYS: [&str; 2] = ["url", "video_url"];
const INLINE_KEYS: [&str; 3] = ["b64_json", "b64", "data"];

/// Body returned by a download-content call.
pub enum ContentBody {
    /// Fully buffered bytes.
    Bytes(Vec<u8>),
    /// Chunked body.
    Stream(BoxStream<'static, Result<Vec<u8>, ProviderFailure>>),
    /// Unread HTTP response.
    Response(reqwest::Response),
}

impl std::fmt::Debug for ContentBody {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Bytes(b) => write!(f, "ContentBody::Bytes({} bytes)", b.len()),
            Self::Stream(_) => write!(f, "ContentBody::Stream"),
            Self::Response(r) => write!(f, "ContentBody::Response({})", r.status()),
        }
    }
}

impl ContentBody {
    /// Buffers the body into raw bytes.
    pub async fn into_bytes(self) -> Result<Vec<u8>, ProviderFailure> {
        match self {
            Self::Bytes(bytes) => Ok(bytes),
            Self::Stream(mut stream) => {
                let mut buf = Vec::new();
                while let Some(chunk) = stream.next().await {
                    buf.extend_from_slice(&chunk?);
                }
                Ok(buf)
            }
            Self::Response(response) => {
                let status = response.status();
                if !status.is_success() {
                    let text = response.text().await.unwrap_or_default();
                    return Err(ProviderFailure::http(
                        status.as_u16(),
                        format!("content download failed: {text}"),
                    ));
                }
                Ok(response.bytes().await?.to_vec())
            }
        }
    }
}

/// Downloads generated content by job/media id.
#[async_trait]
pub trait ContentDownloader: Send + Sync {
    /// Fetches the content of a finished job.
    async fn download_content(&self, id: &str) -> Result<ContentBody, ProviderFailure>;
}

/// A buffered HTTP response.
#[derive(Debug, Clone)]
pub struct HttpResponse {
    /// HTTP status code.
    pub status: u16,
    /// Response body.
    pub body: Vec<u8>,
}

impl HttpResponse {
    /// True for 2xx statuses.
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    /// Body as lossy UTF-8.
    pub fn text(&self) -> String {
        String::from_utf8_lossy(&self.body).into_owned()
    }

    /// Body parsed as JSON.
    pub fn json(&self) -> Result<Value, ProviderFailure> {
        Ok(serde_json::from_slice(&self.body)?)
    }
}

/// Plain GET with a bounded timeout, used for media URLs.
#[async_trait]
pub trait MediaFetcher: Send + Sync {
    /// Performs the GET. Transport errors are `Err`; any HTTP status is `Ok`.
    async fn get(&self, url: &str, timeout: Duration) -> Result<HttpResponse, ProviderFailure>;
}

/// Where the video bytes can be found, in probe priority order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MediaSource {
    /// Download by id through the provider's content endpoint.
    Download {
        /// Job or media id.
        id: String,
    },
    /// Fetch from a direct URL.
    Url(String),
    /// Base64 payload carried in the response itself.
    Inline(String),
}

impl MediaSource {
    /// Probes a result payload. The `id` form only counts when a downloader is available.
    pub fn probe(payload: &Value, can_download: bool) -> Option<Self> {
        if can_download {
            if let Some(id) = string_field(payload, &["id"]) {
                return Some(Self::Download { id: id.to_string() });
            }
        }

        let nested = payload.get("video");
        let scopes = std::iter::once(payload).chain(nested);

        for scope in scopes.clone() {
            if let Some(url) = string_field(scope, &URL_KEYS) {
                return Some(Self::Url(url.to_string()));
            }
        }
        for scope in scopes {
            if let Some(b64) = string_field(scope, &INLINE_KEYS) {
                return Some(Self::Inline(b64.to_string()));
            }
        }
        None
    }
}

fn string_field<'a>(value: &'a Value, keys: &[&str]) -> Option<&'a str> {
    keys.iter()
        .filter_map(|k| value.get(*k).and_then(Value::as_str))
        .find(|s| !s.is_empty())
}

/// Resolves media sources into bytes.
pub struct ResponseExtractor<'a> {
    fetcher: &'a dyn MediaFetcher,
    downloader: Option<&'a dyn ContentDownloader>,
    fetch_timeout: Duration,
}

impl<'a> ResponseExtractor<'a> {
    /// Creates an extractor without a download-content capability.
    pub fn new(fetcher: &'a dyn MediaFetcher, fetch_timeout: Duration) -> Self {
        Self {
            fetcher,
            downloader: None,
            fetch_timeout,
        }
    }

    /// Enables the id-based download path.
    pub fn with_downloader(mut self, downloader: &'a dyn ContentDownloader) -> Self {
        self.downloader = Some(downloader);
        self
    }

    /// Probes `payload` and resolves the first matching source.
    pub async fn extract(&self, payload: &Value) -> Result<Vec<u8>, ProviderFailure> {
        match MediaSource::probe(payload, self.downloader.is_some()) {
            Some(source) => self.resolve(source).await,
            None => Err(unrecognized_shape(payload)),
        }
    }

    /// Turns a known source into bytes.
    pub async fn resolve(&self, source: MediaSource) -> Result<Vec<u8>, ProviderFailure> {
        match source {
            MediaSource::Download { id } => {
                let downloader = self.downloader.ok_or_else(|| {
                    ProviderFailure::new(format!("no content downloader for media {id}"))
                })?;
                tracing::debug!(media_id = %id, "downloading generated content");
                downloader.download_content(&id).await?.into_bytes().await
            }
            MediaSource::Url(url) => fetch_media(self.fetcher, &url, self.fetch_timeout).await,
            MediaSource::Inline(b64) => decode_inline(&b64),
        }
    }
}

/// GETs a media URL. A non-2xx reply is reported in the message only: a 403 from a
/// storage host means an expired link, not an account block.
pub async fn fetch_media(
    fetcher: &dyn MediaFetcher,
    url: &str,
    timeout: Duration,
) -> Result<Vec<u8>, ProviderFailure> {
    tracing::debug!(url = %url, timeout_secs = timeout.as_secs(), "fetching media URL");
    let response = fetcher.get(url, timeout).await?;
    if !response.is_success() {
        return Err(ProviderFailure::new(format!(
            "media fetch failed with HTTP {}: {}",
            response.status,
            response.text()
        )));
    }
    Ok(response.body)
}

fn decode_inline(b64: &str) -> Result<Vec<u8>, ProviderFailure> {
    let payload = match b64.strip_prefix("data:") {
        Some(rest) => rest.split_once(',').map(|(_, p)| p).unwrap_or(rest),
        None => b64,
    };
    Ok(base64::engine::general_purpose::STANDARD.decode(payload.trim())?)
}

pub(crate) fn unrecognized_shape(payload: &Value) -> ProviderFailure {
    let keys = payload
        .as_object()
        .map(|o| o.keys().cloned().collect::<Vec<_>>().join(", "))
        .unwrap_or_else(|| "none".into());
    ProviderFailure::new(format!("unrecognized response shape (keys: {keys})"))
}
