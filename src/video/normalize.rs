//! Snapping requested duration and resolution onto the values Sora accepts.

use crate::video::types::VideoGenerationRequest;
use serde::{Deserialize, Serialize};

/// Supported clip lengths.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DurationBucket {
    /// 4 seconds.
    Short,
    /// 8 seconds.
    Medium,
    /// 12 seconds.
    Long,
}

impl DurationBucket {
    /// All buckets in preference order; ties resolve to the earlier entry.
    pub const ALL: [DurationBucket; 3] = [Self::Short, Self::Medium, Self::Long];

    /// Length in seconds.
    pub fn seconds(&self) -> u32 {
        match self {
            Self::Short => 4,
            Self::Medium => 8,
            Self::Long => 12,
        }
    }

    /// The provider's string form ("4", "8" or "12").
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Short => "4",
            Self::Medium => "8",
            Self::Long => "12",
        }
    }
}

impl std::fmt::Display for DurationBucket {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Output sizes the provider accepts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum VideoSize {
    /// 1280x720.
    Landscape720,
    /// 720x1280.
    Portrait720,
    /// 1792x1024. Accepted by the provider; never chosen by [`map_resolution`].
    LandscapeWide,
    /// 1024x1792. Accepted by the provider; never chosen by [`map_resolution`].
    PortraitTall,
}

impl VideoSize {
    /// The provider's `WxH` form.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Landscape720 => "1280x720",
            Self::Portrait720 => "720x1280",
            Self::LandscapeWide => "1792x1024",
            Self::PortraitTall => "1024x1792",
        }
    }

    /// Width and height in pixels.
    pub fn dimensions(&self) -> (u32, u32) {
        match self {
            Self::Landscape720 => (1280, 720),
            Self::Portrait720 => (720, 1280),
            Self::LandscapeWide => (1792, 1024),
            Self::PortraitTall => (1024, 1792),
        }
    }

    fn is_portrait(&self) -> bool {
        let (w, h) = self.dimensions();
        h > w
    }
}

impl std::fmt::Display for VideoSize {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Duration and size after snapping; always members of the provider's allowed sets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct NormalizedParameters {
    /// Clip length.
    pub duration: DurationBucket,
    /// Output size.
    pub size: VideoSize,
}

impl NormalizedParameters {
    /// Normalizes the duration and resolution of a request.
    pub fn from_request(request: &VideoGenerationRequest) -> Self {
        Self {
            duration: bucket_duration(request.duration_secs),
            size: map_resolution(request.resolution.as_deref()),
        }
    }
}

/// Picks the supported duration closest to `requested`. Absent or zero means 4 seconds.
pub fn bucket_duration(requested: Option<u32>) -> DurationBucket {
    let target = match requested {
        Some(secs) if secs > 0 => secs,
        _ => return DurationBucket::Short,
    };

    // min_by_key keeps the first of equal keys, so 6 resolves to 4 and 10 to 8.
    DurationBucket::ALL
        .into_iter()
        .min_by_key(|bucket| bucket.seconds().abs_diff(target))
        .unwrap_or(DurationBucket::Short)
}

/// Maps a `WxH` string to a supported size of the same orientation.
///
/// Anything that does not parse as two positive integers falls back to 1280x720. Only
/// orientation is honored, so the wide sizes are never returned.
pub fn map_resolution(requested: Option<&str>) -> VideoSize {
    let Some((width, height)) = requested.and_then(parse_dimensions) else {
        return VideoSize::Landscape720;
    };

    let candidates: [VideoSize; 2] = if height > width {
        [VideoSize::Portrait720, VideoSize::Landscape720]
    } else {
        [VideoSize::Landscape720, VideoSize::Portrait720]
    };
    let portrait = height > width;

    candidates
        .into_iter()
        .find(|size| size.is_portrait() == portrait)
        .unwrap_or(VideoSize::Landscape720)
}

/// Parses `WxH` (case-insensitive separator) into positive dimensions.
pub(crate) fn parse_dimensions(text: &str) -> Option<(u32, u32)> {
    let lower = text.trim().to_ascii_lowercase();
    let (w, h) = lower.split_once('x')?;
    let width: u32 = w.trim().parse().ok()?;
    let height: u32 = h.trim().parse().ok()?;
    (width > 0 && height > 0).then_some((width, height))
}
