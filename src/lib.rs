#![warn(missing_docs)]
//! sorachain - Sora video generation that survives API-surface drift.
//!
//! OpenAI exposes video generation through several incompatible dialects. This crate
//! normalizes a request once, then tries each dialect in priority order until one
//! yields video bytes:
//!
//! 1. **managed**: `POST /videos`, poll `GET /videos/{id}`, download `/videos/{id}/content`
//! 2. **responses**: `POST /responses` with an `output_video` content part
//! 3. **legacy multipart**: multipart `POST /videos`, answered by a URL or a status endpoint
//!
//! A 403 or an organization-verification notice stops the chain immediately; any
//! other failure falls through to the next dialect.
//!
//! # Quick Start
//!
//! ```no_run
//! use sorachain::{OpenAiVideoBuilder, VideoGenerationRequest};
//! use std::time::Duration;
//!
//! #[tokio::main]
//! async fn main() -> sorachain::Result<()> {
//!     let chain = OpenAiVideoBuilder::new().build()?;
//!     let request = VideoGenerationRequest::new("A cat playing with a ball")
//!         .with_duration(8)
//!         .with_resolution("1920x1080");
//!     let video = chain.generate(&request, Duration::from_secs(600)).await?;
//!     video.save("cat.mp4")?;
//!     Ok(())
//! }
//! ```
//!
//! # Features
//!
//! - `cli` (default): the `sorachain` command-line tool

mod error;
pub mod video;

// Re-export error types at crate root
pub use error::{AbortKind, AttemptRecord, FailureReport, ProviderFailure, Result, SoraChainError};

pub use video::providers::{generate, OpenAiVideoBuilder};
pub use video::{
    GeneratedVideo, GenerationStrategy, NormalizedParameters, ReferenceImage, StrategyChain,
    StrategyKind, VideoGenerationRequest, VideoMetadata,
};

/// Prelude for convenient imports.
pub mod prelude {
    pub use crate::error::{Result, SoraChainError};
    pub use crate::video::providers::OpenAiVideoBuilder;
    pub use crate::video::{
        GeneratedVideo, ReferenceImage, StrategyChain, VideoGenerationRequest,
    };
}
