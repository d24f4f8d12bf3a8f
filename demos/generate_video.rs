//! Basic video generation example.
//!
//! Run with: `cargo run --example generate_video`
//!
//! Requires `OPENAI_API_KEY` environment variable.

use sorachain::{OpenAiVideoBuilder, SoraChainError, VideoGenerationRequest};
use std::time::Duration;

#[tokio::main]
async fn main() -> sorachain::Result<()> {
    let chain = OpenAiVideoBuilder::new().build()?;

    let request = VideoGenerationRequest::new("Ocean waves crashing on a rocky shore at sunset")
        .with_duration(8)
        .with_resolution("1920x1080");

    println!("Generating video (this may take a few minutes)...");
    let video = match chain.generate(&request, Duration::from_secs(600)).await {
        Ok(video) => video,
        Err(SoraChainError::Fatal(report)) => {
            eprintln!("{}", report.guidance);
            return Err(SoraChainError::Fatal(report));
        }
        Err(e) => return Err(e),
    };

    video.save("output.mp4")?;
    println!(
        "Generated video: {} bytes via {:?}, duration: {:?}s",
        video.size(),
        video.metadata.strategy,
        video.metadata.video_duration_secs
    );

    Ok(())
}
