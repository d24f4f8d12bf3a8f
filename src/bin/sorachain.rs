//! CLI for sorachain - Sora video generation.

use clap::{Args, Parser, Subcommand};
use sorachain::video::normalize::NormalizedParameters;
use sorachain::{OpenAiVideoBuilder, ReferenceImage, SoraChainError, VideoGenerationRequest};
use std::path::PathBuf;
use std::process::ExitCode;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "sorachain")]
#[command(about = "Generate videos with Sora, falling back across OpenAI API dialects")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Output as JSON
    #[arg(long, global = true)]
    json: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Generate a video from a text prompt
    Generate(GenerateArgs),

    /// Show how a duration/resolution would be normalized, without calling the API
    Normalize(NormalizeArgs),

    /// List the API dialects in the order they are tried
    Strategies,
}

#[derive(Args)]
struct GenerateArgs {
    /// Text prompt for the video
    #[arg(long)]
    prompt: String,

    /// Output mp4 path
    #[arg(short, long)]
    out: PathBuf,

    /// Duration in seconds (snapped to 4, 8 or 12)
    #[arg(short, long, default_value_t = 8)]
    duration: u32,

    /// Resolution like 1280x720 or 1080x1920 (only orientation is kept)
    #[arg(short, long, default_value = "1280x720")]
    resolution: String,

    /// Model id
    #[arg(short, long, default_value = sorachain::video::DEFAULT_MODEL)]
    model: String,

    /// Reference image to seed generation
    #[arg(short, long)]
    image: Option<PathBuf>,

    /// Give up after this many seconds
    #[arg(long, default_value_t = 600)]
    timeout: u64,

    /// Seconds between job status checks
    #[arg(long, default_value_t = 2)]
    poll_interval: u64,

    /// API root (defaults to OPENAI_BASE_URL or the public endpoint)
    #[arg(long)]
    base_url: Option<String>,
}

#[derive(Args)]
struct NormalizeArgs {
    /// Requested duration in seconds
    #[arg(short, long)]
    duration: Option<u32>,

    /// Requested resolution as WxH
    #[arg(short, long)]
    resolution: Option<String>,
}

#[tokio::main]
async fn main() -> anyhow::Result<ExitCode> {
    dotenvy::dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("sorachain=info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Generate(args) => generate_video(args, cli.json).await,
        Commands::Normalize(args) => {
            normalize(args, cli.json)?;
            Ok(ExitCode::SUCCESS)
        }
        Commands::Strategies => {
            list_strategies(cli.json)?;
            Ok(ExitCode::SUCCESS)
        }
    }
}

async fn generate_video(args: GenerateArgs, json_output: bool) -> anyhow::Result<ExitCode> {
    let mut request = VideoGenerationRequest::new(&args.prompt)
        .with_duration(args.duration)
        .with_resolution(&args.resolution)
        .with_model(&args.model);
    if let Some(ref path) = args.image {
        request = request.with_reference_image(ReferenceImage::from_path(path)?);
    }

    let mut builder =
        OpenAiVideoBuilder::new().poll_interval(Duration::from_secs(args.poll_interval.max(1)));
    if let Some(url) = args.base_url {
        builder = builder.base_url(url);
    }
    let chain = builder.build()?;

    let cancel = CancellationToken::new();
    let on_ctrl_c = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            eprintln!("Cancelling...");
            on_ctrl_c.cancel();
        }
    });

    let result = chain
        .generate_with_cancel(&request, Duration::from_secs(args.timeout), &cancel)
        .await;

    let video = match result {
        Ok(video) => video,
        Err(err) => return report_failure(&err, json_output),
    };

    video.save(&args.out)?;

    if json_output {
        let result = serde_json::json!({
            "success": true,
            "output": args.out.display().to_string(),
            "size_bytes": video.size(),
            "strategy": video.metadata.strategy,
            "model": video.metadata.model,
            "duration_ms": video.metadata.duration_ms,
            "video_duration_secs": video.metadata.video_duration_secs,
            "resolution": video.metadata.resolution,
            "reference_image_used": video.metadata.reference_image_used,
        });
        println!("{}", serde_json::to_string_pretty(&result)?);
    } else {
        println!(
            "Saved video to {} ({} bytes)",
            args.out.display(),
            video.size()
        );
        if let Some(strategy) = video.metadata.strategy {
            println!("Strategy: {}", strategy);
        }
        if let Some(duration) = video.metadata.duration_ms {
            println!("Generation time: {}ms", duration);
        }
        if args.image.is_some() && !video.metadata.reference_image_used {
            println!("Note: the provider refused the reference image; generated from the prompt alone");
        }
    }

    Ok(ExitCode::SUCCESS)
}

fn report_failure(err: &SoraChainError, json_output: bool) -> anyhow::Result<ExitCode> {
    if json_output {
        let attempts: Vec<_> = err
            .report()
            .map(|r| {
                r.attempts
                    .iter()
                    .map(|a| serde_json::json!({"strategy": a.strategy, "diagnostic": a.diagnostic}))
                    .collect()
            })
            .unwrap_or_default();
        let result = serde_json::json!({
            "success": false,
            "error": err.to_string(),
            "abort": err.report().map(|r| r.abort.to_string()),
            "retryable": err.is_retryable(),
            "attempts": attempts,
        });
        println!("{}", serde_json::to_string_pretty(&result)?);
    } else {
        eprintln!("Video generation failed: {err}");
    }

    // 2 for caller-side problems, 3 for provider-side failures.
    Ok(match err {
        SoraChainError::InvalidRequest(_) | SoraChainError::Auth(_) => ExitCode::from(2),
        _ => ExitCode::from(3),
    })
}

fn normalize(args: NormalizeArgs, json_output: bool) -> anyhow::Result<()> {
    let mut request = VideoGenerationRequest::new("-");
    request.duration_secs = args.duration;
    request.resolution = args.resolution;
    let params = NormalizedParameters::from_request(&request);

    if json_output {
        let result = serde_json::json!({
            "seconds": params.duration.as_str(),
            "size": params.size.as_str(),
        });
        println!("{}", serde_json::to_string_pretty(&result)?);
    } else {
        println!("seconds: {}", params.duration);
        println!("size:    {}", params.size);
    }
    Ok(())
}

fn list_strategies(json_output: bool) -> anyhow::Result<()> {
    #[derive(serde::Serialize)]
    struct StrategyInfo {
        name: &'static str,
        endpoint: &'static str,
        completion: &'static str,
    }

    let strategies = vec![
        StrategyInfo {
            name: "managed",
            endpoint: "POST /videos (JSON)",
            completion: "poll GET /videos/{id}, download /videos/{id}/content",
        },
        StrategyInfo {
            name: "responses",
            endpoint: "POST /responses",
            completion: "inline output_video part (URL or base64)",
        },
        StrategyInfo {
            name: "legacy_multipart",
            endpoint: "POST /videos (multipart/form-data)",
            completion: "video_url, or poll status_url/poll_url",
        },
    ];

    if json_output {
        println!("{}", serde_json::to_string_pretty(&strategies)?);
    } else {
        println!("Strategies, in the order they are tried:\n");
        for (i, s) in strategies.iter().enumerate() {
            println!("  {}. {} - {}", i + 1, s.name, s.endpoint);
            println!("     {}", s.completion);
        }
        println!("\nAPI key: OPENAI_API_KEY");
    }

    Ok(())
}
