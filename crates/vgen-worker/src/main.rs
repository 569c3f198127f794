//! vgen CLI: generate videos and download watermarked copies.
//!
//! Usage:
//!   vgen generate --prompt <TEXT> [OPTIONS]   Enhance, submit and wait for a video
//!   vgen download --url <LOCATOR> [OPTIONS]   Fetch and watermark a finished video

use std::path::PathBuf;

use anyhow::{anyhow, Context, Result};
use clap::{Parser, Subcommand};
use tracing::info;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use vgen_media::{CompositeOptions, SharedEncoder};
use vgen_models::{AspectRatio, GenerationRequest, ReferenceImage, ResolutionTier};
use vgen_worker::{DownloadService, GenerationPipeline, LoggingRecordSink, WorkerConfig};

#[derive(Parser)]
#[command(
    name = "vgen",
    about = "Generate videos from prompts and download watermarked copies",
    version
)]
struct Cli {
    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Enhance a prompt, submit it and wait for the result
    Generate {
        /// Raw prompt text
        #[arg(short, long)]
        prompt: String,

        /// Theme instruction
        #[arg(long)]
        theme: Option<String>,

        /// Music mood instruction
        #[arg(long)]
        music: Option<String>,

        /// Camera style instruction
        #[arg(long)]
        style: Option<String>,

        /// Aspect ratio: 16:9 or 9:16
        #[arg(long, default_value = "16:9")]
        aspect: AspectRatio,

        /// Resolution tier: standard or high
        #[arg(long, default_value = "standard")]
        tier: ResolutionTier,

        /// Reference image for image-guided generation
        #[arg(long)]
        image: Option<PathBuf>,

        /// Output language hint
        #[arg(long)]
        language: Option<String>,

        /// Target duration (seconds)
        #[arg(long)]
        duration: Option<u32>,

        /// User the record is attributed to
        #[arg(long, default_value = "local")]
        user: String,
    },

    /// Download a finished video with the watermark applied
    Download {
        /// Video locator (URL or local path)
        #[arg(short, long)]
        url: String,

        /// Aspect ratio hint when the video cannot be probed
        #[arg(long, default_value = "16:9")]
        aspect: AspectRatio,

        /// Resolution tier hint when the video cannot be probed
        #[arg(long, default_value = "standard")]
        tier: ResolutionTier,

        /// Output file name
        #[arg(short, long)]
        name: Option<String>,

        /// Output directory (defaults to DOWNLOAD_DIR)
        #[arg(short, long)]
        out_dir: Option<PathBuf>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    rustls::crypto::ring::default_provider()
        .install_default()
        .map_err(|_| anyhow!("failed to install rustls crypto provider"))?;

    dotenvy::dotenv().ok();

    let cli = Cli::parse();
    init_tracing(cli.verbose)?;

    let mut config = WorkerConfig::from_env();

    match cli.command {
        Commands::Generate {
            prompt,
            theme,
            music,
            style,
            aspect,
            tier,
            image,
            language,
            duration,
            user,
        } => {
            let mut request = GenerationRequest::new(prompt)
                .with_aspect_ratio(aspect)
                .with_tier(tier);
            request.theme = theme;
            request.music = music;
            request.style = style;
            request.language = language;
            request.duration_secs = duration;
            if let Some(path) = image {
                request = request.with_reference_image(load_reference_image(&path)?);
            }

            let pipeline = GenerationPipeline::from_config(&config)?;
            let outcome = pipeline
                .generate_for_user(&user, &request, &LoggingRecordSink)
                .await?;

            info!(
                job_id = %outcome.handle.id(),
                source = outcome.enhancement.source.as_str(),
                "Generation finished"
            );
            for locator in outcome.result.locators() {
                println!("{}", locator);
            }
        }

        Commands::Download {
            url,
            aspect,
            tier,
            name,
            out_dir,
        } => {
            if let Some(dir) = out_dir {
                config.download_dir = dir;
            }

            let service = DownloadService::from_config(&config, SharedEncoder::new());
            let mut options = CompositeOptions::new(tier, aspect);
            if let Some(name) = name {
                options = options.with_file_name(name);
            }

            let outcome = service.download(&url, &options).await?;
            println!("{}", outcome.path.display());
            println!("watermark_applied={}", outcome.watermark_applied);
        }
    }

    Ok(())
}

/// Colored output for dev, JSON when `LOG_FORMAT=json`.
fn init_tracing(verbose: bool) -> Result<()> {
    let use_json = std::env::var("LOG_FORMAT")
        .map(|v| v.to_lowercase() == "json")
        .unwrap_or(false);

    let directive = if verbose { "vgen=debug" } else { "vgen=info" };
    let env_filter = EnvFilter::from_default_env().add_directive(
        directive
            .parse()
            .context("invalid log directive")?,
    );

    if use_json {
        tracing_subscriber::registry()
            .with(fmt::layer().json().with_writer(std::io::stderr))
            .with(env_filter)
            .init();
    } else {
        tracing_subscriber::registry()
            .with(
                fmt::layer()
                    .with_writer(std::io::stderr)
                    .with_ansi(true)
                    .with_target(true)
                    .with_thread_ids(false)
                    .with_file(false)
                    .with_line_number(false),
            )
            .with(env_filter)
            .init();
    }
    Ok(())
}

fn load_reference_image(path: &PathBuf) -> Result<ReferenceImage> {
    let data = std::fs::read(path)
        .with_context(|| format!("failed to read reference image {}", path.display()))?;
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .unwrap_or_default();
    Ok(ReferenceImage::new(data, ReferenceImage::mime_for_extension(ext)))
}
