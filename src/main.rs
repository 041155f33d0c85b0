//! FrameCast CLI
//!
//! Serves a test pattern or a still image as a live MJPEG stream.

use clap::{Parser, Subcommand, ValueEnum};
use framecast::{
    config::{ServerConfig, DEFAULT_FRAME_INTERVAL_MS, DEFAULT_JPEG_QUALITY, DEFAULT_PORT},
    net,
    source::{run_source, FrameSource, StillImage, TestPattern},
    Framerate, MjpegServer, Resolution,
};
use std::net::IpAddr;
use std::path::PathBuf;
use tokio::sync::watch;

/// Frame source for the CLI
#[derive(Debug, Clone, Copy, ValueEnum, Default)]
enum SourceKind {
    /// Scrolling color bars
    #[default]
    Pattern,
    /// A still image file (requires --image)
    Image,
}

#[derive(Parser)]
#[command(name = "framecast")]
#[command(about = "Live MJPEG over HTTP")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Show version and network information
    Info,

    /// Start the MJPEG server
    Serve {
        /// TOML configuration file
        #[arg(short, long)]
        config: Option<PathBuf>,

        /// Listening port (0 = any free port)
        #[arg(short, long)]
        port: Option<u16>,

        /// Interface to bind
        #[arg(short, long)]
        bind: Option<IpAddr>,

        /// Broadcast rate
        #[arg(short, long)]
        fps: Option<u32>,

        /// JPEG quality (1-100)
        #[arg(short, long)]
        quality: Option<u8>,

        /// Frame source (pattern, image)
        #[arg(short, long, value_enum, default_value = "pattern")]
        source: SourceKind,

        /// Image file for --source image
        #[arg(short, long)]
        image: Option<PathBuf>,

        /// Rate at which the source produces frames
        #[arg(long, default_value = "30")]
        source_fps: u32,

        /// Test pattern resolution (e.g., 1280x720)
        #[arg(short, long)]
        resolution: Option<String>,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("framecast=info".parse()?),
        )
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Info => cmd_info(),
        Commands::Serve {
            config,
            port,
            bind,
            fps,
            quality,
            source,
            image,
            source_fps,
            resolution,
        } => {
            cmd_serve(
                config, port, bind, fps, quality, source, image, source_fps, resolution,
            )
            .await
        }
    }
}

fn cmd_info() -> anyhow::Result<()> {
    println!("FrameCast {}", framecast::VERSION);
    println!("==============\n");

    println!("LAN address: {}", net::local_ipv4());
    println!("Default port: {}", DEFAULT_PORT);
    println!(
        "Default rate: {} fps (every {} ms)",
        1000 / DEFAULT_FRAME_INTERVAL_MS,
        DEFAULT_FRAME_INTERVAL_MS
    );
    println!("Default JPEG quality: {}", DEFAULT_JPEG_QUALITY);
    println!("\nEndpoints:");
    println!("  /              landing page");
    println!("  /stream.mjpeg  MJPEG stream");

    Ok(())
}

#[allow(clippy::too_many_arguments)]
async fn cmd_serve(
    config_path: Option<PathBuf>,
    port: Option<u16>,
    bind: Option<IpAddr>,
    fps: Option<u32>,
    quality: Option<u8>,
    source_kind: SourceKind,
    image: Option<PathBuf>,
    source_fps: u32,
    resolution: Option<String>,
) -> anyhow::Result<()> {
    let mut config = match config_path {
        Some(path) => ServerConfig::load(path)?,
        None => ServerConfig::default(),
    };
    if let Some(port) = port {
        config = config.with_port(port);
    }
    if let Some(bind) = bind {
        config = config.with_bind_address(bind);
    }
    if let Some(fps) = fps {
        config = config.with_fps(fps);
    }
    if let Some(quality) = quality {
        config = config.with_jpeg_quality(quality);
    }

    let source_rate = Framerate::new(source_fps.max(1), 1);
    let source: Box<dyn FrameSource> = match source_kind {
        SourceKind::Pattern => {
            let resolution = match resolution.as_deref() {
                Some(res) => parse_resolution(res)?,
                None => Resolution::VGA,
            };
            Box::new(TestPattern::new(resolution, source_rate))
        }
        SourceKind::Image => {
            let Some(path) = image else {
                anyhow::bail!("--source image requires --image <PATH>");
            };
            Box::new(StillImage::open(path, source_rate)?)
        }
    };

    let requested_port = config.port;
    let server = MjpegServer::new(config)?;
    server.start(requested_port).await?;

    println!("Configuration:");
    println!("  Source: {}", source.name());
    println!("  Broadcast every: {} ms", server.config().frame_interval_ms);
    println!("  JPEG quality: {}", server.config().jpeg_quality);
    if let Some(url) = server.server_url() {
        println!("\nOpen {} in a browser.", url);
    }
    println!("Press Ctrl+C to stop.\n");

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let producer = tokio::spawn(run_source(source, server.frame_buffer(), shutdown_rx));

    tokio::signal::ctrl_c().await?;

    println!("\nStopping...");
    let _ = shutdown_tx.send(true);
    match producer.await? {
        Ok(produced) => tracing::debug!("Source produced {} frames", produced),
        Err(e) => tracing::warn!("Source failed: {}", e),
    }
    server.stop().await;

    let stats = server.stats();
    println!("\nStatistics:");
    println!("  Frames published: {}", stats.frames_published);
    println!("  Frames encoded: {}", stats.frames_encoded);
    println!("  Parts delivered: {}", stats.parts_delivered);
    println!("  Bytes queued: {}", stats.bytes_queued);
    println!("  Clients served: {}", stats.clients_served);
    println!("  Clients evicted: {}", stats.clients_evicted);

    Ok(())
}

fn parse_resolution(value: &str) -> anyhow::Result<Resolution> {
    let (w, h) = value
        .split_once('x')
        .ok_or_else(|| anyhow::anyhow!("resolution must look like WIDTHxHEIGHT, got {}", value))?;
    Ok(Resolution::new(w.trim().parse()?, h.trim().parse()?))
}
