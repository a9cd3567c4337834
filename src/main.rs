// SPDX-License-Identifier: GPL-3.0-only

use clap::{Parser, Subcommand};
use std::path::PathBuf;

mod cli;

#[derive(Parser)]
#[command(name = "camera-session")]
#[command(about = "Camera session coordination and capture post-processing")]
#[command(version = env!("GIT_VERSION"))]
struct Cli {
    /// Log at debug level unless RUST_LOG says otherwise
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Settings file (TOML)
    #[arg(short, long, global = true)]
    settings: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the photo pipeline on an image file
    Process {
        /// Input image
        input: PathBuf,

        /// Output file (default: <input>_processed.jpg)
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// JSON object of source metadata tags (e.g. {"Orientation": "6"})
        #[arg(short, long)]
        metadata: Option<PathBuf>,

        /// JPEG quality (0-100)
        #[arg(short, long, default_value_t = camera_session::constants::quality::DEFAULT_PHOTO_QUALITY)]
        quality: u8,

        #[arg(long)]
        width: Option<u32>,

        #[arg(long)]
        height: Option<u32>,

        /// Crop to this preview size when no width/height is given (WxH)
        #[arg(long, value_parser = cli::parse_size)]
        crop_to: Option<(u32, u32)>,

        /// Stamp the capture time
        #[arg(long)]
        timestamp: bool,

        /// Stamp the GPS position if the metadata has one
        #[arg(long)]
        location: bool,
    },

    /// Produce a preview sample from an image file
    Sample {
        input: PathBuf,

        #[arg(short, long)]
        output: Option<PathBuf>,

        #[arg(short, long)]
        quality: Option<u8>,

        /// Rotation to apply, in degrees
        #[arg(long, default_value = "0")]
        rotation: i32,

        /// Shrink so the shorter side is at most this many pixels
        #[arg(long, conflicts_with = "region")]
        max_size: Option<u32>,

        /// Crop region in view coordinates (x,y,w,h)
        #[arg(long, value_parser = cli::parse_region, requires = "view")]
        region: Option<camera_session::pipelines::photo::ViewRegion>,

        /// Preview view size the region refers to (WxH)
        #[arg(long, value_parser = cli::parse_size)]
        view: Option<(u32, u32)>,
    },

    /// Drive a full session on the synthetic camera and print the callbacks
    Simulate {
        /// Photos to capture
        #[arg(short, long, default_value = "1")]
        photos: u32,

        /// Request the stop while the captures are still in flight
        #[arg(long)]
        stop_during_capture: bool,

        /// Simulated shutter latency in milliseconds
        #[arg(long, default_value = "200")]
        capture_delay_ms: u64,

        /// Tap-to-focus at the center before capturing
        #[arg(long)]
        focus: bool,
    },
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    // Set RUST_LOG to override, e.g. RUST_LOG=camera_session=trace
    let default_level = if cli.verbose { "debug" } else { "warn" };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default_level)),
        )
        .with_target(true)
        .with_level(true)
        .init();

    let settings = match &cli.settings {
        Some(path) => camera_session::Settings::load(path)?,
        None => camera_session::Settings::default(),
    };

    match cli.command {
        Commands::Process {
            input,
            output,
            metadata,
            quality,
            width,
            height,
            crop_to,
            timestamp,
            location,
        } => cli::process_image(
            &settings,
            cli::ProcessArgs {
                input,
                output,
                metadata,
                quality,
                width,
                height,
                crop_to,
                timestamp,
                location,
            },
        ),
        Commands::Sample {
            input,
            output,
            quality,
            rotation,
            max_size,
            region,
            view,
        } => cli::sample_image(cli::SampleArgs {
            input,
            output,
            quality: quality.unwrap_or(settings.default_sample_quality),
            rotation,
            max_size,
            region,
            view,
        }),
        Commands::Simulate {
            photos,
            stop_during_capture,
            capture_delay_ms,
            focus,
        } => cli::simulate(
            settings,
            cli::SimulateArgs {
                photos,
                stop_during_capture,
                capture_delay_ms,
                focus,
            },
        ),
    }
}
