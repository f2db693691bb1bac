// SPDX-License-Identifier: GPL-3.0-only

use camera_core::AspectRatio;
use camera_core::backends::camera::CameraPosition;
use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

mod cli;

#[derive(Parser)]
#[command(name = "camera-core")]
#[command(about = "Capture session controller diagnostics")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Clone, Copy, ValueEnum)]
enum Position {
    Front,
    Back,
}

impl From<Position> for CameraPosition {
    fn from(position: Position) -> Self {
        match position {
            Position::Front => CameraPosition::Front,
            Position::Back => CameraPosition::Back,
        }
    }
}

#[derive(Clone, Copy, ValueEnum)]
enum Ratio {
    #[value(name = "4:3")]
    FourThree,
    #[value(name = "1:1")]
    Square,
    #[value(name = "16:9")]
    SixteenNine,
}

impl From<Ratio> for AspectRatio {
    fn from(ratio: Ratio) -> Self {
        match ratio {
            Ratio::FourThree => AspectRatio::FourThree,
            Ratio::Square => AspectRatio::Square,
            Ratio::SixteenNine => AspectRatio::SixteenNine,
        }
    }
}

#[derive(Subcommand)]
enum Commands {
    /// List available cameras
    List,

    /// List the lenses offered for a camera position
    Lenses {
        #[arg(short, long, value_enum, default_value = "back")]
        position: Position,
    },

    /// Take a photo
    Photo {
        #[arg(short, long, value_enum, default_value = "back")]
        position: Position,

        /// Lens name ("0.5x", "1x", "3x", "Front")
        #[arg(short, long)]
        lens: Option<String>,

        /// Zoom factor
        #[arg(short, long)]
        zoom: Option<f64>,

        /// Output aspect ratio
        #[arg(short, long, value_enum)]
        ratio: Option<Ratio>,

        /// Output file path (default: ~/Pictures/camera/photo_TIMESTAMP.jpg)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Set RUST_LOG environment variable to control log level
    // Examples: RUST_LOG=debug, RUST_LOG=camera_core=debug, RUST_LOG=info
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
        )
        .with_target(true)
        .with_level(true)
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::List => cli::list_devices(),
        Commands::Lenses { position } => cli::list_lenses(position.into()),
        Commands::Photo {
            position,
            lens,
            zoom,
            ratio,
            output,
        } => cli::take_photo(cli::PhotoOptions {
            position: position.into(),
            lens,
            zoom,
            ratio: ratio.map(Into::into),
            output,
        }),
    }
}
