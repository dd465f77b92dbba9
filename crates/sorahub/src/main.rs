//! SoraHub CLI - Batch image conversion pipeline.
//!
//! SoraHub takes image files as input and converts them in a batch:
//! resize, flip, rotate, color adjustments, and re-encoding into one
//! of eight target formats, with an optional merged PDF of the
//! results.
//!
//! # Usage
//!
//! ```bash
//! # Convert a couple of images to JPEG
//! sorahub convert photo.png scan.bmp --format jpeg --quality 80
//!
//! # Resize into a bounding box and write everything to ./out
//! sorahub convert *.png --resize 800x600 --out-dir ./out
//!
//! # Merge the converted images into one PDF as well
//! sorahub convert *.jpg --format png --pdf
//!
//! # List supported output formats
//! sorahub formats
//! ```

use clap::{Parser, Subcommand};

mod cli;
mod logging;

/// SoraHub - Batch image conversion pipeline.
#[derive(Parser, Debug)]
#[command(name = "sorahub")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    /// Enable verbose (debug) logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Output logs in JSON format
    #[arg(long, global = true)]
    json_logs: bool,

    #[command(subcommand)]
    command: Commands,
}

/// Available commands.
#[derive(Subcommand, Debug)]
enum Commands {
    /// Convert a batch of images and write the results to disk
    Convert(cli::convert::ConvertArgs),

    /// List the supported output formats
    Formats(cli::formats::FormatsArgs),
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    logging::init(cli.verbose, cli.json_logs);

    tracing::debug!("SoraHub v{}", sorahub_core::VERSION);

    // Dispatch to the appropriate command handler
    match cli.command {
        Commands::Convert(args) => cli::convert::execute(args).await,
        Commands::Formats(args) => cli::formats::execute(args),
    }
}
