//! The `sorahub convert` command: batch conversion with progress,
//! per-item output files, an optional merged PDF, and an optional
//! JSON run report.

use std::path::{Path, PathBuf};
use std::time::Instant;

use anyhow::Context;
use clap::Args;
use serde::Serialize;

use sorahub_core::{
    download_file_name, BatchConverter, BatchRunStats, ConvertError, InputFile, Rotation,
    SettingsPatch, TargetFormat, PDF_DOWNLOAD_NAME,
};

/// Arguments for the `convert` command.
#[derive(Args, Debug)]
pub struct ConvertArgs {
    /// Image files to convert
    #[arg(required = true)]
    pub inputs: Vec<PathBuf>,

    /// Directory for the converted files
    #[arg(short, long, default_value = ".")]
    pub out_dir: PathBuf,

    /// Settings file (TOML); individual flags override its values
    #[arg(short, long)]
    pub settings: Option<PathBuf>,

    /// Target output format
    #[arg(short, long)]
    pub format: Option<TargetFormat>,

    /// Quality 10-100 for quality-bearing formats
    #[arg(short, long)]
    pub quality: Option<u8>,

    /// Apply extra compression on top of the quality setting
    #[arg(long)]
    pub compression: bool,

    /// Resize to fit within WIDTHxHEIGHT
    #[arg(long, value_name = "WIDTHxHEIGHT", value_parser = parse_dimensions)]
    pub resize: Option<(u32, u32)>,

    /// Stretch to the exact resize dimensions instead of fitting
    #[arg(long, requires = "resize")]
    pub stretch: bool,

    /// Clockwise rotation in degrees (0, 90, 180, 270)
    #[arg(long, value_name = "DEGREES")]
    pub rotate: Option<Rotation>,

    /// Mirror across the vertical axis
    #[arg(long)]
    pub flip_horizontal: bool,

    /// Mirror across the horizontal axis
    #[arg(long)]
    pub flip_vertical: bool,

    /// Convert to grayscale
    #[arg(long)]
    pub grayscale: bool,

    /// Brightness 50-150, 100 is neutral
    #[arg(long)]
    pub brightness: Option<u8>,

    /// Contrast 50-150, 100 is neutral
    #[arg(long)]
    pub contrast: Option<u8>,

    /// Also merge the converted images into a single PDF
    #[arg(long)]
    pub pdf: bool,

    /// Write a JSON run report to this path
    #[arg(long)]
    pub report: Option<PathBuf>,
}

/// One line of the JSON run report.
#[derive(Debug, Serialize)]
struct ItemReport {
    name: String,
    state: String,
    output: Option<String>,
    original_bytes: u64,
    converted_bytes: Option<u64>,
    error: Option<String>,
}

/// The JSON run report written by `--report`.
#[derive(Debug, Serialize)]
struct RunReport {
    stats: BatchRunStats,
    total_original_bytes: u64,
    total_converted_bytes: u64,
    items: Vec<ItemReport>,
}

/// Execute the `convert` command.
pub async fn execute(args: ConvertArgs) -> anyhow::Result<()> {
    // Settings file first, then flags on top
    let mut converter = BatchConverter::new();
    if let Some(path) = &args.settings {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read settings file {}", path.display()))?;
        let patch = SettingsPatch::from_toml_str(&content)
            .with_context(|| format!("invalid settings file {}", path.display()))?;
        converter.update_settings(patch)?;
    }
    converter.update_settings(flags_to_patch(&args))?;

    // Load inputs; unrecognized extensions are dropped with a warning
    let mut inputs = Vec::new();
    for path in &args.inputs {
        let Some(media_type) = media_type_for(path) else {
            tracing::warn!("skipping {}: not a recognized image file", path.display());
            continue;
        };
        let bytes = std::fs::read(path)
            .with_context(|| format!("failed to read {}", path.display()))?;
        let name = path
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or("image")
            .to_string();
        inputs.push(InputFile::new(name, media_type, bytes));
    }
    let ids = converter.add_items(inputs);
    if ids.is_empty() {
        anyhow::bail!("no usable image inputs");
    }
    tracing::info!(
        "converting {} image(s) to {}",
        ids.len(),
        converter.settings().format
    );

    let progress = create_spinner(ids.len());
    let start = Instant::now();
    let stats = converter.convert_all().await;
    progress.finish_and_clear();

    // Write per-item outputs
    std::fs::create_dir_all(&args.out_dir)
        .with_context(|| format!("failed to create {}", args.out_dir.display()))?;
    for item in converter.registry().iter() {
        if let Some(artifact) = item.artifact() {
            let file_name = download_file_name(item.name(), artifact.format());
            let dest = args.out_dir.join(&file_name);
            std::fs::write(&dest, artifact.bytes())
                .with_context(|| format!("failed to write {}", dest.display()))?;
            tracing::info!("wrote {} ({} bytes)", dest.display(), artifact.len());
        } else if let Some(message) = item.error_message() {
            tracing::error!("{}: {}", item.name(), message);
        }
    }

    if args.pdf {
        match converter.assemble_pdf() {
            Ok(bytes) => {
                let dest = args.out_dir.join(PDF_DOWNLOAD_NAME);
                std::fs::write(&dest, &bytes)
                    .with_context(|| format!("failed to write {}", dest.display()))?;
                tracing::info!("wrote {} ({} bytes)", dest.display(), bytes.len());
            }
            Err(ConvertError::EmptyAssembly) => {
                tracing::warn!("no completed images, skipping the PDF");
            }
            Err(e) => return Err(e.into()),
        }
    }

    if let Some(report_path) = &args.report {
        let report = build_report(&converter, stats);
        std::fs::write(report_path, serde_json::to_string_pretty(&report)?)
            .with_context(|| format!("failed to write {}", report_path.display()))?;
        tracing::info!("report written to {}", report_path.display());
    }

    print_summary(&converter, &stats, start.elapsed());

    if stats.failed > 0 {
        anyhow::bail!("{} image(s) failed to convert", stats.failed);
    }
    Ok(())
}

/// Map a path's extension to the media type the registry expects.
/// Returns `None` for extensions that are not raster images.
fn media_type_for(path: &Path) -> Option<&'static str> {
    let ext = path.extension()?.to_str()?.to_ascii_lowercase();
    Some(match ext.as_str() {
        "png" => "image/png",
        "jpg" | "jpeg" => "image/jpeg",
        "webp" => "image/webp",
        "gif" => "image/gif",
        "bmp" => "image/bmp",
        "ico" => "image/x-icon",
        "tif" | "tiff" => "image/tiff",
        "avif" => "image/avif",
        _ => return None,
    })
}

/// Parse `--resize 800x600` into a `(width, height)` pair.
fn parse_dimensions(s: &str) -> Result<(u32, u32), String> {
    let (w, h) = s
        .split_once(['x', 'X'])
        .ok_or_else(|| format!("expected WIDTHxHEIGHT, got {s:?}"))?;
    let width: u32 = w
        .trim()
        .parse()
        .map_err(|_| format!("invalid width {w:?}"))?;
    let height: u32 = h
        .trim()
        .parse()
        .map_err(|_| format!("invalid height {h:?}"))?;
    if width == 0 || height == 0 {
        return Err("resize dimensions must be > 0".to_string());
    }
    Ok((width, height))
}

/// Build a settings patch from the individual CLI flags. Boolean
/// flags only ever switch a behavior on; absent flags leave the
/// settings-file (or default) values in place.
fn flags_to_patch(args: &ConvertArgs) -> SettingsPatch {
    let mut patch = SettingsPatch {
        format: args.format,
        quality: args.quality,
        rotate: args.rotate,
        brightness: args.brightness,
        contrast: args.contrast,
        ..SettingsPatch::default()
    };
    if args.compression {
        patch.compression = Some(true);
    }
    if let Some((width, height)) = args.resize {
        patch.resize = Some(true);
        patch.resize_width = Some(width);
        patch.resize_height = Some(height);
    }
    if args.stretch {
        patch.maintain_aspect_ratio = Some(false);
    }
    if args.flip_horizontal {
        patch.flip_horizontal = Some(true);
    }
    if args.flip_vertical {
        patch.flip_vertical = Some(true);
    }
    if args.grayscale {
        patch.grayscale = Some(true);
    }
    patch
}

fn build_report(converter: &BatchConverter, stats: BatchRunStats) -> RunReport {
    let registry = converter.registry();
    let items = registry
        .iter()
        .map(|item| ItemReport {
            name: item.name().to_string(),
            state: item.state().name().to_string(),
            output: item
                .artifact()
                .map(|a| download_file_name(item.name(), a.format())),
            original_bytes: item.original_size(),
            converted_bytes: item.converted_size(),
            error: item.error_message().map(str::to_string),
        })
        .collect();
    RunReport {
        stats,
        total_original_bytes: registry.total_original_size(),
        total_converted_bytes: registry.total_converted_size(),
        items,
    }
}

/// Spinner shown while the batch runs. The core converts one image at
/// a time, so a steady tick stands in for per-item increments.
fn create_spinner(total: usize) -> indicatif::ProgressBar {
    use indicatif::{ProgressBar, ProgressStyle};

    let pb = ProgressBar::new_spinner();
    pb.set_style(
        ProgressStyle::default_spinner()
            .template("{spinner:.green} [{elapsed_precise}] {msg}")
            .unwrap(),
    );
    pb.set_message(format!("converting {total} image(s)..."));
    pb.enable_steady_tick(std::time::Duration::from_millis(100));
    pb
}

/// Print a formatted summary table after the batch run.
fn print_summary(converter: &BatchConverter, stats: &BatchRunStats, elapsed: std::time::Duration) {
    let registry = converter.registry();
    let original_mb = registry.total_original_size() as f64 / 1_000_000.0;
    let converted_mb = registry.total_converted_size() as f64 / 1_000_000.0;

    eprintln!();
    eprintln!("  ====================================");
    eprintln!("               Summary");
    eprintln!("  ====================================");
    eprintln!("    Succeeded:    {:>8}", stats.succeeded);
    if stats.failed > 0 {
        eprintln!("    Failed:       {:>8}", stats.failed);
    }
    if stats.skipped > 0 {
        eprintln!("    Skipped:      {:>8}", stats.skipped);
    }
    eprintln!("  ------------------------------------");
    eprintln!("    Original:     {:>7.2} MB", original_mb);
    eprintln!("    Converted:    {:>7.2} MB", converted_mb);
    eprintln!("    Duration:     {:>7.1}s", elapsed.as_secs_f64());
    eprintln!("  ====================================");
}
