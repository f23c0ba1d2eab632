//! pyramid-region - Read exactly the pixels a request needs from large images.
//!
//! This binary wires the library's operation model and region reader to local
//! files.

use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use clap::Parser;
use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use pyramid_region::{
    config::{Cli, Command, ExtractConfig, InspectConfig, KeyConfig},
    normalize::conversion_count,
    FileReader, Identifier, RasterCodec, RegionReader,
};

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    match cli.into_command() {
        Command::Inspect(config) => run_inspect(config).await,
        Command::Extract(config) => run_extract(config).await,
        Command::Key(config) => run_key(config),
    }
}

/// Initialize the tracing/logging subsystem.
fn init_logging(verbose: bool) {
    let env_filter = if verbose {
        "pyramid_region=debug"
    } else {
        "pyramid_region=info"
    };

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| env_filter.into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();
}

/// Open `path` with the raster codec, hinting the format from its extension.
async fn open_reader(path: &Path) -> Result<RegionReader<RasterCodec>, String> {
    let source = FileReader::open(path).await.map_err(|e| e.to_string())?;
    let hint = Identifier::new(path.display().to_string()).inferred_format();
    Ok(RegionReader::new(RasterCodec::new(), source).with_format_hint(hint))
}

// =============================================================================
// Inspect Command
// =============================================================================

async fn run_inspect(config: InspectConfig) -> ExitCode {
    init_logging(config.verbose);

    match inspect(&config.path).await {
        Ok(json) => {
            println!("{}", json);
            ExitCode::SUCCESS
        }
        Err(e) => {
            error!("Failed to inspect {}: {}", config.path.display(), e);
            ExitCode::FAILURE
        }
    }
}

async fn inspect(path: &Path) -> Result<String, String> {
    let mut reader = open_reader(path).await?;

    let sizes = reader.level_dimensions().await.map_err(|e| e.to_string())?;
    let tiles = reader.tile_dimensions().await.map_err(|e| e.to_string())?;

    let mut levels = Vec::with_capacity(sizes.len());
    for (index, (size, tile)) in sizes.iter().zip(tiles.iter()).enumerate() {
        let compression = reader.compression(index).await.map_err(|e| e.to_string())?;
        levels.push(serde_json::json!({
            "level": index,
            "width": size.width,
            "height": size.height,
            "tile": tile,
            "compression": compression,
        }));
    }

    let format = reader.format_name().await.map_err(|e| e.to_string())?;
    let orientation = reader.orientation().await.map_err(|e| e.to_string())?;
    let json = serde_json::json!({
        "identifier": reader.identifier(),
        "format": format,
        "orientation": orientation.degrees(),
        "levels": levels,
    });

    reader.dispose();
    serde_json::to_string_pretty(&json).map_err(|e| e.to_string())
}

// =============================================================================
// Extract Command
// =============================================================================

async fn run_extract(config: ExtractConfig) -> ExitCode {
    init_logging(config.verbose);

    if let Err(e) = config.validate() {
        error!("Configuration error: {}", e);
        return ExitCode::FAILURE;
    }

    match extract(&config).await {
        Ok(out) => {
            info!("Wrote {}", out.display());
            ExitCode::SUCCESS
        }
        Err(e) => {
            error!("Extraction failed: {}", e);
            ExitCode::FAILURE
        }
    }
}

async fn extract(config: &ExtractConfig) -> Result<PathBuf, String> {
    let identifier = config.path.display().to_string();
    let ops = config.operations.operation_list(identifier.as_str())?;
    let orientation = config.orientation()?;

    info!("Operations: {}", ops);
    info!("Cache key: {}", ops.to_filename());

    let mut reader = open_reader(&config.path).await?;
    let read = match orientation {
        Some(orientation) => reader.read(&ops, orientation).await,
        None => reader.read_oriented(&ops).await,
    }
    .map_err(|e| e.to_string())?;
    reader.dispose();

    info!(
        "Read {}x{} pixels from level {} ({}x reduction factor)",
        read.image.width(),
        read.image.height(),
        read.level,
        read.reduction_factor
    );
    log_hints(&read.hints);

    let out = config
        .out
        .clone()
        .unwrap_or_else(|| PathBuf::from(ops.to_filename()));

    let format = ops
        .output_format()
        .and_then(|f| f.image_format())
        .ok_or_else(|| "output format cannot be written".to_string())?;

    // JPEG has no alpha channel
    let image = if format == image::ImageFormat::Jpeg && read.image.color().has_alpha() {
        image::DynamicImage::ImageRgb8(read.image.to_rgb8())
    } else {
        read.image
    };

    image
        .save_with_format(&out, format)
        .map_err(|e| format!("{}: {}", out.display(), e))?;

    Ok(out)
}

fn log_hints(hints: &HashSet<pyramid_region::Hint>) {
    for hint in hints {
        info!("Hint: {:?}", hint);
    }
    if conversion_count() > 0 {
        info!("Pixel layout conversions: {}", conversion_count());
    }
}

// =============================================================================
// Key Command
// =============================================================================

fn run_key(config: KeyConfig) -> ExitCode {
    if let Err(e) = config.validate() {
        eprintln!("Error: {}", e);
        return ExitCode::FAILURE;
    }

    let result = config
        .operations
        .operation_list(config.identifier.as_str())
        .and_then(|ops| {
            let full = config.full_size()?;
            ops.validate(full).map_err(|e| e.to_string())?;
            let json = serde_json::json!({
                "string": ops.to_string(),
                "filename": ops.to_filename(),
                "resulting_size": ops.resulting_size(full),
                "noop": ops.is_noop(),
                "map": ops.to_structured_map(full),
            });
            serde_json::to_string_pretty(&json).map_err(|e| e.to_string())
        });

    match result {
        Ok(json) => {
            println!("{}", json);
            ExitCode::SUCCESS
        }
        Err(e) => {
            eprintln!("Error: {}", e);
            ExitCode::FAILURE
        }
    }
}
