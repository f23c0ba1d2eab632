//! Command-line configuration for the `pyramid-region` binary.
//!
//! Every flag can also be set through an environment variable with the
//! `PYR_` prefix:
//!
//! - `PYR_CROP` - Crop region: `x,y,w,h`, `pct:x,y,w,h` or `full`
//! - `PYR_SCALE` - Scale: `w,`, `,h`, `!w,h`, `w,h`, `pct:n` or `full`
//! - `PYR_ROTATE` - Rotation in degrees (default: 0)
//! - `PYR_ORIENTATION` - Rotation stored in the raw pixels (0, 90, 180, 270)
//! - `PYR_FORMAT` - Output format extension
//! - `PYR_QUALITY` - Output quality, 1-100
//!
//! # Example
//!
//! ```ignore
//! use pyramid_region::config::{Cli, Command};
//!
//! let cli = Cli::parse();
//! match cli.into_command() {
//!     Command::Inspect(config) => { /* ... */ }
//!     Command::Extract(config) => { /* ... */ }
//!     Command::Key(config) => { /* ... */ }
//! }
//! ```

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

use crate::geometry::{Dimension, Orientation};
use crate::operation::{
    Crop, Format, Identifier, OperationList, OperationListBuilder, Rotate, Scale,
};

// =============================================================================
// Default Values
// =============================================================================

/// Default output quality.
pub const DEFAULT_QUALITY: u8 = 80;

/// Default output format extension.
pub const DEFAULT_FORMAT: &str = "png";

// =============================================================================
// CLI Arguments
// =============================================================================

/// pyramid-region - Read exactly the pixels a request needs from large images.
#[derive(Parser, Debug, Clone)]
#[command(name = "pyramid-region")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    command: Command,
}

impl Cli {
    pub fn into_command(self) -> Command {
        self.command
    }
}

#[derive(Subcommand, Debug, Clone)]
pub enum Command {
    /// Print the resolution levels and tile sizes of an image.
    Inspect(InspectConfig),

    /// Read the region an operation list needs and write it to a file.
    Extract(ExtractConfig),

    /// Print the canonical string and cache key of an operation list.
    Key(KeyConfig),
}

// =============================================================================
// Shared operation flags
// =============================================================================

/// Flags that build an operation list.
#[derive(Args, Debug, Clone)]
pub struct OperationArgs {
    /// Crop region: `x,y,w,h` in pixels, `pct:x,y,w,h` in percent, or `full`.
    #[arg(long, default_value = "full", env = "PYR_CROP")]
    pub crop: String,

    /// Scale: `w,`, `,h`, `!w,h` (fit inside), `w,h` (fill), `pct:n`, or `full`.
    #[arg(long, default_value = "full", env = "PYR_SCALE")]
    pub scale: String,

    /// Clockwise rotation in degrees, 0-360.
    #[arg(long, default_value_t = 0.0, env = "PYR_ROTATE")]
    pub rotate: f64,

    /// Output format extension (png, jpg, gif, ...).
    #[arg(long, default_value = DEFAULT_FORMAT, env = "PYR_FORMAT")]
    pub format: String,

    /// Output quality, 1-100.
    #[arg(long, default_value_t = DEFAULT_QUALITY, env = "PYR_QUALITY")]
    pub quality: u8,

    /// Request interlaced output.
    #[arg(long, default_value_t = false)]
    pub interlace: bool,

    /// Extra `key=value` options included in the cache key.
    #[arg(long = "option", value_name = "KEY=VALUE")]
    pub options: Vec<String>,
}

impl OperationArgs {
    pub fn validate(&self) -> Result<(), String> {
        parse_crop(&self.crop)?;
        parse_scale(&self.scale)?;
        self.output_format()?;

        if !(0.0..=360.0).contains(&self.rotate) {
            return Err("rotate must be between 0 and 360".to_string());
        }
        if self.quality == 0 || self.quality > 100 {
            return Err("quality must be between 1 and 100".to_string());
        }
        for option in &self.options {
            parse_option(option)?;
        }
        Ok(())
    }

    pub fn output_format(&self) -> Result<Format, String> {
        Format::from_extension(&self.format)
            .ok_or_else(|| format!("Unknown output format '{}'", self.format))
    }

    /// Build and freeze the operation list for `identifier`.
    pub fn operation_list(&self, identifier: impl Into<Identifier>) -> Result<OperationList, String> {
        let mut builder = OperationListBuilder::with_identifier(identifier);
        builder
            .push(parse_crop(&self.crop)?)
            .push(parse_scale(&self.scale)?)
            .push(Rotate::new(self.rotate))
            .set_output_format(self.output_format()?)
            .set_output_quality(self.quality)
            .set_output_interlacing(self.interlace);

        for option in &self.options {
            let (key, value) = parse_option(option)?;
            builder.set_option(key, value);
        }

        Ok(builder.freeze())
    }
}

// =============================================================================
// Inspect Command
// =============================================================================

#[derive(Args, Debug, Clone)]
pub struct InspectConfig {
    /// Image file to inspect.
    pub path: PathBuf,

    /// Enable verbose logging.
    #[arg(short, long, default_value_t = false)]
    pub verbose: bool,
}

// =============================================================================
// Extract Command
// =============================================================================

#[derive(Args, Debug, Clone)]
pub struct ExtractConfig {
    /// Source image file.
    pub path: PathBuf,

    #[command(flatten)]
    pub operations: OperationArgs,

    /// Rotation stored in the raw pixel data: 0, 90, 180 or 270. Read from
    /// the image's embedded metadata when not given.
    #[arg(long, env = "PYR_ORIENTATION")]
    pub orientation: Option<u32>,

    /// Output file. Defaults to the cache key in the current directory.
    #[arg(short, long)]
    pub out: Option<PathBuf>,

    /// Enable verbose logging.
    #[arg(short, long, default_value_t = false)]
    pub verbose: bool,
}

impl ExtractConfig {
    pub fn validate(&self) -> Result<(), String> {
        self.operations.validate()?;
        self.orientation()?;
        Ok(())
    }

    /// Orientation given on the command line, if any.
    pub fn orientation(&self) -> Result<Option<Orientation>, String> {
        self.orientation
            .map(|degrees| {
                Orientation::from_degrees(degrees).ok_or_else(|| {
                    format!("orientation must be 0, 90, 180 or 270, got {}", degrees)
                })
            })
            .transpose()
    }
}

// =============================================================================
// Key Command
// =============================================================================

#[derive(Args, Debug, Clone)]
pub struct KeyConfig {
    /// Source identifier, e.g. `slides/sample.tif`.
    pub identifier: String,

    #[command(flatten)]
    pub operations: OperationArgs,

    /// Full image size `WxH` used for the structured description.
    #[arg(long, default_value = "1000x1000")]
    pub size: String,
}

impl KeyConfig {
    pub fn validate(&self) -> Result<(), String> {
        if self.identifier.is_empty() {
            return Err("identifier must not be empty".to_string());
        }
        self.operations.validate()?;
        self.full_size()?;
        Ok(())
    }

    pub fn full_size(&self) -> Result<Dimension, String> {
        let (w, h) = self
            .size
            .split_once('x')
            .ok_or_else(|| format!("size must look like WxH, got '{}'", self.size))?;
        Ok(Dimension::new(parse_u32(w, "width")?, parse_u32(h, "height")?))
    }
}

// =============================================================================
// Parsing
// =============================================================================

fn parse_u32(value: &str, what: &str) -> Result<u32, String> {
    value
        .trim()
        .parse()
        .map_err(|_| format!("invalid {} '{}'", what, value))
}

fn parse_f64(value: &str, what: &str) -> Result<f64, String> {
    value
        .trim()
        .parse()
        .map_err(|_| format!("invalid {} '{}'", what, value))
}

/// Parse `full`, `x,y,w,h` or `pct:x,y,w,h` (percent values 0-100).
pub fn parse_crop(value: &str) -> Result<Crop, String> {
    if value == "full" {
        return Ok(Crop::Full);
    }

    let (percent, body) = match value.strip_prefix("pct:") {
        Some(rest) => (true, rest),
        None => (false, value),
    };
    let parts: Vec<&str> = body.split(',').collect();
    if parts.len() != 4 {
        return Err(format!("crop must have four values, got '{}'", value));
    }

    if percent {
        let p = |i: usize, what: &str| parse_f64(parts[i], what).map(|v| v / 100.0);
        Ok(Crop::percent(p(0, "x")?, p(1, "y")?, p(2, "width")?, p(3, "height")?))
    } else {
        Ok(Crop::pixels(
            parse_u32(parts[0], "x")?,
            parse_u32(parts[1], "y")?,
            parse_u32(parts[2], "width")?,
            parse_u32(parts[3], "height")?,
        ))
    }
}

/// Parse `full`, `pct:n`, `w,`, `,h`, `!w,h` or `w,h`.
pub fn parse_scale(value: &str) -> Result<Scale, String> {
    if value == "full" {
        return Ok(Scale::Full);
    }
    if let Some(pct) = value.strip_prefix("pct:") {
        return Ok(Scale::Percent(parse_f64(pct, "percent")? / 100.0));
    }

    let (inside, body) = match value.strip_prefix('!') {
        Some(rest) => (true, rest),
        None => (false, value),
    };
    let (w, h) = body
        .split_once(',')
        .ok_or_else(|| format!("invalid scale '{}'", value))?;

    match (w.is_empty(), h.is_empty(), inside) {
        (false, true, false) => Ok(Scale::AspectFitWidth {
            width: parse_u32(w, "width")?,
        }),
        (true, false, false) => Ok(Scale::AspectFitHeight {
            height: parse_u32(h, "height")?,
        }),
        (false, false, true) => Ok(Scale::AspectFitInside {
            width: parse_u32(w, "width")?,
            height: parse_u32(h, "height")?,
        }),
        (false, false, false) => Ok(Scale::NonAspectFill {
            width: parse_u32(w, "width")?,
            height: parse_u32(h, "height")?,
        }),
        _ => Err(format!("invalid scale '{}'", value)),
    }
}

fn parse_option(value: &str) -> Result<(String, String), String> {
    match value.split_once('=') {
        Some((k, v)) if !k.is_empty() => Ok((k.to_string(), v.to_string())),
        _ => Err(format!("option must look like key=value, got '{}'", value)),
    }
}

// =============================================================================
// Tests
// =============================================================================
