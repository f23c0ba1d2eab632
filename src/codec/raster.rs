//! Single-level rasters decoded with the `image` crate.
//!
//! PNG, JPEG, GIF, BMP, WebP and untiled TIFF sources have one resolution
//! level and no tile grid. Only the header and the EXIF orientation are
//! parsed on open; the pixels are decoded on the first read and kept on the
//! handle for later reads.

use std::io::Cursor;

use async_trait::async_trait;
use bytes::Bytes;
use image::{DynamicImage, ImageFormat, ImageReader};
use tracing::debug;

use super::{Codec, DecodeHandle, LevelCount};
use crate::error::{CodecError, IoError};
use crate::geometry::{Dimension, Orientation, Rectangle};
use crate::io::RangeReader;
use crate::operation::{Compression, Format};

/// Codec for formats the `image` crate can decode.
#[derive(Debug, Clone, Copy, Default)]
pub struct RasterCodec;

impl RasterCodec {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl Codec for RasterCodec {
    fn name(&self) -> &str {
        "raster"
    }

    async fn open(
        &self,
        source: Box<dyn RangeReader>,
        format_hint: Option<Format>,
    ) -> Result<Box<dyn DecodeHandle>, CodecError> {
        let bytes = source.read_all().await?;

        let format = match format_hint {
            Some(hint) => hint.image_format().ok_or_else(|| CodecError::UnsupportedFormat {
                format: hint.to_string(),
                reason: "no raster decoder for this format".to_string(),
            })?,
            None => image::guess_format(&bytes).map_err(|e| CodecError::UnsupportedFormat {
                format: "unknown".to_string(),
                reason: e.to_string(),
            })?,
        };
        let format_name = format_name(format);

        let (width, height) = ImageReader::with_format(Cursor::new(&bytes[..]), format)
            .into_dimensions()
            .map_err(|e| CodecError::Decode {
                format: format_name.clone(),
                message: e.to_string(),
            })?;

        let orientation = embedded_orientation(&bytes);

        debug!(
            "Opened {} as {} ({}x{}, {:?})",
            source.identifier(),
            format_name,
            width,
            height,
            orientation
        );

        Ok(Box::new(RasterHandle {
            source: Some(source),
            bytes: Some(bytes),
            format,
            format_name,
            dimensions: Dimension::new(width, height),
            orientation,
            decoded: None,
        }))
    }
}

fn format_name(format: ImageFormat) -> String {
    match Format::from_image_format(format) {
        Some(f) => f.to_string(),
        None => format!("{:?}", format).to_lowercase(),
    }
}

/// How a single-level raster stores its pixels.
fn stored_compression(format: ImageFormat) -> Compression {
    match format {
        ImageFormat::Jpeg => Compression::Jpeg,
        ImageFormat::Png => Compression::Deflate,
        ImageFormat::Gif => Compression::Lzw,
        _ => Compression::Undefined,
    }
}

/// Rotation from the EXIF `Orientation` tag. Missing, invalid and mirrored
/// values read as upright.
fn embedded_orientation(bytes: &[u8]) -> Orientation {
    let mut cursor = Cursor::new(bytes);
    let value = exif::Reader::new()
        .read_from_container(&mut cursor)
        .ok()
        .and_then(|exif| {
            exif.get_field(exif::Tag::Orientation, exif::In::PRIMARY)
                .and_then(|field| field.value.get_uint(0))
        });

    let Some(value) = value else {
        return Orientation::Rotate0;
    };
    match u16::try_from(value).ok().and_then(Orientation::from_exif) {
        Some(orientation) => orientation,
        None => {
            debug!("Ignoring EXIF orientation {}", value);
            Orientation::Rotate0
        }
    }
}

struct RasterHandle {
    source: Option<Box<dyn RangeReader>>,
    bytes: Option<Bytes>,
    format: ImageFormat,
    format_name: String,
    dimensions: Dimension,
    orientation: Orientation,
    decoded: Option<DynamicImage>,
}

impl RasterHandle {
    fn check_level(&self, level: usize) -> Result<(), CodecError> {
        if level != 0 {
            return Err(CodecError::UnsupportedFormat {
                format: self.format_name.clone(),
                reason: format!("level {} requested from a single-level image", level),
            });
        }
        Ok(())
    }

    fn decoded(&mut self) -> Result<&DynamicImage, CodecError> {
        if self.decoded.is_none() {
            let bytes = self
                .bytes
                .as_ref()
                .ok_or_else(|| IoError::Read("source has been released".to_string()))?;
            let image = image::load_from_memory_with_format(bytes, self.format).map_err(|e| {
                CodecError::Decode {
                    format: self.format_name.clone(),
                    message: e.to_string(),
                }
            })?;
            debug!(
                "Decoded {}x{} {} image",
                image.width(),
                image.height(),
                self.format_name
            );
            self.decoded = Some(image);
        }
        self.decoded.as_ref().ok_or_else(|| CodecError::Decode {
            format: self.format_name.clone(),
            message: "no decoded image".to_string(),
        })
    }
}

#[async_trait]
impl DecodeHandle for RasterHandle {
    fn format_name(&self) -> &str {
        &self.format_name
    }

    fn level_count(&self) -> LevelCount {
        LevelCount::Known(1)
    }

    async fn scan_level_count(&mut self) -> Result<usize, CodecError> {
        Ok(1)
    }

    fn dimensions(&self, level: usize) -> Option<Dimension> {
        (level == 0).then_some(self.dimensions)
    }

    fn tile_dimensions(&self, level: usize) -> Option<Dimension> {
        self.dimensions(level)
    }

    fn compression(&self, level: usize) -> Compression {
        if level == 0 {
            stored_compression(self.format)
        } else {
            Compression::Undefined
        }
    }

    fn orientation(&self) -> Orientation {
        self.orientation
    }

    async fn read_region(
        &mut self,
        level: usize,
        region: Rectangle,
    ) -> Result<DynamicImage, CodecError> {
        self.check_level(level)?;
        let image = self.decoded()?;
        Ok(image.crop_imm(region.x, region.y, region.width, region.height))
    }

    async fn read_full(&mut self, level: usize) -> Result<DynamicImage, CodecError> {
        self.check_level(level)?;
        Ok(self.decoded()?.clone())
    }

    fn dispose(&mut self) {
        self.decoded = None;
        self.bytes = None;
        self.source = None;
    }
}
