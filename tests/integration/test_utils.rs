//! Test utilities for integration tests.
//!
//! This module provides mock decode capabilities that behave like pyramidal,
//! tiled sources, plus helpers for building real PNG and JPEG fixtures in
//! memory.

use std::io::Cursor;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use bytes::Bytes;
use image::codecs::jpeg::JpegEncoder;
use image::{DynamicImage, ImageBuffer, ImageFormat, Rgb, RgbImage};

use pyramid_region::codec::{Codec, DecodeHandle, LevelCount};
use pyramid_region::error::{CodecError, IoError};
use pyramid_region::geometry::{Dimension, Orientation, Rectangle};
use pyramid_region::io::RangeReader;
use pyramid_region::operation::{Compression, Format};

// =============================================================================
// Mock Pyramid Codec
// =============================================================================

/// A decode request seen by [`MockPyramidCodec`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Request {
    Region { level: usize, region: Rectangle },
    Full { level: usize },
}

/// Pixel value of a mock level: red is x, green is y, blue is the level.
pub fn mock_pixel(x: u32, y: u32, level: usize) -> Rgb<u8> {
    Rgb([(x % 256) as u8, (y % 256) as u8, level as u8])
}

/// A multi-level, optionally tiled source that synthesizes its pixels and
/// records every decode request.
#[derive(Clone)]
pub struct MockPyramidCodec {
    levels: Vec<Dimension>,
    tile: Option<Dimension>,
    unknown_level_count: bool,
    sixteen_bit: bool,
    oversized_regions: bool,
    empty_results: bool,
    compression: Compression,
    orientation: Orientation,
    requests: Arc<Mutex<Vec<Request>>>,
    scans: Arc<AtomicUsize>,
    disposals: Arc<AtomicUsize>,
}

impl MockPyramidCodec {
    pub fn new(levels: Vec<Dimension>) -> Self {
        Self {
            levels,
            tile: None,
            unknown_level_count: false,
            sixteen_bit: false,
            oversized_regions: false,
            empty_results: false,
            compression: Compression::Jpeg,
            orientation: Orientation::Rotate0,
            requests: Arc::new(Mutex::new(Vec::new())),
            scans: Arc::new(AtomicUsize::new(0)),
            disposals: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// Levels that halve in size from `width` x `height`.
    pub fn halving(width: u32, height: u32, count: usize) -> Self {
        Self::new(
            (0..count)
                .map(|i| Dimension::new(width >> i, height >> i))
                .collect(),
        )
    }

    pub fn with_tiles(mut self, width: u32, height: u32) -> Self {
        self.tile = Some(Dimension::new(width, height));
        self
    }

    /// Report [`LevelCount::Unknown`] from the cheap query.
    pub fn with_unknown_level_count(mut self) -> Self {
        self.unknown_level_count = true;
        self
    }

    /// Decode to 16-bit RGB.
    pub fn with_sixteen_bit(mut self) -> Self {
        self.sixteen_bit = true;
        self
    }

    /// Return whole tiles instead of the exact region.
    pub fn with_oversized_regions(mut self) -> Self {
        self.oversized_regions = true;
        self
    }

    /// Return zero-sized images.
    pub fn with_empty_results(mut self) -> Self {
        self.empty_results = true;
        self
    }

    /// Report `orientation` as the embedded orientation.
    pub fn with_orientation(mut self, orientation: Orientation) -> Self {
        self.orientation = orientation;
        self
    }

    pub fn with_compression(mut self, compression: Compression) -> Self {
        self.compression = compression;
        self
    }

    pub fn requests(&self) -> Vec<Request> {
        self.requests.lock().unwrap().clone()
    }

    pub fn scan_count(&self) -> usize {
        self.scans.load(Ordering::SeqCst)
    }

    pub fn dispose_count(&self) -> usize {
        self.disposals.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Codec for MockPyramidCodec {
    fn name(&self) -> &str {
        "mock-pyramid"
    }

    async fn open(
        &self,
        source: Box<dyn RangeReader>,
        _format_hint: Option<Format>,
    ) -> Result<Box<dyn DecodeHandle>, CodecError> {
        // Touch the source so I/O failures surface on open
        if source.size() > 0 {
            source.read_exact_at(0, 1).await?;
        }
        Ok(Box::new(MockPyramidHandle {
            config: self.clone(),
            _source: Some(source),
        }))
    }
}

struct MockPyramidHandle {
    config: MockPyramidCodec,
    _source: Option<Box<dyn RangeReader>>,
}

impl MockPyramidHandle {
    fn render(&self, level: usize, rect: Rectangle) -> DynamicImage {
        if self.config.empty_results {
            return DynamicImage::new_rgb8(0, 0);
        }
        let image: RgbImage = ImageBuffer::from_fn(rect.width, rect.height, |dx, dy| {
            mock_pixel(rect.x + dx, rect.y + dy, level)
        });
        if self.config.sixteen_bit {
            DynamicImage::ImageRgb16(DynamicImage::ImageRgb8(image).to_rgb16())
        } else {
            DynamicImage::ImageRgb8(image)
        }
    }

    fn record(&self, request: Request) {
        self.config.requests.lock().unwrap().push(request);
    }
}

#[async_trait]
impl DecodeHandle for MockPyramidHandle {
    fn format_name(&self) -> &str {
        "mock"
    }

    fn level_count(&self) -> LevelCount {
        if self.config.unknown_level_count {
            LevelCount::Unknown
        } else {
            LevelCount::Known(self.config.levels.len())
        }
    }

    async fn scan_level_count(&mut self) -> Result<usize, CodecError> {
        self.config.scans.fetch_add(1, Ordering::SeqCst);
        Ok(self.config.levels.len())
    }

    fn dimensions(&self, level: usize) -> Option<Dimension> {
        self.config.levels.get(level).copied()
    }

    fn tile_dimensions(&self, level: usize) -> Option<Dimension> {
        let size = self.dimensions(level)?;
        Some(self.config.tile.unwrap_or(size))
    }

    fn compression(&self, level: usize) -> Compression {
        if level < self.config.levels.len() {
            self.config.compression
        } else {
            Compression::Undefined
        }
    }

    fn orientation(&self) -> Orientation {
        self.config.orientation
    }

    async fn read_region(
        &mut self,
        level: usize,
        region: Rectangle,
    ) -> Result<DynamicImage, CodecError> {
        self.record(Request::Region { level, region });
        let bounds = self.config.levels[level];

        let rect = match self.config.tile {
            Some(tile) if self.config.oversized_regions => {
                let end_x = (region.x + region.width).div_ceil(tile.width) * tile.width;
                let end_y = (region.y + region.height).div_ceil(tile.height) * tile.height;
                Rectangle::new(
                    region.x,
                    region.y,
                    end_x.min(bounds.width) - region.x,
                    end_y.min(bounds.height) - region.y,
                )
            }
            _ => region,
        };

        Ok(self.render(level, rect))
    }

    async fn read_full(&mut self, level: usize) -> Result<DynamicImage, CodecError> {
        self.record(Request::Full { level });
        let bounds = self.config.levels[level];
        Ok(self.render(level, Rectangle::full(bounds)))
    }

    fn dispose(&mut self) {
        self.config.disposals.fetch_add(1, Ordering::SeqCst);
        self._source = None;
    }
}

// =============================================================================
// Byte Sources
// =============================================================================

/// A source whose every read fails.
pub struct FailingReader {
    size: u64,
}

impl FailingReader {
    pub fn new(size: u64) -> Self {
        Self { size }
    }
}

#[async_trait]
impl RangeReader for FailingReader {
    async fn read_exact_at(&self, _offset: u64, _len: usize) -> Result<Bytes, IoError> {
        Err(IoError::Read("connection reset".to_string()))
    }

    fn size(&self) -> u64 {
        self.size
    }

    fn identifier(&self) -> &str {
        "failing"
    }
}

// =============================================================================
// Image Fixtures
// =============================================================================

/// Create a PNG whose pixels follow [`mock_pixel`] at level 0.
pub fn create_test_png(width: u32, height: u32) -> Vec<u8> {
    let img: RgbImage = ImageBuffer::from_fn(width, height, |x, y| mock_pixel(x, y, 0));
    let mut buf = Vec::new();
    DynamicImage::ImageRgb8(img)
        .write_to(&mut Cursor::new(&mut buf), ImageFormat::Png)
        .unwrap();
    buf
}

/// Create a test JPEG carrying an EXIF orientation tag with `value`.
///
/// The APP1 segment holds a big-endian TIFF header and a single IFD0 entry.
pub fn create_test_jpeg_with_orientation(width: u32, height: u32, value: u16) -> Vec<u8> {
    let jpeg = create_test_jpeg(width, height, 90);
    let [hi, lo] = value.to_be_bytes();

    let mut app1 = vec![0xFF, 0xE1, 0x00, 0x22];
    app1.extend_from_slice(b"Exif\0\0");
    app1.extend_from_slice(&[b'M', b'M', 0x00, 0x2A, 0x00, 0x00, 0x00, 0x08]);
    app1.extend_from_slice(&[0x00, 0x01]);
    app1.extend_from_slice(&[0x01, 0x12, 0x00, 0x03, 0x00, 0x00, 0x00, 0x01, hi, lo, 0x00, 0x00]);
    app1.extend_from_slice(&[0x00, 0x00, 0x00, 0x00]);

    // Right after SOI
    let mut buf = jpeg[..2].to_vec();
    buf.extend_from_slice(&app1);
    buf.extend_from_slice(&jpeg[2..]);
    buf
}

/// Create a test RGB JPEG image.
pub fn create_test_jpeg(width: u32, height: u32, quality: u8) -> Vec<u8> {
    let img = RgbImage::from_fn(width, height, |x, y| {
        let r = (x % 256) as u8;
        let g = (y % 256) as u8;
        let b = ((x + y) % 256) as u8;
        Rgb([r, g, b])
    });

    let mut buf = Vec::new();
    let mut encoder = JpegEncoder::new_with_quality(&mut buf, quality);
    encoder.encode_image(&img).unwrap();
    buf
}
