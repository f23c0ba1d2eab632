//! Tile-aware region reader.
//!
//! [`RegionReader`] owns one byte source and, once opened, one decode handle.
//! It answers "give me these pixels at this scale" by picking the cheapest
//! resolution level and decoding only the region that covers the request.
//!
//! # Lifecycle
//!
//! ```text
//!            open() / first use            dispose() / drop
//! Unopened ───────────────────▶ Open ─────────────────────▶ Disposed
//!     │                                                       ▲
//!     └───────────────────── dispose() ──────────────────────┘
//! ```
//!
//! Disposing releases the decode handle and the byte source together, once.
//! Any read after that fails with [`ReadError::Disposed`].
//!
//! A reader is meant for a single request. Its methods take `&mut self` and
//! it is not `Sync`.

use std::collections::HashSet;

use image::DynamicImage;
use tracing::{debug, info};

use crate::codec::{Codec, DecodeHandle, LevelCount, TileGrid};
use crate::error::ReadError;
use crate::geometry::{Dimension, Orientation, Rectangle};
use crate::io::RangeReader;
use crate::level::{select_best_level, ReductionFactor};
use crate::normalize::normalize;
use crate::operation::{Compression, Format, OperationList};

// =============================================================================
// Hints
// =============================================================================

/// Facts about a read that downstream processing should know about.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Hint {
    /// The returned image is already cropped to the requested region.
    AlreadyCropped,
    /// The decoded pixels were rewritten into a standard 8-bit layout.
    PixelLayoutConverted,
}

/// Output of [`RegionReader::read`].
#[derive(Debug, Clone)]
pub struct RegionRead {
    pub image: DynamicImage,
    /// Level the pixels came from; 0 is full resolution.
    pub level: usize,
    pub reduction_factor: ReductionFactor,
    pub hints: HashSet<Hint>,
}

// =============================================================================
// Reader
// =============================================================================

enum HandleState {
    Unopened(Box<dyn RangeReader>),
    Open(Box<dyn DecodeHandle>),
    /// Opening failed; the source was consumed by the codec.
    Failed(ReadError),
    Disposed,
}

/// Reads regions of one source image through a [`Codec`].
pub struct RegionReader<C: Codec> {
    codec: C,
    identifier: String,
    format_hint: Option<Format>,
    state: HandleState,
    level_count: Option<usize>,
}

impl<C: Codec> RegionReader<C> {
    /// Create a reader over `source`. Nothing is read until first use.
    pub fn new<R: RangeReader + 'static>(codec: C, source: R) -> Self {
        Self::from_boxed(codec, Box::new(source))
    }

    pub fn from_boxed(codec: C, source: Box<dyn RangeReader>) -> Self {
        Self {
            codec,
            identifier: source.identifier().to_string(),
            format_hint: None,
            state: HandleState::Unopened(source),
            level_count: None,
        }
    }

    /// Format passed to the codec when the source is opened.
    pub fn with_format_hint(mut self, format: Option<Format>) -> Self {
        self.format_hint = format;
        self
    }

    pub fn identifier(&self) -> &str {
        &self.identifier
    }

    pub fn is_open(&self) -> bool {
        matches!(self.state, HandleState::Open(_))
    }

    pub fn is_disposed(&self) -> bool {
        matches!(self.state, HandleState::Disposed)
    }

    /// Open the source if it is not open yet.
    pub async fn open(&mut self) -> Result<(), ReadError> {
        self.handle().await.map(|_| ())
    }

    async fn handle(&mut self) -> Result<&mut Box<dyn DecodeHandle>, ReadError> {
        if let HandleState::Unopened(_) = self.state {
            let HandleState::Unopened(source) =
                std::mem::replace(&mut self.state, HandleState::Disposed)
            else {
                return Err(ReadError::Disposed);
            };

            self.state = match self.codec.open(source, self.format_hint).await {
                Ok(handle) => {
                    info!(
                        "Opened {} with {} codec ({})",
                        self.identifier,
                        self.codec.name(),
                        handle.format_name()
                    );
                    HandleState::Open(handle)
                }
                Err(e) => HandleState::Failed(e.into()),
            };
        }

        match &mut self.state {
            HandleState::Open(handle) => Ok(handle),
            HandleState::Failed(e) => Err(e.clone()),
            HandleState::Disposed | HandleState::Unopened(_) => Err(ReadError::Disposed),
        }
    }

    fn unsupported(handle: &dyn DecodeHandle, reason: impl Into<String>) -> ReadError {
        ReadError::UnsupportedFormat {
            format: handle.format_name().to_string(),
            reason: reason.into(),
        }
    }

    /// Format name reported by the decoder.
    pub async fn format_name(&mut self) -> Result<String, ReadError> {
        Ok(self.handle().await?.format_name().to_string())
    }

    /// Dimensions of the full-resolution level.
    pub async fn full_size(&mut self) -> Result<Dimension, ReadError> {
        let handle = self.handle().await?;
        handle
            .dimensions(0)
            .ok_or_else(|| Self::unsupported(&**handle, "source contains no images"))
    }

    /// Number of resolution levels.
    ///
    /// Uses the codec's cheap query and only scans the container when the
    /// query cannot tell.
    pub async fn level_count(&mut self) -> Result<usize, ReadError> {
        if let Some(count) = self.level_count {
            return Ok(count);
        }

        let handle = self.handle().await?;
        let count = match handle.level_count() {
            LevelCount::Known(n) => {
                debug!("Detected {} level(s)", n);
                n
            }
            LevelCount::Unknown => {
                let n = handle.scan_level_count().await?;
                debug!("Scan revealed {} level(s)", n);
                n
            }
        };

        if count == 0 {
            return Err(Self::unsupported(&**handle, "source contains no images"));
        }

        self.level_count = Some(count);
        Ok(count)
    }

    /// Dimensions of every level, full resolution first.
    pub async fn level_dimensions(&mut self) -> Result<Vec<Dimension>, ReadError> {
        let count = self.level_count().await?;
        let handle = self.handle().await?;
        (0..count)
            .map(|level| {
                handle.dimensions(level).ok_or_else(|| {
                    Self::unsupported(
                        &**handle,
                        format!("level {} has no dimensions", level),
                    )
                })
            })
            .collect()
    }

    /// Tile size of every level, full resolution first.
    pub async fn tile_dimensions(&mut self) -> Result<Vec<Option<Dimension>>, ReadError> {
        let count = self.level_count().await?;
        let handle = self.handle().await?;
        Ok((0..count).map(|level| handle.tile_dimensions(level)).collect())
    }

    /// Compression of a level's stored pixels.
    ///
    /// # Panics
    ///
    /// Panics if `level` is not less than the level count.
    pub async fn compression(&mut self, level: usize) -> Result<Compression, ReadError> {
        let count = self.level_count().await?;
        assert!(
            level < count,
            "level {} out of range for a source with {} level(s)",
            level,
            count
        );
        Ok(self.handle().await?.compression(level))
    }

    /// Rotation recorded in the source's embedded metadata.
    pub async fn orientation(&mut self) -> Result<Orientation, ReadError> {
        Ok(self.handle().await?.orientation())
    }

    /// Decode `region` of `level`.
    ///
    /// The region is clipped to the level bounds, and the returned image is
    /// never larger than the clipped region. Adds [`Hint::AlreadyCropped`].
    ///
    /// # Panics
    ///
    /// Panics if `level` is not less than the level count.
    pub async fn read_region(
        &mut self,
        level: usize,
        region: Rectangle,
        hints: &mut HashSet<Hint>,
    ) -> Result<DynamicImage, ReadError> {
        let count = self.level_count().await?;
        assert!(
            level < count,
            "level {} out of range for a source with {} level(s)",
            level,
            count
        );

        let handle = self.handle().await?;
        let bounds = handle
            .dimensions(level)
            .ok_or_else(|| Self::unsupported(&**handle, format!("level {} has no dimensions", level)))?;
        let clipped = region.intersect(bounds);

        debug!(
            "Acquiring region {} from {} image (level {})",
            clipped, bounds, level
        );

        if clipped.is_empty() {
            return Err(Self::unsupported(
                &**handle,
                format!("region {} does not intersect the {} level", region, bounds),
            ));
        }

        if let Some(grid) = handle
            .tile_dimensions(level)
            .and_then(|tile| TileGrid::new(bounds, tile))
            .filter(TileGrid::is_tiled)
        {
            if let Some(span) = grid.covering(clipped) {
                debug!(
                    "Region {} covers {} ({} of {} tiles)",
                    clipped,
                    span,
                    span.count(),
                    grid.tile_count()
                );
            }
        }

        let mut image = handle.read_region(level, clipped).await?;

        if image.width() == 0 || image.height() == 0 {
            return Err(Self::unsupported(&**handle, "decoder returned an empty image"));
        }
        if image.width() > clipped.width || image.height() > clipped.height {
            image = image.crop_imm(0, 0, clipped.width, clipped.height);
        }

        hints.insert(Hint::AlreadyCropped);
        Ok(Self::normalized(image, hints))
    }

    /// Decode a whole level.
    pub async fn read_full(
        &mut self,
        level: usize,
        hints: &mut HashSet<Hint>,
    ) -> Result<DynamicImage, ReadError> {
        let count = self.level_count().await?;
        assert!(
            level < count,
            "level {} out of range for a source with {} level(s)",
            level,
            count
        );

        let handle = self.handle().await?;
        debug!("Acquiring full level {}", level);
        let image = handle.read_full(level).await?;

        if image.width() == 0 || image.height() == 0 {
            return Err(Self::unsupported(&**handle, "decoder returned an empty image"));
        }

        Ok(Self::normalized(image, hints))
    }

    fn normalized(image: DynamicImage, hints: &mut HashSet<Hint>) -> DynamicImage {
        let normalized = normalize(image);
        if normalized.converted {
            hints.insert(Hint::PixelLayoutConverted);
        }
        normalized.image
    }

    /// Read the pixels `ops` needs from the smallest sufficient level.
    ///
    /// `orientation` is the rotation stored in the raw pixel data. The crop
    /// and scale in `ops` are in display orientation and are mapped into raw
    /// space before reading. Only the first crop and first scale are used;
    /// the rest of the list is left to downstream processing.
    ///
    /// `ops` is validated against the display size before anything is
    /// decoded.
    pub async fn read(
        &mut self,
        ops: &OperationList,
        orientation: Orientation,
    ) -> Result<RegionRead, ReadError> {
        let full = self.full_size().await?;
        ops.validate(orientation.display_dimension(full))?;

        let crop = ops
            .first_crop()
            .copied()
            .unwrap_or_default()
            .apply_orientation(orientation, full);
        let mut scale = ops.first_scale().copied().unwrap_or_default();
        if orientation.swaps_axes() {
            scale = scale.transposed();
        }

        let levels = self.level_dimensions().await?;
        let selection = select_best_level(full, &levels, &crop, &scale);

        let mut hints = HashSet::new();
        let image = if crop.has_effect_on(full) {
            self.read_region(selection.level, selection.region, &mut hints)
                .await?
        } else {
            self.read_full(selection.level, &mut hints).await?
        };

        debug!(
            "Read {}x{} image from level {} ({}x reduction factor)",
            image.width(),
            image.height(),
            selection.level,
            selection.reduction_factor
        );

        Ok(RegionRead {
            image,
            level: selection.level,
            reduction_factor: selection.reduction_factor,
            hints,
        })
    }

    /// Like [`Self::read`], with the orientation taken from the source's
    /// embedded metadata.
    pub async fn read_oriented(&mut self, ops: &OperationList) -> Result<RegionRead, ReadError> {
        let orientation = self.orientation().await?;
        debug!("Embedded orientation of {}: {:?}", self.identifier, orientation);
        self.read(ops, orientation).await
    }

    /// Release the decode handle and the byte source.
    ///
    /// Safe to call any number of times, including before the source was
    /// ever opened.
    pub fn dispose(&mut self) {
        match std::mem::replace(&mut self.state, HandleState::Disposed) {
            HandleState::Open(mut handle) => {
                handle.dispose();
                debug!("Disposed reader for {}", self.identifier);
            }
            HandleState::Unopened(_) | HandleState::Failed(_) => {
                debug!("Disposed unopened reader for {}", self.identifier);
            }
            HandleState::Disposed => {}
        }
    }
}

impl<C: Codec> Drop for RegionReader<C> {
    fn drop(&mut self) {
        self.dispose();
    }
}

impl<C: Codec> std::fmt::Debug for RegionReader<C> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let state = match self.state {
            HandleState::Unopened(_) => "unopened",
            HandleState::Open(_) => "open",
            HandleState::Failed(_) => "failed",
            HandleState::Disposed => "disposed",
        };
        f.debug_struct("RegionReader")
            .field("codec", &self.codec.name())
            .field("identifier", &self.identifier)
            .field("state", &state)
            .finish()
    }
}
