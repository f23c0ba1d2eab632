//! Decode capabilities.
//!
//! A [`Codec`] turns a byte source into a [`DecodeHandle`], which exposes the
//! source's resolution levels and decodes rectangular regions out of them.
//! The region reader only ever talks to these two traits, so any format with
//! a decoder can be plugged in: single-level rasters, pyramidal TIFFs, JPEG
//! 2000 with resolution reductions, and so on.
//!
//! # Level inventory
//!
//! Some containers can only tell how many levels they hold by walking every
//! directory in the file. [`DecodeHandle::level_count`] is the cheap query;
//! it may answer [`LevelCount::Unknown`], in which case the caller falls back
//! to [`DecodeHandle::scan_level_count`].
//!
//! # Metadata
//!
//! Handles also report how each level's pixels are stored
//! ([`DecodeHandle::compression`]) and the rotation recorded in the source's
//! embedded metadata ([`DecodeHandle::orientation`]).
//!
//! # Regions
//!
//! [`DecodeHandle::read_region`] must decode only what is needed to cover
//! the requested rectangle. For tiled levels that means the covering tile
//! span (see [`TileGrid`]); the whole level is never decoded to serve a
//! region.

mod grid;
mod raster;

use async_trait::async_trait;
use image::DynamicImage;

use crate::error::CodecError;
use crate::geometry::{Dimension, Orientation, Rectangle};
use crate::io::RangeReader;
use crate::operation::{Compression, Format};

pub use grid::{TileGrid, TileSpan};
pub use raster::RasterCodec;

/// Result of the cheap level-count query.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LevelCount {
    Known(usize),
    /// The container must be scanned to find out.
    Unknown,
}

impl LevelCount {
    pub fn known(&self) -> Option<usize> {
        match *self {
            LevelCount::Known(n) => Some(n),
            LevelCount::Unknown => None,
        }
    }
}

/// Factory for decode handles.
#[async_trait]
pub trait Codec: Send + Sync {
    /// Short name used in logs.
    fn name(&self) -> &str;

    /// Open `source` for decoding.
    ///
    /// `format_hint` is the format the caller believes the source to be in,
    /// usually inferred from its identifier. Codecs may ignore it and sniff
    /// the bytes instead.
    async fn open(
        &self,
        source: Box<dyn RangeReader>,
        format_hint: Option<Format>,
    ) -> Result<Box<dyn DecodeHandle>, CodecError>;
}

/// An open source. Owns its byte source until [`DecodeHandle::dispose`].
///
/// Level 0 is the full-resolution image; higher indices are smaller.
#[async_trait]
pub trait DecodeHandle: Send {
    /// Name of the format as the decoder reports it, e.g. `png`.
    fn format_name(&self) -> &str;

    /// Cheap level-count query.
    fn level_count(&self) -> LevelCount;

    /// Exhaustively count the levels. May read the whole container.
    async fn scan_level_count(&mut self) -> Result<usize, CodecError>;

    /// Dimensions of a level, or `None` if the level does not exist.
    fn dimensions(&self, level: usize) -> Option<Dimension>;

    /// Tile size of a level. Untiled levels report their own dimensions.
    fn tile_dimensions(&self, level: usize) -> Option<Dimension>;

    /// Compression of a level's stored pixels. [`Compression::Undefined`]
    /// when the decoder cannot tell or the level does not exist.
    fn compression(&self, level: usize) -> Compression;

    /// Rotation recorded in the source's embedded metadata, e.g. the EXIF
    /// `Orientation` tag.
    fn orientation(&self) -> Orientation {
        Orientation::Rotate0
    }

    /// Decode the given rectangle of a level.
    ///
    /// `region` is already clipped to the level bounds. Implementations may
    /// return a larger buffer anchored at the region origin (whole tiles, for
    /// instance); the caller crops it.
    async fn read_region(
        &mut self,
        level: usize,
        region: Rectangle,
    ) -> Result<DynamicImage, CodecError>;

    /// Decode a whole level.
    async fn read_full(&mut self, level: usize) -> Result<DynamicImage, CodecError>;

    /// Release decoder state and the byte source.
    fn dispose(&mut self) {}
}
