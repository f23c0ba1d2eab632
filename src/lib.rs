//! # pyramid-region
//!
//! Extract exactly the pixels a client asked for from a possibly very large,
//! multi-resolution, tiled source image, decoding as few pixels as possible.
//!
//! ## Features
//!
//! - **Operation model**: an ordered list of crop, scale, rotate, color,
//!   transpose and metadata operations, frozen into an immutable value with a
//!   canonical string form and a deterministic cache key
//! - **Level selection**: picks the smallest resolution level that can still
//!   satisfy the requested crop and scale
//! - **Tile-aware reads**: decodes only the region covering the request, never
//!   a whole level for a region
//! - **Pixel normalization**: decoded buffers come back in a standard 8-bit
//!   layout
//!
//! ## Architecture
//!
//! - [`operation`] - Operations, operation lists, formats
//! - [`level`] - Resolution level selection
//! - [`reader`] - Region reader over a decode capability
//! - [`codec`] - Decode capability traits and the `image`-backed raster codec
//! - [`normalize`] - Pixel layout normalization
//! - [`io`] - Byte sources (memory, local file)
//! - [`geometry`] - Dimensions, rectangles, orientation
//! - [`config`] - CLI configuration
//!
//! ## Example
//!
//! ```rust,no_run
//! use pyramid_region::{
//!     Crop, FileReader, Format, Orientation, OperationListBuilder, RasterCodec, RegionReader,
//!     Scale,
//! };
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let mut builder = OperationListBuilder::with_identifier("sample.png");
//!     builder
//!         .push(Crop::pixels(0, 0, 512, 512))
//!         .push(Scale::AspectFitWidth { width: 128 })
//!         .set_output_format(Format::Png);
//!     let ops = builder.freeze();
//!
//!     let source = FileReader::open("sample.png").await?;
//!     let mut reader = RegionReader::new(RasterCodec::new(), source);
//!     let read = reader.read(&ops, Orientation::Rotate0).await?;
//!     println!("{} -> {}x{}", ops.to_filename(), read.image.width(), read.image.height());
//!     Ok(())
//! }
//! ```

pub mod codec;
pub mod config;
pub mod error;
pub mod geometry;
pub mod io;
pub mod level;
pub mod normalize;
pub mod operation;
pub mod reader;

pub use codec::{Codec, DecodeHandle, LevelCount, RasterCodec, TileGrid, TileSpan};
pub use error::{CodecError, IoError, ReadError, ValidationError};
pub use geometry::{Dimension, Orientation, Rectangle};
pub use io::{FileReader, MemoryReader, RangeReader};
pub use level::{select_best_level, LevelSelection, ReductionFactor};
pub use normalize::{normalize, Normalized};
pub use operation::{
    ColorTransform, Compression, Crop, Format, Identifier, MetadataCopy, Operation, OperationKind,
    OperationList, OperationListBuilder, Rotate, Scale, ScaleMode, Transpose,
};
pub use reader::{Hint, RegionRead, RegionReader};
