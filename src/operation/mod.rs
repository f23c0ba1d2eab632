//! Operation model.
//!
//! A request for a derivative image is described by an ordered sequence of
//! [`Operation`]s plus output settings. The sequence is assembled in an
//! [`OperationListBuilder`] and then frozen into an immutable
//! [`OperationList`], which is what every consumer (level selector, region
//! reader, cache layer) reads.
//!
//! # Operations
//!
//! | Variant            | Changes pixel extents | Counts as an effect            |
//! |--------------------|-----------------------|--------------------------------|
//! | [`Crop`]           | yes                   | unless it covers the full image|
//! | [`Scale`]          | yes                   | unless full / 100%             |
//! | [`Rotate`]         | no                    | unless a multiple of 360°      |
//! | [`ColorTransform`] | no                    | always                         |
//! | [`Transpose`]      | no                    | always                         |
//! | [`MetadataCopy`]   | no                    | never                          |
//!
//! Operations never merge. Two operations of the same variant apply one after
//! the other, in list order.

mod crop;
mod format;
mod list;
mod scale;
mod transform;

use std::fmt;

use serde_json::Value;

use crate::error::ValidationError;
use crate::geometry::Dimension;

pub use crop::Crop;
pub use format::{Compression, Format, Identifier};
pub use list::{OperationList, OperationListBuilder};
pub use scale::{Scale, ScaleMode};
pub use transform::{ColorTransform, MetadataCopy, Rotate, Transpose};

// =============================================================================
// Operation
// =============================================================================

/// Discriminant of an [`Operation`], used for lookups like
/// [`OperationList::first`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OperationKind {
    Crop,
    Scale,
    Rotate,
    ColorTransform,
    Transpose,
    MetadataCopy,
}

/// One transformation step.
#[derive(Debug, Clone, PartialEq)]
pub enum Operation {
    Crop(Crop),
    Scale(Scale),
    Rotate(Rotate),
    ColorTransform(ColorTransform),
    Transpose(Transpose),
    MetadataCopy(MetadataCopy),
}

impl Operation {
    pub fn kind(&self) -> OperationKind {
        match self {
            Operation::Crop(_) => OperationKind::Crop,
            Operation::Scale(_) => OperationKind::Scale,
            Operation::Rotate(_) => OperationKind::Rotate,
            Operation::ColorTransform(_) => OperationKind::ColorTransform,
            Operation::Transpose(_) => OperationKind::Transpose,
            Operation::MetadataCopy(_) => OperationKind::MetadataCopy,
        }
    }

    /// Whether this operation changes the image, judged without knowing the
    /// image size.
    ///
    /// Pixel crops are assumed to have an effect; use [`Self::has_effect_on`]
    /// when the size is known.
    pub fn has_effect(&self) -> bool {
        match self {
            Operation::Crop(crop) => crop.has_effect(),
            Operation::Scale(scale) => scale.has_effect(),
            Operation::Rotate(rotate) => rotate.has_effect(),
            Operation::ColorTransform(_) | Operation::Transpose(_) => true,
            Operation::MetadataCopy(_) => false,
        }
    }

    /// Whether this operation changes an image of size `full`.
    pub fn has_effect_on(&self, full: Dimension) -> bool {
        match self {
            Operation::Crop(crop) => crop.has_effect_on(full),
            Operation::Scale(scale) => scale.has_effect_on(full),
            _ => self.has_effect(),
        }
    }

    /// Whether this operation belongs in the canonical sequence used for
    /// serialization and equality.
    ///
    /// Metadata copies never change pixels but do change the output, so they
    /// are kept.
    pub fn is_significant(&self) -> bool {
        self.has_effect() || matches!(self, Operation::MetadataCopy(_))
    }

    /// Size of the image after applying this operation to one of size `full`.
    pub fn resulting_size(&self, full: Dimension) -> Dimension {
        match self {
            Operation::Crop(crop) => crop.resulting_size(full),
            Operation::Scale(scale) => scale.resulting_size(full),
            _ => full,
        }
    }

    /// Check the operation's parameters against an image of size `full`.
    pub fn validate(&self, full: Dimension) -> Result<(), ValidationError> {
        match self {
            Operation::Crop(crop) => crop.validate(full),
            Operation::Scale(scale) => scale.validate(),
            Operation::Rotate(rotate) => rotate.validate(),
            _ => Ok(()),
        }
    }

    /// Structured description of the operation applied to an image of size
    /// `full`.
    pub fn to_map(&self, full: Dimension) -> Value {
        match self {
            Operation::Crop(crop) => crop.to_map(full),
            Operation::Scale(scale) => scale.to_map(full),
            Operation::Rotate(rotate) => rotate.to_map(),
            Operation::ColorTransform(color) => color.to_map(),
            Operation::Transpose(transpose) => transpose.to_map(),
            Operation::MetadataCopy(copy) => copy.to_map(),
        }
    }
}

/// The canonical fragment, e.g. `crop:5,6,20,22` or `rotate:15`.
impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Operation::Crop(crop) => write!(f, "crop:{}", crop),
            Operation::Scale(scale) => write!(f, "scale:{}", scale),
            Operation::Rotate(rotate) => write!(f, "rotate:{}", rotate),
            Operation::ColorTransform(color) => write!(f, "colortransform:{}", color),
            Operation::Transpose(transpose) => write!(f, "transpose:{}", transpose),
            Operation::MetadataCopy(_) => f.write_str("metadatacopy"),
        }
    }
}

impl From<Crop> for Operation {
    fn from(crop: Crop) -> Self {
        Operation::Crop(crop)
    }
}

impl From<Scale> for Operation {
    fn from(scale: Scale) -> Self {
        Operation::Scale(scale)
    }
}

impl From<Rotate> for Operation {
    fn from(rotate: Rotate) -> Self {
        Operation::Rotate(rotate)
    }
}

impl From<ColorTransform> for Operation {
    fn from(color: ColorTransform) -> Self {
        Operation::ColorTransform(color)
    }
}

impl From<Transpose> for Operation {
    fn from(transpose: Transpose) -> Self {
        Operation::Transpose(transpose)
    }
}

impl From<MetadataCopy> for Operation {
    fn from(copy: MetadataCopy) -> Self {
        Operation::MetadataCopy(copy)
    }
}

/// Shortest text form of a number, e.g. `15` or `0.5`.
pub(crate) fn format_number(value: f64) -> String {
    format!("{}", value)
}

// =============================================================================
// Tests
// =============================================================================
