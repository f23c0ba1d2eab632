//! Pixel geometry shared by the operation model, the level selector and the
//! region reader.
//!
//! All extents are unsigned pixel counts. A [`Rectangle`] is always clipped
//! against the [`Dimension`] that contains it before it is used to read
//! pixels, so no read can reach past the right or bottom edge of an image.

use serde::Serialize;

// =============================================================================
// Dimension
// =============================================================================

/// Pixel extents of a full image or of one resolution level.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize)]
pub struct Dimension {
    pub width: u32,
    pub height: u32,
}

impl Dimension {
    pub const fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }

    /// Total number of pixels.
    pub fn area(&self) -> u64 {
        self.width as u64 * self.height as u64
    }

    /// True if either extent is zero.
    pub fn is_empty(&self) -> bool {
        self.width == 0 || self.height == 0
    }

    /// Width and height swapped.
    pub fn transposed(&self) -> Self {
        Self::new(self.height, self.width)
    }
}

impl std::fmt::Display for Dimension {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}x{}", self.width, self.height)
    }
}

// =============================================================================
// Rectangle
// =============================================================================

/// An integer region in some coordinate space.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize)]
pub struct Rectangle {
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
}

impl Rectangle {
    pub const fn new(x: u32, y: u32, width: u32, height: u32) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    /// A rectangle covering the whole of `size`.
    pub const fn full(size: Dimension) -> Self {
        Self::new(0, 0, size.width, size.height)
    }

    pub fn size(&self) -> Dimension {
        Dimension::new(self.width, self.height)
    }

    pub fn is_empty(&self) -> bool {
        self.width == 0 || self.height == 0
    }

    /// Clip this rectangle so it lies within `bounds`.
    ///
    /// The origin is clamped to the bounds and the extent is reduced to
    /// `min(extent, bounds - origin)`. A rectangle that starts past the edge
    /// comes back empty.
    pub fn intersect(&self, bounds: Dimension) -> Self {
        let x = self.x.min(bounds.width);
        let y = self.y.min(bounds.height);
        let width = self.width.min(bounds.width - x);
        let height = self.height.min(bounds.height - y);
        Self::new(x, y, width, height)
    }

    /// Multiply every coordinate by `scale`, rounding to the nearest integer.
    pub fn scaled(&self, scale: f64) -> Self {
        let s = |v: u32| (v as f64 * scale).round() as u32;
        Self::new(s(self.x), s(self.y), s(self.width), s(self.height))
    }
}

impl std::fmt::Display for Rectangle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{},{}/{}x{}", self.x, self.y, self.width, self.height)
    }
}

// =============================================================================
// Orientation
// =============================================================================

/// Rotation baked into the raw pixel data of a source image, as reported by
/// embedded metadata.
///
/// Clients express crops in display orientation. Before reading, a crop has
/// to be mapped back into the raw coordinate space with [`Orientation::to_raw`].
///
/// ```text
///   raw (w x h)          Rotate90 display (h x w)
///   ┌──────┐             ┌───┐
///   │ F    │             │  F│
///   │      │             │   │
///   └──────┘             │   │
///                        └───┘
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize)]
pub enum Orientation {
    #[default]
    Rotate0,
    /// Raw data must be rotated 90° clockwise for display.
    Rotate90,
    Rotate180,
    /// Raw data must be rotated 270° clockwise for display.
    Rotate270,
}

impl Orientation {
    /// Orientation for a clockwise rotation in degrees. Only right angles map.
    pub fn from_degrees(degrees: u32) -> Option<Self> {
        match degrees % 360 {
            0 => Some(Self::Rotate0),
            90 => Some(Self::Rotate90),
            180 => Some(Self::Rotate180),
            270 => Some(Self::Rotate270),
            _ => None,
        }
    }

    /// Orientation for an EXIF `Orientation` tag value.
    ///
    /// Mirrored orientations (2, 4, 5, 7) carry a flip and are not
    /// representable, so they map to `None` along with invalid values.
    pub fn from_exif(value: u16) -> Option<Self> {
        match value {
            1 => Some(Self::Rotate0),
            3 => Some(Self::Rotate180),
            6 => Some(Self::Rotate90),
            8 => Some(Self::Rotate270),
            _ => None,
        }
    }

    pub fn degrees(&self) -> u32 {
        match self {
            Self::Rotate0 => 0,
            Self::Rotate90 => 90,
            Self::Rotate180 => 180,
            Self::Rotate270 => 270,
        }
    }

    pub fn swaps_axes(&self) -> bool {
        matches!(self, Self::Rotate90 | Self::Rotate270)
    }

    /// Dimensions of the image as displayed, given its raw dimensions.
    pub fn display_dimension(&self, raw: Dimension) -> Dimension {
        if self.swaps_axes() {
            raw.transposed()
        } else {
            raw
        }
    }

    /// Map a rectangle from display coordinates into raw coordinates.
    ///
    /// The rectangle is clipped against the display dimensions first, so the
    /// result always lies within `raw`.
    pub fn to_raw(&self, display_rect: Rectangle, raw: Dimension) -> Rectangle {
        let r = display_rect.intersect(self.display_dimension(raw));
        let (sw, sh) = (raw.width, raw.height);

        match self {
            Self::Rotate0 => r,
            Self::Rotate90 => Rectangle::new(r.y, sh - r.x - r.width, r.height, r.width),
            Self::Rotate180 => {
                Rectangle::new(sw - r.x - r.width, sh - r.y - r.height, r.width, r.height)
            }
            Self::Rotate270 => Rectangle::new(sw - r.y - r.height, r.x, r.height, r.width),
        }
    }
}

// =============================================================================
// Tests
// =============================================================================
