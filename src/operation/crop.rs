use std::fmt;

use serde_json::{json, Value};

use super::format_number;
use crate::error::ValidationError;
use crate::geometry::{Dimension, Orientation, Rectangle};

/// Crop to a region of the image.
///
/// Regions are given either in pixels or as fractions (0-1) of the full
/// dimensions. A client's crop is expressed in display orientation; use
/// [`Crop::apply_orientation`] to move it into raw pixel space.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub enum Crop {
    /// No crop.
    #[default]
    Full,
    Pixels {
        x: u32,
        y: u32,
        width: u32,
        height: u32,
    },
    /// Fractions of the full width and height.
    Percent {
        x: f64,
        y: f64,
        width: f64,
        height: f64,
    },
}

impl Crop {
    pub fn pixels(x: u32, y: u32, width: u32, height: u32) -> Self {
        Crop::Pixels {
            x,
            y,
            width,
            height,
        }
    }

    pub fn percent(x: f64, y: f64, width: f64, height: f64) -> Self {
        Crop::Percent {
            x,
            y,
            width,
            height,
        }
    }

    /// The region this crop selects from an image of size `full`, clipped to
    /// the image bounds.
    pub fn rectangle(&self, full: Dimension) -> Rectangle {
        match *self {
            Crop::Full => Rectangle::full(full),
            Crop::Pixels {
                x,
                y,
                width,
                height,
            } => Rectangle::new(x, y, width, height).intersect(full),
            Crop::Percent {
                x,
                y,
                width,
                height,
            } => {
                let px = |v: f64, extent: u32| (v * extent as f64).round().max(0.0) as u32;
                Rectangle::new(
                    px(x, full.width),
                    px(y, full.height),
                    px(width, full.width),
                    px(height, full.height),
                )
                .intersect(full)
            }
        }
    }

    pub fn has_effect(&self) -> bool {
        match *self {
            Crop::Full => false,
            Crop::Pixels { .. } => true,
            Crop::Percent {
                x,
                y,
                width,
                height,
            } => !(x <= 0.0 && y <= 0.0 && width >= 1.0 && height >= 1.0),
        }
    }

    pub fn has_effect_on(&self, full: Dimension) -> bool {
        self.rectangle(full) != Rectangle::full(full)
    }

    pub fn resulting_size(&self, full: Dimension) -> Dimension {
        self.rectangle(full).size()
    }

    /// Remap a display-space crop into the raw space of an image whose raw
    /// dimensions are `raw`.
    ///
    /// A full crop stays full; anything else becomes a pixel crop.
    pub fn apply_orientation(&self, orientation: Orientation, raw: Dimension) -> Crop {
        if matches!(self, Crop::Full) || orientation == Orientation::Rotate0 {
            return *self;
        }
        let display = self.rectangle(orientation.display_dimension(raw));
        let r = orientation.to_raw(display, raw);
        Crop::pixels(r.x, r.y, r.width, r.height)
    }

    pub fn validate(&self, full: Dimension) -> Result<(), ValidationError> {
        match *self {
            Crop::Full => Ok(()),
            Crop::Pixels {
                x,
                y,
                width,
                height,
            } => {
                if width == 0 || height == 0 {
                    return Err(ValidationError::EmptyCrop {
                        width: width as f64,
                        height: height as f64,
                    });
                }
                if x >= full.width || y >= full.height {
                    return Err(ValidationError::CropOutOfBounds {
                        x,
                        y,
                        width: full.width,
                        height: full.height,
                    });
                }
                Ok(())
            }
            Crop::Percent {
                x,
                y,
                width,
                height,
            } => {
                for (field, value) in [("x", x), ("y", y), ("width", width), ("height", height)] {
                    if !(0.0..=1.0).contains(&value) {
                        return Err(ValidationError::InvalidPercent { field, value });
                    }
                }
                if width <= 0.0 || height <= 0.0 {
                    return Err(ValidationError::EmptyCrop { width, height });
                }
                Ok(())
            }
        }
    }

    pub fn to_map(&self, full: Dimension) -> Value {
        let r = self.rectangle(full);
        json!({
            "class": "Crop",
            "x": r.x,
            "y": r.y,
            "width": r.width,
            "height": r.height,
        })
    }
}

impl fmt::Display for Crop {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match *self {
            Crop::Full => f.write_str("full"),
            Crop::Pixels {
                x,
                y,
                width,
                height,
            } => write!(f, "{},{},{},{}", x, y, width, height),
            Crop::Percent {
                x,
                y,
                width,
                height,
            } => write!(
                f,
                "{}%,{}%,{}%,{}%",
                format_number(x * 100.0),
                format_number(y * 100.0),
                format_number(width * 100.0),
                format_number(height * 100.0)
            ),
        }
    }
}
