use std::fmt;

use serde_json::{json, Value};

use super::format_number;
use crate::error::ValidationError;
use crate::geometry::{Dimension, Rectangle};

/// How a [`Scale`] derives its output size.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ScaleMode {
    Full,
    AspectFitWidth,
    AspectFitHeight,
    AspectFitInside,
    NonAspectFill,
    Percent,
}

/// Resize the image.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub enum Scale {
    /// Keep the current size.
    #[default]
    Full,
    /// Scale to `width`, keeping the aspect ratio.
    AspectFitWidth { width: u32 },
    /// Scale to `height`, keeping the aspect ratio.
    AspectFitHeight { height: u32 },
    /// Largest size that fits inside `width` x `height`, keeping the aspect
    /// ratio.
    AspectFitInside { width: u32, height: u32 },
    /// Exactly `width` x `height`, ignoring the aspect ratio.
    NonAspectFill { width: u32, height: u32 },
    /// Fraction of the current size (`0.5` = half).
    Percent(f64),
}

impl Scale {
    pub fn mode(&self) -> ScaleMode {
        match self {
            Scale::Full => ScaleMode::Full,
            Scale::AspectFitWidth { .. } => ScaleMode::AspectFitWidth,
            Scale::AspectFitHeight { .. } => ScaleMode::AspectFitHeight,
            Scale::AspectFitInside { .. } => ScaleMode::AspectFitInside,
            Scale::NonAspectFill { .. } => ScaleMode::NonAspectFill,
            Scale::Percent(_) => ScaleMode::Percent,
        }
    }

    pub fn has_effect(&self) -> bool {
        match *self {
            Scale::Full => false,
            Scale::Percent(p) => p != 1.0,
            _ => true,
        }
    }

    pub fn has_effect_on(&self, full: Dimension) -> bool {
        self.has_effect() && self.resulting_size(full) != full
    }

    /// Fraction of the region's width the output needs, if the mode has a
    /// width target.
    pub fn width_ratio(&self, region: Rectangle) -> Option<f64> {
        let target = match *self {
            Scale::AspectFitWidth { width }
            | Scale::AspectFitInside { width, .. }
            | Scale::NonAspectFill { width, .. } => width,
            _ => return None,
        };
        Some(target as f64 / region.width as f64)
    }

    /// Fraction of the region's height the output needs, if the mode has a
    /// height target.
    pub fn height_ratio(&self, region: Rectangle) -> Option<f64> {
        let target = match *self {
            Scale::AspectFitHeight { height }
            | Scale::AspectFitInside { height, .. }
            | Scale::NonAspectFill { height, .. } => height,
            _ => return None,
        };
        Some(target as f64 / region.height as f64)
    }

    pub fn resulting_size(&self, full: Dimension) -> Dimension {
        if full.is_empty() {
            return full;
        }
        let (fw, fh) = (full.width as f64, full.height as f64);
        let round = |v: f64| v.round() as u32;

        match *self {
            Scale::Full => full,
            Scale::AspectFitWidth { width } => {
                let s = width as f64 / fw;
                Dimension::new(width, round(fh * s))
            }
            Scale::AspectFitHeight { height } => {
                let s = height as f64 / fh;
                Dimension::new(round(fw * s), height)
            }
            Scale::AspectFitInside { width, height } => {
                let s = (width as f64 / fw).min(height as f64 / fh);
                Dimension::new(round(fw * s), round(fh * s))
            }
            Scale::NonAspectFill { width, height } => Dimension::new(width, height),
            Scale::Percent(p) => Dimension::new(round(fw * p), round(fh * p)),
        }
    }

    pub fn validate(&self) -> Result<(), ValidationError> {
        match *self {
            Scale::Full => Ok(()),
            Scale::AspectFitWidth { width } if width == 0 => Err(ValidationError::InvalidScale(
                "width must be greater than 0".to_string(),
            )),
            Scale::AspectFitHeight { height } if height == 0 => Err(
                ValidationError::InvalidScale("height must be greater than 0".to_string()),
            ),
            Scale::AspectFitInside { width, height } | Scale::NonAspectFill { width, height }
                if width == 0 || height == 0 =>
            {
                Err(ValidationError::InvalidScale(format!(
                    "width and height must be greater than 0, got {}x{}",
                    width, height
                )))
            }
            Scale::Percent(p) if !(p.is_finite() && p > 0.0) => Err(
                ValidationError::InvalidScale(format!("percent must be greater than 0, got {}", p)),
            ),
            _ => Ok(()),
        }
    }

    /// The same scale with width and height targets swapped, for applying a
    /// display-space request to raw pixels stored rotated by 90° or 270°.
    pub fn transposed(&self) -> Self {
        match *self {
            Scale::AspectFitWidth { width } => Scale::AspectFitHeight { height: width },
            Scale::AspectFitHeight { height } => Scale::AspectFitWidth { width: height },
            Scale::AspectFitInside { width, height } => Scale::AspectFitInside {
                width: height,
                height: width,
            },
            Scale::NonAspectFill { width, height } => Scale::NonAspectFill {
                width: height,
                height: width,
            },
            other => other,
        }
    }

    pub fn to_map(&self, full: Dimension) -> Value {
        let size = self.resulting_size(full);
        json!({
            "class": "Scale",
            "width": size.width,
            "height": size.height,
        })
    }
}

impl fmt::Display for Scale {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match *self {
            Scale::Full => f.write_str("full"),
            Scale::AspectFitWidth { width } => write!(f, "{},", width),
            Scale::AspectFitHeight { height } => write!(f, ",{}", height),
            Scale::AspectFitInside { width, height } => write!(f, "!{},{}", width, height),
            Scale::NonAspectFill { width, height } => write!(f, "{},{}", width, height),
            Scale::Percent(p) => write!(f, "{}%", format_number(p * 100.0)),
        }
    }
}
