//! Operations that never change the raw pixel extents.

use std::fmt;

use serde_json::{json, Value};

use super::format_number;
use crate::error::ValidationError;

// =============================================================================
// Rotate
// =============================================================================

/// Clockwise rotation in degrees (0-360).
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Rotate {
    pub degrees: f64,
}

impl Rotate {
    pub fn new(degrees: f64) -> Self {
        Self { degrees }
    }

    pub fn has_effect(&self) -> bool {
        self.degrees % 360.0 != 0.0
    }

    pub fn validate(&self) -> Result<(), ValidationError> {
        if !(0.0..=360.0).contains(&self.degrees) {
            return Err(ValidationError::InvalidRotation(self.degrees));
        }
        Ok(())
    }

    pub fn to_map(&self) -> Value {
        json!({ "class": "Rotate", "degrees": self.degrees })
    }
}

impl fmt::Display for Rotate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&format_number(self.degrees))
    }
}

// =============================================================================
// ColorTransform
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ColorTransform {
    Bitonal,
    Gray,
}

impl ColorTransform {
    pub fn name(&self) -> &'static str {
        match self {
            ColorTransform::Bitonal => "bitonal",
            ColorTransform::Gray => "gray",
        }
    }

    pub fn to_map(&self) -> Value {
        json!({ "class": "ColorTransform", "type": self.name() })
    }
}

impl fmt::Display for ColorTransform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

// =============================================================================
// Transpose
// =============================================================================

/// Mirror the image across an axis.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Transpose {
    Horizontal,
    Vertical,
}

impl Transpose {
    pub fn to_map(&self) -> Value {
        let axis = match self {
            Transpose::Horizontal => "horizontal",
            Transpose::Vertical => "vertical",
        };
        json!({ "class": "Transpose", "axis": axis })
    }
}

impl fmt::Display for Transpose {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Transpose::Horizontal => f.write_str("h"),
            Transpose::Vertical => f.write_str("v"),
        }
    }
}

// =============================================================================
// MetadataCopy
// =============================================================================

/// Copy the source's embedded metadata into the output.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct MetadataCopy;

impl MetadataCopy {
    pub fn to_map(&self) -> Value {
        json!({ "class": "MetadataCopy" })
    }
}
