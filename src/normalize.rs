//! Pixel layout normalization.
//!
//! Decoders may hand back any layout the `image` crate supports: 16-bit
//! channels, float channels, and so on. Downstream consumers only need to
//! handle the four standard 8-bit layouts:
//!
//! ```text
//! Rgb8 | Rgba8 | Luma8 | LumaA8   ──▶ unchanged
//! anything else, with alpha       ──▶ Rgba8
//! anything else, without alpha    ──▶ Rgb8
//! ```
//!
//! Conversions cost a full pass over the buffer, so every one is logged and
//! counted.

use std::sync::atomic::{AtomicU64, Ordering};

use image::DynamicImage;
use tracing::warn;

static CONVERSIONS: AtomicU64 = AtomicU64::new(0);

/// Result of [`normalize`].
#[derive(Debug, Clone)]
pub struct Normalized {
    pub image: DynamicImage,
    /// True if the buffer was rewritten into a standard layout.
    pub converted: bool,
}

/// Whether `image` is already in one of the standard layouts.
pub fn is_standard_layout(image: &DynamicImage) -> bool {
    matches!(
        image,
        DynamicImage::ImageRgb8(_)
            | DynamicImage::ImageRgba8(_)
            | DynamicImage::ImageLuma8(_)
            | DynamicImage::ImageLumaA8(_)
    )
}

/// Bring `image` into a standard 8-bit layout.
pub fn normalize(image: DynamicImage) -> Normalized {
    if is_standard_layout(&image) {
        return Normalized {
            image,
            converted: false,
        };
    }

    let source = image.color();
    let image = if source.has_alpha() {
        DynamicImage::ImageRgba8(image.to_rgba8())
    } else {
        DynamicImage::ImageRgb8(image.to_rgb8())
    };

    CONVERSIONS.fetch_add(1, Ordering::Relaxed);
    warn!(
        "Converted {:?} pixels to {:?} ({}x{})",
        source,
        image.color(),
        image.width(),
        image.height()
    );

    Normalized {
        image,
        converted: true,
    }
}

/// Number of conversions performed by this process so far.
pub fn conversion_count() -> u64 {
    CONVERSIONS.load(Ordering::Relaxed)
}
