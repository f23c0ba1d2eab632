//! Resolution level selection.
//!
//! Multi-resolution sources store the same image at several sizes, each
//! level usually half the previous one:
//!
//! ```text
//! level 0   ████████████████  full size
//! level 1   ████████          1/2
//! level 2   ████              1/4
//! level 3   ██                1/8
//! ```
//!
//! Given a crop and a scale, [`select_best_level`] walks the levels from the
//! smallest to the largest and picks the first one that still holds enough
//! pixels to produce the requested output without upsampling. The crop
//! region is then mapped into that level's coordinate space.

use tracing::debug;

use crate::geometry::{Dimension, Rectangle};
use crate::operation::{Crop, Scale};

/// Largest reduction factor [`ReductionFactor::for_scale`] will report.
const MAX_REDUCTION_FACTOR: u32 = 31;

// =============================================================================
// Reduction factor
// =============================================================================

/// Number of times a level has been halved relative to the full image.
///
/// `0` is full size, `1` is half, `2` is a quarter, and so on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct ReductionFactor(pub u32);

impl ReductionFactor {
    /// Factor of a level whose width is `scale` times the full width.
    ///
    /// Computed as `floor(log2(1 / scale))` by halving until a further halving
    /// would drop below `scale`. Scales at or above 1 give 0.
    pub fn for_scale(scale: f64) -> Self {
        if scale.is_nan() || scale <= 0.0 {
            return Self(MAX_REDUCTION_FACTOR);
        }
        let mut factor = 0;
        let mut next = 0.5;
        while next >= scale && factor < MAX_REDUCTION_FACTOR {
            factor += 1;
            next /= 2.0;
        }
        Self(factor)
    }

    /// Scale corresponding to this factor, `2^-factor`.
    pub fn scale(&self) -> f64 {
        1.0 / (1u64 << self.0) as f64
    }

    pub fn factor(&self) -> u32 {
        self.0
    }
}

impl std::fmt::Display for ReductionFactor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

// =============================================================================
// Selection
// =============================================================================

/// Outcome of [`select_best_level`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LevelSelection {
    /// Index into the level list; 0 is full resolution.
    pub level: usize,
    pub reduction_factor: ReductionFactor,
    /// Crop region in the chosen level's coordinates.
    pub region: Rectangle,
    /// Width of the chosen level divided by the full width.
    pub scale: f64,
}

/// Pick the smallest level that can satisfy `crop` and `scale`.
///
/// `levels[0]` must be the full-resolution level and `full` its size. Only the
/// scale's targets matter; a no-op scale, or a source with a single level,
/// always selects level 0.
pub fn select_best_level(
    full: Dimension,
    levels: &[Dimension],
    crop: &Crop,
    scale: &Scale,
) -> LevelSelection {
    let region = crop.rectangle(full);
    let base = LevelSelection {
        level: 0,
        reduction_factor: ReductionFactor(0),
        region,
        scale: 1.0,
    };

    if !scale.has_effect() || levels.len() <= 1 || full.width == 0 {
        debug!("Using level 0 for {} region {}", full, region);
        return base;
    }

    for (index, level) in levels.iter().enumerate().rev() {
        let reduced = level.width as f64 / full.width as f64;

        if fits(scale, region, reduced) {
            let reduction_factor = if index == 0 {
                ReductionFactor(0)
            } else {
                ReductionFactor::for_scale(reduced)
            };
            debug!(
                "Level {}: {} fits ({}x reduction factor)",
                index, level, reduction_factor
            );
            return LevelSelection {
                level: index,
                reduction_factor,
                region: map_region(region, reduced, *level),
                scale: reduced,
            };
        }

        debug!("Level {}: {} too small", index, level);
    }

    base
}

/// Map a full-resolution region into a level at `reduced` times full size.
///
/// Coordinates round to nearest. A non-empty region always maps to at least
/// one pixel inside the level, even when its origin rounds onto the far edge.
fn map_region(region: Rectangle, reduced: f64, bounds: Dimension) -> Rectangle {
    let mapped = region.scaled(reduced);
    if region.is_empty() || bounds.is_empty() {
        return mapped.intersect(bounds);
    }
    Rectangle::new(
        mapped.x.min(bounds.width - 1),
        mapped.y.min(bounds.height - 1),
        mapped.width.max(1),
        mapped.height.max(1),
    )
    .intersect(bounds)
}

/// Whether a level at `reduced` times full size holds enough pixels for
/// `scale` applied to `region`.
fn fits(scale: &Scale, region: Rectangle, reduced: f64) -> bool {
    match *scale {
        Scale::Full => true,
        Scale::Percent(p) => p <= reduced,
        _ => {
            if region.is_empty() {
                return false;
            }
            let width_ok = scale.width_ratio(region).map_or(true, |r| r <= reduced);
            let height_ok = scale.height_ratio(region).map_or(true, |r| r <= reduced);
            width_ok && height_ok
        }
    }
}
