use crate::geometry::{Dimension, Rectangle};

/// Tile layout of one level.
///
/// Tiles are laid out row-major from the top-left corner. Tiles in the last
/// column and row may be partial.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TileGrid {
    pub image: Dimension,
    pub tile: Dimension,
    pub tiles_x: u32,
    pub tiles_y: u32,
}

/// Inclusive range of tile coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TileSpan {
    pub first_x: u32,
    pub first_y: u32,
    pub last_x: u32,
    pub last_y: u32,
}

impl TileSpan {
    pub fn columns(&self) -> u32 {
        self.last_x - self.first_x + 1
    }

    pub fn rows(&self) -> u32 {
        self.last_y - self.first_y + 1
    }

    pub fn count(&self) -> u32 {
        self.columns() * self.rows()
    }
}

impl std::fmt::Display for TileSpan {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "tiles ({}, {})..=({}, {})",
            self.first_x, self.first_y, self.last_x, self.last_y
        )
    }
}

impl TileGrid {
    /// Grid for an image of size `image` cut into `tile`-sized tiles.
    ///
    /// Returns `None` if either tile extent is zero.
    pub fn new(image: Dimension, tile: Dimension) -> Option<Self> {
        if tile.is_empty() {
            return None;
        }
        Some(Self {
            image,
            tile,
            tiles_x: image.width.div_ceil(tile.width),
            tiles_y: image.height.div_ceil(tile.height),
        })
    }

    /// True if the level is split into more than one tile.
    pub fn is_tiled(&self) -> bool {
        self.tiles_x > 1 || self.tiles_y > 1
    }

    pub fn tile_count(&self) -> u32 {
        self.tiles_x * self.tiles_y
    }

    /// Row-major index of a tile, or `None` if out of range.
    pub fn tile_index(&self, tile_x: u32, tile_y: u32) -> Option<u32> {
        if tile_x >= self.tiles_x || tile_y >= self.tiles_y {
            return None;
        }
        Some(tile_y * self.tiles_x + tile_x)
    }

    /// Pixel bounds of a tile, clipped at the right and bottom edges.
    pub fn tile_rect(&self, tile_x: u32, tile_y: u32) -> Option<Rectangle> {
        self.tile_index(tile_x, tile_y)?;
        let x = tile_x * self.tile.width;
        let y = tile_y * self.tile.height;
        Some(Rectangle::new(x, y, self.tile.width, self.tile.height).intersect(self.image))
    }

    /// Tiles that intersect `region`. `None` for an empty region or one that
    /// starts outside the image.
    pub fn covering(&self, region: Rectangle) -> Option<TileSpan> {
        let region = region.intersect(self.image);
        if region.is_empty() {
            return None;
        }
        Some(TileSpan {
            first_x: region.x / self.tile.width,
            first_y: region.y / self.tile.height,
            last_x: (region.x + region.width - 1) / self.tile.width,
            last_y: (region.y + region.height - 1) / self.tile.height,
        })
    }
}
