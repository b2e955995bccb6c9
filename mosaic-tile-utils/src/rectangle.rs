//! A rectangular range of tiles at a single zoom level.

use serde::Serialize;

use crate::TileCoord;

/// A rectangular region in tile coordinate space.
///
/// The rectangle is inclusive of both min and max coordinates.
///
/// ```
/// # use mosaic_tile_utils::TileRect;
/// let rect = TileRect::new(10, 0, 0, 255, 255);
/// assert_eq!(rect.size(), 256 * 256);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TileRect {
    pub zoom: u8,
    pub min_x: u32,
    pub min_y: u32,
    pub max_x: u32,
    pub max_y: u32,
}

impl Serialize for TileRect {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::ser::Serializer,
    {
        serializer.collect_str(&format!(
            "{}: ({},{}) - ({},{})",
            self.zoom, self.min_x, self.min_y, self.max_x, self.max_y
        ))
    }
}

impl TileRect {
    /// # Panics
    ///
    /// Panics if `min_x > max_x` or `min_y > max_y`.
    #[must_use]
    pub fn new(zoom: u8, min_x: u32, min_y: u32, max_x: u32, max_y: u32) -> Self {
        assert!(min_x <= max_x);
        assert!(min_y <= max_y);
        Self {
            zoom,
            min_x,
            min_y,
            max_x,
            max_y,
        }
    }

    /// Number of tile columns.
    #[must_use]
    pub fn width(&self) -> u32 {
        self.max_x - self.min_x + 1
    }

    /// Number of tile rows.
    #[must_use]
    pub fn height(&self) -> u32 {
        self.max_y - self.min_y + 1
    }

    /// Total number of tiles contained in this rectangle.
    ///
    /// ```
    /// # use mosaic_tile_utils::TileRect;
    /// let rect = TileRect::new(0, 0, 0, 2, 3);
    /// assert_eq!(rect.size(), 3 * 4);
    /// ```
    #[must_use]
    pub fn size(&self) -> u64 {
        u64::from(self.width()) * u64::from(self.height())
    }

    #[must_use]
    pub fn contains(&self, tile: &TileCoord) -> bool {
        tile.z == self.zoom
            && (self.min_x..=self.max_x).contains(&tile.x)
            && (self.min_y..=self.max_y).contains(&tile.y)
    }

    /// The upper-left tile of the rectangle.
    #[must_use]
    pub fn origin(&self) -> TileCoord {
        TileCoord::new(self.zoom, self.min_x, self.min_y)
    }

    /// Iterate over all tiles, row by row from the top.
    pub fn tiles(&self) -> impl Iterator<Item = TileCoord> + '_ {
        (self.min_y..=self.max_y).flat_map(move |y| {
            (self.min_x..=self.max_x).map(move |x| TileCoord::new(self.zoom, x, y))
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_len() {
        assert_eq!(1, TileRect::new(0, 0, 0, 0, 0).size());
        assert_eq!(4, TileRect::new(0, 0, 0, 1, 1).size());
        assert_eq!(15, TileRect::new(0, 2, 3, 4, 7).size());
    }

    #[test]
    fn test_tiles() {
        let rect = TileRect::new(3, 2, 5, 3, 6);
        let tiles: Vec<_> = rect.tiles().collect();
        assert_eq!(
            tiles,
            vec![
                TileCoord::new(3, 2, 5),
                TileCoord::new(3, 3, 5),
                TileCoord::new(3, 2, 6),
                TileCoord::new(3, 3, 6),
            ]
        );
        assert!(tiles.iter().all(|t| rect.contains(t)));
        assert!(!rect.contains(&TileCoord::new(3, 1, 5)));
        assert!(!rect.contains(&TileCoord::new(4, 2, 5)));
        assert_eq!(rect.origin(), TileCoord::new(3, 2, 5));
    }
}
