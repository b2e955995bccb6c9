//! Web-mercator tile math shared by the MosaicJSON tools: quadkey addressing, tile bounds and tile ranges.

use std::f64::consts::PI;
use std::fmt::{Display, Formatter};

use serde::Serialize;
use tilejson::Bounds;

mod rectangle;
pub use rectangle::TileRect;

/// Equatorial radius of the WGS84 ellipsoid, in meters.
pub const EARTH_RADIUS: f64 = 6_378_137.0;
/// Length of the equator in web-mercator meters.
pub const EARTH_CIRCUMFERENCE: f64 = 2.0 * PI * EARTH_RADIUS;
/// Deepest zoom a quadkey may address.
pub const MAX_ZOOM: u8 = 30;
/// Latitude at which the web-mercator square ends.
pub const MAX_LATITUDE: f64 = 85.051_128_779_806_6;

const TILE_EPSILON: f64 = 1e-14;

#[derive(thiserror::Error, Debug, Clone, PartialEq)]
pub enum QuadkeyError {
    #[error("Quadkey '{0}' contains an invalid digit '{1}', only 0-3 are allowed")]
    InvalidDigit(String, char),

    #[error("Quadkey '{0}' is deeper than the maximum supported zoom {MAX_ZOOM}")]
    TooDeep(String),
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct TileCoord {
    pub z: u8,
    pub x: u32,
    pub y: u32,
}

impl Display for TileCoord {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        if f.alternate() {
            write!(f, "{}/{}/{}", self.z, self.x, self.y)
        } else {
            write!(f, "{},{},{}", self.z, self.x, self.y)
        }
    }
}

impl TileCoord {
    #[must_use]
    pub fn new(z: u8, x: u32, y: u32) -> Self {
        Self { z, x, y }
    }

    /// Parse a base-4 quadkey into the tile it addresses. An empty quadkey is the zoom 0 tile.
    pub fn from_quadkey(quadkey: &str) -> Result<Self, QuadkeyError> {
        let zoom = u8::try_from(quadkey.len())
            .ok()
            .filter(|z| *z <= MAX_ZOOM)
            .ok_or_else(|| QuadkeyError::TooDeep(quadkey.to_string()))?;

        let (mut x, mut y) = (0_u32, 0_u32);
        for (idx, digit) in quadkey.chars().enumerate() {
            let mask = 1_u32 << (quadkey.len() - idx - 1);
            match digit {
                '0' => {}
                '1' => x |= mask,
                '2' => y |= mask,
                '3' => {
                    x |= mask;
                    y |= mask;
                }
                _ => return Err(QuadkeyError::InvalidDigit(quadkey.to_string(), digit)),
            }
        }
        Ok(Self::new(zoom, x, y))
    }

    #[must_use]
    pub fn quadkey(&self) -> String {
        (1..=self.z)
            .rev()
            .map(|level| {
                let mask = 1_u32 << (level - 1);
                let mut digit = b'0';
                if self.x & mask != 0 {
                    digit += 1;
                }
                if self.y & mask != 0 {
                    digit += 2;
                }
                char::from(digit)
            })
            .collect()
    }

    /// Longitude and latitude of the upper-left corner of this tile.
    #[must_use]
    pub fn upper_left(&self) -> (f64, f64) {
        tile_corner(self.z, self.x, self.y)
    }

    /// Geographic bounds of this tile as `west, south, east, north`.
    #[must_use]
    pub fn bounds(&self) -> Bounds {
        let (west, north) = tile_corner(self.z, self.x, self.y);
        let (east, south) = tile_corner(self.z, self.x + 1, self.y + 1);
        Bounds::new(west, south, east, north)
    }
}

/// Check that a quadkey is well-formed without converting it.
pub fn validate_quadkey(quadkey: &str) -> Result<(), QuadkeyError> {
    TileCoord::from_quadkey(quadkey).map(|_| ())
}

#[allow(clippy::cast_precision_loss)]
fn tile_corner(zoom: u8, x: u32, y: u32) -> (f64, f64) {
    let n = f64::from(1_u32 << zoom);
    let lng = f64::from(x) / n * 360.0 - 180.0;
    let lat = (PI * (1.0 - 2.0 * f64::from(y) / n)).sinh().atan().to_degrees();
    (lng, lat)
}

/// Find the tile containing a longitude/latitude at the given zoom.
///
/// Points on or outside the edges of the web-mercator square snap to the edge tiles.
#[must_use]
#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
pub fn lnglat_to_tile(lng: f64, lat: f64, zoom: u8) -> TileCoord {
    let lat = lat.clamp(-MAX_LATITUDE, MAX_LATITUDE);
    let x = lng / 360.0 + 0.5;
    let sin_lat = lat.to_radians().sin();
    let y = 0.5 - 0.25 * ((1.0 + sin_lat) / (1.0 - sin_lat)).ln() / PI;

    let tiles = 1_u32 << zoom;
    let to_index = |v: f64| {
        if v <= 0.0 {
            0
        } else if v >= 1.0 {
            tiles - 1
        } else {
            (((v + TILE_EPSILON) * f64::from(tiles)).floor() as u32).min(tiles - 1)
        }
    };
    TileCoord::new(zoom, to_index(x), to_index(y))
}

/// Project a longitude/latitude into web-mercator meters.
#[must_use]
pub fn lnglat_to_webmercator(lng: f64, lat: f64) -> (f64, f64) {
    let lat = lat.clamp(-MAX_LATITUDE, MAX_LATITUDE);
    let x = EARTH_RADIUS * lng.to_radians();
    let y = EARTH_RADIUS * (PI * 0.25 + 0.5 * lat.to_radians()).tan().ln();
    (x, y)
}

/// Ground resolution of a pixel at the given latitude.
#[must_use]
pub fn meters_per_pixel(zoom: u8, lat: f64, tile_size: u32) -> f64 {
    lat.to_radians().cos() * EARTH_CIRCUMFERENCE
        / (f64::from(tile_size) * f64::from(1_u32 << zoom))
}

/// The inclusive range of tiles at `zoom` that a bounding box touches.
#[must_use]
pub fn bbox_to_tile_rect(bbox: &Bounds, zoom: u8) -> TileRect {
    let upper_left = lnglat_to_tile(bbox.left, bbox.top, zoom);
    let lower_right = lnglat_to_tile(bbox.right, bbox.bottom, zoom);
    TileRect::new(
        zoom,
        upper_left.x,
        upper_left.y,
        lower_right.x,
        lower_right.y,
    )
}
