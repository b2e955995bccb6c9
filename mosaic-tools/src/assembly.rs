//! Pixel layout of a raster assembled from the tiles of a remote XYZ endpoint.
//!
//! Fetching the tiles and writing the raster are left to the caller; this module only decides
//! where every tile lands and how often a failed fetch is retried.

use std::fmt::Display;
use std::thread;
use std::time::Duration;

use backon::{BlockingRetryable as _, ConstantBuilder};
use mosaic_tile_utils::{
    MAX_ZOOM, TileCoord, TileRect, bbox_to_tile_rect, lnglat_to_webmercator, meters_per_pixel,
};
use serde::Serialize;
use tilejson::Bounds;
use tracing::warn;

use crate::{MosaicError, MosaicResult};

pub const DEFAULT_TILE_SIZE: u32 = 256;
pub const WEB_MERCATOR_CRS: &str = "EPSG:3857";

/// Where a single tile is written in the output raster.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub struct TileWindow {
    pub tile: TileCoord,
    pub col_off: u64,
    pub row_off: u64,
    pub width: u32,
    pub height: u32,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct AssemblyPlan {
    pub zoom: u8,
    pub tile_size: u32,
    pub extent: TileRect,
    pub width: u64,
    pub height: u64,
    pub crs: String,
    /// Affine transform `[res, 0, west, 0, -res, north]` in web-mercator meters
    pub transform: [f64; 6],
}

impl AssemblyPlan {
    pub fn new(bbox: &Bounds, zoom: u8, tile_size: u32) -> MosaicResult<Self> {
        if !(bbox.left < bbox.right && bbox.bottom < bbox.top) {
            return Err(MosaicError::InvalidBounds(*bbox));
        }
        if zoom > MAX_ZOOM {
            return Err(MosaicError::InvalidZoom(zoom));
        }

        let extent = bbox_to_tile_rect(bbox, zoom);
        let (west, north) = {
            let (lng, lat) = extent.origin().upper_left();
            lnglat_to_webmercator(lng, lat)
        };
        let res = meters_per_pixel(zoom, 0.0, tile_size);

        Ok(Self {
            zoom,
            tile_size,
            extent,
            width: u64::from(extent.width()) * u64::from(tile_size),
            height: u64::from(extent.height()) * u64::from(tile_size),
            crs: WEB_MERCATOR_CRS.to_string(),
            transform: [res, 0.0, west, 0.0, -res, north],
        })
    }

    /// Plan for an endpoint whose mosaic goes up to `max_zoom`.
    ///
    /// High DPI tiles are twice the size, so they are requested one zoom level lower.
    pub fn for_endpoint(bbox: &Bounds, max_zoom: u8, retina: bool) -> MosaicResult<Self> {
        let scale = if retina { 2 } else { 1 };
        let zoom = max_zoom.saturating_sub(scale - 1);
        Self::new(bbox, zoom, DEFAULT_TILE_SIZE * u32::from(scale))
    }

    #[must_use]
    pub fn tile_count(&self) -> u64 {
        self.extent.size()
    }

    #[must_use]
    pub fn window(&self, tile: &TileCoord) -> Option<TileWindow> {
        self.extent.contains(tile).then(|| TileWindow {
            tile: *tile,
            col_off: u64::from(tile.x - self.extent.min_x) * u64::from(self.tile_size),
            row_off: u64::from(tile.y - self.extent.min_y) * u64::from(self.tile_size),
            width: self.tile_size,
            height: self.tile_size,
        })
    }

    pub fn windows(&self) -> impl Iterator<Item = TileWindow> + '_ {
        self.extent.tiles().filter_map(|tile| self.window(&tile))
    }
}

/// Bounded retry of a per-tile operation with a constant delay between attempts.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_retries: usize,
    pub delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: 3,
            delay: Duration::from_secs(3),
        }
    }
}

impl RetryPolicy {
    /// Run `op` until it succeeds or the retries are used up.
    pub fn run<T, E, F>(&self, tile: TileCoord, mut op: F) -> MosaicResult<T>
    where
        E: Display,
        F: FnMut() -> Result<T, E>,
    {
        let mut attempts = 0;
        let backoff = ConstantBuilder::default()
            .with_delay(self.delay)
            .with_max_times(self.max_retries);

        let result = (|| {
            attempts += 1;
            op()
        })
        .retry(backoff)
        .sleep(thread::sleep)
        .notify(|err: &E, after: Duration| {
            warn!("Tile {tile:#} failed: {err}, retrying in {after:?}");
        })
        .call();

        result.map_err(|e| MosaicError::TileFetchFailed {
            tile,
            attempts,
            reason: e.to_string(),
        })
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unreadable_literal)]

    use std::collections::HashSet;

    use approx::assert_relative_eq;

    use super::*;

    fn colorado() -> Bounds {
        Bounds::new(-109.06, 36.99, -102.04, 41.0)
    }

    #[test]
    fn plan_dimensions() {
        let plan = AssemblyPlan::new(&colorado(), 6, 256).unwrap();
        assert_eq!(plan.extent, TileRect::new(6, 12, 23, 13, 24));
        assert_eq!(plan.width, 512);
        assert_eq!(plan.height, 512);
        assert_eq!(plan.tile_count(), 4);
        assert_eq!(plan.crs, "EPSG:3857");

        let [res, _, west, _, neg_res, north] = plan.transform;
        assert_relative_eq!(res, 2445.984905125, epsilon = 1e-6);
        assert_relative_eq!(neg_res, -res);
        assert_relative_eq!(west, -12523442.714243278, epsilon = 1e-6);
        assert_relative_eq!(north, 5635549.221409473, epsilon = 1e-6);
    }

    #[test]
    fn windows_cover_raster() {
        let plan = AssemblyPlan::new(&colorado(), 9, 256).unwrap();
        let windows: Vec<_> = plan.windows().collect();
        assert_eq!(windows.len() as u64, plan.tile_count());

        let offsets: HashSet<_> = windows.iter().map(|w| (w.col_off, w.row_off)).collect();
        assert_eq!(offsets.len(), windows.len());
        for w in &windows {
            assert!(w.col_off + u64::from(w.width) <= plan.width);
            assert!(w.row_off + u64::from(w.height) <= plan.height);
        }
        let area: u64 = windows
            .iter()
            .map(|w| u64::from(w.width) * u64::from(w.height))
            .sum();
        assert_eq!(area, plan.width * plan.height);

        assert_eq!(plan.window(&TileCoord::new(9, 0, 0)), None);
    }

    #[test]
    fn retina() {
        let plan = AssemblyPlan::for_endpoint(&colorado(), 7, true).unwrap();
        assert_eq!(plan.zoom, 6);
        assert_eq!(plan.tile_size, 512);
        assert_eq!(plan.width, 1024);

        let plan = AssemblyPlan::for_endpoint(&colorado(), 7, false).unwrap();
        assert_eq!(plan.zoom, 7);
        assert_eq!(plan.tile_size, 256);
    }

    #[test]
    fn invalid_plan() {
        assert!(matches!(
            AssemblyPlan::new(&Bounds::new(10.0, 0.0, -10.0, 5.0), 3, 256),
            Err(MosaicError::InvalidBounds(_))
        ));
        assert!(matches!(
            AssemblyPlan::new(&colorado(), 31, 256),
            Err(MosaicError::InvalidZoom(31))
        ));
    }

    fn instant(max_retries: usize) -> RetryPolicy {
        RetryPolicy {
            max_retries,
            delay: Duration::ZERO,
        }
    }

    #[test]
    fn retry_until_success() {
        let mut calls = 0;
        let value = instant(3)
            .run(TileCoord::new(1, 0, 0), || {
                calls += 1;
                if calls < 3 { Err("not ready") } else { Ok(calls) }
            })
            .unwrap();
        assert_eq!(value, 3);
        assert_eq!(calls, 3);
    }

    #[test]
    fn retry_gives_up() {
        let mut calls = 0;
        let err = instant(3)
            .run(TileCoord::new(2, 1, 1), || -> Result<(), String> {
                calls += 1;
                Err(format!("HTTP 503 #{calls}"))
            })
            .unwrap_err();
        assert_eq!(calls, 4);
        match err {
            MosaicError::TileFetchFailed {
                tile,
                attempts,
                reason,
            } => {
                assert_eq!(tile, TileCoord::new(2, 1, 1));
                assert_eq!(attempts, 4);
                assert_eq!(reason, "HTTP 503 #4");
            }
            e => panic!("unexpected error {e}"),
        }
    }

    #[test]
    fn no_retries() {
        let mut calls = 0;
        let res = instant(0).run(TileCoord::new(0, 0, 0), || -> Result<(), &str> {
            calls += 1;
            Err("boom")
        });
        assert!(res.is_err());
        assert_eq!(calls, 1);
    }
}
