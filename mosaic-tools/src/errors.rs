use std::io;
use std::path::PathBuf;

use mosaic_tile_utils::{MAX_ZOOM, QuadkeyError, TileCoord};
use tilejson::Bounds;

use crate::manifest::ManifestParseError;

#[derive(thiserror::Error, Debug)]
pub enum MosaicError {
    #[error(
        "Mosaics have different numbers of quadkeys after filling: expected {expected} in each, found {counts:?}. The result cannot be used."
    )]
    InconsistentQuadkeys { expected: usize, counts: Vec<usize> },

    #[error(
        "Mosaics use different quadkey zoom levels: mosaic #{index} has quadkey '{quadkey}', but zoom {expected} was expected"
    )]
    MixedQuadkeyZoom {
        index: usize,
        quadkey: String,
        expected: usize,
    },

    #[error("Invalid selection method '{0}', expected 'first' or 'last'")]
    InvalidSelectMethod(String),

    #[error("Start year {0} must not be after end year {1}")]
    InvalidYearRange(u16, u16),

    #[error(transparent)]
    InvalidManifestPath(#[from] ManifestParseError),

    #[error(transparent)]
    InvalidQuadkey(#[from] QuadkeyError),

    #[error("Quadkey '{0}' has an empty list of assets")]
    EmptyAssets(String),

    #[error("Overview zoom {overview_zoom} is deeper than the mosaic quadkey zoom {quadkey_zoom}")]
    InvalidOverviewZoom { overview_zoom: u8, quadkey_zoom: u8 },

    #[error("Invalid bounding box {0}, expected west < east and south < north")]
    InvalidBounds(Bounds),

    #[error("Zoom {0} is deeper than the maximum supported zoom {MAX_ZOOM}")]
    InvalidZoom(u8),

    #[error("Unable to fetch tile {tile:#} after {attempts} attempts: {reason}")]
    TileFetchFailed {
        tile: TileCoord,
        attempts: usize,
        reason: String,
    },

    #[error("Unable to access {1}: {0}")]
    IoError(io::Error, PathBuf),

    #[error("Unable to parse MosaicJSON file {1}: {0}")]
    JsonError(serde_json::Error, PathBuf),

    #[error(transparent)]
    JsonSerdeError(#[from] serde_json::Error),

    #[error("Unable to parse config file {1}: {0}")]
    ConfigParseError(serde_yaml::Error, PathBuf),
}

pub type MosaicResult<T> = Result<T, MosaicError>;
