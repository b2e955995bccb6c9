//! Tools to maintain a MosaicJSON catalog of imagery tiles.
//!
//! The library fills quadkey gaps across catalogs ([`fill_holes`]), selects one year of
//! imagery per state from a file manifest ([`ManifestFilter`]), splits catalogs into overview
//! mosaics ([`split_mosaic`]), derives the rows of a key-value table ([`kv_items`]) and plans
//! the pixel layout of a raster built from XYZ tiles ([`AssemblyPlan`]).

mod assembly;
pub use assembly::{AssemblyPlan, DEFAULT_TILE_SIZE, RetryPolicy, TileWindow, WEB_MERCATOR_CRS};

mod config;
pub use config::{DEFAULT_BLOCK_PREFIX_LEN, ManifestConfig};

mod errors;
pub use errors::{MosaicError, MosaicResult};

mod fill;
pub use fill::{FillSummary, fill_holes};

mod kv;
pub use kv::{KvItem, METADATA_QUADKEY, kv_items, mosaic_id};

mod manifest;
pub use manifest::{
    ManifestEntry, ManifestFilter, ManifestParseError, ManifestReport, SelectMethod, deduplicate,
    deduplicate_paths, select_state_years,
};

mod mosaic;
pub use mosaic::{MosaicJson, Tiles};

mod split;
pub use split::split_mosaic;

#[cfg(feature = "cli")]
pub mod logging;
