use std::collections::BTreeMap;

use mosaic_tile_utils::TileCoord;
use tracing::info;

use crate::{MosaicError, MosaicJson, MosaicResult};

/// Split a mosaic into mercator-aligned overview mosaics.
///
/// Tiles are grouped by the first `overview_zoom` digits of their quadkey. Every group keeps
/// all other fields of the source mosaic, with `bounds` replaced by the overview tile bounds.
/// The result is keyed by the overview quadkey.
pub fn split_mosaic(
    mosaic: &MosaicJson,
    overview_zoom: u8,
) -> MosaicResult<BTreeMap<String, MosaicJson>> {
    mosaic.validate()?;
    let quadkey_zoom = mosaic.quadkey_zoom().unwrap_or_default();
    if !mosaic.tiles.is_empty() && overview_zoom > quadkey_zoom {
        return Err(MosaicError::InvalidOverviewZoom {
            overview_zoom,
            quadkey_zoom,
        });
    }

    let mut overviews: BTreeMap<String, MosaicJson> = BTreeMap::new();
    for (quadkey, assets) in &mosaic.tiles {
        let overview_qk = &quadkey[..usize::from(overview_zoom)];
        if !overviews.contains_key(overview_qk) {
            let mut overview = MosaicJson {
                tiles: BTreeMap::new(),
                extra: mosaic.extra.clone(),
            };
            overview.set_bounds(TileCoord::from_quadkey(overview_qk)?.bounds());
            overviews.insert(overview_qk.to_string(), overview);
        }
        if let Some(overview) = overviews.get_mut(overview_qk) {
            overview.tiles.insert(quadkey.clone(), assets.clone());
        }
    }

    info!(
        "Split {} quadkeys into {} overview mosaics at zoom {overview_zoom}",
        mosaic.tiles.len(),
        overviews.len()
    );
    Ok(overviews)
}
