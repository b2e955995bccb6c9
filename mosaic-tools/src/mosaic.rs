use std::collections::BTreeMap;
use std::fmt::{Display, Formatter};
use std::fs;
use std::path::Path;

use mosaic_tile_utils::validate_quadkey;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value, json};
use tilejson::Bounds;
use tracing::debug;

use crate::{MosaicError, MosaicResult};

/// Quadkey to the ordered list of assets covering that tile.
pub type Tiles = BTreeMap<String, Vec<String>>;

/// A MosaicJSON document.
///
/// Only `tiles` is interpreted. Every other top-level field (`mosaicjson`, `minzoom`, `bounds`, ...)
/// is kept as-is and written back unchanged.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct MosaicJson {
    pub tiles: Tiles,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Display for MosaicJson {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self.quadkey_zoom() {
            Some(zoom) => write!(f, "mosaic with {} quadkeys at zoom {zoom}", self.tiles.len()),
            None => write!(f, "empty mosaic"),
        }
    }
}

impl MosaicJson {
    #[must_use]
    pub fn from_tiles(tiles: Tiles) -> Self {
        Self {
            tiles,
            extra: Map::new(),
        }
    }

    pub fn read(path: &Path) -> MosaicResult<Self> {
        let data = fs::read(path).map_err(|e| MosaicError::IoError(e, path.to_path_buf()))?;
        let mosaic: Self = serde_json::from_slice(&data)
            .map_err(|e| MosaicError::JsonError(e, path.to_path_buf()))?;
        debug!("Loaded {mosaic} from {}", path.display());
        Ok(mosaic)
    }

    /// Write the mosaic as compact JSON.
    pub fn write(&self, path: &Path) -> MosaicResult<()> {
        let data = serde_json::to_vec(self)?;
        fs::write(path, data).map_err(|e| MosaicError::IoError(e, path.to_path_buf()))
    }

    /// Zoom level of the quadkeys, taken from the keys themselves when there are any,
    /// otherwise from the `quadkey_zoom` or `minzoom` fields.
    #[must_use]
    pub fn quadkey_zoom(&self) -> Option<u8> {
        if let Some(quadkey) = self.tiles.keys().next() {
            return u8::try_from(quadkey.len()).ok();
        }
        ["quadkey_zoom", "minzoom"]
            .iter()
            .find_map(|key| self.extra.get(*key).and_then(Value::as_u64))
            .and_then(|v| u8::try_from(v).ok())
    }

    /// Check that all quadkeys are valid, share one zoom level, and have at least one asset.
    pub fn validate(&self) -> MosaicResult<()> {
        let mut expected_len = None;
        for (quadkey, assets) in &self.tiles {
            validate_quadkey(quadkey)?;
            let expected = *expected_len.get_or_insert(quadkey.len());
            if quadkey.len() != expected {
                return Err(MosaicError::MixedQuadkeyZoom {
                    index: 0,
                    quadkey: quadkey.clone(),
                    expected,
                });
            }
            if assets.is_empty() {
                return Err(MosaicError::EmptyAssets(quadkey.clone()));
            }
        }
        Ok(())
    }

    /// Replace the `bounds` field with `[west, south, east, north]`.
    pub fn set_bounds(&mut self, bounds: Bounds) {
        self.extra.insert(
            "bounds".to_string(),
            json!([bounds.left, bounds.bottom, bounds.right, bounds.top]),
        );
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;
    use serde_json::from_str;

    use super::*;

    const MOSAIC: &str = r#"{
        "mosaicjson": "0.0.2",
        "version": "1.0.0",
        "minzoom": 12,
        "maxzoom": 16,
        "center": [-100.0, 40.0, 12],
        "tiles": {
            "0231": ["s3://naip/a.tif", "s3://naip/b.tif"],
            "0232": ["s3://naip/c.tif"]
        }
    }"#;

    #[test]
    fn keeps_unknown_fields() {
        let mosaic: MosaicJson = from_str(MOSAIC).unwrap();
        assert_eq!(mosaic.tiles.len(), 2);
        assert_eq!(mosaic.extra["mosaicjson"], json!("0.0.2"));
        assert_eq!(mosaic.extra["center"], json!([-100.0, 40.0, 12]));

        let round_trip: Value = serde_json::to_value(&mosaic).unwrap();
        let original: Value = from_str(MOSAIC).unwrap();
        assert_eq!(round_trip, original);
    }

    #[test]
    fn quadkey_zoom() {
        let mosaic: MosaicJson = from_str(MOSAIC).unwrap();
        assert_eq!(mosaic.quadkey_zoom(), Some(4));

        let mut empty = MosaicJson::default();
        assert_eq!(empty.quadkey_zoom(), None);
        empty.extra.insert("minzoom".to_string(), json!(7));
        assert_eq!(empty.quadkey_zoom(), Some(7));
        empty.extra.insert("quadkey_zoom".to_string(), json!(9));
        assert_eq!(empty.quadkey_zoom(), Some(9));
    }

    #[test]
    fn validate() {
        let mosaic: MosaicJson = from_str(MOSAIC).unwrap();
        assert!(mosaic.validate().is_ok());

        let mut bad = mosaic.clone();
        bad.tiles.insert("0239".to_string(), vec!["x".to_string()]);
        assert!(matches!(bad.validate(), Err(MosaicError::InvalidQuadkey(_))));

        let mut bad = mosaic.clone();
        bad.tiles.insert("02310".to_string(), vec!["x".to_string()]);
        assert!(matches!(
            bad.validate(),
            Err(MosaicError::MixedQuadkeyZoom { .. })
        ));

        let mut bad = mosaic;
        bad.tiles.insert("0233".to_string(), vec![]);
        assert!(matches!(bad.validate(), Err(MosaicError::EmptyAssets(qk)) if qk == "0233"));
    }

    #[test]
    fn bounds() {
        let mut mosaic = MosaicJson::default();
        mosaic.set_bounds(Bounds::new(-10.0, -5.0, 10.0, 5.0));
        assert_eq!(mosaic.extra["bounds"], json!([-10.0, -5.0, 10.0, 5.0]));
    }
}
