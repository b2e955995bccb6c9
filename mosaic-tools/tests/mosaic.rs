use std::fs;
use std::path::PathBuf;

use mosaic_tools::{KvItem, MosaicError, MosaicJson, fill_holes, kv_items, mosaic_id, split_mosaic};
use pretty_assertions::assert_eq;
use rstest::{fixture, rstest};
use serde_json::json;
use tempfile::tempdir;

fn fixture_path(name: &str) -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .join("tests/fixtures")
        .join(name)
}

#[fixture]
fn naip_2019() -> MosaicJson {
    MosaicJson::read(&fixture_path("naip_2019.json")).unwrap()
}

#[fixture]
fn naip_2017() -> MosaicJson {
    MosaicJson::read(&fixture_path("naip_2017.json")).unwrap()
}

#[rstest]
fn fill_newest_first(naip_2019: MosaicJson, naip_2017: MosaicJson) {
    let mut mosaics = vec![naip_2019.clone(), naip_2017.clone()];
    let summary = fill_holes(&mut mosaics).unwrap();
    assert_eq!(summary.total_quadkeys, 4);
    assert_eq!(summary.filled, vec![2, 1]);

    let [newest, oldest] = mosaics.as_slice() else {
        panic!("expected two mosaics");
    };
    assert_eq!(
        newest.tiles.keys().collect::<Vec<_>>(),
        vec!["023010", "023011", "023012", "023013"]
    );
    assert_eq!(
        newest.tiles.keys().collect::<Vec<_>>(),
        oldest.tiles.keys().collect::<Vec<_>>()
    );

    // existing assets are never replaced
    assert_eq!(newest.tiles["023011"], naip_2019.tiles["023011"]);
    assert_eq!(oldest.tiles["023011"], naip_2017.tiles["023011"]);
    // holes are filled from the other mosaic
    assert_eq!(newest.tiles["023012"], naip_2017.tiles["023012"]);
    assert_eq!(oldest.tiles["023010"], naip_2019.tiles["023010"]);

    assert_eq!(newest.extra, naip_2019.extra);
    assert_eq!(oldest.extra, naip_2017.extra);
}

#[rstest]
fn fill_write_read(naip_2019: MosaicJson, naip_2017: MosaicJson) {
    let dir = tempdir().unwrap();
    let mut mosaics = vec![naip_2019, naip_2017];
    fill_holes(&mut mosaics).unwrap();

    for (idx, mosaic) in mosaics.iter().enumerate() {
        let path = dir.path().join(format!("{idx}.json"));
        mosaic.write(&path).unwrap();
        assert_eq!(&MosaicJson::read(&path).unwrap(), mosaic);
    }

    let mut reloaded: Vec<_> = (0..mosaics.len())
        .map(|idx| MosaicJson::read(&dir.path().join(format!("{idx}.json"))).unwrap())
        .collect();
    let summary = fill_holes(&mut reloaded).unwrap();
    assert_eq!(summary.filled, vec![0, 0]);
    assert_eq!(reloaded, mosaics);
}

#[test]
fn read_missing_file() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("missing.json");
    assert!(matches!(
        MosaicJson::read(&path),
        Err(MosaicError::IoError(_, p)) if p == path
    ));
}

#[test]
fn read_invalid_json() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("bad.json");
    fs::write(&path, r#"{"tiles": ["0"]}"#).unwrap();
    assert!(matches!(
        MosaicJson::read(&path),
        Err(MosaicError::JsonError(_, p)) if p == path
    ));
}

#[rstest]
fn split_writes_overviews(naip_2017: MosaicJson) {
    let overviews = split_mosaic(&naip_2017, 5).unwrap();
    assert_eq!(overviews.len(), 1);
    assert_eq!(overviews["02301"].tiles, naip_2017.tiles);
    assert_eq!(overviews["02301"].extra["maxzoom"], json!(16));
    assert_ne!(overviews["02301"].extra["bounds"], naip_2017.extra["bounds"]);

    let dir = tempdir().unwrap();
    let overviews = split_mosaic(&naip_2017, 6).unwrap();
    for (quadkey, overview) in &overviews {
        overview
            .write(&dir.path().join(format!("naip_{quadkey}.json")))
            .unwrap();
    }
    for quadkey in ["023011", "023012", "023013"] {
        let path = dir.path().join(format!("naip_{quadkey}.json"));
        let overview = MosaicJson::read(&path).unwrap();
        assert_eq!(overview.tiles.len(), 1);
        assert_eq!(overview.tiles[quadkey], naip_2017.tiles[quadkey]);
    }
}

#[rstest]
fn id_survives_round_trip(naip_2019: MosaicJson) {
    let dir = tempdir().unwrap();
    let path = dir.path().join("mosaic.json");
    naip_2019.write(&path).unwrap();
    let reloaded = MosaicJson::read(&path).unwrap();

    let id = mosaic_id(&naip_2019, "1.0.0").unwrap();
    assert_eq!(id.len(), 56);
    assert!(id.chars().all(|c| c.is_ascii_hexdigit()));
    assert_eq!(mosaic_id(&reloaded, "1.0.0").unwrap(), id);
}

#[rstest]
fn items_for_table(naip_2017: MosaicJson) {
    let items = kv_items(&naip_2017);
    assert_eq!(items.len(), 1 + naip_2017.tiles.len());
    let KvItem::Metadata { quadkey, metadata } = &items[0] else {
        panic!("metadata must come first");
    };
    assert_eq!(quadkey, "-1");
    assert!(!metadata.contains_key("tiles"));
    assert_eq!(metadata["quadkey_zoom"], json!(6));
    assert!(items[1..].iter().all(|i| matches!(i, KvItem::Tile { .. })));
}
