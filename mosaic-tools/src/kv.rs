//! Mosaic identifiers and the rows of a quadkey-partitioned key-value table.
//!
//! A mosaic is stored in a table named after its id, with one row per quadkey
//! and one extra row with quadkey `-1` holding every non-tile field.

use std::collections::BTreeMap;
use std::{io, iter};

use serde::Serialize;
use serde_json::ser::Formatter;
use serde_json::{Map, Value, json};
use sha2::{Digest as _, Sha224};

use crate::{MosaicJson, MosaicResult};

/// Partition key of the row that holds the mosaic metadata.
pub const METADATA_QUADKEY: &str = "-1";

#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(untagged)]
pub enum KvItem {
    Metadata {
        quadkey: String,
        #[serde(flatten)]
        metadata: Map<String, Value>,
    },
    Tile {
        quadkey: String,
        assets: Vec<String>,
    },
}

impl KvItem {
    #[must_use]
    pub fn quadkey(&self) -> &str {
        match self {
            Self::Metadata { quadkey, .. } | Self::Tile { quadkey, .. } => quadkey,
        }
    }
}

/// Rows to upload for a mosaic: the metadata row first, then one row per quadkey.
#[must_use]
pub fn kv_items(mosaic: &MosaicJson) -> Vec<KvItem> {
    let metadata = KvItem::Metadata {
        quadkey: METADATA_QUADKEY.to_string(),
        metadata: mosaic.extra.clone(),
    };
    iter::once(metadata)
        .chain(mosaic.tiles.iter().map(|(quadkey, assets)| KvItem::Tile {
            quadkey: quadkey.clone(),
            assets: assets.clone(),
        }))
        .collect()
}

/// Hex SHA-224 of `{"body": mosaic, "version": version}`.
///
/// The document is serialized the way Python's `json.dumps(..., sort_keys=True)` does,
/// so the id matches the one computed by Python mosaic tilers.
pub fn mosaic_id(mosaic: &MosaicJson, version: &str) -> MosaicResult<String> {
    let doc = json!({
        "body": serde_json::to_value(mosaic)?,
        "version": version,
    });
    let text = to_python_json(&doc)?;
    Ok(format!("{:x}", Sha224::digest(text.as_bytes())))
}

fn to_python_json(value: &Value) -> MosaicResult<String> {
    let mut buf = Vec::new();
    let mut ser = serde_json::Serializer::with_formatter(&mut buf, PythonFormatter);
    sort_keys(value).serialize(&mut ser)?;
    // the formatter only ever writes ASCII
    Ok(String::from_utf8_lossy(&buf).into_owned())
}

fn sort_keys(value: &Value) -> Value {
    match value {
        Value::Object(map) => {
            let sorted: BTreeMap<&String, Value> =
                map.iter().map(|(k, v)| (k, sort_keys(v))).collect();
            Value::Object(sorted.into_iter().map(|(k, v)| (k.clone(), v)).collect())
        }
        Value::Array(values) => Value::Array(values.iter().map(sort_keys).collect()),
        v => v.clone(),
    }
}

/// Mimics Python's default `json.dumps` output: `", "` and `": "` separators,
/// ASCII-only strings, and `repr()` floats.
struct PythonFormatter;

impl Formatter for PythonFormatter {
    fn begin_array_value<W: ?Sized + io::Write>(
        &mut self,
        writer: &mut W,
        first: bool,
    ) -> io::Result<()> {
        if first { Ok(()) } else { writer.write_all(b", ") }
    }

    fn begin_object_key<W: ?Sized + io::Write>(
        &mut self,
        writer: &mut W,
        first: bool,
    ) -> io::Result<()> {
        if first { Ok(()) } else { writer.write_all(b", ") }
    }

    fn begin_object_value<W: ?Sized + io::Write>(&mut self, writer: &mut W) -> io::Result<()> {
        writer.write_all(b": ")
    }

    fn write_string_fragment<W: ?Sized + io::Write>(
        &mut self,
        writer: &mut W,
        fragment: &str,
    ) -> io::Result<()> {
        let mut utf16 = [0_u16; 2];
        for c in fragment.chars() {
            if c.is_ascii() && c != '\x7f' {
                writer.write_all(c.encode_utf8(&mut [0; 4]).as_bytes())?;
            } else {
                for unit in c.encode_utf16(&mut utf16) {
                    write!(writer, "\\u{unit:04x}")?;
                }
            }
        }
        Ok(())
    }

    fn write_f64<W: ?Sized + io::Write>(&mut self, writer: &mut W, value: f64) -> io::Result<()> {
        writer.write_all(python_float_repr(value).as_bytes())
    }
}

fn python_float_repr(value: f64) -> String {
    if value.is_nan() {
        return "NaN".to_string();
    }
    if value.is_infinite() {
        return if value > 0.0 { "Infinity" } else { "-Infinity" }.to_string();
    }

    let sci = format!("{value:e}");
    let (mantissa, exp) = sci.split_once('e').unwrap_or((&sci, "0"));
    let exp: i32 = exp.parse().unwrap_or_default();
    if (-4..16).contains(&exp) {
        let fixed = value.to_string();
        if fixed.contains('.') {
            fixed
        } else {
            format!("{fixed}.0")
        }
    } else {
        let sign = if exp < 0 { '-' } else { '+' };
        format!("{mantissa}e{sign}{:02}", exp.abs())
    }
}
