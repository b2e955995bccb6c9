use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::{MosaicError, MosaicResult};

/// Number of leading file name characters that, together with the cell, identify an imagery block.
pub const DEFAULT_BLOCK_PREFIX_LEN: usize = 18;

/// Settings for reading imagery manifests, optionally loaded from a YAML file.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ManifestConfig {
    /// Non-data lines that are dropped when they match exactly
    pub skip_lines: Vec<String>,
    /// Only paths with this suffix are imagery
    pub extension: String,
    pub block_prefix_len: usize,
}

impl Default for ManifestConfig {
    fn default() -> Self {
        Self {
            skip_lines: vec![
                "manifest.txt".to_string(),
                "manifest.test".to_string(),
                "readme.html".to_string(),
            ],
            extension: ".tif".to_string(),
            block_prefix_len: DEFAULT_BLOCK_PREFIX_LEN,
        }
    }
}

impl ManifestConfig {
    pub fn read(path: &Path) -> MosaicResult<Self> {
        let text =
            fs::read_to_string(path).map_err(|e| MosaicError::IoError(e, path.to_path_buf()))?;
        serde_yaml::from_str(&text).map_err(|e| MosaicError::ConfigParseError(e, path.to_path_buf()))
    }
}
