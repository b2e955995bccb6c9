//! Selection of NAIP imagery paths from a bucket manifest.
//!
//! Manifest lines look like `al/2011/100cm/rgb/30085/m_3008501_ne_16_1_20110815.tif`:
//! state, acquisition year, resolution and band folders, the grid cell, and the file.
//! Neighboring states often publish the same physical tile, so paths are grouped by a
//! block id made of the cell and the file name prefix, which does not depend on the year.

use std::collections::BTreeMap;
use std::collections::btree_map::Entry;
use std::fmt::{Display, Formatter};
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::config::{DEFAULT_BLOCK_PREFIX_LEN, ManifestConfig};
use crate::{MosaicError, MosaicResult};

const MIN_SEGMENTS: usize = 4;

/// Which acquisition year to keep when several are available.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
#[cfg_attr(feature = "cli", derive(clap::ValueEnum))]
pub enum SelectMethod {
    /// Keep the earliest year
    First,
    /// Keep the most recent year
    #[default]
    Last,
}

impl SelectMethod {
    /// True if `candidate` should replace `current`. Equal years never replace.
    #[must_use]
    pub fn prefers(self, candidate: u16, current: u16) -> bool {
        match self {
            Self::First => candidate < current,
            Self::Last => candidate > current,
        }
    }

    fn pick(self, years: impl Iterator<Item = u16>) -> Option<u16> {
        match self {
            Self::First => years.min(),
            Self::Last => years.max(),
        }
    }
}

impl FromStr for SelectMethod {
    type Err = MosaicError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "first" => Ok(Self::First),
            "last" => Ok(Self::Last),
            _ => Err(MosaicError::InvalidSelectMethod(s.to_string())),
        }
    }
}

impl Display for SelectMethod {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::First => write!(f, "first"),
            Self::Last => write!(f, "last"),
        }
    }
}

#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum ManifestParseError {
    #[error("Manifest path '{0}' must look like state/year/.../cell/file")]
    TooFewSegments(String),

    #[error("Manifest path '{0}' has an invalid year '{1}'")]
    InvalidYear(String, String),

    #[error("Manifest path '{0}' has an empty state, cell or file name")]
    EmptySegment(String),
}

/// One imagery file from a manifest.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ManifestEntry {
    pub path: String,
    pub state: String,
    pub year: u16,
    pub cell: String,
    /// `{cell}/{file name prefix}`, the same for a tile regardless of year or state
    pub block_id: String,
}

impl ManifestEntry {
    pub fn parse(path: &str, block_prefix_len: usize) -> Result<Self, ManifestParseError> {
        let segments: Vec<&str> = path.split('/').collect();
        if segments.len() < MIN_SEGMENTS {
            return Err(ManifestParseError::TooFewSegments(path.to_string()));
        }
        let (state, year) = (segments[0], segments[1]);
        let (cell, file) = (segments[segments.len() - 2], segments[segments.len() - 1]);
        if state.is_empty() || cell.is_empty() || file.is_empty() {
            return Err(ManifestParseError::EmptySegment(path.to_string()));
        }
        let year = year
            .parse()
            .map_err(|_| ManifestParseError::InvalidYear(path.to_string(), year.to_string()))?;

        let stem = file.rsplit_once('.').map_or(file, |(stem, _)| stem);
        let prefix: String = stem.chars().take(block_prefix_len).collect();

        Ok(Self {
            path: path.to_string(),
            state: state.to_string(),
            year,
            cell: cell.to_string(),
            block_id: format!("{cell}/{prefix}"),
        })
    }
}

/// Keep one entry per block id.
///
/// A later entry replaces the kept one only if `method` strictly prefers its year,
/// so among equal years the first one seen wins. The result is ordered by block id.
pub fn deduplicate<I>(entries: I, method: SelectMethod) -> Vec<ManifestEntry>
where
    I: IntoIterator<Item = ManifestEntry>,
{
    let mut blocks: BTreeMap<String, ManifestEntry> = BTreeMap::new();
    for entry in entries {
        match blocks.entry(entry.block_id.clone()) {
            Entry::Vacant(slot) => {
                slot.insert(entry);
            }
            Entry::Occupied(mut slot) => {
                if method.prefers(entry.year, slot.get().year) {
                    debug!("Replacing {} with {}", slot.get().path, entry.path);
                    slot.insert(entry);
                }
            }
        }
    }
    blocks.into_values().collect()
}

/// Parse and deduplicate raw manifest paths, failing on the first malformed one.
pub fn deduplicate_paths<S: AsRef<str>>(
    paths: &[S],
    method: SelectMethod,
) -> MosaicResult<Vec<String>> {
    let entries = paths
        .iter()
        .map(|p| ManifestEntry::parse(p.as_ref(), DEFAULT_BLOCK_PREFIX_LEN))
        .collect::<Result<Vec<_>, _>>()?;
    Ok(deduplicate(entries, method)
        .into_iter()
        .map(|e| e.path)
        .collect())
}

/// For each state, pick one year within `start..=end` according to `method`.
///
/// States without imagery in the range are left out.
pub fn select_state_years(
    entries: &[ManifestEntry],
    start: u16,
    end: u16,
    method: SelectMethod,
) -> MosaicResult<BTreeMap<String, u16>> {
    if start > end {
        return Err(MosaicError::InvalidYearRange(start, end));
    }
    let mut available: BTreeMap<&str, Vec<u16>> = BTreeMap::new();
    for entry in entries {
        available.entry(&entry.state).or_default().push(entry.year);
    }
    Ok(available
        .into_iter()
        .filter_map(|(state, years)| {
            let in_range = years.into_iter().filter(|y| (start..=end).contains(y));
            method.pick(in_range).map(|year| (state.to_string(), year))
        })
        .collect())
}

/// Result of running a manifest through [`ManifestFilter`].
#[derive(Clone, Debug, Default, PartialEq)]
pub struct ManifestReport {
    pub selected: Vec<String>,
    pub state_years: BTreeMap<String, u16>,
    /// Lines that looked like imagery but could not be parsed
    pub skipped: Vec<ManifestParseError>,
    /// Lines without the imagery extension
    pub ignored: usize,
    /// Entries dropped because another state had the same block
    pub duplicates: usize,
}

/// Selects one year of imagery per state and removes tiles duplicated across states.
#[derive(Clone, Debug)]
pub struct ManifestFilter {
    start_year: u16,
    end_year: u16,
    method: SelectMethod,
    dedup: bool,
    config: ManifestConfig,
}

impl ManifestFilter {
    pub fn new(start_year: u16, end_year: u16, method: SelectMethod) -> MosaicResult<Self> {
        if start_year > end_year {
            return Err(MosaicError::InvalidYearRange(start_year, end_year));
        }
        Ok(Self {
            start_year,
            end_year,
            method,
            dedup: true,
            config: ManifestConfig::default(),
        })
    }

    #[must_use]
    pub fn with_dedup(mut self, dedup: bool) -> Self {
        self.dedup = dedup;
        self
    }

    #[must_use]
    pub fn with_config(mut self, config: ManifestConfig) -> Self {
        self.config = config;
        self
    }

    pub fn select<I, S>(&self, lines: I) -> MosaicResult<ManifestReport>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut report = ManifestReport::default();
        let mut entries = Vec::new();

        for line in lines {
            let line = line.as_ref().trim();
            if line.is_empty() || self.config.skip_lines.iter().any(|s| s == line) {
                continue;
            }
            if !line.ends_with(&self.config.extension) {
                report.ignored += 1;
                continue;
            }
            match ManifestEntry::parse(line, self.config.block_prefix_len) {
                Ok(entry) => entries.push(entry),
                Err(e) => {
                    warn!("Skipping manifest line: {e}");
                    report.skipped.push(e);
                }
            }
        }

        report.state_years =
            select_state_years(&entries, self.start_year, self.end_year, self.method)?;
        entries.retain(|e| report.state_years.get(&e.state) == Some(&e.year));

        let matched = entries.len();
        let selected = if self.dedup {
            deduplicate(entries, self.method)
        } else {
            entries
        };
        report.duplicates = matched - selected.len();
        report.selected = selected.into_iter().map(|e| e.path).collect();

        info!(
            "Selected {} files from {} states, {} duplicates removed, {} lines skipped",
            report.selected.len(),
            report.state_years.len(),
            report.duplicates,
            report.skipped.len()
        );
        Ok(report)
    }
}
