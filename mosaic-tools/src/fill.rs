//! Fill quadkeys missing from one mosaic with the assets another mosaic has for them.

use std::collections::BTreeMap;

use itertools::Itertools as _;
use tracing::{debug, info};

use crate::{MosaicError, MosaicJson, MosaicResult};

/// Number of quadkeys that were copied into each mosaic, in input order.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct FillSummary {
    pub total_quadkeys: usize,
    pub filled: Vec<usize>,
}

/// Make every mosaic contain the union of all quadkeys.
///
/// Mosaics must be ordered from the most to the least authoritative (e.g. newest imagery first):
/// a missing quadkey is always taken from the first mosaic in that order that has it.
/// A single mosaic is left unchanged.
pub fn fill_holes(mosaics: &mut [MosaicJson]) -> MosaicResult<FillSummary> {
    check_quadkey_zoom(mosaics)?;

    // quadkey -> index of the first mosaic that has it
    let mut sources: BTreeMap<String, usize> = BTreeMap::new();
    for (idx, mosaic) in mosaics.iter().enumerate() {
        for quadkey in mosaic.tiles.keys() {
            sources.entry(quadkey.clone()).or_insert(idx);
        }
    }

    let mut filled = Vec::with_capacity(mosaics.len());
    for idx in 0..mosaics.len() {
        let missing = sources
            .iter()
            .filter(|(quadkey, _)| !mosaics[idx].tiles.contains_key(*quadkey))
            .map(|(quadkey, src)| (quadkey.clone(), mosaics[*src].tiles[quadkey].clone()))
            .collect_vec();
        debug!("Filling {} quadkeys in mosaic #{idx}", missing.len());
        filled.push(missing.len());
        mosaics[idx].tiles.extend(missing);
    }

    let counts = mosaics.iter().map(|m| m.tiles.len()).collect_vec();
    if counts.iter().any(|count| *count != sources.len()) {
        return Err(MosaicError::InconsistentQuadkeys {
            expected: sources.len(),
            counts,
        });
    }

    info!(
        "Filled {} mosaics to {} quadkeys each",
        mosaics.len(),
        sources.len()
    );
    Ok(FillSummary {
        total_quadkeys: sources.len(),
        filled,
    })
}

fn check_quadkey_zoom(mosaics: &[MosaicJson]) -> MosaicResult<()> {
    let mut expected = None;
    for (index, mosaic) in mosaics.iter().enumerate() {
        for quadkey in mosaic.tiles.keys() {
            let expected = *expected.get_or_insert(quadkey.len());
            if quadkey.len() != expected {
                return Err(MosaicError::MixedQuadkeyZoom {
                    index,
                    quadkey: quadkey.clone(),
                    expected,
                });
            }
        }
    }
    Ok(())
}
