//! Training sample extraction from labeled regions

use crate::imagery::{FeatureVector, N_BANDS};
use covermap_core::raster::BandStack;
use covermap_core::{ClassLabel, Error, LabeledRegion, Result};
use geo::{Intersects, Point};
use std::collections::HashMap;
use tracing::debug;

/// One pixel's feature vector with the class of the region that covers it.
#[derive(Debug, Clone, PartialEq)]
pub struct LabeledSample {
    pub features: FeatureVector,
    pub label: ClassLabel,
    /// Index of the source region in the list passed to [`extract_samples`]
    pub region: usize,
    pub row: usize,
    pub col: usize,
}

/// Sample every pixel whose center lies inside a labeled region.
///
/// Regions are visited in order and pixels in row-major order, so the
/// result is deterministic.
///
/// - A pixel inside two regions with different labels is an
///   `OverlapConflict`. With the same label the first region keeps it and
///   it is sampled once.
/// - Regions covering no pixel center contribute nothing.
/// - Pixels with non-finite features (outside the clip, no-data) are skipped.
///
/// # Errors
/// `DimensionMismatch` if the feature stack does not have six bands.
pub fn extract_samples(
    features: &BandStack,
    regions: &[LabeledRegion],
) -> Result<Vec<LabeledSample>> {
    if features.n_bands() != N_BANDS {
        return Err(Error::DimensionMismatch {
            expected: N_BANDS,
            actual: features.n_bands(),
        });
    }

    let (rows, cols) = features.shape();
    let gt = features.transform();
    // pixel -> (region index, label) of the region that claimed it
    let mut claimed: HashMap<(usize, usize), (usize, ClassLabel)> = HashMap::new();
    let mut samples = Vec::new();
    let mut buf = [0.0; N_BANDS];

    for (idx, region) in regions.iter().enumerate() {
        let Some(window) = crate::region_window(gt, &region.geometry, cols, rows) else {
            debug!("Sample region {} (class {}) covers no pixels", idx, region.label);
            continue;
        };

        let mut taken = 0usize;
        for (row, col) in window.cells() {
            let (x, y) = gt.pixel_to_geo(col, row);
            if !region.geometry.intersects(&Point::new(x, y)) {
                continue;
            }

            if let Some(&(first, label)) = claimed.get(&(row, col)) {
                if label != region.label {
                    return Err(Error::OverlapConflict {
                        row,
                        col,
                        first_region: first,
                        first_label: label,
                        second_region: idx,
                        second_label: region.label,
                    });
                }
                continue;
            }
            claimed.insert((row, col), (idx, region.label));

            features.read_pixel_into(row, col, &mut buf)?;
            if buf.iter().any(|v| !v.is_finite()) {
                continue;
            }
            samples.push(LabeledSample {
                features: buf,
                label: region.label,
                region: idx,
                row,
                col,
            });
            taken += 1;
        }
        debug!("Sample region {} (class {}): {} pixels", idx, region.label, taken);
    }

    Ok(samples)
}

/// Number of samples per label, sorted by label
pub fn class_counts(samples: &[LabeledSample]) -> Vec<(ClassLabel, usize)> {
    let mut counts: HashMap<ClassLabel, usize> = HashMap::new();
    for s in samples {
        *counts.entry(s.label).or_default() += 1;
    }
    let mut counts: Vec<_> = counts.into_iter().collect();
    counts.sort_unstable();
    counts
}
