//! Supervised classifier interface and raster classification

use crate::classification::LabeledSample;
use crate::imagery::{FeatureVector, N_BANDS};
use crate::maybe_rayon::*;
use covermap_core::raster::{BandStack, Raster};
use covermap_core::{ClassLabel, Error, Result, NODATA_CLASS};
use tracing::debug;

/// A fitted model. Prediction never mutates it.
pub trait TrainedClassifier: Send + Sync {
    /// Predict the class of one feature vector.
    ///
    /// Fails with `UntrainedModel` if the model holds no fitted state.
    fn predict(&self, features: &FeatureVector) -> Result<ClassLabel>;
}

/// A supervised learning algorithm.
///
/// `train` returns a new, independent model each call; nothing is cached
/// between calls, so a model fitted on a subset and one fitted on the full
/// sample set never share state.
pub trait Classifier {
    type Model: TrainedClassifier;

    /// Short algorithm name for logs and reports
    fn name(&self) -> &'static str;

    /// Fit a model to `samples` over the class set `classes`.
    ///
    /// # Errors
    /// - `InsufficientData` if a class in `classes` has no sample
    /// - `UnknownLabel` if a sample label is not in `classes`
    fn train(&self, samples: &[LabeledSample], classes: &[ClassLabel]) -> Result<Self::Model>;
}

/// Sorted, deduplicated copy of a class list
pub(crate) fn class_set(classes: &[ClassLabel]) -> Vec<ClassLabel> {
    let mut set = classes.to_vec();
    set.sort_unstable();
    set.dedup();
    set
}

/// Check every sample label is known and every class has a sample.
pub fn check_class_coverage(samples: &[LabeledSample], classes: &[ClassLabel]) -> Result<()> {
    let set = class_set(classes);
    if set.is_empty() {
        return Err(Error::InvalidParameter {
            name: "classes",
            value: "[]".into(),
            reason: "at least one class is required".into(),
        });
    }
    let mut seen = vec![false; set.len()];
    for s in samples {
        let idx = set.binary_search(&s.label).map_err(|_| Error::UnknownLabel(s.label))?;
        seen[idx] = true;
    }

    let missing: Vec<ClassLabel> = set
        .iter()
        .zip(&seen)
        .filter_map(|(&label, &hit)| (!hit).then_some(label))
        .collect();
    if !missing.is_empty() {
        return Err(Error::InsufficientData { missing });
    }
    Ok(())
}

/// Classify every pixel of a feature stack.
///
/// Cells with any non-finite feature become [`NODATA_CLASS`]. The output
/// shares the stack's grid, transform and CRS.
pub fn classify_raster<M: TrainedClassifier>(features: &BandStack, model: &M) -> Result<Raster<u8>> {
    if features.n_bands() != N_BANDS {
        return Err(Error::DimensionMismatch {
            expected: N_BANDS,
            actual: features.n_bands(),
        });
    }

    let (rows, cols) = features.shape();
    let lines: Vec<Vec<ClassLabel>> = (0..rows)
        .into_par_iter()
        .map(|row| -> Result<Vec<ClassLabel>> {
            let mut buf = [0.0; N_BANDS];
            let mut line = vec![NODATA_CLASS; cols];
            for (col, out) in line.iter_mut().enumerate() {
                features.read_pixel_into(row, col, &mut buf)?;
                if buf.iter().all(|v| v.is_finite()) {
                    *out = model.predict(&buf)?;
                }
            }
            Ok(line)
        })
        .collect::<Result<Vec<_>>>()?;

    let data: Vec<ClassLabel> = lines.into_iter().flatten().collect();
    let mut output = Raster::from_vec(data, rows, cols)?;
    output.set_transform(*features.transform());
    output.set_crs(features.crs().cloned());
    output.set_nodata(Some(NODATA_CLASS));

    debug!("Classified {} of {} cells", output.valid_count(), output.len());
    Ok(output)
}
