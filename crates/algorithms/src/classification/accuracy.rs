//! Confusion matrix accuracy assessment
//!
//! Rows are actual (reference) classes, columns predicted classes.
//! - Overall accuracy: trace / total
//! - Producer's accuracy of class i: `M[i][i] / Σⱼ M[i][j]` (1 - omission error)
//! - Consumer's accuracy of class i: `M[i][i] / Σⱼ M[j][i]` (1 - commission error)
//! - Cohen's kappa: `(pₒ - pₑ) / (1 - pₑ)`
//!
//! Ratios with a zero denominator are `None` rather than NaN.

use crate::classification::classifier::class_set;
use crate::classification::{LabeledSample, TrainedClassifier};
use crate::maybe_rayon::*;
use covermap_core::{ClassLabel, Error, Result};
use ndarray::Array2;
use tracing::debug;

/// Samples per evaluation work unit
const CHUNK: usize = 1024;

/// Square count matrix over a fixed, sorted label set
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConfusionMatrix {
    labels: Vec<ClassLabel>,
    counts: Array2<usize>,
}

impl ConfusionMatrix {
    /// Zeroed matrix; `labels` are sorted and deduplicated
    pub fn new(labels: &[ClassLabel]) -> Self {
        let labels = class_set(labels);
        let k = labels.len();
        Self {
            labels,
            counts: Array2::zeros((k, k)),
        }
    }

    /// Tally `(actual, predicted)` pairs.
    ///
    /// Fails with `UnknownLabel` if either side is outside `labels`.
    pub fn from_pairs<I>(labels: &[ClassLabel], pairs: I) -> Result<Self>
    where
        I: IntoIterator<Item = (ClassLabel, ClassLabel)>,
    {
        let mut m = Self::new(labels);
        for (actual, predicted) in pairs {
            m.record(actual, predicted)?;
        }
        Ok(m)
    }

    fn index(&self, label: ClassLabel) -> Result<usize> {
        self.labels
            .binary_search(&label)
            .map_err(|_| Error::UnknownLabel(label))
    }

    pub(crate) fn record(&mut self, actual: ClassLabel, predicted: ClassLabel) -> Result<()> {
        let i = self.index(actual)?;
        let j = self.index(predicted)?;
        self.counts[[i, j]] += 1;
        Ok(())
    }

    /// Add another matrix over the same labels
    pub(crate) fn merge(mut self, other: &Self) -> Self {
        self.counts += &other.counts;
        self
    }

    pub fn labels(&self) -> &[ClassLabel] {
        &self.labels
    }

    pub fn counts(&self) -> &Array2<usize> {
        &self.counts
    }

    /// Count of samples with the given actual and predicted class
    pub fn get(&self, actual: ClassLabel, predicted: ClassLabel) -> Option<usize> {
        let i = self.index(actual).ok()?;
        let j = self.index(predicted).ok()?;
        Some(self.counts[[i, j]])
    }

    pub fn total(&self) -> usize {
        self.counts.sum()
    }

    /// Samples whose actual class is `label`
    pub fn row_total(&self, label: ClassLabel) -> Option<usize> {
        let i = self.index(label).ok()?;
        Some(self.counts.row(i).sum())
    }

    /// Samples predicted as `label`
    pub fn col_total(&self, label: ClassLabel) -> Option<usize> {
        let j = self.index(label).ok()?;
        Some(self.counts.column(j).sum())
    }

    fn trace(&self) -> usize {
        self.counts.diag().sum()
    }

    /// Nested rows for reports
    pub fn to_rows(&self) -> Vec<Vec<usize>> {
        self.counts.rows().into_iter().map(|r| r.to_vec()).collect()
    }

    pub fn overall_accuracy(&self) -> Option<f64> {
        ratio(self.trace(), self.total())
    }

    /// Per-class producer's accuracy, in label order
    pub fn producers_accuracy(&self) -> Vec<(ClassLabel, Option<f64>)> {
        self.labels
            .iter()
            .enumerate()
            .map(|(i, &label)| (label, ratio(self.counts[[i, i]], self.counts.row(i).sum())))
            .collect()
    }

    /// Per-class consumer's accuracy, in label order
    pub fn consumers_accuracy(&self) -> Vec<(ClassLabel, Option<f64>)> {
        self.labels
            .iter()
            .enumerate()
            .map(|(j, &label)| (label, ratio(self.counts[[j, j]], self.counts.column(j).sum())))
            .collect()
    }

    /// Cohen's kappa. `None` when empty or when chance agreement is 1.
    pub fn kappa(&self) -> Option<f64> {
        let n = self.total();
        if n == 0 {
            return None;
        }
        let n = n as f64;
        let po = self.trace() as f64 / n;
        let pe: f64 = (0..self.labels.len())
            .map(|k| {
                let row = self.counts.row(k).sum() as f64;
                let col = self.counts.column(k).sum() as f64;
                row * col
            })
            .sum::<f64>()
            / (n * n);
        if (1.0 - pe).abs() < f64::EPSILON {
            return None;
        }
        Some((po - pe) / (1.0 - pe))
    }
}

fn ratio(num: usize, den: usize) -> Option<f64> {
    (den > 0).then(|| num as f64 / den as f64)
}

/// Predict each test sample and tally it against its reference label.
///
/// `classes` fixes the matrix axes. An empty test set gives an all-zero
/// matrix. Chunks are tallied in parallel and summed, so the result does
/// not depend on scheduling.
pub fn evaluate<M: TrainedClassifier>(
    test: &[LabeledSample],
    model: &M,
    classes: &[ClassLabel],
) -> Result<ConfusionMatrix> {
    let empty = ConfusionMatrix::new(classes);

    let partials: Vec<ConfusionMatrix> = test
        .chunks(CHUNK)
        .collect::<Vec<_>>()
        .into_par_iter()
        .map(|chunk| -> Result<ConfusionMatrix> {
            let mut m = empty.clone();
            for s in chunk {
                let predicted = model.predict(&s.features)?;
                m.record(s.label, predicted)?;
            }
            Ok(m)
        })
        .collect::<Result<Vec<_>>>()?;

    let matrix = partials.iter().fold(empty, |acc, m| acc.merge(m));
    debug!(
        "Evaluated {} test samples, overall accuracy {:?}",
        matrix.total(),
        matrix.overall_accuracy()
    );
    Ok(matrix)
}
