//! Minimum distance (nearest class mean) classification
//!
//! Each class is summarised by the mean of its training feature vectors;
//! a pixel is assigned to the class whose mean is nearest in Euclidean
//! distance. Simple and fast, but ignores class variance.

use crate::classification::classifier::{check_class_coverage, class_set};
use crate::classification::{Classifier, LabeledSample, TrainedClassifier};
use crate::imagery::{FeatureVector, N_BANDS};
use covermap_core::{ClassLabel, Error, Result};
use serde::{Deserialize, Serialize};

/// Nearest class mean classifier
#[derive(Debug, Clone, Copy, Default)]
pub struct MinimumDistanceClassifier;

/// Mean feature vector of one class
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClassCentroid {
    pub label: ClassLabel,
    pub mean: FeatureVector,
    pub count: usize,
}

/// Fitted class means, sorted by label. Empty means untrained.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ClassCentroids {
    centroids: Vec<ClassCentroid>,
}

impl ClassCentroids {
    pub fn centroids(&self) -> &[ClassCentroid] {
        &self.centroids
    }
}

impl Classifier for MinimumDistanceClassifier {
    type Model = ClassCentroids;

    fn name(&self) -> &'static str {
        "minimum-distance"
    }

    fn train(&self, samples: &[LabeledSample], classes: &[ClassLabel]) -> Result<ClassCentroids> {
        check_class_coverage(samples, classes)?;

        let centroids = class_set(classes)
            .into_iter()
            .map(|label| {
                let mut sum = [0.0; N_BANDS];
                let mut count = 0usize;
                for s in samples.iter().filter(|s| s.label == label) {
                    for (acc, v) in sum.iter_mut().zip(&s.features) {
                        *acc += v;
                    }
                    count += 1;
                }
                let n = count as f64;
                ClassCentroid {
                    label,
                    mean: sum.map(|v| v / n),
                    count,
                }
            })
            .collect();

        Ok(ClassCentroids { centroids })
    }
}

impl TrainedClassifier for ClassCentroids {
    fn predict(&self, features: &FeatureVector) -> Result<ClassLabel> {
        if self.centroids.is_empty() {
            return Err(Error::UntrainedModel);
        }
        if features.iter().any(|v| !v.is_finite()) {
            return Err(Error::Algorithm("cannot classify a non-finite feature vector".into()));
        }

        let mut best_dist = f64::INFINITY;
        let mut best_label = self.centroids[0].label;
        for c in &self.centroids {
            let dist: f64 = c
                .mean
                .iter()
                .zip(features)
                .map(|(m, f)| (m - f) * (m - f))
                .sum();
            // Strict comparison: ties go to the lower label
            if dist < best_dist {
                best_dist = dist;
                best_label = c.label;
            }
        }
        Ok(best_label)
    }
}
