//! End-to-end land-cover analysis
//!
//! reflectance composite → tasseled cap (clipped to the study region) →
//! labeled samples → random split → {train on the split, evaluate on the
//! held-out part} and {train on all samples, classify the region} →
//! per-class area.
//!
//! The evaluation model and the production model are trained separately, so
//! the reported accuracy describes a model fitted on fewer samples than the
//! one that produced the map.

use crate::classification::{
    class_counts, classify_raster, evaluate, extract_samples, random_split, Classifier,
    ConfusionMatrix, LandCoverClass, SplitParams,
};
use crate::imagery::tasseled_cap;
use crate::statistics::{class_areas, AreaResult};
use covermap_core::io::DateRange;
use covermap_core::raster::{BandStack, Raster};
use covermap_core::vector::{AttributeValue, Feature, FeatureCollection};
use covermap_core::{ClassLabel, Error, LabeledRegion, Result};
use geo::{coord, Geometry, Polygon, Rect};
use serde::{Deserialize, Serialize};
use std::fmt;
use tracing::info;

/// Attribute holding the class of a sample feature
pub const CLASS_PROPERTY: &str = "class";

/// A class of the study legend
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClassInfo {
    pub label: ClassLabel,
    pub name: String,
}

/// Rectangular training footprint, `[x0, y0, x1, y1]` in any corner order
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SampleRect {
    pub label: ClassLabel,
    pub rect: [f64; 4],
}

/// Everything that defines one analysis run apart from the imagery itself.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StudyConfig {
    pub name: String,
    /// Region of interest `[x0, y0, x1, y1]`
    pub region: [f64; 4],
    pub dates: DateRange,
    pub classes: Vec<ClassInfo>,
    pub samples: Vec<SampleRect>,
    #[serde(default)]
    pub split: SplitParams,
}

impl StudyConfig {
    /// Aquaculture mapping in the Ca Mau peninsula, South Vietnam, from a
    /// 2004-2005 Landsat 5 TM composite
    pub fn mekong_delta() -> Self {
        use LandCoverClass::{Aquaculture, Vegetation, Water};

        let rect = |class: LandCoverClass, rect: [f64; 4]| SampleRect {
            label: class.label(),
            rect,
        };

        Self {
            name: "mekong-delta-aquaculture".into(),
            region: [104.89, 8.73, 104.70, 8.55],
            dates: DateRange::new("2004-01-01", "2005-12-31"),
            classes: LandCoverClass::ALL
                .iter()
                .map(|c| ClassInfo {
                    label: c.label(),
                    name: c.name().into(),
                })
                .collect(),
            samples: vec![
                rect(Aquaculture, [104.732, 8.622, 104.722, 8.612]),
                rect(Aquaculture, [104.817, 8.691, 104.807, 8.681]),
                rect(Water, [104.73, 8.70, 104.72, 8.69]),
                rect(Water, [104.72, 8.58, 104.71, 8.57]),
                rect(Water, [104.86, 8.693, 104.85, 8.692]),
                rect(Vegetation, [104.785, 8.62, 104.775, 8.61]),
                rect(Vegetation, [104.83, 8.7, 104.825, 8.695]),
            ],
            split: SplitParams {
                train_fraction: 0.6,
                seed: Some(0),
            },
        }
    }

    pub fn region_polygon(&self) -> Polygon<f64> {
        let [x0, y0, x1, y1] = self.region;
        covermap_core::vector::rectangle(x0, y0, x1, y1)
    }

    /// Region of interest as (min_x, min_y, max_x, max_y)
    pub fn bounds(&self) -> (f64, f64, f64, f64) {
        let [x0, y0, x1, y1] = self.region;
        (x0.min(x1), y0.min(y1), x0.max(x1), y0.max(y1))
    }

    /// Sample rectangles as features tagged with [`CLASS_PROPERTY`]
    pub fn sample_features(&self) -> FeatureCollection {
        let mut fc = FeatureCollection::new();
        for s in &self.samples {
            let [x0, y0, x1, y1] = s.rect;
            let rect = Rect::new(coord! { x: x0, y: y0 }, coord! { x: x1, y: y1 });
            fc.push(
                Feature::new(Geometry::Rect(rect))
                    .with_property(CLASS_PROPERTY, AttributeValue::Int(s.label as i64)),
            );
        }
        fc
    }

    pub fn labeled_regions(&self) -> Result<Vec<LabeledRegion>> {
        self.sample_features().labeled_regions(CLASS_PROPERTY)
    }

    /// Legend labels, ascending
    pub fn class_labels(&self) -> Vec<ClassLabel> {
        let mut labels: Vec<ClassLabel> = self.classes.iter().map(|c| c.label).collect();
        labels.sort_unstable();
        labels.dedup();
        labels
    }

    pub fn class_name(&self, label: ClassLabel) -> String {
        self.classes
            .iter()
            .find(|c| c.label == label)
            .map_or_else(|| format!("class {}", label), |c| c.name.clone())
    }

    /// Check the legend is non-empty and every sample uses a legend label.
    pub fn validate(&self) -> Result<()> {
        if self.classes.is_empty() {
            return Err(Error::InvalidParameter {
                name: "classes",
                value: "[]".into(),
                reason: "the study needs at least one class".into(),
            });
        }
        let labels = self.class_labels();
        if let Some(s) = self.samples.iter().find(|s| !labels.contains(&s.label)) {
            return Err(Error::UnknownLabel(s.label));
        }
        let (min_x, min_y, max_x, max_y) = self.bounds();
        if !(max_x > min_x && max_y > min_y) {
            return Err(Error::InvalidParameter {
                name: "region",
                value: format!("{:?}", self.region),
                reason: "region must have a positive extent".into(),
            });
        }
        Ok(())
    }
}

impl Default for StudyConfig {
    fn default() -> Self {
        Self::mekong_delta()
    }
}

/// Per-class value in a report
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClassValue<T> {
    pub label: ClassLabel,
    pub name: String,
    pub value: T,
}

/// Area of one class
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClassAreaReport {
    pub label: ClassLabel,
    pub name: String,
    pub area_m2: f64,
    pub area_km2: f64,
}

/// Summary of one analysis run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalysisReport {
    pub study: String,
    pub classifier: String,
    pub n_samples: usize,
    pub n_training: usize,
    pub n_testing: usize,
    pub samples_per_class: Vec<ClassValue<usize>>,
    pub labels: Vec<ClassLabel>,
    /// Rows actual, columns predicted, in `labels` order
    pub confusion_matrix: Vec<Vec<usize>>,
    pub overall_accuracy: Option<f64>,
    pub producers_accuracy: Vec<ClassValue<Option<f64>>>,
    pub consumers_accuracy: Vec<ClassValue<Option<f64>>>,
    pub kappa: Option<f64>,
    pub areas: Vec<ClassAreaReport>,
}

/// Report plus the rasters it was computed from
#[derive(Debug, Clone)]
pub struct AnalysisOutput {
    pub report: AnalysisReport,
    pub matrix: ConfusionMatrix,
    /// Tasseled cap clipped to the study region
    pub features: BandStack,
    /// Production model output; 255 outside the region
    pub classified: Raster<u8>,
}

/// Run the whole analysis on a reflectance composite.
///
/// # Errors
/// Any stage error aborts the run: `EmptyRegion` if the study region misses
/// the composite, `OverlapConflict` for conflicting sample rectangles,
/// `InsufficientData` if a class ends up without training samples.
pub fn run_analysis<C: Classifier>(
    stack: &BandStack,
    study: &StudyConfig,
    classifier: &C,
) -> Result<AnalysisOutput> {
    study.validate()?;
    let classes = study.class_labels();
    let region = study.region_polygon();

    let features = tasseled_cap(stack, &region)?;
    info!(
        "Tasseled cap: {} x {} pixels in study region",
        features.cols(),
        features.rows()
    );

    let regions = study.labeled_regions()?;
    let samples = extract_samples(&features, &regions)?;
    let counts = class_counts(&samples);
    info!("Extracted {} samples from {} regions", samples.len(), regions.len());

    let split = random_split(samples.clone(), &study.split)?;
    let sizes = (split.training.len(), split.testing.len());
    info!("Split: {} training, {} testing", sizes.0, sizes.1);

    let eval_model = classifier.train(&split.training, &classes)?;
    let matrix = evaluate(&split.testing, &eval_model, &classes)?;
    info!("Overall accuracy: {:?}", matrix.overall_accuracy());

    let production = classifier.train(&samples, &classes)?;
    let classified = classify_raster(&features, &production)?;
    let areas = class_areas(&classified, &classes, &region)?;

    let report = build_report(study, classifier.name(), &counts, sizes, &matrix, &areas);
    Ok(AnalysisOutput {
        report,
        matrix,
        features,
        classified,
    })
}

fn build_report(
    study: &StudyConfig,
    classifier: &str,
    counts: &[(ClassLabel, usize)],
    (n_training, n_testing): (usize, usize),
    matrix: &ConfusionMatrix,
    areas: &[AreaResult],
) -> AnalysisReport {
    let per_class = |values: Vec<(ClassLabel, Option<f64>)>| -> Vec<ClassValue<Option<f64>>> {
        values
            .into_iter()
            .map(|(label, value)| ClassValue {
                label,
                name: study.class_name(label),
                value,
            })
            .collect()
    };

    AnalysisReport {
        study: study.name.clone(),
        classifier: classifier.into(),
        n_samples: n_training + n_testing,
        n_training,
        n_testing,
        samples_per_class: study
            .class_labels()
            .into_iter()
            .map(|label| ClassValue {
                label,
                name: study.class_name(label),
                value: counts
                    .iter()
                    .find(|(l, _)| *l == label)
                    .map_or(0, |(_, n)| *n),
            })
            .collect(),
        labels: matrix.labels().to_vec(),
        confusion_matrix: matrix.to_rows(),
        overall_accuracy: matrix.overall_accuracy(),
        producers_accuracy: per_class(matrix.producers_accuracy()),
        consumers_accuracy: per_class(matrix.consumers_accuracy()),
        kappa: matrix.kappa(),
        areas: areas
            .iter()
            .map(|a| ClassAreaReport {
                label: a.label,
                name: study.class_name(a.label),
                area_m2: a.area_m2,
                area_km2: a.area_km2(),
            })
            .collect(),
    }
}

fn fmt_ratio(v: Option<f64>) -> String {
    v.map_or_else(|| "n/a".into(), |v| format!("{:.4}", v))
}

impl fmt::Display for AnalysisReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Study:      {}", self.study)?;
        writeln!(f, "Classifier: {}", self.classifier)?;
        writeln!(
            f,
            "Samples:    {} ({} training, {} testing)",
            self.n_samples, self.n_training, self.n_testing
        )?;
        for c in &self.samples_per_class {
            writeln!(f, "  {:<12} {}", c.name, c.value)?;
        }

        writeln!(f, "\nConfusion matrix (rows actual, columns predicted):")?;
        write!(f, "{:>8}", "")?;
        for label in &self.labels {
            write!(f, "{:>8}", label)?;
        }
        writeln!(f)?;
        for (label, row) in self.labels.iter().zip(&self.confusion_matrix) {
            write!(f, "{:>8}", label)?;
            for count in row {
                write!(f, "{:>8}", count)?;
            }
            writeln!(f)?;
        }

        writeln!(f, "\nOverall accuracy: {}", fmt_ratio(self.overall_accuracy))?;
        writeln!(f, "Kappa:            {}", fmt_ratio(self.kappa))?;
        writeln!(f, "{:<12} {:>10} {:>10}", "class", "producers", "consumers")?;
        for (p, c) in self.producers_accuracy.iter().zip(&self.consumers_accuracy) {
            writeln!(
                f,
                "{:<12} {:>10} {:>10}",
                p.name,
                fmt_ratio(p.value),
                fmt_ratio(c.value)
            )?;
        }

        writeln!(f, "\nArea:")?;
        for a in &self.areas {
            writeln!(f, "  {:<12} {:>14.1} m²  {:>10.3} km²", a.name, a.area_m2, a.area_km2)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::classification::MinimumDistanceClassifier;

    #[test]
    fn mekong_study_matches_reference() {
        let study = StudyConfig::mekong_delta();
        assert!(study.validate().is_ok());
        assert_eq!(study.class_labels(), vec![0, 1, 2]);
        assert_eq!(study.samples.len(), 7);
        assert_eq!(study.bounds(), (104.70, 8.55, 104.89, 8.73));
        assert_eq!(study.class_name(1), "water");
        assert_eq!(study.class_name(9), "class 9");

        let regions = study.labeled_regions().unwrap();
        assert_eq!(regions.iter().filter(|r| r.label == 1).count(), 3);
    }

    #[test]
    fn study_json_roundtrip() {
        let study = StudyConfig::mekong_delta();
        let json = serde_json::to_string_pretty(&study).unwrap();
        let back: StudyConfig = serde_json::from_str(&json).unwrap();
        assert_eq!(study, back);
    }

    #[test]
    fn split_defaults_when_missing_from_json() {
        let json = r#"{
            "name": "tiny",
            "region": [0, 0, 2, 2],
            "dates": {"start": "2004-01-01", "end": "2004-12-31"},
            "classes": [{"label": 0, "name": "a"}],
            "samples": []
        }"#;
        let study: StudyConfig = serde_json::from_str(json).unwrap();
        assert_eq!(study.split, SplitParams::default());
    }

    #[test]
    fn validate_rejects_bad_studies() {
        let mut study = StudyConfig::mekong_delta();
        study.samples.push(SampleRect {
            label: 7,
            rect: [104.8, 8.6, 104.81, 8.61],
        });
        assert!(matches!(study.validate(), Err(Error::UnknownLabel(7))));

        let mut flat = StudyConfig::mekong_delta();
        flat.region = [104.8, 8.6, 104.8, 8.7];
        assert!(flat.validate().is_err());
    }

    #[test]
    fn region_outside_composite_aborts() {
        let mut stack = BandStack::new(&covermap_core::raster::TM_BAND_NAMES, 2, 2);
        stack.set_transform(covermap_core::GeoTransform::new(0.0, 2.0, 1.0, -1.0));
        let err = run_analysis(&stack, &StudyConfig::mekong_delta(), &MinimumDistanceClassifier)
            .unwrap_err();
        assert!(matches!(err, Error::EmptyRegion { .. }));
    }
}
