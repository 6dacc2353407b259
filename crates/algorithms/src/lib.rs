//! # CoverMap Algorithms
//!
//! Land-cover analysis of multispectral composites.
//!
//! ## Modules
//!
//! - **imagery**: tasseled cap transform of Landsat 5 TM reflectance
//! - **classification**: sample extraction, random train/test split,
//!   supervised classifiers, raster classification, accuracy assessment
//! - **statistics**: per-class ground area within a region
//! - **pipeline**: study configuration and the end-to-end analysis

mod maybe_rayon;

pub mod classification;
pub mod imagery;
pub mod pipeline;
pub mod statistics;

use covermap_core::raster::{GeoTransform, PixelWindow};
use geo::{BoundingRect, Polygon};

/// Pixels of a `cols` x `rows` grid whose centers fall in the bounding box
/// of `region`.
pub(crate) fn region_window(
    transform: &GeoTransform,
    region: &Polygon<f64>,
    cols: usize,
    rows: usize,
) -> Option<PixelWindow> {
    let rect = region.bounding_rect()?;
    let (min, max) = (rect.min(), rect.max());
    transform.center_window((min.x, min.y, max.x, max.y), cols, rows)
}

/// Prelude for convenient imports
pub mod prelude {
    pub use crate::classification::{
        classify_raster, evaluate, extract_samples, random_split, CartClassifier, CartParams,
        Classifier, ConfusionMatrix, DatasetSplit, LabeledSample, MinimumDistanceClassifier,
        SplitParams, TrainedClassifier,
    };
    pub use crate::imagery::{tasseled_cap, FeatureVector, PixelVector, SpectralTransform};
    pub use crate::pipeline::{run_analysis, AnalysisOutput, AnalysisReport, StudyConfig};
    pub use crate::statistics::{class_area, class_areas, covered_area, AreaResult};
    pub use covermap_core::prelude::*;
}
