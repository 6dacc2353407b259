//! Supervised land-cover classification
//!
//! - **samples**: labeled training pixels from reference regions
//! - **split**: random train/test partition
//! - **classifier**: learner/model traits and per-pixel raster classification
//! - **Minimum Distance**: nearest class mean
//! - **CART**: Gini decision tree
//! - **accuracy**: confusion matrix, overall/producer's/consumer's accuracy, kappa

mod accuracy;
mod cart;
mod classes;
mod classifier;
mod minimum_distance;
mod samples;
mod split;

pub use accuracy::{evaluate, ConfusionMatrix};
pub use cart::{CartClassifier, CartParams, DecisionTree, TreeNode};
pub use classes::LandCoverClass;
pub use classifier::{check_class_coverage, classify_raster, Classifier, TrainedClassifier};
pub use minimum_distance::{ClassCentroid, ClassCentroids, MinimumDistanceClassifier};
pub use samples::{class_counts, extract_samples, LabeledSample};
pub use split::{random_split, DatasetSplit, SplitParams};
