//! Error types for CoverMap

use thiserror::Error;

/// Main error type for CoverMap operations
#[derive(Error, Debug)]
pub enum Error {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid raster dimensions: {width}x{height}")]
    InvalidDimensions { width: usize, height: usize },

    #[error("Index out of bounds: ({row}, {col}) in raster of size ({rows}, {cols})")]
    IndexOutOfBounds {
        row: usize,
        col: usize,
        rows: usize,
        cols: usize,
    },

    #[error("Raster size mismatch: expected ({er}, {ec}), got ({ar}, {ac})")]
    SizeMismatch { er: usize, ec: usize, ar: usize, ac: usize },

    #[error("CRS mismatch: {0} vs {1}")]
    CrsMismatch(String, String),

    #[error("Unsupported data type: {0}")]
    UnsupportedDataType(String),

    #[error("Invalid parameter: {name} = {value} ({reason})")]
    InvalidParameter {
        name: &'static str,
        value: String,
        reason: String,
    },

    /// A pixel vector did not have the number of bands the transform expects.
    #[error("Dimension mismatch: expected {expected} bands, got {actual}")]
    DimensionMismatch { expected: usize, actual: usize },

    /// The requested region covers no pixel of the raster.
    #[error("Region covers no pixels of the {rows}x{cols} raster")]
    EmptyRegion { rows: usize, cols: usize },

    /// Two sample geometries with different labels claim the same pixel.
    #[error("Sample regions {first_region} (class {first_label}) and {second_region} (class {second_label}) overlap at pixel ({row}, {col})")]
    OverlapConflict {
        row: usize,
        col: usize,
        first_region: usize,
        first_label: u8,
        second_region: usize,
        second_label: u8,
    },

    /// At least one class has no training samples.
    #[error("Insufficient training data: no samples for class(es) {missing:?}")]
    InsufficientData { missing: Vec<u8> },

    /// Prediction was requested from a model with no fitted state.
    #[error("Classifier has not been trained")]
    UntrainedModel,

    /// The aggregation region lies entirely outside the raster extent.
    #[error("Region [{min_x}, {min_y}, {max_x}, {max_y}] does not intersect the raster extent")]
    RegionMismatch {
        min_x: f64,
        min_y: f64,
        max_x: f64,
        max_y: f64,
    },

    /// A label outside the configured class set.
    #[error("Unknown class label {0}")]
    UnknownLabel(u8),

    /// The upstream raster source could not deliver data.
    #[error("Raster source unavailable: {0}")]
    SourceUnavailable(String),

    #[error("Algorithm error: {0}")]
    Algorithm(String),

    #[error("{0}")]
    Other(String),
}

/// Result type alias for CoverMap operations
pub type Result<T> = std::result::Result<T, Error>;
