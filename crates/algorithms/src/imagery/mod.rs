//! Imagery transforms
//!
//! - Tasseled cap: fixed 6×6 rotation of Landsat 5 TM reflectance into
//!   brightness, greenness, wetness and three residual components

pub mod tasseled_cap;

pub use tasseled_cap::{
    apply_transform, pixel_vector, tasseled_cap, FeatureVector, PixelVector, SpectralTransform,
    COMPONENT_NAMES, N_BANDS, TM_COEFFICIENTS,
};
