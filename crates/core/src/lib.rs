//! # CoverMap Core
//!
//! Core types and I/O for the CoverMap land-cover toolkit.
//!
//! This crate provides:
//! - `Raster<T>`: single-band georeferenced grid (bands, class maps)
//! - `BandStack`: co-registered multi-band grid (reflectance, tasseled cap)
//! - `GeoTransform`: affine georeferencing and pixel windows
//! - `CRS`: coordinate reference system handling
//! - Vector features and labeled training regions
//! - GeoTIFF I/O and the `BandSource` abstraction over imagery archives

pub mod crs;
pub mod error;
pub mod io;
pub mod raster;
pub mod vector;

pub use crs::CRS;
pub use error::{Error, Result};
pub use raster::{BandStack, GeoTransform, PixelWindow, Raster, RasterElement};
pub use vector::{ClassLabel, LabeledRegion, NODATA_CLASS};

/// Prelude for convenient imports
pub mod prelude {
    pub use crate::crs::CRS;
    pub use crate::error::{Error, Result};
    pub use crate::io::{BandSource, DateRange};
    pub use crate::raster::{BandStack, GeoTransform, Raster, RasterElement, TM_BAND_NAMES};
    pub use crate::vector::{ClassLabel, LabeledRegion, NODATA_CLASS};
}
