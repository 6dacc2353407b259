//! Raster sources supplying six-band reflectance composites

use crate::crs::CRS;
use crate::error::{Error, Result};
use crate::io::read_geotiff;
use crate::raster::{BandStack, Raster, TM_BAND_NAMES};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use tracing::{debug, info};

/// Inclusive acquisition window, ISO dates (`YYYY-MM-DD`)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DateRange {
    pub start: String,
    pub end: String,
}

impl DateRange {
    pub fn new(start: impl Into<String>, end: impl Into<String>) -> Self {
        Self {
            start: start.into(),
            end: end.into(),
        }
    }
}

/// Anything that can deliver a reflectance composite covering a region.
///
/// Implementations report every failure (missing files, no coverage,
/// network errors) as [`Error::SourceUnavailable`].
pub trait BandSource {
    /// Fetch the B1, B2, B3, B4, B5, B7 composite covering `bounds`
    /// (min_x, min_y, max_x, max_y) for the given dates.
    fn fetch(&self, bounds: (f64, f64, f64, f64), dates: &DateRange) -> Result<BandStack>;
}

/// Composite already exported as six single-band GeoTIFF files.
///
/// The date range is not checked: the files are assumed to hold the
/// composite for the requested window.
#[derive(Debug, Clone)]
pub struct GeoTiffBandSource {
    paths: Vec<PathBuf>,
    crs: Option<CRS>,
}

impl GeoTiffBandSource {
    /// `paths` must list the band files in B1, B2, B3, B4, B5, B7 order
    pub fn new(paths: Vec<PathBuf>) -> Result<Self> {
        if paths.len() != TM_BAND_NAMES.len() {
            return Err(Error::DimensionMismatch {
                expected: TM_BAND_NAMES.len(),
                actual: paths.len(),
            });
        }
        Ok(Self { paths, crs: None })
    }

    /// CRS to assume when the files carry no GeoKey EPSG code
    pub fn with_crs(mut self, crs: CRS) -> Self {
        self.crs = Some(crs);
        self
    }
}

impl BandSource for GeoTiffBandSource {
    fn fetch(&self, bounds: (f64, f64, f64, f64), dates: &DateRange) -> Result<BandStack> {
        debug!("Reading composite for {} .. {}", dates.start, dates.end);

        let mut bands: Vec<Raster<f64>> = Vec::with_capacity(self.paths.len());
        for path in &self.paths {
            let mut band: Raster<f64> = read_geotiff(path).map_err(|e| {
                Error::SourceUnavailable(format!("{}: {}", path.display(), e))
            })?;
            if band.crs().is_none() {
                band.set_crs(self.crs.clone());
            }
            bands.push(band);
        }

        let stack = BandStack::from_bands(&TM_BAND_NAMES, &bands)
            .map_err(|e| Error::SourceUnavailable(format!("inconsistent band files: {}", e)))?;

        let (min_x, min_y, max_x, max_y) = stack.bounds();
        let (qx0, qy0, qx1, qy1) = bounds;
        if qx1 < min_x || qx0 > max_x || qy1 < min_y || qy0 > max_y {
            return Err(Error::SourceUnavailable(format!(
                "composite [{}, {}, {}, {}] does not cover the requested region",
                min_x, min_y, max_x, max_y
            )));
        }

        info!(
            "Composite: {} x {} pixels, {} bands",
            stack.cols(),
            stack.rows(),
            stack.n_bands()
        );
        Ok(stack)
    }
}
