//! Ground area of classified pixels within a region
//!
//! A pixel belongs to the region when its center lies inside the polygon
//! (boundary inclusive). Per-pixel area depends on the grid:
//!
//! - Geographic (lon/lat degrees): cell dimensions from the WGS84 radii of
//!   curvature at the pixel's latitude, `dx = N·cos(φ)·Δλ`, `dy = M·Δφ`
//! - Projected: `|pixel_width · pixel_height|`
//!
//! Reference:
//! Florinsky, I.V. (2025). Digital Terrain Analysis. §4.3.

use crate::maybe_rayon::*;
use covermap_core::raster::{Raster, RasterElement};
use covermap_core::{ClassLabel, Error, Result};
use geo::{BoundingRect, Intersects, Point, Polygon};
use serde::{Deserialize, Serialize};
use tracing::debug;

/// WGS84 ellipsoid parameters
const WGS84_A: f64 = 6_378_137.0; // semi-major axis (m)
const WGS84_F: f64 = 1.0 / 298.257_223_563; // flattening

/// Square metres per square kilometre
pub const M2_PER_KM2: f64 = 1.0e6;

/// Spheroid used for geographic cell areas
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SpheroidParams {
    /// Semi-major axis in meters. Default: WGS84 (6378137.0)
    pub semi_major: f64,
    /// Flattening. Default: WGS84 (1/298.257223563)
    pub flattening: f64,
}

impl Default for SpheroidParams {
    fn default() -> Self {
        Self {
            semi_major: WGS84_A,
            flattening: WGS84_F,
        }
    }
}

/// Area of one class within a region
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AreaResult {
    pub label: ClassLabel,
    pub area_m2: f64,
}

impl AreaResult {
    pub fn area_km2(&self) -> f64 {
        self.area_m2 / M2_PER_KM2
    }
}

/// Ground area in m² of a `d_lon` x `d_lat` degree cell centered at `latitude_deg`
pub fn geographic_cell_area(latitude_deg: f64, d_lon: f64, d_lat: f64, params: &SpheroidParams) -> f64 {
    let lat = latitude_deg.to_radians();
    let a = params.semi_major;
    let f = params.flattening;
    let e2 = 2.0 * f - f * f; // first eccentricity squared
    let w2 = 1.0 - e2 * lat.sin() * lat.sin();

    // Prime vertical (N) and meridional (M) radii of curvature
    let n = a / w2.sqrt();
    let m = a * (1.0 - e2) / w2.powf(1.5);

    let dx = n * lat.cos() * d_lon.to_radians();
    let dy = m * d_lat.to_radians();
    (dx * dy).abs()
}

/// Whether the raster's coordinates are lon/lat degrees.
///
/// Uses the CRS when present; otherwise a grid with sub-degree pixels whose
/// bounds fit in [-180, 180] x [-90, 90] is taken as geographic.
fn is_geographic<T: RasterElement>(raster: &Raster<T>) -> bool {
    if let Some(crs) = raster.crs() {
        return crs.is_geographic();
    }
    let gt = raster.transform();
    let (min_x, min_y, max_x, max_y) = raster.bounds();
    gt.pixel_width.abs() < 1.0
        && min_x >= -180.0
        && max_x <= 180.0
        && min_y >= -90.0
        && max_y <= 90.0
}

/// Sum of per-pixel ground area over pixels whose center is in `region`
/// and whose value passes `select`.
fn aggregate<T, F>(
    raster: &Raster<T>,
    region: &Polygon<f64>,
    params: &SpheroidParams,
    select: F,
) -> Result<f64>
where
    T: RasterElement,
    F: Fn(T) -> bool + Sync,
{
    let (min_x, min_y, max_x, max_y) = raster.bounds();
    let rect = region.bounding_rect().ok_or(Error::EmptyRegion {
        rows: raster.rows(),
        cols: raster.cols(),
    })?;
    let (lo, hi) = (rect.min(), rect.max());
    if lo.x > max_x || hi.x < min_x || lo.y > max_y || hi.y < min_y {
        return Err(Error::RegionMismatch {
            min_x: lo.x,
            min_y: lo.y,
            max_x: hi.x,
            max_y: hi.y,
        });
    }

    let (rows, cols) = raster.shape();
    let Some(window) = crate::region_window(raster.transform(), region, cols, rows) else {
        return Ok(0.0);
    };

    let gt = *raster.transform();
    let geographic = is_geographic(raster);
    let projected_area = (gt.pixel_width * gt.pixel_height).abs();

    // Row partials summed in row order, independent of scheduling
    let partials: Vec<f64> = (window.row_start..window.row_end)
        .into_par_iter()
        .map(|row| {
            let mut sum = 0.0;
            for col in window.col_start..window.col_end {
                // SAFETY: window lies within raster bounds
                let value = unsafe { raster.get_unchecked(row, col) };
                if raster.is_nodata(value) || !select(value) {
                    continue;
                }
                let (x, y) = gt.pixel_to_geo(col, row);
                if !region.intersects(&Point::new(x, y)) {
                    continue;
                }
                sum += if geographic {
                    geographic_cell_area(y, gt.pixel_width, gt.pixel_height, params)
                } else {
                    projected_area
                };
            }
            sum
        })
        .collect();

    Ok(partials.iter().sum())
}

/// Ground area in m² of pixels labeled `label` with centers in `region`.
///
/// # Errors
/// `RegionMismatch` if the region's bounding box misses the raster. A
/// region that overlaps the raster but covers no pixel center gives 0.
pub fn class_area(classified: &Raster<u8>, label: ClassLabel, region: &Polygon<f64>) -> Result<f64> {
    class_area_with(classified, label, region, &SpheroidParams::default())
}

/// [`class_area`] with geographic cells measured on `params`
pub fn class_area_with(
    classified: &Raster<u8>,
    label: ClassLabel,
    region: &Polygon<f64>,
    params: &SpheroidParams,
) -> Result<f64> {
    aggregate(classified, region, params, |v| v == label)
}

/// [`class_area`] for each of `classes`, in the given order.
///
/// # Errors
/// A region that misses the raster fails the whole table with
/// `RegionMismatch`; no partial list of zero areas is returned.
pub fn class_areas(
    classified: &Raster<u8>,
    classes: &[ClassLabel],
    region: &Polygon<f64>,
) -> Result<Vec<AreaResult>> {
    class_areas_with(classified, classes, region, &SpheroidParams::default())
}

/// [`class_areas`] with geographic cells measured on `params`
pub fn class_areas_with(
    classified: &Raster<u8>,
    classes: &[ClassLabel],
    region: &Polygon<f64>,
    params: &SpheroidParams,
) -> Result<Vec<AreaResult>> {
    let areas = classes
        .iter()
        .map(|&label| {
            let area_m2 = class_area_with(classified, label, region, params)?;
            debug!("Class {}: {:.1} m²", label, area_m2);
            Ok(AreaResult { label, area_m2 })
        })
        .collect::<Result<Vec<_>>>()?;
    Ok(areas)
}

/// Ground area in m² of all valid pixels with centers in `region`
pub fn covered_area<T: RasterElement>(raster: &Raster<T>, region: &Polygon<f64>) -> Result<f64> {
    covered_area_with(raster, region, &SpheroidParams::default())
}

/// [`covered_area`] with geographic cells measured on `params`
pub fn covered_area_with<T: RasterElement>(
    raster: &Raster<T>,
    region: &Polygon<f64>,
    params: &SpheroidParams,
) -> Result<f64> {
    aggregate(raster, region, params, |_| true)
}
