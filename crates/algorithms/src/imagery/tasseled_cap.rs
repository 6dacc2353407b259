//! Tasseled cap transformation for Landsat 5 TM
//!
//! Rotates the six reflective bands (B1, B2, B3, B4, B5, B7) into
//! brightness, greenness, wetness and three residual components:
//!
//! `feature[i] = Σⱼ M[i][j] · band[j]`
//!
//! Reference:
//! Crist, E.P. (1985). A TM Tasseled Cap equivalent transformation for
//! reflectance factor data. Remote Sensing of Environment 17, 301–306.

use crate::maybe_rayon::*;
use covermap_core::raster::{BandStack, GeoTransform};
use covermap_core::{Error, Result};
use geo::{Intersects, Point, Polygon};
use tracing::debug;

/// Number of reflective bands (and derived components)
pub const N_BANDS: usize = 6;

/// Reflectances B1, B2, B3, B4, B5, B7, nominally in [0, 1]
pub type PixelVector = [f64; N_BANDS];

/// Tasseled cap components, in [`COMPONENT_NAMES`] order
pub type FeatureVector = [f64; N_BANDS];

/// Output band names
pub const COMPONENT_NAMES: [&str; N_BANDS] =
    ["brightness", "greenness", "wetness", "fourth", "fifth", "sixth"];

/// Landsat 5 TM reflectance coefficients, one row per component.
pub const TM_COEFFICIENTS: [[f64; N_BANDS]; N_BANDS] = [
    [0.3037, 0.2793, 0.4743, 0.5585, 0.5082, 0.1863],
    [-0.2848, -0.2435, -0.5436, 0.7243, 0.0840, -0.1800],
    [0.1509, 0.1973, 0.3279, 0.3406, -0.7112, -0.4572],
    [-0.8242, 0.0849, 0.4392, -0.0580, 0.2012, -0.2768],
    [-0.3280, 0.0549, 0.1075, 0.1855, -0.4357, 0.8085],
    [0.1084, -0.9022, 0.4120, 0.0573, -0.0251, 0.0238],
];

/// Fixed 6×6 linear band transform.
///
/// The matrix is set at construction and has no mutators.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SpectralTransform {
    matrix: [[f64; N_BANDS]; N_BANDS],
}

impl SpectralTransform {
    /// The Landsat 5 TM tasseled cap
    pub const fn landsat5_tm() -> Self {
        Self { matrix: TM_COEFFICIENTS }
    }

    pub fn matrix(&self) -> &[[f64; N_BANDS]; N_BANDS] {
        &self.matrix
    }

    /// Transform one pixel given as a slice.
    ///
    /// Fails with `DimensionMismatch` unless the slice holds exactly six bands.
    pub fn transform(&self, pixel: &[f64]) -> Result<FeatureVector> {
        Ok(self.apply(&pixel_vector(pixel)?))
    }

    /// Matrix-vector product, no clamping
    pub fn apply(&self, pixel: &PixelVector) -> FeatureVector {
        let mut out = [0.0; N_BANDS];
        for (o, row) in out.iter_mut().zip(self.matrix.iter()) {
            *o = row.iter().zip(pixel.iter()).map(|(m, p)| m * p).sum();
        }
        out
    }
}

impl Default for SpectralTransform {
    fn default() -> Self {
        Self::landsat5_tm()
    }
}

/// Check a band slice has exactly [`N_BANDS`] values
pub fn pixel_vector(values: &[f64]) -> Result<PixelVector> {
    values.try_into().map_err(|_| Error::DimensionMismatch {
        expected: N_BANDS,
        actual: values.len(),
    })
}

/// Tasseled cap of a reflectance composite, clipped to `region`.
///
/// The output covers the pixels whose centers fall in the region's bounding
/// box; cells whose centers fall outside the polygon itself, or with any
/// non-finite band, are NaN. Bands are [`COMPONENT_NAMES`].
///
/// # Errors
/// - `DimensionMismatch` if the stack does not have six bands
/// - `EmptyRegion` if no pixel center lies in the region
pub fn tasseled_cap(stack: &BandStack, region: &Polygon<f64>) -> Result<BandStack> {
    apply_transform(stack, region, &SpectralTransform::landsat5_tm())
}

/// [`tasseled_cap`] with an explicit transform
pub fn apply_transform(
    stack: &BandStack,
    region: &Polygon<f64>,
    transform: &SpectralTransform,
) -> Result<BandStack> {
    if stack.n_bands() != N_BANDS {
        return Err(Error::DimensionMismatch {
            expected: N_BANDS,
            actual: stack.n_bands(),
        });
    }

    let (rows, cols) = stack.shape();
    let window = crate::region_window(stack.transform(), region, cols, rows)
        .ok_or(Error::EmptyRegion { rows, cols })?;
    let clipped = stack.window(&window)?;
    let (out_rows, out_cols) = clipped.shape();
    let gt: GeoTransform = *clipped.transform();

    debug!(
        "Tasseled cap over {} x {} window at ({}, {})",
        out_cols, out_rows, window.col_start, window.row_start
    );

    // None marks a cell whose center lies outside the polygon
    let pixels: Vec<Vec<Option<FeatureVector>>> = (0..out_rows)
        .into_par_iter()
        .map(|row| {
            let mut bands = [0.0; N_BANDS];
            (0..out_cols)
                .map(|col| {
                    let (x, y) = gt.pixel_to_geo(col, row);
                    if !region.intersects(&Point::new(x, y)) {
                        return None;
                    }
                    let readable = clipped.read_pixel_into(row, col, &mut bands).is_ok();
                    if !readable || bands.iter().any(|v| !v.is_finite()) {
                        return Some([f64::NAN; N_BANDS]);
                    }
                    Some(transform.apply(&bands))
                })
                .collect()
        })
        .collect();

    let covered = pixels.iter().flatten().filter(|p| p.is_some()).count();
    if covered == 0 {
        return Err(Error::EmptyRegion { rows, cols });
    }

    let mut output = BandStack::new(&COMPONENT_NAMES, out_rows, out_cols);
    output.set_transform(gt);
    output.set_crs(clipped.crs().cloned());
    for (row, line) in pixels.iter().enumerate() {
        for (col, features) in line.iter().enumerate() {
            if let Some(features) = features {
                output.set_pixel(row, col, features)?;
            }
        }
    }

    Ok(output)
}
