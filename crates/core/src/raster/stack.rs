//! Multi-band raster stacks

use crate::crs::CRS;
use crate::error::{Error, Result};
use crate::raster::{GeoTransform, PixelWindow, Raster, RasterElement};
use ndarray::{s, Array3, ArrayView2};

/// Landsat 5 TM reflective bands used by the tasseled cap transform, in order.
pub const TM_BAND_NAMES: [&str; 6] = ["B1", "B2", "B3", "B4", "B5", "B7"];

/// A georeferenced stack of co-registered `f64` bands.
///
/// Holds both the raw reflectance composite and derived feature rasters.
/// Data is stored band-major as `(band, row, col)`; all bands share one
/// grid, transform and CRS. Non-finite values mark no-data.
#[derive(Debug, Clone)]
pub struct BandStack {
    data: Array3<f64>,
    names: Vec<String>,
    transform: GeoTransform,
    crs: Option<CRS>,
}

impl BandStack {
    /// Create a NaN-filled stack with the given band names
    pub fn new<S: AsRef<str>>(names: &[S], rows: usize, cols: usize) -> Self {
        Self {
            data: Array3::from_elem((names.len(), rows, cols), f64::NAN),
            names: names.iter().map(|n| n.as_ref().to_string()).collect(),
            transform: GeoTransform::default(),
            crs: None,
        }
    }

    /// Stack single-band rasters. Georeferencing is taken from the first band.
    ///
    /// All bands must have the same shape and an equivalent (or absent) CRS.
    pub fn from_bands<S: AsRef<str>>(names: &[S], bands: &[Raster<f64>]) -> Result<Self> {
        if names.len() != bands.len() {
            return Err(Error::DimensionMismatch {
                expected: names.len(),
                actual: bands.len(),
            });
        }
        let first = bands.first().ok_or(Error::InvalidDimensions { width: 0, height: 0 })?;
        let (rows, cols) = first.shape();

        let mut stack = Self::new(names, rows, cols);
        stack.transform = *first.transform();
        stack.crs = first.crs().cloned();

        for (i, band) in bands.iter().enumerate() {
            if band.shape() != (rows, cols) {
                return Err(Error::SizeMismatch {
                    er: rows,
                    ec: cols,
                    ar: band.rows(),
                    ac: band.cols(),
                });
            }
            if let (Some(a), Some(b)) = (first.crs(), band.crs()) {
                if !a.is_equivalent(b) {
                    return Err(Error::CrsMismatch(a.to_string(), b.to_string()));
                }
            }

            let nodata = band.nodata();
            let mut plane = stack.data.slice_mut(s![i, .., ..]);
            for ((r, c), v) in band.data().indexed_iter() {
                if !v.is_nodata(nodata) {
                    plane[(r, c)] = *v;
                }
            }
        }

        Ok(stack)
    }

    pub fn n_bands(&self) -> usize {
        self.data.dim().0
    }

    pub fn rows(&self) -> usize {
        self.data.dim().1
    }

    pub fn cols(&self) -> usize {
        self.data.dim().2
    }

    /// Grid dimensions as (rows, cols)
    pub fn shape(&self) -> (usize, usize) {
        (self.rows(), self.cols())
    }

    pub fn band_names(&self) -> &[String] {
        &self.names
    }

    /// Index of a band by name
    pub fn band_index(&self, name: &str) -> Option<usize> {
        self.names.iter().position(|n| n == name)
    }

    /// View of one band plane
    pub fn band(&self, index: usize) -> Result<ArrayView2<'_, f64>> {
        if index >= self.n_bands() {
            return Err(Error::DimensionMismatch {
                expected: index + 1,
                actual: self.n_bands(),
            });
        }
        Ok(self.data.slice(s![index, .., ..]))
    }

    /// Copy one band out as a standalone georeferenced raster (NaN no-data)
    pub fn band_raster(&self, index: usize) -> Result<Raster<f64>> {
        let mut raster = Raster::from_array(self.band(index)?.to_owned());
        raster.set_transform(self.transform);
        raster.set_crs(self.crs.clone());
        raster.set_nodata(Some(f64::NAN));
        Ok(raster)
    }

    /// All band values at one pixel
    pub fn pixel(&self, row: usize, col: usize) -> Result<Vec<f64>> {
        if row >= self.rows() || col >= self.cols() {
            return Err(self.out_of_bounds(row, col));
        }
        Ok(self.data.slice(s![.., row, col]).to_vec())
    }

    /// Copy band values at one pixel into `out` (which must hold `n_bands` values)
    pub fn read_pixel_into(&self, row: usize, col: usize, out: &mut [f64]) -> Result<()> {
        if row >= self.rows() || col >= self.cols() {
            return Err(self.out_of_bounds(row, col));
        }
        if out.len() != self.n_bands() {
            return Err(Error::DimensionMismatch {
                expected: self.n_bands(),
                actual: out.len(),
            });
        }
        for (dst, src) in out.iter_mut().zip(self.data.slice(s![.., row, col])) {
            *dst = *src;
        }
        Ok(())
    }

    /// Overwrite all band values at one pixel
    pub fn set_pixel(&mut self, row: usize, col: usize, values: &[f64]) -> Result<()> {
        if row >= self.rows() || col >= self.cols() {
            return Err(self.out_of_bounds(row, col));
        }
        if values.len() != self.n_bands() {
            return Err(Error::DimensionMismatch {
                expected: self.n_bands(),
                actual: values.len(),
            });
        }
        for (dst, src) in self.data.slice_mut(s![.., row, col]).iter_mut().zip(values) {
            *dst = *src;
        }
        Ok(())
    }

    /// Copy of the pixels inside `window`, with the transform moved accordingly
    pub fn window(&self, window: &PixelWindow) -> Result<BandStack> {
        if window.row_end > self.rows() || window.col_end > self.cols() {
            return Err(self.out_of_bounds(window.row_end, window.col_end));
        }
        let data = self
            .data
            .slice(s![.., window.row_start..window.row_end, window.col_start..window.col_end])
            .to_owned();
        Ok(BandStack {
            data,
            names: self.names.clone(),
            transform: self.transform.shifted(window.row_start, window.col_start),
            crs: self.crs.clone(),
        })
    }

    pub fn transform(&self) -> &GeoTransform {
        &self.transform
    }

    pub fn set_transform(&mut self, transform: GeoTransform) {
        self.transform = transform;
    }

    pub fn crs(&self) -> Option<&CRS> {
        self.crs.as_ref()
    }

    pub fn set_crs(&mut self, crs: Option<CRS>) {
        self.crs = crs;
    }

    /// Geographic bounds (min_x, min_y, max_x, max_y)
    pub fn bounds(&self) -> (f64, f64, f64, f64) {
        self.transform.bounds(self.cols(), self.rows())
    }

    /// Map coordinates of the pixel center
    pub fn pixel_to_geo(&self, col: usize, row: usize) -> (f64, f64) {
        self.transform.pixel_to_geo(col, row)
    }

    fn out_of_bounds(&self, row: usize, col: usize) -> Error {
        Error::IndexOutOfBounds {
            row,
            col,
            rows: self.rows(),
            cols: self.cols(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn band(rows: usize, cols: usize, offset: f64) -> Raster<f64> {
        let data = (0..rows * cols).map(|i| offset + i as f64).collect();
        let mut r = Raster::from_vec(data, rows, cols).unwrap();
        r.set_transform(GeoTransform::new(10.0, 20.0, 1.0, -1.0));
        r
    }

    #[test]
    fn stacks_bands_pixelwise() {
        let stack = BandStack::from_bands(&["a", "b"], &[band(2, 3, 0.0), band(2, 3, 100.0)]).unwrap();
        assert_eq!(stack.n_bands(), 2);
        assert_eq!(stack.shape(), (2, 3));
        assert_eq!(stack.pixel(1, 2).unwrap(), vec![5.0, 105.0]);
        assert_eq!(stack.band_index("b"), Some(1));
        assert_eq!(stack.transform().origin_x, 10.0);
    }

    #[test]
    fn band_nodata_becomes_nan() {
        let mut b = band(1, 2, 0.0);
        b.set_nodata(Some(0.0));
        let stack = BandStack::from_bands(&["a"], &[b]).unwrap();
        assert!(stack.pixel(0, 0).unwrap()[0].is_nan());
        assert_eq!(stack.pixel(0, 1).unwrap()[0], 1.0);
    }

    #[test]
    fn rejects_mismatched_bands() {
        assert!(BandStack::from_bands(&["a", "b"], &[band(2, 3, 0.0), band(3, 2, 0.0)]).is_err());
        assert!(BandStack::from_bands(&["a", "b"], &[band(2, 3, 0.0)]).is_err());
        let empty: [Raster<f64>; 0] = [];
        assert!(BandStack::from_bands::<&str>(&[], &empty).is_err());
    }

    #[test]
    fn window_shifts_transform() {
        let stack = BandStack::from_bands(&["a"], &[band(4, 4, 0.0)]).unwrap();
        let w = PixelWindow { row_start: 1, row_end: 3, col_start: 2, col_end: 4 };
        let sub = stack.window(&w).unwrap();
        assert_eq!(sub.shape(), (2, 2));
        assert_eq!(sub.pixel(0, 0).unwrap(), vec![6.0]);
        assert_eq!(sub.transform().origin_x, 12.0);
        assert_eq!(sub.transform().origin_y, 19.0);
    }

    #[test]
    fn set_pixel_checks_band_count() {
        let mut stack = BandStack::new(&TM_BAND_NAMES, 1, 1);
        assert!(stack.set_pixel(0, 0, &[0.1; 5]).is_err());
        stack.set_pixel(0, 0, &[0.1, 0.2, 0.3, 0.4, 0.5, 0.6]).unwrap();
        let mut buf = [0.0; 6];
        stack.read_pixel_into(0, 0, &mut buf).unwrap();
        assert_eq!(buf[5], 0.6);
    }
}
