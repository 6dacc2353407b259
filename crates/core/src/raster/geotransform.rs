//! Affine georeferencing and pixel windows

use serde::{Deserialize, Serialize};

/// Affine transformation coefficients for georeferencing rasters.
///
/// Converts between pixel coordinates (col, row) and map coordinates (x, y):
/// ```text
/// x = origin_x + col * pixel_width + row * row_rotation
/// y = origin_y + col * col_rotation + row * pixel_height
/// ```
///
/// Landsat composites clipped to a lon/lat rectangle are north-up, so the
/// rotation terms are zero and `pixel_height` is negative.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GeoTransform {
    /// X coordinate of the upper-left corner
    pub origin_x: f64,
    /// Y coordinate of the upper-left corner
    pub origin_y: f64,
    /// Cell size in X direction
    pub pixel_width: f64,
    /// Cell size in Y direction, negative for north-up grids
    pub pixel_height: f64,
    /// Rotation about X axis (usually 0)
    pub row_rotation: f64,
    /// Rotation about Y axis (usually 0)
    pub col_rotation: f64,
}

/// Half-open range of rows and columns inside a raster.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PixelWindow {
    pub row_start: usize,
    pub row_end: usize,
    pub col_start: usize,
    pub col_end: usize,
}

impl PixelWindow {
    pub fn rows(&self) -> usize {
        self.row_end - self.row_start
    }

    pub fn cols(&self) -> usize {
        self.col_end - self.col_start
    }

    pub fn is_empty(&self) -> bool {
        self.rows() == 0 || self.cols() == 0
    }

    /// Iterate (row, col) pairs in row-major order
    pub fn cells(&self) -> impl Iterator<Item = (usize, usize)> + '_ {
        (self.row_start..self.row_end)
            .flat_map(move |r| (self.col_start..self.col_end).map(move |c| (r, c)))
    }
}

impl GeoTransform {
    /// Create a north-up transform with no rotation
    pub fn new(origin_x: f64, origin_y: f64, pixel_width: f64, pixel_height: f64) -> Self {
        Self {
            origin_x,
            origin_y,
            pixel_width,
            pixel_height,
            row_rotation: 0.0,
            col_rotation: 0.0,
        }
    }

    /// Map coordinates of the pixel center
    pub fn pixel_to_geo(&self, col: usize, row: usize) -> (f64, f64) {
        self.apply(col as f64 + 0.5, row as f64 + 0.5)
    }

    /// Map coordinates of the pixel's upper-left corner
    pub fn pixel_to_geo_corner(&self, col: usize, row: usize) -> (f64, f64) {
        self.apply(col as f64, row as f64)
    }

    fn apply(&self, col: f64, row: f64) -> (f64, f64) {
        let x = self.origin_x + col * self.pixel_width + row * self.row_rotation;
        let y = self.origin_y + col * self.col_rotation + row * self.pixel_height;
        (x, y)
    }

    /// Convert map coordinates to fractional pixel coordinates (col, row).
    ///
    /// Returns NaN for a degenerate transform.
    pub fn geo_to_pixel(&self, x: f64, y: f64) -> (f64, f64) {
        let det = self.pixel_width * self.pixel_height - self.row_rotation * self.col_rotation;
        if det.abs() < 1e-15 {
            return (f64::NAN, f64::NAN);
        }

        let dx = x - self.origin_x;
        let dy = y - self.origin_y;
        let col = (self.pixel_height * dx - self.row_rotation * dy) / det;
        let row = (-self.col_rotation * dx + self.pixel_width * dy) / det;
        (col, row)
    }

    /// Bounding box (min_x, min_y, max_x, max_y) of a `cols` x `rows` grid
    pub fn bounds(&self, cols: usize, rows: usize) -> (f64, f64, f64, f64) {
        let corners = [
            self.pixel_to_geo_corner(0, 0),
            self.pixel_to_geo_corner(cols, 0),
            self.pixel_to_geo_corner(0, rows),
            self.pixel_to_geo_corner(cols, rows),
        ];

        corners.iter().fold(
            (f64::INFINITY, f64::INFINITY, f64::NEG_INFINITY, f64::NEG_INFINITY),
            |(x0, y0, x1, y1), &(x, y)| (x0.min(x), y0.min(y), x1.max(x), y1.max(y)),
        )
    }

    /// Transform of a sub-grid whose upper-left pixel is (`row`, `col`) here
    pub fn shifted(&self, row: usize, col: usize) -> Self {
        let (origin_x, origin_y) = self.pixel_to_geo_corner(col, row);
        Self {
            origin_x,
            origin_y,
            ..*self
        }
    }

    /// Pixels of a `cols` x `rows` grid whose centers fall inside `bounds`.
    ///
    /// Bounds are inclusive, so a center lying exactly on an edge counts.
    /// Returns `None` if no pixel center is covered.
    pub fn center_window(
        &self,
        bounds: (f64, f64, f64, f64),
        cols: usize,
        rows: usize,
    ) -> Option<PixelWindow> {
        let (min_x, min_y, max_x, max_y) = bounds;
        let corners = [
            self.geo_to_pixel(min_x, min_y),
            self.geo_to_pixel(min_x, max_y),
            self.geo_to_pixel(max_x, min_y),
            self.geo_to_pixel(max_x, max_y),
        ];
        if corners.iter().any(|(c, r)| !c.is_finite() || !r.is_finite()) {
            return None;
        }

        let c_lo = corners.iter().map(|p| p.0).fold(f64::INFINITY, f64::min);
        let c_hi = corners.iter().map(|p| p.0).fold(f64::NEG_INFINITY, f64::max);
        let r_lo = corners.iter().map(|p| p.1).fold(f64::INFINITY, f64::min);
        let r_hi = corners.iter().map(|p| p.1).fold(f64::NEG_INFINITY, f64::max);

        // Pixel i has its center at i + 0.5
        let (col_start, col_end) = center_range(c_lo, c_hi, cols)?;
        let (row_start, row_end) = center_range(r_lo, r_hi, rows)?;

        Some(PixelWindow {
            row_start,
            row_end,
            col_start,
            col_end,
        })
    }
}

/// Indices `i` in `0..n` with `lo <= i + 0.5 <= hi`, as a half-open range.
fn center_range(lo: f64, hi: f64, n: usize) -> Option<(usize, usize)> {
    let first = (lo - 0.5).ceil().max(0.0);
    let last = (hi - 0.5).floor().min(n as f64 - 1.0);
    if n == 0 || last < first {
        return None;
    }
    Some((first as usize, last as usize + 1))
}

impl Default for GeoTransform {
    fn default() -> Self {
        Self::new(0.0, 0.0, 1.0, -1.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_pixel_to_geo_roundtrip() {
        let gt = GeoTransform::new(104.70, 8.73, 0.00027, -0.00027);

        let (x, y) = gt.pixel_to_geo(5, 10);
        let (col, row) = gt.geo_to_pixel(x, y);

        assert_relative_eq!(col, 5.5, epsilon = 1e-9);
        assert_relative_eq!(row, 10.5, epsilon = 1e-9);
    }

    #[test]
    fn test_bounds() {
        let gt = GeoTransform::new(0.0, 100.0, 1.0, -1.0);
        let (min_x, min_y, max_x, max_y) = gt.bounds(100, 50);

        assert_relative_eq!(min_x, 0.0);
        assert_relative_eq!(min_y, 50.0);
        assert_relative_eq!(max_x, 100.0);
        assert_relative_eq!(max_y, 100.0);
    }

    #[test]
    fn center_window_selects_covered_centers() {
        // 10x10 grid of unit cells, x in [0, 10], y in [0, 10]
        let gt = GeoTransform::new(0.0, 10.0, 1.0, -1.0);

        // Centers at x = 2.5, 3.5 and y = 7.5 (row 2)
        let w = gt.center_window((2.2, 7.1, 3.9, 7.9), 10, 10).unwrap();
        assert_eq!(w, PixelWindow { row_start: 2, row_end: 3, col_start: 2, col_end: 4 });
        assert_eq!(w.cells().collect::<Vec<_>>(), vec![(2, 2), (2, 3)]);
    }

    #[test]
    fn center_window_edge_is_inclusive() {
        let gt = GeoTransform::new(0.0, 10.0, 1.0, -1.0);
        let w = gt.center_window((0.5, 9.5, 0.5, 9.5), 10, 10).unwrap();
        assert_eq!(w.rows(), 1);
        assert_eq!(w.cols(), 1);
    }

    #[test]
    fn center_window_misses() {
        let gt = GeoTransform::new(0.0, 10.0, 1.0, -1.0);
        // Between centers
        assert!(gt.center_window((0.6, 9.6, 0.9, 9.9), 10, 10).is_none());
        // Outside the grid
        assert!(gt.center_window((20.0, 20.0, 30.0, 30.0), 10, 10).is_none());
    }

    #[test]
    fn shifted_moves_origin() {
        let gt = GeoTransform::new(100.0, 50.0, 2.0, -2.0);
        let sub = gt.shifted(3, 4);
        assert_relative_eq!(sub.origin_x, 108.0);
        assert_relative_eq!(sub.origin_y, 44.0);
        assert_relative_eq!(sub.pixel_width, 2.0);
    }
}
