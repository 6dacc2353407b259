//! Cell value types

use num_traits::{NumCast, Zero};
use std::fmt::Debug;

/// Trait for types that can be stored in a raster cell.
///
/// Class rasters use `u8`, feature and band rasters use `f64`.
pub trait RasterElement:
    Copy + Debug + PartialOrd + PartialEq + NumCast + Zero + Send + Sync + 'static
{
    /// No-data value used when a cell cannot be computed
    fn default_nodata() -> Self;

    /// Check if this value represents no-data
    fn is_nodata(&self, nodata: Option<Self>) -> bool;
}

macro_rules! impl_integer_element {
    ($($t:ty => $nodata:expr),* $(,)?) => {$(
        impl RasterElement for $t {
            fn default_nodata() -> Self {
                $nodata
            }

            fn is_nodata(&self, nodata: Option<Self>) -> bool {
                nodata == Some(*self)
            }
        }
    )*};
}

macro_rules! impl_float_element {
    ($($t:ty),* $(,)?) => {$(
        impl RasterElement for $t {
            fn default_nodata() -> Self {
                <$t>::NAN
            }

            fn is_nodata(&self, nodata: Option<Self>) -> bool {
                if !self.is_finite() {
                    return true;
                }
                match nodata {
                    Some(nd) => (self - nd).abs() < <$t>::EPSILON * 100.0,
                    None => false,
                }
            }
        }
    )*};
}

// u8 is the class-label type; 255 is outside every class set.
impl_integer_element!(u8 => u8::MAX, u16 => u16::MAX, i32 => i32::MIN);
impl_float_element!(f32, f64);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn class_nodata_is_max_u8() {
        assert_eq!(<u8 as RasterElement>::default_nodata(), 255);
        assert!(255u8.is_nodata(Some(255)));
        assert!(!2u8.is_nodata(Some(255)));
        assert!(!255u8.is_nodata(None));
    }

    #[test]
    fn non_finite_floats_are_nodata() {
        assert!(f64::NAN.is_nodata(None));
        assert!(f64::INFINITY.is_nodata(None));
        assert!(!0.25f64.is_nodata(None));
        assert!((-9999.0f64).is_nodata(Some(-9999.0)));
    }
}
