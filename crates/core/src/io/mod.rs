//! Reading band composites and writing results

mod native;
mod source;

pub use native::{
    read_geotiff, read_geotiff_from_buffer, write_geotiff, write_geotiff_to_buffer,
};
pub use source::{BandSource, DateRange, GeoTiffBandSource};
