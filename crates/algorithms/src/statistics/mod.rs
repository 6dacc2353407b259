//! Area statistics for classified rasters
//!
//! - **area**: per-class ground area within a region

pub mod area;

pub use area::{
    class_area, class_area_with, class_areas, class_areas_with, covered_area, covered_area_with,
    geographic_cell_area, AreaResult, SpheroidParams, M2_PER_KM2,
};
