mod bbox;
mod index;
mod overlap;
mod proj;
pub(crate) mod repair;

pub use index::SpatialIndex;
pub use overlap::{interiors_overlap, intersection_area, intersects, overlapping_pairs};
pub use proj::{Crs, Reprojector, ISRAEL_TM_GRID, WGS84};
