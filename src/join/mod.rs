mod best_overlap;
mod overlay;

pub use best_overlap::attach_best_overlap_attribute;
pub use overlay::intersect_layers;
