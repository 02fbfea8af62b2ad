use geo::{BoundingRect, Polygon, Rect};
use rstar::{RTreeObject, AABB};

/// A bounding box in an R-tree, associated with a feature by its position in a layer.
#[derive(Debug, Clone)]
pub(crate) struct BoundingBox {
    idx: usize, // Index of the corresponding feature
    bbox: Rect<f64>,
}

impl BoundingBox {
    pub(crate) fn new(idx: usize, bbox: Rect<f64>) -> Self {
        Self { idx, bbox }
    }

    /// Build the box of a polygon, or `None` for a polygon without coordinates.
    pub(crate) fn of(idx: usize, polygon: &Polygon<f64>) -> Option<Self> {
        polygon.bounding_rect().map(|bbox| Self::new(idx, bbox))
    }

    /// Get the index of the corresponding feature.
    #[inline] pub(crate) fn idx(&self) -> usize { self.idx }
}

impl RTreeObject for BoundingBox {
    type Envelope = AABB<[f64; 2]>;

    fn envelope(&self) -> Self::Envelope {
        AABB::from_corners(self.bbox.min().into(), self.bbox.max().into())
    }
}

/// Convert a rectangle into an R-tree search envelope.
#[inline]
pub(crate) fn envelope(rect: &Rect<f64>) -> AABB<[f64; 2]> {
    AABB::from_corners(rect.min().into(), rect.max().into())
}
