use geo::{BoundingRect, Polygon};
use rstar::RTree;

use super::bbox::{envelope, BoundingBox};

/// Read-only R-tree over the bounding boxes of a polygon collection.
///
/// Indices returned by queries refer to positions in the slice the index was
/// built from; the index must be rebuilt if that collection changes.
#[derive(Debug, Clone)]
pub struct SpatialIndex {
    rtree: RTree<BoundingBox>,
    len: usize,
}

impl SpatialIndex {
    /// Bulk-load an index from a list of polygons.
    pub fn new<'a>(polygons: impl IntoIterator<Item = &'a Polygon<f64>>) -> Self {
        let mut len = 0;
        let boxes = polygons.into_iter()
            .enumerate()
            .inspect(|_| len += 1)
            .filter_map(|(i, polygon)| BoundingBox::of(i, polygon))
            .collect();

        Self { rtree: RTree::bulk_load(boxes), len }
    }

    /// Number of polygons the index was built from.
    #[inline] pub fn len(&self) -> usize { self.len }

    #[inline] pub fn is_empty(&self) -> bool { self.len == 0 }

    /// Indices of all polygons whose bounding box intersects the bounding box of `polygon`.
    /// Broad phase only: callers still need an exact predicate. Sorted ascending.
    pub fn candidates(&self, polygon: &Polygon<f64>) -> Vec<usize> {
        let Some(rect) = polygon.bounding_rect() else { return Vec::new() };
        let mut hits = self.rtree.locate_in_envelope_intersecting(&envelope(&rect))
            .map(BoundingBox::idx)
            .collect::<Vec<_>>();
        hits.sort_unstable();
        hits
    }

    /// All unordered index pairs `(i, j)` with `i < j` whose bounding boxes intersect.
    pub fn self_join(&self, polygons: &[Polygon<f64>]) -> Vec<(usize, usize)> {
        let mut pairs = Vec::new();
        for (i, polygon) in polygons.iter().enumerate() {
            let Some(rect) = polygon.bounding_rect() else { continue };
            for cand in self.rtree.locate_in_envelope_intersecting(&envelope(&rect)) {
                let j = cand.idx();
                if j <= i { continue } // check each unordered pair once
                pairs.push((i, j));
            }
        }
        pairs.sort_unstable();
        pairs
    }
}
