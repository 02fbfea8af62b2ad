use geo::{Area, BooleanOps, Polygon, Relate};

use super::SpatialIndex;

/// True iff the interiors of `a` and `b` meet (overlap, containment or equality).
/// Pure boundary touches (edge or point) are NOT considered overlaps.
#[inline]
pub fn interiors_overlap(a: &Polygon<f64>, b: &Polygon<f64>) -> bool {
    // One relate() call gives the full DE-9IM:
    let im = a.relate(b);
    im.is_intersects() && !im.is_touches()
}

/// True iff `a` and `b` share at least one point, boundary contact included.
#[inline]
pub fn intersects(a: &Polygon<f64>, b: &Polygon<f64>) -> bool {
    a.relate(b).is_intersects()
}

/// Area of the intersection of two polygons, in the squared unit of their CRS.
#[inline]
pub fn intersection_area(a: &Polygon<f64>, b: &Polygon<f64>) -> f64 {
    a.intersection(b).unsigned_area()
}

/// Every pair `(i, j)`, `i < j`, whose intersection area exceeds `tol`.
pub fn overlapping_pairs(polygons: &[Polygon<f64>], tol: f64) -> Vec<(usize, usize, f64)> {
    let index = SpatialIndex::new(polygons);
    index.self_join(polygons).into_iter()
        .filter(|&(i, j)| interiors_overlap(&polygons[i], &polygons[j]))
        .map(|(i, j)| (i, j, intersection_area(&polygons[i], &polygons[j])))
        .filter(|&(_, _, area)| area > tol)
        .collect()
}

#[cfg(test)]
mod tests {
    use geo::{coord, Rect};

    use super::*;

    fn rect(x0: f64, y0: f64, x1: f64, y1: f64) -> Polygon<f64> {
        Rect::new(coord! { x: x0, y: y0 }, coord! { x: x1, y: y1 }).to_polygon()
    }

    #[test]
    fn touching_squares_do_not_overlap() {
        let a = rect(0.0, 0.0, 1.0, 1.0);
        let b = rect(1.0, 0.0, 2.0, 1.0);
        assert!(intersects(&a, &b));
        assert!(!interiors_overlap(&a, &b));
        assert_eq!(intersection_area(&a, &b), 0.0);
    }

    #[test]
    fn containment_is_an_overlap() {
        let outer = rect(0.0, 0.0, 4.0, 4.0);
        let inner = rect(1.0, 1.0, 2.0, 2.0);
        assert!(interiors_overlap(&outer, &inner));
        assert!((intersection_area(&outer, &inner) - 1.0).abs() < 1e-9);
    }

    #[test]
    fn overlapping_pairs_respects_tolerance() {
        let polygons = vec![
            rect(0.0, 0.0, 2.0, 2.0),
            rect(1.0, 0.0, 3.0, 2.0),   // overlaps #0 by 2.0
            rect(2.9, 0.0, 4.0, 2.0),   // overlaps #1 by 0.2
            rect(10.0, 0.0, 11.0, 1.0),
        ];
        let pairs = overlapping_pairs(&polygons, 0.5);
        assert_eq!(pairs.len(), 1);
        assert_eq!((pairs[0].0, pairs[0].1), (0, 1));
        assert!((pairs[0].2 - 2.0).abs() < 1e-9);
        assert_eq!(overlapping_pairs(&polygons, 0.0).len(), 2);
    }
}
