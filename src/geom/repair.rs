use geo::{Area, BooleanOps, Geometry, HasDimensions, MultiPolygon, Polygon, Validation};

/// Polygonal content of an arbitrary geometry.
#[derive(Debug, Clone, PartialEq)]
pub(crate) enum Reduction {
    Polygonal(MultiPolygon<f64>),
    Empty,
    NonPolygonal,
}

/// Reduce a geometry to its polygonal content.
///
/// Collections keep their single polygonal member as-is and merge several
/// polygonal members by union; a collection with no polygonal member (only
/// points or lines) is non-polygonal.
pub(crate) fn reduce(geom: &Geometry<f64>) -> Reduction {
    if geom.is_empty() { return Reduction::Empty }

    match geom {
        Geometry::Polygon(polygon) => Reduction::Polygonal(MultiPolygon::new(vec![polygon.clone()])),
        Geometry::MultiPolygon(mp) => Reduction::Polygonal(MultiPolygon::new(
            mp.iter().filter(|polygon| !polygon.is_empty()).cloned().collect()
        )),
        Geometry::Rect(rect) => Reduction::Polygonal(MultiPolygon::new(vec![rect.to_polygon()])),
        Geometry::Triangle(triangle) => Reduction::Polygonal(MultiPolygon::new(vec![triangle.to_polygon()])),
        Geometry::GeometryCollection(collection) => {
            let mut members = collection.iter()
                .filter_map(|member| match reduce(member) {
                    Reduction::Polygonal(mp) => Some(mp),
                    _ => None,
                })
                .collect::<Vec<_>>();

            match members.len() {
                0 => Reduction::NonPolygonal,
                1 => members.pop().map_or(Reduction::NonPolygonal, Reduction::Polygonal),
                _ => union_all(members).map_or(Reduction::Empty, Reduction::Polygonal),
            }
        }
        _ => Reduction::NonPolygonal,
    }
}

/// Union of all multipolygons. May be slow for large numbers of complex polygons.
pub(crate) fn union_all(parts: impl IntoIterator<Item = MultiPolygon<f64>>) -> Option<MultiPolygon<f64>> {
    parts.into_iter().reduce(|a, b| a.union(&b))
}

/// Repair an invalid multipolygon by re-noding it through a boolean union,
/// the equivalent of a zero-width buffer. Valid input passes through untouched.
///
/// Returns `None` when nothing with positive area survives.
pub(crate) fn repair(mp: MultiPolygon<f64>) -> Option<MultiPolygon<f64>> {
    let repaired = if mp.is_valid() { mp } else { MultiPolygon::new(vec![]).union(&mp) };

    let parts = repaired.into_iter()
        .filter(|polygon| polygon.unsigned_area() > 0.0)
        .collect::<Vec<_>>();

    (!parts.is_empty()).then(|| MultiPolygon::new(parts))
}

/// Split a multipolygon into its simple polygons, skipping zero-area parts.
pub(crate) fn explode(mp: MultiPolygon<f64>) -> Vec<Polygon<f64>> {
    mp.into_iter().filter(|polygon| polygon.unsigned_area() > 0.0).collect()
}
