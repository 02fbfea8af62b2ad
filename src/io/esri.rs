use anyhow::{Context, Result};
use geo::{Coord, Geometry, LineString, MultiPolygon, Polygon, Winding};
use serde::Deserialize;

#[derive(Deserialize)]
struct EsriPolygon {
    #[serde(default)]
    rings: Vec<Vec<[f64; 2]>>,
}

/// Assemble Esri JSON rings into polygons.
///
/// The first ring is always an exterior. After it, clockwise rings start a new
/// polygon and counter-clockwise rings are holes of the current one. Rings
/// with fewer than three points are skipped.
pub fn esri_rings_to_polygons(rings: &[Vec<[f64; 2]>]) -> MultiPolygon<f64> {
    let mut polygons = Vec::new();
    let mut exterior: Option<LineString<f64>> = None;
    let mut holes = Vec::new();

    for ring in rings.iter().filter(|ring| ring.len() >= 3) {
        let ring = LineString::from(ring.iter().map(|&[x, y]| Coord { x, y }).collect::<Vec<_>>());

        if exterior.is_none() || ring.is_cw() {
            if let Some(previous) = exterior.replace(ring) {
                polygons.push(Polygon::new(previous, std::mem::take(&mut holes)));
            }
        } else {
            holes.push(ring);
        }
    }
    if let Some(last) = exterior {
        polygons.push(Polygon::new(last, holes));
    }

    MultiPolygon::new(polygons)
}

/// Parse an Esri JSON polygon (`{"rings": [...]}`) into a geometry.
/// Python-literal text with single quotes is accepted too.
/// Returns `None` when there are no usable rings.
pub fn parse_esri_polygon(text: &str) -> Result<Option<Geometry<f64>>> {
    let parsed: EsriPolygon = serde_json::from_str(text)
        .or_else(|_| serde_json::from_str(&text.replace('\'', "\"")))
        .context("[io::esri] Failed to parse Esri rings")?;

    let mut mp = esri_rings_to_polygons(&parsed.rings);
    Ok(match mp.0.len() {
        0 => None,
        1 => mp.0.pop().map(Geometry::Polygon),
        _ => Some(Geometry::MultiPolygon(mp)),
    })
}

#[cfg(test)]
mod tests {
    use geo::Area;

    use super::*;

    fn square(x0: f64, y0: f64, size: f64, clockwise: bool) -> Vec<[f64; 2]> {
        let mut ring = vec![[x0, y0], [x0 + size, y0], [x0 + size, y0 + size], [x0, y0 + size], [x0, y0]];
        if clockwise { ring.reverse() }
        ring
    }

    #[test]
    fn holes_and_multiple_exteriors() {
        let rings = vec![
            square(0.0, 0.0, 10.0, true),
            square(2.0, 2.0, 2.0, false),
            square(20.0, 0.0, 5.0, true),
        ];
        let mp = esri_rings_to_polygons(&rings);
        assert_eq!(mp.0.len(), 2);
        assert_eq!(mp.0[0].interiors().len(), 1);
        assert_eq!(mp.0[0].unsigned_area(), 96.0);
        assert_eq!(mp.0[1].unsigned_area(), 25.0);
    }

    #[test]
    fn first_ring_is_exterior_regardless_of_winding() {
        let mp = esri_rings_to_polygons(&[square(0.0, 0.0, 1.0, false)]);
        assert_eq!(mp.0.len(), 1);
        assert_eq!(mp.0[0].unsigned_area(), 1.0);
    }

    #[test]
    fn parses_python_literal_text() {
        let geometry = parse_esri_polygon("{'rings': [[[0, 0], [0, 2], [2, 2], [2, 0], [0, 0]]], 'spatialReference': {'wkid': 2039}}")
            .unwrap()
            .unwrap();
        assert!(matches!(geometry, Geometry::Polygon(_)));
        assert_eq!(parse_esri_polygon(r#"{"rings": []}"#).unwrap(), None);
        assert!(parse_esri_polygon("rings").is_err());
    }
}
