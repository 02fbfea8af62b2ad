use std::collections::{BTreeMap, BTreeSet};
use std::path::Path;

use anyhow::{anyhow, Context, Result};
use geo::{Coord, Geometry, LineString, MultiLineString, MultiPoint, MultiPolygon, Point, Polygon};
use shapefile::dbase::{self, FieldName, FieldValue, TableWriterBuilder};
use shapefile::{PolygonRing, Shape};

use crate::geom::Crs;
use crate::layer::{AttrValue, Attributes, RawFeature, RawLayer};

use super::fs::{check_overwrite, ensure_dir_exists};
use super::table::Table;

/// dBase limits field names to 10 bytes.
const MAX_FIELD_NAME: usize = 10;
const CHARACTER_WIDTH: u8 = 254;

/// Read a `.shp` file and its `.dbf` attributes into a raw layer in `crs`.
/// Keys come from the `key_field` column, falling back to the record number.
pub fn read_shapefile(path: &Path, crs: Crs, key_field: &str) -> Result<RawLayer> {
    let mut reader = shapefile::Reader::from_path(path)
        .with_context(|| format!("[io::shp] Failed to open shapefile: {}", path.display()))?;

    let mut features = Vec::new();
    for (i, result) in reader.iter_shapes_and_records().enumerate() {
        let (shape, record) = result.context("[io::shp] Error reading shape+record")?;

        let attributes = record.into_iter()
            .filter_map(|(name, value)| field_to_attr(value).map(|value| (name, value)))
            .collect::<Attributes>();
        let key = attributes.get(key_field)
            .map(|value| value.label().into_owned())
            .unwrap_or_else(|| i.to_string());

        features.push(RawFeature { key, geometry: shape_to_geometry(shape), attributes });
    }

    Ok(RawLayer::new(crs, features))
}

fn field_to_attr(value: FieldValue) -> Option<AttrValue> {
    match value {
        FieldValue::Character(Some(s)) => {
            let s = s.trim();
            (!s.is_empty()).then(|| AttrValue::Text(s.to_string()))
        }
        FieldValue::Numeric(Some(n)) => Some(AttrValue::Number(n)),
        FieldValue::Float(Some(n)) => Some(AttrValue::Number(n as f64)),
        FieldValue::Integer(n) => Some(AttrValue::Number(n as f64)),
        FieldValue::Double(n) => Some(AttrValue::Number(n)),
        FieldValue::Logical(Some(b)) => Some(AttrValue::Bool(b)),
        // ISO-8601, so dates order correctly as precedence values.
        FieldValue::Date(Some(d)) => Some(AttrValue::Text(format!("{:04}-{:02}-{:02}", d.year(), d.month(), d.day()))),
        _ => None,
    }
}

/// Convert shapefile rings into polygons: each outer ring starts a polygon,
/// inner rings are holes of the polygon before them.
fn rings_to_multipolygon<P>(rings: &[PolygonRing<P>], xy: impl Fn(&P) -> Coord<f64>) -> MultiPolygon<f64> {
    let mut polygons = Vec::new();
    let mut exterior: Option<LineString<f64>> = None;
    let mut holes = Vec::new();

    for ring in rings {
        let line = LineString::new(ring.points().iter().map(&xy).collect());
        match ring {
            PolygonRing::Outer(_) => {
                if let Some(previous) = exterior.replace(line) {
                    polygons.push(Polygon::new(previous, std::mem::take(&mut holes)));
                }
            }
            PolygonRing::Inner(_) => holes.push(line),
        }
    }
    if let Some(last) = exterior {
        polygons.push(Polygon::new(last, holes));
    }
    MultiPolygon::new(polygons)
}

fn shape_to_geometry(shape: Shape) -> Option<Geometry<f64>> {
    fn points<P>(points: &[P], xy: impl Fn(&P) -> Coord<f64>) -> MultiPoint<f64> {
        MultiPoint::new(points.iter().map(|pt| Point::from(xy(pt))).collect())
    }
    fn lines<P>(parts: &[Vec<P>], xy: impl Fn(&P) -> Coord<f64>) -> MultiLineString<f64> {
        MultiLineString::new(parts.iter().map(|part| LineString::new(part.iter().map(&xy).collect())).collect())
    }

    Some(match shape {
        Shape::Polygon(p) => Geometry::MultiPolygon(rings_to_multipolygon(p.rings(), |pt| Coord { x: pt.x, y: pt.y })),
        Shape::PolygonM(p) => Geometry::MultiPolygon(rings_to_multipolygon(p.rings(), |pt| Coord { x: pt.x, y: pt.y })),
        Shape::PolygonZ(p) => Geometry::MultiPolygon(rings_to_multipolygon(p.rings(), |pt| Coord { x: pt.x, y: pt.y })),
        Shape::Point(pt) => Geometry::Point(Point::new(pt.x, pt.y)),
        Shape::PointM(pt) => Geometry::Point(Point::new(pt.x, pt.y)),
        Shape::PointZ(pt) => Geometry::Point(Point::new(pt.x, pt.y)),
        Shape::Multipoint(mp) => Geometry::MultiPoint(points(mp.points(), |pt| Coord { x: pt.x, y: pt.y })),
        Shape::MultipointM(mp) => Geometry::MultiPoint(points(mp.points(), |pt| Coord { x: pt.x, y: pt.y })),
        Shape::MultipointZ(mp) => Geometry::MultiPoint(points(mp.points(), |pt| Coord { x: pt.x, y: pt.y })),
        Shape::Polyline(pl) => Geometry::MultiLineString(lines(pl.parts(), |pt| Coord { x: pt.x, y: pt.y })),
        Shape::PolylineM(pl) => Geometry::MultiLineString(lines(pl.parts(), |pt| Coord { x: pt.x, y: pt.y })),
        Shape::PolylineZ(pl) => Geometry::MultiLineString(lines(pl.parts(), |pt| Coord { x: pt.x, y: pt.y })),
        // Null shapes, and multipatch surfaces which have no 2D polygon reading.
        _ => return None,
    })
}

/// Convert a polygonal geometry to a shapefile polygon: exteriors clockwise,
/// holes counter-clockwise, every ring closed.
fn geo_to_shp(mp: &MultiPolygon<f64>) -> shapefile::Polygon {
    fn ring(ls: &LineString<f64>, clockwise: bool) -> Vec<shapefile::Point> {
        let mut points = ls.coords().map(|c| shapefile::Point { x: c.x, y: c.y }).collect::<Vec<_>>();
        if let (Some(first), Some(last)) = (points.first().copied(), points.last()) {
            if first.x != last.x || first.y != last.y { points.push(first) }
        }
        let signed_area = points.windows(2).map(|w| w[0].x * w[1].y - w[1].x * w[0].y).sum::<f64>() / 2.0;
        if (signed_area > 0.0) == clockwise { points.reverse() }
        points
    }

    let mut rings = Vec::new();
    for polygon in mp {
        rings.push(PolygonRing::Outer(ring(polygon.exterior(), true)));
        rings.extend(polygon.interiors().iter().map(|hole| PolygonRing::Inner(ring(hole, false))));
    }
    shapefile::Polygon::with_rings(rings)
}

/// Longest prefix of `s` that fits in `max` bytes.
fn truncate(s: &str, max: usize) -> String {
    s.chars()
        .scan(0, |len, c| {
            *len += c.len_utf8();
            (*len <= max).then_some(c)
        })
        .collect()
}

/// Truncate column names to the dBase limit, keeping them unique.
fn field_names(columns: &[String]) -> BTreeMap<String, String> {
    let mut taken = BTreeSet::new();
    let mut names = BTreeMap::new();

    for column in columns {
        let short = truncate(column, MAX_FIELD_NAME);

        let mut name = short.clone();
        let mut n = 1;
        while !taken.insert(name.clone()) {
            // The stem gives up a byte whenever the counter gains a digit.
            let suffix = format!("{n:02}");
            name = format!("{}{suffix}", truncate(&short, MAX_FIELD_NAME.saturating_sub(suffix.len())));
            n += 1;
        }
        names.insert(column.clone(), name);
    }
    names
}

/// Write polygonal rows as an ESRI Shapefile (`.shp`, `.shx`, `.dbf`) in the table CRS.
/// Rows without polygonal geometry are skipped. Returns the number of shapes written.
pub(crate) fn write_shapefile(table: &Table, path: &Path, force: bool) -> Result<usize> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        ensure_dir_exists(parent)?;
    }
    check_overwrite(path, force)?;

    let columns = table.columns();
    let names = field_names(&columns);
    let numeric = columns.iter().map(|column| table.is_numeric(column)).collect::<Vec<_>>();

    let mut builder = TableWriterBuilder::new();
    for (column, &numeric) in columns.iter().zip(&numeric) {
        let name = FieldName::try_from(names[column].as_str())
            .map_err(|e| anyhow!("[io::shp] Invalid field name {column}: {e:?}"))?;
        builder = if numeric {
            builder.add_numeric_field(name, 20, 6)
        } else {
            builder.add_character_field(name, CHARACTER_WIDTH)
        };
    }

    let mut writer = shapefile::Writer::from_path(path, builder)
        .with_context(|| format!("[io::shp] Failed to create shapefile: {}", path.display()))?;

    let mut written = 0;
    for row in &table.rows {
        let mp = match &row.geometry {
            Some(Geometry::Polygon(p)) => MultiPolygon::new(vec![p.clone()]),
            Some(Geometry::MultiPolygon(mp)) => mp.clone(),
            _ => continue,
        };

        let mut record = dbase::Record::default();
        for (column, &numeric) in columns.iter().zip(&numeric) {
            let value = row.attributes.get(column);
            let value = if numeric {
                FieldValue::Numeric(value.and_then(AttrValue::as_f64))
            } else {
                FieldValue::Character(value.map(|v| truncate(&v.label(), CHARACTER_WIDTH as usize)))
            };
            record.insert(names[column].clone(), value);
        }

        writer.write_shape_and_record(&geo_to_shp(&mp), &record)
            .with_context(|| format!("[io::shp] Failed to write shape to {}", path.display()))?;
        written += 1;
    }

    Ok(written)
}
