use anyhow::{anyhow, bail, Context, Result};
use geo::{
    Coord, Geometry, GeometryCollection, LineString, MultiLineString, MultiPoint, MultiPolygon, Point, Polygon,
};
use serde_json::{json, Map, Value};
use tracing::warn;

use crate::geom::Crs;
use crate::layer::{AttrValue, Attributes, RawFeature, RawLayer};

use super::table::Table;
use super::wkt::to_wkt;

/// Read a GeoJSON FeatureCollection into a raw layer in `crs`.
///
/// Feature keys come from the `key_field` property, falling back to the
/// feature `id` and then to the feature's position. Null and malformed
/// geometries are kept as `None` for the sanitizer to report.
pub fn read_geojson(bytes: &[u8], crs: Crs, key_field: &str) -> Result<RawLayer> {
    let value: Value = serde_json::from_slice(bytes).context("[io::geojson] Failed to parse GeoJSON")?;

    let features = match value.get("type").and_then(Value::as_str) {
        Some("FeatureCollection") => value["features"].as_array()
            .ok_or_else(|| anyhow!("[io::geojson] FeatureCollection without a features array"))?
            .as_slice(),
        Some("Feature") => std::slice::from_ref(&value),
        other => bail!("[io::geojson] Expected a FeatureCollection, found {other:?}"),
    };

    Ok(RawLayer::new(crs, read_features(features, key_field, 0)))
}

/// Convert GeoJSON feature objects, e.g. one page of a REST download.
/// Positional keys count from `first_index`.
pub(crate) fn read_features(features: &[Value], key_field: &str, first_index: usize) -> Vec<RawFeature> {
    features.iter()
        .enumerate()
        .map(|(i, feature)| read_feature(first_index + i, feature, key_field))
        .collect()
}

fn read_feature(i: usize, feature: &Value, key_field: &str) -> RawFeature {
    let attributes = feature.get("properties")
        .and_then(Value::as_object)
        .map(|properties| properties.iter()
            .filter_map(|(name, value)| AttrValue::from_json(value).map(|value| (name.clone(), value)))
            .collect::<Attributes>())
        .unwrap_or_default();

    let key = attributes.get(key_field)
        .map(|value| value.label().into_owned())
        .or_else(|| feature.get("id").and_then(AttrValue::from_json).map(|id| id.label().into_owned()))
        .unwrap_or_else(|| i.to_string());

    let geometry = match feature.get("geometry") {
        None | Some(Value::Null) => None,
        Some(geometry) => parse_geometry(geometry)
            .inspect_err(|e| warn!(key = %key, error = %e, "unreadable geometry, feature kept without one"))
            .ok(),
    };

    RawFeature { key, geometry, attributes }
}

/// Parse a GeoJSON geometry object.
pub fn parse_geometry(value: &Value) -> Result<Geometry<f64>> {
    let kind = value["type"].as_str().ok_or_else(|| anyhow!("geometry without a type"))?;
    if kind == "GeometryCollection" {
        let members = value["geometries"].as_array().ok_or_else(|| anyhow!("collection without geometries"))?;
        return Ok(Geometry::GeometryCollection(GeometryCollection::new_from(
            members.iter().map(parse_geometry).collect::<Result<Vec<_>>>()?,
        )));
    }

    let coords = &value["coordinates"];
    Ok(match kind {
        "Point" => Geometry::Point(Point::from(coord(coords)?)),
        "MultiPoint" => Geometry::MultiPoint(MultiPoint::new(
            array(coords)?.iter().map(|c| coord(c).map(Point::from)).collect::<Result<_>>()?,
        )),
        "LineString" => Geometry::LineString(ring(coords)?),
        "MultiLineString" => Geometry::MultiLineString(MultiLineString::new(
            array(coords)?.iter().map(ring).collect::<Result<_>>()?,
        )),
        "Polygon" => Geometry::Polygon(polygon(coords)?),
        "MultiPolygon" => Geometry::MultiPolygon(MultiPolygon::new(
            array(coords)?.iter().map(polygon).collect::<Result<_>>()?,
        )),
        other => bail!("unsupported geometry type {other}"),
    })
}

fn array(value: &Value) -> Result<&Vec<Value>> {
    value.as_array().ok_or_else(|| anyhow!("expected a coordinate array"))
}

fn coord(value: &Value) -> Result<Coord<f64>> {
    match array(value)?.as_slice() {
        [x, y, ..] => Ok(Coord {
            x: x.as_f64().ok_or_else(|| anyhow!("x must be a number"))?,
            y: y.as_f64().ok_or_else(|| anyhow!("y must be a number"))?,
        }),
        _ => bail!("a position needs at least two numbers"),
    }
}

fn ring(value: &Value) -> Result<LineString<f64>> {
    Ok(LineString::new(array(value)?.iter().map(coord).collect::<Result<_>>()?))
}

fn polygon(value: &Value) -> Result<Polygon<f64>> {
    let mut rings = array(value)?.iter().map(ring).collect::<Result<Vec<_>>>()?.into_iter();
    let exterior = rings.next().unwrap_or_else(|| LineString::new(vec![]));
    Ok(Polygon::new(exterior, rings.collect()))
}

/// Encode a geometry as a GeoJSON geometry object.
pub fn geometry_to_json(geometry: &Geometry<f64>) -> Value {
    fn position(c: &Coord<f64>) -> Value { json!([c.x, c.y]) }
    fn line(ls: &LineString<f64>) -> Value { Value::Array(ls.coords().map(position).collect()) }
    fn rings(p: &Polygon<f64>) -> Value {
        Value::Array(std::iter::once(p.exterior()).chain(p.interiors()).map(line).collect())
    }

    match geometry {
        Geometry::Point(p) => json!({ "type": "Point", "coordinates": position(&p.0) }),
        Geometry::MultiPoint(mp) => json!({
            "type": "MultiPoint",
            "coordinates": mp.iter().map(|p| position(&p.0)).collect::<Vec<_>>(),
        }),
        Geometry::Line(l) => json!({ "type": "LineString", "coordinates": [position(&l.start), position(&l.end)] }),
        Geometry::LineString(ls) => json!({ "type": "LineString", "coordinates": line(ls) }),
        Geometry::MultiLineString(mls) => json!({
            "type": "MultiLineString",
            "coordinates": mls.iter().map(line).collect::<Vec<_>>(),
        }),
        Geometry::Polygon(p) => json!({ "type": "Polygon", "coordinates": rings(p) }),
        Geometry::MultiPolygon(mp) => json!({
            "type": "MultiPolygon",
            "coordinates": mp.iter().map(rings).collect::<Vec<_>>(),
        }),
        Geometry::Rect(r) => json!({ "type": "Polygon", "coordinates": rings(&r.to_polygon()) }),
        Geometry::Triangle(t) => json!({ "type": "Polygon", "coordinates": rings(&t.to_polygon()) }),
        Geometry::GeometryCollection(gc) => json!({
            "type": "GeometryCollection",
            "geometries": gc.iter().map(geometry_to_json).collect::<Vec<_>>(),
        }),
    }
}

/// Encode a table as a GeoJSON FeatureCollection, reprojected to WGS84.
/// Every feature with a geometry also gets a `wkt` property.
pub(crate) fn write_geojson_bytes(table: &Table) -> Result<Vec<u8>> {
    let table = table.to_crs(&Crs::wgs84()).context("[io::geojson] Failed to reproject to WGS84")?;

    let features = table.rows.iter()
        .map(|row| {
            let mut properties: Map<String, Value> = row.properties.clone();
            if let Some(geometry) = &row.geometry {
                properties.insert("wkt".into(), Value::String(to_wkt(geometry)));
            }
            json!({
                "type": "Feature",
                "geometry": row.geometry.as_ref().map_or(Value::Null, geometry_to_json),
                "properties": properties,
            })
        })
        .collect::<Vec<_>>();

    serde_json::to_vec(&json!({ "type": "FeatureCollection", "features": features }))
        .context("[io::geojson] Failed to serialize GeoJSON")
}
