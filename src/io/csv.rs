//! CSV reading and writing. Geometries travel as text in a single column.

use std::{fs::File, io::Write, path::Path};

use anyhow::{bail, Context, Result};
use geo::Geometry;
use polars::{
    frame::DataFrame,
    io::{SerReader, SerWriter},
    prelude::{AnyValue, Column, CsvReader, CsvWriter, NamedFrom},
};
use tracing::warn;

use crate::geom::Crs;
use crate::layer::{AttrValue, Attributes, RawFeature, RawLayer};

use super::esri::parse_esri_polygon;
use super::table::Table;
use super::wkt::{parse_wkt, to_wkt};

/// Name of the geometry column written to CSV.
pub const GEOMETRY_COLUMN: &str = "wkt";

/// Build a DataFrame with a WKT geometry column followed by every attribute column.
pub(crate) fn table_to_dataframe(table: &Table) -> Result<DataFrame> {
    let mut columns = vec![Column::new(
        GEOMETRY_COLUMN.into(),
        table.rows.iter().map(|row| row.geometry.as_ref().map(to_wkt)).collect::<Vec<_>>(),
    )];

    for name in table.columns().into_iter().filter(|name| name != GEOMETRY_COLUMN) {
        let values = table.rows.iter().map(|row| row.attributes.get(&name));
        columns.push(if table.is_numeric(&name) {
            Column::new(name.as_str().into(), values.map(|v| v.and_then(AttrValue::as_f64)).collect::<Vec<_>>())
        } else {
            Column::new(name.as_str().into(), values.map(|v| v.map(|v| v.label().into_owned())).collect::<Vec<_>>())
        });
    }

    DataFrame::new(columns).context("[io::csv] Failed to build DataFrame")
}

/// Write a table as CSV in its own CRS.
pub(crate) fn write_csv<W: Write>(table: &Table, writer: W) -> Result<()> {
    let mut df = table_to_dataframe(table)?;
    CsvWriter::new(writer)
        .finish(&mut df)
        .context("[io::csv] Failed to write CSV")
}

/// Read a CSV file whose `geometry_column` holds WKT or Esri JSON rings.
/// Blank geometry cells become null geometries.
pub fn read_csv(path: &Path, crs: Crs, key_field: &str, geometry_column: &str) -> Result<RawLayer> {
    let file = File::open(path)
        .with_context(|| format!("[io::csv] Failed to open {}", path.display()))?;
    let df = CsvReader::new(file)
        .finish()
        .with_context(|| format!("[io::csv] Failed to parse {}", path.display()))?;

    let Some(geometry) = df.get_columns().iter().find(|c| c.name().as_str() == geometry_column) else {
        bail!("[io::csv] Geometry column `{geometry_column}` not found in {}", path.display());
    };

    let mut features = Vec::with_capacity(df.height());
    for i in 0..df.height() {
        let attributes = df.get_columns().iter()
            .filter(|column| column.name().as_str() != geometry_column)
            .filter_map(|column| {
                let value = any_to_attr(column.get(i).ok()?)?;
                Some((column.name().to_string(), value))
            })
            .collect::<Attributes>();

        let key = attributes.get(key_field)
            .map(|value| value.label().into_owned())
            .unwrap_or_else(|| i.to_string());

        let text = geometry.get(i).ok().and_then(any_to_attr).map(|value| value.label().into_owned());
        let geometry = match text.as_deref().map(str::trim) {
            None | Some("") => None,
            Some(text) => parse_cell(text).unwrap_or_else(|e| {
                warn!(key = %key, error = %e, "unreadable geometry, row kept without one");
                None
            }),
        };

        features.push(RawFeature { key, geometry, attributes });
    }

    Ok(RawLayer::new(crs, features))
}

/// A geometry cell holds either WKT or an Esri `{"rings": ...}` object.
fn parse_cell(text: &str) -> Result<Option<Geometry<f64>>> {
    if text.starts_with('{') {
        parse_esri_polygon(text)
    } else {
        Ok(Some(parse_wkt(text)?))
    }
}

fn any_to_attr(value: AnyValue<'_>) -> Option<AttrValue> {
    match value {
        AnyValue::Null => None,
        AnyValue::Boolean(b) => Some(AttrValue::Bool(b)),
        AnyValue::String(s) => Some(AttrValue::Text(s.to_string())),
        AnyValue::StringOwned(s) => Some(AttrValue::Text(s.to_string())),
        other => other.extract::<f64>().map(AttrValue::Number),
    }
}

#[cfg(test)]
mod tests {
    use geo::{coord, Rect};

    use super::*;
    use crate::layer::{sanitize, DropReason, Feature};
    use crate::layer::Layer;

    #[test]
    fn dataframe_has_geometry_and_typed_columns() {
        let square = Rect::new(coord! { x: 0.0, y: 0.0 }, coord! { x: 1.0, y: 1.0 }).to_polygon();
        let layer = Layer::new(Crs::wgs84(), vec![
            Feature::new("a", square.clone()).with("type", 1.0).with("owner", "KKL"),
            Feature::new("b", square).with("type", 2.0),
        ]);

        let df = table_to_dataframe(&Table::from_layer(&layer, "key")).unwrap();
        assert_eq!(df.height(), 2);
        let names = df.get_column_names().into_iter().map(|n| n.to_string()).collect::<Vec<_>>();
        assert_eq!(names, vec!["wkt", "key", "owner", "part", "type"]);
    }

    #[test]
    fn csv_round_trip_through_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("layer.csv");

        let square = Rect::new(coord! { x: 0.0, y: 0.0 }, coord! { x: 2.0, y: 2.0 }).to_polygon();
        let layer = Layer::new(Crs::wgs84(), vec![Feature::new("p1", square).with("type", 3.0)]);
        write_csv(&Table::from_layer(&layer, "key"), File::create(&path).unwrap()).unwrap();

        let raw = read_csv(&path, Crs::wgs84(), "key", GEOMETRY_COLUMN).unwrap();
        assert_eq!(raw.features.len(), 1);
        assert_eq!(raw.features[0].key, "p1");
        assert_eq!(raw.features[0].attr("type").and_then(AttrValue::as_f64), Some(3.0));
        assert!(matches!(raw.features[0].geometry, Some(Geometry::Polygon(_))));
    }

    #[test]
    fn malformed_geometry_cell_keeps_the_row() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("parcels.csv");
        std::fs::write(&path, concat!(
            "key,type,wkt\n",
            "good,1,\"POLYGON((0 0,2 0,2 2,0 2,0 0))\"\n",
            "broken,2,\"POLYGON((0 0,1 0\"\n",
            "rings,3,\"{\"\"rings\"\": [[[0,0],[0,1],[1,1],[1,0],[0,0]]]}\"\n",
        )).unwrap();

        let raw = read_csv(&path, Crs::wgs84(), "key", GEOMETRY_COLUMN).unwrap();
        assert_eq!(raw.features.iter().map(|f| f.key.as_str()).collect::<Vec<_>>(), vec!["good", "broken", "rings"]);
        assert!(raw.features[1].geometry.is_none());
        assert_eq!(raw.features[1].attr("type").and_then(AttrValue::as_f64), Some(2.0));

        let sanitized = sanitize(raw);
        assert_eq!(sanitized.layer.len(), 2);
        assert_eq!(sanitized.dropped.iter().map(|d| (d.key.as_str(), d.reason)).collect::<Vec<_>>(),
                   vec![("broken", DropReason::NullGeometry)]);
    }

    #[test]
    fn missing_geometry_column_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("attrs.csv");
        std::fs::write(&path, "key,type\na,1\n").unwrap();
        assert!(read_csv(&path, Crs::wgs84(), "key", GEOMETRY_COLUMN).is_err());
    }
}
