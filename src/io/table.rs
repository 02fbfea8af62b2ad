use std::collections::BTreeSet;

use anyhow::Result;
use geo::Geometry;
use serde_json::{Map, Value};

use crate::compare::ComparisonLayer;
use crate::geom::Crs;
use crate::layer::{AttrValue, Attributes, Layer, RawLayer};

/// A row of an output table: a geometry plus flat attributes for tabular
/// formats and JSON properties for GeoJSON.
#[derive(Debug, Clone)]
pub(crate) struct Row {
    pub geometry: Option<Geometry<f64>>,
    pub attributes: Attributes,
    pub properties: Map<String, Value>,
}

impl Row {
    fn flat(geometry: Option<Geometry<f64>>, attributes: Attributes) -> Self {
        let properties = attributes.iter().map(|(name, value)| (name.clone(), value.to_json())).collect();
        Self { geometry, attributes, properties }
    }
}

/// Everything a writer needs, independent of where the rows came from.
#[derive(Debug, Clone)]
pub(crate) struct Table {
    pub crs: Crs,
    pub rows: Vec<Row>,
}

impl Table {
    /// Sanitized features; the key and part number become columns.
    pub fn from_layer(layer: &Layer, key_field: &str) -> Self {
        let rows = layer.iter()
            .map(|feature| {
                let mut attributes = feature.attributes.clone();
                attributes.insert(key_field.to_string(), AttrValue::Text(feature.key.clone()));
                attributes.insert("part".to_string(), AttrValue::Number(feature.part as f64));
                Row::flat(Some(Geometry::Polygon(feature.geometry.clone())), attributes)
            })
            .collect();
        Self { crs: layer.crs.clone(), rows }
    }

    pub fn from_raw(layer: &RawLayer, key_field: &str) -> Self {
        let rows = layer.features.iter()
            .map(|feature| {
                let mut attributes = feature.attributes.clone();
                attributes.insert(key_field.to_string(), AttrValue::Text(feature.key.clone()));
                Row::flat(feature.geometry.clone(), attributes)
            })
            .collect();
        Self { crs: layer.crs.clone(), rows }
    }

    pub fn from_comparison(layer: &ComparisonLayer) -> Self {
        let rows = layer.iter()
            .map(|record| Row {
                geometry: Some(Geometry::Polygon(record.geometry.clone())),
                attributes: record.attributes(),
                properties: record.properties(),
            })
            .collect();
        Self { crs: layer.crs.clone(), rows }
    }

    /// Union of attribute names over all rows, sorted.
    pub fn columns(&self) -> Vec<String> {
        self.rows.iter()
            .flat_map(|row| row.attributes.keys().cloned())
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect()
    }

    /// Whether every present value of a column is a number.
    pub fn is_numeric(&self, column: &str) -> bool {
        self.rows.iter()
            .filter_map(|row| row.attributes.get(column))
            .all(|value| matches!(value, AttrValue::Number(_)))
    }

    /// Reproject all geometries into `target`.
    pub fn to_crs(&self, target: &Crs) -> Result<Table> {
        if &self.crs == target { return Ok(self.clone()) }

        let reprojector = crate::geom::Reprojector::new(&self.crs, target)?;
        let rows = self.rows.iter()
            .map(|row| Ok(Row {
                geometry: row.geometry.as_ref().map(|g| reprojector.geometry(g)).transpose()?,
                ..row.clone()
            }))
            .collect::<Result<Vec<_>>>()?;
        Ok(Table { crs: target.clone(), rows })
    }
}
