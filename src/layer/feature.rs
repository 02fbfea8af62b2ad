use geo::{Area, Geometry, Polygon};

use crate::config::FieldNames;

use super::value::{AttrValue, Attributes};

/// A feature as delivered by a reader: any geometry, or none at all.
#[derive(Debug, Clone, PartialEq)]
pub struct RawFeature {
    pub key: String,
    pub geometry: Option<Geometry<f64>>,
    pub attributes: Attributes,
}

impl RawFeature {
    pub fn new(key: impl Into<String>, geometry: Option<Geometry<f64>>) -> Self {
        Self { key: key.into(), geometry, attributes: Attributes::new() }
    }

    /// Builder-style attribute setter.
    pub fn with(mut self, name: impl Into<String>, value: impl Into<AttrValue>) -> Self {
        self.attributes.insert(name.into(), value.into());
        self
    }

    #[inline]
    pub fn attr(&self, name: &str) -> Option<&AttrValue> { self.attributes.get(name) }
}

/// A sanitized feature: exactly one valid simple polygon.
///
/// Features split from one multipart source keep the source `key` and are
/// told apart by `part`.
#[derive(Debug, Clone, PartialEq)]
pub struct Feature {
    pub key: String,
    pub part: u32,
    pub geometry: Polygon<f64>,
    pub attributes: Attributes,
}

impl Feature {
    pub fn new(key: impl Into<String>, geometry: Polygon<f64>) -> Self {
        Self { key: key.into(), part: 0, geometry, attributes: Attributes::new() }
    }

    /// Builder-style attribute setter.
    pub fn with(mut self, name: impl Into<String>, value: impl Into<AttrValue>) -> Self {
        self.attributes.insert(name.into(), value.into());
        self
    }

    #[inline]
    pub fn attr(&self, name: &str) -> Option<&AttrValue> { self.attributes.get(name) }

    /// Planar area in the squared linear unit of the layer CRS.
    #[inline]
    pub fn area(&self) -> f64 { self.geometry.unsigned_area() }

    /// Land-use category label, if present.
    pub fn land_use_type(&self, fields: &FieldNames) -> Option<String> {
        self.attr(&fields.land_use_type).map(|value| value.label().into_owned())
    }

    /// Free-text ownership label, if present.
    pub fn ownership_label(&self, fields: &FieldNames) -> Option<String> {
        self.attr(&fields.ownership_label).map(|value| value.label().into_owned())
    }

    /// Share of the polygon attributable to the organization, in [0, 100].
    /// Absent or non-numeric values count as full ownership.
    pub fn ownership_percentage(&self, fields: &FieldNames) -> f64 {
        self.attr(&fields.ownership_percentage)
            .and_then(AttrValue::as_f64)
            .filter(|pct| pct.is_finite())
            .map_or(100.0, |pct| pct.clamp(0.0, 100.0))
    }
}

impl From<Feature> for RawFeature {
    fn from(feature: Feature) -> Self {
        Self {
            key: feature.key,
            geometry: Some(Geometry::Polygon(feature.geometry)),
            attributes: feature.attributes,
        }
    }
}

#[cfg(test)]
mod tests {
    use geo::{coord, Rect};

    use super::*;

    fn unit() -> Polygon<f64> {
        Rect::new(coord! { x: 0.0, y: 0.0 }, coord! { x: 1.0, y: 1.0 }).to_polygon()
    }

    #[test]
    fn ownership_percentage_defaults_and_clamps() {
        let fields = FieldNames::default();
        let name = fields.ownership_percentage.clone();

        assert_eq!(Feature::new("a", unit()).ownership_percentage(&fields), 100.0);
        assert_eq!(Feature::new("a", unit()).with(name.as_str(), 50.0).ownership_percentage(&fields), 50.0);
        assert_eq!(Feature::new("a", unit()).with(name.as_str(), "37.5").ownership_percentage(&fields), 37.5);
        assert_eq!(Feature::new("a", unit()).with(name.as_str(), 104.0).ownership_percentage(&fields), 100.0);
        assert_eq!(Feature::new("a", unit()).with(name.as_str(), "n/a").ownership_percentage(&fields), 100.0);
    }

    #[test]
    fn type_label_is_normalized() {
        let fields = FieldNames::default();
        let feature = Feature::new("a", unit()).with(fields.land_use_type.as_str(), 2.0);
        assert_eq!(feature.land_use_type(&fields).as_deref(), Some("2"));
        assert_eq!(feature.ownership_label(&fields), None);
    }
}
