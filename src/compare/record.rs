use geo::Polygon;

use crate::geom::Crs;
use crate::layer::{AttrValue, Attributes};

/// Outcome of comparing one prior-layer feature against the current layer.
///
/// Areas are in the squared linear unit of the prior layer's CRS, already
/// scaled by the prior feature's ownership percentage.
#[derive(Debug, Clone, PartialEq)]
pub struct ComparisonRecord {
    pub prior_key: String,
    pub prior_type: Option<String>,
    pub prior_ownership_label: Option<String>,
    pub ownership_percentage: f64,
    pub prior_area: f64,
    pub prior_score: f64,

    /// Current-layer keys whose scaled intersection exceeds the area tolerance,
    /// in current-layer order. The two lists below run parallel to it.
    pub matched_keys: Vec<String>,
    pub matched_ownership_labels: Vec<Option<String>>,
    pub matched_types: Vec<Option<String>>,

    pub retained_area: f64,
    pub retained_score: f64,
    pub lost_area: f64,
    pub lost_area_pct: f64,
    pub lost_score: f64,

    /// The prior polygon, unmodified.
    pub geometry: Polygon<f64>,
}

impl ComparisonRecord {
    /// A prior feature with no surviving match: everything is lost.
    pub(crate) fn total_loss(mut self) -> Self {
        self.matched_keys.clear();
        self.matched_ownership_labels.clear();
        self.matched_types.clear();
        self.retained_area = 0.0;
        self.retained_score = 0.0;
        self.lost_area = self.prior_area;
        self.lost_area_pct = 100.0;
        self.lost_score = self.prior_score;
        self
    }

    /// Derive the loss figures from the retained totals.
    pub(crate) fn settle(mut self) -> Self {
        self.lost_area = self.prior_area - self.retained_area;
        self.lost_area_pct = if self.prior_area > 0.0 { 100.0 * self.lost_area / self.prior_area } else { 0.0 };
        self.lost_score = self.prior_score - self.retained_score;
        self
    }

    #[inline]
    pub fn is_total_loss(&self) -> bool { self.matched_keys.is_empty() }

    /// Flat attribute view for tabular writers. List columns are joined with `;`,
    /// missing list entries render as empty strings.
    pub fn attributes(&self) -> Attributes {
        fn text(value: &Option<String>) -> AttrValue {
            AttrValue::Text(value.clone().unwrap_or_default())
        }
        fn list(values: impl IntoIterator<Item = String>) -> AttrValue {
            AttrValue::Text(values.into_iter().collect::<Vec<_>>().join(";"))
        }

        Attributes::from([
            ("prior_key".to_string(), AttrValue::Text(self.prior_key.clone())),
            ("prior_type".to_string(), text(&self.prior_type)),
            ("prior_owner".to_string(), text(&self.prior_ownership_label)),
            ("own_pct".to_string(), AttrValue::Number(self.ownership_percentage)),
            ("prior_area".to_string(), AttrValue::Number(self.prior_area)),
            ("prior_score".to_string(), AttrValue::Number(self.prior_score)),
            ("matched_keys".to_string(), list(self.matched_keys.iter().cloned())),
            ("matched_owners".to_string(), list(self.matched_ownership_labels.iter().map(|l| l.clone().unwrap_or_default()))),
            ("matched_types".to_string(), list(self.matched_types.iter().map(|t| t.clone().unwrap_or_default()))),
            ("retained_area".to_string(), AttrValue::Number(self.retained_area)),
            ("retained_score".to_string(), AttrValue::Number(self.retained_score)),
            ("lost_area".to_string(), AttrValue::Number(self.lost_area)),
            ("lost_pct".to_string(), AttrValue::Number(self.lost_area_pct)),
            ("lost_score".to_string(), AttrValue::Number(self.lost_score)),
        ])
    }

    /// JSON properties: like [`Self::attributes`], but list columns stay arrays.
    pub fn properties(&self) -> serde_json::Map<String, serde_json::Value> {
        use serde_json::{json, Value};

        let mut properties = self.attributes().into_iter()
            .map(|(name, value)| (name, value.to_json()))
            .collect::<serde_json::Map<_, _>>();
        properties.insert("matched_keys".into(), json!(self.matched_keys));
        properties.insert("matched_owners".into(), json!(self.matched_ownership_labels));
        properties.insert("matched_types".into(), json!(self.matched_types));
        properties.insert("prior_type".into(), self.prior_type.clone().map_or(Value::Null, Value::String));
        properties.insert("prior_owner".into(), self.prior_ownership_label.clone().map_or(Value::Null, Value::String));
        properties
    }
}

/// One record per prior feature, in prior-layer order, in the prior layer's CRS.
#[derive(Debug, Clone, PartialEq)]
pub struct ComparisonLayer {
    pub crs: Crs,
    pub records: Vec<ComparisonRecord>,
}

impl ComparisonLayer {
    pub fn new(crs: Crs, records: Vec<ComparisonRecord>) -> Self {
        Self { crs, records }
    }

    #[inline] pub fn len(&self) -> usize { self.records.len() }

    #[inline] pub fn is_empty(&self) -> bool { self.records.is_empty() }

    #[inline] pub fn iter(&self) -> std::slice::Iter<'_, ComparisonRecord> { self.records.iter() }

    /// Layer-wide `(prior_area, retained_area, lost_area)`.
    pub fn area_totals(&self) -> (f64, f64, f64) {
        self.records.iter().fold((0.0, 0.0, 0.0), |(prior, retained, lost), record| {
            (prior + record.prior_area, retained + record.retained_area, lost + record.lost_area)
        })
    }

    /// Layer-wide `(prior_score, retained_score, lost_score)`.
    pub fn score_totals(&self) -> (f64, f64, f64) {
        self.records.iter().fold((0.0, 0.0, 0.0), |(prior, retained, lost), record| {
            (prior + record.prior_score, retained + record.retained_score, lost + record.lost_score)
        })
    }
}

impl<'a> IntoIterator for &'a ComparisonLayer {
    type Item = &'a ComparisonRecord;
    type IntoIter = std::slice::Iter<'a, ComparisonRecord>;

    fn into_iter(self) -> Self::IntoIter { self.records.iter() }
}
