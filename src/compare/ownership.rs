use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::config::FieldNames;
use crate::layer::{AttrValue, Layer};

/// Decides whether an ownership label names the organization.
pub trait OwnershipPredicate: Sync {
    fn is_owned(&self, label: Option<&str>) -> bool;
}

impl<F> OwnershipPredicate for F
where
    F: Fn(Option<&str>) -> bool + Sync,
{
    fn is_owned(&self, label: Option<&str>) -> bool { self(label) }
}

/// Matches ownership labels against a set of textual variants of the same entity.
///
/// Labels and variants compare after normalization: case folded, whitespace
/// trimmed and collapsed, quote and gershayim marks removed. With
/// `accept_any`, every label (including a missing one) matches.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct OwnershipMatcher {
    pub variants: Vec<String>,
    pub accept_any: bool,
}

impl Default for OwnershipMatcher {
    fn default() -> Self {
        Self {
            variants: ["קק\"ל", "קרן קיימת לישראל", "KKL", "JNF"].map(String::from).to_vec(),
            accept_any: false,
        }
    }
}

impl OwnershipMatcher {
    pub fn new<S: Into<String>>(variants: impl IntoIterator<Item = S>) -> Self {
        Self { variants: variants.into_iter().map(Into::into).collect(), accept_any: false }
    }

    /// A matcher for which every label counts as owned.
    pub fn any() -> Self {
        Self { variants: Vec::new(), accept_any: true }
    }

    pub fn normalize(label: &str) -> String {
        const MARKS: [char; 6] = ['"', '\'', '״', '׳', '“', '”'];

        label.split_whitespace()
            .map(|word| word.chars().filter(|c| !MARKS.contains(c)).flat_map(char::to_lowercase).collect::<String>())
            .filter(|word| !word.is_empty())
            .collect::<Vec<_>>()
            .join(" ")
    }

    pub fn matches(&self, label: &str) -> bool {
        let label = Self::normalize(label);
        !label.is_empty() && self.variants.iter().any(|variant| Self::normalize(variant) == label)
    }
}

impl OwnershipPredicate for OwnershipMatcher {
    fn is_owned(&self, label: Option<&str>) -> bool {
        self.accept_any || label.is_some_and(|label| self.matches(label))
    }
}

/// Percentage of a parcel registered to the organization, rounded to one decimal.
///
/// Values within [95, 105] on a parcel whose label names the organization are
/// registry noise and snap to 100. A non-positive total yields 0.
pub fn derive_ownership_percentage(
    owned_area: f64,
    total_area: f64,
    label: Option<&str>,
    matcher: &OwnershipMatcher,
) -> f64 {
    if total_area.is_nan() || total_area <= 0.0 || !owned_area.is_finite() { return 0.0 }

    let pct = (owned_area / total_area * 1000.0).round() / 10.0;
    let owned_label = label.is_some_and(|label| matcher.matches(label));
    if owned_label && (95.0..=105.0).contains(&pct) { 100.0 } else { pct }
}

impl Layer {
    /// Derive each feature's ownership percentage from the registered owned
    /// area in `owned_area_field` and the polygon area, and write it into the
    /// configured percentage field. Features without a numeric owned area are
    /// left untouched. Returns the number of features updated.
    pub fn assign_ownership_percentage(
        &mut self,
        owned_area_field: &str,
        fields: &FieldNames,
        matcher: &OwnershipMatcher,
    ) -> usize {
        let mut updated = 0;
        for feature in &mut self.features {
            let Some(owned) = feature.attr(owned_area_field).and_then(AttrValue::as_f64) else {
                continue;
            };
            let pct = derive_ownership_percentage(
                owned,
                feature.area(),
                feature.ownership_label(fields).as_deref(),
                matcher,
            );
            feature.attributes.insert(fields.ownership_percentage.clone(), AttrValue::Number(pct));
            updated += 1;
        }
        debug!(updated, total = self.len(), "assigned ownership percentages");
        updated
    }
}

#[cfg(test)]
mod tests {
    use geo::{coord, Rect};

    use super::*;
    use crate::geom::Crs;
    use crate::layer::Feature;

    #[test]
    fn spellings_of_one_entity_match() {
        let matcher = OwnershipMatcher::default();
        assert!(matcher.matches("קק\"ל"));
        assert!(matcher.matches("  קק״ל "));
        assert!(matcher.matches("קרן  קיימת   לישראל"));
        assert!(matcher.matches("kkl"));
        assert!(!matcher.matches("רשות מקרקעי ישראל"));
        assert!(!matcher.matches(""));
        assert!(!matcher.is_owned(None));
    }

    #[test]
    fn accept_any_and_closures() {
        assert!(OwnershipMatcher::any().is_owned(None));
        assert!(OwnershipMatcher::any().is_owned(Some("anyone")));

        let only_a = |label: Option<&str>| label == Some("A");
        assert!(only_a.is_owned(Some("A")));
        assert!(!only_a.is_owned(Some("B")));
    }

    #[test]
    fn derived_percentage_rounds_and_snaps() {
        let matcher = OwnershipMatcher::default();
        assert_eq!(derive_ownership_percentage(333.0, 1000.0, None, &matcher), 33.3);
        assert_eq!(derive_ownership_percentage(970.0, 1000.0, Some("קק\"ל"), &matcher), 100.0);
        assert_eq!(derive_ownership_percentage(1040.0, 1000.0, Some("קק\"ל"), &matcher), 100.0);
        assert_eq!(derive_ownership_percentage(970.0, 1000.0, Some("other"), &matcher), 97.0);
        assert_eq!(derive_ownership_percentage(1060.0, 1000.0, Some("קק\"ל"), &matcher), 106.0);
        assert_eq!(derive_ownership_percentage(10.0, 0.0, Some("קק\"ל"), &matcher), 0.0);
    }

    #[test]
    fn layer_assignment_writes_configured_field() {
        let fields = FieldNames::default();
        let square = Rect::new(coord! { x: 0.0, y: 0.0 }, coord! { x: 10.0, y: 10.0 }).to_polygon();
        let mut layer = Layer::new(Crs::wgs84(), vec![
            Feature::new("a", square.clone()).with("owned", 50.0),
            Feature::new("b", square.clone()).with("owned", 98.0).with(fields.ownership_label.as_str(), "KKL"),
            Feature::new("c", square),
        ]);

        assert_eq!(layer.assign_ownership_percentage("owned", &fields, &OwnershipMatcher::default()), 2);
        assert_eq!(layer.features[0].ownership_percentage(&fields), 50.0);
        assert_eq!(layer.features[1].ownership_percentage(&fields), 100.0);
        assert_eq!(layer.features[2].attr(&fields.ownership_percentage), None);
    }
}
