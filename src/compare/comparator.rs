use rayon::prelude::*;
use tracing::info;

use crate::config::{ComparisonConfig, FieldNames};
use crate::error::Result;
use crate::geom::{intersection_area, intersects, SpatialIndex};
use crate::layer::{Feature, Layer};

use super::ownership::{OwnershipMatcher, OwnershipPredicate};
use super::record::{ComparisonLayer, ComparisonRecord};

/// Scores prior layers against one current layer.
///
/// The current layer's spatial index is built once and shared read-only, so
/// several prior layers can be compared in parallel with [`Self::compare_many`].
pub struct Comparator<'a, P: OwnershipPredicate = OwnershipMatcher> {
    current: &'a Layer,
    index: SpatialIndex,
    config: &'a ComparisonConfig,
    fields: &'a FieldNames,
    predicate: P,
}

impl<'a> Comparator<'a> {
    /// A comparator using the ownership matcher from `config`.
    pub fn new(current: &'a Layer, config: &'a ComparisonConfig, fields: &'a FieldNames) -> Result<Self> {
        Self::with_predicate(current, config, fields, config.ownership.clone())
    }
}

impl<'a, P: OwnershipPredicate> Comparator<'a, P> {
    pub fn with_predicate(
        current: &'a Layer,
        config: &'a ComparisonConfig,
        fields: &'a FieldNames,
        predicate: P,
    ) -> Result<Self> {
        config.validate()?;
        Ok(Self { current, index: current.spatial_index(), config, fields, predicate })
    }

    /// One record per prior feature. A current layer in a different CRS is
    /// reprojected into the prior layer's CRS first, once for the whole layer.
    pub fn compare(&self, prior: &Layer) -> Result<ComparisonLayer> {
        let reprojected;
        let (current, index) = if self.current.crs == prior.crs {
            (self.current, &self.index)
        } else {
            let layer = self.current.to_crs(&prior.crs)?;
            let index = layer.spatial_index();
            reprojected = (layer, index);
            (&reprojected.0, &reprojected.1)
        };

        let records = prior.iter()
            .map(|feature| self.score(feature, current, index))
            .collect::<Vec<_>>();
        let comparison = ComparisonLayer::new(prior.crs.clone(), records);

        let (prior_area, retained_area, lost_area) = comparison.area_totals();
        info!(
            prior = prior.len(),
            current = current.len(),
            total_loss = comparison.iter().filter(|r| r.is_total_loss()).count(),
            prior_area,
            retained_area,
            lost_area,
            "compared layers"
        );
        Ok(comparison)
    }

    /// Compare several prior layers against the shared current layer in parallel.
    pub fn compare_many(&self, priors: &[Layer]) -> Result<Vec<ComparisonLayer>> {
        priors.par_iter().map(|prior| self.compare(prior)).collect()
    }

    fn score(&self, prior: &Feature, current: &Layer, index: &SpatialIndex) -> ComparisonRecord {
        let weights = &self.config.type_weights;
        let ownership_percentage = prior.ownership_percentage(self.fields);
        let scale = ownership_percentage / 100.0;

        let prior_type = prior.land_use_type(self.fields);
        let prior_area = prior.area() * scale;
        let prior_score = prior_area * weights.get(prior_type.as_deref());

        let mut record = ComparisonRecord {
            prior_key: prior.key.clone(),
            prior_type,
            prior_ownership_label: prior.ownership_label(self.fields),
            ownership_percentage,
            prior_area,
            prior_score,
            matched_keys: Vec::new(),
            matched_ownership_labels: Vec::new(),
            matched_types: Vec::new(),
            retained_area: 0.0,
            retained_score: 0.0,
            lost_area: 0.0,
            lost_area_pct: 0.0,
            lost_score: 0.0,
            geometry: prior.geometry.clone(),
        };

        for i in index.candidates(&prior.geometry) {
            let candidate = &current.features[i];
            if !intersects(&prior.geometry, &candidate.geometry) { continue }

            let area = intersection_area(&prior.geometry, &candidate.geometry) * scale;
            if area <= self.config.area_tolerance { continue }

            let label = candidate.ownership_label(self.fields);
            let kind = candidate.land_use_type(self.fields);
            if self.predicate.is_owned(label.as_deref()) {
                record.retained_area += area;
                record.retained_score += area * weights.get(kind.as_deref());
            }

            record.matched_keys.push(candidate.key.clone());
            record.matched_ownership_labels.push(label);
            record.matched_types.push(kind);
        }

        if record.matched_keys.is_empty() { record.total_loss() } else { record.settle() }
    }
}

/// Compare `prior` against `current` using the ownership matcher from `config`.
pub fn compare(prior: &Layer, current: &Layer, config: &ComparisonConfig, fields: &FieldNames) -> Result<ComparisonLayer> {
    Comparator::new(current, config, fields)?.compare(prior)
}

#[cfg(test)]
mod tests {
    use geo::{coord, Rect, Polygon};

    use super::*;
    use crate::geom::Crs;

    fn rect(x0: f64, y0: f64, x1: f64, y1: f64) -> Polygon<f64> {
        Rect::new(coord! { x: x0, y: y0 }, coord! { x: x1, y: y1 }).to_polygon()
    }

    fn grid(features: Vec<Feature>) -> Layer {
        Layer::new(Crs::from_epsg(2039).unwrap(), features)
    }

    #[test]
    fn unowned_matches_are_listed_but_not_retained() {
        let fields = FieldNames::default();
        let config = ComparisonConfig::default();

        let prior = grid(vec![Feature::new("p", rect(0.0, 0.0, 2.0, 2.0)).with("type", 1.0)]);
        let current = grid(vec![
            Feature::new("ours", rect(0.0, 0.0, 1.0, 2.0)).with("type", 1.0).with("owner", "KKL"),
            Feature::new("theirs", rect(1.0, 0.0, 2.0, 2.0)).with("type", 2.0).with("owner", "someone"),
        ]);

        let result = compare(&prior, &current, &config, &fields).unwrap();
        let record = &result.records[0];
        assert_eq!(record.matched_keys, vec!["ours", "theirs"]);
        assert_eq!(record.matched_types, vec![Some("1".to_string()), Some("2".to_string())]);
        assert!((record.retained_area - 2.0).abs() < 1e-9);
        assert!((record.retained_score - 20.0).abs() < 1e-9);
        assert!((record.lost_area_pct - 50.0).abs() < 1e-9);
    }

    #[test]
    fn closure_predicate() {
        let fields = FieldNames::default();
        let config = ComparisonConfig::default();
        let prior = grid(vec![Feature::new("p", rect(0.0, 0.0, 2.0, 2.0))]);
        let current = grid(vec![Feature::new("c", rect(0.0, 0.0, 2.0, 2.0))]);

        let comparator = Comparator::with_predicate(&current, &config, &fields, |_: Option<&str>| true).unwrap();
        let record = &comparator.compare(&prior).unwrap().records[0];
        assert!((record.retained_area - 4.0).abs() < 1e-9);
        assert!(record.lost_area.abs() < 1e-9);
        assert_eq!(record.lost_area_pct, 0.0);
    }

    #[test]
    fn zero_ownership_is_a_total_loss() {
        let fields = FieldNames::default();
        let config = ComparisonConfig::default();
        let prior = grid(vec![Feature::new("p", rect(0.0, 0.0, 2.0, 2.0)).with("ownership_pct", 0.0)]);
        let current = grid(vec![Feature::new("c", rect(0.0, 0.0, 2.0, 2.0)).with("owner", "KKL")]);

        let record = &compare(&prior, &current, &config, &fields).unwrap().records[0];
        assert_eq!(record.prior_area, 0.0);
        assert!(record.is_total_loss());
        assert_eq!(record.lost_area_pct, 100.0);
    }

    #[test]
    fn invalid_config_is_rejected() {
        let fields = FieldNames::default();
        let config = ComparisonConfig { area_tolerance: f64::NAN, ..ComparisonConfig::default() };
        let current = grid(vec![]);
        assert!(Comparator::new(&current, &config, &fields).is_err());
    }
}
