use tracing::info;

use crate::error::{Error, Result};
use crate::geom::{intersection_area, Crs};
use crate::layer::Layer;

/// Copy `attribute` onto every feature of `layer` from the `reference` feature
/// it shares the largest intersection area with, measured in `work_crs`.
///
/// Features without a positive-area overlap have the attribute removed rather
/// than defaulted. Exact ties go to the reference feature with the lowest key,
/// then to the one earliest in the reference layer. The returned layer keeps
/// the CRS and geometry of `layer`.
///
/// Errors with [`Error::MissingAttribute`] when `reference` is non-empty and no
/// feature in it carries `attribute`.
pub fn attach_best_overlap_attribute(layer: &Layer, reference: &Layer, attribute: &str, work_crs: &Crs) -> Result<Layer> {
    if !reference.is_empty() && reference.iter().all(|feature| feature.attr(attribute).is_none()) {
        return Err(Error::MissingAttribute(attribute.to_string()));
    }

    let layer_w = layer.to_crs(work_crs)?;
    let reference_w = reference.to_crs(work_crs)?;
    let index = reference_w.spatial_index();

    let mut out = layer.clone();
    let mut matched = 0;
    for (feature, feature_w) in out.features.iter_mut().zip(&layer_w.features) {
        let best = index.candidates(&feature_w.geometry).into_iter()
            .map(|j| (j, intersection_area(&feature_w.geometry, &reference_w.features[j].geometry)))
            .filter(|&(_, area)| area > 0.0)
            .min_by(|&(a, area_a), &(b, area_b)| {
                area_b.total_cmp(&area_a)
                    .then_with(|| reference_w.features[a].key.cmp(&reference_w.features[b].key))
                    .then(a.cmp(&b))
            });

        let value = best.and_then(|(j, _)| reference_w.features[j].attr(attribute).cloned());
        match value {
            Some(value) => {
                feature.attributes.insert(attribute.to_string(), value);
                matched += 1;
            }
            None => { feature.attributes.remove(attribute); }
        }
    }

    info!(attribute, matched, unmatched = out.len() - matched, "attached best-overlap attribute");
    Ok(out)
}

impl Layer {
    /// See [`attach_best_overlap_attribute`].
    pub fn attach_best_overlap_attribute(&self, reference: &Layer, attribute: &str, work_crs: &Crs) -> Result<Layer> {
        attach_best_overlap_attribute(self, reference, attribute, work_crs)
    }
}
