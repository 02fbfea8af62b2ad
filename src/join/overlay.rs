use ahash::AHashMap;
use geo::{BooleanOps, MultiPolygon};
use tracing::info;

use crate::error::Result;
use crate::geom::{interiors_overlap, repair};
use crate::layer::{Attributes, Feature, Layer};

/// Overlay intersection: every positive-area polygonal piece of `a_i ∩ b_j`.
///
/// `b` is reprojected into the CRS of `a` when they differ. Pieces carry the
/// attributes of both sides; names present on both are suffixed `_1` (from
/// `a`) and `_2` (from `b`). Each piece keeps the key of its `a` feature, with
/// parts numbered in output order.
pub fn intersect_layers(a: &Layer, b: &Layer) -> Result<Layer> {
    let b = b.to_crs(&a.crs)?;
    let index = b.spatial_index();

    let mut pieces = Vec::new();
    let mut parts: AHashMap<&str, u32> = AHashMap::new();

    for left in a {
        for j in index.candidates(&left.geometry) {
            let right = &b.features[j];
            if !interiors_overlap(&left.geometry, &right.geometry) { continue }

            let shared = MultiPolygon::new(vec![left.geometry.clone()])
                .intersection(&MultiPolygon::new(vec![right.geometry.clone()]));
            let Some(shared) = repair::repair(shared) else { continue };

            let attributes = merge_attributes(&left.attributes, &right.attributes);
            for geometry in repair::explode(shared) {
                let part = parts.entry(left.key.as_str()).or_insert(0);
                pieces.push(Feature { key: left.key.clone(), part: *part, geometry, attributes: attributes.clone() });
                *part += 1;
            }
        }
    }

    info!(left = a.len(), right = b.len(), pieces = pieces.len(), "intersected layers");
    Ok(Layer::new(a.crs.clone(), pieces))
}

fn merge_attributes(left: &Attributes, right: &Attributes) -> Attributes {
    let mut merged = Attributes::new();
    for (name, value) in left {
        let name = if right.contains_key(name) { format!("{name}_1") } else { name.clone() };
        merged.insert(name, value.clone());
    }
    for (name, value) in right {
        let name = if left.contains_key(name) { format!("{name}_2") } else { name.clone() };
        merged.insert(name, value.clone());
    }
    merged
}
