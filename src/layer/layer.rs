use geo::Polygon;
use tracing::info;

use crate::error::Result;
use crate::geom::{Crs, Reprojector, SpatialIndex};

use super::feature::{Feature, RawFeature};

/// Features as delivered by a reader, not yet sanitized.
#[derive(Debug, Clone, PartialEq)]
pub struct RawLayer {
    pub crs: Crs,
    pub features: Vec<RawFeature>,
}

impl RawLayer {
    pub fn new(crs: Crs, features: Vec<RawFeature>) -> Self {
        Self { crs, features }
    }

    #[inline] pub fn len(&self) -> usize { self.features.len() }

    #[inline] pub fn is_empty(&self) -> bool { self.features.is_empty() }

    /// Reproject every present geometry into `target`.
    pub fn to_crs(&self, target: &Crs) -> Result<RawLayer> {
        if &self.crs == target { return Ok(self.clone()) }

        info!(from = %self.crs, to = %target, features = self.len(), "reprojecting raw layer");
        let reprojector = Reprojector::new(&self.crs, target)?;

        let features = self.features.iter()
            .map(|feature| Ok(RawFeature {
                geometry: feature.geometry.as_ref().map(|g| reprojector.geometry(g)).transpose()?,
                ..feature.clone()
            }))
            .collect::<Result<Vec<_>>>()?;

        Ok(RawLayer::new(target.clone(), features))
    }
}

impl From<Layer> for RawLayer {
    fn from(layer: Layer) -> Self {
        Self {
            crs: layer.crs,
            features: layer.features.into_iter().map(RawFeature::from).collect(),
        }
    }
}

/// An ordered collection of single-polygon features sharing one CRS.
#[derive(Debug, Clone, PartialEq)]
pub struct Layer {
    pub crs: Crs,
    pub features: Vec<Feature>,
}

impl Layer {
    pub fn new(crs: Crs, features: Vec<Feature>) -> Self {
        Self { crs, features }
    }

    #[inline] pub fn len(&self) -> usize { self.features.len() }

    #[inline] pub fn is_empty(&self) -> bool { self.features.is_empty() }

    #[inline] pub fn iter(&self) -> std::slice::Iter<'_, Feature> { self.features.iter() }

    /// Clone out the geometry column.
    pub fn polygons(&self) -> Vec<Polygon<f64>> {
        self.features.iter().map(|feature| feature.geometry.clone()).collect()
    }

    /// Build an R-tree over the feature geometries.
    pub fn spatial_index(&self) -> SpatialIndex {
        SpatialIndex::new(self.features.iter().map(|feature| &feature.geometry))
    }

    /// Reproject every geometry into `target`. A layer already in `target` is cloned as-is.
    pub fn to_crs(&self, target: &Crs) -> Result<Layer> {
        if &self.crs == target { return Ok(self.clone()) }

        info!(from = %self.crs, to = %target, features = self.len(), "reprojecting layer");
        let reprojector = Reprojector::new(&self.crs, target)?;

        let features = self.features.iter()
            .map(|feature| Ok(Feature {
                geometry: reprojector.polygon(&feature.geometry)?,
                ..feature.clone()
            }))
            .collect::<Result<Vec<_>>>()?;

        Ok(Layer::new(target.clone(), features))
    }
}

impl<'a> IntoIterator for &'a Layer {
    type Item = &'a Feature;
    type IntoIter = std::slice::Iter<'a, Feature>;

    fn into_iter(self) -> Self::IntoIter { self.features.iter() }
}
