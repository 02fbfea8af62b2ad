use std::fmt;

use geo::{Geometry, Polygon};
use tracing::{debug, info, warn};

use crate::geom::repair::{self, Reduction};

use super::{feature::Feature, layer::{Layer, RawLayer}};

/// Why a feature was removed from a layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DropReason {
    /// The feature had no geometry.
    NullGeometry,
    /// The geometry had no coordinates.
    EmptyGeometry,
    /// The geometry had no polygonal content (points or lines only).
    NonPolygonal,
    /// Validity repair left nothing with positive area.
    Unrepairable,
    /// Newer geometry covered the whole feature during compilation.
    Consumed,
}

impl fmt::Display for DropReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::NullGeometry => "null geometry",
            Self::EmptyGeometry => "empty geometry",
            Self::NonPolygonal => "non-polygonal geometry",
            Self::Unrepairable => "unrepairable geometry",
            Self::Consumed => "consumed by newer geometry",
        })
    }
}

/// A feature removed from a layer, kept so losses stay observable.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Dropped {
    pub key: String,
    pub reason: DropReason,
}

impl Dropped {
    pub(crate) fn new(key: &str, reason: DropReason) -> Self {
        match reason {
            DropReason::NullGeometry | DropReason::EmptyGeometry | DropReason::Consumed =>
                debug!(key = %key, %reason, "dropping feature"),
            DropReason::NonPolygonal | DropReason::Unrepairable =>
                warn!(key = %key, %reason, "dropping feature"),
        }
        Self { key: key.to_string(), reason }
    }
}

/// A sanitized layer together with the features that did not survive.
#[derive(Debug, Clone)]
pub struct Sanitized {
    pub layer: Layer,
    pub dropped: Vec<Dropped>,
}

/// Reduce a geometry to valid simple polygons with positive area.
pub(crate) fn sanitize_geometry(geometry: Option<&Geometry<f64>>) -> Result<Vec<Polygon<f64>>, DropReason> {
    let geometry = geometry.ok_or(DropReason::NullGeometry)?;

    let polygonal = match repair::reduce(geometry) {
        Reduction::Polygonal(mp) => mp,
        Reduction::Empty => return Err(DropReason::EmptyGeometry),
        Reduction::NonPolygonal => return Err(DropReason::NonPolygonal),
    };
    if polygonal.0.is_empty() { return Err(DropReason::EmptyGeometry) }

    let repaired = repair::repair(polygonal).ok_or(DropReason::Unrepairable)?;
    Ok(repair::explode(repaired))
}

/// Normalize a raw layer so that every row holds exactly one valid simple polygon.
///
/// Best-effort and lossy: rows that cannot be made polygonal are dropped and
/// reported, multipart rows are split with their attributes duplicated.
pub fn sanitize(raw: RawLayer) -> Sanitized {
    let input = raw.features.len();
    let mut features = Vec::with_capacity(input);
    let mut dropped = Vec::new();

    for raw_feature in raw.features {
        match sanitize_geometry(raw_feature.geometry.as_ref()) {
            Ok(parts) => features.extend(parts.into_iter().enumerate().map(|(part, polygon)| Feature {
                key: raw_feature.key.clone(),
                part: part as u32,
                geometry: polygon,
                attributes: raw_feature.attributes.clone(),
            })),
            Err(reason) => dropped.push(Dropped::new(&raw_feature.key, reason)),
        }
    }

    info!(input, output = features.len(), dropped = dropped.len(), "sanitized layer");
    Sanitized { layer: Layer::new(raw.crs, features), dropped }
}

impl RawLayer {
    /// See [`sanitize`].
    pub fn sanitize(self) -> Sanitized { sanitize(self) }
}
