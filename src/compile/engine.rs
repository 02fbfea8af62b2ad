use ahash::AHashMap;
use geo::{BooleanOps, MultiPolygon, Polygon};
use smallvec::SmallVec;
use tracing::{debug, info};

use crate::config::CompilationConfig;
use crate::error::Result;
use crate::geom::{interiors_overlap, intersection_area, repair, SpatialIndex};
use crate::layer::{sanitize, DropReason, Dropped, Feature, Layer, RawLayer, Sanitized};

use super::precedence::{outranks, rank_cmp, Precedence};

/// Higher-precedence features overlapping one feature. Most features have few.
type Erasers = SmallVec<[usize; 4]>;

/// A compiled layer together with the features that did not survive.
#[derive(Debug, Clone)]
pub struct Compiled {
    pub layer: Layer,
    pub dropped: Vec<Dropped>,
}

/// Resolve overlapping time-stamped polygons into a partition where the
/// higher-precedence polygon keeps every overlapping region.
///
/// Features are ordered by `config.precedence_field` (largest first when
/// `newest_first`, features without a value last), then every feature is cut
/// by the original shapes of all overlapping features that outrank it.
/// Features with equal or incomparable precedence are never cut against each
/// other and may still overlap in the output.
///
/// Output is in precedence order, with the parts of a split feature adjacent
/// and renumbered per key.
pub fn compile(raw: RawLayer, config: &CompilationConfig) -> Result<Compiled> {
    config.validate()?;

    let Sanitized { layer, mut dropped } = sanitize(raw);
    let crs = layer.crs.clone();
    let input = layer.len();

    let mut ranked = layer.features.into_iter()
        .map(|feature| {
            let precedence = Precedence::of(feature.attr(&config.precedence_field));
            (precedence, feature)
        })
        .collect::<Vec<_>>();
    ranked.sort_by(|(a, _), (b, _)| rank_cmp(a.as_ref(), b.as_ref(), config.newest_first));

    let (precedence, features): (Vec<_>, Vec<_>) = ranked.into_iter().unzip();
    let polygons = features.iter().map(|feature| feature.geometry.clone()).collect::<Vec<_>>();

    // Phase 1: find erasers against the immutable, precedence-ordered snapshot.
    let erasers = find_erasers(&polygons, &precedence, config);
    let eroded = erasers.iter().filter(|e| !e.is_empty()).count();

    // Phase 2: cut each feature by the original shapes of its erasers.
    let mut output = Vec::with_capacity(features.len());
    for (feature, erasers) in features.into_iter().zip(&erasers) {
        if erasers.is_empty() {
            output.push(feature);
            continue;
        }

        match erode(&feature.geometry, erasers.iter().map(|&e| &polygons[e])) {
            Ok(parts) => output.extend(parts.into_iter().map(|geometry| Feature { geometry, ..feature.clone() })),
            Err(reason) => dropped.push(Dropped::new(&feature.key, reason)),
        }
    }

    renumber_parts(&mut output);

    info!(
        input,
        eroded,
        output = output.len(),
        dropped = dropped.len(),
        field = %config.precedence_field,
        "compiled layer"
    );
    Ok(Compiled { layer: Layer::new(crs, output), dropped })
}

impl RawLayer {
    /// See [`compile`].
    pub fn compile(self, config: &CompilationConfig) -> Result<Compiled> { compile(self, config) }
}

/// For every feature, the indices of overlapping features that outrank it.
/// Overlaps no larger than `config.overlap_tolerance` are boolean-op noise
/// and do not make an eraser.
fn find_erasers(polygons: &[Polygon<f64>], precedence: &[Option<Precedence>], config: &CompilationConfig) -> Vec<Erasers> {
    let index = SpatialIndex::new(polygons);
    let mut erasers = vec![Erasers::new(); polygons.len()];

    for (i, j) in index.self_join(polygons) {
        let (a, b) = (precedence[i].as_ref(), precedence[j].as_ref());
        let loser = if outranks(a, b, config.newest_first) {
            j
        } else if outranks(b, a, config.newest_first) {
            i
        } else {
            continue;
        };

        let (p, q) = (&polygons[i], &polygons[j]);
        if interiors_overlap(p, q) && intersection_area(p, q) > config.overlap_tolerance {
            erasers[loser].push(if loser == j { i } else { j });
        }
    }

    for list in &mut erasers { list.sort_unstable() }
    erasers
}

/// Subtract every eraser from `target`, one at a time, and return the
/// surviving simple polygons.
///
/// Fails with [`DropReason::Consumed`] when the erasers cover the target and
/// with [`DropReason::Unrepairable`] when repairing the remainder leaves
/// nothing with positive area.
fn erode<'a>(target: &Polygon<f64>, erasers: impl Iterator<Item = &'a Polygon<f64>>) -> std::result::Result<Vec<Polygon<f64>>, DropReason> {
    let mut remaining = MultiPolygon::new(vec![target.clone()]);

    for eraser in erasers {
        remaining = remaining.difference(&MultiPolygon::new(vec![eraser.clone()]));
        if remaining.0.is_empty() { return Err(DropReason::Consumed) }
    }

    let repaired = repair::repair(remaining).ok_or(DropReason::Unrepairable)?;
    let parts = repair::explode(repaired);
    if parts.len() > 1 { debug!(parts = parts.len(), "erosion split feature") }
    if parts.is_empty() { Err(DropReason::Unrepairable) } else { Ok(parts) }
}

/// Number the parts of each key consecutively in output order.
fn renumber_parts(features: &mut [Feature]) {
    let mut next: AHashMap<String, u32> = AHashMap::new();
    for feature in features {
        let part = next.entry(feature.key.clone()).or_insert(0);
        feature.part = *part;
        *part += 1;
    }
}
