use ahash::AHashSet;
use tracing::info;

use super::{feature::RawFeature, value::Attributes};

/// Parcels that appeared or disappeared between two snapshots.
#[derive(Debug, Clone, Default)]
pub struct SnapshotDiff {
    /// Present only in the current snapshot.
    pub added: Vec<RawFeature>,
    /// Present only in the previous snapshot.
    pub deleted: Vec<RawFeature>,
}

/// Join attribute labels into a composite key, e.g. block and parcel
/// numbers `1234` and `56` into `"1234_56"`. Returns `None` if any part is missing.
pub fn compose_key(attributes: &Attributes, parts: &[&str], separator: &str) -> Option<String> {
    let labels = parts.iter()
        .map(|name| attributes.get(*name).map(|value| value.label().into_owned()))
        .collect::<Option<Vec<_>>>()?;
    Some(labels.join(separator))
}

/// Compare two snapshots by feature key.
///
/// Keys are compared after trimming, so `"12 "` and `"12"` are the same parcel.
/// Duplicate keys within one snapshot count once for membership but every
/// feature carrying an unmatched key is reported.
pub fn diff_snapshots(current: &[RawFeature], previous: &[RawFeature]) -> SnapshotDiff {
    fn keys(features: &[RawFeature]) -> AHashSet<&str> {
        features.iter().map(|feature| feature.key.trim()).collect()
    }

    let current_keys = keys(current);
    let previous_keys = keys(previous);

    let diff = SnapshotDiff {
        added: current.iter()
            .filter(|feature| !previous_keys.contains(feature.key.trim()))
            .cloned()
            .collect(),
        deleted: previous.iter()
            .filter(|feature| !current_keys.contains(feature.key.trim()))
            .cloned()
            .collect(),
    };

    info!(added = diff.added.len(), deleted = diff.deleted.len(), "compared snapshots");
    diff
}

impl RawFeature {
    /// Replace the key with a composite of attribute labels, leaving it
    /// untouched when a part is missing. Returns whether the key was set.
    pub fn rekey(&mut self, parts: &[&str], separator: &str) -> bool {
        match compose_key(&self.attributes, parts, separator) {
            Some(key) => { self.key = key; true }
            None => false,
        }
    }
}
