mod feature;
#[allow(clippy::module_inception)]
mod layer;
mod sanitize;
mod snapshot;
mod value;

pub use feature::{Feature, RawFeature};
pub use layer::{Layer, RawLayer};
pub use sanitize::{sanitize, DropReason, Dropped, Sanitized};
pub use snapshot::{compose_key, diff_snapshots, SnapshotDiff};
pub use value::{AttrValue, Attributes};
