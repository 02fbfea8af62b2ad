#![doc = "Landshift public API"]
pub mod cli;
pub mod commands;
pub mod compare;
pub mod compile;
pub mod config;
#[cfg(feature = "download")]
pub mod download;
mod error;
pub mod geom;
pub mod io;
pub mod join;
pub mod layer;

#[doc(inline)]
pub use error::{Error, Result};

#[doc(inline)]
pub use config::{CompilationConfig, ComparisonConfig, Config, FieldNames, TypeWeights};

#[doc(inline)]
pub use geom::{Crs, SpatialIndex};

#[doc(inline)]
pub use layer::{AttrValue, DropReason, Dropped, Feature, Layer, RawFeature, RawLayer, Sanitized};

#[doc(inline)]
pub use compile::{compile, Compiled};

#[doc(inline)]
pub use compare::{compare, Comparator, ComparisonLayer, ComparisonRecord, OwnershipMatcher};

#[doc(inline)]
pub use join::{attach_best_overlap_attribute, intersect_layers};
