use thiserror::Error;

/// Contract violations raised by the core engines.
///
/// Malformed individual geometries are never reported through this type; they
/// are dropped and listed in the `dropped` report returned beside each layer.
#[derive(Error, Debug)]
pub enum Error {
    /// A configuration value is out of its documented domain.
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    /// No PROJ.4 definition is known for the EPSG code.
    #[error("unknown CRS EPSG:{0} (use Crs::custom with a PROJ.4 definition)")]
    UnknownCrs(u32),

    /// Building or applying a coordinate transformation failed.
    #[error("projection EPSG:{from} -> EPSG:{to} failed: {reason}")]
    Projection { from: u32, to: u32, reason: String },

    /// The attribute requested for transfer exists on no reference feature.
    #[error("attribute `{0}` not found in reference layer")]
    MissingAttribute(String),
}

/// Result type for core operations.
pub type Result<T> = std::result::Result<T, Error>;
