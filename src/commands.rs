//! Subcommand handlers. Each loads its inputs, runs one engine and writes the result.

pub mod compare;
pub mod compile;
pub mod diff;
#[cfg(feature = "download")]
pub mod download;
pub mod join;

use std::path::Path;

use anyhow::{Context, Result};
use tracing::info;

use crate::cli::{Cli, InputCrs};
use crate::config::Config;
use crate::geom::Crs;
use crate::io::{read_layer, Format};
use crate::layer::{Dropped, Layer, RawLayer};

/// The configuration file (or defaults) with global flag overrides applied.
pub fn load_config(cli: &Cli) -> Result<Config> {
    let mut config = match &cli.config {
        Some(path) => Config::from_json_file(path)?,
        None => Config::default(),
    };
    if let Some(epsg) = cli.work_crs { config.work_crs = epsg }
    if let Some(key) = &cli.key_field { config.fields.key = key.clone() }

    config.validate().context("[config] Invalid configuration")?;
    Ok(config)
}

/// Read a layer and reproject it into the working CRS.
pub(crate) fn read_in_work_crs(path: &Path, input: &InputCrs, config: &Config) -> Result<RawLayer> {
    let work_crs = config.work_crs()?;
    let crs = match input.input_crs {
        Some(epsg) => Crs::from_epsg(epsg)?,
        None => Format::from_path(path)?.default_crs(&work_crs),
    };

    let layer = read_layer(path, crs, &config.fields.key)?;
    Ok(layer.to_crs(&work_crs)?)
}

/// Read, reproject and sanitize a layer.
pub(crate) fn read_sanitized(path: &Path, input: &InputCrs, config: &Config) -> Result<Layer> {
    let sanitized = read_in_work_crs(path, input, config)?.sanitize();
    report_dropped(path, &sanitized.dropped);
    Ok(sanitized.layer)
}

pub(crate) fn report_dropped(path: &Path, dropped: &[Dropped]) {
    if !dropped.is_empty() {
        info!(path = %path.display(), dropped = dropped.len(), "features dropped");
    }
}
