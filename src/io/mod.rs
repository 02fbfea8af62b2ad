mod csv;
mod esri;
mod fs;
mod geojson;
mod shp;
mod table;
mod wkt;

use std::io::Write;
use std::path::Path;

use anyhow::{bail, Context, Result};
use tracing::info;

use crate::compare::ComparisonLayer;
use crate::geom::Crs;
use crate::layer::{Layer, RawLayer};

pub use self::csv::{read_csv, GEOMETRY_COLUMN};
pub use self::esri::{esri_rings_to_polygons, parse_esri_polygon};
pub use self::fs::{ensure_dir_exists, PendingWrite};
pub use self::geojson::{geometry_to_json, parse_geometry, read_geojson};
pub(crate) use self::geojson::read_features;
pub use self::shp::read_shapefile;
pub use self::wkt::{parse_wkt, to_wkt};

use self::table::Table;

/// Layer file formats, chosen by file extension.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Format {
    GeoJson,
    Shapefile,
    Csv,
}

impl Format {
    pub fn from_path(path: &Path) -> Result<Self> {
        let extension = path.extension()
            .and_then(|ext| ext.to_str())
            .map(str::to_ascii_lowercase);

        Ok(match extension.as_deref() {
            Some("geojson" | "json") => Self::GeoJson,
            Some("shp") => Self::Shapefile,
            Some("csv") => Self::Csv,
            other => bail!("Unsupported layer format {:?} for {}", other.unwrap_or(""), path.display()),
        })
    }

    /// The CRS assumed for a file of this format when the caller names none:
    /// WGS84 for GeoJSON, the working CRS otherwise.
    pub fn default_crs(self, work_crs: &Crs) -> Crs {
        match self {
            Self::GeoJson => Crs::wgs84(),
            Self::Shapefile | Self::Csv => work_crs.clone(),
        }
    }
}

/// Read a layer file into a raw layer in `crs`.
pub fn read_layer(path: &Path, crs: Crs, key_field: &str) -> Result<RawLayer> {
    let layer = match Format::from_path(path)? {
        Format::GeoJson => {
            let bytes = std::fs::read(path)
                .with_context(|| format!("[io] Failed to read {}", path.display()))?;
            read_geojson(&bytes, crs, key_field)?
        }
        Format::Shapefile => read_shapefile(path, crs, key_field)?,
        Format::Csv => read_csv(path, crs, key_field, GEOMETRY_COLUMN)?,
    };

    info!(path = %path.display(), features = layer.len(), crs = %layer.crs, "read layer");
    Ok(layer)
}

fn write_table(table: &Table, path: &Path, force: bool) -> Result<()> {
    match Format::from_path(path)? {
        Format::GeoJson => {
            let bytes = geojson::write_geojson_bytes(table)?;
            let mut pending = PendingWrite::open(path, force)?;
            pending.write_all(&bytes).context("[io] Failed to write GeoJSON")?;
            pending.finalize()?;
        }
        Format::Csv => {
            let mut pending = PendingWrite::open(path, force)?;
            csv::write_csv(table, &mut pending)?;
            pending.finalize()?;
        }
        Format::Shapefile => {
            shp::write_shapefile(table, path, force)?;
        }
    }

    info!(path = %path.display(), rows = table.rows.len(), "wrote layer");
    Ok(())
}

/// Write a sanitized layer. GeoJSON output is reprojected to WGS84 and carries
/// a `wkt` property; Shapefile and CSV stay in the layer CRS.
pub fn write_layer(layer: &Layer, path: &Path, key_field: &str, force: bool) -> Result<()> {
    write_table(&Table::from_layer(layer, key_field), path, force)
}

/// Write a raw layer, e.g. the added or deleted parcels of a snapshot diff.
pub fn write_raw_layer(layer: &RawLayer, path: &Path, key_field: &str, force: bool) -> Result<()> {
    write_table(&Table::from_raw(layer, key_field), path, force)
}

/// Write comparison records, one row per prior feature.
pub fn write_comparison(layer: &ComparisonLayer, path: &Path, force: bool) -> Result<()> {
    write_table(&Table::from_comparison(layer), path, force)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn formats_from_extension() {
        assert_eq!(Format::from_path(Path::new("a/b.GeoJSON")).unwrap(), Format::GeoJson);
        assert_eq!(Format::from_path(Path::new("parcels.shp")).unwrap(), Format::Shapefile);
        assert_eq!(Format::from_path(Path::new("out.csv")).unwrap(), Format::Csv);
        assert!(Format::from_path(Path::new("data.gpkg")).is_err());
        assert!(Format::from_path(Path::new("noext")).is_err());
    }
}
