use std::str::FromStr;

use anyhow::{anyhow, Result};
use geo::Geometry;
use ::wkt::{ToWkt, Wkt};

/// Parse WKT text into a geometry. The result is not validated; run it
/// through layer sanitization before geometric work.
pub fn parse_wkt(text: &str) -> Result<Geometry<f64>> {
    let parsed = Wkt::<f64>::from_str(text.trim())
        .map_err(|e| anyhow!("[io::wkt] Failed to parse WKT: {e:?}"))?;
    parsed.try_into()
        .map_err(|e: ::wkt::conversion::Error| anyhow!("[io::wkt] Unsupported WKT geometry: {e:?}"))
}

/// Encode a geometry as WKT text.
pub fn to_wkt(geometry: &Geometry<f64>) -> String {
    geometry.wkt_string()
}
