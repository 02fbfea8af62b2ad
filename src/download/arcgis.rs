use std::time::Duration;

use anyhow::{bail, Context, Result};
use rayon::prelude::*;
use reqwest::blocking::Client;
use serde_json::Value;
use tracing::{debug, info, warn};

use crate::geom::Crs;
use crate::io::read_features;
use crate::layer::{RawFeature, RawLayer};

use super::{get_json, http_client, with_retries};

/// Paging and transport settings for a feature-layer download.
#[derive(Debug, Clone)]
pub struct DownloadOptions {
    /// Features requested per page (`resultRecordCount`).
    pub batch_size: usize,
    /// Output spatial reference requested from the server (`outSR`).
    pub out_sr: u32,
    /// Attempts per page before it is reported as failed.
    pub retries: u32,
    /// Linear back-off step between attempts.
    pub backoff: Duration,
    pub timeout: Duration,
    /// Public planning servers often present certificates that do not verify.
    pub accept_invalid_certs: bool,
}

impl Default for DownloadOptions {
    fn default() -> Self {
        Self {
            batch_size: 1000,
            out_sr: 2039,
            retries: 3,
            backoff: Duration::from_millis(500),
            timeout: Duration::from_secs(120),
            accept_invalid_certs: false,
        }
    }
}

/// The downloaded layer plus the pages that never arrived.
#[derive(Debug, Clone)]
pub struct DownloadReport {
    pub layer: RawLayer,
    /// Count reported by the server before paging.
    pub total: usize,
    /// `resultOffset` of every page that failed all attempts, ascending.
    pub failed_offsets: Vec<usize>,
}

impl DownloadReport {
    #[inline] pub fn is_complete(&self) -> bool { self.failed_offsets.is_empty() }
}

/// Page start offsets covering `total` features.
pub fn batch_offsets(total: usize, batch_size: usize) -> Vec<usize> {
    (0..total).step_by(batch_size.max(1)).collect()
}

fn query_url(base_url: &str, layer_id: u32) -> String {
    format!("{}/{layer_id}/query", base_url.trim_end_matches('/'))
}

/// Ask the server how many features match `where=1=1`.
fn feature_count(client: &Client, url: &str, options: &DownloadOptions) -> Result<usize> {
    let params = [
        ("where", "1=1".to_string()),
        ("returnCountOnly", "true".to_string()),
        ("f", "json".to_string()),
    ];

    let response = with_retries(options.retries, options.backoff, "count query", || get_json(client, url, &params))?;
    response.get("count")
        .and_then(Value::as_u64)
        .map(|count| count as usize)
        .with_context(|| format!("[download] {url}: count response without a `count` field"))
}

/// Decode one GeoJSON page. ArcGIS reports failures as HTTP 200 with an `error` object.
fn parse_page(page: &Value, key_field: &str, offset: usize) -> Result<Vec<RawFeature>> {
    if let Some(error) = page.get("error") {
        bail!("[download] server error at offset {offset}: {error}");
    }
    let features = page.get("features")
        .and_then(Value::as_array)
        .map(Vec::as_slice)
        .unwrap_or_default();
    Ok(read_features(features, key_field, offset))
}

fn fetch_page(client: &Client, url: &str, offset: usize, options: &DownloadOptions, key_field: &str) -> Result<Vec<RawFeature>> {
    let params = [
        ("where", "1=1".to_string()),
        ("outFields", "*".to_string()),
        ("f", "geojson".to_string()),
        ("returnGeometry", "true".to_string()),
        ("outSR", options.out_sr.to_string()),
        ("resultOffset", offset.to_string()),
        ("resultRecordCount", options.batch_size.to_string()),
    ];

    let what = format!("page at offset {offset}");
    with_retries(options.retries, options.backoff, &what, || {
        parse_page(&get_json(client, url, &params)?, key_field, offset)
    })
}

/// Download every feature of layer `layer_id` of an ArcGIS MapServer/FeatureServer.
///
/// Pages are fetched in parallel and appended in offset order once all have
/// finished. Pages that fail every attempt are listed in the report rather
/// than aborting the download; a failed count query is an error.
pub fn download_layer(base_url: &str, layer_id: u32, options: &DownloadOptions, key_field: &str) -> Result<DownloadReport> {
    let crs = Crs::from_epsg(options.out_sr)
        .with_context(|| format!("[download] Unsupported outSR {}", options.out_sr))?;
    let client = http_client(options.timeout, options.accept_invalid_certs)?;
    let url = query_url(base_url, layer_id);

    let total = feature_count(&client, &url, options)?;
    let offsets = batch_offsets(total, options.batch_size);
    info!(url = %url, total, pages = offsets.len(), "downloading feature layer");

    let pages = offsets.par_iter()
        .map(|&offset| {
            let page = fetch_page(&client, &url, offset, options, key_field);
            match &page {
                Ok(features) => debug!(offset, features = features.len(), "fetched page"),
                Err(e) => warn!(offset, error = %e, "page failed after retries"),
            }
            (offset, page)
        })
        .collect::<Vec<_>>();

    let mut features = Vec::with_capacity(total);
    let mut failed_offsets = Vec::new();
    for (offset, page) in pages {
        match page {
            Ok(page) => features.extend(page),
            Err(_) => failed_offsets.push(offset),
        }
    }

    info!(features = features.len(), failed_pages = failed_offsets.len(), "download finished");
    Ok(DownloadReport { layer: RawLayer::new(crs, features), total, failed_offsets })
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn offsets_cover_total() {
        assert_eq!(batch_offsets(2500, 1000), vec![0, 1000, 2000]);
        assert_eq!(batch_offsets(2000, 1000), vec![0, 1000]);
        assert!(batch_offsets(0, 1000).is_empty());
    }

    #[test]
    fn query_url_joins_layer() {
        assert_eq!(query_url("https://host/arcgis/rest/services/X/MapServer/", 4), "https://host/arcgis/rest/services/X/MapServer/4/query");
    }

    #[test]
    fn page_error_object_is_a_failure() {
        let page = json!({ "error": { "code": 500, "message": "Unable to complete operation." } });
        assert!(parse_page(&page, "key", 1000).is_err());
    }

    #[test]
    fn page_keys_fall_back_to_global_position() {
        let page = json!({
            "type": "FeatureCollection",
            "features": [
                { "type": "Feature", "properties": { "key": "G1" }, "geometry": null },
                { "type": "Feature", "properties": {}, "geometry": null },
            ]
        });
        let features = parse_page(&page, "key", 2000).unwrap();
        assert_eq!(features[0].key, "G1");
        assert_eq!(features[1].key, "2001");
    }
}
