//! Remote acquisition of feature layers over HTTP.

mod arcgis;

use std::{thread, time::Duration};

use anyhow::{anyhow, Context, Result};
use reqwest::{blocking::Client, redirect::Policy};
use serde_json::Value;
use tracing::warn;

pub use arcgis::{batch_offsets, download_layer, DownloadOptions, DownloadReport};

/// Build the blocking client shared by every request of one download.
fn http_client(timeout: Duration, accept_invalid_certs: bool) -> Result<Client> {
    Client::builder()
        .user_agent(concat!("landshift/", env!("CARGO_PKG_VERSION")))
        .redirect(Policy::limited(10))
        .timeout(timeout)
        .danger_accept_invalid_certs(accept_invalid_certs)
        .build()
        .context("[download] Failed to build HTTP client")
}

/// GET `url` with query `params` and decode the JSON body.
fn get_json(client: &Client, url: &str, params: &[(&str, String)]) -> Result<Value> {
    let bytes = client.get(url)
        .query(params)
        .send()
        .with_context(|| format!("GET {url}"))?
        .error_for_status()
        .with_context(|| format!("GET {url} returned error status"))?
        .bytes()
        .with_context(|| format!("GET {url}: failed to read body"))?;

    serde_json::from_slice(&bytes).with_context(|| format!("GET {url}: response is not JSON"))
}

/// Run `attempt` up to `retries` times, sleeping `backoff * n` after the n-th failure.
fn with_retries<T>(retries: u32, backoff: Duration, what: &str, mut attempt: impl FnMut() -> Result<T>) -> Result<T> {
    let retries = retries.max(1);
    let mut last = None;

    for n in 1..=retries {
        match attempt() {
            Ok(value) => return Ok(value),
            Err(e) => {
                warn!(attempt = n, retries, error = %e, "{what} failed");
                last = Some(e);
                if n < retries { thread::sleep(backoff * n) }
            }
        }
    }

    Err(last.unwrap_or_else(|| anyhow!("{what}: no attempts made")))
}
