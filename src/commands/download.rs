use anyhow::{bail, Result};

use crate::cli::{Cli, DownloadArgs};
use crate::download::{download_layer, DownloadOptions};
use crate::io::write_raw_layer;

use super::load_config;

pub fn run(cli: &Cli, args: &DownloadArgs) -> Result<()> {
    let config = load_config(cli)?;
    let options = DownloadOptions {
        batch_size: args.batch_size,
        out_sr: config.work_crs,
        retries: args.retries,
        accept_invalid_certs: args.insecure,
        ..DownloadOptions::default()
    };

    let report = download_layer(&args.url, args.layer_id, &options, &config.fields.key)?;
    if !report.is_complete() {
        if args.strict {
            bail!("[download] {} pages failed at offsets {:?}", report.failed_offsets.len(), report.failed_offsets);
        }
        eprintln!("warning: pages at offsets {:?} are missing from the output", report.failed_offsets);
    }

    write_raw_layer(&report.layer, &args.output, &config.fields.key, args.force)?;
    println!("Downloaded {}/{} features -> {}", report.layer.len(), report.total, args.output.display());
    Ok(())
}
