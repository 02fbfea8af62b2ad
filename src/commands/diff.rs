use anyhow::{bail, Result};

use crate::cli::{Cli, DiffArgs};
use crate::io::{ensure_dir_exists, write_raw_layer};
use crate::layer::{diff_snapshots, RawLayer};

use super::{load_config, read_in_work_crs};

fn rekey_all(layer: &mut RawLayer, parts: &[&str], separator: &str) -> usize {
    layer.features.iter_mut()
        .map(|feature| feature.rekey(parts, separator))
        .filter(|rekeyed| !rekeyed)
        .count()
}

pub fn run(cli: &Cli, args: &DiffArgs) -> Result<()> {
    if args.format.contains(['/', '\\']) { bail!("--format must be a file extension, got {}", args.format) }
    let config = load_config(cli)?;

    let mut current = read_in_work_crs(&args.current, &args.crs, &config)?;
    let mut previous = read_in_work_crs(&args.previous, &args.crs, &config)?;

    if !args.key_parts.is_empty() {
        let parts = args.key_parts.iter().map(String::as_str).collect::<Vec<_>>();
        let missing = rekey_all(&mut current, &parts, &args.separator)
            + rekey_all(&mut previous, &parts, &args.separator);
        if missing > 0 {
            tracing::warn!(missing, "features missing a key part kept their original key");
        }
    }

    let diff = diff_snapshots(&current.features, &previous.features);

    ensure_dir_exists(&args.out_dir)?;
    let added = args.out_dir.join(format!("added.{}", args.format));
    let deleted = args.out_dir.join(format!("deleted.{}", args.format));
    let added_count = diff.added.len();
    let deleted_count = diff.deleted.len();

    write_raw_layer(&RawLayer::new(current.crs, diff.added), &added, &config.fields.key, args.force)?;
    write_raw_layer(&RawLayer::new(previous.crs, diff.deleted), &deleted, &config.fields.key, args.force)?;

    println!("{added_count} added, {deleted_count} deleted -> {}", args.out_dir.display());
    Ok(())
}
