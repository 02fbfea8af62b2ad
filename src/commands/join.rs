use anyhow::Result;

use crate::cli::{Cli, JoinArgs};
use crate::io::write_layer;
use crate::join::attach_best_overlap_attribute;

use super::{load_config, read_sanitized};

pub fn run(cli: &Cli, args: &JoinArgs) -> Result<()> {
    let config = load_config(cli)?;

    let layer = read_sanitized(&args.layer, &args.crs, &config)?;
    let reference = read_sanitized(&args.reference, &args.crs, &config)?;

    let joined = attach_best_overlap_attribute(&layer, &reference, &args.attribute, &config.work_crs()?)?;
    write_layer(&joined, &args.output, &config.fields.key, args.force)?;

    println!("Joined `{}` onto {} features -> {}", args.attribute, joined.len(), args.output.display());
    Ok(())
}
