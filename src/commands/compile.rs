use anyhow::Result;

use crate::cli::{Cli, CompileArgs};
use crate::compile::compile;
use crate::io::write_layer;

use super::{load_config, read_in_work_crs, report_dropped};

pub fn run(cli: &Cli, args: &CompileArgs) -> Result<()> {
    let mut config = load_config(cli)?;
    if let Some(field) = &args.precedence_field { config.compilation.precedence_field = field.clone() }
    if args.oldest_first { config.compilation.newest_first = false }

    let raw = read_in_work_crs(&args.input, &args.crs, &config)?;
    let compiled = compile(raw, &config.compilation)?;
    report_dropped(&args.input, &compiled.dropped);

    write_layer(&compiled.layer, &args.output, &config.fields.key, args.force)?;
    println!("Compiled {} features -> {}", compiled.layer.len(), args.output.display());
    Ok(())
}
