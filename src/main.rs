use anyhow::Result;
use clap::Parser;
use tracing_subscriber::EnvFilter;

use landshift::cli::{Cli, Commands};
use landshift::commands::{compare, compile, diff, join};
#[cfg(feature = "download")]
use landshift::commands::download;

fn init_tracing(verbose: u8) {
    let default = match verbose {
        0 => "info",
        1 => "debug",
        _ => "trace",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    match &cli.command {
        Commands::Compile(args) => compile::run(&cli, args),
        Commands::Compare(args) => compare::run(&cli, args),
        Commands::Join(args) => join::run(&cli, args),
        Commands::Diff(args) => diff::run(&cli, args),
        #[cfg(feature = "download")]
        Commands::Download(args) => download::run(&cli, args),
    }
}
