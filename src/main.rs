//! updates-for - keep live regions of an HTML document in sync.

use anyhow::Result;
use clap::{ColorChoice, Parser};
use updates_for::cli::{self, Cli, Commands};
use updates_for::config::LiveConfig;
use updates_for::logger;

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Set global color override based on CLI option
    match cli.color {
        ColorChoice::Always => owo_colors::set_override(true),
        ColorChoice::Never => owo_colors::set_override(false),
        ColorChoice::Auto => {} // owo-colors auto-detects TTY
    }

    let mut config = LiveConfig::load(&cli.config)?;
    cli.apply_to(&mut config);
    logger::set_verbose(config.log.verbose);

    match &cli.command {
        Commands::Mirror { document, .. } => cli::mirror::run(&config, document),
        Commands::Regions { document, .. } => cli::regions::run(&config, document),
    }
}
