//! Command-line interface definitions.

use clap::{ColorChoice, Parser, Subcommand};
use std::path::PathBuf;

use crate::config::LiveConfig;

/// Keep `updates-for` live regions of an HTML document in sync with the server
#[derive(Parser, Debug, Clone)]
#[command(version, about, long_about = None, arg_required_else_help = true)]
pub struct Cli {
    /// Control colored output (auto, always, never)
    #[arg(long, global = true, default_value = "auto")]
    pub color: ColorChoice,

    /// Config file path (default: updates-for.toml)
    #[arg(short = 'C', long, default_value = "updates-for.toml", value_hint = clap::ValueHint::FilePath)]
    pub config: PathBuf,

    /// Print pass lifecycle details
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// subcommands
    #[command(subcommand)]
    pub command: Commands,
}

/// Available subcommands
#[derive(Subcommand, Debug, Clone)]
pub enum Commands {
    /// Mirror a document: patch its regions on every notification and write it back
    #[command(visible_alias = "m")]
    Mirror {
        /// HTML document to keep in sync
        #[arg(value_hint = clap::ValueHint::FilePath)]
        document: PathBuf,

        /// Location the document was served from (overrides [fetch].location)
        #[arg(short, long)]
        location: Option<String>,

        /// Action Cable endpoint (overrides [cable].url)
        #[arg(long)]
        cable: Option<String>,
    },

    /// List the live regions declared in a document
    #[command(visible_alias = "r")]
    Regions {
        /// HTML document to inspect
        #[arg(value_hint = clap::ValueHint::FilePath)]
        document: PathBuf,

        /// Location used to resolve regions without `url`
        #[arg(short, long)]
        location: Option<String>,
    },
}

impl Cli {
    /// Apply command-line overrides on top of file configuration.
    pub fn apply_to(&self, config: &mut LiveConfig) {
        if self.verbose {
            config.log.verbose = true;
        }
        match &self.command {
            Commands::Mirror {
                location, cable, ..
            } => {
                if let Some(location) = location {
                    config.fetch.location = Some(location.clone());
                }
                if let Some(cable) = cable {
                    config.cable.url = Some(cable.clone());
                }
            }
            Commands::Regions { location, .. } => {
                if let Some(location) = location {
                    config.fetch.location = Some(location.clone());
                }
            }
        }
    }
}
