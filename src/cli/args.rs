//! CLI argument parsing using clap.

use clap::{
    Parser, Subcommand,
    builder::styling::{AnsiColor, Effects, Styles},
};
use std::path::PathBuf;

fn clap_cargo_style() -> Styles {
    Styles::styled()
        .header(AnsiColor::Cyan.on_default() | Effects::BOLD)
        .usage(AnsiColor::Cyan.on_default() | Effects::BOLD)
        .literal(AnsiColor::Green.on_default())
        .placeholder(AnsiColor::Green.on_default())
}

const AFTER_HELP: &str = "\
Quick Start:
  $ texbook init                         # Create .texbook/settings.toml
  $ texbook sources add thesis ./thesis  # Register a directory of .tex files
  $ texbook warm                         # Render everything not cached yet
  $ texbook serve                        # HTTP API + live re-rendering";

#[derive(Parser, Debug)]
#[command(
    name = "texbook",
    version,
    about = "Keep a rendered PDF cache of your LaTeX sources in sync",
    styles = clap_cargo_style(),
    after_help = AFTER_HELP
)]
pub struct Cli {
    /// Path to a settings file (defaults to .texbook/settings.toml)
    #[arg(short, long, global = true, env = "TEXBOOK_CONFIG")]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Set up .texbook directory with default settings
    Init {
        /// Overwrite an existing settings file
        #[arg(short, long)]
        force: bool,
    },

    /// Display active settings
    Config,

    /// Start the HTTP server and watch every registered source
    Serve {
        /// Address to listen on (overrides server.bind)
        #[arg(long)]
        bind: Option<String>,

        /// Serve without watching or warming up sources
        #[arg(long)]
        no_watch: bool,
    },

    /// Manage data sources
    Sources {
        #[command(subcommand)]
        action: SourceAction,
    },

    /// Render every source that has no cached artifact, then exit
    Warm {
        /// Only warm up this source
        #[arg(long)]
        source: Option<String>,

        /// Seconds to wait for queued renders before giving up
        #[arg(long, default_value_t = 600)]
        timeout: u64,
    },

    /// Print the fingerprint and artifact location for a source path
    Fingerprint {
        path: PathBuf,

        /// Namespace (data source id) when namespacing is enabled
        #[arg(long)]
        namespace: Option<String>,
    },
}

#[derive(Subcommand, Debug)]
pub enum SourceAction {
    /// List registered data sources
    List {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Register a local directory as a data source
    Add {
        /// Unique name for the source
        name: String,

        /// Directory containing the documents
        path: PathBuf,

        /// Data source type
        #[arg(long = "type", default_value = "local")]
        kind: String,
    },
}
