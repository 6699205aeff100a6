//! CLI definitions for viewpump.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

/// viewpump CLI.
#[derive(Parser)]
#[command(name = "viewpump")]
#[command(about = "Drive an embedded web view from the command line")]
#[command(version)]
pub(crate) struct Cli {
    /// Configuration file path (default: ~/.viewpump/config.toml)
    #[arg(short, long, global = true, env = "VIEWPUMP_CONFIG")]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub(crate) enum Commands {
    /// Load a page and extract artifacts from it
    Load(LoadArgs),

    /// Configuration commands
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(Args)]
pub(crate) struct LoadArgs {
    /// URI to load
    pub uri: String,

    /// Print the document HTML once it is interactive
    #[arg(long)]
    pub html: bool,

    /// Save a PNG capture once the page has loaded
    #[arg(long, value_name = "FILE")]
    pub png: Option<PathBuf>,

    /// Print the page to a PDF file once it has loaded
    #[arg(long, value_name = "FILE")]
    pub pdf: Option<PathBuf>,

    /// Print the PDF in landscape orientation
    #[arg(long, requires = "pdf")]
    pub landscape: bool,

    /// Request policy: all, none, same-origin or a regular expression
    #[arg(long, value_name = "MODE")]
    pub allow: Option<String>,

    /// Cookie to set before loading (repeatable)
    #[arg(long = "cookie", value_name = "COOKIE")]
    pub cookies: Vec<String>,

    /// User stylesheet applied to the document
    #[arg(long, value_name = "FILE")]
    pub stylesheet: Option<PathBuf>,

    /// User agent sent with requests
    #[arg(long)]
    pub user_agent: Option<String>,

    /// Script to run after loading; its result is printed as JSON (repeatable)
    #[arg(long = "run", value_name = "SCRIPT")]
    pub scripts: Vec<String>,

    /// X display index, overrides the configuration
    #[arg(long)]
    pub display: Option<u32>,
}

#[derive(Subcommand)]
pub(crate) enum ConfigAction {
    /// Validate the configuration file
    Check,

    /// Print the effective configuration
    Show,
}
