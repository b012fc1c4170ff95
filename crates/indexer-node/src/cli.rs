//! Command-line arguments.

use clap::Parser;
use std::path::PathBuf;

use crate::config::CONFIG_PATH_ENV;

/// Bloom-indexed event log query node
#[derive(Parser, Debug)]
#[command(name = "indexer-node", version)]
#[command(about = "Serves eth_getLogs from a bloom-indexed event log store")]
pub struct Args {
    /// TOML configuration file; defaults apply when omitted
    #[arg(short, long, env = CONFIG_PATH_ENV)]
    pub config: Option<PathBuf>,
}
