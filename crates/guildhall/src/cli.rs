//! Command-line interface for the `guildhall` binary.

use clap::Parser;
use std::path::PathBuf;

/// Run the Guildhall gatekeeper with its monitoring API.
#[derive(Debug, Parser)]
#[command(name = "guildhall", version, about)]
pub struct Cli {
    /// Load configuration from this file instead of the default search path
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Override `server.bind_addr`
    #[arg(short, long)]
    pub bind: Option<String>,
}
