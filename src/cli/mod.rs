//! CLI interface for riskguard
//!
//! Provides subcommands for:
//! - `run`: Replay a recorded feed of signals, candles, and prices
//! - `report`: Rebuild the ledger from the journal and print a risk report
//! - `config`: Show the effective configuration

mod report;
mod run;

pub use report::ReportArgs;
pub use run::RunArgs;

use clap::{Parser, Subcommand};

#[derive(Parser, Debug)]
#[command(name = "riskguard")]
#[command(about = "Risk and position management core for autonomous trading")]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Path to configuration file
    #[arg(short, long, default_value = "config.toml")]
    pub config: String,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Replay a recorded feed through the engine
    Run(RunArgs),
    /// Rebuild state from the journal and print a risk report
    Report(ReportArgs),
    /// Show the effective configuration
    Config,
}
