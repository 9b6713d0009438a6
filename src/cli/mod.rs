//! CLI definitions.

pub mod commands;

use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "scalp")]
#[command(author, version, about = "Tick-driven options scalping engine")]
pub struct Cli {
    /// Configuration file path
    #[arg(short, long, default_value = "config/default.toml")]
    pub config: PathBuf,

    /// Log level
    #[arg(short, long, default_value = "info")]
    pub log_level: LogLevel,

    /// Enable JSON log format
    #[arg(long)]
    pub json_logs: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Clone, ValueEnum)]
pub enum LogLevel {
    Trace,
    Debug,
    Info,
    Warn,
    Error,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Start live trading against the broker
    Live(LiveArgs),
    /// Start paper trading (fills simulated against the live feed)
    Paper,
    /// Validate configuration
    ValidateConfig,
}

#[derive(clap::Args)]
pub struct LiveArgs {
    /// Log orders instead of sending them to the broker
    #[arg(long)]
    pub dry_run: bool,
}
