//! Options scalping CLI application.

mod cli;

use anyhow::{Context, Result};
use clap::Parser;
use cli::{Cli, Commands};
use scalp_config::load_config;
use scalp_monitor::setup_logging;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let log_level = match cli.log_level {
        cli::LogLevel::Trace => "trace",
        cli::LogLevel::Debug => "debug",
        cli::LogLevel::Info => "info",
        cli::LogLevel::Warn => "warn",
        cli::LogLevel::Error => "error",
    };

    match cli.command {
        Commands::Live(args) => {
            let config = load_config(&cli.config)
                .with_context(|| format!("loading configuration from {}", cli.config.display()))?;
            let json = cli.json_logs || config.logging.format.eq_ignore_ascii_case("json");
            let _guard = setup_logging(log_level, json, config.logging.audit_dir.as_deref());
            cli::commands::live::run(args, config).await
        }
        Commands::Paper => {
            let config = load_config(&cli.config)
                .with_context(|| format!("loading configuration from {}", cli.config.display()))?;
            let json = cli.json_logs || config.logging.format.eq_ignore_ascii_case("json");
            let _guard = setup_logging(log_level, json, config.logging.audit_dir.as_deref());
            cli::commands::paper::run(config).await
        }
        Commands::ValidateConfig => {
            let _guard = setup_logging(log_level, cli.json_logs, None);
            cli::commands::validate::run(&cli.config).await
        }
    }
}
