//! Validate configuration command.

use anyhow::{anyhow, Result};
use scalp_config::load_config;
use std::path::Path;

pub async fn run(config_path: &Path) -> Result<()> {
    println!("Validating configuration: {:?}", config_path);

    match load_config(config_path) {
        Ok(config) => {
            if let Err(e) = config.validate() {
                println!("Configuration error: {e}");
                return Err(anyhow!(e));
            }
            println!("Configuration is valid!");
            println!();
            println!("App: {}", config.app.name);
            println!("Environment: {}", config.app.environment);
            println!("Trading enabled: {}", config.trading.enabled);
            println!("Side mode: {:?}", config.trading.side_mode);
            println!("Slots per side: {}", config.trading.slots_per_side);
            println!("Session: {} - {}", config.session.start, config.session.end);
            println!("Order quantity: {}", config.quantity.order_qty());
            match config.risk.max_daily_loss {
                Some(limit) => println!("Max daily loss: {limit}"),
                None => println!("Max daily loss: unlimited"),
            }
            println!("Instruments: {}", config.instruments.len());
        }
        Err(e) => {
            println!("Configuration error: {}", e);
            return Err(e.into());
        }
    }

    Ok(())
}
