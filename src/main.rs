mod bridge;
mod chain;
mod chains;
mod cli;
mod config;
mod error;
mod exchange;
mod gas;
mod notify;
mod pipeline;
mod poller;
mod queue;
mod random;
mod types;

use std::fs::File;
use std::io::Write;
use std::sync::Arc;

use anyhow::{Context, Result};
use cli::{Commands, parse_args};
use config::Config;
use tracing::info;
use tracing_subscriber::fmt::time::ChronoLocal;

use crate::bridge::RelayBridge;
use crate::chain::{EvmConnector, MainnetGasOracle};
use crate::exchange::BinanceExchange;
use crate::notify::TelegramNotifier;
use crate::pipeline::{Collaborators, Pipeline};

fn init_logging(debug: bool) {
    let level = if debug {
        tracing::Level::DEBUG
    } else {
        tracing::Level::INFO
    };
    tracing_subscriber::fmt()
        .with_max_level(level)
        .with_timer(ChronoLocal::new("%d-%m-%Y %H:%M:%S".to_owned()))
        .init();
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = parse_args();

    match cli.command {
        Commands::Start {
            config: config_path,
        } => {
            let config = Config::load(&config_path)
                .context(format!("Failed to load config from {config_path:?}"))?;
            init_logging(config.show_debug_log);
            info!("Configuration loaded successfully");

            let deps = Collaborators {
                exchange: Arc::new(BinanceExchange::new(
                    config.exchange.api_key.clone(),
                    config.exchange.api_secret.clone(),
                )?),
                notifier: Arc::new(TelegramNotifier::new(
                    &config.telegram.bot_token,
                    config.telegram.chat_ids.clone(),
                )?),
                connector: Arc::new(EvmConnector),
                gas_source: Arc::new(MainnetGasOracle::new()?),
                bridge: Arc::new(RelayBridge::new()),
            };

            Pipeline::new(config, deps).run().await?;
        }

        Commands::GenerateConfig { output } => {
            init_logging(false);
            let mut file = File::create(&output)
                .context(format!("Failed to create config file at {output:?}"))?;
            file.write_all(config::SAMPLE_CONFIG.as_bytes())?;

            info!("Sample configuration file generated at {output:?}");
            info!(
                "Please edit the file with your actual configuration before starting the batch."
            );
        }
    }

    Ok(())
}
