use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser)]
#[command(version = "0.1.0")]
#[command(
    about = "Batch tool that funds mainnet wallets through CEX withdrawals and the Relay bridge"
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Process every remaining wallet through the funding pipeline
    Start {
        /// Path to config.yaml file
        #[arg(short, long, default_value = "config.yaml")]
        config: PathBuf,
    },

    /// Generate a sample config file
    GenerateConfig {
        /// Path to output config file
        #[arg(short, long, default_value = "config.yaml")]
        output: PathBuf,
    },
}

pub fn parse_args() -> Cli {
    Cli::parse()
}
