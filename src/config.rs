use std::fs::File;
use std::path::Path;

use anyhow::{Context, Result, bail};
use serde::Deserialize;

use crate::chains::Chain;
use crate::gas::GasRampConfig;

#[derive(Debug, Deserialize)]
pub struct Config {
    pub exchange: ExchangeAuth,
    pub telegram: TelegramConfig,
    #[serde(default)]
    pub withdraw_amounts: AmountRange,
    #[serde(default)]
    pub bridge_share: BridgeShareConfig,
    #[serde(default = "default_topup_chains")]
    pub topup_chains: Vec<Chain>,
    #[serde(default)]
    pub gas_prices: GasRampConfig,
    #[serde(default)]
    pub delays: DelaysConfig,
    #[serde(default = "default_true")]
    pub shuffle_wallets: bool,
    #[serde(default)]
    pub wait_for_gas_for_topup: bool,
    pub max_relayer_fee_eth: f64,
    #[serde(default = "default_balance_deadline")]
    pub balance_change_deadline_sec: u64,
    #[serde(default)]
    pub show_debug_log: bool,
    #[serde(default = "default_wallets_file")]
    pub wallets_file: String,
}

#[derive(Debug, Deserialize)]
pub struct ExchangeAuth {
    pub api_key: String,
    pub api_secret: String,
}

#[derive(Debug, Deserialize)]
pub struct TelegramConfig {
    pub bot_token: String,
    pub chat_ids: Vec<String>,
}

/// ETH amount drawn per wallet, with a randomized decimal precision.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct AmountRange {
    pub min_amount: f64,
    pub max_amount: f64,
    pub min_decimals: u32,
    pub max_decimals: u32,
}

impl Default for AmountRange {
    fn default() -> Self {
        Self {
            min_amount: 0.005,
            max_amount: 0.01,
            min_decimals: 4,
            max_decimals: 7,
        }
    }
}

/// Fraction of the withdrawn amount that gets bridged onward.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct BridgeShareConfig {
    pub min: f64,
    pub max: f64,
    pub min_decimals: u32,
    pub max_decimals: u32,
}

impl Default for BridgeShareConfig {
    fn default() -> Self {
        Self {
            min: 0.90,
            max: 0.93,
            min_decimals: 2,
            max_decimals: 5,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct DelaysConfig {
    pub min_after_withdraw_sec: u64,
    pub max_after_withdraw_sec: u64,
    pub min_between_wallets_sec: u64,
    pub max_between_wallets_sec: u64,
}

impl Default for DelaysConfig {
    fn default() -> Self {
        Self {
            min_after_withdraw_sec: 60,
            max_after_withdraw_sec: 300,
            min_between_wallets_sec: 60,
            max_between_wallets_sec: 300,
        }
    }
}

fn default_topup_chains() -> Vec<Chain> {
    vec![Chain::Optimism, Chain::Arbitrum, Chain::Zksync, Chain::Base]
}

fn default_true() -> bool {
    true
}

fn default_balance_deadline() -> u64 {
    600
}

fn default_wallets_file() -> String {
    "walletsData.txt".to_string()
}

impl Config {
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let file = File::open(path).context("Failed to open config file")?;
        let config: Config =
            serde_yaml::from_reader(file).context("Failed to parse config file")?;
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<()> {
        if self.topup_chains.is_empty() {
            bail!("topup_chains must list at least one chain");
        }
        if self.withdraw_amounts.min_amount > self.withdraw_amounts.max_amount {
            bail!("withdraw_amounts: min_amount exceeds max_amount");
        }
        if self.withdraw_amounts.min_decimals > self.withdraw_amounts.max_decimals {
            bail!("withdraw_amounts: min_decimals exceeds max_decimals");
        }
        if self.bridge_share.min > self.bridge_share.max {
            bail!("bridge_share: min exceeds max");
        }
        if self.max_relayer_fee_eth <= 0.0 {
            bail!("max_relayer_fee_eth must be positive");
        }
        if self.delays.min_after_withdraw_sec > self.delays.max_after_withdraw_sec
            || self.delays.min_between_wallets_sec > self.delays.max_between_wallets_sec
        {
            bail!("delays: a minimum exceeds its maximum");
        }
        if self.gas_prices.min_poll_sec > self.gas_prices.max_poll_sec {
            bail!("gas_prices: min_poll_sec exceeds max_poll_sec");
        }
        Ok(())
    }
}

pub const SAMPLE_CONFIG: &str = r#"# Exchange API credentials (spot account with withdrawals enabled)
exchange:
  api_key: "YOUR_BINANCE_API_KEY"
  api_secret: "YOUR_BINANCE_API_SECRET"

# Telegram bot token and recipients ("chatId" or "chatId/threadId")
telegram:
  bot_token: "YOUR_BOT_TOKEN"
  chat_ids:
    - "123456789"

# ETH amount withdrawn from the exchange per wallet
withdraw_amounts:
  min_amount: 0.005
  max_amount: 0.01
  min_decimals: 4
  max_decimals: 7

# Fraction of the withdrawn amount that gets bridged to mainnet
bridge_share:
  min: 0.90
  max: 0.93
  min_decimals: 2
  max_decimals: 5

# Candidate origin chains for the exchange withdrawal
topup_chains:
  - optimism   # min 0.002 ETH
  - arbitrum   # min 0.0008 ETH
  - zksync     # min 0.02 ETH
  - base       # min 0.001 ETH

# Mainnet gas ceiling ramp
gas_prices:
  start_gwei: 5
  step_gwei: 1
  ramp_minutes: 2
  max_gwei: 10

delays:
  min_after_withdraw_sec: 60
  max_after_withdraw_sec: 300
  min_between_wallets_sec: 60
  max_between_wallets_sec: 300

shuffle_wallets: true
wait_for_gas_for_topup: false
max_relayer_fee_eth: 0.00031
balance_change_deadline_sec: 600
show_debug_log: false

# One wallet per line: name|privateKey|proxy (proxy optional)
wallets_file: "walletsData.txt"
"#;
