use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result, anyhow};
use async_trait::async_trait;
use ethers::middleware::SignerMiddleware;
use ethers::providers::{Http, Middleware, Provider};
use ethers::signers::{LocalWallet, Signer};
use ethers::types::{Address, Bytes, TransactionRequest, U256};
use reqwest::Url;
use serde::Deserialize;

use crate::chains::Chain;
use crate::error::PipelineResult;

const RPC_POLL_INTERVAL: Duration = Duration::from_secs(2);

/// Transaction fields handed back by the bridge aggregator, ready to be
/// signed and submitted as-is.
#[derive(Debug, Clone, Deserialize)]
pub struct TxPayload {
    pub to: String,
    pub data: Option<String>,
    pub value: Option<String>,
}

/// Read/submit access to one chain on behalf of one wallet.
#[async_trait]
pub trait ChainAccessor: Send + Sync {
    fn address(&self) -> Address;
    async fn balance(&self, address: Address) -> PipelineResult<U256>;
    async fn network_id(&self) -> PipelineResult<u64>;
    /// Submits the payload and waits for one confirmation.
    async fn send_transaction(&self, payload: &TxPayload) -> PipelineResult<String>;
}

/// Current gas price on the reference chain, in gwei.
#[async_trait]
pub trait GasPriceSource: Send + Sync {
    async fn gas_price_gwei(&self) -> PipelineResult<f64>;
}

/// Builds per-wallet chain access (signer plus optional proxy transport).
pub trait ChainConnector: Send + Sync {
    fn connect(
        &self,
        chain: Chain,
        private_key: &str,
        proxy: Option<&str>,
    ) -> PipelineResult<Arc<dyn ChainAccessor>>;
}

/// Derives the wallet address without touching any RPC endpoint.
pub fn address_from_private_key(private_key: &str) -> Result<Address> {
    let wallet: LocalWallet = private_key
        .trim_start_matches("0x")
        .parse()
        .context("invalid private key")?;
    Ok(wallet.address())
}

/// Accepts both decimal and 0x-prefixed hex wei strings; the aggregator
/// uses decimal but tx payload values occasionally come back as hex.
pub(crate) fn parse_wei(value: &str) -> Result<U256> {
    if let Some(hex) = value.strip_prefix("0x") {
        U256::from_str_radix(hex, 16).context("invalid hex wei value")
    } else {
        U256::from_dec_str(value).context("invalid decimal wei value")
    }
}

pub struct EvmChain {
    client: SignerMiddleware<Provider<Http>, LocalWallet>,
    address: Address,
}

impl EvmChain {
    pub fn connect(chain: Chain, private_key: &str, proxy: Option<&str>) -> Result<Self> {
        let url = Url::parse(chain.rpc_url()).context("invalid RPC url")?;
        let transport = match proxy {
            Some(proxy) => {
                let http_client = reqwest::Client::builder()
                    .proxy(reqwest::Proxy::all(proxy).context("invalid proxy url")?)
                    .build()
                    .context("failed to build proxied HTTP client")?;
                Http::new_with_client(url, http_client)
            }
            None => Http::new(url),
        };
        let provider = Provider::new(transport).interval(RPC_POLL_INTERVAL);

        let wallet: LocalWallet = private_key
            .trim_start_matches("0x")
            .parse()
            .context("invalid private key")?;
        let wallet = wallet.with_chain_id(chain.id());
        let address = wallet.address();

        Ok(Self {
            client: SignerMiddleware::new(provider, wallet),
            address,
        })
    }
}

#[async_trait]
impl ChainAccessor for EvmChain {
    fn address(&self) -> Address {
        self.address
    }

    async fn balance(&self, address: Address) -> PipelineResult<U256> {
        let balance = self
            .client
            .get_balance(address, None)
            .await
            .context("failed to fetch balance")?;
        Ok(balance)
    }

    async fn network_id(&self) -> PipelineResult<u64> {
        let id = self
            .client
            .get_chainid()
            .await
            .context("failed to fetch network id")?;
        Ok(id.as_u64())
    }

    async fn send_transaction(&self, payload: &TxPayload) -> PipelineResult<String> {
        let to: Address = payload
            .to
            .parse()
            .context("invalid target address in payload")?;
        let mut tx = TransactionRequest::new().from(self.address).to(to);
        if let Some(data) = &payload.data {
            let calldata: Bytes = data.parse().context("invalid calldata in payload")?;
            tx = tx.data(calldata);
        }
        if let Some(value) = &payload.value {
            tx = tx.value(parse_wei(value)?);
        }

        let pending = self
            .client
            .send_transaction(tx, None)
            .await
            .context("failed to send transaction")?;
        let receipt = pending
            .await
            .context("failed while waiting for confirmation")?
            .ok_or_else(|| anyhow!("transaction dropped from the mempool"))?;
        Ok(format!("{:#x}", receipt.transaction_hash))
    }
}

pub struct EvmConnector;

impl ChainConnector for EvmConnector {
    fn connect(
        &self,
        chain: Chain,
        private_key: &str,
        proxy: Option<&str>,
    ) -> PipelineResult<Arc<dyn ChainAccessor>> {
        let chain_client = EvmChain::connect(chain, private_key, proxy)?;
        Ok(Arc::new(chain_client))
    }
}

/// Proxy-less mainnet provider used only for gas price checks.
pub struct MainnetGasOracle {
    provider: Provider<Http>,
}

impl MainnetGasOracle {
    pub fn new() -> Result<Self> {
        let provider = Provider::<Http>::try_from(Chain::Ethereum.rpc_url())
            .context("invalid mainnet RPC url")?;
        Ok(Self { provider })
    }
}

#[async_trait]
impl GasPriceSource for MainnetGasOracle {
    async fn gas_price_gwei(&self) -> PipelineResult<f64> {
        let wei = self
            .provider
            .get_gas_price()
            .await
            .context("failed to fetch gas price")?;
        let gwei = ethers::utils::format_units(wei, "gwei")
            .context("gas price conversion")?
            .parse::<f64>()
            .context("gas price conversion")?;
        Ok(gwei)
    }
}
