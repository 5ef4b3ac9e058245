// https://relay.link/

use std::time::Duration;

use anyhow::{Context, anyhow};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::chain::{ChainAccessor, TxPayload, parse_wei};
use crate::chains::Chain;
use crate::error::{PipelineError, PipelineResult};
use crate::random;

/// Receiver contract the aggregator is expected to route through; quotes
/// pointing anywhere else are refused.
pub const RELAY_ADDRESS: &str = "0xf70da97812cb96acdf810712aa562db8dfa3dbef";
const API_URL: &str = "https://api.relay.link/execute/bridge";
const HTTP_TIMEOUT: Duration = Duration::from_secs(5);

/// Bounded retry with a uniform random pause between attempts. Only
/// transport-level quote failures are retried; validation refusals
/// surface immediately.
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub min_backoff_sec: u64,
    pub max_backoff_sec: u64,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 5,
            min_backoff_sec: 1,
            max_backoff_sec: 5,
        }
    }
}

/// Cross-chain transfer through the third-party aggregator.
#[async_trait]
pub trait BridgeAccessor: Send + Sync {
    /// Bridges `amount_eth` from `origin` to `destination` for the chain
    /// accessor's own wallet (recipient equals sender) and returns the
    /// submitted transaction hash.
    async fn bridge_eth(
        &self,
        chain: &dyn ChainAccessor,
        origin: Chain,
        destination: Chain,
        amount_eth: f64,
        max_relayer_fee_eth: f64,
        proxy: Option<&str>,
    ) -> PipelineResult<String>;
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct QuoteRequest<'a> {
    user: String,
    origin_chain_id: u64,
    destination_chain_id: u64,
    currency: &'a str,
    recipient: String,
    amount: String,
    use_permit: bool,
    use_external_liquidity: bool,
    source: &'a str,
}

#[derive(Debug, Deserialize)]
pub struct BridgeQuote {
    steps: Vec<QuoteStep>,
    fees: QuoteFees,
}

#[derive(Debug, Deserialize)]
struct QuoteStep {
    items: Vec<QuoteItem>,
}

#[derive(Debug, Deserialize)]
struct QuoteItem {
    data: TxPayload,
    check: Option<StatusCheck>,
}

#[derive(Debug, Deserialize)]
struct StatusCheck {
    endpoint: String,
}

#[derive(Debug, Deserialize)]
struct QuoteFees {
    relayer: String,
}

fn extract_payload(quote: &BridgeQuote) -> PipelineResult<(&TxPayload, Option<&str>)> {
    let item = quote
        .steps
        .first()
        .and_then(|step| step.items.first())
        .ok_or_else(|| anyhow!("bridge quote carries no execution steps"))?;
    Ok((&item.data, item.check.as_ref().map(|c| c.endpoint.as_str())))
}

fn validate_target(payload: &TxPayload) -> PipelineResult<()> {
    if !payload.to.eq_ignore_ascii_case(RELAY_ADDRESS) {
        return Err(PipelineError::UnexpectedTarget(payload.to.clone()));
    }
    Ok(())
}

fn validate_fee(relayer_fee_wei: &str, limit_eth: f64) -> PipelineResult<f64> {
    let fee_eth = ethers::utils::format_units(parse_wei(relayer_fee_wei)?, "ether")
        .context("relayer fee conversion")?
        .parse::<f64>()
        .context("relayer fee conversion")?;
    if fee_eth > limit_eth {
        return Err(PipelineError::FeeTooHigh { fee_eth, limit_eth });
    }
    Ok(fee_eth)
}

pub struct RelayBridge {
    api_url: String,
    policy: RetryPolicy,
}

impl RelayBridge {
    pub fn new() -> Self {
        Self {
            api_url: API_URL.to_string(),
            policy: RetryPolicy::default(),
        }
    }

    #[cfg(test)]
    fn with_endpoint(api_url: String, policy: RetryPolicy) -> Self {
        Self { api_url, policy }
    }

    fn http_client(proxy: Option<&str>) -> anyhow::Result<reqwest::Client> {
        let mut builder = reqwest::Client::builder().timeout(HTTP_TIMEOUT);
        if let Some(proxy) = proxy {
            builder = builder.proxy(reqwest::Proxy::all(proxy).context("invalid proxy url")?);
        }
        builder.build().context("failed to build bridge HTTP client")
    }

    async fn fetch_quote_once(
        &self,
        client: &reqwest::Client,
        request: &QuoteRequest<'_>,
    ) -> anyhow::Result<BridgeQuote> {
        let response = client
            .post(&self.api_url)
            .json(request)
            .send()
            .await
            .context("bridge quote request failed")?;
        if !response.status().is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(anyhow!("Failed to get tx details from Relay API: {body}"));
        }
        response
            .json::<BridgeQuote>()
            .await
            .context("malformed bridge quote response")
    }

    async fn fetch_quote(
        &self,
        client: &reqwest::Client,
        request: &QuoteRequest<'_>,
    ) -> PipelineResult<BridgeQuote> {
        for _ in 0..self.policy.max_attempts {
            match self.fetch_quote_once(client, request).await {
                Ok(quote) => return Ok(quote),
                Err(e) => {
                    debug!("bridge quote attempt failed: {e:#}");
                    let pause =
                        random::rand_int(self.policy.min_backoff_sec, self.policy.max_backoff_sec);
                    tokio::time::sleep(Duration::from_secs(pause)).await;
                }
            }
        }
        Err(PipelineError::BridgeUnavailable {
            attempts: self.policy.max_attempts,
        })
    }
}

#[async_trait]
impl BridgeAccessor for RelayBridge {
    async fn bridge_eth(
        &self,
        chain: &dyn ChainAccessor,
        origin: Chain,
        destination: Chain,
        amount_eth: f64,
        max_relayer_fee_eth: f64,
        proxy: Option<&str>,
    ) -> PipelineResult<String> {
        debug!("performing relay of {amount_eth} ETH: {origin} -> {destination}");
        let amount_wei =
            ethers::utils::parse_ether(amount_eth.to_string()).context("invalid bridge amount")?;

        // safety check: the signer must actually sit on the origin chain
        let provider_chain_id = chain.network_id().await?;
        if provider_chain_id != origin.id() {
            return Err(PipelineError::NetworkMismatch {
                expected: origin.id(),
                actual: provider_chain_id,
            });
        }

        let user = format!("{:#x}", chain.address());
        let request = QuoteRequest {
            user: user.clone(),
            origin_chain_id: origin.id(),
            destination_chain_id: destination.id(),
            currency: "eth",
            // self-bridge: funds land on the same wallet across chains
            recipient: user,
            amount: amount_wei.to_string(),
            use_permit: false,
            use_external_liquidity: false,
            source: "relay.link",
        };

        let client = Self::http_client(proxy)?;
        let quote = self.fetch_quote(&client, &request).await?;

        let (payload, status_endpoint) = extract_payload(&quote)?;
        if let Some(endpoint) = status_endpoint {
            debug!("bridge status endpoint: {endpoint}");
        }

        validate_target(payload)?;
        let fee_eth = validate_fee(&quote.fees.relayer, max_relayer_fee_eth)?;
        debug!("relayer fee: {fee_eth} ETH (limit {max_relayer_fee_eth} ETH)");

        chain.send_transaction(payload).await
    }
}
