use std::time::{Duration, SystemTime, UNIX_EPOCH};

use anyhow::{Context, anyhow};
use async_trait::async_trait;
use hmac::{Hmac, Mac};
use serde::Deserialize;
use sha2::Sha256;
use tracing::debug;

use crate::chains::Chain;
use crate::error::{PipelineError, PipelineResult};

const API_URL: &str = "https://api.binance.com";
const HTTP_TIMEOUT: Duration = Duration::from_secs(10);

type HmacSha256 = Hmac<Sha256>;

/// Withdrawal access to the centralized exchange.
#[async_trait]
pub trait ExchangeAccessor: Send + Sync {
    async fn withdraw_fee(&self, coin: &str, chain: Chain) -> PipelineResult<f64>;

    /// Requests a withdrawal and returns the exchange-side withdrawal id.
    async fn withdraw(
        &self,
        address: &str,
        coin: &str,
        chain: Chain,
        amount: f64,
    ) -> PipelineResult<String>;
}

pub struct BinanceExchange {
    api_key: String,
    api_secret: String,
    http: reqwest::Client,
}

#[derive(Debug, Deserialize)]
struct CoinInfo {
    coin: String,
    #[serde(rename = "networkList")]
    network_list: Vec<NetworkInfo>,
}

#[derive(Debug, Deserialize)]
struct NetworkInfo {
    network: String,
    #[serde(rename = "withdrawFee")]
    withdraw_fee: String,
}

#[derive(Debug, Deserialize)]
struct WithdrawResponse {
    id: Option<String>,
}

impl BinanceExchange {
    pub fn new(api_key: String, api_secret: String) -> anyhow::Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(HTTP_TIMEOUT)
            .build()
            .context("failed to build exchange HTTP client")?;
        Ok(Self {
            api_key,
            api_secret,
            http,
        })
    }

    fn sign(&self, query: &str) -> anyhow::Result<String> {
        let mut mac = HmacSha256::new_from_slice(self.api_secret.as_bytes())
            .map_err(|_| anyhow!("invalid exchange API secret"))?;
        mac.update(query.as_bytes());
        Ok(hex::encode(mac.finalize().into_bytes()))
    }

    fn signed_query(&self, params: &str) -> anyhow::Result<String> {
        let timestamp = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .context("system clock before unix epoch")?
            .as_millis();
        let query = if params.is_empty() {
            format!("timestamp={timestamp}")
        } else {
            format!("{params}&timestamp={timestamp}")
        };
        let signature = self.sign(&query)?;
        Ok(format!("{query}&signature={signature}"))
    }
}

#[async_trait]
impl ExchangeAccessor for BinanceExchange {
    async fn withdraw_fee(&self, coin: &str, chain: Chain) -> PipelineResult<f64> {
        let query = self.signed_query("")?;
        let url = format!("{API_URL}/sapi/v1/capital/config/getall?{query}");
        let response = self
            .http
            .get(&url)
            .header("X-MBX-APIKEY", &self.api_key)
            .send()
            .await
            .context("exchange fee request failed")?;
        if !response.status().is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(anyhow!("exchange fee request rejected: {body}").into());
        }

        let coins: Vec<CoinInfo> = response
            .json()
            .await
            .context("malformed exchange fee response")?;
        let tag = chain.exchange_tag();
        let fee = coins
            .iter()
            .find(|c| c.coin == coin)
            .and_then(|c| c.network_list.iter().find(|n| n.network == tag))
            .ok_or_else(|| anyhow!("no withdraw fee listed for {coin} on {tag}"))?
            .withdraw_fee
            .parse::<f64>()
            .context("unparseable withdraw fee")?;
        Ok(fee)
    }

    async fn withdraw(
        &self,
        address: &str,
        coin: &str,
        chain: Chain,
        amount: f64,
    ) -> PipelineResult<String> {
        debug!(
            "\"withdraw\" - address: {address}, coin: {coin}, chain: {}, amount: {amount}",
            chain.exchange_tag()
        );

        if chain.exchange_tag() == "LINEA" {
            return Err(PipelineError::UnsupportedChain(chain.to_string()));
        }

        let fee = self.withdraw_fee(coin, chain).await?;
        debug!("\"withdraw\" - fee: {fee}");

        let params = format!(
            "coin={coin}&network={}&address={address}&amount={amount}",
            chain.exchange_tag()
        );
        let query = self.signed_query(&params)?;
        let url = format!("{API_URL}/sapi/v1/capital/withdraw/apply?{query}");
        let response = self
            .http
            .post(&url)
            .header("X-MBX-APIKEY", &self.api_key)
            .send()
            .await
            .context("exchange withdrawal request failed")?;
        let body = response
            .text()
            .await
            .context("exchange withdrawal response unreadable")?;

        let parsed: WithdrawResponse = serde_json::from_str(&body)
            .map_err(|_| PipelineError::ExchangeWithdrawalFailed(body.clone()))?;
        match parsed.id {
            Some(id) => {
                debug!("\"withdraw\" - wdid: {id}");
                Ok(id)
            }
            None => Err(PipelineError::ExchangeWithdrawalFailed(body)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn linea_is_rejected_before_any_network_call() {
        let exchange = BinanceExchange::new("key".into(), "secret".into()).unwrap();
        let result = exchange
            .withdraw("0xabc", "ETH", Chain::Linea, 0.005)
            .await;
        assert!(matches!(result, Err(PipelineError::UnsupportedChain(_))));
    }

    #[test]
    fn request_signing_matches_the_documented_vector() {
        let exchange = BinanceExchange::new(
            "vmPUZE6mv9SD5VNHk4HlWFsOr6aKE2zvsw0MuIgwCIPy6utIco14y7Ju91duEh8A".into(),
            "NhqPtmdSJYdKjVHjA7PZj4Mge3R5YNiP1e3UZjInClVN65XAbvqqM6A7H5fATj0j".into(),
        )
        .unwrap();
        let signature = exchange
            .sign(
                "symbol=LTCBTC&side=BUY&type=LIMIT&timeInForce=GTC&quantity=1&price=0.1\
                 &recvWindow=5000&timestamp=1499827319559",
            )
            .unwrap();
        assert_eq!(
            signature,
            "c8db56825ae71d6d79447849e617115f4a920fa2acdcab2b053c4b2838bd6b71"
        );
    }

    #[test]
    fn signed_queries_end_with_the_signature() {
        let exchange = BinanceExchange::new("key".into(), "secret".into()).unwrap();
        let query = exchange.signed_query("coin=ETH").unwrap();
        assert!(query.starts_with("coin=ETH&timestamp="));
        let signature = query.rsplit("&signature=").next().unwrap();
        assert_eq!(signature.len(), 64);
    }
}
