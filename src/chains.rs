use serde::Deserialize;
use std::fmt;

/// Networks the tool can touch. Linea stays in the catalogue even though
/// the exchange cannot withdraw to it; the withdrawal guard rejects it by
/// tag before any network call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Chain {
    Optimism,
    Arbitrum,
    Zksync,
    Base,
    Linea,
    Ethereum,
}

impl Chain {
    pub fn id(&self) -> u64 {
        match self {
            Chain::Optimism => 10,
            Chain::Arbitrum => 42161,
            Chain::Zksync => 324,
            Chain::Base => 8453,
            Chain::Linea => 59144,
            Chain::Ethereum => 1,
        }
    }

    pub fn rpc_url(&self) -> &'static str {
        match self {
            Chain::Optimism => "https://rpc.ankr.com/optimism",
            Chain::Arbitrum => "https://arbitrum.drpc.org",
            Chain::Zksync => "https://zksync.drpc.org",
            Chain::Base => "https://base.blockpi.network/v1/rpc/public",
            Chain::Linea => "https://rpc.linea.build",
            Chain::Ethereum => "https://rpc.ankr.com/eth",
        }
    }

    /// Network tag understood by the exchange withdrawal API.
    pub fn exchange_tag(&self) -> &'static str {
        match self {
            Chain::Optimism => "OPTIMISM",
            Chain::Arbitrum => "ARBITRUM",
            Chain::Zksync => "ZKSYNCERA",
            Chain::Base => "BASE",
            Chain::Linea => "LINEA",
            Chain::Ethereum => "ERC20",
        }
    }
}

impl fmt::Display for Chain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Chain::Optimism => "optimism",
            Chain::Arbitrum => "arbitrum",
            Chain::Zksync => "zksync",
            Chain::Base => "base",
            Chain::Linea => "linea",
            Chain::Ethereum => "ethereum",
        };
        f.write_str(name)
    }
}
