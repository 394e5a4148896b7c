use crate::chain::{ChainDescriptor, ChainKey};
use crate::logs::LogFormat;
use crate::portfolio::AggregatorSettings;
use clap::{Args, Parser};
use reqwest::Url;
use std::net::SocketAddr;
use std::time::Duration;

#[derive(Parser, Clone, Debug)]
#[command(version, about)]
pub struct Config {
    #[arg(long, env = "SERVER_ADDRESS", default_value = "0.0.0.0:5000")]
    pub server_address: SocketAddr,

    #[command(flatten)]
    pub endpoints: ChainEndpoints,

    // Base URL of the CoinGecko compatible price API
    #[arg(
        long,
        env = "PRICE_API_URL",
        default_value = "https://api.coingecko.com/api/v3"
    )]
    pub price_api_url: Url,

    #[arg(long, env = "COINGECKO_API_KEY")]
    pub price_api_key: Option<String>,

    // Number of discovered tokens enriched per chain, bounds the RPC fan-out
    #[arg(long, env = "MAX_TOKENS_PER_CHAIN", default_value_t = 5)]
    pub max_tokens_per_chain: usize,

    #[arg(long, env = "REQUEST_TIMEOUT_MS", default_value_t = 5000)]
    pub request_timeout_ms: u64,

    // Upper bound for collecting one chain, including all of its token lookups
    #[arg(long, env = "CHAIN_TIMEOUT_MS", default_value_t = 15000)]
    pub chain_timeout_ms: u64,

    #[arg(long, env = "LOG_FORMAT", default_value = "json")]
    pub log_format: LogFormat,
}

impl Config {
    pub fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.request_timeout_ms)
    }

    pub fn aggregator_settings(&self) -> AggregatorSettings {
        AggregatorSettings {
            max_tokens_per_chain: self.max_tokens_per_chain,
            chain_timeout: Duration::from_millis(self.chain_timeout_ms),
        }
    }
}

/// JSON-RPC endpoints per chain. An explicit URL wins over an Alchemy key.
#[derive(Args, Clone, Debug, Default)]
pub struct ChainEndpoints {
    #[arg(long, env = "ETHEREUM_RPC_URL")]
    pub ethereum_rpc_url: Option<String>,

    #[arg(long, env = "ALCHEMY_ETHEREUM_KEY")]
    pub alchemy_ethereum_key: Option<String>,

    #[arg(long, env = "POLYGON_RPC_URL")]
    pub polygon_rpc_url: Option<String>,

    #[arg(long, env = "ALCHEMY_POLYGON_KEY")]
    pub alchemy_polygon_key: Option<String>,

    #[arg(long, env = "ARBITRUM_RPC_URL")]
    pub arbitrum_rpc_url: Option<String>,

    #[arg(long, env = "ALCHEMY_ARBITRUM_KEY")]
    pub alchemy_arbitrum_key: Option<String>,

    #[arg(long, env = "OPTIMISM_RPC_URL")]
    pub optimism_rpc_url: Option<String>,

    #[arg(long, env = "ALCHEMY_OPTIMISM_KEY")]
    pub alchemy_optimism_key: Option<String>,

    #[arg(long, env = "BASE_RPC_URL")]
    pub base_rpc_url: Option<String>,

    #[arg(long, env = "ALCHEMY_BASE_KEY")]
    pub alchemy_base_key: Option<String>,
}

impl ChainEndpoints {
    /// Raw endpoint string for the chain, unvalidated.
    pub fn endpoint_for(&self, chain: &ChainDescriptor) -> Option<String> {
        let (url, key) = match chain.key {
            ChainKey::Ethereum => (&self.ethereum_rpc_url, &self.alchemy_ethereum_key),
            ChainKey::Polygon => (&self.polygon_rpc_url, &self.alchemy_polygon_key),
            ChainKey::Arbitrum => (&self.arbitrum_rpc_url, &self.alchemy_arbitrum_key),
            ChainKey::Optimism => (&self.optimism_rpc_url, &self.alchemy_optimism_key),
            ChainKey::Base => (&self.base_rpc_url, &self.alchemy_base_key),
        };

        url.clone()
            .or_else(|| key.as_deref().map(|key| chain.alchemy_url(key)))
    }
}
