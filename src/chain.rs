use crate::balances::ChainReader;
use crate::config::Config;
use crate::errors::PortfolioError;
use crate::rpc::RpcClient;
use reqwest::{Client, Url};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use strum_macros::{Display, EnumString};
use tracing::{info, warn};

/// Substrings that mark an endpoint whose template was never filled in.
const PLACEHOLDER_MARKERS: [&str; 4] = ["undefined", "${", "<", "YOUR_"];

#[derive(Debug, Clone, Copy, Hash, PartialEq, Eq, Serialize, Deserialize, Display, EnumString)]
#[strum(serialize_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum ChainKey {
    Ethereum,
    Polygon,
    Arbitrum,
    Optimism,
    Base,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NativeCurrency {
    pub name: &'static str,
    pub symbol: &'static str,
    pub decimals: u8,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChainDescriptor {
    pub key: ChainKey,
    pub chain_id: u64,
    pub name: &'static str,
    /// Subdomain of the Alchemy endpoint for this network, e.g. `eth-mainnet`
    pub alchemy_network: &'static str,
    pub native_currency: NativeCurrency,
}

const ETHER: NativeCurrency = NativeCurrency {
    name: "Ethereum",
    symbol: "ETH",
    decimals: 18,
};

/// Supported networks in the order portfolios list them.
pub static SUPPORTED_CHAINS: [ChainDescriptor; 5] = [
    ChainDescriptor {
        key: ChainKey::Ethereum,
        chain_id: 1,
        name: "Ethereum",
        alchemy_network: "eth-mainnet",
        native_currency: ETHER,
    },
    ChainDescriptor {
        key: ChainKey::Polygon,
        chain_id: 137,
        name: "Polygon",
        alchemy_network: "polygon-mainnet",
        native_currency: NativeCurrency {
            name: "MATIC",
            symbol: "MATIC",
            decimals: 18,
        },
    },
    ChainDescriptor {
        key: ChainKey::Arbitrum,
        chain_id: 42161,
        name: "Arbitrum",
        alchemy_network: "arb-mainnet",
        native_currency: ETHER,
    },
    ChainDescriptor {
        key: ChainKey::Optimism,
        chain_id: 10,
        name: "Optimism",
        alchemy_network: "opt-mainnet",
        native_currency: ETHER,
    },
    ChainDescriptor {
        key: ChainKey::Base,
        chain_id: 8453,
        name: "Base",
        alchemy_network: "base-mainnet",
        native_currency: ETHER,
    },
];

impl ChainDescriptor {
    pub fn alchemy_url(&self, api_key: &str) -> String {
        format!("https://{}.g.alchemy.com/v2/{}", self.alchemy_network, api_key)
    }
}

/// Returns the endpoint as a URL if it is usable, `None` for missing, templated or
/// malformed values.
pub fn validate_endpoint(raw: Option<&str>) -> Option<Url> {
    let raw = raw.map(str::trim).filter(|raw| !raw.is_empty())?;

    if PLACEHOLDER_MARKERS.iter().any(|marker| raw.contains(marker)) {
        return None;
    }

    let url = Url::parse(raw).ok()?;

    match url.scheme() {
        "http" | "https" => Some(url),
        _ => None,
    }
}

pub struct ChainEntry {
    pub descriptor: &'static ChainDescriptor,
    reader: Option<Arc<dyn ChainReader>>,
}

impl ChainEntry {
    pub fn new(descriptor: &'static ChainDescriptor, reader: Option<Arc<dyn ChainReader>>) -> Self {
        Self { descriptor, reader }
    }

    pub fn reader(&self) -> Option<&dyn ChainReader> {
        self.reader.as_deref()
    }
}

/// Read-only set of chain clients, built once at startup and shared by every request.
pub struct ChainRegistry {
    entries: Vec<ChainEntry>,
}

impl ChainRegistry {
    pub fn new(entries: Vec<ChainEntry>) -> Self {
        Self { entries }
    }

    /// One entry per supported chain; chains without a usable endpoint stay registered
    /// but unavailable for the lifetime of the process.
    pub fn from_config(config: &Config, http: &Client) -> Self {
        let entries = SUPPORTED_CHAINS
            .iter()
            .map(|descriptor| {
                let endpoint = config.endpoints.endpoint_for(descriptor);

                let reader = match validate_endpoint(endpoint.as_deref()) {
                    Some(url) => {
                        info!(chain = %descriptor.key, chain_id = descriptor.chain_id, "RPC client initialized");
                        Some(Arc::new(RpcClient::with_client(url, http.clone())) as Arc<dyn ChainReader>)
                    }
                    None => {
                        warn!(
                            chain = %descriptor.key,
                            error = %PortfolioError::chain_unavailable(descriptor.key),
                            "Skipping provider - RPC URL missing or invalid. Check .env file."
                        );
                        None
                    }
                };

                ChainEntry::new(descriptor, reader)
            })
            .collect();

        Self::new(entries)
    }

    /// All entries in registry order, available or not.
    pub fn entries(&self) -> &[ChainEntry] {
        &self.entries
    }

    /// Chains with a reader, in registry order.
    pub fn available(&self) -> impl Iterator<Item = (&'static ChainDescriptor, &dyn ChainReader)> {
        self.entries
            .iter()
            .filter_map(|entry| entry.reader().map(|reader| (entry.descriptor, reader)))
    }
}
