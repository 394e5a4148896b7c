use crate::address::WalletAddress;
use crate::balances::{discover_token_balances, get_native_balance, get_token_metadata};
use crate::balances::ChainReader;
use crate::chain::{ChainDescriptor, ChainKey, ChainRegistry};
use crate::errors::PortfolioError;
use crate::metrics::record_portfolio;
use crate::pricing::{enrich_prices, PriceSource};
use alloy::primitives::Address;
use futures::future::join_all;
use rust_decimal::Decimal;
use serde::Serialize;
use std::sync::Arc;
use std::time::Duration;
use tracing::{error, info, warn};

/// One positive balance of one asset on one chain.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AssetEntry {
    pub chain_key: ChainKey,
    pub chain_id: u64,
    pub symbol: String,
    pub name: String,
    /// Human readable amount, already scaled by the asset decimals
    pub balance: Decimal,
    pub is_native: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub contract_address: Option<Address>,
    pub price: f64,
    pub value: f64,
    #[serde(rename = "change24h")]
    pub change_24h: f64,
}

impl AssetEntry {
    pub fn native(
        chain_key: ChainKey,
        chain_id: u64,
        symbol: &str,
        name: &str,
        balance: Decimal,
    ) -> Self {
        Self {
            chain_key,
            chain_id,
            symbol: symbol.to_string(),
            name: name.to_string(),
            balance,
            is_native: true,
            contract_address: None,
            price: 0.0,
            value: 0.0,
            change_24h: 0.0,
        }
    }

    pub fn token(
        chain_key: ChainKey,
        chain_id: u64,
        symbol: String,
        name: String,
        balance: Decimal,
        contract_address: Address,
    ) -> Self {
        Self {
            chain_key,
            chain_id,
            symbol,
            name,
            balance,
            is_native: false,
            contract_address: Some(contract_address),
            price: 0.0,
            value: 0.0,
            change_24h: 0.0,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Portfolio {
    pub address: String,
    pub assets: Vec<AssetEntry>,
    pub total_value: f64,
}

impl Portfolio {
    /// Sum of the asset values, recomputed from the asset list.
    pub fn recompute_total(&self) -> f64 {
        self.assets.iter().map(|asset| asset.value).sum()
    }
}

/// Result of collecting one chain. Failures stay inside the chain's outcome.
#[derive(Debug)]
pub enum ChainOutcome {
    Collected(Vec<AssetEntry>),
    Failed {
        chain: ChainKey,
        error: PortfolioError,
    },
}

impl ChainOutcome {
    pub fn into_assets(self) -> Vec<AssetEntry> {
        match self {
            ChainOutcome::Collected(assets) => assets,
            ChainOutcome::Failed { chain, error } => {
                error!(chain = %chain, error = %error, "Error processing chain");
                vec![]
            }
        }
    }
}

#[derive(Debug, Clone, Copy)]
pub struct AggregatorSettings {
    /// Discovered tokens enriched per chain
    pub max_tokens_per_chain: usize,
    /// Upper bound for collecting a single chain
    pub chain_timeout: Duration,
}

impl Default for AggregatorSettings {
    fn default() -> Self {
        Self {
            max_tokens_per_chain: 5,
            chain_timeout: Duration::from_secs(30),
        }
    }
}

pub struct PortfolioAggregator {
    registry: Arc<ChainRegistry>,
    prices: Arc<dyn PriceSource>,
    settings: AggregatorSettings,
}

impl PortfolioAggregator {
    pub fn new(
        registry: Arc<ChainRegistry>,
        prices: Arc<dyn PriceSource>,
        settings: AggregatorSettings,
    ) -> Self {
        Self {
            registry,
            prices,
            settings,
        }
    }

    pub fn prices(&self) -> &dyn PriceSource {
        self.prices.as_ref()
    }

    /// Collects every available chain, prices the combined asset list once and returns
    /// the portfolio. Assets are ordered by chain, native first, then discovery order.
    pub async fn aggregate(&self, address: &WalletAddress) -> Result<Portfolio, PortfolioError> {
        let wallet = address.as_address();

        info!(address = %address, "Fetching portfolio");

        // join_all keeps input order, so chains finish in any order but list in registry order
        let outcomes = join_all(
            self.registry
                .available()
                .map(|(descriptor, reader)| self.collect_chain(descriptor, reader, wallet)),
        )
        .await;

        let mut assets: Vec<AssetEntry> = outcomes
            .into_iter()
            .flat_map(ChainOutcome::into_assets)
            .collect();

        let total_value = enrich_prices(self.prices.as_ref(), &mut assets).await;

        if !total_value.is_finite() {
            return Err(PortfolioError::internal(format!(
                "Portfolio value is not a finite number: {}",
                total_value
            )));
        }

        info!(
            address = %address,
            assets = assets.len(),
            total_value,
            "Portfolio aggregated"
        );
        record_portfolio(total_value);

        Ok(Portfolio {
            address: address.as_str().to_string(),
            assets,
            total_value,
        })
    }

    async fn collect_chain(
        &self,
        descriptor: &ChainDescriptor,
        reader: &dyn ChainReader,
        wallet: Address,
    ) -> ChainOutcome {
        let chain = descriptor.key;

        match tokio::time::timeout(
            self.settings.chain_timeout,
            self.collect_chain_assets(descriptor, reader, wallet),
        )
        .await
        {
            Ok(assets) => ChainOutcome::Collected(assets),
            Err(_) => ChainOutcome::Failed {
                chain,
                error: PortfolioError::chain_timed_out(chain, self.settings.chain_timeout),
            },
        }
    }

    /// Native balance if positive, then up to `max_tokens_per_chain` discovered tokens.
    /// Every upstream failure inside degrades to a missing entry.
    async fn collect_chain_assets(
        &self,
        descriptor: &ChainDescriptor,
        reader: &dyn ChainReader,
        wallet: Address,
    ) -> Vec<AssetEntry> {
        let mut assets = vec![];

        let native_balance = get_native_balance(reader, descriptor, wallet).await;
        if native_balance > Decimal::ZERO {
            assets.push(AssetEntry::native(
                descriptor.key,
                descriptor.chain_id,
                descriptor.native_currency.symbol,
                descriptor.native_currency.name,
                native_balance,
            ));
        }

        let tokens = discover_token_balances(
            reader,
            descriptor,
            wallet,
            self.settings.max_tokens_per_chain,
        )
        .await;

        for token in tokens {
            let Some(metadata) =
                get_token_metadata(reader, descriptor, token.contract_address, wallet).await
            else {
                continue;
            };

            if metadata.balance <= Decimal::ZERO {
                warn!(
                    chain = %descriptor.key,
                    contract = %token.contract_address,
                    "Token reported a balance but balanceOf is zero"
                );
                continue;
            }

            assets.push(AssetEntry::token(
                descriptor.key,
                descriptor.chain_id,
                metadata.symbol,
                metadata.name,
                metadata.balance,
                token.contract_address,
            ));
        }

        assets
    }
}
