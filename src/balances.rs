use crate::chain::ChainDescriptor;
use crate::errors::UpstreamOperation;
use crate::metrics::record_upstream_failure;
use crate::units::to_decimal;
use alloy::primitives::{Address, U256};
use anyhow::Result;
use async_trait::async_trait;
use rust_decimal::Decimal;
use tracing::{debug, warn};

/// Read access to one chain. Implemented by the JSON-RPC client, stubbed in tests.
#[async_trait]
pub trait ChainReader: Send + Sync {
    /// Native currency balance in the smallest unit
    async fn native_balance(&self, address: Address) -> Result<U256>;

    /// Token contracts the provider reports for `address`, in provider order
    async fn discover_tokens(&self, address: Address) -> Result<Vec<DiscoveredToken>>;

    async fn token_metadata(&self, contract: Address, owner: Address) -> Result<TokenMetadata>;
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DiscoveredToken {
    pub contract_address: Address,
    /// `None` when the provider returned no readable balance
    pub raw_balance: Option<U256>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TokenMetadata {
    /// Balance already scaled by `decimals`
    pub balance: Decimal,
    pub decimals: u8,
    pub symbol: String,
    pub name: String,
}

/// Native balance in whole units. Upstream failures degrade to zero.
pub async fn get_native_balance(
    reader: &dyn ChainReader,
    chain: &ChainDescriptor,
    address: Address,
) -> Decimal {
    match reader.native_balance(address).await {
        Ok(raw) => to_decimal(raw, chain.native_currency.decimals),
        Err(e) => {
            warn!(
                chain = %chain.key,
                operation = %UpstreamOperation::NativeBalance,
                error = %e,
                "Error getting native balance"
            );
            record_upstream_failure(UpstreamOperation::NativeBalance, chain.key);
            Decimal::ZERO
        }
    }
}

/// Token candidates with a positive raw balance, taken from the first `cap` entries the
/// provider returns. Upstream failures degrade to an empty list.
pub async fn discover_token_balances(
    reader: &dyn ChainReader,
    chain: &ChainDescriptor,
    address: Address,
    cap: usize,
) -> Vec<DiscoveredToken> {
    let tokens = match reader.discover_tokens(address).await {
        Ok(tokens) => tokens,
        Err(e) => {
            warn!(
                chain = %chain.key,
                operation = %UpstreamOperation::TokenDiscovery,
                error = %e,
                "Error getting token balances"
            );
            record_upstream_failure(UpstreamOperation::TokenDiscovery, chain.key);
            return vec![];
        }
    };

    debug!(chain = %chain.key, discovered = tokens.len(), cap, "Discovered tokens");

    tokens
        .into_iter()
        .take(cap)
        .filter(|token| token.raw_balance.is_some_and(|raw| !raw.is_zero()))
        .collect()
}

/// Metadata for one token contract, `None` if the contract does not answer like an ERC-20.
pub async fn get_token_metadata(
    reader: &dyn ChainReader,
    chain: &ChainDescriptor,
    contract: Address,
    wallet: Address,
) -> Option<TokenMetadata> {
    match reader.token_metadata(contract, wallet).await {
        Ok(metadata) => Some(metadata),
        Err(e) => {
            warn!(
                chain = %chain.key,
                operation = %UpstreamOperation::TokenMetadata,
                contract = %contract,
                error = %e,
                "Skipping token"
            );
            record_upstream_failure(UpstreamOperation::TokenMetadata, chain.key);
            None
        }
    }
}

#[cfg(test)]
pub(crate) mod test_helpers {
    use super::*;
    use anyhow::anyhow;
    use std::collections::HashMap;
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// In-memory chain with fixed answers. `None` fields fail the corresponding call.
    #[derive(Default)]
    pub struct StubChain {
        pub native: Option<U256>,
        pub tokens: Option<Vec<DiscoveredToken>>,
        pub metadata: HashMap<Address, TokenMetadata>,
        pub metadata_calls: AtomicUsize,
    }

    impl StubChain {
        pub fn with_native(native: U256) -> Self {
            Self {
                native: Some(native),
                tokens: Some(vec![]),
                ..Default::default()
            }
        }

        pub fn token(mut self, contract: Address, raw: u64, metadata: Option<TokenMetadata>) -> Self {
            self.tokens.get_or_insert_with(Vec::new).push(DiscoveredToken {
                contract_address: contract,
                raw_balance: Some(U256::from(raw)),
            });

            if let Some(metadata) = metadata {
                self.metadata.insert(contract, metadata);
            }

            self
        }

        pub fn metadata_calls(&self) -> usize {
            self.metadata_calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl ChainReader for StubChain {
        async fn native_balance(&self, _address: Address) -> Result<U256> {
            self.native.ok_or(anyhow!("connection refused"))
        }

        async fn discover_tokens(&self, _address: Address) -> Result<Vec<DiscoveredToken>> {
            self.tokens.clone().ok_or(anyhow!("method not found"))
        }

        async fn token_metadata(&self, contract: Address, _owner: Address) -> Result<TokenMetadata> {
            self.metadata_calls.fetch_add(1, Ordering::SeqCst);
            self.metadata
                .get(&contract)
                .cloned()
                .ok_or(anyhow!("execution reverted"))
        }
    }

    pub fn metadata(symbol: &str, balance: Decimal) -> TokenMetadata {
        TokenMetadata {
            balance,
            decimals: 18,
            symbol: symbol.to_string(),
            name: format!("{symbol} Token"),
        }
    }

    pub fn contract(n: u8) -> Address {
        Address::with_last_byte(n)
    }
}

#[cfg(test)]
mod tests {
    use super::test_helpers::*;
    use super::*;
    use crate::chain::SUPPORTED_CHAINS;
    use rust_decimal_macros::dec;
    use std::io;
    use std::sync::{Arc, Mutex};

    const WALLET: Address = Address::ZERO;

    #[tokio::test]
    async fn test_native_balance_is_scaled() {
        let chain = StubChain::with_native(U256::from(1_500_000_000_000_000_000u128));
        let balance = get_native_balance(&chain, &SUPPORTED_CHAINS[0], WALLET).await;
        assert_eq!(balance, dec!(1.5));
    }

    #[tokio::test]
    async fn test_oversized_native_balance_stays_positive() {
        let chain = StubChain::with_native(U256::from(10u64).pow(U256::from(48u64)));
        let balance = get_native_balance(&chain, &SUPPORTED_CHAINS[0], WALLET).await;
        assert_eq!(balance, Decimal::MAX);
    }

    #[tokio::test]
    async fn test_native_balance_failure_is_zero() {
        let chain = StubChain::default();
        let balance = get_native_balance(&chain, &SUPPORTED_CHAINS[0], WALLET).await;
        assert_eq!(balance, Decimal::ZERO);
    }

    #[tokio::test]
    async fn test_discovery_caps_before_filtering() {
        let mut chain = StubChain::with_native(U256::ZERO);
        for n in 1..=8 {
            chain = chain.token(contract(n), if n == 2 { 0 } else { 1 }, None);
        }

        let tokens = discover_token_balances(&chain, &SUPPORTED_CHAINS[0], WALLET, 5).await;

        let contracts: Vec<Address> = tokens.iter().map(|t| t.contract_address).collect();
        assert_eq!(contracts, vec![contract(1), contract(3), contract(4), contract(5)]);
    }

    #[tokio::test]
    async fn test_discovery_skips_unreadable_balances() {
        let chain = StubChain {
            tokens: Some(vec![DiscoveredToken {
                contract_address: contract(1),
                raw_balance: None,
            }]),
            ..Default::default()
        };

        let tokens = discover_token_balances(&chain, &SUPPORTED_CHAINS[0], WALLET, 5).await;
        assert!(tokens.is_empty());
    }

    #[tokio::test]
    async fn test_discovery_failure_is_empty() {
        let chain = StubChain::default();
        let tokens = discover_token_balances(&chain, &SUPPORTED_CHAINS[1], WALLET, 5).await;
        assert!(tokens.is_empty());
    }

    #[tokio::test]
    async fn test_token_metadata_failure_is_none() {
        let chain = StubChain::with_native(U256::ZERO)
            .token(contract(1), 10, Some(metadata("DAI", dec!(10))))
            .token(contract(2), 10, None);

        let dai = get_token_metadata(&chain, &SUPPORTED_CHAINS[0], contract(1), WALLET).await;
        assert_eq!(dai.unwrap().symbol, "DAI");

        let missing = get_token_metadata(&chain, &SUPPORTED_CHAINS[0], contract(2), WALLET).await;
        assert!(missing.is_none());
    }

    /// Collects formatted events at WARN and above for the current thread.
    #[derive(Clone, Default)]
    struct CapturedLogs(Arc<Mutex<Vec<u8>>>);

    impl io::Write for CapturedLogs {
        fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
            self.0.lock().unwrap().extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    #[tokio::test]
    async fn test_token_metadata_failure_logs_warning() {
        let logs = CapturedLogs::default();
        let writer = logs.clone();
        let subscriber = tracing_subscriber::fmt()
            .with_max_level(tracing::Level::WARN)
            .with_ansi(false)
            .with_writer(move || writer.clone())
            .finish();
        let _guard = tracing::subscriber::set_default(subscriber);

        let chain = StubChain::with_native(U256::ZERO).token(contract(7), 10, None);
        assert!(get_token_metadata(&chain, &SUPPORTED_CHAINS[4], contract(7), WALLET)
            .await
            .is_none());

        let output = String::from_utf8(logs.0.lock().unwrap().clone()).unwrap();
        assert!(output.contains("WARN"), "{output}");
        assert!(output.contains("Skipping token"), "{output}");
        assert!(output.contains("operation=token_metadata"), "{output}");
    }
}
