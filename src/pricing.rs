use crate::errors::{PortfolioError, UpstreamOperation};
use crate::metrics::record_price_failure;
use crate::portfolio::AssetEntry;
use async_trait::async_trait;
use reqwest::{Client, Url};
use rust_decimal::prelude::ToPrimitive;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use tracing::{debug, warn};

/// Ticker symbol to price provider id. Unlisted tickers are never priced.
pub const PRICE_IDS: [(&str, &str); 6] = [
    ("ETH", "ethereum"),
    ("MATIC", "matic-network"),
    ("USDC", "usd-coin"),
    ("USDT", "tether"),
    ("WETH", "weth"),
    ("DAI", "dai"),
];

pub fn price_id_for(symbol: &str) -> Option<&'static str> {
    PRICE_IDS
        .iter()
        .find(|(ticker, _)| *ticker == symbol)
        .map(|(_, id)| *id)
}

#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct PriceQuote {
    #[serde(default)]
    pub usd: Option<f64>,
    #[serde(default)]
    pub usd_24h_change: Option<f64>,
}

pub type PriceQuotes = HashMap<String, PriceQuote>;

#[async_trait]
pub trait PriceSource: Send + Sync {
    /// USD price and 24h change for each provider id. Ids the provider does not know are
    /// missing from the result.
    async fn fetch_quotes(&self, ids: &[&str]) -> Result<PriceQuotes, PortfolioError>;
}

/// Client for the CoinGecko `simple/price` endpoint.
pub struct PriceClient {
    base_url: Url,
    api_key: Option<String>,
    client: Client,
}

impl PriceClient {
    pub fn new(base_url: Url, api_key: Option<String>, client: Client) -> Self {
        Self {
            base_url,
            api_key,
            client,
        }
    }

    fn simple_price_url(&self) -> String {
        format!("{}/simple/price", self.base_url.as_str().trim_end_matches('/'))
    }
}

#[async_trait]
impl PriceSource for PriceClient {
    async fn fetch_quotes(&self, ids: &[&str]) -> Result<PriceQuotes, PortfolioError> {
        if ids.is_empty() {
            return Ok(PriceQuotes::new());
        }

        let upstream = |e: reqwest::Error| {
            PortfolioError::upstream(UpstreamOperation::PriceBatch, "price api", e)
        };

        let mut request = self.client.get(self.simple_price_url()).query(&[
            ("ids", ids.join(",").as_str()),
            ("vs_currencies", "usd"),
            ("include_24hr_change", "true"),
        ]);

        if let Some(api_key) = &self.api_key {
            request = request.header("x-cg-demo-api-key", api_key);
        }

        let quotes = request
            .send()
            .await
            .and_then(|response| response.error_for_status())
            .map_err(upstream)?
            .json::<PriceQuotes>()
            .await
            .map_err(upstream)?;

        debug!(requested = ids.len(), received = quotes.len(), "Fetched prices");

        Ok(quotes)
    }
}

/// Unique provider ids for the assets, in first-seen order.
pub fn collect_price_ids(assets: &[AssetEntry]) -> Vec<&'static str> {
    let mut ids: Vec<&'static str> = vec![];

    for id in assets.iter().filter_map(|asset| price_id_for(&asset.symbol)) {
        if !ids.contains(&id) {
            ids.push(id);
        }
    }

    ids
}

/// Sets price, value and 24h change on every asset and returns the summed value.
/// Assets without a mapped id or without a quote stay at zero.
pub fn apply_quotes(assets: &mut [AssetEntry], quotes: &PriceQuotes) -> f64 {
    let mut total_value = 0.0;

    for asset in assets.iter_mut() {
        let quote = price_id_for(&asset.symbol).and_then(|id| quotes.get(id));

        match quote {
            Some(PriceQuote {
                usd: Some(usd),
                usd_24h_change,
            }) => {
                asset.price = *usd;
                asset.value = asset.balance.to_f64().unwrap_or_default() * usd;
                asset.change_24h = usd_24h_change.unwrap_or_default();
                total_value += asset.value;
            }
            _ => {
                asset.price = 0.0;
                asset.value = 0.0;
                asset.change_24h = 0.0;
            }
        }
    }

    total_value
}

/// Prices all assets with one batch call. A failed batch leaves every asset at zero.
pub async fn enrich_prices(prices: &dyn PriceSource, assets: &mut [AssetEntry]) -> f64 {
    let ids = collect_price_ids(assets);

    let quotes = if ids.is_empty() {
        PriceQuotes::new()
    } else {
        prices.fetch_quotes(&ids).await.unwrap_or_else(|e| {
            warn!(
                operation = %UpstreamOperation::PriceBatch,
                error = %e,
                "Error getting token prices"
            );
            record_price_failure();
            PriceQuotes::new()
        })
    };

    apply_quotes(assets, &quotes)
}

#[cfg(test)]
pub(crate) mod test_helpers {
    use super::*;
    use std::sync::Mutex;

    /// Fixed quotes, or a failing provider when `quotes` is `None`. Records requested ids.
    #[derive(Default)]
    pub struct StubPrices {
        pub quotes: Option<PriceQuotes>,
        pub requests: Mutex<Vec<Vec<String>>>,
    }

    impl StubPrices {
        pub fn new(quotes: &[(&str, f64, Option<f64>)]) -> Self {
            Self {
                quotes: Some(
                    quotes
                        .iter()
                        .map(|(id, usd, change)| {
                            (
                                id.to_string(),
                                PriceQuote {
                                    usd: Some(*usd),
                                    usd_24h_change: *change,
                                },
                            )
                        })
                        .collect(),
                ),
                ..Default::default()
            }
        }

        pub fn failing() -> Self {
            Self::default()
        }

        pub fn requests(&self) -> Vec<Vec<String>> {
            self.requests.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl PriceSource for StubPrices {
        async fn fetch_quotes(&self, ids: &[&str]) -> Result<PriceQuotes, PortfolioError> {
            self.requests
                .lock()
                .unwrap()
                .push(ids.iter().map(|id| id.to_string()).collect());

            self.quotes.clone().ok_or(PortfolioError::upstream(
                UpstreamOperation::PriceBatch,
                "stub",
                "429 Too Many Requests",
            ))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::test_helpers::StubPrices;
    use super::*;
    use crate::chain::ChainKey;
    use rust_decimal::Decimal;
    use rust_decimal_macros::dec;
    use serde_json::json;
    use wiremock::matchers::{header, method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn asset(symbol: &str, balance: Decimal) -> AssetEntry {
        AssetEntry::native(ChainKey::Ethereum, 1, symbol, symbol, balance)
    }

    #[test]
    fn test_price_id_lookup() {
        assert_eq!(price_id_for("ETH"), Some("ethereum"));
        assert_eq!(price_id_for("MATIC"), Some("matic-network"));
        assert_eq!(price_id_for("USDT"), Some("tether"));
        assert_eq!(price_id_for("eth"), None);
        assert_eq!(price_id_for("SHIB"), None);
    }

    #[test]
    fn test_collect_price_ids_deduplicates() {
        let assets = vec![
            asset("ETH", dec!(1)),
            asset("USDC", dec!(1)),
            asset("SHIB", dec!(1)),
            asset("ETH", dec!(2)),
        ];

        assert_eq!(collect_price_ids(&assets), vec!["ethereum", "usd-coin"]);
    }

    #[test]
    fn test_apply_quotes() {
        let mut assets = vec![asset("ETH", dec!(1.5)), asset("SHIB", dec!(1000)), asset("DAI", dec!(3))];
        let quotes: PriceQuotes = [
            (
                "ethereum".to_string(),
                PriceQuote {
                    usd: Some(3000.0),
                    usd_24h_change: Some(-2.5),
                },
            ),
            (
                "dai".to_string(),
                PriceQuote {
                    usd: None,
                    usd_24h_change: None,
                },
            ),
        ]
        .into_iter()
        .collect();

        let total = apply_quotes(&mut assets, &quotes);

        assert_eq!(total, 4500.0);
        assert_eq!(assets[0].price, 3000.0);
        assert_eq!(assets[0].value, 4500.0);
        assert_eq!(assets[0].change_24h, -2.5);
        assert_eq!((assets[1].price, assets[1].value, assets[1].change_24h), (0.0, 0.0, 0.0));
        assert_eq!((assets[2].price, assets[2].value), (0.0, 0.0));
    }

    #[tokio::test]
    async fn test_enrich_prices_batch_failure_zeroes_everything() {
        let mut assets = vec![asset("ETH", dec!(1)), asset("USDC", dec!(50))];
        let prices = StubPrices::failing();

        let total = enrich_prices(&prices, &mut assets).await;

        assert_eq!(total, 0.0);
        assert!(assets.iter().all(|a| a.price == 0.0 && a.value == 0.0 && a.change_24h == 0.0));
    }

    #[tokio::test]
    async fn test_enrich_prices_skips_call_without_mapped_symbols() {
        let mut assets = vec![asset("SHIB", dec!(1))];
        let prices = StubPrices::new(&[]);

        assert_eq!(enrich_prices(&prices, &mut assets).await, 0.0);
        assert!(prices.requests().is_empty());
    }

    #[tokio::test]
    async fn test_price_client_request() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/api/v3/simple/price"))
            .and(query_param("ids", "ethereum,usd-coin"))
            .and(query_param("vs_currencies", "usd"))
            .and(query_param("include_24hr_change", "true"))
            .and(header("x-cg-demo-api-key", "demo-key"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "ethereum": { "usd": 3000.0, "usd_24h_change": 1.25 },
                "usd-coin": { "usd": 1.0 }
            })))
            .mount(&server)
            .await;

        let base_url = Url::parse(&format!("{}/api/v3", server.uri())).unwrap();
        let client = PriceClient::new(base_url, Some("demo-key".to_string()), Client::new());

        let quotes = client.fetch_quotes(&["ethereum", "usd-coin"]).await.unwrap();

        assert_eq!(quotes["ethereum"].usd, Some(3000.0));
        assert_eq!(quotes["ethereum"].usd_24h_change, Some(1.25));
        assert_eq!(quotes["usd-coin"].usd_24h_change, None);
    }

    #[tokio::test]
    async fn test_price_client_rate_limited() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(429))
            .mount(&server)
            .await;

        let client = PriceClient::new(Url::parse(&server.uri()).unwrap(), None, Client::new());
        let err = client.fetch_quotes(&["ethereum"]).await.unwrap_err();

        assert!(matches!(
            err,
            PortfolioError::Upstream {
                operation: UpstreamOperation::PriceBatch,
                ..
            }
        ));
    }
}
