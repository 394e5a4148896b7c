use crate::address::WalletAddress;
use crate::chain::ChainKey;
use crate::history::{generate_history, HistoryPoint, HISTORY_DAYS};
use crate::portfolio::{AssetEntry, Portfolio};
use crate::server::{ApiError, AppState};
use alloy::primitives::Address;
use ntex::web::{
    types::{Path, State},
    HttpResponse,
};
use rust_decimal::{Decimal, RoundingStrategy};
use serde::Serialize;
use std::sync::Arc;

/// Asset as the web client renders it.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AssetView {
    pub symbol: String,
    /// Compact display label, the ticker
    pub name: String,
    pub full_name: String,
    pub chain: ChainKey,
    pub chain_id: u64,
    /// Fixed to 4 decimal places
    pub balance: String,
    pub is_native: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub contract_address: Option<Address>,
    pub price: f64,
    pub value: f64,
    pub change: f64,
}

impl From<&AssetEntry> for AssetView {
    fn from(asset: &AssetEntry) -> Self {
        Self {
            symbol: asset.symbol.clone(),
            name: asset.symbol.clone(),
            full_name: asset.name.clone(),
            chain: asset.chain_key,
            chain_id: asset.chain_id,
            balance: format_balance(asset.balance),
            is_native: asset.is_native,
            contract_address: asset.contract_address,
            price: asset.price,
            value: asset.value,
            change: asset.change_24h,
        }
    }
}

/// Four decimal places, halves rounded away from zero.
fn format_balance(balance: Decimal) -> String {
    format!(
        "{:.4}",
        balance.round_dp_with_strategy(4, RoundingStrategy::MidpointAwayFromZero)
    )
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PortfolioResponse {
    pub assets: Vec<AssetView>,
    pub total_value: f64,
    pub history: Vec<HistoryPoint>,
}

impl PortfolioResponse {
    pub fn new(portfolio: &Portfolio, history: Vec<HistoryPoint>) -> Self {
        Self {
            assets: portfolio.assets.iter().map(AssetView::from).collect(),
            total_value: portfolio.total_value,
            history,
        }
    }
}

pub async fn portfolio(
    path: Path<String>,
    state: State<Arc<AppState>>,
) -> Result<HttpResponse, ApiError> {
    let address: WalletAddress = path.into_inner().parse()?;

    let portfolio = state.aggregator.aggregate(&address).await?;
    let history = generate_history(portfolio.total_value, HISTORY_DAYS, &mut rand::rng());

    Ok(HttpResponse::Ok().json(&PortfolioResponse::new(&portfolio, history)))
}
