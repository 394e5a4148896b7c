use anyhow::{Context, Result};
use chain::ChainRegistry;
use clap::Parser;
use config::Config;
use interrupts::on_panic;
use logs::init_logs;
use metrics::init_metrics;
use portfolio::PortfolioAggregator;
use pricing::PriceClient;
use server::{start_server, AppState};
use std::sync::Arc;
use tracing::{error, info};

mod address;
mod balances;
mod chain;
mod config;
mod erc20;
mod errors;
mod history;
mod interrupts;
mod logs;
mod metrics;
mod portfolio;
mod pricing;
mod rpc;
mod server;
mod units;

#[ntex::main]
async fn main() -> Result<()> {
    dotenv::dotenv().ok();

    // Parse the configuration.
    let config = Config::parse();

    // Initialize tracing logger.
    init_logs(config.log_format);

    // log panics
    on_panic(|panic_info| error!(error = %panic_info, "Panic detected!!"));

    init_metrics("chain_portfolio").context("Initializing metrics")?;

    // One HTTP client for every upstream, carrying the per-call timeout
    let http = reqwest::Client::builder()
        .timeout(config.request_timeout())
        .build()
        .context("Building HTTP client")?;

    let registry = Arc::new(ChainRegistry::from_config(&config, &http));
    info!(
        "Loaded {} of {} chains",
        registry.available().count(),
        registry.entries().len()
    );

    let prices = Arc::new(PriceClient::new(
        config.price_api_url.clone(),
        config.price_api_key.clone(),
        http,
    ));

    let aggregator = PortfolioAggregator::new(registry, prices, config.aggregator_settings());

    info!("Starting server at {}", &config.server_address);
    start_server(&config.server_address, Arc::new(AppState::new(aggregator)))
        .await
        .context("Running server")?;

    info!("Server stopped");

    Ok(())
}
