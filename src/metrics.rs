use crate::chain::ChainKey;
use crate::errors::UpstreamOperation;
use anyhow::{anyhow, Context, Result};
use opentelemetry::metrics::{Counter, Gauge, MeterProvider};
use opentelemetry::KeyValue;
use opentelemetry_sdk::{metrics::SdkMeterProvider, Resource};
use prometheus::{Encoder, Registry, TextEncoder};
use std::sync::{Arc, OnceLock};

pub static METRICS: OnceLock<Arc<Metrics>> = OnceLock::new();

pub fn init_metrics(namespace: &str) -> Result<()> {
    let metrics = Arc::new(Metrics::new(namespace)?);

    METRICS
        .set(metrics)
        .map_err(|_| anyhow!("Metric client is already initialized"))?;

    Ok(())
}

pub fn get_metrics() -> Option<Arc<Metrics>> {
    METRICS.get().cloned()
}

pub fn record_upstream_failure(operation: UpstreamOperation, chain: ChainKey) {
    if let Some(metrics) = METRICS.get() {
        metrics.upstream_failures.add(
            1,
            &[
                KeyValue::new("operation", operation.to_string()),
                KeyValue::new("chain", chain.to_string()),
            ],
        );
    }
}

pub fn record_price_failure() {
    if let Some(metrics) = METRICS.get() {
        metrics.upstream_failures.add(
            1,
            &[KeyValue::new(
                "operation",
                UpstreamOperation::PriceBatch.to_string(),
            )],
        );
    }
}

pub fn record_portfolio(total_value: f64) {
    if let Some(metrics) = METRICS.get() {
        metrics.portfolio_requests.add(1, &[]);
        metrics.total_value.record(total_value, &[]);
    }
}

#[derive(Debug)]
pub struct Metrics {
    pub registry: Registry,
    pub portfolio_requests: Counter<u64>,
    pub upstream_failures: Counter<u64>,
    pub total_value: Gauge<f64>,
    #[allow(dead_code)]
    provider: SdkMeterProvider,
}

impl Metrics {
    pub fn new(service: &str) -> Result<Self> {
        let registry = Registry::new();

        let exporter = opentelemetry_prometheus::exporter()
            .with_registry(registry.clone())
            .build()
            .context("Creating metrics exporter")?;

        let provider = SdkMeterProvider::builder()
            .with_reader(exporter)
            .with_resource(Resource::new(vec![KeyValue::new(
                "service.name",
                service.to_string(),
            )]))
            .build();

        let meter = provider.meter(service.to_string());

        Ok(Self {
            registry,
            provider,
            portfolio_requests: meter
                .u64_counter("portfolio_requests")
                .with_description("Number of portfolio aggregations served.")
                .init(),
            upstream_failures: meter
                .u64_counter("portfolio_upstream_failures")
                .with_description("Upstream calls that failed and were replaced by a default value.")
                .init(),
            total_value: meter
                .f64_gauge("portfolio_total_value_usd")
                .with_description("Total USD value of the last aggregated portfolio.")
                .init(),
        })
    }

    /// Registry contents in the Prometheus text exposition format
    pub fn encode(&self) -> Result<String> {
        let mut buffer = vec![];
        TextEncoder::new()
            .encode(&self.registry.gather(), &mut buffer)
            .context("Encoding metrics")?;

        String::from_utf8(buffer).context("Metrics are not valid UTF-8")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_metrics_export() {
        let metrics = Metrics::new("chain_portfolio_test").unwrap();
        metrics.portfolio_requests.add(1, &[]);
        metrics.upstream_failures.add(
            2,
            &[KeyValue::new("operation", "native_balance"), KeyValue::new("chain", "base")],
        );

        let text = metrics.encode().unwrap();
        assert!(text.contains("portfolio_requests"));
        assert!(text.contains("portfolio_upstream_failures"));
    }

    #[test]
    fn test_recording_without_init_is_noop() {
        record_upstream_failure(UpstreamOperation::TokenMetadata, ChainKey::Base);
        record_portfolio(10.0);
    }
}
