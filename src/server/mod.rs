use crate::interrupts::on_sigterm;
use crate::portfolio::PortfolioAggregator;
use ntex::web::{self, get, post, App, ServiceConfig};
use std::{net::SocketAddr, sync::Arc};
use tracing::info;

mod error;
mod responders;

pub use error::ApiError;

/// Shared, read-only request state.
pub struct AppState {
    pub aggregator: PortfolioAggregator,
}

impl AppState {
    pub fn new(aggregator: PortfolioAggregator) -> Self {
        Self { aggregator }
    }
}

pub fn configure_routes(cfg: &mut ServiceConfig) {
    cfg
        // ==== INTERNAL ==== //
        .route(
            "/internal/probe/readiness",
            get().to(responders::probe::readiness),
        )
        .route(
            "/internal/probe/liveness",
            get().to(responders::probe::liveness),
        )
        .route("/internal/metrics", get().to(responders::metrics::metrics))
        // ==== PUBLIC ==== //
        .route("/health", get().to(responders::health::health))
        .route(
            "/portfolio/{address}",
            get().to(responders::portfolio::portfolio),
        )
        .route(
            "/api/portfolio/{address}",
            get().to(responders::portfolio::portfolio),
        )
        .route("/api/prices", post().to(responders::prices::prices));
}

/// Serves the portfolio API until SIGTERM/SIGINT, then stops gracefully.
pub async fn start_server(
    server_address: &SocketAddr,
    app_state: Arc<AppState>,
) -> std::io::Result<()> {
    let server = web::server(move || {
        App::new()
            .state(app_state.clone())
            .configure(configure_routes)
    })
    .bind(server_address)?
    .run();

    let server_handle = server.clone();
    let _shutdown_handler = on_sigterm(move || {
        let server = server_handle.clone();
        async move {
            info!("Stopping server");
            server.stop(true).await;
        }
    });

    info!("Portfolio API: http://{}/api/portfolio/:address", server_address);

    server.await
}
