//! DeFi Dashboard API server
//!
//! Thin HTTP surface over the real-time feed: wires the DeFi source
//! adapters into the snapshot aggregator, starts the price simulator,
//! and exposes read-only views of the current state.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use axum::{extract::State, routing::get, Json, Router};
use serde_json::{json, Value};
use tower_http::cors::{Any, CorsLayer};
use tracing::{debug, info};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use dashboard_core::DataSource;
use dashboard_defi::{
    BlockHeightSource, DefiClient, DefiClientConfig, GasPriceSource, ProtocolStatsSource,
    SpotPriceSource,
};
use dashboard_services::{
    AggregatorConfig, PriceSimulator, SimulatorConfig, SnapshotAggregator,
};

/// Application state shared across handlers
#[derive(Clone)]
struct AppState {
    aggregator: Arc<SnapshotAggregator>,
    simulator: Arc<PriceSimulator>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize logging
    tracing_subscriber::registry()
        .with(fmt::layer())
        .with(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("info,dashboard_api=debug")),
        )
        .init();

    info!("Starting DeFi Dashboard API");

    // Shared HTTP client for all DeFi sources
    let client_config = DefiClientConfig {
        rpc_url: env_string("DASHBOARD_RPC_URL", dashboard_defi::types::DEFAULT_RPC_URL),
        price_api_base: env_string(
            "DASHBOARD_PRICE_API",
            dashboard_defi::types::DEFAULT_PRICE_API_BASE,
        ),
        stats_api_base: env_string(
            "DASHBOARD_STATS_API",
            dashboard_defi::types::DEFAULT_STATS_API_BASE,
        ),
    };
    let client = DefiClient::new(client_config);

    let sources: Vec<Arc<dyn DataSource>> = vec![
        Arc::new(SpotPriceSource::new(client.clone(), "ethereum", "eth_price")),
        Arc::new(GasPriceSource::new(client.clone())),
        Arc::new(BlockHeightSource::new(client.clone())),
        Arc::new(ProtocolStatsSource::new(client.clone(), "aave")),
    ];

    // Snapshot aggregator
    let aggregator_config = AggregatorConfig {
        interval: Duration::from_secs(env_u64("DASHBOARD_AGG_INTERVAL_SECS", 5)),
        enabled: env_flag("DASHBOARD_AGG_ENABLED", true),
    };
    let aggregator = Arc::new(SnapshotAggregator::new(aggregator_config, sources));
    aggregator.start();

    // Price simulator
    let simulator_config = SimulatorConfig {
        interval: Duration::from_secs(env_u64("DASHBOARD_SIM_INTERVAL_SECS", 3)),
        enabled: env_flag("DASHBOARD_SIM_ENABLED", true),
        ..SimulatorConfig::default()
    };
    let simulator = Arc::new(PriceSimulator::new(simulator_config));
    simulator.start();

    // Debug-log every broadcast; also keeps one live subscriber on
    // each feed for the lifetime of the process.
    let _snapshot_log = aggregator.subscribe(|snapshot| {
        debug!(
            "snapshot broadcast: {}/{} sources ok, {} fields",
            snapshot.sources_ok,
            snapshot.sources_total,
            snapshot.fields.len()
        );
    });
    let _price_log = simulator.subscribe(|prices| {
        debug!("price broadcast: {} instruments", prices.prices.len());
    });

    let state = AppState {
        aggregator: Arc::clone(&aggregator),
        simulator: Arc::clone(&simulator),
    };

    let app = Router::new()
        .route("/health", get(health))
        .route("/snapshot", get(snapshot))
        .route("/prices", get(prices))
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .with_state(state);

    let port = env_u64("DASHBOARD_PORT", 3001) as u16;
    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!("Server running on http://{}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("Shutting down feed services");
    aggregator.stop();
    simulator.stop();

    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to listen for shutdown signal: {}", e);
    }
}

/// Liveness view, including the last tick's source success ratio so
/// the frontend can render connectivity indicators.
async fn health(State(state): State<AppState>) -> Json<Value> {
    let current = state.aggregator.current_snapshot();

    Json(json!({
        "status": "ok",
        "timestamp": chrono::Utc::now(),
        "aggregator": {
            "running": state.aggregator.is_running(),
            "sources_ok": current.sources_ok,
            "sources_total": current.sources_total,
            "success_ratio": current.success_ratio(),
            "updated_at": current.updated_at,
            "subscribers": state.aggregator.subscriber_count(),
        },
        "simulator": {
            "running": state.simulator.is_running(),
            "instruments": state.simulator.current_prices().prices.len(),
            "subscribers": state.simulator.subscriber_count(),
        },
    }))
}

/// Current merged snapshot
async fn snapshot(State(state): State<AppState>) -> Json<dashboard_core::Snapshot> {
    Json(state.aggregator.current_snapshot())
}

/// Current simulated price basket
async fn prices(State(state): State<AppState>) -> Json<dashboard_core::PriceMap> {
    Json(state.simulator.current_prices())
}

fn env_string(key: &str, default: &str) -> String {
    std::env::var(key).unwrap_or_else(|_| default.to_string())
}

fn env_u64(key: &str, default: u64) -> u64 {
    std::env::var(key)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

fn env_flag(key: &str, default: bool) -> bool {
    std::env::var(key)
        .ok()
        .map(|v| matches!(v.to_lowercase().as_str(), "1" | "true" | "yes"))
        .unwrap_or(default)
}
