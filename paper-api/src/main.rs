//! Paper Trading Terminal API Server
//!
//! HTTP/WebSocket server wrapping the simulation core: live-ish prices
//! from CoinGecko, simulated order execution, portfolio valuation, and
//! streaming updates.

mod routes;

use axum::Router;
use paper_coingecko::{tracked_symbols, CoinGeckoClient};
use paper_services::{
    AccountRepository, AlertService, ExecutionEngine, HistoryService, MarketDataSource,
    NotificationHub, PortfolioService, PriceFeed, SqliteAccountStore, DEFAULT_REFRESH_PERIOD,
};
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tower_http::cors::{Any, CorsLayer};
use tracing::info;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    pub feed: Arc<PriceFeed>,
    pub engine: Arc<ExecutionEngine>,
    pub history: Arc<HistoryService>,
    pub portfolio: Arc<PortfolioService>,
    pub alerts: Arc<AlertService>,
    pub hub: Arc<NotificationHub>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment variables from .env.local file
    if let Err(e) = dotenvy::from_filename(".env.local") {
        // Not an error if the file doesn't exist
        if !matches!(e, dotenvy::Error::Io(_)) {
            eprintln!("Warning: Failed to load .env.local: {}", e);
        }
    }

    // Initialize logging
    tracing_subscriber::registry()
        .with(fmt::layer())
        .with(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("info,paper_api=debug")),
        )
        .init();

    info!("Starting Paper Trading Terminal API");

    // Upstream market data client
    let coingecko = match std::env::var("COINGECKO_BASE_URL") {
        Ok(base) => CoinGeckoClient::with_base_url(base),
        Err(_) => CoinGeckoClient::new(),
    };
    let source: Arc<dyn MarketDataSource> = Arc::new(coingecko);

    // Account store (SQLite)
    let db_path =
        std::env::var("ACCOUNTS_DB_PATH").unwrap_or_else(|_| "data/accounts.db".to_string());
    info!("Initializing account store at: {}", db_path);
    let store: Arc<dyn AccountRepository> = Arc::new(
        SqliteAccountStore::new(&db_path).expect("Failed to initialize account store"),
    );

    // Notification hub and the service graph around the feed
    let hub = Arc::new(NotificationHub::new());
    let feed = Arc::new(PriceFeed::new(
        Arc::clone(&source),
        Arc::clone(&hub),
        tracked_symbols(),
    ));
    let engine = Arc::new(ExecutionEngine::new(
        Arc::clone(&store),
        Arc::clone(&feed),
        Arc::clone(&hub),
    ));
    let alerts = Arc::new(AlertService::new(Arc::clone(&store), Arc::clone(&hub)));
    let history = Arc::new(HistoryService::new(Arc::clone(&source), Arc::clone(&feed)));
    let portfolio = Arc::new(PortfolioService::new(Arc::clone(&store), Arc::clone(&feed)));

    // Each refresh tick also evaluates alerts and settles pending orders
    feed.set_alert_service(Arc::clone(&alerts));
    feed.set_execution_engine(Arc::clone(&engine));

    // Warm the snapshot before serving, then refresh periodically
    if let Err(e) = feed.refresh().await {
        tracing::warn!("Initial price refresh failed ({}), serving fallback prices", e);
    }
    let refresh_period = std::env::var("FEED_REFRESH_SECS")
        .ok()
        .and_then(|v| v.parse::<u64>().ok())
        .map(Duration::from_secs)
        .unwrap_or(DEFAULT_REFRESH_PERIOD);
    let feed_handle = feed.spawn(refresh_period);

    let state = AppState {
        feed,
        engine,
        history,
        portfolio,
        alerts,
        hub,
    };

    // CORS for the web UI
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let app = Router::new()
        .nest("/api", routes::api_routes())
        .merge(routes::ws_routes())
        .layer(cors)
        .with_state(state);

    let port: u16 = std::env::var("SERVER_PORT")
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(3001);
    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    info!("Listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(async {
            let _ = tokio::signal::ctrl_c().await;
            info!("Shutdown signal received");
        })
        .await?;

    feed_handle.shutdown().await;
    info!("Price feed stopped, goodbye");
    Ok(())
}
