//! Price Feed
//!
//! Holds the current prices for the tracked pair set and refreshes them on
//! a fixed period. Readers always get a usable snapshot: the last
//! successful fetch, or the built-in fallback table if no fetch has ever
//! succeeded. The snapshot is swapped wholesale behind an `Arc`, never
//! mutated in place, so request handlers cannot observe a torn update.
//!
//! Each successful refresh broadcasts one price update per symbol,
//! evaluates active alerts, and settles pending limit orders.

use crate::alerts::AlertService;
use crate::execution::ExecutionEngine;
use crate::notifications::NotificationHub;
use crate::source::MarketDataSource;
use chrono::Utc;
use parking_lot::RwLock;
use paper_core::{
    EngineError, PricePoint, PriceSnapshot, ServerMessage, SnapshotSource, SubscriptionKey,
};
use rust_decimal::Decimal;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

/// Default refresh period
pub const DEFAULT_REFRESH_PERIOD: Duration = Duration::from_secs(30);

/// Reference prices served until the first successful refresh
///
/// (symbol, mantissa, scale) triples; prices are indicative only and are
/// tagged `SnapshotSource::Fallback` so consumers can tell.
const FALLBACK_PRICES: &[(&str, i64, u32)] = &[
    ("BTC", 65_000, 0),
    ("ETH", 3_500, 0),
    ("BNB", 600, 0),
    ("SOL", 150, 0),
    ("ADA", 45, 2),
    ("XRP", 55, 2),
];

/// Errors from a refresh attempt
///
/// Never reaches a read path; `current()` keeps serving the previous
/// snapshot when a refresh fails.
#[derive(Debug, thiserror::Error)]
pub enum FeedError {
    #[error("Upstream unavailable: {0}")]
    Upstream(String),

    #[error("Upstream returned no prices")]
    EmptyResponse,
}

impl From<EngineError> for FeedError {
    fn from(err: EngineError) -> Self {
        FeedError::Upstream(err.to_string())
    }
}

/// Current-price feed with periodic background refresh
pub struct PriceFeed {
    /// Upstream provider, swappable for tests
    source: Arc<dyn MarketDataSource>,
    /// Bus for per-symbol price updates
    hub: Arc<NotificationHub>,
    /// Symbols tracked on every refresh
    symbols: Vec<String>,
    /// Current snapshot; swapped on refresh, cloned by readers
    snapshot: RwLock<Arc<PriceSnapshot>>,
    /// Evaluated against every fresh snapshot (set after wiring)
    alerts: RwLock<Option<Arc<AlertService>>>,
    /// Settles pending limit orders on every fresh snapshot (set after wiring)
    execution: RwLock<Option<Arc<ExecutionEngine>>>,
}

impl PriceFeed {
    /// Create a feed seeded with the fallback table
    pub fn new(
        source: Arc<dyn MarketDataSource>,
        hub: Arc<NotificationHub>,
        symbols: Vec<String>,
    ) -> Self {
        Self {
            source,
            hub,
            symbols,
            snapshot: RwLock::new(Arc::new(fallback_snapshot())),
            alerts: RwLock::new(None),
            execution: RwLock::new(None),
        }
    }

    /// Wire in the alert service evaluated on each tick
    pub fn set_alert_service(&self, alerts: Arc<AlertService>) {
        *self.alerts.write() = Some(alerts);
    }

    /// Wire in the execution engine whose pending orders settle on each tick
    pub fn set_execution_engine(&self, execution: Arc<ExecutionEngine>) {
        *self.execution.write() = Some(execution);
    }

    /// The current snapshot; never blocks on the network, never empty
    pub fn current(&self) -> Arc<PriceSnapshot> {
        Arc::clone(&self.snapshot.read())
    }

    /// Current price for one symbol
    pub fn price_of(&self, symbol: &str) -> Option<Decimal> {
        self.current().price_of(symbol)
    }

    /// The symbols this feed tracks
    pub fn symbols(&self) -> &[String] {
        &self.symbols
    }

    /// Fetch fresh prices and swap the snapshot
    ///
    /// On success the new snapshot is broadcast, alerts are evaluated, and
    /// pending orders settle. On failure the previous snapshot stays in
    /// place and the error is returned for the caller to log.
    pub async fn refresh(&self) -> Result<Arc<PriceSnapshot>, FeedError> {
        let prices = self.source.latest_prices(&self.symbols).await?;
        if prices.is_empty() {
            return Err(FeedError::EmptyResponse);
        }

        let snapshot = Arc::new(PriceSnapshot {
            prices,
            source: SnapshotSource::Live,
            refreshed_at: Utc::now(),
        });
        *self.snapshot.write() = Arc::clone(&snapshot);
        debug!("Price snapshot refreshed: {} symbols", snapshot.prices.len());

        self.broadcast(&snapshot);

        let alerts = self.alerts.read().clone();
        if let Some(alerts) = alerts {
            match alerts.evaluate(&snapshot) {
                Ok(fired) if fired > 0 => info!("{} price alerts triggered", fired),
                Ok(_) => {}
                Err(e) => warn!("Alert evaluation failed: {}", e),
            }
        }

        let execution = self.execution.read().clone();
        if let Some(execution) = execution {
            match execution.settle_pending(&snapshot).await {
                Ok(filled) if filled > 0 => info!("{} pending orders filled", filled),
                Ok(_) => {}
                Err(e) => warn!("Pending order settlement failed: {}", e),
            }
        }

        Ok(snapshot)
    }

    /// Publish one price update per symbol in the snapshot
    fn broadcast(&self, snapshot: &PriceSnapshot) {
        for point in snapshot.prices.values() {
            self.hub.publish(
                SubscriptionKey::ticker(point.symbol.clone()),
                ServerMessage::PriceUpdate {
                    symbol: point.symbol.clone(),
                    price: point.price,
                    change_24h: point.change_24h,
                    source: snapshot.source,
                    timestamp: point.updated_at,
                },
            );
        }
    }

    /// Start the periodic refresh loop
    ///
    /// The returned handle owns the background task; dropping it leaves the
    /// loop running, `shutdown()` stops it cleanly.
    pub fn spawn(self: &Arc<Self>, period: Duration) -> PriceFeedHandle {
        let feed = Arc::clone(self);
        let (shutdown_tx, mut shutdown_rx) = oneshot::channel::<()>();

        let task = tokio::spawn(async move {
            let mut ticker = tokio::time::interval(period);
            ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
            info!("Price feed refresh loop started ({:?} period)", period);

            loop {
                tokio::select! {
                    _ = &mut shutdown_rx => {
                        info!("Price feed refresh loop stopping");
                        break;
                    }
                    _ = ticker.tick() => {
                        if let Err(e) = feed.refresh().await {
                            let serving = match feed.current().source {
                                SnapshotSource::Live => "last-known-good prices",
                                SnapshotSource::Fallback => "fallback prices",
                            };
                            warn!("Price refresh failed ({}), serving {}", e, serving);
                        }
                    }
                }
            }
        });

        PriceFeedHandle {
            shutdown: Some(shutdown_tx),
            task,
        }
    }
}

/// Handle owning the background refresh task
pub struct PriceFeedHandle {
    shutdown: Option<oneshot::Sender<()>>,
    task: JoinHandle<()>,
}

impl PriceFeedHandle {
    /// Signal the refresh loop to stop and wait for it to finish
    pub async fn shutdown(mut self) {
        if let Some(tx) = self.shutdown.take() {
            let _ = tx.send(());
        }
        let _ = self.task.await;
    }
}

/// Build the built-in fallback snapshot
fn fallback_snapshot() -> PriceSnapshot {
    let now = Utc::now();
    let prices: HashMap<String, PricePoint> = FALLBACK_PRICES
        .iter()
        .map(|(symbol, mantissa, scale)| {
            (
                symbol.to_string(),
                PricePoint {
                    symbol: symbol.to_string(),
                    pair: format!("{}/USDT", symbol),
                    price: Decimal::new(*mantissa, *scale),
                    change_24h: Decimal::ZERO,
                    volume_24h: None,
                    market_cap: None,
                    updated_at: now,
                },
            )
        })
        .collect();

    PriceSnapshot {
        prices,
        source: SnapshotSource::Fallback,
        refreshed_at: now,
    }
}
