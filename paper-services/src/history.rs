//! Historical series
//!
//! Serves daily OHLCV candles for a symbol. The upstream market chart is
//! bucketed into daily candles when available; otherwise a bounded random
//! walk anchored at the current feed price fills in. All randomness lives
//! behind the `SyntheticSeriesPolicy` seam, and synthetic output is tagged
//! so it can never pass as real data.

use crate::price_feed::PriceFeed;
use crate::source::MarketDataSource;
use chrono::{DateTime, Duration, Utc};
use paper_core::{Candle, CandleSeries, ChartPoint, EngineError, EngineResult};
use rand::Rng;
use rust_decimal::prelude::{FromPrimitive, ToPrimitive};
use rust_decimal::Decimal;
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::warn;

/// Seconds per daily bucket
const DAY_SECS: i64 = 86_400;

/// Longest series a caller may request
const MAX_DAYS: u32 = 365;

/// Strategy for synthesizing a candle series when upstream data is missing
///
/// Implementations are explicitly non-reproducible; callers must only rely
/// on structural invariants (ordering, OHLC relations, positive volume),
/// never on exact values.
pub trait SyntheticSeriesPolicy: Send + Sync {
    /// Generate `days` daily candles ending now, anchored at `anchor_price`
    fn generate(&self, days: u32, anchor_price: Decimal) -> Vec<Candle>;
}

/// Bounded random walk around the anchor price
///
/// Each day closes within ±3% of its open, and wicks extend at most 1%
/// beyond the body, so high ≥ max(open, close) and low ≤ min(open, close)
/// hold by construction.
pub struct RandomWalk;

/// Maximum daily close-to-close move
const MAX_STEP: f64 = 0.03;
/// Maximum wick beyond the candle body
const MAX_WICK: f64 = 0.01;

impl SyntheticSeriesPolicy for RandomWalk {
    fn generate(&self, days: u32, anchor_price: Decimal) -> Vec<Candle> {
        let mut rng = rand::rng();
        let anchor = anchor_price.to_f64().unwrap_or(1.0).max(f64::MIN_POSITIVE);

        // Walk backwards from the anchor so the series ends near the
        // current price, then emit oldest first.
        let mut closes = Vec::with_capacity(days as usize);
        let mut price = anchor;
        for _ in 0..days {
            closes.push(price);
            let step: f64 = rng.random_range(-MAX_STEP..MAX_STEP);
            price = (price * (1.0 - step)).max(anchor * 0.01);
        }
        closes.reverse();

        let today = Utc::now().date_naive().and_hms_opt(0, 0, 0);
        let today: DateTime<Utc> = today
            .map(|t| t.and_utc())
            .unwrap_or_else(Utc::now);

        let mut candles = Vec::with_capacity(days as usize);
        let mut prev_close = closes.first().copied().unwrap_or(anchor);
        for (i, close) in closes.iter().enumerate() {
            let open = prev_close;
            let body_high = open.max(*close);
            let body_low = open.min(*close);
            let high = body_high * (1.0 + rng.random_range(0.0..MAX_WICK));
            let low = body_low * (1.0 - rng.random_range(0.0..MAX_WICK));
            let volume = rng.random_range(1.0e6..5.0e7);

            let timestamp = today - Duration::days((days as i64) - 1 - i as i64);
            candles.push(Candle {
                timestamp,
                open: decimal_or(open, anchor_price),
                high: decimal_or(high, anchor_price),
                low: decimal_or(low, anchor_price),
                close: decimal_or(*close, anchor_price),
                volume: decimal_or(volume, Decimal::ONE),
            });
            prev_close = *close;
        }
        candles
    }
}

fn decimal_or(value: f64, fallback: Decimal) -> Decimal {
    Decimal::from_f64(value)
        .map(|d| d.round_dp(8))
        .unwrap_or(fallback)
}

/// Daily candle history service
pub struct HistoryService {
    source: Arc<dyn MarketDataSource>,
    feed: Arc<PriceFeed>,
    policy: Box<dyn SyntheticSeriesPolicy>,
}

impl HistoryService {
    /// Create a service with the default random-walk fallback
    pub fn new(source: Arc<dyn MarketDataSource>, feed: Arc<PriceFeed>) -> Self {
        Self::with_policy(source, feed, Box::new(RandomWalk))
    }

    /// Create a service with a specific synthetic policy
    pub fn with_policy(
        source: Arc<dyn MarketDataSource>,
        feed: Arc<PriceFeed>,
        policy: Box<dyn SyntheticSeriesPolicy>,
    ) -> Self {
        Self {
            source,
            feed,
            policy,
        }
    }

    /// Daily candles for a symbol, oldest first
    ///
    /// Upstream failure or an empty chart falls back to the synthetic
    /// policy; the caller can tell from the `synthetic` flag. Only a symbol
    /// with no known price at all fails, with `NoPriceAvailable`.
    pub async fn series(&self, symbol: &str, days: u32) -> EngineResult<CandleSeries> {
        if days == 0 || days > MAX_DAYS {
            return Err(EngineError::invalid_parameter(format!(
                "days must be between 1 and {}, got {}",
                MAX_DAYS, days
            )));
        }

        match self.source.price_history(symbol, days).await {
            Ok(points) if !points.is_empty() => Ok(CandleSeries {
                symbol: symbol.to_string(),
                days,
                candles: bucket_daily(&points),
                synthetic: false,
            }),
            Ok(_) => {
                warn!("Upstream returned empty chart for {}, synthesizing", symbol);
                self.synthesize(symbol, days)
            }
            Err(e) => {
                warn!(
                    "Upstream chart fetch failed for {} ({}), synthesizing",
                    symbol, e
                );
                self.synthesize(symbol, days)
            }
        }
    }

    fn synthesize(&self, symbol: &str, days: u32) -> EngineResult<CandleSeries> {
        let anchor = self
            .feed
            .price_of(symbol)
            .ok_or_else(|| EngineError::no_price(symbol))?;

        Ok(CandleSeries {
            symbol: symbol.to_string(),
            days,
            candles: self.policy.generate(days, anchor),
            synthetic: true,
        })
    }
}

/// Bucket raw chart points into daily OHLCV candles, oldest first
///
/// Open and close come from the first and last point of each bucket, volume
/// from the last point (upstream volumes are rolling 24h figures).
fn bucket_daily(points: &[ChartPoint]) -> Vec<Candle> {
    let mut buckets: BTreeMap<i64, Vec<&ChartPoint>> = BTreeMap::new();
    for point in points {
        let bucket = (point.timestamp.timestamp() / DAY_SECS) * DAY_SECS;
        buckets.entry(bucket).or_default().push(point);
    }

    buckets
        .into_iter()
        .filter_map(|(bucket_ts, mut bucket)| {
            bucket.sort_by_key(|p| p.timestamp);
            let first = bucket.first()?;
            let last = bucket.last()?;
            let high = bucket.iter().map(|p| p.price).max()?;
            let low = bucket.iter().map(|p| p.price).min()?;

            Some(Candle {
                timestamp: DateTime::from_timestamp(bucket_ts, 0)?,
                open: first.price,
                high,
                low,
                close: last.price,
                volume: last.volume,
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::notifications::NotificationHub;
    use crate::source::testing::{FailingSource, StaticSource};
    use rust_decimal_macros::dec;

    async fn feed_with(prices: &[(&str, Decimal)]) -> Arc<PriceFeed> {
        let feed = Arc::new(PriceFeed::new(
            Arc::new(StaticSource::new(prices)),
            Arc::new(NotificationHub::new()),
            prices.iter().map(|(s, _)| s.to_string()).collect(),
        ));
        feed.refresh().await.unwrap();
        feed
    }

    fn chart_point(secs: i64, price: Decimal) -> ChartPoint {
        ChartPoint {
            timestamp: DateTime::from_timestamp(secs, 0).unwrap(),
            price,
            volume: dec!(1000),
        }
    }

    fn assert_ohlc_invariants(series: &CandleSeries) {
        let mut prev_ts = None;
        for candle in &series.candles {
            assert!(candle.high >= candle.open.max(candle.close));
            assert!(candle.low <= candle.open.min(candle.close));
            assert!(candle.low > Decimal::ZERO);
            assert!(candle.volume > Decimal::ZERO);
            if let Some(prev) = prev_ts {
                assert!(candle.timestamp > prev, "candles must be oldest first");
            }
            prev_ts = Some(candle.timestamp);
        }
    }

    #[tokio::test]
    async fn test_rejects_bad_day_ranges() {
        let feed = feed_with(&[("BTC", dec!(60000))]).await;
        let service = HistoryService::new(Arc::new(FailingSource), feed);

        assert!(matches!(
            service.series("BTC", 0).await,
            Err(EngineError::InvalidParameter(_))
        ));
        assert!(matches!(
            service.series("BTC", 366).await,
            Err(EngineError::InvalidParameter(_))
        ));
    }

    #[tokio::test]
    async fn test_upstream_points_bucket_into_days() {
        // Two points in day 0, three in day 1
        let chart = vec![
            chart_point(3_600, dec!(100)),
            chart_point(7_200, dec!(110)),
            chart_point(DAY_SECS + 3_600, dec!(105)),
            chart_point(DAY_SECS + 7_200, dec!(95)),
            chart_point(DAY_SECS + 10_800, dec!(102)),
        ];
        let source = StaticSource::new(&[("BTC", dec!(60000))]).with_chart(chart);
        let feed = feed_with(&[("BTC", dec!(60000))]).await;
        let service = HistoryService::new(Arc::new(source), feed);

        let series = service.series("BTC", 2).await.unwrap();
        assert!(!series.synthetic);
        assert_eq!(series.candles.len(), 2);

        let day0 = &series.candles[0];
        assert_eq!(day0.open, dec!(100));
        assert_eq!(day0.close, dec!(110));
        assert_eq!(day0.high, dec!(110));
        assert_eq!(day0.low, dec!(100));

        let day1 = &series.candles[1];
        assert_eq!(day1.open, dec!(105));
        assert_eq!(day1.close, dec!(102));
        assert_eq!(day1.high, dec!(105));
        assert_eq!(day1.low, dec!(95));

        assert_ohlc_invariants(&series);
    }

    #[tokio::test]
    async fn test_upstream_failure_synthesizes_tagged_series() {
        let feed = feed_with(&[("BTC", dec!(60000))]).await;
        let service = HistoryService::new(Arc::new(FailingSource), feed);

        let series = service.series("BTC", 30).await.unwrap();
        assert!(series.synthetic);
        assert_eq!(series.candles.len(), 30);
        assert_ohlc_invariants(&series);

        // Anchored: the final close sits at the current feed price
        let last = series.latest().unwrap();
        assert_eq!(last.close, dec!(60000));
    }

    #[tokio::test]
    async fn test_empty_chart_synthesizes() {
        let source = StaticSource::new(&[("BTC", dec!(60000))]).with_chart(Vec::new());
        let feed = feed_with(&[("BTC", dec!(60000))]).await;
        let service = HistoryService::new(Arc::new(source), feed);

        let series = service.series("BTC", 7).await.unwrap();
        assert!(series.synthetic);
        assert_eq!(series.candles.len(), 7);
        assert_ohlc_invariants(&series);
    }

    #[tokio::test]
    async fn test_unknown_symbol_with_no_anchor_fails() {
        // Feed has no DOGE price, not even in the snapshot
        let feed = Arc::new(PriceFeed::new(
            Arc::new(FailingSource),
            Arc::new(NotificationHub::new()),
            vec!["DOGE".to_string()],
        ));
        let service = HistoryService::new(Arc::new(FailingSource), feed);

        assert!(matches!(
            service.series("DOGE", 7).await,
            Err(EngineError::NoPriceAvailable(_))
        ));
    }

    #[test]
    fn test_random_walk_structural_invariants() {
        let candles = RandomWalk.generate(90, dec!(50000));
        assert_eq!(candles.len(), 90);
        let series = CandleSeries {
            symbol: "BTC".to_string(),
            days: 90,
            candles,
            synthetic: true,
        };
        assert_ohlc_invariants(&series);
    }
}
