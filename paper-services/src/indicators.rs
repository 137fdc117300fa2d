//! Technical indicators
//!
//! Pure, stateless functions over a sequence of closing prices. Every
//! function validates its period up front and returns `InvalidParameter`
//! instead of truncated or partial output. All arithmetic stays in
//! `Decimal` end to end, so none of these can produce NaN.

use paper_core::{EngineError, EngineResult};
use rust_decimal::{Decimal, MathematicalOps};

/// One point of a MACD series
#[derive(Debug, Clone, PartialEq, serde::Serialize)]
pub struct MacdPoint {
    /// EMA(12) − EMA(26)
    pub macd: Decimal,
    /// EMA(9) of the MACD line
    pub signal: Decimal,
    /// macd − signal
    pub histogram: Decimal,
}

/// One point of a Bollinger Band series
#[derive(Debug, Clone, PartialEq, serde::Serialize)]
pub struct BollingerBand {
    /// SMA(period)
    pub middle: Decimal,
    /// middle + k·stddev
    pub upper: Decimal,
    /// middle − k·stddev
    pub lower: Decimal,
}

fn check_period(period: usize, len: usize) -> EngineResult<()> {
    if period == 0 {
        return Err(EngineError::invalid_parameter("period must be positive"));
    }
    if period > len {
        return Err(EngineError::invalid_parameter(format!(
            "period {} exceeds series length {}",
            period, len
        )));
    }
    Ok(())
}

/// Simple moving average
///
/// Output length is `closes.len() − period + 1`; indices inside the warm-up
/// window produce no output.
pub fn sma(closes: &[Decimal], period: usize) -> EngineResult<Vec<Decimal>> {
    check_period(period, closes.len())?;

    let divisor = Decimal::from(period as u64);
    let out = closes
        .windows(period)
        .map(|w| w.iter().copied().sum::<Decimal>() / divisor)
        .collect();
    Ok(out)
}

/// Exponential moving average
///
/// Seeded with the first close, so the output covers the full input length.
/// Early values lean on the seed more than an SMA-seeded EMA would; that
/// smoothing bias is the accepted trade-off for having no warm-up gap.
pub fn ema(closes: &[Decimal], period: usize) -> EngineResult<Vec<Decimal>> {
    check_period(period, closes.len())?;

    let multiplier = Decimal::TWO / Decimal::from(period as u64 + 1);
    let mut out = Vec::with_capacity(closes.len());
    let mut prev = closes[0];
    out.push(prev);
    for close in &closes[1..] {
        prev = (*close - prev) * multiplier + prev;
        out.push(prev);
    }
    Ok(out)
}

/// Relative strength index
///
/// Average gain and loss are simple means over the trailing `period` deltas.
/// Output length is `closes.len() − period` (one value per complete delta
/// window). A window with no losses yields exactly 100, never a division by
/// zero; output is always within [0, 100].
pub fn rsi(closes: &[Decimal], period: usize) -> EngineResult<Vec<Decimal>> {
    if period == 0 {
        return Err(EngineError::invalid_parameter("period must be positive"));
    }
    // One extra close is needed to form `period` deltas.
    if period >= closes.len() {
        return Err(EngineError::invalid_parameter(format!(
            "period {} needs at least {} closes, got {}",
            period,
            period + 1,
            closes.len()
        )));
    }

    let deltas: Vec<Decimal> = closes.windows(2).map(|w| w[1] - w[0]).collect();
    let divisor = Decimal::from(period as u64);
    let hundred = Decimal::ONE_HUNDRED;

    let out = deltas
        .windows(period)
        .map(|window| {
            let mut gains = Decimal::ZERO;
            let mut losses = Decimal::ZERO;
            for delta in window {
                if delta.is_sign_positive() {
                    gains += *delta;
                } else {
                    losses -= *delta;
                }
            }
            let avg_gain = gains / divisor;
            let avg_loss = losses / divisor;

            if avg_loss.is_zero() {
                hundred
            } else {
                let rs = avg_gain / avg_loss;
                hundred - hundred / (Decimal::ONE + rs)
            }
        })
        .collect();
    Ok(out)
}

/// MACD with the conventional 12/26/9 parameters
///
/// All three output series cover the full input length, inheriting the EMA
/// seeding behavior. Requires at least 26 closes.
pub fn macd(closes: &[Decimal]) -> EngineResult<Vec<MacdPoint>> {
    const FAST: usize = 12;
    const SLOW: usize = 26;
    const SIGNAL: usize = 9;

    check_period(SLOW, closes.len())?;

    let fast = ema(closes, FAST)?;
    let slow = ema(closes, SLOW)?;
    let macd_line: Vec<Decimal> = fast.iter().zip(&slow).map(|(f, s)| *f - *s).collect();
    let signal_line = ema(&macd_line, SIGNAL)?;

    let out = macd_line
        .iter()
        .zip(&signal_line)
        .map(|(m, s)| MacdPoint {
            macd: *m,
            signal: *s,
            histogram: *m - *s,
        })
        .collect();
    Ok(out)
}

/// Bollinger Bands
///
/// Middle band is SMA(period); upper and lower sit `k` population standard
/// deviations away (variance divides by `period`, not `period − 1`).
/// Output length matches [`sma`].
pub fn bollinger(closes: &[Decimal], period: usize, k: Decimal) -> EngineResult<Vec<BollingerBand>> {
    check_period(period, closes.len())?;
    if k.is_sign_negative() {
        return Err(EngineError::invalid_parameter("k must be non-negative"));
    }

    let divisor = Decimal::from(period as u64);
    let out = closes
        .windows(period)
        .map(|window| {
            let mean = window.iter().copied().sum::<Decimal>() / divisor;
            let variance = window
                .iter()
                .map(|x| {
                    let d = *x - mean;
                    d * d
                })
                .sum::<Decimal>()
                / divisor;
            let stddev = variance.sqrt().unwrap_or(Decimal::ZERO);
            BollingerBand {
                middle: mean,
                upper: mean + k * stddev,
                lower: mean - k * stddev,
            }
        })
        .collect();
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn closes(values: &[i64]) -> Vec<Decimal> {
        values.iter().map(|v| Decimal::from(*v)).collect()
    }

    #[test]
    fn test_sma_lengths_and_values() {
        let input = closes(&[1, 2, 3, 4, 5]);
        let out = sma(&input, 3).unwrap();
        assert_eq!(out.len(), 3);
        assert_eq!(out, vec![dec!(2), dec!(3), dec!(4)]);
    }

    #[test]
    fn test_sma_period_equal_to_length() {
        let input = closes(&[2, 4, 6]);
        let out = sma(&input, 3).unwrap();
        assert_eq!(out, vec![dec!(4)]);
    }

    #[test]
    fn test_ema_full_length_and_seed() {
        let input = closes(&[10, 11, 12, 13]);
        let out = ema(&input, 3).unwrap();
        assert_eq!(out.len(), input.len());
        assert_eq!(out[0], dec!(10));
        // multiplier = 2/4 = 0.5: 10 -> 10.5 -> 11.25 -> 12.125
        assert_eq!(out[1], dec!(10.5));
        assert_eq!(out[2], dec!(11.25));
        assert_eq!(out[3], dec!(12.125));
    }

    #[test]
    fn test_rejects_bad_periods() {
        let input = closes(&[1, 2, 3]);
        assert!(matches!(
            sma(&input, 0),
            Err(EngineError::InvalidParameter(_))
        ));
        assert!(matches!(
            sma(&input, 4),
            Err(EngineError::InvalidParameter(_))
        ));
        assert!(matches!(
            ema(&input, 0),
            Err(EngineError::InvalidParameter(_))
        ));
        assert!(matches!(
            rsi(&input, 3),
            Err(EngineError::InvalidParameter(_))
        ));
        assert!(matches!(
            bollinger(&input, 5, dec!(2)),
            Err(EngineError::InvalidParameter(_))
        ));
    }

    #[test]
    fn test_rsi_all_gains_clamps_to_100() {
        let input = closes(&[1, 2, 3, 4, 5, 6]);
        let out = rsi(&input, 3).unwrap();
        assert!(!out.is_empty());
        for value in out {
            assert_eq!(value, dec!(100));
        }
    }

    #[test]
    fn test_rsi_all_losses_is_zero() {
        let input = closes(&[6, 5, 4, 3, 2, 1]);
        let out = rsi(&input, 3).unwrap();
        for value in out {
            assert_eq!(value, Decimal::ZERO);
        }
    }

    #[test]
    fn test_rsi_stays_within_bounds() {
        let input = closes(&[44, 47, 45, 50, 43, 48, 46, 52, 41, 49, 45, 51]);
        let out = rsi(&input, 4).unwrap();
        assert_eq!(out.len(), input.len() - 1 - 4 + 1);
        for value in out {
            assert!(value >= Decimal::ZERO && value <= dec!(100), "rsi {}", value);
        }
    }

    #[test]
    fn test_rsi_balanced_series_is_50() {
        // Alternating +1/-1 deltas: avg gain == avg loss, RS = 1, RSI = 50
        let input = closes(&[10, 11, 10, 11, 10, 11, 10]);
        let out = rsi(&input, 4).unwrap();
        for value in out {
            assert_eq!(value, dec!(50));
        }
    }

    #[test]
    fn test_macd_requires_26_closes() {
        let input = closes(&[1; 25]);
        assert!(matches!(
            macd(&input),
            Err(EngineError::InvalidParameter(_))
        ));
    }

    #[test]
    fn test_macd_flat_series_is_zero() {
        let input = closes(&[100; 30]);
        let out = macd(&input).unwrap();
        assert_eq!(out.len(), 30);
        for point in out {
            assert_eq!(point.macd, Decimal::ZERO);
            assert_eq!(point.signal, Decimal::ZERO);
            assert_eq!(point.histogram, Decimal::ZERO);
        }
    }

    #[test]
    fn test_bollinger_flat_series_collapses() {
        let input = closes(&[50; 10]);
        let out = bollinger(&input, 5, dec!(2)).unwrap();
        assert_eq!(out.len(), 6);
        for band in out {
            assert_eq!(band.middle, dec!(50));
            assert_eq!(band.upper, dec!(50));
            assert_eq!(band.lower, dec!(50));
        }
    }

    #[test]
    fn test_bollinger_population_stddev() {
        // Window [2, 4, 6]: mean 4, population variance (4+0+4)/3 = 8/3
        let input = closes(&[2, 4, 6]);
        let out = bollinger(&input, 3, dec!(1)).unwrap();
        assert_eq!(out.len(), 1);
        let band = &out[0];
        assert_eq!(band.middle, dec!(4));
        let spread = band.upper - band.middle;
        // sqrt(8/3) ~= 1.63299
        assert!((spread - dec!(1.63299)).abs() < dec!(0.001));
        assert_eq!(band.middle - band.lower, spread);
    }
}
