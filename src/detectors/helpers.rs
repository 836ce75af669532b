//! Common helper functions for candlestick pattern detection
//!
//! Default thresholds and the significance checks shared by all detector modules.

use crate::{OHLCVExt, OHLCV};

// ============================================================
// DEFAULT THRESHOLDS
// ============================================================

/// Absolute significance floor: size > close * SIGNIFICANCE_FLOOR (0.3%)
pub const SIGNIFICANCE_FLOOR: f64 = 0.003;
/// Volatility-relative floor: size > trailing average * VOLATILITY_FACTOR
pub const VOLATILITY_FACTOR: f64 = 0.8;
/// Star (middle) body: body < trailing average body * STAR_BODY_FACTOR
pub const STAR_BODY_FACTOR: f64 = 0.5;
/// Marubozu body: body > trailing average body * MARUBOZU_AVG_FACTOR
pub const MARUBOZU_AVG_FACTOR: f64 = 1.2;
/// Doji: body <= range * DOJI_BODY_RATIO
pub const DOJI_BODY_RATIO: f64 = 0.1;
/// Hammer/Shooting Star dominant shadow: shadow >= body * SHADOW_FACTOR
pub const SHADOW_FACTOR: f64 = 2.0;
/// Hammer/Shooting Star opposite shadow: shadow <= body * OPPOSITE_SHADOW_RATIO
pub const OPPOSITE_SHADOW_RATIO: f64 = 0.1;
/// Marubozu: body >= range * MARUBOZU_BODY_RATIO
pub const MARUBOZU_BODY_RATIO: f64 = 0.97;
/// Trailing window for average body/range
pub const CANDLE_PERIOD: usize = 14;

// ============================================================
// SIGNIFICANCE CHECKS
// ============================================================

/// Size clears the absolute floor relative to the bar's close
#[inline]
pub fn exceeds_floor(size: f64, close: f64, floor: f64) -> bool {
    size > close.abs() * floor
}

/// Size clears the volatility-relative floor
#[inline]
pub fn exceeds_average(size: f64, average: f64, factor: f64) -> bool {
    size > average * factor
}

/// Both floors at once - the test every "large" candle must pass
#[inline]
pub fn is_significant(size: f64, close: f64, floor: f64, average: f64, factor: f64) -> bool {
    exceeds_floor(size, close, floor) && exceeds_average(size, average, factor)
}

/// Body small enough to count as indecision
#[inline]
pub fn is_doji(body: f64, range: f64, ratio: f64) -> bool {
    range > 0.0 && body <= range * ratio
}

/// One shadow dominates the body while the other is nearly absent
#[inline]
pub fn is_shadow_dominant(dominant: f64, opposite: f64, body: f64, factor: f64, opposite_ratio: f64) -> bool {
    dominant >= body * factor && opposite <= body * opposite_ratio
}

// ============================================================
// TRAILING AVERAGES
// ============================================================

/// Mean of `f` over the window of up to `period` bars ending at `at` (inclusive).
#[inline]
fn trailing_mean<T: OHLCV>(bars: &[T], at: usize, period: usize, f: impl Fn(&T) -> f64) -> f64 {
    if bars.is_empty() {
        return 0.0;
    }
    let at = at.min(bars.len() - 1);
    let start = (at + 1).saturating_sub(period.max(1));
    let slice = &bars[start..=at];
    slice.iter().map(f).sum::<f64>() / slice.len() as f64
}

/// Trailing average body at a specific bar index.
#[inline]
pub fn trailing_avg_body<T: OHLCV>(bars: &[T], at: usize, period: usize) -> f64 {
    trailing_mean(bars, at, period, |b| b.body())
}

/// Trailing average range at a specific bar index.
#[inline]
pub fn trailing_avg_range<T: OHLCV>(bars: &[T], at: usize, period: usize) -> f64 {
    trailing_mean(bars, at, period, |b| b.range())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Bar;

    fn bars() -> Vec<Bar> {
        vec![
            Bar::new(0, 10.0, 12.0, 9.0, 11.0, 1.0),  // body 1, range 3
            Bar::new(1, 11.0, 14.0, 10.0, 14.0, 1.0), // body 3, range 4
            Bar::new(2, 14.0, 16.0, 11.0, 12.0, 1.0), // body 2, range 5
        ]
    }

    #[test]
    fn test_trailing_window_includes_current_bar() {
        let bars = bars();
        assert_eq!(trailing_avg_body(&bars, 0, 14), 1.0);
        assert_eq!(trailing_avg_body(&bars, 1, 14), 2.0);
        assert_eq!(trailing_avg_body(&bars, 2, 14), 2.0);
        assert_eq!(trailing_avg_range(&bars, 2, 2), 4.5);
    }

    #[test]
    fn test_trailing_empty() {
        let bars: Vec<Bar> = vec![];
        assert_eq!(trailing_avg_body(&bars, 0, 14), 0.0);
    }

    #[test]
    fn test_significance() {
        // 0.3% of 100 = 0.3
        assert!(!exceeds_floor(0.3, 100.0, SIGNIFICANCE_FLOOR));
        assert!(exceeds_floor(0.31, 100.0, SIGNIFICANCE_FLOOR));
        assert!(is_significant(2.0, 100.0, SIGNIFICANCE_FLOOR, 2.0, VOLATILITY_FACTOR));
        assert!(!is_significant(1.5, 100.0, SIGNIFICANCE_FLOOR, 2.0, VOLATILITY_FACTOR));
    }

    #[test]
    fn test_doji_requires_range() {
        assert!(is_doji(0.0, 1.0, DOJI_BODY_RATIO));
        assert!(is_doji(0.1, 1.0, DOJI_BODY_RATIO));
        assert!(!is_doji(0.11, 1.0, DOJI_BODY_RATIO));
        assert!(!is_doji(0.0, 0.0, DOJI_BODY_RATIO));
    }
}
