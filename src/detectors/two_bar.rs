//! Two-bar candlestick pattern detectors
//!
//! Bullish and Bearish Engulfing: the current body fully engulfs the prior
//! opposite-coloured body and is itself large.

use super::helpers::{self, is_significant};
use super::DetectorThresholds;
use crate::catalog::PatternKind;
use crate::{AnalysisError, CandleContext, OHLCVExt, PatternDetector, PatternMatch, Result, OHLCV};

impl_with_defaults!(EngulfingDetector);

// ============================================================
// ENGULFING PATTERNS
// ============================================================

/// Engulfing (bullish and bearish)
#[derive(Debug, Clone, Copy)]
pub struct EngulfingDetector {
    pub significance_floor: f64,
    pub avg_body_factor: f64,
}

impl Default for EngulfingDetector {
    fn default() -> Self {
        Self {
            significance_floor: helpers::SIGNIFICANCE_FLOOR,
            avg_body_factor: helpers::VOLATILITY_FACTOR,
        }
    }
}

impl EngulfingDetector {
    pub fn from_thresholds(t: &DetectorThresholds) -> Self {
        Self {
            significance_floor: t.significance_floor.get(),
            avg_body_factor: t.volatility_factor,
        }
    }
}

impl PatternDetector for EngulfingDetector {
    fn name(&self) -> &'static str {
        "Engulfing"
    }

    fn min_bars(&self) -> usize {
        2
    }

    fn detect<T: OHLCV>(
        &self,
        bars: &[T],
        index: usize,
        contexts: &[CandleContext],
    ) -> Option<PatternMatch> {
        if index < 1 {
            return None;
        }
        let prev = bars.get(index - 1)?;
        let curr = bars.get(index)?;
        let ctx = contexts.get(index)?;

        let kind = if prev.is_bearish()
            && curr.is_bullish()
            && curr.open() < prev.close()
            && curr.close() > prev.open()
        {
            PatternKind::BullishEngulfing
        } else if prev.is_bullish()
            && curr.is_bearish()
            && curr.open() > prev.close()
            && curr.close() < prev.open()
        {
            PatternKind::BearishEngulfing
        } else {
            return None;
        };

        if !is_significant(
            curr.body(),
            curr.close(),
            self.significance_floor,
            ctx.avg_body,
            self.avg_body_factor,
        ) {
            return None;
        }

        Some(PatternMatch {
            kind,
            start_index: index - 1,
            end_index: index,
        })
    }

    fn validate_config(&self) -> Result<()> {
        if self.significance_floor < 0.0 || self.avg_body_factor < 0.0 {
            return Err(AnalysisError::InvalidConfig(
                "engulfing thresholds must be non-negative".into(),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Bar;

    /// Contexts for a two-bar slice; only the second bar's entry is read
    fn ctx(avg_body: f64) -> [CandleContext; 2] {
        let c = CandleContext { avg_body, avg_range: avg_body * 2.0 };
        [c, c]
    }

    #[test]
    fn test_bullish_engulfing() {
        let bars = [
            Bar::new(0, 60.0, 61.0, 59.0, 59.5, 1.0),
            Bar::new(1, 59.0, 62.0, 58.0, 61.5, 1.0),
        ];
        let m = EngulfingDetector::with_defaults().detect(&bars, 1, &ctx(1.0)).unwrap();
        assert_eq!(m.kind, PatternKind::BullishEngulfing);
        assert_eq!((m.start_index, m.end_index), (0, 1));
    }

    #[test]
    fn test_bearish_engulfing() {
        let bars = [
            Bar::new(0, 59.5, 61.0, 59.0, 60.0, 1.0),
            Bar::new(1, 60.5, 61.0, 58.0, 59.0, 1.0),
        ];
        let m = EngulfingDetector::with_defaults().detect(&bars, 1, &ctx(1.0)).unwrap();
        assert_eq!(m.kind, PatternKind::BearishEngulfing);
    }

    #[test]
    fn test_touching_open_is_not_engulfing() {
        // open equal to the prior close is not beyond it
        let bars = [
            Bar::new(0, 60.0, 61.0, 59.0, 59.5, 1.0),
            Bar::new(1, 59.5, 62.0, 59.0, 61.5, 1.0),
        ];
        assert!(EngulfingDetector::with_defaults().detect(&bars, 1, &ctx(1.0)).is_none());
    }

    #[test]
    fn test_small_engulfing_body_rejected() {
        // body 2.5 is below 0.8 * 4.0
        let bars = [
            Bar::new(0, 60.0, 61.0, 59.0, 59.5, 1.0),
            Bar::new(1, 59.0, 62.0, 58.0, 61.5, 1.0),
        ];
        assert!(EngulfingDetector::with_defaults().detect(&bars, 1, &ctx(4.0)).is_none());
    }
}
