//! Three-bar candlestick pattern detectors
//!
//! Morning Star and Evening Star. Each leg is measured against the candle
//! context at its own position, so a large third bar does not dilute the
//! test applied to the first.

use super::helpers::{self, is_significant};
use super::DetectorThresholds;
use crate::catalog::PatternKind;
use crate::{AnalysisError, CandleContext, OHLCVExt, PatternDetector, PatternMatch, Result, OHLCV};

impl_with_defaults!(MorningStarDetector, EveningStarDetector);

// ============================================================
// STAR GEOMETRY
// ============================================================

/// Thresholds shared by both star patterns
#[derive(Debug, Clone, Copy)]
pub struct StarGeometry {
    pub significance_floor: f64,
    pub avg_body_factor: f64,
    pub star_body_factor: f64,
}

impl Default for StarGeometry {
    fn default() -> Self {
        Self {
            significance_floor: helpers::SIGNIFICANCE_FLOOR,
            avg_body_factor: helpers::VOLATILITY_FACTOR,
            star_body_factor: helpers::STAR_BODY_FACTOR,
        }
    }
}

impl StarGeometry {
    fn from_thresholds(t: &DetectorThresholds) -> Self {
        Self {
            significance_floor: t.significance_floor.get(),
            avg_body_factor: t.volatility_factor,
            star_body_factor: t.star_body_factor,
        }
    }

    /// Checks the size structure (large, star, large) of the window ending at
    /// `index` and returns the three bars when it holds.
    fn legs<'a, T: OHLCV>(
        &self,
        bars: &'a [T],
        index: usize,
        contexts: &[CandleContext],
    ) -> Option<(&'a T, &'a T, &'a T)> {
        if index < 2 {
            return None;
        }
        let first = bars.get(index - 2)?;
        let star = bars.get(index - 1)?;
        let third = bars.get(index)?;
        if !first.is_consistent() {
            return None;
        }
        let [first_ctx, star_ctx, third_ctx] = contexts.get(index - 2..=index)? else {
            return None;
        };

        let large = |bar: &T, ctx: &CandleContext| {
            is_significant(bar.body(), bar.close(), self.significance_floor, ctx.avg_body, self.avg_body_factor)
        };

        if !large(first, first_ctx) {
            return None;
        }
        if star.body() >= star_ctx.avg_body * self.star_body_factor {
            return None;
        }
        if !large(third, third_ctx) {
            return None;
        }

        Some((first, star, third))
    }

    fn validate(&self) -> Result<()> {
        if !(self.star_body_factor > 0.0 && self.star_body_factor <= 1.0) {
            return Err(AnalysisError::InvalidConfig(format!(
                "star_body_factor must be in (0, 1], got {}",
                self.star_body_factor
            )));
        }
        Ok(())
    }
}

fn three(kind: PatternKind, index: usize) -> PatternMatch {
    PatternMatch {
        kind,
        start_index: index - 2,
        end_index: index,
    }
}

// ============================================================
// MORNING STAR / EVENING STAR
// ============================================================

/// Morning Star - long bearish bar, small star, bullish bar closing above
/// the first body's midpoint
#[derive(Debug, Clone, Copy, Default)]
pub struct MorningStarDetector {
    pub geometry: StarGeometry,
}

impl MorningStarDetector {
    pub fn from_thresholds(t: &DetectorThresholds) -> Self {
        Self {
            geometry: StarGeometry::from_thresholds(t),
        }
    }
}

impl PatternDetector for MorningStarDetector {
    fn name(&self) -> &'static str {
        "Morning Star"
    }

    fn min_bars(&self) -> usize {
        3
    }

    fn detect<T: OHLCV>(
        &self,
        bars: &[T],
        index: usize,
        contexts: &[CandleContext],
    ) -> Option<PatternMatch> {
        let (first, _, third) = self.geometry.legs(bars, index, contexts)?;

        if !first.is_bearish() || !third.is_bullish() {
            return None;
        }
        if third.close() <= first.body_midpoint() {
            return None;
        }

        Some(three(PatternKind::MorningStar, index))
    }

    fn validate_config(&self) -> Result<()> {
        self.geometry.validate()
    }
}

/// Evening Star - long bullish bar, small star, bearish bar closing below
/// the first body's midpoint
#[derive(Debug, Clone, Copy, Default)]
pub struct EveningStarDetector {
    pub geometry: StarGeometry,
}

impl EveningStarDetector {
    pub fn from_thresholds(t: &DetectorThresholds) -> Self {
        Self {
            geometry: StarGeometry::from_thresholds(t),
        }
    }
}

impl PatternDetector for EveningStarDetector {
    fn name(&self) -> &'static str {
        "Evening Star"
    }

    fn min_bars(&self) -> usize {
        3
    }

    fn detect<T: OHLCV>(
        &self,
        bars: &[T],
        index: usize,
        contexts: &[CandleContext],
    ) -> Option<PatternMatch> {
        let (first, _, third) = self.geometry.legs(bars, index, contexts)?;

        if !first.is_bullish() || !third.is_bearish() {
            return None;
        }
        if third.close() >= first.body_midpoint() {
            return None;
        }

        Some(three(PatternKind::EveningStar, index))
    }

    fn validate_config(&self) -> Result<()> {
        self.geometry.validate()
    }
}
