//! Single-bar candlestick pattern detectors
//!
//! Doji, Hammer, Shooting Star and Marubozu. Hammer and Shooting Star require
//! the bar's range, and Marubozu its body, to clear both significance floors.

use super::helpers::{self, is_doji, is_shadow_dominant, is_significant};
use super::DetectorThresholds;
use crate::catalog::PatternKind;
use crate::{AnalysisError, CandleContext, OHLCVExt, PatternDetector, PatternMatch, Result, OHLCV};

impl_with_defaults!(DojiDetector, HammerDetector, ShootingStarDetector, MarubozuDetector);

fn single(kind: PatternKind, index: usize) -> PatternMatch {
    PatternMatch {
        kind,
        start_index: index,
        end_index: index,
    }
}

// ============================================================
// DOJI
// ============================================================

/// Doji - body no more than a tenth of the range
#[derive(Debug, Clone, Copy)]
pub struct DojiDetector {
    pub body_ratio: f64,
}

impl Default for DojiDetector {
    fn default() -> Self {
        Self {
            body_ratio: helpers::DOJI_BODY_RATIO,
        }
    }
}

impl DojiDetector {
    pub fn from_thresholds(t: &DetectorThresholds) -> Self {
        Self {
            body_ratio: t.doji_body_ratio.get(),
        }
    }
}

impl PatternDetector for DojiDetector {
    fn name(&self) -> &'static str {
        "Doji"
    }

    fn min_bars(&self) -> usize {
        1
    }

    fn detect<T: OHLCV>(
        &self,
        bars: &[T],
        index: usize,
        _contexts: &[CandleContext],
    ) -> Option<PatternMatch> {
        let bar = bars.get(index)?;
        is_doji(bar.body(), bar.range(), self.body_ratio).then(|| single(PatternKind::Doji, index))
    }

    fn validate_config(&self) -> Result<()> {
        if !(self.body_ratio > 0.0 && self.body_ratio < 1.0) {
            return Err(AnalysisError::InvalidConfig(format!(
                "doji body_ratio must be in (0, 1), got {}",
                self.body_ratio
            )));
        }
        Ok(())
    }
}

// ============================================================
// HAMMER / SHOOTING STAR
// ============================================================

/// Geometry shared by Hammer and Shooting Star
#[derive(Debug, Clone, Copy)]
pub struct ShadowGeometry {
    pub shadow_factor: f64,
    pub opposite_shadow_ratio: f64,
    pub significance_floor: f64,
    pub range_factor: f64,
}

impl Default for ShadowGeometry {
    fn default() -> Self {
        Self {
            shadow_factor: helpers::SHADOW_FACTOR,
            opposite_shadow_ratio: helpers::OPPOSITE_SHADOW_RATIO,
            significance_floor: helpers::SIGNIFICANCE_FLOOR,
            range_factor: helpers::VOLATILITY_FACTOR,
        }
    }
}

impl ShadowGeometry {
    fn from_thresholds(t: &DetectorThresholds) -> Self {
        Self {
            shadow_factor: t.shadow_factor,
            opposite_shadow_ratio: t.opposite_shadow_ratio.get(),
            significance_floor: t.significance_floor.get(),
            range_factor: t.volatility_factor,
        }
    }

    fn matches<T: OHLCV>(&self, bar: &T, dominant: f64, opposite: f64, ctx: &CandleContext) -> bool {
        is_shadow_dominant(
            dominant,
            opposite,
            bar.body(),
            self.shadow_factor,
            self.opposite_shadow_ratio,
        ) && is_significant(
            bar.range(),
            bar.close(),
            self.significance_floor,
            ctx.avg_range,
            self.range_factor,
        )
    }

    fn validate(&self, pattern: &str) -> Result<()> {
        if self.shadow_factor < 1.0 {
            return Err(AnalysisError::InvalidConfig(format!(
                "{pattern} shadow_factor must be >= 1, got {}",
                self.shadow_factor
            )));
        }
        if self.opposite_shadow_ratio < 0.0 || self.range_factor < 0.0 || self.significance_floor < 0.0 {
            return Err(AnalysisError::InvalidConfig(format!(
                "{pattern} thresholds must be non-negative"
            )));
        }
        Ok(())
    }
}

/// Hammer - long lower shadow, almost no upper shadow, meaningful range
#[derive(Debug, Clone, Copy, Default)]
pub struct HammerDetector {
    pub geometry: ShadowGeometry,
}

impl HammerDetector {
    pub fn from_thresholds(t: &DetectorThresholds) -> Self {
        Self {
            geometry: ShadowGeometry::from_thresholds(t),
        }
    }
}

impl PatternDetector for HammerDetector {
    fn name(&self) -> &'static str {
        "Hammer"
    }

    fn min_bars(&self) -> usize {
        1
    }

    fn detect<T: OHLCV>(
        &self,
        bars: &[T],
        index: usize,
        contexts: &[CandleContext],
    ) -> Option<PatternMatch> {
        let bar = bars.get(index)?;
        let ctx = contexts.get(index)?;
        self.geometry
            .matches(bar, bar.lower_shadow(), bar.upper_shadow(), ctx)
            .then(|| single(PatternKind::Hammer, index))
    }

    fn validate_config(&self) -> Result<()> {
        self.geometry.validate("hammer")
    }
}

/// Shooting Star - mirror of the Hammer, upper shadow dominant
#[derive(Debug, Clone, Copy, Default)]
pub struct ShootingStarDetector {
    pub geometry: ShadowGeometry,
}

impl ShootingStarDetector {
    pub fn from_thresholds(t: &DetectorThresholds) -> Self {
        Self {
            geometry: ShadowGeometry::from_thresholds(t),
        }
    }
}

impl PatternDetector for ShootingStarDetector {
    fn name(&self) -> &'static str {
        "Shooting Star"
    }

    fn min_bars(&self) -> usize {
        1
    }

    fn detect<T: OHLCV>(
        &self,
        bars: &[T],
        index: usize,
        contexts: &[CandleContext],
    ) -> Option<PatternMatch> {
        let bar = bars.get(index)?;
        let ctx = contexts.get(index)?;
        self.geometry
            .matches(bar, bar.upper_shadow(), bar.lower_shadow(), ctx)
            .then(|| single(PatternKind::ShootingStar, index))
    }

    fn validate_config(&self) -> Result<()> {
        self.geometry.validate("shooting star")
    }
}

// ============================================================
// MARUBOZU
// ============================================================

/// Marubozu - body spans nearly the whole range and is large
#[derive(Debug, Clone, Copy)]
pub struct MarubozuDetector {
    pub body_ratio: f64,
    pub significance_floor: f64,
    pub avg_body_factor: f64,
}

impl Default for MarubozuDetector {
    fn default() -> Self {
        Self {
            body_ratio: helpers::MARUBOZU_BODY_RATIO,
            significance_floor: helpers::SIGNIFICANCE_FLOOR,
            avg_body_factor: helpers::MARUBOZU_AVG_FACTOR,
        }
    }
}

impl MarubozuDetector {
    pub fn from_thresholds(t: &DetectorThresholds) -> Self {
        Self {
            body_ratio: t.marubozu_body_ratio.get(),
            significance_floor: t.significance_floor.get(),
            avg_body_factor: t.marubozu_avg_factor,
        }
    }
}

impl PatternDetector for MarubozuDetector {
    fn name(&self) -> &'static str {
        "Marubozu"
    }

    fn min_bars(&self) -> usize {
        1
    }

    fn detect<T: OHLCV>(
        &self,
        bars: &[T],
        index: usize,
        contexts: &[CandleContext],
    ) -> Option<PatternMatch> {
        let bar = bars.get(index)?;
        let ctx = contexts.get(index)?;
        let body = bar.body();
        let range = bar.range();

        if range <= 0.0 || body < range * self.body_ratio {
            return None;
        }
        if !is_significant(body, bar.close(), self.significance_floor, ctx.avg_body, self.avg_body_factor) {
            return None;
        }

        let kind = if bar.is_bullish() {
            PatternKind::BullishMarubozu
        } else {
            PatternKind::BearishMarubozu
        };
        Some(single(kind, index))
    }

    fn validate_config(&self) -> Result<()> {
        if !(self.body_ratio > 0.5 && self.body_ratio <= 1.0) {
            return Err(AnalysisError::InvalidConfig(format!(
                "marubozu body_ratio must be in (0.5, 1], got {}",
                self.body_ratio
            )));
        }
        Ok(())
    }
}
