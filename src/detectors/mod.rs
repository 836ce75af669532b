//! Candlestick pattern detectors
//!
//! # Pattern Categories
//!
//! - **Single-bar**: Doji, Hammer, Shooting Star, Marubozu
//! - **Two-bar**: Bullish / Bearish Engulfing
//! - **Three-bar**: Morning Star, Evening Star
//!
//! Every "large candle" condition uses two floors: an absolute one (a fraction
//! of the close) and a volatility-relative one (a multiple of the trailing
//! average body or range).

use std::collections::HashMap;

use crate::params::{get_factor, get_period, get_ratio, ParamMeta, Tunable};
use crate::{Period, Ratio, Result};

pub mod helpers;

/// Generate `with_defaults()` -> `Self::default()` for multiple detector types.
macro_rules! impl_with_defaults {
  ($($detector:ty),* $(,)?) => {
    $(impl $detector {
      pub fn with_defaults() -> Self { Self::default() }
    })*
  };
}

pub mod single_bar;
pub mod three_bar;
pub mod two_bar;

// Re-export all detectors for convenience
pub use helpers::*;
pub use single_bar::*;
pub use three_bar::*;
pub use two_bar::*;

// ============================================================
// THRESHOLDS
// ============================================================

/// Geometry and significance thresholds for the detection cascade
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct DetectorThresholds {
    /// Absolute floor as a fraction of the close
    pub significance_floor: Ratio,
    /// Multiple of the trailing average body/range a large candle must exceed
    pub volatility_factor: f64,
    /// Middle bar of a star: body below this multiple of the average body
    pub star_body_factor: f64,
    /// Marubozu body must exceed this multiple of the average body
    pub marubozu_avg_factor: f64,
    pub doji_body_ratio: Ratio,
    pub shadow_factor: f64,
    pub opposite_shadow_ratio: Ratio,
    pub marubozu_body_ratio: Ratio,
    pub candle_period: Period,
}

impl Default for DetectorThresholds {
    fn default() -> Self {
        Self {
            significance_floor: Ratio::new_const(SIGNIFICANCE_FLOOR),
            volatility_factor: VOLATILITY_FACTOR,
            star_body_factor: STAR_BODY_FACTOR,
            marubozu_avg_factor: MARUBOZU_AVG_FACTOR,
            doji_body_ratio: Ratio::new_const(DOJI_BODY_RATIO),
            shadow_factor: SHADOW_FACTOR,
            opposite_shadow_ratio: Ratio::new_const(OPPOSITE_SHADOW_RATIO),
            marubozu_body_ratio: Ratio::new_const(MARUBOZU_BODY_RATIO),
            candle_period: Period::new_const(CANDLE_PERIOD),
        }
    }
}

static THRESHOLD_PARAMS: [ParamMeta; 9] = [
    ParamMeta::ratio(
        "significance_floor",
        SIGNIFICANCE_FLOOR,
        (0.0, 0.05, 0.001),
        "Absolute size floor as a fraction of the close",
    ),
    ParamMeta::factor(
        "volatility_factor",
        VOLATILITY_FACTOR,
        (0.0, 3.0, 0.1),
        "Multiple of the trailing average a large candle must exceed",
    ),
    ParamMeta::factor(
        "star_body_factor",
        STAR_BODY_FACTOR,
        (0.05, 1.0, 0.05),
        "Star body must stay below this multiple of the average body",
    ),
    ParamMeta::factor(
        "marubozu_avg_factor",
        MARUBOZU_AVG_FACTOR,
        (0.0, 3.0, 0.1),
        "Marubozu body must exceed this multiple of the average body",
    ),
    ParamMeta::ratio(
        "doji_body_ratio",
        DOJI_BODY_RATIO,
        (0.01, 0.3, 0.01),
        "Doji body as a fraction of the range",
    ),
    ParamMeta::factor(
        "shadow_factor",
        SHADOW_FACTOR,
        (1.0, 5.0, 0.5),
        "Dominant shadow as a multiple of the body",
    ),
    ParamMeta::ratio(
        "opposite_shadow_ratio",
        OPPOSITE_SHADOW_RATIO,
        (0.0, 1.0, 0.05),
        "Opposite shadow as a fraction of the body",
    ),
    ParamMeta::ratio(
        "marubozu_body_ratio",
        MARUBOZU_BODY_RATIO,
        (0.5, 1.0, 0.01),
        "Marubozu body as a fraction of the range",
    ),
    ParamMeta::period(
        "candle_period",
        CANDLE_PERIOD as f64,
        (1.0, 100.0, 1.0),
        "Trailing window for average body and range",
    ),
];

impl Tunable for DetectorThresholds {
    fn param_meta() -> &'static [ParamMeta] {
        &THRESHOLD_PARAMS
    }

    fn param_values(&self) -> Vec<f64> {
        vec![
            self.significance_floor.get(),
            self.volatility_factor,
            self.star_body_factor,
            self.marubozu_avg_factor,
            self.doji_body_ratio.get(),
            self.shadow_factor,
            self.opposite_shadow_ratio.get(),
            self.marubozu_body_ratio.get(),
            self.candle_period.get() as f64,
        ]
    }

    fn with_params(params: &HashMap<&str, f64>) -> Result<Self> {
        let thresholds = Self {
            significance_floor: get_ratio(params, "significance_floor", SIGNIFICANCE_FLOOR)?,
            volatility_factor: get_factor(params, "volatility_factor", VOLATILITY_FACTOR)?,
            star_body_factor: get_factor(params, "star_body_factor", STAR_BODY_FACTOR)?,
            marubozu_avg_factor: get_factor(params, "marubozu_avg_factor", MARUBOZU_AVG_FACTOR)?,
            doji_body_ratio: get_ratio(params, "doji_body_ratio", DOJI_BODY_RATIO)?,
            shadow_factor: get_factor(params, "shadow_factor", SHADOW_FACTOR)?,
            opposite_shadow_ratio: get_ratio(params, "opposite_shadow_ratio", OPPOSITE_SHADOW_RATIO)?,
            marubozu_body_ratio: get_ratio(params, "marubozu_body_ratio", MARUBOZU_BODY_RATIO)?,
            candle_period: get_period(params, "candle_period", CANDLE_PERIOD)?,
        };
        thresholds.validate()?;
        Ok(thresholds)
    }
}
