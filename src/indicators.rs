//! Indicator engine: derived per-bar columns over a [`Series`].
//!
//! Each value is defined only once its lookback window is full; earlier bars
//! hold `None`. Bars that fail the OHLC consistency check still contribute to
//! every window here (their values are finite), so indices stay aligned with
//! the input.

use std::collections::HashMap;

use crate::params::{get_factor, get_period, ParamMeta, Tunable};
use crate::{Bar, OHLCVExt, Period, Result, Series, OHLCV};

pub const FAST_MA_PERIOD: usize = 20;
pub const SLOW_MA_PERIOD: usize = 50;
pub const RSI_PERIOD: usize = 14;
pub const VOLUME_MA_PERIOD: usize = 20;
/// Volume must exceed its moving average by this multiple
pub const BREAKOUT_VOLUME_FACTOR: f64 = 3.0;
/// ...while price moves more than this many percent
pub const BREAKOUT_MIN_MOVE_PCT: f64 = 0.5;

// ============================================================
// SETTINGS
// ============================================================

#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct IndicatorSettings {
    pub fast_ma: Period,
    pub slow_ma: Period,
    pub rsi_period: Period,
    pub volume_ma: Period,
    pub breakout_volume_factor: f64,
    pub breakout_min_move_pct: f64,
}

impl Default for IndicatorSettings {
    fn default() -> Self {
        Self {
            fast_ma: Period::new_const(FAST_MA_PERIOD),
            slow_ma: Period::new_const(SLOW_MA_PERIOD),
            rsi_period: Period::new_const(RSI_PERIOD),
            volume_ma: Period::new_const(VOLUME_MA_PERIOD),
            breakout_volume_factor: BREAKOUT_VOLUME_FACTOR,
            breakout_min_move_pct: BREAKOUT_MIN_MOVE_PCT,
        }
    }
}

static INDICATOR_PARAMS: [ParamMeta; 6] = [
    ParamMeta::period(
        "fast_ma",
        FAST_MA_PERIOD as f64,
        (2.0, 200.0, 1.0),
        "Fast moving average window",
    ),
    ParamMeta::period(
        "slow_ma",
        SLOW_MA_PERIOD as f64,
        (2.0, 400.0, 1.0),
        "Slow moving average window",
    ),
    ParamMeta::period("rsi_period", RSI_PERIOD as f64, (2.0, 100.0, 1.0), "RSI averaging window"),
    ParamMeta::period(
        "volume_ma",
        VOLUME_MA_PERIOD as f64,
        (2.0, 200.0, 1.0),
        "Volume moving average window",
    ),
    ParamMeta::factor(
        "breakout_volume_factor",
        BREAKOUT_VOLUME_FACTOR,
        (1.0, 10.0, 0.5),
        "Volume multiple of its average that counts as a breakout",
    ),
    ParamMeta::factor(
        "breakout_min_move_pct",
        BREAKOUT_MIN_MOVE_PCT,
        (0.0, 10.0, 0.1),
        "Minimum absolute percent move accompanying a breakout",
    ),
];

impl Tunable for IndicatorSettings {
    fn param_meta() -> &'static [ParamMeta] {
        &INDICATOR_PARAMS
    }

    fn param_values(&self) -> Vec<f64> {
        vec![
            self.fast_ma.get() as f64,
            self.slow_ma.get() as f64,
            self.rsi_period.get() as f64,
            self.volume_ma.get() as f64,
            self.breakout_volume_factor,
            self.breakout_min_move_pct,
        ]
    }

    fn with_params(params: &HashMap<&str, f64>) -> Result<Self> {
        let settings = Self {
            fast_ma: get_period(params, "fast_ma", FAST_MA_PERIOD)?,
            slow_ma: get_period(params, "slow_ma", SLOW_MA_PERIOD)?,
            rsi_period: get_period(params, "rsi_period", RSI_PERIOD)?,
            volume_ma: get_period(params, "volume_ma", VOLUME_MA_PERIOD)?,
            breakout_volume_factor: get_factor(params, "breakout_volume_factor", BREAKOUT_VOLUME_FACTOR)?,
            breakout_min_move_pct: get_factor(params, "breakout_min_move_pct", BREAKOUT_MIN_MOVE_PCT)?,
        };
        settings.validate()?;
        Ok(settings)
    }
}

// ============================================================
// OUTPUT TYPES
// ============================================================

/// Volume-confirmed price direction versus the previous bar
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
pub enum TrendSignal {
    /// Price up on rising volume
    BullishConfirmation,
    /// Price down on rising volume
    BearishSellingPressure,
    #[default]
    Neutral,
}

impl TrendSignal {
    pub fn label(self) -> &'static str {
        match self {
            TrendSignal::BullishConfirmation => "Bullish Confirmation",
            TrendSignal::BearishSellingPressure => "Bearish Selling Pressure",
            TrendSignal::Neutral => "Neutral",
        }
    }
}

impl std::fmt::Display for TrendSignal {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}

/// Derived columns for one bar. `None` means the window is not yet full.
#[derive(Debug, Clone, Copy, Default, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct IndicatorRow {
    pub ma20: Option<f64>,
    pub ma50: Option<f64>,
    pub rsi14: Option<f64>,
    pub volume_ma20: Option<f64>,
    pub obv: f64,
    pub vwap: Option<f64>,
    /// Percent change of the close versus the previous bar
    pub pct_change: Option<f64>,
    pub volume_breakout: bool,
    pub trend_signal: TrendSignal,
}

/// A copy of the input bars alongside their indicator rows
#[derive(Debug, Clone, Default, PartialEq, serde::Serialize)]
pub struct AugmentedSeries {
    bars: Vec<Bar>,
    indicators: Vec<IndicatorRow>,
}

impl AugmentedSeries {
    #[inline]
    pub fn bars(&self) -> &[Bar] {
        &self.bars
    }

    #[inline]
    pub fn indicators(&self) -> &[IndicatorRow] {
        &self.indicators
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.bars.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.bars.is_empty()
    }

    #[inline]
    pub fn row(&self, index: usize) -> Option<(&Bar, &IndicatorRow)> {
        Some((self.bars.get(index)?, self.indicators.get(index)?))
    }

    #[inline]
    pub fn latest(&self) -> Option<(&Bar, &IndicatorRow)> {
        self.row(self.len().checked_sub(1)?)
    }
}

// ============================================================
// ENGINE
// ============================================================

/// Compute every indicator column for the series.
pub fn compute_indicators(series: &Series, settings: &IndicatorSettings) -> AugmentedSeries {
    let bars = series.bars();
    let closes: Vec<f64> = bars.iter().map(|b| b.close).collect();
    let volumes: Vec<f64> = bars.iter().map(|b| b.volume).collect();

    let ma_fast = sma(&closes, settings.fast_ma.get());
    let ma_slow = sma(&closes, settings.slow_ma.get());
    let rsi_values = rsi(&closes, settings.rsi_period.get());
    let volume_ma = sma(&volumes, settings.volume_ma.get());
    let obv_values = obv(bars);
    let vwap_values = vwap(bars);
    let changes = pct_change(&closes);
    let breakouts = volume_breakouts(&volumes, &volume_ma, &changes, settings);
    let signals = trend_signals(bars);

    let indicators = (0..bars.len())
        .map(|i| IndicatorRow {
            ma20: ma_fast[i],
            ma50: ma_slow[i],
            rsi14: rsi_values[i],
            volume_ma20: volume_ma[i],
            obv: obv_values[i],
            vwap: vwap_values[i],
            pct_change: changes[i],
            volume_breakout: breakouts[i],
            trend_signal: signals[i],
        })
        .collect();

    AugmentedSeries {
        bars: bars.to_vec(),
        indicators,
    }
}

/// Simple moving average; `None` for indices < period - 1.
pub fn sma(values: &[f64], period: usize) -> Vec<Option<f64>> {
    let period = period.max(1);
    (0..values.len())
        .map(|i| {
            (i + 1 >= period).then(|| {
                let window = &values[i + 1 - period..=i];
                window.iter().sum::<f64>() / period as f64
            })
        })
        .collect()
}

/// RSI over simple rolling means of gains and losses.
///
/// Defined from index `period` on (the first bar has no change). A zero
/// average loss yields exactly 100.
pub fn rsi(closes: &[f64], period: usize) -> Vec<Option<f64>> {
    let period = period.max(1);
    let deltas: Vec<f64> = closes.windows(2).map(|w| w[1] - w[0]).collect();

    (0..closes.len())
        .map(|i| {
            if i < period {
                return None;
            }
            // deltas[j - 1] is the change into bar j
            let window = &deltas[i - period..i];
            let avg_gain = window.iter().map(|d| d.max(0.0)).sum::<f64>() / period as f64;
            let avg_loss = window.iter().map(|d| (-d).max(0.0)).sum::<f64>() / period as f64;

            let denominator = if avg_loss == 0.0 { 1.0 } else { avg_loss };
            let value = 100.0 - 100.0 / (1.0 + avg_gain / denominator);
            Some(if avg_loss == 0.0 { 100.0 } else { value })
        })
        .collect()
}

/// On-balance volume; the first bar contributes 0.
pub fn obv<T: OHLCV>(bars: &[T]) -> Vec<f64> {
    let mut total = 0.0;
    bars.iter()
        .enumerate()
        .map(|(i, bar)| {
            if i > 0 {
                let prev = bars[i - 1].close();
                if bar.close() > prev {
                    total += bar.volume();
                } else if bar.close() < prev {
                    total -= bar.volume();
                }
            }
            total
        })
        .collect()
}

/// Running VWAP from the first bar (no session reset). Undefined while the
/// cumulative volume is zero.
pub fn vwap<T: OHLCV>(bars: &[T]) -> Vec<Option<f64>> {
    let mut pv = 0.0;
    let mut volume = 0.0;
    bars.iter()
        .map(|bar| {
            pv += bar.typical_price() * bar.volume();
            volume += bar.volume();
            (volume != 0.0).then(|| pv / volume)
        })
        .collect()
}

/// Percent change versus the previous value; undefined on the first bar and
/// after a zero value.
pub fn pct_change(values: &[f64]) -> Vec<Option<f64>> {
    (0..values.len())
        .map(|i| {
            let prev = *values.get(i.checked_sub(1)?)?;
            (prev != 0.0).then(|| (values[i] - prev) / prev * 100.0)
        })
        .collect()
}

/// Volume spike that comes with a real price move.
pub fn volume_breakouts(
    volumes: &[f64],
    volume_ma: &[Option<f64>],
    changes: &[Option<f64>],
    settings: &IndicatorSettings,
) -> Vec<bool> {
    volumes
        .iter()
        .zip(volume_ma)
        .zip(changes)
        .map(|((&volume, ma), change)| match (ma, change) {
            (Some(ma), Some(change)) => {
                volume > settings.breakout_volume_factor * ma
                    && change.abs() > settings.breakout_min_move_pct
            }
            _ => false,
        })
        .collect()
}

/// Price direction confirmed by rising volume.
pub fn trend_signals<T: OHLCV>(bars: &[T]) -> Vec<TrendSignal> {
    bars.iter()
        .enumerate()
        .map(|(i, bar)| {
            let Some(prev) = i.checked_sub(1).map(|p| &bars[p]) else {
                return TrendSignal::Neutral;
            };
            let volume_up = bar.volume() > prev.volume();
            if bar.close() > prev.close() && volume_up {
                TrendSignal::BullishConfirmation
            } else if bar.close() < prev.close() && volume_up {
                TrendSignal::BearishSellingPressure
            } else {
                TrendSignal::Neutral
            }
        })
        .collect()
}
