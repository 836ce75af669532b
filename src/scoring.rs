//! Pattern scoring and insight aggregation
//!
//! Turns the detected events of one series into a sentiment label, a
//! recommendation for the latest surviving event and per-kind hit rates.
//! Every threshold lives in [`ScoringPolicy`] so the veto and trend rules can
//! be exercised without running detection.

use std::collections::{BTreeMap, HashMap};

use tracing::{debug, trace};

use crate::catalog::PatternKind;
use crate::indicators::{AugmentedSeries, IndicatorRow, TrendSignal};
use crate::params::{get_factor, get_period, get_ratio, ParamMeta, Tunable};
use crate::{AnalysisError, Bar, Direction, OHLCVExt, PatternEvent, Period, Ratio, Result, OHLCV};

pub const MIN_CATALOG_SCORE: u8 = 2;
pub const SCORING_WINDOW: usize = 20;
pub const RECENCY_MULTIPLIER: f64 = 2.0;
pub const LONG_TREND_WEIGHT: f64 = 3.0;
pub const SHORT_TREND_WEIGHT: f64 = 2.0;
pub const STRONG_THRESHOLD: f64 = 8.0;
pub const THRESHOLD: f64 = 3.0;
pub const ACCURACY_HORIZON: usize = 3;
pub const ACCURACY_MIN_SAMPLES: usize = 3;
pub const WIN_MOVE: f64 = 0.005;
pub const RSI_OVERBOUGHT: f64 = 70.0;
pub const RSI_OVERSOLD: f64 = 30.0;

const NO_PATTERNS: &str = "No significant candlestick patterns detected in recent data.";

// ============================================================
// POLICY
// ============================================================

/// Thresholds of the scoring pass
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct ScoringPolicy {
    /// Events with a lower catalog weight are treated as noise
    pub min_catalog_score: u8,
    /// Drop bullish events closing at/below VWAP and bearish events closing
    /// at/above MA50 (only where those are defined)
    pub trend_gating: bool,
    /// Number of most recent events considered
    pub window: Period,
    /// Weight multiplier for events on the latest bar
    pub recency_multiplier: f64,
    /// Trend modifier when the slow MA is defined
    pub long_trend_weight: f64,
    /// Trend modifier when only the fast MA is defined
    pub short_trend_weight: f64,
    pub strong_threshold: f64,
    pub threshold: f64,
    /// Bars ahead used to judge an event's outcome
    pub accuracy_horizon: Period,
    pub accuracy_min_samples: Period,
    /// Forward move counted as a win
    pub win_move: Ratio,
    pub rsi_overbought: f64,
    pub rsi_oversold: f64,
}

impl Default for ScoringPolicy {
    fn default() -> Self {
        Self {
            min_catalog_score: MIN_CATALOG_SCORE,
            trend_gating: true,
            window: Period::new_const(SCORING_WINDOW),
            recency_multiplier: RECENCY_MULTIPLIER,
            long_trend_weight: LONG_TREND_WEIGHT,
            short_trend_weight: SHORT_TREND_WEIGHT,
            strong_threshold: STRONG_THRESHOLD,
            threshold: THRESHOLD,
            accuracy_horizon: Period::new_const(ACCURACY_HORIZON),
            accuracy_min_samples: Period::new_const(ACCURACY_MIN_SAMPLES),
            win_move: Ratio::new_const(WIN_MOVE),
            rsi_overbought: RSI_OVERBOUGHT,
            rsi_oversold: RSI_OVERSOLD,
        }
    }
}

static SCORING_PARAMS: [ParamMeta; 12] = [
    ParamMeta::period(
        "min_catalog_score",
        MIN_CATALOG_SCORE as f64,
        (1.0, 3.0, 1.0),
        "Lowest catalog weight that is scored",
    ),
    ParamMeta::period(
        "window",
        SCORING_WINDOW as f64,
        (1.0, 200.0, 1.0),
        "Most recent events considered",
    ),
    ParamMeta::factor(
        "recency_multiplier",
        RECENCY_MULTIPLIER,
        (1.0, 5.0, 0.5),
        "Weight of events on the latest bar",
    ),
    ParamMeta::factor(
        "long_trend_weight",
        LONG_TREND_WEIGHT,
        (0.0, 10.0, 0.5),
        "Trend modifier from the slow MA",
    ),
    ParamMeta::factor(
        "short_trend_weight",
        SHORT_TREND_WEIGHT,
        (0.0, 10.0, 0.5),
        "Trend modifier from the fast MA",
    ),
    ParamMeta::factor(
        "strong_threshold",
        STRONG_THRESHOLD,
        (1.0, 50.0, 1.0),
        "Score for a strong sentiment",
    ),
    ParamMeta::factor(
        "threshold",
        THRESHOLD,
        (0.5, 50.0, 0.5),
        "Score for a directional sentiment",
    ),
    ParamMeta::period(
        "accuracy_horizon",
        ACCURACY_HORIZON as f64,
        (1.0, 50.0, 1.0),
        "Bars ahead used for outcomes",
    ),
    ParamMeta::period(
        "accuracy_min_samples",
        ACCURACY_MIN_SAMPLES as f64,
        (1.0, 100.0, 1.0),
        "Occurrences needed for a hit rate",
    ),
    ParamMeta::ratio("win_move", WIN_MOVE, (0.0, 0.1, 0.001), "Forward return counted as a win"),
    ParamMeta::factor(
        "rsi_overbought",
        RSI_OVERBOUGHT,
        (50.0, 100.0, 5.0),
        "RSI above this is overbought",
    ),
    ParamMeta::factor("rsi_oversold", RSI_OVERSOLD, (0.0, 50.0, 5.0), "RSI below this is oversold"),
];

impl Tunable for ScoringPolicy {
    fn param_meta() -> &'static [ParamMeta] {
        &SCORING_PARAMS
    }

    fn param_values(&self) -> Vec<f64> {
        vec![
            f64::from(self.min_catalog_score),
            self.window.get() as f64,
            self.recency_multiplier,
            self.long_trend_weight,
            self.short_trend_weight,
            self.strong_threshold,
            self.threshold,
            self.accuracy_horizon.get() as f64,
            self.accuracy_min_samples.get() as f64,
            self.win_move.get(),
            self.rsi_overbought,
            self.rsi_oversold,
        ]
    }

    /// `trend_gating` is not numeric and keeps its default.
    fn with_params(params: &HashMap<&str, f64>) -> Result<Self> {
        let min_score = get_factor(params, "min_catalog_score", f64::from(MIN_CATALOG_SCORE))?;
        SCORING_PARAMS[0].validate(min_score)?;

        let policy = Self {
            min_catalog_score: min_score as u8,
            trend_gating: true,
            window: get_period(params, "window", SCORING_WINDOW)?,
            recency_multiplier: get_factor(params, "recency_multiplier", RECENCY_MULTIPLIER)?,
            long_trend_weight: get_factor(params, "long_trend_weight", LONG_TREND_WEIGHT)?,
            short_trend_weight: get_factor(params, "short_trend_weight", SHORT_TREND_WEIGHT)?,
            strong_threshold: get_factor(params, "strong_threshold", STRONG_THRESHOLD)?,
            threshold: get_factor(params, "threshold", THRESHOLD)?,
            accuracy_horizon: get_period(params, "accuracy_horizon", ACCURACY_HORIZON)?,
            accuracy_min_samples: get_period(params, "accuracy_min_samples", ACCURACY_MIN_SAMPLES)?,
            win_move: get_ratio(params, "win_move", WIN_MOVE)?,
            rsi_overbought: get_factor(params, "rsi_overbought", RSI_OVERBOUGHT)?,
            rsi_oversold: get_factor(params, "rsi_oversold", RSI_OVERSOLD)?,
        };
        policy.validate()?;
        Ok(policy)
    }

    fn validate(&self) -> Result<()> {
        Self::param_meta()
            .iter()
            .zip(self.param_values())
            .try_for_each(|(meta, value)| meta.validate(value))?;
        if self.threshold >= self.strong_threshold {
            return Err(AnalysisError::InvalidConfig(format!(
                "threshold ({}) must be below strong_threshold ({})",
                self.threshold, self.strong_threshold
            )));
        }
        if self.rsi_oversold >= self.rsi_overbought {
            return Err(AnalysisError::InvalidConfig(
                "rsi_oversold must be below rsi_overbought".into(),
            ));
        }
        Ok(())
    }
}

// ============================================================
// OUTPUT TYPES
// ============================================================

/// Overall market sentiment
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
pub enum Sentiment {
    StronglyBullish,
    /// Strong bullish score, but the latest candle is red
    BullishPullback,
    Bullish,
    #[default]
    Neutral,
    Bearish,
    /// Strong bearish score, but the latest candle is green
    BearishReliefBounce,
    StronglyBearish,
}

impl Sentiment {
    pub fn label(self) -> &'static str {
        match self {
            Sentiment::StronglyBullish => "Strongly Bullish",
            Sentiment::BullishPullback => "Bullish (Pullback)",
            Sentiment::Bullish => "Bullish",
            Sentiment::Neutral => "Mixed/Neutral",
            Sentiment::Bearish => "Bearish",
            Sentiment::BearishReliefBounce => "Bearish (Relief Bounce)",
            Sentiment::StronglyBearish => "Strongly Bearish",
        }
    }

    pub fn direction(self) -> Direction {
        match self {
            Sentiment::StronglyBullish | Sentiment::BullishPullback | Sentiment::Bullish => {
                Direction::Bullish
            }
            Sentiment::Neutral => Direction::Neutral,
            Sentiment::Bearish | Sentiment::BearishReliefBounce | Sentiment::StronglyBearish => {
                Direction::Bearish
            }
        }
    }
}

impl std::fmt::Display for Sentiment {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub enum TrendDirection {
    Up,
    Down,
    #[default]
    Flat,
}

/// Latest close versus the longest defined moving average
#[derive(Debug, Clone, Copy, Default, PartialEq, serde::Serialize)]
pub struct TrendAssessment {
    pub direction: TrendDirection,
    /// Signed amount added to the weighted score
    pub modifier: f64,
    /// The moving average compared against, if any was defined
    pub reference: Option<f64>,
    /// Whether `reference` is the slow average
    pub long_term: bool,
}

/// Oscillator and volume readings of the latest bar
#[derive(Debug, Clone, Copy, PartialEq, serde::Serialize)]
pub struct Momentum {
    pub rsi: Option<f64>,
    pub overbought: bool,
    pub oversold: bool,
    /// Colour of the latest candle (Neutral when open == close)
    pub candle: Direction,
    pub volume_breakout: bool,
    pub trend_signal: TrendSignal,
}

/// How the latest signal relates to the prevailing trend
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub enum Action {
    /// Signal agrees with price versus VWAP and MA50
    TrendAligned,
    /// Signal fights both references; higher risk
    Contratrend,
    /// References disagree or are undefined
    Tactical,
    /// Neutral signal
    WatchForConfirmation,
}

impl Action {
    pub fn label(self) -> &'static str {
        match self {
            Action::TrendAligned => "Trend-aligned",
            Action::Contratrend => "Contratrend (higher risk)",
            Action::Tactical => "Tactical / mixed",
            Action::WatchForConfirmation => "Watch for confirmation",
        }
    }
}

impl std::fmt::Display for Action {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}

/// RSI disagreeing with the signal direction
#[derive(Debug, Clone, Copy, PartialEq, serde::Serialize)]
pub enum MomentumWarning {
    /// Bullish signal while RSI is overbought
    Overbought { rsi: f64 },
    /// Bearish signal while RSI is oversold
    Oversold { rsi: f64 },
}

impl std::fmt::Display for MomentumWarning {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            MomentumWarning::Overbought { rsi } => {
                write!(f, "RSI {rsi:.1} is overbought; bullish follow-through may be limited")
            }
            MomentumWarning::Oversold { rsi } => {
                write!(f, "RSI {rsi:.1} is oversold; bearish follow-through may be limited")
            }
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, serde::Serialize)]
pub struct Recommendation {
    pub kind: PatternKind,
    pub signal: Direction,
    pub action: Action,
    pub warning: Option<MomentumWarning>,
    pub description: &'static str,
    pub meaning: &'static str,
    pub reliability: &'static str,
}

/// Historical hit rate of one pattern kind
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize)]
pub enum Accuracy {
    Measured { wins: usize, samples: usize },
    Insufficient { samples: usize },
}

impl Accuracy {
    pub fn win_rate(self) -> Option<f64> {
        match self {
            Accuracy::Measured { wins, samples } => Some(wins as f64 / samples as f64),
            Accuracy::Insufficient { .. } => None,
        }
    }
}

impl std::fmt::Display for Accuracy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match *self {
            Accuracy::Measured { wins, samples } => write!(
                f,
                "{:.0}% win rate ({wins}/{samples})",
                wins as f64 / samples as f64 * 100.0
            ),
            Accuracy::Insufficient { .. } => f.write_str("Insufficient history."),
        }
    }
}

/// Aggregated reading of the detected patterns
#[derive(Debug, Clone, PartialEq, serde::Serialize)]
pub struct Insight {
    pub sentiment: Sentiment,
    /// Weighted score including the trend modifier, 0 when nothing was detected
    pub score: f64,
    pub bullish_count: usize,
    pub bearish_count: usize,
    pub neutral_count: usize,
    /// Latest event that survived filtering
    pub latest_pattern: Option<PatternEvent>,
    pub pattern_frequency: BTreeMap<PatternKind, usize>,
    pub trend: TrendAssessment,
    /// `None` for an empty series
    pub momentum: Option<Momentum>,
    pub recommendations: Vec<Recommendation>,
    pub historical_accuracy: BTreeMap<PatternKind, Accuracy>,
    pub summary: String,
}

impl Default for Insight {
    fn default() -> Self {
        Self {
            sentiment: Sentiment::Neutral,
            score: 0.0,
            bullish_count: 0,
            bearish_count: 0,
            neutral_count: 0,
            latest_pattern: None,
            pattern_frequency: BTreeMap::new(),
            trend: TrendAssessment::default(),
            momentum: None,
            recommendations: Vec::new(),
            historical_accuracy: BTreeMap::new(),
            summary: NO_PATTERNS.to_string(),
        }
    }
}

// ============================================================
// AGGREGATION
// ============================================================

/// Build the insight for one series and its events (ordered by index).
pub fn build_insight(
    augmented: &AugmentedSeries,
    events: &[PatternEvent],
    policy: &ScoringPolicy,
) -> Insight {
    let Some((latest_bar, latest_row)) = augmented.latest() else {
        return Insight::default();
    };
    let window = policy.window.get();

    let recent = tail(events, window);
    let count = |d: Direction| recent.iter().filter(|e| e.signal == d).count();
    let mut pattern_frequency = BTreeMap::new();
    for e in recent {
        *pattern_frequency.entry(e.kind).or_insert(0) += 1;
    }

    let surviving: Vec<PatternEvent> = events
        .iter()
        .filter(|e| e.score >= policy.min_catalog_score)
        .filter(|e| !policy.trend_gating || passes_trend_gate(e, augmented))
        .copied()
        .collect();
    let scored = tail(&surviving, window);

    let trend = assess_trend(latest_bar, latest_row, policy);
    let momentum = momentum(latest_bar, latest_row, policy);
    let historical_accuracy = historical_accuracy(augmented.bars(), events, policy);

    let latest_pattern = scored.last().copied();
    let (score, sentiment) = if events.is_empty() {
        (0.0, Sentiment::Neutral)
    } else {
        let score = weighted_score(scored, latest_bar.timestamp, policy) + trend.modifier;
        (score, classify_sentiment(score, Some(latest_bar), policy))
    };

    debug!(
        events = events.len(),
        surviving = surviving.len(),
        scored = scored.len(),
        score,
        trend_modifier = trend.modifier,
        "pattern score"
    );

    let recommendations = latest_pattern
        .map(|e| recommend(&e, latest_bar, latest_row, policy))
        .into_iter()
        .collect();

    let mut insight = Insight {
        sentiment,
        score,
        bullish_count: count(Direction::Bullish),
        bearish_count: count(Direction::Bearish),
        neutral_count: count(Direction::Neutral),
        latest_pattern,
        pattern_frequency,
        trend,
        momentum: Some(momentum),
        recommendations,
        historical_accuracy,
        summary: String::new(),
    };
    insight.summary = summarize(&insight);
    insight
}

fn tail<T>(items: &[T], n: usize) -> &[T] {
    &items[items.len().saturating_sub(n)..]
}

fn passes_trend_gate(event: &PatternEvent, augmented: &AugmentedSeries) -> bool {
    let Some((_, row)) = augmented.row(event.index) else {
        return true;
    };
    let keep = match event.signal {
        Direction::Bullish => row.vwap.map_or(true, |vwap| event.price > vwap),
        Direction::Bearish => row.ma50.map_or(true, |ma50| event.price < ma50),
        Direction::Neutral => true,
    };
    if !keep {
        trace!(index = event.index, kind = %event.kind, "event gated by trend context");
    }
    keep
}

/// Sum of `catalog score × recency × direction sign`
pub fn weighted_score(events: &[PatternEvent], latest_timestamp: i64, policy: &ScoringPolicy) -> f64 {
    events
        .iter()
        .map(|e| {
            let recency = if e.timestamp == latest_timestamp {
                policy.recency_multiplier
            } else {
                1.0
            };
            f64::from(e.score) * recency * e.signal.sign()
        })
        .sum()
}

/// Compare the latest close with the slow MA, or the fast MA when the slow
/// one is not yet defined.
pub fn assess_trend(bar: &Bar, row: &IndicatorRow, policy: &ScoringPolicy) -> TrendAssessment {
    let (reference, weight, long_term) = match (row.ma50, row.ma20) {
        (Some(ma), _) => (ma, policy.long_trend_weight, true),
        (None, Some(ma)) => (ma, policy.short_trend_weight, false),
        (None, None) => return TrendAssessment::default(),
    };

    let (direction, modifier) = if bar.close > reference {
        (TrendDirection::Up, weight)
    } else if bar.close < reference {
        (TrendDirection::Down, -weight)
    } else {
        (TrendDirection::Flat, 0.0)
    };

    TrendAssessment {
        direction,
        modifier,
        reference: Some(reference),
        long_term,
    }
}

/// Map a score to a sentiment, letting the latest candle veto strength.
///
/// A strong score against the candle colour yields the qualified label; a
/// plain score against it falls back to neutral.
pub fn classify_sentiment<T: OHLCV>(score: f64, latest: Option<&T>, policy: &ScoringPolicy) -> Sentiment {
    let red = latest.is_some_and(|b| b.is_bearish());
    let green = latest.is_some_and(|b| b.is_bullish());

    if score >= policy.strong_threshold {
        if red {
            Sentiment::BullishPullback
        } else {
            Sentiment::StronglyBullish
        }
    } else if score >= policy.threshold {
        if red {
            Sentiment::Neutral
        } else {
            Sentiment::Bullish
        }
    } else if score <= -policy.strong_threshold {
        if green {
            Sentiment::BearishReliefBounce
        } else {
            Sentiment::StronglyBearish
        }
    } else if score <= -policy.threshold {
        if green {
            Sentiment::Neutral
        } else {
            Sentiment::Bearish
        }
    } else {
        Sentiment::Neutral
    }
}

fn momentum(bar: &Bar, row: &IndicatorRow, policy: &ScoringPolicy) -> Momentum {
    let candle = if bar.is_bullish() {
        Direction::Bullish
    } else if bar.is_bearish() {
        Direction::Bearish
    } else {
        Direction::Neutral
    };
    Momentum {
        rsi: row.rsi14,
        overbought: row.rsi14.is_some_and(|r| r > policy.rsi_overbought),
        oversold: row.rsi14.is_some_and(|r| r < policy.rsi_oversold),
        candle,
        volume_breakout: row.volume_breakout,
        trend_signal: row.trend_signal,
    }
}

/// Recommendation for one event, judged against the latest bar's close
/// relative to its VWAP and MA50.
pub fn recommend(event: &PatternEvent, bar: &Bar, row: &IndicatorRow, policy: &ScoringPolicy) -> Recommendation {
    let entry = event.kind.entry();
    let sign = event.signal.sign();

    let action = if event.signal == Direction::Neutral {
        Action::WatchForConfirmation
    } else {
        let references: Vec<f64> = [row.vwap, row.ma50].into_iter().flatten().collect();
        let aligned = references.iter().filter(|&&r| (bar.close - r) * sign > 0.0).count();
        let against = references.iter().filter(|&&r| (bar.close - r) * sign < 0.0).count();
        match references.len() {
            0 => Action::Tactical,
            n if aligned == n => Action::TrendAligned,
            n if against == n => Action::Contratrend,
            _ => Action::Tactical,
        }
    };

    let warning = match (event.signal, row.rsi14) {
        (Direction::Bullish, Some(rsi)) if rsi > policy.rsi_overbought => {
            Some(MomentumWarning::Overbought { rsi })
        }
        (Direction::Bearish, Some(rsi)) if rsi < policy.rsi_oversold => {
            Some(MomentumWarning::Oversold { rsi })
        }
        _ => None,
    };

    Recommendation {
        kind: event.kind,
        signal: event.signal,
        action,
        warning,
        description: entry.description,
        meaning: entry.meaning,
        reliability: entry.reliability,
    }
}

/// Per-kind win rate of directional events whose outcome is known.
pub fn historical_accuracy<T: OHLCV>(
    bars: &[T],
    events: &[PatternEvent],
    policy: &ScoringPolicy,
) -> BTreeMap<PatternKind, Accuracy> {
    let horizon = policy.accuracy_horizon.get();
    let win_move = policy.win_move.get();
    let mut tallies: BTreeMap<PatternKind, (usize, usize)> = BTreeMap::new();

    for event in events.iter().filter(|e| e.signal != Direction::Neutral) {
        let tally = tallies.entry(event.kind).or_default();
        let (Some(base), Some(ahead)) = (bars.get(event.index), bars.get(event.index + horizon)) else {
            continue;
        };
        if base.close() == 0.0 {
            continue;
        }
        let forward = (ahead.close() - base.close()) / base.close();
        tally.1 += 1;
        if forward * event.signal.sign() > win_move {
            tally.0 += 1;
        }
    }

    let min_samples = policy.accuracy_min_samples.get();
    tallies
        .into_iter()
        .map(|(kind, (wins, samples))| {
            let accuracy = if samples >= min_samples {
                Accuracy::Measured { wins, samples }
            } else {
                Accuracy::Insufficient { samples }
            };
            (kind, accuracy)
        })
        .collect()
}

fn summarize(insight: &Insight) -> String {
    let mut parts = Vec::new();
    if insight.bullish_count + insight.bearish_count + insight.neutral_count > 0 {
        parts.push(format!("Market sentiment: {}", insight.sentiment));
        parts.push(format!(
            "Detected {} bullish, {} bearish, and {} neutral patterns in recent data.",
            insight.bullish_count, insight.bearish_count, insight.neutral_count
        ));
    }
    if let Some(e) = &insight.latest_pattern {
        parts.push(format!(
            "Latest pattern: {} at bar {} (timestamp {}), close {:.2}",
            e.kind, e.index, e.timestamp, e.price
        ));
    }
    if parts.is_empty() {
        return NO_PATTERNS.to_string();
    }
    parts.join("\n\n")
}
