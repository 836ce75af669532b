//! # candlescope
//!
//! Indicator computation, candlestick pattern detection and sentiment scoring
//! for a single instrument's OHLCV history.
//!
//! ## Quick Start
//!
//! ```rust
//! use candlescope::prelude::*;
//!
//! // One bar per day, gently rising
//! let bars: Vec<Bar> = (0..60)
//!     .map(|i| {
//!         let base = 100.0 + i as f64;
//!         Bar::new(i as i64 * 86_400, base, base + 1.5, base - 0.5, base + 1.0, 1_000.0)
//!     })
//!     .collect();
//!
//! let series = Series::new(bars).unwrap();
//! let analysis = Analyzer::default().analyze(&series, None);
//!
//! assert_eq!(analysis.augmented.len(), 60);
//! println!("{} / {}", analysis.insight.sentiment, analysis.kpis.high_label);
//! ```
//!
//! ## Pipeline
//!
//! raw series → [`indicators`] → {pattern detection, [`kpis`]} → [`scoring`] → [`Insight`].
//! Every stage is a pure function of its input; nothing is cached between calls.

pub mod catalog;
pub mod detectors;
pub mod indicators;
pub mod kpis;
pub mod params;
pub mod scoring;

pub mod prelude {
    pub use crate::{
        // Catalog
        catalog::{CatalogEntry, Category, PatternKind},
        // Detectors
        detectors::*,
        // Indicators
        indicators::{compute_indicators, AugmentedSeries, IndicatorRow, IndicatorSettings, TrendSignal},
        // KPIs
        kpis::{compute_kpis, HighLabel, KpiSignal, Kpis, ReturnBasis},
        // Parameters
        params::{get_factor, get_period, get_ratio, ParamMeta, ParamType, Tunable},
        // Parallel
        analyze_parallel,
        mark_forming,
        // Scoring
        scoring::{
            Accuracy, Action, Insight, Momentum, MomentumWarning, Recommendation, ScoringPolicy,
            Sentiment, TrendAssessment, TrendDirection,
        },
        // Engine
        Analysis,
        // Errors
        AnalysisError,
        Analyzer,
        AnalyzerBuilder,
        Bar,
        BarEvent,
        CandleContext,
        ContextProvider,
        Direction,
        EventIterator,
        OHLCVExt,
        PatternDetector,
        PatternEvent,
        PatternMatch,
        Period,
        Ratio,
        RawBar,
        Result,
        RollingContextProvider,
        Rule,
        ScanError,
        ScanResult,
        Series,
        Status,
        OHLCV,
    };
}

use tracing::{debug, trace};

use catalog::PatternKind;
use indicators::{AugmentedSeries, IndicatorSettings};
use kpis::Kpis;
use params::Tunable;
use scoring::{Insight, ScoringPolicy};

// ============================================================
// ERRORS
// ============================================================

pub type Result<T> = std::result::Result<T, AnalysisError>;

/// Errors that can occur while building inputs or configuration.
///
/// Row-level OHLC inconsistencies are not errors: such bars are skipped by
/// pattern detection and still take part in indicator math.
#[derive(Debug, Clone, thiserror::Error)]
pub enum AnalysisError {
    #[error("Invalid value: {0}")]
    InvalidValue(&'static str),

    #[error("{field} = {value} out of range [{min}, {max}]")]
    OutOfRange {
        field: &'static str,
        value: f64,
        min: f64,
        max: f64,
    },

    #[error("Invalid config: {0}")]
    InvalidConfig(String),

    #[error("Missing required field `{field}` at row {index}")]
    MissingField { index: usize, field: &'static str },

    #[error("Non-finite `{field}` at row {index}")]
    NonFinite { index: usize, field: &'static str },

    #[error("Timestamps must be strictly increasing: row {index} has {current} after {previous}")]
    NotIncreasing {
        index: usize,
        previous: i64,
        current: i64,
    },
}

// ============================================================
// VALIDATED TYPES
// ============================================================

/// Normalized value in range 0.0..=1.0
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd)]
pub struct Ratio(f64);

impl Ratio {
    /// Create a new Ratio, validating the value is in [0.0, 1.0]
    pub fn new(value: f64) -> Result<Self> {
        if value.is_nan() || value.is_infinite() {
            return Err(AnalysisError::InvalidValue(
                "Ratio cannot be NaN or infinite",
            ));
        }
        if !(0.0..=1.0).contains(&value) {
            return Err(AnalysisError::OutOfRange {
                field: "Ratio",
                value,
                min: 0.0,
                max: 1.0,
            });
        }
        Ok(Self(value))
    }

    /// Create a Ratio from a compile-time constant (library internal use)
    #[doc(hidden)]
    pub const fn new_const(value: f64) -> Self {
        Self(value)
    }

    #[inline]
    pub fn get(self) -> f64 {
        self.0
    }
}

impl serde::Serialize for Ratio {
    fn serialize<S: serde::Serializer>(&self, s: S) -> std::result::Result<S::Ok, S::Error> {
        self.0.serialize(s)
    }
}

impl<'de> serde::Deserialize<'de> for Ratio {
    fn deserialize<D: serde::Deserializer<'de>>(d: D) -> std::result::Result<Self, D::Error> {
        let value = f64::deserialize(d)?;
        Ratio::new(value).map_err(serde::de::Error::custom)
    }
}

/// Period (must be > 0)
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct Period(usize);

impl Period {
    /// Create a new Period, validating value is > 0
    pub fn new(value: usize) -> Result<Self> {
        if value == 0 {
            return Err(AnalysisError::InvalidValue("Period must be > 0"));
        }
        Ok(Self(value))
    }

    #[doc(hidden)]
    pub const fn new_const(value: usize) -> Self {
        Self(value)
    }

    #[inline]
    pub fn get(self) -> usize {
        self.0
    }
}

impl serde::Serialize for Period {
    fn serialize<S: serde::Serializer>(&self, s: S) -> std::result::Result<S::Ok, S::Error> {
        self.0.serialize(s)
    }
}

impl<'de> serde::Deserialize<'de> for Period {
    fn deserialize<D: serde::Deserializer<'de>>(d: D) -> std::result::Result<Self, D::Error> {
        let value = usize::deserialize(d)?;
        Period::new(value).map_err(serde::de::Error::custom)
    }
}

// ============================================================
// OHLCV TRAITS
// ============================================================

/// Core OHLCV data trait
pub trait OHLCV {
    fn timestamp(&self) -> i64;
    fn open(&self) -> f64;
    fn high(&self) -> f64;
    fn low(&self) -> f64;
    fn close(&self) -> f64;
    fn volume(&self) -> f64;
}

/// Extension trait with computed properties for OHLCV data
pub trait OHLCVExt: OHLCV {
    #[inline]
    fn body(&self) -> f64 {
        (self.close() - self.open()).abs()
    }

    #[inline]
    fn range(&self) -> f64 {
        self.high() - self.low()
    }

    #[inline]
    fn upper_shadow(&self) -> f64 {
        self.high() - self.open().max(self.close())
    }

    #[inline]
    fn lower_shadow(&self) -> f64 {
        self.open().min(self.close()) - self.low()
    }

    #[inline]
    fn is_bullish(&self) -> bool {
        self.close() > self.open()
    }

    #[inline]
    fn is_bearish(&self) -> bool {
        self.close() < self.open()
    }

    /// Midpoint of the real body
    #[inline]
    fn body_midpoint(&self) -> f64 {
        (self.open() + self.close()) / 2.0
    }

    /// Typical price (H + L + C) / 3
    #[inline]
    fn typical_price(&self) -> f64 {
        (self.high() + self.low() + self.close()) / 3.0
    }

    /// Body as ratio of range. Returns None if range ≈ 0
    #[inline]
    fn body_ratio(&self) -> Option<f64> {
        let range = self.range();
        (range > f64::EPSILON).then(|| self.body() / range)
    }

    /// `low <= min(open, close) <= max(open, close) <= high`
    #[inline]
    fn is_consistent(&self) -> bool {
        let lo = self.open().min(self.close());
        let hi = self.open().max(self.close());
        self.low() <= lo && hi <= self.high()
    }
}

impl<T: OHLCV> OHLCVExt for T {}

// ============================================================
// BARS AND SERIES
// ============================================================

/// One time-ordered OHLCV record
#[derive(Debug, Clone, Copy, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct Bar {
    pub timestamp: i64,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub volume: f64,
}

impl Bar {
    pub fn new(timestamp: i64, open: f64, high: f64, low: f64, close: f64, volume: f64) -> Self {
        Self {
            timestamp,
            open,
            high,
            low,
            close,
            volume,
        }
    }

    fn check_finite(&self, index: usize) -> Result<()> {
        let fields = [
            ("open", self.open),
            ("high", self.high),
            ("low", self.low),
            ("close", self.close),
            ("volume", self.volume),
        ];
        match fields.iter().find(|(_, v)| !v.is_finite()) {
            Some(&(field, _)) => Err(AnalysisError::NonFinite { index, field }),
            None => Ok(()),
        }
    }
}

impl OHLCV for Bar {
    fn timestamp(&self) -> i64 {
        self.timestamp
    }

    fn open(&self) -> f64 {
        self.open
    }

    fn high(&self) -> f64 {
        self.high
    }

    fn low(&self) -> f64 {
        self.low
    }

    fn close(&self) -> f64 {
        self.close
    }

    fn volume(&self) -> f64 {
        self.volume
    }
}

/// Loader-facing record; every field may be absent.
#[derive(Debug, Clone, Copy, Default, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct RawBar {
    pub timestamp: Option<i64>,
    pub open: Option<f64>,
    pub high: Option<f64>,
    pub low: Option<f64>,
    pub close: Option<f64>,
    pub volume: Option<f64>,
}

impl RawBar {
    fn into_bar(self, index: usize) -> Result<Bar> {
        let missing = |field| AnalysisError::MissingField { index, field };
        Ok(Bar {
            timestamp: self.timestamp.ok_or_else(|| missing("timestamp"))?,
            open: self.open.ok_or_else(|| missing("open"))?,
            high: self.high.ok_or_else(|| missing("high"))?,
            low: self.low.ok_or_else(|| missing("low"))?,
            close: self.close.ok_or_else(|| missing("close"))?,
            volume: self.volume.ok_or_else(|| missing("volume"))?,
        })
    }
}

/// Immutable, strictly time-ordered sequence of bars.
///
/// Construction rejects the whole input on the first missing field, non-finite
/// value or non-increasing timestamp. Bars whose OHLC values are inconsistent
/// are kept; they keep their slot so indicator windows stay aligned.
#[derive(Debug, Clone, Default, PartialEq, serde::Serialize)]
pub struct Series {
    bars: Vec<Bar>,
}

impl Series {
    pub fn new(bars: Vec<Bar>) -> Result<Self> {
        for (i, bar) in bars.iter().enumerate() {
            bar.check_finite(i)?;
            if i > 0 && bar.timestamp <= bars[i - 1].timestamp {
                return Err(AnalysisError::NotIncreasing {
                    index: i,
                    previous: bars[i - 1].timestamp,
                    current: bar.timestamp,
                });
            }
        }
        Ok(Self { bars })
    }

    /// Schema check followed by [`Series::new`]
    pub fn from_raw(rows: Vec<RawBar>) -> Result<Self> {
        let bars = rows
            .into_iter()
            .enumerate()
            .map(|(i, row)| row.into_bar(i))
            .collect::<Result<Vec<_>>>()?;
        Self::new(bars)
    }

    /// Copy any OHLCV source into a validated series
    pub fn from_ohlcv<T: OHLCV>(items: &[T]) -> Result<Self> {
        Self::new(
            items
                .iter()
                .map(|b| Bar::new(b.timestamp(), b.open(), b.high(), b.low(), b.close(), b.volume()))
                .collect(),
        )
    }

    #[inline]
    pub fn bars(&self) -> &[Bar] {
        &self.bars
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
    pub fn latest(&self) -> Option<&Bar> {
        self.bars.last()
    }
}

impl<'de> serde::Deserialize<'de> for Series {
    fn deserialize<D: serde::Deserializer<'de>>(d: D) -> std::result::Result<Self, D::Error> {
        #[derive(serde::Deserialize)]
        struct Raw {
            bars: Vec<Bar>,
        }
        let raw = Raw::deserialize(d)?;
        Series::new(raw.bars).map_err(serde::de::Error::custom)
    }
}

// ============================================================
// PATTERN EVENTS
// ============================================================

/// Direction/bias of a pattern
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
pub enum Direction {
    Bullish,
    Neutral,
    Bearish,
}

impl Direction {
    #[inline]
    pub fn is_bullish(self) -> bool {
        matches!(self, Direction::Bullish)
    }

    #[inline]
    pub fn is_bearish(self) -> bool {
        matches!(self, Direction::Bearish)
    }

    /// +1 bullish, -1 bearish, 0 neutral
    #[inline]
    pub fn sign(self) -> f64 {
        match self {
            Direction::Bullish => 1.0,
            Direction::Neutral => 0.0,
            Direction::Bearish => -1.0,
        }
    }
}

impl std::fmt::Display for Direction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            Direction::Bullish => "Bullish",
            Direction::Neutral => "Neutral",
            Direction::Bearish => "Bearish",
        })
    }
}

/// Whether the bar behind an event has closed
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub enum Status {
    #[default]
    Confirmed,
    Unconfirmed,
}

/// Raw detector output - Copy, no allocations
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PatternMatch {
    pub kind: PatternKind,
    pub start_index: usize,
    pub end_index: usize,
}

/// A classified bar: at most one per bar index.
#[derive(Debug, Clone, Copy, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct PatternEvent {
    /// Index of the bar completing the pattern
    pub index: usize,
    pub timestamp: i64,
    pub kind: PatternKind,
    pub category: catalog::Category,
    pub signal: Direction,
    /// Close of the completing bar
    pub price: f64,
    /// Catalog weight: 1 weak, 2 medium, 3 strong
    pub score: u8,
    pub status: Status,
}

impl PatternEvent {
    fn from_match<T: OHLCV>(m: PatternMatch, bar: &T) -> Self {
        let entry = m.kind.entry();
        Self {
            index: m.end_index,
            timestamp: bar.timestamp(),
            kind: m.kind,
            category: entry.category,
            signal: entry.signal,
            price: bar.close(),
            score: entry.score,
            status: Status::Confirmed,
        }
    }

    /// Caller annotation for a bar that is still forming
    pub fn mark_unconfirmed(&mut self) {
        self.status = Status::Unconfirmed;
    }
}

/// Live/intraday helper: flag every event on the still-forming bar.
pub fn mark_forming(events: &mut [PatternEvent], forming_timestamp: i64) {
    events
        .iter_mut()
        .filter(|e| e.timestamp == forming_timestamp)
        .for_each(PatternEvent::mark_unconfirmed);
}

// ============================================================
// CANDLE CONTEXT
// ============================================================

/// Volatility context at a specific bar
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct CandleContext {
    /// Average body size over the trailing window ending at this bar
    pub avg_body: f64,
    /// Average range (high - low) over the same window
    pub avg_range: f64,
}

/// Provider of candle context - precomputes context for all bars. Every
/// detector, including each leg of the three-bar rules, reads its averages
/// from these contexts.
pub trait ContextProvider: Send + Sync {
    fn compute_all<T: OHLCV>(&self, bars: &[T]) -> Vec<CandleContext>;
}

/// Rolling means over a trailing window that includes the current bar.
/// Early bars average whatever history exists (minimum one bar).
#[derive(Debug, Clone)]
pub struct RollingContextProvider {
    pub candle_period: Period,
}

impl Default for RollingContextProvider {
    fn default() -> Self {
        Self {
            candle_period: Period::new_const(detectors::helpers::CANDLE_PERIOD),
        }
    }
}

impl ContextProvider for RollingContextProvider {
    fn compute_all<T: OHLCV>(&self, bars: &[T]) -> Vec<CandleContext> {
        let period = self.candle_period.get();
        (0..bars.len())
            .map(|i| CandleContext {
                avg_body: detectors::helpers::trailing_avg_body(bars, i, period),
                avg_range: detectors::helpers::trailing_avg_range(bars, i, period),
            })
            .collect()
    }
}

// ============================================================
// PATTERN DETECTOR TRAIT
// ============================================================

/// Generic pattern detector trait
pub trait PatternDetector: Send + Sync {
    fn name(&self) -> &'static str;
    fn min_bars(&self) -> usize;
    /// `contexts` is aligned with `bars`.
    fn detect<T: OHLCV>(
        &self,
        bars: &[T],
        index: usize,
        contexts: &[CandleContext],
    ) -> Option<PatternMatch>;

    fn validate_config(&self) -> Result<()> {
        Ok(())
    }
}

// ============================================================
// DETECTION RULES - generated via macro
// ============================================================

use detectors::*;

/// Macro to generate the Rule enum without boilerplate
macro_rules! define_detection_rules {
    (
        $(
            $variant:ident($detector:ty)
        ),* $(,)?
    ) => {
        /// One entry of the detection cascade - enum dispatch, no vtable
        #[derive(Debug, Clone)]
        pub enum Rule {
            $($variant($detector)),*
        }

        impl Rule {
            #[inline]
            pub fn detect<T: OHLCV>(
                &self,
                bars: &[T],
                index: usize,
                contexts: &[CandleContext],
            ) -> Option<PatternMatch> {
                match self {
                    $(Self::$variant(d) => PatternDetector::detect(d, bars, index, contexts)),*
                }
            }

            #[inline]
            pub fn name(&self) -> &'static str {
                match self {
                    $(Self::$variant(d) => PatternDetector::name(d)),*
                }
            }

            #[inline]
            pub fn min_bars(&self) -> usize {
                match self {
                    $(Self::$variant(d) => PatternDetector::min_bars(d)),*
                }
            }

            pub fn validate_config(&self) -> Result<()> {
                match self {
                    $(Self::$variant(d) => PatternDetector::validate_config(d)),*
                }
            }
        }
    };
}

define_detection_rules! {
    // Three bar
    MorningStar(MorningStarDetector),
    EveningStar(EveningStarDetector),
    // Two bar
    Engulfing(EngulfingDetector),
    // Single bar
    Doji(DojiDetector),
    Hammer(HammerDetector),
    ShootingStar(ShootingStarDetector),
    Marubozu(MarubozuDetector),
}

impl Rule {
    /// The canonical first-match-wins order: three-bar, two-bar, then
    /// Doji → Hammer → Shooting Star → Marubozu.
    pub fn cascade(thresholds: &DetectorThresholds) -> Vec<Rule> {
        vec![
            Rule::MorningStar(MorningStarDetector::from_thresholds(thresholds)),
            Rule::EveningStar(EveningStarDetector::from_thresholds(thresholds)),
            Rule::Engulfing(EngulfingDetector::from_thresholds(thresholds)),
            Rule::Doji(DojiDetector::from_thresholds(thresholds)),
            Rule::Hammer(HammerDetector::from_thresholds(thresholds)),
            Rule::ShootingStar(ShootingStarDetector::from_thresholds(thresholds)),
            Rule::Marubozu(MarubozuDetector::from_thresholds(thresholds)),
        ]
    }
}

// ============================================================
// ANALYZER
// ============================================================

/// Everything the core produces for one series
#[derive(Debug, Clone, serde::Serialize)]
pub struct Analysis {
    pub augmented: AugmentedSeries,
    pub events: Vec<PatternEvent>,
    pub insight: Insight,
    pub kpis: Kpis,
}

/// Main analysis engine. Holds only read-only configuration, so one
/// instance can serve any number of concurrent calls.
pub struct Analyzer<C: ContextProvider = RollingContextProvider> {
    rules: Vec<Rule>,
    context_provider: C,
    indicator_settings: IndicatorSettings,
    scoring: ScoringPolicy,
}

impl Default for Analyzer<RollingContextProvider> {
    fn default() -> Self {
        let thresholds = DetectorThresholds::default();
        Self {
            rules: Rule::cascade(&thresholds),
            context_provider: RollingContextProvider {
                candle_period: thresholds.candle_period,
            },
            indicator_settings: IndicatorSettings::default(),
            scoring: ScoringPolicy::default(),
        }
    }
}

impl<C: ContextProvider> Analyzer<C> {
    // ===========================================
    // LOW-LEVEL: Primitives
    // ===========================================

    /// Precompute candle contexts for all bars.
    #[inline]
    pub fn compute_contexts<T: OHLCV>(&self, bars: &[T]) -> Vec<CandleContext> {
        self.context_provider.compute_all(bars)
    }

    pub fn rules(&self) -> &[Rule] {
        &self.rules
    }

    pub fn scoring_policy(&self) -> &ScoringPolicy {
        &self.scoring
    }

    pub fn indicator_settings(&self) -> &IndicatorSettings {
        &self.indicator_settings
    }

    // ===========================================
    // MID-LEVEL: Single stages
    // ===========================================

    /// Classify one bar: first matching rule wins. `contexts` comes from
    /// [`Analyzer::compute_contexts`] over the same bars.
    pub fn detect_at<T: OHLCV>(
        &self,
        bars: &[T],
        index: usize,
        contexts: &[CandleContext],
    ) -> Option<PatternEvent> {
        if index == 0 || index >= bars.len() {
            return None;
        }
        let bar = &bars[index];
        if !bar.is_consistent() || !bars[index - 1].is_consistent() {
            trace!(index, "skipping bar failing OHLC consistency");
            return None;
        }
        if bar.range() <= 0.0 {
            return None;
        }

        self.rules
            .iter()
            .filter(|rule| index + 1 >= rule.min_bars())
            .find_map(|rule| rule.detect(bars, index, contexts))
            .map(|m| PatternEvent::from_match(m, bar))
    }

    /// Indicator engine stage
    pub fn indicators(&self, series: &Series) -> AugmentedSeries {
        indicators::compute_indicators(series, &self.indicator_settings)
    }

    /// Pattern detection stage: ordered, at most one event per bar.
    pub fn detect(&self, augmented: &AugmentedSeries) -> Vec<PatternEvent> {
        self.iter(augmented).filter_map(|e| e.event).collect()
    }

    /// Scoring / insight stage
    pub fn insight(&self, augmented: &AugmentedSeries, events: &[PatternEvent]) -> Insight {
        scoring::build_insight(augmented, events, &self.scoring)
    }

    /// KPI stage
    pub fn kpis(&self, augmented: &AugmentedSeries, previous_close: Option<f64>) -> Kpis {
        kpis::compute_kpis(augmented.bars(), previous_close)
    }

    /// Iterate bars with their (optional) event.
    pub fn iter<'a>(&'a self, augmented: &'a AugmentedSeries) -> EventIterator<'a, C> {
        EventIterator::new(self, augmented.bars())
    }

    // ===========================================
    // HIGH-LEVEL: Whole pipeline
    // ===========================================

    pub fn analyze(&self, series: &Series, previous_close: Option<f64>) -> Analysis {
        let augmented = self.indicators(series);
        let events = self.detect(&augmented);
        let kpis = self.kpis(&augmented, previous_close);
        let insight = self.insight(&augmented, &events);

        debug!(
            bars = augmented.len(),
            events = events.len(),
            sentiment = %insight.sentiment,
            score = insight.score,
            "analysis complete"
        );

        Analysis {
            augmented,
            events,
            insight,
            kpis,
        }
    }

    /// Schema check plus [`Analyzer::analyze`]
    pub fn analyze_raw(&self, rows: Vec<RawBar>, previous_close: Option<f64>) -> Result<Analysis> {
        let series = Series::from_raw(rows)?;
        Ok(self.analyze(&series, previous_close))
    }

    fn validate(&self) -> Result<()> {
        if self.rules.is_empty() {
            return Err(AnalysisError::InvalidConfig("no detection rules".into()));
        }
        for rule in &self.rules {
            rule.validate_config()?;
        }
        self.indicator_settings.validate()?;
        self.scoring.validate()
    }
}

// ============================================================
// EVENT ITERATOR
// ============================================================

/// Event (if any) found at a specific bar
#[derive(Debug, Clone, Copy)]
pub struct BarEvent {
    pub index: usize,
    pub event: Option<PatternEvent>,
}

/// Iterator over bars with their classification
pub struct EventIterator<'a, C: ContextProvider> {
    analyzer: &'a Analyzer<C>,
    bars: &'a [Bar],
    contexts: Vec<CandleContext>,
    current: usize,
}

impl<'a, C: ContextProvider> EventIterator<'a, C> {
    fn new(analyzer: &'a Analyzer<C>, bars: &'a [Bar]) -> Self {
        let contexts = analyzer.compute_contexts(bars);
        Self {
            analyzer,
            bars,
            contexts,
            current: 0,
        }
    }
}

impl<'a, C: ContextProvider> Iterator for EventIterator<'a, C> {
    type Item = BarEvent;

    fn next(&mut self) -> Option<Self::Item> {
        if self.current >= self.bars.len() {
            return None;
        }

        let index = self.current;
        let event = self
            .analyzer
            .detect_at(self.bars, index, &self.contexts);

        self.current += 1;

        Some(BarEvent { index, event })
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let remaining = self.bars.len().saturating_sub(self.current);
        (remaining, Some(remaining))
    }
}

impl<'a, C: ContextProvider> ExactSizeIterator for EventIterator<'a, C> {}

// ============================================================
// BUILDER
// ============================================================

/// Builder for creating Analyzer instances
pub struct AnalyzerBuilder<C: ContextProvider = RollingContextProvider> {
    context_provider: Option<C>,
    rules: Vec<Rule>,
    thresholds: DetectorThresholds,
    indicator_settings: IndicatorSettings,
    scoring: ScoringPolicy,
}

impl Default for AnalyzerBuilder<RollingContextProvider> {
    fn default() -> Self {
        Self::new()
    }
}

impl AnalyzerBuilder<RollingContextProvider> {
    pub fn new() -> Self {
        Self {
            context_provider: None,
            rules: Vec::new(),
            thresholds: DetectorThresholds::default(),
            indicator_settings: IndicatorSettings::default(),
            scoring: ScoringPolicy::default(),
        }
    }

    /// Build the analyzer. Without explicit rules the canonical cascade is
    /// derived from the configured thresholds.
    pub fn build(self) -> Result<Analyzer<RollingContextProvider>> {
        self.thresholds.validate()?;
        let provider = self.context_provider.unwrap_or(RollingContextProvider {
            candle_period: self.thresholds.candle_period,
        });
        finish(provider, self.rules, &self.thresholds, self.indicator_settings, self.scoring)
    }
}

impl<C: ContextProvider> AnalyzerBuilder<C> {
    /// Change context provider
    pub fn context_provider<C2: ContextProvider>(self, provider: C2) -> AnalyzerBuilder<C2> {
        AnalyzerBuilder {
            context_provider: Some(provider),
            rules: self.rules,
            thresholds: self.thresholds,
            indicator_settings: self.indicator_settings,
            scoring: self.scoring,
        }
    }

    /// Detection thresholds used for the default cascade
    pub fn thresholds(mut self, thresholds: DetectorThresholds) -> Self {
        self.thresholds = thresholds;
        self
    }

    pub fn indicator_settings(mut self, settings: IndicatorSettings) -> Self {
        self.indicator_settings = settings;
        self
    }

    pub fn scoring(mut self, policy: ScoringPolicy) -> Self {
        self.scoring = policy;
        self
    }

    /// Append a rule to a custom cascade (evaluated in insertion order)
    #[allow(clippy::should_implement_trait)]
    pub fn add(mut self, rule: Rule) -> Self {
        self.rules.push(rule);
        self
    }
}

impl<C: ContextProvider> AnalyzerBuilder<C> {
    /// Build with a custom context provider
    pub fn build_with_provider(self) -> Result<Analyzer<C>> {
        self.thresholds.validate()?;
        let provider = self
            .context_provider
            .ok_or_else(|| AnalysisError::InvalidConfig("context provider not set".into()))?;
        finish(provider, self.rules, &self.thresholds, self.indicator_settings, self.scoring)
    }
}

fn finish<C: ContextProvider>(
    context_provider: C,
    rules: Vec<Rule>,
    thresholds: &DetectorThresholds,
    indicator_settings: IndicatorSettings,
    scoring: ScoringPolicy,
) -> Result<Analyzer<C>> {
    let rules = if rules.is_empty() {
        Rule::cascade(thresholds)
    } else {
        rules
    };
    let analyzer = Analyzer {
        rules,
        context_provider,
        indicator_settings,
        scoring,
    };
    analyzer.validate()?;
    Ok(analyzer)
}

// ============================================================
// PARALLEL ANALYSIS
// ============================================================

use rayon::prelude::*;

/// Result of analysing a single instrument
#[derive(Debug)]
pub struct ScanResult {
    pub symbol: String,
    pub analysis: Analysis,
}

/// Error from analysing a single instrument
#[derive(Debug)]
pub struct ScanError {
    pub symbol: String,
    pub error: AnalysisError,
}

/// Analyse independent instruments in parallel. Each series is processed
/// on its own; nothing is aggregated across instruments.
pub fn analyze_parallel<'a, I, C>(
    analyzer: &Analyzer<C>,
    instruments: I,
) -> (Vec<ScanResult>, Vec<ScanError>)
where
    I: IntoParallelIterator<Item = (&'a str, &'a [RawBar])>,
    C: ContextProvider + Sync,
{
    let results: Vec<_> = instruments
        .into_par_iter()
        .map(|(symbol, rows)| {
            analyzer
                .analyze_raw(rows.to_vec(), None)
                .map(|analysis| ScanResult {
                    symbol: symbol.to_string(),
                    analysis,
                })
                .map_err(|error| ScanError {
                    symbol: symbol.to_string(),
                    error,
                })
        })
        .collect();

    let mut successes = Vec::new();
    let mut errors = Vec::new();

    for result in results {
        match result {
            Ok(r) => successes.push(r),
            Err(e) => errors.push(e),
        }
    }

    (successes, errors)
}

// ============================================================
// TESTS
// ============================================================
