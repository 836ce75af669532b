//! Integration tests for candlescope pattern detection and the analysis
//! pipeline.
//!
//! These tests drive the public prelude only.

use candlescope::catalog;
use candlescope::prelude::*;

/// Simple test bar structure
#[derive(Debug, Clone, Copy)]
struct TestBar {
    t: i64,
    o: f64,
    h: f64,
    l: f64,
    c: f64,
}

impl TestBar {
    fn new(t: i64, o: f64, h: f64, l: f64, c: f64) -> Self {
        Self { t, o, h, l, c }
    }
}

impl OHLCV for TestBar {
    fn timestamp(&self) -> i64 {
        self.t
    }

    fn open(&self) -> f64 {
        self.o
    }

    fn high(&self) -> f64 {
        self.h
    }

    fn low(&self) -> f64 {
        self.l
    }

    fn close(&self) -> f64 {
        self.c
    }

    fn volume(&self) -> f64 {
        1000.0
    }
}

/// Generate downtrend bars
fn make_downtrend(n: usize) -> Vec<TestBar> {
    (0..n)
        .map(|i| {
            let base = 100.0 - (i as f64) * 2.0;
            TestBar::new(i as i64, base + 1.0, base + 2.0, base - 1.0, base - 0.5)
        })
        .collect()
}

/// Generate uptrend bars
fn make_uptrend(n: usize) -> Vec<TestBar> {
    (0..n)
        .map(|i| {
            let base = 100.0 + (i as f64) * 2.0;
            TestBar::new(i as i64, base - 0.5, base + 1.5, base - 1.5, base + 1.0)
        })
        .collect()
}

/// Generate sideways bars
fn make_sideways(n: usize) -> Vec<TestBar> {
    (0..n)
        .map(|i| TestBar::new(i as i64, 100.0, 102.0, 98.0, 101.0))
        .collect()
}

/// Append a bar with the next timestamp
fn push(bars: &mut Vec<TestBar>, o: f64, h: f64, l: f64, c: f64) {
    let t = bars.last().map_or(0, |b| b.t + 1);
    bars.push(TestBar::new(t, o, h, l, c));
}

fn detect<C: ContextProvider>(analyzer: &Analyzer<C>, bars: &[TestBar]) -> Vec<PatternEvent> {
    let series = Series::from_ohlcv(bars).unwrap();
    analyzer.detect(&analyzer.indicators(&series))
}

fn event_at(events: &[PatternEvent], index: usize) -> Option<&PatternEvent> {
    events.iter().find(|e| e.index == index)
}

// ============================================================
// SINGLE BAR PATTERN TESTS
// ============================================================

#[test]
fn test_doji_detection() {
    let mut bars = make_downtrend(10);
    // Perfect doji: open = close
    push(&mut bars, 80.0, 85.0, 75.0, 80.0);

    let events = detect(&Analyzer::default(), &bars);
    let doji = event_at(&events, 10).expect("doji at index 10");
    assert_eq!(doji.kind, PatternKind::Doji);
    assert_eq!(doji.signal, Direction::Neutral);
    assert_eq!(doji.category, Category::Indecision);
    assert_eq!(doji.score, 1);
    assert_eq!(doji.price, 80.0);
}

#[test]
fn test_zero_range_bar_has_no_event() {
    let mut bars = make_sideways(5);
    push(&mut bars, 100.0, 100.0, 100.0, 100.0);

    let events = detect(&Analyzer::default(), &bars);
    assert!(event_at(&events, 5).is_none());
}

#[test]
fn test_marubozu_after_quiet_bars() {
    let mut bars = make_sideways(10);
    push(&mut bars, 100.0, 105.0, 100.0, 105.0);

    let events = detect(&Analyzer::default(), &bars);
    let m = event_at(&events, 10).expect("marubozu at index 10");
    assert_eq!(m.kind, PatternKind::BullishMarubozu);
    assert_eq!(m.category, Category::StrongBullish);
}

// ============================================================
// CASCADE PRIORITY
// ============================================================

#[test]
fn test_engulfing_outranks_marubozu() {
    let mut bars = make_sideways(5);
    push(&mut bars, 60.0, 61.0, 59.0, 59.5);
    // engulfs the prior body and is also a full-range candle
    push(&mut bars, 59.0, 62.0, 59.0, 62.0);

    let marubozu_only = AnalyzerBuilder::new()
        .add(Rule::Marubozu(MarubozuDetector::with_defaults()))
        .build()
        .unwrap();
    let alone = detect(&marubozu_only, &bars);
    assert_eq!(event_at(&alone, 6).unwrap().kind, PatternKind::BullishMarubozu);

    let events = detect(&Analyzer::default(), &bars);
    assert_eq!(event_at(&events, 6).unwrap().kind, PatternKind::BullishEngulfing);
}

#[test]
fn test_morning_star_scenario() {
    let bars = vec![
        TestBar::new(0, 100.0, 100.5, 95.5, 96.0),
        TestBar::new(1, 95.5, 95.8, 95.0, 95.3),
        TestBar::new(2, 95.6, 99.2, 95.4, 99.0),
    ];

    let events = detect(&Analyzer::default(), &bars);
    let star = event_at(&events, 2).expect("morning star at index 2");
    assert_eq!(star.kind, PatternKind::MorningStar);
    assert_eq!(star.signal, Direction::Bullish);
    assert_eq!(star.score, 3);
}

#[test]
fn test_at_most_one_event_per_bar() {
    let mut bars = make_downtrend(30);
    bars.extend(make_uptrend(30).into_iter().map(|b| TestBar { t: b.t + 30, ..b }));

    let events = detect(&Analyzer::default(), &bars);
    assert!(events.windows(2).all(|w| w[0].index < w[1].index));
    assert!(events.iter().all(|e| e.index >= 1));
}

#[test]
fn test_detection_is_idempotent() {
    let mut bars = make_downtrend(20);
    push(&mut bars, 60.0, 65.0, 55.0, 60.2);
    push(&mut bars, 60.0, 66.0, 59.8, 65.5);

    let analyzer = Analyzer::default();
    assert_eq!(detect(&analyzer, &bars), detect(&analyzer, &bars));
}

// ============================================================
// INTEGRITY
// ============================================================

#[test]
fn test_inconsistent_bar_is_skipped() {
    let mut bars: Vec<TestBar> = (0..6)
        .map(|i| TestBar::new(i, 100.0, 105.0, 95.0, 100.0))
        .collect();
    // close above high
    bars[3] = TestBar::new(3, 100.0, 105.0, 95.0, 106.0);

    let analyzer = Analyzer::default();
    let series = Series::from_ohlcv(&bars).unwrap();
    let augmented = analyzer.indicators(&series);
    let indices: Vec<usize> = analyzer.detect(&augmented).iter().map(|e| e.index).collect();

    // bar 3 is invalid and bar 4 follows it
    assert_eq!(indices, [1, 2, 5]);
    // the bar still occupies its indicator slot
    assert_eq!(augmented.len(), 6);
    assert_eq!(augmented.indicators()[3].obv, 1000.0);
}

#[test]
fn test_analyze_raw_rejects_missing_field() {
    let rows = vec![RawBar {
        timestamp: Some(1),
        open: Some(1.0),
        high: None,
        low: Some(1.0),
        close: Some(1.0),
        volume: Some(1.0),
    }];
    let err = Analyzer::default().analyze_raw(rows, None).unwrap_err();
    assert!(matches!(err, AnalysisError::MissingField { index: 0, field: "high" }));
}

// ============================================================
// PIPELINE
// ============================================================

#[test]
fn test_uptrend_pipeline() {
    let series = Series::from_ohlcv(&make_uptrend(60)).unwrap();
    let analysis = Analyzer::default().analyze(&series, None);

    assert_eq!(analysis.augmented.len(), 60);
    assert_eq!(analysis.kpis.latest_close, 219.0);
    assert_eq!(analysis.kpis.high_label, HighLabel::Period);
    assert_eq!(analysis.kpis.return_basis, ReturnBasis::PriorBar);

    let insight = &analysis.insight;
    assert_eq!(insight.trend.direction, TrendDirection::Up);
    assert_eq!(insight.trend.modifier, 3.0);
    let momentum = insight.momentum.expect("momentum for a non-empty series");
    assert_eq!(momentum.rsi, Some(100.0));
    assert!(momentum.overbought);
    assert_eq!(momentum.candle, Direction::Bullish);
}

#[test]
fn test_downtrend_pipeline() {
    let series = Series::from_ohlcv(&make_downtrend(60)).unwrap();
    let analysis = Analyzer::default().analyze(&series, Some(0.0));

    // zero external close is ignored
    assert_eq!(analysis.kpis.return_basis, ReturnBasis::PriorBar);
    assert_eq!(analysis.kpis.signal, KpiSignal::ShortTermWeakness);
    assert_eq!(analysis.insight.trend.direction, TrendDirection::Down);
    assert_eq!(analysis.insight.trend.modifier, -3.0);
    let momentum = analysis.insight.momentum.unwrap();
    assert_eq!(momentum.rsi, Some(0.0));
    assert!(momentum.oversold);
}

#[test]
fn test_short_series_uses_fast_average() {
    let series = Series::from_ohlcv(&make_uptrend(25)).unwrap();
    let insight = Analyzer::default().analyze(&series, None).insight;
    assert_eq!(insight.trend.modifier, 2.0);
    assert!(!insight.trend.long_term);
}

#[test]
fn test_recommendation_carries_catalog_text() {
    let mut bars = make_sideways(10);
    push(&mut bars, 100.0, 105.0, 100.0, 105.0);
    let series = Series::from_ohlcv(&bars).unwrap();
    let insight = Analyzer::default().analyze(&series, None).insight;

    let latest = insight.latest_pattern.expect("marubozu survives filtering");
    assert_eq!(latest.kind, PatternKind::BullishMarubozu);
    let rec = &insight.recommendations[0];
    assert_eq!(rec.description, catalog::lookup(PatternKind::BullishMarubozu).description);
    assert!(insight.summary.contains("Bullish Marubozu"));
}

// ============================================================
// CUSTOM CONTEXT PROVIDER
// ============================================================

/// Context that treats every bar as tiny relative to the market
struct HugeVolatility;

impl ContextProvider for HugeVolatility {
    fn compute_all<T: OHLCV>(&self, bars: &[T]) -> Vec<CandleContext> {
        vec![
            CandleContext {
                avg_body: 1_000.0,
                avg_range: 1_000.0,
            };
            bars.len()
        ]
    }
}

#[test]
fn test_custom_context_provider() {
    let mut bars = make_sideways(10);
    push(&mut bars, 100.0, 105.0, 100.0, 105.0);
    let series = Series::from_ohlcv(&bars).unwrap();

    let analyzer = AnalyzerBuilder::new()
        .context_provider(HugeVolatility)
        .build_with_provider()
        .unwrap();
    let events = analyzer.detect(&analyzer.indicators(&series));
    assert!(event_at(&events, 10).is_none());
}

#[test]
fn test_custom_context_provider_reaches_star_legs() {
    let bars = vec![
        TestBar::new(0, 100.0, 100.5, 95.5, 96.0),
        TestBar::new(1, 95.5, 95.8, 95.0, 95.3),
        TestBar::new(2, 95.6, 99.2, 95.4, 99.0),
    ];
    assert!(event_at(&detect(&Analyzer::default(), &bars), 2).is_some());

    let analyzer = AnalyzerBuilder::new()
        .context_provider(HugeVolatility)
        .build_with_provider()
        .unwrap();
    assert!(event_at(&detect(&analyzer, &bars), 2).is_none());
}

#[test]
fn test_build_with_provider_requires_provider() {
    assert!(matches!(
        AnalyzerBuilder::new().build_with_provider(),
        Err(AnalysisError::InvalidConfig(_))
    ));
}

// ============================================================
// PARALLEL
// ============================================================

#[test]
fn test_parallel_matches_sequential() {
    let to_raw = |bars: Vec<TestBar>| -> Vec<RawBar> {
        bars.iter()
            .map(|b| RawBar {
                timestamp: Some(b.t),
                open: Some(b.o),
                high: Some(b.h),
                low: Some(b.l),
                close: Some(b.c),
                volume: Some(1000.0),
            })
            .collect()
    };
    let up = to_raw(make_uptrend(40));
    let down = to_raw(make_downtrend(40));

    let analyzer = Analyzer::default();
    let instruments: Vec<(&str, &[RawBar])> = vec![("UP", &up), ("DOWN", &down)];
    let (results, errors) = analyze_parallel(&analyzer, instruments);
    assert!(errors.is_empty());
    assert_eq!(results.len(), 2);

    for result in &results {
        let rows = if result.symbol == "UP" { &up } else { &down };
        let sequential = analyzer.analyze_raw(rows.clone(), None).unwrap();
        assert_eq!(result.analysis.events, sequential.events);
        assert_eq!(result.analysis.kpis, sequential.kpis);
    }
}
