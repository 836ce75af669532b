//! Configuration loading through serde.

use std::collections::HashMap;

use candlescope::prelude::*;

#[test]
fn test_partial_thresholds_use_defaults() {
    let thresholds: DetectorThresholds =
        serde_json::from_str(r#"{ "volatility_factor": 1.0, "candle_period": 20 }"#).unwrap();
    assert_eq!(thresholds.volatility_factor, 1.0);
    assert_eq!(thresholds.candle_period.get(), 20);
    assert_eq!(thresholds.doji_body_ratio, DetectorThresholds::default().doji_body_ratio);
}

#[test]
fn test_invalid_ratio_rejected_on_load() {
    let result: std::result::Result<DetectorThresholds, _> = serde_json::from_str(r#"{ "doji_body_ratio": 1.5 }"#);
    assert!(result.is_err());

    let result: std::result::Result<IndicatorSettings, _> = serde_json::from_str(r#"{ "fast_ma": 0 }"#);
    assert!(result.is_err());
}

#[test]
fn test_scoring_policy_from_json() {
    let policy: ScoringPolicy =
        serde_json::from_str(r#"{ "trend_gating": false, "window": 10 }"#).unwrap();
    assert!(!policy.trend_gating);
    assert_eq!(policy.window.get(), 10);
    assert_eq!(policy.strong_threshold, 8.0);

    let analyzer = AnalyzerBuilder::new().scoring(policy.clone()).build().unwrap();
    assert_eq!(analyzer.scoring_policy(), &policy);
}

#[test]
fn test_out_of_range_settings_fail_build() {
    let settings: IndicatorSettings =
        serde_json::from_str(r#"{ "breakout_volume_factor": 50.0 }"#).unwrap();
    assert!(AnalyzerBuilder::new().indicator_settings(settings).build().is_err());
}

#[test]
fn test_with_params() {
    let mut params = HashMap::new();
    params.insert("shadow_factor", 3.0);
    let thresholds = DetectorThresholds::with_params(&params).unwrap();
    assert_eq!(thresholds.shadow_factor, 3.0);

    let names: Vec<_> = DetectorThresholds::param_meta().iter().map(|p| p.name).collect();
    assert!(names.contains(&"significance_floor"));
}

#[test]
fn test_series_deserialize_validates() {
    let ok: Series = serde_json::from_str(
        r#"{ "bars": [
            { "timestamp": 1, "open": 1.0, "high": 2.0, "low": 0.5, "close": 1.5, "volume": 10.0 },
            { "timestamp": 2, "open": 1.5, "high": 2.0, "low": 1.0, "close": 1.2, "volume": 12.0 }
        ] }"#,
    )
    .unwrap();
    assert_eq!(ok.len(), 2);

    let unordered: std::result::Result<Series, _> = serde_json::from_str(
        r#"{ "bars": [
            { "timestamp": 2, "open": 1.0, "high": 2.0, "low": 0.5, "close": 1.5, "volume": 10.0 },
            { "timestamp": 1, "open": 1.5, "high": 2.0, "low": 1.0, "close": 1.2, "volume": 12.0 }
        ] }"#,
    );
    assert!(unordered.is_err());
}

#[test]
fn test_analysis_serializes() {
    let bars: Vec<Bar> = (0..30)
        .map(|i| {
            let base = 100.0 + i as f64;
            Bar::new(i, base, base + 2.0, base - 1.0, base + 1.0, 500.0)
        })
        .collect();
    let analysis = Analyzer::default().analyze(&Series::new(bars).unwrap(), None);
    let json = serde_json::to_value(&analysis).unwrap();
    assert_eq!(json["kpis"]["high_label"], "Period");
    // flat volume: a rising close alone is not volume backed
    assert_eq!(json["kpis"]["signal"], "Consolidating");
    assert!(json["insight"]["summary"].is_string());
}
