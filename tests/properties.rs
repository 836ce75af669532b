//! Property tests for indicator and detection invariants.

use candlescope::indicators::{obv, rsi, sma};
use candlescope::prelude::*;
use proptest::prelude::*;

/// Bars that always satisfy the OHLC invariant
fn arb_bars(max_len: usize) -> impl Strategy<Value = Vec<Bar>> {
    prop::collection::vec(
        (1.0f64..500.0, -0.1f64..0.1, 0.0f64..0.05, 0.0f64..0.05, 0.0f64..10_000.0),
        0..max_len,
    )
    .prop_map(|rows| {
        rows.into_iter()
            .enumerate()
            .map(|(i, (open, change, up, down, volume))| {
                let close = open * (1.0 + change);
                let high = open.max(close) * (1.0 + up);
                let low = open.min(close) * (1.0 - down);
                Bar::new(i as i64, open, high, low, close, volume)
            })
            .collect()
    })
}

proptest! {
    #[test]
    fn rsi_is_bounded(closes in prop::collection::vec(1.0f64..1_000.0, 0..120)) {
        for value in rsi(&closes, 14).into_iter().flatten() {
            prop_assert!((0.0..=100.0).contains(&value));
        }
    }

    #[test]
    fn rsi_without_losses_is_100(
        steps in prop::collection::vec(0.0f64..5.0, 15..40),
        start in 1.0f64..100.0,
    ) {
        let closes: Vec<f64> = steps
            .iter()
            .scan(start, |price, step| {
                *price += step;
                Some(*price)
            })
            .collect();
        let last = rsi(&closes, 14).last().copied().flatten();
        prop_assert_eq!(last, Some(100.0));
    }

    #[test]
    fn obv_delta_is_volume_or_zero(bars in arb_bars(80)) {
        let values = obv(&bars);
        for i in 1..bars.len() {
            let delta = values[i] - values[i - 1];
            let expected = if bars[i].close > bars[i - 1].close {
                bars[i].volume
            } else if bars[i].close < bars[i - 1].close {
                -bars[i].volume
            } else {
                0.0
            };
            prop_assert!((delta - expected).abs() <= 1e-6 * (1.0 + values[i].abs()));
        }
    }

    #[test]
    fn volume_ma_definition(bars in arb_bars(80)) {
        let series = Series::new(bars.clone()).unwrap();
        let augmented = compute_indicators(&series, &IndicatorSettings::default());
        let volumes: Vec<f64> = bars.iter().map(|b| b.volume).collect();

        for (i, row) in augmented.indicators().iter().enumerate() {
            if i < 19 {
                prop_assert!(row.volume_ma20.is_none());
            } else {
                let mean = volumes[i - 19..=i].iter().sum::<f64>() / 20.0;
                let value = row.volume_ma20.unwrap();
                prop_assert!((value - mean).abs() <= 1e-9 * (1.0 + mean));
            }
        }
        prop_assert_eq!(sma(&volumes, 20).len(), volumes.len());
    }

    #[test]
    fn one_event_per_bar_and_idempotent(bars in arb_bars(120)) {
        let analyzer = Analyzer::default();
        let series = Series::new(bars).unwrap();
        let augmented = analyzer.indicators(&series);

        let first = analyzer.detect(&augmented);
        let second = analyzer.detect(&augmented);
        prop_assert_eq!(&first, &second);
        prop_assert!(first.windows(2).all(|w| w[0].index < w[1].index));
        prop_assert!(first.iter().all(|e| e.index >= 1 && e.index < series.len()));
    }

    #[test]
    fn analysis_outputs_are_finite(bars in arb_bars(120)) {
        let series = Series::new(bars).unwrap();
        let analysis = Analyzer::default().analyze(&series, None);
        let k = analysis.kpis;
        for value in [k.latest_close, k.return_pct, k.volatility_pct, k.avg_volume, analysis.insight.score] {
            prop_assert!(value.is_finite());
        }
        if !series.is_empty() {
            prop_assert!(k.high.is_finite());
        }
    }
}
