//! Scalar headline figures for a series.

use crate::OHLCV;

/// Bars per trading year
pub const TRADING_DAYS: usize = 252;
/// Minimum history for the high to be reported as a 52-week high
pub const FIFTY_TWO_WEEK_MIN_BARS: usize = 200;

/// Which figure the reported high covers
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub enum HighLabel {
    /// Max of the last 252 highs
    FiftyTwoWeek,
    /// Max of every high in the series
    #[default]
    Period,
}

impl HighLabel {
    pub fn label(self) -> &'static str {
        match self {
            HighLabel::FiftyTwoWeek => "52W High",
            HighLabel::Period => "Period High",
        }
    }
}

impl std::fmt::Display for HighLabel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}

/// Reference price the return was measured against
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub enum ReturnBasis {
    /// Caller-supplied previous close
    PreviousClose,
    /// Close of the bar before the latest
    PriorBar,
    /// Open of the latest bar
    Intrabar,
    #[default]
    Unavailable,
}

/// Headline reading of the latest move
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub enum KpiSignal {
    /// Positive return on above-average volume
    VolumeBackedAdvance,
    /// Negative return
    ShortTermWeakness,
    #[default]
    Consolidating,
}

impl KpiSignal {
    /// Classify a return (percent) and the latest volume against the average
    pub fn classify(return_pct: f64, latest_volume: f64, avg_volume: f64) -> Self {
        if return_pct > 0.0 && latest_volume > avg_volume {
            KpiSignal::VolumeBackedAdvance
        } else if return_pct < 0.0 {
            KpiSignal::ShortTermWeakness
        } else {
            KpiSignal::Consolidating
        }
    }

    pub fn message(self) -> &'static str {
        match self {
            KpiSignal::VolumeBackedAdvance => "Bullish move supported by strong volume.",
            KpiSignal::ShortTermWeakness => "Stock closed lower – short-term weakness.",
            KpiSignal::Consolidating => "Stock is consolidating.",
        }
    }
}

impl std::fmt::Display for KpiSignal {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.message())
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, serde::Serialize)]
pub struct Kpis {
    pub latest_close: f64,
    /// Percent return of the latest close over `return_basis`
    pub return_pct: f64,
    pub return_basis: ReturnBasis,
    pub high: f64,
    pub high_label: HighLabel,
    /// Annualized volatility of daily returns, in percent
    pub volatility_pct: f64,
    pub avg_volume: f64,
    pub signal: KpiSignal,
}

/// Compute the KPI bundle. An empty input yields all zeros.
pub fn compute_kpis<T: OHLCV>(bars: &[T], previous_close: Option<f64>) -> Kpis {
    let Some(latest) = bars.last() else {
        return Kpis::default();
    };
    let latest_close = latest.close();

    let (return_pct, return_basis) = latest_return(bars, previous_close);
    let (high, high_label) = high(bars);
    let avg_volume = bars.iter().map(|b| b.volume()).sum::<f64>() / bars.len() as f64;

    Kpis {
        latest_close,
        return_pct,
        return_basis,
        high,
        high_label,
        volatility_pct: annualized_volatility(bars),
        avg_volume,
        signal: KpiSignal::classify(return_pct, latest.volume(), avg_volume),
    }
}

fn latest_return<T: OHLCV>(bars: &[T], previous_close: Option<f64>) -> (f64, ReturnBasis) {
    let Some(latest) = bars.last() else {
        return (0.0, ReturnBasis::Unavailable);
    };
    let close = latest.close();
    let usable = |v: f64| v.is_finite() && v != 0.0;

    if let Some(prev) = previous_close.filter(|&p| usable(p)) {
        return ((close - prev) / prev * 100.0, ReturnBasis::PreviousClose);
    }
    if let Some(prior) = bars.len().checked_sub(2).map(|i| bars[i].close()) {
        if usable(prior) {
            return ((close - prior) / prior * 100.0, ReturnBasis::PriorBar);
        }
    }
    let open = latest.open();
    if usable(open) {
        return ((close - open) / open * 100.0, ReturnBasis::Intrabar);
    }
    (0.0, ReturnBasis::Unavailable)
}

fn high<T: OHLCV>(bars: &[T]) -> (f64, HighLabel) {
    let max = |slice: &[T]| slice.iter().map(|b| b.high()).fold(f64::NEG_INFINITY, f64::max);
    if bars.len() >= FIFTY_TWO_WEEK_MIN_BARS {
        let start = bars.len().saturating_sub(TRADING_DAYS);
        (max(&bars[start..]), HighLabel::FiftyTwoWeek)
    } else {
        (max(bars), HighLabel::Period)
    }
}

/// Sample standard deviation of close-to-close returns, annualized. Returns
/// after a zero close are skipped; fewer than two returns give 0.
pub fn annualized_volatility<T: OHLCV>(bars: &[T]) -> f64 {
    let returns: Vec<f64> = bars
        .windows(2)
        .filter(|w| w[0].close() != 0.0)
        .map(|w| (w[1].close() - w[0].close()) / w[0].close())
        .collect();
    if returns.len() < 2 {
        return 0.0;
    }
    let n = returns.len() as f64;
    let mean = returns.iter().sum::<f64>() / n;
    let variance = returns.iter().map(|r| (r - mean).powi(2)).sum::<f64>() / (n - 1.0);
    variance.sqrt() * (TRADING_DAYS as f64).sqrt() * 100.0
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Bar;

    fn closes(values: &[f64]) -> Vec<Bar> {
        values
            .iter()
            .enumerate()
            .map(|(i, &c)| Bar::new(i as i64, c, c + 1.0, c - 1.0, c, 100.0 + i as f64))
            .collect()
    }

    #[test]
    fn test_empty_is_zero() {
        let kpis = compute_kpis::<Bar>(&[], Some(100.0));
        assert_eq!(kpis, Kpis::default());
        assert_eq!(kpis.latest_close, 0.0);
        assert_eq!(kpis.high_label, HighLabel::Period);
    }

    #[test]
    fn test_return_priority() {
        let bars = closes(&[100.0, 110.0]);
        let external = compute_kpis(&bars, Some(88.0));
        assert_eq!(external.return_basis, ReturnBasis::PreviousClose);
        assert!((external.return_pct - 25.0).abs() < 1e-9);

        let prior = compute_kpis(&bars, None);
        assert_eq!(prior.return_basis, ReturnBasis::PriorBar);
        assert!((prior.return_pct - 10.0).abs() < 1e-9);

        // zero external close falls through to the prior bar
        assert_eq!(compute_kpis(&bars, Some(0.0)).return_basis, ReturnBasis::PriorBar);
    }

    #[test]
    fn test_return_intrabar_fallback() {
        let single = [Bar::new(0, 50.0, 56.0, 49.0, 55.0, 10.0)];
        let kpis = compute_kpis(&single, None);
        assert_eq!(kpis.return_basis, ReturnBasis::Intrabar);
        assert!((kpis.return_pct - 10.0).abs() < 1e-9);

        let zero_prior = [Bar::new(0, 0.0, 1.0, 0.0, 0.0, 1.0), Bar::new(1, 2.0, 3.0, 1.0, 3.0, 1.0)];
        let kpis = compute_kpis(&zero_prior, None);
        assert_eq!(kpis.return_basis, ReturnBasis::Intrabar);
        assert!((kpis.return_pct - 50.0).abs() < 1e-9);
    }

    #[test]
    fn test_high_label_boundary() {
        let mut values: Vec<f64> = (0..199).map(|i| 100.0 + (i % 7) as f64).collect();
        values[0] = 500.0;
        let short = compute_kpis(&closes(&values), None);
        assert_eq!(short.high_label, HighLabel::Period);
        assert_eq!(short.high, 501.0);

        values.push(100.0);
        let long = compute_kpis(&closes(&values), None);
        assert_eq!(long.high_label, HighLabel::FiftyTwoWeek);
        assert_eq!(long.high_label.to_string(), "52W High");
    }

    #[test]
    fn test_fifty_two_week_window() {
        // the early spike falls outside the last 252 bars
        let mut values = vec![100.0; 300];
        values[10] = 900.0;
        let kpis = compute_kpis(&closes(&values), None);
        assert_eq!(kpis.high, 101.0);
    }

    #[test]
    fn test_volatility() {
        let flat = closes(&[100.0; 10]);
        assert_eq!(annualized_volatility(&flat), 0.0);
        assert_eq!(annualized_volatility(&closes(&[100.0, 101.0])), 0.0);

        // returns +1%, -1%: mean 0, sample std sqrt(2 * 1e-4)
        let bars = closes(&[100.0, 101.0, 99.99]);
        let expected = (2.0f64 * 1e-4).sqrt() * 252f64.sqrt() * 100.0;
        assert!((annualized_volatility(&bars) - expected).abs() < 1e-9);
    }

    #[test]
    fn test_signal_volume_backed_advance() {
        // latest volume 102 above the 101 average
        let kpis = compute_kpis(&closes(&[10.0, 11.0, 12.0]), None);
        assert_eq!(kpis.signal, KpiSignal::VolumeBackedAdvance);
        assert_eq!(kpis.signal.to_string(), "Bullish move supported by strong volume.");
    }

    #[test]
    fn test_signal_weakness() {
        let kpis = compute_kpis(&closes(&[12.0, 11.0, 10.0]), None);
        assert!(kpis.return_pct < 0.0);
        assert_eq!(kpis.signal, KpiSignal::ShortTermWeakness);
    }

    #[test]
    fn test_signal_consolidating() {
        // rising close on below-average volume
        let bars = [
            Bar::new(0, 10.0, 11.0, 9.0, 10.0, 500.0),
            Bar::new(1, 10.0, 12.0, 10.0, 11.0, 100.0),
        ];
        assert_eq!(compute_kpis(&bars, None).signal, KpiSignal::Consolidating);

        let flat = compute_kpis(&closes(&[10.0, 10.0]), None);
        assert_eq!(flat.return_pct, 0.0);
        assert_eq!(flat.signal, KpiSignal::Consolidating);
        assert_eq!(compute_kpis::<Bar>(&[], None).signal, KpiSignal::Consolidating);
    }

    #[test]
    fn test_avg_volume_and_latest() {
        let kpis = compute_kpis(&closes(&[10.0, 11.0, 12.0]), None);
        assert_eq!(kpis.latest_close, 12.0);
        assert_eq!(kpis.avg_volume, 101.0);
    }
}
