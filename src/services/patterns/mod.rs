//! Pattern detection over a bounded suffix of the candle history.
//!
//! The catalogue is closed: every [`PatternKind`] maps to exactly one
//! evaluator, and the detector walks them in catalogue order. Detection is a
//! pure function of the window, so two calls on the same candles agree.

mod candlestick;
mod chart;

use crate::types::{Candle, PatternDetail, PatternKind, PatternReport};
use chart::Pivots;
use thiserror::Error;
use tracing::debug;

/// Errors for a window the detector cannot interpret.
#[derive(Debug, Error, PartialEq)]
pub enum PatternError {
    #[error("candle {index} has a non-finite price")]
    NonFinitePrice { index: usize },
    #[error("candle {index} has high below low")]
    InvalidRange { index: usize },
    #[error("candle {index} is not after the previous candle")]
    OutOfOrder { index: usize },
}

/// Tuning for the chart formations.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PatternConfig {
    /// Candles on each side a pivot must dominate.
    pub pivot_span: usize,
    /// Relative difference under which two pivot prices count as the same level.
    pub price_tolerance: f64,
    /// Relative slope per bar under which a trend line counts as flat.
    pub flat_slope_tolerance: f64,
}

impl Default for PatternConfig {
    fn default() -> Self {
        Self {
            pivot_span: 3,
            price_tolerance: 0.0015,
            flat_slope_tolerance: 0.00005,
        }
    }
}

/// Detects the formations in [`PatternKind::ALL`].
#[derive(Debug, Clone, Default)]
pub struct PatternDetector {
    config: PatternConfig,
}

impl PatternDetector {
    pub fn new(config: PatternConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &PatternConfig {
        &self.config
    }

    /// Scan the last `lookback` candles of `history`.
    ///
    /// Returns an empty report when nothing matches or the window is too short
    /// for any formation.
    pub fn detect(&self, history: &[Candle], lookback: usize) -> Result<PatternReport, PatternError> {
        let start = history.len().saturating_sub(lookback);
        let window = &history[start..];
        validate(window)?;

        let mut report = PatternReport::default();
        if window.len() < 3 {
            return Ok(report);
        }

        let pivots = Pivots::find(window, self.config.pivot_span);
        for kind in PatternKind::ALL {
            let Some(confidence) = self.evaluate(kind, window, &pivots) else {
                continue;
            };
            let score = kind.contribution(confidence);
            debug!(pattern = kind.name(), confidence, score, "pattern detected");

            report.names.push(kind.name().to_string());
            report.net_score += score;
            report.details.insert(
                kind.name().to_string(),
                PatternDetail {
                    bias: kind.bias(),
                    score,
                    confidence,
                },
            );
        }

        Ok(report)
    }

    fn evaluate(&self, kind: PatternKind, window: &[Candle], pivots: &Pivots) -> Option<f64> {
        let config = &self.config;
        match kind {
            PatternKind::BullishEngulfing => candlestick::bullish_engulfing(window),
            PatternKind::BearishEngulfing => candlestick::bearish_engulfing(window),
            PatternKind::Hammer => candlestick::hammer(window),
            PatternKind::ShootingStar => candlestick::shooting_star(window),
            PatternKind::MorningStar => candlestick::morning_star(window),
            PatternKind::EveningStar => candlestick::evening_star(window),
            PatternKind::ThreeWhiteSoldiers => candlestick::three_white_soldiers(window),
            PatternKind::ThreeBlackCrows => candlestick::three_black_crows(window),
            PatternKind::DoubleTop => chart::double_top(window, pivots, config),
            PatternKind::DoubleBottom => chart::double_bottom(window, pivots, config),
            PatternKind::HeadAndShoulders => chart::head_and_shoulders(window, pivots, config),
            PatternKind::InverseHeadAndShoulders => {
                chart::inverse_head_and_shoulders(window, pivots, config)
            }
            PatternKind::AscendingTriangle => chart::ascending_triangle(window, pivots, config),
            PatternKind::DescendingTriangle => chart::descending_triangle(window, pivots, config),
            PatternKind::SymmetricalTriangle => chart::symmetrical_triangle(window, pivots, config),
        }
    }
}

fn validate(window: &[Candle]) -> Result<(), PatternError> {
    for (index, candle) in window.iter().enumerate() {
        if !candle.prices_finite() {
            return Err(PatternError::NonFinitePrice { index });
        }
        if candle.high < candle.low {
            return Err(PatternError::InvalidRange { index });
        }
        if index > 0 && candle.time <= window[index - 1].time {
            return Err(PatternError::OutOfOrder { index });
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{Indicators, PatternBias};
    use chrono::{Duration, TimeZone, Utc};

    fn ohlc(i: usize, open: f64, high: f64, low: f64, close: f64) -> Candle {
        Candle {
            time: Utc.with_ymd_and_hms(2024, 3, 4, 0, 0, 0).unwrap() + Duration::minutes(15 * i as i64),
            pair: "EURUSD".into(),
            open,
            high,
            low,
            close,
            indicators: Indicators::default(),
        }
    }

    fn flat(count: usize) -> Vec<Candle> {
        (0..count).map(|i| ohlc(i, 1.1, 1.1, 1.1, 1.1)).collect()
    }

    /// Double top from 100 to 105 twice, then a break to 99.
    fn double_top_history() -> Vec<Candle> {
        let points = [100.0, 105.0, 101.0, 105.0, 99.0];
        let mut closes = Vec::new();
        for pair in points.windows(2) {
            for s in 0..6 {
                closes.push(pair[0] + (pair[1] - pair[0]) * s as f64 / 6.0);
            }
        }
        closes.push(99.0);
        closes
            .iter()
            .enumerate()
            .map(|(i, &c)| ohlc(i, c, c + 0.05, c - 0.05, c))
            .collect()
    }

    #[test]
    fn test_flat_history_has_no_patterns() {
        let detector = PatternDetector::default();
        let report = detector.detect(&flat(60), 100).unwrap();
        assert!(report.is_empty());
        assert_eq!(report.net_score, 0.0);
        assert!(report.details.is_empty());
    }

    #[test]
    fn test_short_window_is_empty_not_error() {
        let detector = PatternDetector::default();
        assert!(detector.detect(&flat(2), 100).unwrap().is_empty());
        assert!(detector.detect(&[], 100).unwrap().is_empty());
    }

    #[test]
    fn test_detect_is_idempotent() {
        let detector = PatternDetector::default();
        let history = double_top_history();
        let first = detector.detect(&history, 100).unwrap();
        let second = detector.detect(&history, 100).unwrap();
        assert_eq!(first, second);
        assert_eq!(first.names, vec!["Double Top (Bearish)".to_string()]);
        assert!((first.net_score - (-1.275)).abs() < 1e-9);
    }

    #[test]
    fn test_opposing_patterns_sum() {
        let mut history = double_top_history();
        history.push(ohlc(25, 99.5, 99.6, 98.7, 98.8));
        history.push(ohlc(26, 98.7, 99.8, 98.6, 99.7));

        let report = PatternDetector::default().detect(&history, 100).unwrap();
        assert_eq!(
            report.names,
            vec!["Bullish Engulfing".to_string(), "Double Top (Bearish)".to_string()]
        );

        let bullish = report.details["Bullish Engulfing"];
        let bearish = report.details["Double Top (Bearish)"];
        assert_eq!(bullish.bias, PatternBias::Bullish);
        assert_eq!(bearish.bias, PatternBias::Bearish);
        assert!(bullish.score > 0.0 && bearish.score < 0.0);
        assert!((report.net_score - (bullish.score + bearish.score)).abs() < 1e-12);
    }

    #[test]
    fn test_lookback_limits_the_window() {
        let mut history = flat(40);
        let offset = history.len();
        for (i, mut candle) in double_top_history().into_iter().enumerate() {
            candle.time = ohlc(offset + i, 0.0, 0.0, 0.0, 0.0).time;
            history.push(candle);
        }
        let detector = PatternDetector::default();
        // the last three candles are a flat decline with no pivots
        assert!(detector.detect(&history, 3).unwrap().is_empty());
        assert!(!detector.detect(&history, 100).unwrap().is_empty());
    }

    #[test]
    fn test_malformed_window_is_an_error() {
        let detector = PatternDetector::default();

        let mut history = flat(10);
        history[4].close = f64::NAN;
        assert_eq!(
            detector.detect(&history, 100),
            Err(PatternError::NonFinitePrice { index: 4 })
        );

        let mut history = flat(10);
        history.swap(2, 3);
        assert_eq!(
            detector.detect(&history, 100),
            Err(PatternError::OutOfOrder { index: 3 })
        );

        let mut history = flat(10);
        history[1].low = 2.0;
        assert_eq!(
            detector.detect(&history, 100),
            Err(PatternError::InvalidRange { index: 1 })
        );
    }

    #[test]
    fn test_malformed_candle_outside_window_is_ignored() {
        let detector = PatternDetector::default();
        let mut history = flat(10);
        history[0].close = f64::NAN;
        assert!(detector.detect(&history, 5).unwrap().is_empty());
    }
}
