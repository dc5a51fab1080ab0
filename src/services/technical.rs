//! Technical score from a candle's precomputed indicator fields.
//!
//! Each sub-signal adds at most one point in either direction. The sum is
//! clamped to [-MAX_TECHNICAL_SCORE, MAX_TECHNICAL_SCORE].

use crate::types::Candle;
use serde::{Deserialize, Serialize};

/// Bound on the absolute technical score.
pub const MAX_TECHNICAL_SCORE: f64 = 5.0;

/// Per-sub-signal contributions behind a technical score.
///
/// Optional sub-signals are None when their inputs were missing.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct TechnicalBreakdown {
    pub trend: f64,
    pub rsi: f64,
    pub macd: f64,
    pub stochastic: Option<f64>,
    pub bollinger: Option<f64>,
    pub obv: Option<f64>,
}

impl TechnicalBreakdown {
    /// Clamped sum of all available contributions.
    pub fn total(&self) -> f64 {
        let sum = self.trend
            + self.rsi
            + self.macd
            + self.stochastic.unwrap_or(0.0)
            + self.bollinger.unwrap_or(0.0)
            + self.obv.unwrap_or(0.0);
        sum.clamp(-MAX_TECHNICAL_SCORE, MAX_TECHNICAL_SCORE)
    }
}

/// Scores a candle's indicator fields into a signed scalar.
#[derive(Debug, Clone, Copy, Default)]
pub struct TechnicalScorer;

impl TechnicalScorer {
    pub fn new() -> Self {
        Self
    }

    /// Signed technical score; positive favors BUY.
    pub fn score(&self, candle: &Candle) -> f64 {
        self.breakdown(candle).total()
    }

    pub fn breakdown(&self, candle: &Candle) -> TechnicalBreakdown {
        let ind = &candle.indicators;
        TechnicalBreakdown {
            trend: trend_score(ind.ema_fast, ind.ema_slow, candle.close),
            rsi: rsi_score(ind.rsi),
            macd: macd_score(ind.macd_diff),
            stochastic: finite(ind.stoch_k)
                .zip(finite(ind.stoch_d))
                .map(|(k, d)| stochastic_score(k, d)),
            bollinger: finite(ind.bb_pct).map(bollinger_score),
            obv: finite(ind.obv)
                .zip(finite(ind.obv_ema))
                .filter(|(obv, _)| *obv != 0.0)
                .map(|(obv, obv_ema)| obv_score(obv, obv_ema)),
        }
    }
}

fn finite(value: Option<f64>) -> Option<f64> {
    value.filter(|v| v.is_finite())
}

/// Fast EMA above slow is an uptrend. Half a point for the EMA cross, half
/// for price agreeing with it.
fn trend_score(ema_fast: f64, ema_slow: f64, close: f64) -> f64 {
    if ema_fast > ema_slow {
        if close > ema_fast {
            1.0
        } else {
            0.5
        }
    } else if ema_fast < ema_slow {
        if close < ema_fast {
            -1.0
        } else {
            -0.5
        }
    } else {
        0.0
    }
}

/// RSI zones, trend-following in the middle and contrarian at the extremes.
fn rsi_score(rsi: f64) -> f64 {
    match rsi {
        r if r > 80.0 => -1.0,
        r if r >= 55.0 => 1.0,
        r if r > 45.0 => 0.0,
        r if r >= 20.0 => -1.0,
        _ => 1.0,
    }
}

/// Histogram sign.
fn macd_score(macd_diff: f64) -> f64 {
    if macd_diff > 0.0 {
        1.0
    } else if macd_diff < 0.0 {
        -1.0
    } else {
        0.0
    }
}

/// %K turning up from oversold or down from overbought.
fn stochastic_score(k: f64, d: f64) -> f64 {
    if k < 20.0 && k > d {
        1.0
    } else if k > 80.0 && k < d {
        -1.0
    } else {
        0.0
    }
}

/// Position inside the bands: at or under the lower band is bullish.
fn bollinger_score(pct: f64) -> f64 {
    if pct <= 0.05 {
        1.0
    } else if pct >= 0.95 {
        -1.0
    } else {
        0.0
    }
}

fn obv_score(obv: f64, obv_ema: f64) -> f64 {
    if obv > obv_ema {
        1.0
    } else if obv < obv_ema {
        -1.0
    } else {
        0.0
    }
}
