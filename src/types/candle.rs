use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Indicator values attached to a candle.
///
/// The values are computed upstream; this crate only scores them. The first
/// seven fields are required on every candle. The rest are optional because
/// not every instrument or provider can supply them (OBV needs volume, which
/// spot forex does not have).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Indicators {
    pub rsi: f64,
    pub macd: f64,
    pub macd_signal: f64,
    pub macd_diff: f64,
    pub atr: f64,
    #[serde(alias = "ema_20")]
    pub ema_fast: f64,
    #[serde(alias = "ema_50")]
    pub ema_slow: f64,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stoch_k: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stoch_d: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bb_upper: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bb_middle: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bb_lower: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bb_width: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bb_pct: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub obv: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub obv_ema: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub price_change: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub volatility: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub momentum: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub high_low_pct: Option<f64>,
}

/// One price candle for one instrument, with its indicator values.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Candle {
    #[serde(alias = "datetime")]
    pub time: DateTime<Utc>,
    pub pair: String,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    #[serde(flatten)]
    pub indicators: Indicators,
}

impl Candle {
    /// Absolute size of the candle body.
    pub fn body(&self) -> f64 {
        (self.close - self.open).abs()
    }

    /// High-to-low range.
    pub fn range(&self) -> f64 {
        self.high - self.low
    }

    pub fn upper_shadow(&self) -> f64 {
        self.high - self.open.max(self.close)
    }

    pub fn lower_shadow(&self) -> f64 {
        self.open.min(self.close) - self.low
    }

    pub fn is_bullish(&self) -> bool {
        self.close > self.open
    }

    pub fn is_bearish(&self) -> bool {
        self.close < self.open
    }

    /// Midpoint of the body.
    pub fn body_mid(&self) -> f64 {
        (self.open + self.close) / 2.0
    }

    /// True when all four prices are finite.
    pub fn prices_finite(&self) -> bool {
        self.open.is_finite() && self.high.is_finite() && self.low.is_finite() && self.close.is_finite()
    }

    /// Returns the name of the first required field that is not finite.
    ///
    /// Optional indicator fields are not checked; scorers skip them when absent
    /// or non-finite.
    pub fn first_invalid_field(&self) -> Option<&'static str> {
        let ind = &self.indicators;
        let required: [(&'static str, f64); 11] = [
            ("open", self.open),
            ("high", self.high),
            ("low", self.low),
            ("close", self.close),
            ("rsi", ind.rsi),
            ("macd", ind.macd),
            ("macd_signal", ind.macd_signal),
            ("macd_diff", ind.macd_diff),
            ("atr", ind.atr),
            ("ema_fast", ind.ema_fast),
            ("ema_slow", ind.ema_slow),
        ];
        required
            .iter()
            .find(|(_, value)| !value.is_finite())
            .map(|(name, _)| *name)
    }
}
