use crate::types::{Candle, PatternDetail, SessionInfo};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Recommendation emitted by the engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum SignalType {
    Buy,
    Sell,
    Wait,
}

impl SignalType {
    pub fn as_str(&self) -> &'static str {
        match self {
            SignalType::Buy => "BUY",
            SignalType::Sell => "SELL",
            SignalType::Wait => "WAIT",
        }
    }
}

impl fmt::Display for SignalType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Class label returned by an ML model.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum MlLabel {
    Buy,
    Hold,
    Sell,
}

impl MlLabel {
    pub fn sign(&self) -> f64 {
        match self {
            MlLabel::Buy => 1.0,
            MlLabel::Hold => 0.0,
            MlLabel::Sell => -1.0,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            MlLabel::Buy => "BUY",
            MlLabel::Hold => "HOLD",
            MlLabel::Sell => "SELL",
        }
    }
}

/// A model's answer: a label and its probability in [0, 1].
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MlPrediction {
    pub label: MlLabel,
    pub probability: f64,
}

impl MlPrediction {
    pub fn hold() -> Self {
        Self {
            label: MlLabel::Hold,
            probability: 0.0,
        }
    }
}

/// The four independently computed score sources.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct ScoreComponents {
    pub technical: f64,
    pub sentiment: f64,
    pub pattern: f64,
    pub ml: f64,
}

impl ScoreComponents {
    /// Unnormalized sum of all components.
    pub fn total(&self) -> f64 {
        self.technical + self.sentiment + self.pattern + self.ml
    }
}

/// Score source that can fall back to zero.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ScoreSource {
    Sentiment,
    Patterns,
    Ml,
}

impl ScoreSource {
    pub fn as_str(&self) -> &'static str {
        match self {
            ScoreSource::Sentiment => "sentiment",
            ScoreSource::Patterns => "patterns",
            ScoreSource::Ml => "ml",
        }
    }
}

/// One evaluation of one instrument.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Signal {
    /// Evaluation time (UTC).
    pub time: DateTime<Utc>,
    /// Evaluation time rendered in the display timezone.
    pub time_local: String,
    pub pair: String,
    pub signal: SignalType,
    /// 0-100, from total score magnitude.
    pub confidence: f64,
    pub price: f64,
    pub stop_loss: f64,
    pub take_profit: f64,
    pub reason: String,
    pub patterns: Vec<String>,
    pub pattern_score: f64,
    pub pattern_details: BTreeMap<String, PatternDetail>,
    pub scores: ScoreComponents,
    pub total_score: f64,
    /// Components that failed upstream and contributed zero.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub degraded: Vec<ScoreSource>,
    /// None only for symbols the engine does not know.
    pub session: Option<SessionInfo>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ml_prediction: Option<MlPrediction>,
    /// Latest candle, kept for the caller to persist.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub raw_data: Option<Candle>,
}

impl Signal {
    /// A WAIT signal with every numeric field zeroed.
    pub fn wait(pair: &str, time: DateTime<Utc>, time_local: String, reason: &str) -> Self {
        Self {
            time,
            time_local,
            pair: pair.to_string(),
            signal: SignalType::Wait,
            confidence: 0.0,
            price: 0.0,
            stop_loss: 0.0,
            take_profit: 0.0,
            reason: reason.to_string(),
            patterns: Vec::new(),
            pattern_score: 0.0,
            pattern_details: BTreeMap::new(),
            scores: ScoreComponents::default(),
            total_score: 0.0,
            degraded: Vec::new(),
            session: None,
            ml_prediction: None,
            raw_data: None,
        }
    }

    pub fn is_actionable(&self) -> bool {
        self.signal != SignalType::Wait
    }
}
