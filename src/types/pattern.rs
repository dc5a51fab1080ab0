use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Directional bias of a detected formation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PatternBias {
    Bullish,
    Bearish,
    Neutral,
}

impl PatternBias {
    /// +1 for bullish, -1 for bearish, 0 for neutral.
    pub fn sign(&self) -> f64 {
        match self {
            PatternBias::Bullish => 1.0,
            PatternBias::Bearish => -1.0,
            PatternBias::Neutral => 0.0,
        }
    }
}

/// The closed catalogue of formations the detector knows.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PatternKind {
    // Candlestick formations, read off the last few candles.
    BullishEngulfing,
    BearishEngulfing,
    Hammer,
    ShootingStar,
    MorningStar,
    EveningStar,
    ThreeWhiteSoldiers,
    ThreeBlackCrows,
    // Chart formations, read off swing pivots across the window.
    DoubleTop,
    DoubleBottom,
    HeadAndShoulders,
    InverseHeadAndShoulders,
    AscendingTriangle,
    DescendingTriangle,
    SymmetricalTriangle,
}

impl PatternKind {
    /// Every formation, in reporting order.
    pub const ALL: [PatternKind; 15] = [
        PatternKind::BullishEngulfing,
        PatternKind::BearishEngulfing,
        PatternKind::Hammer,
        PatternKind::ShootingStar,
        PatternKind::MorningStar,
        PatternKind::EveningStar,
        PatternKind::ThreeWhiteSoldiers,
        PatternKind::ThreeBlackCrows,
        PatternKind::DoubleTop,
        PatternKind::DoubleBottom,
        PatternKind::HeadAndShoulders,
        PatternKind::InverseHeadAndShoulders,
        PatternKind::AscendingTriangle,
        PatternKind::DescendingTriangle,
        PatternKind::SymmetricalTriangle,
    ];

    /// Display name, used as the key in pattern details.
    pub fn name(&self) -> &'static str {
        match self {
            PatternKind::BullishEngulfing => "Bullish Engulfing",
            PatternKind::BearishEngulfing => "Bearish Engulfing",
            PatternKind::Hammer => "Hammer (Bullish)",
            PatternKind::ShootingStar => "Shooting Star (Bearish)",
            PatternKind::MorningStar => "Morning Star (Bullish)",
            PatternKind::EveningStar => "Evening Star (Bearish)",
            PatternKind::ThreeWhiteSoldiers => "Three White Soldiers (Bullish)",
            PatternKind::ThreeBlackCrows => "Three Black Crows (Bearish)",
            PatternKind::DoubleTop => "Double Top (Bearish)",
            PatternKind::DoubleBottom => "Double Bottom (Bullish)",
            PatternKind::HeadAndShoulders => "Head and Shoulders (Bearish)",
            PatternKind::InverseHeadAndShoulders => "Inverse Head and Shoulders (Bullish)",
            PatternKind::AscendingTriangle => "Ascending Triangle (Bullish)",
            PatternKind::DescendingTriangle => "Descending Triangle (Bearish)",
            PatternKind::SymmetricalTriangle => "Symmetrical Triangle (Neutral)",
        }
    }

    pub fn bias(&self) -> PatternBias {
        match self {
            PatternKind::BullishEngulfing
            | PatternKind::Hammer
            | PatternKind::MorningStar
            | PatternKind::ThreeWhiteSoldiers
            | PatternKind::DoubleBottom
            | PatternKind::InverseHeadAndShoulders
            | PatternKind::AscendingTriangle => PatternBias::Bullish,
            PatternKind::BearishEngulfing
            | PatternKind::ShootingStar
            | PatternKind::EveningStar
            | PatternKind::ThreeBlackCrows
            | PatternKind::DoubleTop
            | PatternKind::HeadAndShoulders
            | PatternKind::DescendingTriangle => PatternBias::Bearish,
            PatternKind::SymmetricalTriangle => PatternBias::Neutral,
        }
    }

    /// Score magnitude at full confidence.
    pub fn weight(&self) -> f64 {
        match self {
            PatternKind::Hammer | PatternKind::ShootingStar => 0.5,
            PatternKind::BullishEngulfing
            | PatternKind::BearishEngulfing
            | PatternKind::MorningStar
            | PatternKind::EveningStar
            | PatternKind::ThreeWhiteSoldiers
            | PatternKind::ThreeBlackCrows
            | PatternKind::AscendingTriangle
            | PatternKind::DescendingTriangle => 1.0,
            PatternKind::DoubleTop | PatternKind::DoubleBottom => 1.5,
            PatternKind::HeadAndShoulders | PatternKind::InverseHeadAndShoulders => 2.0,
            PatternKind::SymmetricalTriangle => 0.0,
        }
    }

    /// Signed score contribution at the given confidence (0-100).
    pub fn contribution(&self, confidence: f64) -> f64 {
        self.bias().sign() * self.weight() * confidence.clamp(0.0, 100.0) / 100.0
    }
}

/// Per-pattern detail reported alongside a signal.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PatternDetail {
    pub bias: PatternBias,
    pub score: f64,
    pub confidence: f64,
}

/// Result of one detection pass.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PatternReport {
    /// Detected pattern names, in catalogue order.
    pub names: Vec<String>,
    /// Sum of individual contributions. Opposing patterns cancel.
    pub net_score: f64,
    pub details: BTreeMap<String, PatternDetail>,
}

impl PatternReport {
    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_contribution_sign_follows_bias() {
        assert_eq!(PatternKind::DoubleBottom.contribution(100.0), 1.5);
        assert_eq!(PatternKind::DoubleTop.contribution(100.0), -1.5);
        assert_eq!(PatternKind::HeadAndShoulders.contribution(50.0), -1.0);
        assert_eq!(PatternKind::SymmetricalTriangle.contribution(90.0), 0.0);
    }

    #[test]
    fn test_contribution_clamps_confidence() {
        assert_eq!(PatternKind::BullishEngulfing.contribution(250.0), 1.0);
        assert_eq!(PatternKind::BullishEngulfing.contribution(-10.0), 0.0);
    }

    #[test]
    fn test_names_are_unique() {
        let mut names: Vec<&str> = PatternKind::ALL.iter().map(|k| k.name()).collect();
        names.sort();
        names.dedup();
        assert_eq!(names.len(), PatternKind::ALL.len());
    }

    #[test]
    fn test_bias_serialization() {
        assert_eq!(serde_json::to_string(&PatternBias::Bullish).unwrap(), "\"bullish\"");
        assert_eq!(serde_json::to_string(&PatternBias::Neutral).unwrap(), "\"neutral\"");
    }
}
