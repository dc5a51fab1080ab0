//! Model-score capability consumed by the engine.

use crate::error::Result;
use crate::types::{Candle, MlPrediction};
use std::collections::BTreeMap;
use std::future::Future;
use std::pin::Pin;

/// Named numeric inputs for a model, built from the latest candle.
///
/// Optional indicators are only present when the candle carried a finite
/// value. OBV pairs are dropped when OBV is zero (no volume).
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FeatureVector {
    values: BTreeMap<&'static str, f64>,
}

impl FeatureVector {
    pub fn from_candle(candle: &Candle) -> Self {
        let ind = &candle.indicators;
        let mut values = BTreeMap::new();

        values.insert("rsi", ind.rsi);
        values.insert("macd", ind.macd);
        values.insert("macd_signal", ind.macd_signal);
        values.insert("macd_diff", ind.macd_diff);
        values.insert("atr", ind.atr);
        if candle.close != 0.0 {
            values.insert("atr_pct", ind.atr / candle.close * 100.0);
        }
        values.insert("ema_fast", ind.ema_fast);
        values.insert("ema_slow", ind.ema_slow);

        let optional = [
            ("stoch_k", ind.stoch_k),
            ("stoch_d", ind.stoch_d),
            ("bb_upper", ind.bb_upper),
            ("bb_lower", ind.bb_lower),
            ("bb_width", ind.bb_width),
            ("bb_pct", ind.bb_pct),
            ("price_change", ind.price_change),
            ("volatility", ind.volatility),
            ("momentum", ind.momentum),
            ("high_low_pct", ind.high_low_pct),
        ];
        for (name, value) in optional {
            if let Some(v) = value.filter(|v| v.is_finite()) {
                values.insert(name, v);
            }
        }

        if let (Some(obv), Some(obv_ema)) = (ind.obv, ind.obv_ema) {
            if obv != 0.0 && obv.is_finite() && obv_ema.is_finite() {
                values.insert("obv", obv);
                values.insert("obv_ema", obv_ema);
            }
        }

        values.retain(|_, v| v.is_finite());
        Self { values }
    }

    pub fn get(&self, name: &str) -> Option<f64> {
        self.values.get(name).copied()
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

/// A trained model that labels a feature vector.
pub trait MlPredictor: Send + Sync {
    fn name(&self) -> &str;

    fn predict<'a>(
        &'a self,
        features: &'a FeatureVector,
    ) -> Pin<Box<dyn Future<Output = Result<MlPrediction>> + Send + 'a>>;
}

/// Stand-in when no model is deployed. Always HOLD with probability 0.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopPredictor;

impl MlPredictor for NoopPredictor {
    fn name(&self) -> &str {
        "noop"
    }

    fn predict<'a>(
        &'a self,
        _features: &'a FeatureVector,
    ) -> Pin<Box<dyn Future<Output = Result<MlPrediction>> + Send + 'a>> {
        Box::pin(async { Ok(MlPrediction::hold()) })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{Indicators, MlLabel};
    use chrono::{TimeZone, Utc};

    fn candle(indicators: Indicators) -> Candle {
        Candle {
            time: Utc.with_ymd_and_hms(2024, 3, 4, 10, 0, 0).unwrap(),
            pair: "EURUSD".into(),
            open: 1.1,
            high: 1.1,
            low: 1.1,
            close: 1.1,
            indicators,
        }
    }

    #[test]
    fn test_required_features_always_present() {
        let features = FeatureVector::from_candle(&candle(Indicators {
            rsi: 50.0,
            atr: 0.0011,
            ..Default::default()
        }));
        for name in ["rsi", "macd", "macd_signal", "macd_diff", "atr", "atr_pct", "ema_fast", "ema_slow"] {
            assert!(features.get(name).is_some(), "missing {name}");
        }
        assert!((features.get("atr_pct").unwrap() - 0.1).abs() < 1e-9);
        assert_eq!(features.len(), 8);
    }

    #[test]
    fn test_zero_obv_is_dropped() {
        let features = FeatureVector::from_candle(&candle(Indicators {
            obv: Some(0.0),
            obv_ema: Some(0.0),
            stoch_k: Some(40.0),
            bb_pct: Some(f64::NAN),
            ..Default::default()
        }));
        assert_eq!(features.get("obv"), None);
        assert_eq!(features.get("stoch_k"), Some(40.0));
        assert_eq!(features.get("bb_pct"), None);
    }

    #[tokio::test]
    async fn test_noop_predictor_holds() {
        let features = FeatureVector::default();
        let prediction = NoopPredictor.predict(&features).await.unwrap();
        assert_eq!(prediction.label, MlLabel::Hold);
        assert_eq!(prediction.probability, 0.0);
    }
}
