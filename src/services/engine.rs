//! The decision engine: fuses every score source into one signal.
//!
//! The engine is stateless between calls. Everything it needs arrives through
//! its configuration, its collaborators, and the arguments of [`DecisionEngine::analyze`].

use crate::config::EngineConfig;
use crate::error::{EngineError, Result};
use crate::services::ml::{FeatureVector, MlPredictor, NoopPredictor};
use crate::services::patterns::{PatternConfig, PatternDetector};
use crate::services::risk::{round_to, RiskCalculator, RiskLevels};
use crate::services::sentiment::SentimentAggregator;
use crate::services::session::SessionGate;
use crate::services::sources::CandleSource;
use crate::services::technical::TechnicalScorer;
use crate::types::{
    default_precision, Candle, InstrumentRegistry, MlPrediction, PatternReport, ScoreComponents,
    ScoreSource, SessionInfo, Signal, SignalType,
};
use chrono::{DateTime, FixedOffset, Utc};
use std::sync::Arc;
use tracing::{debug, info, warn};

pub const INVALID_SYMBOL: &str = "invalid symbol";
pub const INSUFFICIENT_DATA: &str = "insufficient data";
pub const NO_VOLATILITY: &str = "no volatility for risk sizing";

/// Patterns listed in the reason of an open-market signal.
const REASON_PATTERNS_OPEN: usize = 3;
/// Patterns listed in the reason of a closed-market signal.
const REASON_PATTERNS_CLOSED: usize = 2;

pub struct DecisionEngine {
    config: EngineConfig,
    instruments: InstrumentRegistry,
    scorer: TechnicalScorer,
    detector: PatternDetector,
    risk: RiskCalculator,
    sentiment: SentimentAggregator,
    predictor: Arc<dyn MlPredictor>,
    gate: SessionGate,
}

/// What the ML capability contributed to one analysis.
struct MlOutcome {
    score: f64,
    prediction: Option<MlPrediction>,
    degraded: bool,
}

impl DecisionEngine {
    /// An engine with no sentiment store and the no-op model.
    pub fn new(config: EngineConfig, instruments: InstrumentRegistry) -> Self {
        let gate = SessionGate::new(config.session);
        Self {
            config,
            instruments,
            scorer: TechnicalScorer::new(),
            detector: PatternDetector::default(),
            risk: RiskCalculator::new(),
            sentiment: SentimentAggregator::disabled(),
            predictor: Arc::new(NoopPredictor),
            gate,
        }
    }

    pub fn with_sentiment(mut self, sentiment: SentimentAggregator) -> Self {
        self.sentiment = sentiment;
        self
    }

    pub fn with_predictor(mut self, predictor: Arc<dyn MlPredictor>) -> Self {
        self.predictor = predictor;
        self
    }

    pub fn with_pattern_config(mut self, config: PatternConfig) -> Self {
        self.detector = PatternDetector::new(config);
        self
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn instruments(&self) -> &InstrumentRegistry {
        &self.instruments
    }

    /// Fetch history from `source` and analyze it. A failed fetch is
    /// reported as insufficient data.
    pub async fn analyze_pair(
        &self,
        source: &dyn CandleSource,
        pair: &str,
        now: DateTime<Utc>,
    ) -> Result<Signal> {
        let candles = if self.instruments.contains(pair) {
            match source.fetch_candles(pair).await {
                Ok(candles) => candles,
                Err(e) => {
                    warn!(pair, error = %e, "candle fetch failed");
                    Vec::new()
                }
            }
        } else {
            Vec::new()
        };
        self.analyze(pair, &candles, now).await
    }

    /// Analyze one instrument at `now`.
    ///
    /// Unknown symbols and short histories produce a WAIT signal. The only
    /// error is a latest candle with a non-finite required field.
    pub async fn analyze(&self, pair: &str, candles: &[Candle], now: DateTime<Utc>) -> Result<Signal> {
        let time_local = self.local_time(now);

        let Some(instrument) = self.instruments.get(pair) else {
            debug!(pair, "unknown symbol");
            return Ok(Signal::wait(pair, now, time_local, INVALID_SYMBOL));
        };
        let symbol = instrument.symbol.clone();
        let session = self.gate.state(instrument.class, now);

        let latest = match candles.last() {
            Some(latest) if candles.len() >= self.config.min_history => latest,
            _ => {
                debug!(pair = %symbol, candles = candles.len(), "insufficient history");
                let mut signal = Signal::wait(&symbol, now, time_local, INSUFFICIENT_DATA);
                signal.session = Some(session);
                return Ok(signal);
            }
        };
        if let Some(field) = latest.first_invalid_field() {
            return Err(EngineError::MalformedCandle { pair: symbol, field });
        }

        let technical = self.scorer.score(latest);

        let features = FeatureVector::from_candle(latest);
        let (sentiment, ml) = tokio::join!(
            self.sentiment.instrument_reading(instrument, now),
            self.ml_outcome(&symbol, &features)
        );

        let patterns = match self.detector.detect(candles, self.config.pattern_lookback) {
            Ok(report) => Some(report),
            Err(e) => {
                warn!(pair = %symbol, error = %e, "pattern detection failed, using 0");
                None
            }
        };

        let mut degraded = Vec::new();
        if sentiment.degraded {
            degraded.push(ScoreSource::Sentiment);
        }
        if patterns.is_none() {
            degraded.push(ScoreSource::Patterns);
        }
        if ml.degraded {
            degraded.push(ScoreSource::Ml);
        }
        let patterns: PatternReport = patterns.unwrap_or_default();

        let scores = ScoreComponents {
            technical,
            sentiment: sentiment.score,
            pattern: patterns.net_score,
            ml: ml.score,
        };
        let total = scores.total();
        let raw_signal = self.classify(total);
        let confidence = self.confidence(total);

        let precision = self
            .config
            .precision_overrides
            .get(&symbol)
            .copied()
            .unwrap_or_else(|| default_precision(&symbol));
        let price = latest.close;

        let mut signal_type = raw_signal;
        let mut reason = open_reason(&scores, ml.prediction.as_ref(), &patterns.names);
        let mut levels = RiskLevels::default();

        if !session.is_open {
            signal_type = SignalType::Wait;
            reason = closed_reason(
                &session,
                raw_signal,
                total,
                ml.prediction.as_ref().filter(|_| scores.ml != 0.0),
                &patterns.names,
            );
        } else {
            match self.risk.levels(
                raw_signal,
                price,
                latest.indicators.atr,
                self.config.atr_multiplier,
                self.config.min_risk_reward,
            ) {
                Ok(raw) => levels = raw.rounded(raw_signal, price, precision),
                Err(e) => {
                    warn!(pair = %symbol, error = %e, "cannot size risk, signal downgraded");
                    signal_type = SignalType::Wait;
                    reason = format!("{NO_VOLATILITY} ({reason})");
                }
            }
        }
        append_degraded(&mut reason, &degraded);

        info!(
            pair = %symbol,
            signal = %signal_type,
            total = round_to(total, 2),
            confidence,
            session = %session.session_name,
            "analysis complete"
        );

        Ok(Signal {
            time: now,
            time_local,
            pair: symbol,
            signal: signal_type,
            confidence,
            price: round_to(price, precision),
            stop_loss: levels.stop_loss,
            take_profit: levels.take_profit,
            reason,
            patterns: patterns.names,
            pattern_score: patterns.net_score,
            pattern_details: patterns.details,
            scores,
            total_score: total,
            degraded,
            session: Some(session),
            ml_prediction: ml.prediction,
            raw_data: Some(latest.clone()),
        })
    }

    async fn ml_outcome(&self, pair: &str, features: &FeatureVector) -> MlOutcome {
        match self.predictor.predict(features).await {
            Ok(prediction) if prediction.probability.is_finite() => {
                let probability = prediction.probability.clamp(0.0, 1.0);
                MlOutcome {
                    score: prediction.label.sign() * self.config.ml_weight * probability,
                    prediction: Some(MlPrediction {
                        probability,
                        ..prediction
                    }),
                    degraded: false,
                }
            }
            Ok(prediction) => {
                warn!(
                    pair,
                    model = self.predictor.name(),
                    probability = prediction.probability,
                    "non-finite model probability, using 0"
                );
                MlOutcome {
                    score: 0.0,
                    prediction: None,
                    degraded: true,
                }
            }
            Err(e) => {
                warn!(pair, model = self.predictor.name(), error = %e, "model prediction failed, using 0");
                MlOutcome {
                    score: 0.0,
                    prediction: None,
                    degraded: true,
                }
            }
        }
    }

    fn classify(&self, total: f64) -> SignalType {
        if total >= self.config.buy_threshold {
            SignalType::Buy
        } else if total <= self.config.sell_threshold {
            SignalType::Sell
        } else {
            SignalType::Wait
        }
    }

    /// |total| mapped linearly onto 0-100, two decimals.
    fn confidence(&self, total: f64) -> f64 {
        let pct = (total.abs() / self.config.confidence_normalizer * 100.0).min(100.0);
        round_to(pct, 2)
    }

    fn local_time(&self, now: DateTime<Utc>) -> String {
        let offset = self
            .config
            .local_offset_minutes
            .checked_mul(60)
            .and_then(FixedOffset::east_opt);
        match offset {
            Some(offset) => format!(
                "{} ({})",
                now.with_timezone(&offset).format("%Y-%m-%d %H:%M:%S"),
                self.config.local_label
            ),
            None => format!("{} (UTC)", now.format("%Y-%m-%d %H:%M:%S")),
        }
    }
}

fn open_reason(scores: &ScoreComponents, ml: Option<&MlPrediction>, patterns: &[String]) -> String {
    let mut reason = format!("Tech: {:.1}, Sentiment: {:.1}", scores.technical, scores.sentiment);
    if let Some(prediction) = ml.filter(|_| scores.ml != 0.0) {
        reason.push_str(&format!(
            ", ML: {} ({:.0}%)",
            prediction.label.as_str(),
            prediction.probability * 100.0
        ));
    }
    if !patterns.is_empty() {
        let listed: Vec<&str> = patterns.iter().take(REASON_PATTERNS_OPEN).map(String::as_str).collect();
        reason.push_str(&format!(", Patterns: {}", listed.join(", ")));
    }
    reason
}

fn closed_reason(
    session: &SessionInfo,
    would_be: SignalType,
    total: f64,
    ml: Option<&MlPrediction>,
    patterns: &[String],
) -> String {
    let mut reason = format!(
        "Market Closed - {} | would be {} (total {:.2})",
        session.session_name, would_be, total
    );
    if let Some(prediction) = ml {
        reason.push_str(&format!(" | ML: {}", prediction.label.as_str()));
    }
    if !patterns.is_empty() {
        let listed: Vec<&str> = patterns
            .iter()
            .take(REASON_PATTERNS_CLOSED)
            .map(String::as_str)
            .collect();
        reason.push_str(&format!(" | Patterns: {}", listed.join(", ")));
    }
    reason
}

fn append_degraded(reason: &mut String, degraded: &[ScoreSource]) {
    if degraded.is_empty() {
        return;
    }
    let names: Vec<&str> = degraded.iter().map(ScoreSource::as_str).collect();
    reason.push_str(&format!(" [degraded: {}]", names.join(", ")));
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{Indicators, MlLabel, SessionState};
    use chrono::{Duration, TimeZone};
    use std::future::Future;
    use std::pin::Pin;

    fn monday_noon() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 3, 4, 12, 0, 0).unwrap()
    }

    fn history(count: usize, indicators: Indicators, close: f64) -> Vec<Candle> {
        let start = monday_noon() - Duration::minutes(15 * count as i64);
        (0..count)
            .map(|i| Candle {
                time: start + Duration::minutes(15 * i as i64),
                pair: "EURUSD".into(),
                open: close,
                high: close,
                low: close,
                close,
                indicators: indicators.clone(),
            })
            .collect()
    }

    fn bullish() -> Indicators {
        Indicators {
            rsi: 70.0,
            macd: 0.002,
            macd_signal: 0.001,
            macd_diff: 0.001,
            atr: 0.0010,
            ema_fast: 1.12,
            ema_slow: 1.10,
            ..Default::default()
        }
    }

    struct FixedPredictor(MlPrediction);

    impl MlPredictor for FixedPredictor {
        fn name(&self) -> &str {
            "fixed"
        }

        fn predict<'a>(
            &'a self,
            _features: &'a FeatureVector,
        ) -> Pin<Box<dyn Future<Output = Result<MlPrediction>> + Send + 'a>> {
            let prediction = self.0;
            Box::pin(async move { Ok(prediction) })
        }
    }

    struct BrokenPredictor;

    impl MlPredictor for BrokenPredictor {
        fn name(&self) -> &str {
            "broken"
        }

        fn predict<'a>(
            &'a self,
            _features: &'a FeatureVector,
        ) -> Pin<Box<dyn Future<Output = Result<MlPrediction>> + Send + 'a>> {
            Box::pin(async { Err(EngineError::Prediction("model file missing".into())) })
        }
    }

    fn engine() -> DecisionEngine {
        DecisionEngine::new(EngineConfig::default(), InstrumentRegistry::with_defaults())
    }

    #[tokio::test]
    async fn test_technical_alone_reaches_buy() {
        let signal = engine()
            .analyze("EURUSD", &history(60, bullish(), 1.13), monday_noon())
            .await
            .unwrap();
        assert_eq!(signal.signal, SignalType::Buy);
        assert_eq!(signal.scores.technical, 3.0);
        assert_eq!(signal.confidence, 60.0);
        assert_eq!(signal.stop_loss, 1.1285);
        assert_eq!(signal.take_profit, 1.133);
        assert_eq!(signal.reason, "Tech: 3.0, Sentiment: 0.0");
    }

    #[tokio::test]
    async fn test_ml_score_is_signed_weighted_probability() {
        let engine = engine().with_predictor(Arc::new(FixedPredictor(MlPrediction {
            label: MlLabel::Sell,
            probability: 0.75,
        })));
        let signal = engine
            .analyze("EURUSD", &history(60, bullish(), 1.13), monday_noon())
            .await
            .unwrap();
        assert_eq!(signal.scores.ml, -1.5);
        assert_eq!(signal.total_score, 1.5);
        assert_eq!(signal.signal, SignalType::Wait);
        assert!(signal.reason.contains("ML: SELL (75%)"));
        assert_eq!(signal.stop_loss, 0.0);
        assert_eq!(signal.take_profit, 0.0);
    }

    #[tokio::test]
    async fn test_ml_failure_degrades_to_zero() {
        let engine = engine().with_predictor(Arc::new(BrokenPredictor));
        let signal = engine
            .analyze("EURUSD", &history(60, bullish(), 1.13), monday_noon())
            .await
            .unwrap();
        assert_eq!(signal.scores.ml, 0.0);
        assert_eq!(signal.signal, SignalType::Buy);
        assert_eq!(signal.degraded, vec![ScoreSource::Ml]);
        assert!(signal.reason.ends_with("[degraded: ml]"));
        assert!(signal.ml_prediction.is_none());
    }

    #[tokio::test]
    async fn test_malformed_latest_candle_is_an_error() {
        let mut candles = history(60, bullish(), 1.13);
        if let Some(last) = candles.last_mut() {
            last.indicators.rsi = f64::NAN;
        }
        let result = engine().analyze("EURUSD", &candles, monday_noon()).await;
        assert!(matches!(
            result,
            Err(EngineError::MalformedCandle { field: "rsi", .. })
        ));
    }

    #[tokio::test]
    async fn test_pattern_failure_degrades_to_zero() {
        let mut candles = history(60, bullish(), 1.13);
        candles[30].time = candles[10].time;
        let signal = engine().analyze("EURUSD", &candles, monday_noon()).await.unwrap();
        assert_eq!(signal.pattern_score, 0.0);
        assert_eq!(signal.degraded, vec![ScoreSource::Patterns]);
        assert_eq!(signal.signal, SignalType::Buy);
    }

    #[tokio::test]
    async fn test_zero_atr_downgrades_to_wait() {
        let indicators = Indicators {
            atr: 0.0,
            ..bullish()
        };
        let signal = engine()
            .analyze("EURUSD", &history(60, indicators, 1.13), monday_noon())
            .await
            .unwrap();
        assert_eq!(signal.signal, SignalType::Wait);
        assert!(signal.reason.starts_with(NO_VOLATILITY));
        assert_eq!(signal.total_score, 3.0);
        assert_eq!(signal.stop_loss, 0.0);
    }

    #[tokio::test]
    async fn test_insufficient_history_keeps_session() {
        let signal = engine()
            .analyze("EURUSD", &history(49, bullish(), 1.13), monday_noon())
            .await
            .unwrap();
        assert_eq!(signal.reason, INSUFFICIENT_DATA);
        assert_eq!(signal.signal, SignalType::Wait);
        assert_eq!(signal.session.map(|s| s.state), Some(SessionState::OpenLondon));
    }

    #[tokio::test]
    async fn test_time_local_uses_display_offset() {
        let signal = engine()
            .analyze("NOPE", &[], monday_noon())
            .await
            .unwrap();
        assert_eq!(signal.time_local, "2024-03-04 17:30:00 (IST)");
    }

    #[tokio::test]
    async fn test_out_of_range_offset_falls_back_to_utc_label() {
        for minutes in [i32::MAX, 24 * 60] {
            let config = EngineConfig {
                local_offset_minutes: minutes,
                ..Default::default()
            };
            let signal = DecisionEngine::new(config, InstrumentRegistry::with_defaults())
                .analyze("NOPE", &[], monday_noon())
                .await
                .unwrap();
            assert_eq!(signal.time_local, "2024-03-04 12:00:00 (UTC)");
        }
    }

    #[tokio::test]
    async fn test_jpy_prices_round_to_three_places() {
        let indicators = Indicators {
            atr: 0.1234,
            ema_fast: 151.0,
            ema_slow: 150.0,
            ..bullish()
        };
        let signal = engine()
            .analyze("USDJPY", &history(60, indicators, 151.23456), monday_noon())
            .await
            .unwrap();
        assert_eq!(signal.signal, SignalType::Buy);
        assert_eq!(signal.price, 151.235);
        assert_eq!(signal.stop_loss, 151.049);
        assert_eq!(signal.take_profit, 151.605);
    }

    #[test]
    fn test_confidence_is_capped() {
        let engine = engine();
        assert_eq!(engine.confidence(12.0), 100.0);
        assert_eq!(engine.confidence(-2.5), 50.0);
        assert_eq!(engine.confidence(1.0 / 3.0), 6.67);
    }
}
