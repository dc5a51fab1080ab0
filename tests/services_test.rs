//! Unit tests for services module

use chrono::{Duration as ChronoDuration, TimeZone, Utc};
use fxsignal::config::{EngineConfig, SessionConfig};
use fxsignal::services::{
    CycleRunner, DecisionEngine, JsonCandleSource, PatternDetector, SessionGate,
    StaticCandleSource, SymbolAvailability, TechnicalScorer,
};
use fxsignal::types::{Candle, Indicators, InstrumentClass, InstrumentRegistry, SignalType};
use std::sync::Arc;
use std::time::Duration;

fn candle_at(i: usize, close: f64, indicators: Indicators) -> Candle {
    Candle {
        time: Utc.with_ymd_and_hms(2024, 3, 4, 0, 0, 0).unwrap() + ChronoDuration::minutes(15 * i as i64),
        pair: "EURUSD".into(),
        open: close,
        high: close,
        low: close,
        close,
        indicators,
    }
}

fn bearish_indicators() -> Indicators {
    Indicators {
        rsi: 35.0,
        macd: -0.002,
        macd_signal: -0.001,
        macd_diff: -0.001,
        atr: 0.0010,
        ema_fast: 1.0800,
        ema_slow: 1.0900,
        ..Default::default()
    }
}

#[test]
fn test_availability_set_and_expire() {
    let availability = SymbolAvailability::new(Duration::from_millis(10));
    availability.mark_unavailable("XAGUSD", "provider returned no rows");
    assert!(!availability.is_available("XAGUSD"));

    std::thread::sleep(Duration::from_millis(20));
    assert!(availability.is_available("XAGUSD"));
}

#[test]
fn test_availability_is_per_symbol() {
    let availability = SymbolAvailability::new(Duration::from_secs(60));
    availability.mark_unavailable("XAGUSD", "timeout");
    assert!(availability.is_available("XAUUSD"));
    assert_eq!(availability.len(), 1);
}

#[test]
fn test_technical_breakdown_sums_to_score() {
    let c = candle_at(0, 1.0750, bearish_indicators());
    let scorer = TechnicalScorer::new();
    let breakdown = scorer.breakdown(&c);
    assert_eq!(breakdown.trend, -1.0);
    assert_eq!(breakdown.rsi, -1.0);
    assert_eq!(breakdown.macd, -1.0);
    assert_eq!(breakdown.total(), scorer.score(&c));
}

#[test]
fn test_detector_ignores_candles_before_lookback() {
    let history: Vec<Candle> = (0..200).map(|i| candle_at(i, 1.1, bearish_indicators())).collect();
    let report = PatternDetector::default().detect(&history, 100).unwrap();
    assert!(report.is_empty());
}

#[test]
fn test_session_gate_is_pure() {
    let gate = SessionGate::new(SessionConfig::default());
    let now = Utc.with_ymd_and_hms(2024, 3, 6, 18, 45, 0).unwrap();
    let first = gate.state(InstrumentClass::WeekdaySession, now);
    let second = gate.state(InstrumentClass::WeekdaySession, now);
    assert_eq!(first, second);
    assert_eq!(first.session_name, "New York Session");
}

#[tokio::test]
async fn test_cycle_runner_sells_downtrend() {
    let history: Vec<Candle> = (0..60).map(|i| candle_at(i, 1.0750, bearish_indicators())).collect();
    let source = StaticCandleSource::new().with_history("EURUSD", history);
    let engine = DecisionEngine::new(EngineConfig::default(), InstrumentRegistry::with_defaults());
    let runner = CycleRunner::new(Arc::new(engine), Arc::new(source), vec!["EURUSD".into()]);

    let now = Utc.with_ymd_and_hms(2024, 3, 6, 10, 0, 0).unwrap();
    let report = runner.run_cycle(now).await;

    assert_eq!(report.count(SignalType::Sell), 1);
    let signal = &report.signals[0];
    assert_eq!(signal.total_score, -3.0);
    assert_eq!(signal.stop_loss, 1.0765);
    assert_eq!(signal.take_profit, 1.072);
}

#[tokio::test]
async fn test_cycle_runner_with_json_files() {
    let dir = std::env::temp_dir().join(format!("fxsignal-services-{}", std::process::id()));
    std::fs::create_dir_all(&dir).unwrap();
    let history: Vec<Candle> = (0..60).map(|i| candle_at(i, 1.0750, bearish_indicators())).collect();
    std::fs::write(dir.join("EURUSD.json"), serde_json::to_string(&history).unwrap()).unwrap();

    let availability = Arc::new(SymbolAvailability::new(Duration::from_secs(60)));
    let source = JsonCandleSource::new(&dir, availability.clone());
    let engine = DecisionEngine::new(EngineConfig::default(), InstrumentRegistry::with_defaults());
    let runner = CycleRunner::new(
        Arc::new(engine),
        Arc::new(source),
        vec!["EURUSD".into(), "GBPUSD".into()],
    );

    let now = Utc.with_ymd_and_hms(2024, 3, 6, 10, 0, 0).unwrap();
    let report = runner.run_cycle(now).await;

    assert_eq!(report.signals.len(), 2);
    assert_eq!(report.signals[0].signal, SignalType::Sell);
    assert_eq!(report.signals[1].reason, "insufficient data");
    assert!(!availability.is_available("GBPUSD"));

    std::fs::remove_dir_all(&dir).ok();
}
