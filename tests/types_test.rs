//! Unit tests for the public data model

use chrono::{TimeZone, Utc};
use fxsignal::types::*;

#[test]
fn test_signal_type_serialization() {
    assert_eq!(serde_json::to_string(&SignalType::Buy).unwrap(), "\"BUY\"");
    assert_eq!(serde_json::to_string(&SignalType::Wait).unwrap(), "\"WAIT\"");
    let parsed: SignalType = serde_json::from_str("\"SELL\"").unwrap();
    assert_eq!(parsed, SignalType::Sell);
}

#[test]
fn test_session_state_serialization() {
    assert_eq!(
        serde_json::to_string(&SessionState::ClosedOffHours).unwrap(),
        "\"CLOSED_OFF_HOURS\""
    );
    assert_eq!(serde_json::to_string(&SessionState::Open247).unwrap(), "\"OPEN_247\"");
}

#[test]
fn test_closed_session_info() {
    let next = Utc.with_ymd_and_hms(2024, 3, 11, 8, 0, 0).unwrap();
    let info = SessionInfo::closed(SessionState::ClosedWeekend, next);
    assert!(!info.is_open);
    assert_eq!(info.session_name, "Weekend - Market Closed");
    assert_eq!(info.next_open, Some(next));
}

#[test]
fn test_wait_signal_round_trip() {
    let time = Utc.with_ymd_and_hms(2024, 3, 4, 10, 0, 0).unwrap();
    let signal = Signal::wait("EURUSD", time, "2024-03-04 15:30:00 (IST)".into(), "insufficient data");
    let json = serde_json::to_string(&signal).unwrap();
    let back: Signal = serde_json::from_str(&json).unwrap();
    assert_eq!(back, signal);
    assert!(!back.is_actionable());
}

#[test]
fn test_ml_prediction_labels() {
    let prediction: MlPrediction =
        serde_json::from_str(r#"{"label": "BUY", "probability": 0.81}"#).unwrap();
    assert_eq!(prediction.label, MlLabel::Buy);
    assert_eq!(prediction.label.sign(), 1.0);
    assert_eq!(MlPrediction::hold().label.sign(), 0.0);
}

#[test]
fn test_registry_defaults_cover_every_class() {
    let registry = InstrumentRegistry::with_defaults();
    assert_eq!(registry.get("eurusd").map(|i| i.class), Some(InstrumentClass::WeekdaySession));
    assert_eq!(registry.get("BTCUSD").map(|i| i.class), Some(InstrumentClass::AlwaysOpen));
    assert_eq!(registry.get("AAPL").map(|i| i.class), Some(InstrumentClass::ExchangeHours));
    assert!(!registry.contains("EURXYZ"));
}

#[test]
fn test_precision_by_instrument() {
    assert_eq!(default_precision("GBPJPY"), 3);
    assert_eq!(default_precision("XAUUSD"), 2);
    assert_eq!(default_precision("XAGUSD"), 2);
    assert_eq!(default_precision("EURUSD"), 5);
}

#[test]
fn test_pattern_catalogue_is_closed() {
    assert_eq!(PatternKind::ALL.len(), 15);
    let bullish = PatternKind::ALL
        .iter()
        .filter(|k| k.bias() == PatternBias::Bullish)
        .count();
    let bearish = PatternKind::ALL
        .iter()
        .filter(|k| k.bias() == PatternBias::Bearish)
        .count();
    assert_eq!(bullish, bearish);
}
