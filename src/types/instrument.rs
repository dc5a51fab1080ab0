use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Trading-hours class of an instrument.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InstrumentClass {
    /// Trades around the clock, every day (crypto).
    AlwaysOpen,
    /// Closed on weekends, tradeable inside the configured daily window (forex, metals).
    WeekdaySession,
    /// Follows its own exchange's cash session (US equities).
    ExchangeHours,
}

impl InstrumentClass {
    /// Parse from string.
    pub fn from_str(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "always_open" | "24/7" | "crypto" => Some(Self::AlwaysOpen),
            "weekday_session" | "forex" | "fx" | "metal" | "commodity" => Some(Self::WeekdaySession),
            "exchange_hours" | "stock" | "equity" => Some(Self::ExchangeHours),
            _ => None,
        }
    }
}

/// A tradeable instrument known to the engine.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Instrument {
    pub symbol: String,
    pub class: InstrumentClass,
}

impl Instrument {
    pub fn new(symbol: &str, class: InstrumentClass) -> Self {
        Self {
            symbol: symbol.to_uppercase(),
            class,
        }
    }

    /// Split a six-letter pair into base and quote codes.
    ///
    /// Returns None for symbols that are not currency-style pairs (equity tickers).
    pub fn currencies(&self) -> Option<(&str, &str)> {
        if self.class == InstrumentClass::ExchangeHours {
            return None;
        }
        split_pair(&self.symbol)
    }
}

/// Split "EURUSD" into ("EUR", "USD").
pub fn split_pair(symbol: &str) -> Option<(&str, &str)> {
    if symbol.len() != 6 || !symbol.chars().all(|c| c.is_ascii_alphabetic()) {
        return None;
    }
    Some(symbol.split_at(3))
}

/// Decimal places used for prices of this symbol.
///
/// JPY-quoted pairs quote to 3 decimals, metals to 2, everything else to 5.
pub fn default_precision(symbol: &str) -> u32 {
    let upper = symbol.to_uppercase();
    if upper.contains("JPY") {
        3
    } else if upper.contains("XAU") || upper.contains("XAG") {
        2
    } else {
        5
    }
}

/// Term used when searching news for a currency code.
///
/// Metals are reported under their common names rather than ISO codes.
pub fn sentiment_search_term(code: &str) -> &str {
    match code {
        "XAU" => "Gold",
        "XAG" => "Silver",
        other => other,
    }
}

/// The set of instruments the engine will analyze.
#[derive(Debug, Clone, Default)]
pub struct InstrumentRegistry {
    instruments: HashMap<String, Instrument>,
}

impl InstrumentRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Forex majors and crosses, metals, two crypto pairs and a few US equities.
    pub fn with_defaults() -> Self {
        let mut registry = Self::new();
        for symbol in [
            "EURUSD", "USDJPY", "GBPUSD", "USDCAD", "AUDUSD", "NZDUSD", "GBPJPY", "EURJPY",
            "EURGBP", "USDCHF", "XAUUSD", "XAGUSD",
        ] {
            registry.insert(Instrument::new(symbol, InstrumentClass::WeekdaySession));
        }
        for symbol in ["BTCUSD", "ETHUSD"] {
            registry.insert(Instrument::new(symbol, InstrumentClass::AlwaysOpen));
        }
        for symbol in ["AAPL", "GOOGL", "MSFT", "TSLA", "AMZN"] {
            registry.insert(Instrument::new(symbol, InstrumentClass::ExchangeHours));
        }
        registry
    }

    pub fn insert(&mut self, instrument: Instrument) {
        self.instruments.insert(instrument.symbol.clone(), instrument);
    }

    /// Look up a symbol, case-insensitively.
    pub fn get(&self, symbol: &str) -> Option<&Instrument> {
        self.instruments.get(&symbol.trim().to_uppercase())
    }

    pub fn contains(&self, symbol: &str) -> bool {
        self.get(symbol).is_some()
    }

    /// All known symbols, sorted.
    pub fn symbols(&self) -> Vec<String> {
        let mut symbols: Vec<String> = self.instruments.keys().cloned().collect();
        symbols.sort();
        symbols
    }

    pub fn len(&self) -> usize {
        self.instruments.len()
    }

    pub fn is_empty(&self) -> bool {
        self.instruments.is_empty()
    }
}
