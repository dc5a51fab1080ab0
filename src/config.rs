use crate::types::{Instrument, InstrumentClass, InstrumentRegistry};
use std::collections::HashMap;
use std::env;
use thiserror::Error;

/// Configuration validation errors.
#[derive(Debug, Error, PartialEq)]
pub enum ConfigError {
    #[error("buy_threshold ({buy}) must be greater than sell_threshold ({sell})")]
    Thresholds { buy: f64, sell: f64 },
    #[error("{0} must be a positive finite number")]
    NonPositive(&'static str),
    #[error("pattern_lookback must be at least 3, got {0}")]
    Lookback(usize),
    #[error("session hours must be in 0..24 and differ, got {start}..{end}")]
    SessionHours { start: u32, end: u32 },
    #[error("local_offset_minutes must be within ±1439, got {0}")]
    LocalOffset(i32),
    #[error("pair delay of {delay_ms}ms across {pairs} pairs does not fit in a {interval_secs}s cycle")]
    PairDelay {
        delay_ms: u64,
        pairs: usize,
        interval_secs: u64,
    },
}

/// Largest display offset from UTC, in minutes (exclusive of a full day).
pub const MAX_OFFSET_MINUTES: i32 = 24 * 60 - 1;

/// Daily trading window for weekday-session instruments, in UTC hours.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SessionConfig {
    /// First tradeable hour (inclusive).
    pub start_hour_utc: u32,
    /// First non-tradeable hour (exclusive). Below start means the window wraps midnight.
    pub end_hour_utc: u32,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            start_hour_utc: 8,
            end_hour_utc: 22,
        }
    }
}

/// Decision policy passed into the engine.
#[derive(Debug, Clone)]
pub struct EngineConfig {
    pub buy_threshold: f64,
    pub sell_threshold: f64,
    /// Stop distance in ATRs.
    pub atr_multiplier: f64,
    /// Take-profit distance as a multiple of the stop distance.
    pub min_risk_reward: f64,
    /// ML score = sign(label) * ml_weight * probability.
    pub ml_weight: f64,
    /// Total score that maps to 100% confidence.
    pub confidence_normalizer: f64,
    /// Candles scanned by the pattern detector.
    pub pattern_lookback: usize,
    /// Candles required before any analysis.
    pub min_history: usize,
    /// News window for currency sentiment.
    pub sentiment_window_hours: u32,
    /// Display timezone for `time_local`, in minutes east of UTC.
    pub local_offset_minutes: i32,
    pub local_label: String,
    /// Decimal places by symbol, overriding the default rule.
    pub precision_overrides: HashMap<String, u32>,
    pub session: SessionConfig,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            buy_threshold: 3.0,
            sell_threshold: -3.0,
            atr_multiplier: 1.5,
            min_risk_reward: 2.0,
            ml_weight: 2.0,
            confidence_normalizer: 5.0,
            pattern_lookback: 100,
            min_history: 50,
            sentiment_window_hours: 24,
            local_offset_minutes: 330, // IST
            local_label: "IST".to_string(),
            precision_overrides: HashMap::new(),
            session: SessionConfig::default(),
        }
    }
}

impl EngineConfig {
    /// Check the policy for internal consistency.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(self.buy_threshold > self.sell_threshold) {
            return Err(ConfigError::Thresholds {
                buy: self.buy_threshold,
                sell: self.sell_threshold,
            });
        }
        for (name, value) in [
            ("atr_multiplier", self.atr_multiplier),
            ("min_risk_reward", self.min_risk_reward),
            ("confidence_normalizer", self.confidence_normalizer),
        ] {
            if !(value.is_finite() && value > 0.0) {
                return Err(ConfigError::NonPositive(name));
            }
        }
        if !(self.ml_weight.is_finite() && self.ml_weight >= 0.0) {
            return Err(ConfigError::NonPositive("ml_weight"));
        }
        if self.pattern_lookback < 3 {
            return Err(ConfigError::Lookback(self.pattern_lookback));
        }
        let SessionConfig {
            start_hour_utc: start,
            end_hour_utc: end,
        } = self.session;
        if start >= 24 || end > 24 || start == end {
            return Err(ConfigError::SessionHours { start, end });
        }
        if self.local_offset_minutes.unsigned_abs() > MAX_OFFSET_MINUTES as u32 {
            return Err(ConfigError::LocalOffset(self.local_offset_minutes));
        }
        Ok(())
    }
}

/// Settings for the periodic analysis loop in the binary.
#[derive(Debug, Clone)]
pub struct RunnerConfig {
    /// Watch list analyzed every cycle.
    pub pairs: Vec<String>,
    pub cycle_interval_secs: u64,
    /// Directory holding `<PAIR>.json` candle files and `sentiment.json`.
    pub data_dir: String,
    /// Stagger between pair tasks, to spare rate-limited upstreams.
    pub pair_delay_ms: u64,
    /// Seconds a failing symbol is skipped before it is retried.
    pub unavailable_ttl_secs: u64,
    /// Run a single cycle and exit.
    pub run_once: bool,
}

impl RunnerConfig {
    /// The staggered starts of one cycle must finish inside the cycle interval.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let stagger_ms = self
            .pair_delay_ms
            .checked_mul(self.pairs.len().saturating_sub(1) as u64);
        let interval_ms = self.cycle_interval_secs.saturating_mul(1000);
        match stagger_ms {
            Some(total) if self.pair_delay_ms == 0 || total < interval_ms => Ok(()),
            _ => Err(ConfigError::PairDelay {
                delay_ms: self.pair_delay_ms,
                pairs: self.pairs.len(),
                interval_secs: self.cycle_interval_secs,
            }),
        }
    }
}

impl Default for RunnerConfig {
    fn default() -> Self {
        Self {
            pairs: ["EURUSD", "USDJPY", "GBPUSD", "USDCAD", "GBPJPY", "XAUUSD", "XAGUSD"]
                .iter()
                .map(|s| s.to_string())
                .collect(),
            cycle_interval_secs: 900,
            data_dir: "data".to_string(),
            pair_delay_ms: 0,
            unavailable_ttl_secs: 3600,
            run_once: false,
        }
    }
}

/// Application configuration.
#[derive(Debug, Clone)]
pub struct Config {
    pub engine: EngineConfig,
    pub runner: RunnerConfig,
    pub instruments: InstrumentRegistry,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            engine: EngineConfig::default(),
            runner: RunnerConfig::default(),
            instruments: InstrumentRegistry::with_defaults(),
        }
    }
}

impl Config {
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.engine.validate()?;
        self.runner.validate()
    }

    /// Load configuration from environment variables.
    pub fn from_env() -> Self {
        let defaults = EngineConfig::default();
        let engine = EngineConfig {
            buy_threshold: env_parse("BUY_THRESHOLD", defaults.buy_threshold),
            sell_threshold: env_parse("SELL_THRESHOLD", defaults.sell_threshold),
            atr_multiplier: env_parse("ATR_MULTIPLIER_SL", defaults.atr_multiplier),
            min_risk_reward: env_parse("MIN_RISK_REWARD", defaults.min_risk_reward),
            ml_weight: env_parse("ML_WEIGHT", defaults.ml_weight),
            confidence_normalizer: env_parse(
                "CONFIDENCE_NORMALIZER",
                defaults.confidence_normalizer,
            ),
            pattern_lookback: env_parse("PATTERN_LOOKBACK", defaults.pattern_lookback),
            min_history: env_parse("MIN_HISTORY", defaults.min_history),
            sentiment_window_hours: env_parse(
                "SENTIMENT_WINDOW_HOURS",
                defaults.sentiment_window_hours,
            ),
            local_offset_minutes: env_parse("LOCAL_OFFSET_MINUTES", defaults.local_offset_minutes),
            local_label: env::var("LOCAL_LABEL").unwrap_or(defaults.local_label),
            precision_overrides: env::var("PRICE_PRECISION")
                .map(|v| parse_precision_overrides(&v))
                .unwrap_or_default(),
            session: SessionConfig {
                start_hour_utc: env_parse("TRADING_START_HOUR_UTC", defaults.session.start_hour_utc),
                end_hour_utc: env_parse("TRADING_END_HOUR_UTC", defaults.session.end_hour_utc),
            },
        };

        let runner_defaults = RunnerConfig::default();
        let runner = RunnerConfig {
            pairs: env::var("PAIRS")
                .map(|v| parse_symbol_list(&v))
                .unwrap_or(runner_defaults.pairs),
            cycle_interval_secs: env_parse("CYCLE_INTERVAL_SECS", runner_defaults.cycle_interval_secs),
            data_dir: env::var("DATA_DIR").unwrap_or(runner_defaults.data_dir),
            pair_delay_ms: env_parse("PAIR_DELAY_MS", runner_defaults.pair_delay_ms),
            unavailable_ttl_secs: env_parse(
                "UNAVAILABLE_TTL_SECS",
                runner_defaults.unavailable_ttl_secs,
            ),
            run_once: env::var("RUN_ONCE")
                .map(|v| v == "true" || v == "1")
                .unwrap_or(runner_defaults.run_once),
        };

        let mut instruments = InstrumentRegistry::with_defaults();
        if let Ok(extra) = env::var("EXTRA_SYMBOLS") {
            for instrument in parse_extra_symbols(&extra) {
                instruments.insert(instrument);
            }
        }

        Self {
            engine,
            runner,
            instruments,
        }
    }
}

fn env_parse<T: std::str::FromStr>(key: &str, default: T) -> T {
    env::var(key)
        .ok()
        .and_then(|v| v.trim().parse().ok())
        .unwrap_or(default)
}

/// "EURUSD, usdjpy" -> ["EURUSD", "USDJPY"]
fn parse_symbol_list(value: &str) -> Vec<String> {
    value
        .split(',')
        .map(|s| s.trim().to_uppercase())
        .filter(|s| !s.is_empty())
        .collect()
}

/// "SOLUSD:crypto,EURCHF:forex" -> instruments. Entries with an unknown class are skipped.
fn parse_extra_symbols(value: &str) -> Vec<Instrument> {
    value
        .split(',')
        .filter_map(|entry| {
            let (symbol, class) = entry.split_once(':')?;
            let class = InstrumentClass::from_str(class)?;
            let symbol = symbol.trim();
            if symbol.is_empty() {
                return None;
            }
            Some(Instrument::new(symbol, class))
        })
        .collect()
}

/// "BTCUSD:2,EURUSD:4" -> {"BTCUSD": 2, "EURUSD": 4}
fn parse_precision_overrides(value: &str) -> HashMap<String, u32> {
    value
        .split(',')
        .filter_map(|entry| {
            let (symbol, digits) = entry.split_once(':')?;
            let digits: u32 = digits.trim().parse().ok()?;
            Some((symbol.trim().to_uppercase(), digits))
        })
        .collect()
}
