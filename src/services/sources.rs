//! Candle sources the engine can pull history from.

use crate::error::{EngineError, Result};
use crate::services::availability::SymbolAvailability;
use crate::types::Candle;
use std::collections::HashMap;
use std::future::Future;
use std::path::PathBuf;
use std::pin::Pin;
use std::sync::Arc;
use tracing::{debug, warn};

/// Data-access layer for candle history.
pub trait CandleSource: Send + Sync {
    /// Candle history for `pair`, ascending by time.
    fn fetch_candles<'a>(
        &'a self,
        pair: &'a str,
    ) -> Pin<Box<dyn Future<Output = Result<Vec<Candle>>> + Send + 'a>>;
}

/// Reads `<dir>/<PAIR>.json`, a JSON array of candles.
///
/// Symbols whose file cannot be read or parsed are parked in the
/// availability cache and skipped until it expires.
pub struct JsonCandleSource {
    dir: PathBuf,
    availability: Arc<SymbolAvailability>,
}

impl JsonCandleSource {
    pub fn new(dir: impl Into<PathBuf>, availability: Arc<SymbolAvailability>) -> Self {
        Self {
            dir: dir.into(),
            availability,
        }
    }

    fn path_for(&self, pair: &str) -> PathBuf {
        self.dir.join(format!("{}.json", pair.to_uppercase()))
    }

    async fn load(&self, pair: &str) -> Result<Vec<Candle>> {
        let path = self.path_for(pair);
        let raw = tokio::fs::read_to_string(&path).await?;
        let mut candles: Vec<Candle> = serde_json::from_str(&raw)?;
        candles.sort_by_key(|c| c.time);
        debug!(pair, count = candles.len(), path = %path.display(), "candles loaded");
        Ok(candles)
    }
}

impl CandleSource for JsonCandleSource {
    fn fetch_candles<'a>(
        &'a self,
        pair: &'a str,
    ) -> Pin<Box<dyn Future<Output = Result<Vec<Candle>>> + Send + 'a>> {
        Box::pin(async move {
            if let Some(reason) = self.availability.unavailable_reason(pair) {
                return Err(EngineError::DataSource(format!(
                    "{pair} temporarily unavailable: {reason}"
                )));
            }

            match self.load(pair).await {
                Ok(candles) => Ok(candles),
                Err(e) => {
                    warn!(pair, error = %e, "candle fetch failed, marking symbol unavailable");
                    self.availability.mark_unavailable(pair, e.to_string());
                    Err(e)
                }
            }
        })
    }
}

/// Fixed candle histories held in memory.
#[derive(Debug, Clone, Default)]
pub struct StaticCandleSource {
    histories: HashMap<String, Vec<Candle>>,
}

impl StaticCandleSource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_history(mut self, pair: &str, candles: Vec<Candle>) -> Self {
        self.insert(pair, candles);
        self
    }

    pub fn insert(&mut self, pair: &str, candles: Vec<Candle>) {
        self.histories.insert(pair.to_uppercase(), candles);
    }
}

impl CandleSource for StaticCandleSource {
    fn fetch_candles<'a>(
        &'a self,
        pair: &'a str,
    ) -> Pin<Box<dyn Future<Output = Result<Vec<Candle>>> + Send + 'a>> {
        Box::pin(async move {
            self.histories
                .get(&pair.to_uppercase())
                .cloned()
                .ok_or_else(|| EngineError::DataSource(format!("no history for {pair}")))
        })
    }
}
