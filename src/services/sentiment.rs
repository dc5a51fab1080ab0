//! Pair sentiment from per-currency news aggregates.

use crate::error::{EngineError, Result};
use crate::types::{sentiment_search_term, split_pair, Instrument};
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use std::future::Future;
use std::path::Path;
use std::pin::Pin;
use std::sync::Arc;
use tracing::{debug, warn};

/// Scale applied to the mean headline score, giving roughly -2..+2 per currency.
const SENTIMENT_SCALE: f64 = 2.0;

/// A store that aggregates news sentiment for one currency.
pub trait SentimentSource: Send + Sync {
    /// Windowed sentiment for `code` over the `window_hours` before `as_of`.
    ///
    /// Returns 0 when the window holds no news. An `Err` means the store
    /// itself failed.
    fn currency_sentiment<'a>(
        &'a self,
        code: &'a str,
        search_term: &'a str,
        window_hours: u32,
        as_of: DateTime<Utc>,
    ) -> Pin<Box<dyn Future<Output = Result<f64>> + Send + 'a>>;
}

/// A headline with its precomputed sentiment score in [-1, 1].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewsItem {
    /// Currency the provider tagged the article with, if any.
    #[serde(default)]
    pub currency: Option<String>,
    pub title: String,
    pub score: f64,
    pub published_at: DateTime<Utc>,
}

/// In-memory news store.
#[derive(Debug, Clone, Default)]
pub struct NewsSentimentStore {
    items: Vec<NewsItem>,
}

impl NewsSentimentStore {
    pub fn new(items: Vec<NewsItem>) -> Self {
        Self { items }
    }

    /// Load a JSON array of news items.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let raw = std::fs::read_to_string(path)?;
        let items: Vec<NewsItem> = serde_json::from_str(&raw)?;
        Ok(Self::new(items))
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Mean score of matching items in the window, scaled. 0 when nothing matches.
    pub fn aggregate(&self, code: &str, search_term: &str, window_hours: u32, as_of: DateTime<Utc>) -> f64 {
        let since = as_of - Duration::hours(i64::from(window_hours));
        let term = search_term.to_lowercase();

        let (sum, count) = self
            .items
            .iter()
            .filter(|item| item.published_at > since && item.published_at <= as_of)
            .filter(|item| item.score.is_finite())
            .filter(|item| {
                item.currency
                    .as_deref()
                    .is_some_and(|c| c.eq_ignore_ascii_case(code))
                    || item.title.to_lowercase().contains(&term)
            })
            .fold((0.0, 0usize), |(sum, count), item| (sum + item.score, count + 1));

        if count == 0 {
            return 0.0;
        }
        sum / count as f64 * SENTIMENT_SCALE
    }
}

impl SentimentSource for NewsSentimentStore {
    fn currency_sentiment<'a>(
        &'a self,
        code: &'a str,
        search_term: &'a str,
        window_hours: u32,
        as_of: DateTime<Utc>,
    ) -> Pin<Box<dyn Future<Output = Result<f64>> + Send + 'a>> {
        Box::pin(async move { Ok(self.aggregate(code, search_term, window_hours, as_of)) })
    }
}

/// Outcome of one pair lookup.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct SentimentReading {
    pub score: f64,
    /// True when the store failed for at least one currency.
    pub degraded: bool,
}

/// Turns per-currency sentiment into a base-minus-quote pair score.
#[derive(Clone)]
pub struct SentimentAggregator {
    source: Option<Arc<dyn SentimentSource>>,
    window_hours: u32,
}

impl SentimentAggregator {
    pub fn new(source: Arc<dyn SentimentSource>, window_hours: u32) -> Self {
        Self {
            source: Some(source),
            window_hours,
        }
    }

    /// An aggregator with no store; every pair scores 0.
    pub fn disabled() -> Self {
        Self {
            source: None,
            window_hours: 0,
        }
    }

    /// `score(base) - score(quote)`. Never fails.
    pub async fn pair_sentiment(&self, pair: &str, as_of: DateTime<Utc>) -> f64 {
        self.reading(pair, as_of).await.score
    }

    /// Like [`pair_sentiment`](Self::pair_sentiment), also reporting store failures.
    pub async fn reading(&self, pair: &str, as_of: DateTime<Utc>) -> SentimentReading {
        self.reading_for(pair, split_pair(pair), as_of).await
    }

    /// Reading for a registered instrument. Equities have no currencies and score 0.
    pub async fn instrument_reading(&self, instrument: &Instrument, as_of: DateTime<Utc>) -> SentimentReading {
        self.reading_for(&instrument.symbol, instrument.currencies(), as_of)
            .await
    }

    async fn reading_for(
        &self,
        pair: &str,
        currencies: Option<(&str, &str)>,
        as_of: DateTime<Utc>,
    ) -> SentimentReading {
        let Some(source) = &self.source else {
            return SentimentReading::default();
        };
        let Some((base, quote)) = currencies else {
            debug!(pair, "no currency split, sentiment skipped");
            return SentimentReading::default();
        };

        let (base_score, base_ok) = self.currency(source.as_ref(), pair, base, as_of).await;
        let (quote_score, quote_ok) = self.currency(source.as_ref(), pair, quote, as_of).await;

        SentimentReading {
            score: base_score - quote_score,
            degraded: !(base_ok && quote_ok),
        }
    }

    async fn currency(
        &self,
        source: &dyn SentimentSource,
        pair: &str,
        code: &str,
        as_of: DateTime<Utc>,
    ) -> (f64, bool) {
        let term = sentiment_search_term(code);
        match source
            .currency_sentiment(code, term, self.window_hours, as_of)
            .await
        {
            Ok(score) if score.is_finite() => (score, true),
            Ok(score) => {
                warn!(pair, currency = code, score, "non-finite sentiment, using 0");
                (0.0, false)
            }
            Err(e) => {
                warn!(pair, currency = code, error = %e, "sentiment store failed, using 0");
                (0.0, false)
            }
        }
    }
}

impl std::fmt::Debug for SentimentAggregator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SentimentAggregator")
            .field("enabled", &self.source.is_some())
            .field("window_hours", &self.window_hours)
            .finish()
    }
}

/// Source that always fails.
#[derive(Debug, Clone, Default)]
pub struct UnavailableSentiment;

impl SentimentSource for UnavailableSentiment {
    fn currency_sentiment<'a>(
        &'a self,
        code: &'a str,
        _search_term: &'a str,
        _window_hours: u32,
        _as_of: DateTime<Utc>,
    ) -> Pin<Box<dyn Future<Output = Result<f64>> + Send + 'a>> {
        Box::pin(async move { Err(EngineError::Sentiment(format!("no store for {code}"))) })
    }
}
