pub mod availability;
pub mod engine;
pub mod ml;
pub mod patterns;
pub mod risk;
pub mod runner;
pub mod sentiment;
pub mod session;
pub mod sources;
pub mod technical;

pub use availability::SymbolAvailability;
pub use engine::DecisionEngine;
pub use ml::{FeatureVector, MlPredictor, NoopPredictor};
pub use patterns::{PatternConfig, PatternDetector, PatternError};
pub use risk::{round_to, RiskCalculator, RiskError, RiskLevels};
pub use runner::{CycleReport, CycleRunner, PairFailure};
pub use sentiment::{
    NewsItem, NewsSentimentStore, SentimentAggregator, SentimentReading, SentimentSource,
    UnavailableSentiment,
};
pub use session::SessionGate;
pub use sources::{CandleSource, JsonCandleSource, StaticCandleSource};
pub use technical::{TechnicalBreakdown, TechnicalScorer, MAX_TECHNICAL_SCORE};
