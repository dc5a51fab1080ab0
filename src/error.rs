use thiserror::Error;

/// Engine error types.
///
/// Only contract violations and collaborator failures live here. Unknown
/// symbols and short histories are not errors: the engine answers those with
/// a WAIT signal.
#[derive(Error, Debug)]
pub enum EngineError {
    #[error("Malformed candle for {pair}: field `{field}` is not a finite number")]
    MalformedCandle { pair: String, field: &'static str },

    #[error("Data source error: {0}")]
    DataSource(String),

    #[error("Sentiment store error: {0}")]
    Sentiment(String),

    #[error("Prediction error: {0}")]
    Prediction(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    SerdeJson(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, EngineError>;
