use anyhow::Context;
use chrono::Utc;
use fxsignal::config::Config;
use fxsignal::services::{
    CycleRunner, DecisionEngine, JsonCandleSource, NewsSentimentStore, SentimentAggregator,
    SymbolAvailability,
};
use std::io::Write;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment variables
    dotenvy::dotenv().ok();

    // Logs go to stderr; stdout carries one JSON signal per line
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "fxsignal=info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let config = Config::from_env();
    config.validate().context("invalid configuration")?;
    info!(
        interval_secs = config.runner.cycle_interval_secs,
        data_dir = %config.runner.data_dir,
        "Starting fxsignal"
    );

    let data_dir = Path::new(&config.runner.data_dir);
    let sentiment = load_sentiment(data_dir, config.engine.sentiment_window_hours);

    let availability = Arc::new(SymbolAvailability::new(Duration::from_secs(
        config.runner.unavailable_ttl_secs,
    )));
    let source = Arc::new(JsonCandleSource::new(data_dir, Arc::clone(&availability)));

    let engine = Arc::new(
        DecisionEngine::new(config.engine.clone(), config.instruments.clone()).with_sentiment(sentiment),
    );
    let known = engine.instruments().symbols();
    let runner = CycleRunner::new(engine, source, config.runner.pairs.clone())
        .with_pair_delay(Duration::from_millis(config.runner.pair_delay_ms));

    info!(instruments = known.len(), pairs = ?runner.pairs(), "Watch list ready");
    for pair in runner.pairs().iter().filter(|p| !known.contains(p)) {
        warn!(pair = %pair, "Pair not in the instrument registry, it will always WAIT");
    }

    let mut interval = tokio::time::interval(Duration::from_secs(config.runner.cycle_interval_secs.max(1)));
    loop {
        tokio::select! {
            _ = interval.tick() => {}
            _ = tokio::signal::ctrl_c() => {
                info!("Shutting down");
                break;
            }
        }

        availability.cleanup();
        let report = runner.run_cycle(Utc::now()).await;

        let mut stdout = std::io::stdout().lock();
        for signal in &report.signals {
            writeln!(stdout, "{}", serde_json::to_string(signal)?)?;
        }
        stdout.flush()?;

        if config.runner.run_once {
            break;
        }
    }

    Ok(())
}

/// Sentiment from `<data_dir>/sentiment.json`, or none when the file is absent or unreadable.
fn load_sentiment(data_dir: &Path, window_hours: u32) -> SentimentAggregator {
    let path = data_dir.join("sentiment.json");
    if !path.exists() {
        info!(path = %path.display(), "No sentiment file, sentiment scores will be 0");
        return SentimentAggregator::disabled();
    }
    match NewsSentimentStore::load(&path) {
        Ok(store) => {
            info!(items = store.len(), "Loaded news sentiment");
            SentimentAggregator::new(Arc::new(store), window_hours)
        }
        Err(e) => {
            warn!(path = %path.display(), error = %e, "Failed to load sentiment, scores will be 0");
            SentimentAggregator::disabled()
        }
    }
}
