//! One analysis pass over the watch list.

use crate::services::engine::DecisionEngine;
use crate::services::sources::CandleSource;
use crate::types::{Signal, SignalType};
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::sync::Arc;
use std::time::Duration;
use tracing::{error, info};

/// A pair whose analysis produced no signal.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PairFailure {
    pub pair: String,
    pub error: String,
}

/// Outcome of one cycle, in watch-list order.
#[derive(Debug, Clone, Default, Serialize)]
pub struct CycleReport {
    pub signals: Vec<Signal>,
    pub failures: Vec<PairFailure>,
}

impl CycleReport {
    pub fn count(&self, signal_type: SignalType) -> usize {
        self.signals.iter().filter(|s| s.signal == signal_type).count()
    }

    pub fn actionable(&self) -> impl Iterator<Item = &Signal> {
        self.signals.iter().filter(|s| s.is_actionable())
    }
}

pub struct CycleRunner {
    engine: Arc<DecisionEngine>,
    source: Arc<dyn CandleSource>,
    pairs: Vec<String>,
    pair_delay: Duration,
}

impl CycleRunner {
    pub fn new(engine: Arc<DecisionEngine>, source: Arc<dyn CandleSource>, pairs: Vec<String>) -> Self {
        Self {
            engine,
            source,
            pairs,
            pair_delay: Duration::ZERO,
        }
    }

    /// Stagger task starts by `delay` per position in the watch list.
    pub fn with_pair_delay(mut self, delay: Duration) -> Self {
        self.pair_delay = delay;
        self
    }

    pub fn pairs(&self) -> &[String] {
        &self.pairs
    }

    /// Analyze every pair concurrently, all against the same `now`.
    pub async fn run_cycle(&self, now: DateTime<Utc>) -> CycleReport {
        let handles: Vec<_> = self
            .pairs
            .iter()
            .enumerate()
            .map(|(position, pair)| {
                let engine = Arc::clone(&self.engine);
                let source = Arc::clone(&self.source);
                let pair = pair.clone();
                let delay = self
                    .pair_delay
                    .saturating_mul(u32::try_from(position).unwrap_or(u32::MAX));
                tokio::spawn(async move {
                    if !delay.is_zero() {
                        tokio::time::sleep(delay).await;
                    }
                    engine.analyze_pair(source.as_ref(), &pair, now).await
                })
            })
            .collect();

        let mut report = CycleReport::default();
        for (pair, handle) in self.pairs.iter().zip(handles) {
            match handle.await {
                Ok(Ok(signal)) => report.signals.push(signal),
                Ok(Err(e)) => {
                    error!(pair = %pair, error = %e, "analysis failed");
                    report.failures.push(PairFailure {
                        pair: pair.clone(),
                        error: e.to_string(),
                    });
                }
                Err(e) => {
                    error!(pair = %pair, error = %e, "analysis task aborted");
                    report.failures.push(PairFailure {
                        pair: pair.clone(),
                        error: e.to_string(),
                    });
                }
            }
        }

        info!(
            pairs = self.pairs.len(),
            buy = report.count(SignalType::Buy),
            sell = report.count(SignalType::Sell),
            wait = report.count(SignalType::Wait),
            failed = report.failures.len(),
            "cycle complete"
        );
        report
    }
}
