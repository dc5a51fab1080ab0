//! fxsignal - multi-factor trading decision engine

pub mod config;
pub mod error;
pub mod services;
pub mod types;

// Re-export commonly used types
pub use config::{Config, ConfigError, EngineConfig, RunnerConfig, SessionConfig};
pub use error::{EngineError, Result};
pub use services::{CycleReport, CycleRunner, DecisionEngine};
pub use types::*;
