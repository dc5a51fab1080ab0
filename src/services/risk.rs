//! ATR-based stop-loss and take-profit levels.

use crate::types::SignalType;
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Error, PartialEq)]
pub enum RiskError {
    #[error("ATR must be positive to size a {signal} position, got {atr}")]
    NoVolatility { signal: SignalType, atr: f64 },
    #[error("entry price must be positive and finite, got {0}")]
    InvalidPrice(f64),
}

/// Exit levels for one signal. Both zero for WAIT.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct RiskLevels {
    pub stop_loss: f64,
    pub take_profit: f64,
}

impl RiskLevels {
    /// Round to `decimals` places, keeping at least one tick between each
    /// level and the rounded entry.
    pub fn rounded(self, signal: SignalType, price: f64, decimals: u32) -> Self {
        let tick = 10f64.powi(-(decimals as i32));
        let entry = round_to(price, decimals);
        let mut stop_loss = round_to(self.stop_loss, decimals);
        let mut take_profit = round_to(self.take_profit, decimals);

        match signal {
            SignalType::Buy => {
                if stop_loss >= entry {
                    stop_loss = round_to(entry - tick, decimals);
                }
                if take_profit <= entry {
                    take_profit = round_to(entry + tick, decimals);
                }
            }
            SignalType::Sell => {
                if stop_loss <= entry {
                    stop_loss = round_to(entry + tick, decimals);
                }
                if take_profit >= entry {
                    take_profit = round_to(entry - tick, decimals);
                }
            }
            SignalType::Wait => return Self::default(),
        }

        Self {
            stop_loss,
            take_profit,
        }
    }
}

/// Round half away from zero to `decimals` places.
pub fn round_to(value: f64, decimals: u32) -> f64 {
    let factor = 10f64.powi(decimals as i32);
    (value * factor).round() / factor
}

#[derive(Debug, Clone, Copy, Default)]
pub struct RiskCalculator;

impl RiskCalculator {
    pub fn new() -> Self {
        Self
    }

    /// Stop `atr * atr_multiplier` away from entry, target `min_risk_reward`
    /// times the stop distance on the other side.
    pub fn levels(
        &self,
        signal: SignalType,
        price: f64,
        atr: f64,
        atr_multiplier: f64,
        min_risk_reward: f64,
    ) -> Result<RiskLevels, RiskError> {
        if signal == SignalType::Wait {
            return Ok(RiskLevels::default());
        }
        if !(price.is_finite() && price > 0.0) {
            return Err(RiskError::InvalidPrice(price));
        }
        let distance = atr * atr_multiplier;
        if !(distance.is_finite() && distance > 0.0) {
            return Err(RiskError::NoVolatility { signal, atr });
        }

        let levels = match signal {
            SignalType::Buy => {
                let stop_loss = price - distance;
                let risk = price - stop_loss;
                RiskLevels {
                    stop_loss,
                    take_profit: price + risk * min_risk_reward,
                }
            }
            SignalType::Sell => {
                let stop_loss = price + distance;
                let risk = stop_loss - price;
                RiskLevels {
                    stop_loss,
                    take_profit: price - risk * min_risk_reward,
                }
            }
            SignalType::Wait => RiskLevels::default(),
        };
        Ok(levels)
    }
}
