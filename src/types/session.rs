use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Trading-session state of an instrument at a point in time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SessionState {
    #[serde(rename = "CLOSED_WEEKEND")]
    ClosedWeekend,
    #[serde(rename = "CLOSED_OFF_HOURS")]
    ClosedOffHours,
    #[serde(rename = "OPEN_ASIA")]
    OpenAsia,
    #[serde(rename = "OPEN_LONDON")]
    OpenLondon,
    #[serde(rename = "OPEN_OVERLAP")]
    OpenOverlap,
    #[serde(rename = "OPEN_NEWYORK")]
    OpenNewYork,
    #[serde(rename = "OPEN_247")]
    Open247,
}

impl SessionState {
    pub fn is_open(&self) -> bool {
        !matches!(self, SessionState::ClosedWeekend | SessionState::ClosedOffHours)
    }

    /// Human-readable session label.
    pub fn label(&self) -> &'static str {
        match self {
            SessionState::ClosedWeekend => "Weekend - Market Closed",
            SessionState::ClosedOffHours => "Market Closed",
            SessionState::OpenAsia => "Asia Session",
            SessionState::OpenLondon => "London Session",
            SessionState::OpenOverlap => "London + NY Overlap (Peak)",
            SessionState::OpenNewYork => "New York Session",
            SessionState::Open247 => "Crypto Market (24/7)",
        }
    }
}

/// Session snapshot attached to a signal.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionInfo {
    pub state: SessionState,
    pub is_open: bool,
    pub session_name: String,
    /// Next window start; None while open.
    pub next_open: Option<DateTime<Utc>>,
}

impl SessionInfo {
    pub fn open(state: SessionState, session_name: &str) -> Self {
        Self {
            state,
            is_open: true,
            session_name: session_name.to_string(),
            next_open: None,
        }
    }

    pub fn closed(state: SessionState, next_open: DateTime<Utc>) -> Self {
        Self {
            state,
            is_open: false,
            session_name: state.label().to_string(),
            next_open: Some(next_open),
        }
    }
}
