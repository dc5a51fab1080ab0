//! Trading-session state derived from wall-clock time.
//!
//! The gate holds only configuration. Every call recomputes the state from
//! the instrument class and the injected `now`.

use crate::config::SessionConfig;
use crate::types::{InstrumentClass, SessionInfo, SessionState};
use chrono::{DateTime, Datelike, Duration, NaiveDate, NaiveTime, TimeZone, Timelike, Utc, Weekday};

/// US cash session in UTC, as (hour, minute).
const EQUITY_OPEN: (u32, u32) = (14, 30);
const EQUITY_CLOSE: (u32, u32) = (21, 0);
const EQUITY_SESSION_NAME: &str = "US Equity Session";

#[derive(Debug, Clone, Copy)]
pub struct SessionGate {
    start_hour: u32,
    end_hour: u32,
}

impl SessionGate {
    pub fn new(config: SessionConfig) -> Self {
        Self {
            start_hour: config.start_hour_utc.min(23),
            end_hour: config.end_hour_utc.min(24),
        }
    }

    /// Session snapshot for an instrument of `class` at `now`.
    pub fn state(&self, class: InstrumentClass, now: DateTime<Utc>) -> SessionInfo {
        match class {
            InstrumentClass::AlwaysOpen => {
                SessionInfo::open(SessionState::Open247, SessionState::Open247.label())
            }
            InstrumentClass::WeekdaySession => self.weekday_session(now),
            InstrumentClass::ExchangeHours => equity_session(now),
        }
    }

    fn weekday_session(&self, now: DateTime<Utc>) -> SessionInfo {
        if is_weekend(now) {
            return SessionInfo::closed(
                SessionState::ClosedWeekend,
                next_monday(now, self.first_open_hour(), 0),
            );
        }

        let hour = now.hour();
        if self.in_window(hour) {
            let state = band(hour);
            return SessionInfo::open(state, state.label());
        }

        SessionInfo::closed(
            SessionState::ClosedOffHours,
            next_weekday_at(now, self.start_hour, 0),
        )
    }

    /// Earliest hour of a day that falls inside the window.
    ///
    /// A window wrapping past midnight is already open at 00:00.
    fn first_open_hour(&self) -> u32 {
        (0..24)
            .find(|&hour| self.in_window(hour))
            .unwrap_or(self.start_hour)
    }

    fn in_window(&self, hour: u32) -> bool {
        if self.start_hour < self.end_hour {
            hour >= self.start_hour && hour < self.end_hour
        } else {
            // wraps past midnight
            hour >= self.start_hour || hour < self.end_hour
        }
    }
}

/// Descriptive band for an hour inside the trading window.
fn band(hour: u32) -> SessionState {
    match hour {
        8..=12 => SessionState::OpenLondon,
        13..=16 => SessionState::OpenOverlap,
        17..=21 => SessionState::OpenNewYork,
        _ => SessionState::OpenAsia,
    }
}

fn equity_session(now: DateTime<Utc>) -> SessionInfo {
    let (open_h, open_m) = EQUITY_OPEN;
    if is_weekend(now) {
        return SessionInfo::closed(SessionState::ClosedWeekend, next_monday(now, open_h, open_m));
    }

    let minutes = now.hour() * 60 + now.minute();
    let open = open_h * 60 + open_m;
    let close = EQUITY_CLOSE.0 * 60 + EQUITY_CLOSE.1;
    if minutes >= open && minutes < close {
        return SessionInfo::open(SessionState::OpenNewYork, EQUITY_SESSION_NAME);
    }

    SessionInfo::closed(SessionState::ClosedOffHours, next_weekday_at(now, open_h, open_m))
}

fn is_weekend(now: DateTime<Utc>) -> bool {
    matches!(now.weekday(), Weekday::Sat | Weekday::Sun)
}

fn at(date: NaiveDate, hour: u32, minute: u32) -> DateTime<Utc> {
    let time = NaiveTime::from_hms_opt(hour, minute, 0).unwrap_or_default();
    Utc.from_utc_datetime(&date.and_time(time))
}

fn next_monday(now: DateTime<Utc>, hour: u32, minute: u32) -> DateTime<Utc> {
    let days = 7 - i64::from(now.weekday().num_days_from_monday());
    at(now.date_naive() + Duration::days(days), hour, minute)
}

/// Today's window start if still ahead, else the next day's, rolled past the weekend.
fn next_weekday_at(now: DateTime<Utc>, hour: u32, minute: u32) -> DateTime<Utc> {
    let mut next = at(now.date_naive(), hour, minute);
    if next <= now {
        next += Duration::days(1);
    }
    match next.weekday() {
        Weekday::Sat => next + Duration::days(2),
        Weekday::Sun => next + Duration::days(1),
        _ => next,
    }
}
