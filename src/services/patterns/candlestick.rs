//! Candlestick formations, read off the last one to three candles of the window.

use crate::types::Candle;

/// Candles before the signal candle used to judge the preceding move.
const PRIOR_MOVE_BARS: usize = 5;

fn has_range(c: &Candle) -> bool {
    c.range() > 0.0
}

fn last_n(window: &[Candle], n: usize) -> Option<&[Candle]> {
    if window.len() < n {
        return None;
    }
    let slice = &window[window.len() - n..];
    slice.iter().all(has_range).then_some(slice)
}

/// Close of the candle before the last one relative to `PRIOR_MOVE_BARS` earlier.
fn prior_move(window: &[Candle]) -> Option<f64> {
    let n = window.len();
    if n < PRIOR_MOVE_BARS + 2 {
        return None;
    }
    Some(window[n - 2].close - window[n - 2 - PRIOR_MOVE_BARS].close)
}

fn engulf_confidence(ratio: f64) -> f64 {
    (60.0 + (ratio - 1.0) * 30.0).min(90.0)
}

pub(super) fn bullish_engulfing(window: &[Candle]) -> Option<f64> {
    let [prev, curr] = last_n(window, 2)? else {
        return None;
    };
    let engulfs = prev.is_bearish()
        && curr.is_bullish()
        && curr.open <= prev.close
        && curr.close >= prev.open
        && curr.body() > prev.body();
    engulfs.then(|| engulf_confidence(curr.body() / prev.body()))
}

pub(super) fn bearish_engulfing(window: &[Candle]) -> Option<f64> {
    let [prev, curr] = last_n(window, 2)? else {
        return None;
    };
    let engulfs = prev.is_bullish()
        && curr.is_bearish()
        && curr.open >= prev.close
        && curr.close <= prev.open
        && curr.body() > prev.body();
    engulfs.then(|| engulf_confidence(curr.body() / prev.body()))
}

/// Small body near the top, long lower shadow, after a decline.
pub(super) fn hammer(window: &[Candle]) -> Option<f64> {
    let [c] = last_n(window, 1)? else {
        return None;
    };
    let body = c.body();
    let shaped = body > 0.0
        && body <= 0.35 * c.range()
        && c.lower_shadow() >= 2.0 * body
        && c.upper_shadow() <= body;
    (shaped && prior_move(window)? < 0.0).then_some(60.0)
}

/// Small body near the bottom, long upper shadow, after a rally.
pub(super) fn shooting_star(window: &[Candle]) -> Option<f64> {
    let [c] = last_n(window, 1)? else {
        return None;
    };
    let body = c.body();
    let shaped = body > 0.0
        && body <= 0.35 * c.range()
        && c.upper_shadow() >= 2.0 * body
        && c.lower_shadow() <= body;
    (shaped && prior_move(window)? > 0.0).then_some(60.0)
}

pub(super) fn morning_star(window: &[Candle]) -> Option<f64> {
    let [first, star, last] = last_n(window, 3)? else {
        return None;
    };
    let forms = first.is_bearish()
        && first.body() >= 0.5 * first.range()
        && star.body() <= 0.3 * first.body()
        && star.body_mid() < first.close
        && last.is_bullish()
        && last.close > first.body_mid();
    forms.then_some(70.0)
}

pub(super) fn evening_star(window: &[Candle]) -> Option<f64> {
    let [first, star, last] = last_n(window, 3)? else {
        return None;
    };
    let forms = first.is_bullish()
        && first.body() >= 0.5 * first.range()
        && star.body() <= 0.3 * first.body()
        && star.body_mid() > first.close
        && last.is_bearish()
        && last.close < first.body_mid();
    forms.then_some(70.0)
}

pub(super) fn three_white_soldiers(window: &[Candle]) -> Option<f64> {
    let candles = last_n(window, 3)?;
    let strong = candles
        .iter()
        .all(|c| c.is_bullish() && c.body() >= 0.5 * c.range());
    let stepping = candles.windows(2).all(|pair| {
        let (prev, curr) = (&pair[0], &pair[1]);
        curr.close > prev.close && curr.open >= prev.open && curr.open <= prev.close
    });
    (strong && stepping).then_some(65.0)
}

pub(super) fn three_black_crows(window: &[Candle]) -> Option<f64> {
    let candles = last_n(window, 3)?;
    let strong = candles
        .iter()
        .all(|c| c.is_bearish() && c.body() >= 0.5 * c.range());
    let stepping = candles.windows(2).all(|pair| {
        let (prev, curr) = (&pair[0], &pair[1]);
        curr.close < prev.close && curr.open <= prev.open && curr.open >= prev.close
    });
    (strong && stepping).then_some(65.0)
}
