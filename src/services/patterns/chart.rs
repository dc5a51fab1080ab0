//! Chart formations built from swing pivots.
//!
//! A pivot high is a candle whose high is strictly above every other high
//! within `pivot_span` candles on both sides; pivot lows mirror that. Each
//! formation looks only at the most recent pivots, so it describes the
//! current shape of the window rather than history.

use super::PatternConfig;
use crate::types::Candle;

#[derive(Debug, Clone, Copy, PartialEq)]
pub(super) struct Pivot {
    pub index: usize,
    pub price: f64,
}

/// Swing highs and lows of a window, in chronological order.
#[derive(Debug, Clone, Default)]
pub(super) struct Pivots {
    pub highs: Vec<Pivot>,
    pub lows: Vec<Pivot>,
}

impl Pivots {
    pub fn find(window: &[Candle], span: usize) -> Self {
        let mut pivots = Pivots::default();
        if span == 0 || window.len() < 2 * span + 1 {
            return pivots;
        }

        for i in span..window.len() - span {
            let neighbours = (i - span..=i + span).filter(|&j| j != i);
            let high = window[i].high;
            let low = window[i].low;

            if neighbours.clone().all(|j| window[j].high < high) {
                pivots.highs.push(Pivot { index: i, price: high });
            }
            if neighbours.clone().all(|j| window[j].low > low) {
                pivots.lows.push(Pivot { index: i, price: low });
            }
        }

        pivots
    }

    fn last_highs<const N: usize>(&self) -> Option<[Pivot; N]> {
        last_array(&self.highs)
    }

    fn last_lows<const N: usize>(&self) -> Option<[Pivot; N]> {
        last_array(&self.lows)
    }
}

fn last_array<const N: usize>(pivots: &[Pivot]) -> Option<[Pivot; N]> {
    if pivots.len() < N {
        return None;
    }
    pivots[pivots.len() - N..].try_into().ok()
}

fn relative_diff(a: f64, b: f64) -> f64 {
    let avg = (a + b) / 2.0;
    if avg == 0.0 {
        return f64::INFINITY;
    }
    (a - b).abs() / avg.abs()
}

/// Lowest low strictly between two candle indices.
fn trough_between(window: &[Candle], from: usize, to: usize) -> Option<f64> {
    window[from + 1..to].iter().map(|c| c.low).reduce(f64::min)
}

/// Highest high strictly between two candle indices.
fn crest_between(window: &[Candle], from: usize, to: usize) -> Option<f64> {
    window[from + 1..to].iter().map(|c| c.high).reduce(f64::max)
}

fn last_close(window: &[Candle]) -> Option<f64> {
    window.last().map(|c| c.close)
}

/// Relative price change per bar between two pivots.
fn slope(a: &Pivot, b: &Pivot) -> f64 {
    if a.price == 0.0 || b.index == a.index {
        return 0.0;
    }
    (b.price - a.price) / a.price / (b.index - a.index) as f64
}

pub(super) fn double_top(window: &[Candle], pivots: &Pivots, config: &PatternConfig) -> Option<f64> {
    let [first, second] = pivots.last_highs::<2>()?;
    if relative_diff(first.price, second.price) > config.price_tolerance {
        return None;
    }
    let trough = trough_between(window, first.index, second.index)?;
    let top = (first.price + second.price) / 2.0;
    if (top - trough) / top < 2.0 * config.price_tolerance {
        return None;
    }
    Some(if last_close(window)? < trough { 85.0 } else { 65.0 })
}

pub(super) fn double_bottom(window: &[Candle], pivots: &Pivots, config: &PatternConfig) -> Option<f64> {
    let [first, second] = pivots.last_lows::<2>()?;
    if relative_diff(first.price, second.price) > config.price_tolerance {
        return None;
    }
    let crest = crest_between(window, first.index, second.index)?;
    let bottom = (first.price + second.price) / 2.0;
    if (crest - bottom) / bottom < 2.0 * config.price_tolerance {
        return None;
    }
    Some(if last_close(window)? > crest { 85.0 } else { 65.0 })
}

pub(super) fn head_and_shoulders(
    window: &[Candle],
    pivots: &Pivots,
    config: &PatternConfig,
) -> Option<f64> {
    let [left, head, right] = pivots.last_highs::<3>()?;
    let tol = config.price_tolerance;
    let head_stands_out = head.price > left.price * (1.0 + tol) && head.price > right.price * (1.0 + tol);
    if !head_stands_out || relative_diff(left.price, right.price) > 2.0 * tol {
        return None;
    }
    let neckline = (trough_between(window, left.index, head.index)?
        + trough_between(window, head.index, right.index)?)
        / 2.0;
    Some(if last_close(window)? < neckline { 90.0 } else { 70.0 })
}

pub(super) fn inverse_head_and_shoulders(
    window: &[Candle],
    pivots: &Pivots,
    config: &PatternConfig,
) -> Option<f64> {
    let [left, head, right] = pivots.last_lows::<3>()?;
    let tol = config.price_tolerance;
    let head_stands_out = head.price < left.price * (1.0 - tol) && head.price < right.price * (1.0 - tol);
    if !head_stands_out || relative_diff(left.price, right.price) > 2.0 * tol {
        return None;
    }
    let neckline = (crest_between(window, left.index, head.index)?
        + crest_between(window, head.index, right.index)?)
        / 2.0;
    Some(if last_close(window)? > neckline { 90.0 } else { 70.0 })
}

/// Slopes of the latest resistance (pivot highs) and support (pivot lows) lines.
fn triangle_lines(pivots: &Pivots) -> Option<([Pivot; 2], [Pivot; 2], f64, f64)> {
    let highs = pivots.last_highs::<2>()?;
    let lows = pivots.last_lows::<2>()?;
    let resistance = slope(&highs[0], &highs[1]);
    let support = slope(&lows[0], &lows[1]);
    Some((highs, lows, resistance, support))
}

pub(super) fn ascending_triangle(
    window: &[Candle],
    pivots: &Pivots,
    config: &PatternConfig,
) -> Option<f64> {
    let (highs, _, resistance, support) = triangle_lines(pivots)?;
    let flat = config.flat_slope_tolerance;
    if resistance.abs() > flat || support <= flat {
        return None;
    }
    let level = highs[0].price.max(highs[1].price);
    Some(if last_close(window)? > level { 80.0 } else { 60.0 })
}

pub(super) fn descending_triangle(
    window: &[Candle],
    pivots: &Pivots,
    config: &PatternConfig,
) -> Option<f64> {
    let (_, lows, resistance, support) = triangle_lines(pivots)?;
    let flat = config.flat_slope_tolerance;
    if support.abs() > flat || resistance >= -flat {
        return None;
    }
    let level = lows[0].price.min(lows[1].price);
    Some(if last_close(window)? < level { 80.0 } else { 60.0 })
}

pub(super) fn symmetrical_triangle(
    window: &[Candle],
    pivots: &Pivots,
    config: &PatternConfig,
) -> Option<f64> {
    let (highs, lows, resistance, support) = triangle_lines(pivots)?;
    let flat = config.flat_slope_tolerance;
    if resistance >= -flat || support <= flat {
        return None;
    }
    let close = last_close(window)?;
    let broke_out = close > highs[1].price || close < lows[1].price;
    Some(if broke_out { 75.0 } else { 60.0 })
}
