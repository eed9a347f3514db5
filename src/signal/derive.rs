//! Metric derivation from raw level series.
//!
//! All functions are index-based: position `i - 12` is "a year ago" regardless
//! of the calendar dates behind it. Every function returns `None` instead of
//! panicking or producing `NaN`/`Infinity`.

use crate::serde_utils::round2;

/// Periods in a year for monthly data.
const YEAR_LAG: usize = 12;
/// Short-horizon momentum lag.
const MOMENTUM_LAG: usize = 3;

fn finite_at(series: &[f64], i: usize) -> Option<f64> {
    series.get(i).copied().filter(|v| v.is_finite())
}

/// Year-over-year percent change at index `i`, rounded to 2 decimals.
///
/// `None` when `i < 12`, either endpoint is missing or non-finite, or the
/// prior value is exactly zero.
pub fn yoy(series: &[f64], i: usize) -> Option<f64> {
    if i < YEAR_LAG {
        return None;
    }
    let current = finite_at(series, i)?;
    let prior = finite_at(series, i - YEAR_LAG)?;
    if prior == 0.0 {
        return None;
    }
    let change = round2((current - prior) / prior * 100.0);
    change.is_finite().then_some(change)
}

/// YoY at the last index. Needs at least 13 points.
pub fn latest_yoy(series: &[f64]) -> Option<f64> {
    yoy(series, series.len().checked_sub(1)?)
}

/// YoY for every index of the series.
pub fn yoy_series(series: &[f64]) -> Vec<Option<f64>> {
    (0..series.len()).map(|i| yoy(series, i)).collect()
}

/// Latest value minus the value three points back.
pub fn momentum_simple(series: &[f64]) -> Option<f64> {
    if series.len() < MOMENTUM_LAG + 1 {
        return None;
    }
    let last = series.len() - 1;
    let latest = finite_at(series, last)?;
    let prior = finite_at(series, last - MOMENTUM_LAG)?;
    let diff = latest - prior;
    diff.is_finite().then_some(diff)
}

/// Three-month change compounded to an annual rate, rounded to 2 decimals.
///
/// `((current / prior_3)^4 - 1) * 100`; `None` when `i < 3`, on non-finite
/// endpoints, or when `prior_3 == 0`.
pub fn momentum_annualized(series: &[f64], i: usize) -> Option<f64> {
    if i < MOMENTUM_LAG {
        return None;
    }
    let current = finite_at(series, i)?;
    let prior = finite_at(series, i - MOMENTUM_LAG)?;
    if prior == 0.0 {
        return None;
    }
    let annualized = round2(((current / prior).powi(4) - 1.0) * 100.0);
    annualized.is_finite().then_some(annualized)
}

/// Trailing `n` values ending at index `i` (inclusive).
///
/// Left-truncated when fewer than `n` values precede `i`; never padded.
/// An index past the end is clamped to the last element.
pub fn history_window<T: Clone>(series: &[T], i: usize, n: usize) -> Vec<T> {
    if series.is_empty() || n == 0 {
        return Vec::new();
    }
    let end = i.min(series.len() - 1);
    let start = (end + 1).saturating_sub(n);
    series[start..=end].to_vec()
}

/// Trailing window ending at the last element.
pub fn latest_window<T: Clone>(series: &[T], n: usize) -> Vec<T> {
    history_window(series, series.len().saturating_sub(1), n)
}
