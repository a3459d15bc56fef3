//! Point metrics and series normalization for aligned instrument columns.
//!
//! All functions operate on an instrument's valid (non-missing) dated values
//! and report unavailable figures as `None` rather than fabricating zeros.
//! Rounding happens at presentation-row construction, not here.

use chrono::NaiveDate;

/// Most recent valid value.
pub fn last_price(points: &[(NaiveDate, f64)]) -> Option<f64> {
    points.last().map(|(_, price)| *price)
}

/// First-to-last percent change over the valid values in the window.
///
/// Requires at least two valid points and a non-zero starting value.
pub fn percent_change(points: &[(NaiveDate, f64)]) -> Option<f64> {
    if points.len() < 2 {
        return None;
    }
    let (_, first) = points.first()?;
    let (_, last) = points.last()?;
    if *first == 0.0 {
        return None;
    }
    Some((last - first) / first * 100.0)
}

/// Average of the last `window` day-over-day percent changes.
///
/// Consecutive valid pairs only; fewer than `window` available returns are
/// averaged as-is. `None` with fewer than two valid points.
pub fn average_daily_return(points: &[(NaiveDate, f64)], window: usize) -> Option<f64> {
    if window == 0 {
        return None;
    }
    let returns: Vec<f64> = points
        .windows(2)
        .filter(|pair| pair[0].1 != 0.0)
        .map(|pair| (pair[1].1 - pair[0].1) / pair[0].1 * 100.0)
        .collect();
    if returns.is_empty() {
        return None;
    }
    let tail = &returns[returns.len().saturating_sub(window)..];
    Some(tail.iter().sum::<f64>() / tail.len() as f64)
}

/// Rebases a series so its first valid value becomes 100.
///
/// Instruments with wildly different native scales (an index at 30,000, an FX
/// rate at 1.1) become directly comparable. Empty input, or a first value of
/// zero, yields an empty series.
pub fn rebase(points: &[(NaiveDate, f64)]) -> Vec<(NaiveDate, f64)> {
    let Some((_, first)) = points.first() else {
        return Vec::new();
    };
    if *first == 0.0 {
        return Vec::new();
    }
    points
        .iter()
        .map(|(date, price)| (*date, price / first * 100.0))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 1, d).unwrap()
    }

    fn points(values: &[f64]) -> Vec<(NaiveDate, f64)> {
        values
            .iter()
            .enumerate()
            .map(|(i, v)| (date(i as u32 + 1), *v))
            .collect()
    }

    #[test]
    fn test_last_price() {
        assert_eq!(last_price(&points(&[100.0, 110.0])), Some(110.0));
        assert_eq!(last_price(&[]), None);
    }

    #[test]
    fn test_percent_change() {
        let change = percent_change(&points(&[100.0, 105.0, 110.0])).unwrap();
        assert!((change - 10.0).abs() < 1e-9);
    }

    #[test]
    fn test_percent_change_requires_two_points() {
        assert_eq!(percent_change(&points(&[100.0])), None);
        assert_eq!(percent_change(&[]), None);
    }

    #[test]
    fn test_percent_change_zero_base_is_absent() {
        assert_eq!(percent_change(&points(&[0.0, 10.0])), None);
    }

    #[test]
    fn test_average_daily_return_full_window() {
        // +10% then -10%: mean of the two daily returns.
        let avg = average_daily_return(&points(&[100.0, 110.0, 99.0]), 30).unwrap();
        assert!((avg - 0.0).abs() < 1e-9);
    }

    #[test]
    fn test_average_daily_return_takes_last_window_returns() {
        // Returns: +100%, +1%, +1%; window of 2 ignores the first spike.
        let avg = average_daily_return(&points(&[50.0, 100.0, 101.0, 102.01]), 2).unwrap();
        assert!((avg - 1.0).abs() < 1e-9);
    }

    #[test]
    fn test_average_daily_return_insufficient_history() {
        assert_eq!(average_daily_return(&points(&[100.0]), 30), None);
        assert_eq!(average_daily_return(&[], 30), None);
    }

    #[test]
    fn test_rebase_starts_at_exactly_100() {
        let rebased = rebase(&points(&[123.45, 130.0, 120.0]));
        assert!((rebased[0].1 - 100.0).abs() < 1e-9);
        assert_eq!(rebased.len(), 3);
    }

    #[test]
    fn test_rebase_preserves_relative_moves() {
        let rebased = rebase(&points(&[200.0, 220.0]));
        assert!((rebased[1].1 - 110.0).abs() < 1e-9);
    }

    #[test]
    fn test_rebase_degenerate_inputs() {
        assert!(rebase(&[]).is_empty());
        assert!(rebase(&points(&[0.0, 10.0])).is_empty());
    }
}
