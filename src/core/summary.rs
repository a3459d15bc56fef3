//! Per-category summarization of an aligned price matrix.

use chrono::NaiveDate;
use std::collections::BTreeMap;
use tracing::debug;

use crate::core::align::AlignedMatrix;
use crate::core::analytics;
use crate::core::config::{Category, Instrument};

/// Lookback for the trailing average daily return, in daily returns. Always
/// computed from a one-month fetch so the statistic stays comparable across
/// whatever display period is selected.
pub const DAILY_RETURN_WINDOW: usize = 30;

/// One instrument's presentation row. Prices and percent change carry two
/// decimals, the average daily return four; absent metrics stay `None`.
#[derive(Debug, Clone)]
pub struct InstrumentSummary {
    pub symbol: String,
    pub name: String,
    pub last_price: f64,
    pub change_pct: Option<f64>,
    pub avg_daily_return_pct: Option<f64>,
    pub normalized: Vec<(NaiveDate, f64)>,
}

/// A category's rows (configuration order) plus its normalized matrix for
/// charting, every series rebased to 100 at the common window start.
#[derive(Debug, Clone)]
pub struct CategorySummary {
    pub name: String,
    pub rows: Vec<InstrumentSummary>,
    pub normalized: BTreeMap<String, Vec<(NaiveDate, f64)>>,
}

/// Summarizes each configured category against the aligned matrix.
///
/// Instruments without data are dropped silently; categories left with no
/// instruments are omitted. `daily` is the separate one-month matrix backing
/// the average daily return column.
pub fn summarize_categories(
    categories: &[Category],
    matrix: &AlignedMatrix,
    daily: &AlignedMatrix,
) -> Vec<CategorySummary> {
    categories
        .iter()
        .filter_map(|category| summarize_category(category, matrix, daily))
        .collect()
}

fn summarize_category(
    category: &Category,
    matrix: &AlignedMatrix,
    daily: &AlignedMatrix,
) -> Option<CategorySummary> {
    let included: Vec<&Instrument> = category
        .instruments
        .iter()
        .filter(|instrument| matrix.first_valid_date(&instrument.symbol).is_some())
        .collect();

    if included.is_empty() {
        debug!(category = %category.name, "No instrument data; omitting category");
        return None;
    }

    // Trim to the earliest date where every included instrument has a value,
    // so every normalized series in the category shares one baseline date.
    let window_start = included
        .iter()
        .filter_map(|instrument| matrix.first_valid_date(&instrument.symbol))
        .max()?;

    let mut rows = Vec::with_capacity(included.len());
    let mut normalized = BTreeMap::new();

    for instrument in included {
        let points: Vec<(NaiveDate, f64)> = matrix
            .valid_points(&instrument.symbol)
            .into_iter()
            .filter(|(date, _)| *date >= window_start)
            .collect();

        let Some(last) = analytics::last_price(&points) else {
            // Possible when one instrument stopped trading before another
            // started; there is nothing to report for it in this window.
            debug!(symbol = %instrument.symbol, "No values in trimmed window; dropping row");
            continue;
        };

        let change = analytics::percent_change(&points);
        let daily_points = daily.valid_points(&instrument.symbol);
        let avg_return = analytics::average_daily_return(&daily_points, DAILY_RETURN_WINDOW);
        let rebased = analytics::rebase(&points);

        normalized.insert(instrument.symbol.clone(), rebased.clone());
        rows.push(InstrumentSummary {
            symbol: instrument.symbol.clone(),
            name: instrument.name.clone(),
            last_price: round_to(last, 2),
            change_pct: change.map(|c| round_to(c, 2)),
            avg_daily_return_pct: avg_return.map(|r| round_to(r, 4)),
            normalized: rebased,
        });
    }

    if rows.is_empty() {
        return None;
    }

    Some(CategorySummary {
        name: category.name.clone(),
        rows,
        normalized,
    })
}

/// Nested `category -> symbol -> date -> normalized value` projection for
/// JSON serialization, values rounded to two decimals.
pub fn flat_view(
    summaries: &[CategorySummary],
) -> BTreeMap<String, BTreeMap<String, BTreeMap<String, f64>>> {
    summaries
        .iter()
        .map(|summary| {
            let instruments = summary
                .normalized
                .iter()
                .map(|(symbol, series)| {
                    let dated = series
                        .iter()
                        .map(|(date, value)| {
                            (date.format("%Y-%m-%d").to_string(), round_to(*value, 2))
                        })
                        .collect();
                    (symbol.clone(), dated)
                })
                .collect();
            (summary.name.clone(), instruments)
        })
        .collect()
}

fn round_to(value: f64, places: i32) -> f64 {
    let factor = 10f64.powi(places);
    (value * factor).round() / factor
}
