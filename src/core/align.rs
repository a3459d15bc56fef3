//! Alignment of per-instrument series onto one shared business-day calendar.

use chrono::NaiveDate;
use std::collections::{BTreeMap, HashMap};
use tracing::debug;

use crate::core::series::{CloseSeries, business_days};

/// A date-indexed price table with one column per instrument.
///
/// The calendar spans the earliest to latest observation across all columns.
/// Within a column, every date between that instrument's first and last
/// observation carries a price (forward-filled across gaps); dates before the
/// first or after the last observation stay unset. A last price is never
/// carried past the instrument's final observation.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AlignedMatrix {
    calendar: Vec<NaiveDate>,
    columns: BTreeMap<String, Vec<Option<f64>>>,
}

impl AlignedMatrix {
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }

    pub fn calendar(&self) -> &[NaiveDate] {
        &self.calendar
    }

    pub fn symbols(&self) -> impl Iterator<Item = &str> {
        self.columns.keys().map(String::as_str)
    }

    pub fn column(&self, symbol: &str) -> Option<&[Option<f64>]> {
        self.columns.get(symbol).map(Vec::as_slice)
    }

    /// The column's set cells as dated points, in calendar order.
    pub fn valid_points(&self, symbol: &str) -> Vec<(NaiveDate, f64)> {
        match self.columns.get(symbol) {
            Some(column) => self
                .calendar
                .iter()
                .zip(column)
                .filter_map(|(date, cell)| cell.map(|price| (*date, price)))
                .collect(),
            None => Vec::new(),
        }
    }

    pub fn first_valid_date(&self, symbol: &str) -> Option<NaiveDate> {
        let column = self.columns.get(symbol)?;
        self.calendar
            .iter()
            .zip(column)
            .find_map(|(date, cell)| cell.map(|_| *date))
    }
}

/// Merges canonical series into one [`AlignedMatrix`].
///
/// Returns the explicitly empty matrix when no series holds any data; callers
/// treat that as "nothing to summarize", not as an error.
pub fn align(series: &HashMap<String, CloseSeries>) -> AlignedMatrix {
    let populated: Vec<(&String, &CloseSeries)> = series
        .iter()
        .filter(|(_, s)| !s.is_empty())
        .map(|(symbol, s)| (symbol, s))
        .collect();

    let start = populated.iter().filter_map(|(_, s)| s.first_date()).min();
    let end = populated.iter().filter_map(|(_, s)| s.last_date()).max();
    let (Some(start), Some(end)) = (start, end) else {
        debug!("No instrument returned data; producing empty matrix");
        return AlignedMatrix::empty();
    };

    let calendar = business_days(start, end);
    let mut columns = BTreeMap::new();

    for (symbol, series) in populated {
        let (Some(first), Some(last)) = (series.first_date(), series.last_date()) else {
            continue;
        };

        let mut column = Vec::with_capacity(calendar.len());
        let mut observations = series.iter().peekable();
        let mut carried: Option<f64> = None;

        for day in &calendar {
            while let Some((date, price)) = observations.peek() {
                if **date <= *day {
                    carried = Some(**price);
                    observations.next();
                } else {
                    break;
                }
            }
            // Unset outside [first, last]: no opinion before the instrument
            // existed, and no fabricated values past its final observation.
            if *day < first || *day > last {
                column.push(None);
            } else {
                column.push(carried);
            }
        }

        columns.insert(symbol.clone(), column);
    }

    AlignedMatrix { calendar, columns }
}
