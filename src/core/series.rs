//! Cleaned per-instrument price series and the business-day calendar.

use chrono::{Datelike, Days, NaiveDate, Weekday};
use std::collections::BTreeMap;

/// One instrument's daily close prices, sorted by date with gaps dropped.
///
/// Every date present holds an actual observation; dates where the provider
/// returned nothing simply do not appear.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CloseSeries {
    points: BTreeMap<NaiveDate, f64>,
}

impl CloseSeries {
    pub fn new() -> Self {
        Self {
            points: BTreeMap::new(),
        }
    }

    /// Builds a series from raw dated rows, dropping rows without a price.
    /// Duplicate dates keep the last row seen.
    pub fn from_rows<I>(rows: I) -> Self
    where
        I: IntoIterator<Item = (NaiveDate, Option<f64>)>,
    {
        let points = rows
            .into_iter()
            .filter_map(|(date, price)| price.map(|p| (date, p)))
            .collect();
        Self { points }
    }

    pub fn insert(&mut self, date: NaiveDate, price: f64) {
        self.points.insert(date, price);
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn first_date(&self) -> Option<NaiveDate> {
        self.points.keys().next().copied()
    }

    pub fn last_date(&self) -> Option<NaiveDate> {
        self.points.keys().next_back().copied()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&NaiveDate, &f64)> {
        self.points.iter()
    }

    /// Keeps only the most recent `count` observations.
    pub fn truncate_to_last(&mut self, count: usize) {
        while self.points.len() > count {
            self.points.pop_first();
        }
    }
}

pub fn is_business_day(date: NaiveDate) -> bool {
    !matches!(date.weekday(), Weekday::Sat | Weekday::Sun)
}

/// All weekdays from `start` to `end`, inclusive.
pub fn business_days(start: NaiveDate, end: NaiveDate) -> Vec<NaiveDate> {
    let mut days = Vec::new();
    let mut day = start;
    while day <= end {
        if is_business_day(day) {
            days.push(day);
        }
        match day.checked_add_days(Days::new(1)) {
            Some(next) => day = next,
            None => break,
        }
    }
    days
}
