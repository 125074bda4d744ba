//! Statistics over an unordered slice of weight records.
//!
//! Everything here is a pure function of its inputs. "Today" is always passed
//! in so results do not depend on the wall clock.

use std::collections::BTreeMap;

use chrono::{Duration, NaiveDate};
use serde::Serialize;

use crate::metrics::{BmiCategory, calculate_bmi};
use crate::models::{UserProfile, WeightRecord, WeightUnit};

/// Records in ascending date order. Records sharing a date keep their input order.
#[must_use]
pub fn sort_chronological(records: &[WeightRecord]) -> Vec<&WeightRecord> {
    let mut sorted: Vec<&WeightRecord> = records.iter().collect();
    // sort_by_key is stable
    sorted.sort_by_key(|r| r.date);
    sorted
}

/// First day still inside a trailing window of `days` days ending `today`.
#[must_use]
pub fn window_start(days: u32, today: NaiveDate) -> NaiveDate {
    today
        .checked_sub_signed(Duration::days(i64::from(days)))
        .unwrap_or(NaiveDate::MIN)
}

/// Keep records dated on or after `today - days`. `None` keeps everything.
#[must_use]
pub fn filter_by_window(
    records: &[WeightRecord],
    days: Option<u32>,
    today: NaiveDate,
) -> Vec<&WeightRecord> {
    match days {
        None => records.iter().collect(),
        Some(n) => {
            let cutoff = window_start(n, today);
            records.iter().filter(|r| r.date >= cutoff).collect()
        }
    }
}

/// `(current - previous) / previous` as a percentage, 0 when `previous` is 0.
#[must_use]
pub fn percent_change(current: f64, previous: f64) -> f64 {
    if previous == 0.0 {
        0.0
    } else {
        (current - previous) / previous * 100.0
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RecordStats {
    pub current: f64,
    pub start: f64,
    pub change: f64,
    pub change_percent: f64,
    pub average: f64,
    pub min: f64,
    pub max: f64,
    pub count: usize,
    pub first_date: NaiveDate,
    pub last_date: NaiveDate,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bmi: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bmi_category: Option<BmiCategory>,
}

/// Aggregate statistics over the records inside the window.
///
/// Returns `None` when the window holds no records; that is an empty state to
/// render, not an error. BMI is attached for the current weight when a
/// profile is supplied.
#[must_use]
#[allow(clippy::cast_precision_loss)]
pub fn summarize(
    records: &[WeightRecord],
    days: Option<u32>,
    today: NaiveDate,
    profile: Option<&UserProfile>,
) -> Option<RecordStats> {
    let mut filtered = filter_by_window(records, days, today);
    filtered.sort_by_key(|r| r.date);

    let first = *filtered.first()?;
    let last = *filtered.last()?;

    let weights: Vec<f64> = filtered.iter().map(|r| r.weight).collect();
    let count = weights.len();
    let average = weights.iter().sum::<f64>() / count as f64;
    let min = weights.iter().copied().fold(f64::INFINITY, f64::min);
    let max = weights.iter().copied().fold(f64::NEG_INFINITY, f64::max);

    let current = last.weight;
    let start = first.weight;
    let bmi = profile.map(|p| calculate_bmi(current, p.height));

    Some(RecordStats {
        current,
        start,
        change: current - start,
        change_percent: percent_change(current, start),
        average,
        min,
        max,
        count,
        first_date: first.date,
        last_date: last.date,
        bmi,
        bmi_category: bmi.map(BmiCategory::from_bmi),
    })
}

/// A record annotated with its change from the chronologically previous record.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DayDelta {
    pub record: WeightRecord,
    pub change: f64,
    pub change_percent: f64,
}

/// Day-over-day changes keyed by date, over the full record set.
///
/// Each record is compared with the one before it in chronological order, so
/// two records on the same date are both used as predecessors. The map holds
/// one entry per date: when dates collide the later record in sort order
/// replaces the earlier one.
#[must_use]
pub fn calendar_deltas(records: &[WeightRecord]) -> BTreeMap<NaiveDate, DayDelta> {
    let sorted = sort_chronological(records);
    let mut cells = BTreeMap::new();

    for (i, record) in sorted.iter().enumerate() {
        let (change, change_percent) = match i.checked_sub(1).map(|p| sorted[p]) {
            Some(prev) => (
                record.weight - prev.weight,
                percent_change(record.weight, prev.weight),
            ),
            None => (0.0, 0.0),
        };
        cells.insert(
            record.date,
            DayDelta {
                record: (*record).clone(),
                change,
                change_percent,
            },
        );
    }

    cells
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TrendPoint {
    pub date: NaiveDate,
    /// In the requested display unit.
    pub weight: f64,
}

/// Chronological points inside the window, converted for display.
#[must_use]
pub fn trend_series(
    records: &[WeightRecord],
    days: Option<u32>,
    today: NaiveDate,
    unit: WeightUnit,
) -> Vec<TrendPoint> {
    let mut filtered = filter_by_window(records, days, today);
    filtered.sort_by_key(|r| r.date);
    filtered
        .into_iter()
        .map(|r| TrendPoint {
            date: r.date,
            weight: unit.to_display(r.weight),
        })
        .collect()
}
