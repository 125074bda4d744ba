//! Progress toward a target weight.

use chrono::{NaiveDate, NaiveDateTime, NaiveTime};
use serde::Serialize;

use crate::analytics::sort_chronological;
use crate::models::{Goal, WeightRecord};

/// Within this many kilograms of the target the goal counts as reached.
pub const ACHIEVEMENT_TOLERANCE_KG: f64 = 0.5;

/// How many trailing records feed the trend estimate.
pub const TREND_WINDOW: usize = 7;

const SECONDS_PER_DAY: f64 = 86_400.0;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GoalProgress {
    pub start_date: NaiveDate,
    pub start_weight: f64,
    pub current_weight: f64,
    pub target_weight: f64,
    /// `start - target`; positive when the goal is to lose weight.
    pub total_to_lose: f64,
    /// `start - current`; positive after losing weight.
    pub weight_lost: f64,
    /// `current - target`; positive while still above the target.
    pub remaining_weight: f64,
    /// Share of the way from start to target, clamped to `0..=100`.
    pub progress_percent: f64,
    /// Days until the target at the recent rate. Negative means the trend
    /// points away from the target. `None` when the trend is flat or there
    /// is too little history.
    pub estimated_days: Option<i64>,
    pub is_achieved: bool,
    pub days_since_start: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub days_to_target_date: Option<i64>,
    #[serde(skip)]
    target_date: Option<NaiveDate>,
    #[serde(skip)]
    today: NaiveDate,
}

impl GoalProgress {
    /// The goal has a target date that is already behind us and it was not reached.
    #[must_use]
    pub fn is_overdue(&self) -> bool {
        !self.is_achieved && self.target_date.is_some_and(|d| d < self.today)
    }
}

/// Compute progress for `goal` over the whole record history.
///
/// Returns `None` without records, or for a cleared goal.
#[must_use]
pub fn goal_progress(
    goal: &Goal,
    records: &[WeightRecord],
    now: NaiveDateTime,
) -> Option<GoalProgress> {
    if goal.is_cleared() {
        return None;
    }
    let sorted = sort_chronological(records);
    let first = *sorted.first()?;
    let latest = *sorted.last()?;

    let start = first.weight;
    let current = latest.weight;
    let target = goal.target_weight;

    let total_change = target - start;
    let current_change = current - start;
    let raw_percent = if total_change == 0.0 {
        0.0
    } else {
        current_change / total_change * 100.0
    };

    Some(GoalProgress {
        start_date: first.date,
        start_weight: start,
        current_weight: current,
        target_weight: target,
        total_to_lose: start - target,
        weight_lost: start - current,
        remaining_weight: current - target,
        progress_percent: raw_percent.clamp(0.0, 100.0),
        estimated_days: estimate_days(&sorted, target),
        is_achieved: (current - target).abs() <= ACHIEVEMENT_TOLERANCE_KG,
        days_since_start: ceil_days_between(start_of_day(first.date), now),
        days_to_target_date: goal
            .target_date
            .map(|d| ceil_days_between(now, start_of_day(d))),
        target_date: goal.target_date,
        today: now.date(),
    })
}

/// Days to reach `target` from the last record at the recent weekly rate.
///
/// The rate is the change across the last [`TREND_WINDOW`] records divided by
/// 7, however many days those records actually span. Sparse histories
/// therefore give a rough figure.
#[must_use]
pub fn estimate_days(sorted: &[&WeightRecord], target: f64) -> Option<i64> {
    let window = &sorted[sorted.len().saturating_sub(TREND_WINDOW)..];
    if window.len() < 2 {
        return None;
    }
    let first = window.first()?;
    let last = window.last()?;

    let avg_daily_change = (last.weight - first.weight) / 7.0;
    if avg_daily_change == 0.0 {
        return None;
    }
    let remaining = target - last.weight;
    Some((remaining / avg_daily_change).ceil() as i64)
}

fn start_of_day(date: NaiveDate) -> NaiveDateTime {
    date.and_time(NaiveTime::MIN)
}

/// Whole days from `from` to `to`, rounded up. Negative when `to` is earlier.
#[allow(clippy::cast_precision_loss)]
fn ceil_days_between(from: NaiveDateTime, to: NaiveDateTime) -> i64 {
    let seconds = (to - from).num_seconds() as f64;
    (seconds / SECONDS_PER_DAY).ceil() as i64
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn date(s: &str) -> NaiveDate {
        NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap()
    }

    fn at(s: &str, hour: u32) -> NaiveDateTime {
        date(s).and_hms_opt(hour, 0, 0).unwrap()
    }

    fn record(d: &str, weight: f64) -> WeightRecord {
        WeightRecord {
            id: format!("{d}-{weight}"),
            date: date(d),
            weight,
            note: None,
            created_at: String::new(),
        }
    }

    fn goal(target: f64) -> Goal {
        Goal {
            target_weight: target,
            target_date: None,
            created_at: String::new(),
        }
    }

    #[test]
    fn test_no_records_is_none() {
        assert!(goal_progress(&goal(70.0), &[], at("2024-01-10", 12)).is_none());
    }

    #[test]
    fn test_cleared_goal_is_none() {
        let records = vec![record("2024-01-01", 80.0)];
        assert!(goal_progress(&Goal::cleared(), &records, at("2024-01-10", 12)).is_none());
    }

    #[test]
    fn test_basic_progress() {
        let records = vec![record("2024-01-10", 76.0), record("2024-01-01", 80.0)];
        let p = goal_progress(&goal(70.0), &records, at("2024-01-10", 12)).unwrap();

        assert!((p.progress_percent - 40.0).abs() < 1e-9);
        assert!(!p.is_achieved);
        assert!((p.remaining_weight - 6.0).abs() < 1e-9);
        assert!((p.start_weight - 80.0).abs() < f64::EPSILON);
        assert!((p.current_weight - 76.0).abs() < f64::EPSILON);
        assert!((p.total_to_lose - 10.0).abs() < f64::EPSILON);
        assert!((p.weight_lost - 4.0).abs() < f64::EPSILON);
        assert_eq!(p.start_date, date("2024-01-01"));
    }

    #[test]
    fn test_progress_clamped_low_when_moving_away() {
        let records = vec![record("2024-01-01", 80.0), record("2024-01-05", 82.0)];
        let p = goal_progress(&goal(70.0), &records, at("2024-01-05", 0)).unwrap();
        assert!(p.progress_percent.abs() < f64::EPSILON);
        assert!(p.weight_lost < 0.0);
    }

    #[test]
    fn test_progress_clamped_high_when_overshooting() {
        let records = vec![record("2024-01-01", 80.0), record("2024-02-01", 68.0)];
        let p = goal_progress(&goal(70.0), &records, at("2024-02-01", 0)).unwrap();
        assert!((p.progress_percent - 100.0).abs() < f64::EPSILON);
        assert!(p.remaining_weight < 0.0);
    }

    #[test]
    fn test_zero_total_change() {
        let records = vec![record("2024-01-01", 70.0), record("2024-01-02", 71.0)];
        let p = goal_progress(&goal(70.0), &records, at("2024-01-02", 0)).unwrap();
        assert!(p.progress_percent.abs() < f64::EPSILON);
    }

    #[test]
    fn test_gaining_goal_signs() {
        let records = vec![record("2024-01-01", 50.0), record("2024-01-08", 52.0)];
        let p = goal_progress(&goal(55.0), &records, at("2024-01-08", 0)).unwrap();
        assert!((p.progress_percent - 40.0).abs() < 1e-9);
        assert!((p.total_to_lose - -5.0).abs() < f64::EPSILON);
        assert!((p.weight_lost - -2.0).abs() < f64::EPSILON);
        assert!((p.remaining_weight - -3.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_achievement_tolerance() {
        let now = at("2024-03-01", 0);
        let hit = vec![record("2024-01-01", 80.0), record("2024-03-01", 70.4)];
        assert!(goal_progress(&goal(70.0), &hit, now).unwrap().is_achieved);

        let exact = vec![record("2024-01-01", 80.0), record("2024-03-01", 70.5)];
        assert!(goal_progress(&goal(70.0), &exact, now).unwrap().is_achieved);

        let miss = vec![record("2024-01-01", 80.0), record("2024-03-01", 70.6)];
        assert!(!goal_progress(&goal(70.0), &miss, now).unwrap().is_achieved);

        let under = vec![record("2024-01-01", 80.0), record("2024-03-01", 69.6)];
        assert!(goal_progress(&goal(70.0), &under, now).unwrap().is_achieved);
    }

    #[test]
    fn test_single_record_has_no_estimate() {
        let records = vec![record("2024-01-01", 80.0)];
        let p = goal_progress(&goal(70.0), &records, at("2024-01-01", 0)).unwrap();
        assert!(p.estimated_days.is_none());
        assert!(p.progress_percent.abs() < f64::EPSILON);
    }

    #[test]
    fn test_estimate_days_from_two_records() {
        let records = vec![record("2024-01-01", 80.0), record("2024-01-02", 78.25)];
        let p = goal_progress(&goal(70.0), &records, at("2024-01-02", 0)).unwrap();
        // (78.25 - 80) / 7 = -0.25 per day; (70 - 78.25) / -0.25 = 33
        assert_eq!(p.estimated_days, Some(33));
    }

    #[test]
    fn test_estimate_days_divisor_is_fixed_for_sparse_history() {
        let records = vec![record("2024-01-01", 80.0), record("2024-01-21", 78.25)];
        let p = goal_progress(&goal(70.0), &records, at("2024-01-21", 0)).unwrap();
        assert_eq!(p.estimated_days, Some(33));
    }

    #[test]
    fn test_estimate_days_uses_last_seven_records() {
        let weights = [90.0, 90.0, 90.0, 80.0, 80.0, 80.0, 80.0, 80.0, 80.0, 78.25];
        let records: Vec<WeightRecord> = weights
            .iter()
            .enumerate()
            .map(|(i, w)| record(&format!("2024-01-{:02}", i + 1), *w))
            .collect();
        let p = goal_progress(&goal(70.0), &records, at("2024-01-10", 0)).unwrap();
        assert_eq!(p.estimated_days, Some(33));
    }

    #[test]
    fn test_estimate_days_negative_when_moving_away() {
        let records = vec![record("2024-01-01", 80.0), record("2024-01-02", 83.5)];
        let p = goal_progress(&goal(70.0), &records, at("2024-01-02", 0)).unwrap();
        // +0.5 per day while 13.5 above target
        assert_eq!(p.estimated_days, Some(-27));
    }

    #[test]
    fn test_estimate_days_flat_trend_is_none() {
        let records = vec![record("2024-01-01", 80.0), record("2024-01-02", 80.0)];
        let p = goal_progress(&goal(70.0), &records, at("2024-01-02", 0)).unwrap();
        assert!(p.estimated_days.is_none());
    }

    #[test]
    fn test_days_since_start_rounds_up() {
        let records = vec![record("2024-01-01", 80.0)];
        let p = goal_progress(&goal(70.0), &records, at("2024-01-10", 12)).unwrap();
        assert_eq!(p.days_since_start, 10);
        let p = goal_progress(&goal(70.0), &records, at("2024-01-10", 0)).unwrap();
        assert_eq!(p.days_since_start, 9);
    }

    #[test]
    fn test_target_date_countdown_and_overdue() {
        let records = vec![record("2024-01-01", 80.0), record("2024-01-10", 76.0)];
        let mut g = goal(70.0);
        g.target_date = Some(date("2024-02-01"));

        let p = goal_progress(&g, &records, at("2024-01-10", 0)).unwrap();
        assert_eq!(p.days_to_target_date, Some(22));
        assert!(!p.is_overdue());

        let p = goal_progress(&g, &records, at("2024-02-05", 0)).unwrap();
        assert_eq!(p.days_to_target_date, Some(-4));
        assert!(p.is_overdue());

        let p = goal_progress(&goal(70.0), &records, at("2024-02-05", 0)).unwrap();
        assert!(p.days_to_target_date.is_none());
        assert!(!p.is_overdue());
    }

    #[test]
    fn test_achieved_goal_is_never_overdue() {
        let records = vec![record("2024-01-01", 80.0), record("2024-03-01", 70.2)];
        let mut g = goal(70.0);
        g.target_date = Some(date("2024-02-01"));
        let p = goal_progress(&g, &records, at("2024-03-01", 0)).unwrap();
        assert!(p.is_achieved);
        assert!(!p.is_overdue());
    }

    proptest! {
        #[test]
        fn test_progress_percent_always_clamped(
            start in 20.0f64..300.0,
            latest in 20.0f64..300.0,
            target in 20.0f64..300.0,
        ) {
            let records = vec![record("2024-01-01", start), record("2024-01-02", latest)];
            let p = goal_progress(&goal(target), &records, at("2024-01-02", 0)).unwrap();
            prop_assert!((0.0..=100.0).contains(&p.progress_percent));
        }
    }
}
