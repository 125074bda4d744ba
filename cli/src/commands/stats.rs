use anyhow::Result;
use chrono::Local;
use tabled::{
    Table, Tabled,
    settings::{Alignment, Modify, Style, object::Columns},
};

use weightlog_core::analytics::{TrendPoint, summarize, trend_series};
use weightlog_core::db::Database;
use weightlog_core::models::WeightUnit;

use super::helpers::{exit_no_data, format_change, format_percent, require_positive_days};

const BAR_WIDTH: f64 = 30.0;

pub(crate) fn cmd_stats(
    db: &Database,
    unit: WeightUnit,
    days: Option<u32>,
    json: bool,
) -> Result<()> {
    let days = require_positive_days(days)?;
    let records = db.list_records()?;
    let profile = db.get_profile()?;
    let today = Local::now().date_naive();

    let Some(stats) = summarize(&records, days, today, profile.as_ref()) else {
        exit_no_data("No records in this period", json);
    };

    if json {
        println!("{}", serde_json::to_string_pretty(&stats)?);
        return Ok(());
    }

    let heading = days.map_or_else(|| "All time".to_string(), |n| format!("Last {n} days"));
    println!("=== {heading} ===\n");
    println!("  Current:  {}", unit.format_with_label(stats.current));
    println!("  Start:    {}", unit.format_with_label(stats.start));
    println!(
        "  Change:   {} {} ({})",
        format_change(stats.change, unit),
        unit.label(),
        format_percent(stats.change_percent)
    );
    println!("  Average:  {}", unit.format_with_label(stats.average));
    println!("  Lowest:   {}", unit.format_with_label(stats.min));
    println!("  Highest:  {}", unit.format_with_label(stats.max));
    println!(
        "  Records:  {} ({} to {})",
        stats.count,
        stats.first_date.format("%Y-%m-%d"),
        stats.last_date.format("%Y-%m-%d")
    );
    if let (Some(bmi), Some(category)) = (stats.bmi, stats.bmi_category) {
        println!("  BMI:      {bmi:.1} ({category})");
    }

    Ok(())
}

/// Bar length for each point, scaled between the lowest and highest weight.
#[allow(clippy::cast_sign_loss)]
pub(crate) fn bar_lengths(points: &[TrendPoint]) -> Vec<usize> {
    let min = points.iter().map(|p| p.weight).fold(f64::INFINITY, f64::min);
    let max = points
        .iter()
        .map(|p| p.weight)
        .fold(f64::NEG_INFINITY, f64::max);
    let span = max - min;

    points
        .iter()
        .map(|p| {
            if span > 0.0 {
                1 + ((p.weight - min) / span * (BAR_WIDTH - 1.0)).round() as usize
            } else {
                1
            }
        })
        .collect()
}

pub(crate) fn cmd_trend(db: &Database, unit: WeightUnit, days: u32, json: bool) -> Result<()> {
    require_positive_days(Some(days))?;
    let records = db.list_records()?;
    let points = trend_series(&records, Some(days), Local::now().date_naive(), unit);

    if json {
        println!("{}", serde_json::to_string_pretty(&points)?);
        return Ok(());
    }
    if points.is_empty() {
        exit_no_data(&format!("No records in the last {days} days"), json);
    }

    #[derive(Tabled)]
    struct TrendRow {
        #[tabled(rename = "Date")]
        date: String,
        #[tabled(rename = "Weight")]
        weight: String,
        #[tabled(rename = "")]
        bar: String,
    }

    let rows: Vec<TrendRow> = points
        .iter()
        .zip(bar_lengths(&points))
        .map(|(p, len)| TrendRow {
            date: p.date.format("%Y-%m-%d").to_string(),
            weight: format!("{:.1}", p.weight),
            bar: "█".repeat(len),
        })
        .collect();

    let table = Table::new(&rows)
        .with(Style::rounded())
        .with(Modify::new(Columns::single(1)).with(Alignment::right()))
        .to_string();
    println!("Weights in {}", unit.label());
    println!("{table}");

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn point(d: &str, weight: f64) -> TrendPoint {
        TrendPoint {
            date: NaiveDate::parse_from_str(d, "%Y-%m-%d").unwrap(),
            weight,
        }
    }

    #[test]
    fn test_bar_lengths_scale() {
        let points = vec![
            point("2024-01-01", 140.0),
            point("2024-01-02", 142.0),
            point("2024-01-03", 141.0),
        ];
        assert_eq!(bar_lengths(&points), vec![1, 30, 16]);
    }

    #[test]
    fn test_bar_lengths_flat() {
        let points = vec![point("2024-01-01", 140.0), point("2024-01-02", 140.0)];
        assert_eq!(bar_lengths(&points), vec![1, 1]);
        assert!(bar_lengths(&[]).is_empty());
    }
}
