use anyhow::Result;
use chrono::{Datelike, Local, NaiveDate};
use tabled::{
    Table, Tabled,
    settings::{Alignment, Modify, Style, object::Columns},
};

use weightlog_core::analytics::{DayDelta, calendar_deltas};
use weightlog_core::db::Database;
use weightlog_core::models::{WeightRecord, WeightUnit};

use super::helpers::{exit_no_data, format_change, format_percent, parse_month};

/// Day cells between `first` and `last`, inclusive.
pub(crate) fn month_cells(
    records: &[WeightRecord],
    first: NaiveDate,
    last: NaiveDate,
) -> Vec<DayDelta> {
    calendar_deltas(records)
        .range(first..=last)
        .map(|(_, cell)| cell.clone())
        .collect()
}

/// A Monday-first grid of day numbers; days with a record are starred.
pub(crate) fn render_grid(first: NaiveDate, last: NaiveDate, cells: &[DayDelta]) -> String {
    let mut out = String::from(" Mo  Tu  We  Th  Fr  Sa  Su\n");
    let offset = first.weekday().num_days_from_monday() as usize;
    out.push_str(&"    ".repeat(offset));

    let mut col = offset;
    for day in first.iter_days().take_while(|d| *d <= last) {
        let marker = if cells.iter().any(|c| c.record.date == day) {
            '*'
        } else {
            ' '
        };
        out.push_str(&format!("{:>3}{marker}", day.day()));
        col += 1;
        if col == 7 {
            out.truncate(out.trim_end().len());
            out.push('\n');
            col = 0;
        }
    }
    out.truncate(out.trim_end().len());
    out
}

pub(crate) fn cmd_calendar(
    db: &Database,
    unit: WeightUnit,
    month: Option<&str>,
    json: bool,
) -> Result<()> {
    let (first, last) = parse_month(month, Local::now().date_naive())?;
    let records = db.list_records()?;
    let cells = month_cells(&records, first, last);

    if json {
        println!("{}", serde_json::to_string_pretty(&cells)?);
        return Ok(());
    }
    if cells.is_empty() {
        exit_no_data(&format!("No records in {}", first.format("%Y-%m")), json);
    }

    println!("=== {} ===\n", first.format("%B %Y"));
    println!("{}\n", render_grid(first, last, &cells));

    #[derive(Tabled)]
    struct DayRow {
        #[tabled(rename = "Date")]
        date: String,
        #[tabled(rename = "Day")]
        weekday: String,
        #[tabled(rename = "Weight")]
        weight: String,
        #[tabled(rename = "Change")]
        change: String,
        #[tabled(rename = "Change %")]
        percent: String,
    }

    let rows: Vec<DayRow> = cells
        .iter()
        .map(|c| DayRow {
            date: c.record.date.format("%Y-%m-%d").to_string(),
            weekday: c.record.date.format("%a").to_string(),
            weight: unit.format(c.record.weight),
            change: format_change(c.change, unit),
            percent: format_percent(c.change_percent),
        })
        .collect();

    let table = Table::new(&rows)
        .with(Style::rounded())
        .with(Modify::new(Columns::new(2..5)).with(Alignment::right()))
        .to_string();
    println!("Weights in {}", unit.label());
    println!("{table}");

    Ok(())
}
