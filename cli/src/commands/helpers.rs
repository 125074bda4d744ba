use anyhow::{Context, Result, bail};
use chrono::{Datelike, Local, NaiveDate};
use serde::Serialize;
use std::path::Path;
use std::process;

use weightlog_core::models::{ExportFormat, UserProfile, WeightUnit};

pub(crate) fn parse_date(date_str: Option<String>) -> Result<NaiveDate> {
    match date_str {
        None => Ok(Local::now().date_naive()),
        Some(s) => match s.as_str() {
            "today" => Ok(Local::now().date_naive()),
            "yesterday" => Ok(Local::now().date_naive() - chrono::Duration::days(1)),
            _ => NaiveDate::parse_from_str(&s, "%Y-%m-%d")
                .with_context(|| format!("Invalid date '{s}'. Use YYYY-MM-DD or today/yesterday")),
        },
    }
}

/// First and last day of a `YYYY-MM` month, or of the month containing `today`.
pub(crate) fn parse_month(month: Option<&str>, today: NaiveDate) -> Result<(NaiveDate, NaiveDate)> {
    let first = match month {
        None => today.with_day(1).context("Invalid current date")?,
        Some(s) => NaiveDate::parse_from_str(&format!("{}-01", s.trim()), "%Y-%m-%d")
            .with_context(|| format!("Invalid month '{s}'. Use YYYY-MM"))?,
    };
    let next = if first.month() == 12 {
        NaiveDate::from_ymd_opt(first.year() + 1, 1, 1)
    } else {
        NaiveDate::from_ymd_opt(first.year(), first.month() + 1, 1)
    }
    .context("Month out of range")?;
    let last = next.pred_opt().context("Month out of range")?;
    Ok((first, last))
}

/// Display unit: the `--unit` flag, else the profile's preference, else jin.
pub(crate) fn resolve_unit(flag: Option<&str>, profile: Option<&UserProfile>) -> Result<WeightUnit> {
    if let Some(s) = flag {
        return s.parse();
    }
    Ok(profile.map(|p| p.weight_unit).unwrap_or_default())
}

/// `--format` if given, else the file extension.
pub(crate) fn resolve_format(format: Option<&str>, path: &Path) -> Result<ExportFormat> {
    match format {
        Some(f) => f.parse(),
        None => ExportFormat::from_path(path)
            .context("Pass --format json or --format csv"),
    }
}

/// Signed change in the display unit, e.g. `"+0.5"` or `"-1.0"`.
pub(crate) fn format_change(delta_kg: f64, unit: WeightUnit) -> String {
    let value = no_neg_zero((unit.to_display(delta_kg) * 10.0).round() / 10.0);
    if value > 0.0 {
        format!("+{value:.1}")
    } else {
        format!("{value:.1}")
    }
}

pub(crate) fn format_percent(percent: f64) -> String {
    let value = no_neg_zero((percent * 100.0).round() / 100.0);
    if value > 0.0 {
        format!("+{value:.2}%")
    } else {
        format!("{value:.2}%")
    }
}

/// Print an empty-state message and exit with status 2.
pub(crate) fn exit_no_data(message: &str, json: bool) -> ! {
    if json {
        println!("{}", json_error(message));
    } else {
        eprintln!("{message}");
    }
    process::exit(2);
}

pub(crate) fn require_positive_days(days: Option<u32>) -> Result<Option<u32>> {
    if days == Some(0) {
        bail!("--days must be at least 1");
    }
    Ok(days)
}

pub(crate) fn json_error(message: &str) -> String {
    #[derive(Serialize)]
    struct CliError<'a> {
        error: &'a str,
    }
    serde_json::to_string(&CliError { error: message })
        .unwrap_or_else(|_| format!("{{\"error\":\"{message}\"}}"))
}

pub(crate) fn no_neg_zero(v: f64) -> f64 {
    if v == 0.0 { 0.0 } else { v }
}

pub(crate) fn truncate(s: &str, max: usize) -> String {
    if s.chars().count() <= max {
        s.to_string()
    } else {
        let end = s.char_indices().nth(max - 3).map_or(s.len(), |(i, _)| i);
        format!("{}...", &s[..end])
    }
}
