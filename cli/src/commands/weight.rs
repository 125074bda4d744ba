use anyhow::{Context, Result};
use chrono::{Local, NaiveDate};
use serde::Serialize;
use tabled::{
    Table, Tabled,
    settings::{Alignment, Modify, Style, object::Columns},
};

use weightlog_core::analytics::{sort_chronological, window_start};
use weightlog_core::db::Database;
use weightlog_core::metrics::{calculate_bmi, classify_bmi};
use weightlog_core::models::{WeightRecord, WeightUnit, validate_weight};

use super::helpers::{format_change, parse_date, require_positive_days, truncate};

/// Store a weight entered in `unit`. An existing record on the same date is
/// replaced in place; the returned flag tells whether that happened.
pub(crate) fn log_weight(
    db: &Database,
    unit: WeightUnit,
    value: f64,
    date: NaiveDate,
    note: Option<String>,
) -> Result<(WeightRecord, bool)> {
    validate_weight(value, unit)?;
    let weight_kg = unit.to_canonical(value);
    let note = note.filter(|n| !n.trim().is_empty());

    let (record, replaced) = match db.find_records_by_date(date)?.into_iter().next() {
        Some(existing) => (
            WeightRecord {
                weight: weight_kg,
                note,
                ..existing
            },
            true,
        ),
        None => (WeightRecord::new(date, weight_kg, note), false),
    };

    db.put_record(&record)?;
    Ok((record, replaced))
}

pub(crate) fn cmd_log(
    db: &Database,
    unit: WeightUnit,
    value: f64,
    date: Option<String>,
    note: Option<String>,
    json: bool,
) -> Result<()> {
    let date = parse_date(date)?;
    let (record, replaced) = log_weight(db, unit, value, date, note)?;

    if json {
        println!("{}", serde_json::to_string_pretty(&record)?);
        return Ok(());
    }

    let verb = if replaced { "Updated" } else { "Logged" };
    println!(
        "{verb} {} for {}",
        unit.format_with_label(record.weight),
        record.date.format("%Y-%m-%d")
    );
    if let Some(ref n) = record.note {
        println!("  Note: {n}");
    }
    if let Some(profile) = db.get_profile()? {
        let bmi = calculate_bmi(record.weight, profile.height);
        println!("  BMI:  {bmi:.1} ({})", classify_bmi(bmi));
    }
    println!("  ID:   {}", record.id);

    Ok(())
}

/// Replace the fields given on the record `id`. The id and `created_at` are
/// kept; `weight` is in `unit`, and an empty `note` clears it.
pub(crate) fn edit_record(
    db: &Database,
    unit: WeightUnit,
    id: &str,
    weight: Option<f64>,
    date: Option<NaiveDate>,
    note: Option<String>,
) -> Result<WeightRecord> {
    let existing = db
        .get_record(id)?
        .with_context(|| format!("Record not found: {id}"))?;

    let weight = match weight {
        Some(value) => {
            validate_weight(value, unit)?;
            unit.to_canonical(value)
        }
        None => existing.weight,
    };
    let note = match note {
        Some(n) => Some(n).filter(|n| !n.trim().is_empty()),
        None => existing.note.clone(),
    };

    let record = WeightRecord {
        weight,
        date: date.unwrap_or(existing.date),
        note,
        ..existing
    };
    db.put_record(&record)?;
    Ok(record)
}

pub(crate) fn cmd_edit(
    db: &Database,
    unit: WeightUnit,
    id: &str,
    weight: Option<f64>,
    date: Option<String>,
    note: Option<String>,
    json: bool,
) -> Result<()> {
    let date = date.map(|d| parse_date(Some(d))).transpose()?;
    let record = edit_record(db, unit, id, weight, date, note)?;

    if json {
        println!("{}", serde_json::to_string_pretty(&record)?);
        return Ok(());
    }

    println!(
        "Updated {}: {} on {}",
        record.id,
        unit.format_with_label(record.weight),
        record.date.format("%Y-%m-%d")
    );
    if let Some(ref n) = record.note {
        println!("  Note: {n}");
    }

    Ok(())
}

pub(crate) fn cmd_delete(db: &Database, id: &str, json: bool) -> Result<()> {
    db.delete_record(id)?;

    if json {
        println!("{}", serde_json::json!({ "deleted": id }));
    } else {
        println!("Deleted record {id}");
    }

    Ok(())
}

#[derive(Debug, Serialize)]
pub(crate) struct HistoryEntry<'a> {
    #[serde(flatten)]
    pub record: &'a WeightRecord,
    /// Change from the chronologically previous record, in kilograms.
    pub change: Option<f64>,
}

/// Records inside the window in chronological order, each with its change
/// from the record before it. The predecessor may lie outside the window.
pub(crate) fn history_entries(
    records: &[WeightRecord],
    days: Option<u32>,
    today: NaiveDate,
) -> Vec<HistoryEntry<'_>> {
    let cutoff = days.map(|n| window_start(n, today));
    let sorted = sort_chronological(records);

    let mut entries = Vec::new();
    let mut prev: Option<&WeightRecord> = None;
    for record in sorted {
        if cutoff.is_none_or(|c| record.date >= c) {
            entries.push(HistoryEntry {
                record,
                change: prev.map(|p| record.weight - p.weight),
            });
        }
        prev = Some(record);
    }
    entries
}

pub(crate) fn cmd_history(
    db: &Database,
    unit: WeightUnit,
    days: Option<u32>,
    json: bool,
) -> Result<()> {
    let days = require_positive_days(days)?;
    let records = db.list_records()?;
    let entries = history_entries(&records, days, Local::now().date_naive());

    if json {
        println!("{}", serde_json::to_string_pretty(&entries)?);
        return Ok(());
    }
    if entries.is_empty() {
        if records.is_empty() {
            eprintln!("No records yet. Use `weightlog log <weight>` to add one.");
        } else {
            eprintln!("No records in this period.");
        }
        return Ok(());
    }

    #[derive(Tabled)]
    struct HistoryRow {
        #[tabled(rename = "Date")]
        date: String,
        #[tabled(rename = "Weight")]
        weight: String,
        #[tabled(rename = "Change")]
        change: String,
        #[tabled(rename = "Note")]
        note: String,
        #[tabled(rename = "ID")]
        id: String,
    }

    let rows: Vec<HistoryRow> = entries
        .iter()
        .rev()
        .map(|e| HistoryRow {
            date: e.record.date.format("%Y-%m-%d").to_string(),
            weight: unit.format(e.record.weight),
            change: e
                .change
                .map_or_else(|| "-".to_string(), |c| format_change(c, unit)),
            note: e
                .record
                .note
                .as_deref()
                .map(|n| truncate(n, 30))
                .unwrap_or_default(),
            id: e.record.id.clone(),
        })
        .collect();

    let table = Table::new(&rows)
        .with(Style::rounded())
        .with(Modify::new(Columns::new(1..3)).with(Alignment::right()))
        .to_string();
    println!("Weights in {}", unit.label());
    println!("{table}");

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(s: &str) -> NaiveDate {
        NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap()
    }

    #[test]
    fn test_log_weight_converts_display_unit() {
        let db = Database::open_in_memory().unwrap();
        let (record, replaced) =
            log_weight(&db, WeightUnit::Jin, 141.0, date("2024-03-01"), None).unwrap();
        assert!(!replaced);
        assert!((record.weight - 70.5).abs() < f64::EPSILON);
        assert_eq!(db.list_records().unwrap(), vec![record]);
    }

    #[test]
    fn test_log_weight_validates_in_display_unit() {
        let db = Database::open_in_memory().unwrap();
        // 30 jin is 15 kg
        assert!(log_weight(&db, WeightUnit::Jin, 30.0, date("2024-03-01"), None).is_err());
        // 30 kg is fine
        assert!(log_weight(&db, WeightUnit::Kg, 30.0, date("2024-03-01"), None).is_ok());
    }

    #[test]
    fn test_log_weight_replaces_same_date() {
        let db = Database::open_in_memory().unwrap();
        let (first, _) = log_weight(
            &db,
            WeightUnit::Kg,
            70.0,
            date("2024-03-01"),
            Some("morning".to_string()),
        )
        .unwrap();
        let (second, replaced) =
            log_weight(&db, WeightUnit::Kg, 69.5, date("2024-03-01"), None).unwrap();

        assert!(replaced);
        assert_eq!(second.id, first.id);
        assert_eq!(second.created_at, first.created_at);
        let all = db.list_records().unwrap();
        assert_eq!(all.len(), 1);
        assert!((all[0].weight - 69.5).abs() < f64::EPSILON);
        assert!(all[0].note.is_none());
    }

    #[test]
    fn test_log_weight_drops_blank_note() {
        let db = Database::open_in_memory().unwrap();
        let (record, _) = log_weight(
            &db,
            WeightUnit::Kg,
            70.0,
            date("2024-03-01"),
            Some("   ".to_string()),
        )
        .unwrap();
        assert!(record.note.is_none());
    }

    fn record(id: &str, d: &str, weight: f64) -> WeightRecord {
        WeightRecord {
            id: id.to_string(),
            date: date(d),
            weight,
            note: None,
            created_at: String::new(),
        }
    }

    #[test]
    fn test_edit_record_changes_only_given_fields() {
        let db = Database::open_in_memory().unwrap();
        let mut original = record("a", "2024-03-01", 70.0);
        original.note = Some("morning".to_string());
        original.created_at = "2024-03-01T07:00:00+00:00".to_string();
        db.put_record(&original).unwrap();

        let edited = edit_record(&db, WeightUnit::Jin, "a", Some(139.0), None, None).unwrap();
        assert!((edited.weight - 69.5).abs() < f64::EPSILON);
        assert_eq!(edited.date, original.date);
        assert_eq!(edited.note.as_deref(), Some("morning"));
        assert_eq!(edited.created_at, original.created_at);
        assert_eq!(db.get_record("a").unwrap(), Some(edited));
    }

    #[test]
    fn test_edit_record_moves_date_and_clears_note() {
        let db = Database::open_in_memory().unwrap();
        let mut original = record("a", "2024-03-01", 70.0);
        original.note = Some("morning".to_string());
        db.put_record(&original).unwrap();

        let edited = edit_record(
            &db,
            WeightUnit::Kg,
            "a",
            None,
            Some(date("2024-03-05")),
            Some(String::new()),
        )
        .unwrap();
        assert_eq!(edited.id, "a");
        assert_eq!(edited.date, date("2024-03-05"));
        assert!(edited.note.is_none());
        assert_eq!(db.list_records().unwrap(), vec![edited]);
    }

    #[test]
    fn test_edit_record_targets_one_of_same_date_records() {
        let db = Database::open_in_memory().unwrap();
        db.put_record(&record("a", "2024-03-01", 70.0)).unwrap();
        db.put_record(&record("b", "2024-03-01", 71.0)).unwrap();

        edit_record(&db, WeightUnit::Kg, "b", Some(70.4), None, None).unwrap();

        let weights: Vec<f64> = db.list_records().unwrap().iter().map(|r| r.weight).collect();
        assert_eq!(weights, vec![70.0, 70.4]);
    }

    #[test]
    fn test_edit_record_validates_in_display_unit() {
        let db = Database::open_in_memory().unwrap();
        db.put_record(&record("a", "2024-03-01", 70.0)).unwrap();

        // 30 jin is 15 kg
        assert!(edit_record(&db, WeightUnit::Jin, "a", Some(30.0), None, None).is_err());
        assert!((db.get_record("a").unwrap().unwrap().weight - 70.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_edit_record_unknown_id() {
        let db = Database::open_in_memory().unwrap();
        let err = edit_record(&db, WeightUnit::Kg, "nope", Some(70.0), None, None).unwrap_err();
        assert!(err.to_string().contains("Record not found"));
    }

    #[test]
    fn test_delete_unknown_id_is_an_error() {
        let db = Database::open_in_memory().unwrap();
        let err = cmd_delete(&db, "nope", true).unwrap_err();
        assert!(err.to_string().contains("Record not found: nope"));

        db.put_record(&record("a", "2024-03-01", 70.0)).unwrap();
        cmd_delete(&db, "a", true).unwrap();
        assert!(db.list_records().unwrap().is_empty());
    }

    #[test]
    fn test_history_entries_changes() {
        let records = vec![
            record("c", "2024-03-03", 69.0),
            record("a", "2024-03-01", 70.0),
            record("b", "2024-03-02", 69.5),
        ];
        let entries = history_entries(&records, None, date("2024-03-03"));
        let ids: Vec<&str> = entries.iter().map(|e| e.record.id.as_str()).collect();
        assert_eq!(ids, vec!["a", "b", "c"]);
        assert!(entries[0].change.is_none());
        assert!((entries[1].change.unwrap() - -0.5).abs() < f64::EPSILON);
        assert!((entries[2].change.unwrap() - -0.5).abs() < f64::EPSILON);
    }

    #[test]
    fn test_history_entries_window_keeps_predecessor_change() {
        let records = vec![
            record("a", "2024-03-01", 70.0),
            record("b", "2024-03-10", 69.0),
        ];
        let entries = history_entries(&records, Some(3), date("2024-03-10"));
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].record.id, "b");
        assert!((entries[0].change.unwrap() - -1.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_history_entry_json_is_flat() {
        let r = record("a", "2024-03-01", 70.0);
        let entry = HistoryEntry {
            record: &r,
            change: Some(-0.5),
        };
        let value = serde_json::to_value(&entry).unwrap();
        assert_eq!(value["id"], "a");
        assert_eq!(value["change"], -0.5);
    }
}
