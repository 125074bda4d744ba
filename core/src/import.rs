use std::collections::{HashMap, HashSet};
use std::io::Read;
use std::path::Path;

use anyhow::{Context, Result, bail};
use chrono::{Local, NaiveDate};
use serde::Deserialize;
use serde_json::Value;
use tracing::{info, warn};
use uuid::Uuid;

use crate::db::Database;
use crate::error::{RowError, RowLocation};
use crate::models::{
    ConflictPolicy, ExportFormat, ImportResult, ImportStrategy, WeightRecord, WeightUnit,
    parse_iso_date, validate_weight,
};

/// A parsed record and the row it came from.
#[derive(Debug, Clone, PartialEq)]
pub struct ImportCandidate {
    pub location: RowLocation,
    pub record: WeightRecord,
}

/// Candidate records parsed from an import file, plus the rows that could not
/// be parsed at all.
#[derive(Debug, Clone, Default)]
pub struct ImportBatch {
    pub records: Vec<ImportCandidate>,
    pub row_errors: Vec<RowError>,
}

/// One storage write produced by reconciliation.
#[derive(Debug, Clone, PartialEq)]
pub enum RecordChange {
    Insert(WeightRecord),
    /// Overwrite the stored `replaced_id` with `record`, keeping its position.
    Replace {
        replaced_id: String,
        record: WeightRecord,
    },
}

/// Outcome of merging a batch into an existing record set.
#[derive(Debug, Clone)]
pub struct ImportPlan {
    pub result: ImportResult,
    /// The record set as it looks once `changes` are applied.
    pub records: Vec<WeightRecord>,
    /// Writes to apply, in order.
    pub changes: Vec<RecordChange>,
}

// --- Parsing ---

pub fn parse_import<R: Read>(reader: R, format: ExportFormat) -> Result<ImportBatch> {
    match format {
        ExportFormat::Csv => parse_csv(reader),
        ExportFormat::Json => parse_json(reader),
    }
}

/// Parse `date,weight,note` rows (weight in kg).
///
/// A first row whose first field mentions "date" is treated as a header.
/// Bad rows are collected in `row_errors` and never stop the parse.
pub fn parse_csv<R: Read>(reader: R) -> Result<ImportBatch> {
    let mut rdr = csv::ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .trim(csv::Trim::All)
        .from_reader(reader);

    let mut batch = ImportBatch::default();

    for (idx, result) in rdr.records().enumerate() {
        let record = match result {
            Ok(record) => record,
            Err(e) => {
                let line = e.position().map_or(idx + 1, |p| p.line() as usize);
                batch
                    .row_errors
                    .push(RowError::new(RowLocation::Line(line), format!("Unreadable row: {e}")));
                continue;
            }
        };
        let line = record.position().map_or(idx + 1, |p| p.line() as usize);

        if idx == 0
            && record
                .get(0)
                .is_some_and(|f| f.to_lowercase().contains("date"))
        {
            continue;
        }

        match csv_row_to_record(&record, line) {
            Ok(r) => batch.records.push(ImportCandidate {
                location: RowLocation::Line(line),
                record: r,
            }),
            Err(e) => batch.row_errors.push(e),
        }
    }

    Ok(batch)
}

fn csv_row_to_record(
    record: &csv::StringRecord,
    line: usize,
) -> std::result::Result<WeightRecord, RowError> {
    let location = RowLocation::Line(line);
    if record.len() < 2 {
        return Err(RowError::new(location, "Invalid format"));
    }

    let date_str = record.get(0).unwrap_or_default();
    let date = NaiveDate::parse_from_str(date_str, crate::models::DATE_FORMAT)
        .map_err(|_| RowError::new(location, format!("Invalid date '{date_str}'")))?;

    let weight: f64 = record
        .get(1)
        .unwrap_or_default()
        .parse()
        .map_err(|_| RowError::new(location, "Invalid weight value"))?;

    let note = record
        .get(2)
        .filter(|n| !n.is_empty())
        .map(ToString::to_string);

    Ok(WeightRecord::new(date, weight, note))
}

#[derive(Debug, Deserialize)]
struct RawRecord {
    #[serde(default)]
    id: Option<String>,
    date: String,
    weight: f64,
    #[serde(default)]
    note: Option<String>,
    #[serde(default)]
    created_at: Option<String>,
}

impl RawRecord {
    fn into_record(self) -> Result<WeightRecord> {
        let date = parse_iso_date(&self.date)?;
        Ok(WeightRecord {
            id: self
                .id
                .filter(|id| !id.trim().is_empty())
                .unwrap_or_else(|| Uuid::new_v4().to_string()),
            date,
            weight: self.weight,
            note: self.note.filter(|n| !n.trim().is_empty()),
            created_at: self
                .created_at
                .unwrap_or_else(|| Local::now().to_rfc3339()),
        })
    }
}

/// Parse either a bare record array or a full backup object with `records`.
///
/// Anything else fails the whole file; individual bad elements become row errors.
pub fn parse_json<R: Read>(reader: R) -> Result<ImportBatch> {
    let value: Value = serde_json::from_reader(reader).context("Invalid JSON")?;

    let items = match value {
        Value::Array(items) => items,
        Value::Object(mut map) => match map.remove("records") {
            Some(Value::Array(items)) => items,
            _ => bail!("Invalid JSON format: expected a record array or a backup with \"records\""),
        },
        _ => bail!("Invalid JSON format: expected a record array or a backup with \"records\""),
    };

    let mut batch = ImportBatch::default();
    for (idx, item) in items.into_iter().enumerate() {
        let location = RowLocation::Record(idx + 1);
        let parsed = serde_json::from_value::<RawRecord>(item)
            .map_err(anyhow::Error::from)
            .and_then(RawRecord::into_record);
        match parsed {
            Ok(record) => batch.records.push(ImportCandidate { location, record }),
            Err(e) => batch.row_errors.push(RowError::new(location, format!("{e:#}"))),
        }
    }

    Ok(batch)
}

// --- Reconciliation ---

/// Merge `batch` into `existing` under `strategy`.
///
/// Candidates are applied in input order, so later candidates see the effect
/// of earlier ones: under `overwrite` the last candidate for a date wins and
/// under `keep` they all accumulate. Parse failures in the batch and
/// candidates with an out-of-range weight are tallied as `failed` without
/// affecting the rest. Ids stay unique: a candidate whose id is already taken
/// gets a fresh one.
#[must_use]
pub fn reconcile(
    existing: &[WeightRecord],
    batch: &ImportBatch,
    strategy: ImportStrategy,
) -> ImportPlan {
    let mut result = ImportResult::default();
    for row_error in &batch.row_errors {
        result.failed += 1;
        result.errors.push(row_error.to_string());
    }

    let mut records = existing.to_vec();
    let mut by_date: HashMap<NaiveDate, usize> = HashMap::new();
    for (idx, r) in records.iter().enumerate() {
        by_date.entry(r.date).or_insert(idx);
    }
    let mut ids: HashSet<String> = records.iter().map(|r| r.id.clone()).collect();
    let mut changes = Vec::new();

    for ImportCandidate {
        location,
        record: candidate,
    } in &batch.records
    {
        if validate_weight(candidate.weight, WeightUnit::Kg).is_err() {
            let error = RowError::new(
                *location,
                format!(
                    "Invalid weight value: {} on {}",
                    candidate.weight, candidate.date
                ),
            );
            warn!("{error}");
            result.failed += 1;
            result.errors.push(error.to_string());
            continue;
        }

        match by_date.get(&candidate.date).copied() {
            None => {
                let record = with_unique_id(candidate, &mut ids);
                by_date.insert(record.date, records.len());
                records.push(record.clone());
                changes.push(RecordChange::Insert(record));
                result.success += 1;
            }
            Some(idx) => match strategy.on_conflict {
                ConflictPolicy::Keep => {
                    let record = with_unique_id(candidate, &mut ids);
                    records.push(record.clone());
                    changes.push(RecordChange::Insert(record));
                    result.success += 1;
                }
                ConflictPolicy::Overwrite => {
                    ids.remove(&records[idx].id);
                    let record = with_unique_id(candidate, &mut ids);
                    let replaced = std::mem::replace(&mut records[idx], record.clone());
                    changes.push(RecordChange::Replace {
                        replaced_id: replaced.id,
                        record,
                    });
                    result.success += 1;
                }
                ConflictPolicy::Skip => {
                    result.skipped += 1;
                }
            },
        }
    }

    ImportPlan {
        result,
        records,
        changes,
    }
}

fn with_unique_id(candidate: &WeightRecord, ids: &mut HashSet<String>) -> WeightRecord {
    let mut record = candidate.clone();
    if ids.contains(&record.id) {
        record.id = Uuid::new_v4().to_string();
    }
    ids.insert(record.id.clone());
    record
}

// --- Orchestration ---

/// Parse `path`, reconcile it against the stored records and apply the result.
///
/// With `dry_run` the tally is computed but nothing is written.
pub fn import_file(
    db: &Database,
    path: &Path,
    format: ExportFormat,
    strategy: ImportStrategy,
    dry_run: bool,
) -> Result<ImportResult> {
    let file = std::fs::File::open(path)
        .with_context(|| format!("Failed to open file: {}", path.display()))?;
    let batch = parse_import(file, format)?;

    let existing = db.list_records()?;
    let plan = reconcile(&existing, &batch, strategy);

    if !dry_run {
        db.apply_record_changes(&plan.changes)?;
    }

    info!(
        path = %path.display(),
        %format,
        on_conflict = %strategy.on_conflict,
        dry_run,
        success = plan.result.success,
        failed = plan.result.failed,
        skipped = plan.result.skipped,
        "import finished"
    );

    Ok(plan.result)
}
