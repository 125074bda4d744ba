use std::fmt;
use std::path::Path;
use std::str::FromStr;

use anyhow::{Context, Result, bail};
use chrono::{Local, NaiveDate};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::ValidationError;

pub const DATE_FORMAT: &str = "%Y-%m-%d";

/// Current layout version written into backups.
pub const BACKUP_VERSION: i32 = 1;

pub const WEIGHT_MIN_KG: f64 = 20.0;
pub const WEIGHT_MAX_KG: f64 = 300.0;
pub const HEIGHT_MIN_CM: f64 = 100.0;
pub const HEIGHT_MAX_CM: f64 = 250.0;

const JIN_PER_KG: f64 = 2.0;

// --- Units ---

/// Unit used for showing and entering weights. Storage is always kilograms.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WeightUnit {
    Kg,
    #[default]
    Jin,
}

impl WeightUnit {
    #[must_use]
    pub fn label(self) -> &'static str {
        match self {
            WeightUnit::Kg => "kg",
            WeightUnit::Jin => "斤",
        }
    }

    /// Convert a canonical kilogram value into this unit. No rounding.
    #[must_use]
    pub fn to_display(self, weight_kg: f64) -> f64 {
        match self {
            WeightUnit::Kg => weight_kg,
            WeightUnit::Jin => weight_kg * JIN_PER_KG,
        }
    }

    /// Exact inverse of [`WeightUnit::to_display`].
    #[must_use]
    pub fn to_canonical(self, value: f64) -> f64 {
        match self {
            WeightUnit::Kg => value,
            WeightUnit::Jin => value / JIN_PER_KG,
        }
    }

    /// Display value rounded to one decimal, without the label.
    #[must_use]
    pub fn format(self, weight_kg: f64) -> String {
        format!("{:.1}", self.to_display(weight_kg))
    }

    /// Display value with the unit label, e.g. `"152.4 斤"`.
    #[must_use]
    pub fn format_with_label(self, weight_kg: f64) -> String {
        format!("{} {}", self.format(weight_kg), self.label())
    }
}

impl fmt::Display for WeightUnit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            WeightUnit::Kg => f.write_str("kg"),
            WeightUnit::Jin => f.write_str("jin"),
        }
    }
}

impl FromStr for WeightUnit {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "kg" | "kgs" | "kilogram" | "kilograms" => Ok(WeightUnit::Kg),
            "jin" | "斤" => Ok(WeightUnit::Jin),
            _ => bail!("Invalid unit '{s}'. Use 'kg' or 'jin'"),
        }
    }
}

// --- Records, profile, goal ---

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WeightRecord {
    pub id: String,
    pub date: NaiveDate,
    /// Kilograms, whatever the display unit.
    pub weight: f64,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub note: Option<String>,
    pub created_at: String,
}

impl WeightRecord {
    /// A fresh record with a generated id and a `created_at` of now.
    #[must_use]
    pub fn new(date: NaiveDate, weight_kg: f64, note: Option<String>) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            date,
            weight: weight_kg,
            note,
            created_at: Local::now().to_rfc3339(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Gender {
    Male,
    Female,
}

impl fmt::Display for Gender {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Gender::Male => f.write_str("male"),
            Gender::Female => f.write_str("female"),
        }
    }
}

impl FromStr for Gender {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "male" | "m" => Ok(Gender::Male),
            "female" | "f" => Ok(Gender::Female),
            _ => bail!("Invalid gender '{s}'. Use 'male' or 'female'"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserProfile {
    /// Centimeters.
    pub height: f64,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub gender: Option<Gender>,
    #[serde(default, alias = "weightUnit")]
    pub weight_unit: WeightUnit,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Goal {
    /// Kilograms. Zero means "no goal".
    pub target_weight: f64,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub target_date: Option<NaiveDate>,
    pub created_at: String,
}

impl Goal {
    #[must_use]
    pub fn new(target_weight_kg: f64, target_date: Option<NaiveDate>) -> Self {
        Self {
            target_weight: target_weight_kg,
            target_date,
            created_at: Local::now().to_rfc3339(),
        }
    }

    /// The deletion sentinel understood by `Database::put_goal`.
    #[must_use]
    pub fn cleared() -> Self {
        Self::new(0.0, None)
    }

    #[must_use]
    pub fn is_cleared(&self) -> bool {
        self.target_weight == 0.0
    }
}

/// Everything the app stores, as one immutable snapshot. Also the backup layout.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AppData {
    pub records: Vec<WeightRecord>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub profile: Option<UserProfile>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub goal: Option<Goal>,
    pub version: i32,
}

impl Default for AppData {
    fn default() -> Self {
        Self {
            records: Vec::new(),
            profile: None,
            goal: None,
            version: BACKUP_VERSION,
        }
    }
}

impl AppData {
    /// Display unit from the stored profile, or the default when there is none.
    #[must_use]
    pub fn weight_unit(&self) -> WeightUnit {
        self.profile
            .as_ref()
            .map(|p| p.weight_unit)
            .unwrap_or_default()
    }
}

// --- Import / export types ---

/// What to do with an imported record whose date already has a record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ConflictPolicy {
    Overwrite,
    Keep,
    Skip,
}

impl fmt::Display for ConflictPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConflictPolicy::Overwrite => f.write_str("overwrite"),
            ConflictPolicy::Keep => f.write_str("keep"),
            ConflictPolicy::Skip => f.write_str("skip"),
        }
    }
}

impl FromStr for ConflictPolicy {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "overwrite" => Ok(ConflictPolicy::Overwrite),
            "keep" => Ok(ConflictPolicy::Keep),
            "skip" => Ok(ConflictPolicy::Skip),
            _ => bail!("Invalid conflict policy '{s}'. Use overwrite, keep or skip"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImportStrategy {
    #[serde(rename = "onConflict", alias = "on_conflict")]
    pub on_conflict: ConflictPolicy,
}

impl ImportStrategy {
    #[must_use]
    pub fn new(on_conflict: ConflictPolicy) -> Self {
        Self { on_conflict }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImportResult {
    pub success: usize,
    pub failed: usize,
    pub skipped: usize,
    pub errors: Vec<String>,
}

impl ImportResult {
    /// An import counts as successful when nothing failed and something landed.
    #[must_use]
    pub fn is_success(&self) -> bool {
        self.failed == 0 && self.success > 0
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExportFormat {
    Json,
    Csv,
}

impl ExportFormat {
    /// Guess the format from a file extension.
    pub fn from_path(path: &Path) -> Result<Self> {
        let ext = path
            .extension()
            .and_then(|e| e.to_str())
            .with_context(|| format!("Cannot infer format of '{}'", path.display()))?;
        ext.parse()
    }
}

impl fmt::Display for ExportFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ExportFormat::Json => f.write_str("json"),
            ExportFormat::Csv => f.write_str("csv"),
        }
    }
}

impl FromStr for ExportFormat {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "json" => Ok(ExportFormat::Json),
            "csv" => Ok(ExportFormat::Csv),
            _ => bail!("Unsupported format '{s}'. Use 'json' or 'csv'"),
        }
    }
}

// --- Validation ---

pub fn parse_iso_date(s: &str) -> Result<NaiveDate> {
    NaiveDate::parse_from_str(s.trim(), DATE_FORMAT)
        .with_context(|| format!("Invalid date '{s}'. Must be YYYY-MM-DD"))
}

/// Check a weight entered in `unit`. The 20–300 kg range is converted into
/// `unit` rather than kept as separate per-unit constants.
pub fn validate_weight(value: f64, unit: WeightUnit) -> Result<(), ValidationError> {
    if !value.is_finite() {
        return Err(ValidationError::InvalidNumber);
    }
    let min = unit.to_display(WEIGHT_MIN_KG);
    let max = unit.to_display(WEIGHT_MAX_KG);
    if value < min || value > max {
        return Err(ValidationError::OutOfRange {
            what: "Weight",
            value,
            min,
            max,
            unit: unit.label(),
        });
    }
    Ok(())
}

/// Check a height in centimeters.
pub fn validate_height(value: f64) -> Result<(), ValidationError> {
    if !value.is_finite() {
        return Err(ValidationError::InvalidNumber);
    }
    if !(HEIGHT_MIN_CM..=HEIGHT_MAX_CM).contains(&value) {
        return Err(ValidationError::OutOfRange {
            what: "Height",
            value,
            min: HEIGHT_MIN_CM,
            max: HEIGHT_MAX_CM,
            unit: "cm",
        });
    }
    Ok(())
}
