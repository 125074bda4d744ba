use std::fs::File;
use std::io::{BufReader, BufWriter, Write};
use std::path::Path;
use std::str::FromStr;

use anyhow::{Context, Result, bail};
use chrono::NaiveDate;
use rusqlite::types::Type;
use rusqlite::{Connection, OptionalExtension, params};
use tracing::{debug, info};

use crate::import::RecordChange;
use crate::models::{
    AppData, BACKUP_VERSION, DATE_FORMAT, ExportFormat, Gender, Goal, UserProfile,
    WeightRecord, WeightUnit, validate_height, validate_weight,
};

const RECORD_COLUMNS: &str = "id, date, weight_kg, note, created_at";

pub struct Database {
    conn: Connection,
}

impl Database {
    pub fn open(path: &Path) -> Result<Self> {
        let conn = Connection::open(path)
            .with_context(|| format!("Failed to open database: {}", path.display()))?;
        let db = Database { conn };
        db.migrate()?;
        Ok(db)
    }

    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        let db = Database { conn };
        db.migrate()?;
        Ok(db)
    }

    fn migrate(&self) -> Result<()> {
        let version: i64 = self
            .conn
            .pragma_query_value(None, "user_version", |row| row.get(0))?;

        if version < 1 {
            // seq keeps insertion order for records that share a date
            self.conn.execute_batch(
                "CREATE TABLE IF NOT EXISTS records (
                    seq INTEGER PRIMARY KEY AUTOINCREMENT,
                    id TEXT NOT NULL UNIQUE,
                    date TEXT NOT NULL,
                    weight_kg REAL NOT NULL,
                    note TEXT,
                    created_at TEXT NOT NULL
                );

                CREATE INDEX IF NOT EXISTS idx_records_date ON records(date);

                CREATE TABLE IF NOT EXISTS profile (
                    id INTEGER PRIMARY KEY CHECK (id = 1),
                    height_cm REAL NOT NULL,
                    gender TEXT,
                    weight_unit TEXT NOT NULL
                );

                CREATE TABLE IF NOT EXISTS goal (
                    id INTEGER PRIMARY KEY CHECK (id = 1),
                    target_weight_kg REAL NOT NULL,
                    target_date TEXT,
                    created_at TEXT NOT NULL
                );

                PRAGMA user_version = 1;",
            )?;
        }

        Ok(())
    }

    fn record_from_row(row: &rusqlite::Row) -> rusqlite::Result<WeightRecord> {
        let date_str: String = row.get(1)?;
        let date = NaiveDate::parse_from_str(&date_str, DATE_FORMAT)
            .map_err(|e| rusqlite::Error::FromSqlConversionFailure(1, Type::Text, Box::new(e)))?;
        Ok(WeightRecord {
            id: row.get(0)?,
            date,
            weight: row.get(2)?,
            note: row.get(3)?,
            created_at: row.get(4)?,
        })
    }

    // --- Records ---

    /// All records, ascending by date; records sharing a date stay in insertion order.
    pub fn list_records(&self) -> Result<Vec<WeightRecord>> {
        let mut stmt = self.conn.prepare(&format!(
            "SELECT {RECORD_COLUMNS} FROM records ORDER BY date ASC, seq ASC"
        ))?;
        let records = stmt
            .query_map([], Self::record_from_row)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(records)
    }

    pub fn get_record(&self, id: &str) -> Result<Option<WeightRecord>> {
        let record = self
            .conn
            .query_row(
                &format!("SELECT {RECORD_COLUMNS} FROM records WHERE id = ?1"),
                params![id],
                Self::record_from_row,
            )
            .optional()?;
        Ok(record)
    }

    pub fn find_records_by_date(&self, date: NaiveDate) -> Result<Vec<WeightRecord>> {
        let mut stmt = self.conn.prepare(&format!(
            "SELECT {RECORD_COLUMNS} FROM records WHERE date = ?1 ORDER BY seq ASC"
        ))?;
        let records = stmt
            .query_map(
                params![date.format(DATE_FORMAT).to_string()],
                Self::record_from_row,
            )?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(records)
    }

    /// Insert or update by id. The weight must already be canonical kilograms.
    pub fn put_record(&self, record: &WeightRecord) -> Result<()> {
        validate_weight(record.weight, WeightUnit::Kg)?;
        write_record(&self.conn, record)?;
        debug!(id = %record.id, date = %record.date, weight_kg = record.weight, "record stored");
        Ok(())
    }

    pub fn delete_record(&self, id: &str) -> Result<()> {
        let rows = self
            .conn
            .execute("DELETE FROM records WHERE id = ?1", params![id])?;
        if rows == 0 {
            bail!("Record not found: {id}");
        }
        debug!(id, "record deleted");
        Ok(())
    }

    /// Apply import writes atomically: either every change lands or none does.
    pub fn apply_record_changes(&self, changes: &[RecordChange]) -> Result<()> {
        let tx = self.conn.unchecked_transaction()?;
        for change in changes {
            match change {
                RecordChange::Insert(record) => write_record(&tx, record)?,
                RecordChange::Replace {
                    replaced_id,
                    record,
                } => {
                    // in place, so the row keeps its position among same-date records
                    let rows = tx.execute(
                        "UPDATE records
                         SET id = ?1, date = ?2, weight_kg = ?3, note = ?4, created_at = ?5
                         WHERE id = ?6",
                        params![
                            record.id,
                            record.date.format(DATE_FORMAT).to_string(),
                            record.weight,
                            record.note,
                            record.created_at,
                            replaced_id,
                        ],
                    )?;
                    if rows == 0 {
                        bail!("Record not found: {replaced_id}");
                    }
                }
            }
        }
        tx.commit()?;
        debug!(changes = changes.len(), "record changes applied");
        Ok(())
    }

    // --- Profile ---

    pub fn get_profile(&self) -> Result<Option<UserProfile>> {
        let row = self
            .conn
            .query_row(
                "SELECT height_cm, gender, weight_unit FROM profile WHERE id = 1",
                [],
                |row| {
                    Ok((
                        row.get::<_, f64>(0)?,
                        row.get::<_, Option<String>>(1)?,
                        row.get::<_, String>(2)?,
                    ))
                },
            )
            .optional()?;

        let Some((height, gender, unit)) = row else {
            return Ok(None);
        };
        Ok(Some(UserProfile {
            height,
            gender: gender.as_deref().map(Gender::from_str).transpose()?,
            weight_unit: WeightUnit::from_str(&unit)?,
        }))
    }

    pub fn put_profile(&self, profile: &UserProfile) -> Result<()> {
        validate_height(profile.height)?;
        write_profile(&self.conn, profile)?;
        debug!(height_cm = profile.height, unit = %profile.weight_unit, "profile stored");
        Ok(())
    }

    // --- Goal ---

    pub fn get_goal(&self) -> Result<Option<Goal>> {
        let row = self
            .conn
            .query_row(
                "SELECT target_weight_kg, target_date, created_at FROM goal WHERE id = 1",
                [],
                |row| {
                    Ok((
                        row.get::<_, f64>(0)?,
                        row.get::<_, Option<String>>(1)?,
                        row.get::<_, String>(2)?,
                    ))
                },
            )
            .optional()?;

        let Some((target_weight, target_date, created_at)) = row else {
            return Ok(None);
        };
        let target_date = target_date
            .map(|d| NaiveDate::parse_from_str(&d, DATE_FORMAT))
            .transpose()
            .context("Stored goal has a malformed target date")?;
        Ok(Some(Goal {
            target_weight,
            target_date,
            created_at,
        }))
    }

    /// Store the goal. A cleared goal (`target_weight == 0`) deletes it.
    pub fn put_goal(&self, goal: &Goal) -> Result<()> {
        if goal.is_cleared() {
            self.conn.execute("DELETE FROM goal", [])?;
            debug!("goal cleared");
            return Ok(());
        }
        validate_weight(goal.target_weight, WeightUnit::Kg)?;
        write_goal(&self.conn, goal)?;
        debug!(target_kg = goal.target_weight, "goal stored");
        Ok(())
    }

    // --- Whole-store operations ---

    pub fn snapshot(&self) -> Result<AppData> {
        Ok(AppData {
            records: self.list_records()?,
            profile: self.get_profile()?,
            goal: self.get_goal()?,
            version: BACKUP_VERSION,
        })
    }

    /// Replace every record, the profile and the goal in one transaction.
    pub fn replace_all(&self, data: &AppData) -> Result<()> {
        let tx = self.conn.unchecked_transaction()?;
        tx.execute_batch("DELETE FROM records; DELETE FROM profile; DELETE FROM goal;")?;
        for record in &data.records {
            write_record(&tx, record)?;
        }
        if let Some(profile) = &data.profile {
            write_profile(&tx, profile)?;
        }
        if let Some(goal) = data.goal.as_ref().filter(|g| !g.is_cleared()) {
            write_goal(&tx, goal)?;
        }
        tx.commit()?;
        debug!(records = data.records.len(), "store replaced");
        Ok(())
    }

    // --- Export / backup ---

    /// Write all records as a JSON array or as `date,weight,note` CSV rows.
    /// Returns the number of records written.
    pub fn export_records<W: Write>(&self, format: ExportFormat, writer: W) -> Result<usize> {
        let records = self.list_records()?;
        write_records(&records, format, writer)?;
        Ok(records.len())
    }

    pub fn export_to_path(&self, format: ExportFormat, path: &Path) -> Result<usize> {
        let file = File::create(path)
            .with_context(|| format!("Failed to create file: {}", path.display()))?;
        let count = self.export_records(format, BufWriter::new(file))?;
        info!(path = %path.display(), %format, count, "records exported");
        Ok(count)
    }

    /// Write the full store as a versioned JSON backup.
    pub fn backup(&self, path: &Path) -> Result<AppData> {
        let data = self.snapshot()?;
        let file = File::create(path)
            .with_context(|| format!("Failed to create file: {}", path.display()))?;
        let mut writer = BufWriter::new(file);
        serde_json::to_writer_pretty(&mut writer, &data)?;
        writer.flush()?;
        info!(path = %path.display(), records = data.records.len(), "backup written");
        Ok(data)
    }

    /// Load a backup and replace the store with it.
    ///
    /// The file is fully parsed before anything is touched, so a malformed or
    /// newer-version backup leaves the existing data in place.
    pub fn restore(&self, path: &Path) -> Result<AppData> {
        let file = File::open(path)
            .with_context(|| format!("Failed to open file: {}", path.display()))?;
        let data: AppData = serde_json::from_reader(BufReader::new(file))
            .with_context(|| format!("Invalid backup file: {}", path.display()))?;
        if data.version > BACKUP_VERSION {
            bail!(
                "Backup version {} is newer than supported version {BACKUP_VERSION}",
                data.version
            );
        }
        self.replace_all(&data)?;
        info!(path = %path.display(), records = data.records.len(), "backup restored");
        Ok(data)
    }
}

fn write_record(conn: &Connection, record: &WeightRecord) -> Result<()> {
    conn.execute(
        "INSERT INTO records (id, date, weight_kg, note, created_at)
         VALUES (?1, ?2, ?3, ?4, ?5)
         ON CONFLICT(id) DO UPDATE SET
            date = excluded.date,
            weight_kg = excluded.weight_kg,
            note = excluded.note,
            created_at = excluded.created_at",
        params![
            record.id,
            record.date.format(DATE_FORMAT).to_string(),
            record.weight,
            record.note,
            record.created_at,
        ],
    )?;
    Ok(())
}

fn write_profile(conn: &Connection, profile: &UserProfile) -> Result<()> {
    conn.execute(
        "INSERT INTO profile (id, height_cm, gender, weight_unit)
         VALUES (1, ?1, ?2, ?3)
         ON CONFLICT(id) DO UPDATE SET
            height_cm = excluded.height_cm,
            gender = excluded.gender,
            weight_unit = excluded.weight_unit",
        params![
            profile.height,
            profile.gender.map(|g| g.to_string()),
            profile.weight_unit.to_string(),
        ],
    )?;
    Ok(())
}

fn write_goal(conn: &Connection, goal: &Goal) -> Result<()> {
    conn.execute(
        "INSERT INTO goal (id, target_weight_kg, target_date, created_at)
         VALUES (1, ?1, ?2, ?3)
         ON CONFLICT(id) DO UPDATE SET
            target_weight_kg = excluded.target_weight_kg,
            target_date = excluded.target_date,
            created_at = excluded.created_at",
        params![
            goal.target_weight,
            goal.target_date.map(|d| d.format(DATE_FORMAT).to_string()),
            goal.created_at,
        ],
    )?;
    Ok(())
}

fn write_records<W: Write>(
    records: &[WeightRecord],
    format: ExportFormat,
    mut writer: W,
) -> Result<()> {
    match format {
        ExportFormat::Json => {
            serde_json::to_writer_pretty(&mut writer, records)?;
            writer.flush()?;
        }
        ExportFormat::Csv => {
            let mut wtr = csv::Writer::from_writer(writer);
            wtr.write_record(["date", "weight", "note"])?;
            for r in records {
                wtr.write_record([
                    r.date.format(DATE_FORMAT).to_string(),
                    r.weight.to_string(),
                    r.note.clone().unwrap_or_default(),
                ])?;
            }
            wtr.flush()?;
        }
    }
    Ok(())
}
