use std::path::Path;

use anyhow::{Result, bail};

use weightlog_core::db::Database;
use weightlog_core::import::import_file;
use weightlog_core::models::{ConflictPolicy, ImportResult, ImportStrategy};

use super::helpers::resolve_format;

pub(crate) fn cmd_export(
    db: &Database,
    path: &Path,
    format: Option<&str>,
    json: bool,
) -> Result<()> {
    let format = resolve_format(format, path)?;
    let count = db.export_to_path(format, path)?;

    if json {
        println!(
            "{}",
            serde_json::json!({
                "path": path.display().to_string(),
                "format": format,
                "exported": count,
            })
        );
    } else {
        println!("Exported {count} records to {} ({format})", path.display());
    }

    Ok(())
}

fn print_import_result(result: &ImportResult, dry_run: bool) {
    if dry_run {
        println!("Dry run: no changes made.\n");
        println!("  To import: {}", result.success);
        println!("  To skip:   {}", result.skipped);
    } else {
        if result.is_success() {
            println!("Import complete.\n");
        } else {
            println!("Import finished with problems.\n");
        }
        println!("  Imported:  {}", result.success);
        println!("  Skipped:   {}", result.skipped);
    }
    println!("  Failed:    {}", result.failed);

    if !result.errors.is_empty() {
        println!("\nProblems:");
        for e in &result.errors {
            println!("  {e}");
        }
    }
}

pub(crate) fn cmd_import(
    db: &Database,
    path: &Path,
    format: Option<&str>,
    on_conflict: &str,
    dry_run: bool,
    json: bool,
) -> Result<()> {
    let format = resolve_format(format, path)?;
    let policy: ConflictPolicy = on_conflict.parse()?;
    let result = import_file(db, path, format, ImportStrategy::new(policy), dry_run)?;

    if json {
        println!(
            "{}",
            serde_json::json!({
                "dry_run": dry_run,
                "ok": result.is_success(),
                "success": result.success,
                "failed": result.failed,
                "skipped": result.skipped,
                "errors": result.errors,
            })
        );
    } else {
        print_import_result(&result, dry_run);
    }

    // an import succeeds only when nothing failed and something landed
    if !dry_run && !result.is_success() {
        bail!(
            "Import unsuccessful: {} imported, {} failed, {} skipped",
            result.success,
            result.failed,
            result.skipped
        );
    }

    Ok(())
}

pub(crate) fn cmd_backup(db: &Database, path: &Path, json: bool) -> Result<()> {
    let data = db.backup(path)?;

    if json {
        println!(
            "{}",
            serde_json::json!({
                "path": path.display().to_string(),
                "records": data.records.len(),
                "profile": data.profile.is_some(),
                "goal": data.goal.is_some(),
            })
        );
    } else {
        println!(
            "Backed up {} records to {}",
            data.records.len(),
            path.display()
        );
    }

    Ok(())
}

pub(crate) fn cmd_restore(db: &Database, path: &Path, json: bool) -> Result<()> {
    let data = db.restore(path)?;

    if json {
        println!(
            "{}",
            serde_json::json!({
                "path": path.display().to_string(),
                "records": data.records.len(),
                "profile": data.profile.is_some(),
                "goal": data.goal.as_ref().is_some_and(|g| !g.is_cleared()),
            })
        );
    } else {
        println!(
            "Restored {} records from {}",
            data.records.len(),
            path.display()
        );
        if data.profile.is_some() {
            println!("  Profile restored");
        }
        if data.goal.as_ref().is_some_and(|g| !g.is_cleared()) {
            println!("  Goal restored");
        }
    }

    Ok(())
}
