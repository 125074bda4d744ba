use anyhow::{Context, Result};

use weightlog_core::db::Database;
use weightlog_core::metrics::{calculate_bmi, classify_bmi};
use weightlog_core::models::{Gender, UserProfile, WeightUnit};

use super::helpers::exit_no_data;

/// Build the profile to store. Fields not given keep their stored values,
/// except height which is always required.
pub(crate) fn merge_profile(
    existing: Option<&UserProfile>,
    height: f64,
    gender: Option<&str>,
    prefer: Option<&str>,
) -> Result<UserProfile> {
    let gender = match gender {
        Some(g) => Some(g.parse::<Gender>()?),
        None => existing.and_then(|p| p.gender),
    };
    let weight_unit = match prefer {
        Some(u) => u.parse::<WeightUnit>()?,
        None => existing.map(|p| p.weight_unit).unwrap_or_default(),
    };
    Ok(UserProfile {
        height,
        gender,
        weight_unit,
    })
}

pub(crate) fn cmd_profile_set(
    db: &Database,
    height: f64,
    gender: Option<&str>,
    prefer: Option<&str>,
    json: bool,
) -> Result<()> {
    let existing = db.get_profile()?;
    let profile = merge_profile(existing.as_ref(), height, gender, prefer)?;
    db.put_profile(&profile)?;

    if json {
        println!("{}", serde_json::to_string_pretty(&profile)?);
    } else {
        println!(
            "Profile saved: {:.0} cm, weights shown in {}",
            profile.height,
            profile.weight_unit.label()
        );
    }

    Ok(())
}

pub(crate) fn cmd_profile_show(db: &Database, unit: WeightUnit, json: bool) -> Result<()> {
    let Some(profile) = db.get_profile()? else {
        exit_no_data(
            "No profile set. Use `weightlog profile set --height <cm>` to add one.",
            json,
        );
    };
    let latest = db.list_records()?.pop();
    let bmi = latest
        .as_ref()
        .map(|r| calculate_bmi(r.weight, profile.height));

    if json {
        println!(
            "{}",
            serde_json::to_string_pretty(&serde_json::json!({
                "profile": profile,
                "bmi": bmi,
                "bmi_category": bmi.map(classify_bmi),
            }))?
        );
        return Ok(());
    }

    println!("  Height:   {:.0} cm", profile.height);
    if let Some(g) = profile.gender {
        println!("  Gender:   {g}");
    }
    println!("  Unit:     {}", profile.weight_unit.label());
    if let (Some(record), Some(bmi)) = (latest, bmi) {
        println!(
            "  BMI:      {bmi:.1} ({}) at {} on {}",
            classify_bmi(bmi),
            unit.format_with_label(record.weight),
            record.date.format("%Y-%m-%d")
        );
    }

    Ok(())
}

pub(crate) fn cmd_profile_unit(db: &Database, unit: &str, json: bool) -> Result<()> {
    let mut profile = db
        .get_profile()?
        .context("No profile set. Use `weightlog profile set --height <cm>` first")?;
    profile.weight_unit = unit.parse()?;
    db.put_profile(&profile)?;

    if json {
        println!("{}", serde_json::to_string_pretty(&profile)?);
    } else {
        println!("Weights will be shown in {}", profile.weight_unit.label());
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_merge_profile_new() {
        let p = merge_profile(None, 175.0, Some("f"), None).unwrap();
        assert!((p.height - 175.0).abs() < f64::EPSILON);
        assert_eq!(p.gender, Some(Gender::Female));
        assert_eq!(p.weight_unit, WeightUnit::Jin);
    }

    #[test]
    fn test_merge_profile_keeps_existing_fields() {
        let existing = UserProfile {
            height: 170.0,
            gender: Some(Gender::Male),
            weight_unit: WeightUnit::Kg,
        };
        let p = merge_profile(Some(&existing), 171.0, None, None).unwrap();
        assert_eq!(p.gender, Some(Gender::Male));
        assert_eq!(p.weight_unit, WeightUnit::Kg);

        let p = merge_profile(Some(&existing), 171.0, None, Some("jin")).unwrap();
        assert_eq!(p.weight_unit, WeightUnit::Jin);
    }

    #[test]
    fn test_merge_profile_rejects_bad_values() {
        assert!(merge_profile(None, 170.0, Some("other"), None).is_err());
        assert!(merge_profile(None, 170.0, None, Some("lbs")).is_err());
    }

    #[test]
    fn test_profile_unit_requires_profile() {
        let db = Database::open_in_memory().unwrap();
        assert!(cmd_profile_unit(&db, "kg", true).is_err());
    }

    #[test]
    fn test_profile_set_rejects_bad_height() {
        let db = Database::open_in_memory().unwrap();
        let err = cmd_profile_set(&db, 260.0, None, None, true).unwrap_err();
        assert!(err.to_string().contains("Height must be between"));
        assert!(db.get_profile().unwrap().is_none());
    }
}
