use anyhow::Result;
use chrono::Local;

use weightlog_core::db::Database;
use weightlog_core::models::{Goal, WeightUnit, parse_iso_date, validate_weight};
use weightlog_core::progress::{GoalProgress, goal_progress};

use super::helpers::{exit_no_data, no_neg_zero};

const PROGRESS_BAR_WIDTH: usize = 20;

pub(crate) fn cmd_goal_set(
    db: &Database,
    unit: WeightUnit,
    target: f64,
    date: Option<&str>,
    json: bool,
) -> Result<()> {
    validate_weight(target, unit)?;
    let target_date = date.map(parse_iso_date).transpose()?;

    let goal = Goal::new(unit.to_canonical(target), target_date);
    db.put_goal(&goal)?;

    if json {
        println!("{}", serde_json::to_string_pretty(&goal)?);
    } else {
        print!("Goal set: {}", unit.format_with_label(goal.target_weight));
        match goal.target_date {
            Some(d) => println!(" by {}", d.format("%Y-%m-%d")),
            None => println!(),
        }
    }

    Ok(())
}

/// `[#####-----]` filled by `percent` (0 to 100).
#[allow(clippy::cast_sign_loss, clippy::cast_precision_loss)]
pub(crate) fn progress_bar(percent: f64) -> String {
    let filled = ((percent / 100.0) * PROGRESS_BAR_WIDTH as f64).round() as usize;
    let filled = filled.min(PROGRESS_BAR_WIDTH);
    format!(
        "[{}{}]",
        "#".repeat(filled),
        "-".repeat(PROGRESS_BAR_WIDTH - filled)
    )
}

fn eta_line(progress: &GoalProgress) -> String {
    match progress.estimated_days {
        _ if progress.is_achieved => "Reached".to_string(),
        Some(days) if days >= 0 => format!("About {days} days at the recent rate"),
        Some(_) => "Recent trend is moving away from the goal".to_string(),
        None => "Not enough change to estimate".to_string(),
    }
}

fn print_progress(goal: &Goal, progress: &GoalProgress, unit: WeightUnit) {
    let label = unit.label();
    println!(
        "  Start:      {} on {} ({} days ago)",
        unit.format_with_label(progress.start_weight),
        progress.start_date.format("%Y-%m-%d"),
        progress.days_since_start
    );
    println!("  Current:    {}", unit.format_with_label(progress.current_weight));
    println!(
        "  Lost:       {} of {} {label}",
        unit.format(no_neg_zero(progress.weight_lost)),
        unit.format(no_neg_zero(progress.total_to_lose))
    );
    println!(
        "  Remaining:  {}",
        unit.format_with_label(no_neg_zero(progress.remaining_weight))
    );
    println!(
        "  Progress:   {} {:.0}%",
        progress_bar(progress.progress_percent),
        progress.progress_percent
    );
    println!("  Estimate:   {}", eta_line(progress));

    if let (Some(target_date), Some(days)) = (goal.target_date, progress.days_to_target_date) {
        let when = target_date.format("%Y-%m-%d");
        if progress.is_overdue() {
            println!("  Deadline:   {when} (overdue by {} days)", -days);
        } else if days >= 0 {
            println!("  Deadline:   {when} (in {days} days)");
        } else {
            println!("  Deadline:   {when}");
        }
    }

    if progress.is_achieved {
        println!("\n  Goal reached!");
    }
}

pub(crate) fn cmd_goal_show(db: &Database, unit: WeightUnit, json: bool) -> Result<()> {
    let Some(goal) = db.get_goal()? else {
        exit_no_data(
            "No goal set. Use `weightlog goal set <target>` to add one.",
            json,
        );
    };
    let records = db.list_records()?;
    let progress = goal_progress(&goal, &records, Local::now().naive_local());

    if json {
        println!(
            "{}",
            serde_json::to_string_pretty(&serde_json::json!({
                "goal": goal,
                "progress": progress,
                "is_overdue": progress.as_ref().is_some_and(GoalProgress::is_overdue),
            }))?
        );
        return Ok(());
    }

    print!("Goal: {}", unit.format_with_label(goal.target_weight));
    match goal.target_date {
        Some(d) => println!(" by {}\n", d.format("%Y-%m-%d")),
        None => println!("\n"),
    }

    match progress {
        Some(p) => print_progress(&goal, &p, unit),
        None => eprintln!("No records yet. Log a weight to start tracking progress."),
    }

    Ok(())
}

pub(crate) fn cmd_goal_clear(db: &Database, json: bool) -> Result<()> {
    let had_goal = db.get_goal()?.is_some();
    db.put_goal(&Goal::cleared())?;

    if json {
        println!("{}", serde_json::json!({ "cleared": had_goal }));
    } else if had_goal {
        println!("Goal cleared");
    } else {
        println!("No goal was set");
    }

    Ok(())
}
