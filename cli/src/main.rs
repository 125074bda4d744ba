mod commands;
mod config;

use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::process;
use tracing_subscriber::EnvFilter;

use crate::commands::{
    cmd_backup, cmd_calendar, cmd_delete, cmd_edit, cmd_export, cmd_goal_clear, cmd_goal_set,
    cmd_goal_show, cmd_history, cmd_import, cmd_log, cmd_profile_set, cmd_profile_show,
    cmd_profile_unit, cmd_restore, cmd_stats, cmd_trend, resolve_unit,
};
use crate::config::Config;
use weightlog_core::db::Database;

#[derive(Parser)]
#[command(
    name = "weightlog",
    version,
    about = "A simple, local-first body-weight tracker",
    long_about = "A simple, local-first body-weight tracker.\n\n\
                  Weights are stored in kilograms and shown in kg or jin (1 kg = 2 斤)."
)]
struct Cli {
    /// Display unit: kg or jin (default: the profile's unit, else jin)
    #[arg(short, long, global = true)]
    unit: Option<String>,

    /// Data directory (default: the per-user data directory)
    #[arg(long, global = true, env = "WEIGHTLOG_DATA_DIR", value_name = "PATH")]
    data_dir: Option<PathBuf>,

    /// Log debug output to stderr
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Log a weight in the display unit (replaces an existing record for that date)
    Log {
        /// Weight value
        value: f64,
        /// Date (YYYY-MM-DD or today/yesterday, default: today)
        #[arg(long)]
        date: Option<String>,
        /// Optional note
        #[arg(long)]
        note: Option<String>,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Change the weight, date or note of a record by ID
    Edit {
        /// Record ID
        id: String,
        /// New weight in the display unit
        #[arg(long)]
        weight: Option<f64>,
        /// New date (YYYY-MM-DD or today/yesterday)
        #[arg(long)]
        date: Option<String>,
        /// New note (an empty string removes it)
        #[arg(long)]
        note: Option<String>,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Delete a record by ID
    Delete {
        /// Record ID
        id: String,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Show records with day-over-day changes
    History {
        /// Only the last N days (default: all)
        #[arg(short, long)]
        days: Option<u32>,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Show statistics for a period
    Stats {
        /// Only the last N days (default: all)
        #[arg(short, long)]
        days: Option<u32>,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Show one month of daily changes
    Calendar {
        /// Month as YYYY-MM (default: this month)
        #[arg(short, long)]
        month: Option<String>,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Show the weight trend as a chart
    Trend {
        /// Only the last N days (default: 30)
        #[arg(short, long, default_value = "30")]
        days: u32,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Manage the target weight
    Goal {
        #[command(subcommand)]
        command: GoalCommands,
    },
    /// Manage height, gender and preferred unit
    Profile {
        #[command(subcommand)]
        command: ProfileCommands,
    },
    /// Export records to a JSON or CSV file
    Export {
        /// Output file
        file: PathBuf,
        /// json or csv (default: from the file extension)
        #[arg(short, long)]
        format: Option<String>,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Import records from a JSON or CSV file
    Import {
        /// Input file
        file: PathBuf,
        /// json or csv (default: from the file extension)
        #[arg(short, long)]
        format: Option<String>,
        /// What to do when a date already has a record: overwrite, keep, skip
        #[arg(long, default_value = "skip")]
        on_conflict: String,
        /// Preview the import without making changes
        #[arg(long)]
        dry_run: bool,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Write a full backup (records, profile and goal)
    Backup {
        /// Output file
        file: PathBuf,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Replace all data with a backup
    Restore {
        /// Backup file
        file: PathBuf,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
}

#[derive(Subcommand)]
enum GoalCommands {
    /// Set the target weight in the display unit
    Set {
        /// Target weight
        target: f64,
        /// Target date (YYYY-MM-DD)
        #[arg(long)]
        date: Option<String>,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Show the goal and progress toward it
    Show {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Remove the goal
    Clear {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
}

#[derive(Subcommand)]
enum ProfileCommands {
    /// Set height (and optionally gender and preferred unit)
    Set {
        /// Height in centimeters
        #[arg(long)]
        height: f64,
        /// male or female
        #[arg(long)]
        gender: Option<String>,
        /// Preferred display unit: kg or jin
        #[arg(long = "prefer")]
        prefer: Option<String>,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Show the profile and current BMI
    Show {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Change the preferred display unit
    Unit {
        /// kg or jin
        #[arg(value_name = "UNIT")]
        new_unit: String,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
}

fn main() {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    if let Err(e) = run(cli) {
        eprintln!("Error: {e:#}");
        process::exit(1);
    }
}

/// Logs go to stderr. `WEIGHTLOG_LOG` takes an `EnvFilter` directive.
fn init_tracing(verbose: bool) {
    let default_level = if verbose { "debug" } else { "warn" };
    let filter = EnvFilter::try_from_env("WEIGHTLOG_LOG")
        .unwrap_or_else(|_| EnvFilter::new(default_level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

fn run(cli: Cli) -> Result<()> {
    let config = Config::load(cli.data_dir)?;
    let db = Database::open(&config.db_path)?;
    tracing::debug!(
        data_dir = %config.data_dir.display(),
        db = %config.db_path.display(),
        "database opened"
    );

    let profile = db.get_profile()?;
    let unit = resolve_unit(cli.unit.as_deref(), profile.as_ref())?;

    match cli.command {
        Commands::Log {
            value,
            date,
            note,
            json,
        } => cmd_log(&db, unit, value, date, note, json),
        Commands::Edit {
            id,
            weight,
            date,
            note,
            json,
        } => cmd_edit(&db, unit, &id, weight, date, note, json),
        Commands::Delete { id, json } => cmd_delete(&db, &id, json),
        Commands::History { days, json } => cmd_history(&db, unit, days, json),
        Commands::Stats { days, json } => cmd_stats(&db, unit, days, json),
        Commands::Calendar { month, json } => cmd_calendar(&db, unit, month.as_deref(), json),
        Commands::Trend { days, json } => cmd_trend(&db, unit, days, json),
        Commands::Goal { command } => match command {
            GoalCommands::Set { target, date, json } => {
                cmd_goal_set(&db, unit, target, date.as_deref(), json)
            }
            GoalCommands::Show { json } => cmd_goal_show(&db, unit, json),
            GoalCommands::Clear { json } => cmd_goal_clear(&db, json),
        },
        Commands::Profile { command } => match command {
            ProfileCommands::Set {
                height,
                gender,
                prefer,
                json,
            } => cmd_profile_set(&db, height, gender.as_deref(), prefer.as_deref(), json),
            ProfileCommands::Show { json } => cmd_profile_show(&db, unit, json),
            ProfileCommands::Unit { new_unit, json } => cmd_profile_unit(&db, &new_unit, json),
        },
        Commands::Export { file, format, json } => {
            cmd_export(&db, &file, format.as_deref(), json)
        }
        Commands::Import {
            file,
            format,
            on_conflict,
            dry_run,
            json,
        } => cmd_import(&db, &file, format.as_deref(), &on_conflict, dry_run, json),
        Commands::Backup { file, json } => cmd_backup(&db, &file, json),
        Commands::Restore { file, json } => cmd_restore(&db, &file, json),
    }
}
