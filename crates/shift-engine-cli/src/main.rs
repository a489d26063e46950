//! Command-line driver for the shift scheduling engine.
//!
//! A thin JSON shell over `shift-engine`: previews recurrence rules before a
//! shift is created, assembles calendar feeds from schedule files, and
//! evaluates signup requests.

use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};

use anyhow::Context;
use chrono::{DateTime, Duration, NaiveDate, NaiveTime, Utc};
use clap::{Parser, Subcommand};
use serde::{Deserialize, Serialize};
use shift_engine::{
    calendar_events, evaluate_signup, expand_occurrences, preview_occurrences, ExpandOptions,
    HeldSignup, Occurrence, RecurrenceException, ShiftDefinition, WorkStation, Worker,
};

#[derive(Parser)]
#[command(name = "shift-engine")]
#[command(about = "Expand recurring shifts and evaluate signups", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Preview the occurrences a recurrence rule would generate
    Preview {
        /// Base start instant (RFC 3339)
        #[arg(long)]
        start: DateTime<Utc>,
        /// Base end instant (RFC 3339)
        #[arg(long)]
        end: DateTime<Utc>,
        /// Rule text, e.g. "FREQ=WEEKLY;INTERVAL=1;BYDAY=MO,WE"
        #[arg(long)]
        rule: String,
        /// Absolute bound on occurrence starts; defaults to 90 days out
        #[arg(long)]
        recurrence_end: Option<DateTime<Utc>>,
        /// Maximum occurrences to show
        #[arg(long, default_value_t = 50)]
        max: usize,
    },
    /// Assemble a calendar feed from a JSON schedule file
    Expand {
        /// JSON file with shifts, exceptions, and confirmed counts
        #[arg(long)]
        schedule: PathBuf,
        #[arg(long)]
        from: DateTime<Utc>,
        #[arg(long)]
        to: DateTime<Utc>,
        /// IANA time zone for recurrence stepping and date keys
        #[arg(long)]
        timezone: Option<String>,
    },
    /// Evaluate a signup request from a JSON file
    Check {
        #[arg(long)]
        request: PathBuf,
    },
}

/// On-disk input for `expand`.
#[derive(Deserialize)]
struct ScheduleFile {
    shifts: Vec<ShiftDefinition>,
    #[serde(default)]
    exceptions: Vec<RecurrenceException>,
    /// Shift id → confirmed signup count.
    #[serde(default)]
    confirmed: HashMap<String, u32>,
}

/// On-disk input for `check`.
#[derive(Deserialize)]
struct SignupRequest {
    shift: ShiftDefinition,
    station: WorkStation,
    worker: Worker,
    /// Required when the shift is recurring.
    #[serde(default)]
    occurrence_date: Option<NaiveDate>,
    #[serde(default)]
    exceptions: Vec<RecurrenceException>,
    #[serde(default)]
    confirmed_count: u32,
    #[serde(default)]
    existing_signups: Vec<HeldSignup>,
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Preview {
            start,
            end,
            rule,
            recurrence_end,
            max,
        } => {
            let expansion = preview_occurrences(start, end, &rule, recurrence_end, max)?;
            print_json(&expansion)
        }
        Commands::Expand {
            schedule,
            from,
            to,
            timezone,
        } => {
            let file: ScheduleFile = read_json(&schedule)?;
            let options = match timezone {
                Some(name) => ExpandOptions::with_timezone(&name)?,
                None => ExpandOptions::default(),
            };
            let feed = calendar_events(&file.shifts, &file.exceptions, &file.confirmed, from, to, &options);
            print_json(&feed)
        }
        Commands::Check { request } => {
            let request: SignupRequest = read_json(&request)?;
            let occurrence = resolve_occurrence(&request)?;
            let verdict = evaluate_signup(
                &request.shift,
                &occurrence,
                &request.station,
                &request.worker,
                request.confirmed_count,
                &request.existing_signups,
            );
            print_json(&verdict)
        }
    }
}

/// Locate the concrete occurrence a signup request targets.
///
/// One-time shifts have exactly one. For a recurring shift the request names
/// an occurrence date and the series is expanded around it; a date with no
/// surviving occurrence (wrong weekday, past the recurrence end, or cancelled
/// by an exception) is an error.
fn resolve_occurrence(request: &SignupRequest) -> anyhow::Result<Occurrence> {
    let shift = &request.shift;

    if !shift.is_recurring {
        let expansion = expand_occurrences(shift, &[], shift.start, shift.end)?;
        return expansion
            .occurrences
            .into_iter()
            .next()
            .with_context(|| format!("shift '{}' has no occurrence", shift.id));
    }

    let date = request
        .occurrence_date
        .context("occurrence_date is required for a recurring shift")?;
    let day_start = date.and_time(NaiveTime::MIN).and_utc();
    let expansion = expand_occurrences(
        shift,
        &request.exceptions,
        day_start - Duration::days(1),
        day_start + Duration::days(2),
    )?;
    expansion
        .occurrences
        .into_iter()
        .find(|occ| occ.occurrence_date == Some(date))
        .with_context(|| format!("shift '{}' has no occurrence on {date}", shift.id))
}

fn read_json<T: for<'de> Deserialize<'de>>(path: &Path) -> anyhow::Result<T> {
    let text = fs::read_to_string(path)
        .with_context(|| format!("failed to read {}", path.display()))?;
    serde_json::from_str(&text).with_context(|| format!("invalid JSON in {}", path.display()))
}

fn print_json<T: Serialize>(value: &T) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}
