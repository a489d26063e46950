//! Occurrence expansion for one-time and recurring shifts.
//!
//! Expansion is a pure computation: a [`ShiftDefinition`], its cancelling
//! [`RecurrenceException`]s, and a query window go in; a start-ordered list
//! of concrete [`Occurrence`]s comes out. No clock is read and nothing is
//! written — the caller supplies every instant, which keeps expansion
//! deterministic and trivially safe to run from concurrent request handlers.
//!
//! Candidate start instants are enumerated by a restartable iterator
//! ([`Candidates`]) in strictly increasing order, beginning at the base start
//! (which is always itself a candidate). Enumeration stops at the first of:
//! the rule's `COUNT` exhausted, its `UNTIL` or the shift's recurrence end
//! exceeded, or the query window's end passed. Candidates before the window
//! start are skipped but still count toward `COUNT`, so disjoint windows over
//! the same series never over-produce.
//!
//! Every expansion is capped: at most [`MAX_OCCURRENCES`] occurrences are
//! emitted (the caller's `max_count` for previews) and at most
//! [`MAX_CANDIDATES`] candidates are examined, so a pathological unbounded
//! rule queried over a huge window stays bounded. Hitting either cap sets
//! [`Expansion::truncated`] — the sequence is never silently cut short.

use chrono::{DateTime, Datelike, Duration, NaiveDate, NaiveTime, TimeZone, Utc, Weekday};
use chrono_tz::Tz;
use serde::Serialize;

use crate::error::{Result, ScheduleError};
use crate::model::{Occurrence, RecurrenceException, ShiftDefinition};
use crate::rule::{Frequency, RecurrenceRule, RuleBound};

/// Hard cap on occurrences emitted by a single expansion.
pub const MAX_OCCURRENCES: usize = 1000;

/// Hard cap on candidates examined by a single expansion. Bounds the work of
/// sparse queries (a far-future window against an unbounded rule) where few
/// candidates land inside the window.
pub const MAX_CANDIDATES: usize = 100_000;

/// Preview horizon after the base start when the caller supplies no
/// recurrence end.
pub const PREVIEW_HORIZON_DAYS: i64 = 90;

/// Options for expansion.
#[derive(Debug, Clone, Copy)]
pub struct ExpandOptions {
    /// Time zone of the shift's wall clock. Day, week, and month steps are
    /// taken on this zone's calendar, so a recurring 08:00 shift stays at
    /// 08:00 local across DST transitions, and `occurrence_date` keys are
    /// derived in this zone. UTC (the default) reproduces plain instant
    /// arithmetic.
    pub timezone: Tz,
}

impl Default for ExpandOptions {
    fn default() -> Self {
        Self { timezone: Tz::UTC }
    }
}

impl ExpandOptions {
    /// Build options from an IANA time zone name.
    ///
    /// # Errors
    ///
    /// Returns [`ScheduleError::InvalidTimezone`] if the name is not a valid
    /// IANA time zone.
    pub fn with_timezone(name: &str) -> Result<Self> {
        let timezone = name
            .parse::<Tz>()
            .map_err(|_| ScheduleError::InvalidTimezone(format!("'{name}'")))?;
        Ok(Self { timezone })
    }
}

/// The result of expanding one shift over a query window.
#[derive(Debug, Clone, Serialize)]
pub struct Expansion {
    /// Concrete occurrences, ascending by start instant.
    pub occurrences: Vec<Occurrence>,
    /// True when an expansion cap cut the sequence short of the window.
    pub truncated: bool,
}

impl Expansion {
    fn empty() -> Self {
        Self {
            occurrences: Vec::new(),
            truncated: false,
        }
    }
}

/// Expand one shift into the occurrences falling inside `[range_start,
/// range_end]` (inclusive at both bounds), with exceptions applied.
///
/// `exceptions` must already be filtered to this shift; cancelling exceptions
/// suppress the occurrence on their calendar date. A one-time shift yields its
/// own single occurrence when its interval intersects the window. A recurrence
/// end earlier than the window start short-circuits to an empty expansion
/// without touching the rule.
///
/// Expanding twice with identical arguments yields identical output — ids,
/// order, everything.
///
/// # Errors
///
/// Returns [`ScheduleError::InvalidRule`] for malformed rule text and
/// [`ScheduleError::InvalidShift`] for a recurring shift without rule text.
/// Callers treat either as "no occurrences" at the request boundary; the
/// error itself is their record of why.
pub fn expand_occurrences(
    shift: &ShiftDefinition,
    exceptions: &[RecurrenceException],
    range_start: DateTime<Utc>,
    range_end: DateTime<Utc>,
) -> Result<Expansion> {
    expand_occurrences_with(shift, exceptions, range_start, range_end, &ExpandOptions::default())
}

/// [`expand_occurrences`] with explicit [`ExpandOptions`].
pub fn expand_occurrences_with(
    shift: &ShiftDefinition,
    exceptions: &[RecurrenceException],
    range_start: DateTime<Utc>,
    range_end: DateTime<Utc>,
    options: &ExpandOptions,
) -> Result<Expansion> {
    if !shift.is_recurring {
        let intersects = shift.start <= range_end && shift.end >= range_start;
        let occurrences = if intersects {
            vec![Occurrence {
                id: shift.id.clone(),
                shift_id: shift.id.clone(),
                start: shift.start,
                end: shift.end,
                occurrence_date: None,
            }]
        } else {
            Vec::new()
        };
        return Ok(Expansion {
            occurrences,
            truncated: false,
        });
    }

    if let Some(recurrence_end) = shift.recurrence_end {
        if recurrence_end < range_start {
            return Ok(Expansion::empty());
        }
    }

    let rule = shift.parsed_rule()?.ok_or_else(|| {
        ScheduleError::InvalidShift(format!("shift '{}' is not recurring", shift.id))
    })?;

    Ok(run_expansion(RunParams {
        rule: &rule,
        base_start: shift.start,
        duration: shift.duration(),
        shift_key: &shift.id,
        exceptions,
        range_start,
        range_end,
        recurrence_end: shift.recurrence_end,
        cap: MAX_OCCURRENCES,
        timezone: options.timezone,
    }))
}

/// Expand a not-yet-persisted candidate definition for preview.
///
/// The window runs from `start` to `recurrence_end`, or to `start` +
/// [`PREVIEW_HORIZON_DAYS`] when no end is given; at most `max_count`
/// occurrences are produced. Occurrence ids are keyed on the literal shift
/// key `"preview"` since no shift id exists yet.
///
/// # Errors
///
/// Returns [`ScheduleError::InvalidRule`] for malformed rule text and
/// [`ScheduleError::InvalidShift`] when `end` is not after `start`.
pub fn preview_occurrences(
    start: DateTime<Utc>,
    end: DateTime<Utc>,
    rule_text: &str,
    recurrence_end: Option<DateTime<Utc>>,
    max_count: usize,
) -> Result<Expansion> {
    if end <= start {
        return Err(ScheduleError::InvalidShift(
            "shift end must be after start".to_string(),
        ));
    }
    let rule = RecurrenceRule::parse(rule_text)?;
    let horizon = recurrence_end.unwrap_or(start + Duration::days(PREVIEW_HORIZON_DAYS));

    Ok(run_expansion(RunParams {
        rule: &rule,
        base_start: start,
        duration: end - start,
        shift_key: "preview",
        exceptions: &[],
        range_start: start,
        range_end: horizon,
        recurrence_end: None,
        cap: max_count,
        timezone: Tz::UTC,
    }))
}

struct RunParams<'a> {
    rule: &'a RecurrenceRule,
    base_start: DateTime<Utc>,
    duration: Duration,
    shift_key: &'a str,
    exceptions: &'a [RecurrenceException],
    range_start: DateTime<Utc>,
    range_end: DateTime<Utc>,
    recurrence_end: Option<DateTime<Utc>>,
    cap: usize,
    timezone: Tz,
}

fn run_expansion(params: RunParams<'_>) -> Expansion {
    let RunParams {
        rule,
        base_start,
        duration,
        shift_key,
        exceptions,
        range_start,
        range_end,
        recurrence_end,
        cap,
        timezone,
    } = params;

    let mut occurrences = Vec::new();
    let mut truncated = false;
    let mut produced: u64 = 0;
    let mut scanned: usize = 0;

    for candidate in Candidates::new(rule, base_start, timezone) {
        if let RuleBound::Count(n) = rule.bound {
            if produced >= u64::from(n) {
                break;
            }
        }
        if let RuleBound::Until(until) = rule.bound {
            if candidate > until {
                break;
            }
        }
        if let Some(bound) = recurrence_end {
            if candidate > bound {
                break;
            }
        }
        if candidate > range_end {
            break;
        }

        // The candidate is live: it counts toward COUNT even when the window
        // or an exception drops it.
        produced += 1;
        scanned += 1;
        if scanned > MAX_CANDIDATES {
            truncated = true;
            break;
        }
        if candidate < range_start {
            continue;
        }
        if occurrences.len() >= cap {
            truncated = true;
            break;
        }

        let date = candidate.with_timezone(&timezone).date_naive();
        let suppressed = exceptions
            .iter()
            .any(|e| e.is_cancelled && e.occurrence_date == date);
        if suppressed {
            continue;
        }

        occurrences.push(Occurrence {
            id: format!("{shift_key}_{}", candidate.to_rfc3339()),
            shift_id: shift_key.to_string(),
            start: candidate,
            end: candidate + duration,
            occurrence_date: Some(date),
        });
    }

    Expansion {
        occurrences,
        truncated,
    }
}

/// One advance of the candidate cursor.
enum NextDate {
    At(NaiveDate),
    /// No candidate at this step (month without the base day-of-month).
    Skip,
    /// Calendar arithmetic ran off the supported range.
    Exhausted,
}

/// Restartable iterator over candidate start instants for a recurrence rule.
///
/// The base start is emitted first, then candidates strictly after it in
/// increasing order. Stepping happens on the local calendar of the expansion
/// time zone, recombining the stepped date with the base start's wall-clock
/// time, so daily and weekly series survive DST transitions at the same local
/// time. A local time erased by a DST gap produces no candidate; an ambiguous
/// (fall-back) local time takes its earliest reading.
struct Candidates {
    timezone: Tz,
    base: DateTime<Utc>,
    /// Local calendar date of the base start.
    anchor: NaiveDate,
    /// Local wall-clock time shared by all candidates.
    time: NaiveTime,
    frequency: Frequency,
    interval: u32,
    /// Weekly only: the weekday set (resolved to the anchor's weekday when
    /// the rule has none), sorted Monday-first.
    weekdays: Vec<Weekday>,
    /// Weekly only: Monday of the anchor's week.
    week_anchor: NaiveDate,
    emitted_base: bool,
    cursor: u64,
}

impl Candidates {
    fn new(rule: &RecurrenceRule, base: DateTime<Utc>, timezone: Tz) -> Self {
        let local = base.with_timezone(&timezone);
        let anchor = local.date_naive();
        let time = local.time();

        let weekdays = if rule.by_weekday.is_empty() {
            vec![anchor.weekday()]
        } else {
            rule.by_weekday.clone()
        };
        let week_anchor =
            anchor - Duration::days(i64::from(anchor.weekday().num_days_from_monday()));

        Candidates {
            timezone,
            base,
            anchor,
            time,
            frequency: rule.frequency,
            interval: rule.interval,
            weekdays,
            week_anchor,
            emitted_base: false,
            cursor: 0,
        }
    }

    fn advance_date(&mut self) -> NextDate {
        let interval = u64::from(self.interval);
        match self.frequency {
            Frequency::Daily => {
                self.cursor += 1;
                let days = match i64::try_from(self.cursor * interval) {
                    Ok(days) => days,
                    Err(_) => return NextDate::Exhausted,
                };
                match self.anchor.checked_add_signed(Duration::days(days)) {
                    Some(date) => NextDate::At(date),
                    None => NextDate::Exhausted,
                }
            }
            Frequency::Weekly => {
                let slots = self.weekdays.len() as u64;
                let week = self.cursor / slots;
                let slot = (self.cursor % slots) as usize;
                self.cursor += 1;
                let days = match i64::try_from(week * interval * 7) {
                    Ok(days) => days,
                    Err(_) => return NextDate::Exhausted,
                };
                let week_start = match self.week_anchor.checked_add_signed(Duration::days(days)) {
                    Some(date) => date,
                    None => return NextDate::Exhausted,
                };
                let offset = i64::from(self.weekdays[slot].num_days_from_monday());
                match week_start.checked_add_signed(Duration::days(offset)) {
                    Some(date) => NextDate::At(date),
                    None => NextDate::Exhausted,
                }
            }
            Frequency::Monthly => {
                self.cursor += 1;
                let months = self.cursor * interval;
                let month0 = i64::from(self.anchor.year()) * 12
                    + i64::from(self.anchor.month0())
                    + months as i64;
                let year = month0.div_euclid(12);
                let month = month0.rem_euclid(12) as u32 + 1;
                let year = match i32::try_from(year) {
                    Ok(year) => year,
                    Err(_) => return NextDate::Exhausted,
                };
                match NaiveDate::from_ymd_opt(year, month, self.anchor.day()) {
                    Some(date) => NextDate::At(date),
                    // No such day this month (e.g. the 31st): no candidate.
                    None => NextDate::Skip,
                }
            }
        }
    }
}

impl Iterator for Candidates {
    type Item = DateTime<Utc>;

    fn next(&mut self) -> Option<DateTime<Utc>> {
        if !self.emitted_base {
            self.emitted_base = true;
            return Some(self.base);
        }
        loop {
            let date = match self.advance_date() {
                NextDate::At(date) => date,
                NextDate::Skip => continue,
                NextDate::Exhausted => return None,
            };
            // Weekly week 0 can yield dates at or before the anchor; those
            // were either the base itself or never part of the series.
            if let Some(instant) = local_instant(self.timezone, date, self.time) {
                if instant > self.base {
                    return Some(instant);
                }
            }
        }
    }
}

/// Resolve a local date + wall-clock time to a UTC instant. A fall-back
/// ambiguity takes the earlier reading; a spring-forward gap yields `None`.
fn local_instant(timezone: Tz, date: NaiveDate, time: NaiveTime) -> Option<DateTime<Utc>> {
    timezone
        .from_local_datetime(&date.and_time(time))
        .earliest()
        .map(|dt| dt.with_timezone(&Utc))
}
