//! Calendar feed assembly.
//!
//! Merges one-time shifts and expanded recurring occurrences for a query
//! window into a single start-ordered event list. A shift whose rule fails to
//! parse contributes no events and is reported in [`CalendarFeed::skipped`];
//! one bad rule never takes down the whole feed.

use std::collections::HashMap;

use chrono::{DateTime, NaiveDate, Utc};
use serde::Serialize;

use crate::expander::{expand_occurrences_with, ExpandOptions};
use crate::model::{RecurrenceException, ShiftDefinition};

/// One renderable calendar entry.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CalendarEvent {
    /// Occurrence id: the shift id for one-time shifts, composite for
    /// recurring occurrences.
    pub id: String,
    pub shift_id: String,
    pub title: String,
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
    pub station_id: String,
    pub capacity: u32,
    /// Confirmed signups on the owning shift. Display-grade; the write path
    /// re-derives its own count.
    pub confirmed: u32,
    pub is_recurring: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub occurrence_date: Option<NaiveDate>,
}

/// A shift left out of the feed, and why.
#[derive(Debug, Clone, Serialize)]
pub struct SkippedShift {
    pub shift_id: String,
    pub reason: String,
}

/// The assembled feed.
#[derive(Debug, Clone, Serialize)]
pub struct CalendarFeed {
    pub events: Vec<CalendarEvent>,
    pub skipped: Vec<SkippedShift>,
}

/// Assemble the calendar feed for `[range_start, range_end]`.
///
/// `exceptions` may span all shifts; they are routed to their owning shift
/// here. `confirmed` maps shift ids to confirmed signup counts and defaults
/// to zero for absent shifts. Events are ordered by start instant, ties
/// broken by id so the feed is stable.
pub fn calendar_events(
    shifts: &[ShiftDefinition],
    exceptions: &[RecurrenceException],
    confirmed: &HashMap<String, u32>,
    range_start: DateTime<Utc>,
    range_end: DateTime<Utc>,
    options: &ExpandOptions,
) -> CalendarFeed {
    let mut events = Vec::new();
    let mut skipped = Vec::new();

    for shift in shifts {
        let own_exceptions: Vec<RecurrenceException> = exceptions
            .iter()
            .filter(|e| e.shift_id == shift.id)
            .cloned()
            .collect();

        match expand_occurrences_with(shift, &own_exceptions, range_start, range_end, options) {
            Ok(expansion) => {
                let count = confirmed.get(&shift.id).copied().unwrap_or(0);
                events.extend(expansion.occurrences.into_iter().map(|occ| CalendarEvent {
                    id: occ.id,
                    shift_id: shift.id.clone(),
                    title: shift.title.clone(),
                    start: occ.start,
                    end: occ.end,
                    station_id: shift.station_id.clone(),
                    capacity: shift.capacity,
                    confirmed: count,
                    is_recurring: shift.is_recurring,
                    occurrence_date: occ.occurrence_date,
                }));
            }
            Err(err) => skipped.push(SkippedShift {
                shift_id: shift.id.clone(),
                reason: err.to_string(),
            }),
        }
    }

    events.sort_by(|a, b| a.start.cmp(&b.start).then_with(|| a.id.cmp(&b.id)));

    CalendarFeed { events, skipped }
}
