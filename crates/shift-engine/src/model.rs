//! Records for stations, shifts, signups, and derived occurrences.
//!
//! These are plain data carriers. The persistence layer owns their lifecycle;
//! the computations in [`crate::expander`] and [`crate::eligibility`] only
//! ever read them.

use std::collections::BTreeSet;

use chrono::{DateTime, Duration, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{Result, ScheduleError};
use crate::rule::RecurrenceRule;

/// A work station that shifts are scheduled against.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorkStation {
    pub id: String,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
    /// Skills a worker must hold to take a shift here. Empty admits anyone.
    #[serde(default)]
    pub required_skills: BTreeSet<String>,
}

/// A schedulable unit of work, either one-time or recurring.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ShiftDefinition {
    pub id: String,
    pub title: String,
    pub station_id: String,
    /// Base start instant. For recurring shifts this anchors the series and is
    /// always its first candidate occurrence.
    pub start: DateTime<Utc>,
    /// Base end instant. Must be after `start`; every occurrence carries the
    /// duration `end - start`.
    pub end: DateTime<Utc>,
    pub capacity: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
    #[serde(default)]
    pub is_recurring: bool,
    /// Recurrence grammar text (see [`crate::rule`]). Present iff
    /// `is_recurring`; ignored otherwise.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub recurrence_rule: Option<String>,
    /// Absolute upper bound on occurrence start instants, inclusive.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub recurrence_end: Option<DateTime<Utc>>,
    #[serde(default)]
    pub is_cancelled: bool,
}

impl ShiftDefinition {
    /// Base duration carried by every occurrence of this definition.
    pub fn duration(&self) -> Duration {
        self.end - self.start
    }

    /// Parse the stored recurrence rule.
    ///
    /// Returns `Ok(None)` for one-time shifts. A recurring shift without rule
    /// text is malformed.
    pub fn parsed_rule(&self) -> Result<Option<RecurrenceRule>> {
        if !self.is_recurring {
            return Ok(None);
        }
        let text = self.recurrence_rule.as_deref().ok_or_else(|| {
            ScheduleError::InvalidShift(format!("recurring shift '{}' has no recurrence rule", self.id))
        })?;
        RecurrenceRule::parse(text).map(Some)
    }

    /// Check the record invariants: a positive interval, a positive capacity,
    /// and a parseable rule when recurring.
    pub fn validate(&self) -> Result<()> {
        if self.end <= self.start {
            return Err(ScheduleError::InvalidShift(format!(
                "shift '{}' ends at or before it starts",
                self.id
            )));
        }
        if self.capacity == 0 {
            return Err(ScheduleError::InvalidShift(format!(
                "shift '{}' has zero capacity",
                self.id
            )));
        }
        self.parsed_rule()?;
        Ok(())
    }
}

/// An override for one calendar date of a recurring shift.
///
/// Matching is at day granularity; a cancelling exception suppresses that
/// date's occurrence entirely. At most one exception exists per
/// (shift, date) pair.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecurrenceException {
    pub shift_id: String,
    pub occurrence_date: NaiveDate,
    #[serde(default)]
    pub is_cancelled: bool,
}

/// A concrete instance of a shift at a specific start/end.
///
/// Derived on demand, never persisted. For one-time shifts the occurrence is
/// the definition's own interval, its id is the shift id, and
/// `occurrence_date` is `None`. For recurring shifts the id is
/// `"<shift_id>_<RFC 3339 start>"`, stable across repeated expansions of the
/// same window.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Occurrence {
    pub id: String,
    pub shift_id: String,
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
    /// Calendar-date key used for exception matching and signup scoping.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub occurrence_date: Option<NaiveDate>,
}

/// Signup lifecycle state. Cancellation transitions status; rows are never
/// deleted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SignupStatus {
    Confirmed,
    Cancelled,
    NoShow,
}

/// A worker's claim on a shift occurrence.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ShiftSignup {
    pub id: String,
    pub shift_id: String,
    pub worker_id: String,
    /// `None` for one-time shifts, otherwise the claimed occurrence's date.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub occurrence_date: Option<NaiveDate>,
    pub status: SignupStatus,
    pub created_at: DateTime<Utc>,
}

/// A worker and the skills they hold.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Worker {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub skills: BTreeSet<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn base_shift() -> ShiftDefinition {
        ShiftDefinition {
            id: "shift-1".to_string(),
            title: "Lathe morning".to_string(),
            station_id: "station-1".to_string(),
            start: Utc.with_ymd_and_hms(2026, 3, 2, 8, 0, 0).unwrap(),
            end: Utc.with_ymd_and_hms(2026, 3, 2, 16, 0, 0).unwrap(),
            capacity: 2,
            notes: None,
            is_recurring: false,
            recurrence_rule: None,
            recurrence_end: None,
            is_cancelled: false,
        }
    }

    #[test]
    fn test_duration_is_end_minus_start() {
        assert_eq!(base_shift().duration(), Duration::hours(8));
    }

    #[test]
    fn test_validate_accepts_one_time_shift() {
        assert!(base_shift().validate().is_ok());
    }

    #[test]
    fn test_validate_rejects_inverted_interval() {
        let mut shift = base_shift();
        shift.end = shift.start;
        assert!(shift.validate().is_err());
    }

    #[test]
    fn test_validate_rejects_zero_capacity() {
        let mut shift = base_shift();
        shift.capacity = 0;
        assert!(shift.validate().is_err());
    }

    #[test]
    fn test_validate_requires_rule_when_recurring() {
        let mut shift = base_shift();
        shift.is_recurring = true;
        assert!(shift.validate().is_err());

        shift.recurrence_rule = Some("FREQ=DAILY;INTERVAL=1".to_string());
        assert!(shift.validate().is_ok());

        shift.recurrence_rule = Some("FREQ=HOURLY".to_string());
        assert!(shift.validate().is_err());
    }

    #[test]
    fn test_rule_text_ignored_when_not_recurring() {
        let mut shift = base_shift();
        shift.recurrence_rule = Some("not a rule".to_string());
        assert!(shift.parsed_rule().unwrap().is_none());
        assert!(shift.validate().is_ok());
    }

    #[test]
    fn test_signup_status_wire_format() {
        let json = serde_json::to_string(&SignupStatus::NoShow).unwrap();
        assert_eq!(json, "\"NO_SHOW\"");
        let back: SignupStatus = serde_json::from_str("\"CONFIRMED\"").unwrap();
        assert_eq!(back, SignupStatus::Confirmed);
    }
}
