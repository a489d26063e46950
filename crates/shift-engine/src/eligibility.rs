//! Signup admissibility: the fixed-order rule chain deciding whether a
//! worker may claim an occurrence.
//!
//! [`evaluate_signup`] is pure — it compares the inputs it is handed and
//! returns a structured verdict, never an exception. Checks run in a fixed
//! order and short-circuit on the first failure: cancelled, capacity,
//! duplicate, time conflict, skills. The capacity check here is necessary but
//! not sufficient; the authoritative guarantee is the write-time re-check in
//! [`crate::ledger`], since two evaluations may race for the last slot.

use std::collections::BTreeSet;
use std::fmt;

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::model::{Occurrence, ShiftDefinition, Worker, WorkStation};

/// A worker's existing CONFIRMED signup, resolved to its effective interval.
///
/// Callers resolve recurring signups through the expander before evaluation;
/// the evaluator only compares instants.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HeldSignup {
    pub shift_id: String,
    pub shift_title: String,
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub occurrence_date: Option<NaiveDate>,
}

/// An existing signup that blocks a new claim, reported back to the worker.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConflictingShift {
    pub shift_id: String,
    pub title: String,
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

/// Why a signup attempt was rejected.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum RejectionReason {
    ShiftCancelled,
    ShiftFull,
    AlreadySignedUp,
    TimeConflict(Vec<ConflictingShift>),
    MissingSkills(BTreeSet<String>),
}

impl fmt::Display for RejectionReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RejectionReason::ShiftCancelled => write!(f, "This shift has been cancelled"),
            RejectionReason::ShiftFull => write!(f, "This shift is full"),
            RejectionReason::AlreadySignedUp => {
                write!(f, "You are already signed up for this shift")
            }
            RejectionReason::TimeConflict(conflicts) => {
                let titles: Vec<&str> = conflicts.iter().map(|c| c.title.as_str()).collect();
                write!(f, "Time conflict with: {}", titles.join(", "))
            }
            RejectionReason::MissingSkills(missing) => {
                let skills: Vec<&str> = missing.iter().map(String::as_str).collect();
                write!(f, "Missing required skills: {}", skills.join(", "))
            }
        }
    }
}

/// The outcome of evaluating a signup attempt.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum SignupVerdict {
    Admissible,
    Rejected(RejectionReason),
}

impl SignupVerdict {
    pub fn is_admissible(&self) -> bool {
        matches!(self, SignupVerdict::Admissible)
    }
}

/// Decide whether `worker` may claim `occurrence`.
///
/// `confirmed_count` is the number of CONFIRMED signups already held on this
/// (shift, occurrence date); `existing` is the worker's own CONFIRMED signups
/// with effective intervals. Checks run in a fixed order and the first
/// failure wins:
///
/// 1. the owning definition is cancelled → [`RejectionReason::ShiftCancelled`]
/// 2. `confirmed_count` has reached capacity → [`RejectionReason::ShiftFull`]
/// 3. the worker already holds this (shift, date) → [`RejectionReason::AlreadySignedUp`]
/// 4. another held signup overlaps `[start, end)` → [`RejectionReason::TimeConflict`]
/// 5. the station requires skills the worker lacks → [`RejectionReason::MissingSkills`]
///
/// Overlap is the half-open interval test `other.start < end && other.end >
/// start`, so back-to-back shifts never conflict. A station with no required
/// skills admits any worker.
pub fn evaluate_signup(
    definition: &ShiftDefinition,
    occurrence: &Occurrence,
    station: &WorkStation,
    worker: &Worker,
    confirmed_count: u32,
    existing: &[HeldSignup],
) -> SignupVerdict {
    if definition.is_cancelled {
        return SignupVerdict::Rejected(RejectionReason::ShiftCancelled);
    }

    if confirmed_count >= definition.capacity {
        return SignupVerdict::Rejected(RejectionReason::ShiftFull);
    }

    let duplicate = existing.iter().any(|held| {
        held.shift_id == definition.id && held.occurrence_date == occurrence.occurrence_date
    });
    if duplicate {
        return SignupVerdict::Rejected(RejectionReason::AlreadySignedUp);
    }

    let conflicts: Vec<ConflictingShift> = existing
        .iter()
        .filter(|held| held.start < occurrence.end && held.end > occurrence.start)
        .map(|held| ConflictingShift {
            shift_id: held.shift_id.clone(),
            title: held.shift_title.clone(),
            start: held.start,
            end: held.end,
        })
        .collect();
    if !conflicts.is_empty() {
        return SignupVerdict::Rejected(RejectionReason::TimeConflict(conflicts));
    }

    let missing: BTreeSet<String> = station
        .required_skills
        .difference(&worker.skills)
        .cloned()
        .collect();
    if !missing.is_empty() {
        return SignupVerdict::Rejected(RejectionReason::MissingSkills(missing));
    }

    SignupVerdict::Admissible
}

/// Eligibility badge for a shift listing.
///
/// Computed from a possibly stale confirmed count — good enough for display.
/// The authoritative capacity decision happens at write time.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AvailabilitySummary {
    pub open_slots: u32,
    pub can_sign_up: bool,
    pub missing_skills: BTreeSet<String>,
}

/// Summarize a shift's standing for a worker browsing open shifts.
pub fn summarize_availability(
    definition: &ShiftDefinition,
    station: &WorkStation,
    worker: &Worker,
    confirmed_count: u32,
) -> AvailabilitySummary {
    let open_slots = definition.capacity.saturating_sub(confirmed_count);
    let missing_skills: BTreeSet<String> = station
        .required_skills
        .difference(&worker.skills)
        .cloned()
        .collect();
    AvailabilitySummary {
        open_slots,
        can_sign_up: !definition.is_cancelled && open_slots > 0 && missing_skills.is_empty(),
        missing_skills,
    }
}
