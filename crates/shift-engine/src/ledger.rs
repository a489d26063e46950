//! Serialized signup writes.
//!
//! The evaluator's capacity check is necessary but not sufficient: two
//! requests can both pass evaluation and race for the last open slot. The
//! authoritative guarantee is a check-then-insert under one lock that
//! re-derives the confirmed count from the rows themselves. [`SignupLedger`]
//! is the in-memory reference shape of that contract; a relational
//! persistence layer implements the same sequence inside a transaction and
//! surfaces the losing request's overflow as "shift full".
//!
//! The ledger never reads the system clock — `sign_up` takes a caller-supplied
//! `now` anchor, like every other instant in this crate.

use std::sync::Mutex;

use chrono::{DateTime, NaiveDate, Utc};

use crate::eligibility::{evaluate_signup, HeldSignup, RejectionReason, SignupVerdict};
use crate::model::{Occurrence, ShiftDefinition, ShiftSignup, SignupStatus, Worker, WorkStation};

/// In-memory signup store with serialized writes.
#[derive(Debug, Default)]
pub struct SignupLedger {
    inner: Mutex<LedgerInner>,
}

#[derive(Debug, Default)]
struct LedgerInner {
    entries: Vec<LedgerEntry>,
    next_id: u64,
}

/// A signup row denormalized with the interval and title of its occurrence,
/// so conflict checks need no second lookup.
#[derive(Debug, Clone)]
struct LedgerEntry {
    signup: ShiftSignup,
    shift_title: String,
    start: DateTime<Utc>,
    end: DateTime<Utc>,
}

impl LedgerInner {
    fn confirmed_count(&self, shift_id: &str, occurrence_date: Option<NaiveDate>) -> u32 {
        self.entries
            .iter()
            .filter(|e| {
                e.signup.status == SignupStatus::Confirmed
                    && e.signup.shift_id == shift_id
                    && e.signup.occurrence_date == occurrence_date
            })
            .count() as u32
    }

    fn held_by(&self, worker_id: &str) -> Vec<HeldSignup> {
        self.entries
            .iter()
            .filter(|e| e.signup.status == SignupStatus::Confirmed && e.signup.worker_id == worker_id)
            .map(|e| HeldSignup {
                shift_id: e.signup.shift_id.clone(),
                shift_title: e.shift_title.clone(),
                start: e.start,
                end: e.end,
                occurrence_date: e.signup.occurrence_date,
            })
            .collect()
    }
}

impl SignupLedger {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, LedgerInner> {
        // A poisoned lock only means another writer panicked mid-read; the
        // rows themselves are append-only and remain usable.
        self.inner.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// CONFIRMED signups held on one (shift, occurrence date).
    pub fn confirmed_count(&self, shift_id: &str, occurrence_date: Option<NaiveDate>) -> u32 {
        self.lock().confirmed_count(shift_id, occurrence_date)
    }

    /// The worker's CONFIRMED signups, resolved to effective intervals.
    pub fn held_by(&self, worker_id: &str) -> Vec<HeldSignup> {
        self.lock().held_by(worker_id)
    }

    /// Claim an occurrence for a worker.
    ///
    /// The confirmed count and the worker's held intervals are re-derived and
    /// the full evaluation re-run inside the lock, so two racing claims on
    /// the last slot cannot both succeed — the loser observes
    /// [`RejectionReason::ShiftFull`]. On admission a CONFIRMED row is
    /// inserted and returned.
    ///
    /// # Errors
    ///
    /// Returns the [`RejectionReason`] of the first failed check.
    pub fn sign_up(
        &self,
        definition: &ShiftDefinition,
        occurrence: &Occurrence,
        station: &WorkStation,
        worker: &Worker,
        now: DateTime<Utc>,
    ) -> Result<ShiftSignup, RejectionReason> {
        let mut inner = self.lock();

        let confirmed = inner.confirmed_count(&definition.id, occurrence.occurrence_date);
        let held = inner.held_by(&worker.id);

        match evaluate_signup(definition, occurrence, station, worker, confirmed, &held) {
            SignupVerdict::Rejected(reason) => Err(reason),
            SignupVerdict::Admissible => {
                let signup = ShiftSignup {
                    id: format!("signup-{:06}", inner.next_id),
                    shift_id: definition.id.clone(),
                    worker_id: worker.id.clone(),
                    occurrence_date: occurrence.occurrence_date,
                    status: SignupStatus::Confirmed,
                    created_at: now,
                };
                inner.next_id += 1;
                inner.entries.push(LedgerEntry {
                    signup: signup.clone(),
                    shift_title: definition.title.clone(),
                    start: occurrence.start,
                    end: occurrence.end,
                });
                Ok(signup)
            }
        }
    }

    /// Withdraw a worker's CONFIRMED signup on one (shift, occurrence date).
    ///
    /// The row transitions to CANCELLED and stays in the ledger; it is never
    /// deleted. Returns `false` when no matching CONFIRMED row exists.
    /// Signing up again afterwards re-runs the full evaluation and creates a
    /// fresh row.
    pub fn withdraw(
        &self,
        shift_id: &str,
        worker_id: &str,
        occurrence_date: Option<NaiveDate>,
    ) -> bool {
        let mut inner = self.lock();
        let entry = inner.entries.iter_mut().find(|e| {
            e.signup.status == SignupStatus::Confirmed
                && e.signup.shift_id == shift_id
                && e.signup.worker_id == worker_id
                && e.signup.occurrence_date == occurrence_date
        });
        match entry {
            Some(entry) => {
                entry.signup.status = SignupStatus::Cancelled;
                true
            }
            None => false,
        }
    }
}
