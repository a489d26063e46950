//! # shift-engine
//!
//! Occurrence expansion and signup rules for workshop shift scheduling.
//!
//! The engine turns stored shift definitions into concrete, time-bounded
//! occurrences and decides whether a worker may claim one. Every computation
//! is pure: no I/O, no system clock access — callers supply each instant,
//! which keeps the engine deterministic, testable, and safe to call from
//! concurrent request handlers. The one stateful piece, the signup ledger,
//! exists precisely to make the required write-time serialization explicit.
//!
//! ## Modules
//!
//! - [`rule`] — the recurrence grammar (`FREQ=…;INTERVAL=…;BYDAY=…`) parsed
//!   into a typed rule
//! - [`expander`] — recurrence rule + base shift → ordered concrete
//!   occurrences within a query window
//! - [`eligibility`] — capacity / duplicate / time-conflict / skill checks
//!   for a signup attempt
//! - [`ledger`] — serialized check-then-insert reference for signup writes
//! - [`calendar`] — one-time and recurring shifts merged into a calendar feed
//! - [`model`] — stations, shifts, exceptions, signups, workers
//! - [`error`] — error types

pub mod calendar;
pub mod eligibility;
pub mod error;
pub mod expander;
pub mod ledger;
pub mod model;
pub mod rule;

pub use calendar::{calendar_events, CalendarEvent, CalendarFeed, SkippedShift};
pub use eligibility::{
    evaluate_signup, summarize_availability, AvailabilitySummary, ConflictingShift, HeldSignup,
    RejectionReason, SignupVerdict,
};
pub use error::ScheduleError;
pub use expander::{
    expand_occurrences, expand_occurrences_with, preview_occurrences, ExpandOptions, Expansion,
    MAX_OCCURRENCES, PREVIEW_HORIZON_DAYS,
};
pub use ledger::SignupLedger;
pub use model::{
    Occurrence, RecurrenceException, ShiftDefinition, ShiftSignup, SignupStatus, WorkStation,
    Worker,
};
pub use rule::{Frequency, RecurrenceRule, RuleBound};
