//! Error types for shift-engine operations.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum ScheduleError {
    #[error("Invalid recurrence rule: {0}")]
    InvalidRule(String),

    #[error("Invalid timezone: {0}")]
    InvalidTimezone(String),

    #[error("Invalid shift definition: {0}")]
    InvalidShift(String),
}

pub type Result<T> = std::result::Result<T, ScheduleError>;
