//! The recurrence rule grammar.
//!
//! Rules are stored and exchanged as compact text:
//!
//! ```text
//! FREQ=WEEKLY;INTERVAL=2;BYDAY=MO,WE,FR;COUNT=10
//! ```
//!
//! Parts are `;`-separated `KEY=VALUE` pairs in any order. Unknown keys are
//! ignored so stored rules survive grammar growth; a leading `RRULE:` marker
//! is accepted because the builder that originally wrote these rules emitted
//! one. `UNTIL` accepts both RFC 3339 and the compact form
//! `YYYYMMDDTHHMMSSZ` found in stored rules.
//!
//! Parsing never guesses: any part that is present but malformed is an
//! [`ScheduleError::InvalidRule`], and callers degrade to an empty occurrence
//! sequence rather than expanding a rule they cannot trust.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc, Weekday};

use crate::error::{Result, ScheduleError};

/// Step unit of a recurrence rule.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Frequency {
    Daily,
    Weekly,
    Monthly,
}

/// Termination of a recurrence series.
///
/// At most one of `COUNT`/`UNTIL` may appear in a rule; with neither, the
/// series is unbounded and only the shift's recurrence end (or the query
/// window) bounds expansion.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RuleBound {
    /// Unbounded series.
    #[default]
    None,
    /// Maximum number of candidate occurrences, counted from the base start
    /// inclusive.
    Count(u32),
    /// Inclusive upper bound on candidate start instants.
    Until(DateTime<Utc>),
}

/// A parsed recurrence rule.
#[derive(Debug, Clone, PartialEq)]
pub struct RecurrenceRule {
    pub frequency: Frequency,
    /// Step between occurrences in units of `frequency`. Always ≥ 1.
    pub interval: u32,
    /// Weekday filter for weekly rules, sorted Monday-first and deduplicated.
    /// Empty means "the weekday of the base start".
    pub by_weekday: Vec<Weekday>,
    pub bound: RuleBound,
}

impl RecurrenceRule {
    /// Parse rule text into a typed rule.
    ///
    /// # Errors
    ///
    /// Returns [`ScheduleError::InvalidRule`] when `FREQ` is missing or
    /// unsupported, a numeric field does not parse or is zero, a weekday code
    /// is unknown, `BYDAY` is present but empty, `UNTIL` is not a recognized
    /// instant, or `COUNT` and `UNTIL` are both set.
    pub fn parse(text: &str) -> Result<Self> {
        let text = text.trim();
        let body = text.strip_prefix("RRULE:").unwrap_or(text);
        if body.is_empty() {
            return Err(ScheduleError::InvalidRule("empty rule".to_string()));
        }

        let mut frequency = None;
        let mut interval: u32 = 1;
        let mut by_weekday: Vec<Weekday> = Vec::new();
        let mut count: Option<u32> = None;
        let mut until: Option<DateTime<Utc>> = None;

        for part in body.split(';') {
            let part = part.trim();
            if part.is_empty() {
                continue;
            }
            let (key, value) = part.split_once('=').ok_or_else(|| {
                ScheduleError::InvalidRule(format!("expected KEY=VALUE, got '{part}'"))
            })?;

            match key.to_ascii_uppercase().as_str() {
                "FREQ" => {
                    frequency = Some(match value.to_ascii_uppercase().as_str() {
                        "DAILY" => Frequency::Daily,
                        "WEEKLY" => Frequency::Weekly,
                        "MONTHLY" => Frequency::Monthly,
                        other => {
                            return Err(ScheduleError::InvalidRule(format!(
                                "unsupported FREQ '{other}'"
                            )));
                        }
                    });
                }
                "INTERVAL" => {
                    interval = value.parse().map_err(|_| {
                        ScheduleError::InvalidRule(format!("invalid INTERVAL '{value}'"))
                    })?;
                    if interval == 0 {
                        return Err(ScheduleError::InvalidRule(
                            "INTERVAL must be positive".to_string(),
                        ));
                    }
                }
                "BYDAY" => {
                    by_weekday = value
                        .split(',')
                        .map(|code| parse_weekday_code(code.trim()))
                        .collect::<Result<Vec<_>>>()?;
                }
                "COUNT" => {
                    let n: u32 = value.parse().map_err(|_| {
                        ScheduleError::InvalidRule(format!("invalid COUNT '{value}'"))
                    })?;
                    if n == 0 {
                        return Err(ScheduleError::InvalidRule(
                            "COUNT must be positive".to_string(),
                        ));
                    }
                    count = Some(n);
                }
                "UNTIL" => until = Some(parse_until(value)?),
                // Unknown keys (BYHOUR, WKST, ...) are ignored.
                _ => {}
            }
        }

        let frequency = frequency
            .ok_or_else(|| ScheduleError::InvalidRule("missing FREQ".to_string()))?;

        let bound = match (count, until) {
            (Some(_), Some(_)) => {
                return Err(ScheduleError::InvalidRule(
                    "COUNT and UNTIL are mutually exclusive".to_string(),
                ));
            }
            (Some(n), None) => RuleBound::Count(n),
            (None, Some(t)) => RuleBound::Until(t),
            (None, None) => RuleBound::None,
        };

        // Set semantics for the weekday filter: Monday-first, no duplicates.
        by_weekday.sort_by_key(|wd| wd.num_days_from_monday());
        by_weekday.dedup();

        Ok(RecurrenceRule {
            frequency,
            interval,
            by_weekday,
            bound,
        })
    }
}

impl FromStr for RecurrenceRule {
    type Err = ScheduleError;

    fn from_str(s: &str) -> Result<Self> {
        RecurrenceRule::parse(s)
    }
}

impl fmt::Display for RecurrenceRule {
    /// Canonical rule text: `FREQ` first, then `INTERVAL`, `BYDAY`, and the
    /// bound. `UNTIL` serializes in the compact form stored rules use.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let freq = match self.frequency {
            Frequency::Daily => "DAILY",
            Frequency::Weekly => "WEEKLY",
            Frequency::Monthly => "MONTHLY",
        };
        write!(f, "FREQ={freq};INTERVAL={}", self.interval)?;
        if !self.by_weekday.is_empty() {
            let codes: Vec<&str> = self.by_weekday.iter().map(|wd| weekday_code(*wd)).collect();
            write!(f, ";BYDAY={}", codes.join(","))?;
        }
        match self.bound {
            RuleBound::None => Ok(()),
            RuleBound::Count(n) => write!(f, ";COUNT={n}"),
            RuleBound::Until(t) => write!(f, ";UNTIL={}", t.format("%Y%m%dT%H%M%SZ")),
        }
    }
}

/// Parse a two-letter weekday code (`MO`..`SU`, case-insensitive).
fn parse_weekday_code(code: &str) -> Result<Weekday> {
    match code.to_ascii_uppercase().as_str() {
        "MO" => Ok(Weekday::Mon),
        "TU" => Ok(Weekday::Tue),
        "WE" => Ok(Weekday::Wed),
        "TH" => Ok(Weekday::Thu),
        "FR" => Ok(Weekday::Fri),
        "SA" => Ok(Weekday::Sat),
        "SU" => Ok(Weekday::Sun),
        other => Err(ScheduleError::InvalidRule(format!(
            "unknown weekday code '{other}'"
        ))),
    }
}

/// The two-letter code for a weekday.
fn weekday_code(wd: Weekday) -> &'static str {
    match wd {
        Weekday::Mon => "MO",
        Weekday::Tue => "TU",
        Weekday::Wed => "WE",
        Weekday::Thu => "TH",
        Weekday::Fri => "FR",
        Weekday::Sat => "SA",
        Weekday::Sun => "SU",
    }
}

/// Parse an `UNTIL` value: RFC 3339, compact `YYYYMMDDTHHMMSSZ`, or a bare
/// `YYYYMMDD` date (midnight UTC).
fn parse_until(value: &str) -> Result<DateTime<Utc>> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(value) {
        return Ok(dt.with_timezone(&Utc));
    }
    if let Ok(naive) = NaiveDateTime::parse_from_str(value, "%Y%m%dT%H%M%SZ") {
        return Ok(naive.and_utc());
    }
    if let Ok(date) = NaiveDate::parse_from_str(value, "%Y%m%d") {
        return Ok(date.and_time(chrono::NaiveTime::MIN).and_utc());
    }
    Err(ScheduleError::InvalidRule(format!("invalid UNTIL '{value}'")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_parse_minimal_daily() {
        let rule = RecurrenceRule::parse("FREQ=DAILY").unwrap();
        assert_eq!(rule.frequency, Frequency::Daily);
        assert_eq!(rule.interval, 1);
        assert!(rule.by_weekday.is_empty());
        assert_eq!(rule.bound, RuleBound::None);
    }

    #[test]
    fn test_parse_weekly_with_byday() {
        let rule = RecurrenceRule::parse("FREQ=WEEKLY;INTERVAL=2;BYDAY=MO,WE,FR").unwrap();
        assert_eq!(rule.frequency, Frequency::Weekly);
        assert_eq!(rule.interval, 2);
        assert_eq!(
            rule.by_weekday,
            vec![Weekday::Mon, Weekday::Wed, Weekday::Fri]
        );
    }

    #[test]
    fn test_parse_is_order_insensitive() {
        let a = RecurrenceRule::parse("FREQ=WEEKLY;BYDAY=TU;COUNT=5").unwrap();
        let b = RecurrenceRule::parse("COUNT=5;BYDAY=TU;FREQ=WEEKLY").unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn test_parse_ignores_unknown_keys() {
        let rule = RecurrenceRule::parse("FREQ=DAILY;BYHOUR=9;WKST=MO;X-FOO=1").unwrap();
        assert_eq!(rule.frequency, Frequency::Daily);
    }

    #[test]
    fn test_parse_accepts_rrule_prefix() {
        let rule = RecurrenceRule::parse("RRULE:FREQ=WEEKLY;BYDAY=SA,SU").unwrap();
        assert_eq!(rule.by_weekday, vec![Weekday::Sat, Weekday::Sun]);
    }

    #[test]
    fn test_parse_sorts_and_dedups_byday() {
        let rule = RecurrenceRule::parse("FREQ=WEEKLY;BYDAY=FR,MO,FR,WE").unwrap();
        assert_eq!(
            rule.by_weekday,
            vec![Weekday::Mon, Weekday::Wed, Weekday::Fri]
        );
    }

    #[test]
    fn test_parse_until_rfc3339() {
        let rule = RecurrenceRule::parse("FREQ=DAILY;UNTIL=2026-04-01T08:00:00Z").unwrap();
        let expected = Utc.with_ymd_and_hms(2026, 4, 1, 8, 0, 0).unwrap();
        assert_eq!(rule.bound, RuleBound::Until(expected));
    }

    #[test]
    fn test_parse_until_compact_form() {
        let rule = RecurrenceRule::parse("FREQ=DAILY;UNTIL=20260401T080000Z").unwrap();
        let expected = Utc.with_ymd_and_hms(2026, 4, 1, 8, 0, 0).unwrap();
        assert_eq!(rule.bound, RuleBound::Until(expected));
    }

    #[test]
    fn test_parse_until_bare_date() {
        let rule = RecurrenceRule::parse("FREQ=DAILY;UNTIL=20260401").unwrap();
        let expected = Utc.with_ymd_and_hms(2026, 4, 1, 0, 0, 0).unwrap();
        assert_eq!(rule.bound, RuleBound::Until(expected));
    }

    #[test]
    fn test_parse_rejects_count_and_until_together() {
        let err = RecurrenceRule::parse("FREQ=DAILY;COUNT=3;UNTIL=20260401T000000Z");
        assert!(err.is_err());
        let msg = err.unwrap_err().to_string();
        assert!(msg.contains("mutually exclusive"), "got: {msg}");
    }

    #[test]
    fn test_parse_rejects_missing_freq() {
        assert!(RecurrenceRule::parse("INTERVAL=2").is_err());
    }

    #[test]
    fn test_parse_rejects_unsupported_freq() {
        assert!(RecurrenceRule::parse("FREQ=HOURLY").is_err());
    }

    #[test]
    fn test_parse_rejects_zero_interval() {
        assert!(RecurrenceRule::parse("FREQ=DAILY;INTERVAL=0").is_err());
    }

    #[test]
    fn test_parse_rejects_zero_count() {
        assert!(RecurrenceRule::parse("FREQ=DAILY;COUNT=0").is_err());
    }

    #[test]
    fn test_parse_rejects_bad_weekday_code() {
        assert!(RecurrenceRule::parse("FREQ=WEEKLY;BYDAY=MO,XX").is_err());
    }

    #[test]
    fn test_parse_rejects_empty_byday() {
        assert!(RecurrenceRule::parse("FREQ=WEEKLY;BYDAY=").is_err());
    }

    #[test]
    fn test_parse_rejects_empty_rule() {
        assert!(RecurrenceRule::parse("").is_err());
        assert!(RecurrenceRule::parse("RRULE:").is_err());
    }

    #[test]
    fn test_display_round_trips() {
        for text in [
            "FREQ=DAILY;INTERVAL=1",
            "FREQ=WEEKLY;INTERVAL=2;BYDAY=MO,WE,FR",
            "FREQ=MONTHLY;INTERVAL=3;COUNT=12",
            "FREQ=DAILY;INTERVAL=1;UNTIL=20260401T080000Z",
        ] {
            let rule = RecurrenceRule::parse(text).unwrap();
            assert_eq!(rule.to_string(), text);
            assert_eq!(RecurrenceRule::parse(&rule.to_string()).unwrap(), rule);
        }
    }
}
