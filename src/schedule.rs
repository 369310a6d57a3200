//! Cron expression handling for scheduled reports.
//!
//! Job definitions use the standard five-field cron form (minute, hour,
//! day-of-month, month, day-of-week). The `cron` crate expects a seconds
//! field, so a `0` is prepended before parsing.

use std::str::FromStr;

use chrono::{DateTime, Utc};
use cron::Schedule;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum CronError {
    #[error("invalid cron expression '{0}': {1}")]
    Parse(String, String),

    #[error("cron expression '{0}' has no future occurrence")]
    Exhausted(String),
}

pub fn parse_cron(expression: &str) -> Result<Schedule, CronError> {
    let fields = expression.split_whitespace().count();
    if fields != 5 {
        return Err(CronError::Parse(
            expression.to_string(),
            format!("expected 5 fields, got {fields}"),
        ));
    }
    Schedule::from_str(&format!("0 {}", expression.trim()))
        .map_err(|e| CronError::Parse(expression.to_string(), e.to_string()))
}

/// First occurrence strictly after `after`.
pub fn next_occurrence(
    expression: &str,
    after: DateTime<Utc>,
) -> Result<DateTime<Utc>, CronError> {
    let schedule = parse_cron(expression)?;
    schedule
        .after(&after)
        .next()
        .ok_or_else(|| CronError::Exhausted(expression.to_string()))
}

#[cfg(test)]
mod tests {
    use chrono::TimeZone;

    use super::*;

    fn at(y: i32, mo: u32, d: u32, h: u32, mi: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(y, mo, d, h, mi, 0).unwrap()
    }

    #[test]
    fn five_field_expression_parses() {
        assert!(parse_cron("0 */4 * * *").is_ok());
        assert!(parse_cron("  30 9 * * 1-5 ").is_ok());
    }

    #[test]
    fn wrong_field_count_is_rejected() {
        assert!(matches!(parse_cron("0 * * *"), Err(CronError::Parse(_, _))));
        // Six fields would silently shift meaning if accepted.
        assert!(matches!(parse_cron("0 0 * * * *"), Err(CronError::Parse(_, _))));
    }

    #[test]
    fn garbage_is_rejected() {
        assert!(matches!(parse_cron("a b c d e"), Err(CronError::Parse(_, _))));
    }

    #[test]
    fn next_occurrence_is_strictly_after() {
        let now = at(2026, 3, 14, 8, 0);
        let next = next_occurrence("0 */4 * * *", now).unwrap();
        assert_eq!(next, at(2026, 3, 14, 12, 0));

        let next = next_occurrence("30 9 * * *", at(2026, 3, 14, 9, 30)).unwrap();
        assert_eq!(next, at(2026, 3, 15, 9, 30));
    }
}
