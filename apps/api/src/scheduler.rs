//! Cron-driven trigger.
//!
//! Sleeps until the next fire time of the configured 6-field cron expression
//! (seconds, minutes, hours, day-of-month, month, day-of-week) and invokes
//! the pipeline directly. A broken expression stops the task; the HTTP
//! trigger keeps working regardless.

use std::str::FromStr;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use cron::Schedule;
use thiserror::Error;
use tracing::{error, info};

use crate::pipeline::{Pipeline, Trigger};

#[derive(Debug, Error)]
pub enum ScheduleError {
    #[error("cron expression must have 6 fields, got {0}")]
    FieldCount(usize),

    #[error("invalid cron expression: {0}")]
    Parse(#[from] cron::error::Error),

    #[error("cron expression has no future fire times")]
    NoNextRun,
}

pub fn validate_cron_expression(expression: &str) -> Result<(), ScheduleError> {
    let fields = expression.split_whitespace().count();
    if fields != 6 {
        return Err(ScheduleError::FieldCount(fields));
    }
    Schedule::from_str(expression)?;
    Ok(())
}

pub fn next_run_after(
    expression: &str,
    after: DateTime<Utc>,
) -> Result<DateTime<Utc>, ScheduleError> {
    let schedule = Schedule::from_str(expression)?;
    schedule.after(&after).next().ok_or(ScheduleError::NoNextRun)
}

/// Runs forever (spawned as a background task).
pub async fn run_scheduler(pipeline: Arc<Pipeline>, expression: String) {
    loop {
        let now = Utc::now();
        let next = match next_run_after(&expression, now) {
            Ok(next) => next,
            Err(e) => {
                error!("scheduler stopped: {e}");
                return;
            }
        };
        let wait = (next - now).to_std().unwrap_or_default();
        info!("next scheduled pipeline run at {next}");
        tokio::time::sleep(wait).await;

        if let Err(e) = pipeline.run_with_retry(Trigger::Cron).await {
            error!("scheduled pipeline run failed: {e}");
        }
    }
}

#[cfg(test)]
mod tests {
    use chrono::TimeZone;

    use super::*;

    #[test]
    fn test_six_field_expression_is_valid() {
        assert!(validate_cron_expression("0 0 * * * *").is_ok());
    }

    #[test]
    fn test_five_field_expression_is_rejected() {
        let err = validate_cron_expression("0 * * * *").unwrap_err();
        assert!(matches!(err, ScheduleError::FieldCount(5)));
    }

    #[test]
    fn test_garbage_expression_is_rejected() {
        assert!(validate_cron_expression("a b c d e f").is_err());
    }

    #[test]
    fn test_next_run_is_strictly_after() {
        let after = Utc.with_ymd_and_hms(2026, 1, 1, 10, 30, 0).unwrap();
        let next = next_run_after("0 0 * * * *", after).unwrap();
        assert_eq!(next, Utc.with_ymd_and_hms(2026, 1, 1, 11, 0, 0).unwrap());
    }

    #[test]
    fn test_hourly_from_exact_boundary_moves_to_next_hour() {
        let after = Utc.with_ymd_and_hms(2026, 1, 1, 10, 0, 0).unwrap();
        let next = next_run_after("0 0 * * * *", after).unwrap();
        assert_eq!(next, Utc.with_ymd_and_hms(2026, 1, 1, 11, 0, 0).unwrap());
    }
}
