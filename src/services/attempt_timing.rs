use thiserror::Error;
use time::{Duration, PrimitiveDateTime};

use crate::core::time::seconds_between;

#[derive(Debug, Error, PartialEq, Eq)]
pub(crate) enum TimingError {
    #[error("duration_minutes must be positive")]
    NonPositiveDuration,
}

/// Wall-clock view of one attempt, anchored at its server-side start time.
#[derive(Debug, Clone, Copy)]
pub(crate) struct AttemptClock {
    started_at: PrimitiveDateTime,
    duration_seconds: i64,
}

impl AttemptClock {
    pub(crate) fn new(
        started_at: PrimitiveDateTime,
        duration_minutes: i32,
    ) -> Result<Self, TimingError> {
        if duration_minutes <= 0 {
            return Err(TimingError::NonPositiveDuration);
        }

        Ok(Self { started_at, duration_seconds: i64::from(duration_minutes) * 60 })
    }

    pub(crate) fn deadline(&self) -> PrimitiveDateTime {
        self.started_at + Duration::seconds(self.duration_seconds)
    }

    /// Seconds spent so far, never beyond the test duration.
    pub(crate) fn elapsed_seconds(&self, now: PrimitiveDateTime) -> i64 {
        seconds_between(self.started_at, now).clamp(0, self.duration_seconds)
    }

    pub(crate) fn remaining_seconds(&self, now: PrimitiveDateTime) -> i64 {
        self.duration_seconds - self.elapsed_seconds(now)
    }

    pub(crate) fn is_running(&self, now: PrimitiveDateTime) -> bool {
        now < self.deadline()
    }

    /// Client finishes are honoured up to `grace_seconds` past the deadline.
    pub(crate) fn accepts_finish(&self, now: PrimitiveDateTime, grace_seconds: u64) -> bool {
        now <= self.deadline() + Duration::seconds(grace_seconds as i64)
    }
}
