use chrono::{DateTime, Timelike, Utc};

/// Source of wall-clock time for time-of-hour gating.
///
/// Elapsed-time measurement inside the busy-wait always uses
/// [`std::time::Instant`]; this trait only answers "what minute is it".
#[cfg_attr(test, mockall::automock)]
pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}

/// Minute of the hour as reported by `clock`
pub fn minute_of_hour(clock: &dyn Clock) -> u32 {
    clock.now().minute()
}

#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// Clock pinned to a single instant
#[derive(Debug, Clone, Copy)]
pub struct FixedClock(pub DateTime<Utc>);

impl FixedClock {
    /// Today's date at `hh:minute:00` UTC
    pub fn at_minute(minute: u32) -> Self {
        let now = Utc::now();
        let pinned = now
            .with_minute(minute.min(59))
            .and_then(|t| t.with_second(0))
            .unwrap_or(now);
        Self(pinned)
    }
}

impl Clock for FixedClock {
    fn now(&self) -> DateTime<Utc> {
        self.0
    }
}
