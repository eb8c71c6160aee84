//! Wall-clock source for time-of-day signals

use chrono::{DateTime, FixedOffset, Local, NaiveDate, TimeZone};
use std::fmt::Debug;

/// Source of the evaluation's reference time
pub trait Clock: Send + Sync + Debug {
    fn now(&self) -> DateTime<FixedOffset>;
}

/// Local system clock
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<FixedOffset> {
        Local::now().fixed_offset()
    }
}

/// Clock pinned to a single instant
#[derive(Debug, Clone, Copy)]
pub struct FixedClock(DateTime<FixedOffset>);

impl FixedClock {
    pub fn new(at: DateTime<FixedOffset>) -> Self {
        Self(at)
    }

    /// A UTC instant on an arbitrary fixed date at `hour:00`
    pub fn at_hour(hour: u32) -> Option<Self> {
        let naive = NaiveDate::from_ymd_opt(2024, 5, 14)?.and_hms_opt(hour, 0, 0)?;
        let offset = FixedOffset::east_opt(0)?;
        offset.from_local_datetime(&naive).single().map(Self)
    }
}

impl Clock for FixedClock {
    fn now(&self) -> DateTime<FixedOffset> {
        self.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Timelike;

    #[test]
    fn test_fixed_clock_hour() {
        let clock = FixedClock::at_hour(3).unwrap();
        assert_eq!(clock.now().hour(), 3);
        assert!(FixedClock::at_hour(24).is_none());
    }
}
