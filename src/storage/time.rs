//! Wall-clock source for record timestamps
//!
//! Production code stamps records from the system clock; tests swap in a
//! fixed instant so stamped values are predictable.

use chrono::{DateTime, SecondsFormat, Utc};

/// Abstraction over the wall clock
pub trait TimeSource: Send + Sync {
    /// Current instant
    fn now(&self) -> DateTime<Utc>;

    /// Current instant as an ISO-8601 string, e.g. `2024-03-01T09:30:00.000Z`
    fn timestamp(&self) -> String {
        self.now().to_rfc3339_opts(SecondsFormat::Millis, true)
    }
}

/// System clock
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemTimeSource;

impl TimeSource for SystemTimeSource {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// Clock frozen at one instant
#[derive(Debug, Clone, Copy)]
pub struct FixedTimeSource(pub DateTime<Utc>);

impl TimeSource for FixedTimeSource {
    fn now(&self) -> DateTime<Utc> {
        self.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_fixed_timestamp_format() {
        let clock = FixedTimeSource(Utc.with_ymd_and_hms(2024, 3, 1, 9, 30, 0).unwrap());
        assert_eq!(clock.timestamp(), "2024-03-01T09:30:00.000Z");
    }

    #[test]
    fn test_system_time_source() {
        let t1 = SystemTimeSource.now();
        let t2 = SystemTimeSource.now();

        // After 2020-01-01
        assert!(t1.timestamp() > 1_577_836_800);
        assert!(t2 >= t1);
    }
}
