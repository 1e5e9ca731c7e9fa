//! Time and timestamp helpers.

use chrono::{DateTime, Utc};

/// UTC timestamp used for session bounds, insight windows and entity updates.
pub type Timestamp = DateTime<Utc>;

/// Return the current UTC time.
#[must_use]
pub fn now() -> Timestamp {
    Utc::now()
}

/// Elapsed seconds from `start` to `end`, with millisecond precision.
///
/// Negative when `end` precedes `start`; callers decide whether that is
/// meaningful.
#[must_use]
#[allow(clippy::cast_precision_loss)]
pub fn seconds_between(start: Timestamp, end: Timestamp) -> f64 {
    (end - start).num_milliseconds() as f64 / 1000.0
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn should_return_current_utc_time() {
        let before = Utc::now();
        let ts = now();
        let after = Utc::now();
        assert!(ts >= before);
        assert!(ts <= after);
    }

    #[test]
    fn should_count_seconds_between_two_timestamps() {
        let start = Utc.with_ymd_and_hms(2024, 3, 1, 10, 0, 0).unwrap();
        let end = Utc.with_ymd_and_hms(2024, 3, 1, 11, 30, 0).unwrap();
        assert!((seconds_between(start, end) - 5400.0).abs() < f64::EPSILON);
    }

    #[test]
    fn should_keep_sub_second_precision() {
        let start = Utc.timestamp_millis_opt(1_000).unwrap();
        let end = Utc.timestamp_millis_opt(2_500).unwrap();
        assert!((seconds_between(start, end) - 1.5).abs() < f64::EPSILON);
    }
}
