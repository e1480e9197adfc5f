//! Millisecond time points used for every "as of" query.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// An instant, stored as milliseconds since the Unix epoch.
///
/// All leaderboard queries are evaluated "as of" a `TimePoint`; races that
/// have not started by then, and corrections that have not yet taken effect,
/// are invisible to the computation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TimePoint(i64);

impl TimePoint {
    /// Create a time point from epoch milliseconds.
    pub const fn from_millis(millis: i64) -> Self {
        Self(millis)
    }

    /// The current wall-clock time.
    pub fn now() -> Self {
        Self(Utc::now().timestamp_millis())
    }

    /// Epoch milliseconds.
    pub const fn as_millis(self) -> i64 {
        self.0
    }

    /// A time point shifted by `millis` (negative values move backwards).
    pub const fn plus_millis(self, millis: i64) -> Self {
        Self(self.0.saturating_add(millis))
    }

    /// Convert to a chrono UTC timestamp, if representable.
    pub fn to_datetime(self) -> Option<DateTime<Utc>> {
        DateTime::from_timestamp_millis(self.0)
    }
}

impl From<DateTime<Utc>> for TimePoint {
    fn from(value: DateTime<Utc>) -> Self {
        Self(value.timestamp_millis())
    }
}

impl fmt::Display for TimePoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.to_datetime() {
            Some(dt) => write!(f, "{}", dt.to_rfc3339()),
            None => write!(f, "{}ms", self.0),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ordering_follows_millis() {
        let earlier = TimePoint::from_millis(1_000);
        let later = earlier.plus_millis(1);
        assert!(earlier < later);
        assert_eq!(later.as_millis(), 1_001);
    }

    #[test]
    fn test_chrono_roundtrip() {
        let dt = DateTime::parse_from_rfc3339("2024-06-01T12:00:00Z")
            .unwrap()
            .with_timezone(&Utc);
        let tp = TimePoint::from(dt);
        assert_eq!(tp.to_datetime(), Some(dt));
        assert_eq!(tp.to_string(), "2024-06-01T12:00:00+00:00");
    }

    #[test]
    fn test_plus_millis_saturates() {
        let tp = TimePoint::from_millis(i64::MAX).plus_millis(10);
        assert_eq!(tp.as_millis(), i64::MAX);
    }
}
