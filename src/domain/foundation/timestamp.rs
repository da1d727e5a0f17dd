//! Timestamp value object for immutable points in time.

use chrono::{DateTime, Duration, TimeZone, Utc};
use serde::{Deserialize, Serialize};

/// Immutable point in time, always UTC.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Timestamp(DateTime<Utc>);

impl Timestamp {
    /// Creates a timestamp for the current moment.
    pub fn now() -> Self {
        Self(Utc::now())
    }

    /// Creates a timestamp from a DateTime<Utc>.
    pub fn from_datetime(dt: DateTime<Utc>) -> Self {
        Self(dt)
    }

    /// Creates a timestamp from Unix seconds.
    ///
    /// Out-of-range values clamp to the epoch; provider event timestamps
    /// are seconds-resolution Unix times.
    pub fn from_unix(secs: i64) -> Self {
        match Utc.timestamp_opt(secs, 0).single() {
            Some(dt) => Self(dt),
            None => Self(Utc.timestamp_opt(0, 0).single().unwrap_or_default()),
        }
    }

    /// Returns the inner DateTime.
    pub fn as_datetime(&self) -> &DateTime<Utc> {
        &self.0
    }

    /// Returns Unix seconds.
    pub fn as_unix(&self) -> i64 {
        self.0.timestamp()
    }

    /// Checks if this timestamp is before another.
    pub fn is_before(&self, other: &Timestamp) -> bool {
        self.0 < other.0
    }

    /// Checks if this timestamp is after another.
    pub fn is_after(&self, other: &Timestamp) -> bool {
        self.0 > other.0
    }

    /// Creates a new timestamp by adding the specified number of seconds.
    ///
    /// Negative values subtract.
    pub fn add_secs(&self, secs: i64) -> Self {
        Self(self.0 + Duration::seconds(secs))
    }

    /// Returns the RFC 3339 rendering, the form persisted in order metadata.
    pub fn to_rfc3339(&self) -> String {
        self.0.to_rfc3339()
    }

    /// Parses the RFC 3339 rendering produced by [`Timestamp::to_rfc3339`].
    pub fn parse_rfc3339(s: &str) -> Result<Self, chrono::ParseError> {
        Ok(Self(DateTime::parse_from_rfc3339(s)?.with_timezone(&Utc)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ordering_follows_time() {
        let t1 = Timestamp::from_unix(1_700_000_000);
        let t2 = Timestamp::from_unix(1_700_000_001);
        assert!(t1.is_before(&t2));
        assert!(t2.is_after(&t1));
        assert!(t1 < t2);
    }

    #[test]
    fn rfc3339_roundtrip() {
        let t = Timestamp::from_unix(1_700_000_000);
        let parsed = Timestamp::parse_rfc3339(&t.to_rfc3339()).unwrap();
        assert_eq!(t, parsed);
    }

    #[test]
    fn from_unix_clamps_out_of_range() {
        // Does not panic on absurd values.
        let _ = Timestamp::from_unix(i64::MAX);
    }

    #[test]
    fn add_secs_moves_forward_and_back() {
        let t = Timestamp::from_unix(1_000);
        assert_eq!(t.add_secs(60).as_unix(), 1_060);
        assert_eq!(t.add_secs(-60).as_unix(), 940);
    }
}
