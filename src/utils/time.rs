//! Timestamps for timeline entries.
//!
//! Timestamps are serialized as RFC 3339 strings.  [`MonotonicClock`] hands out
//! instants that never go backwards, even if the wall clock does.

use serde::{Deserialize, Deserializer, Serializer};
use time::OffsetDateTime;
use time::format_description::well_known::Rfc3339;

/// Deserialize an RFC 3339 timestamp.
pub fn deserialize<'de, D>(deserializer: D) -> Result<OffsetDateTime, D::Error>
where
    D: Deserializer<'de>,
{
    let s = String::deserialize(deserializer)?;
    OffsetDateTime::parse(&s, &Rfc3339).map_err(serde::de::Error::custom)
}

/// Serialize a timestamp as RFC 3339.
pub fn serialize<S>(timestamp: &OffsetDateTime, serializer: S) -> Result<S::Ok, S::Error>
where
    S: Serializer,
{
    let s = timestamp
        .format(&Rfc3339)
        .map_err(serde::ser::Error::custom)?;
    serializer.serialize_str(&s)
}

/// A wall clock clamped so successive readings are non-decreasing.
#[derive(Debug, Default, Clone)]
pub struct MonotonicClock {
    last: Option<OffsetDateTime>,
}

impl MonotonicClock {
    /// Creates a clock with no readings.
    pub fn new() -> Self {
        Self::default()
    }

    /// Reads the wall clock.
    pub fn now(&mut self) -> OffsetDateTime {
        self.observe(OffsetDateTime::now_utc())
    }

    /// Returns `reading`, or the previous result if `reading` is earlier.
    pub fn observe(&mut self, reading: OffsetDateTime) -> OffsetDateTime {
        let timestamp = match self.last {
            Some(last) if last > reading => last,
            _ => reading,
        };
        self.last = Some(timestamp);
        timestamp
    }
}
