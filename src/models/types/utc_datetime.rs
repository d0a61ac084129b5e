use std::ops::{Add, Sub};
use thiserror::Error;
use time::{Duration, OffsetDateTime, PrimitiveDateTime, UtcOffset};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Error)]
#[error("The date is outside of the supported range")]
pub struct DateOutOfRange;

/// A point in time normalized to UTC.
///
/// Stored as a unix timestamp with second precision, so values are truncated
/// to whole seconds on construction.
#[derive(Copy, Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct UtcDateTime(PrimitiveDateTime);

impl UtcDateTime {
    pub fn assume_utc(datetime: PrimitiveDateTime) -> UtcDateTime {
        UtcDateTime(datetime.replace_nanosecond(0).unwrap_or(datetime))
    }

    pub fn now() -> UtcDateTime {
        UtcDateTime::from_utc(OffsetDateTime::now_utc())
    }

    fn from_utc(value: OffsetDateTime) -> UtcDateTime {
        UtcDateTime::assume_utc(PrimitiveDateTime::new(value.date(), value.time()))
    }

    pub fn unix_timestamp(&self) -> i64 {
        self.0.assume_utc().unix_timestamp()
    }

    pub fn from_unix_timestamp(timestamp: i64) -> Result<UtcDateTime, time::error::ComponentRange> {
        OffsetDateTime::from_unix_timestamp(timestamp).map(UtcDateTime::from_utc)
    }

    /// The same instant as seen from the given offset, if that wall clock
    /// still fits into the calendar.
    pub fn checked_to_offset(self, offset: UtcOffset) -> Result<OffsetDateTime, DateOutOfRange> {
        self.0
            .assume_utc()
            .checked_to_offset(offset)
            .ok_or(DateOutOfRange)
    }
}

impl TryFrom<OffsetDateTime> for UtcDateTime {
    type Error = DateOutOfRange;

    fn try_from(value: OffsetDateTime) -> Result<Self, Self::Error> {
        value
            .checked_to_offset(UtcOffset::UTC)
            .map(UtcDateTime::from_utc)
            .ok_or(DateOutOfRange)
    }
}

impl From<UtcDateTime> for OffsetDateTime {
    fn from(value: UtcDateTime) -> Self {
        value.0.assume_utc()
    }
}

impl Add<Duration> for UtcDateTime {
    type Output = UtcDateTime;

    fn add(self, rhs: Duration) -> Self::Output {
        UtcDateTime::assume_utc(self.0 + rhs)
    }
}

impl Sub<Duration> for UtcDateTime {
    type Output = UtcDateTime;

    fn sub(self, rhs: Duration) -> Self::Output {
        UtcDateTime::assume_utc(self.0 - rhs)
    }
}

impl Sub<UtcDateTime> for UtcDateTime {
    type Output = Duration;

    fn sub(self, rhs: UtcDateTime) -> Self::Output {
        self.0 - rhs.0
    }
}
