use time::macros::format_description;
use time::{format_description, OffsetDateTime, UtcOffset};

use super::{timestamp, TimestampStyle};

const DATETIME_FORMAT: &[format_description::FormatItem<'_>] =
    format_description!("[year]-[month]-[day] [hour]:[minute]");

const OFFSET_FORMAT: &[format_description::FormatItem<'_>] =
    format_description!("[offset_hour sign:mandatory]:[offset_minute]");

/// Formats the instant as wall-clock time in `zone`, e.g. `2024-12-25 10:00 UTC+03:00`.
///
/// Falls back to UTC when the wall clock in `zone` is off the calendar.
pub fn format_in_zone(date_time: impl Into<OffsetDateTime>, zone: UtcOffset) -> String {
    let date_time = date_time.into();
    let (local, zone) = match date_time.checked_to_offset(zone) {
        Some(local) => (local, zone),
        None => (date_time, date_time.offset()),
    };
    let date_time = local
        .format(DATETIME_FORMAT)
        .expect("Hard-coded format should be correct");

    if zone == UtcOffset::UTC {
        format!("{date_time} UTC")
    } else {
        format!("{date_time} UTC{}", format_offset(zone))
    }
}

pub fn format_offset(offset: UtcOffset) -> String {
    offset
        .format(OFFSET_FORMAT)
        .expect("Hard-coded format should be correct")
}

pub fn parse_offset(value: &str) -> Result<UtcOffset, time::error::Parse> {
    UtcOffset::parse(value.trim(), OFFSET_FORMAT)
}

/// Rendered by Discord in the reader's own time zone.
pub fn format_local(date_time: impl Into<OffsetDateTime>) -> String {
    timestamp(date_time.into(), TimestampStyle::ShortDateTime)
}
