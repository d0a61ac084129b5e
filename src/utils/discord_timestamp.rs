use std::fmt::Display;

use time::OffsetDateTime;

/// How Discord renders a `<t:...>` timestamp.
pub enum TimestampStyle {
    /// Short date/time, e.g. `20 April 2021 16:20`
    ShortDateTime,
    /// Long date, e.g. `20 April 2021`
    LongDate,
    /// Relative time, e.g. `in 2 months`
    RelativeTime,
}

impl Display for TimestampStyle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.suffix())
    }
}

impl TimestampStyle {
    pub fn suffix(&self) -> &'static str {
        use TimestampStyle::*;

        match self {
            ShortDateTime => "f",
            LongDate => "D",
            RelativeTime => "R",
        }
    }
}

pub fn timestamp(datetime: OffsetDateTime, style: TimestampStyle) -> String {
    let unix_timestamp = datetime.unix_timestamp();
    format!("<t:{unix_timestamp}:{style}>")
}
