use std::str::FromStr;

use lazy_regex::regex_captures;
use time::{Date, Month, PrimitiveDateTime, Time, UtcOffset};

use crate::{commands::CommandError, models::types::UtcDateTime};

use super::super::user_err;

const EXAMPLE_1: &str = "2024-12-24";
const EXAMPLE_2: &str = "2024-12-24 18:00 UTC+3";

fn invalid_argument(message: String) -> CommandError {
    user_err(format!(
        "{message}\nDate examples: `{EXAMPLE_1}`, `{EXAMPLE_2}`."
    ))
}

/// A calendar date with an optional time of day and UTC offset.
///
/// Missing parts are filled in by [`EventDate::materialize`]: midnight and the
/// event time zone.
#[derive(PartialEq, Eq, Debug)]
pub struct EventDate {
    date: Date,
    time: Option<Time>,
    utc_offset: Option<UtcOffset>,
}

impl EventDate {
    pub fn materialize(&self, zone: UtcOffset) -> Result<UtcDateTime, CommandError> {
        let local = PrimitiveDateTime::new(self.date, self.time.unwrap_or(Time::MIDNIGHT))
            .assume_offset(self.utc_offset.unwrap_or(zone));

        UtcDateTime::try_from(local)
            .map_err(|err| invalid_argument(format!("`{}`: {err}.", self.date)))
    }
}

impl FromStr for EventDate {
    type Err = CommandError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut date = None;
        let mut time = None;
        let mut utc_offset = None;

        for token in s.split_whitespace() {
            if let Some((_, year, month, day)) =
                regex_captures!(r"^(\d{4})-(\d{1,2})-(\d{1,2})$", token)
            {
                if date.is_some() {
                    return Err(invalid_argument(format!("Duplicate date: `{token}`.")));
                }

                let year = year
                    .parse()
                    .map_err(|_| invalid_argument(format!("Invalid year: `{year}`.")))?;
                let month = month
                    .parse::<u8>()
                    .ok()
                    .and_then(|month| Month::try_from(month).ok())
                    .ok_or_else(|| invalid_argument(format!("Invalid month: `{month}`.")))?;
                let day = day
                    .parse()
                    .map_err(|_| invalid_argument(format!("Invalid day: `{day}`.")))?;

                date = Some(
                    Date::from_calendar_date(year, month, day)
                        .map_err(|_| invalid_argument(format!("Invalid date: `{token}`.")))?,
                );
            } else if let Some((_, hour, minute)) = regex_captures!(r"^(\d{1,2}):(\d{2})$", token) {
                if time.is_some() {
                    return Err(invalid_argument(format!("Duplicate time: `{token}`.")));
                }

                let hour = hour
                    .parse()
                    .map_err(|_| invalid_argument(format!("Invalid hour: `{hour}`.")))?;
                let minute = minute
                    .parse()
                    .map_err(|_| invalid_argument(format!("Invalid minute: `{minute}`.")))?;

                time = Some(
                    Time::from_hms(hour, minute, 0)
                        .map_err(|_| invalid_argument(format!("Invalid time: `{token}`.")))?,
                );
            } else if let Some((_, _, sign, hour, _, minute)) =
                regex_captures!(r"^UTC(([+-])(\d{1,2})(:(\d{2}))?)?$", token)
            {
                if utc_offset.is_some() {
                    return Err(invalid_argument(format!(
                        "Duplicate UTC offset: `{token}`."
                    )));
                }

                utc_offset = if sign.is_empty() {
                    Some(UtcOffset::UTC)
                } else {
                    let sign = if sign == "+" { 1 } else { -1 };

                    let hour: i8 = hour
                        .parse()
                        .map_err(|_| invalid_argument(format!("Invalid hour: `{hour}`.")))?;
                    let minute: i8 = if minute.is_empty() {
                        0
                    } else {
                        minute
                            .parse()
                            .map_err(|_| invalid_argument(format!("Invalid minute: `{minute}`.")))?
                    };

                    Some(
                        UtcOffset::from_hms(hour * sign, minute * sign, 0).map_err(|_| {
                            invalid_argument(format!("Invalid UTC offset: `{token}`."))
                        })?,
                    )
                };
            } else {
                return Err(invalid_argument(format!("Invalid token: `{token}`.")));
            }
        }

        let date = date.ok_or_else(|| invalid_argument("The date is missing.".to_string()))?;

        Ok(EventDate {
            date,
            time,
            utc_offset,
        })
    }
}
