use time::{macros::time, Date, Duration, PrimitiveDateTime, Time, UtcOffset};

use crate::models::{
    types::{DateOutOfRange, UtcDateTime},
    PlannedReminder, ReminderKind,
};

pub const START_REMINDER_TIME: Time = time!(12:00);
pub const WEEK_REMINDER_TIME: Time = time!(12:00);
pub const FINAL_REMINDER_TIME: Time = time!(10:00);

/// Derives the reminder jobs of an event from its dates.
///
/// Dates are interpreted as calendar days in `zone`. The start and week reminders
/// are dropped when they would fire at or before `now`; the final reminder is
/// always kept, even if the event has already ended.
///
/// Fails if a date or a reminder falls off the calendar once taken to `zone`.
pub fn plan_reminders(
    start: UtcDateTime,
    end: UtcDateTime,
    zone: UtcOffset,
    now: UtcDateTime,
) -> Result<Vec<PlannedReminder>, DateOutOfRange> {
    let start_day = start.checked_to_offset(zone)?.date();
    let end_day = end.checked_to_offset(zone)?.date();

    let candidates = [
        (
            ReminderKind::StartReminder,
            start_day.checked_sub(Duration::days(1)),
            START_REMINDER_TIME,
        ),
        (
            ReminderKind::WeekReminder,
            end_day.checked_sub(Duration::days(7)),
            WEEK_REMINDER_TIME,
        ),
        (
            ReminderKind::FinalReminder,
            Some(end_day),
            FINAL_REMINDER_TIME,
        ),
    ];

    let mut plan = Vec::with_capacity(candidates.len());

    for (kind, day, time) in candidates {
        let Some(day) = day else {
            continue;
        };

        let fire_at = local_instant(day, time, zone)?;
        if kind == ReminderKind::FinalReminder || fire_at > now {
            plan.push(PlannedReminder { kind, fire_at });
        }
    }

    Ok(plan)
}

fn local_instant(day: Date, time: Time, zone: UtcOffset) -> Result<UtcDateTime, DateOutOfRange> {
    UtcDateTime::try_from(PrimitiveDateTime::new(day, time).assume_offset(zone))
}
