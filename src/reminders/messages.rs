use indoc::formatdoc;
use time::UtcOffset;

use crate::{
    models::{Event, ReminderKind},
    utils::{
        formatting::{format_in_zone, format_local},
        timestamp, TimestampStyle,
    },
};

pub fn reminder_message(kind: ReminderKind, event: &Event, zone: UtcOffset) -> String {
    let name = &event.display_name;
    let price = price_line(event);

    match (kind, event.dates()) {
        (ReminderKind::StartReminder, Some((start, end))) => formatdoc! {
            r#"
                # Secret Santa {name} starts tomorrow!

                The exchange runs from {start_local} until {end_local} ({end_zone}).
                {price}
                Use `/santa recipient` to see who you are buying a gift for.
            "#,
            start_local = timestamp(start.into(), TimestampStyle::LongDate),
            end_local = format_local(end),
            end_zone = format_in_zone(end, zone),
        },
        (ReminderKind::WeekReminder, Some((_, end))) => formatdoc! {
            r#"
                # One week left in Secret Santa {name}

                The exchange ends {end_relative}, on {end_local} ({end_zone}).
                {price}
                Don't forget to get your gift ready!
            "#,
            end_relative = timestamp(end.into(), TimestampStyle::RelativeTime),
            end_local = format_local(end),
            end_zone = format_in_zone(end, zone),
        },
        (ReminderKind::FinalReminder, Some((_, end))) => formatdoc! {
            r#"
                # Last day of Secret Santa {name}!

                The exchange ends on {end_local} ({end_zone}). This is your last chance to hand over your gift.
            "#,
            end_local = format_local(end),
            end_zone = format_in_zone(end, zone),
        },
        (_, None) => formatdoc! {
            r#"
                # A reminder about Secret Santa {name}

                Check `/event list` for the current dates.
            "#,
        },
    }
}

pub fn assignment_message(event: &Event, recipient_mention: &str, zone: UtcOffset) -> String {
    let name = &event.display_name;
    let price = price_line(event);
    let deadline = match event.end_date {
        Some(end) => format!(
            "The gift should be ready by {} ({}).",
            format_local(end),
            format_in_zone(end, zone)
        ),
        None => String::new(),
    };

    formatdoc! {
        r#"
            # The draw for Secret Santa {name} is done!

            You are the Secret Santa of {recipient_mention}. Keep it a secret!
            {price}
            {deadline}
        "#,
    }
}

fn price_line(event: &Event) -> String {
    match &event.price_limit {
        Some(limit) => format!("Price limit: **{limit}**."),
        None => String::new(),
    }
}

#[cfg(test)]
mod tests {
    use time::{macros::datetime, UtcOffset};

    use crate::models::{types::UtcDateTime, Event, EventId, EventStatus, GroupId, ReminderKind};

    use super::{assignment_message, reminder_message};

    fn event() -> Event {
        Event {
            id: EventId(1),
            group: GroupId(1),
            slug: "OfficeParty".to_string(),
            display_name: "Office Party".to_string(),
            price_limit: Some("20 EUR".to_string()),
            status: EventStatus::Active,
            start_date: Some(UtcDateTime::assume_utc(datetime!(2024-12-01 09:00))),
            end_date: Some(UtcDateTime::assume_utc(datetime!(2024-12-25 18:00))),
            created_at: UtcDateTime::assume_utc(datetime!(2024-11-01 09:00)),
        }
    }

    #[test]
    fn final_reminder_mentions_end() {
        let message = reminder_message(ReminderKind::FinalReminder, &event(), UtcOffset::UTC);
        assert!(message.contains("Last day of Secret Santa Office Party"));
        assert!(message.contains("2024-12-25 18:00 UTC"));
    }

    #[test]
    fn week_reminder_has_price() {
        let message = reminder_message(ReminderKind::WeekReminder, &event(), UtcOffset::UTC);
        assert!(message.contains("Price limit: **20 EUR**."));
    }

    #[test]
    fn assignment_names_recipient() {
        let message = assignment_message(&event(), "<@42>", UtcOffset::UTC);
        assert!(message.contains("You are the Secret Santa of <@42>"));
    }
}
