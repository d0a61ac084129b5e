use poise::CreateReply;

use crate::{
    commands::{
        arguments::EventDate, arguments::EventSlug, guild_group, ApplicationContext, CommandResult,
    },
    utils::formatting::format_in_zone,
};

/// Set or move the dates of an event.
#[poise::command(slash_command, rename = "dates")]
pub async fn dates(
    ctx: ApplicationContext<'_>,
    #[description = "Event slug"] event: EventSlug,
    #[description = "When the exchange starts, like `2024-12-01`."] start: EventDate,
    #[description = "When the exchange ends, like `2024-12-24 18:00`."] end: EventDate,
) -> CommandResult {
    let group = guild_group(&ctx)?;
    let service = &ctx.data().event_service;
    let zone = service.zone();

    let event = service.find_event(group, event.as_ref()).await?;
    let (start, end) = (start.materialize(zone)?, end.materialize(zone)?);

    let reminders = service.set_dates(event.id, start, end).await?;

    let mut content = format!(
        "# Dates of {} updated\nRuns from {} until {}.\n",
        event.display_name,
        format_in_zone(start, zone),
        format_in_zone(end, zone)
    );
    for reminder in reminders {
        content += &format!(
            " - {} at {}\n",
            reminder.kind,
            format_in_zone(reminder.fire_at, zone)
        );
    }

    ctx.send(CreateReply::default().content(content).ephemeral(true))
        .await?;

    Ok(())
}
