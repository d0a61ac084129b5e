use poise::CreateReply;

use crate::{
    commands::{arguments::EventSlug, guild_group, ApplicationContext, CommandResult},
    models::AssignedPair,
    utils::formatting::format_in_zone,
};

/// Show the state of an event: dates, draw progress and pending reminders.
#[poise::command(slash_command, rename = "show")]
pub async fn show(
    ctx: ApplicationContext<'_>,
    #[description = "Event slug"] event: EventSlug,
) -> CommandResult {
    let group = guild_group(&ctx)?;
    let service = &ctx.data().event_service;
    let zone = service.zone();

    let event = service.find_event(group, event.as_ref()).await?;
    let overview = service.overview(event.id).await?;
    let event = overview.event;

    let mut content = format!(
        "# {} (`{}`)\nStatus: {}\n",
        event.display_name, event.slug, event.status
    );

    match event.dates() {
        Some((start, end)) => {
            content += &format!(
                "Runs from {} until {}\n",
                format_in_zone(start, zone),
                format_in_zone(end, zone)
            );
        }
        None => content += "Dates are not set\n",
    }
    if let Some(price_limit) = &event.price_limit {
        content += &format!("Price limit: {price_limit}\n");
    }

    content += &format!(
        "Participants: {}, exclusion rules: {}\n",
        overview.member_count, overview.rule_count
    );

    if !overview.pairs.is_empty() {
        let count =
            |flag: fn(&AssignedPair) -> bool| overview.pairs.iter().filter(|p| flag(p)).count();
        content += &format!(
            "Drawn pairs: {}, givers notified: {}\nGifts sent: {}, delivered: {}, confirmed: {}\n",
            overview.pairs.len(),
            count(|pair| pair.notified),
            count(|pair| pair.gift_sent),
            count(|pair| pair.gift_delivered),
            count(|pair| pair.gift_confirmed),
        );
    }

    if !overview.reminders.is_empty() {
        content += "## Reminders\n";
        for job in &overview.reminders {
            let state = match job.fired_at {
                Some(fired_at) => format!("sent {}", format_in_zone(fired_at, zone)),
                None => "pending".to_string(),
            };
            content += &format!(
                " - {} at {} ({state})\n",
                job.kind,
                format_in_zone(job.fire_at, zone)
            );
        }
    }

    ctx.send(CreateReply::default().content(content).ephemeral(true))
        .await?;

    Ok(())
}
