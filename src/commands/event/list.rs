use poise::CreateReply;

use crate::{
    commands::{guild_group, ApplicationContext, CommandResult},
    utils::formatting::format_in_zone,
};

#[poise::command(slash_command, rename = "list")]
pub async fn list(ctx: ApplicationContext<'_>) -> CommandResult {
    let group = guild_group(&ctx)?;
    let service = &ctx.data().event_service;
    let zone = service.zone();

    let events = service.list_events(group).await?;

    let content = if events.is_empty() {
        "# There are no events".to_string()
    } else {
        events.iter().fold("# Events\n".to_string(), |acc, event| {
            let dates = match event.dates() {
                Some((start, end)) => format!(
                    "runs from {} to {}",
                    format_in_zone(start, zone),
                    format_in_zone(end, zone)
                ),
                None => "dates not set".to_string(),
            };

            acc + &format!(
                " - **{}** (slug: `{}`) - {}, {}\n",
                event.display_name, event.slug, event.status, dates
            )
        })
    };

    ctx.send(CreateReply::default().content(content).ephemeral(true))
        .await?;

    Ok(())
}
