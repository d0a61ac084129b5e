use poise::CreateReply;

use crate::commands::{arguments::EventSlug, guild_group, ApplicationContext, CommandResult};

/// Cancel an event. Pending reminders are dropped.
#[poise::command(slash_command, rename = "cancel")]
pub async fn cancel(
    ctx: ApplicationContext<'_>,
    #[description = "Event slug"] event: EventSlug,
) -> CommandResult {
    let group = guild_group(&ctx)?;
    let service = &ctx.data().event_service;

    let event = service.find_event(group, event.as_ref()).await?;
    let event = service.cancel(event.id).await?;

    ctx.send(CreateReply::default().content(format!("# Event `{}` cancelled", event.slug)))
        .await?;

    Ok(())
}

/// Mark an event as finished.
#[poise::command(slash_command, rename = "finish")]
pub async fn finish(
    ctx: ApplicationContext<'_>,
    #[description = "Event slug"] event: EventSlug,
) -> CommandResult {
    let group = guild_group(&ctx)?;
    let service = &ctx.data().event_service;

    let event = service.find_event(group, event.as_ref()).await?;
    let event = service.finish(event.id).await?;

    ctx.send(CreateReply::default().content(format!("# Event `{}` finished", event.slug)))
        .await?;

    Ok(())
}

/// Delete an event with its assignment, exclusion rules and reminders.
#[poise::command(slash_command, rename = "delete")]
pub async fn delete(
    ctx: ApplicationContext<'_>,
    #[description = "Event slug"] event: EventSlug,
) -> CommandResult {
    let group = guild_group(&ctx)?;
    let service = &ctx.data().event_service;

    let event = service.find_event(group, event.as_ref()).await?;
    service.delete_event(event.id).await?;

    ctx.send(CreateReply::default().content(format!("# Event `{}` deleted", event.slug)))
        .await?;

    Ok(())
}
