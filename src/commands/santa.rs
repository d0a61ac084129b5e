use poise::{serenity_prelude::Mentionable, CreateReply};

use super::{
    arguments::EventSlug, guild_group, internal_err, user_err, ApplicationContext, CommandResult,
    Context,
};

#[poise::command(slash_command, guild_only, subcommands("join", "leave", "recipient"))]
pub async fn santa(_ctx: Context<'_>) -> CommandResult {
    Err(user_err("Please use one of the `/santa` subcommands"))
}

/// Join the Secret Santa of this server.
#[poise::command(slash_command)]
pub async fn join(ctx: ApplicationContext<'_>) -> CommandResult {
    let group = guild_group(&ctx)?;

    ctx.data()
        .member_repository
        .join(group, ctx.author().id)
        .await
        .map_err(|err| internal_err(format!("Could not add you to the Secret Santa: {err}")))?;

    ctx.send(
        CreateReply::default()
            .content("# You are in! 🎁\nYou will get a DM once the names are drawn.")
            .ephemeral(true),
    )
    .await?;

    Ok(())
}

/// Leave the Secret Santa of this server.
#[poise::command(slash_command)]
pub async fn leave(ctx: ApplicationContext<'_>) -> CommandResult {
    let group = guild_group(&ctx)?;

    let left = ctx
        .data()
        .member_repository
        .leave(group, ctx.author().id)
        .await
        .map_err(|err| {
            internal_err(format!("Could not remove you from the Secret Santa: {err}"))
        })?;

    if !left {
        return Err(user_err("You have not joined the Secret Santa"));
    }

    ctx.send(
        CreateReply::default()
            .content("# You left the Secret Santa")
            .ephemeral(true),
    )
    .await?;

    Ok(())
}

/// Show who you are buying a gift for.
#[poise::command(slash_command)]
pub async fn recipient(
    ctx: ApplicationContext<'_>,
    #[description = "Event slug"] event: EventSlug,
) -> CommandResult {
    let group = guild_group(&ctx)?;
    let service = &ctx.data().event_service;

    let event = service.find_event(group, event.as_ref()).await?;

    let content = match service.recipient_of(event.id, ctx.author().id).await? {
        Some(recipient) => format!(
            "# {}\nYou are the Secret Santa of {}.",
            event.display_name,
            recipient.handle.mention()
        ),
        None => format!(
            "# {}\nThe names have not been drawn yet.",
            event.display_name
        ),
    };

    ctx.send(CreateReply::default().content(content).ephemeral(true))
        .await?;

    Ok(())
}
