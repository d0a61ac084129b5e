use poise::CreateReply;

use crate::{
    commands::{arguments::EventSlug, guild_group, ApplicationContext, CommandResult, Context},
    event_service::DrawMode,
};

/// Draw the names and DM everyone their recipient.
#[poise::command(slash_command, rename = "draw")]
pub async fn draw(
    ctx: ApplicationContext<'_>,
    #[description = "Event slug"] event: EventSlug,
    #[description = "Throw away the current assignment and draw again."] redraw: Option<bool>,
) -> CommandResult {
    let group = guild_group(&ctx)?;
    let service = &ctx.data().event_service;

    let event = service.find_event(group, event.as_ref()).await?;
    let mode = match redraw {
        Some(true) => DrawMode::Redraw,
        _ => DrawMode::Fresh,
    };

    // Announcing the recipients takes a while
    Context::from(ctx).defer_ephemeral().await?;

    let outcome = service.draw(event.id, mode).await?;

    let mut content = format!(
        "# Names for {} are drawn!\n{} participants, {} reminders scheduled.\n",
        event.display_name,
        outcome.assignment.len(),
        outcome.reminders.len()
    );
    if !outcome.announcement.failed.is_empty() {
        content += &format!(
            "{} participants could not be sent a DM. They can use `/santa recipient {}`.\n",
            outcome.announcement.failed.len(),
            event.slug
        );
    }

    ctx.send(CreateReply::default().content(content).ephemeral(true))
        .await?;

    Ok(())
}
