use std::str::FromStr;

use poise::CreateReply;

use crate::{
    commands::{
        arguments::{EventDate, EventSlug, TrimmedString},
        camel_slug::slugify_camel,
        guild_group, internal_err, user_err, ApplicationContext, CommandResult,
    },
    utils::formatting::format_in_zone,
};

/// Create a Secret Santa event.
#[poise::command(slash_command, rename = "create")]
pub async fn create(
    ctx: ApplicationContext<'_>,

    #[description = "The name of the event to use in announcements."] display_name: TrimmedString,

    #[description = "Gift price limit, like `20 EUR`."] price_limit: Option<TrimmedString>,

    #[description = "When the exchange starts, like `2024-12-01`."] start: Option<EventDate>,

    #[description = "When the exchange ends, like `2024-12-24 18:00`."] end: Option<EventDate>,

    #[description = "The name of the event to use in commands. Must consist only of `A-Za-z0-9_-`."]
    slug: Option<EventSlug>,
) -> CommandResult {
    let group = guild_group(&ctx)?;
    let service = &ctx.data().event_service;

    if display_name.as_ref().is_empty() {
        return Err(user_err("The display name cannot be empty"));
    }

    let slug = match slug {
        Some(slug) => slug,
        None => EventSlug::from_str(&slugify_camel(display_name.as_ref())).map_err(|_| {
            internal_err(format!(
                "Could not make a slug out of `{display_name}`, please provide one."
            ))
        })?,
    };

    let dates = match (start, end) {
        (Some(start), Some(end)) => Some((
            start.materialize(service.zone())?,
            end.materialize(service.zone())?,
        )),
        (None, None) => None,
        _ => {
            return Err(user_err(
                "Please provide both the start and the end, or neither",
            ))
        }
    };

    if let Some((start, end)) = dates {
        if end <= start {
            return Err(user_err("The end date must be after the start date"));
        }
    }

    let event = service
        .create_event(
            group,
            slug.as_ref(),
            display_name.as_ref(),
            price_limit.and_then(TrimmedString::non_empty),
        )
        .await?;

    let mut content = format!(
        "# Event {} created\nSlug: `{}`\n",
        event.display_name, event.slug
    );

    match dates {
        Some((start, end)) => {
            service.set_dates(event.id, start, end).await?;
            content += &format!(
                "Runs from {} until {}.\n",
                format_in_zone(start, service.zone()),
                format_in_zone(end, service.zone())
            );
        }
        None => {
            content += &format!(
                "Set the dates with `/event dates {}` before drawing the names.\n",
                event.slug
            );
        }
    }

    ctx.send(CreateReply::default().content(content).ephemeral(true))
        .await?;

    Ok(())
}
