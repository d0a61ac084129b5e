use poise::{
    serenity_prelude::{Mentionable, User},
    ChoiceParameter, CreateReply,
};

use crate::models::RuleKind;

use super::{
    arguments::{EventSlug, TrimmedString},
    guild_group, user_err, ApplicationContext, CommandResult, Context,
};

#[derive(ChoiceParameter)]
pub enum ExclusionKind {
    #[name = "Neither draws the other"]
    Mutual,
    #[name = "Only the first one may not draw the second"]
    Directional,
}

impl From<ExclusionKind> for RuleKind {
    fn from(value: ExclusionKind) -> Self {
        match value {
            ExclusionKind::Mutual => RuleKind::Mutual,
            ExclusionKind::Directional => RuleKind::Directional,
        }
    }
}

#[poise::command(
    slash_command,
    guild_only,
    subcommands("add", "list"),
    required_permissions = "ADMINISTRATOR",
    default_member_permissions = "ADMINISTRATOR"
)]
pub async fn exclusion(_ctx: Context<'_>) -> CommandResult {
    Err(user_err("Please use one of the `/exclusion` subcommands"))
}

/// Forbid a pair of participants from drawing each other.
#[poise::command(slash_command)]
pub async fn add(
    ctx: ApplicationContext<'_>,
    #[description = "Event slug"] event: EventSlug,
    #[description = "The first participant."] first: User,
    #[description = "The second participant."] second: User,
    #[description = "Defaults to mutual."] kind: Option<ExclusionKind>,
    #[description = "Why, for the other admins."] reason: Option<TrimmedString>,
) -> CommandResult {
    let group = guild_group(&ctx)?;
    let service = &ctx.data().event_service;

    let event = service.find_event(group, event.as_ref()).await?;
    let rule = service
        .add_exclusion_rule(
            event.id,
            first.id,
            second.id,
            kind.map(Into::into).unwrap_or(RuleKind::Mutual),
            reason.and_then(TrimmedString::non_empty),
        )
        .await?;

    let arrow = match rule.kind {
        RuleKind::Mutual => "⇄",
        RuleKind::Directional => "→",
    };

    ctx.send(
        CreateReply::default()
            .content(format!(
                "# Exclusion added to {}\n{} {arrow} {}",
                event.display_name,
                first.mention(),
                second.mention()
            ))
            .ephemeral(true),
    )
    .await?;

    Ok(())
}

#[poise::command(slash_command)]
pub async fn list(
    ctx: ApplicationContext<'_>,
    #[description = "Event slug"] event: EventSlug,
) -> CommandResult {
    let group = guild_group(&ctx)?;
    let data = ctx.data();

    let event = data.event_service.find_event(group, event.as_ref()).await?;
    let rules = data.event_service.list_exclusion_rules(event.id).await?;

    if rules.is_empty() {
        ctx.send(
            CreateReply::default()
                .content(format!("# {} has no exclusions", event.display_name))
                .ephemeral(true),
        )
        .await?;
        return Ok(());
    }

    let mut content = format!("# Exclusions of {}\n", event.display_name);
    for rule in rules {
        let first = data.member_repository.get_member(rule.user_a).await?;
        let second = data.member_repository.get_member(rule.user_b).await?;
        let (Some(first), Some(second)) = (first, second) else {
            continue;
        };

        let arrow = match rule.kind {
            RuleKind::Mutual => "⇄",
            RuleKind::Directional => "→",
        };
        content += &format!(
            " - {} {arrow} {}",
            first.handle.mention(),
            second.handle.mention()
        );
        if let Some(reason) = &rule.reason {
            content += &format!(" ({reason})");
        }
        content += "\n";
    }

    ctx.send(CreateReply::default().content(content).ephemeral(true))
        .await?;

    Ok(())
}
