use poise::{Context, CreateReply, FrameworkError};
use tracing::{debug, error, warn};

use crate::{commands::CommandError, BotState};

type BotContext<'a> = Context<'a, BotState, CommandError>;

pub async fn handle_error(error: FrameworkError<'_, BotState, CommandError>) {
    use FrameworkError::*;

    match error {
        Setup { error, .. } => {
            error!("Error in user data setup: {}", error);
        }

        EventHandler { error, event, .. } => {
            error!(
                "Error in user event {} handler: {}",
                event.snake_case_name(),
                error
            );
        }

        Command { error, ctx, .. } => match error {
            CommandError::User { message } => {
                debug!(
                    "Command `{}` rejected: {}",
                    ctx.command().qualified_name,
                    message
                );
                reply_with_error(ctx, &message).await;
            }

            CommandError::Internal { message } => {
                error!(
                    "Internal error in `{}`: {}",
                    ctx.command().qualified_name,
                    message
                );
                reply_with_internal_error(ctx, &message).await;
            }

            CommandError::Serenity(error) => {
                error!(
                    "Serenity error in `{}`: {}",
                    ctx.command().qualified_name,
                    error
                );
                reply_with_internal_error(ctx, &error.to_string()).await;
            }
        },

        ArgumentParse {
            error, input, ctx, ..
        } => {
            let response = match input {
                Some(input) => format!("**Sorry, cannot use `{}`:** {}", input, error),
                None => format!("**{}**", error),
            };

            reply_with_error(ctx, &response).await;
        }

        CommandStructureMismatch {
            description, ctx, ..
        } => {
            error!(
                "Failed to deserialize interaction arguments for `{}`: {}",
                ctx.command.qualified_name, description
            );
        }

        MissingBotPermissions {
            missing_permissions,
            ctx,
            ..
        } => {
            warn!("Bot lacks permissions {missing_permissions} for a command");
            reply_with_error(
                ctx,
                "Sorry, the bot lacks permissions necessary to execute this command.",
            )
            .await;
        }

        MissingUserPermissions { ctx, .. } => {
            reply_with_error(ctx, "Sorry, only server admins can run this command.").await;
        }

        GuildOnly { ctx, .. } => {
            reply_with_error(
                ctx,
                "Sorry, Secret Santa runs per server, please use this command in a server.",
            )
            .await;
        }

        CommandCheckFailed { error, ctx, .. } => {
            let message = match error {
                Some(error) => format!("Sorry, can't run this command: {}", error),
                None => "Sorry, can't run this command.".to_string(),
            };

            reply_with_error(ctx, &message).await;
        }

        UnknownInteraction { interaction, .. } => {
            warn!(
                "Received an unknown interaction: {:?}",
                interaction.data.name
            );
        }

        error => {
            error!("Unknown error: {}", error);
        }
    }
}

async fn reply_with_error(ctx: BotContext<'_>, error_message: &str) {
    if let Err(send_error) = poise::send_reply(
        ctx,
        CreateReply::default()
            .content(error_message)
            .ephemeral(true),
    )
    .await
    {
        error!(
            "Failed to send an error message to the user: {}\nThe message was: {}",
            send_error, error_message
        );
    }
}

async fn reply_with_internal_error(ctx: BotContext<'_>, error_message: &str) {
    reply_with_error(
        ctx,
        &format!("Sorry, something went wrong on our side: {}", error_message),
    )
    .await;
}
