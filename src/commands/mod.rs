mod camel_slug;

mod arguments;
mod event;
mod exclusion;
mod santa;

use crate::{event_service::EventError, BotState};

pub use event::event;
pub use exclusion::exclusion;
pub use santa::santa;

type CommandResult = Result<(), CommandError>;
type Context<'a> = poise::Context<'a, BotState, CommandError>;
type ApplicationContext<'a> = poise::ApplicationContext<'a, BotState, CommandError>;

#[derive(thiserror::Error, Debug)]
pub enum CommandError {
    #[error("{message}")]
    User { message: String },
    #[error("{message}")]
    Internal { message: String },
    #[error(transparent)]
    Serenity(#[from] serenity::Error),
}

fn user_err(message: impl Into<String>) -> CommandError {
    CommandError::User {
        message: message.into(),
    }
}

fn internal_err(message: impl Into<String>) -> CommandError {
    CommandError::Internal {
        message: message.into(),
    }
}

impl From<EventError> for CommandError {
    fn from(value: EventError) -> Self {
        match value {
            EventError::Storage(err) => internal_err(format!("Storage failure: {err}")),
            err => user_err(err.to_string()),
        }
    }
}

impl From<anyhow::Error> for CommandError {
    fn from(value: anyhow::Error) -> Self {
        internal_err(value.to_string())
    }
}

fn guild_group(ctx: &ApplicationContext<'_>) -> Result<crate::models::GroupId, CommandError> {
    ctx.guild_id().map(Into::into).ok_or(internal_err(
        "This command should be executed only in a guild",
    ))
}
