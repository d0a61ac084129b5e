mod create;
mod dates;
mod draw;
mod list;
mod show;
mod status;

use super::{user_err, CommandResult, Context};

#[poise::command(
    slash_command,
    guild_only,
    subcommands(
        "create::create",
        "dates::dates",
        "draw::draw",
        "status::cancel",
        "status::finish",
        "status::delete",
        "list::list",
        "show::show"
    ),
    required_permissions = "ADMINISTRATOR",
    default_member_permissions = "ADMINISTRATOR"
)]
pub async fn event(_ctx: Context<'_>) -> CommandResult {
    Err(user_err("Please use one of the `/event` subcommands"))
}
