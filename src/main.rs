#![forbid(unsafe_code)]

mod commands;
mod config;
mod event_service;
mod models;
mod notifier;
mod poise_error_handler;
mod reminders;
mod repository;
mod solver;
mod utils;

use std::{process::exit, sync::Arc};

use config::AppConfig;
use event_service::EventService;
use notifier::DiscordNotifier;
use poise::{serenity_prelude::*, Framework};
use poise_error_handler::handle_error;
use reminders::ReminderService;
use repository::{
    AssignmentRepository, EventRepository, ExclusionRepository, MemberRepository,
    ReminderRepository,
};
use sqlx::{sqlite::SqlitePoolOptions, SqlitePool};
use tokio::{select, signal, sync::Notify};
use tracing::{error, info, info_span, warn, Instrument};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

pub struct BotState {
    pub event_service: Arc<EventService>,
    pub member_repository: Arc<MemberRepository>,
}

#[tracing::instrument]
#[tokio::main]
async fn main() {
    if let Err(err) = dotenvy::dotenv() {
        warn!("Could not load config from .env file: {err}");
    }

    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer())
        .with(
            tracing_subscriber::EnvFilter::builder()
                .with_default_directive(
                    "secret_santa_bot=info"
                        .parse()
                        .expect("Hard-coded default directive should be correct"),
                )
                .from_env_lossy(),
        )
        .init();

    let app_config = match envy::from_env::<AppConfig>() {
        Ok(config) => config,
        Err(err) => {
            error!("Could not load app config: {err}");
            exit(255);
        }
    };

    let zone = match app_config.event_zone() {
        Ok(zone) => zone,
        Err(err) => {
            error!("Could not load app config: {err}");
            exit(255);
        }
    };
    let pacing = app_config.delivery_pacing();
    let discord_bot_token = app_config.discord_bot_token.clone();

    let db_pool = match setup_database(&app_config.database_url).await {
        Ok(pool) => pool,
        Err(err) => {
            error!("Could not setup database: {err}");
            exit(255);
        }
    };

    let shutdown_notify = Arc::new(Notify::new());
    let reminder_service_shutdown = shutdown_notify.clone();

    let event_repository = Arc::new(EventRepository::new(db_pool.clone()));
    let member_repository = Arc::new(MemberRepository::new(db_pool.clone()));
    let exclusion_repository = Arc::new(ExclusionRepository::new(db_pool.clone()));
    let assignment_repository = Arc::new(AssignmentRepository::new(db_pool.clone()));
    let reminder_repository = Arc::new(ReminderRepository::new(db_pool.clone()));

    let framework = Framework::builder()
        .options(poise::FrameworkOptions {
            commands: vec![commands::santa(), commands::event(), commands::exclusion()],
            on_error: |error| Box::pin(handle_error(error)),
            ..Default::default()
        })
        .setup(move |ctx, _ready, framework| {
            Box::pin(
                async move {
                    let commands = &framework.options().commands;

                    if let Some(true) = app_config.register_commands_globally {
                        info!("Registering commands globally");
                        poise::builtins::register_globally(ctx, commands).await?;
                    }

                    if let Some(guilds) = &app_config.register_commands_in_guilds {
                        for guild in guilds.iter().map(|g| GuildId::new(*g)) {
                            let guild_name = ctx
                                .http()
                                .get_guild(guild)
                                .await
                                .map(|g| g.name)
                                .unwrap_or("???".to_string());

                            info!("Registering commands in guild {guild} ({guild_name})");

                            poise::builtins::register_in_guild(ctx, commands, guild).await?;
                        }
                    }

                    let notifier = Arc::new(DiscordNotifier::new(ctx.http.clone()));

                    let event_service = Arc::new(EventService::new(
                        event_repository.clone(),
                        member_repository.clone(),
                        exclusion_repository,
                        assignment_repository,
                        reminder_repository.clone(),
                        notifier.clone(),
                        zone,
                        pacing,
                    ));

                    Arc::new(ReminderService::new(
                        event_repository,
                        member_repository.clone(),
                        reminder_repository,
                        notifier,
                        zone,
                        pacing,
                    ))
                    .start(reminder_service_shutdown);

                    Ok(BotState {
                        event_service,
                        member_repository,
                    })
                }
                .instrument(info_span!("bot_setup")),
            )
        })
        .build();

    let mut client = match ClientBuilder::new(discord_bot_token, GatewayIntents::empty())
        .framework(framework)
        .await
    {
        Ok(client) => client,
        Err(err) => {
            error!("Failed to create the client: {err}");
            exit(255);
        }
    };

    select! {
        _ = signal::ctrl_c() => {
            info!("Ctrl-C received, shutting down");
            shutdown_notify.notify_waiters();
            client.shard_manager.shutdown_all().await;
            db_pool.close().await;
        },

        result = client.start() => {
            if let Err(err) = result {
                error!("Failed to start the client: {err}");
            }
        },
    };
}

#[tracing::instrument(skip(url))]
async fn setup_database(url: &str) -> anyhow::Result<SqlitePool> {
    info!("Connecting to SQLite database at {url}");
    let pool = SqlitePoolOptions::new().connect(url).await?;
    info!("Running migrations");
    sqlx::migrate!("./migrations").run(&pool).await?;
    info!("Done!");
    Ok(pool)
}
