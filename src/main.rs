use ::serenity::all::ClientBuilder;
use dotenv::dotenv;
use poise::serenity_prelude as serenity;
use songbird::{SerenityInit, Songbird};
use std::sync::Arc;
use tracing::{error, info};
use tracing_subscriber::{EnvFilter, FmtSubscriber};

use melody::commands::music::audio_sources::ytdl::YtDlpResolver;
use melody::commands::music::utils::music_manager::MusicManager;
use melody::commands::music::utils::songbird_transport::SongbirdTransport;
use melody::config::BotConfig;
use melody::{CommandResult, Context, Data, Error, commands, events};

#[poise::command(slash_command, category = "General")]
async fn help(
    ctx: Context<'_>,
    #[description = "Specific command to show help about"]
    #[autocomplete = "poise::builtins::autocomplete_command"]
    command: Option<String>,
) -> CommandResult {
    poise::builtins::help(
        ctx,
        command.as_deref(),
        poise::builtins::HelpConfiguration {
            show_context_menu_commands: true,
            ..Default::default()
        },
    )
    .await
    .map_err(|e| e.into())
}

#[poise::command(prefix_command, hide_in_help)]
async fn register(ctx: Context<'_>) -> Result<(), Error> {
    poise::builtins::register_application_commands_buttons(ctx)
        .await
        .map_err(|e| e.into())
}

#[tokio::main]
async fn main() -> Result<(), Error> {
    // Initialize logging with debug level for our crate
    FmtSubscriber::builder()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("melody=debug,warn")),
        )
        .with_thread_ids(true)
        .with_line_number(true)
        .with_file(true)
        .with_target(true)
        .with_ansi(true)
        .pretty()
        .init();

    dotenv().ok();

    let config = BotConfig::load().inspect_err(|e| error!("Invalid configuration: {}", e))?;

    let intents =
        serenity::GatewayIntents::non_privileged() | serenity::GatewayIntents::GUILD_VOICE_STATES;

    let mut command_list = vec![register(), help()];
    command_list.extend(commands::all());

    let songbird = Songbird::serenity();
    let voice_manager = Arc::clone(&songbird);
    let resolver = YtDlpResolver::new(config.ytdlp_path.clone(), config.resolver_retries);
    let resolve_timeout = config.resolve_timeout;

    let framework = poise::Framework::builder()
        .options(poise::FrameworkOptions {
            commands: command_list,
            on_error: |error| Box::pin(commands::on_error(error)),
            event_handler: |ctx, event, framework, data| {
                Box::pin(events::event_handler(ctx, event, framework, data))
            },
            ..Default::default()
        })
        .setup(move |ctx, _ready, framework| {
            Box::pin(async move {
                poise::builtins::register_globally(ctx, &framework.options().commands).await?;
                info!(
                    "Registered {} commands globally",
                    framework.options().commands.len()
                );

                let transport = SongbirdTransport::new(voice_manager, Arc::clone(&ctx.cache))?;
                let music = MusicManager::new(transport, resolver, resolve_timeout);
                Ok(Data::new(music))
            })
        })
        .build();

    let mut client = ClientBuilder::new(&config.discord_token, intents)
        .framework(framework)
        .register_songbird_with(songbird)
        .await?;

    let shard_manager = Arc::clone(&client.shard_manager);
    tokio::spawn(async move {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!("Failed to listen for Ctrl-C: {}", e);
            return;
        }
        info!("Bot shutdown requested.");
        shard_manager.shutdown_all().await;
    });

    client.start().await.map_err(Into::into)
}
