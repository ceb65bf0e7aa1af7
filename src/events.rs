use poise::serenity_prelude as serenity;
use serenity::{FullEvent, GuildId, UserId, VoiceState};
use tracing::{debug, info};

use crate::{Data, Error};

/// Gateway events the bot reacts to outside of commands.
pub async fn event_handler(
    ctx: &serenity::Context,
    event: &FullEvent,
    _framework: poise::FrameworkContext<'_, Data, Error>,
    data: &Data,
) -> Result<(), Error> {
    match event {
        FullEvent::Ready { data_about_bot } => {
            info!(
                "Logged in as {} ({})",
                data_about_bot.user.name, data_about_bot.user.id
            );
            info!("Connected to {} guild(s)", data_about_bot.guilds.len());
        }
        FullEvent::VoiceStateUpdate { new, .. } => {
            let bot_id = ctx.cache.current_user().id;
            if let Some(guild_id) = left_voice(bot_id, new) {
                debug!("Bot left voice in guild {}", guild_id);
                data.music.forget(guild_id).await;
            }
        }
        _ => {}
    }

    Ok(())
}

/// The guild the bot just left voice in, if `state` says so.
fn left_voice(bot_id: UserId, state: &VoiceState) -> Option<GuildId> {
    if state.user_id != bot_id || state.channel_id.is_some() {
        return None;
    }
    state.guild_id
}
