pub(crate) mod join;
pub(crate) mod leave;
pub(crate) mod pause;
pub(crate) mod play;
pub(crate) mod resume;
pub(crate) mod stop;

pub mod audio_sources;
pub mod utils;

use crate::{CommandResult, Context};
use poise::serenity_prelude::{ChannelId, GuildId};
use utils::{embedded_messages, music_manager::MusicError};

/// The guild the command was invoked in.
fn guild_id(ctx: &Context<'_>) -> Result<GuildId, MusicError> {
    ctx.guild_id().ok_or(MusicError::NotInGuild)
}

/// The invoking member's current voice channel, if any.
fn author_voice_channel(ctx: &Context<'_>, guild_id: GuildId) -> Option<ChannelId> {
    utils::user_voice_channel(&ctx.serenity_context().cache, guild_id, ctx.author().id)
}
