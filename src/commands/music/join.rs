use super::*;
use tracing::debug;

/// Join your current voice channel
#[poise::command(slash_command, guild_only, category = "Music")]
pub async fn join(ctx: Context<'_>) -> CommandResult {
    let guild_id = guild_id(&ctx)?;
    let channel_id = author_voice_channel(&ctx, guild_id);

    let joined = ctx.data().music.join(guild_id, channel_id).await?;
    debug!("Guild {} now connected to {}", guild_id, joined);

    ctx.send(embedded_messages::joined_voice_channel()).await?;
    Ok(())
}
