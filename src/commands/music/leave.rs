use super::*;

/// Leave the voice channel
#[poise::command(slash_command, guild_only, category = "Music")]
pub async fn leave(ctx: Context<'_>) -> CommandResult {
    let guild_id = guild_id(&ctx)?;

    ctx.data().music.leave(guild_id).await?;

    ctx.send(embedded_messages::left_voice_channel()).await?;
    Ok(())
}
