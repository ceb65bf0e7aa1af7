use super::*;

/// Resume a paused stream
#[poise::command(slash_command, guild_only, category = "Music")]
pub async fn resume(ctx: Context<'_>) -> CommandResult {
    let guild_id = guild_id(&ctx)?;

    ctx.data().music.resume(guild_id).await?;

    ctx.send(embedded_messages::resumed()).await?;
    Ok(())
}
