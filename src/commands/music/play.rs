use super::*;
use crate::commands::Deferral;
use crate::commands::music::utils::music_manager::PlaybackRequest;
use tracing::info;

/// Resolution can take a while, and the result is announced to the channel.
pub(crate) const DEFERRAL: Deferral = Deferral::Public;

/// Play audio from a URL or search query, replacing whatever is playing
#[poise::command(slash_command, guild_only, category = "Music")]
pub async fn play(
    ctx: Context<'_>,
    #[description = "URL or search query"] url: String,
) -> CommandResult {
    info!("Received play command with query: {}", url);
    let guild_id = guild_id(&ctx)?;

    DEFERRAL.start(ctx).await?;

    let request = PlaybackRequest {
        guild_id,
        channel_id: author_voice_channel(&ctx, guild_id),
        query: url,
    };
    let descriptor = match ctx.data().music.play(request).await {
        Ok(descriptor) => descriptor,
        Err(err) => {
            // The error hook replies privately.
            DEFERRAL.withdraw_for_private_reply(ctx).await;
            return Err(err.into());
        }
    };

    ctx.send(embedded_messages::now_playing(&descriptor)).await?;
    Ok(())
}
