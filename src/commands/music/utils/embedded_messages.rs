use poise::{CreateReply, serenity_prelude as serenity};
use serenity::all::{CreateEmbed, MessageBuilder};

use super::format_duration;
use crate::commands::music::audio_sources::track_metadata::StreamDescriptor;

const SUCCESS_COLOR: u32 = 0x00ff00;
const ERROR_COLOR: u32 = 0xff0000;

/// Render a stream title in bold, with any markdown in it escaped
fn bold_title(title: &str) -> String {
    MessageBuilder::new().push_bold_safe(title).build()
}

/// Create an embed for a successful music action
fn success(title: &str, description: impl Into<String>) -> CreateReply {
    CreateReply::default().embed(
        CreateEmbed::new()
            .title(title)
            .description(description)
            .color(SUCCESS_COLOR),
    )
}

/// Create an embed for when the bot joins a voice channel
pub fn joined_voice_channel() -> CreateReply {
    success("🔊 Joined", "Joined your voice channel.")
}

/// Create an embed for when the bot leaves a voice channel
pub fn left_voice_channel() -> CreateReply {
    success("👋 Left Voice Channel", "Disconnected.")
}

/// Create an embed for when a stream starts playing
pub fn now_playing(descriptor: &StreamDescriptor) -> CreateReply {
    let mut embed = CreateEmbed::new()
        .title("🎵 Now Playing")
        .description(format!("Now playing: {}", bold_title(&descriptor.title)))
        .color(SUCCESS_COLOR);

    if let Some(duration) = descriptor.duration {
        embed = embed.field("Duration", format!("`{}`", format_duration(duration)), true);
    }
    if let Some(url) = &descriptor.webpage_url {
        embed = embed.url(url);
    }
    if let Some(thumbnail) = &descriptor.thumbnail {
        embed = embed.thumbnail(thumbnail);
    }

    CreateReply::default().embed(embed)
}

/// Create an embed for when playback is paused
pub fn paused() -> CreateReply {
    success("⏸️ Paused", "Playback paused.")
}

/// Create an embed for when playback is resumed
pub fn resumed() -> CreateReply {
    success("▶️ Resumed", "Resumed playback.")
}

/// Create an embed for when playback is stopped
pub fn stopped() -> CreateReply {
    success("⏹️ Stopped", "Stopped playback.")
}

/// Create a private error embed carrying a user-facing message
pub fn error(message: &str) -> CreateReply {
    CreateReply::default()
        .embed(
            CreateEmbed::new()
                .title("❌ Error")
                .description(message)
                .color(ERROR_COLOR),
        )
        .ephemeral(true)
}
