//! melody: a Discord bot that joins voice channels and streams audio resolved from links.
//!
//! The interesting part lives in [`commands::music::utils`]: a per-guild session
//! controller that serializes playback commands, manages the voice connection and
//! resolves links off the dispatch path. The rest is thin poise/serenity glue.

use chrono::{DateTime, Utc};

pub mod commands;
pub mod config;
pub mod events;

use commands::music::audio_sources::ytdl::YtDlpResolver;
use commands::music::utils::music_manager::MusicManager;
use commands::music::utils::songbird_transport::SongbirdTransport;

pub type Error = Box<dyn std::error::Error + Send + Sync>;
pub type Context<'a> = poise::Context<'a, Data, Error>;
pub type CommandResult = Result<(), Error>;

/// The session controller wired to the real voice transport and resolver.
pub type BotMusicManager = MusicManager<SongbirdTransport, YtDlpResolver>;

// User data, which is stored and accessible in all command invocations
pub struct Data {
    pub music: BotMusicManager,
    pub launched_at: DateTime<Utc>,
}

impl Data {
    pub fn new(music: BotMusicManager) -> Self {
        Self {
            music,
            launched_at: Utc::now(),
        }
    }
}
