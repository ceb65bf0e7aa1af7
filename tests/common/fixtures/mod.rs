//! Sample data used across the integration tests.

use melody::commands::music::audio_sources::track_metadata::ExtractedInfo;
use poise::serenity_prelude::{ChannelId, GuildId};

pub const GUILD_ONE: GuildId = GuildId::new(111_111_111);
pub const GUILD_TWO: GuildId = GuildId::new(222_222_222);

pub const CHANNEL_A: ChannelId = ChannelId::new(900_000_001);
pub const CHANNEL_B: ChannelId = ChannelId::new(900_000_002);

/// A single yt-dlp result, trimmed to the fields that matter.
pub const YTDLP_VIDEO_JSON: &str = r#"{
    "id": "jNQXAC9IVRw",
    "title": "Me at the zoo",
    "duration": 19,
    "url": "https://rr3.googlevideo.com/videoplayback?expire=1&id=jNQXAC9IVRw",
    "webpage_url": "https://www.youtube.com/watch?v=jNQXAC9IVRw",
    "thumbnail": "https://i.ytimg.com/vi/jNQXAC9IVRw/hqdefault.jpg",
    "extractor": "youtube"
}"#;

/// A playlist whose first entry is unavailable.
pub const YTDLP_PLAYLIST_JSON: &str = r#"{
    "_type": "playlist",
    "id": "PL1",
    "title": "Road trip",
    "entries": [
        null,
        {"id": "b", "title": "Second", "url": "https://cdn.example.com/second"},
        {"id": "c", "title": "Third", "url": "https://cdn.example.com/third"}
    ]
}"#;

/// A playlist with nothing playable in it.
pub const YTDLP_EMPTY_PLAYLIST_JSON: &str = r#"{
    "_type": "playlist",
    "id": "PL2",
    "title": "Deleted videos",
    "entries": [null, null]
}"#;

/// A resolved stream with the given title and direct URL.
pub fn stream(title: &str, url: &str) -> ExtractedInfo {
    ExtractedInfo {
        title: Some(title.to_string()),
        url: Some(url.to_string()),
        ..Default::default()
    }
}

pub fn parse(json: &str) -> ExtractedInfo {
    serde_json::from_str(json).unwrap()
}
