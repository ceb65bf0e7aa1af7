//! Defines `ExtractedInfo`, the raw resolver output, and `StreamDescriptor`, the
//! single playable stream the controller picks out of it.

use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::commands::music::utils::music_manager::MusicError;

/// Title used when the resolver does not report one.
pub const DEFAULT_TITLE: &str = "audio stream";

/// Information returned by the resolver for one URL or query.
///
/// Mirrors the subset of yt-dlp's JSON that matters here. Playlists carry their
/// items in `entries`; individual items may be `null`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ExtractedInfo {
    #[serde(default)]
    pub id: Option<String>,
    /// Direct media URL for the selected format.
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default)]
    pub title: Option<String>,
    /// Duration in seconds.
    #[serde(default)]
    pub duration: Option<f64>,
    #[serde(default)]
    pub webpage_url: Option<String>,
    #[serde(default)]
    pub thumbnail: Option<String>,
    #[serde(default)]
    pub entries: Option<Vec<Option<ExtractedInfo>>>,
    /// Every other key yt-dlp reported.
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

impl ExtractedInfo {
    /// True when the resolver returned an entry with no keys at all.
    pub fn is_empty(&self) -> bool {
        self.id.is_none()
            && self.url.is_none()
            && self.title.is_none()
            && self.duration.is_none()
            && self.webpage_url.is_none()
            && self.thumbnail.is_none()
            && self.entries.is_none()
            && self.extra.is_empty()
    }
}

/// A single playable stream.
#[derive(Debug, Clone, PartialEq)]
pub struct StreamDescriptor {
    /// Direct media URL handed to the transport.
    pub stream_url: String,
    pub title: String,
    pub duration: Option<Duration>,
    /// Human-facing page for the media, if any.
    pub webpage_url: Option<String>,
    pub thumbnail: Option<String>,
}

impl StreamDescriptor {
    /// Pick the playable stream out of a resolver result.
    ///
    /// Playlists resolve to their first non-empty entry.
    pub fn select(extracted: Option<ExtractedInfo>) -> Result<Self, MusicError> {
        let mut info = extracted
            .filter(|info| !info.is_empty())
            .ok_or(MusicError::NoMediaFound)?;

        if let Some(entries) = info.entries.take() {
            info = entries
                .into_iter()
                .flatten()
                .find(|entry| !entry.is_empty())
                .ok_or(MusicError::NoPlayableEntries)?;
        }

        let stream_url = info
            .url
            .filter(|url| !url.trim().is_empty())
            .ok_or(MusicError::NoStreamUrl)?;

        let title = info
            .title
            .filter(|title| !title.trim().is_empty())
            .unwrap_or_else(|| DEFAULT_TITLE.to_string());

        let duration = info
            .duration
            .filter(|secs| secs.is_finite() && *secs > 0.0)
            .map(Duration::from_secs_f64);

        Ok(Self {
            stream_url,
            title,
            duration,
            webpage_url: info.webpage_url,
            thumbnail: info.thumbnail,
        })
    }
}
