//! The seam between the session controller and the real-time audio transport.
//!
//! The controller only ever talks to a [`VoiceTransport`] (to open a connection) and to
//! the [`VoiceConnection`] it hands back. The production implementation lives in
//! `songbird_transport`; tests swap in mocks and recording fakes.

use poise::serenity_prelude::{ChannelId, GuildId};
use serenity::async_trait;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use thiserror::Error;

#[cfg(test)]
use mockall::automock;

/// Failures reported by the voice transport.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TransportError {
    #[error("Missing permission to connect or speak in the voice channel")]
    PermissionDenied,

    #[error("Voice connection error: {0}")]
    Connection(String),

    #[error("Audio source rejected: {0}")]
    Rejected(String),

    #[error("Playback control error: {0}")]
    Control(String),

    #[error("Stream ended with an error: {0}")]
    Stream(String),
}

/// Robustness settings applied to a playback source.
///
/// Sources are streamed over HTTP by the transport's own audio pipeline, which never
/// reads standard input and only decodes the audio track.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StreamPolicy {
    /// Upper bound on each (re)connection to the media host.
    pub reconnect_delay_max: Duration,
}

impl StreamPolicy {
    pub const DEFAULT: StreamPolicy = StreamPolicy {
        reconnect_delay_max: Duration::from_secs(5),
    };
}

impl Default for StreamPolicy {
    fn default() -> Self {
        Self::DEFAULT
    }
}

/// A direct media URL ready to be handed to the transport.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlaybackSource {
    pub url: String,
    pub policy: StreamPolicy,
}

impl PlaybackSource {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            policy: StreamPolicy::DEFAULT,
        }
    }
}

/// Invoked by the transport when a stream ends, with the mid-stream error if any.
pub type CompletionCallback = Box<dyn FnOnce(Option<TransportError>) + Send + 'static>;

/// Wraps a [`CompletionCallback`] so it runs at most once, however many end
/// signals the transport raises for the same stream.
pub struct CompletionOnce {
    callback: Mutex<Option<CompletionCallback>>,
}

impl CompletionOnce {
    pub fn new(callback: CompletionCallback) -> Arc<Self> {
        Arc::new(Self {
            callback: Mutex::new(Some(callback)),
        })
    }

    /// Run the callback if it has not run yet. Returns whether it ran.
    pub fn fire(&self, error: Option<TransportError>) -> bool {
        let callback = match self.callback.lock() {
            Ok(mut slot) => slot.take(),
            Err(poisoned) => poisoned.into_inner().take(),
        };

        match callback {
            Some(callback) => {
                callback(error);
                true
            }
            None => false,
        }
    }
}

/// Opens voice connections.
#[cfg_attr(test, automock)]
#[async_trait]
pub trait VoiceTransport: Send + Sync + 'static {
    /// Connect to `channel_id` in `guild_id` and return the live connection.
    async fn connect(
        &self,
        guild_id: GuildId,
        channel_id: ChannelId,
    ) -> Result<Arc<dyn VoiceConnection>, TransportError>;
}

/// A live connection to one guild's voice endpoint.
#[cfg_attr(test, automock)]
#[async_trait]
pub trait VoiceConnection: Send + Sync {
    /// The channel the connection currently sits in.
    async fn channel_id(&self) -> Option<ChannelId>;

    async fn is_connected(&self) -> bool;

    /// Move the existing connection to another channel of the same guild.
    async fn move_to(&self, channel_id: ChannelId) -> Result<(), TransportError>;

    async fn disconnect(&self, force: bool) -> Result<(), TransportError>;

    /// Start streaming `source`. `on_complete` fires exactly once when the stream ends.
    async fn play(
        &self,
        source: PlaybackSource,
        on_complete: CompletionCallback,
    ) -> Result<(), TransportError>;

    async fn pause(&self) -> Result<(), TransportError>;

    async fn resume(&self) -> Result<(), TransportError>;

    async fn stop(&self) -> Result<(), TransportError>;

    async fn is_playing(&self) -> bool;

    async fn is_paused(&self) -> bool;
}
