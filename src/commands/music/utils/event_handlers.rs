use std::sync::Arc;

use poise::serenity_prelude as serenity;
use serenity::async_trait;
use songbird::tracks::PlayMode;
use tracing::{debug, warn};

use super::transport::{CompletionOnce, TransportError};

/// Event handler for when a track ends or errors out.
///
/// One notifier is registered for each of songbird's `End` and `Error` track events;
/// they share a [`CompletionOnce`] so the completion callback still runs only once.
pub struct TrackEndNotifier {
    pub guild_id: serenity::GuildId,
    pub completion: Arc<CompletionOnce>,
}

impl TrackEndNotifier {
    pub fn new(guild_id: serenity::GuildId, completion: Arc<CompletionOnce>) -> Self {
        Self {
            guild_id,
            completion,
        }
    }
}

#[async_trait]
impl songbird::EventHandler for TrackEndNotifier {
    async fn act(&self, ctx: &songbird::EventContext<'_>) -> Option<songbird::Event> {
        if let songbird::EventContext::Track(tracks) = ctx {
            let error = tracks.iter().find_map(|(state, _)| match &state.playing {
                PlayMode::Errored(err) => Some(TransportError::Stream(format!("{err:?}"))),
                _ => None,
            });

            if let Some(err) = &error {
                warn!("Track errored in guild {}: {}", self.guild_id, err);
            }

            if !self.completion.fire(error) {
                debug!("Duplicate end signal ignored for guild {}", self.guild_id);
            }
        }
        None
    }
}
