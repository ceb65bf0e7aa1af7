use poise::serenity_prelude::{ChannelId, GuildId};
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, error, info, warn};

use crate::commands::music::audio_sources::track_metadata::StreamDescriptor;
use crate::commands::music::audio_sources::{MediaResolver, ResolverError};

use super::session_registry::{GuildSession, GuildSessionRegistry, PlaybackState, SessionState};
use super::transport::{
    CompletionCallback, PlaybackSource, TransportError, VoiceConnection, VoiceTransport,
};

/// Errors that can occur during music operations
#[derive(Error, Debug)]
pub enum MusicError {
    #[error("Not in a guild")]
    NotInGuild,

    #[error("User is not in a voice channel")]
    NotInVoice,

    #[error("Missing voice permissions")]
    PermissionDenied,

    #[error("Failed to connect to voice channel: {0}")]
    ConnectionFailed(#[source] TransportError),

    #[error("Resolver returned no media")]
    NoMediaFound,

    #[error("Resolver returned no playable entries")]
    NoPlayableEntries,

    #[error("Selected entry has no stream URL")]
    NoStreamUrl,

    #[error("Resolution failed: {0}")]
    ResolutionError(#[source] ResolverError),

    #[error("Resolution timed out after {0:?}")]
    ResolutionTimedOut(Duration),

    #[error("Failed to start playback: {0}")]
    PlaybackStartError(#[source] TransportError),

    #[error("Not connected to a voice channel")]
    NotConnected,

    #[error("Nothing is playing")]
    NotPlaying,

    #[error("Playback is not paused")]
    NotPaused,

    #[error("Voice transport error: {0}")]
    Transport(#[source] TransportError),
}

/// Result type for music operations
pub type MusicResult<T> = Result<T, MusicError>;

/// Reply used for failures that are not worth explaining to the user.
pub const GENERIC_FAILURE_MESSAGE: &str =
    "Something unexpected happened. Please try again or contact an admin if it continues.";

impl MusicError {
    /// Map a connect/move failure onto the user-facing taxonomy.
    fn from_connect(err: TransportError) -> Self {
        match err {
            TransportError::PermissionDenied => MusicError::PermissionDenied,
            other => MusicError::ConnectionFailed(other),
        }
    }

    /// Short, friendly text for the invoking user. Never contains internal detail.
    pub fn user_message(&self) -> &'static str {
        match self {
            MusicError::NotInGuild => "Only server members can use voice commands.",
            MusicError::NotInVoice => "You need to be connected to a voice channel first.",
            MusicError::PermissionDenied => {
                "I don't have permission to join or speak in that voice channel."
            }
            MusicError::ConnectionFailed(_) => {
                "Couldn't connect to the voice channel. Please try again."
            }
            MusicError::NoMediaFound => "No media could be extracted from that link.",
            MusicError::NoPlayableEntries => "No playable entries were found in that playlist.",
            MusicError::NoStreamUrl => "No playable audio stream was found for that link.",
            MusicError::ResolutionError(_) | MusicError::ResolutionTimedOut(_) => {
                "Something went wrong while trying to get that audio. Please try a different link."
            }
            MusicError::PlaybackStartError(_) => {
                "I couldn't start playback. Please verify the link is supported and try again."
            }
            MusicError::NotConnected => "I'm not connected to a voice channel.",
            MusicError::NotPlaying => "Nothing is playing right now.",
            MusicError::NotPaused => "Playback is not paused.",
            MusicError::Transport(_) => GENERIC_FAILURE_MESSAGE,
        }
    }

    /// Whether the failure points at a fault on our side rather than at user input.
    pub fn is_internal(&self) -> bool {
        matches!(
            self,
            MusicError::ConnectionFailed(_)
                | MusicError::ResolutionError(_)
                | MusicError::ResolutionTimedOut(_)
                | MusicError::PlaybackStartError(_)
                | MusicError::Transport(_)
        )
    }
}

/// One `play` invocation: where it came from and what to play.
#[derive(Debug, Clone)]
pub struct PlaybackRequest {
    pub guild_id: GuildId,
    /// The requesting member's current voice channel, if any.
    pub channel_id: Option<ChannelId>,
    /// URL or search query.
    pub query: String,
}

/// Per-guild voice session controller.
///
/// Every command that touches a guild's voice state runs under that guild's lock, so
/// commands for one guild apply in arrival order while other guilds proceed in parallel.
pub struct MusicManager<T, R> {
    transport: T,
    resolver: Arc<R>,
    sessions: GuildSessionRegistry,
    resolve_timeout: Duration,
}

impl<T, R> MusicManager<T, R>
where
    T: VoiceTransport,
    R: MediaResolver,
{
    pub fn new(transport: T, resolver: R, resolve_timeout: Duration) -> Self {
        Self {
            transport,
            resolver: Arc::new(resolver),
            sessions: GuildSessionRegistry::new(),
            resolve_timeout,
        }
    }

    pub fn sessions(&self) -> &GuildSessionRegistry {
        &self.sessions
    }

    /// Cached playback state for a guild, without waiting on its lock.
    pub fn playback_state(&self, guild_id: GuildId) -> PlaybackState {
        self.sessions.acquire_lock(guild_id).playback().state()
    }

    /// Join the requester's voice channel (or move there).
    pub async fn join(
        &self,
        guild_id: GuildId,
        channel_id: Option<ChannelId>,
    ) -> MusicResult<ChannelId> {
        let session = self.sessions.acquire_lock(guild_id);
        let mut state = session.lock().await;
        self.refresh(guild_id, &session, &mut state).await;

        let connection = self.ensure_connected(guild_id, &mut state, channel_id).await?;
        connection
            .channel_id()
            .await
            .or(channel_id)
            .ok_or(MusicError::NotConnected)
    }

    /// Connect, resolve and start streaming, replacing whatever was playing.
    pub async fn play(&self, request: PlaybackRequest) -> MusicResult<StreamDescriptor> {
        let PlaybackRequest {
            guild_id,
            channel_id,
            query,
        } = request;

        let session = self.sessions.acquire_lock(guild_id);
        let mut state = session.lock().await;
        self.refresh(guild_id, &session, &mut state).await;

        let connection = self.ensure_connected(guild_id, &mut state, channel_id).await?;

        let descriptor = self.resolve(&query).await.inspect_err(|err| match err {
            MusicError::ResolutionError(cause) => {
                error!("Resolver failed for {} in guild {}: {}", query, guild_id, cause)
            }
            MusicError::ResolutionTimedOut(after) => {
                error!("Resolver timed out after {:?} for {} in guild {}", after, query, guild_id)
            }
            other => info!("Nothing playable for {} in guild {}: {}", query, guild_id, other),
        })?;

        self.start_playback(guild_id, &session, &connection, &descriptor)
            .await?;

        Ok(descriptor)
    }

    pub async fn pause(&self, guild_id: GuildId) -> MusicResult<()> {
        let session = self.sessions.acquire_lock(guild_id);
        let mut state = session.lock().await;
        let connection = self.connected(guild_id, &session, &mut state).await?;

        if session.playback().state() != PlaybackState::Playing {
            return Err(MusicError::NotPlaying);
        }

        connection.pause().await.map_err(MusicError::Transport)?;
        session.playback().set(PlaybackState::Paused);
        info!("Paused playback in guild {}", guild_id);
        Ok(())
    }

    pub async fn resume(&self, guild_id: GuildId) -> MusicResult<()> {
        let session = self.sessions.acquire_lock(guild_id);
        let mut state = session.lock().await;
        let connection = self.connected(guild_id, &session, &mut state).await?;

        if session.playback().state() != PlaybackState::Paused {
            return Err(MusicError::NotPaused);
        }

        connection.resume().await.map_err(MusicError::Transport)?;
        session.playback().set(PlaybackState::Playing);
        info!("Resumed playback in guild {}", guild_id);
        Ok(())
    }

    pub async fn stop(&self, guild_id: GuildId) -> MusicResult<()> {
        let session = self.sessions.acquire_lock(guild_id);
        let mut state = session.lock().await;
        let connection = self.connected(guild_id, &session, &mut state).await?;

        connection.stop().await.map_err(MusicError::Transport)?;
        session.playback().reset();
        info!("Stopped playback in guild {}", guild_id);
        Ok(())
    }

    /// Disconnect from voice and forget the connection.
    pub async fn leave(&self, guild_id: GuildId) -> MusicResult<()> {
        let session = self.sessions.acquire_lock(guild_id);
        let mut state = session.lock().await;
        let connection = self.connected(guild_id, &session, &mut state).await?;

        state.connection = None;
        session.playback().reset();
        connection
            .disconnect(true)
            .await
            .map_err(MusicError::Transport)?;
        info!("Left voice in guild {}", guild_id);
        Ok(())
    }

    /// Drop the cached connection after the gateway reported that we left voice.
    ///
    /// The report can arrive after a quick leave and rejoin, so a connection the
    /// transport still considers live is kept.
    pub async fn forget(&self, guild_id: GuildId) -> bool {
        let session = self.sessions.acquire_lock(guild_id);
        let mut state = session.lock().await;

        if let Some(connection) = state.connection.clone() {
            if connection.is_connected().await {
                debug!("Ignoring stale voice leave for guild {}", guild_id);
                return false;
            }
            state.connection = None;
            debug!("Dropped cached voice connection for guild {}", guild_id);
        }
        session.playback().reset();
        true
    }

    /// Make sure the guild holds a connection in the requester's channel.
    ///
    /// Must be called with the guild's lock held; `state` is the guarded session.
    pub async fn ensure_connected(
        &self,
        guild_id: GuildId,
        state: &mut SessionState,
        channel_id: Option<ChannelId>,
    ) -> MusicResult<Arc<dyn VoiceConnection>> {
        let channel_id = channel_id.ok_or(MusicError::NotInVoice)?;

        if let Some(connection) = state.connection.clone() {
            if connection.is_connected().await {
                if connection.channel_id().await == Some(channel_id) {
                    return Ok(connection);
                }

                info!("Moving to voice channel {} in guild {}", channel_id, guild_id);
                connection
                    .move_to(channel_id)
                    .await
                    .map_err(MusicError::from_connect)
                    .inspect_err(|e| warn!("Move failed in guild {}: {}", guild_id, e))?;
                return Ok(connection);
            }

            debug!("Discarding dead voice connection for guild {}", guild_id);
            state.connection = None;
        }

        info!("Joining voice channel {} in guild {}", channel_id, guild_id);
        let connection = self
            .transport
            .connect(guild_id, channel_id)
            .await
            .map_err(MusicError::from_connect)
            .inspect_err(|e| warn!("Join failed in guild {}: {}", guild_id, e))?;

        state.connection = Some(Arc::clone(&connection));
        Ok(connection)
    }

    /// Resolve a URL or query on the blocking pool, bounded by the resolve timeout.
    pub async fn resolve(&self, query: &str) -> MusicResult<StreamDescriptor> {
        let resolver = Arc::clone(&self.resolver);
        let owned_query = query.to_string();
        let task = tokio::task::spawn_blocking(move || resolver.extract(&owned_query));

        let extracted = match tokio::time::timeout(self.resolve_timeout, task).await {
            Ok(Ok(result)) => result.map_err(MusicError::ResolutionError)?,
            Ok(Err(join_error)) => {
                return Err(MusicError::ResolutionError(ResolverError::Task(
                    join_error.to_string(),
                )));
            }
            Err(_) => return Err(MusicError::ResolutionTimedOut(self.resolve_timeout)),
        };

        StreamDescriptor::select(extracted)
    }

    /// Replace whatever is playing with `descriptor`.
    pub async fn start_playback(
        &self,
        guild_id: GuildId,
        session: &GuildSession,
        connection: &Arc<dyn VoiceConnection>,
        descriptor: &StreamDescriptor,
    ) -> MusicResult<()> {
        if connection.is_playing().await || connection.is_paused().await {
            debug!("Stopping current stream in guild {}", guild_id);
            connection
                .stop()
                .await
                .map_err(MusicError::PlaybackStartError)?;
        }

        let tracker = Arc::clone(session.playback());
        let generation = tracker.begin();
        let title = descriptor.title.clone();
        let on_complete: CompletionCallback = Box::new(move |error| {
            match error {
                Some(err) => error!("Playback error in guild {}: {}", guild_id, err),
                None => debug!("Finished playing '{}' in guild {}", title, guild_id),
            }
            if tracker.finish(generation) {
                debug!("Guild {} is idle", guild_id);
            }
        });

        let source = PlaybackSource::new(descriptor.stream_url.clone());
        if let Err(err) = connection.play(source, on_complete).await {
            error!(
                "Transport rejected stream for '{}' in guild {}: {}",
                descriptor.title, guild_id, err
            );
            session.playback().reset();
            return Err(MusicError::PlaybackStartError(err));
        }

        info!("Now playing '{}' in guild {}", descriptor.title, guild_id);
        Ok(())
    }

    /// Repair the cached session against the transport: drop a dead connection and
    /// re-read the live playback state.
    async fn refresh(&self, guild_id: GuildId, session: &GuildSession, state: &mut SessionState) {
        let Some(connection) = state.connection.clone() else {
            session.playback().set(PlaybackState::Idle);
            return;
        };

        if !connection.is_connected().await {
            info!("Voice connection for guild {} went away, resetting", guild_id);
            state.connection = None;
            session.playback().reset();
            return;
        }

        let live = if connection.is_playing().await {
            PlaybackState::Playing
        } else if connection.is_paused().await {
            PlaybackState::Paused
        } else {
            PlaybackState::Idle
        };

        if live != session.playback().state() {
            debug!(
                "Guild {} playback state {:?} -> {:?}",
                guild_id,
                session.playback().state(),
                live
            );
            session.playback().set(live);
        }
    }

    /// Refresh, then require a live connection.
    async fn connected(
        &self,
        guild_id: GuildId,
        session: &GuildSession,
        state: &mut SessionState,
    ) -> MusicResult<Arc<dyn VoiceConnection>> {
        self.refresh(guild_id, session, state).await;
        state.connection.clone().ok_or(MusicError::NotConnected)
    }
}
