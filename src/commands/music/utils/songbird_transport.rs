//! Production [`VoiceTransport`] backed by songbird.

use dashmap::DashMap;
use poise::serenity_prelude::{Cache, ChannelId, GuildId, Permissions};
use serenity::async_trait;
use songbird::input::{HttpRequest, Input};
use songbird::tracks::{PlayMode, TrackHandle};
use songbird::{Call, Event, Songbird, TrackEvent};
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{debug, warn};
use url::Url;

use super::event_handlers::TrackEndNotifier;
use super::transport::{
    CompletionCallback, CompletionOnce, PlaybackSource, StreamPolicy, TransportError,
    VoiceConnection, VoiceTransport,
};

/// Permissions the bot needs in a voice channel before joining it.
const VOICE_PERMISSIONS: Permissions = Permissions::CONNECT.union(Permissions::SPEAK);

/// Check the bot's permissions in `channel_id` against the cache.
///
/// Missing cache data is not treated as a denial; the gateway will reject the join
/// if the permissions really are absent.
fn check_voice_permissions(
    cache: &Cache,
    guild_id: GuildId,
    channel_id: ChannelId,
) -> Result<(), TransportError> {
    let bot_id = cache.current_user().id;
    let Some(guild) = cache.guild(guild_id) else {
        debug!("Guild {} not cached, skipping permission check", guild_id);
        return Ok(());
    };

    let (Some(channel), Some(member)) = (guild.channels.get(&channel_id), guild.members.get(&bot_id))
    else {
        debug!("Channel {} or bot member not cached, skipping permission check", channel_id);
        return Ok(());
    };

    if guild
        .user_permissions_in(channel, member)
        .contains(VOICE_PERMISSIONS)
    {
        Ok(())
    } else {
        Err(TransportError::PermissionDenied)
    }
}

/// HTTP client for fetching media under `policy`.
fn stream_client(policy: &StreamPolicy) -> Result<reqwest::Client, reqwest::Error> {
    reqwest::Client::builder()
        .connect_timeout(policy.reconnect_delay_max)
        .build()
}

/// Current track of each guild's call.
///
/// Songbird hands back the same call when a guild is joined again, so this is shared
/// by every connection the transport creates rather than held per connection.
type GuildTracks = Arc<DashMap<GuildId, TrackHandle>>;

/// Opens songbird calls and streams direct media URLs over them.
pub struct SongbirdTransport {
    songbird: Arc<Songbird>,
    cache: Arc<Cache>,
    http_client: reqwest::Client,
    tracks: GuildTracks,
}

impl SongbirdTransport {
    pub fn new(songbird: Arc<Songbird>, cache: Arc<Cache>) -> Result<Self, reqwest::Error> {
        Ok(Self {
            songbird,
            cache,
            http_client: stream_client(&StreamPolicy::DEFAULT)?,
            tracks: GuildTracks::default(),
        })
    }
}

#[async_trait]
impl VoiceTransport for SongbirdTransport {
    async fn connect(
        &self,
        guild_id: GuildId,
        channel_id: ChannelId,
    ) -> Result<Arc<dyn VoiceConnection>, TransportError> {
        check_voice_permissions(&self.cache, guild_id, channel_id)?;

        let call = match self.songbird.join(guild_id, channel_id).await {
            Ok(call) => call,
            Err(err) => {
                // A failed join leaves a half-open call behind.
                if let Err(cleanup) = self.songbird.remove(guild_id).await {
                    debug!("Nothing to clean up for guild {}: {}", guild_id, cleanup);
                }
                return Err(TransportError::Connection(err.to_string()));
            }
        };

        Ok(Arc::new(SongbirdConnection {
            guild_id,
            call,
            songbird: Arc::clone(&self.songbird),
            cache: Arc::clone(&self.cache),
            http_client: self.http_client.clone(),
            tracks: Arc::clone(&self.tracks),
        }))
    }
}

/// One guild's songbird call.
pub struct SongbirdConnection {
    guild_id: GuildId,
    call: Arc<Mutex<Call>>,
    songbird: Arc<Songbird>,
    cache: Arc<Cache>,
    http_client: reqwest::Client,
    tracks: GuildTracks,
}

impl SongbirdConnection {
    fn track(&self) -> Option<TrackHandle> {
        self.tracks
            .get(&self.guild_id)
            .map(|track| track.value().clone())
    }

    async fn play_mode(&self) -> Option<PlayMode> {
        let track = self.track()?;
        track.get_info().await.ok().map(|state| state.playing)
    }

    fn client_for(&self, policy: &StreamPolicy) -> Result<reqwest::Client, TransportError> {
        if *policy == StreamPolicy::DEFAULT {
            return Ok(self.http_client.clone());
        }
        stream_client(policy).map_err(|e| TransportError::Rejected(e.to_string()))
    }

    fn validate(source: &PlaybackSource) -> Result<(), TransportError> {
        if source.policy.reconnect_delay_max.is_zero() {
            return Err(TransportError::Rejected(
                "reconnect delay bound must be positive".into(),
            ));
        }

        let url = Url::parse(&source.url)
            .map_err(|e| TransportError::Rejected(format!("invalid stream URL: {e}")))?;

        match url.scheme() {
            "http" | "https" => Ok(()),
            scheme => Err(TransportError::Rejected(format!(
                "unsupported stream scheme: {scheme}"
            ))),
        }
    }
}

#[async_trait]
impl VoiceConnection for SongbirdConnection {
    async fn channel_id(&self) -> Option<ChannelId> {
        self.call
            .lock()
            .await
            .current_channel()
            .map(|channel| ChannelId::new(channel.0.get()))
    }

    async fn is_connected(&self) -> bool {
        let Some(active) = self.songbird.get(self.guild_id) else {
            return false;
        };
        if !Arc::ptr_eq(&active, &self.call) {
            return false;
        }

        self.call.lock().await.current_connection().is_some()
    }

    async fn move_to(&self, channel_id: ChannelId) -> Result<(), TransportError> {
        check_voice_permissions(&self.cache, self.guild_id, channel_id)?;

        self.songbird
            .join(self.guild_id, channel_id)
            .await
            .map(|_| ())
            .map_err(|e| TransportError::Connection(e.to_string()))
    }

    async fn disconnect(&self, force: bool) -> Result<(), TransportError> {
        self.tracks.remove(&self.guild_id);

        let result = if force {
            self.songbird.remove(self.guild_id).await
        } else {
            self.call.lock().await.leave().await
        };

        result.map_err(|e| TransportError::Connection(e.to_string()))
    }

    async fn play(
        &self,
        source: PlaybackSource,
        on_complete: CompletionCallback,
    ) -> Result<(), TransportError> {
        Self::validate(&source)?;

        let client = self.client_for(&source.policy)?;
        let input: Input = HttpRequest::new(client, source.url).into();
        // Stops every other track on the call, including ones started before a rejoin.
        let handle = self.call.lock().await.play_only_input(input);

        let completion = CompletionOnce::new(on_complete);
        for event in [TrackEvent::End, TrackEvent::Error] {
            let notifier = TrackEndNotifier::new(self.guild_id, Arc::clone(&completion));
            if let Err(err) = handle.add_event(Event::Track(event), notifier) {
                warn!("Could not watch track in guild {}: {}", self.guild_id, err);
                let _ = handle.stop();
                return Err(TransportError::Rejected(err.to_string()));
            }
        }

        self.tracks.insert(self.guild_id, handle);
        Ok(())
    }

    async fn pause(&self) -> Result<(), TransportError> {
        let track = self
            .track()
            .ok_or_else(|| TransportError::Control("no active track".into()))?;
        track
            .pause()
            .map_err(|e| TransportError::Control(e.to_string()))
    }

    async fn resume(&self) -> Result<(), TransportError> {
        let track = self
            .track()
            .ok_or_else(|| TransportError::Control("no active track".into()))?;
        track
            .play()
            .map_err(|e| TransportError::Control(e.to_string()))
    }

    async fn stop(&self) -> Result<(), TransportError> {
        self.call.lock().await.stop();
        self.tracks.remove(&self.guild_id);
        Ok(())
    }

    async fn is_playing(&self) -> bool {
        matches!(self.play_mode().await, Some(PlayMode::Play))
    }

    async fn is_paused(&self) -> bool {
        matches!(self.play_mode().await, Some(PlayMode::Pause))
    }
}
