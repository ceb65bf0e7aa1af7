//! Per-guild session bookkeeping.
//!
//! Every guild gets exactly one [`GuildSession`], created on first use and kept for the
//! life of the process. Its mutex is what serializes playback commands for that guild.

use dashmap::DashMap;
use poise::serenity_prelude::GuildId;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use tokio::sync::{Mutex, MutexGuard};

use super::transport::VoiceConnection;

/// Last known playback state of a guild.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PlaybackState {
    #[default]
    Idle,
    Playing,
    Paused,
}

impl PlaybackState {
    const fn bits(self) -> u64 {
        match self {
            PlaybackState::Idle => 0,
            PlaybackState::Playing => 1,
            PlaybackState::Paused => 2,
        }
    }

    const fn from_bits(bits: u64) -> Self {
        match bits & STATE_MASK {
            1 => PlaybackState::Playing,
            2 => PlaybackState::Paused,
            _ => PlaybackState::Idle,
        }
    }
}

const STATE_BITS: u32 = 2;
const STATE_MASK: u64 = (1 << STATE_BITS) - 1;

/// Playback state plus a generation counter, packed into one atomic word.
///
/// The controller writes it while holding the guild lock. Completion callbacks write
/// it without the lock, and only through [`PlaybackTracker::finish`], which resets the
/// state only if no newer stream has started since.
#[derive(Debug, Default)]
pub struct PlaybackTracker {
    word: AtomicU64,
}

impl PlaybackTracker {
    fn pack(generation: u64, state: PlaybackState) -> u64 {
        (generation << STATE_BITS) | state.bits()
    }

    pub fn state(&self) -> PlaybackState {
        PlaybackState::from_bits(self.word.load(Ordering::Acquire))
    }

    pub fn generation(&self) -> u64 {
        self.word.load(Ordering::Acquire) >> STATE_BITS
    }

    /// Mark a new stream as playing and return its generation.
    pub fn begin(&self) -> u64 {
        let previous = self
            .word
            .fetch_update(Ordering::AcqRel, Ordering::Acquire, |word| {
                Some(Self::pack((word >> STATE_BITS) + 1, PlaybackState::Playing))
            })
            .unwrap_or_else(|word| word);
        (previous >> STATE_BITS) + 1
    }

    /// Overwrite the state, keeping the current generation.
    pub fn set(&self, state: PlaybackState) {
        let _ = self
            .word
            .fetch_update(Ordering::AcqRel, Ordering::Acquire, |word| {
                Some(Self::pack(word >> STATE_BITS, state))
            });
    }

    /// Go idle and invalidate any completion still pending for the old stream.
    pub fn reset(&self) {
        let _ = self
            .word
            .fetch_update(Ordering::AcqRel, Ordering::Acquire, |word| {
                Some(Self::pack((word >> STATE_BITS) + 1, PlaybackState::Idle))
            });
    }

    /// Called when the stream of `generation` ended. Returns whether the state was reset.
    pub fn finish(&self, generation: u64) -> bool {
        self.word
            .fetch_update(Ordering::AcqRel, Ordering::Acquire, |word| {
                (word >> STATE_BITS == generation)
                    .then(|| Self::pack(generation, PlaybackState::Idle))
            })
            .is_ok()
    }
}

/// What the guild lock protects.
#[derive(Default)]
pub struct SessionState {
    /// The live voice connection, absent when not connected.
    pub connection: Option<Arc<dyn VoiceConnection>>,
}

impl std::fmt::Debug for SessionState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionState")
            .field("connected", &self.connection.is_some())
            .finish()
    }
}

/// One guild's serialization primitive and cached playback state.
#[derive(Default)]
pub struct GuildSession {
    state: Mutex<SessionState>,
    playback: Arc<PlaybackTracker>,
}

impl GuildSession {
    /// Wait for exclusive access to the guild's session.
    pub async fn lock(&self) -> MutexGuard<'_, SessionState> {
        self.state.lock().await
    }

    pub fn playback(&self) -> &Arc<PlaybackTracker> {
        &self.playback
    }
}

/// Maps guild IDs to their [`GuildSession`]. Entries are never removed.
#[derive(Default)]
pub struct GuildSessionRegistry {
    sessions: DashMap<GuildId, Arc<GuildSession>>,
}

impl GuildSessionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Return the guild's session, creating it on first access.
    pub fn acquire_lock(&self, guild_id: GuildId) -> Arc<GuildSession> {
        if let Some(session) = self.sessions.get(&guild_id) {
            return Arc::clone(session.value());
        }

        Arc::clone(self.sessions.entry(guild_id).or_default().value())
    }

    /// Number of guilds seen so far.
    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }
}
