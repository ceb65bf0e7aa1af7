use std::sync::Arc;
use std::time::Duration;

use assert_matches::assert_matches;
use melody::commands::music::utils::music_manager::{MusicError, PlaybackRequest};
use melody::commands::music::utils::session_registry::PlaybackState;
use melody::commands::music::utils::transport::TransportError;
use poise::serenity_prelude::{ChannelId, GuildId};
use pretty_assertions::assert_eq;
use tokio::time::timeout;

use crate::common::Harness;
use crate::common::fixtures::{CHANNEL_A, CHANNEL_B, GUILD_ONE, GUILD_TWO};
use crate::common::mocks::TransportCall;

const WAIT: Duration = Duration::from_secs(2);

fn request(guild_id: GuildId, channel_id: ChannelId, query: &str) -> PlaybackRequest {
    PlaybackRequest {
        guild_id,
        channel_id: Some(channel_id),
        query: query.to_string(),
    }
}

fn cdn(query: &str) -> String {
    format!("https://cdn.example.com/{query}")
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_slow_resolution_does_not_block_other_guilds() {
    let h = Harness::new();

    let manager = Arc::clone(&h.manager);
    let slow = tokio::spawn(async move {
        manager
            .play(request(GUILD_ONE, CHANNEL_A, "slow:first"))
            .await
    });
    let started = timeout(WAIT, h.resolver.wait_for_started(1)).await;

    let fast = timeout(WAIT, h.manager.play(request(GUILD_TWO, CHANNEL_B, "fast"))).await;
    h.resolver.open_gate();

    assert!(started.is_ok());
    let fast = fast.expect("guild two waited on guild one");
    assert_eq!(fast.unwrap().stream_url, cdn("fast"));

    slow.await.unwrap().unwrap();
    assert_eq!(h.transport.played_urls(), vec![cdn("fast"), cdn("slow:first")]);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_same_guild_commands_run_in_arrival_order() {
    let h = Harness::new();

    let manager = Arc::clone(&h.manager);
    let first = tokio::spawn(async move {
        manager
            .play(request(GUILD_ONE, CHANNEL_A, "slow:first"))
            .await
    });
    let started = timeout(WAIT, h.resolver.wait_for_started(1)).await;

    let manager = Arc::clone(&h.manager);
    let second = tokio::spawn(async move {
        manager
            .play(request(GUILD_ONE, CHANNEL_A, "second"))
            .await
    });
    tokio::time::sleep(Duration::from_millis(100)).await;
    let resolutions_while_locked = h.resolver.started();
    h.resolver.open_gate();

    assert!(started.is_ok());
    first.await.unwrap().unwrap();
    second.await.unwrap().unwrap();

    assert_eq!(resolutions_while_locked, 1);
    assert_eq!(h.resolver.queries(), vec!["slow:first", "second"]);
    assert_eq!(
        h.transport.calls(),
        vec![
            TransportCall::Connect(GUILD_ONE, CHANNEL_A),
            TransportCall::Play(cdn("slow:first")),
            TransportCall::Stop,
            TransportCall::Play(cdn("second")),
        ]
    );
}

#[tokio::test]
async fn test_join_outside_voice_creates_no_session() {
    let h = Harness::new();

    assert_matches!(
        h.manager.join(GUILD_ONE, None).await,
        Err(MusicError::NotInVoice)
    );
    assert!(h.transport.calls().is_empty());
}

#[tokio::test]
async fn test_play_outside_voice_resolves_nothing() {
    let h = Harness::new();
    let request = PlaybackRequest {
        guild_id: GUILD_ONE,
        channel_id: None,
        query: "song".to_string(),
    };

    assert_matches!(h.manager.play(request).await, Err(MusicError::NotInVoice));
    assert_eq!(h.resolver.started(), 0);
    assert!(h.transport.calls().is_empty());
}

#[tokio::test]
async fn test_join_is_idempotent() {
    let h = Harness::new();

    assert_eq!(h.manager.join(GUILD_ONE, Some(CHANNEL_A)).await.unwrap(), CHANNEL_A);
    assert_eq!(h.manager.join(GUILD_ONE, Some(CHANNEL_A)).await.unwrap(), CHANNEL_A);

    assert_eq!(
        h.transport.calls(),
        vec![TransportCall::Connect(GUILD_ONE, CHANNEL_A)]
    );
}

#[tokio::test]
async fn test_play_from_other_channel_moves_once() {
    let h = Harness::new();
    h.manager.join(GUILD_ONE, Some(CHANNEL_A)).await.unwrap();

    let descriptor = h
        .manager
        .play(request(GUILD_ONE, CHANNEL_B, "song"))
        .await
        .unwrap();

    assert_eq!(descriptor.stream_url, cdn("song"));
    assert_eq!(
        h.transport.calls(),
        vec![
            TransportCall::Connect(GUILD_ONE, CHANNEL_A),
            TransportCall::Move(CHANNEL_B),
            TransportCall::Play(cdn("song")),
        ]
    );
}

#[tokio::test]
async fn test_play_while_playing_stops_once_first() {
    let h = Harness::new();

    h.manager.play(request(GUILD_ONE, CHANNEL_A, "one")).await.unwrap();
    h.manager.play(request(GUILD_ONE, CHANNEL_A, "two")).await.unwrap();

    assert_eq!(h.transport.count(|c| *c == TransportCall::Stop), 1);
    assert_eq!(
        h.transport.calls()[1..],
        [
            TransportCall::Play(cdn("one")),
            TransportCall::Stop,
            TransportCall::Play(cdn("two")),
        ]
    );
    assert_eq!(h.manager.playback_state(GUILD_ONE), PlaybackState::Playing);
}

#[tokio::test]
async fn test_play_while_paused_stops_first() {
    let h = Harness::new();

    h.manager.play(request(GUILD_ONE, CHANNEL_A, "one")).await.unwrap();
    h.manager.pause(GUILD_ONE).await.unwrap();
    h.manager.play(request(GUILD_ONE, CHANNEL_A, "two")).await.unwrap();

    assert_eq!(h.transport.count(|c| *c == TransportCall::Stop), 1);
    assert_eq!(h.manager.playback_state(GUILD_ONE), PlaybackState::Playing);
}

#[tokio::test]
async fn test_pause_and_resume_transitions() {
    let h = Harness::new();
    h.manager.play(request(GUILD_ONE, CHANNEL_A, "song")).await.unwrap();

    h.manager.pause(GUILD_ONE).await.unwrap();
    assert_eq!(h.manager.playback_state(GUILD_ONE), PlaybackState::Paused);
    assert_matches!(h.manager.pause(GUILD_ONE).await, Err(MusicError::NotPlaying));

    h.manager.resume(GUILD_ONE).await.unwrap();
    assert_eq!(h.manager.playback_state(GUILD_ONE), PlaybackState::Playing);
    assert_matches!(h.manager.resume(GUILD_ONE).await, Err(MusicError::NotPaused));

    assert_eq!(h.transport.count(|c| *c == TransportCall::Pause), 1);
    assert_eq!(h.transport.count(|c| *c == TransportCall::Resume), 1);
}

#[tokio::test]
async fn test_pause_when_idle() {
    let h = Harness::new();
    h.manager.join(GUILD_ONE, Some(CHANNEL_A)).await.unwrap();

    assert_matches!(h.manager.pause(GUILD_ONE).await, Err(MusicError::NotPlaying));
    assert_matches!(h.manager.resume(GUILD_ONE).await, Err(MusicError::NotPaused));
}

#[tokio::test]
async fn test_controls_without_connection() {
    let h = Harness::new();

    assert_matches!(h.manager.pause(GUILD_ONE).await, Err(MusicError::NotConnected));
    assert_matches!(h.manager.resume(GUILD_ONE).await, Err(MusicError::NotConnected));
    assert_matches!(h.manager.stop(GUILD_ONE).await, Err(MusicError::NotConnected));
    assert_matches!(h.manager.leave(GUILD_ONE).await, Err(MusicError::NotConnected));
}

#[tokio::test]
async fn test_stop_goes_idle_and_stays_connected() {
    let h = Harness::new();
    h.manager.play(request(GUILD_ONE, CHANNEL_A, "song")).await.unwrap();

    h.manager.stop(GUILD_ONE).await.unwrap();

    assert_eq!(h.manager.playback_state(GUILD_ONE), PlaybackState::Idle);
    assert_matches!(h.manager.pause(GUILD_ONE).await, Err(MusicError::NotPlaying));
    assert_eq!(h.transport.count(|c| matches!(c, TransportCall::Disconnect { .. })), 0);
}

#[tokio::test]
async fn test_dead_connection_is_repaired() {
    let h = Harness::new();
    h.manager.play(request(GUILD_ONE, CHANNEL_A, "song")).await.unwrap();

    h.transport.drop_connection(GUILD_ONE);

    assert_matches!(h.manager.pause(GUILD_ONE).await, Err(MusicError::NotConnected));
    assert_eq!(h.manager.playback_state(GUILD_ONE), PlaybackState::Idle);

    h.manager.play(request(GUILD_ONE, CHANNEL_A, "again")).await.unwrap();
    assert_eq!(
        h.transport.count(|c| matches!(c, TransportCall::Connect(..))),
        2
    );
}

#[tokio::test]
async fn test_natural_completion_goes_idle() {
    let h = Harness::new();
    h.manager.play(request(GUILD_ONE, CHANNEL_A, "song")).await.unwrap();

    assert!(h.transport.finish_current(GUILD_ONE, None));

    assert_eq!(h.manager.playback_state(GUILD_ONE), PlaybackState::Idle);
    assert_matches!(h.manager.pause(GUILD_ONE).await, Err(MusicError::NotPlaying));
}

#[tokio::test]
async fn test_stream_error_is_not_retried() {
    let h = Harness::new();
    h.manager.play(request(GUILD_ONE, CHANNEL_A, "song")).await.unwrap();

    assert!(h.transport.finish_current(
        GUILD_ONE,
        Some(TransportError::Stream("decoder gave up".into()))
    ));

    assert_eq!(h.manager.playback_state(GUILD_ONE), PlaybackState::Idle);
    assert_eq!(h.transport.played_urls(), vec![cdn("song")]);
}

#[tokio::test]
async fn test_late_completion_of_replaced_stream_is_ignored() {
    let h = Harness::new();
    h.manager.play(request(GUILD_ONE, CHANNEL_A, "one")).await.unwrap();
    h.manager.play(request(GUILD_ONE, CHANNEL_A, "two")).await.unwrap();

    assert!(h.transport.fire_completion(GUILD_ONE, 0, None));

    assert_eq!(h.manager.playback_state(GUILD_ONE), PlaybackState::Playing);
    h.manager.pause(GUILD_ONE).await.unwrap();
}

#[tokio::test]
async fn test_rejected_source_leaves_guild_idle() {
    let h = Harness::new();
    h.transport
        .fail_play_with(TransportError::Rejected("unsupported codec".into()));

    assert_matches!(
        h.manager.play(request(GUILD_ONE, CHANNEL_A, "song")).await,
        Err(MusicError::PlaybackStartError(TransportError::Rejected(_)))
    );
    assert_eq!(h.manager.playback_state(GUILD_ONE), PlaybackState::Idle);

    // Still connected: joining again does not reconnect
    h.manager.join(GUILD_ONE, Some(CHANNEL_A)).await.unwrap();
    assert_eq!(
        h.transport.count(|c| matches!(c, TransportCall::Connect(..))),
        1
    );
}

#[tokio::test]
async fn test_leave_disconnects_and_forgets() {
    let h = Harness::new();
    h.manager.play(request(GUILD_ONE, CHANNEL_A, "song")).await.unwrap();

    h.manager.leave(GUILD_ONE).await.unwrap();

    assert_eq!(
        h.transport.calls().last(),
        Some(&TransportCall::Disconnect { force: true })
    );
    assert_eq!(h.manager.playback_state(GUILD_ONE), PlaybackState::Idle);
    assert_matches!(h.manager.leave(GUILD_ONE).await, Err(MusicError::NotConnected));
    assert_matches!(h.manager.stop(GUILD_ONE).await, Err(MusicError::NotConnected));
}

#[tokio::test]
async fn test_permission_denied_keeps_no_connection() {
    let h = Harness::new();
    h.transport.fail_connect_with(TransportError::PermissionDenied);

    assert_matches!(
        h.manager.join(GUILD_ONE, Some(CHANNEL_A)).await,
        Err(MusicError::PermissionDenied)
    );
    assert_matches!(h.manager.stop(GUILD_ONE).await, Err(MusicError::NotConnected));
}

#[tokio::test]
async fn test_connection_failure_maps_to_connection_failed() {
    let h = Harness::new();
    h.transport
        .fail_connect_with(TransportError::Connection("gateway timed out".into()));

    let err = h
        .manager
        .play(request(GUILD_ONE, CHANNEL_A, "song"))
        .await
        .unwrap_err();

    assert_matches!(err, MusicError::ConnectionFailed(_));
    assert!(err.is_internal());
    assert_eq!(h.resolver.started(), 0);
}

#[tokio::test]
async fn test_forget_drops_cached_connection() {
    let h = Harness::new();
    h.manager.play(request(GUILD_ONE, CHANNEL_A, "song")).await.unwrap();
    h.transport.drop_connection(GUILD_ONE);

    assert!(h.manager.forget(GUILD_ONE).await);

    assert_eq!(h.manager.playback_state(GUILD_ONE), PlaybackState::Idle);
    assert_matches!(h.manager.stop(GUILD_ONE).await, Err(MusicError::NotConnected));
}

#[tokio::test]
async fn test_stale_leave_report_keeps_live_connection() {
    let h = Harness::new();
    h.manager.play(request(GUILD_ONE, CHANNEL_A, "one")).await.unwrap();

    assert!(!h.manager.forget(GUILD_ONE).await);
    h.manager.play(request(GUILD_ONE, CHANNEL_A, "two")).await.unwrap();

    assert_eq!(
        h.transport.calls(),
        vec![
            TransportCall::Connect(GUILD_ONE, CHANNEL_A),
            TransportCall::Play(cdn("one")),
            TransportCall::Stop,
            TransportCall::Play(cdn("two")),
        ]
    );
    assert_eq!(h.manager.playback_state(GUILD_ONE), PlaybackState::Playing);
    h.manager.pause(GUILD_ONE).await.unwrap();
    h.manager.leave(GUILD_ONE).await.unwrap();
}

#[tokio::test]
async fn test_guilds_keep_separate_state() {
    let h = Harness::new();
    h.manager.play(request(GUILD_ONE, CHANNEL_A, "one")).await.unwrap();
    h.manager.join(GUILD_TWO, Some(CHANNEL_B)).await.unwrap();

    h.manager.pause(GUILD_ONE).await.unwrap();

    assert_eq!(h.manager.playback_state(GUILD_ONE), PlaybackState::Paused);
    assert_eq!(h.manager.playback_state(GUILD_TWO), PlaybackState::Idle);
    assert_eq!(h.manager.sessions().len(), 2);
}
