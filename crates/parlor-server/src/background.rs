//! Background tasks for the Parlor server.
//!
//! Includes:
//! - Sweeping expired synthesized audio out of the playback cache.
//! - Evicting call sessions with no recent activity.

use crate::AppState;
use std::sync::Arc;
use tokio::time::{sleep, Duration};

/// How often the audio cache is swept for expired entries.
const AUDIO_SWEEP_INTERVAL_SECONDS: u64 = 60;

/// Starts the audio cache sweep task.
///
/// Playback URLs stop resolving the moment an entry's TTL lapses; this
/// task only reclaims the memory behind them.
pub async fn start_audio_sweep_task(state: Arc<AppState>) {
    let interval = Duration::from_secs(AUDIO_SWEEP_INTERVAL_SECONDS);
    tracing::info!(
        interval_seconds = AUDIO_SWEEP_INTERVAL_SECONDS,
        "starting audio cache sweep task"
    );

    loop {
        sleep(interval).await;
        let removed = state.audio.sweep_expired();
        if removed > 0 {
            tracing::info!(count = removed, "swept expired audio entries");
        }
    }
}

/// Starts the idle session reaper task.
///
/// Calls that end without a completed booking (hangups, dropped carrier
/// webhooks) would otherwise leave their session in memory forever.
pub async fn start_session_reaper_task(state: Arc<AppState>, idle_ttl_seconds: u64) {
    if idle_ttl_seconds == 0 {
        tracing::warn!("session reaper disabled (ttl=0)");
        return;
    }

    // Run every ttl/2 seconds, clamped between 1s and 60s.
    let interval_seconds = (idle_ttl_seconds / 2).clamp(1, 60);
    let interval = Duration::from_secs(interval_seconds);

    tracing::info!(
        idle_ttl_seconds,
        interval_seconds,
        "starting idle session reaper task"
    );

    loop {
        sleep(interval).await;
        let evicted = state.sessions.evict_idle(idle_ttl_seconds);
        if !evicted.is_empty() {
            tracing::info!(count = evicted.len(), "evicted idle call sessions");
        }
    }
}
