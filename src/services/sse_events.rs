use serde::Serialize;
use tracing::warn;

use crate::{
    dto::{game::SessionSnapshot, playback::PlaybackStatusEvent, sse::ServerEvent},
    playback::PlaybackStatus,
    state::SseHub,
};

pub(crate) const EVENT_SESSION_UPDATED: &str = "session.updated";
pub(crate) const EVENT_PLAYBACK_STATUS: &str = "playback.status";

/// Broadcast the latest snapshot of the user's game.
pub fn broadcast_session(hub: &SseHub, snapshot: &SessionSnapshot) {
    send_event(hub, EVENT_SESSION_UPDATED, snapshot);
}

/// Broadcast the auto-play status of the user's table.
pub fn broadcast_playback_status(hub: &SseHub, status: PlaybackStatus) {
    send_event(hub, EVENT_PLAYBACK_STATUS, &PlaybackStatusEvent(status));
}

fn send_event(hub: &SseHub, event: &str, payload: &impl Serialize) {
    match ServerEvent::json(Some(event.to_string()), payload) {
        Ok(event) => hub.broadcast(event),
        Err(err) => warn!(event, error = %err, "failed to serialize SSE payload"),
    }
}
