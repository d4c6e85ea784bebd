use std::sync::{Arc, Weak};

use futures::{FutureExt, future::BoxFuture};
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::{
    dao::models::SessionUpdate,
    dto::{
        game::SessionSnapshot,
        playback::{DeviceSummary, PlaybackStarted, SkipResponse, StartPlaybackRequest},
    },
    error::ServiceError,
    playback::{
        PlaybackItem, PlaybackStatus, PlaybackTarget,
        controller::{PlaybackController, PlaybackListener},
        device::pick_device,
    },
    services::{
        credential_service,
        game_service::{existing_table, move_cursor, no_game},
        session_mirror::SessionMirror,
        sse_events,
    },
    state::{GameTable, SharedState},
};

/// Direction of a manual skip.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipDirection {
    /// One item forward.
    Next,
    /// One item back.
    Previous,
}

/// Devices the user's provider account can play on.
pub async fn list_devices(
    state: &SharedState,
    user_id: &str,
) -> Result<Vec<DeviceSummary>, ServiceError> {
    let provider = state.provider();
    let devices = credential_service::with_access_token(state, user_id, |token| {
        provider
            .playback_device(&token)
            .list_devices()
            .map(|result| result.map_err(|err| err.source))
    })
    .await?;
    Ok(devices.into_iter().map(DeviceSummary::from).collect())
}

/// Start auto-play of the user's card from its current item.
pub async fn start_playback(
    state: &SharedState,
    user_id: &str,
    request: StartPlaybackRequest,
) -> Result<PlaybackStarted, ServiceError> {
    let table = state.existing_table(user_id).ok_or_else(nothing_to_play)?;
    let (session_id, items, start_index) = {
        let machine = table.session().read().await;
        let session = machine.session().ok_or_else(nothing_to_play)?;
        if session.card.placeholder {
            return Err(ServiceError::InvalidState(
                "auto-play is unavailable for the placeholder card".into(),
            ));
        }
        let items = session
            .card
            .items
            .iter()
            .map(|item| PlaybackItem {
                id: item.id.clone(),
                duration_ms: item.duration_ms,
            })
            .collect::<Vec<_>>();
        (session.id, items, session.current_index)
    };

    let provider = state.provider();
    let (devices, device) = credential_service::with_access_token(state, user_id, |token| {
        let device = provider.playback_device(&token);
        device
            .list_devices()
            .map(move |result| {
                result
                    .map(|devices| (devices, device))
                    .map_err(|err| err.source)
            })
    })
    .await?;

    let chosen = pick_device(&devices, request.device_id.as_deref())
        .cloned()
        .ok_or_else(|| ServiceError::InvalidState("no playback device available".into()))?;
    let original_volume = chosen
        .volume_percent
        .unwrap_or(state.config().playback.default_volume);
    let target = PlaybackTarget {
        device_id: chosen.id.clone(),
        original_volume,
    };

    // New games start under the slot lock, so the check below stays valid until the spawn.
    let mut slot = table.playback().lock().await;
    let current = table.session().read().await.session().map(|session| session.id);
    if current != Some(session_id) {
        warn!(user_id, %session_id, "game replaced while auto-play was starting");
        return Err(ServiceError::InvalidState(
            "the game changed while auto-play was starting".into(),
        ));
    }
    if let Some(previous) = slot.take() {
        previous.stop().await;
    }
    let listener = Arc::new(TableListener {
        table: Arc::downgrade(&table),
        session_id,
        mirror: state.mirror().clone(),
    });
    *slot = Some(PlaybackController::spawn(
        device,
        target,
        items,
        start_index,
        state.config().playback.clone(),
        listener,
    ));
    drop(slot);

    info!(user_id, device_id = %chosen.id, original_volume, index = start_index, "auto-play requested");
    Ok(PlaybackStarted {
        device: DeviceSummary::from(chosen),
        original_volume,
        index: start_index,
    })
}

fn nothing_to_play() -> ServiceError {
    ServiceError::InvalidState("no game to play".into())
}

/// Stop auto-play and restore the device volume. Succeeds when nothing plays.
pub async fn stop_playback(state: &SharedState, user_id: &str) {
    if let Some(table) = state.existing_table(user_id) {
        if table.stop_playback().await {
            info!(user_id, "auto-play stopped on request");
        }
    }
}

/// Move one item forward or back. Stays put at either end of the card.
pub async fn skip(
    state: &SharedState,
    user_id: &str,
    direction: SkipDirection,
) -> Result<SkipResponse, ServiceError> {
    let table = existing_table(state, user_id)?;
    let (current, item_count) = {
        let machine = table.session().read().await;
        let session = machine.session().ok_or_else(no_game)?;
        (session.current_index, session.item_count())
    };

    let target = match direction {
        SkipDirection::Next if current + 1 < item_count => Some(current + 1),
        SkipDirection::Previous if current > 0 => Some(current - 1),
        _ => None,
    };
    let playing = table
        .playback()
        .lock()
        .await
        .as_ref()
        .is_some_and(PlaybackController::is_running);

    let Some(index) = target else {
        return Ok(SkipResponse {
            index: current,
            moved: false,
            playing,
        });
    };

    let snapshot = move_cursor(state, &table, index).await?;
    sse_events::broadcast_session(table.hub(), &snapshot);
    Ok(SkipResponse {
        index: snapshot.current_item_index,
        moved: true,
        playing,
    })
}

/// Feeds controller transitions back into the session the loop was started for.
struct TableListener {
    table: Weak<GameTable>,
    session_id: Uuid,
    mirror: SessionMirror,
}

impl PlaybackListener for TableListener {
    fn item_changed(&self, index: usize) -> BoxFuture<'static, ()> {
        let table = self.table.clone();
        let session_id = self.session_id;
        let mirror = self.mirror.clone();
        async move {
            let Some(table) = table.upgrade() else {
                return;
            };
            let snapshot = {
                let mut machine = table.session().write().await;
                if machine.session().map(|session| session.id) != Some(session_id) {
                    debug!(%session_id, index, "ignoring auto-play of a replaced game");
                    return;
                }
                if let Err(err) = machine.advance_to(index) {
                    warn!(index, error = %err, "auto-advance rejected by the session");
                    return;
                }
                let Some(session) = machine.session() else {
                    return;
                };
                mirror.update(session.id, SessionUpdate::cursor(index));
                SessionSnapshot::from(session)
            };
            sse_events::broadcast_session(table.hub(), &snapshot);
        }
        .boxed()
    }

    fn status_changed(&self, status: PlaybackStatus) -> BoxFuture<'static, ()> {
        let table = self.table.clone();
        async move {
            if let Some(table) = table.upgrade() {
                sse_events::broadcast_playback_status(table.hub(), status);
            }
        }
        .boxed()
    }
}
