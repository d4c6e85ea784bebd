use std::sync::Arc;

use rand::seq::SliceRandom;
use tracing::{info, warn};
use uuid::Uuid;

use crate::{
    bingo::card::{Card, generate, placeholder_card},
    dao::models::{SessionEntity, SessionUpdate},
    dto::game::{CreateGameRequest, SessionSnapshot},
    error::ServiceError,
    services::{credential_service, sse_events},
    state::{GameTable, SharedState, session::ToggleOutcome},
};

/// Deal a new card to `user_id`, abandoning any previous game.
pub async fn create_game(
    state: &SharedState,
    user_id: &str,
    request: CreateGameRequest,
) -> Result<SessionSnapshot, ServiceError> {
    let table = state.table(user_id);
    if table.stop_playback().await {
        info!(user_id, "auto-play stopped for a new game");
    }

    let card = match deal_card(state, user_id).await {
        Ok(card) => card,
        Err(err) if request.allow_fallback() => {
            warn!(user_id, error = %err, "dealing the placeholder card");
            placeholder_card()
        }
        Err(err) => {
            drop(table);
            state.release_table(user_id);
            return Err(err);
        }
    };

    // A loop started while the card was dealt belongs to the old session.
    let (snapshot, stale) = {
        let mut slot = table.playback().lock().await;
        let stale = slot.take();
        let mut session = table.session().write().await;
        let started = session.start(Uuid::new_v4(), user_id.to_string(), Arc::new(card));
        state.mirror().create(SessionEntity::from(started));
        (SessionSnapshot::from(started), stale)
    };
    if let Some(controller) = stale {
        controller.stop().await;
        info!(user_id, "auto-play of the previous game stopped");
    }

    info!(
        user_id,
        session_id = %snapshot.session_id,
        placeholder = snapshot.card.placeholder,
        "game started"
    );
    sse_events::broadcast_session(table.hub(), &snapshot);
    Ok(snapshot)
}

async fn deal_card(state: &SharedState, user_id: &str) -> Result<Card, ServiceError> {
    let provider = state.provider();
    let criteria = &state.config().track_pool;
    let mut pool = credential_service::with_access_token(state, user_id, |token| {
        provider.track_source(&token).fetch_pool(criteria)
    })
    .await?;

    pool.shuffle(&mut rand::rng());
    Ok(generate(&pool)?)
}

/// Snapshot of the user's current game.
pub async fn current_game(
    state: &SharedState,
    user_id: &str,
) -> Result<SessionSnapshot, ServiceError> {
    let table = existing_table(state, user_id)?;
    let session = table.session().read().await;
    session
        .session()
        .map(SessionSnapshot::from)
        .ok_or_else(no_game)
}

/// Flip a cell of the user's card. Completing a pattern stops auto-play.
pub async fn toggle_cell(
    state: &SharedState,
    user_id: &str,
    index: usize,
) -> Result<SessionSnapshot, ServiceError> {
    let table = existing_table(state, user_id)?;

    let (outcome, snapshot) = {
        let mut machine = table.session().write().await;
        let outcome = machine.toggle_cell(index)?;
        let session = machine.session().ok_or_else(no_game)?;
        if outcome != ToggleOutcome::Unchanged {
            state
                .mirror()
                .update(session.id, SessionUpdate::from_session(session));
        }
        (outcome, SessionSnapshot::from(session))
    };

    if let ToggleOutcome::Completed(pattern) = outcome {
        info!(user_id, session_id = %snapshot.session_id, pattern, "bingo");
        table.stop_playback().await;
    }
    if outcome != ToggleOutcome::Unchanged {
        sse_events::broadcast_session(table.hub(), &snapshot);
    }
    Ok(snapshot)
}

/// Move the item cursor, telling a running auto-play loop to follow.
pub async fn advance(
    state: &SharedState,
    user_id: &str,
    index: usize,
) -> Result<SessionSnapshot, ServiceError> {
    let table = existing_table(state, user_id)?;
    let snapshot = move_cursor(state, &table, index).await?;
    sse_events::broadcast_session(table.hub(), &snapshot);
    Ok(snapshot)
}

/// Shared by manual advance and skips: cursor, controller and mirror in one step.
pub(crate) async fn move_cursor(
    state: &SharedState,
    table: &GameTable,
    index: usize,
) -> Result<SessionSnapshot, ServiceError> {
    let playback = table.playback().lock().await;
    let snapshot = {
        let mut machine = table.session().write().await;
        machine.advance_to(index)?;
        let session = machine.session().ok_or_else(no_game)?;
        state
            .mirror()
            .update(session.id, SessionUpdate::cursor(index));
        SessionSnapshot::from(session)
    };

    if let Some(controller) = playback.as_ref() {
        if !controller.skip_to(index) {
            warn!(index, "auto-play loop is gone; skip not delivered");
        }
    }
    Ok(snapshot)
}

pub(crate) fn existing_table(
    state: &SharedState,
    user_id: &str,
) -> Result<Arc<GameTable>, ServiceError> {
    state.existing_table(user_id).ok_or_else(no_game)
}

pub(crate) fn no_game() -> ServiceError {
    ServiceError::NotFound("no active game".into())
}
