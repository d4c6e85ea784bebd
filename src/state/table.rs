use tokio::sync::{Mutex, RwLock};

use crate::{
    bingo::patterns::PatternCatalog,
    playback::controller::PlaybackController,
    state::{SseHub, session::SessionStateMachine},
};

/// Everything one user plays with: their session, auto-play loop and event hub.
///
/// Lock order is `playback` before `session`. The session lock is never held
/// while waiting for the playback loop, since the loop reports auto-advance
/// through the session.
pub struct GameTable {
    session: RwLock<SessionStateMachine>,
    playback: Mutex<Option<PlaybackController>>,
    hub: SseHub,
}

impl GameTable {
    /// Fresh table evaluating cards against `catalog`.
    pub fn new(catalog: &'static PatternCatalog) -> Self {
        Self {
            session: RwLock::new(SessionStateMachine::new(catalog)),
            playback: Mutex::new(None),
            hub: SseHub::default(),
        }
    }

    /// Session state machine of the user.
    pub fn session(&self) -> &RwLock<SessionStateMachine> {
        &self.session
    }

    /// Slot holding the running auto-play loop, if any.
    pub fn playback(&self) -> &Mutex<Option<PlaybackController>> {
        &self.playback
    }

    /// Event hub feeding the user's SSE streams.
    pub fn hub(&self) -> &SseHub {
        &self.hub
    }

    /// True when the table has no session, loop or subscriber. Busy locks count as in use.
    pub fn is_idle(&self) -> bool {
        let no_session = self
            .session
            .try_read()
            .is_ok_and(|machine| machine.session().is_none());
        let no_playback = self.playback.try_lock().is_ok_and(|slot| slot.is_none());
        no_session && no_playback && self.hub.subscribers() == 0
    }

    /// Stop the auto-play loop if one runs. Returns whether one was stopped.
    pub async fn stop_playback(&self) -> bool {
        let controller = self.playback.lock().await.take();
        match controller {
            Some(controller) => {
                controller.stop().await;
                true
            }
            None => false,
        }
    }
}
